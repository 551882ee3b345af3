//! One-shot voices: short synthesized waveforms with randomized pitch and
//! timbre picked from the season's [`Palette`](crate::Palette).
//!
//! Every voice renders one stereo sample per [`Voice::next`] call and
//! reports `None` once spent; the mixer drops finished voices after each
//! block. Randomness comes from the caller's seeded RNG, so trigger → sound
//! is reproducible.

use std::f32::consts::{PI, TAU};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::synth::{flush_denorm, lp_coeff};
use crate::Palette;

// ════════════════════════════════════════════════════════════════════════════
// Spatialization helpers
// ════════════════════════════════════════════════════════════════════════════

/// Equal-power stereo gains for a pan position in `[-1, 1]`.
pub(crate) fn pan_gains(pan: f32) -> (f32, f32) {
    let theta = (pan.clamp(-1.0, 1.0) + 1.0) * PI / 4.0;
    (theta.cos(), theta.sin())
}

/// Listener-relative position → `(pan, attenuation)`. `None` renders
/// centered at full level.
fn spatialize(position: Option<[f32; 3]>) -> (f32, f32) {
    match position {
        None => (0.0, 1.0),
        Some([x, y, z]) => {
            let dist = (x * x + y * y + z * z).sqrt();
            let pan = if dist < 1e-3 { 0.0 } else { (x / dist).clamp(-1.0, 1.0) };
            let atten = 1.0 / (1.0 + 0.15 * dist);
            (pan, atten)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// BirdVoice — chirp glides over palette degrees
// ════════════════════════════════════════════════════════════════════════════

struct Chirp {
    start_hz: f32,
    end_hz:   f32,
    dur:      f32,
    gap:      f32,
}

/// Two to four sine chirps, each gliding between two palette degrees two
/// octaves up, windowed by a half-sine envelope so chirp edges never click.
pub struct BirdVoice {
    dt:     f32,
    chirps: Vec<Chirp>,
    idx:    usize,
    t:      f32,
    phase:  f32,
    gain_l: f32,
    gain_r: f32,
}

impl BirdVoice {
    pub fn new(
        palette: &Palette,
        rng: &mut SmallRng,
        position: Option<[f32; 3]>,
        sample_rate: f32,
    ) -> Self {
        let (pan, atten) = spatialize(position);
        let (pl, pr) = pan_gains(pan);
        let gain = 0.2 * atten;

        let count = rng.gen_range(2..=4);
        let chirps = (0..count)
            .map(|_| {
                let from = rng.gen_range(0..palette.len());
                let to = rng.gen_range(0..palette.len());
                Chirp {
                    start_hz: palette.degree_hz(from, 2),
                    end_hz:   palette.degree_hz(to, 2),
                    dur:      rng.gen_range(0.06..0.14),
                    gap:      rng.gen_range(0.03..0.09),
                }
            })
            .collect();

        BirdVoice {
            dt: 1.0 / sample_rate,
            chirps,
            idx: 0,
            t: 0.0,
            phase: 0.0,
            gain_l: gain * pl,
            gain_r: gain * pr,
        }
    }

    pub fn finished(&self) -> bool {
        self.idx >= self.chirps.len()
    }

    pub fn next(&mut self) -> Option<(f32, f32)> {
        let chirp = self.chirps.get(self.idx)?;
        let s = if self.t < chirp.dur {
            let k = self.t / chirp.dur;
            let freq = chirp.start_hz + (chirp.end_hz - chirp.start_hz) * k;
            self.phase = (self.phase + freq * self.dt).fract();
            (self.phase * TAU).sin() * (PI * k).sin()
        } else {
            0.0 // silent gap between chirps
        };

        self.t += self.dt;
        if self.t >= chirp.dur + chirp.gap {
            self.idx += 1;
            self.t = 0.0;
        }
        Some((s * self.gain_l, s * self.gain_r))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeafVoice — filtered noise burst
// ════════════════════════════════════════════════════════════════════════════

/// A leaf hitting the ground: a quick lowpassed noise burst with a
/// randomized cutoff and a squared fade-out.
pub struct LeafVoice {
    dt:     f32,
    t:      f32,
    dur:    f32,
    rng:    SmallRng,
    lp:     f32,
    coeff:  f32,
    gain_l: f32,
    gain_r: f32,
}

impl LeafVoice {
    pub fn new(rng: &mut SmallRng, sample_rate: f32) -> Self {
        let dur = rng.gen_range(0.08..0.16);
        let cutoff = rng.gen_range(1500.0..3500.0);
        let (pl, pr) = pan_gains(rng.gen_range(-0.3..0.3));
        LeafVoice {
            dt: 1.0 / sample_rate,
            t: 0.0,
            dur,
            rng: SmallRng::seed_from_u64(rng.gen()),
            lp: 0.0,
            coeff: lp_coeff(cutoff, sample_rate),
            gain_l: 0.12 * pl,
            gain_r: 0.12 * pr,
        }
    }

    pub fn finished(&self) -> bool {
        self.t >= self.dur
    }

    pub fn next(&mut self) -> Option<(f32, f32)> {
        if self.finished() {
            return None;
        }
        let k = self.t / self.dur;
        let env = (1.0 - k) * (1.0 - k);
        let noise: f32 = self.rng.gen_range(-1.0..1.0);
        self.lp = flush_denorm(self.lp + (noise - self.lp) * self.coeff);
        let s = self.lp * env;
        self.t += self.dt;
        Some((s * self.gain_l, s * self.gain_r))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GrowthVoice — rising sweep
// ════════════════════════════════════════════════════════════════════════════

/// A growth pulse: a two-octave upward sweep from the palette root with a
/// quieter partial at a fifth above, under a half-sine envelope.
pub struct GrowthVoice {
    dt:     f32,
    t:      f32,
    dur:    f32,
    base_hz: f32,
    phase:  f32,
    phase2: f32,
    gain:   f32,
}

impl GrowthVoice {
    pub fn new(palette: &Palette, sample_rate: f32) -> Self {
        GrowthVoice {
            dt: 1.0 / sample_rate,
            t: 0.0,
            dur: 0.8,
            base_hz: palette.degree_hz(0, 1),
            phase: 0.0,
            phase2: 0.0,
            gain: 0.18,
        }
    }

    pub fn finished(&self) -> bool {
        self.t >= self.dur
    }

    pub fn next(&mut self) -> Option<(f32, f32)> {
        if self.finished() {
            return None;
        }
        let k = self.t / self.dur;
        let freq = self.base_hz * (2.0f32).powf(2.0 * k);
        self.phase = (self.phase + freq * self.dt).fract();
        self.phase2 = (self.phase2 + freq * 1.5 * self.dt).fract();
        let env = (PI * k).sin();
        let s = ((self.phase * TAU).sin() + 0.4 * (self.phase2 * TAU).sin()) * env * self.gain;
        self.t += self.dt;
        Some((s, s))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Voice — the mixer-facing sum type
// ════════════════════════════════════════════════════════════════════════════

pub enum Voice {
    Bird(BirdVoice),
    Leaf(LeafVoice),
    Growth(GrowthVoice),
}

impl Voice {
    /// Next stereo sample, or `None` once the voice is spent.
    pub fn next(&mut self) -> Option<(f32, f32)> {
        match self {
            Voice::Bird(v)   => v.next(),
            Voice::Leaf(v)   => v.next(),
            Voice::Growth(v) => v.next(),
        }
    }

    pub fn finished(&self) -> bool {
        match self {
            Voice::Bird(v)   => v.finished(),
            Voice::Leaf(v)   => v.finished(),
            Voice::Growth(v) => v.finished(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Palette;
    use forest_nav::Season;
    use rand::SeedableRng;

    const FS: f32 = 44_100.0;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(2024)
    }

    fn drain(voice: &mut Voice) -> Vec<(f32, f32)> {
        let mut out = Vec::new();
        while let Some(s) = voice.next() {
            out.push(s);
            assert!(s.0.is_finite() && s.1.is_finite());
        }
        out
    }

    // ── pan / spatialization ──────────────────────────────────────────────

    #[test]
    fn pan_is_equal_power() {
        for pan in [-1.0f32, -0.5, 0.0, 0.5, 1.0] {
            let (l, r) = pan_gains(pan);
            assert!((l * l + r * r - 1.0).abs() < 1e-5);
        }
        let (l, r) = pan_gains(-1.0);
        assert!((l - 1.0).abs() < 1e-6 && r.abs() < 1e-6);
    }

    #[test]
    fn distance_attenuates() {
        let (_, near) = spatialize(Some([0.0, 0.0, 1.0]));
        let (_, far) = spatialize(Some([0.0, 0.0, 40.0]));
        assert!(near > far);
        assert_eq!(spatialize(None), (0.0, 1.0));
    }

    // ── bird ──────────────────────────────────────────────────────────────

    #[test]
    fn bird_sings_then_finishes() {
        let mut r = rng();
        let pal = Palette::for_season(Season::Spring);
        let mut v = Voice::Bird(BirdVoice::new(&pal, &mut r, None, FS));

        let samples = drain(&mut v);
        assert!(v.finished());
        // 2–4 chirps of ≤0.14 s plus ≤0.09 s gaps.
        let max_len = (4.0 * 0.24 * FS) as usize;
        let min_len = (2.0 * 0.08 * FS) as usize;
        assert!(samples.len() <= max_len && samples.len() >= min_len);
        assert!(samples.iter().all(|(l, r)| l.abs() <= 0.21 && r.abs() <= 0.21));
    }

    #[test]
    fn bird_to_the_right_pans_right() {
        let mut r = rng();
        let pal = Palette::for_season(Season::Summer);
        let mut v = Voice::Bird(BirdVoice::new(&pal, &mut r, Some([8.0, 2.0, -1.0]), FS));

        let samples = drain(&mut v);
        let left: f32 = samples.iter().map(|(l, _)| l.abs()).sum();
        let right: f32 = samples.iter().map(|(_, r)| r.abs()).sum();
        assert!(right > left);
    }

    #[test]
    fn same_seed_same_song() {
        let pal = Palette::for_season(Season::Winter);
        let mut a = Voice::Bird(BirdVoice::new(&pal, &mut rng(), None, FS));
        let mut b = Voice::Bird(BirdVoice::new(&pal, &mut rng(), None, FS));
        assert_eq!(drain(&mut a), drain(&mut b));
    }

    // ── leaf ──────────────────────────────────────────────────────────────

    #[test]
    fn leaf_is_short_and_fades_out() {
        let mut r = rng();
        let mut v = Voice::Leaf(LeafVoice::new(&mut r, FS));
        let samples = drain(&mut v);

        assert!(samples.len() <= (0.17 * FS) as usize);
        assert!(samples.len() >= (0.07 * FS) as usize);
        // Squared fade: the last millisecond is almost silent.
        let tail = &samples[samples.len() - 44..];
        assert!(tail.iter().all(|(l, _)| l.abs() < 0.01));
        assert!(samples.iter().all(|(l, _)| l.abs() <= 0.13));
    }

    // ── growth ────────────────────────────────────────────────────────────

    #[test]
    fn growth_sweeps_upward() {
        let pal = Palette::for_season(Season::Spring);
        let mut v = Voice::Growth(GrowthVoice::new(&pal, FS));
        let samples = drain(&mut v);
        let expect = (0.8 * FS) as usize;
        assert!(samples.len().abs_diff(expect) < 64);

        // Rising frequency → more zero crossings late than early.
        let quarter = samples.len() / 4;
        let crossings = |w: &[(f32, f32)]| {
            w.windows(2)
                .filter(|p| (p[0].0 >= 0.0) != (p[1].0 >= 0.0))
                .count()
        };
        let early = crossings(&samples[..quarter]);
        let late = crossings(&samples[samples.len() - quarter..]);
        assert!(late > early * 2, "early {early}, late {late}");
    }
}
