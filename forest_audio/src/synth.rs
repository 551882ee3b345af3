//! Block-rendering synthesis core.
//!
//! [`SynthCore`] owns the continuous bed (noise → one-pole lowpass, plus the
//! shimmer pair), the active one-shot voices, and a small Schroeder reverb.
//! It renders interleaved stereo `f32` into caller-supplied buffers and has
//! no knowledge of devices or threads — the engine decides where the blocks
//! go, which keeps every test here allocation-and-assert only.

use forest_nav::Season;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::trigger::PoissonClock;
use crate::voice::{BirdVoice, GrowthVoice, LeafVoice, Voice};
use crate::{AudioParams, Palette};

// ════════════════════════════════════════════════════════════════════════════
// Tuning
// ════════════════════════════════════════════════════════════════════════════

/// Frames per render block. 256 at 44.1 kHz ≈ 5.8 ms of latency per hop.
pub const BLOCK_FRAMES: usize = 256;

/// Time constant for parameter glides, seconds to ~63 % of a change.
const PARAM_TAU: f32 = 0.7;

/// Hard cap on simultaneous one-shot voices.
pub(crate) const MAX_VOICES: usize = 24;

/// Mean shimmer retunes per second.
const SHIMMER_DRIFT_RATE: f32 = 0.2;

/// One-pole coefficient for a given cutoff.
pub(crate) fn lp_coeff(cutoff_hz: f32, sample_rate: f32) -> f32 {
    1.0 - (-std::f32::consts::TAU * cutoff_hz / sample_rate).exp()
}

/// Snap subnormals to zero before they stall the FPU inside feedback loops.
pub(crate) fn flush_denorm(x: f32) -> f32 {
    if x.abs() < 1e-20 {
        0.0
    } else {
        x
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Building blocks
// ════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct OnePole {
    state: f32,
}

impl OnePole {
    fn process(&mut self, input: f32, coeff: f32) -> f32 {
        self.state = flush_denorm(self.state + (input - self.state) * coeff);
        self.state
    }
}

/// Detuned sine pair on a palette degree, under a slow amplitude wobble.
#[derive(Default)]
struct Shimmer {
    phase_a:   f32,
    phase_b:   f32,
    freq_a:    f32,
    freq_b:    f32,
    lfo_phase: f32,
}

impl Shimmer {
    fn retune(&mut self, palette: &Palette, rng: &mut SmallRng) {
        let degree = rng.gen_range(0..palette.len());
        let octave = rng.gen_range(1..=2);
        let hz = palette.degree_hz(degree, octave);
        self.freq_a = hz;
        self.freq_b = hz * 1.003;
    }

    fn next(&mut self, dt: f32) -> f32 {
        use std::f32::consts::TAU;
        self.phase_a = (self.phase_a + self.freq_a * dt).fract();
        self.phase_b = (self.phase_b + self.freq_b * dt).fract();
        self.lfo_phase = (self.lfo_phase + 0.13 * dt).fract();
        let wobble = 0.6 + 0.4 * (self.lfo_phase * TAU).sin();
        ((self.phase_a * TAU).sin() + (self.phase_b * TAU).sin()) * 0.5 * wobble
    }
}

struct Comb {
    buf:      Vec<f32>,
    idx:      usize,
    feedback: f32,
    damp:     f32,
    filt:     f32,
}

impl Comb {
    fn new(len: usize, feedback: f32, damp: f32) -> Comb {
        Comb { buf: vec![0.0; len.max(1)], idx: 0, feedback, damp, filt: 0.0 }
    }

    fn process(&mut self, input: f32) -> f32 {
        let out = self.buf[self.idx];
        self.filt = flush_denorm(out + (self.filt - out) * self.damp);
        self.buf[self.idx] = flush_denorm(input + self.filt * self.feedback);
        self.idx = (self.idx + 1) % self.buf.len();
        out
    }
}

struct Allpass {
    buf: Vec<f32>,
    idx: usize,
}

impl Allpass {
    fn new(len: usize) -> Allpass {
        Allpass { buf: vec![0.0; len.max(1)], idx: 0 }
    }

    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buf[self.idx];
        self.buf[self.idx] = flush_denorm(input + delayed * 0.5);
        self.idx = (self.idx + 1) % self.buf.len();
        delayed - input
    }
}

/// Three damped combs into one allpass — a small mono Schroeder tail. The
/// classic 44.1 kHz delay lengths are rescaled for other rates.
struct Reverb {
    combs:   [Comb; 3],
    allpass: Allpass,
}

impl Reverb {
    fn new(sample_rate: f32) -> Reverb {
        let scale = sample_rate / 44_100.0;
        let len = |n: usize| ((n as f32 * scale) as usize).max(1);
        Reverb {
            combs: [
                Comb::new(len(1116), 0.84, 0.25),
                Comb::new(len(1188), 0.83, 0.25),
                Comb::new(len(1277), 0.82, 0.25),
            ],
            allpass: Allpass::new(len(556)),
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let mut acc = 0.0;
        for comb in &mut self.combs {
            acc += comb.process(input);
        }
        self.allpass.process(acc) * 0.35
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SynthCore
// ════════════════════════════════════════════════════════════════════════════

/// The whole signal chain behind one seeded RNG.
///
/// Everything audible is a function of `(seed, call sequence)`: the same
/// seed with the same seasons, winds, and triggers renders the same bytes.
pub struct SynthCore {
    sample_rate: f32,
    dt:          f32,
    rng:         SmallRng,
    season:      Season,
    wind:        u8,
    params:      AudioParams,
    noise_lp:    OnePole,
    shimmer:     Shimmer,
    drift:       PoissonClock,
    reverb:      Reverb,
    voices:      Vec<Voice>,
}

impl SynthCore {
    pub fn new(sample_rate: f32, seed: u64) -> SynthCore {
        let mut rng = SmallRng::seed_from_u64(seed);
        let season = Season::Summer;
        let mut shimmer = Shimmer::default();
        shimmer.retune(&Palette::for_season(season), &mut rng);
        SynthCore {
            sample_rate,
            dt: 1.0 / sample_rate,
            rng,
            season,
            wind: 0,
            params: AudioParams::for_season(season),
            noise_lp: OnePole::default(),
            shimmer,
            drift: PoissonClock::new(SHIMMER_DRIFT_RATE, seed ^ 0x5eed),
            reverb: Reverb::new(sample_rate),
            voices: Vec::new(),
        }
    }

    pub fn season(&self) -> Season {
        self.season
    }

    /// Current (smoothed) parameter values.
    pub fn params(&self) -> AudioParams {
        self.params
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Retarget the continuous bed and retune the shimmer. The running
    /// values glide there over the next blocks.
    pub fn set_season(&mut self, season: Season) {
        self.season = season;
        self.shimmer.retune(&Palette::for_season(season), &mut self.rng);
    }

    /// Select a wind preset, 0–3. Out-of-range levels clamp to storm.
    pub fn set_wind(&mut self, level: u8) {
        self.wind = level.min(3);
    }

    pub fn trigger_bird(&mut self, position: Option<[f32; 3]>) {
        if self.voices.len() >= MAX_VOICES {
            return;
        }
        let palette = Palette::for_season(self.season);
        let voice = BirdVoice::new(&palette, &mut self.rng, position, self.sample_rate);
        self.voices.push(Voice::Bird(voice));
    }

    pub fn trigger_leaf(&mut self) {
        if self.voices.len() >= MAX_VOICES {
            return;
        }
        let voice = LeafVoice::new(&mut self.rng, self.sample_rate);
        self.voices.push(Voice::Leaf(voice));
    }

    pub fn trigger_growth(&mut self) {
        if self.voices.len() >= MAX_VOICES {
            return;
        }
        let palette = Palette::for_season(self.season);
        self.voices.push(Voice::Growth(GrowthVoice::new(&palette, self.sample_rate)));
    }

    /// Render interleaved stereo into `out`. One parameter-glide step is
    /// taken per call, sized to the span the buffer covers.
    pub fn render(&mut self, out: &mut [f32]) {
        let frames = out.len() / 2;
        if frames == 0 {
            return;
        }
        let span = frames as f32 * self.dt;

        let target = AudioParams::for_season(self.season).with_wind(self.wind);
        let alpha = 1.0 - (-span / PARAM_TAU).exp();
        self.params.approach(&target, alpha);

        if self.drift.tick(span) > 0 {
            self.shimmer.retune(&Palette::for_season(self.season), &mut self.rng);
        }

        let noise_coeff = lp_coeff(self.params.cutoff_hz, self.sample_rate);
        for frame in out.chunks_exact_mut(2) {
            let white: f32 = self.rng.gen_range(-1.0..1.0);
            let bed = self.noise_lp.process(white, noise_coeff) * self.params.noise_gain;
            let shimmer = self.shimmer.next(self.dt) * self.params.shimmer_gain;

            let mut dry_l = bed + shimmer;
            let mut dry_r = bed + shimmer;
            for voice in &mut self.voices {
                if let Some((l, r)) = voice.next() {
                    dry_l += l;
                    dry_r += r;
                }
            }

            let wet = self.reverb.process((dry_l + dry_r) * 0.5) * self.params.reverb_mix;
            frame[0] = (dry_l + wet).clamp(-1.0, 1.0);
            frame[1] = (dry_r + wet).clamp(-1.0, 1.0);
        }

        self.voices.retain(|v| !v.finished());
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f32 = 44_100.0;

    fn block() -> Vec<f32> {
        vec![0.0; BLOCK_FRAMES * 2]
    }

    #[test]
    fn render_stays_finite_and_bounded() {
        let mut core = SynthCore::new(FS, 11);
        let mut buf = block();
        for (i, season) in forest_nav::Season::ALL.iter().enumerate() {
            core.set_season(*season);
            core.set_wind(3);
            core.trigger_bird(Some([i as f32 * 2.0 - 3.0, 1.0, -4.0]));
            core.trigger_leaf();
            core.trigger_growth();
            for _ in 0..40 {
                core.render(&mut buf);
                assert!(buf.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
            }
        }
    }

    #[test]
    fn cutoff_glides_instead_of_stepping() {
        let mut core = SynthCore::new(FS, 3);
        let start = core.params().cutoff_hz;
        core.set_season(Season::Winter);
        let target = AudioParams::for_season(Season::Winter).cutoff_hz;
        let gap = start - target;
        assert!(gap > 0.0);

        let mut buf = block();
        core.render(&mut buf);
        let after_one = core.params().cutoff_hz;
        // One ~6 ms block moves a sliver of the way, never the whole jump.
        assert!(after_one < start);
        assert!(start - after_one < 0.05 * gap);

        // ~3.5 s is five time constants; the glide is essentially done.
        for _ in 0..600 {
            core.render(&mut buf);
        }
        assert!((core.params().cutoff_hz - target).abs() < 0.02 * gap);
    }

    #[test]
    fn same_seed_renders_identical_audio() {
        let run = || {
            let mut core = SynthCore::new(FS, 99);
            core.set_season(Season::Autumn);
            core.trigger_bird(None);
            core.trigger_growth();
            let mut out = Vec::new();
            let mut buf = block();
            for _ in 0..8 {
                core.render(&mut buf);
                out.extend_from_slice(&buf);
            }
            out
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn voices_drain_once_spent() {
        let mut core = SynthCore::new(FS, 5);
        core.trigger_bird(None);
        core.trigger_leaf();
        assert_eq!(core.active_voices(), 2);

        // 1.2 s covers the longest bird (4 chirps + gaps ≈ 0.95 s).
        let blocks = (1.2 * FS) as usize / BLOCK_FRAMES + 1;
        let mut buf = block();
        for _ in 0..blocks {
            core.render(&mut buf);
        }
        assert_eq!(core.active_voices(), 0);
    }

    #[test]
    fn voice_count_is_capped() {
        let mut core = SynthCore::new(FS, 8);
        for _ in 0..MAX_VOICES * 2 {
            core.trigger_leaf();
        }
        assert_eq!(core.active_voices(), MAX_VOICES);
    }

    #[test]
    fn fresh_core_stays_calm_without_wind() {
        let mut core = SynthCore::new(FS, 2);
        let calm = AudioParams::for_season(Season::Summer);
        assert_eq!(core.params(), calm);

        // With no wind command the bed holds the level-0 targets.
        let mut buf = block();
        for _ in 0..40 {
            core.render(&mut buf);
        }
        assert_eq!(core.params(), calm);
    }

    #[test]
    fn storm_wind_raises_the_bed() {
        let mut core = SynthCore::new(FS, 4);
        let calm_gain = core.params().noise_gain;
        core.set_wind(3);
        let mut buf = block();
        for _ in 0..600 {
            core.render(&mut buf);
        }
        // Summer 0.12 × storm 2.3 ≈ 0.276.
        assert!(core.params().noise_gain > calm_gain * 2.0);

        let mut a = SynthCore::new(FS, 4);
        let mut b = SynthCore::new(FS, 4);
        a.set_wind(9);
        b.set_wind(3);
        for _ in 0..10 {
            a.render(&mut buf);
            b.render(&mut buf);
        }
        assert_eq!(a.params(), b.params());
    }
}
