//! # forest_audio
//!
//! Procedural forest ambience driven by season and gesture state.
//!
//! The continuous layer is a white-noise bed through a one-pole lowpass,
//! a detuned two-sine "shimmer" texture, and a small Schroeder reverb.
//! Each season carries a complete target set for those parameters:
//!
//! | season | noise gain | cutoff Hz | shimmer | reverb mix |
//! |--------|-----------:|----------:|--------:|-----------:|
//! | spring | 0.16       | 900       | 0.050   | 0.30       |
//! | summer | 0.12       | 1400      | 0.080   | 0.22       |
//! | autumn | 0.22       | 700       | 0.040   | 0.35       |
//! | winter | 0.30       | 420       | 0.020   | 0.45       |
//!
//! Running values approach their targets exponentially (τ ≈ 0.7 s) — never
//! stepped, so season changes glide instead of clicking. On top of the bed,
//! one-shot voices (bird call, leaf impact, growth pulse) pick their pitches
//! from a season-keyed melodic palette and are scheduled by a Poisson-process
//! clock, reproducible under a seeded RNG.
//!
//! ## Quick start
//!
//! ```rust
//! use forest_audio::SynthCore;
//! use forest_nav::Season;
//!
//! let mut core = SynthCore::new(44_100.0, 7);
//! core.set_season(Season::Autumn);
//! core.trigger_bird(None);
//!
//! let mut block = vec![0.0f32; 512]; // 256 interleaved stereo frames
//! core.render(&mut block);
//! assert!(block.iter().all(|s| s.is_finite()));
//! ```

use forest_nav::Season;

pub mod engine;
pub mod synth;
pub mod trigger;
pub mod voice;

pub use engine::{AudioEngine, AudioSink, NullSink};
pub use synth::SynthCore;
pub use trigger::{PoissonClock, TriggerGate};

// ════════════════════════════════════════════════════════════════════════════
// AudioParams — the per-season continuous parameter set
// ════════════════════════════════════════════════════════════════════════════

/// Continuous synthesis parameters. One complete set exists per season
/// (the exhaustive match below is the invariant), and the running set is
/// interpolated toward the target, never assigned outright.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioParams {
    /// Noise-bed gain after the lowpass.
    pub noise_gain: f32,
    /// Lowpass cutoff for the noise bed, Hz.
    pub cutoff_hz: f32,
    /// Gain of the secondary shimmer texture.
    pub shimmer_gain: f32,
    /// Reverb send level.
    pub reverb_mix: f32,
}

impl AudioParams {
    /// Target set for a season.
    pub fn for_season(season: Season) -> AudioParams {
        match season {
            Season::Spring => AudioParams {
                noise_gain: 0.16, cutoff_hz: 900.0, shimmer_gain: 0.05, reverb_mix: 0.30,
            },
            Season::Summer => AudioParams {
                noise_gain: 0.12, cutoff_hz: 1400.0, shimmer_gain: 0.08, reverb_mix: 0.22,
            },
            Season::Autumn => AudioParams {
                noise_gain: 0.22, cutoff_hz: 700.0, shimmer_gain: 0.04, reverb_mix: 0.35,
            },
            Season::Winter => AudioParams {
                noise_gain: 0.30, cutoff_hz: 420.0, shimmer_gain: 0.02, reverb_mix: 0.45,
            },
        }
    }

    /// Apply a wind preset on top of the season target. Presets are
    /// deliberately quantized steps, not a continuous blend — the smoothing
    /// happens afterwards, on the way to this target.
    pub fn with_wind(self, level: u8) -> AudioParams {
        let (gain_mul, cutoff_mul) = WIND_PRESETS[level.min(3) as usize];
        AudioParams {
            noise_gain: self.noise_gain * gain_mul,
            cutoff_hz:  self.cutoff_hz * cutoff_mul,
            ..self
        }
    }

    /// Move every field a fraction `alpha` of the way to `target`.
    pub fn approach(&mut self, target: &AudioParams, alpha: f32) {
        self.noise_gain   += (target.noise_gain - self.noise_gain) * alpha;
        self.cutoff_hz    += (target.cutoff_hz - self.cutoff_hz) * alpha;
        self.shimmer_gain += (target.shimmer_gain - self.shimmer_gain) * alpha;
        self.reverb_mix   += (target.reverb_mix - self.reverb_mix) * alpha;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Wind — discrete levels over the continuous fist channel
// ════════════════════════════════════════════════════════════════════════════

/// `(noise-gain multiplier, cutoff multiplier)` per wind level 0–3.
pub const WIND_PRESETS: [(f32, f32); 4] = [
    (1.0, 1.0),   // 0 — calm
    (1.25, 1.2),  // 1 — breeze
    (1.7, 1.5),   // 2 — gusty
    (2.3, 2.0),   // 3 — storm
];

/// Quantize a continuous hold intensity into a wind level.
///
/// Callers pass level 0 themselves when the fist channel is inactive; this
/// maps any *active* intensity to 1–3.
pub fn wind_level(intensity: f32) -> u8 {
    if intensity > 0.6 {
        3
    } else if intensity > 0.3 {
        2
    } else {
        1
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Palette — season-keyed melodic scale tables
// ════════════════════════════════════════════════════════════════════════════

/// Melodic material for one season: semitone intervals over a root
/// frequency. One-shot voices pick their pitches from here so every season
/// has its own tonality.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    pub intervals: &'static [u8],
    pub root_hz:   f32,
    pub name:      &'static str,
}

impl Palette {
    pub fn for_season(season: Season) -> Palette {
        match season {
            Season::Spring => Palette {
                intervals: &[0, 2, 4, 7, 9], root_hz: 440.0, name: "pentatonic major",
            },
            Season::Summer => Palette {
                intervals: &[0, 2, 4, 6, 7, 9, 11], root_hz: 523.25, name: "lydian",
            },
            Season::Autumn => Palette {
                intervals: &[0, 3, 5, 7, 10], root_hz: 329.63, name: "pentatonic minor",
            },
            Season::Winter => Palette {
                intervals: &[0, 2, 3, 7, 8], root_hz: 261.63, name: "hirajoshi",
            },
        }
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Frequency of scale degree `degree`, raised by `octave` octaves.
    /// Degrees wrap within the interval table (equal temperament).
    pub fn degree_hz(&self, degree: usize, octave: u32) -> f32 {
        let semitone = self.intervals[degree % self.intervals.len()] as f32;
        self.root_hz * (2.0f32).powf(octave as f32 + semitone / 12.0)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Ambient trigger rates
// ════════════════════════════════════════════════════════════════════════════

/// Baseline bird-call rate per second for a season.
pub fn bird_rate(season: Season) -> f32 {
    match season {
        Season::Spring => 0.35,
        Season::Summer => 0.25,
        Season::Autumn => 0.12,
        Season::Winter => 0.05,
    }
}

/// Bird-rate multiplier while both palms are open.
pub const OPEN_HANDS_BIRD_BOOST: f32 = 3.0;

/// Growth pulses only occur ambiently in spring, at this rate.
pub const SPRING_GROWTH_RATE: f32 = 0.08;

/// Leaf-impact sounds are capped at this many per second, however many
/// particles hit the ground.
pub const LEAF_SOUNDS_PER_SECOND: f32 = 6.0;

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
