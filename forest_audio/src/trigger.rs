//! Probabilistic trigger scheduling.
//!
//! [`PoissonClock`] replaces ad hoc per-tick probability rolls with a
//! Poisson process: inter-arrival times are sampled from an exponential
//! distribution, so the event stream is independent of how often the clock
//! is ticked and fully reproducible under a seeded RNG. [`TriggerGate`]
//! rate-limits externally caused events (leaf impacts) so a burst of
//! particle contacts cannot flood the mixer.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

// ════════════════════════════════════════════════════════════════════════════
// PoissonClock
// ════════════════════════════════════════════════════════════════════════════

/// Event scheduler with exponentially distributed inter-arrival times.
///
/// `tick(dt)` may be called at any cadence — per render frame, per audio
/// block, or in one big step — and yields the same event count for the same
/// elapsed time and seed.
#[derive(Clone, Debug)]
pub struct PoissonClock {
    rng:     SmallRng,
    rate:    f32, // expected events per second
    next_in: f32, // seconds until the next event; ∞ while rate is 0
}

impl PoissonClock {
    pub fn new(rate: f32, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let next_in = sample_interval(&mut rng, rate);
        PoissonClock { rng, rate, next_in }
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Change the expected rate. A genuine change resamples the pending
    /// interval; setting the same rate again is a no-op so callers may
    /// re-assert the rate every tick without disturbing the schedule.
    pub fn set_rate(&mut self, rate: f32) {
        if (rate - self.rate).abs() <= f32::EPSILON {
            return;
        }
        self.rate = rate;
        self.next_in = sample_interval(&mut self.rng, rate);
    }

    /// Advance the clock by `dt` seconds and return how many events fired.
    pub fn tick(&mut self, dt: f32) -> u32 {
        if self.rate <= 0.0 {
            return 0;
        }
        let mut events = 0;
        self.next_in -= dt;
        while self.next_in <= 0.0 {
            events += 1;
            self.next_in += sample_interval(&mut self.rng, self.rate);
        }
        events
    }
}

/// Exponential inter-arrival sample: `-ln(U) / λ`, `U ∈ (0, 1]`.
fn sample_interval(rng: &mut SmallRng, rate: f32) -> f32 {
    if rate <= 0.0 {
        return f32::INFINITY;
    }
    let u: f32 = 1.0 - rng.gen::<f32>(); // (0, 1] — ln(0) never happens
    -u.ln() / rate
}

// ════════════════════════════════════════════════════════════════════════════
// TriggerGate
// ════════════════════════════════════════════════════════════════════════════

/// Rate limiter for externally caused one-shots: at most `max_per_second`
/// firings pass, the rest are dropped.
#[derive(Clone, Copy, Debug)]
pub struct TriggerGate {
    min_interval: f32, // seconds between allowed firings
    since_last:   f32,
}

impl TriggerGate {
    pub fn per_second(max_per_second: f32) -> Self {
        let min_interval = 1.0 / max_per_second.max(1e-3);
        TriggerGate {
            min_interval,
            since_last: min_interval, // first firing passes immediately
        }
    }

    /// Advance the gate's clock.
    pub fn tick(&mut self, dt: f32) {
        self.since_last += dt;
    }

    /// Attempt to fire. Returns true (and rearms) only when enough time
    /// has passed since the last allowed firing — otherwise the event is
    /// dropped.
    pub fn try_fire(&mut self) -> bool {
        if self.since_last >= self.min_interval {
            self.since_last = 0.0;
            true
        } else {
            false
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
