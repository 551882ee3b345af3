//! # forest_nav
//!
//! Control state between the classifier and the scene: the season
//! hold-to-confirm machine and the hybrid camera controller.
//!
//! * [`SeasonHold`] — turns a noisy instantaneous gesture stream into a
//!   stable season-change decision. A dual finger-count gesture must be held
//!   unbroken for [`HOLD_DURATION_MS`] before the season commits; any change
//!   of target resets the clock.
//! * [`CameraRig`] — fuses keyboard keys, averaged hand position, and head
//!   yaw/pitch into smoothed velocity and orientation, with deadzones and a
//!   super-linear response curve.
//!
//! | gesture  | season target |
//! |----------|---------------|
//! | `dual_1` | summer        |
//! | `dual_2` | autumn        |
//! | `dual_3` | winter        |
//! | `dual_4` | spring        |
//!
//! ## Quick start
//!
//! ```rust
//! use forest_nav::{Season, SeasonHold};
//! use gesture_stream::Gesture;
//!
//! let mut hold = SeasonHold::new();
//! hold.step(Season::Summer, Gesture::Dual(2), 0.0);   // arm the hold
//! let committed = hold.step(Season::Summer, Gesture::Dual(2), 1500.0);
//! assert_eq!(committed, Some(Season::Autumn));
//! ```

use gesture_stream::{Gesture, GestureSnapshot};

// ════════════════════════════════════════════════════════════════════════════
// Season
// ════════════════════════════════════════════════════════════════════════════

/// The four forest seasons. Changed only by a committed [`SeasonHold`] or an
/// explicit user override.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Canonical calendar order.
    pub const ALL: [Season; 4] = [
        Season::Spring,
        Season::Summer,
        Season::Autumn,
        Season::Winter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        }
    }

    /// Next season in calendar order, wrapping. Used by the manual
    /// override key.
    pub fn next(self) -> Season {
        match self {
            Season::Spring => Season::Summer,
            Season::Summer => Season::Autumn,
            Season::Autumn => Season::Winter,
            Season::Winter => Season::Spring,
        }
    }
}

/// Season a gesture asks for, if any.
///
/// Dual counts index into [`Season::ALL`] as `k mod 4`, so every season is
/// reachable: showing four fingers wraps around to spring. Open palms and
/// fists steer motion and wind instead, and map to no season.
pub fn season_target(gesture: Gesture) -> Option<Season> {
    match gesture {
        Gesture::Dual(k) => Some(Season::ALL[(k % 4) as usize]),
        _                => None,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SeasonHold — hold-to-confirm state machine
// ════════════════════════════════════════════════════════════════════════════

/// Unbroken hold required before a season change commits.
pub const HOLD_DURATION_MS: f32 = 1500.0;

/// Debouncer state: either nothing pending, or one candidate season with its
/// accumulated hold time.
///
/// Stepped once per classifier update with the measured wall-clock delta.
/// All state is owned here — nothing global — so the machine can be driven
/// identically from tests and from the live loop.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum SeasonHold {
    #[default]
    Idle,
    Holding { target: Season, held_ms: f32 },
}

impl SeasonHold {
    pub fn new() -> Self {
        SeasonHold::Idle
    }

    /// Advance the machine by one classifier update.
    ///
    /// Returns the newly committed season, at most once per hold:
    ///
    /// * gesture maps to no season, or to the already-active season →
    ///   `Idle`, progress cleared;
    /// * gesture maps to the season already being held → accumulate; commit
    ///   and return to `Idle` once [`HOLD_DURATION_MS`] is reached;
    /// * gesture maps to a different season than the held one (including
    ///   switching directly between two targets) → restart at zero, progress
    ///   0 reported from this same step.
    ///
    /// Entering a hold accumulates no time on the entry step, so `held_ms`
    /// measures how long the gesture has been observed *while held*.
    pub fn step(&mut self, active: Season, gesture: Gesture, dt_ms: f32) -> Option<Season> {
        let target = match season_target(gesture) {
            Some(t) if t != active => t,
            _ => {
                *self = SeasonHold::Idle;
                return None;
            }
        };

        match *self {
            SeasonHold::Holding { target: held, held_ms } if held == target => {
                let held_ms = held_ms + dt_ms;
                if held_ms >= HOLD_DURATION_MS {
                    *self = SeasonHold::Idle;
                    Some(target)
                } else {
                    *self = SeasonHold::Holding { target, held_ms };
                    None
                }
            }
            _ => {
                *self = SeasonHold::Holding { target, held_ms: 0.0 };
                None
            }
        }
    }

    /// Candidate season currently being held, if any.
    pub fn target(&self) -> Option<Season> {
        match self {
            SeasonHold::Idle                  => None,
            SeasonHold::Holding { target, .. } => Some(*target),
        }
    }

    /// Hold progress in `[0, 1]` for user feedback; 0 when idle.
    pub fn progress(&self) -> f32 {
        match self {
            SeasonHold::Idle                    => 0.0,
            SeasonHold::Holding { held_ms, .. } => (held_ms / HOLD_DURATION_MS).min(1.0),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Response curve
// ════════════════════════════════════════════════════════════════════════════

/// Deadzoned super-linear response: 0 inside the deadzone, otherwise
/// `sign(v) * |v|^1.5`. Fine control near center, fast response at the
/// extremes.
pub fn response_curve(value: f32, deadzone: f32) -> f32 {
    if value.abs() <= deadzone {
        0.0
    } else {
        value.signum() * value.abs().powf(1.5)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CameraRig — hybrid keyboard / hand / head controller
// ════════════════════════════════════════════════════════════════════════════

// Orientation tuning.
const HEAD_DEADZONE:   f32 = 0.15; // |head yaw/pitch| below this = no turn
const YAW_SENSITIVITY:   f32 = 2.0;  // rad/s at curve output 1.0
const PITCH_SENSITIVITY: f32 = 1.5;
const PITCH_LIMIT:       f32 = 1.4;  // rad — keeps the view from inverting

// Translation tuning (world units/s).
const OPEN_DRIVE:  f32 = 8.0;   // dual_open pushes forward
const FIST_DRIVE:  f32 = -5.0;  // dual_fist backs away
const KEY_DRIVE:   f32 = 12.0;  // keyboard forward/back/strafe
const HAND_DEADZONE:   f32 = 0.25; // hand offset from frame center
const HAND_STRAFE_SCALE: f32 = 15.0;
const HAND_LIFT_SCALE:   f32 = 8.0; // vertical, inverted: hand up = camera up

// Velocity smoothing (per second).
const ACCEL_DAMPING: f32 = 3.0;  // while input is present
const DECEL_DAMPING: f32 = 10.0; // coasting to rest

/// Camera never sinks below this height.
pub const FLOOR_Y: f32 = 2.0;

/// Keyboard navigation state sampled once per render frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NavKeys {
    pub forward: bool,
    pub back:    bool,
    pub left:    bool,
    pub right:   bool,
}

/// Everything the rig consumes in one frame.
#[derive(Clone, Copy, Debug)]
pub struct NavInput {
    pub gesture:    Gesture,
    pub hand_count: usize,
    pub avg_pos:    (f32, f32),
    pub head_yaw:   f32,
    pub head_pitch: f32,
    pub keys:       NavKeys,
}

impl NavInput {
    pub fn from_snapshot(snap: &GestureSnapshot, keys: NavKeys) -> Self {
        NavInput {
            gesture:    snap.gesture,
            hand_count: snap.hand_count,
            avg_pos:    snap.avg_pos,
            head_yaw:   snap.head_yaw,
            head_pitch: snap.head_pitch,
            keys,
        }
    }

    /// Neutral input: no gesture, no keys, hands absent.
    pub fn idle() -> Self {
        NavInput::from_snapshot(&GestureSnapshot::default(), NavKeys::default())
    }
}

/// Persistent camera kinematics: orientation plus smoothed velocity and
/// position. Mutated only through [`CameraRig::update`].
///
/// Axes: right-handed, y up; yaw 0 faces −z and positive yaw turns left
/// (counterclockwise from above). Orientation is yaw about world-up, then
/// pitch about the camera's right axis, so no roll can accumulate.
#[derive(Clone, Copy, Debug)]
pub struct CameraRig {
    pub yaw:      f32,
    pub pitch:    f32,
    pub velocity: [f32; 3],
    pub position: [f32; 3],
}

impl Default for CameraRig {
    fn default() -> Self {
        CameraRig {
            yaw:      0.0,
            pitch:    0.0,
            velocity: [0.0; 3],
            position: [0.0, 3.0, 0.0],
        }
    }
}

impl CameraRig {
    pub fn new() -> Self {
        CameraRig::default()
    }

    /// Advance one render frame. `dt` in seconds.
    pub fn update(&mut self, input: &NavInput, dt: f32) {
        // ── orientation ───────────────────────────────────────────────────
        self.yaw += response_curve(input.head_yaw, HEAD_DEADZONE) * YAW_SENSITIVITY * dt;
        self.pitch += response_curve(input.head_pitch, HEAD_DEADZONE) * PITCH_SENSITIVITY * dt;
        self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);

        // ── translation ───────────────────────────────────────────────────
        let target = self.target_velocity(input);
        let active = target.iter().any(|v| v.abs() > 1e-4);
        let damping = if active { ACCEL_DAMPING } else { DECEL_DAMPING };
        // 1 - e^(-d·dt) stays in (0, 1): the velocity approaches its target
        // but can never overshoot it, for any frame time.
        let blend = 1.0 - (-damping * dt).exp();
        for i in 0..3 {
            self.velocity[i] += (target[i] - self.velocity[i]) * blend;
        }

        for i in 0..3 {
            self.position[i] += self.velocity[i] * dt;
        }
        if self.position[1] < FLOOR_Y {
            self.position[1] = FLOOR_Y;
        }
    }

    /// Camera forward vector (unit length).
    pub fn forward(&self) -> [f32; 3] {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        [-sy * cp, sp, -cy * cp]
    }

    /// Camera right vector (unit length, horizontal).
    pub fn right(&self) -> [f32; 3] {
        let (sy, cy) = self.yaw.sin_cos();
        [cy, 0.0, -sy]
    }

    /// Velocity magnitude, handy for HUD readouts.
    pub fn speed(&self) -> f32 {
        let [vx, vy, vz] = self.velocity;
        (vx * vx + vy * vy + vz * vz).sqrt()
    }

    /// Fuse gesture, hand-position, and keyboard terms into a target
    /// velocity in world space: camera-forward, camera-right, world-up.
    fn target_velocity(&self, input: &NavInput) -> [f32; 3] {
        let mut drive = 0.0;
        match input.gesture {
            Gesture::DualOpen => drive += OPEN_DRIVE,
            Gesture::DualFist => drive += FIST_DRIVE,
            _ => {}
        }
        if input.keys.forward { drive += KEY_DRIVE; }
        if input.keys.back    { drive -= KEY_DRIVE; }

        let mut strafe = 0.0;
        if input.keys.right { strafe += KEY_DRIVE; }
        if input.keys.left  { strafe -= KEY_DRIVE; }

        let mut lift = 0.0;
        if input.hand_count > 0 {
            let dx = input.avg_pos.0 - 0.5;
            let dy = input.avg_pos.1 - 0.5;
            strafe += response_curve(dx, HAND_DEADZONE) * HAND_STRAFE_SCALE;
            // Image y grows downward; hand above center lifts the camera.
            lift -= response_curve(dy, HAND_DEADZONE) * HAND_LIFT_SCALE;
        }

        let f = self.forward();
        let r = self.right();
        [
            f[0] * drive + r[0] * strafe,
            f[1] * drive + lift,
            f[2] * drive + r[2] * strafe,
        ]
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
