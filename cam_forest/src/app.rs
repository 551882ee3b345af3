//! Top-level application state machine.
//!
//! `AppState` owns the classifier output, the season-hold debouncer, the
//! `CameraRig`, the wind channel, and the audio engine handle. It consumes
//! [`PerceptionFrame`]s and visualizer actions, and exposes read accessors
//! for the render loop.

use std::sync::mpsc::{self, TryRecvError};
use std::time::Instant;

use forest_audio::{
    bird_rate, wind_level, AudioEngine, PoissonClock, TriggerGate, LEAF_SOUNDS_PER_SECOND,
    OPEN_HANDS_BIRD_BOOST, SPRING_GROWTH_RATE,
};
use forest_nav::{CameraRig, NavInput, NavKeys, Season, SeasonHold};
use gesture_stream::{classify, Gesture, GestureSnapshot};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "leap")]
use crate::perception::{LeapPerceptionSource, PerceptionConfig};
use crate::perception::{spawn_perception_source, PerceptionFrame, SimPerceptionSource};
use crate::scene::LeafField;
use crate::visualizer::{VisAction, Visualizer};

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
pub struct AppConfig {
    pub season: Season,
    pub seed:   u64,
    /// Start the audio engine immediately instead of waiting for `M`.
    pub audio_on_start: bool,
    /// Output ring size in milliseconds.
    pub latency_ms: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig { season: Season::Summer, seed: 42, audio_on_start: false, latency_ms: 90 }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    // ── perception → gesture ─────────────────────────────────────────────
    snapshot: GestureSnapshot,

    // ── season machine ────────────────────────────────────────────────────
    season: Season,
    hold:   SeasonHold,

    // ── camera ────────────────────────────────────────────────────────────
    rig: CameraRig,

    // ── wind channel ──────────────────────────────────────────────────────
    wind_intensity: f32,
    wind_level:     u8,

    // ── audio ─────────────────────────────────────────────────────────────
    engine:     Option<AudioEngine>,
    seed:       u64,
    latency_ms: u32,

    // ── scenery and one-shot scheduling ───────────────────────────────────
    leaf_field:   LeafField,
    leaf_gate:    TriggerGate,
    bird_clock:   PoissonClock,
    growth_clock: PoissonClock,
    places:       SmallRng,

    // ── status message ────────────────────────────────────────────────────
    pub status: String,
}

impl AppState {
    pub fn new(cfg: AppConfig) -> Self {
        let engine = if cfg.audio_on_start {
            let engine = AudioEngine::start(cfg.latency_ms, cfg.seed);
            engine.set_season(cfg.season);
            engine.set_wind_intensity(0.0);
            Some(engine)
        } else {
            None
        };

        AppState {
            snapshot: GestureSnapshot::default(),
            season: cfg.season,
            hold: SeasonHold::new(),
            rig: CameraRig::new(),
            wind_intensity: 0.0,
            wind_level: 0,
            engine,
            seed: cfg.seed,
            latency_ms: cfg.latency_ms,
            leaf_field: LeafField::new(cfg.seed),
            leaf_gate: TriggerGate::per_second(LEAF_SOUNDS_PER_SECOND),
            bird_clock: PoissonClock::new(bird_rate(cfg.season), cfg.seed ^ 0xb12d),
            growth_clock: PoissonClock::new(0.0, cfg.seed ^ 0x960),
            places: SmallRng::seed_from_u64(cfg.seed ^ 0x905),
            status: format!("{} forest - show both hands to begin", cfg.season.name()),
        }
    }

    // ── process one perception frame ──────────────────────────────────────

    /// Classify a fresh observation frame and advance the hold timer.
    pub fn handle_frame(&mut self, frame: &PerceptionFrame, dt_ms: f32) {
        self.snapshot = classify(&frame.hands, frame.face.as_ref());
        self.advance_hold(dt_ms);
    }

    /// Advance the hold timer against the last snapshot. Called on frames
    /// and on frame-less render ticks, so held gestures accumulate real
    /// wall-clock time.
    pub fn advance_hold(&mut self, dt_ms: f32) {
        if let Some(season) = self.hold.step(self.season, self.snapshot.gesture, dt_ms) {
            let via = self.snapshot.gesture.label();
            self.apply_season(season);
            self.status = format!("season -> {} via {}", season.name(), via);
        }
    }

    fn apply_season(&mut self, season: Season) {
        self.season = season;
        if let Some(engine) = &self.engine {
            engine.set_season(season);
            // A confirmation cue, and in spring the first pulse of many.
            engine.play_growth_pulse();
        }
    }

    // ── per-frame tick ────────────────────────────────────────────────────

    pub fn tick(&mut self, dt: f32, keys: NavKeys) {
        let input = NavInput::from_snapshot(&self.snapshot, keys);
        self.rig.update(&input, dt);

        // Held fists build the wind; anything else lets it die down.
        if self.snapshot.gesture == Gesture::DualFist {
            self.wind_intensity = (self.wind_intensity + dt / 2.5).min(1.0);
        } else {
            self.wind_intensity = (self.wind_intensity - dt / 0.8).max(0.0);
        }
        let level = if self.wind_intensity <= 0.05 { 0 } else { wind_level(self.wind_intensity) };
        if level != self.wind_level {
            self.wind_level = level;
            if let Some(engine) = &self.engine {
                engine.set_wind_intensity(self.wind_intensity);
            }
        }

        // Birds sing more for open hands; growth pulses belong to spring.
        let boost =
            if self.snapshot.gesture == Gesture::DualOpen { OPEN_HANDS_BIRD_BOOST } else { 1.0 };
        self.bird_clock.set_rate(bird_rate(self.season) * boost);
        for _ in 0..self.bird_clock.tick(dt) {
            let position = self.random_place();
            if let Some(engine) = &self.engine {
                engine.play_bird_sound(Some(position));
            }
        }

        let growth_rate =
            if self.season == Season::Spring { SPRING_GROWTH_RATE } else { 0.0 };
        self.growth_clock.set_rate(growth_rate);
        for _ in 0..self.growth_clock.tick(dt) {
            if let Some(engine) = &self.engine {
                engine.play_growth_pulse();
            }
        }

        // Leaf impacts, rate-capped so autumn rustles instead of crackling.
        self.leaf_gate.tick(dt);
        let grounded = self.leaf_field.tick(dt, self.wind_intensity, self.season);
        for _ in 0..grounded {
            if self.leaf_gate.try_fire() {
                if let Some(engine) = &self.engine {
                    engine.play_leaf_hit();
                }
            }
        }
    }

    fn random_place(&mut self) -> [f32; 3] {
        [
            self.places.gen_range(-8.0..8.0),
            self.places.gen_range(1.0..5.0),
            self.places.gen_range(-10.0..-2.0),
        ]
    }

    // ── visualizer actions ────────────────────────────────────────────────

    /// Apply one input action. Returns `false` when the app should quit.
    pub fn handle_action(&mut self, action: VisAction) -> bool {
        match action {
            VisAction::ToggleAudio => match self.engine.take() {
                Some(engine) => {
                    engine.quit();
                    self.status = "audio off".to_string();
                }
                None => {
                    let engine = AudioEngine::start(self.latency_ms, self.seed);
                    engine.set_season(self.season);
                    engine.set_wind_intensity(self.wind_intensity);
                    self.status = format!(
                        "audio on: {}",
                        if engine.is_live() { "device" } else { "silent" }
                    );
                    self.engine = Some(engine);
                }
            },

            VisAction::CycleSeason => {
                let season = self.season.next();
                self.hold = SeasonHold::new();
                self.apply_season(season);
                self.status = format!("season -> {} via override", season.name());
            }

            VisAction::Bird => {
                if self.engine.is_some() {
                    let position = self.random_place();
                    if let Some(engine) = &self.engine {
                        engine.play_bird_sound(Some(position));
                    }
                    self.status = "bird call".to_string();
                } else {
                    self.status = "audio is off - press M first".to_string();
                }
            }

            VisAction::Leaf => {
                if let Some(engine) = &self.engine {
                    engine.play_leaf_hit();
                    self.status = "leaf hit".to_string();
                } else {
                    self.status = "audio is off - press M first".to_string();
                }
            }

            VisAction::Growth => {
                if let Some(engine) = &self.engine {
                    engine.play_growth_pulse();
                    self.status = "growth pulse".to_string();
                } else {
                    self.status = "audio is off - press M first".to_string();
                }
            }

            VisAction::Quit => return false,
        }
        true
    }

    // ── accessors for the render loop ─────────────────────────────────────

    pub fn snapshot(&self) -> &GestureSnapshot {
        &self.snapshot
    }
    pub fn season(&self) -> Season {
        self.season
    }
    pub fn hold(&self) -> &SeasonHold {
        &self.hold
    }
    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }
    pub fn wind_intensity(&self) -> f32 {
        self.wind_intensity
    }
    pub fn leaf_field(&self) -> &LeafField {
        &self.leaf_field
    }
    pub fn audio_state(&self) -> &'static str {
        match &self.engine {
            None => "off",
            Some(engine) if engine.is_live() => "device",
            Some(_) => "silent",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// Creates the perception source (simulation by default, LeapMotion with
/// `--features leap`), the visualizer window, and drives the
/// perception/render loop at ~60 fps until quit.
pub fn run(cfg: AppConfig) -> Result<(), String> {
    let (pose_tx, pose_rx) = mpsc::channel();

    #[cfg(not(feature = "leap"))]
    let frame_rx = spawn_perception_source(SimPerceptionSource { rx: pose_rx });
    #[cfg(feature = "leap")]
    let frame_rx = {
        drop(pose_rx); // keyboard poses are ignored in hardware mode
        spawn_perception_source(LeapPerceptionSource { config: PerceptionConfig::default() })
    };

    let mut vis = Visualizer::new(pose_tx)?;
    let mut app = AppState::new(cfg);

    let mut last = Instant::now();
    while vis.is_open() {
        let now = Instant::now();
        // Clamp hitches so a stall can't teleport the camera.
        let dt = (now - last).as_secs_f32().min(0.1);
        last = now;

        for action in vis.poll_input() {
            if !app.handle_action(action) {
                return Ok(());
            }
        }

        // Take the newest pending frame; stale ones only waste classify calls.
        let mut latest: Option<PerceptionFrame> = None;
        loop {
            match frame_rx.try_recv() {
                Ok(frame) => latest = Some(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }
        match latest {
            Some(frame) => app.handle_frame(&frame, dt * 1000.0),
            None => app.advance_hold(dt * 1000.0),
        }

        app.tick(dt, vis.nav_keys());
        vis.render(
            app.snapshot(),
            app.season(),
            app.hold(),
            app.rig(),
            app.wind_intensity(),
            app.leaf_field(),
            &app.status,
            app.audio_state(),
        );
    }

    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::{frame_from_pose, SimPose};

    fn make_app() -> AppState {
        AppState::new(AppConfig::default())
    }

    fn dual_pose(k: u8) -> SimPose {
        SimPose { left_fingers: Some(k), right_fingers: Some(k), ..SimPose::default() }
    }

    // ── season switching end to end ───────────────────────────────────────

    #[test]
    fn held_dual_two_turns_summer_to_autumn() {
        let mut app = make_app();
        assert_eq!(app.season(), Season::Summer);

        let frame = frame_from_pose(&dual_pose(2));
        for _ in 0..5 {
            app.handle_frame(&frame, 100.0);
        }
        let progress = app.hold().progress();
        assert!(progress > 0.0 && progress < 1.0, "progress {progress}");
        assert_eq!(app.season(), Season::Summer);

        for _ in 0..15 {
            app.handle_frame(&frame, 100.0);
        }
        assert_eq!(app.season(), Season::Autumn);
        assert!(app.status.contains("dual_2"), "status: {}", app.status);
    }

    #[test]
    fn commit_happens_once_per_hold() {
        let mut app = make_app();
        let frame = frame_from_pose(&dual_pose(3));
        // Well past the threshold: one commit to winter, then the machine
        // stays idle because the target equals the active season.
        for _ in 0..60 {
            app.handle_frame(&frame, 100.0);
        }
        assert_eq!(app.season(), Season::Winter);
        assert_eq!(app.hold().target(), None);
    }

    #[test]
    fn empty_frames_stay_neutral() {
        let mut app = make_app();
        for _ in 0..10 {
            app.handle_frame(&frame_from_pose(&SimPose::default()), 33.0);
            assert_eq!(app.snapshot().gesture, Gesture::None);
            assert_eq!(app.snapshot().avg_pos, (0.5, 0.5));
            assert_eq!(app.hold().target(), None);
        }
        assert_eq!(app.season(), Season::Summer);
    }

    #[test]
    fn losing_hands_resets_the_hold() {
        let mut app = make_app();
        let held = frame_from_pose(&dual_pose(3));
        for _ in 0..10 {
            app.handle_frame(&held, 100.0);
        }
        assert!(app.hold().progress() > 0.4);

        app.handle_frame(&frame_from_pose(&SimPose::default()), 33.0);
        assert_eq!(app.hold().target(), None);
        assert_eq!(app.hold().progress(), 0.0);
        assert_eq!(app.season(), Season::Summer);
    }

    // ── wind ──────────────────────────────────────────────────────────────

    #[test]
    fn fists_build_wind_and_release_decays_it() {
        let mut app = make_app();
        app.handle_frame(&frame_from_pose(&dual_pose(0)), 16.0);
        assert_eq!(app.snapshot().gesture, Gesture::DualFist);

        for _ in 0..200 {
            app.tick(0.016, NavKeys::default());
        }
        assert!(app.wind_intensity() > 0.9, "wind {}", app.wind_intensity());

        app.handle_frame(&frame_from_pose(&SimPose::default()), 16.0);
        for _ in 0..80 {
            app.tick(0.016, NavKeys::default());
        }
        assert!(app.wind_intensity() <= 0.05, "wind {}", app.wind_intensity());
    }

    // ── actions ───────────────────────────────────────────────────────────

    #[test]
    fn season_override_cycles_and_resets_the_hold() {
        let mut app = make_app();
        let frame = frame_from_pose(&dual_pose(3));
        for _ in 0..5 {
            app.handle_frame(&frame, 100.0);
        }
        assert!(app.hold().target().is_some());

        assert!(app.handle_action(VisAction::CycleSeason));
        assert_eq!(app.season(), Season::Autumn);
        assert_eq!(app.hold().target(), None);
        assert!(app.status.contains("autumn"));
    }

    #[test]
    fn manual_triggers_without_audio_point_at_the_toggle() {
        let mut app = make_app();
        assert_eq!(app.audio_state(), "off");
        assert!(app.handle_action(VisAction::Bird));
        assert!(app.status.contains("press M"));
    }

    #[test]
    fn audio_toggle_round_trips() {
        let mut app = make_app();
        assert!(app.handle_action(VisAction::ToggleAudio));
        assert_ne!(app.audio_state(), "off");
        assert!(app.handle_action(VisAction::ToggleAudio));
        assert_eq!(app.audio_state(), "off");
    }

    #[test]
    fn audio_on_start_arms_the_engine() {
        let app = AppState::new(AppConfig { audio_on_start: true, ..AppConfig::default() });
        assert_ne!(app.audio_state(), "off");
    }

    #[test]
    fn quit_action_stops_the_loop() {
        let mut app = make_app();
        assert!(!app.handle_action(VisAction::Quit));
    }

    // ── camera ────────────────────────────────────────────────────────────

    #[test]
    fn keyboard_forward_moves_into_the_scene() {
        let mut app = make_app();
        let keys = NavKeys { forward: true, ..NavKeys::default() };
        for _ in 0..120 {
            app.tick(0.016, keys);
        }
        // Yaw 0 faces −z.
        assert!(app.rig().position[2] < -0.5, "z {}", app.rig().position[2]);
    }
}
