//! Perception sources — hand/face observations from hardware or simulation.
//!
//! The public interface is [`PerceptionFrame`] delivered over an `mpsc`
//! channel. Consumers never learn whether frames came from a tracking device
//! or from the keyboard/mouse simulator; both speak raw landmarks and the
//! classifier in `gesture_stream` does the rest.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use gesture_stream::{
    FaceObservation, HandFrame, HandObservation, Landmark, CHIN, FACE_LANDMARKS, FOREHEAD,
    HAND_LANDMARKS, HEAD_PITCH_SCALE, HEAD_YAW_SCALE, LEFT_CHEEK, NOSE_TIP, RIGHT_CHEEK,
};

// ════════════════════════════════════════════════════════════════════════════
// PerceptionFrame
// ════════════════════════════════════════════════════════════════════════════

/// One tick of raw observations: tracked hands plus an optional face.
pub struct PerceptionFrame {
    pub hands: HandFrame,
    pub face:  Option<FaceObservation>,
}

/// Acquisition settings shared by all sources.
#[derive(Clone, Copy, Debug)]
pub struct PerceptionConfig {
    /// Most hands a frame will carry; extras are ignored at the source.
    pub max_hands: usize,
    pub detection_confidence: f32,
    pub tracking_confidence:  f32,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        PerceptionConfig { max_hands: 2, detection_confidence: 0.6, tracking_confidence: 0.5 }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PerceptionSource trait — unified interface for hw and sim
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`PerceptionFrame`]s over a channel.
pub trait PerceptionSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<PerceptionFrame>);
}

/// Spawn a perception source on its own thread and return the receiving end.
pub fn spawn_perception_source<P: PerceptionSource>(source: P) -> Receiver<PerceptionFrame> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// LeapPerceptionSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Perception source backed by a LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
/// The controller reports hand skeletons only, so frames carry `face: None`
/// and head pose stays neutral.
///
/// Joint positions arrive in millimetres in sensor space; they are squashed
/// into the same normalized `[0, 1]` image coordinates the simulator emits,
/// laid out wrist-first then four joints per digit — the layout the
/// classifier indexes by.
#[cfg(feature = "leap")]
pub struct LeapPerceptionSource {
    pub config: PerceptionConfig,
}

#[cfg(feature = "leap")]
impl PerceptionSource for LeapPerceptionSource {
    fn run(self: Box<Self>, tx: Sender<PerceptionFrame>) {
        use leaprs::*;

        const RETRY: Duration = Duration::from_secs(2);

        let mut connection = loop {
            match Connection::create(ConnectionConfig::default()) {
                Ok(c) => break c,
                Err(e) => {
                    eprintln!("[perception] LeapC connection failed ({e:?}); retrying in 2 s");
                    thread::sleep(RETRY);
                }
            }
        };
        loop {
            match connection.open() {
                Ok(()) => break,
                Err(e) => {
                    eprintln!("[perception] device open failed ({e:?}); retrying in 2 s");
                    thread::sleep(RETRY);
                }
            }
        }
        eprintln!("[perception] LeapMotion tracking started");

        loop {
            let msg = match connection.poll(100) {
                Ok(m) => m,
                Err(_) => continue,
            };
            if let Event::Tracking(frame) = msg.event() {
                let hands: Vec<HandObservation> = frame
                    .hands()
                    .take(self.config.max_hands)
                    .map(|h| hand_observation(&h))
                    .collect();
                let out = PerceptionFrame { hands: HandFrame::new(hands), face: None };
                if tx.send(out).is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(feature = "leap")]
fn hand_observation(hand: &leaprs::Hand) -> HandObservation {
    let mut landmarks = Vec::with_capacity(HAND_LANDMARKS);
    let palm = hand.palm().position();
    landmarks.push(norm_mm(palm.x, palm.y, palm.z));

    for digit in hand.digits() {
        let joints = [
            digit.metacarpal().next_joint(),
            digit.proximal().next_joint(),
            digit.intermediate().next_joint(),
            digit.distal().next_joint(),
        ];
        for j in joints {
            landmarks.push(norm_mm(j.x, j.y, j.z));
        }
    }
    HandObservation::new(landmarks)
}

/// Leap interaction box (roughly ±250 mm wide, 50–450 mm above the sensor)
/// → normalized image coordinates, y growing downward.
#[cfg(feature = "leap")]
fn norm_mm(x: f32, y: f32, z: f32) -> Landmark {
    Landmark::new(
        ((x + 250.0) / 500.0).clamp(0.0, 1.0),
        (1.0 - (y - 50.0) / 400.0).clamp(0.0, 1.0),
        z / 500.0,
    )
}

// ════════════════════════════════════════════════════════════════════════════
// SimPerceptionSource — keyboard/mouse simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// The simulator's current pose, set by the visualizer's input handling.
///
/// `hand_pos` is in display coordinates (what the user sees); the frame
/// synthesizer un-mirrors it so the classifier's mirror lands back on the
/// same spot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimPose {
    /// Finger count per hand; `None` means the hand is out of frame.
    pub left_fingers:  Option<u8>,
    pub right_fingers: Option<u8>,
    pub hand_pos:      (f32, f32),
    pub head_yaw:      f32,
    pub head_pitch:    f32,
    pub face:          bool,
}

impl Default for SimPose {
    fn default() -> Self {
        SimPose {
            left_fingers:  None,
            right_fingers: None,
            hand_pos:      (0.5, 0.5),
            head_yaw:      0.0,
            head_pitch:    0.0,
            face:          true,
        }
    }
}

/// Perception source driven by [`SimPose`] updates from the visualizer.
///
/// Re-emits the latest pose at ~30 Hz whether or not anything changed, so
/// downstream hold timers advance exactly as they would against a camera.
pub struct SimPerceptionSource {
    pub rx: Receiver<SimPose>,
}

impl PerceptionSource for SimPerceptionSource {
    fn run(self: Box<Self>, tx: Sender<PerceptionFrame>) {
        let mut pose = SimPose::default();
        loop {
            match self.rx.recv_timeout(Duration::from_millis(33)) {
                Ok(mut latest) => {
                    // Collapse any queued updates into the newest one.
                    while let Ok(next) = self.rx.try_recv() {
                        latest = next;
                    }
                    pose = latest;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
            if tx.send(frame_from_pose(&pose)).is_err() {
                return;
            }
        }
    }
}

/// Build a full observation frame from a simulated pose.
pub fn frame_from_pose(pose: &SimPose) -> PerceptionFrame {
    let raw_x = (1.0 - pose.hand_pos.0).clamp(0.15, 0.85);
    let raw_y = pose.hand_pos.1.clamp(0.15, 0.85);

    let mut hands = Vec::new();
    let two = pose.left_fingers.is_some() && pose.right_fingers.is_some();
    let spread = if two { 0.09 } else { 0.0 };
    if let Some(k) = pose.left_fingers {
        hands.push(synth_hand(k, (raw_x - spread, raw_y)));
    }
    if let Some(k) = pose.right_fingers {
        hands.push(synth_hand(k, (raw_x + spread, raw_y)));
    }

    let face = pose.face.then(|| synth_face(pose.head_yaw, pose.head_pitch));
    PerceptionFrame { hands: HandFrame::new(hands), face }
}

/// Synthesize a 21-landmark hand showing `fingers` (0–5) centred near
/// `center` in raw (pre-mirror) coordinates. Counts 1–4 extend that many
/// long fingers; 5 adds the thumb.
pub fn synth_hand(fingers: u8, center: (f32, f32)) -> HandObservation {
    let (cx, cy) = center;
    let long_extended = fingers.min(4);
    let thumb_extended = fingers >= 5;

    let mut lm = Vec::with_capacity(HAND_LANDMARKS);
    // wrist
    lm.push(Landmark::new(cx, cy + 0.07, 0.0));

    // thumb: CMC, MCP, IP, TIP
    lm.push(Landmark::new(cx - 0.03, cy + 0.05, 0.0));
    lm.push(Landmark::new(cx - 0.05, cy + 0.03, 0.0));
    if thumb_extended {
        lm.push(Landmark::new(cx - 0.08, cy, 0.0));
        lm.push(Landmark::new(cx - 0.12, cy - 0.02, 0.0));
    } else {
        lm.push(Landmark::new(cx - 0.03, cy + 0.03, 0.0));
        lm.push(Landmark::new(cx - 0.02, cy + 0.02, 0.0));
    }

    // index, middle, ring, pinky: MCP, PIP, DIP, TIP
    let offsets = [-0.027, -0.009, 0.009, 0.027];
    for (i, dx) in offsets.iter().enumerate() {
        let x = cx + dx;
        let extended = (i as u8) < long_extended;
        lm.push(Landmark::new(x, cy + 0.01, 0.0));
        lm.push(Landmark::new(x, cy - 0.02, 0.0));
        if extended {
            lm.push(Landmark::new(x, cy - 0.045, 0.0));
            lm.push(Landmark::new(x, cy - 0.065, 0.0));
        } else {
            lm.push(Landmark::new(x, cy - 0.005, 0.0));
            lm.push(Landmark::new(x, cy + 0.005, 0.0));
        }
    }

    HandObservation::new(lm)
}

/// Synthesize a face whose pose the classifier reads back as `(yaw, pitch)`.
pub fn synth_face(yaw: f32, pitch: f32) -> FaceObservation {
    let mut lm = vec![Landmark::new(0.5, 0.5, 0.0); FACE_LANDMARKS];
    lm[LEFT_CHEEK] = Landmark::new(0.44, 0.5, 0.0);
    lm[RIGHT_CHEEK] = Landmark::new(0.56, 0.5, 0.0);
    lm[FOREHEAD] = Landmark::new(0.5, 0.44, 0.0);
    lm[CHIN] = Landmark::new(0.5, 0.56, 0.0);
    lm[NOSE_TIP] = Landmark::new(0.5 - yaw / HEAD_YAW_SCALE, 0.5 - pitch / HEAD_PITCH_SCALE, 0.0);
    FaceObservation::new(lm)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gesture_stream::{classify, Gesture};

    fn classify_pose(pose: SimPose) -> gesture_stream::GestureSnapshot {
        let frame = frame_from_pose(&pose);
        classify(&frame.hands, frame.face.as_ref())
    }

    fn dual(k: u8) -> SimPose {
        SimPose { left_fingers: Some(k), right_fingers: Some(k), ..SimPose::default() }
    }

    // ── hand synthesis feeds the classifier ──────────────────────────────

    #[test]
    fn synthetic_hands_are_complete() {
        for k in 0..=5 {
            let hand = synth_hand(k, (0.5, 0.5));
            assert!(hand.is_complete());
            assert_eq!(hand.landmarks.len(), HAND_LANDMARKS);
        }
    }

    #[test]
    fn matched_counts_classify_as_dual_gestures() {
        assert_eq!(classify_pose(dual(0)).gesture, Gesture::DualFist);
        for k in 1..=4u8 {
            assert_eq!(classify_pose(dual(k)).gesture, Gesture::Dual(k));
        }
        assert_eq!(classify_pose(dual(5)).gesture, Gesture::DualOpen);
    }

    #[test]
    fn mismatched_counts_fall_back_to_single() {
        let pose = SimPose {
            left_fingers: Some(2),
            right_fingers: Some(3),
            ..SimPose::default()
        };
        assert_eq!(classify_pose(pose).gesture, Gesture::Single);
    }

    #[test]
    fn one_hand_is_single() {
        let pose = SimPose { left_fingers: Some(3), ..SimPose::default() };
        let snap = classify_pose(pose);
        assert_eq!(snap.gesture, Gesture::Single);
        assert_eq!(snap.hand_count, 1);
    }

    #[test]
    fn empty_pose_is_neutral() {
        let snap = classify_pose(SimPose::default());
        assert_eq!(snap.gesture, Gesture::None);
        assert_eq!(snap.avg_pos, (0.5, 0.5));
    }

    // ── position and head pose round-trip through the mirror ─────────────

    #[test]
    fn hand_position_survives_the_mirror() {
        let pose = SimPose {
            left_fingers: Some(5),
            right_fingers: Some(5),
            hand_pos: (0.3, 0.7),
            ..SimPose::default()
        };
        let snap = classify_pose(pose);
        assert!((snap.avg_pos.0 - 0.3).abs() < 0.08, "x {}", snap.avg_pos.0);
        assert!((snap.avg_pos.1 - 0.7).abs() < 0.08, "y {}", snap.avg_pos.1);
    }

    #[test]
    fn head_pose_round_trips() {
        let pose = SimPose { head_yaw: 0.4, head_pitch: -0.25, ..SimPose::default() };
        let snap = classify_pose(pose);
        assert!(snap.face_tracked);
        assert_relative_eq!(snap.head_yaw, 0.4, epsilon = 1e-4);
        assert_relative_eq!(snap.head_pitch, -0.25, epsilon = 1e-4);
    }

    #[test]
    fn no_face_means_neutral_head() {
        let pose = SimPose { face: false, ..SimPose::default() };
        let snap = classify_pose(pose);
        assert!(!snap.face_tracked);
        assert_eq!(snap.head_yaw, 0.0);
        assert_eq!(snap.head_pitch, 0.0);
    }

    #[test]
    fn default_config_tracks_two_hands() {
        let cfg = PerceptionConfig::default();
        assert_eq!(cfg.max_hands, 2);
        assert!(cfg.detection_confidence > 0.0 && cfg.detection_confidence <= 1.0);
        assert!(cfg.tracking_confidence > 0.0 && cfg.tracking_confidence <= 1.0);
    }

    // ── source thread plumbing ────────────────────────────────────────────

    #[test]
    fn sim_source_emits_without_input() {
        let (_pose_tx, pose_rx) = mpsc::channel();
        let frame_rx = spawn_perception_source(SimPerceptionSource { rx: pose_rx });
        let frame = frame_rx
            .recv_timeout(Duration::from_millis(500))
            .expect("sim source should tick on its own");
        assert_eq!(frame.hands.hands.len(), 0);
        assert!(frame.face.is_some());
    }

    #[test]
    fn sim_source_applies_latest_pose() {
        let (pose_tx, pose_rx) = mpsc::channel();
        let frame_rx = spawn_perception_source(SimPerceptionSource { rx: pose_rx });

        pose_tx.send(dual(2)).unwrap();
        // Skip frames emitted before the pose landed.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        loop {
            let frame = frame_rx
                .recv_timeout(Duration::from_millis(500))
                .expect("sim source stopped");
            if frame.hands.hands.len() == 2 {
                break;
            }
            assert!(std::time::Instant::now() < deadline, "pose never applied");
        }
    }
}
