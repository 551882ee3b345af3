//! # gesture_stream
//!
//! Landmark data model and the pure gesture classifier: normalized per-frame
//! hand/face landmark observations in, one [`GestureSnapshot`] out.
//!
//! | gesture     | condition (two complete hands unless noted)            |
//! |-------------|---------------------------------------------------------|
//! | `none`      | zero hands detected                                     |
//! | `single`    | one hand, or two hands with no recognized dual pattern  |
//! | `dual_open` | both hands showing ≥ 4 extended fingers                 |
//! | `dual_fist` | both hands showing 0 extended fingers                   |
//! | `dual_1..4` | both hands showing the same count k ∈ {1,2,3,4}         |
//!
//! The classifier is a pure function of the current frame — no memory, no
//! tracking across cycles — so feeding the same frame twice always yields the
//! same snapshot. Head yaw/pitch estimation is an independent track: a face
//! contributes pose even when no hands are present.
//!
//! ## Quick start
//!
//! ```rust
//! use gesture_stream::{classify, HandFrame};
//!
//! // An empty frame resolves to the neutral snapshot.
//! let snap = classify(&HandFrame::default(), None);
//! assert_eq!(snap.gesture.label(), "none");
//! assert_eq!(snap.avg_pos, (0.5, 0.5));
//! ```

// ════════════════════════════════════════════════════════════════════════════
// Landmark — one tracked point in normalized image space
// ════════════════════════════════════════════════════════════════════════════

/// A single tracked point. `x`/`y` are normalized image coordinates in
/// `[0, 1]` with y growing downward; `z` is relative depth (unitless,
/// smaller = closer to the camera).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Landmark { x, y, z }
    }

    /// Euclidean distance to another landmark.
    pub fn dist(self, other: Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark topology — MediaPipe hand (21 points) and face mesh (468 points)
// ════════════════════════════════════════════════════════════════════════════

/// Points per complete hand observation: wrist + 4 joints per digit.
pub const HAND_LANDMARKS: usize = 21;
/// Points per complete face-mesh observation.
pub const FACE_LANDMARKS: usize = 468;

// Hand indices.
pub const WRIST:      usize = 0;
pub const THUMB_TIP:  usize = 4;
pub const INDEX_MCP:  usize = 5;   // index-finger base knuckle
pub const INDEX_PIP:  usize = 6;
pub const INDEX_TIP:  usize = 8;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_PIP:   usize = 14;
pub const RING_TIP:   usize = 16;
pub const PINKY_PIP:  usize = 18;
pub const PINKY_TIP:  usize = 20;

/// The four long fingers as `(proximal joint, fingertip)` index pairs.
/// The thumb is excluded — it gets its own extension test.
pub const LONG_FINGERS: [(usize, usize); 4] = [
    (INDEX_PIP,  INDEX_TIP),
    (MIDDLE_PIP, MIDDLE_TIP),
    (RING_PIP,   RING_TIP),
    (PINKY_PIP,  PINKY_TIP),
];

// Face-mesh indices.
pub const NOSE_TIP:    usize = 1;
pub const FOREHEAD:    usize = 10;
pub const CHIN:        usize = 152;
pub const LEFT_CHEEK:  usize = 234;
pub const RIGHT_CHEEK: usize = 454;

// ════════════════════════════════════════════════════════════════════════════
// Tunable thresholds (empirically reasonable defaults)
// ════════════════════════════════════════════════════════════════════════════

/// Thumb counts as extended when thumb-tip is farther than this from the
/// index-finger base, in normalized units. The wrist-distance heuristic the
/// long fingers use is unreliable for the thumb: curled and resting thumbs
/// both sit near the palm center relative to the wrist.
pub const THUMB_EXTENDED_DIST: f32 = 0.08;

/// Horizontal nose offset → yaw multiplier. Typical full head turns move the
/// nose ~0.12 of the frame off the cheek midpoint, landing yaw near ±1.
pub const HEAD_YAW_SCALE: f32 = 8.0;
/// Vertical nose offset → pitch multiplier.
pub const HEAD_PITCH_SCALE: f32 = 8.0;

/// Average hand position reported when no hands are present: frame center,
/// which downstream deadzones treat as "no input".
pub const NEUTRAL_POS: (f32, f32) = (0.5, 0.5);

// ════════════════════════════════════════════════════════════════════════════
// Observations — ephemeral, one perception cycle each
// ════════════════════════════════════════════════════════════════════════════

/// Ordered landmark sequence for one detected hand.
///
/// Access is index-checked: an observation carrying fewer than
/// [`HAND_LANDMARKS`] points is *incomplete* and is ignored by the
/// classifier rather than dereferenced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandObservation {
    pub landmarks: Vec<Landmark>,
}

impl HandObservation {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        HandObservation { landmarks }
    }

    /// Checked landmark access.
    pub fn get(&self, index: usize) -> Option<Landmark> {
        self.landmarks.get(index).copied()
    }

    /// True when every expected hand landmark is present.
    pub fn is_complete(&self) -> bool {
        self.landmarks.len() >= HAND_LANDMARKS
    }
}

/// Ordered landmark sequence for one detected face.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceObservation {
    pub landmarks: Vec<Landmark>,
}

impl FaceObservation {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        FaceObservation { landmarks }
    }

    pub fn get(&self, index: usize) -> Option<Landmark> {
        self.landmarks.get(index).copied()
    }
}

/// All hands observed in one perception cycle (zero, one, or two).
/// Hands carry a per-cycle index only — no identity across cycles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandFrame {
    pub hands: Vec<HandObservation>,
}

impl HandFrame {
    pub fn new(hands: Vec<HandObservation>) -> Self {
        HandFrame { hands }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Gesture — the discrete classification result
// ════════════════════════════════════════════════════════════════════════════

/// Discrete gesture category for one frame.
///
/// `Single` deliberately covers both "exactly one hand" and "two hands with
/// mismatched counts" — hands are present but no dual pattern is recognized.
/// The two cases are not distinguished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    /// No hands detected.
    None,
    /// One hand, or an ambiguous/mismatched two-hand pose.
    Single,
    /// Both hands open (≥ 4 extended fingers each).
    DualOpen,
    /// Both hands closed fists.
    DualFist,
    /// Both hands showing the same finger count, 1–4.
    Dual(u8),
}

impl Gesture {
    /// Stable debug/UI tag for this gesture.
    pub fn label(self) -> &'static str {
        match self {
            Gesture::None     => "none",
            Gesture::Single   => "single",
            Gesture::DualOpen => "dual_open",
            Gesture::DualFist => "dual_fist",
            Gesture::Dual(1)  => "dual_1",
            Gesture::Dual(2)  => "dual_2",
            Gesture::Dual(3)  => "dual_3",
            Gesture::Dual(4)  => "dual_4",
            Gesture::Dual(_)  => "dual_?",
        }
    }
}

/// Everything the classifier derives from one perception cycle.
///
/// Recomputed in full every cycle; nothing here persists inside the
/// classifier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureSnapshot {
    /// Discrete gesture category.
    pub gesture: Gesture,
    /// Number of complete hand observations this cycle.
    pub hand_count: usize,
    /// Mean wrist position across detected hands, x mirrored (`1 - raw_x`)
    /// so it matches what the user sees on screen. `(0.5, 0.5)` when no
    /// hands are present.
    pub avg_pos: (f32, f32),
    /// Signed head yaw, roughly `[-1, 1]`; positive = look left. 0 when no
    /// face is tracked.
    pub head_yaw: f32,
    /// Signed head pitch, roughly `[-1, 1]`; positive = look up. 0 when no
    /// face is tracked.
    pub head_pitch: f32,
    /// Whether a face contributed pose this cycle.
    pub face_tracked: bool,
}

impl Default for GestureSnapshot {
    fn default() -> Self {
        GestureSnapshot {
            gesture:      Gesture::None,
            hand_count:   0,
            avg_pos:      NEUTRAL_POS,
            head_yaw:     0.0,
            head_pitch:   0.0,
            face_tracked: false,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Classifier
// ════════════════════════════════════════════════════════════════════════════

/// Classify one perception cycle.
///
/// Pure and synchronous: the snapshot depends only on the arguments.
/// Incomplete hand observations are dropped before counting; the hand and
/// face tracks are independent so either may be present without the other.
pub fn classify(frame: &HandFrame, face: Option<&FaceObservation>) -> GestureSnapshot {
    let valid: Vec<&HandObservation> = frame
        .hands
        .iter()
        .filter(|h| h.is_complete())
        .collect();

    let counts: Vec<u8> = valid.iter().filter_map(|h| finger_count(h)).collect();

    let (head_yaw, head_pitch, face_tracked) = match face.and_then(head_pose) {
        Some((yaw, pitch)) => (yaw, pitch, true),
        None               => (0.0, 0.0, false),
    };

    GestureSnapshot {
        gesture: resolve_gesture(&counts),
        hand_count: counts.len(),
        avg_pos: average_position(&valid),
        head_yaw,
        head_pitch,
        face_tracked,
    }
}

/// Count extended digits (0–5) on one hand.
///
/// Long fingers: extended iff wrist→tip distance exceeds wrist→proximal
/// distance — rotation-invariant, no "up" direction assumed. Thumb:
/// thumb-tip→index-base distance beyond [`THUMB_EXTENDED_DIST`].
///
/// Returns `None` if any required landmark is missing.
pub fn finger_count(hand: &HandObservation) -> Option<u8> {
    let wrist     = hand.get(WRIST)?;
    let thumb_tip = hand.get(THUMB_TIP)?;
    let index_mcp = hand.get(INDEX_MCP)?;

    let mut count = 0u8;
    for (pip, tip) in LONG_FINGERS {
        let pip = hand.get(pip)?;
        let tip = hand.get(tip)?;
        if wrist.dist(tip) > wrist.dist(pip) {
            count += 1;
        }
    }
    if thumb_tip.dist(index_mcp) > THUMB_EXTENDED_DIST {
        count += 1;
    }
    Some(count)
}

/// Resolve per-hand finger counts into a discrete gesture.
///
/// With two hands, the equal-count rule is checked first so `(4, 4)` reads
/// as `dual_4` rather than `dual_open`; open requires ≥ 4 on both with the
/// counts not forming a 1–4 match.
fn resolve_gesture(counts: &[u8]) -> Gesture {
    match counts {
        []  => Gesture::None,
        [_] => Gesture::Single,
        [a, b] => {
            if a == b && (1..=4).contains(a) {
                Gesture::Dual(*a)
            } else if *a >= 4 && *b >= 4 {
                Gesture::DualOpen
            } else if *a == 0 && *b == 0 {
                Gesture::DualFist
            } else {
                Gesture::Single
            }
        }
        // More than two hands should not reach us (the source caps at two);
        // treat it as the same ambiguous state a mismatch produces.
        _ => Gesture::Single,
    }
}

/// Mean wrist position over complete hands, x mirrored; neutral center when
/// no hands qualify.
fn average_position(hands: &[&HandObservation]) -> (f32, f32) {
    let mut n  = 0u32;
    let mut sx = 0.0f32;
    let mut sy = 0.0f32;
    for hand in hands {
        if let Some(wrist) = hand.get(WRIST) {
            sx += 1.0 - wrist.x;
            sy += wrist.y;
            n  += 1;
        }
    }
    if n == 0 {
        NEUTRAL_POS
    } else {
        (sx / n as f32, sy / n as f32)
    }
}

/// Head yaw/pitch from one face observation, or `None` if any of the five
/// reference landmarks is missing.
///
/// Yaw: horizontal nose-tip offset from the cheek midpoint, sign-inverted so
/// looking left yields positive yaw. Pitch: vertical offset from the
/// forehead/chin midpoint, sign-inverted (image y grows down) so looking up
/// yields positive pitch. Unbounded; normal head motion stays near `[-1, 1]`.
pub fn head_pose(face: &FaceObservation) -> Option<(f32, f32)> {
    let nose     = face.get(NOSE_TIP)?;
    let left     = face.get(LEFT_CHEEK)?;
    let right    = face.get(RIGHT_CHEEK)?;
    let forehead = face.get(FOREHEAD)?;
    let chin     = face.get(CHIN)?;

    let yaw   = -(nose.x - (left.x + right.x) * 0.5) * HEAD_YAW_SCALE;
    let pitch = -(nose.y - (forehead.y + chin.y) * 0.5) * HEAD_PITCH_SCALE;
    Some((yaw, pitch))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    // ── synthetic observations ────────────────────────────────────────────

    /// Hand with `fingers` digits extended, wrist at (0.5, 0.6).
    /// Counts 0–4 extend long fingers only; 5 extends the thumb too.
    fn synth_hand(fingers: u8) -> HandObservation {
        synth_hand_at(fingers, 0.5, 0.6)
    }

    fn synth_hand_at(fingers: u8, wx: f32, wy: f32) -> HandObservation {
        let mut lm = vec![Landmark::new(wx, wy, 0.0); HAND_LANDMARKS];
        lm[INDEX_MCP] = Landmark::new(wx - 0.04, wy - 0.10, 0.0);
        for (i, (pip, tip)) in LONG_FINGERS.iter().enumerate() {
            let x = wx - 0.06 + 0.04 * i as f32;
            lm[*pip] = Landmark::new(x, wy - 0.12, 0.0);
            let extended = (i as u8) < fingers.min(4);
            let tip_y = if extended { wy - 0.20 } else { wy - 0.05 };
            lm[*tip] = Landmark::new(x, tip_y, 0.0);
        }
        // Thumb: extended = well clear of the index base, curled = tucked in.
        lm[THUMB_TIP] = if fingers >= 5 {
            Landmark::new(wx - 0.14, wy - 0.12, 0.0)
        } else {
            Landmark::new(wx - 0.06, wy - 0.08, 0.0)
        };
        HandObservation::new(lm)
    }

    /// Face with the nose-tip displaced (dx, dy) from the reference midpoints.
    fn synth_face(dx: f32, dy: f32) -> FaceObservation {
        let mut lm = vec![Landmark::default(); FACE_LANDMARKS];
        lm[LEFT_CHEEK]  = Landmark::new(0.38, 0.50, 0.0);
        lm[RIGHT_CHEEK] = Landmark::new(0.62, 0.50, 0.0);
        lm[FOREHEAD]    = Landmark::new(0.50, 0.38, 0.0);
        lm[CHIN]        = Landmark::new(0.50, 0.62, 0.0);
        lm[NOSE_TIP]    = Landmark::new(0.50 + dx, 0.50 + dy, 0.0);
        FaceObservation::new(lm)
    }

    fn frame(hands: Vec<HandObservation>) -> HandFrame {
        HandFrame::new(hands)
    }

    // ── finger counting ───────────────────────────────────────────────────

    #[test]
    fn open_hand_counts_five() {
        assert_eq!(finger_count(&synth_hand(5)), Some(5));
    }

    #[test]
    fn fist_counts_zero() {
        assert_eq!(finger_count(&synth_hand(0)), Some(0));
    }

    #[test]
    fn partial_counts_match() {
        for k in 1..=4u8 {
            assert_eq!(finger_count(&synth_hand(k)), Some(k));
        }
    }

    #[test]
    fn thumb_needs_distance_from_index_base() {
        // Just inside the threshold → not counted.
        let mut hand = synth_hand(0);
        let mcp = hand.landmarks[INDEX_MCP];
        hand.landmarks[THUMB_TIP] = Landmark::new(mcp.x - 0.079, mcp.y, 0.0);
        assert_eq!(finger_count(&hand), Some(0));

        // Just beyond → counted.
        hand.landmarks[THUMB_TIP] = Landmark::new(mcp.x - 0.081, mcp.y, 0.0);
        assert_eq!(finger_count(&hand), Some(1));
    }

    #[test]
    fn incomplete_hand_yields_no_count() {
        let hand = HandObservation::new(vec![Landmark::default(); 10]);
        assert_eq!(finger_count(&hand), None);
    }

    // ── dual-hand resolution ──────────────────────────────────────────────

    #[test]
    fn matching_counts_make_dual_k() {
        for k in 1..=4u8 {
            let snap = classify(&frame(vec![synth_hand(k), synth_hand(k)]), None);
            assert_eq!(snap.gesture, Gesture::Dual(k));
            assert_eq!(snap.hand_count, 2);
        }
    }

    #[test]
    fn dual_labels() {
        assert_eq!(Gesture::Dual(2).label(), "dual_2");
        assert_eq!(Gesture::DualOpen.label(), "dual_open");
        assert_eq!(Gesture::DualFist.label(), "dual_fist");
        assert_eq!(Gesture::None.label(), "none");
    }

    #[test]
    fn both_open_is_dual_open() {
        let snap = classify(&frame(vec![synth_hand(5), synth_hand(5)]), None);
        assert_eq!(snap.gesture, Gesture::DualOpen);
    }

    #[test]
    fn five_and_four_is_dual_open() {
        let snap = classify(&frame(vec![synth_hand(5), synth_hand(4)]), None);
        assert_eq!(snap.gesture, Gesture::DualOpen);
    }

    #[test]
    fn four_and_four_is_dual_4() {
        // The equal-count rule wins over the ≥4 rule.
        let snap = classify(&frame(vec![synth_hand(4), synth_hand(4)]), None);
        assert_eq!(snap.gesture, Gesture::Dual(4));
    }

    #[test]
    fn both_fists_is_dual_fist() {
        let snap = classify(&frame(vec![synth_hand(0), synth_hand(0)]), None);
        assert_eq!(snap.gesture, Gesture::DualFist);
    }

    #[test]
    fn mismatched_counts_are_single() {
        for (a, b) in [(2u8, 5u8), (1, 3), (0, 1), (3, 5)] {
            let snap = classify(&frame(vec![synth_hand(a), synth_hand(b)]), None);
            assert_eq!(snap.gesture, Gesture::Single, "counts ({a},{b})");
        }
    }

    #[test]
    fn one_hand_is_single() {
        let snap = classify(&frame(vec![synth_hand(3)]), None);
        assert_eq!(snap.gesture, Gesture::Single);
        assert_eq!(snap.hand_count, 1);
    }

    #[test]
    fn empty_frame_is_none() {
        let snap = classify(&HandFrame::default(), None);
        assert_eq!(snap.gesture, Gesture::None);
        assert_eq!(snap.hand_count, 0);
        assert_eq!(snap.avg_pos, NEUTRAL_POS);
    }

    #[test]
    fn classification_is_idempotent() {
        let f = frame(vec![synth_hand(2), synth_hand(2)]);
        let face = synth_face(0.05, -0.02);
        let first = classify(&f, Some(&face));
        for _ in 0..5 {
            assert_eq!(classify(&f, Some(&face)), first);
        }
    }

    // ── degraded input ────────────────────────────────────────────────────

    #[test]
    fn incomplete_hand_is_dropped() {
        let short = HandObservation::new(vec![Landmark::default(); 7]);
        let snap = classify(&frame(vec![short, synth_hand(3)]), None);
        // Only the complete hand counts → single, hand_count 1.
        assert_eq!(snap.gesture, Gesture::Single);
        assert_eq!(snap.hand_count, 1);
    }

    #[test]
    fn two_incomplete_hands_resolve_to_none() {
        let a = HandObservation::new(vec![Landmark::default(); 3]);
        let b = HandObservation::new(Vec::new());
        let snap = classify(&frame(vec![a, b]), None);
        assert_eq!(snap.gesture, Gesture::None);
        assert_eq!(snap.avg_pos, NEUTRAL_POS);
    }

    // ── average position ──────────────────────────────────────────────────

    #[test]
    fn average_position_mirrors_x() {
        let snap = classify(&frame(vec![synth_hand_at(2, 0.3, 0.4)]), None);
        assert!((snap.avg_pos.0 - 0.7).abs() < 1e-6);
        assert!((snap.avg_pos.1 - 0.4).abs() < 1e-6);
    }

    #[test]
    fn average_position_means_two_hands() {
        let f = frame(vec![synth_hand_at(1, 0.2, 0.5), synth_hand_at(1, 0.4, 0.7)]);
        let snap = classify(&f, None);
        // Mirrored xs: 0.8 and 0.6 → 0.7; ys: 0.5 and 0.7 → 0.6.
        assert!((snap.avg_pos.0 - 0.7).abs() < 1e-6);
        assert!((snap.avg_pos.1 - 0.6).abs() < 1e-6);
    }

    // ── head pose ─────────────────────────────────────────────────────────

    #[test]
    fn head_yaw_sign_inverted() {
        // Nose right of the cheek midpoint → negative yaw.
        let (yaw, _) = head_pose(&synth_face(0.1, 0.0)).unwrap();
        assert!((yaw + 0.1 * HEAD_YAW_SCALE).abs() < 1e-5);
    }

    #[test]
    fn head_pitch_up_is_positive() {
        // Nose above the forehead/chin midpoint (smaller y) → positive pitch.
        let (_, pitch) = head_pose(&synth_face(0.0, -0.05)).unwrap();
        assert!((pitch - 0.05 * HEAD_PITCH_SCALE).abs() < 1e-5);
    }

    #[test]
    fn face_without_hands_still_reports_pose() {
        let face = synth_face(-0.05, 0.0);
        let snap = classify(&HandFrame::default(), Some(&face));
        assert_eq!(snap.gesture, Gesture::None);
        assert!(snap.face_tracked);
        assert!(snap.head_yaw > 0.0);
    }

    #[test]
    fn short_face_array_degrades_to_neutral() {
        let face = FaceObservation::new(vec![Landmark::default(); 50]);
        let snap = classify(&HandFrame::default(), Some(&face));
        assert!(!snap.face_tracked);
        assert_eq!(snap.head_yaw, 0.0);
        assert_eq!(snap.head_pitch, 0.0);
    }
}
