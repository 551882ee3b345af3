//! Software-rendered forest view using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ HUD: season/audio, gesture,    sky  (shifts with head pitch) │
//! │      head pose, position, wind                               │
//! │         ~~~~~~~~ horizon band ~~~~~~~~                       │
//! │   trees (parallax-shifted by yaw), falling leaves            │
//! │                  [hold-to-confirm bar]                       │
//! │ status bar                                                   │
//! │ key legend                                                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The window doubles as the simulation input device: keyboard and mouse
//! edit a [`SimPose`] that is sent to the perception thread whenever it
//! changes, and WASD is sampled directly each frame for camera keys.

use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};

use forest_nav::{CameraRig, NavKeys, Season, SeasonHold};
use gesture_stream::GestureSnapshot;

use crate::perception::SimPose;
use crate::scene::{season_style, LeafField, SeasonStyle};

use std::sync::mpsc::Sender;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W: usize = 960;
pub const WIN_H: usize = 540;
const STATUS_Y:  usize = WIN_H - 36;
const HUD_BG:    u32   = 0xFF10202C;
const TEXT_BG:   u32   = 0xFF0F3460;
const HOLD_COLOR: u32  = 0xFFFFD700; // gold
const HUD_TEXT:  u32   = 0xFFAADDFF;

/// Head pitch in radians → horizon shift in pixels. Looking up drops the
/// horizon, looking down raises it.
const HORIZON_SHIFT: f32 = 130.0;

/// Tree billboards as `(anchor x in [0,1), depth)`, far to near so near
/// trees overdraw far ones. Depth scales size, parallax, and how far below
/// the horizon the tree stands.
const TREES: [(f32, f32); 12] = [
    (0.08, 0.35), (0.52, 0.38), (0.81, 0.42), (0.30, 0.45),
    (0.65, 0.55), (0.12, 0.60), (0.93, 0.62), (0.44, 0.70),
    (0.73, 0.80), (0.22, 0.85), (0.58, 0.92), (0.04, 1.00),
];

/// Head nudge per arrow-key repeat, in classifier units.
const HEAD_STEP: f32 = 0.05;

// ════════════════════════════════════════════════════════════════════════════
// VisAction — inputs that belong to the app, not to the simulated pose
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisAction {
    ToggleAudio,
    CycleSeason,
    Bird,
    Leaf,
    Growth,
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    buf:    Vec<u32>,
    sim_tx: Sender<SimPose>,
    /// Pose the keyboard/mouse has built up; re-sent only on change.
    pose:   SimPose,
}

impl Visualizer {
    pub fn new(sim_tx: Sender<SimPose>) -> Result<Self, String> {
        let mut window = Window::new(
            "Cam Forest — Gesture-Steered Seasons",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| e.to_string())?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![0xFF000000; WIN_W * WIN_H],
            sim_tx,
            pose: SimPose::default(),
        })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll keyboard/mouse. Pose edits go to the perception thread (in
    /// hardware mode nobody listens and the send is dropped); app-level
    /// actions are returned to the caller.
    pub fn poll_input(&mut self) -> Vec<VisAction> {
        let mut actions = Vec::new();
        if !self.window.is_open() { return actions; }

        // Keys that trigger on first press only
        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        // Keys that repeat while held
        let held     = |k: Key| self.window.is_key_pressed(k, KeyRepeat::Yes);

        if one_shot(Key::Q) || one_shot(Key::Escape) {
            actions.push(VisAction::Quit);
        }
        if one_shot(Key::M) { actions.push(VisAction::ToggleAudio); }
        if one_shot(Key::R) { actions.push(VisAction::CycleSeason); }
        if one_shot(Key::B) { actions.push(VisAction::Bird); }
        if one_shot(Key::L) { actions.push(VisAction::Leaf); }
        if one_shot(Key::P) { actions.push(VisAction::Growth); }

        // ── simulated pose edits ──────────────────────────────────────────
        let mut pose = self.pose;

        for (key, k) in [
            (Key::Key1, 1u8),
            (Key::Key2, 2),
            (Key::Key3, 3),
            (Key::Key4, 4),
        ] {
            if one_shot(key) {
                pose.left_fingers  = Some(k);
                pose.right_fingers = Some(k);
            }
        }
        if one_shot(Key::O) {
            pose.left_fingers  = Some(5);
            pose.right_fingers = Some(5);
        }
        if one_shot(Key::F) {
            pose.left_fingers  = Some(0);
            pose.right_fingers = Some(0);
        }
        if one_shot(Key::G) {
            // Mismatched counts: present but unrecognized.
            pose.left_fingers  = Some(2);
            pose.right_fingers = Some(3);
        }
        if one_shot(Key::H) {
            // Toggle a lone hand in and out of frame.
            if pose.left_fingers.is_some() && pose.right_fingers.is_none() {
                pose.left_fingers = None;
            } else {
                pose.left_fingers  = Some(2);
                pose.right_fingers = None;
            }
        }
        if one_shot(Key::Key0) {
            pose.left_fingers  = None;
            pose.right_fingers = None;
        }

        if held(Key::Up)    { pose.head_pitch = (pose.head_pitch + HEAD_STEP).min(1.0); }
        if held(Key::Down)  { pose.head_pitch = (pose.head_pitch - HEAD_STEP).max(-1.0); }
        if held(Key::Left)  { pose.head_yaw   = (pose.head_yaw   + HEAD_STEP).min(1.0); }
        if held(Key::Right) { pose.head_yaw   = (pose.head_yaw   - HEAD_STEP).max(-1.0); }
        if one_shot(Key::C) {
            pose.head_yaw   = 0.0;
            pose.head_pitch = 0.0;
        }
        if one_shot(Key::N) { pose.face = !pose.face; }

        if let Some((mx, my)) = self.window.get_mouse_pos(MouseMode::Clamp) {
            pose.hand_pos = (mx / WIN_W as f32, my / WIN_H as f32);
        }

        if pose != self.pose {
            self.pose = pose;
            let _ = self.sim_tx.send(pose);
        }

        actions
    }

    /// Movement keys, sampled level-style (held = active) each frame.
    pub fn nav_keys(&self) -> NavKeys {
        NavKeys {
            forward: self.window.is_key_down(Key::W),
            back:    self.window.is_key_down(Key::S),
            left:    self.window.is_key_down(Key::A),
            right:   self.window.is_key_down(Key::D),
        }
    }

    /// Render one frame.
    pub fn render(
        &mut self,
        snap:   &GestureSnapshot,
        season: Season,
        hold:   &SeasonHold,
        rig:    &CameraRig,
        wind:   f32,
        leaves: &LeafField,
        status: &str,
        audio:  &str,
    ) {
        let style = season_style(season);

        // ── Sky / horizon / ground ────────────────────────────────────────
        let horizon = (WIN_H as f32 * 0.55 + rig.pitch * HORIZON_SHIFT)
            .clamp(WIN_H as f32 * 0.25, WIN_H as f32 * 0.85) as usize;
        self.buf.fill(style.sky);
        self.draw_sun(horizon, rig, style.sun);
        self.fill_rect(0, horizon, WIN_W, WIN_H - horizon, style.ground);
        self.fill_rect(0, horizon.saturating_sub(5), WIN_W, 10, style.horizon);

        // ── Trees ─────────────────────────────────────────────────────────
        for (base_x, depth) in TREES {
            self.draw_tree(base_x, depth, horizon, rig, &style);
        }

        // ── Falling leaves ────────────────────────────────────────────────
        for leaf in leaves.leaves() {
            let lx = (leaf.x.clamp(0.0, 1.0) * (WIN_W - 3) as f32) as usize;
            let ly = (leaf.y.clamp(0.0, 1.0) * (WIN_H - 3) as f32) as usize;
            self.fill_rect(lx, ly, 3, 3, style.leaf);
        }

        // ── HUD ───────────────────────────────────────────────────────────
        self.fill_rect(6, 6, 250, 74, HUD_BG);
        self.draw_label(
            &format!("season: {}   audio: {}", season.name(), audio),
            14, 14, 0xFFEEEEEE,
        );
        self.draw_label(
            &format!("gesture: {}   hands: {}", snap.gesture.label(), snap.hand_count),
            14, 26, HUD_TEXT,
        );
        self.draw_label(
            &format!("head {:+.2} {:+.2}", snap.head_yaw, snap.head_pitch),
            14, 38, HUD_TEXT,
        );
        self.draw_label(
            &format!(
                "pos {:+.1} {:+.1} {:+.1}  speed {:.1}",
                rig.position[0], rig.position[1], rig.position[2], rig.speed()
            ),
            14, 50, HUD_TEXT,
        );
        self.draw_label("wind", 14, 62, HUD_TEXT);
        self.draw_border(36, 61, 122, 7, 0xFF888888);
        let wind_px = (wind.clamp(0.0, 1.0) * 118.0) as usize;
        if wind_px > 0 {
            self.fill_rect(38, 63, wind_px, 3, 0xFFCCEEFF);
        }

        // ── Hold-to-confirm bar ───────────────────────────────────────────
        if let Some(target) = hold.target() {
            let bar_w = 180;
            let x0 = (WIN_W - bar_w) / 2;
            let y0 = STATUS_Y - 34;
            self.draw_label(&format!("hold for {}", target.name()), x0, y0 - 10, HOLD_COLOR);
            self.draw_border(x0, y0, bar_w, 12, HOLD_COLOR);
            let fill = (hold.progress() * (bar_w as f32 - 4.0)) as usize;
            if fill > 0 {
                self.fill_rect(x0 + 2, y0 + 2, fill, 8, HOLD_COLOR);
            }
        }

        // ── Status bar ────────────────────────────────────────────────────
        self.fill_rect(0, STATUS_Y, WIN_W, WIN_H - STATUS_Y, TEXT_BG);
        self.draw_label(status, 10, STATUS_Y + 6, 0xFFEEEEEE);

        // ── Key legend ────────────────────────────────────────────────────
        self.draw_label(
            "1-4=hold season  o=open  f=fist  g=mismatch  h=one hand  0=none  \
             arrows=head  c=recenter  n=face  mouse=hands  wasd=move  \
             m=audio  r=season  b/l/p=cues  q=quit",
            10, WIN_H - 14, 0xFF888888,
        );

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }

    // ── Sun ───────────────────────────────────────────────────────────────

    /// Sun disc. Pans with yaw like the trees but slower, and rides at a
    /// fixed fraction of the horizon height so pitch keeps it in the sky.
    fn draw_sun(&mut self, horizon: usize, rig: &CameraRig, color: u32) {
        let xf = (0.78 + rig.yaw * 0.05).rem_euclid(1.0);
        let cx = (xf * WIN_W as f32) as usize;
        let cy = (horizon as f32 * 0.38) as usize;
        let r = 22usize;

        for row in 0..=2 * r {
            let dy = row as i32 - r as i32;
            let span = ((r * r) as i32 - dy * dy).max(0) as f32;
            let half = span.sqrt() as usize;
            self.fill_rect(
                cx.saturating_sub(half),
                (cy + row).saturating_sub(r),
                half * 2 + 1,
                1,
                color,
            );
        }
    }

    // ── Trees ─────────────────────────────────────────────────────────────

    fn draw_tree(
        &mut self,
        base_x: f32,
        depth: f32,
        horizon: usize,
        rig: &CameraRig,
        style: &SeasonStyle,
    ) {
        // Yaw slides deeper trees further; strafing drifts them the other way.
        let xf = (base_x + rig.yaw * 0.16 * depth - rig.position[0] * 0.004 * depth)
            .rem_euclid(1.0);
        let cx = (xf * WIN_W as f32) as usize;
        let base_y = horizon + (depth * 46.0) as usize;

        let height   = (110.0 * depth + 26.0) as usize;
        let canopy_w = (52.0 * depth + 12.0) as usize;
        let trunk_w  = (5.0 * depth + 2.0) as usize;
        let trunk_h  = height / 3;
        let canopy_h = height - trunk_h;

        self.fill_rect(
            cx.saturating_sub(trunk_w / 2),
            base_y.saturating_sub(trunk_h),
            trunk_w,
            trunk_h,
            style.trunk,
        );

        // Canopy: apex-up triangle, one row at a time.
        let top = base_y.saturating_sub(height);
        for row in 0..canopy_h {
            let frac = (row + 1) as f32 / canopy_h as f32;
            let half = (canopy_w as f32 * frac * 0.5) as usize;
            self.fill_rect(cx.saturating_sub(half), top + row, half * 2 + 1, 1, style.foliage);
        }
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(WIN_H) {
            for col in x..(x + w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for col in x..(x + w).min(WIN_W) {
            if y < WIN_H       { self.buf[y         * WIN_W + col] = color; }
            if y + h - 1 < WIN_H { self.buf[(y + h - 1) * WIN_W + col] = color; }
        }
        for row in y..(y + h).min(WIN_H) {
            if x < WIN_W       { self.buf[row * WIN_W + x        ] = color; }
            if x + w - 1 < WIN_W { self.buf[row * WIN_W + x + w - 1] = color; }
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    /// Minimal bitmap font — 3×5 characters for HUD/label rendering.
    /// Each character is encoded as 5 rows × 3 bits.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.set_pixel(cx + col, y + row, color);
                    }
                }
            }
            cx += 4; // 3 wide + 1 gap
            if cx + 4 > WIN_W { break; }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '>' => [0b100, 0b010, 0b001, 0b010, 0b100],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}
