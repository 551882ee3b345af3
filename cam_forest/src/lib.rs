//! # cam_forest
//!
//! Gesture-controlled walkthrough of a seasonal forest: a perception source
//! streams hand and face observations, held finger-count gestures switch the
//! season, head pose and hand position steer the camera, and the
//! `forest_audio` engine renders a matching ambience.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Hands | Action |
//! |---|---|---|
//! | Hold k fingers on both hands (k = 1–4) | Both | After 1.5 s, switch to the mapped season |
//! | Both hands open | Both | Fly forward |
//! | Both hands fisted | Both | Drift backward and build wind |
//! | One hand visible | One | Strafe/lift toward the hand position |
//! | Head turn / tilt | — | Look around (yaw / pitch) |
//!
//! ## Feature flags
//!
//! * (default) — **Simulation mode**: keyboard and mouse stand in for the
//!   camera; no tracking hardware needed.
//! * `leap` — **Hardware mode**: hand observations from a LeapMotion
//!   controller via LeapC (head pose stays neutral — no face source).
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Effect |
//! |---|---|
//! | `1`–`4` | Both hands show that finger count (hold to switch season) |
//! | `O` / `F` | Both hands open / both fisted |
//! | `G` | Mismatched counts (ambiguous pair) |
//! | `H` | Toggle a single hand |
//! | `0` | Clear all hands |
//! | Mouse | Hand position on screen |
//! | Arrows | Head yaw / pitch |
//! | `C` | Recenter head pose |
//! | `N` | Toggle face tracking |
//! | `W`/`A`/`S`/`D` | Keyboard navigation |
//! | `M` | Toggle audio engine |
//! | `R` | Cycle season directly |
//! | `B` / `L` / `P` | Trigger bird / leaf / growth sound |
//! | `Q` / `Esc` | Quit |

pub mod app;
pub mod perception;
pub mod scene;
pub mod visualizer;
