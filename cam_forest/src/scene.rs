//! Season styling and the falling-leaf particle field.
//!
//! Purely visual state: colors for the painter and a small particle sim
//! whose ground contacts drive leaf-impact sounds upstream.

use forest_nav::Season;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

// ════════════════════════════════════════════════════════════════════════════
// Season styling
// ════════════════════════════════════════════════════════════════════════════

/// ARGB palette for one season's backdrop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeasonStyle {
    pub sky:     u32,
    pub sun:     u32,
    pub horizon: u32,
    pub ground:  u32,
    pub trunk:   u32,
    pub foliage: u32,
    pub leaf:    u32,
}

pub fn season_style(season: Season) -> SeasonStyle {
    match season {
        Season::Spring => SeasonStyle {
            sky:     0xFF9ED9F0,
            sun:     0xFFFFF2B8,
            horizon: 0xFFC8EDDA,
            ground:  0xFF7FBF6F,
            trunk:   0xFF6F4F33,
            foliage: 0xFF8FD97A,
            leaf:    0xFFCFF2A8,
        },
        Season::Summer => SeasonStyle {
            sky:     0xFF55B0EC,
            sun:     0xFFFFE27A,
            horizon: 0xFFA8DCF0,
            ground:  0xFF4F9F4F,
            trunk:   0xFF5F4228,
            foliage: 0xFF2F7F3F,
            leaf:    0xFF6FBF5F,
        },
        Season::Autumn => SeasonStyle {
            sky:     0xFFD9A06F,
            sun:     0xFFFFBE6E,
            horizon: 0xFFEFC79A,
            ground:  0xFF8F6F3F,
            trunk:   0xFF55391F,
            foliage: 0xFFCF7F2F,
            leaf:    0xFFE8A03F,
        },
        Season::Winter => SeasonStyle {
            sky:     0xFFB8C8D8,
            sun:     0xFFF2F7FF,
            horizon: 0xFFDCE6EE,
            ground:  0xFFE8F0F8,
            trunk:   0xFF4A3C30,
            foliage: 0xFF6F7F8F,
            leaf:    0xFFF0F6FC,
        },
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeafField
// ════════════════════════════════════════════════════════════════════════════

/// Leaves (or snowflakes) spawned per second for each season.
pub fn spawn_rate(season: Season) -> f32 {
    match season {
        Season::Spring => 3.0,
        Season::Summer => 1.5,
        Season::Autumn => 14.0,
        Season::Winter => 6.0,
    }
}

const MAX_LEAVES: usize = 160;

/// One drifting leaf in normalized screen space.
#[derive(Clone, Copy, Debug)]
pub struct Leaf {
    pub x: f32,
    pub y: f32,
    fall:  f32,
    sway_phase: f32,
    sway_rate:  f32,
}

/// A field of falling leaves. `tick` advances the sim and reports how many
/// leaves reached the ground, which the app gates into impact sounds.
pub struct LeafField {
    leaves: Vec<Leaf>,
    rng:    SmallRng,
    pending: f32,
}

impl LeafField {
    pub fn new(seed: u64) -> LeafField {
        LeafField { leaves: Vec::new(), rng: SmallRng::seed_from_u64(seed), pending: 0.0 }
    }

    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    pub fn tick(&mut self, dt: f32, wind: f32, season: Season) -> u32 {
        self.pending += spawn_rate(season) * dt;
        while self.pending >= 1.0 {
            self.pending -= 1.0;
            if self.leaves.len() < MAX_LEAVES {
                let leaf = Leaf {
                    x: self.rng.gen_range(0.0..1.0),
                    y: self.rng.gen_range(-0.1..0.0),
                    fall: self.rng.gen_range(0.10..0.22),
                    sway_phase: self.rng.gen_range(0.0..std::f32::consts::TAU),
                    sway_rate: self.rng.gen_range(1.5..3.5),
                };
                self.leaves.push(leaf);
            }
        }

        let mut grounded = 0;
        for leaf in &mut self.leaves {
            leaf.sway_phase += leaf.sway_rate * dt;
            leaf.y += leaf.fall * (1.0 + wind * 0.6) * dt;
            leaf.x += (leaf.sway_phase.sin() * 0.03 + wind * 0.10) * dt;
            if leaf.x > 1.05 {
                leaf.x -= 1.1;
            }
        }
        self.leaves.retain(|leaf| {
            if leaf.y >= 1.0 {
                grounded += 1;
                false
            } else {
                true
            }
        });
        grounded
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autumn_sheds_the_most() {
        assert!(spawn_rate(Season::Autumn) > spawn_rate(Season::Winter));
        assert!(spawn_rate(Season::Winter) > spawn_rate(Season::Spring));
        assert!(spawn_rate(Season::Spring) > spawn_rate(Season::Summer));
    }

    #[test]
    fn leaves_fall_and_eventually_land() {
        let mut field = LeafField::new(7);
        let mut grounded = 0;
        for _ in 0..(20.0 / 0.016) as usize {
            grounded += field.tick(0.016, 0.0, Season::Autumn);
        }
        assert!(grounded > 0, "no leaf reached the ground in 20 s");
        assert!(!field.leaves().is_empty());
    }

    #[test]
    fn population_is_capped() {
        let mut field = LeafField::new(1);
        // Slow motion: huge spawn budget, almost no falling.
        for _ in 0..200 {
            field.tick(0.5, 0.0, Season::Autumn);
        }
        assert!(field.leaves().len() <= MAX_LEAVES);
    }

    #[test]
    fn wind_pushes_leaves_sideways() {
        // Same seed → identical spawns and sway; over a window too short for
        // any edge wrap, the only difference left is the wind drift.
        let mut calm = LeafField::new(3);
        let mut windy = LeafField::new(3);
        for _ in 0..10 {
            calm.tick(0.016, 0.0, Season::Autumn);
            windy.tick(0.016, 1.0, Season::Autumn);
        }
        assert_eq!(calm.leaves().len(), windy.leaves().len());
        assert!(!calm.leaves().is_empty());
        let mean_x = |f: &LeafField| {
            f.leaves().iter().map(|l| l.x).sum::<f32>() / f.leaves().len() as f32
        };
        assert!(mean_x(&windy) > mean_x(&calm));
    }

    #[test]
    fn each_season_has_its_own_sky() {
        let skies: Vec<u32> = Season::ALL.iter().map(|s| season_style(*s).sky).collect();
        for i in 0..skies.len() {
            for j in i + 1..skies.len() {
                assert_ne!(skies[i], skies[j]);
            }
        }
    }
}
