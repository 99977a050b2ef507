//! Coaster Zombie - a hidden-zombie roller-coaster arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (round phases, humans, zombie, seats)
//! - `settings`: Data-driven timings and balance
//! - `audio`: Named audio cue sink

pub mod audio;
pub mod settings;
pub mod sim;

pub use audio::{AudioManager, AudioSink, SoundCue};
pub use settings::{Settings, SettingsError};

use glam::Vec2;
use rand::Rng;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Scroll speed at or below which the rail counts as stopped
    pub const SCROLL_EPSILON: f32 = 0.01;
}

/// Random duration in `[min, max)`, or `min` when the range is empty
#[inline]
pub fn roll_duration(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.random_range(min..max)
    } else {
        min
    }
}

/// Random unit vector (falls back to +X for a degenerate draw)
#[inline]
pub fn random_direction(rng: &mut impl Rng) -> Vec2 {
    Vec2::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0))
        .try_normalize()
        .unwrap_or(Vec2::X)
}

/// Random point inside a disc of the given radius
#[inline]
pub fn random_in_disc(rng: &mut impl Rng, radius: f32) -> Vec2 {
    let dir = random_direction(rng);
    dir * radius * rng.random::<f32>().sqrt()
}

/// Height of a parabolic hop at normalized time `t` (peaks at `t = 0.5`)
#[inline]
pub fn hop_height(t: f32, peak: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    4.0 * peak * t * (1.0 - t)
}

/// Smoothstep easing on `[0, 1]`
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_roll_duration_bounds() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..100 {
            let d = roll_duration(&mut rng, 2.0, 5.0);
            assert!((2.0..5.0).contains(&d));
        }
        assert_eq!(roll_duration(&mut rng, 3.0, 3.0), 3.0);
        assert_eq!(roll_duration(&mut rng, 4.0, 1.0), 4.0);
    }

    #[test]
    fn test_random_direction_is_unit() {
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..50 {
            assert!((random_direction(&mut rng).length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_hop_height_shape() {
        assert_eq!(hop_height(0.0, 2.0), 0.0);
        assert!((hop_height(0.5, 2.0) - 2.0).abs() < 1e-6);
        assert_eq!(hop_height(1.0, 2.0), 0.0);
    }
}
