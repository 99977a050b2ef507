//! Zombie hunger
//!
//! Hunger climbs at a fixed rate while the ride runs and drops by a fixed
//! amount per human eaten. A full meter means the zombie starved and the
//! ride is lost.

use serde::Serialize;

use crate::settings::HungerTuning;

#[derive(Debug, Clone, Serialize)]
pub struct HungerSystem {
    current: f32,
    max: f32,
    increase_rate: f32,
    decrease_per_head: f32,
    heads_eaten: u32,
    starved: bool,
}

impl HungerSystem {
    pub fn new(tuning: &HungerTuning) -> Self {
        Self {
            current: 0.0,
            max: tuning.max_hunger.max(0.0),
            increase_rate: tuning.increase_rate,
            decrease_per_head: tuning.decrease_per_head,
            heads_eaten: 0,
            starved: false,
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    /// Fill level in `[0, 1]`
    pub fn fraction(&self) -> f32 {
        if self.max > 0.0 { self.current / self.max } else { 1.0 }
    }

    pub fn heads_eaten(&self) -> u32 {
        self.heads_eaten
    }

    pub fn is_starved(&self) -> bool {
        self.starved
    }

    /// Grow hunger by `dt` seconds. Returns true on the step the meter fills.
    pub fn update(&mut self, dt: f32) -> bool {
        if self.starved {
            return false;
        }
        self.current = (self.current + self.increase_rate * dt).min(self.max);
        if self.current >= self.max {
            self.starved = true;
            log::info!("Zombie starved after {} heads", self.heads_eaten);
            return true;
        }
        false
    }

    /// One human eaten
    pub fn feed(&mut self) {
        self.current = (self.current - self.decrease_per_head).max(0.0);
        self.heads_eaten += 1;
        log::debug!("Hunger down to {:.1} ({} heads)", self.current, self.heads_eaten);
    }

    pub fn reset(&mut self) {
        self.current = 0.0;
        self.starved = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_lowers_and_counts() {
        let mut hunger = HungerSystem::new(&HungerTuning::default());
        hunger.update(5.0);
        assert_eq!(hunger.current(), 40.0);
        hunger.feed();
        assert_eq!(hunger.current(), 15.0);
        hunger.feed();
        assert_eq!(hunger.current(), 0.0);
        assert_eq!(hunger.heads_eaten(), 2);
    }

    #[test]
    fn test_starves_once() {
        let mut hunger = HungerSystem::new(&HungerTuning::default());
        assert!(!hunger.update(12.0));
        assert!(hunger.update(1.0));
        assert!(hunger.is_starved());
        assert_eq!(hunger.fraction(), 1.0);
        assert!(!hunger.update(1.0));

        hunger.reset();
        assert!(!hunger.is_starved());
        assert_eq!(hunger.current(), 0.0);
    }
}
