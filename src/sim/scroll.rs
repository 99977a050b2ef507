//! Rail and background scroll signal
//!
//! The coaster itself never moves; the world scrolls past it. The round
//! starts and stops scrolling at phase boundaries and the hiding protocol
//! refuses to hide the zombie while the rail is moving.

use serde::Serialize;

use crate::consts::SCROLL_EPSILON;
use crate::settings::ScrollTuning;

/// Motion signal consumed by the simulation
pub trait ScrollSignal {
    fn start_scrolling(&mut self, speed: f32);
    fn stop_scrolling(&mut self);
    /// Current rail speed
    fn scroll_speed(&self) -> f32;
    fn is_stopped(&self) -> bool;
    /// Accelerating or decelerating
    fn is_transitioning(&self) -> bool;
    fn update(&mut self, dt: f32);
}

/// Eased rail + background scroller
#[derive(Debug, Clone, Serialize)]
pub struct ScrollerManager {
    #[serde(skip)]
    tuning: ScrollTuning,
    rail_speed: f32,
    start_speed: f32,
    target_speed: f32,
    transition_time: f32,
    transitioning: bool,
    /// Accumulated rail travel, for parallax consumers
    pub rail_offset: f32,
    pub background_offset: f32,
}

impl ScrollerManager {
    pub fn new(tuning: ScrollTuning) -> Self {
        Self {
            tuning,
            rail_speed: 0.0,
            start_speed: 0.0,
            target_speed: 0.0,
            transition_time: 0.0,
            transitioning: false,
            rail_offset: 0.0,
            background_offset: 0.0,
        }
    }

    pub fn background_speed(&self) -> f32 {
        self.rail_speed * self.tuning.background_ratio
    }

    fn begin_transition(&mut self, target: f32) {
        self.start_speed = self.rail_speed;
        self.target_speed = target;
        self.transition_time = 0.0;
        self.transitioning = true;
        if self.tuning.transition_duration <= 0.0 {
            self.finish_transition();
        }
    }

    fn finish_transition(&mut self) {
        self.rail_speed = self.target_speed;
        self.transitioning = false;
    }

    /// Ease-in when speeding up, ease-out when slowing down
    fn eased(&self, t: f32) -> f32 {
        let p = self.tuning.easing_power.max(1.0);
        if self.target_speed.abs() >= self.start_speed.abs() {
            t.powf(p)
        } else {
            1.0 - (1.0 - t).powf(p)
        }
    }
}

impl ScrollSignal for ScrollerManager {
    fn start_scrolling(&mut self, speed: f32) {
        log::info!("Scrolling up to speed {speed}");
        self.begin_transition(speed);
    }

    fn stop_scrolling(&mut self) {
        log::info!("Scrolling to a stop");
        self.begin_transition(0.0);
    }

    fn scroll_speed(&self) -> f32 {
        self.rail_speed
    }

    fn is_stopped(&self) -> bool {
        !self.transitioning && self.rail_speed.abs() <= SCROLL_EPSILON
    }

    fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    fn update(&mut self, dt: f32) {
        if self.transitioning {
            self.transition_time += dt;
            let t = (self.transition_time / self.tuning.transition_duration).min(1.0);
            if t >= 1.0 {
                self.finish_transition();
            } else {
                let k = self.eased(t);
                self.rail_speed = self.start_speed + (self.target_speed - self.start_speed) * k;
            }
        }
        self.rail_offset += self.rail_speed * dt;
        self.background_offset += self.background_speed() * dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;

    fn run(scroller: &mut ScrollerManager, seconds: f32) {
        let steps = (seconds / SIM_DT).ceil() as u32;
        for _ in 0..steps {
            scroller.update(SIM_DT);
        }
    }

    #[test]
    fn test_starts_stopped() {
        let scroller = ScrollerManager::new(ScrollTuning::default());
        assert!(scroller.is_stopped());
        assert!(!scroller.is_transitioning());
    }

    #[test]
    fn test_accelerates_then_holds() {
        let mut scroller = ScrollerManager::new(ScrollTuning::default());
        scroller.start_scrolling(5.0);
        assert!(scroller.is_transitioning());
        assert!(!scroller.is_stopped());

        run(&mut scroller, 0.75);
        let mid = scroller.scroll_speed();
        // Ease-in stays below the linear ramp
        assert!(mid > 0.0 && mid < 2.5);

        run(&mut scroller, 1.0);
        assert!(!scroller.is_transitioning());
        assert_eq!(scroller.scroll_speed(), 5.0);
        assert!((scroller.background_speed() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_decelerates_to_stop() {
        let mut scroller = ScrollerManager::new(ScrollTuning::default());
        scroller.start_scrolling(5.0);
        run(&mut scroller, 2.0);
        scroller.stop_scrolling();
        assert!(!scroller.is_stopped());

        run(&mut scroller, 0.75);
        // Ease-out has already shed most of the speed
        assert!(scroller.scroll_speed() < 2.5);

        run(&mut scroller, 1.0);
        assert!(scroller.is_stopped());
        assert!(scroller.rail_offset > 0.0);
    }

    #[test]
    fn test_zero_duration_is_instant() {
        let tuning = ScrollTuning {
            transition_duration: 0.0,
            ..ScrollTuning::default()
        };
        let mut scroller = ScrollerManager::new(tuning);
        scroller.start_scrolling(3.0);
        assert_eq!(scroller.scroll_speed(), 3.0);
        assert!(!scroller.is_transitioning());
    }
}
