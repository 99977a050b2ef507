//! Hide spot motion
//!
//! The hide spot is the click target the zombie retreats to. It sits at the
//! centre between rides, drifts left with the rail while the ride runs, and
//! glides back in from the right once the ride completes.

use glam::Vec2;
use serde::Serialize;

use super::round::RoundPhase;
use super::scroll::ScrollSignal;
use crate::consts::SCROLL_EPSILON;
use crate::settings::CoasterLayout;
use crate::smoothstep;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct Glide {
    from: Vec2,
    to: Vec2,
    elapsed: f32,
    duration: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HideSpot {
    pub position: Vec2,
    center: Vec2,
    offscreen_left: Vec2,
    offscreen_right: Vec2,
    return_duration: f32,
    click_radius: f32,
    glide: Option<Glide>,
}

impl HideSpot {
    pub fn new(layout: &CoasterLayout, click_radius: f32) -> Self {
        Self {
            position: layout.hide_spot_center,
            center: layout.hide_spot_center,
            offscreen_left: layout.hide_spot_offscreen_left,
            offscreen_right: layout.hide_spot_offscreen_right,
            return_duration: layout.hide_spot_return_duration,
            click_radius,
            glide: None,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn is_gliding(&self) -> bool {
        self.glide.is_some()
    }

    pub fn contains(&self, point: Vec2) -> bool {
        self.position.distance(point) <= self.click_radius
    }

    /// Cancel any glide and snap to the centre
    pub fn force_to_center(&mut self) {
        self.glide = None;
        self.position = self.center;
    }

    /// Jump off-screen right, then glide back to the centre. The glide is a
    /// quarter shorter while the rail is still changing speed.
    pub fn return_from_right(&mut self, scroll: &dyn ScrollSignal) {
        let duration = if scroll.is_transitioning() {
            self.return_duration * 0.75
        } else {
            self.return_duration
        };
        self.position = self.offscreen_right;
        self.glide = Some(Glide {
            from: self.offscreen_right,
            to: self.center,
            elapsed: 0.0,
            duration,
        });
    }

    pub fn update(&mut self, dt: f32, phase: RoundPhase, scroll: &dyn ScrollSignal) {
        if let Some(mut glide) = self.glide {
            glide.elapsed += dt;
            let t = if glide.duration > 0.0 {
                (glide.elapsed / glide.duration).min(1.0)
            } else {
                1.0
            };
            self.position = glide.from.lerp(glide.to, smoothstep(t));
            self.glide = (t < 1.0).then_some(glide);
            return;
        }

        if phase == RoundPhase::RideInProgress {
            let speed = scroll.scroll_speed();
            if speed.abs() > SCROLL_EPSILON {
                self.position.x = (self.position.x - speed * dt).max(self.offscreen_left.x);
            }
        } else if self.position != self.center {
            self.position = self.center;
        }
    }
}
