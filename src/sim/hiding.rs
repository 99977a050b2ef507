//! Zombie visibility protocol
//!
//! The zombie is always exactly one of Hidden, Hiding or Visible. Hiding
//! covers both directions of the transition and is a lock-out: nobody may
//! treat the zombie as hidden or as visible while it lasts. Humans panic on
//! Visible, the round only advances on Hidden.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::coaster::{Coaster, Seat, SeatId};
use super::round::RoundPhase;
use super::scroll::ScrollSignal;
use super::zombie::{Zombie, ZombieAction};
use crate::consts::SCROLL_EPSILON;
use crate::settings::ZombieTuning;
use crate::smoothstep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Hidden,
    /// Moving to or from the hide spot
    Hiding,
    Visible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HideOutcome {
    Started,
    AlreadyHidden,
    InTransition,
    /// The rail is scrolling; the zombie cannot leave the coaster
    RailMoving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnhideOutcome {
    Started,
    NotHidden,
    InTransition,
    /// Automatic reveal is only allowed while the zombie boards
    WrongPhase,
    BoardingIncomplete,
    HumansPanicking,
    /// The requested seat is not vacant
    SeatTaken,
}

/// Round facts the automatic reveal is gated on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnhideGuard {
    pub phase: RoundPhase,
    pub boarding_completed: bool,
    pub humans_panicking: bool,
}

/// Transition that just completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VisibilityEvent {
    Hidden,
    Revealed { seat: Option<SeatId> },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
enum Transition {
    Idle,
    Hiding { from: Vec2, elapsed: f32 },
    /// `target` is already reserved for the zombie
    Revealing { remaining: f32, target: Option<SeatId> },
}

#[derive(Debug, Clone, Serialize)]
pub struct ZombieHidingSystem {
    hidden: bool,
    transition: Transition,
    hide_move_duration: f32,
    unhide_delay: f32,
}

impl ZombieHidingSystem {
    /// Starts visible
    pub fn new(tuning: &ZombieTuning) -> Self {
        Self {
            hidden: false,
            transition: Transition::Idle,
            hide_move_duration: tuning.hide_move_duration,
            unhide_delay: tuning.unhide_delay,
        }
    }

    pub fn visibility(&self) -> Visibility {
        match (self.transition, self.hidden) {
            (Transition::Idle, true) => Visibility::Hidden,
            (Transition::Idle, false) => Visibility::Visible,
            _ => Visibility::Hiding,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.visibility() == Visibility::Hidden
    }

    pub fn is_hiding(&self) -> bool {
        self.visibility() == Visibility::Hiding
    }

    /// Send the zombie to the hide spot. Rejected mid-transition, when
    /// already hidden, and while the rail moves.
    pub fn hide_zombie(
        &mut self,
        zombie: &mut Zombie,
        coaster: &mut Coaster,
        scroll: &dyn ScrollSignal,
    ) -> HideOutcome {
        match self.visibility() {
            Visibility::Hiding => return HideOutcome::InTransition,
            Visibility::Hidden => return HideOutcome::AlreadyHidden,
            Visibility::Visible => {}
        }
        if scroll.scroll_speed().abs() > SCROLL_EPSILON || !scroll.is_stopped() {
            log::debug!("Cannot hide while the rail is moving");
            return HideOutcome::RailMoving;
        }

        coaster.clear_zombie_flags();
        zombie.seat = None;
        zombie.action = ZombieAction::Idle;
        zombie.escape_check = None;
        self.transition = Transition::Hiding {
            from: zombie.position,
            elapsed: 0.0,
        };
        log::info!("Zombie is hiding");
        HideOutcome::Started
    }

    /// Guarded automatic reveal into the rear cart
    pub fn unhide_zombie(&mut self, guard: UnhideGuard, coaster: &mut Coaster) -> UnhideOutcome {
        match self.visibility() {
            Visibility::Hiding => return UnhideOutcome::InTransition,
            Visibility::Visible => return UnhideOutcome::NotHidden,
            Visibility::Hidden => {}
        }
        if guard.phase != RoundPhase::ZombieBoarding {
            return UnhideOutcome::WrongPhase;
        }
        if !guard.boarding_completed {
            return UnhideOutcome::BoardingIncomplete;
        }
        if guard.humans_panicking {
            return UnhideOutcome::HumansPanicking;
        }

        let target = select_unhide_seat(coaster);
        if target.is_none() {
            log::warn!("No seat without a live human; zombie will appear in place");
        }
        self.begin_reveal(target, coaster);
        UnhideOutcome::Started
    }

    /// Player-driven reveal into a chosen vacant seat
    pub fn reveal_at(&mut self, seat: SeatId, coaster: &mut Coaster) -> UnhideOutcome {
        match self.visibility() {
            Visibility::Hiding => return UnhideOutcome::InTransition,
            Visibility::Visible => return UnhideOutcome::NotHidden,
            Visibility::Hidden => {}
        }
        if !coaster.seat(seat).is_some_and(Seat::is_vacant) {
            return UnhideOutcome::SeatTaken;
        }
        self.begin_reveal(Some(seat), coaster);
        UnhideOutcome::Started
    }

    fn begin_reveal(&mut self, target: Option<SeatId>, coaster: &mut Coaster) {
        if let Some(id) = target {
            if let Some(seat) = coaster.seat_mut(id) {
                seat.reserve_for_zombie(true);
            }
        }
        self.transition = Transition::Revealing {
            remaining: self.unhide_delay,
            target,
        };
        log::info!("Zombie is coming out toward {:?}", target);
    }

    /// Advance the running transition. While hidden the zombie follows the
    /// hide spot.
    pub fn update(
        &mut self,
        dt: f32,
        zombie: &mut Zombie,
        coaster: &mut Coaster,
        hide_position: Vec2,
    ) -> Option<VisibilityEvent> {
        match self.transition {
            Transition::Idle => {
                if self.hidden {
                    zombie.position = hide_position;
                }
                None
            }
            Transition::Hiding { from, elapsed } => {
                let elapsed = elapsed + dt;
                let t = if self.hide_move_duration > 0.0 {
                    (elapsed / self.hide_move_duration).min(1.0)
                } else {
                    1.0
                };
                zombie.position = from.lerp(hide_position, smoothstep(t));
                if t >= 1.0 {
                    self.hidden = true;
                    self.transition = Transition::Idle;
                    log::info!("Zombie is hidden");
                    Some(VisibilityEvent::Hidden)
                } else {
                    self.transition = Transition::Hiding { from, elapsed };
                    None
                }
            }
            Transition::Revealing { remaining, target } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.transition = Transition::Revealing { remaining, target };
                    return None;
                }
                let seat = commit_reveal_seat(target, coaster);
                if let Some(s) = seat.and_then(|id| coaster.seat(id)) {
                    zombie.position = s.position;
                }
                zombie.seat = seat;
                self.hidden = false;
                self.transition = Transition::Idle;
                log::info!("Zombie revealed in seat {:?}", seat);
                Some(VisibilityEvent::Revealed { seat })
            }
        }
    }
}

/// Seat for an automatic reveal: a strictly free rear seat, else a rear
/// seat without a live human, else any strictly free seat searching from
/// the rear forward.
pub fn select_unhide_seat(coaster: &Coaster) -> Option<SeatId> {
    let rear = coaster.rear_cart()?;
    let seats_of = |cart: usize| {
        let count = coaster.carts()[cart].seat_count();
        (0..count).map(move |seat| SeatId::new(cart, seat))
    };
    let vacant = |id: &SeatId| coaster.seat(*id).is_some_and(Seat::is_vacant);
    let no_live_human =
        |id: &SeatId| coaster.seat(*id).is_some_and(|s| s.occupying_human().is_none());

    seats_of(rear)
        .find(vacant)
        .or_else(|| seats_of(rear).find(no_live_human))
        .or_else(|| (0..rear).rev().flat_map(seats_of).find(vacant))
}

/// Re-validate the reserved seat at the moment the zombie sits down
fn commit_reveal_seat(target: Option<SeatId>, coaster: &mut Coaster) -> Option<SeatId> {
    if let Some(id) = target {
        if coaster.seat_mut(id).is_some_and(|s| s.settle_zombie()) {
            return Some(id);
        }
        log::warn!("Reserved seat {:?} was taken; picking another", id);
        if let Some(seat) = coaster.seat_mut(id) {
            seat.reserve_for_zombie(false);
        }
    }
    select_unhide_seat(coaster).filter(|id| {
        coaster.seat_mut(*id).is_some_and(|s| s.settle_zombie())
    })
}
