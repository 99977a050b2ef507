//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod coaster;
pub mod hide_spot;
pub mod hiding;
pub mod human;
pub mod hunger;
pub mod round;
pub mod scroll;
pub mod state;
pub mod tick;
pub mod zombie;

pub use coaster::{Cart, Coaster, Seat, SeatId};
pub use hide_spot::HideSpot;
pub use hiding::{HideOutcome, UnhideGuard, UnhideOutcome, Visibility, ZombieHidingSystem};
pub use human::{AttackOutcome, Human, HumanId, HumanState, SpookReason, Voice};
pub use hunger::HungerSystem;
pub use round::{RoundPhase, RoundStats};
pub use scroll::{ScrollSignal, ScrollerManager};
pub use state::{GameEvent, GameState, HumanSnapshot, RoundSnapshot};
pub use tick::{TickInput, tick};
pub use zombie::{ClickAction, Zombie, ZombieAction};
