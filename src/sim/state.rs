//! Game state and world container
//!
//! Everything the fixed-step tick reads or writes lives in `GameState`.
//! External collaborators (scroll signal, audio sink) are boxed trait
//! objects so hosts can swap in their own.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use super::coaster::{Coaster, SeatId};
use super::hide_spot::HideSpot;
use super::hiding::{Visibility, ZombieHidingSystem};
use super::human::{Human, HumanId, HumanState, SpookReason, Voice};
use super::hunger::HungerSystem;
use super::round::{self, RoundPhase, RoundState, RoundStats};
use super::scroll::{ScrollSignal, ScrollerManager};
use super::zombie::Zombie;
use crate::audio::{AudioManager, AudioSink};
use crate::settings::Settings;

/// Something observable happened during a tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum GameEvent {
    PhaseChanged { from: RoundPhase, to: RoundPhase },
    HumanSpawned { id: HumanId },
    HumanSeated { id: HumanId, seat: SeatId },
    HumanPanicked { id: HumanId },
    HumanJumped { id: HumanId, reason: SpookReason },
    HumanKilled { id: HumanId },
    HumanEscaped { id: HumanId },
    HumanDespawned { id: HumanId },
    CorpseThrown { id: HumanId },
    ZombieHiding,
    ZombieHidden,
    ZombieRevealed { seat: Option<SeatId> },
    ZombieMoved { seat: SeatId },
    GatheringPanicked,
    BoardingAborted,
    HideTimedOut,
    NoHumansSeated,
    ZombieStarved,
    RideStarted,
    RideCompleted,
    StrayAdopted { id: HumanId },
    StrayRemoved { id: HumanId },
}

/// Per-human view for presentation layers
#[derive(Debug, Clone, Serialize)]
pub struct HumanSnapshot {
    pub id: HumanId,
    pub state: HumanState,
    pub position: Vec2,
    pub seat: Option<SeatId>,
    pub screaming: bool,
    pub despawning: bool,
}

/// Pollable summary of the whole round
#[derive(Debug, Clone, Serialize)]
pub struct RoundSnapshot {
    pub tick: u64,
    pub phase: RoundPhase,
    pub visibility: Visibility,
    pub boarding_completed: bool,
    pub zombie_seat: Option<SeatId>,
    pub zombie_position: Vec2,
    pub hide_spot: Vec2,
    pub hunger: f32,
    pub heads_eaten: u32,
    pub scroll_speed: f32,
    pub humans: Vec<HumanSnapshot>,
    pub stats: RoundStats,
}

/// Complete game state
pub struct GameState {
    pub settings: Settings,
    pub coaster: Coaster,
    /// Every live human instance, rostered or not
    pub humans: Vec<Human>,
    pub zombie: Zombie,
    pub hiding: ZombieHidingSystem,
    pub hunger: HungerSystem,
    pub hide_spot: HideSpot,
    pub round: RoundState,
    pub(crate) scroll: Box<dyn ScrollSignal>,
    pub(crate) audio: Box<dyn AudioSink>,
    pub(crate) rng: Pcg32,
    /// Simulation time in ticks
    pub time_ticks: u64,
    pub(crate) events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    /// New game with the built-in scroller and audio tracker
    pub fn new(settings: Settings) -> Self {
        let scroll = Box::new(ScrollerManager::new(settings.scroll.clone()));
        let audio = Box::new(AudioManager::from_settings(&settings.audio));
        Self::with_services(settings, scroll, audio)
    }

    pub fn with_services(
        settings: Settings,
        scroll: Box<dyn ScrollSignal>,
        audio: Box<dyn AudioSink>,
    ) -> Self {
        let mut coaster = Coaster::new(&settings.coaster);
        let hide_spot = HideSpot::new(&settings.coaster, settings.zombie.hide_spot_click_radius);
        // The zombie waits in the rear cart until the first auto-hide
        let zombie = match coaster.rear_cart() {
            Some(rear) => Zombie::seated_at(SeatId::new(rear, 0), &mut coaster),
            None => Zombie::new(hide_spot.position),
        };

        let mut state = Self {
            rng: Pcg32::seed_from_u64(settings.seed),
            coaster,
            humans: Vec::new(),
            zombie,
            hiding: ZombieHidingSystem::new(&settings.zombie),
            hunger: HungerSystem::new(&settings.hunger),
            hide_spot,
            round: RoundState::new(),
            scroll,
            audio,
            time_ticks: 0,
            events: Vec::new(),
            next_id: 1,
            settings,
        };
        round::start_round(&mut state);
        state
    }

    /// Get next entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Create a human at `position` with a random voice. The human is not
    /// rostered; the round decides whether to track it.
    pub fn spawn_human(&mut self, position: Vec2) -> HumanId {
        let id = HumanId(self.next_entity_id());
        let voice = if self.rng.random::<bool>() {
            Voice::Male
        } else {
            Voice::Female
        };
        let human = Human::new(id, position, voice, &self.settings.human, &mut self.rng);
        self.humans.push(human);
        self.events.push(GameEvent::HumanSpawned { id });
        log::debug!("Spawned {} at {:?}", id, position);
        id
    }

    pub fn human(&self, id: HumanId) -> Option<&Human> {
        self.humans.iter().find(|h| h.id == id)
    }

    /// Remove a human instance right away, releasing its seat
    pub fn destroy_human(&mut self, id: HumanId) -> bool {
        let Some(index) = self.humans.iter().position(|h| h.id == id) else {
            return false;
        };
        let mut human = self.humans.remove(index);
        human.despawn(&mut self.coaster);
        self.events.push(GameEvent::HumanDespawned { id });
        true
    }

    /// Drop every human and every seat reference to one
    pub fn clear_humans(&mut self) {
        self.humans.clear();
        self.coaster.clear_humans();
    }

    pub fn phase(&self) -> RoundPhase {
        self.round.phase()
    }

    pub fn visibility(&self) -> Visibility {
        self.hiding.visibility()
    }

    pub fn scroll(&self) -> &dyn ScrollSignal {
        self.scroll.as_ref()
    }

    pub fn audio(&self) -> &dyn AudioSink {
        self.audio.as_ref()
    }

    /// Take the events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            tick: self.time_ticks,
            phase: self.round.phase(),
            visibility: self.hiding.visibility(),
            boarding_completed: self.round.boarding_completed(),
            zombie_seat: self.zombie.seat,
            zombie_position: self.zombie.position,
            hide_spot: self.hide_spot.position,
            hunger: self.hunger.current(),
            heads_eaten: self.hunger.heads_eaten(),
            scroll_speed: self.scroll.scroll_speed(),
            humans: self
                .humans
                .iter()
                .map(|h| HumanSnapshot {
                    id: h.id,
                    state: h.state(),
                    position: h.position,
                    seat: h.occupied_seat().or(h.resting_seat()),
                    screaming: h.is_screaming(),
                    despawning: h.is_being_despawned(),
                })
                .collect(),
            stats: self.round.stats,
        }
    }
}
