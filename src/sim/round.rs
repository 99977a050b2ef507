//! Round orchestrator
//!
//! One endless loop of phases. Every wait polls once per tick and has a
//! timeout; every failure rewinds to gathering after a fixed delay. This
//! module is the only writer of the phase.

use serde::{Deserialize, Serialize};

use super::hiding::{HideOutcome, UnhideGuard, UnhideOutcome, Visibility};
use super::human::HumanId;
use super::state::{GameEvent, GameState};
use crate::random_in_disc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundPhase {
    HumansGathering,
    WaitingForZombieToHide,
    HumansBoardingTrain,
    ZombieBoarding,
    RideInProgress,
    RideComplete,
    RideRestarting,
}

/// Running totals across rounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoundStats {
    pub rounds_started: u32,
    pub rides_started: u32,
    pub rides_completed: u32,
    pub gathering_panics: u32,
    pub hide_timeouts: u32,
    pub boarding_failures: u32,
    pub empty_boardings: u32,
    pub starvations: u32,
    pub humans_eaten: u32,
    pub humans_escaped: u32,
}

/// Where the current phase is in its own sequence
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
enum Step {
    Spawning { spawned: u32, timer: f32 },
    Settling { remaining: f32 },
    AwaitHide { waited: f32 },
    BoardingDelay { remaining: f32 },
    Boarding { elapsed: f32 },
    AwaitZombie { waited: f32 },
    Riding,
    Completing { remaining: f32 },
    Restarting { remaining: f32 },
    /// Abort path: wait out the delay, then gather again
    Retreat { remaining: f32 },
}

#[derive(Debug, Clone, Serialize)]
struct Departure {
    id: HumanId,
    remaining: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundState {
    phase: RoundPhase,
    step: Step,
    boarding_completed: bool,
    zombie_seated: bool,
    /// Authoritative list of humans taking part in this round
    roster: Vec<HumanId>,
    /// Panicked humans waiting to be cleaned up
    departing: Vec<Departure>,
    auto_hide_pending: bool,
    frame: u64,
    pub stats: RoundStats,
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundState {
    pub fn new() -> Self {
        Self {
            phase: RoundPhase::HumansGathering,
            step: Step::Spawning {
                spawned: 0,
                timer: 0.0,
            },
            boarding_completed: false,
            zombie_seated: false,
            roster: Vec::new(),
            departing: Vec::new(),
            auto_hide_pending: false,
            frame: 0,
            stats: RoundStats::default(),
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn boarding_completed(&self) -> bool {
        self.boarding_completed
    }

    /// The zombie came out into a seat before the ride started
    pub fn zombie_seated(&self) -> bool {
        self.zombie_seated
    }

    pub fn roster(&self) -> &[HumanId] {
        &self.roster
    }

    pub fn is_rostered(&self, id: HumanId) -> bool {
        self.roster.contains(&id)
    }

    pub fn is_departing(&self, id: HumanId) -> bool {
        self.departing.iter().any(|d| d.id == id)
    }

    /// Counting down to a restart after an abort
    pub fn is_retreating(&self) -> bool {
        matches!(self.step, Step::Retreat { .. })
    }
}

fn set_phase(state: &mut GameState, to: RoundPhase) {
    let from = state.round.phase;
    if from == to {
        return;
    }
    log::info!("Phase {:?} -> {:?}", from, to);
    state.round.phase = to;
    state.events.push(GameEvent::PhaseChanged { from, to });
}

/// Reset the world for a fresh round and start spawning
pub fn start_round(state: &mut GameState) {
    set_phase(state, RoundPhase::HumansGathering);
    state.clear_humans();

    let round = &mut state.round;
    round.roster.clear();
    round.departing.clear();
    round.boarding_completed = false;
    round.zombie_seated = false;
    round.auto_hide_pending = state.settings.round.auto_hide_on_round_start;
    round.step = Step::Spawning {
        spawned: 0,
        timer: 0.0,
    };
    round.stats.rounds_started += 1;

    let capacity = state.settings.passenger_capacity();
    if state.settings.round.humans_per_round as usize > capacity {
        log::warn!(
            "{} humans per round but only {} passenger seats; extras will be dismissed",
            state.settings.round.humans_per_round,
            capacity
        );
    }

    state.hunger.reset();
    state.hide_spot.force_to_center();
    log::info!("Round {} gathering", state.round.stats.rounds_started);
}

/// Advance the orchestrator by one tick
pub fn advance(state: &mut GameState, dt: f32) {
    state.round.frame += 1;
    prune_roster(state);
    try_auto_hide(state);
    process_departures(state, dt);

    if state.round.phase == RoundPhase::HumansGathering
        && !state.round.auto_hide_pending
        && !state.round.is_retreating()
        && state.hiding.visibility() == Visibility::Visible
    {
        log::warn!("Zombie seen while humans gather; they scatter");
        state.round.stats.gathering_panics += 1;
        state.events.push(GameEvent::GatheringPanicked);
        run_away(state);
        retreat(state);
    }

    run_step(state, dt);

    let interval = state.settings.round.stray_check_interval_frames.max(1);
    if state.round.frame % interval == 0 {
        reconcile_strays(state);
        audit_humans(state);
    }
}

fn run_step(state: &mut GameState, dt: f32) {
    match state.round.step {
        Step::Spawning { spawned, timer } => spawn_step(state, spawned, timer - dt),
        Step::Settling { remaining } => {
            let remaining = remaining - dt;
            if remaining > 0.0 {
                state.round.step = Step::Settling { remaining };
            } else {
                trim_roster(state);
                set_phase(state, RoundPhase::WaitingForZombieToHide);
                state.round.step = Step::AwaitHide { waited: 0.0 };
            }
        }
        Step::AwaitHide { waited } => {
            if state.hiding.visibility() == Visibility::Hidden {
                set_phase(state, RoundPhase::HumansBoardingTrain);
                state.hide_spot.force_to_center();
                state.round.step = Step::BoardingDelay {
                    remaining: state.settings.round.boarding_delay,
                };
                return;
            }
            let waited = waited + dt;
            if waited >= state.settings.round.wait_for_zombie_hiding_time {
                log::warn!("Zombie did not hide in time; humans flee");
                state.round.stats.hide_timeouts += 1;
                state.events.push(GameEvent::HideTimedOut);
                run_away(state);
                retreat(state);
            } else {
                state.round.step = Step::AwaitHide { waited };
            }
        }
        Step::BoardingDelay { remaining } => {
            if boarding_exposed(state) {
                return;
            }
            let remaining = remaining - dt;
            if remaining > 0.0 {
                state.round.step = Step::BoardingDelay { remaining };
            } else {
                assign_seats(state);
                state.round.step = Step::Boarding { elapsed: 0.0 };
            }
        }
        Step::Boarding { elapsed } => {
            if boarding_exposed(state) {
                return;
            }
            let elapsed = elapsed + dt;
            state.round.step = Step::Boarding { elapsed };
            let settled = state
                .round
                .roster
                .iter()
                .filter_map(|id| state.human(*id))
                .all(|h| h.is_seated() || !h.is_seeking_seat());
            let timed_out = elapsed >= state.settings.round.boarding_timeout;
            if timed_out && !settled {
                log::warn!("Boarding timed out; dismissing stragglers");
            }
            // Final check: only a fully hidden zombie lets boarding finish
            if (settled || timed_out) && state.hiding.visibility() == Visibility::Hidden {
                finish_boarding(state);
            }
        }
        Step::AwaitZombie { waited } => {
            match state.hiding.visibility() {
                Visibility::Visible => {
                    state.round.zombie_seated = state.zombie.seat.is_some();
                    begin_ride(state);
                    return;
                }
                Visibility::Hidden => request_unhide(state),
                Visibility::Hiding => {}
            }
            let waited = waited + dt;
            if waited >= state.settings.round.zombie_wait_time {
                log::warn!("Zombie did not take a seat in time; starting the ride anyway");
                begin_ride(state);
            } else {
                state.round.step = Step::AwaitZombie { waited };
            }
        }
        Step::Riding => {
            if state.hunger.update(dt) {
                starve(state);
                return;
            }
            let mut active = state.humans.iter().filter(|h| !h.is_finished());
            if active.all(|h| h.is_dead()) {
                complete_ride(state);
            }
        }
        Step::Completing { remaining } => {
            let remaining = remaining - dt;
            if remaining > 0.0 {
                state.round.step = Step::Completing { remaining };
            } else {
                set_phase(state, RoundPhase::RideRestarting);
                state.round.step = Step::Restarting {
                    remaining: state.settings.round.restart_delay,
                };
            }
        }
        Step::Restarting { remaining } | Step::Retreat { remaining } => {
            let remaining = remaining - dt;
            if remaining > 0.0 {
                state.round.step = match state.round.step {
                    Step::Restarting { .. } => Step::Restarting { remaining },
                    _ => Step::Retreat { remaining },
                };
            } else {
                start_round(state);
            }
        }
    }
}

fn spawn_step(state: &mut GameState, mut spawned: u32, mut timer: f32) {
    let target = state.settings.round.humans_per_round;
    if spawned < target && timer <= 0.0 {
        let tuning = &state.settings.round;
        let offset = random_in_disc(&mut state.rng, tuning.gathering_radius);
        let position = tuning.gathering_point + offset;
        let id = state.spawn_human(position);
        state.round.roster.push(id);
        spawned += 1;
        timer = state.settings.round.human_spawn_interval;
    }
    state.round.step = if spawned >= target {
        Step::Settling {
            remaining: state.settings.round.settle_time,
        }
    } else {
        Step::Spawning { spawned, timer }
    };
}

/// Keep at most `humans_per_round` humans; extras came in as strays
fn trim_roster(state: &mut GameState) {
    let limit = state.settings.round.humans_per_round as usize;
    if state.round.roster.len() <= limit {
        return;
    }
    let extra = state.round.roster.split_off(limit);
    log::warn!("Roster over capacity; removing {} humans", extra.len());
    for id in extra {
        state.destroy_human(id);
    }
}

fn try_auto_hide(state: &mut GameState) {
    if !state.round.auto_hide_pending {
        return;
    }
    let outcome =
        state
            .hiding
            .hide_zombie(&mut state.zombie, &mut state.coaster, state.scroll.as_ref());
    match outcome {
        HideOutcome::Started => {
            state.events.push(GameEvent::ZombieHiding);
            state.round.auto_hide_pending = false;
        }
        HideOutcome::AlreadyHidden => state.round.auto_hide_pending = false,
        HideOutcome::InTransition | HideOutcome::RailMoving => {}
    }
}

/// Boarding aborts the moment the zombie is fully visible
fn boarding_exposed(state: &mut GameState) -> bool {
    if state.hiding.visibility() != Visibility::Visible {
        return false;
    }
    log::warn!("Zombie exposed during boarding; humans flee");
    state.round.stats.boarding_failures += 1;
    state.round.boarding_completed = false;
    state.events.push(GameEvent::BoardingAborted);
    run_away(state);
    set_phase(state, RoundPhase::WaitingForZombieToHide);
    state.round.step = Step::AwaitHide { waited: 0.0 };
    true
}

/// Hand out free passenger seats, front to back, to rostered humans
/// without one
fn assign_seats(state: &mut GameState) {
    let GameState {
        coaster,
        humans,
        round,
        ..
    } = state;
    let taken: Vec<_> = humans.iter().filter_map(|h| h.assigned_seat()).collect();
    let mut free = coaster
        .passenger_seats()
        .into_iter()
        .filter(|id| coaster.seat(*id).is_some_and(|s| s.is_vacant()))
        .filter(|id| !taken.contains(id));

    for id in &round.roster {
        let Some(human) = humans.iter_mut().find(|h| h.id == *id) else {
            continue;
        };
        if human.is_seated() || human.is_seeking_seat() || human.is_screaming() {
            continue;
        }
        let Some(seat) = free.next() else {
            log::warn!("No seat left for {}", id);
            break;
        };
        human.assign_seat(seat);
    }
}

fn finish_boarding(state: &mut GameState) {
    let stragglers: Vec<HumanId> = state
        .round
        .roster
        .iter()
        .copied()
        .filter(|id| state.human(*id).is_some_and(|h| !h.is_seated()))
        .collect();
    for id in &stragglers {
        dismiss(state, *id);
    }
    state.round.roster.retain(|id| !stragglers.contains(id));

    if state.coaster.seated_count() == 0 {
        log::warn!("Nobody boarded; restarting");
        state.round.stats.empty_boardings += 1;
        state.events.push(GameEvent::NoHumansSeated);
        retreat(state);
        return;
    }

    log::info!("Boarding complete with {} seated", state.coaster.seated_count());
    state.round.boarding_completed = true;
    set_phase(state, RoundPhase::ZombieBoarding);
    state.round.step = Step::AwaitZombie { waited: 0.0 };
}

/// Send an unseated human off the platform
fn dismiss(state: &mut GameState, id: HumanId) {
    let GameState {
        humans,
        coaster,
        audio,
        settings,
        ..
    } = state;
    if let Some(human) = humans.iter_mut().find(|h| h.id == id) {
        if !human.jump_and_despawn(coaster, audio.as_mut(), &settings.human) {
            human.force_jump_and_despawn(coaster, audio.as_mut(), &settings.human);
        }
    }
}

fn request_unhide(state: &mut GameState) {
    let humans_panicking = state
        .round
        .roster
        .iter()
        .filter_map(|id| state.human(*id))
        .any(|h| h.is_screaming());
    let guard = UnhideGuard {
        phase: state.round.phase,
        boarding_completed: state.round.boarding_completed,
        humans_panicking,
    };
    match state.hiding.unhide_zombie(guard, &mut state.coaster) {
        UnhideOutcome::Started => log::info!("Zombie may board"),
        outcome => log::debug!("Unhide deferred: {:?}", outcome),
    }
}

fn begin_ride(state: &mut GameState) {
    set_phase(state, RoundPhase::RideInProgress);
    state.scroll.start_scrolling(state.settings.round.ride_speed);
    state.round.stats.rides_started += 1;
    state.events.push(GameEvent::RideStarted);
    state.round.step = Step::Riding;
}

fn starve(state: &mut GameState) {
    log::warn!("Zombie starved; everyone bails out");
    state.round.stats.starvations += 1;
    state.events.push(GameEvent::ZombieStarved);
    let GameState {
        humans,
        coaster,
        audio,
        settings,
        ..
    } = state;
    for human in humans.iter_mut() {
        human.force_jump_and_despawn(coaster, audio.as_mut(), &settings.human);
    }
    state.hunger.reset();
    complete_ride(state);
}

fn complete_ride(state: &mut GameState) {
    set_phase(state, RoundPhase::RideComplete);
    state.scroll.stop_scrolling();
    state.hide_spot.return_from_right(state.scroll.as_ref());
    state.round.stats.rides_completed += 1;
    state.events.push(GameEvent::RideCompleted);
    state.round.step = Step::Completing {
        remaining: state.settings.round.ride_complete_delay,
    };
}

fn retreat(state: &mut GameState) {
    state.round.boarding_completed = false;
    state.round.step = Step::Retreat {
        remaining: state.settings.round.restart_delay,
    };
}

/// Force every unseated rostered human to scream and run from the zombie.
/// A visible zombie also spreads the panic to unseated bystanders nearby.
fn run_away(state: &mut GameState) {
    let GameState {
        humans,
        round,
        audio,
        settings,
        zombie,
        hiding,
        events,
        ..
    } = state;
    let threat = zombie.position;
    let mut screamers = Vec::new();

    for human in humans.iter_mut() {
        if !round.roster.contains(&human.id) || human.is_seated() {
            continue;
        }
        if human.scream_and_run_away(threat, true, audio.as_mut(), &settings.human) {
            events.push(GameEvent::HumanPanicked { id: human.id });
        }
        screamers.push(human.position);
    }

    if hiding.visibility() == Visibility::Visible {
        let radius = settings.round.panic_radius;
        for human in humans.iter_mut() {
            if human.is_seated() || human.is_screaming() {
                continue;
            }
            let near = screamers.iter().any(|p| p.distance(human.position) <= radius);
            if near && human.scream_and_run_away(threat, false, audio.as_mut(), &settings.human) {
                events.push(GameEvent::HumanPanicked { id: human.id });
            }
        }
    }

    // Panicked humans leave the round and are cleaned up shortly
    let delay = settings.round.flee_cleanup_delay;
    let fleeing: Vec<HumanId> = humans
        .iter()
        .filter(|h| h.is_screaming() && !h.is_seated())
        .map(|h| h.id)
        .collect();
    for id in fleeing {
        round.roster.retain(|r| *r != id);
        if !round.departing.iter().any(|d| d.id == id) {
            round.departing.push(Departure {
                id,
                remaining: delay,
            });
        }
    }
}

fn process_departures(state: &mut GameState, dt: f32) {
    let mut due = Vec::new();
    state.round.departing.retain_mut(|d| {
        d.remaining -= dt;
        if d.remaining <= 0.0 {
            due.push(d.id);
            false
        } else {
            true
        }
    });
    for id in due {
        state.destroy_human(id);
    }
}

/// Drop roster entries whose human no longer exists
fn prune_roster(state: &mut GameState) {
    let GameState { round, humans, .. } = state;
    round.roster.retain(|id| humans.iter().any(|h| h.id == *id));
    round.departing.retain(|d| humans.iter().any(|h| h.id == d.id));
}

/// Adopt untracked humans while gathering; otherwise destroy the unseated
/// ones.
fn reconcile_strays(state: &mut GameState) {
    let strays: Vec<(HumanId, bool)> = state
        .humans
        .iter()
        .filter(|h| !h.is_finished() && !h.is_being_despawned())
        .filter(|h| !state.round.is_rostered(h.id) && !state.round.is_departing(h.id))
        .map(|h| (h.id, h.is_seated() || h.resting_seat().is_some()))
        .collect();

    for (id, in_seat) in strays {
        if state.round.phase == RoundPhase::HumansGathering {
            log::info!("Adopting stray {}", id);
            state.round.roster.push(id);
            state.events.push(GameEvent::StrayAdopted { id });
        } else if !in_seat {
            log::warn!("Removing stray {}", id);
            state.destroy_human(id);
            state.events.push(GameEvent::StrayRemoved { id });
        }
    }
}

fn audit_humans(state: &mut GameState) {
    let GameState {
        humans, coaster, ..
    } = state;
    let mismatched = humans
        .iter_mut()
        .filter(|h| !h.is_finished())
        .map(|h| h.audit(coaster))
        .filter(|ok| !ok)
        .count();
    if mismatched > 0 {
        log::error!("Repaired {} humans with inconsistent seats", mismatched);
    }
}
