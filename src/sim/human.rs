//! Human agent
//!
//! Every human runs two orthogonal tracks. The posture track alternates
//! Vulnerable and Defensive on a randomized timer while the ride is in
//! progress. The self-preservation track walks to an assigned seat, screams
//! and flees from a visible zombie, and jumps off the coaster when the seat
//! next to it turns scary. `Dead` is absorbing on both tracks.
//!
//! All timed behavior is an explicit reaction state advanced by `tick`, so
//! starting a new reaction always replaces the previous one.

use glam::Vec2;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::coaster::{Coaster, SeatId};
use super::hiding::Visibility;
use super::round::RoundPhase;
use super::state::GameEvent;
use crate::audio::{AudioSink, SoundCue};
use crate::settings::HumanTuning;
use crate::{hop_height, random_direction, roll_duration};

/// Stable human identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HumanId(pub u32);

impl std::fmt::Display for HumanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "human#{}", self.0)
    }
}

/// Primary lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HumanState {
    /// An attack kills instantly
    Vulnerable,
    /// An attack only scares the human off the ride
    Defensive,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Voice {
    Male,
    Female,
}

impl Voice {
    pub fn scream(self) -> SoundCue {
        match self {
            Voice::Male => SoundCue::ManScream,
            Voice::Female => SoundCue::WomanScream,
        }
    }

    pub fn jump(self) -> SoundCue {
        match self {
            Voice::Male => SoundCue::ManJump,
            Voice::Female => SoundCue::WomanJump,
        }
    }
}

/// What the human saw in the seat next to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpookReason {
    AdjacentZombie,
    EmptySeat,
    DeadBody,
}

/// Result of the zombie going for a human
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttackOutcome {
    /// Vulnerable target died in its seat
    Killed,
    /// Defensive target bailed out of the ride
    Escaped,
    /// Target is already dead or mid-escape
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
enum Reaction {
    Idle,
    Screaming { remaining: f32, threat: Vec2 },
    Fleeing { target: Vec2, recover: f32 },
    Jumping { elapsed: f32, duration: f32, base: Vec2 },
    Thrown { elapsed: f32, duration: f32, from: Vec2, to: Vec2 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct PendingJump {
    remaining: f32,
    reason: SpookReason,
}

/// Everything a human reads or touches during its tick
pub struct HumanContext<'a> {
    pub phase: RoundPhase,
    pub visibility: Visibility,
    pub zombie_position: Vec2,
    pub tuning: &'a HumanTuning,
    pub coaster: &'a mut Coaster,
    pub audio: &'a mut dyn AudioSink,
    pub rng: &'a mut Pcg32,
    pub events: &'a mut Vec<GameEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Human {
    pub id: HumanId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub voice: Voice,
    state: HumanState,
    /// Time left in the current posture
    state_timer: f32,
    /// Seat the human is walking toward
    assigned_seat: Option<SeatId>,
    /// Seat the human is sitting in
    occupied_seat: Option<SeatId>,
    /// Seat holding this human's body
    resting_seat: Option<SeatId>,
    reaction: Reaction,
    screaming: bool,
    being_despawned: bool,
    collider_enabled: bool,
    finished: bool,
    /// Time the zombie has been visible while walking to a seat
    exposure: f32,
    zombie_check_timer: f32,
    defensive_check_timer: f32,
    pending_jump: Option<PendingJump>,
}

impl Human {
    pub fn new(
        id: HumanId,
        position: Vec2,
        voice: Voice,
        tuning: &HumanTuning,
        rng: &mut Pcg32,
    ) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            voice,
            state: HumanState::Vulnerable,
            state_timer: roll_duration(rng, tuning.min_vulnerable, tuning.max_vulnerable),
            assigned_seat: None,
            occupied_seat: None,
            resting_seat: None,
            reaction: Reaction::Idle,
            screaming: false,
            being_despawned: false,
            collider_enabled: true,
            finished: false,
            exposure: 0.0,
            zombie_check_timer: tuning.zombie_detection_delay,
            defensive_check_timer: tuning.defensive_jump_delay,
            pending_jump: None,
        }
    }

    pub fn state(&self) -> HumanState {
        self.state
    }

    pub fn is_dead(&self) -> bool {
        self.state == HumanState::Dead
    }

    /// Seated means a committed seat that lists this human as occupant
    pub fn is_seated(&self) -> bool {
        self.occupied_seat.is_some()
    }

    pub fn assigned_seat(&self) -> Option<SeatId> {
        self.assigned_seat
    }

    pub fn occupied_seat(&self) -> Option<SeatId> {
        self.occupied_seat
    }

    pub fn resting_seat(&self) -> Option<SeatId> {
        self.resting_seat
    }

    pub fn is_screaming(&self) -> bool {
        self.screaming
    }

    pub fn is_being_despawned(&self) -> bool {
        self.being_despawned
    }

    pub fn collider_enabled(&self) -> bool {
        self.collider_enabled
    }

    /// Despawn animation done; the owner should drop this human
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Walking toward an assigned seat
    pub fn is_seeking_seat(&self) -> bool {
        self.assigned_seat.is_some() && self.occupied_seat.is_none()
    }

    /// Start walking toward `seat`
    pub fn assign_seat(&mut self, seat: SeatId) -> bool {
        if self.is_dead() || self.being_despawned || self.is_seated() {
            return false;
        }
        log::debug!("{} assigned to seat {:?}", self.id, seat);
        self.assigned_seat = Some(seat);
        self.exposure = 0.0;
        true
    }

    /// Commit to `seat`, re-validating that it is still vacant
    pub fn occupy_seat(
        &mut self,
        seat_id: SeatId,
        coaster: &mut Coaster,
        events: &mut Vec<GameEvent>,
    ) -> bool {
        if self.is_dead() || self.being_despawned || self.is_seated() {
            return false;
        }
        let Some(seat) = coaster.seat_mut(seat_id) else {
            self.assigned_seat = None;
            return false;
        };
        if !seat.try_occupy(self.id) {
            log::debug!("{} found seat {:?} taken on arrival", self.id, seat_id);
            self.assigned_seat = None;
            return false;
        }

        self.position = seat.position;
        self.occupied_seat = Some(seat_id);
        self.assigned_seat = None;
        self.velocity = Vec2::ZERO;
        self.screaming = false;
        self.reaction = Reaction::Idle;
        self.exposure = 0.0;
        events.push(GameEvent::HumanSeated {
            id: self.id,
            seat: seat_id,
        });
        true
    }

    /// Scream, then run a short way from `threat`.
    ///
    /// Ignored for dead, departing and seated humans, and for humans already
    /// screaming unless `force` is set. Forcing also drops any seat assignment.
    pub fn scream_and_run_away(
        &mut self,
        threat: Vec2,
        force: bool,
        audio: &mut dyn AudioSink,
        tuning: &HumanTuning,
    ) -> bool {
        if self.being_despawned || self.is_dead() || self.is_seated() {
            return false;
        }
        if self.screaming && !force {
            return false;
        }
        if force {
            self.assigned_seat = None;
        }

        self.screaming = true;
        self.velocity = Vec2::ZERO;
        self.pending_jump = None;
        self.reaction = Reaction::Screaming {
            remaining: tuning.scream_duration,
            threat,
        };
        audio.play(self.voice.scream().name());
        true
    }

    /// Hop off the ride and despawn. Refused while screaming.
    pub fn jump_and_despawn(
        &mut self,
        coaster: &mut Coaster,
        audio: &mut dyn AudioSink,
        tuning: &HumanTuning,
    ) -> bool {
        if self.being_despawned || self.is_dead() || self.screaming {
            return false;
        }
        self.begin_jump(coaster, audio, tuning.jump_duration);
        true
    }

    /// Quick hop off regardless of scream state; also clears corpses
    pub fn force_jump_and_despawn(
        &mut self,
        coaster: &mut Coaster,
        audio: &mut dyn AudioSink,
        tuning: &HumanTuning,
    ) -> bool {
        if self.being_despawned || self.finished {
            return false;
        }
        self.begin_jump(coaster, audio, tuning.force_jump_duration);
        true
    }

    /// Escape a failed attack: dead to the round at once, then hop away
    pub fn escape_and_despawn(
        &mut self,
        coaster: &mut Coaster,
        audio: &mut dyn AudioSink,
        tuning: &HumanTuning,
    ) -> bool {
        if self.is_dead() {
            return false;
        }
        self.state = HumanState::Dead;
        self.pending_jump = None;
        if self.being_despawned {
            self.vacate(coaster);
        } else {
            self.begin_jump(coaster, audio, tuning.force_jump_duration);
        }
        true
    }

    /// Killed by the zombie. The body stays in the seat as a corpse.
    pub fn die(&mut self, coaster: &mut Coaster) -> AttackOutcome {
        if self.is_dead() || self.being_despawned || self.screaming {
            return AttackOutcome::Rejected;
        }
        self.state = HumanState::Dead;
        self.assigned_seat = None;
        self.pending_jump = None;
        self.velocity = Vec2::ZERO;
        self.reaction = Reaction::Idle;
        if let Some(seat_id) = self.occupied_seat.take() {
            if let Some(seat) = coaster.seat_mut(seat_id) {
                seat.place_corpse(self.id);
                self.resting_seat = Some(seat_id);
            }
        }
        AttackOutcome::Killed
    }

    /// Vulnerable humans die, defensive ones escape
    pub fn receive_attack(
        &mut self,
        coaster: &mut Coaster,
        audio: &mut dyn AudioSink,
        tuning: &HumanTuning,
    ) -> AttackOutcome {
        match self.state {
            HumanState::Vulnerable => self.die(coaster),
            HumanState::Defensive if !self.being_despawned => {
                if self.escape_and_despawn(coaster, audio, tuning) {
                    AttackOutcome::Escaped
                } else {
                    AttackOutcome::Rejected
                }
            }
            _ => AttackOutcome::Rejected,
        }
    }

    /// Toss this human's body out of its seat along an arc to `to`
    pub fn throw_from_seat(&mut self, coaster: &mut Coaster, to: Vec2, tuning: &HumanTuning) -> bool {
        if !self.is_dead() || self.being_despawned || self.resting_seat.is_none() {
            return false;
        }
        self.vacate(coaster);
        self.being_despawned = true;
        self.collider_enabled = false;
        self.reaction = Reaction::Thrown {
            elapsed: 0.0,
            duration: tuning.throw_duration,
            from: self.position,
            to,
        };
        true
    }

    /// Remove from the world immediately
    pub fn despawn(&mut self, coaster: &mut Coaster) {
        self.vacate(coaster);
        self.being_despawned = true;
        self.collider_enabled = false;
        self.finished = true;
        self.reaction = Reaction::Idle;
    }

    /// Switch posture directly. Has no effect on the dead.
    pub fn force_posture(&mut self, posture: HumanState, tuning: &HumanTuning, rng: &mut Pcg32) {
        if self.is_dead() || posture == HumanState::Dead {
            return;
        }
        self.enter_posture(posture, tuning, rng);
    }

    /// Cross-check seat bookkeeping against the coaster and repair it.
    /// Returns false if anything disagreed.
    pub fn audit(&mut self, coaster: &mut Coaster) -> bool {
        let mut consistent = true;

        if let Some(seat_id) = self.occupied_seat {
            let holder = coaster.seat(seat_id).and_then(|s| s.occupying_human());
            if holder != Some(self.id) || self.is_dead() {
                log::error!(
                    "{} ({:?}) claims seat {:?} but the seat holds {:?}",
                    self.id,
                    self.state,
                    seat_id,
                    holder
                );
                self.occupied_seat = None;
                consistent = false;
            }
        }

        if self.occupied_seat.is_none() {
            if let Some(stale) = coaster.seat_of_human(self.id) {
                log::error!("{} is registered in seat {:?} without sitting there", self.id, stale);
                if let Some(seat) = coaster.seat_mut(stale) {
                    if self.is_dead() {
                        seat.place_corpse(self.id);
                        self.resting_seat = Some(stale);
                    } else {
                        seat.release(self.id);
                    }
                }
                consistent = false;
            }
        }

        consistent
    }

    /// Advance all running behavior by one step
    pub fn tick(&mut self, dt: f32, ctx: &mut HumanContext<'_>) {
        if self.finished {
            return;
        }
        self.advance_reaction(dt, ctx);
        if self.finished || self.being_despawned || self.is_dead() {
            return;
        }
        self.seek_seat(dt, ctx);
        self.update_posture(dt, ctx);
        self.watch_adjacent_seat(dt, ctx);
    }

    fn advance_reaction(&mut self, dt: f32, ctx: &mut HumanContext<'_>) {
        let tuning = ctx.tuning;
        match self.reaction {
            Reaction::Idle => {}
            Reaction::Screaming { remaining, threat } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.reaction = Reaction::Screaming { remaining, threat };
                    return;
                }
                // Coincident threat gives no direction to run
                let away = (self.position - threat)
                    .try_normalize()
                    .unwrap_or_else(|| random_direction(&mut *ctx.rng));
                self.reaction = Reaction::Fleeing {
                    target: self.position + away * tuning.flee_distance,
                    recover: tuning.scream_recovery,
                };
            }
            Reaction::Fleeing { target, recover } => {
                let speed = tuning.move_speed * tuning.panic_run_speed_multiplier;
                self.move_towards(target, speed, dt, tuning.arrival_distance);
                let recover = recover - dt;
                if recover > 0.0 {
                    self.reaction = Reaction::Fleeing { target, recover };
                } else {
                    self.screaming = false;
                    self.velocity = Vec2::ZERO;
                    self.reaction = Reaction::Idle;
                }
            }
            Reaction::Jumping {
                elapsed,
                duration,
                base,
            } => {
                let elapsed = elapsed + dt;
                let t = if duration > 0.0 { elapsed / duration } else { 1.0 };
                self.position = base + Vec2::Y * hop_height(t, tuning.jump_height);
                if t >= 1.0 {
                    self.finish(ctx.events);
                } else {
                    self.reaction = Reaction::Jumping {
                        elapsed,
                        duration,
                        base,
                    };
                }
            }
            Reaction::Thrown {
                elapsed,
                duration,
                from,
                to,
            } => {
                let elapsed = elapsed + dt;
                let t = if duration > 0.0 { elapsed / duration } else { 1.0 };
                self.position =
                    from.lerp(to, t.min(1.0)) + Vec2::Y * hop_height(t, tuning.throw_arc_height);
                if t >= 1.0 {
                    self.finish(ctx.events);
                } else {
                    self.reaction = Reaction::Thrown {
                        elapsed,
                        duration,
                        from,
                        to,
                    };
                }
            }
        }
    }

    fn seek_seat(&mut self, dt: f32, ctx: &mut HumanContext<'_>) {
        let Some(seat_id) = self.assigned_seat else {
            return;
        };
        if self.is_seated() || self.screaming {
            return;
        }

        if ctx.visibility == Visibility::Visible {
            self.exposure += dt;
            if self.exposure >= ctx.tuning.zombie_detection_delay {
                log::debug!("{} spotted the zombie on the way to {:?}", self.id, seat_id);
                self.abandon_seat_and_flee(ctx);
                return;
            }
        } else {
            self.exposure = 0.0;
        }

        let (zombie_there, holder, target) = match ctx.coaster.seat(seat_id) {
            Some(seat) => (
                seat.is_claimed_by_zombie(),
                seat.occupying_human(),
                seat.position,
            ),
            None => {
                self.assigned_seat = None;
                return;
            }
        };
        if zombie_there {
            log::debug!("{} saw the zombie take seat {:?}", self.id, seat_id);
            self.abandon_seat_and_flee(ctx);
            return;
        }
        if holder.is_some_and(|h| h != self.id) {
            log::debug!("{} lost seat {:?} to {:?}", self.id, seat_id, holder);
            self.assigned_seat = None;
            return;
        }

        let tuning = ctx.tuning;
        if self.move_towards(target, tuning.move_speed, dt, tuning.arrival_distance) {
            self.occupy_seat(seat_id, ctx.coaster, ctx.events);
        }
    }

    fn abandon_seat_and_flee(&mut self, ctx: &mut HumanContext<'_>) {
        self.assigned_seat = None;
        if self.scream_and_run_away(ctx.zombie_position, false, ctx.audio, ctx.tuning) {
            ctx.events.push(GameEvent::HumanPanicked { id: self.id });
        }
    }

    fn update_posture(&mut self, dt: f32, ctx: &mut HumanContext<'_>) {
        if ctx.phase != RoundPhase::RideInProgress {
            return;
        }
        self.state_timer -= dt;
        if self.state_timer > 0.0 {
            return;
        }
        let next = match self.state {
            HumanState::Vulnerable => HumanState::Defensive,
            HumanState::Defensive => HumanState::Vulnerable,
            HumanState::Dead => return,
        };
        self.enter_posture(next, ctx.tuning, &mut *ctx.rng);
    }

    fn enter_posture(&mut self, next: HumanState, tuning: &HumanTuning, rng: &mut Pcg32) {
        self.state = next;
        self.state_timer = match next {
            HumanState::Vulnerable => roll_duration(rng, tuning.min_vulnerable, tuning.max_vulnerable),
            HumanState::Defensive => roll_duration(rng, tuning.min_defensive, tuning.max_defensive),
            HumanState::Dead => 0.0,
        };
        self.zombie_check_timer = tuning.zombie_detection_delay;
        self.defensive_check_timer = tuning.defensive_jump_delay;
        log::debug!("{} is now {:?}", self.id, next);
    }

    fn watch_adjacent_seat(&mut self, dt: f32, ctx: &mut HumanContext<'_>) {
        if ctx.phase != RoundPhase::RideInProgress {
            return;
        }
        let Some(seat_id) = self.occupied_seat else {
            return;
        };

        if let Some(mut pending) = self.pending_jump {
            pending.remaining -= dt;
            if pending.remaining > 0.0 {
                self.pending_jump = Some(pending);
                return;
            }
            self.pending_jump = None;
            if self.jump_and_despawn(ctx.coaster, ctx.audio, ctx.tuning) {
                log::debug!("{} jumped off ({:?})", self.id, pending.reason);
                ctx.events.push(GameEvent::HumanJumped {
                    id: self.id,
                    reason: pending.reason,
                });
            }
            return;
        }
        if self.screaming {
            return;
        }

        let Some(adjacent) = ctx
            .coaster
            .adjacent_seat(seat_id)
            .and_then(|id| ctx.coaster.seat(id))
        else {
            return;
        };
        let zombie = adjacent.is_occupied_by_zombie();
        let corpse = adjacent.corpse().is_some();
        let empty = adjacent.is_vacant();

        let t = ctx.tuning;
        let spooked = match self.state {
            HumanState::Vulnerable => {
                self.zombie_check_timer -= dt;
                if self.zombie_check_timer > 0.0 {
                    return;
                }
                self.zombie_check_timer = t.zombie_check_interval;
                zombie.then_some(PendingJump {
                    remaining: t.zombie_detection_delay,
                    reason: SpookReason::AdjacentZombie,
                })
            }
            HumanState::Defensive => {
                self.defensive_check_timer -= dt;
                if self.defensive_check_timer > 0.0 {
                    return;
                }
                self.defensive_check_timer = t.defensive_check_interval;
                if zombie {
                    Some(PendingJump {
                        remaining: t.defensive_jump_delay * 0.5,
                        reason: SpookReason::AdjacentZombie,
                    })
                } else if corpse {
                    Some(PendingJump {
                        remaining: t.defensive_jump_delay,
                        reason: SpookReason::DeadBody,
                    })
                } else if empty {
                    Some(PendingJump {
                        remaining: t.empty_seat_jump_delay,
                        reason: SpookReason::EmptySeat,
                    })
                } else {
                    None
                }
            }
            HumanState::Dead => None,
        };

        if let Some(pending) = spooked {
            log::debug!(
                "{} spooked by {:?}, jumping in {:.2}s",
                self.id,
                pending.reason,
                pending.remaining
            );
            self.pending_jump = Some(pending);
        }
    }

    fn begin_jump(&mut self, coaster: &mut Coaster, audio: &mut dyn AudioSink, duration: f32) {
        self.vacate(coaster);
        self.collider_enabled = false;
        self.being_despawned = true;
        self.pending_jump = None;
        self.velocity = Vec2::ZERO;
        self.reaction = Reaction::Jumping {
            elapsed: 0.0,
            duration,
            base: self.position,
        };
        audio.play(self.voice.jump().name());
    }

    /// Drop every seat reference this human holds
    fn vacate(&mut self, coaster: &mut Coaster) {
        if let Some(seat_id) = self.occupied_seat.take() {
            if let Some(seat) = coaster.seat_mut(seat_id) {
                seat.release(self.id);
            }
        }
        if let Some(seat_id) = self.resting_seat.take() {
            if let Some(seat) = coaster.seat_mut(seat_id) {
                if seat.corpse() == Some(self.id) {
                    seat.remove_corpse();
                }
            }
        }
        self.assigned_seat = None;
    }

    fn finish(&mut self, events: &mut Vec<GameEvent>) {
        self.finished = true;
        self.velocity = Vec2::ZERO;
        self.reaction = Reaction::Idle;
        events.push(GameEvent::HumanDespawned { id: self.id });
    }

    /// Step toward `target`; true once within `arrival` of it
    fn move_towards(&mut self, target: Vec2, speed: f32, dt: f32, arrival: f32) -> bool {
        let to_target = target - self.position;
        let dist = to_target.length();
        if dist <= arrival {
            self.velocity = Vec2::ZERO;
            return true;
        }
        let dir = to_target / dist;
        let step = (speed * dt).min(dist);
        self.position += dir * step;
        self.velocity = dir * speed;
        if dist - step <= arrival {
            self.velocity = Vec2::ZERO;
            return true;
        }
        false
    }
}
