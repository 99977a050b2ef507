//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use glam::Vec2;

use super::coaster::SeatId;
use super::hiding::{HideOutcome, UnhideOutcome, Visibility, VisibilityEvent, select_unhide_seat};
use super::human::{AttackOutcome, HumanContext, HumanId, HumanState};
use super::round::{self, RoundPhase};
use super::state::{GameEvent, GameState};
use super::zombie::{ClickAction, ZombieAction, resolve_click, within_attack_reach};
use crate::audio::{SoundCue, restart_cue};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Primary click/tap in world coordinates
    pub click: Option<Vec2>,
    /// Idle/demo mode - AI plays the zombie
    pub autopilot: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    let click = match input.click {
        Some(point) => Some(point),
        None if input.autopilot => autopilot_click(state),
        None => None,
    };
    if let Some(point) = click {
        let action = resolve_click(
            point,
            state.hiding.visibility(),
            &state.zombie,
            &state.coaster,
            &state.humans,
            &state.hide_spot,
            &state.settings.zombie,
        );
        match action {
            Some(action) => apply_click(state, action),
            None => log::debug!("Click at {:?} did nothing", point),
        }
    }

    state.scroll.update(dt);
    state.audio.update(dt);

    let hide_position = state.hide_spot.position;
    match state
        .hiding
        .update(dt, &mut state.zombie, &mut state.coaster, hide_position)
    {
        Some(VisibilityEvent::Hidden) => state.events.push(GameEvent::ZombieHidden),
        Some(VisibilityEvent::Revealed { seat }) => {
            state.events.push(GameEvent::ZombieRevealed { seat })
        }
        None => {}
    }

    if let Some(seat) = state.zombie.update(dt, &mut state.coaster) {
        state.events.push(GameEvent::ZombieMoved { seat });
    }
    if let Some(seat) = state.zombie.poll_escape_check(dt) {
        check_neighbour_escape(state, seat);
    }

    tick_humans(state, dt);
    state.humans.retain(|h| !h.is_finished());

    round::advance(state, dt);

    let phase = state.round.phase();
    state.hide_spot.update(dt, phase, state.scroll.as_ref());
    state.time_ticks += 1;
}

fn tick_humans(state: &mut GameState, dt: f32) {
    let GameState {
        settings,
        coaster,
        humans,
        zombie,
        hiding,
        round,
        audio,
        rng,
        events,
        ..
    } = state;
    let mut ctx = HumanContext {
        phase: round.phase(),
        visibility: hiding.visibility(),
        zombie_position: zombie.position,
        tuning: &settings.human,
        coaster,
        audio: audio.as_mut(),
        rng,
        events,
    };
    for human in humans.iter_mut() {
        human.tick(dt, &mut ctx);
    }
}

fn apply_click(state: &mut GameState, action: ClickAction) {
    log::debug!("Zombie click: {:?}", action);
    let tuning = &state.settings.zombie;
    match action {
        ClickAction::Hide => {
            let outcome = state.hiding.hide_zombie(
                &mut state.zombie,
                &mut state.coaster,
                state.scroll.as_ref(),
            );
            if outcome == HideOutcome::Started {
                state.events.push(GameEvent::ZombieHiding);
            }
        }
        ClickAction::RevealAt(seat) => {
            if state.hiding.reveal_at(seat, &mut state.coaster) != UnhideOutcome::Started {
                log::debug!("Reveal into {:?} refused", seat);
            }
        }
        ClickAction::SwitchSeat(seat) => {
            let duration = tuning.seat_switch_duration;
            state
                .zombie
                .start_move(seat, duration, false, &mut state.coaster);
        }
        ClickAction::SwitchCart(seat) => {
            let duration = tuning.cart_switch_duration;
            state
                .zombie
                .start_move(seat, duration, true, &mut state.coaster);
        }
        ClickAction::Attack(id) => attack(state, id),
        ClickAction::Throw(id) => throw_corpse(state, id),
    }
}

/// Bite a seated human. Vulnerable humans die in their seat; defensive
/// ones get away. Either way the seat next to the victim is checked again
/// shortly after.
fn attack(state: &mut GameState, id: HumanId) {
    let GameState {
        settings,
        coaster,
        humans,
        zombie,
        hunger,
        round,
        audio,
        events,
        ..
    } = state;
    let Some(human) = humans.iter_mut().find(|h| h.id == id) else {
        return;
    };
    let Some(seat) = human.occupied_seat() else {
        return;
    };
    let tuning = &settings.zombie;

    match human.receive_attack(coaster, audio.as_mut(), &settings.human) {
        AttackOutcome::Killed => {
            restart_cue(audio.as_mut(), SoundCue::Eat, &[SoundCue::EatAttempt]);
            zombie.begin_action(ZombieAction::Eating {
                remaining: tuning.eat_duration,
            });
            hunger.feed();
            round.stats.humans_eaten += 1;
            events.push(GameEvent::HumanKilled { id });
            log::info!("Zombie ate {}", id);
        }
        AttackOutcome::Escaped => {
            restart_cue(audio.as_mut(), SoundCue::EatAttempt, &[SoundCue::Eat]);
            zombie.begin_action(ZombieAction::EatingAttempt {
                remaining: tuning.eat_attempt_duration,
            });
            round.stats.humans_escaped += 1;
            events.push(GameEvent::HumanEscaped { id });
            log::info!("{} fought the zombie off and fled", id);
        }
        AttackOutcome::Rejected => return,
    }
    zombie.schedule_escape_check(seat, tuning.escape_check_delay);
}

/// A defensive human next to the victim bails out too
fn check_neighbour_escape(state: &mut GameState, seat: SeatId) {
    let neighbour = state
        .coaster
        .adjacent_seat(seat)
        .and_then(|id| state.coaster.seat(id))
        .and_then(|s| s.occupying_human());
    let Some(id) = neighbour else {
        return;
    };
    let GameState {
        settings,
        coaster,
        humans,
        round,
        audio,
        events,
        ..
    } = state;
    if let Some(human) = humans.iter_mut().find(|h| h.id == id) {
        if human.state() == HumanState::Defensive
            && human.escape_and_despawn(coaster, audio.as_mut(), &settings.human)
        {
            round.stats.humans_escaped += 1;
            events.push(GameEvent::HumanEscaped { id });
        }
    }
}

fn throw_corpse(state: &mut GameState, id: HumanId) {
    let GameState {
        settings,
        coaster,
        humans,
        zombie,
        events,
        ..
    } = state;
    let Some(human) = humans.iter_mut().find(|h| h.id == id) else {
        return;
    };
    let to = human.position - Vec2::Y * settings.human.throw_distance;
    if human.throw_from_seat(coaster, to, &settings.human) {
        zombie.begin_action(ZombieAction::Throwing {
            remaining: settings.zombie.throw_animation_duration,
        });
        events.push(GameEvent::CorpseThrown { id });
    }
}

/// Where the demo player would click this tick
fn autopilot_click(state: &GameState) -> Option<Vec2> {
    let phase = state.round.phase();
    match state.hiding.visibility() {
        Visibility::Hiding => None,
        Visibility::Hidden => {
            // The ride left without us; jump back on
            if phase != RoundPhase::RideInProgress {
                return None;
            }
            select_unhide_seat(&state.coaster)
                .and_then(|id| state.coaster.seat(id))
                .filter(|s| s.is_vacant())
                .map(|s| s.position)
        }
        Visibility::Visible if state.zombie.is_busy() => None,
        Visibility::Visible => match phase {
            RoundPhase::HumansGathering | RoundPhase::WaitingForZombieToHide => {
                Some(state.hide_spot.position)
            }
            RoundPhase::RideInProgress => ride_target(state),
            _ => None,
        },
    }
}

/// Eat anything vulnerable in reach, otherwise work forward cart by cart
fn ride_target(state: &GameState) -> Option<Vec2> {
    let from = state.zombie.seat?;
    let coaster = &state.coaster;

    let prey = state.humans.iter().find(|h| {
        h.state() == HumanState::Vulnerable
            && !h.is_being_despawned()
            && h.occupied_seat()
                .is_some_and(|seat| within_attack_reach(coaster, from, seat))
    });
    if let Some(human) = prey {
        return Some(human.position);
    }

    let ahead_of = |seat: SeatId| {
        seat.cart
            .checked_sub(1)
            .map(|cart| SeatId::new(cart, seat.seat))
    };
    if let Some(ahead) = ahead_of(from).and_then(|id| coaster.seat(id)) {
        if let Some(body) = ahead.corpse() {
            return state.human(body).map(|h| h.position);
        }
        if ahead.is_vacant() {
            return Some(ahead.position);
        }
    }

    // Blocked by someone we cannot eat yet; try the other seat if its lane
    // looks better
    let other = coaster.adjacent_seat(from)?;
    let other_seat = coaster.seat(other).filter(|s| s.is_vacant())?;
    let lane_open = ahead_of(other)
        .and_then(|id| coaster.seat(id))
        .is_some_and(|s| s.is_vacant() || s.corpse().is_some());
    lane_open.then_some(other_seat.position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::settings::Settings;
    use crate::sim::zombie::Zombie;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn run(state: &mut GameState, input: &TickInput, seconds: f32) {
        for _ in 0..(seconds / SIM_DT).ceil() as u32 {
            tick(state, input, SIM_DT);
        }
    }

    /// Gathering state with the zombie left visible and nobody spawning
    fn quiet_state() -> GameState {
        let mut settings = Settings::default();
        settings.round.auto_hide_on_round_start = false;
        settings.round.humans_per_round = 0;
        GameState::new(settings)
    }

    fn place_zombie(state: &mut GameState, seat: SeatId) {
        state.coaster.clear_zombie_flags();
        state.zombie = Zombie::seated_at(seat, &mut state.coaster);
    }

    fn seat_human(state: &mut GameState, seat: SeatId) -> HumanId {
        let id = state.spawn_human(Vec2::ZERO);
        let GameState {
            humans,
            coaster,
            events,
            ..
        } = state;
        let human = humans.iter_mut().find(|h| h.id == id).unwrap();
        assert!(human.occupy_seat(seat, coaster, events));
        id
    }

    fn click(state: &mut GameState, point: Vec2) {
        let input = TickInput {
            click: Some(point),
            ..Default::default()
        };
        tick(state, &input, SIM_DT);
    }

    fn assert_consistent(state: &GameState) {
        for human in &state.humans {
            if let Some(seat) = human.occupied_seat() {
                assert_eq!(
                    state.coaster.seat(seat).unwrap().occupying_human(),
                    Some(human.id)
                );
                assert!(!human.is_dead());
            }
        }
        for id in state.coaster.seat_ids() {
            let seat = state.coaster.seat(id).unwrap();
            assert!(!(seat.is_claimed_by_zombie() && seat.occupying_human().is_some()));
        }
    }

    #[test]
    fn test_adjacent_seat_eat() {
        let mut state = quiet_state();
        place_zombie(&mut state, SeatId::new(2, 1));
        let id = seat_human(&mut state, SeatId::new(2, 0));
        state.hunger.update(5.0);
        let before = state.hunger.current();

        let target = state.human(id).unwrap().position;
        click(&mut state, target);

        let human = state.human(id).unwrap();
        assert!(human.is_dead());
        let seat = state.coaster.seat(SeatId::new(2, 0)).unwrap();
        assert_eq!(seat.occupying_human(), None);
        assert_eq!(seat.corpse(), Some(id));
        assert!(state.hunger.current() < before);
        assert_eq!(state.hunger.heads_eaten(), 1);
        assert!(state.audio().is_playing("Eat"));
        assert!(state.zombie.is_busy());
        assert!(state.drain_events().contains(&GameEvent::HumanKilled { id }));
    }

    #[test]
    fn test_defensive_attack_spooks_neighbour() {
        let mut state = quiet_state();
        place_zombie(&mut state, SeatId::new(3, 1));
        let target = seat_human(&mut state, SeatId::new(2, 1));
        let neighbour = seat_human(&mut state, SeatId::new(2, 0));
        for id in [target, neighbour] {
            let GameState {
                humans,
                settings,
                rng,
                ..
            } = &mut state;
            let human = humans.iter_mut().find(|h| h.id == id).unwrap();
            human.force_posture(HumanState::Defensive, &settings.human, rng);
        }

        let point = state.human(target).unwrap().position;
        click(&mut state, point);
        assert!(state.audio().is_playing("Eat Attempt"));
        assert!(state.human(target).unwrap().is_dead());
        assert!(!state.human(neighbour).unwrap().is_being_despawned());

        run(&mut state, &TickInput::default(), 0.4);
        assert!(state.human(neighbour).is_none_or(|h| h.is_being_despawned()));
        assert_eq!(state.round.stats.humans_escaped, 2);
    }

    #[test]
    fn test_throw_corpse_frees_seat() {
        let mut state = quiet_state();
        place_zombie(&mut state, SeatId::new(3, 0));
        let id = seat_human(&mut state, SeatId::new(1, 0));
        {
            let GameState {
                humans, coaster, ..
            } = &mut state;
            humans.iter_mut().find(|h| h.id == id).unwrap().die(coaster);
        }

        let point = state.human(id).unwrap().position;
        click(&mut state, point);
        assert!(state.coaster.seat(SeatId::new(1, 0)).unwrap().is_vacant());
        assert!(matches!(state.zombie.action, ZombieAction::Throwing { .. }));

        run(&mut state, &TickInput::default(), 1.6);
        assert!(state.human(id).is_none());
    }

    #[test]
    fn test_switch_cart_click() {
        let mut state = quiet_state();
        place_zombie(&mut state, SeatId::new(4, 0));
        let ahead = state.coaster.seat(SeatId::new(3, 0)).unwrap().position;
        click(&mut state, ahead);
        let target = state.coaster.seat(SeatId::new(3, 0)).unwrap();
        assert!(target.is_reserved_by_zombie());
        assert!(!target.is_occupied_by_zombie());
        run(&mut state, &TickInput::default(), 2.1);
        assert_eq!(state.zombie.seat, Some(SeatId::new(3, 0)));
        assert!(state.coaster.seat(SeatId::new(3, 0)).unwrap().is_occupied_by_zombie());
        assert!(!state.coaster.seat(SeatId::new(4, 0)).unwrap().is_occupied_by_zombie());
    }

    #[test]
    fn test_hidden_click_reveals() {
        let mut state = GameState::new(Settings::default());
        run(&mut state, &TickInput::default(), 2.0);
        assert!(state.hiding.is_hidden());

        let seat = SeatId::new(1, 1);
        let point = state.coaster.seat(seat).unwrap().position;
        click(&mut state, point);
        assert!(state.hiding.is_hiding());
        run(&mut state, &TickInput::default(), 0.6);
        assert_eq!(state.visibility(), Visibility::Visible);
        assert_eq!(state.zombie.seat, Some(seat));
    }

    #[test]
    fn test_autopilot_loops_through_rounds() {
        let mut state = GameState::new(Settings::default());
        let input = TickInput {
            autopilot: true,
            ..Default::default()
        };
        let mut phases = vec![state.phase()];
        for _ in 0..(90.0 / SIM_DT) as u32 {
            tick(&mut state, &input, SIM_DT);
            for event in state.drain_events() {
                if let GameEvent::PhaseChanged { to, .. } = event {
                    phases.push(to);
                }
            }
            assert_consistent(&state);
        }

        let stats = state.round.stats;
        assert!(stats.rides_started >= 1);
        assert!(stats.rides_completed >= 1);
        assert!(stats.rounds_started >= 2);
        let expected = [
            RoundPhase::HumansGathering,
            RoundPhase::WaitingForZombieToHide,
            RoundPhase::HumansBoardingTrain,
            RoundPhase::ZombieBoarding,
            RoundPhase::RideInProgress,
            RoundPhase::RideComplete,
            RoundPhase::RideRestarting,
            RoundPhase::HumansGathering,
        ];
        assert_eq!(&phases[..expected.len()], &expected);
    }

    #[test]
    fn test_determinism() {
        let input = TickInput {
            autopilot: true,
            ..Default::default()
        };
        let mut a = GameState::new(Settings::with_seed(4242));
        let mut b = GameState::new(Settings::with_seed(4242));
        for _ in 0..(30.0 / SIM_DT) as u32 {
            tick(&mut a, &input, SIM_DT);
            tick(&mut b, &input, SIM_DT);
        }
        assert_eq!(a.time_ticks, b.time_ticks);
        let sa = serde_json::to_string(&a.snapshot()).unwrap();
        let sb = serde_json::to_string(&b.snapshot()).unwrap();
        assert_eq!(sa, sb);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn prop_random_clicks_keep_seats_consistent(seed in any::<u64>(), clicks in prop::collection::vec((-8.0f32..8.0, -6.0f32..5.0), 1..40)) {
            let mut state = GameState::new(Settings::with_seed(seed));
            let mut rng = rand_pcg::Pcg32::seed_from_u64(seed);
            for (x, y) in clicks {
                let gap = rand::Rng::random_range(&mut rng, 10..40);
                run(&mut state, &TickInput { autopilot: true, ..Default::default() }, gap as f32 * SIM_DT);
                click(&mut state, Vec2::new(x, y));
                assert_consistent(&state);
            }
        }
    }
}
