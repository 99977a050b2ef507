//! Zombie agent and click resolution
//!
//! The zombie is a click-driven actor: each click resolves to at most one
//! action, and clicks are ignored while an action animation is running.

use std::f32::consts::PI;

use glam::Vec2;
use serde::Serialize;

use super::coaster::{Coaster, Seat, SeatId};
use super::hide_spot::HideSpot;
use super::hiding::Visibility;
use super::human::{Human, HumanId};
use crate::settings::ZombieTuning;

/// Peak height of the hop between carts
const CART_HOP: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ZombieAction {
    Idle,
    /// Target seat is reserved with its zombie flag for the whole move
    Moving {
        from: Vec2,
        to: SeatId,
        elapsed: f32,
        duration: f32,
        hop: bool,
    },
    Eating {
        remaining: f32,
    },
    EatingAttempt {
        remaining: f32,
    },
    Throwing {
        remaining: f32,
    },
}

/// Delayed look at the seat next to an attacked human
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EscapeCheck {
    pub remaining: f32,
    pub seat: SeatId,
}

/// What a click asks the zombie to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClickAction {
    Hide,
    RevealAt(SeatId),
    Attack(HumanId),
    SwitchSeat(SeatId),
    SwitchCart(SeatId),
    Throw(HumanId),
}

#[derive(Debug, Clone, Serialize)]
pub struct Zombie {
    pub position: Vec2,
    /// Seat the zombie sits in; `None` while hidden or moving
    pub seat: Option<SeatId>,
    pub action: ZombieAction,
    pub escape_check: Option<EscapeCheck>,
}

impl Zombie {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            seat: None,
            action: ZombieAction::Idle,
            escape_check: None,
        }
    }

    /// Place the zombie directly in `seat` and flag it
    pub fn seated_at(seat: SeatId, coaster: &mut Coaster) -> Self {
        let mut zombie = Self::new(Vec2::ZERO);
        if let Some(s) = coaster.seat_mut(seat) {
            if s.set_zombie_occupation(true) {
                zombie.position = s.position;
                zombie.seat = Some(seat);
            }
        }
        zombie
    }

    pub fn is_busy(&self) -> bool {
        self.action != ZombieAction::Idle
    }

    /// Start moving into a vacant seat. The old seat is released and the
    /// new one reserved right away; the zombie flag follows on arrival.
    pub fn start_move(&mut self, to: SeatId, duration: f32, hop: bool, coaster: &mut Coaster) -> bool {
        if self.is_busy() || !coaster.seat(to).is_some_and(Seat::is_vacant) {
            return false;
        }
        if let Some(old) = self.seat.take() {
            if let Some(seat) = coaster.seat_mut(old) {
                seat.set_zombie_occupation(false);
            }
        }
        if let Some(seat) = coaster.seat_mut(to) {
            seat.reserve_for_zombie(true);
        }
        log::debug!("Zombie moving to {:?}", to);
        self.action = ZombieAction::Moving {
            from: self.position,
            to,
            elapsed: 0.0,
            duration,
            hop,
        };
        true
    }

    /// Play a fixed-length animation that blocks further clicks
    pub fn begin_action(&mut self, action: ZombieAction) {
        self.action = action;
    }

    pub fn schedule_escape_check(&mut self, seat: SeatId, delay: f32) {
        self.escape_check = Some(EscapeCheck {
            remaining: delay,
            seat,
        });
    }

    /// Advance the running action. Returns the seat on arrival.
    pub fn update(&mut self, dt: f32, coaster: &mut Coaster) -> Option<SeatId> {
        match self.action {
            ZombieAction::Idle => None,
            ZombieAction::Moving {
                from,
                to,
                elapsed,
                duration,
                hop,
            } => {
                let Some(target) = coaster.seat(to).map(|s| s.position) else {
                    self.action = ZombieAction::Idle;
                    return None;
                };
                let elapsed = elapsed + dt;
                let t = if duration > 0.0 {
                    (elapsed / duration).min(1.0)
                } else {
                    1.0
                };
                self.position = from.lerp(target, t);
                if hop {
                    self.position.y += (t * PI).sin() * CART_HOP;
                }
                if t >= 1.0 {
                    self.position = target;
                    self.action = ZombieAction::Idle;
                    let settled = coaster.seat_mut(to).is_some_and(|s| s.settle_zombie());
                    if !settled {
                        log::warn!("Seat {:?} was taken before the zombie landed", to);
                        return None;
                    }
                    self.seat = Some(to);
                    Some(to)
                } else {
                    self.action = ZombieAction::Moving {
                        from,
                        to,
                        elapsed,
                        duration,
                        hop,
                    };
                    None
                }
            }
            ZombieAction::Eating { remaining }
            | ZombieAction::EatingAttempt { remaining }
            | ZombieAction::Throwing { remaining } => {
                let remaining = remaining - dt;
                self.action = if remaining > 0.0 {
                    match self.action {
                        ZombieAction::Eating { .. } => ZombieAction::Eating { remaining },
                        ZombieAction::EatingAttempt { .. } => {
                            ZombieAction::EatingAttempt { remaining }
                        }
                        _ => ZombieAction::Throwing { remaining },
                    }
                } else {
                    ZombieAction::Idle
                };
                None
            }
        }
    }

    /// Count down the pending escape check; yields its seat when due
    pub fn poll_escape_check(&mut self, dt: f32) -> Option<SeatId> {
        let check = self.escape_check.as_mut()?;
        check.remaining -= dt;
        if check.remaining > 0.0 {
            return None;
        }
        let seat = check.seat;
        self.escape_check = None;
        Some(seat)
    }
}

/// Whether the zombie in `from` can bite whoever sits in `target`: the other
/// seat of its own cart, or the same seat of the cart right in front.
pub fn within_attack_reach(coaster: &Coaster, from: SeatId, target: SeatId) -> bool {
    coaster.adjacent_seat(from) == Some(target)
        || (target.seat == from.seat
            && coaster.carts_adjacent(from.cart, target.cart)
            && coaster.is_in_front(from, target))
}

/// Corpses can be thrown from any cart ahead at the zombie's seat index
pub fn within_throw_reach(coaster: &Coaster, from: SeatId, target: SeatId) -> bool {
    target.seat == from.seat && coaster.is_in_front(from, target)
}

/// Resolve a click into an action, in priority order: hide, attack, switch
/// seat, switch cart, throw. While hidden only a vacant seat can be picked.
pub fn resolve_click(
    point: Vec2,
    visibility: Visibility,
    zombie: &Zombie,
    coaster: &Coaster,
    humans: &[Human],
    hide_spot: &HideSpot,
    tuning: &ZombieTuning,
) -> Option<ClickAction> {
    match visibility {
        Visibility::Hiding => None,
        Visibility::Hidden => coaster
            .seat_at(point, tuning.seat_click_radius)
            .filter(|id| coaster.seat(*id).is_some_and(Seat::is_vacant))
            .map(ClickAction::RevealAt),
        Visibility::Visible => {
            if zombie.is_busy() {
                return None;
            }
            if hide_spot.contains(point) {
                return Some(ClickAction::Hide);
            }
            let from = zombie.seat?;

            let nearest = |radius: f32, pick: &dyn Fn(&Human) -> Option<SeatId>| {
                humans
                    .iter()
                    .filter(|h| !h.is_being_despawned())
                    .filter_map(|h| {
                        let seat = pick(h)?;
                        let d = h.position.distance(point);
                        (d <= radius).then_some((h.id, seat, d))
                    })
                    .min_by(|a, b| a.2.total_cmp(&b.2))
            };

            let victim = nearest(tuning.human_click_radius, &|h: &Human| {
                if h.is_dead() { None } else { h.occupied_seat() }
            });
            if let Some((id, seat, _)) = victim {
                if within_attack_reach(coaster, from, seat) {
                    return Some(ClickAction::Attack(id));
                }
            }

            if let Some(target) = coaster.seat_at(point, tuning.seat_click_radius) {
                if coaster.seat(target).is_some_and(Seat::is_vacant) {
                    if coaster.adjacent_seat(from) == Some(target) {
                        return Some(ClickAction::SwitchSeat(target));
                    }
                    if target.seat == from.seat && coaster.carts_adjacent(from.cart, target.cart) {
                        return Some(ClickAction::SwitchCart(target));
                    }
                }
            }

            let corpse = nearest(tuning.dead_human_click_radius, &|h: &Human| {
                if h.is_dead() { h.resting_seat() } else { None }
            });
            match corpse {
                Some((id, seat, _)) if within_throw_reach(coaster, from, seat) => {
                    Some(ClickAction::Throw(id))
                }
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::settings::{CoasterLayout, HumanTuning};
    use crate::sim::human::Voice;
    use crate::sim::state::GameEvent;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    struct Rig {
        coaster: Coaster,
        zombie: Zombie,
        humans: Vec<Human>,
        hide_spot: HideSpot,
        tuning: ZombieTuning,
        rng: Pcg32,
        events: Vec<GameEvent>,
    }

    impl Rig {
        fn new(zombie_seat: SeatId) -> Self {
            let layout = CoasterLayout::default();
            let mut coaster = Coaster::new(&layout);
            let zombie = Zombie::seated_at(zombie_seat, &mut coaster);
            let tuning = ZombieTuning::default();
            Self {
                coaster,
                zombie,
                humans: Vec::new(),
                hide_spot: HideSpot::new(&layout, tuning.hide_spot_click_radius),
                tuning,
                rng: Pcg32::seed_from_u64(11),
                events: Vec::new(),
            }
        }

        fn seat_human(&mut self, id: u32, seat: SeatId) -> usize {
            let mut human = Human::new(
                HumanId(id),
                Vec2::ZERO,
                Voice::Male,
                &HumanTuning::default(),
                &mut self.rng,
            );
            assert!(human.occupy_seat(seat, &mut self.coaster, &mut self.events));
            self.humans.push(human);
            self.humans.len() - 1
        }

        fn click(&self, point: Vec2, visibility: Visibility) -> Option<ClickAction> {
            resolve_click(
                point,
                visibility,
                &self.zombie,
                &self.coaster,
                &self.humans,
                &self.hide_spot,
                &self.tuning,
            )
        }

        fn seat_pos(&self, id: SeatId) -> Vec2 {
            self.coaster.seat(id).unwrap().position
        }
    }

    #[test]
    fn test_seated_at_flags_seat() {
        let rig = Rig::new(SeatId::new(4, 1));
        assert_eq!(rig.zombie.seat, Some(SeatId::new(4, 1)));
        assert!(rig.coaster.seat(SeatId::new(4, 1)).unwrap().is_occupied_by_zombie());
        assert_eq!(rig.zombie.position, rig.seat_pos(SeatId::new(4, 1)));
    }

    #[test]
    fn test_hide_spot_click_wins() {
        let rig = Rig::new(SeatId::new(4, 0));
        let spot = rig.hide_spot.position;
        assert_eq!(rig.click(spot, Visibility::Visible), Some(ClickAction::Hide));
        assert_eq!(rig.click(spot, Visibility::Hiding), None);
    }

    #[test]
    fn test_hidden_click_reveals_into_vacant_seat() {
        let mut rig = Rig::new(SeatId::new(4, 0));
        rig.coaster.clear_zombie_flags();
        rig.seat_human(1, SeatId::new(1, 0));

        let free = SeatId::new(2, 1);
        assert_eq!(
            rig.click(rig.seat_pos(free), Visibility::Hidden),
            Some(ClickAction::RevealAt(free))
        );
        assert_eq!(rig.click(rig.seat_pos(SeatId::new(1, 0)), Visibility::Hidden), None);
    }

    #[test]
    fn test_attack_reach() {
        let mut rig = Rig::new(SeatId::new(3, 1));
        rig.seat_human(1, SeatId::new(3, 0));
        rig.seat_human(2, SeatId::new(2, 1));
        rig.seat_human(3, SeatId::new(2, 0));
        rig.seat_human(4, SeatId::new(1, 1));

        let click = |rig: &Rig, id: SeatId| rig.click(rig.seat_pos(id), Visibility::Visible);
        assert_eq!(click(&rig, SeatId::new(3, 0)), Some(ClickAction::Attack(HumanId(1))));
        assert_eq!(click(&rig, SeatId::new(2, 1)), Some(ClickAction::Attack(HumanId(2))));
        // Diagonal and two carts ahead are out of reach
        assert_eq!(click(&rig, SeatId::new(2, 0)), None);
        assert_eq!(click(&rig, SeatId::new(1, 1)), None);
    }

    #[test]
    fn test_switch_targets() {
        let rig = Rig::new(SeatId::new(3, 1));
        let click = |id: SeatId| rig.click(rig.seat_pos(id), Visibility::Visible);
        assert_eq!(click(SeatId::new(3, 0)), Some(ClickAction::SwitchSeat(SeatId::new(3, 0))));
        assert_eq!(click(SeatId::new(2, 1)), Some(ClickAction::SwitchCart(SeatId::new(2, 1))));
        assert_eq!(click(SeatId::new(4, 1)), Some(ClickAction::SwitchCart(SeatId::new(4, 1))));
        assert_eq!(click(SeatId::new(2, 0)), None);
    }

    #[test]
    fn test_throw_corpse_ahead_only() {
        let mut rig = Rig::new(SeatId::new(3, 0));
        let ahead = rig.seat_human(1, SeatId::new(1, 0));
        let beside = rig.seat_human(2, SeatId::new(3, 1));
        rig.humans[ahead].die(&mut rig.coaster);
        rig.humans[beside].die(&mut rig.coaster);

        assert_eq!(
            rig.click(rig.seat_pos(SeatId::new(1, 0)), Visibility::Visible),
            Some(ClickAction::Throw(HumanId(1)))
        );
        assert_eq!(rig.click(rig.seat_pos(SeatId::new(3, 1)), Visibility::Visible), None);
    }

    #[test]
    fn test_busy_zombie_ignores_clicks() {
        let mut rig = Rig::new(SeatId::new(3, 1));
        rig.zombie.begin_action(ZombieAction::Eating { remaining: 1.0 });
        assert_eq!(rig.click(rig.seat_pos(SeatId::new(3, 0)), Visibility::Visible), None);

        for _ in 0..70 {
            rig.zombie.update(SIM_DT, &mut rig.coaster);
        }
        assert!(!rig.zombie.is_busy());
        assert_eq!(
            rig.click(rig.seat_pos(SeatId::new(3, 0)), Visibility::Visible),
            Some(ClickAction::SwitchSeat(SeatId::new(3, 0)))
        );
    }

    #[test]
    fn test_move_reserves_target_and_arrives() {
        let mut rig = Rig::new(SeatId::new(4, 0));
        let to = SeatId::new(3, 0);
        assert!(rig.zombie.start_move(to, 2.0, true, &mut rig.coaster));
        assert_eq!(rig.zombie.seat, None);
        assert!(!rig.coaster.seat(SeatId::new(4, 0)).unwrap().is_occupied_by_zombie());
        let target = rig.coaster.seat(to).unwrap();
        assert!(target.is_reserved_by_zombie());
        assert!(!target.is_occupied_by_zombie());
        assert!(!rig.zombie.start_move(SeatId::new(4, 1), 1.0, false, &mut rig.coaster));

        let mut arrived = None;
        for _ in 0..125 {
            if let Some(seat) = rig.zombie.update(SIM_DT, &mut rig.coaster) {
                arrived = Some(seat);
            }
            if arrived.is_none() {
                assert!(!rig.coaster.seat(to).unwrap().is_occupied_by_zombie());
            }
        }
        assert_eq!(arrived, Some(to));
        let target = rig.coaster.seat(to).unwrap();
        assert!(target.is_occupied_by_zombie());
        assert!(!target.is_reserved_by_zombie());
        assert_eq!(rig.zombie.seat, Some(to));
        assert_eq!(rig.zombie.position, rig.seat_pos(to));
    }

    #[test]
    fn test_move_refused_into_occupied_seat() {
        let mut rig = Rig::new(SeatId::new(4, 0));
        rig.seat_human(1, SeatId::new(3, 0));
        assert!(!rig.zombie.start_move(SeatId::new(3, 0), 2.0, true, &mut rig.coaster));
        assert_eq!(rig.zombie.seat, Some(SeatId::new(4, 0)));
    }

    #[test]
    fn test_escape_check_fires_once() {
        let mut rig = Rig::new(SeatId::new(4, 0));
        rig.zombie.schedule_escape_check(SeatId::new(3, 0), 0.3);
        let fired: Vec<_> = (0..30)
            .filter_map(|_| rig.zombie.poll_escape_check(SIM_DT))
            .collect();
        assert_eq!(fired, vec![SeatId::new(3, 0)]);
    }
}
