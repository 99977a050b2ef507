//! Seat and cart model
//!
//! A seat holds at most one live human and, separately, a zombie flag. The
//! two never coexist: humans only commit to a vacant seat and the zombie
//! only reserves a seat without a live human. The flag means the zombie is
//! sitting there; a seat it is still travelling to only carries a
//! reservation. A dead body stays in its seat as a corpse until it is
//! thrown out or the round resets.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::human::HumanId;
use crate::settings::CoasterLayout;

/// Seat address: cart index (0 = front) and seat index within the cart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeatId {
    pub cart: usize,
    pub seat: usize,
}

impl SeatId {
    pub const fn new(cart: usize, seat: usize) -> Self {
        Self { cart, seat }
    }
}

/// A single occupancy cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Seat {
    pub position: Vec2,
    occupying_human: Option<HumanId>,
    occupied_by_zombie: bool,
    /// Zombie is on its way here
    reserved_by_zombie: bool,
    corpse: Option<HumanId>,
}

impl Seat {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            occupying_human: None,
            occupied_by_zombie: false,
            reserved_by_zombie: false,
            corpse: None,
        }
    }

    /// Live human sitting here
    pub fn occupying_human(&self) -> Option<HumanId> {
        self.occupying_human
    }

    pub fn is_occupied_by_zombie(&self) -> bool {
        self.occupied_by_zombie
    }

    pub fn is_reserved_by_zombie(&self) -> bool {
        self.reserved_by_zombie
    }

    /// Sitting here or on the way
    pub fn is_claimed_by_zombie(&self) -> bool {
        self.occupied_by_zombie || self.reserved_by_zombie
    }

    /// Dead human left in this seat
    pub fn corpse(&self) -> Option<HumanId> {
        self.corpse
    }

    /// Nothing in the seat at all
    pub fn is_vacant(&self) -> bool {
        self.occupying_human.is_none() && !self.is_claimed_by_zombie() && self.corpse.is_none()
    }

    /// Commit a human to this seat. Re-checks vacancy at the moment of commit.
    pub fn try_occupy(&mut self, human: HumanId) -> bool {
        if !self.is_vacant() {
            return false;
        }
        self.occupying_human = Some(human);
        true
    }

    /// Remove `human` from the seat. Returns false if someone else sits here.
    pub fn release(&mut self, human: HumanId) -> bool {
        if self.occupying_human == Some(human) {
            self.occupying_human = None;
            true
        } else {
            false
        }
    }

    /// Turn the occupant into a corpse
    pub fn place_corpse(&mut self, human: HumanId) {
        if self.occupying_human == Some(human) {
            self.occupying_human = None;
        }
        self.corpse = Some(human);
    }

    pub fn remove_corpse(&mut self) -> Option<HumanId> {
        self.corpse.take()
    }

    /// Set or clear the zombie flag. Refused while a live human sits here.
    pub fn set_zombie_occupation(&mut self, occupied: bool) -> bool {
        if occupied && self.occupying_human.is_some() {
            return false;
        }
        self.occupied_by_zombie = occupied;
        true
    }

    /// Hold the seat for an incoming zombie. Refused while a live human
    /// sits here.
    pub fn reserve_for_zombie(&mut self, reserved: bool) -> bool {
        if reserved && self.occupying_human.is_some() {
            return false;
        }
        self.reserved_by_zombie = reserved;
        true
    }

    /// The zombie arrived: the reservation becomes the flag
    pub fn settle_zombie(&mut self) -> bool {
        self.reserved_by_zombie = false;
        if self.occupying_human.is_some() {
            return false;
        }
        self.occupied_by_zombie = true;
        true
    }

    /// Drop human and corpse references, keep the zombie flags
    pub fn clear_humans(&mut self) {
        self.occupying_human = None;
        self.corpse = None;
    }
}

/// Fixed ordered array of seats
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cart {
    pub position: Vec2,
    seats: Vec<Seat>,
}

impl Cart {
    /// Build a cart with `seat_count` seats laid out left to right
    pub fn new(position: Vec2, seat_count: usize, seat_spacing: f32) -> Self {
        let half = (seat_count.saturating_sub(1)) as f32 * seat_spacing / 2.0;
        let seats = (0..seat_count)
            .map(|i| Seat::new(position + Vec2::new(i as f32 * seat_spacing - half, 0.0)))
            .collect();
        Self { position, seats }
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn seat(&self, index: usize) -> Option<&Seat> {
        self.seats.get(index)
    }

    pub fn seat_mut(&mut self, index: usize) -> Option<&mut Seat> {
        self.seats.get_mut(index)
    }

    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    /// The other seat of a two-seat cart. Invalid indices and other cart
    /// sizes have no adjacency.
    pub fn try_get_adjacent_seat(&self, index: usize) -> Option<usize> {
        if self.seats.len() != 2 || index >= 2 {
            return None;
        }
        Some(1 - index)
    }
}

/// All carts of the coaster, front cart first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coaster {
    carts: Vec<Cart>,
}

impl Coaster {
    pub fn new(layout: &CoasterLayout) -> Self {
        let carts = (0..layout.cart_count)
            .map(|i| {
                let x = layout.front_cart_x - i as f32 * layout.cart_spacing;
                Cart::new(
                    Vec2::new(x, layout.rail_y),
                    layout.seats_per_cart,
                    layout.seat_spacing,
                )
            })
            .collect();
        Self::from_carts(carts)
    }

    /// Sort carts front to back (front carts have higher x)
    pub fn from_carts(mut carts: Vec<Cart>) -> Self {
        carts.sort_by(|a, b| b.position.x.total_cmp(&a.position.x));
        Self { carts }
    }

    pub fn carts(&self) -> &[Cart] {
        &self.carts
    }

    pub fn rear_cart(&self) -> Option<usize> {
        self.carts.len().checked_sub(1)
    }

    pub fn seat(&self, id: SeatId) -> Option<&Seat> {
        self.carts.get(id.cart)?.seat(id.seat)
    }

    pub fn seat_mut(&mut self, id: SeatId) -> Option<&mut Seat> {
        self.carts.get_mut(id.cart)?.seat_mut(id.seat)
    }

    /// Every seat, front to back
    pub fn seat_ids(&self) -> impl Iterator<Item = SeatId> + '_ {
        self.carts
            .iter()
            .enumerate()
            .flat_map(|(c, cart)| (0..cart.seat_count()).map(move |s| SeatId::new(c, s)))
    }

    /// Seats open to humans: every cart except the rear one, which the
    /// zombie keeps for itself
    pub fn passenger_seats(&self) -> Vec<SeatId> {
        let rear = self.rear_cart();
        self.seat_ids().filter(|id| Some(id.cart) != rear).collect()
    }

    /// The seat next to `id` in the same cart
    pub fn adjacent_seat(&self, id: SeatId) -> Option<SeatId> {
        let cart = self.carts.get(id.cart)?;
        cart.try_get_adjacent_seat(id.seat)
            .map(|seat| SeatId::new(id.cart, seat))
    }

    pub fn carts_adjacent(&self, a: usize, b: usize) -> bool {
        a < self.carts.len() && b < self.carts.len() && a.abs_diff(b) == 1
    }

    /// Whether `target` sits in a cart in front of `from`
    pub fn is_in_front(&self, from: SeatId, target: SeatId) -> bool {
        target.cart < from.cart
    }

    /// Nearest seat within `radius` of `point`
    pub fn seat_at(&self, point: Vec2, radius: f32) -> Option<SeatId> {
        self.seat_ids()
            .filter_map(|id| self.seat(id).map(|s| (id, s.position.distance(point))))
            .filter(|(_, d)| *d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Seat a live human occupies
    pub fn seat_of_human(&self, human: HumanId) -> Option<SeatId> {
        self.seat_ids()
            .find(|id| self.seat(*id).and_then(Seat::occupying_human) == Some(human))
    }

    pub fn clear_zombie_flags(&mut self) {
        for cart in &mut self.carts {
            for seat in &mut cart.seats {
                seat.occupied_by_zombie = false;
                seat.reserved_by_zombie = false;
            }
        }
    }

    /// Round-boundary bulk reset of human occupancy
    pub fn clear_humans(&mut self) {
        for cart in &mut self.carts {
            for seat in &mut cart.seats {
                seat.clear_humans();
            }
        }
    }

    /// Live humans currently seated
    pub fn seated_count(&self) -> usize {
        self.seat_ids()
            .filter(|id| self.seat(*id).is_some_and(|s| s.occupying_human.is_some()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn coaster() -> Coaster {
        Coaster::new(&CoasterLayout::default())
    }

    #[test]
    fn test_adjacent_seat_pairs() {
        let cart = Cart::new(Vec2::ZERO, 2, 0.8);
        assert_eq!(cart.try_get_adjacent_seat(0), Some(1));
        assert_eq!(cart.try_get_adjacent_seat(1), Some(0));
        assert_eq!(cart.try_get_adjacent_seat(2), None);
        assert_eq!(cart.try_get_adjacent_seat(usize::MAX), None);
    }

    #[test]
    fn test_no_adjacency_for_other_sizes() {
        let cart = Cart::new(Vec2::ZERO, 3, 0.8);
        assert_eq!(cart.try_get_adjacent_seat(0), None);
        let cart = Cart::new(Vec2::ZERO, 1, 0.8);
        assert_eq!(cart.try_get_adjacent_seat(0), None);
    }

    #[test]
    fn test_carts_sorted_front_first() {
        let carts = vec![
            Cart::new(Vec2::new(-3.0, 0.0), 2, 0.8),
            Cart::new(Vec2::new(4.0, 0.0), 2, 0.8),
            Cart::new(Vec2::new(1.0, 0.0), 2, 0.8),
        ];
        let coaster = Coaster::from_carts(carts);
        let xs: Vec<f32> = coaster.carts().iter().map(|c| c.position.x).collect();
        assert_eq!(xs, vec![4.0, 1.0, -3.0]);
        assert_eq!(coaster.rear_cart(), Some(2));
    }

    #[test]
    fn test_passenger_seats_skip_rear_cart() {
        let coaster = coaster();
        let seats = coaster.passenger_seats();
        assert_eq!(seats.len(), 8);
        assert!(seats.iter().all(|s| s.cart < 4));
    }

    #[test]
    fn test_seat_exclusive_between_human_and_zombie() {
        let mut seat = Seat::new(Vec2::ZERO);
        assert!(seat.try_occupy(HumanId(1)));
        assert!(!seat.try_occupy(HumanId(2)));
        assert!(!seat.set_zombie_occupation(true));

        assert!(!seat.release(HumanId(2)));
        assert!(seat.release(HumanId(1)));
        assert!(seat.set_zombie_occupation(true));
        assert!(!seat.try_occupy(HumanId(2)));
    }

    #[test]
    fn test_reservation_blocks_humans_until_settled() {
        let mut seat = Seat::new(Vec2::ZERO);
        assert!(seat.reserve_for_zombie(true));
        assert!(!seat.is_vacant());
        assert!(!seat.is_occupied_by_zombie());
        assert!(!seat.try_occupy(HumanId(1)));

        assert!(seat.settle_zombie());
        assert!(seat.is_occupied_by_zombie());
        assert!(!seat.is_reserved_by_zombie());

        let mut taken = Seat::new(Vec2::ZERO);
        assert!(taken.try_occupy(HumanId(2)));
        assert!(!taken.reserve_for_zombie(true));
        assert!(!taken.settle_zombie());
        assert!(!taken.is_claimed_by_zombie());
    }

    #[test]
    fn test_corpse_blocks_boarding() {
        let mut seat = Seat::new(Vec2::ZERO);
        assert!(seat.try_occupy(HumanId(3)));
        seat.place_corpse(HumanId(3));
        assert_eq!(seat.occupying_human(), None);
        assert_eq!(seat.corpse(), Some(HumanId(3)));
        assert!(!seat.try_occupy(HumanId(4)));
        assert_eq!(seat.remove_corpse(), Some(HumanId(3)));
        assert!(seat.is_vacant());
    }

    #[test]
    fn test_seat_at_picks_nearest() {
        let coaster = coaster();
        let target = SeatId::new(2, 1);
        let pos = coaster.seat(target).unwrap().position + Vec2::new(0.1, 0.2);
        assert_eq!(coaster.seat_at(pos, 1.0), Some(target));
        assert_eq!(coaster.seat_at(Vec2::new(0.0, 50.0), 1.0), None);
    }

    #[test]
    fn test_bulk_reset_keeps_zombie_flag() {
        let mut coaster = coaster();
        let rear = SeatId::new(4, 0);
        coaster.seat_mut(rear).unwrap().set_zombie_occupation(true);
        coaster.seat_mut(SeatId::new(4, 1)).unwrap().reserve_for_zombie(true);
        coaster.seat_mut(SeatId::new(0, 0)).unwrap().try_occupy(HumanId(9));
        coaster.clear_humans();
        assert_eq!(coaster.seated_count(), 0);
        assert!(coaster.seat(rear).unwrap().is_occupied_by_zombie());
        coaster.clear_zombie_flags();
        assert!(!coaster.seat(rear).unwrap().is_occupied_by_zombie());
        assert!(coaster.seat(SeatId::new(4, 1)).unwrap().is_vacant());
    }

    #[derive(Debug, Clone)]
    enum SeatOp {
        Occupy(u32),
        Release(u32),
        Zombie(bool),
        Reserve(bool),
        Settle,
        Kill(u32),
        RemoveCorpse,
    }

    fn seat_op() -> impl Strategy<Value = SeatOp> {
        prop_oneof![
            (0u32..4).prop_map(SeatOp::Occupy),
            (0u32..4).prop_map(SeatOp::Release),
            any::<bool>().prop_map(SeatOp::Zombie),
            any::<bool>().prop_map(SeatOp::Reserve),
            Just(SeatOp::Settle),
            (0u32..4).prop_map(SeatOp::Kill),
            Just(SeatOp::RemoveCorpse),
        ]
    }

    proptest! {
        #[test]
        fn prop_live_human_and_zombie_never_share(ops in prop::collection::vec(seat_op(), 0..64)) {
            let mut seat = Seat::new(Vec2::ZERO);
            for op in ops {
                match op {
                    SeatOp::Occupy(h) => { seat.try_occupy(HumanId(h)); }
                    SeatOp::Release(h) => { seat.release(HumanId(h)); }
                    SeatOp::Zombie(z) => { seat.set_zombie_occupation(z); }
                    SeatOp::Reserve(r) => { seat.reserve_for_zombie(r); }
                    SeatOp::Settle => { seat.settle_zombie(); }
                    SeatOp::Kill(h) => {
                        if seat.occupying_human() == Some(HumanId(h)) {
                            seat.place_corpse(HumanId(h));
                        }
                    }
                    SeatOp::RemoveCorpse => { seat.remove_corpse(); }
                }
                prop_assert!(!(seat.occupying_human().is_some() && seat.is_claimed_by_zombie()));
                prop_assert!(!(seat.occupying_human().is_some() && seat.corpse().is_some()));
            }
        }
    }
}
