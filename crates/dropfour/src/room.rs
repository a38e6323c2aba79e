//! Room state and the fixed-range room table.

use std::collections::HashMap;
use std::time::Instant;

use dropfour_game::{Game, Seat};
use dropfour_protocol::{PlayerId, RoomId};

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// Lifecycle of a room slot.
///
/// ```text
/// Waiting ──second seat fills──▶ Active ──win/draw/timeout/quit/drop──▶ Ended
/// ```
///
/// The slot itself is reclaimed (removed from the table) once both seats
/// are vacant, whatever the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Seat one is filled; waiting for an opponent.
    Waiting,
    /// Both seats filled; the turn clock is running.
    Active,
    /// Terminal. Seats may still be occupied until their players move on.
    Ended,
}

impl RoomPhase {
    pub fn is_active(self) -> bool {
        matches!(self, RoomPhase::Active)
    }
}

/// One allocated room slot: two seats, a game, and an ordered audience.
#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    pub phase: RoomPhase,
    pub is_public: bool,
    /// Reserved for the client-driven AI mode; never set server-side.
    pub vs_ai: bool,
    pub game: Game,
    /// Stamped at creation, at activation, and on every accepted move.
    pub last_move: Instant,
    seats: [Option<PlayerId>; 2],
    audience: Vec<PlayerId>,
}

impl Room {
    fn new(id: RoomId, owner: PlayerId, is_public: bool, now: Instant) -> Self {
        Room {
            id,
            phase: RoomPhase::Waiting,
            is_public,
            vs_ai: false,
            game: Game::new(),
            last_move: now,
            seats: [Some(owner), None],
            audience: Vec::new(),
        }
    }

    /// Seats `player` as seat two and starts the game clock.
    pub fn fill_seat_two(&mut self, player: PlayerId, now: Instant) {
        self.seats[1] = Some(player);
        self.phase = RoomPhase::Active;
        self.last_move = now;
    }

    pub fn player_at(&self, seat: Seat) -> Option<PlayerId> {
        match seat {
            Seat::One => self.seats[0],
            Seat::Two => self.seats[1],
        }
    }

    pub fn seat_of(&self, player: PlayerId) -> Option<Seat> {
        if self.seats[0] == Some(player) {
            Some(Seat::One)
        } else if self.seats[1] == Some(player) {
            Some(Seat::Two)
        } else {
            None
        }
    }

    /// Clears `player`'s seat, returning which one they held.
    pub fn vacate(&mut self, player: PlayerId) -> Option<Seat> {
        let seat = self.seat_of(player)?;
        match seat {
            Seat::One => self.seats[0] = None,
            Seat::Two => self.seats[1] = None,
        }
        Some(seat)
    }

    pub fn seats_vacant(&self) -> bool {
        self.seats.iter().all(Option::is_none)
    }

    /// The player whose turn it is, while both the game and seats allow one.
    pub fn current_player(&self) -> Option<PlayerId> {
        self.player_at(self.game.turn())
    }

    pub fn has_spectator(&self, player: PlayerId) -> bool {
        self.audience.contains(&player)
    }

    /// `true` when `player` holds a seat or watches from the audience.
    pub fn is_member(&self, player: PlayerId) -> bool {
        self.seat_of(player).is_some() || self.has_spectator(player)
    }

    pub fn add_spectator(&mut self, player: PlayerId) {
        self.audience.push(player);
    }

    /// Shift-removes `player` from the audience, preserving the relative
    /// order of everyone behind them.
    pub fn remove_spectator(&mut self, player: PlayerId) -> bool {
        match self.audience.iter().position(|p| *p == player) {
            Some(index) => {
                self.audience.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn audience(&self) -> &[PlayerId] {
        &self.audience
    }

    /// Seated players, seat one first.
    pub fn seated(&self) -> Vec<PlayerId> {
        self.seats.iter().flatten().copied().collect()
    }

    /// Everyone attached to the room: seats first, then the audience in
    /// join order.
    pub fn members(&self) -> Vec<PlayerId> {
        self.seats
            .iter()
            .flatten()
            .copied()
            .chain(self.audience.iter().copied())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Room table
// ---------------------------------------------------------------------------

/// Fixed pool of room slots, keyed by IDs from a contiguous range.
pub struct RoomTable {
    rooms: HashMap<RoomId, Room>,
    min_id: u32,
    max_id: u32,
}

impl RoomTable {
    pub fn new(min_id: u32, max_id: u32) -> Self {
        Self { rooms: HashMap::new(), min_id, max_id }
    }

    /// Allocates the lowest free ID in the range and seats `owner` as seat
    /// one, or returns `None` when the pool is exhausted.
    pub fn allocate(&mut self, owner: PlayerId, is_public: bool, now: Instant) -> Option<&mut Room> {
        let room_id = (self.min_id..=self.max_id)
            .map(RoomId)
            .find(|id| !self.rooms.contains_key(id))?;
        tracing::info!(%room_id, %owner, is_public, "room created");
        Some(self.rooms.entry(room_id).or_insert(Room::new(room_id, owner, is_public, now)))
    }

    pub fn get(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn get_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    /// Frees the slot, returning the room so callers can evict its
    /// audience.
    pub fn remove(&mut self, id: RoomId) -> Option<Room> {
        let room = self.rooms.remove(&id);
        if room.is_some() {
            tracing::info!(room_id = %id, "room reclaimed");
        }
        room
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RoomTable {
        RoomTable::new(1001, 1003)
    }

    #[test]
    fn test_allocate_hands_out_lowest_free_id() {
        let mut rooms = table();
        let now = Instant::now();
        assert_eq!(rooms.allocate(PlayerId(1), true, now).unwrap().id, RoomId(1001));
        assert_eq!(rooms.allocate(PlayerId(2), true, now).unwrap().id, RoomId(1002));
    }

    #[test]
    fn test_allocate_reuses_reclaimed_slot() {
        let mut rooms = table();
        let now = Instant::now();
        rooms.allocate(PlayerId(1), true, now);
        rooms.allocate(PlayerId(2), true, now);
        rooms.remove(RoomId(1001));
        assert_eq!(rooms.allocate(PlayerId(3), true, now).unwrap().id, RoomId(1001));
    }

    #[test]
    fn test_allocate_returns_none_when_pool_exhausted() {
        let mut rooms = table();
        let now = Instant::now();
        for owner in 1..=3 {
            assert!(rooms.allocate(PlayerId(owner), true, now).is_some());
        }
        assert!(rooms.allocate(PlayerId(9), true, now).is_none());
    }

    #[test]
    fn test_new_room_waits_with_owner_in_seat_one() {
        let mut rooms = table();
        let room = rooms.allocate(PlayerId(7), false, Instant::now()).unwrap();
        assert_eq!(room.phase, RoomPhase::Waiting);
        assert_eq!(room.player_at(Seat::One), Some(PlayerId(7)));
        assert_eq!(room.player_at(Seat::Two), None);
        assert!(!room.is_public);
    }

    #[test]
    fn test_fill_seat_two_activates_room() {
        let mut rooms = table();
        let room = rooms.allocate(PlayerId(1), true, Instant::now()).unwrap();
        room.fill_seat_two(PlayerId(2), Instant::now());
        assert_eq!(room.phase, RoomPhase::Active);
        assert_eq!(room.seat_of(PlayerId(2)), Some(Seat::Two));
        assert_eq!(room.current_player(), Some(PlayerId(1)));
    }

    #[test]
    fn test_vacate_clears_only_that_seat() {
        let mut rooms = table();
        let room = rooms.allocate(PlayerId(1), true, Instant::now()).unwrap();
        room.fill_seat_two(PlayerId(2), Instant::now());
        assert_eq!(room.vacate(PlayerId(1)), Some(Seat::One));
        assert!(!room.seats_vacant());
        assert_eq!(room.vacate(PlayerId(2)), Some(Seat::Two));
        assert!(room.seats_vacant());
        assert_eq!(room.vacate(PlayerId(2)), None);
    }

    #[test]
    fn test_remove_spectator_preserves_order() {
        let mut rooms = table();
        let room = rooms.allocate(PlayerId(1), true, Instant::now()).unwrap();
        for id in [10, 11, 12] {
            room.add_spectator(PlayerId(id));
        }
        assert!(room.remove_spectator(PlayerId(11)));
        assert_eq!(room.audience(), &[PlayerId(10), PlayerId(12)]);
        assert!(!room.remove_spectator(PlayerId(11)));
    }

    #[test]
    fn test_members_lists_seats_before_audience() {
        let mut rooms = table();
        let room = rooms.allocate(PlayerId(1), true, Instant::now()).unwrap();
        room.fill_seat_two(PlayerId(2), Instant::now());
        room.add_spectator(PlayerId(3));
        assert_eq!(room.members(), vec![PlayerId(1), PlayerId(2), PlayerId(3)]);
        assert_eq!(room.seated(), vec![PlayerId(1), PlayerId(2)]);
    }
}
