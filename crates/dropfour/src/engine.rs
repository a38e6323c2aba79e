//! The session/room engine: every state transition and broadcast.
//!
//! One [`Engine`] owns the player registry, the room table, and the
//! waitlist; the server wraps it in a single mutex, so each command and
//! each timeout sweep runs start-to-finish against consistent state.
//! Methods queue outbound events on per-connection senders and never
//! block, which keeps the lock hold times short and lets a stalled peer's
//! writer task absorb the delay instead of the engine.

use std::time::Instant;

use dropfour_game::{MoveError, Outcome, Seat};
use dropfour_protocol::{ClientCommand, GameEnd, PlayerId, RoomId, ServerEvent};

use crate::config::ServerConfig;
use crate::registry::{ConnId, EventSender, PlayerRegistry, truncate_name};
use crate::room::{RoomPhase, RoomTable};
use crate::waitlist::Waitlist;

pub struct Engine {
    config: ServerConfig,
    players: PlayerRegistry,
    rooms: RoomTable,
    waitlist: Waitlist,
}

impl Engine {
    pub fn new(config: ServerConfig) -> Self {
        let players = PlayerRegistry::new(config.max_players);
        let rooms = RoomTable::new(config.min_room_id, config.max_room_id);
        Self { config, players, rooms, waitlist: Waitlist::new() }
    }

    /// Dispatches one decoded command from `conn`.
    ///
    /// `sender` is the connection's outbound queue, needed only for
    /// registration; every other command addresses players through the
    /// registry. `now` is taken as a parameter so tests can drive the
    /// turn clock deterministically.
    pub fn handle(
        &mut self,
        conn: ConnId,
        command: ClientCommand,
        sender: &EventSender,
        now: Instant,
    ) {
        match command {
            ClientCommand::Register { name } => self.register(conn, &name, sender),
            ClientCommand::QuickMatch { player } => self.quick_match(player, now),
            ClientCommand::CreateRoom { player } => self.create_room(player, now),
            ClientCommand::JoinRoom { player, room } => self.join_room(player, room, now),
            ClientCommand::Spectate { player, room } => self.spectate(player, room),
            ClientCommand::Move { player, column } => self.apply_move(player, column, now),
            ClientCommand::Chat { player, text } => self.chat(player, &text),
            ClientCommand::Quit { player } => self.quit(player),
            ClientCommand::Leave { player } => self.leave(player),
        }
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Registers `conn` under `name` and replies with the assigned
    /// identity. A repeated registration on the same connection re-sends
    /// the existing identity; a full registry is surfaced as a status
    /// line rather than silence.
    pub fn register(&mut self, conn: ConnId, name: &str, sender: &EventSender) {
        if let Some(existing) = self.players.id_by_conn(conn) {
            tracing::debug!(%conn, player_id = %existing, "repeated registration");
            let _ = sender.send(ServerEvent::Identity(existing));
            return;
        }
        let name = truncate_name(name, self.config.max_name_len);
        match self.players.register(conn, name, sender.clone()) {
            Some(id) => {
                let _ = sender.send(ServerEvent::Identity(id));
            }
            None => {
                tracing::warn!(%conn, "registry full, registration refused");
                let _ = sender.send(ServerEvent::status("Server is full"));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Matchmaking and room entry
    // -----------------------------------------------------------------------

    /// Random matchmaking. Pairs the requester with the longest-waiting
    /// player, who takes seat one; with nobody waiting the requester is
    /// queued instead. A requester who is already queued just hears
    /// `Matching...` again.
    pub fn quick_match(&mut self, player: PlayerId, now: Instant) {
        if self.players.get(player).is_none() {
            tracing::debug!(%player, "quick match for unknown player");
            return;
        }
        if self.waitlist.contains(player) {
            self.send_to(player, ServerEvent::status("Matching..."));
            return;
        }
        if self.seated_in_active(player) {
            self.send_to(player, ServerEvent::status("Already in a game"));
            return;
        }
        self.detach_for_lobby(player);

        let Some(waiter) = self.waitlist.peek() else {
            self.waitlist.push(player);
            self.send_to(player, ServerEvent::status("Matching..."));
            return;
        };
        let Some(room_id) = self.open_room(waiter, true, now) else {
            // the waiter keeps their place at the head of the queue
            self.send_to(player, ServerEvent::status("No rooms available"));
            return;
        };
        self.waitlist.pop();
        self.seat_opponent(player, room_id, now);
    }

    /// Creates a private room with the requester in seat one. The client's
    /// create flow also reads the ID from a status line, so the room
    /// notice is bracketed by `w<id>` and a second `r<id>`.
    pub fn create_room(&mut self, player: PlayerId, now: Instant) {
        if self.players.get(player).is_none() {
            tracing::debug!(%player, "create room for unknown player");
            return;
        }
        if self.seated_in_active(player) {
            self.send_to(player, ServerEvent::status("Already in a game"));
            return;
        }
        self.detach_for_lobby(player);
        match self.open_room(player, false, now) {
            Some(room_id) => {
                self.send_to(player, ServerEvent::status(room_id.to_string()));
                self.send_to(player, ServerEvent::RoomNotice(room_id));
            }
            None => self.send_to(player, ServerEvent::status("No rooms available")),
        }
    }

    /// Joins `room_id` as seat two. Rejected when the room is not waiting
    /// for an opponent or the joiner already owns it.
    pub fn join_room(&mut self, player: PlayerId, room_id: RoomId, now: Instant) {
        if self.players.get(player).is_none() {
            tracing::debug!(%player, "join for unknown player");
            return;
        }
        if self.seated_in_active(player) {
            self.send_to(player, ServerEvent::status("Already in a game"));
            return;
        }
        let joinable = self.rooms.get(room_id).is_some_and(|room| {
            room.phase == RoomPhase::Waiting
                && room.player_at(Seat::Two).is_none()
                && room.player_at(Seat::One) != Some(player)
        });
        if !joinable {
            self.send_to(player, ServerEvent::status("Room full or invalid"));
            return;
        }
        self.detach_for_lobby(player);
        self.seat_opponent(player, room_id, now);
    }

    /// Joins `room_id` as a spectator: snapshot to the newcomer, then the
    /// updated count and a system chat notice to the whole room.
    pub fn spectate(&mut self, player: PlayerId, room_id: RoomId) {
        if self.players.get(player).is_none() {
            tracing::debug!(%player, "spectate for unknown player");
            return;
        }
        if self.seated_in_active(player) {
            self.send_to(player, ServerEvent::status("Already in a game"));
            return;
        }
        let eligible = self.rooms.get(room_id).is_some_and(|room| {
            room.phase.is_active()
                && room.audience().len() < self.config.max_audience
                && !room.is_member(player)
        });
        if !eligible {
            self.send_to(player, ServerEvent::status("Cannot join room as audience"));
            return;
        }
        self.detach_for_lobby(player);

        let (seat1, seat2, turn, board, count) = {
            let Some(room) = self.rooms.get_mut(room_id) else { return };
            room.add_spectator(player);
            (
                room.player_at(Seat::One),
                room.player_at(Seat::Two),
                room.current_player(),
                *room.game.board(),
                room.audience().len(),
            )
        };
        if let Some(p) = self.players.get_mut(player) {
            p.room = Some(room_id);
            p.seat = None;
        }
        let name = self.players.get(player).map(|p| p.name.clone()).unwrap_or_default();
        tracing::info!(%room_id, player_id = %player, "spectator joined");

        self.send_to(player, ServerEvent::RoomNotice(room_id));
        for (seat, occupant) in [(Seat::One, seat1), (Seat::Two, seat2)] {
            let Some(id) = occupant else { continue };
            let Some(seat_name) = self.players.get(id).map(|p| p.name.clone()) else {
                continue;
            };
            self.send_to(player, ServerEvent::SeatName { seat, name: seat_name });
            self.send_to(player, ServerEvent::SeatId { seat, id });
        }
        if let Some(turn) = turn {
            self.send_to(player, ServerEvent::AudienceTurn(turn));
        }
        self.send_to(player, ServerEvent::SyncDone);
        self.send_to(player, ServerEvent::Board(board));

        self.notify_room(room_id, ServerEvent::AudienceCount(count));
        self.notify_room(
            room_id,
            ServerEvent::Chat {
                sender: "System".into(),
                text: format!("New Audience Join ({name})"),
            },
        );
    }

    // -----------------------------------------------------------------------
    // Moves and chat
    // -----------------------------------------------------------------------

    /// Applies a move for `player` in wire column `column` (1-based).
    ///
    /// Rejections reach only the requester as a status line and change
    /// nothing; a full column is a silent no-op that does not even touch
    /// the turn clock. An accepted move refreshes the clock, flips the
    /// turn, and broadcasts turn + board, followed by the end-of-game
    /// event when it completed a line or filled the board.
    pub fn apply_move(&mut self, player: PlayerId, column: u32, now: Instant) {
        let Some(room_id) = self.players.get(player).and_then(|p| p.room) else {
            tracing::debug!(%player, "move from a player not in a room");
            return;
        };
        let verdict = {
            let Some(room) = self.rooms.get_mut(room_id) else { return };
            let Some(seat) = room.seat_of(player) else {
                tracing::debug!(%player, %room_id, "move from a spectator");
                return;
            };
            if !room.phase.is_active() {
                Err(Some("Game is not active"))
            } else {
                match room.game.apply(seat, column) {
                    Ok(placement) => {
                        room.last_move = now;
                        if placement.outcome.is_some() {
                            room.phase = RoomPhase::Ended;
                        }
                        Ok((room.current_player(), *room.game.board(), placement.outcome))
                    }
                    Err(MoveError::ColumnFull(_)) => Err(None),
                    Err(MoveError::ColumnOutOfRange(_)) => Err(Some("Invalid move")),
                    Err(MoveError::NotYourTurn) => Err(Some("Not your turn")),
                    Err(MoveError::Finished) => Err(Some("Game is not active")),
                }
            }
        };
        match verdict {
            Err(Some(message)) => self.send_to(player, ServerEvent::status(message)),
            Err(None) => {}
            Ok((turn, board, outcome)) => {
                if let Some(turn) = turn {
                    self.notify_seats(room_id, ServerEvent::Turn(turn));
                    self.notify_audience(room_id, ServerEvent::AudienceTurn(turn));
                }
                self.notify_room(room_id, ServerEvent::Board(board));
                match outcome {
                    Some(Outcome::Win(seat)) => {
                        tracing::info!(%room_id, winner = %seat, "game won");
                        self.notify_room(room_id, ServerEvent::End(GameEnd::Win(seat)));
                    }
                    Some(Outcome::Draw) => {
                        tracing::info!(%room_id, "game drawn");
                        self.notify_room(room_id, ServerEvent::End(GameEnd::Draw));
                    }
                    None => {}
                }
            }
        }
    }

    /// Re-broadcasts a chat line to the sender's room. Chat from players
    /// outside a room is dropped.
    pub fn chat(&mut self, player: PlayerId, text: &str) {
        let Some(p) = self.players.get(player) else {
            tracing::debug!(%player, "chat from unknown player");
            return;
        };
        let Some(room_id) = p.room else {
            tracing::debug!(%player, "chat outside a room");
            return;
        };
        let name = p.name.clone();
        if !self.rooms.get(room_id).is_some_and(|room| room.is_member(player)) {
            tracing::debug!(%player, %room_id, "chat from a non-member");
            return;
        }
        self.notify_room(room_id, ServerEvent::Chat { sender: name, text: text.to_string() });
    }

    // -----------------------------------------------------------------------
    // Leaving: quit, spectator leave, disconnect
    // -----------------------------------------------------------------------

    /// Quit/forfeit. A seated player vacates their seat in any phase; if
    /// the game was running the room hears `eQ<id>` and ends. A quitting
    /// spectator is handled like a leave without the menu ack.
    pub fn quit(&mut self, player: PlayerId) {
        let Some(p) = self.players.get(player) else {
            tracing::debug!(%player, "quit from unknown player");
            return;
        };
        let Some(room_id) = p.room else {
            tracing::debug!(%player, "quit outside a room");
            return;
        };
        let name = p.name.clone();
        let seated = self.rooms.get(room_id).is_some_and(|room| room.seat_of(player).is_some());
        if seated {
            tracing::info!(%room_id, player_id = %player, "player quit");
            let was_active = self.vacate_seat(player, room_id);
            if was_active {
                self.notify_room(room_id, ServerEvent::End(GameEnd::Forfeit(player)));
            }
            self.reclaim_if_vacant(room_id);
        } else if self.drop_spectator(player, room_id) {
            self.audience_notice(room_id, &name, "Left");
        }
    }

    /// Spectator leave: removes them from the audience, acks with a blank
    /// status line (the client's cue to return to its menu), and posts
    /// the departure notice while the game is still running.
    pub fn leave(&mut self, player: PlayerId) {
        let Some(p) = self.players.get(player) else {
            tracing::debug!(%player, "leave from unknown player");
            return;
        };
        let Some(room_id) = p.room else {
            tracing::debug!(%player, "leave outside a room");
            return;
        };
        let name = p.name.clone();
        if self.drop_spectator(player, room_id) {
            self.send_to(player, ServerEvent::status(" "));
            self.audience_notice(room_id, &name, "Left");
        } else {
            tracing::debug!(%player, %room_id, "leave from a non-spectator");
        }
    }

    /// Converts an abrupt connection closure into explicit leave/forfeit
    /// semantics. Idempotent: the second call for a connection is a no-op.
    pub fn disconnect(&mut self, conn: ConnId) {
        let Some(player) = self.players.unregister(conn) else { return };
        self.waitlist.remove(player.id);
        let Some(room_id) = player.room else { return };

        let seated = self.rooms.get(room_id).is_some_and(|room| room.seat_of(player.id).is_some());
        if seated {
            let was_active = self.vacate_seat(player.id, room_id);
            if was_active {
                tracing::info!(%room_id, player_id = %player.id, "seated player disconnected");
                self.notify_room(room_id, ServerEvent::End(GameEnd::Abandoned));
            }
            self.reclaim_if_vacant(room_id);
        } else {
            self.audience_notice(room_id, &player.name, "Disconnected");
            self.drop_spectator(player.id, room_id);
        }
    }

    // -----------------------------------------------------------------------
    // Timeout sweep
    // -----------------------------------------------------------------------

    /// Declares a turn-timeout loss in every Active room whose clock has
    /// run past the threshold. Ended rooms are skipped, so a given game
    /// times out at most once.
    pub fn sweep_timeouts(&mut self, now: Instant) {
        let expired: Vec<(RoomId, PlayerId)> = self
            .rooms
            .rooms()
            .filter(|room| room.phase.is_active())
            .filter(|room| now.duration_since(room.last_move) > self.config.turn_timeout)
            .filter_map(|room| room.current_player().map(|loser| (room.id, loser)))
            .collect();
        for (room_id, loser) in expired {
            tracing::info!(%room_id, player_id = %loser, "turn timed out");
            if let Some(room) = self.rooms.get_mut(room_id) {
                room.phase = RoomPhase::Ended;
            }
            self.notify_room(room_id, ServerEvent::End(GameEnd::Timeout(loser)));
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn waitlist_len(&self) -> usize {
        self.waitlist.len()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Whether `player` holds a seat in a room whose game is running.
    /// Such a seat is never given up by a lobby command; forfeits are
    /// explicit (`q`) or implicit (disconnect).
    fn seated_in_active(&self, player: PlayerId) -> bool {
        self.players
            .get(player)
            .and_then(|p| p.room)
            .and_then(|room_id| self.rooms.get(room_id))
            .is_some_and(|room| room.phase.is_active() && room.seat_of(player).is_some())
    }

    /// Detaches `player` from the waitlist and any current room ahead of
    /// a lobby command that re-attaches them elsewhere. Callers have
    /// already rejected players seated in an Active room.
    fn detach_for_lobby(&mut self, player: PlayerId) {
        self.waitlist.remove(player);
        let Some(room_id) = self.players.get(player).and_then(|p| p.room) else { return };
        if let Some(p) = self.players.get_mut(player) {
            p.room = None;
            p.seat = None;
        }
        let Some(room) = self.rooms.get_mut(room_id) else { return };
        if room.vacate(player).is_some() {
            if room.seats_vacant() {
                self.reclaim(room_id);
            }
        } else if room.remove_spectator(player) {
            let count = room.audience().len();
            self.notify_room(room_id, ServerEvent::AudienceCount(count));
        }
    }

    /// Allocates a room with `owner` in seat one and sends them the room
    /// notice. `None` when the ID pool is exhausted.
    fn open_room(&mut self, owner: PlayerId, is_public: bool, now: Instant) -> Option<RoomId> {
        let room_id = self.rooms.allocate(owner, is_public, now)?.id;
        if let Some(p) = self.players.get_mut(owner) {
            p.room = Some(room_id);
            p.seat = Some(Seat::One);
        }
        self.send_to(owner, ServerEvent::RoomNotice(room_id));
        Some(room_id)
    }

    /// Seats `player` as seat two of `room_id`, activates the room, and
    /// runs the join notices plus the per-seat state sync: audience
    /// count, room ID, turn, opponent name, own seat, opponent ID, board.
    fn seat_opponent(&mut self, player: PlayerId, room_id: RoomId, now: Instant) {
        let (owner, audience, board, turn) = {
            let Some(room) = self.rooms.get_mut(room_id) else { return };
            let Some(owner) = room.player_at(Seat::One) else { return };
            room.fill_seat_two(player, now);
            let Some(turn) = room.current_player() else { return };
            (owner, room.audience().len(), *room.game.board(), turn)
        };
        if let Some(p) = self.players.get_mut(player) {
            p.room = Some(room_id);
            p.seat = Some(Seat::Two);
        }
        let owner_name = self.players.get(owner).map(|p| p.name.clone()).unwrap_or_default();
        let joiner_name = self.players.get(player).map(|p| p.name.clone()).unwrap_or_default();
        tracing::info!(%room_id, player_id = %player, "room activated");

        self.send_to(owner, ServerEvent::RoomNotice(room_id));
        self.send_to(player, ServerEvent::RoomNotice(room_id));
        self.send_to(owner, ServerEvent::OpponentJoined(joiner_name.clone()));

        let sync = [
            (owner, Seat::One, player, joiner_name),
            (player, Seat::Two, owner, owner_name),
        ];
        for (to, seat, opponent, opponent_name) in sync {
            self.send_to(to, ServerEvent::AudienceCount(audience));
            self.send_to(to, ServerEvent::RoomNotice(room_id));
            self.send_to(to, ServerEvent::Turn(turn));
            self.send_to(to, ServerEvent::OpponentName(opponent_name));
            self.send_to(to, ServerEvent::SeatNumber(seat));
            self.send_to(to, ServerEvent::OpponentId(opponent));
            self.send_to(to, ServerEvent::Board(board));
        }
    }

    /// Vacates `player`'s seat and flags a running game as ended.
    /// Returns whether the room was Active when they left.
    fn vacate_seat(&mut self, player: PlayerId, room_id: RoomId) -> bool {
        let Some(room) = self.rooms.get_mut(room_id) else { return false };
        let was_active = room.phase.is_active();
        if was_active {
            room.phase = RoomPhase::Ended;
        }
        room.vacate(player);
        if let Some(p) = self.players.get_mut(player) {
            p.room = None;
            p.seat = None;
        }
        was_active
    }

    fn reclaim_if_vacant(&mut self, room_id: RoomId) {
        if self.rooms.get(room_id).is_some_and(|room| room.seats_vacant()) {
            self.reclaim(room_id);
        }
    }

    /// Frees the room slot and evicts its audience with a closure notice.
    fn reclaim(&mut self, room_id: RoomId) {
        let Some(room) = self.rooms.remove(room_id) else { return };
        for &watcher in room.audience() {
            if let Some(p) = self.players.get_mut(watcher) {
                p.room = None;
                p.seat = None;
            }
            self.send_to(watcher, ServerEvent::status("Room closed"));
        }
    }

    /// Removes `player` from `room_id`'s audience and re-broadcasts the
    /// count. Returns whether they were actually watching.
    fn drop_spectator(&mut self, player: PlayerId, room_id: RoomId) -> bool {
        let Some(room) = self.rooms.get_mut(room_id) else { return false };
        if !room.remove_spectator(player) {
            return false;
        }
        let count = room.audience().len();
        if let Some(p) = self.players.get_mut(player) {
            p.room = None;
        }
        self.notify_room(room_id, ServerEvent::AudienceCount(count));
        true
    }

    /// System chat notice for an audience departure, posted only while
    /// the game is still running.
    fn audience_notice(&self, room_id: RoomId, name: &str, verb: &str) {
        if self.rooms.get(room_id).is_some_and(|room| room.phase.is_active()) {
            self.notify_room(
                room_id,
                ServerEvent::Chat {
                    sender: "System".into(),
                    text: format!("Audience ({name}) {verb}"),
                },
            );
        }
    }

    /// Queues `event` for `player`'s writer task; silently dropped when
    /// the player or their connection is gone.
    fn send_to(&self, player: PlayerId, event: ServerEvent) {
        if let Some(p) = self.players.get(player) {
            p.send(event);
        }
    }

    /// Broadcast to everyone attached to the room: both seats, then the
    /// audience in join order.
    fn notify_room(&self, room_id: RoomId, event: ServerEvent) {
        let Some(room) = self.rooms.get(room_id) else { return };
        for member in room.members() {
            self.send_to(member, event.clone());
        }
    }

    /// Broadcast to the seated players only.
    fn notify_seats(&self, room_id: RoomId, event: ServerEvent) {
        let Some(room) = self.rooms.get(room_id) else { return };
        for seat in room.seated() {
            self.send_to(seat, event.clone());
        }
    }

    /// Broadcast to the audience only.
    fn notify_audience(&self, room_id: RoomId, event: ServerEvent) {
        let Some(room) = self.rooms.get(room_id) else { return };
        for &watcher in room.audience() {
            self.send_to(watcher, event.clone());
        }
    }
}
