//! Player registry: connection-scoped identities and their outbound queues.
//!
//! `PlayerRegistry` is not thread-safe by itself; it lives inside the
//! engine behind the server's mutex, so all mutation is already
//! serialized when it gets here.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use dropfour_game::Seat;
use dropfour_protocol::{PlayerId, RoomId, ServerEvent};

/// Counter for generating unique connection IDs.
static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one accepted socket for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

impl ConnId {
    /// Allocates the next connection ID.
    pub fn next() -> Self {
        ConnId(NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Sender half of a connection's outbound event queue. The connection's
/// writer task owns the receiving half and performs the socket writes.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// A registered player.
#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub conn: ConnId,
    /// Room the player is seated in or watching, if any.
    pub room: Option<RoomId>,
    /// Seat held in `room`; `None` in the lobby or as a spectator.
    pub seat: Option<Seat>,
    sender: EventSender,
}

impl Player {
    /// Queues an event for this player's writer task. Silently drops the
    /// event if the connection is already gone.
    pub fn send(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

/// Owns every registered player, keyed by player ID with a secondary
/// index by connection for socket-side lookups.
pub struct PlayerRegistry {
    players: HashMap<PlayerId, Player>,
    by_conn: HashMap<ConnId, PlayerId>,
    next_id: u64,
    capacity: usize,
}

impl PlayerRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            players: HashMap::new(),
            by_conn: HashMap::new(),
            next_id: 1,
            capacity,
        }
    }

    /// Registers `conn` under `name` and returns the fresh ID, or `None`
    /// when every slot is taken. IDs increase monotonically and are never
    /// reused, so a stale ID can't alias a later player.
    pub fn register(&mut self, conn: ConnId, name: String, sender: EventSender) -> Option<PlayerId> {
        if self.players.len() >= self.capacity {
            return None;
        }
        let id = PlayerId(self.next_id);
        self.next_id += 1;
        tracing::info!(player_id = %id, %name, "player registered");
        self.players.insert(
            id,
            Player { id, name, conn, room: None, seat: None, sender },
        );
        self.by_conn.insert(conn, id);
        Some(id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// The player registered on `conn`, if any.
    pub fn id_by_conn(&self, conn: ConnId) -> Option<PlayerId> {
        self.by_conn.get(&conn).copied()
    }

    /// Invalidates the entry registered on `conn`. Idempotent: a second
    /// call for the same connection returns `None`.
    pub fn unregister(&mut self, conn: ConnId) -> Option<Player> {
        let id = self.by_conn.remove(&conn)?;
        let player = self.players.remove(&id);
        if player.is_some() {
            tracing::info!(player_id = %id, "player unregistered");
        }
        player
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// Truncates a display name to `max` bytes without splitting a UTF-8
/// character.
pub(crate) fn truncate_name(name: &str, max: usize) -> String {
    let mut end = name.len().min(max);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}
