//! Outbound event encoding.
//!
//! Engine code pushes typed [`ServerEvent`]s onto per-connection queues;
//! the writer task renders each with `Display` and appends the newline at
//! the socket. Keeping events typed until the socket edge means tests can
//! assert on variants instead of strings.

use std::fmt;

use dropfour_game::{Board, Seat};

use crate::{PlayerId, RoomId};

/// How a game ended, carried by the `e` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEnd {
    /// `e1` / `e2` — the named seat completed a line of four.
    Win(Seat),
    /// `e9` — full board, no line.
    Draw,
    /// `eT<id>` — the named player let the turn clock expire.
    Timeout(PlayerId),
    /// `eX` — a seated opponent's connection dropped.
    Abandoned,
    /// `eQ<id>` — the named player quit mid-game.
    Forfeit(PlayerId),
}

/// A server-to-client line, minus the trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// `i<id>` — identity assigned at registration.
    Identity(PlayerId),
    /// `r<id>` — room identifier notice.
    RoomNotice(RoomId),
    /// `w<text>` — status, waiting, or error text.
    Status(String),
    /// `j<name>` — opponent joined; sent to seat one.
    OpponentJoined(String),
    /// `a<count>` — spectator count update.
    AudienceCount(usize),
    /// `p1<name>` — opponent's display name (seat sync).
    OpponentName(String),
    /// `p2<id>` — opponent's player ID (seat sync).
    OpponentId(PlayerId),
    /// `p3<id>` — current turn, sent to seats.
    Turn(PlayerId),
    /// `p4<seat>` — the recipient's own seat number (seat sync).
    SeatNumber(Seat),
    /// `p6<seat><name>` — a seat's display name (spectator sync).
    SeatName { seat: Seat, name: String },
    /// `p7<seat><id>` — a seat's player ID (spectator sync).
    SeatId { seat: Seat, id: PlayerId },
    /// `p8<id>` — current turn, sent to the audience.
    AudienceTurn(PlayerId),
    /// `p9` — spectator sync complete.
    SyncDone,
    /// `s<42 digits>` — row-major board snapshot.
    Board(Board),
    /// `c<sender>;<text>` — chat broadcast.
    Chat { sender: String, text: String },
    /// `e…` — end of game.
    End(GameEnd),
}

impl ServerEvent {
    /// Convenience constructor for `w` status lines.
    pub fn status(text: impl Into<String>) -> Self {
        ServerEvent::Status(text.into())
    }
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerEvent::Identity(id) => write!(f, "i{id}"),
            ServerEvent::RoomNotice(room) => write!(f, "r{room}"),
            ServerEvent::Status(text) => write!(f, "w{text}"),
            ServerEvent::OpponentJoined(name) => write!(f, "j{name}"),
            ServerEvent::AudienceCount(count) => write!(f, "a{count}"),
            ServerEvent::OpponentName(name) => write!(f, "p1{name}"),
            ServerEvent::OpponentId(id) => write!(f, "p2{id}"),
            ServerEvent::Turn(id) => write!(f, "p3{id}"),
            ServerEvent::SeatNumber(seat) => write!(f, "p4{seat}"),
            ServerEvent::SeatName { seat, name } => write!(f, "p6{seat}{name}"),
            ServerEvent::SeatId { seat, id } => write!(f, "p7{seat}{id}"),
            ServerEvent::AudienceTurn(id) => write!(f, "p8{id}"),
            ServerEvent::SyncDone => write!(f, "p9"),
            ServerEvent::Board(board) => write!(f, "s{}", board.encode()),
            ServerEvent::Chat { sender, text } => write!(f, "c{sender};{text}"),
            ServerEvent::End(end) => match end {
                GameEnd::Win(seat) => write!(f, "e{seat}"),
                GameEnd::Draw => write!(f, "e9"),
                GameEnd::Timeout(id) => write!(f, "eT{id}"),
                GameEnd::Abandoned => write!(f, "eX"),
                GameEnd::Forfeit(id) => write!(f, "eQ{id}"),
            },
        }
    }
}
