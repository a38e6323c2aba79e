//! Inbound command decoding.
//!
//! Each client line starts with a tag character; the rest is positional.
//! Decoding produces a typed [`ClientCommand`] so the dispatch layer is a
//! pure match over variants instead of string inspection.

use std::str::FromStr;

use crate::{PlayerId, ProtocolError, RoomId};

/// A decoded client line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// `n<name>` — register a display name.
    Register { name: String },
    /// `m1<playerID>` — request a random match.
    QuickMatch { player: PlayerId },
    /// `m2<playerID>` — create a private room.
    CreateRoom { player: PlayerId },
    /// `m3<playerID>;<roomID>` — join a room by ID.
    JoinRoom { player: PlayerId, room: RoomId },
    /// `m4<playerID>;<roomID>` — join a room as a spectator.
    Spectate { player: PlayerId, room: RoomId },
    /// `s<playerID> <column>` — drop a piece; wire columns are 1-based.
    Move { player: PlayerId, column: u32 },
    /// `c<playerID>;<text>` — chat to the sender's room.
    Chat { player: PlayerId, text: String },
    /// `q<playerID>` — quit/forfeit the sender's room.
    Quit { player: PlayerId },
    /// `l<playerID>` — leave the sender's room as a spectator.
    Leave { player: PlayerId },
}

impl FromStr for ClientCommand {
    type Err = ProtocolError;

    /// Decodes one line, already stripped of its terminator.
    fn from_str(line: &str) -> Result<Self, ProtocolError> {
        let mut chars = line.chars();
        let tag = chars.next().ok_or(ProtocolError::Empty)?;
        let rest = chars.as_str();
        match tag {
            'n' => Ok(ClientCommand::Register { name: rest.to_string() }),
            'm' => parse_menu(rest),
            's' => parse_move(rest),
            'c' => {
                let (player, text) = split_id_payload(tag, rest)?;
                Ok(ClientCommand::Chat { player, text: text.to_string() })
            }
            'q' => Ok(ClientCommand::Quit { player: parse_player(tag, rest)? }),
            'l' => Ok(ClientCommand::Leave { player: parse_player(tag, rest)? }),
            other => Err(ProtocolError::UnknownTag(other)),
        }
    }
}

fn parse_menu(rest: &str) -> Result<ClientCommand, ProtocolError> {
    let mut chars = rest.chars();
    let action = chars.next().ok_or(ProtocolError::Malformed {
        tag: 'm',
        reason: "missing menu action",
    })?;
    let rest = chars.as_str();
    match action {
        '1' => Ok(ClientCommand::QuickMatch { player: parse_player('m', rest)? }),
        '2' => Ok(ClientCommand::CreateRoom { player: parse_player('m', rest)? }),
        '3' => {
            let (player, room) = split_id_room(rest)?;
            Ok(ClientCommand::JoinRoom { player, room })
        }
        '4' => {
            let (player, room) = split_id_room(rest)?;
            Ok(ClientCommand::Spectate { player, room })
        }
        _ => Err(ProtocolError::Malformed { tag: 'm', reason: "unknown menu action" }),
    }
}

fn parse_move(rest: &str) -> Result<ClientCommand, ProtocolError> {
    let mut parts = rest.split_whitespace();
    let (Some(id), Some(column), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ProtocolError::Malformed { tag: 's', reason: "expected '<id> <column>'" });
    };
    let player = parse_player('s', id)?;
    let column = column
        .parse::<u32>()
        .map_err(|_| ProtocolError::Malformed { tag: 's', reason: "column is not a number" })?;
    Ok(ClientCommand::Move { player, column })
}

fn parse_player(tag: char, s: &str) -> Result<PlayerId, ProtocolError> {
    s.trim()
        .parse::<u64>()
        .map(PlayerId)
        .map_err(|_| ProtocolError::Malformed { tag, reason: "player id is not a number" })
}

/// Splits `<playerID>;<rest>` on the first `;`, so chat text may itself
/// contain semicolons.
fn split_id_payload(tag: char, s: &str) -> Result<(PlayerId, &str), ProtocolError> {
    let (id, payload) = s
        .split_once(';')
        .ok_or(ProtocolError::Malformed { tag, reason: "missing ';' separator" })?;
    Ok((parse_player(tag, id)?, payload))
}

fn split_id_room(s: &str) -> Result<(PlayerId, RoomId), ProtocolError> {
    let (id, room) = split_id_payload('m', s)?;
    let room = room
        .trim()
        .parse::<u32>()
        .map(RoomId)
        .map_err(|_| ProtocolError::Malformed { tag: 'm', reason: "room id is not a number" })?;
    Ok((id, room))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<ClientCommand, ProtocolError> {
        line.parse()
    }

    #[test]
    fn test_parse_register() {
        assert_eq!(
            parse("nAlice"),
            Ok(ClientCommand::Register { name: "Alice".into() })
        );
    }

    #[test]
    fn test_parse_register_keeps_spaces_in_name() {
        assert_eq!(
            parse("nAda Lovelace"),
            Ok(ClientCommand::Register { name: "Ada Lovelace".into() })
        );
    }

    #[test]
    fn test_parse_quick_match() {
        assert_eq!(parse("m17"), Ok(ClientCommand::QuickMatch { player: PlayerId(7) }));
    }

    #[test]
    fn test_parse_create_room() {
        assert_eq!(parse("m242"), Ok(ClientCommand::CreateRoom { player: PlayerId(42) }));
    }

    #[test]
    fn test_parse_join_room() {
        assert_eq!(
            parse("m33;1001"),
            Ok(ClientCommand::JoinRoom { player: PlayerId(3), room: RoomId(1001) })
        );
    }

    #[test]
    fn test_parse_spectate() {
        assert_eq!(
            parse("m48;1002"),
            Ok(ClientCommand::Spectate { player: PlayerId(8), room: RoomId(1002) })
        );
    }

    #[test]
    fn test_parse_move() {
        assert_eq!(
            parse("s12 4"),
            Ok(ClientCommand::Move { player: PlayerId(12), column: 4 })
        );
    }

    #[test]
    fn test_parse_move_requires_two_fields() {
        assert!(parse("s12").is_err());
        assert!(parse("s12 4 9").is_err());
    }

    #[test]
    fn test_parse_chat_splits_on_first_semicolon() {
        assert_eq!(
            parse("c5;good game; well played"),
            Ok(ClientCommand::Chat { player: PlayerId(5), text: "good game; well played".into() })
        );
    }

    #[test]
    fn test_parse_chat_allows_empty_text() {
        assert_eq!(
            parse("c5;"),
            Ok(ClientCommand::Chat { player: PlayerId(5), text: String::new() })
        );
    }

    #[test]
    fn test_parse_quit_and_leave() {
        assert_eq!(parse("q9"), Ok(ClientCommand::Quit { player: PlayerId(9) }));
        assert_eq!(parse("l9"), Ok(ClientCommand::Leave { player: PlayerId(9) }));
    }

    #[test]
    fn test_parse_empty_line_is_error() {
        assert_eq!(parse(""), Err(ProtocolError::Empty));
    }

    #[test]
    fn test_parse_unknown_tag_is_error() {
        assert_eq!(parse("z1"), Err(ProtocolError::UnknownTag('z')));
    }

    #[test]
    fn test_parse_unknown_menu_action_is_error() {
        assert!(matches!(parse("m9"), Err(ProtocolError::Malformed { tag: 'm', .. })));
    }

    #[test]
    fn test_parse_non_numeric_player_id_is_error() {
        assert!(matches!(parse("qabc"), Err(ProtocolError::Malformed { tag: 'q', .. })));
    }

    #[test]
    fn test_parse_join_missing_separator_is_error() {
        assert!(matches!(parse("m331001"), Err(ProtocolError::Malformed { tag: 'm', .. })));
    }
}
