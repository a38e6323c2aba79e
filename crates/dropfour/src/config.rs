//! Server configuration.

use std::time::Duration;

/// Tunable limits and timings for a Dropfour server.
///
/// The defaults mirror the classic deployment: port 12345, 50 player
/// slots, room IDs 1001..=1999, 50 spectators per room, and a 60 second
/// turn clock swept once per second.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: String,
    /// Sockets accepted at once; further connections are dropped.
    pub max_connections: usize,
    /// Registered player capacity.
    pub max_players: usize,
    /// Lowest room ID handed out.
    pub min_room_id: u32,
    /// Highest room ID handed out (inclusive).
    pub max_room_id: u32,
    /// Spectator capacity per room.
    pub max_audience: usize,
    /// Display names are truncated to this many bytes.
    pub max_name_len: usize,
    /// Inbound lines longer than this are discarded as protocol errors.
    pub max_line_len: usize,
    /// A seated player who has not moved within this window loses on time.
    pub turn_timeout: Duration,
    /// Cadence of the timeout sweep.
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:12345".to_string(),
            max_connections: 50,
            max_players: 50,
            min_room_id: 1001,
            max_room_id: 1999,
            max_audience: 50,
            max_name_len: 32,
            max_line_len: 4096,
            turn_timeout: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_classic_deployment() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:12345");
        assert_eq!(config.max_players, 50);
        assert_eq!((config.min_room_id, config.max_room_id), (1001, 1999));
        assert_eq!(config.max_audience, 50);
        assert_eq!(config.turn_timeout, Duration::from_secs(60));
    }
}
