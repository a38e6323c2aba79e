//! # Dropfour
//!
//! A real-time, multi-room Connect Four server with spectator support,
//! speaking a newline-delimited text protocol over TCP.
//!
//! The [`Engine`] owns all mutable state — player registry, room table,
//! waitlist — behind a single lock. Per-connection reader tasks feed it
//! decoded commands; writer tasks drain per-connection outbound queues,
//! so one stalled peer never delays another. A periodic sweeper ends
//! games whose turn clock has expired.
//!
//! # Key types
//!
//! - [`Server`] — TCP listener and accept loop
//! - [`ServerConfig`] — capacities, room ID range, and timings
//! - [`Engine`] — the state machine behind the lock
//! - [`ServerError`] — fatal startup failures

pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod room;
pub mod waitlist;

mod handler;
mod server;
mod timeout;

pub use config::ServerConfig;
pub use engine::Engine;
pub use error::ServerError;
pub use registry::{ConnId, EventSender};
pub use server::Server;
