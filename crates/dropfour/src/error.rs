//! Top-level server errors.
//!
//! Only fatal conditions surface here: a failing listener terminates the
//! process. Per-client faults never do — undecodable lines are logged and
//! dropped where they occur, and a broken socket ends that connection's
//! tasks only.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
