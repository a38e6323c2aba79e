//! Protocol-level failures.
//!
//! A line that fails to decode is logged and discarded; the connection
//! keeps reading. Nothing here ever reaches a client as a raw fault.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty command line")]
    Empty,

    #[error("unknown command tag {0:?}")]
    UnknownTag(char),

    #[error("malformed {tag:?} payload: {reason}")]
    Malformed { tag: char, reason: &'static str },

    #[error("line exceeds the {0}-byte limit")]
    LineTooLong(usize),
}
