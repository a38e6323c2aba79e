//! The Dropfour wire protocol.
//!
//! Clients speak newline-terminated ASCII lines over one persistent TCP
//! connection. The first character of a line selects the message type and
//! the remaining bytes are positional fields.
//!
//! # Key types
//!
//! - [`ClientCommand`] — decoded inbound line (`FromStr`)
//! - [`ServerEvent`] — typed outbound line (`Display` renders the wire form)
//! - [`PlayerId`] / [`RoomId`] — identity newtypes
//! - [`ProtocolError`] — decode failures; logged, never fatal

mod command;
mod error;
mod event;
mod types;

pub use command::ClientCommand;
pub use error::ProtocolError;
pub use event::{GameEnd, ServerEvent};
pub use types::{PlayerId, RoomId};
