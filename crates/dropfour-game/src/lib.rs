//! Connect Four rules for Dropfour.
//!
//! Pure game logic with no I/O: the 6×7 [`Board`] with gravity drops and
//! line-of-four detection, and the [`Game`] turn machine that validates
//! moves and reports win/draw outcomes.
//!
//! # Key types
//!
//! - [`Board`] — the grid, win/draw scans, and the 42-digit wire snapshot
//! - [`Game`] — turn order, move validation, terminal outcomes
//! - [`Seat`] — one of the two player slots; seat one moves first

mod board;
mod game;

pub use board::{Board, COLS, DecodeError, ROWS, Seat};
pub use game::{Game, MoveError, Outcome, Placement};
