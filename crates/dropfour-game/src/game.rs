//! Turn-order state machine over a [`Board`]: validates moves, applies
//! gravity, flips the turn, and reports win/draw outcomes.

use thiserror::Error;

use crate::board::{Board, COLS, Seat};

/// Why a move was rejected. `ColumnFull` is the one case callers treat as a
/// pure no-op rather than a validation failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("game is already over")]
    Finished,
    #[error("column {0} out of range")]
    ColumnOutOfRange(u32),
    #[error("not this seat's turn")]
    NotYourTurn,
    #[error("column {0} is full")]
    ColumnFull(u32),
}

/// Terminal result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win(Seat),
    Draw,
}

/// Where a placed piece landed and what it changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Row the piece settled in (0 = bottom).
    pub row: usize,
    /// Column the piece was dropped into (0-based).
    pub col: usize,
    /// Seat that moved.
    pub seat: Seat,
    /// Set when this move ended the game.
    pub outcome: Option<Outcome>,
}

/// One game in progress. Seat one moves first; the turn flips after every
/// accepted move, including the terminal one, which is what the wire
/// protocol reports.
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    turn: Seat,
    outcome: Option<Outcome>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    pub fn new() -> Self {
        Game {
            board: Board::new(),
            turn: Seat::One,
            outcome: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Seat currently permitted to move.
    pub fn turn(&self) -> Seat {
        self.turn
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Applies a move for `seat` in wire column `column` (1-based).
    ///
    /// Rejections leave the game untouched. On success the piece lands in
    /// the lowest empty row, the turn flips, and any win or draw is recorded
    /// in both the game and the returned [`Placement`].
    pub fn apply(&mut self, seat: Seat, column: u32) -> Result<Placement, MoveError> {
        if self.outcome.is_some() {
            return Err(MoveError::Finished);
        }
        if column < 1 || column > COLS as u32 {
            return Err(MoveError::ColumnOutOfRange(column));
        }
        if seat != self.turn {
            return Err(MoveError::NotYourTurn);
        }

        let col = (column - 1) as usize;
        let Some(row) = self.board.drop_piece(col, seat) else {
            return Err(MoveError::ColumnFull(column));
        };

        self.turn = seat.other();

        if self.board.wins_at(row, col) {
            self.outcome = Some(Outcome::Win(seat));
        } else if self.board.is_full() {
            self.outcome = Some(Outcome::Draw);
        }

        Ok(Placement { row, col, seat, outcome: self.outcome })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Plays wire columns alternately starting with seat one, asserting each
    /// move is accepted; returns the last placement.
    fn play(game: &mut Game, columns: &[u32]) -> Placement {
        let mut last = None;
        for &column in columns {
            let seat = game.turn();
            last = Some(game.apply(seat, column).unwrap());
        }
        last.unwrap()
    }

    #[test]
    fn test_apply_accepts_on_turn_move() {
        let mut game = Game::new();
        let placement = game.apply(Seat::One, 4).unwrap();
        assert_eq!(placement.row, 0);
        assert_eq!(placement.col, 3);
        assert_eq!(placement.seat, Seat::One);
        assert_eq!(placement.outcome, None);
    }

    #[test]
    fn test_apply_flips_turn_each_move() {
        let mut game = Game::new();
        assert_eq!(game.turn(), Seat::One);
        game.apply(Seat::One, 1).unwrap();
        assert_eq!(game.turn(), Seat::Two);
        game.apply(Seat::Two, 2).unwrap();
        assert_eq!(game.turn(), Seat::One);
    }

    #[test]
    fn test_apply_rejects_out_of_turn() {
        let mut game = Game::new();
        assert_eq!(game.apply(Seat::Two, 1), Err(MoveError::NotYourTurn));
        assert_eq!(game.turn(), Seat::One);
    }

    #[test]
    fn test_apply_rejects_out_of_range_column() {
        let mut game = Game::new();
        assert_eq!(game.apply(Seat::One, 0), Err(MoveError::ColumnOutOfRange(0)));
        assert_eq!(game.apply(Seat::One, 8), Err(MoveError::ColumnOutOfRange(8)));
    }

    #[test]
    fn test_apply_rejects_full_column_without_state_change() {
        let mut game = Game::new();
        play(&mut game, &[3, 3, 3, 3, 3, 3]);
        let board_before = *game.board();
        let turn_before = game.turn();
        assert_eq!(game.apply(turn_before, 3), Err(MoveError::ColumnFull(3)));
        assert_eq!(*game.board(), board_before);
        assert_eq!(game.turn(), turn_before);
    }

    #[test]
    fn test_apply_vertical_win_for_seat_one() {
        let mut game = Game::new();
        // seat one stacks column 4, seat two places elsewhere
        let last = play(&mut game, &[4, 1, 4, 2, 4, 3, 4]);
        assert_eq!(last.outcome, Some(Outcome::Win(Seat::One)));
        assert_eq!(game.outcome(), Some(Outcome::Win(Seat::One)));
        assert!(game.is_finished());
    }

    #[test]
    fn test_apply_turn_flips_even_on_winning_move() {
        let mut game = Game::new();
        play(&mut game, &[4, 1, 4, 2, 4, 3, 4]);
        assert_eq!(game.turn(), Seat::Two);
    }

    #[test]
    fn test_apply_rejects_moves_after_finish() {
        let mut game = Game::new();
        play(&mut game, &[4, 1, 4, 2, 4, 3, 4]);
        assert_eq!(game.apply(Seat::Two, 5), Err(MoveError::Finished));
    }

    /// Wire columns that pack the board into the column-striped pattern
    /// (owner by `(col / 2 + row) % 2`), which never lines up four. Each
    /// column pair is woven `a, b, b, a` so the alternating turn order
    /// lands every piece on its striped cell.
    fn drawing_fill() -> Vec<u32> {
        let mut columns = Vec::with_capacity(42);
        for (a, b) in [(1, 3), (2, 4), (5, 7)] {
            for _ in 0..3 {
                columns.extend([a, b, b, a]);
            }
        }
        columns.extend([6; 6]);
        columns
    }

    #[test]
    fn test_apply_draw_on_full_board_without_win() {
        let mut game = Game::new();
        let mut outcome = None;
        for column in drawing_fill() {
            let placement = game.apply(game.turn(), column).unwrap();
            outcome = placement.outcome;
        }
        assert_eq!(outcome, Some(Outcome::Draw));
        assert!(game.board().is_full());
    }

    #[test]
    fn test_apply_draw_is_not_reported_as_win() {
        let mut game = Game::new();
        for column in drawing_fill() {
            game.apply(game.turn(), column).unwrap();
        }
        assert_eq!(game.outcome(), Some(Outcome::Draw));
    }
}
