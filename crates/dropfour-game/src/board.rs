//! The Connect Four grid: 6 rows by 7 columns, gravity drops, win and draw
//! detection, and the 42-digit wire snapshot.

use std::fmt;

use thiserror::Error;

/// Number of rows. Row 0 is the bottom; pieces settle there first.
pub const ROWS: usize = 6;
/// Number of columns.
pub const COLS: usize = 7;

// ---------------------------------------------------------------------------
// Seat
// ---------------------------------------------------------------------------

/// One of the two seats in a room. Seat one always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    One,
    Two,
}

impl Seat {
    /// The opposing seat.
    pub fn other(self) -> Seat {
        match self {
            Seat::One => Seat::Two,
            Seat::Two => Seat::One,
        }
    }

    /// Wire digit for this seat: `'1'` or `'2'`.
    pub fn digit(self) -> char {
        match self {
            Seat::One => '1',
            Seat::Two => '2',
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.digit())
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// Error decoding a board snapshot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("snapshot must be 42 digits, got {0}")]
    BadLength(usize),
    #[error("invalid cell digit {0:?}")]
    BadCell(char),
}

/// The playing grid. Cells are addressed `(row, col)` with row 0 at the
/// bottom, so a dropped piece lands in the lowest empty row of its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<Seat>; COLS]; ROWS],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// An empty grid.
    pub fn new() -> Self {
        Board { cells: [[None; COLS]; ROWS] }
    }

    /// Owner of the cell at `(row, col)`, if any.
    pub fn cell(&self, row: usize, col: usize) -> Option<Seat> {
        self.cells[row][col]
    }

    /// Drops a piece into `col` (0-based) and returns the row it settled in,
    /// or `None` when the column is already full.
    pub fn drop_piece(&mut self, col: usize, seat: Seat) -> Option<usize> {
        for row in 0..ROWS {
            if self.cells[row][col].is_none() {
                self.cells[row][col] = Some(seat);
                return Some(row);
            }
        }
        None
    }

    /// `true` once every cell is occupied.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|row| row.iter().all(|c| c.is_some()))
    }

    /// Whether the piece at `(row, col)` completes a line of four or more.
    ///
    /// Only lines through the given cell are examined; a win can only be
    /// created by the most recent drop.
    pub fn wins_at(&self, row: usize, col: usize) -> bool {
        let Some(owner) = self.cells[row][col] else {
            return false;
        };
        // horizontal, vertical, both diagonals
        const AXES: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];
        AXES.iter().any(|&(dr, dc)| {
            1 + self.run(row, col, dr, dc, owner) + self.run(row, col, -dr, -dc, owner) >= 4
        })
    }

    /// Counts consecutive `owner` cells from `(row, col)` exclusive, walking
    /// in direction `(dr, dc)` until the edge or a foreign cell.
    fn run(&self, row: usize, col: usize, dr: isize, dc: isize, owner: Seat) -> usize {
        let mut count = 0;
        let mut r = row as isize + dr;
        let mut c = col as isize + dc;
        while (0..ROWS as isize).contains(&r)
            && (0..COLS as isize).contains(&c)
            && self.cells[r as usize][c as usize] == Some(owner)
        {
            count += 1;
            r += dr;
            c += dc;
        }
        count
    }

    /// Encodes the grid as 42 digits, row-major from the bottom row:
    /// `0` empty, `1` seat one, `2` seat two.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(ROWS * COLS);
        for row in &self.cells {
            for cell in row {
                out.push(match cell {
                    None => '0',
                    Some(seat) => seat.digit(),
                });
            }
        }
        out
    }

    /// Decodes a 42-digit snapshot produced by [`Board::encode`].
    pub fn decode(s: &str) -> Result<Board, DecodeError> {
        let digits: Vec<char> = s.chars().collect();
        if digits.len() != ROWS * COLS {
            return Err(DecodeError::BadLength(digits.len()));
        }
        let mut board = Board::new();
        for (i, &digit) in digits.iter().enumerate() {
            board.cells[i / COLS][i % COLS] = match digit {
                '0' => None,
                '1' => Some(Seat::One),
                '2' => Some(Seat::Two),
                other => return Err(DecodeError::BadCell(other)),
            };
        }
        Ok(board)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
