use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game::{BOARD_SIZE, Board, ByColor, Cell, Color, Square};
use crate::history::{CellChange, write_cell};

/// Same-color occupied squares in the Moore neighbourhood of `square`
pub fn neighbor_count(board: &Board, square: Square, color: Color) -> u8 {
    square
        .neighbors()
        .filter(|&n| board.piece_at(n).is_some_and(|piece| piece.color == color))
        .count() as u8
}

/// An empty square with exactly three same-color neighbours
pub fn is_birth_condition(neighbors: u8) -> bool {
    neighbors == 3
}

/// An occupied square that is under- or overcrowded by its own color
pub fn is_death_condition(neighbors: u8) -> bool {
    !(2..=3).contains(&neighbors)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SquareIndicators {
    pub neighbors: ByColor<u8>,
    /// Only ever set on empty squares
    pub birth: ByColor<bool>,
    /// Only ever set on occupied squares, for the occupant's color
    pub death: bool,
}

/// Birth and death indicators for the whole board. Pure function of the board;
/// recomputed after every mutation and never stored anywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicators {
    squares: [[SquareIndicators; BOARD_SIZE]; BOARD_SIZE],
}

impl Indicators {
    pub fn compute(board: &Board) -> Self {
        let mut squares = [[SquareIndicators::default(); BOARD_SIZE]; BOARD_SIZE];
        for square in Square::all() {
            let neighbors = ByColor::new(
                neighbor_count(board, square, Color::White),
                neighbor_count(board, square, Color::Black),
            );
            let entry = &mut squares[square.rank()][square.file()];
            entry.neighbors = neighbors;
            match board.piece_at(square) {
                None => {
                    entry.birth = ByColor::new(
                        is_birth_condition(neighbors.white),
                        is_birth_condition(neighbors.black),
                    );
                }
                Some(piece) => entry.death = is_death_condition(neighbors[piece.color]),
            }
        }
        Indicators { squares }
    }

    pub fn at(&self, square: Square) -> SquareIndicators {
        self.squares[square.rank()][square.file()]
    }

    pub fn birth(&self, square: Square, color: Color) -> bool {
        self.at(square).birth[color]
    }

    pub fn death(&self, square: Square) -> bool {
        self.at(square).death
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub birth: u8,
    pub death: u8,
}

/// Squares whose counters reached their threshold during a turn-start commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadySquares {
    /// Rank-then-file order
    pub deaths: Vec<Square>,
    /// Birth placement order for the resolving color
    pub births: Vec<Square>,
}

/// The single counter commit of a turn-start. Touches only `color`'s counters:
/// the birth counter of every empty square and the death counter of every
/// square holding a `color` piece. Each counter increments while its indicator
/// holds and resets to zero otherwise. Counter edits are appended to `changes`.
pub fn apply_turn_start(
    board: &mut Board,
    indicators: &Indicators,
    color: Color,
    thresholds: Thresholds,
    changes: &mut Vec<CellChange>,
) -> ReadySquares {
    let mut ready = ReadySquares::default();

    for square in Square::all() {
        let committed = match board.cell(square) {
            Cell::Empty { mut birth } => {
                birth[color] = tick(birth[color], indicators.birth(square, color));
                if birth[color] >= thresholds.birth {
                    ready.births.push(square);
                }
                Cell::Empty { birth }
            }
            Cell::Occupied { piece, death } if piece.color == color => {
                let death = tick(death, indicators.death(square));
                if death >= thresholds.death {
                    ready.deaths.push(square);
                }
                Cell::Occupied { piece, death }
            }
            Cell::Occupied { .. } => continue,
        };
        write_cell(board, square, committed, changes);
    }

    ready.births.sort_by_key(|&square| birth_scan_key(square, color));
    debug!(
        %color,
        deaths = ready.deaths.len(),
        births = ready.births.len(),
        "turn-start counters committed"
    );
    ready
}

fn tick(counter: u8, indicator: bool) -> u8 {
    if indicator {
        counter.saturating_add(1)
    } else {
        0
    }
}

/// Placement order key: ranks from the owner's back rank outward, files a to h
fn birth_scan_key(square: Square, color: Color) -> (usize, usize) {
    let rank = match color {
        Color::White => square.rank(),
        Color::Black => BOARD_SIZE - 1 - square.rank(),
    };
    (rank, square.file())
}

/// Every square in the order births are placed for `color`
pub fn birth_scan_order(color: Color) -> Vec<Square> {
    let mut squares: Vec<Square> = Square::all().collect();
    squares.sort_by_key(|&square| birth_scan_key(square, color));
    squares
}
