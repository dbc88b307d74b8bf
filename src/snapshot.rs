use serde::{Deserialize, Serialize};

use crate::game::{
    BOARD_SIZE, ByColor, Cell, Color, GameResult, GameState, Piece, PieceKind, Square, TurnPhase,
};

/// Number of recent turns shown alongside the board
pub const RECENT_MOVES: usize = 3;
const UPCOMING_BIRTHS: usize = 5;

/// What a renderer needs to draw one square
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquareView {
    pub square: Square,
    pub piece: Option<Piece>,
    pub neighbors: ByColor<u8>,
    pub birth_indicator: ByColor<bool>,
    pub death_indicator: bool,
    /// Present only on empty squares
    pub birth_counter: Option<ByColor<u8>>,
    /// Present only on occupied squares
    pub death_counter: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueView {
    pub upcoming: Vec<PieceKind>,
    pub cursor: usize,
    pub length: usize,
}

/// Read-only picture of a game after its latest mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// a1, b1, ... h8
    pub squares: Vec<SquareView>,
    pub turn: Color,
    pub phase: TurnPhase,
    pub result: Option<GameResult>,
    pub status: String,
    pub queues: ByColor<QueueView>,
    pub recent_moves: Vec<String>,
    pub fen: String,
    pub move_count: usize,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl Snapshot {
    pub fn capture(state: &GameState, recent: usize) -> Self {
        let board = state.board();
        let indicators = state.indicators();

        let squares = Square::all()
            .map(|square| {
                let marks = indicators.at(square);
                let (birth_counter, death_counter) = match board.cell(square) {
                    Cell::Empty { birth } => (Some(birth), None),
                    Cell::Occupied { death, .. } => (None, Some(death)),
                };
                SquareView {
                    square,
                    piece: board.piece_at(square),
                    neighbors: marks.neighbors,
                    birth_indicator: marks.birth,
                    death_indicator: marks.death,
                    birth_counter,
                    death_counter,
                }
            })
            .collect();

        let queue_view = |color| {
            let queue = state.queue(color);
            QueueView {
                upcoming: queue.upcoming(UPCOMING_BIRTHS),
                cursor: queue.cursor(),
                length: queue.len(),
            }
        };

        let status = match state.result() {
            Some(result) => format!("Game over: {}", result),
            None => format!("Current turn: {}", state.current_player()),
        };

        Snapshot {
            squares,
            turn: state.current_player(),
            phase: state.phase(),
            result: state.result(),
            status,
            queues: ByColor::new(queue_view(Color::White), queue_view(Color::Black)),
            recent_moves: state.recent_moves(recent),
            fen: state.fen(),
            move_count: state.move_count(),
            can_undo: state.history().can_undo(),
            can_redo: state.history().can_redo(),
        }
    }

    pub fn square(&self, square: Square) -> &SquareView {
        &self.squares[square.rank() * BOARD_SIZE + square.file()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Move;

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    #[test]
    fn test_snapshot_of_standard_game() {
        let snapshot = GameState::standard().snapshot();
        assert_eq!(snapshot.squares.len(), 64);
        assert_eq!(snapshot.status, "Current turn: White");
        assert!(!snapshot.can_undo);
        assert!(snapshot.recent_moves.is_empty());

        let b3 = snapshot.square(sq("b3"));
        assert_eq!(b3.square, sq("b3"));
        assert!(b3.birth_indicator.white);
        assert_eq!(b3.birth_counter, Some(ByColor::new(1, 0)));
        assert_eq!(b3.death_counter, None);

        let b1 = snapshot.square(sq("b1"));
        assert_eq!(b1.piece, Some(Piece::new(PieceKind::Knight, Color::White)));
        assert!(b1.death_indicator);
        assert_eq!(b1.death_counter, Some(1));
        assert_eq!(b1.neighbors.white, 5);
    }

    #[test]
    fn test_snapshot_tracks_moves() {
        let mut game = GameState::standard();
        game.submit_move(Move::new(sq("e2"), sq("e4"))).unwrap();

        let snapshot = game.snapshot();
        assert_eq!(snapshot.turn, Color::Black);
        assert_eq!(snapshot.move_count, 1);
        assert!(snapshot.can_undo);
        assert_eq!(snapshot.recent_moves, vec!["Pe2->e4".to_string()]);
        assert_eq!(snapshot.queues.white.upcoming.len(), 5);
        assert_eq!(snapshot.queues.black.cursor, 0);
        assert!(snapshot.fen.ends_with(" b - - 0 1"));
    }

    #[test]
    fn test_snapshot_reports_game_over() {
        let mut game = GameState::new(crate::config::GameConfig {
            layout: "k7/8/8/8/8/8/8/R3K3".to_string(),
            ..Default::default()
        })
        .unwrap();
        game.submit_move(Move::new(sq("a1"), sq("a8"))).unwrap();

        let snapshot = game.snapshot();
        assert_eq!(
            snapshot.status,
            "Game over: Black king was captured, White wins!"
        );
        assert!(snapshot.result.is_some());
        assert!(snapshot.recent_moves[0].ends_with('#'));
    }
}
