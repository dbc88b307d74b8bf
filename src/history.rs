use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::GameConfig;
use crate::game::{
    Board, ByColor, Cell, Color, GameError, GameResult, Move, Piece, Square, TurnPhase,
};

/// One cell edit, with enough on both sides to play it in either direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellChange {
    pub square: Square,
    pub before: Cell,
    pub after: Cell,
}

/// Writes `after` into the board, logging the edit when the cell actually changed
pub(crate) fn write_cell(
    board: &mut Board,
    square: Square,
    after: Cell,
    changes: &mut Vec<CellChange>,
) {
    let before = board.replace(square, after);
    if before != after {
        changes.push(CellChange {
            square,
            before,
            after,
        });
    }
}

/// Everything one turn did: the move, the capture, and the following
/// turn-start pass for the opponent. Undo and redo treat it as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub mv: Move,
    pub piece: Piece,
    pub captured: Option<Piece>,
    pub births: Vec<(Square, Piece)>,
    pub deaths: Vec<(Square, Piece)>,
    /// Board and counter edits in the order they were made
    pub changes: Vec<CellChange>,
    pub cursors_before: ByColor<usize>,
    pub cursors_after: ByColor<usize>,
    pub phase_before: TurnPhase,
    pub phase_after: TurnPhase,
}

impl MoveRecord {
    pub fn mover(&self) -> Color {
        self.piece.color
    }

    pub fn result(&self) -> Option<GameResult> {
        match self.phase_after {
            TurnPhase::GameOver(result) => Some(result),
            _ => None,
        }
    }

    pub(crate) fn revert(&self, board: &mut Board) {
        for change in self.changes.iter().rev() {
            board.replace(change.square, change.before);
        }
    }

    pub(crate) fn reapply(&self, board: &mut Board) {
        for change in &self.changes {
            board.replace(change.square, change.after);
        }
    }
}

impl fmt::Display for MoveRecord {
    /// `Pe2->e4`, `Qd1xd7`, followed by ` -Pc3` per death, ` +Nb1` per birth
    /// and `#` when the turn ended the game
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if self.captured.is_some() { "x" } else { "->" };
        write!(f, "{}{}{}{}", self.piece, self.mv.from, separator, self.mv.to)?;
        for (square, piece) in &self.deaths {
            write!(f, " -{}{}", piece, square)?;
        }
        for (square, piece) in &self.births {
            write!(f, " +{}{}", piece, square)?;
        }
        if self.result().is_some() {
            write!(f, "#")?;
        }
        Ok(())
    }
}

/// Undo and redo stacks of whole turns
#[derive(Debug, Clone, Default)]
pub struct History {
    undo: Vec<MoveRecord>,
    redo: Vec<MoveRecord>,
}

impl History {
    /// Records a new turn; anything previously undone is forgotten
    pub fn push(&mut self, record: MoveRecord) -> &MoveRecord {
        self.redo.clear();
        self.undo.push(record);
        &self.undo[self.undo.len() - 1]
    }

    /// Moves the latest turn to the redo stack
    pub fn step_back(&mut self) -> Option<&MoveRecord> {
        let record = self.undo.pop()?;
        self.redo.push(record);
        self.redo.last()
    }

    /// Moves the latest undone turn back onto the undo stack
    pub fn step_forward(&mut self) -> Option<&MoveRecord> {
        let record = self.redo.pop()?;
        self.undo.push(record);
        self.undo.last()
    }

    /// Played turns, oldest first
    pub fn records(&self) -> &[MoveRecord] {
        &self.undo
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

/// A game as saved to disk: the configuration it started from plus every turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGame {
    pub config: GameConfig,
    pub records: Vec<MoveRecord>,
}

impl SavedGame {
    pub fn to_json(&self) -> Result<String, GameError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, GameError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn moves(&self) -> Vec<Move> {
        self.records.iter().map(|record| record.mv).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::PieceKind;

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    fn record(from: &str, to: &str) -> MoveRecord {
        MoveRecord {
            mv: Move::new(sq(from), sq(to)),
            piece: Piece::new(PieceKind::Pawn, Color::White),
            captured: None,
            births: Vec::new(),
            deaths: Vec::new(),
            changes: Vec::new(),
            cursors_before: ByColor::default(),
            cursors_after: ByColor::default(),
            phase_before: TurnPhase::AwaitingMove(Color::White),
            phase_after: TurnPhase::AwaitingMove(Color::Black),
        }
    }

    #[test]
    fn test_write_cell_skips_unchanged() {
        let mut board = Board::empty();
        let mut changes = Vec::new();
        write_cell(&mut board, sq("a1"), Cell::EMPTY, &mut changes);
        assert!(changes.is_empty());

        let rook = Cell::occupied(Piece::new(PieceKind::Rook, Color::Black));
        write_cell(&mut board, sq("a1"), rook, &mut changes);
        assert_eq!(
            changes,
            vec![CellChange {
                square: sq("a1"),
                before: Cell::EMPTY,
                after: rook,
            }]
        );
    }

    #[test]
    fn test_revert_and_reapply() {
        let mut board = Board::standard();
        let original = board.clone();
        let mut changes = Vec::new();

        let pawn = board.cell(sq("e2"));
        write_cell(&mut board, sq("e2"), Cell::EMPTY, &mut changes);
        write_cell(&mut board, sq("e4"), pawn, &mut changes);
        // Same square twice: reverse order must land on the first `before`
        write_cell(&mut board, sq("e4"), Cell::EMPTY, &mut changes);
        let played = board.clone();

        let mut rec = record("e2", "e4");
        rec.changes = changes;
        rec.revert(&mut board);
        assert_eq!(board, original);
        rec.reapply(&mut board);
        assert_eq!(board, played);
    }

    #[test]
    fn test_history_stacks() {
        let mut history = History::default();
        assert!(!history.can_undo());
        assert!(history.step_back().is_none());

        history.push(record("e2", "e4"));
        history.push(record("d2", "d4"));
        assert_eq!(history.step_back().unwrap().mv.to, sq("d4"));
        assert!(history.can_redo());
        assert_eq!(history.len(), 1);

        assert_eq!(history.step_forward().unwrap().mv.to, sq("d4"));
        assert!(!history.can_redo());

        history.step_back();
        history.push(record("c2", "c4"));
        assert!(!history.can_redo());
        assert!(history.step_forward().is_none());
        assert_eq!(history.records().last().unwrap().mv.to, sq("c4"));
    }

    #[test]
    fn test_record_notation() {
        let mut rec = record("d1", "d7");
        rec.piece = Piece::new(PieceKind::Queen, Color::White);
        rec.captured = Some(Piece::new(PieceKind::Pawn, Color::Black));
        rec.deaths = vec![(sq("c7"), Piece::new(PieceKind::Pawn, Color::Black))];
        rec.births = vec![(sq("b1"), Piece::new(PieceKind::Knight, Color::Black))];
        assert_eq!(rec.to_string(), "Qd1xd7 -pc7 +nb1");

        assert_eq!(record("e2", "e4").to_string(), "Pe2->e4");
    }

    #[test]
    fn test_saved_game_json() {
        let saved = SavedGame {
            config: GameConfig::default(),
            records: vec![record("e2", "e4")],
        };
        let json = saved.to_json().unwrap();
        assert!(json.contains("\"e2\""));
        assert_eq!(SavedGame::from_json(&json).unwrap(), saved);
        assert_eq!(saved.moves(), vec![Move::new(sq("e2"), sq("e4"))]);
        assert!(matches!(
            SavedGame::from_json("{"),
            Err(GameError::Persistence(_))
        ));
    }
}
