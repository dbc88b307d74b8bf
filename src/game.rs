use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, GameConfig};
use crate::history::{CellChange, History, MoveRecord, SavedGame, write_cell};
use crate::life::{self, Indicators, Thresholds};
use crate::movegen;
use crate::queue::BirthQueue;
use crate::snapshot::{RECENT_MOVES, Snapshot};

/// Board size constant
pub const BOARD_SIZE: usize = 8;

/// Rank/file deltas of the Moore neighbourhood (also the king's steps)
pub const ADJACENT: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(&self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Rank index births start filling from: rank 1 for White, rank 8 for Black
    pub fn back_rank(&self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => BOARD_SIZE - 1,
        }
    }

    /// Rank delta of a pawn step
    pub fn forward(&self) -> i32 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    pub fn fen_char(&self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
        }
    }
}

/// A value kept separately for each color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ByColor<T> {
    pub white: T,
    pub black: T,
}

impl<T> ByColor<T> {
    pub fn new(white: T, black: T) -> Self {
        ByColor { white, black }
    }
}

impl<T> Index<Color> for ByColor<T> {
    type Output = T;

    fn index(&self, color: Color) -> &T {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }
}

impl<T> IndexMut<Color> for ByColor<T> {
    fn index_mut(&mut self, color: Color) -> &mut T {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    Rook,
    Knight,
    Bishop,
    Queen,
    King,
}

impl PieceKind {
    pub fn letter(&self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Rook => 'R',
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
        }
    }

    /// Parses a piece letter in either case
    pub fn from_letter(c: char) -> Option<PieceKind> {
        match c.to_ascii_uppercase() {
            'P' => Some(PieceKind::Pawn),
            'R' => Some(PieceKind::Rook),
            'N' => Some(PieceKind::Knight),
            'B' => Some(PieceKind::Bishop),
            'Q' => Some(PieceKind::Queen),
            'K' => Some(PieceKind::King),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    pub fn new(kind: PieceKind, color: Color) -> Self {
        Piece { kind, color }
    }

    /// FEN letter: uppercase for White, lowercase for Black
    pub fn fen_char(&self) -> char {
        match self.color {
            Color::White => self.kind.letter(),
            Color::Black => self.kind.letter().to_ascii_lowercase(),
        }
    }

    pub fn from_fen_char(c: char) -> Option<Piece> {
        let kind = PieceKind::from_letter(c)?;
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece::new(kind, color))
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fen_char())
    }
}

/// A board square. Zero-based internally (rank 0 is rank 1, file 0 is file a),
/// algebraic in text and JSON. Ordering is rank-then-file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square {
    rank: u8,
    file: u8,
}

impl Square {
    /// Out-of-range indices are rejected, never clamped.
    pub fn new(rank: usize, file: usize) -> Result<Self, GameError> {
        if rank >= BOARD_SIZE || file >= BOARD_SIZE {
            return Err(GameError::OutOfRange { rank, file });
        }
        Ok(Square {
            rank: rank as u8,
            file: file as u8,
        })
    }

    pub fn rank(&self) -> usize {
        self.rank as usize
    }

    pub fn file(&self) -> usize {
        self.file as usize
    }

    /// Every square in rank-then-file order, a1 first
    pub fn all() -> impl Iterator<Item = Square> {
        (0..BOARD_SIZE as u8)
            .flat_map(|rank| (0..BOARD_SIZE as u8).map(move |file| Square { rank, file }))
    }

    /// The square shifted by the given deltas, or `None` past the edge
    pub fn offset(&self, dr: i32, df: i32) -> Option<Square> {
        let rank = self.rank as i32 + dr;
        let file = self.file as i32 + df;
        let range = 0..BOARD_SIZE as i32;
        if range.contains(&rank) && range.contains(&file) {
            Some(Square {
                rank: rank as u8,
                file: file as u8,
            })
        } else {
            None
        }
    }

    /// Moore neighbourhood, clipped at the board edges
    pub fn neighbors(self) -> impl Iterator<Item = Square> {
        ADJACENT
            .iter()
            .filter_map(move |&(dr, df)| self.offset(dr, df))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, self.rank + 1)
    }
}

impl FromStr for Square {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GameError::InvalidNotation(s.to_string());
        let mut chars = s.trim().chars();
        let (Some(f), Some(r), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(invalid());
        };
        let file = (f as usize).checked_sub('a' as usize).ok_or_else(invalid)?;
        let rank = r
            .to_digit(10)
            .and_then(|d| (d as usize).checked_sub(1))
            .ok_or_else(invalid)?;
        Square::new(rank, file).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Square {
    type Error = GameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Square> for String {
    fn from(square: Square) -> Self {
        square.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Move { from, to }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

impl FromStr for Move {
    type Err = GameError;

    /// Accepts `e2e4`, `e2-e4` and `e2->e4`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let squares: String = s.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        if squares.len() != 4 {
            return Err(GameError::InvalidNotation(s.to_string()));
        }
        Ok(Move::new(squares[..2].parse()?, squares[2..].parse()?))
    }
}

/// Contents of a square together with the counters that only make sense for
/// that occupancy: empty squares count towards a birth for each color, an
/// occupied square counts towards the death of its own piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Empty { birth: ByColor<u8> },
    Occupied { piece: Piece, death: u8 },
}

impl Cell {
    pub const EMPTY: Cell = Cell::Empty {
        birth: ByColor { white: 0, black: 0 },
    };

    /// A freshly placed piece with no accumulated death count
    pub fn occupied(piece: Piece) -> Cell {
        Cell::Occupied { piece, death: 0 }
    }

    pub fn piece(&self) -> Option<Piece> {
        match self {
            Cell::Empty { .. } => None,
            Cell::Occupied { piece, .. } => Some(*piece),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty { .. })
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::EMPTY
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Indexed `[rank][file]`, rank 0 is rank 1
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    pub fn empty() -> Self {
        Board {
            cells: [[Cell::EMPTY; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// Standard chess starting position
    pub fn standard() -> Self {
        let mut board = Board::empty();
        let back_rank = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];

        for (file, &kind) in back_rank.iter().enumerate() {
            board.cells[0][file] = Cell::occupied(Piece::new(kind, Color::White));
            board.cells[1][file] = Cell::occupied(Piece::new(PieceKind::Pawn, Color::White));
            board.cells[BOARD_SIZE - 2][file] =
                Cell::occupied(Piece::new(PieceKind::Pawn, Color::Black));
            board.cells[BOARD_SIZE - 1][file] = Cell::occupied(Piece::new(kind, Color::Black));
        }

        board
    }

    /// Parses the piece-placement field of a FEN string (rank 8 first)
    pub fn from_placement(placement: &str) -> Result<Self, ConfigError> {
        let rows: Vec<&str> = placement.trim().split('/').collect();
        if rows.len() != BOARD_SIZE {
            return Err(ConfigError::Layout(format!(
                "expected {} ranks, found {}",
                BOARD_SIZE,
                rows.len()
            )));
        }

        let mut board = Board::empty();
        for (i, row) in rows.iter().enumerate() {
            let rank = BOARD_SIZE - 1 - i;
            let mut file = 0;
            for c in row.chars() {
                if let Some(skip) = c.to_digit(10) {
                    if skip == 0 {
                        return Err(ConfigError::Layout(format!(
                            "zero-length gap on rank {}",
                            rank + 1
                        )));
                    }
                    file += skip as usize;
                    continue;
                }
                let piece = Piece::from_fen_char(c).ok_or_else(|| {
                    ConfigError::Layout(format!("unknown piece '{}' on rank {}", c, rank + 1))
                })?;
                if file >= BOARD_SIZE {
                    return Err(ConfigError::Layout(format!(
                        "rank {} overflows the board",
                        rank + 1
                    )));
                }
                board.cells[rank][file] = Cell::occupied(piece);
                file += 1;
            }
            if file != BOARD_SIZE {
                return Err(ConfigError::Layout(format!(
                    "rank {} describes {} files",
                    rank + 1,
                    file
                )));
            }
        }

        Ok(board)
    }

    /// FEN piece-placement field for this board
    pub fn placement(&self) -> String {
        let mut out = String::new();
        for rank in (0..BOARD_SIZE).rev() {
            let mut gap = 0;
            for file in 0..BOARD_SIZE {
                match self.cells[rank][file].piece() {
                    None => gap += 1,
                    Some(piece) => {
                        if gap > 0 {
                            out.push_str(&gap.to_string());
                            gap = 0;
                        }
                        out.push(piece.fen_char());
                    }
                }
            }
            if gap > 0 {
                out.push_str(&gap.to_string());
            }
            if rank > 0 {
                out.push('/');
            }
        }
        out
    }

    pub fn cell(&self, square: Square) -> Cell {
        self.cells[square.rank()][square.file()]
    }

    /// Overwrites a cell, returning its previous contents
    pub fn replace(&mut self, square: Square, cell: Cell) -> Cell {
        std::mem::replace(&mut self.cells[square.rank()][square.file()], cell)
    }

    /// Puts a piece with fresh counters on a square
    pub fn place(&mut self, square: Square, piece: Piece) {
        self.replace(square, Cell::occupied(piece));
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.cell(square).piece()
    }

    /// Occupied squares in rank-then-file order
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(|square| self.piece_at(square).map(|piece| (square, piece)))
    }

    pub fn count(&self, color: Color) -> usize {
        self.pieces().filter(|(_, piece)| piece.color == color).count()
    }

    pub fn king_count(&self, color: Color) -> usize {
        self.pieces()
            .filter(|(_, piece)| piece.color == color && piece.kind == PieceKind::King)
            .count()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  a b c d e f g h")?;
        for rank in (0..BOARD_SIZE).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..BOARD_SIZE {
                let c = self.cells[rank][file].piece().map_or('.', |p| p.fen_char());
                write!(f, "{} ", c)?;
            }
            writeln!(f, "{}", rank + 1)?;
        }
        write!(f, "  a b c d e f g h")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverCause {
    KingCaptured,
    KingPerished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub winner: Color,
    pub cause: GameOverCause,
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loser = self.winner.opponent();
        match self.cause {
            GameOverCause::KingCaptured => {
                write!(f, "{} king was captured, {} wins!", loser, self.winner)
            }
            GameOverCause::KingPerished => {
                write!(f, "{} king perished, {} wins!", loser, self.winner)
            }
        }
    }
}

/// Turn state machine. `MoveApplied` and `ResolvingTurnStart` only exist while
/// `submit_move` runs; callers observe `AwaitingMove` or `GameOver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    AwaitingMove(Color),
    /// Carries the color that just moved
    MoveApplied(Color),
    ResolvingTurnStart(Color),
    GameOver(GameResult),
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("No piece on {0}")]
    NoPieceAt(Square),
    #[error("Piece on {square} belongs to {owner}")]
    NotYourPiece { square: Square, owner: Color },
    #[error("Illegal move: {0}")]
    IllegalMove(Move),
    #[error("Game already over")]
    GameOver,
    #[error("Turn-start resolution in progress")]
    ResolutionInProgress,
    #[error("Square out of range: rank index {rank}, file index {file}")]
    OutOfRange { rank: usize, file: usize },
    #[error("Invalid notation: {0}")]
    InvalidNotation(String),
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("Nothing to redo")]
    NothingToRedo,
    #[error("Replay diverged from the saved game at move {index}")]
    ReplayMismatch { index: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Persistence error: {0}")]
    Persistence(#[from] serde_json::Error),
}

/// Births and deaths produced by one turn-start pass
struct TurnStart {
    births: Vec<(Square, Piece)>,
    deaths: Vec<(Square, Piece)>,
    phase: TurnPhase,
}

/// One game session: board, birth queues, derived indicators and history.
#[derive(Debug, Clone)]
pub struct GameState {
    config: GameConfig,
    board: Board,
    queues: ByColor<BirthQueue>,
    indicators: Indicators,
    phase: TurnPhase,
    history: History,
}

impl GameState {
    /// Create a new game from a configuration. White's opening turn-start
    /// runs before the first move and is part of the initial position.
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        let (board, queues) = config.initial_position()?;
        Ok(Self::start(config, board, queues))
    }

    /// Standard layout with the default birth queues and thresholds
    pub fn standard() -> Self {
        Self::start(
            GameConfig::default(),
            Board::standard(),
            ByColor::new(BirthQueue::standard(), BirthQueue::standard()),
        )
    }

    fn start(config: GameConfig, board: Board, queues: ByColor<BirthQueue>) -> Self {
        let indicators = Indicators::compute(&board);
        let mut state = GameState {
            config,
            board,
            queues,
            indicators,
            phase: TurnPhase::ResolvingTurnStart(Color::White),
            history: History::default(),
        };

        // Not recorded: undo never goes behind the initial position.
        let mut changes = Vec::new();
        let opening = state.resolve_turn_start(Color::White, &mut changes);
        state.phase = opening.phase;
        state
    }

    /// Replays a move list from the configured initial position
    pub fn replay(config: GameConfig, moves: &[Move]) -> Result<Self, GameError> {
        let mut state = Self::new(config)?;
        for &mv in moves {
            state.submit_move(mv)?;
        }
        Ok(state)
    }

    /// Rebuilds a saved game by replaying its moves, checking that every turn
    /// reproduces the saved record exactly.
    pub fn load(saved: &SavedGame) -> Result<Self, GameError> {
        let mut state = Self::new(saved.config.clone())?;
        for (index, expected) in saved.records.iter().enumerate() {
            let produced = state.submit_move(expected.mv)?;
            if produced != expected {
                return Err(GameError::ReplayMismatch { index });
            }
        }
        Ok(state)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn indicators(&self) -> &Indicators {
        &self.indicators
    }

    pub fn queue(&self, color: Color) -> &BirthQueue {
        &self.queues[color]
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Color whose move it is; after a game ends, the color that would have moved next
    pub fn current_player(&self) -> Color {
        match self.phase {
            TurnPhase::AwaitingMove(color)
            | TurnPhase::MoveApplied(color)
            | TurnPhase::ResolvingTurnStart(color) => color,
            TurnPhase::GameOver(result) => result.winner.opponent(),
        }
    }

    pub fn result(&self) -> Option<GameResult> {
        match self.phase {
            TurnPhase::GameOver(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.result().is_some()
    }

    pub fn move_count(&self) -> usize {
        self.history.len()
    }

    /// FEN of the current position for move-suggestion engines
    pub fn fen(&self) -> String {
        format!(
            "{} {} - - 0 1",
            self.board.placement(),
            self.current_player().fen_char()
        )
    }

    /// Notation of the last `n` turns, oldest first
    pub fn recent_moves(&self, n: usize) -> Vec<String> {
        let records = self.history.records();
        records[records.len().saturating_sub(n)..]
            .iter()
            .map(|record| record.to_string())
            .collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self, RECENT_MOVES)
    }

    pub fn saved_game(&self) -> SavedGame {
        SavedGame {
            config: self.config.clone(),
            records: self.history.records().to_vec(),
        }
    }

    /// Destinations the move generator allows for the piece on `from`
    pub fn legal_destinations(&self, from: Square) -> Result<Vec<Square>, GameError> {
        if self.board.piece_at(from).is_none() {
            return Err(GameError::NoPieceAt(from));
        }
        Ok(movegen::legal_destinations(&self.board, from))
    }

    /// Get all legal moves for a color
    pub fn legal_moves(&self, color: Color) -> Vec<Move> {
        if self.is_game_over() {
            return Vec::new();
        }
        movegen::legal_moves(&self.board, color)
    }

    /// Plays a move for the side to move, then runs the opponent's turn-start
    /// resolution. The whole turn is recorded as one undoable unit.
    pub fn submit_move(&mut self, mv: Move) -> Result<&MoveRecord, GameError> {
        let color = match self.phase {
            TurnPhase::AwaitingMove(color) => color,
            TurnPhase::GameOver(_) => return Err(GameError::GameOver),
            TurnPhase::MoveApplied(_) | TurnPhase::ResolvingTurnStart(_) => {
                return Err(GameError::ResolutionInProgress);
            }
        };

        let piece = self
            .board
            .piece_at(mv.from)
            .ok_or(GameError::NoPieceAt(mv.from))?;
        if piece.color != color {
            return Err(GameError::NotYourPiece {
                square: mv.from,
                owner: piece.color,
            });
        }
        let onto_own = matches!(self.board.piece_at(mv.to), Some(target) if target.color == color);
        if onto_own || !movegen::legal_destinations(&self.board, mv.from).contains(&mv.to) {
            return Err(GameError::IllegalMove(mv));
        }

        let phase_before = self.phase;
        let cursors_before = self.cursors();
        let mut changes = Vec::new();

        // The moving piece keeps its death counter; the vacated square starts over.
        let captured = self.board.piece_at(mv.to);
        let moving = self.board.cell(mv.from);
        write_cell(&mut self.board, mv.from, Cell::EMPTY, &mut changes);
        write_cell(&mut self.board, mv.to, moving, &mut changes);
        self.phase = TurnPhase::MoveApplied(color);
        self.refresh_indicators();
        debug!(%mv, %piece, ?captured, "move applied");

        let turn = if captured.is_some_and(|target| target.kind == PieceKind::King) {
            TurnStart {
                births: Vec::new(),
                deaths: Vec::new(),
                phase: TurnPhase::GameOver(GameResult {
                    winner: color,
                    cause: GameOverCause::KingCaptured,
                }),
            }
        } else {
            self.resolve_turn_start(color.opponent(), &mut changes)
        };

        self.phase = turn.phase;
        if let TurnPhase::GameOver(result) = turn.phase {
            info!(%result, "game over");
        }

        let record = MoveRecord {
            mv,
            piece,
            captured,
            births: turn.births,
            deaths: turn.deaths,
            changes,
            cursors_before,
            cursors_after: self.cursors(),
            phase_before,
            phase_after: turn.phase,
        };
        Ok(self.history.push(record))
    }

    /// Takes back the most recent turn, including its turn-start resolution
    pub fn undo(&mut self) -> Result<&MoveRecord, GameError> {
        let record = self.history.step_back().ok_or(GameError::NothingToUndo)?;
        record.revert(&mut self.board);
        for color in [Color::White, Color::Black] {
            self.queues[color].set_cursor(record.cursors_before[color]);
        }
        self.phase = record.phase_before;
        self.indicators = Indicators::compute(&self.board);
        debug!(%record, "turn undone");
        Ok(record)
    }

    /// Re-applies the most recently undone turn
    pub fn redo(&mut self) -> Result<&MoveRecord, GameError> {
        let record = self.history.step_forward().ok_or(GameError::NothingToRedo)?;
        record.reapply(&mut self.board);
        for color in [Color::White, Color::Black] {
            self.queues[color].set_cursor(record.cursors_after[color]);
        }
        self.phase = record.phase_after;
        self.indicators = Indicators::compute(&self.board);
        debug!(%record, "turn redone");
        Ok(record)
    }

    fn cursors(&self) -> ByColor<usize> {
        ByColor::new(self.queues.white.cursor(), self.queues.black.cursor())
    }

    fn refresh_indicators(&mut self) {
        self.indicators = Indicators::compute(&self.board);
    }

    /// Counter commit, then deaths, then births for `color`. Indicators stay
    /// frozen at their pre-pass values until the pass completes, and the pass
    /// always runs to the end even when the king perishes part way through.
    fn resolve_turn_start(&mut self, color: Color, changes: &mut Vec<CellChange>) -> TurnStart {
        self.phase = TurnPhase::ResolvingTurnStart(color);
        let thresholds = Thresholds {
            birth: self.config.birth_threshold,
            death: self.config.death_threshold,
        };
        let ready = life::apply_turn_start(
            &mut self.board,
            &self.indicators,
            color,
            thresholds,
            changes,
        );

        let mut deaths = Vec::new();
        let mut king_lost = false;
        for square in ready.deaths {
            let piece = match self.board.piece_at(square) {
                Some(piece) if piece.color == color => piece,
                other => panic!("death resolved on {square} holding {other:?}"),
            };
            write_cell(&mut self.board, square, Cell::EMPTY, changes);
            king_lost |= piece.kind == PieceKind::King;
            debug!(%square, %piece, "piece perished");
            deaths.push((square, piece));
        }

        let mut births = Vec::new();
        for square in ready.births {
            assert!(
                self.board.cell(square).is_empty(),
                "birth resolved on occupied square {square}"
            );
            let piece = Piece::new(self.queues[color].dispense(), color);
            write_cell(&mut self.board, square, Cell::occupied(piece), changes);
            debug!(%square, %piece, "piece born");
            births.push((square, piece));
        }

        self.refresh_indicators();

        let phase = if king_lost {
            TurnPhase::GameOver(GameResult {
                winner: color.opponent(),
                cause: GameOverCause::KingPerished,
            })
        } else {
            TurnPhase::AwaitingMove(color)
        };
        TurnStart {
            births,
            deaths,
            phase,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::standard()
    }
}
