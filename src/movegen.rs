use crate::game::{ADJACENT, Board, Color, Move, PieceKind, Square};

const ORTHOGONAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAGONAL: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const KNIGHT_JUMPS: [(i32, i32); 8] = [
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
];

/// Destinations for the piece on `from` under plain chess movement. Check,
/// castling, en passant and promotion are not considered. Empty when `from`
/// holds no piece.
pub fn legal_destinations(board: &Board, from: Square) -> Vec<Square> {
    let Some(piece) = board.piece_at(from) else {
        return Vec::new();
    };

    let mut destinations = Vec::new();
    match piece.kind {
        PieceKind::Pawn => pawn_moves(board, from, piece.color, &mut destinations),
        PieceKind::Rook => slide(board, from, piece.color, &ORTHOGONAL, &mut destinations),
        PieceKind::Bishop => slide(board, from, piece.color, &DIAGONAL, &mut destinations),
        PieceKind::Queen => {
            slide(board, from, piece.color, &ORTHOGONAL, &mut destinations);
            slide(board, from, piece.color, &DIAGONAL, &mut destinations);
        }
        PieceKind::Knight => step(board, from, piece.color, &KNIGHT_JUMPS, &mut destinations),
        PieceKind::King => step(board, from, piece.color, &ADJACENT, &mut destinations),
    }
    destinations
}

/// Get all legal moves for a color
pub fn legal_moves(board: &Board, color: Color) -> Vec<Move> {
    board
        .pieces()
        .filter(|(_, piece)| piece.color == color)
        .flat_map(|(from, _)| {
            legal_destinations(board, from)
                .into_iter()
                .map(move |to| Move::new(from, to))
        })
        .collect()
}

fn is_enemy(board: &Board, square: Square, color: Color) -> bool {
    board.piece_at(square).is_some_and(|piece| piece.color != color)
}

fn slide(
    board: &Board,
    from: Square,
    color: Color,
    directions: &[(i32, i32)],
    out: &mut Vec<Square>,
) {
    for &(dr, df) in directions {
        let mut current = from;
        while let Some(next) = current.offset(dr, df) {
            match board.piece_at(next) {
                None => out.push(next),
                Some(piece) => {
                    if piece.color != color {
                        out.push(next);
                    }
                    break;
                }
            }
            current = next;
        }
    }
}

fn step(board: &Board, from: Square, color: Color, deltas: &[(i32, i32)], out: &mut Vec<Square>) {
    for &(dr, df) in deltas {
        if let Some(to) = from.offset(dr, df) {
            if board.piece_at(to).is_none_or(|piece| piece.color != color) {
                out.push(to);
            }
        }
    }
}

fn pawn_moves(board: &Board, from: Square, color: Color, out: &mut Vec<Square>) {
    let forward = color.forward();
    let start_rank = match color {
        Color::White => 1,
        Color::Black => 6,
    };

    if let Some(one) = from.offset(forward, 0) {
        if board.piece_at(one).is_none() {
            out.push(one);
            if from.rank() == start_rank {
                if let Some(two) = one.offset(forward, 0) {
                    if board.piece_at(two).is_none() {
                        out.push(two);
                    }
                }
            }
        }
    }

    for df in [-1, 1] {
        if let Some(target) = from.offset(forward, df) {
            if is_enemy(board, target, color) {
                out.push(target);
            }
        }
    }
}
