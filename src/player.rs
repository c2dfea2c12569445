use serde::{Deserialize, Serialize};

use crate::board::{Board, Grid};
use crate::moves::{Castle, Move, MoveTransaction};
use crate::piece::{Color, Piece, PieceKind};

/// Per-color aggregate over one board: the side's legal moves
/// (pseudo-legal plus any available castling), its king, and whether
/// it currently stands in check. Checkmate and stalemate are computed
/// on demand, never at construction; computing them eagerly would
/// recurse into building further boards without end.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    color: Color,
    king: Piece,
    legal_moves: Vec<Move>,
    in_check: bool,
}

impl Player {
    /// Built once per color while a board is assembled.
    ///
    /// Panics when the side has no king; every valid board carries
    /// both kings.
    pub(crate) fn new(
        color: Color,
        grid: &Grid,
        pieces: &[Piece],
        own_moves: &[Move],
        opponent_moves: &[Move],
    ) -> Player {
        let king = pieces
            .iter()
            .find(|piece| piece.kind() == PieceKind::King)
            .copied()
            .unwrap_or_else(|| panic!("board has no {color:?} king"));

        let in_check = attacks_square(king.square(), opponent_moves);

        let mut legal_moves = own_moves.to_vec();
        legal_moves.extend(castling_moves(color, grid, &king, opponent_moves, in_check));

        Player {
            color,
            king,
            legal_moves,
            in_check,
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn king(&self) -> &Piece {
        &self.king
    }

    pub fn legal_moves(&self) -> &[Move] {
        &self.legal_moves
    }

    pub fn is_checked(&self) -> bool {
        self.in_check
    }

    /// Two-phase legality: membership in this player's legal list,
    /// then a one-ply simulation that rejects moves leaving the
    /// player's own king attacked. This is the only mechanism that
    /// stops moving into check and stops pinned pieces from straying.
    ///
    /// `board` is the board this player belongs to.
    pub fn perform_move(&self, board: &Board, mv: &Move) -> MoveTransaction {
        if !self.legal_moves.contains(mv) {
            return MoveTransaction::Canceled;
        }

        let next = mv.perform(board);
        let king_square = next.player(self.color).king().square();
        let opponent_replies = next.current_player().legal_moves();
        if attacks_square(king_square, opponent_replies) {
            return MoveTransaction::PlayerChecked;
        }

        MoveTransaction::Completed(next)
    }

    /// True when some legal move survives the self-check simulation.
    pub fn can_escape(&self, board: &Board) -> bool {
        self.legal_moves
            .iter()
            .any(|mv| self.perform_move(board, mv).is_completed())
    }

    pub fn is_checkmated(&self, board: &Board) -> bool {
        self.in_check && !self.can_escape(board)
    }

    pub fn is_stalemated(&self, board: &Board) -> bool {
        !self.in_check && !self.can_escape(board)
    }
}

/// A square counts as attacked when it is the destination of any move
/// in the opponent's list.
fn attacks_square(square: usize, moves: &[Move]) -> bool {
    moves.iter().any(|mv| mv.dest() == square)
}

/// Per-side castling geometry. `empty` are the squares between king
/// and rook; `king_path` the squares the king crosses or lands on,
/// which no opponent move may target.
struct CastleSide {
    rook_home: usize,
    empty: &'static [usize],
    king_path: &'static [usize],
    king_dest: usize,
    rook_dest: usize,
    short: bool,
}

const BLACK_SHORT: CastleSide = CastleSide {
    rook_home: 7,
    empty: &[5, 6],
    king_path: &[5, 6],
    king_dest: 6,
    rook_dest: 5,
    short: true,
};
const BLACK_LONG: CastleSide = CastleSide {
    rook_home: 0,
    empty: &[1, 2, 3],
    king_path: &[3, 2],
    king_dest: 2,
    rook_dest: 3,
    short: false,
};
const WHITE_SHORT: CastleSide = CastleSide {
    rook_home: 63,
    empty: &[61, 62],
    king_path: &[61, 62],
    king_dest: 62,
    rook_dest: 61,
    short: true,
};
const WHITE_LONG: CastleSide = CastleSide {
    rook_home: 56,
    empty: &[57, 58, 59],
    king_path: &[59, 58],
    king_dest: 58,
    rook_dest: 59,
    short: false,
};

/// Castling availability, computed once per color at board
/// construction. Requires an unmoved king at home and not in check;
/// per side, empty squares between king and rook, a never-moved rook
/// on its home square, and a king path no opponent move targets.
fn castling_moves(
    color: Color,
    grid: &Grid,
    king: &Piece,
    opponent_moves: &[Move],
    in_check: bool,
) -> Vec<Move> {
    let mut moves = Vec::new();

    let (king_home, sides) = match color {
        Color::Black => (4, [BLACK_SHORT, BLACK_LONG]),
        Color::White => (60, [WHITE_SHORT, WHITE_LONG]),
    };
    if king.has_moved() || king.square() != king_home || in_check {
        return moves;
    }

    for side in sides {
        if !side.empty.iter().all(|&pos| grid.square(pos).is_none()) {
            continue;
        }
        if side
            .king_path
            .iter()
            .any(|&pos| attacks_square(pos, opponent_moves))
        {
            continue;
        }
        let rook = match grid.square(side.rook_home) {
            Some(piece)
                if piece.kind() == PieceKind::Rook
                    && piece.color() == color
                    && !piece.has_moved() =>
            {
                *piece
            }
            _ => continue,
        };

        let castle = Castle {
            king: *king,
            king_dest: side.king_dest,
            rook,
            rook_dest: side.rook_dest,
        };
        moves.push(if side.short {
            Move::CastleShort(castle)
        } else {
            Move::CastleLong(castle)
        });
    }

    moves
}
