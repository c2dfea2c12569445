use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::Grid;
use crate::geometry::{self, FILE_A, FILE_B, FILE_G, FILE_H, RANK_1, RANK_2, RANK_7, RANK_8};
use crate::moves::Move;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Sign of this color's forward direction in square indices.
    /// White advances toward a8 (index 0), Black toward h1 (index 63).
    pub fn advance(self) -> isize {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    /// True when `pos` lies on the rank this color's pawns start from.
    pub fn is_pawn_rank(self, pos: usize) -> bool {
        match self {
            Color::White => RANK_2[pos],
            Color::Black => RANK_7[pos],
        }
    }

    /// Last rank for this color; a pawn arriving here promotes.
    pub fn is_promotion_rank(self, pos: usize) -> bool {
        match self {
            Color::White => RANK_8[pos],
            Color::Black => RANK_1[pos],
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PieceKind {
    King,
    Queen,
    Rook,
    Knight,
    Bishop,
    Pawn,
}

impl PieceKind {
    /// One-letter abbreviation used by board and move rendering.
    pub fn letter(self) -> char {
        match self {
            PieceKind::King => 'k',
            PieceKind::Queen => 'q',
            PieceKind::Rook => 'r',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Pawn => 'p',
        }
    }
}

const ROOK_OFFSETS: [isize; 4] = [-8, -1, 1, 8];
const BISHOP_OFFSETS: [isize; 4] = [-9, -7, 7, 9];
const QUEEN_OFFSETS: [isize; 8] = [-9, -8, -7, -1, 1, 7, 8, 9];
const KING_OFFSETS: [isize; 8] = [-9, -8, -7, -1, 1, 7, 8, 9];
const KNIGHT_OFFSETS: [isize; 8] = [-17, -15, -10, -6, 6, 10, 15, 17];

/// True when stepping `offset` from `pos` would wrap around the west
/// edge of the board (a westward step taken from the a-file).
fn wraps_west(pos: usize, offset: isize) -> bool {
    FILE_A[pos] && matches!(offset, -9 | -1 | 7)
}

/// Mirror of `wraps_west` for eastward steps from the h-file.
fn wraps_east(pos: usize, offset: isize) -> bool {
    FILE_H[pos] && matches!(offset, -7 | 1 | 9)
}

/// A knight offset is invalid when the origin file would put the
/// destination across a board edge.
fn knight_wraps(pos: usize, offset: isize) -> bool {
    (FILE_A[pos] && matches!(offset, -17 | -10 | 6 | 15))
        || (FILE_B[pos] && matches!(offset, -10 | 6))
        || (FILE_G[pos] && matches!(offset, -6 | 10))
        || (FILE_H[pos] && matches!(offset, -15 | -6 | 10 | 17))
}

/// An immutable piece value. Moving a piece never mutates it; the
/// successor board holds a brand-new value produced by `advanced_to`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Piece {
    kind: PieceKind,
    color: Color,
    square: usize,
    has_moved: bool,
}

impl Piece {
    /// A piece that has not moved yet (initial placements).
    pub fn new(kind: PieceKind, color: Color, square: usize) -> Piece {
        Piece {
            kind,
            color,
            square,
            has_moved: false,
        }
    }

    /// A piece with its first move already spent, for setting up
    /// mid-game positions.
    pub fn moved(kind: PieceKind, color: Color, square: usize) -> Piece {
        Piece {
            kind,
            color,
            square,
            has_moved: true,
        }
    }

    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn square(&self) -> usize {
        self.square
    }

    pub fn has_moved(&self) -> bool {
        self.has_moved
    }

    /// The value this piece takes after completing a move to `dest`:
    /// relocated, with its first move spent. A pawn arriving on its
    /// last rank comes back as a queen.
    pub fn advanced_to(&self, dest: usize) -> Piece {
        let kind = if self.kind == PieceKind::Pawn && self.color.is_promotion_rank(dest) {
            PieceKind::Queen
        } else {
            self.kind
        };
        Piece {
            kind,
            color: self.color,
            square: dest,
            has_moved: true,
        }
    }

    /// Pseudo-legal moves for this piece: on-board destinations obeying
    /// the movement shape and not blocked by a same-color piece, with
    /// no regard for whether the mover's king is left attacked. That
    /// filtering happens in the player's move transaction.
    pub fn pseudo_legal_moves(&self, grid: &Grid) -> Vec<Move> {
        match self.kind {
            PieceKind::Pawn => self.pawn_moves(grid),
            PieceKind::Knight => self.knight_moves(grid),
            PieceKind::Bishop => self.sliding_moves(grid, &BISHOP_OFFSETS),
            PieceKind::Rook => self.sliding_moves(grid, &ROOK_OFFSETS),
            PieceKind::Queen => self.sliding_moves(grid, &QUEEN_OFFSETS),
            PieceKind::King => self.king_moves(grid),
        }
    }

    /// Quiet or capture landing on a single destination square, or
    /// None when a same-color piece blocks it.
    fn single_move(&self, grid: &Grid, dest: usize) -> Option<Move> {
        match grid.square(dest) {
            None => Some(Move::Quiet { piece: *self, dest }),
            Some(occupant) if occupant.color() != self.color => Some(Move::Capture {
                piece: *self,
                dest,
                captured: *occupant,
            }),
            Some(_) => None,
        }
    }

    fn sliding_moves(&self, grid: &Grid, offsets: &[isize]) -> Vec<Move> {
        let mut moves = Vec::new();

        for &offset in offsets {
            let mut pos = self.square;
            while !wraps_west(pos, offset) && !wraps_east(pos, offset) {
                let next = pos as isize + offset;
                if !geometry::on_board(next) {
                    break;
                }
                let dest = next as usize;
                match grid.square(dest) {
                    None => {
                        moves.push(Move::Quiet { piece: *self, dest });
                        pos = dest;
                    }
                    Some(occupant) => {
                        if occupant.color() != self.color {
                            moves.push(Move::Capture {
                                piece: *self,
                                dest,
                                captured: *occupant,
                            });
                        }
                        break;
                    }
                }
            }
        }

        moves
    }

    fn knight_moves(&self, grid: &Grid) -> Vec<Move> {
        let mut moves = Vec::new();

        for &offset in &KNIGHT_OFFSETS {
            if knight_wraps(self.square, offset) {
                continue;
            }
            let dest = self.square as isize + offset;
            if !geometry::on_board(dest) {
                continue;
            }
            if let Some(mv) = self.single_move(grid, dest as usize) {
                moves.push(mv);
            }
        }

        moves
    }

    fn king_moves(&self, grid: &Grid) -> Vec<Move> {
        let mut moves = Vec::new();

        for &offset in &KING_OFFSETS {
            if wraps_west(self.square, offset) || wraps_east(self.square, offset) {
                continue;
            }
            let dest = self.square as isize + offset;
            if !geometry::on_board(dest) {
                continue;
            }
            if let Some(mv) = self.single_move(grid, dest as usize) {
                moves.push(mv);
            }
        }

        moves
    }

    fn pawn_moves(&self, grid: &Grid) -> Vec<Move> {
        let mut moves = Vec::new();
        let dir = self.color.advance();

        // single push
        let push = self.square as isize + dir * 8;
        if geometry::on_board(push) && grid.square(push as usize).is_none() {
            moves.push(self.promoting(Move::Quiet {
                piece: *self,
                dest: push as usize,
            }));

            // double push, only as the pawn's first move from its home rank
            if !self.has_moved && self.color.is_pawn_rank(self.square) {
                let jump = push + dir * 8;
                if geometry::on_board(jump) && grid.square(jump as usize).is_none() {
                    moves.push(Move::DoublePush {
                        pawn: *self,
                        dest: jump as usize,
                    });
                }
            }
        }

        // diagonal captures, one toward each board edge
        for offset in [7isize, 9] {
            if self.pawn_capture_wraps(offset) {
                continue;
            }
            let dest = self.square as isize + dir * offset;
            if !geometry::on_board(dest) {
                continue;
            }
            let dest = dest as usize;
            match grid.square(dest) {
                Some(occupant) if occupant.color() != self.color => {
                    moves.push(self.promoting(Move::Capture {
                        piece: *self,
                        dest,
                        captured: *occupant,
                    }));
                }
                Some(_) => {}
                None => {
                    // the square behind a just-double-stepped enemy pawn
                    if let Some(target) = grid.en_passant_pawn() {
                        if target.color() != self.color
                            && dest as isize == target.square() as isize + dir * 8
                        {
                            moves.push(Move::EnPassant {
                                pawn: *self,
                                dest,
                                captured: *target,
                            });
                        }
                    }
                }
            }
        }

        moves
    }

    /// Which edge each capture offset crosses depends on the pawn's
    /// direction of travel.
    fn pawn_capture_wraps(&self, offset: isize) -> bool {
        match offset {
            7 => {
                (FILE_A[self.square] && self.color == Color::Black)
                    || (FILE_H[self.square] && self.color == Color::White)
            }
            9 => {
                (FILE_A[self.square] && self.color == Color::White)
                    || (FILE_H[self.square] && self.color == Color::Black)
            }
            _ => false,
        }
    }

    /// Wrap a pawn arrival on the last rank in the promotion variant.
    fn promoting(&self, mv: Move) -> Move {
        if self.color.is_promotion_rank(mv.dest()) {
            Move::Promotion {
                inner: Box::new(mv),
            }
        } else {
            mv
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = self.kind.letter();
        match self.color {
            Color::White => write!(f, "{}", letter.to_ascii_uppercase()),
            Color::Black => write!(f, "{letter}"),
        }
    }
}
