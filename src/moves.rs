use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::geometry::{file_name, square_name};
use crate::piece::{Piece, PieceKind};

/// Payload shared by the two castling variants: the king with its
/// destination and the rook with its destination. Each piece's origin
/// is its own square.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Castle {
    pub king: Piece,
    pub king_dest: usize,
    pub rook: Piece,
    pub rook_dest: usize,
}

/// One candidate state transition. Every variant carries the moved
/// piece at its pre-move value plus whatever else `perform` needs to
/// produce the successor board.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Move {
    Quiet {
        piece: Piece,
        dest: usize,
    },
    Capture {
        piece: Piece,
        dest: usize,
        captured: Piece,
    },
    /// Pawn two-square advance; registers the pawn as the successor
    /// board's en-passant target.
    DoublePush {
        pawn: Piece,
        dest: usize,
    },
    /// The captured piece is the en-passant pawn beside the mover, not
    /// an occupant of the (empty) destination square.
    EnPassant {
        pawn: Piece,
        dest: usize,
        captured: Piece,
    },
    CastleShort(Castle),
    CastleLong(Castle),
    /// Wraps the underlying pawn arrival on the last rank; the piece
    /// transform resolves it to a queen.
    Promotion {
        inner: Box<Move>,
    },
    /// Sentinel returned by `find` when no legal move matches the
    /// requested squares. Performing it is a caller bug and panics.
    Illegal,
}

impl Move {
    /// The piece being moved, at its pre-move value.
    pub fn piece(&self) -> &Piece {
        match self {
            Move::Quiet { piece, .. } | Move::Capture { piece, .. } => piece,
            Move::DoublePush { pawn, .. } | Move::EnPassant { pawn, .. } => pawn,
            Move::CastleShort(castle) | Move::CastleLong(castle) => &castle.king,
            Move::Promotion { inner } => inner.piece(),
            Move::Illegal => panic!("the illegal-move sentinel moves no piece"),
        }
    }

    pub fn origin(&self) -> usize {
        self.piece().square()
    }

    pub fn dest(&self) -> usize {
        match self {
            Move::Quiet { dest, .. }
            | Move::Capture { dest, .. }
            | Move::DoublePush { dest, .. }
            | Move::EnPassant { dest, .. } => *dest,
            Move::CastleShort(castle) | Move::CastleLong(castle) => castle.king_dest,
            Move::Promotion { inner } => inner.dest(),
            Move::Illegal => panic!("the illegal-move sentinel has no destination"),
        }
    }

    pub fn captured(&self) -> Option<&Piece> {
        match self {
            Move::Capture { captured, .. } | Move::EnPassant { captured, .. } => Some(captured),
            Move::Promotion { inner } => inner.captured(),
            _ => None,
        }
    }

    pub fn is_capture(&self) -> bool {
        self.captured().is_some()
    }

    pub fn is_castle(&self) -> bool {
        matches!(self, Move::CastleShort(_) | Move::CastleLong(_))
    }

    /// Resolve a (from, to) square pair against the legal moves already
    /// computed on `board`. Falls back to the `Illegal` sentinel, which
    /// the transaction layer rejects as `Canceled`.
    pub fn find(board: &Board, from: usize, to: usize) -> Move {
        board
            .all_legal_moves()
            .find(|m| m.origin() == from && m.dest() == to)
            .cloned()
            .unwrap_or(Move::Illegal)
    }

    /// The single state-transition primitive: build the successor board
    /// with this move applied. The incoming board is untouched and
    /// remains valid as the predecessor snapshot.
    ///
    /// Panics when called on the `Illegal` sentinel; a sentinel that
    /// reaches `perform` means a caller bypassed the legality check.
    pub fn perform(&self, board: &Board) -> Board {
        // Promotion bookkeeping is its inner move's; the piece
        // transform turns the arriving pawn into a queen.
        let applied = match self {
            Move::Promotion { inner } => inner.as_ref(),
            Move::Illegal => panic!("attempted to perform an illegal move"),
            other => other,
        };

        let mover = board.to_move();
        let castling_rook = match applied {
            Move::CastleShort(castle) | Move::CastleLong(castle) => Some(&castle.rook),
            _ => None,
        };

        let mut builder = Board::builder();

        for piece in board.pieces(mover) {
            if piece == applied.piece() || Some(piece) == castling_rook {
                continue;
            }
            builder = builder.place(*piece);
        }
        for piece in board.pieces(mover.opposite()) {
            if Some(piece) == applied.captured() {
                continue;
            }
            builder = builder.place(*piece);
        }

        let moved = applied.piece().advanced_to(applied.dest());
        builder = builder.place(moved);

        match applied {
            Move::DoublePush { .. } => {
                builder = builder.en_passant_pawn(moved);
            }
            Move::CastleShort(castle) | Move::CastleLong(castle) => {
                builder = builder.place(castle.rook.advanced_to(castle.rook_dest));
            }
            _ => {}
        }

        builder
            .next_to_move(mover.opposite())
            .produced_by(self.clone())
            .build()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Quiet { piece, dest } => {
                if piece.kind() == PieceKind::Pawn {
                    write!(f, "{}", square_name(*dest))
                } else {
                    write!(f, "{}{}", piece.kind().letter(), square_name(*dest))
                }
            }
            Move::Capture { piece, dest, .. } => {
                if piece.kind() == PieceKind::Pawn {
                    write!(f, "{}x{}", file_name(piece.square()), square_name(*dest))
                } else {
                    write!(f, "{}x{}", piece.kind().letter(), square_name(*dest))
                }
            }
            Move::DoublePush { dest, .. } => write!(f, "{}", square_name(*dest)),
            Move::EnPassant { pawn, dest, .. } => {
                write!(f, "{}x{}", file_name(pawn.square()), square_name(*dest))
            }
            Move::CastleShort(_) => write!(f, "O-O"),
            Move::CastleLong(_) => write!(f, "O-O-O"),
            Move::Promotion { inner } => {
                write!(
                    f,
                    "{}-{}=q",
                    square_name(inner.origin()),
                    square_name(inner.dest())
                )
            }
            Move::Illegal => write!(f, "illegal move"),
        }
    }
}

/// Outcome envelope for an attempted move. Only a completed attempt
/// carries the successor board; rejections leave the caller holding
/// the board it already had.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MoveTransaction {
    /// The move was legal; play continues from the carried board.
    Completed(Board),
    /// The move is not in the mover's legal set.
    Canceled,
    /// The move would leave the mover's own king attacked.
    PlayerChecked,
}

impl MoveTransaction {
    pub fn is_completed(&self) -> bool {
        matches!(self, MoveTransaction::Completed(_))
    }

    pub fn board(&self) -> Option<&Board> {
        match self {
            MoveTransaction::Completed(board) => Some(board),
            _ => None,
        }
    }

    pub fn into_board(self) -> Option<Board> {
        match self {
            MoveTransaction::Completed(board) => Some(board),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::Color;

    fn play(board: Board, from: usize, to: usize) -> Board {
        let mv = Move::find(&board, from, to);
        board
            .perform_move(&mv)
            .into_board()
            .unwrap_or_else(|| panic!("move {from}->{to} should complete"))
    }

    #[test]
    fn double_push_registers_en_passant_target() {
        let board = Board::initialize();
        let mv = Move::find(&board, 52, 36); // e2e4
        assert!(matches!(mv, Move::DoublePush { .. }));

        let next = mv.perform(&board);
        let target = next.en_passant_pawn().expect("pawn capturable in passing");
        assert_eq!(target.square(), 36);
        assert_eq!(target.color(), Color::White);
        assert!(target.has_moved());
    }

    #[test]
    fn any_other_move_clears_en_passant_target() {
        let board = play(Board::initialize(), 52, 36); // e4
        assert!(board.en_passant_pawn().is_some());
        let board = play(board, 8, 16); // a6, a plain push
        assert!(board.en_passant_pawn().is_none());
    }

    #[test]
    fn pawn_cannot_capture_an_empty_diagonal() {
        let board = play(Board::initialize(), 52, 36); // e4
        let board = play(board, 12, 28); // e5
        // exd5 has no target after 1.e4 e5
        assert_eq!(Move::find(&board, 36, 27), Move::Illegal);
    }

    #[test]
    fn pawn_capture_removes_the_occupant() {
        let board = play(Board::initialize(), 52, 36); // e4
        let board = play(board, 11, 27); // d5
        let capture = Move::find(&board, 36, 27); // exd5
        assert!(matches!(capture, Move::Capture { .. }));

        let next = capture.perform(&board);
        assert_eq!(next.pieces(Color::Black).len(), 15);
        assert_eq!(next.pieces(Color::White).len(), 16);
        let occupant = next.square(27).expect("capturing pawn landed");
        assert_eq!(occupant.color(), Color::White);
    }

    #[test]
    fn en_passant_captures_the_passing_pawn() {
        let board = play(Board::initialize(), 52, 36); // e4
        let board = play(board, 8, 16); // a6
        let board = play(board, 36, 28); // e5
        let board = play(board, 11, 27); // d5
        let capture = Move::find(&board, 28, 19); // exd6 e.p.
        assert!(matches!(capture, Move::EnPassant { .. }));

        let next = capture.perform(&board);
        assert!(next.square(27).is_none(), "passing pawn removed");
        assert_eq!(next.square(19).map(|p| p.color()), Some(Color::White));
        assert_eq!(next.pieces(Color::Black).len(), 15);
    }

    #[test]
    fn castling_moves_king_and_rook_together() {
        let board = Board::builder()
            .place(Piece::new(PieceKind::King, Color::White, 60))
            .place(Piece::new(PieceKind::Rook, Color::White, 63))
            .place(Piece::new(PieceKind::Rook, Color::White, 56))
            .place(Piece::new(PieceKind::King, Color::Black, 4))
            .build();

        let short = Move::find(&board, 60, 62);
        assert!(matches!(short, Move::CastleShort(_)));
        let next = short.perform(&board);
        assert_eq!(next.square(62).map(|p| p.kind()), Some(PieceKind::King));
        assert_eq!(next.square(61).map(|p| p.kind()), Some(PieceKind::Rook));
        assert!(next.square(60).is_none());
        assert!(next.square(63).is_none());
        assert!(next.square(61).is_some_and(|p| p.has_moved()));
        assert!(next.square(62).is_some_and(|p| p.has_moved()));

        let long = Move::find(&board, 60, 58);
        assert!(matches!(long, Move::CastleLong(_)));
        let next = long.perform(&board);
        assert_eq!(next.square(58).map(|p| p.kind()), Some(PieceKind::King));
        assert_eq!(next.square(59).map(|p| p.kind()), Some(PieceKind::Rook));
        assert!(next.square(56).is_none());
    }

    #[test]
    fn promotion_yields_a_queen_on_the_last_rank() {
        let board = Board::builder()
            .place(Piece::new(PieceKind::King, Color::White, 60))
            .place(Piece::new(PieceKind::King, Color::Black, 39))
            .place(Piece::moved(PieceKind::Pawn, Color::White, 9))
            .build();

        let promotion = Move::find(&board, 9, 1);
        assert!(matches!(promotion, Move::Promotion { .. }));

        let next = promotion.perform(&board);
        let queen = next.square(1).expect("promoted piece on b8");
        assert_eq!(queen.kind(), PieceKind::Queen);
        assert_eq!(queen.color(), Color::White);
        assert!(queen.has_moved());
        // the promotion records itself as the producing move
        assert!(matches!(next.produced_by(), Some(Move::Promotion { .. })));
    }

    #[test]
    fn unmatched_squares_resolve_to_the_sentinel() {
        let board = Board::initialize();
        assert_eq!(Move::find(&board, 0, 36), Move::Illegal);
        assert_eq!(Move::find(&board, 52, 52), Move::Illegal);
    }

    #[test]
    #[should_panic(expected = "illegal move")]
    fn performing_the_sentinel_is_fatal() {
        let board = Board::initialize();
        Move::Illegal.perform(&board);
    }

    #[test]
    fn moves_render_in_short_notation() {
        let board = Board::initialize();
        assert_eq!(Move::find(&board, 52, 36).to_string(), "e4"); // double push
        assert_eq!(Move::find(&board, 62, 45).to_string(), "nf3");
        assert_eq!(Move::Illegal.to_string(), "illegal move");
    }
}
