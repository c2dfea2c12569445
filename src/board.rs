use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{SQUARES, SQUARES_PER_RANK};
use crate::moves::{Move, MoveTransaction};
use crate::piece::{Color, Piece, PieceKind};
use crate::player::Player;

/// Raw square occupancy of one snapshot: 64 squares plus the pawn (if
/// any) that double-stepped on the previous move and is capturable en
/// passant. Move generation consumes a grid directly, so generators
/// can run before any `Player` exists; that ordering is what keeps
/// board construction from recursing into itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Grid {
    #[serde(with = "square_array")]
    squares: [Option<Piece>; SQUARES],
    en_passant: Option<Piece>,
}

/// Serde adapter for the square array; serde's own array support
/// stops at 32 elements.
mod square_array {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::geometry::SQUARES;
    use crate::piece::Piece;

    pub fn serialize<S>(
        squares: &[Option<Piece>; SQUARES],
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        squares.as_slice().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[Option<Piece>; SQUARES], D::Error>
    where
        D: Deserializer<'de>,
    {
        let squares: Vec<Option<Piece>> = Vec::deserialize(deserializer)?;
        let len = squares.len();
        squares
            .try_into()
            .map_err(|_| D::Error::invalid_length(len, &"one entry per square"))
    }
}

impl Grid {
    /// Occupant of a square. `pos` must be a valid square index.
    pub fn square(&self, pos: usize) -> Option<&Piece> {
        self.squares[pos].as_ref()
    }

    /// The pawn that double-stepped on the previous move, if any.
    pub fn en_passant_pawn(&self) -> Option<&Piece> {
        self.en_passant.as_ref()
    }

    fn pieces_of(&self, color: Color) -> Vec<Piece> {
        self.squares
            .iter()
            .flatten()
            .filter(|piece| piece.color() == color)
            .copied()
            .collect()
    }
}

/// An immutable game snapshot. Advancing the game never mutates a
/// board; a completed `MoveTransaction` carries the successor, and the
/// caller keeps whatever predecessors it wants for history or undo.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Board {
    grid: Grid,
    white_pieces: Vec<Piece>,
    black_pieces: Vec<Piece>,
    white: Player,
    black: Player,
    to_move: Color,
    produced_by: Option<Move>,
}

impl Board {
    pub fn builder() -> BoardBuilder {
        BoardBuilder::new()
    }

    /// Standard 32-piece starting position, White to move.
    pub fn initialize() -> Board {
        const BACK_RANK: [PieceKind; 8] = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];

        let mut builder = Board::builder();
        for (file, &kind) in BACK_RANK.iter().enumerate() {
            builder = builder
                .place(Piece::new(kind, Color::Black, file))
                .place(Piece::new(PieceKind::Pawn, Color::Black, 8 + file))
                .place(Piece::new(PieceKind::Pawn, Color::White, 48 + file))
                .place(Piece::new(kind, Color::White, 56 + file));
        }

        builder.next_to_move(Color::White).build()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Occupant of a square. `pos` must be a valid square index.
    pub fn square(&self, pos: usize) -> Option<&Piece> {
        self.grid.square(pos)
    }

    pub fn en_passant_pawn(&self) -> Option<&Piece> {
        self.grid.en_passant_pawn()
    }

    pub fn to_move(&self) -> Color {
        self.to_move
    }

    /// In-game pieces of one side.
    pub fn pieces(&self, color: Color) -> &[Piece] {
        match color {
            Color::White => &self.white_pieces,
            Color::Black => &self.black_pieces,
        }
    }

    pub fn player(&self, color: Color) -> &Player {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    pub fn current_player(&self) -> &Player {
        self.player(self.to_move)
    }

    /// Legal moves of the side to move.
    pub fn legal_moves(&self) -> &[Move] {
        self.current_player().legal_moves()
    }

    /// Both sides' legal moves, for resolving (from, to) gestures.
    pub fn all_legal_moves(&self) -> impl Iterator<Item = &Move> {
        self.white
            .legal_moves()
            .iter()
            .chain(self.black.legal_moves().iter())
    }

    /// The move that produced this snapshot; None marks an initial
    /// position.
    pub fn produced_by(&self) -> Option<&Move> {
        self.produced_by.as_ref()
    }

    /// Attempt a move on behalf of the side to move.
    pub fn perform_move(&self, mv: &Move) -> MoveTransaction {
        self.current_player().perform_move(self, mv)
    }

    pub fn is_checkmate(&self) -> bool {
        self.current_player().is_checkmated(self)
    }

    pub fn is_stalemate(&self) -> bool {
        self.current_player().is_stalemated(self)
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::initialize()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pos in 0..SQUARES {
            match self.grid.square(pos) {
                Some(piece) => write!(f, "{:>3}", piece.to_string())?,
                None => write!(f, "{:>3}", "-")?,
            }
            if (pos + 1) % SQUARES_PER_RANK == 0 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Assembles a board from piece placements. Every board in the engine
/// comes through here, including the successors `Move::perform` builds.
pub struct BoardBuilder {
    squares: [Option<Piece>; SQUARES],
    en_passant: Option<Piece>,
    to_move: Color,
    produced_by: Option<Move>,
}

impl BoardBuilder {
    pub fn new() -> BoardBuilder {
        BoardBuilder {
            squares: [None; SQUARES],
            en_passant: None,
            to_move: Color::White,
            produced_by: None,
        }
    }

    /// Put a piece on its square, replacing any previous occupant.
    pub fn place(mut self, piece: Piece) -> BoardBuilder {
        self.squares[piece.square()] = Some(piece);
        self
    }

    /// Register the pawn that just double-stepped.
    pub fn en_passant_pawn(mut self, pawn: Piece) -> BoardBuilder {
        self.en_passant = Some(pawn);
        self
    }

    pub fn next_to_move(mut self, color: Color) -> BoardBuilder {
        self.to_move = color;
        self
    }

    pub fn produced_by(mut self, mv: Move) -> BoardBuilder {
        self.produced_by = Some(mv);
        self
    }

    /// Derive the piece lists, compute each side's pseudo-legal moves,
    /// construct both players, and freeze the snapshot.
    ///
    /// Panics when either side is missing its king: a board without
    /// two kings is a construction error, not a game state.
    pub fn build(self) -> Board {
        let grid = Grid {
            squares: self.squares,
            en_passant: self.en_passant,
        };
        let white_pieces = grid.pieces_of(Color::White);
        let black_pieces = grid.pieces_of(Color::Black);
        let white_moves = pseudo_legal_union(&white_pieces, &grid);
        let black_moves = pseudo_legal_union(&black_pieces, &grid);
        let white = Player::new(Color::White, &grid, &white_pieces, &white_moves, &black_moves);
        let black = Player::new(Color::Black, &grid, &black_pieces, &black_moves, &white_moves);

        Board {
            grid,
            white_pieces,
            black_pieces,
            white,
            black,
            to_move: self.to_move,
            produced_by: self.produced_by,
        }
    }
}

impl Default for BoardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Union of every piece's pseudo-legal moves for one side.
fn pseudo_legal_union(pieces: &[Piece], grid: &Grid) -> Vec<Move> {
    pieces
        .iter()
        .flat_map(|piece| piece.pseudo_legal_moves(grid))
        .collect()
}

/// Count the legal move sequences of the given depth by driving the
/// transaction protocol, one successor board per node.
pub fn perft(board: &Board, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mut nodes = 0;
    for mv in board.legal_moves() {
        if let MoveTransaction::Completed(next) = board.perform_move(mv) {
            nodes += perft(&next, depth - 1);
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::Move;

    #[test]
    fn initial_position_is_the_standard_layout() {
        let board = Board::initialize();
        assert_eq!(board.to_move(), Color::White);
        assert_eq!(board.pieces(Color::White).len(), 16);
        assert_eq!(board.pieces(Color::Black).len(), 16);
        assert!(board.produced_by().is_none());
        assert!(board.en_passant_pawn().is_none());

        assert_eq!(board.square(4).map(|p| p.kind()), Some(PieceKind::King));
        assert_eq!(board.square(3).map(|p| p.kind()), Some(PieceKind::Queen));
        assert_eq!(board.square(60).map(|p| p.kind()), Some(PieceKind::King));
        assert_eq!(board.square(59).map(|p| p.kind()), Some(PieceKind::Queen));
        assert_eq!(board.player(Color::White).king().square(), 60);
        assert_eq!(board.player(Color::Black).king().square(), 4);
    }

    #[test]
    fn twenty_opening_moves_for_white() {
        let board = Board::initialize();
        assert_eq!(board.legal_moves().len(), 20);
    }

    #[test]
    fn legal_move_query_is_idempotent() {
        let board = Board::initialize();
        let first: Vec<Move> = board.legal_moves().to_vec();
        let second: Vec<Move> = board.legal_moves().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn performing_hands_the_turn_to_the_opponent() {
        let board = Board::initialize();
        let mv = Move::find(&board, 52, 36);
        let next = mv.perform(&board);
        assert_eq!(next.to_move(), Color::Black);
        assert_eq!(next.current_player().color(), Color::Black);
        // the predecessor snapshot is untouched
        assert_eq!(board.to_move(), Color::White);
        assert!(board.square(52).is_some());
    }

    #[test]
    fn piece_counts_survive_quiet_moves_and_drop_on_captures() {
        let board = Board::initialize();
        let quiet = Move::find(&board, 57, 42).perform(&board); // Nc3
        assert_eq!(
            quiet.pieces(Color::White).len() + quiet.pieces(Color::Black).len(),
            32
        );

        let board = Move::find(&board, 52, 36).perform(&board); // e4
        let board = Move::find(&board, 11, 27).perform(&board); // d5
        let after = Move::find(&board, 36, 27).perform(&board); // exd5
        assert_eq!(
            after.pieces(Color::White).len() + after.pieces(Color::Black).len(),
            31
        );
    }

    #[test]
    #[should_panic(expected = "king")]
    fn a_board_without_kings_cannot_be_built() {
        Board::builder()
            .place(Piece::new(PieceKind::Rook, Color::White, 63))
            .place(Piece::new(PieceKind::Rook, Color::Black, 0))
            .build();
    }

    #[test]
    fn ascii_rendering_shows_the_grid() {
        let rendered = Board::initialize().to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "  r  n  b  q  k  b  n  r");
        assert_eq!(lines[4], "  -  -  -  -  -  -  -  -");
        assert_eq!(lines[7], "  R  N  B  Q  K  B  N  R");
    }

    #[test]
    fn perft_matches_known_node_counts() {
        let board = Board::initialize();
        assert_eq!(perft(&board, 1), 20);
        assert_eq!(perft(&board, 2), 400);
        assert_eq!(perft(&board, 3), 8_902);
    }
}
