use chaturanga::board::Board;
use chaturanga::moves::MoveTransaction;
use chaturanga::piece::Color;
use rand::seq::SliceRandom;
use serde::Serialize;

const MAX_MOVES: usize = 200;

#[derive(Serialize)]
struct GameSummary {
    moves: Vec<String>,
    result: &'static str,
}

/// Play uniformly random legal moves from the starting position until
/// the game ends or the move cap is hit, then print the final board
/// and a JSON summary of the game.
fn main() {
    let mut rng = rand::thread_rng();
    let mut board = Board::initialize();
    let mut played: Vec<String> = Vec::new();
    let mut result = "move cap reached";

    while played.len() < MAX_MOVES {
        let mut candidates = board.legal_moves().to_vec();
        candidates.shuffle(&mut rng);

        let mut advanced = false;
        for mv in &candidates {
            if let MoveTransaction::Completed(next) = board.perform_move(mv) {
                played.push(mv.to_string());
                board = next;
                advanced = true;
                break;
            }
        }

        if !advanced {
            result = if board.current_player().is_checked() {
                match board.to_move() {
                    Color::White => "checkmate, black wins",
                    Color::Black => "checkmate, white wins",
                }
            } else {
                "stalemate"
            };
            break;
        }
    }

    println!("{board}");
    eprintln!("game over after {} moves: {result}", played.len());

    let summary = GameSummary {
        moves: played,
        result,
    };
    match serde_json::to_string(&summary) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("failed to encode game summary: {err}"),
    }
}
