//! The `RulesEngine` trait: the only thing a room needs to know about chess.
//!
//! Rooms never inspect the position themselves. They hand each move to the
//! engine, which either applies it or refuses it, and ask whether the game
//! is over.

use chess::{Board, BoardStatus, ChessMove};

/// Move legality and game-over detection for one game.
///
/// One instance is bound to one room for its whole life.
pub trait RulesEngine: Send + 'static {
    /// Applies a move in short algebraic notation.
    ///
    /// Returns `false`, leaving the position untouched, if the move is
    /// malformed or illegal.
    fn apply_move(&mut self, san: &str) -> bool;

    /// Returns `true` once the position admits no further moves.
    fn is_terminal(&self) -> bool;
}

/// Standard chess, backed by the `chess` crate.
///
/// Check and annotation suffixes (`+`, `#`, `!`, `?`) are accepted and
/// ignored. Only checkmate ends the game; stalemate and draw rules are
/// left to the players.
#[derive(Debug, Clone, Default)]
pub struct ChessRules {
    board: Board,
}

impl ChessRules {
    /// The current position.
    pub fn board(&self) -> &Board {
        &self.board
    }
}

impl RulesEngine for ChessRules {
    fn apply_move(&mut self, san: &str) -> bool {
        let bare = san.trim_end_matches(['+', '#', '!', '?']);
        match ChessMove::from_san(&self.board, bare) {
            Ok(mv) if self.board.legal(mv) => {
                self.board = self.board.make_move_new(mv);
                true
            }
            _ => false,
        }
    }

    fn is_terminal(&self) -> bool {
        self.board.status() == BoardStatus::Checkmate
    }
}
