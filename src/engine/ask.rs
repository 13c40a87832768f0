//! An engine that asks the human for every move.
//!
//! Useful for checking a GUI setup end to end without a search: each time the
//! engine is on move, a dialog pops up and whatever the user types is played.

use super::Engine;
use crate::xboard::notation::CoordinateMove;
use crate::xboard::output::Peer;

const PROMPT: &str = "Please, help me! Give me a move!";

#[derive(Debug, Default)]
pub struct AskUserEngine {
    force_mode: bool,
}

impl AskUserEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn play(&mut self, peer: &mut Peer<'_>) {
        match peer.ask_user(PROMPT) {
            Some(answer) if !answer.trim().is_empty() => peer.announce_move_text(answer.trim()),
            _ => peer.debug("no move given"),
        }
    }
}

impl Engine for AskUserEngine {
    fn name(&self) -> &str {
        "AskUserEngine"
    }

    fn move_now(&mut self, _peer: &mut Peer<'_>) {}

    fn new_game(&mut self, peer: &mut Peer<'_>) {
        self.force_mode = false;
        peer.debug("New game started");
    }

    fn set_board(&mut self, _peer: &mut Peer<'_>, _fen: &str) {}

    /// Asking is bounded by the human, not by computation, and the answer
    /// arrives on the same input stream; it runs on the session thread.
    fn go(&mut self, peer: &mut Peer<'_>) {
        self.force_mode = false;
        self.play(peer);
    }

    fn opponent_move(&mut self, peer: &mut Peer<'_>, _text: &str, _mv: CoordinateMove) {
        if !self.force_mode {
            self.play(peer);
        }
    }

    fn quit(&mut self, peer: &mut Peer<'_>) {
        peer.debug("Bye");
    }

    fn force(&mut self, peer: &mut Peer<'_>) {
        self.force_mode = true;
        peer.debug("AskUserEngine is inactive");
    }
}
