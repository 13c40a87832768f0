//! An engine that accepts every command and never plays.

use log::debug;

use super::Engine;
use crate::xboard::notation::CoordinateMove;
use crate::xboard::output::Peer;

/// Protocol-compliance stub: negotiates features, then ignores everything.
#[derive(Debug, Default)]
pub struct NullEngine;

impl Engine for NullEngine {
    fn move_now(&mut self, _peer: &mut Peer<'_>) {}

    fn new_game(&mut self, _peer: &mut Peer<'_>) {}

    fn set_board(&mut self, _peer: &mut Peer<'_>, fen: &str) {
        debug!("ignoring position {fen}");
    }

    fn go(&mut self, _peer: &mut Peer<'_>) {}

    fn opponent_move(&mut self, _peer: &mut Peer<'_>, text: &str, _mv: CoordinateMove) {
        debug!("ignoring move {text}");
    }

    fn quit(&mut self, _peer: &mut Peer<'_>) {}
}
