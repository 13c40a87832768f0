//! The engine side of the protocol.
//!
//! The session never looks at chess; it hands each command to an [`Engine`]
//! and lets it decide. Implementations here:
//!
//! - [`NullEngine`]: accepts everything and does nothing, for protocol tests
//! - [`AskUserEngine`]: asks the human for every move
//! - [`ThreadedEngine`]: thinks on a background thread through a [`Searcher`]

use log::{info, warn};

use crate::xboard::notation::{Centiseconds, CoordinateMove, TimeControl};
use crate::xboard::output::Peer;

pub mod ask;
pub mod job;
pub mod null;
pub mod threaded;

pub use ask::AskUserEngine;
pub use job::ThinkJob;
pub use null::NullEngine;
pub use threaded::{SearchLimits, Searcher, ThreadedEngine, Verdict};

/// Operations the session invokes, one per protocol command.
///
/// Every method receives the [`Peer`] for the current dispatch. Methods that
/// may compute for a long time (`go`, and `opponent_move` when it triggers a
/// reply) must hand that work to another thread and return at once, so the
/// session can read the `?` or `quit` that may follow.
pub trait Engine {
    /// Human-readable name used in the default feature announcement.
    fn name(&self) -> &str {
        env!("CARGO_PKG_NAME")
    }

    /// Feature string announced in reply to `protover`.
    fn features(&self) -> String {
        format!(
            "myname=\"{}\" setboard=1 analyze=0 variants=\"normal\" colors=0 debug=1 done=1",
            self.name()
        )
    }

    /// `protover N`: announce features.
    fn protover(&mut self, peer: &mut Peer<'_>, version: u32) {
        let features = self.features();
        if peer.feature(&features) {
            info!("protocol version {version}, features accepted");
        } else {
            warn!("protocol version {version}, features not accepted");
        }
    }

    /// `xboard`: the peer announces itself.
    fn xboard(&mut self, _peer: &mut Peer<'_>) {}

    /// `?`: stop thinking and move now. Must be safe to call at any time.
    fn move_now(&mut self, peer: &mut Peer<'_>);

    /// `new`: abort any think, then reset to the initial position.
    fn new_game(&mut self, peer: &mut Peer<'_>);

    /// `setboard FEN`: abort any think, then load the position.
    fn set_board(&mut self, peer: &mut Peer<'_>, fen: &str);

    /// `go`: leave force mode and start thinking.
    fn go(&mut self, peer: &mut Peer<'_>);

    /// A move by the opponent, with its original text.
    ///
    /// Illegal moves are reported with [`Output::illegal_move`](crate::xboard::output::Output::illegal_move).
    fn opponent_move(&mut self, peer: &mut Peer<'_>, text: &str, mv: CoordinateMove);

    /// `quit`: release resources. Must not wait for a think to finish.
    fn quit(&mut self, peer: &mut Peer<'_>);

    /// `black` (obsolete).
    fn black(&mut self, _peer: &mut Peer<'_>) {}

    /// `white` (obsolete).
    fn white(&mut self, _peer: &mut Peer<'_>) {}

    /// `computer`: the opponent is an engine.
    fn computer(&mut self, _peer: &mut Peer<'_>) {}

    /// `debug on|off`, after the session has switched its debug sink.
    fn set_debug(&mut self, _peer: &mut Peer<'_>, _on: bool) {}

    /// `hard` / `easy`.
    fn set_pondering(&mut self, _peer: &mut Peer<'_>, _on: bool) {}

    /// `post` / `nopost`.
    fn set_show_thinking(&mut self, _peer: &mut Peer<'_>, _on: bool) {}

    /// `force`: play neither side.
    fn force(&mut self, _peer: &mut Peer<'_>) {}

    /// `level MPS BASE INC`.
    fn set_time_control(&mut self, _peer: &mut Peer<'_>, _control: TimeControl) {}

    /// `st SECONDS`.
    fn set_move_time(&mut self, _peer: &mut Peer<'_>, _seconds: u32) {}

    /// `sd DEPTH`.
    fn set_search_depth(&mut self, _peer: &mut Peer<'_>, _depth: u32) {}

    /// `time N`: the engine's own clock.
    fn set_time(&mut self, _peer: &mut Peer<'_>, _time: Centiseconds) {}

    /// `otim N`: the opponent's clock.
    fn set_opponent_time(&mut self, _peer: &mut Peer<'_>, _time: Centiseconds) {}

    /// `perft DEPTH`.
    fn perft(&mut self, _peer: &mut Peer<'_>, _depth: u32) {}

    /// `random`: toggle randomized evaluation.
    fn random(&mut self, _peer: &mut Peer<'_>) {}

    /// `undo`: take back one ply.
    fn undo(&mut self, _peer: &mut Peer<'_>) {}

    /// `remove`: take back two plies.
    fn remove(&mut self, _peer: &mut Peer<'_>) {}

    /// `resign`.
    fn resign(&mut self, _peer: &mut Peer<'_>) {}

    /// Any line the session did not recognize. Must never fail.
    fn unrecognized(&mut self, _peer: &mut Peer<'_>, _line: &str) {}
}
