//! Engine that thinks on a background thread.
//!
//! The chess itself lives behind [`Searcher`]. [`ThreadedEngine`] owns the
//! protocol bookkeeping (force mode, clocks, thinking output) and runs every
//! think on a [`ThinkJob`] so the session loop stays responsive.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use parking_lot::Mutex;

use super::job::ThinkJob;
use super::Engine;
use crate::sync::StopFlag;
use crate::xboard::notation::{Centiseconds, CoordinateMove, TimeControl};
use crate::xboard::output::{format_move, GameResult, Output, Peer, Thinking};

/// Limits and clocks in effect for the next think.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchLimits {
    /// Maximum depth (`sd`)
    pub depth: Option<u32>,
    /// Fixed time per move (`st`)
    pub move_time: Option<Duration>,
    /// Game time control (`level`)
    pub time_control: Option<TimeControl>,
    /// Engine's remaining clock (`time`)
    pub time_left: Option<Centiseconds>,
    /// Opponent's remaining clock (`otim`)
    pub opponent_time: Option<Centiseconds>,
    /// Think on the opponent's time (`hard`)
    pub ponder: bool,
    /// Randomize move choice (`random`)
    pub randomize: bool,
}

/// What a finished think decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Play this move.
    Move(CoordinateMove),
    /// Give up the game.
    Resign,
    /// The game is over and the engine claims this result.
    Claim(GameResult),
}

/// The chess behind a [`ThreadedEngine`]: position, move legality and search.
///
/// Every method is called with the engine's lock held, and never while a
/// think is running except for [`Searcher::think`] itself.
pub trait Searcher: Send + 'static {
    type Error: fmt::Display;

    /// Reset to the initial position.
    fn new_game(&mut self);

    /// Load a position from FEN.
    fn set_position(&mut self, fen: &str) -> Result<(), Self::Error>;

    /// Play a move on the current position; an error means it is illegal.
    fn make_move(&mut self, mv: CoordinateMove) -> Result<(), Self::Error>;

    /// Take back the last move; false if there is none.
    fn undo_move(&mut self) -> bool;

    /// The result, if the current position ends the game.
    fn game_result(&self) -> Option<GameResult>;

    /// Count leaf nodes to `depth`.
    fn perft(&mut self, depth: u32) -> u64;

    /// Search the current position.
    ///
    /// Must poll `stop` and return promptly once it is set. `report` receives
    /// progress lines as the search deepens.
    fn think(
        &mut self,
        limits: &SearchLimits,
        stop: &StopFlag,
        report: &mut dyn FnMut(&Thinking),
    ) -> Verdict;
}

/// [`Engine`] that runs a [`Searcher`] on its own thread.
pub struct ThreadedEngine<S: Searcher> {
    name: String,
    searcher: Arc<Mutex<S>>,
    job: Option<ThinkJob>,
    limits: SearchLimits,
    force_mode: bool,
    post: bool,
}

impl<S: Searcher> ThreadedEngine<S> {
    pub fn new(name: impl Into<String>, searcher: S) -> Self {
        ThreadedEngine {
            name: name.into(),
            searcher: Arc::new(Mutex::new(searcher)),
            job: None,
            limits: SearchLimits::default(),
            force_mode: false,
            post: false,
        }
    }

    /// Limits the next think will use.
    #[must_use]
    pub fn limits(&self) -> &SearchLimits {
        &self.limits
    }

    #[must_use]
    pub fn is_force_mode(&self) -> bool {
        self.force_mode
    }

    /// True while a think thread is alive.
    #[must_use]
    pub fn is_thinking(&self) -> bool {
        self.job.as_ref().is_some_and(|job| !job.is_finished())
    }

    /// Run `f` on the searcher.
    ///
    /// Blocks until any running think has released the searcher.
    pub fn with_searcher<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.searcher.lock())
    }

    /// Abort any running think, discard its result and wait for it to exit.
    ///
    /// The abort is raised with the output locked, so the think either has
    /// already announced its move or never will.
    fn cancel_think(&mut self, output: &Output) {
        if let Some(job) = self.job.take() {
            output.hold(|| job.abort());
            job.abort_and_wait();
            debug!("think cancelled");
        }
    }

    fn start_think(&mut self, peer: &mut Peer<'_>) {
        self.cancel_think(peer.output());
        let searcher = Arc::clone(&self.searcher);
        let output = peer.output().clone();
        let limits = self.limits.clone();
        let post = self.post;
        match ThinkJob::spawn("think", move |stop| {
            run_think(&searcher, &output, &limits, post, &stop);
        }) {
            Ok(job) => self.job = Some(job),
            Err(e) => peer.tell_user_error(&format!("cannot start thinking: {e}")),
        }
    }
}

/// Body of the think thread.
fn run_think<S: Searcher>(
    searcher: &Mutex<S>,
    output: &Output,
    limits: &SearchLimits,
    post: bool,
    stop: &StopFlag,
) {
    let mut searcher = searcher.lock();
    let verdict = searcher.think(limits, stop, &mut |thinking: &Thinking| {
        if post && !stop.is_aborted() {
            output.thinking(thinking);
        }
    });

    if stop.is_aborted() {
        debug!("think aborted, dropping {verdict:?}");
        return;
    }

    let wanted = || !stop.is_aborted();
    match verdict {
        Verdict::Move(mv) => {
            if let Err(e) = searcher.make_move(mv) {
                warn!("search returned unplayable move {mv}: {e}");
                return;
            }
            if !output.send_if(&format_move(&mv), wanted) {
                debug!("think aborted before announcing {mv}");
                searcher.undo_move();
                return;
            }
            if let Some(result) = searcher.game_result() {
                output.send_if(&result.to_string(), wanted);
            }
        }
        Verdict::Resign => {
            output.send_if("resign", wanted);
        }
        Verdict::Claim(result) => {
            output.send_if(&result.to_string(), wanted);
        }
    }
}

impl<S: Searcher> fmt::Debug for ThreadedEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadedEngine")
            .field("name", &self.name)
            .field("limits", &self.limits)
            .field("force_mode", &self.force_mode)
            .field("post", &self.post)
            .field("thinking", &self.is_thinking())
            .finish_non_exhaustive()
    }
}

impl<S: Searcher> Engine for ThreadedEngine<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn move_now(&mut self, peer: &mut Peer<'_>) {
        match &self.job {
            Some(job) if !job.is_finished() => job.signal_stop(),
            _ => peer.debug("not thinking"),
        }
    }

    fn new_game(&mut self, peer: &mut Peer<'_>) {
        self.cancel_think(peer.output());
        self.searcher.lock().new_game();
        self.force_mode = false;
        self.limits.depth = None;
        self.limits.move_time = None;
        self.limits.randomize = false;
        peer.debug("New game started");
    }

    fn set_board(&mut self, peer: &mut Peer<'_>, fen: &str) {
        self.cancel_think(peer.output());
        let loaded = self.searcher.lock().set_position(fen);
        match loaded {
            Ok(()) => peer.debug("position set"),
            Err(e) => peer.tell_user_error(&format!("Illegal position: {e}")),
        }
    }

    fn go(&mut self, peer: &mut Peer<'_>) {
        self.cancel_think(peer.output());
        self.force_mode = false;
        let over = self.searcher.lock().game_result();
        if over.is_some() {
            peer.tell_user_error("Game Over");
            return;
        }
        self.start_think(peer);
    }

    fn opponent_move(&mut self, peer: &mut Peer<'_>, text: &str, mv: CoordinateMove) {
        self.cancel_think(peer.output());
        let played = self.searcher.lock().make_move(mv);
        if let Err(e) = played {
            peer.debug(&format!("rejected {text}: {e}"));
            peer.illegal_move();
            return;
        }
        let over = self.searcher.lock().game_result();
        if let Some(result) = over {
            peer.result(&result);
        } else if !self.force_mode {
            self.start_think(peer);
        }
    }

    fn quit(&mut self, peer: &mut Peer<'_>) {
        // Dropping the job aborts it without waiting.
        if self.job.take().is_some() {
            peer.debug("abandoning think");
        }
    }

    fn set_pondering(&mut self, peer: &mut Peer<'_>, on: bool) {
        self.limits.ponder = on;
        peer.debug(if on { "Pondering on" } else { "Pondering off" });
    }

    fn set_show_thinking(&mut self, peer: &mut Peer<'_>, on: bool) {
        self.post = on;
        peer.debug(if on { "Thinking on" } else { "Thinking off" });
    }

    fn force(&mut self, peer: &mut Peer<'_>) {
        self.cancel_think(peer.output());
        self.force_mode = true;
        peer.debug("Force mode");
    }

    fn set_time_control(&mut self, peer: &mut Peer<'_>, control: TimeControl) {
        self.limits.time_control = Some(control);
        self.limits.move_time = None;
        peer.debug(&format!("time control {control:?}"));
    }

    fn set_move_time(&mut self, peer: &mut Peer<'_>, seconds: u32) {
        self.limits.move_time = Some(Duration::from_secs(u64::from(seconds)));
        peer.debug(&format!("{seconds} seconds per move"));
    }

    fn set_search_depth(&mut self, peer: &mut Peer<'_>, depth: u32) {
        self.limits.depth = Some(depth);
        peer.debug(&format!("depth limit {depth}"));
    }

    fn set_time(&mut self, _peer: &mut Peer<'_>, time: Centiseconds) {
        self.limits.time_left = Some(time);
    }

    fn set_opponent_time(&mut self, _peer: &mut Peer<'_>, time: Centiseconds) {
        self.limits.opponent_time = Some(time);
    }

    fn perft(&mut self, peer: &mut Peer<'_>, depth: u32) {
        self.cancel_think(peer.output());
        let start = Instant::now();
        let nodes = self.searcher.lock().perft(depth);
        let millis = start.elapsed().as_millis();
        peer.comment(&format!("perft {depth} {nodes} {millis}ms"));
    }

    fn random(&mut self, peer: &mut Peer<'_>) {
        self.limits.randomize = !self.limits.randomize;
        peer.debug(if self.limits.randomize {
            "Random on"
        } else {
            "Random off"
        });
    }

    fn undo(&mut self, peer: &mut Peer<'_>) {
        self.cancel_think(peer.output());
        let undone = self.searcher.lock().undo_move();
        peer.debug(if undone {
            "Reversed one move"
        } else {
            "nothing to undo"
        });
    }

    fn remove(&mut self, peer: &mut Peer<'_>) {
        self.cancel_think(peer.output());
        let undone = {
            let mut searcher = self.searcher.lock();
            searcher.undo_move() && searcher.undo_move()
        };
        peer.debug(if undone {
            "Reversed two moves"
        } else {
            "fewer than two moves to remove"
        });
    }

    fn resign(&mut self, peer: &mut Peer<'_>) {
        self.cancel_think(peer.output());
        self.force_mode = true;
        peer.resign();
    }

    fn unrecognized(&mut self, peer: &mut Peer<'_>, line: &str) {
        peer.debug(&format!("unrecognized: {line}"));
    }
}
