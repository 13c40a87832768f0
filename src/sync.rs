//! Synchronization primitives shared between the session loop and a think.
//!
//! A think can be asked to stop in two ways: "move now" wants the think to
//! wrap up and still report its best move, while an abort (new game, new
//! position, quit) wants it gone with nothing reported.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const RUNNING: u8 = 0;
const STOPPED: u8 = 1;
const ABORTED: u8 = 2;

/// A thread-safe signal telling a think to stop, and whether its result still matters.
#[derive(Clone, Debug)]
pub struct StopFlag(Arc<AtomicU8>);

impl StopFlag {
    /// Create a new flag in the running state.
    #[must_use]
    pub fn new() -> Self {
        StopFlag(Arc::new(AtomicU8::new(RUNNING)))
    }

    /// True once either `stop` or `abort` has been requested.
    ///
    /// Searchers poll this and return as soon as it flips.
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire) != RUNNING
    }

    /// True if the think's result must be discarded.
    #[inline]
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire) == ABORTED
    }

    /// Ask the think to finish and report what it has.
    ///
    /// An abort already in effect is never downgraded.
    #[inline]
    pub fn stop(&self) {
        let _ = self
            .0
            .compare_exchange(RUNNING, STOPPED, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Ask the think to finish and report nothing.
    #[inline]
    pub fn abort(&self) {
        self.0.store(ABORTED, Ordering::Release);
    }
}

impl Default for StopFlag {
    fn default() -> Self {
        Self::new()
    }
}
