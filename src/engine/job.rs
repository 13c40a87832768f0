//! Handle to a think running on its own thread.

use std::thread::{self, JoinHandle};

use log::{debug, warn};

use crate::sync::StopFlag;

/// Search thread stack size (32 MB)
const THINK_STACK_SIZE: usize = 32 * 1024 * 1024;

/// A running think and the means to stop it.
///
/// Dropping the handle aborts the think without waiting for it, so a session
/// can quit while a think is still unwinding.
pub struct ThinkJob {
    stop: StopFlag,
    handle: Option<JoinHandle<()>>,
}

impl ThinkJob {
    /// Run `think` on a new named thread.
    ///
    /// The closure receives the job's stop flag and must poll it.
    pub fn spawn<F>(name: &str, think: F) -> std::io::Result<Self>
    where
        F: FnOnce(StopFlag) + Send + 'static,
    {
        let stop = StopFlag::new();
        let flag = stop.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .stack_size(THINK_STACK_SIZE)
            .spawn(move || think(flag))?;
        debug!("spawned think thread `{name}`");
        Ok(ThinkJob {
            stop,
            handle: Some(handle),
        })
    }

    /// Ask the think to finish and report its move; does not wait.
    pub fn signal_stop(&self) {
        self.stop.stop();
    }

    /// Mark the think's result as unwanted; does not wait.
    pub fn abort(&self) {
        self.stop.abort();
    }

    /// Abort the think, discarding its result, and wait for the thread to exit.
    pub fn abort_and_wait(mut self) {
        self.stop.abort();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("think thread panicked");
            }
        }
    }

    /// True once the thinking thread has returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for ThinkJob {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn spin_until_stopped(flag: &StopFlag) {
        while !flag.is_stopped() {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_signal_stop_lets_think_report() {
        let reported = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&reported);
        let job = ThinkJob::spawn("test-think", move |flag| {
            spin_until_stopped(&flag);
            seen.store(!flag.is_aborted(), Ordering::SeqCst);
        })
        .unwrap();

        job.signal_stop();
        let start = Instant::now();
        while !job.is_finished() {
            assert!(start.elapsed() < Duration::from_secs(5));
            thread::sleep(Duration::from_millis(1));
        }
        assert!(reported.load(Ordering::SeqCst));
    }

    #[test]
    fn test_abort_and_wait_joins() {
        let aborted = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&aborted);
        let job = ThinkJob::spawn("test-abort", move |flag| {
            spin_until_stopped(&flag);
            seen.store(flag.is_aborted(), Ordering::SeqCst);
        })
        .unwrap();

        job.abort_and_wait();
        assert!(aborted.load(Ordering::SeqCst));
    }

    #[test]
    fn test_drop_does_not_block() {
        let (tx, rx) = std::sync::mpsc::channel();
        let job = ThinkJob::spawn("test-drop", move |flag| {
            spin_until_stopped(&flag);
            // Keep running well past the drop to show the drop did not wait.
            thread::sleep(Duration::from_millis(200));
            let _ = tx.send(flag.is_aborted());
        })
        .unwrap();

        let start = Instant::now();
        drop(job);
        assert!(start.elapsed() < Duration::from_millis(150));
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(true));
    }
}
