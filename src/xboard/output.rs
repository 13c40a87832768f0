//! Outgoing protocol messages.
//!
//! Thinking output format:
//! `<ply> <score> <time> <nodes> <pv>`
//!
//! Where:
//! - ply: search depth
//! - score: score in centipawns from the engine's point of view
//! - time: elapsed time in centiseconds
//! - nodes: nodes searched
//! - pv: principal variation, space separated

use std::fmt;
use std::io::{self, BufRead, Write};
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::warn;
use parking_lot::Mutex;

use super::notation::CoordinateMove;

/// One line of thinking output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Thinking {
    pub depth: u32,
    pub score: i32,
    pub elapsed: Duration,
    pub nodes: u64,
    pub pv: Vec<String>,
}

/// Final outcome of a game, as claimed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameResult {
    WhiteWins(String),
    BlackWins(String),
    Draw(String),
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameResult::WhiteWins(reason) => write!(f, "1-0 {{{reason}}}"),
            GameResult::BlackWins(reason) => write!(f, "0-1 {{{reason}}}"),
            GameResult::Draw(reason) => write!(f, "1/2-1/2 {{{reason}}}"),
        }
    }
}

/// Format a thinking line.
#[must_use]
pub fn format_thinking(thinking: &Thinking) -> String {
    let centis = thinking.elapsed.as_millis() / 10;
    format!(
        "{} {} {} {} {}",
        thinking.depth,
        thinking.score,
        centis,
        thinking.nodes,
        thinking.pv.join(" ")
    )
}

/// Format a move announcement.
#[must_use]
pub fn format_move(mv: &CoordinateMove) -> String {
    format!("move {mv}")
}

/// Format feature announcement after protover.
#[must_use]
pub fn format_features(features: &str) -> String {
    format!("feature {features}")
}

/// Tag the GUI puts in front of the user's answer to an `askuser` question.
pub const ASK_USER_TAG: &str = "ANSWER";

#[must_use]
pub fn format_ask_user(message: &str) -> String {
    format!("askuser {ASK_USER_TAG} {message}")
}

#[must_use]
pub fn format_tell_user(message: &str) -> String {
    format!("telluser {message}")
}

#[must_use]
pub fn format_tell_user_error(message: &str) -> String {
    format!("tellusererror {message}")
}

/// Format a comment line; the peer ignores these.
#[must_use]
pub fn format_comment(message: &str) -> String {
    format!("# {message}")
}

/// Format illegal move notice.
#[must_use]
pub fn format_illegal_move() -> String {
    "Illegal Move".to_string()
}

/// Shared, line-atomic writer to the peer plus the session's debug switch.
///
/// Clones share both the stream and the flag, so a background think can hold
/// its own handle while the session loop keeps writing.
#[derive(Clone)]
pub struct Output {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    debug: Arc<AtomicBool>,
}

impl Output {
    /// Wrap a writer; debug output starts disabled.
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Output {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            debug: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Output recording into memory, with a handle to read it back.
    #[must_use]
    pub fn transcript() -> (Self, Transcript) {
        let transcript = Transcript::new();
        (Output::new(transcript.clone()), transcript)
    }

    /// Output bound to the process's standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Output::new(io::stdout())
    }

    /// Write one line and flush it.
    ///
    /// The lock is held for the whole line so concurrent senders never
    /// interleave. A failed write is logged and otherwise ignored: the peer
    /// may already be gone and the session notices that on its next read.
    pub fn send(&self, line: &str) {
        if let Err(e) = self.write_line(line) {
            warn!("failed to send {line:?}: {e}");
        }
    }

    /// Write one line and flush it, reporting failure to the caller.
    pub(crate) fn write_line(&self, line: &str) -> io::Result<()> {
        let mut writer = self.writer.lock();
        writeln!(writer, "{line}")?;
        writer.flush()
    }

    /// Write one line only if `still_wanted` holds once the stream is locked.
    ///
    /// Paired with [`Output::hold`], this lets a background think drop its
    /// result atomically with respect to the session deciding it is stale.
    /// Returns whether the line was sent.
    pub fn send_if(&self, line: &str, still_wanted: impl FnOnce() -> bool) -> bool {
        let mut writer = self.writer.lock();
        if !still_wanted() {
            return false;
        }
        let written = writeln!(writer, "{line}").and_then(|()| writer.flush());
        drop(writer);
        if let Err(e) = written {
            warn!("failed to send {line:?}: {e}");
        }
        true
    }

    /// Run `f` with the stream locked, so no line is written meanwhile.
    pub fn hold<R>(&self, f: impl FnOnce() -> R) -> R {
        let _writer = self.writer.lock();
        f()
    }

    pub fn tell_user(&self, message: &str) {
        self.send(&format_tell_user(message));
    }

    pub fn tell_user_error(&self, message: &str) {
        self.send(&format_tell_user_error(message));
    }

    pub fn illegal_move(&self) {
        self.send(&format_illegal_move());
    }

    pub fn announce_move(&self, mv: &CoordinateMove) {
        self.send(&format_move(mv));
    }

    /// Announce a move given as raw text (e.g. relayed from the user).
    pub fn announce_move_text(&self, mv: &str) {
        self.send(&format!("move {mv}"));
    }

    pub fn thinking(&self, thinking: &Thinking) {
        self.send(&format_thinking(thinking));
    }

    pub fn resign(&self) {
        self.send("resign");
    }

    pub fn result(&self, result: &GameResult) {
        self.send(&result.to_string());
    }

    /// Unconditional comment line.
    pub fn comment(&self, message: &str) {
        self.send(&format_comment(message));
    }

    /// Debug sink: a comment line, but only while debug output is on.
    pub fn debug(&self, message: &str) {
        if self.debug_enabled() {
            self.comment(message);
        }
    }

    #[must_use]
    pub fn debug_enabled(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    pub fn set_debug(&self, on: bool) {
        self.debug.store(on, Ordering::Relaxed);
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("debug", &self.debug_enabled())
            .finish_non_exhaustive()
    }
}

/// In-memory sink that records everything written through an [`Output`].
#[derive(Clone, Default)]
pub struct Transcript(Arc<Mutex<Vec<u8>>>);

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    /// Complete lines written so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }
}

impl Write for Transcript {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The peer as seen from inside one dispatch.
///
/// Adds the two request/reply exchanges that read from the input stream.
/// These only make sense on the session loop's own thread, which is why a
/// background think gets a plain [`Output`] instead.
pub struct Peer<'a> {
    output: &'a Output,
    input: &'a mut dyn BufRead,
    unhandled: Vec<String>,
}

impl<'a> Peer<'a> {
    pub fn new(output: &'a Output, input: &'a mut dyn BufRead) -> Self {
        Peer {
            output,
            input,
            unhandled: Vec::new(),
        }
    }

    /// Lines read while waiting for an answer that turned out to be commands.
    ///
    /// The session dispatches these before reading any further input.
    pub fn take_unhandled(&mut self) -> Vec<String> {
        std::mem::take(&mut self.unhandled)
    }

    #[must_use]
    pub fn output(&self) -> &Output {
        self.output
    }

    /// Announce features and report whether the peer accepted them.
    pub fn feature(&mut self, features: &str) -> bool {
        self.output.send(&format_features(features));
        match self.read_reply() {
            Some(reply) => reply.contains("accepted"),
            None => false,
        }
    }

    /// Pop up a question dialog and wait for the typed answer.
    ///
    /// A cancelled dialog sends nothing back, so the next line may be an
    /// ordinary command. Anything not tagged as an answer is kept for the
    /// session (see [`Peer::take_unhandled`]) and `None` is returned.
    pub fn ask_user(&mut self, message: &str) -> Option<String> {
        self.output.send(&format_ask_user(message));
        let reply = self.read_reply()?;
        let answer = reply
            .strip_prefix(ASK_USER_TAG)
            .and_then(|rest| rest.strip_prefix(' '));
        match answer {
            Some(answer) => Some(answer.to_string()),
            None => {
                self.output.debug(&format!("no answer, handing back {reply:?}"));
                self.unhandled.push(reply);
                None
            }
        }
    }

    fn read_reply(&mut self) -> Option<String> {
        match read_line(self.input) {
            Ok(Some(line)) => Some(line),
            Ok(None) => {
                self.output.debug("end of input while waiting for a reply");
                None
            }
            Err(e) => {
                self.output.debug(&e.to_string());
                None
            }
        }
    }
}

impl Deref for Peer<'_> {
    type Target = Output;

    fn deref(&self) -> &Output {
        self.output
    }
}

/// Read one line without its terminator; `None` at end of stream.
///
/// Bytes are consumed even when they are not valid UTF-8, so a bad line is
/// reported once and reading can carry on with the next one.
pub(crate) fn read_line(input: &mut dyn BufRead) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    if input.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    String::from_utf8(buf)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
