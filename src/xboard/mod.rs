//! XBoard/WinBoard protocol implementation.
//!
//! Handles communication with chess GUIs using the `XBoard` protocol
//! (CECP). The session reads one command per line, classifies it and hands it
//! to an [`Engine`]; everything chess-specific happens on the engine side.
//!
//! # Protocol Overview
//!
//! - Moves arrive in coordinate notation: "e2e4", "e7e8q"
//! - Clocks arrive in centiseconds (`time`, `otim`)
//! - Lines starting with `#` are comments the GUI ignores; debug output uses them
//! - Thinking output: `<ply> <score> <time> <nodes> <pv>`

pub mod command;
pub mod logger;
pub mod notation;
pub mod output;

use std::collections::VecDeque;
use std::fmt;
use std::io::BufRead;

use log::debug;

use crate::engine::Engine;
use crate::error::ProtocolError;

use command::{parse_command, Command};
use output::{read_line, Output, Peer};

/// Where a session is in its lifetime.
///
/// Commands are never rejected for arriving early; the state only records
/// what has happened so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing received yet
    Idle,
    /// `protover` received
    Negotiated,
    /// Some other command received
    Active,
    /// A line reading exactly `quit`, end of input or a fatal error
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Negotiated => "negotiated",
            SessionState::Active => "active",
            SessionState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Line that ends the session.
const QUIT_LINE: &str = "quit";

/// `XBoard` protocol session: one peer, one engine.
pub struct Session<E, R> {
    engine: E,
    input: R,
    output: Output,
    state: SessionState,
    /// Lines handed back by an engine that was waiting for an answer
    pending: VecDeque<String>,
}

impl<E: Engine, R: BufRead> Session<E, R> {
    pub fn new(engine: E, input: R, output: Output) -> Self {
        Session {
            engine,
            input,
            output,
            state: SessionState::Idle,
            pending: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    #[must_use]
    pub fn output(&self) -> &Output {
        &self.output
    }

    /// Give back the engine once the session is over.
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Main loop: read, parse and dispatch until `quit` or end of input.
    ///
    /// Any `quit` command reaches the engine, but only a line reading exactly
    /// `quit` ends the loop. Returns an error only for a command whose
    /// required argument is missing or malformed; the session is terminated
    /// in that case.
    pub fn run(&mut self) -> Result<(), ProtocolError> {
        while self.state != SessionState::Terminated {
            let next = match self.pending.pop_front() {
                Some(line) => Ok(Some(line)),
                None => read_line(&mut self.input),
            };
            let line = match next {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("end of input");
                    self.transition(SessionState::Terminated);
                    break;
                }
                Err(e) => {
                    self.output.debug(&format!("read error: {e}"));
                    continue;
                }
            };

            match parse_command(&line) {
                Ok(Some(cmd)) => self.dispatch(cmd),
                Ok(None) => debug!("dropped malformed command {line:?}"),
                Err(e) => {
                    self.output.debug(&e.to_string());
                    self.transition(SessionState::Terminated);
                    return Err(e);
                }
            }
            if line == QUIT_LINE {
                self.transition(SessionState::Terminated);
            }
        }
        Ok(())
    }

    /// Hand one command to the engine.
    ///
    /// Never terminates the session by itself; that is decided by [`Session::run`]
    /// from the raw line.
    pub fn dispatch(&mut self, cmd: Command) {
        self.advance(&cmd);

        let mut peer = Peer::new(&self.output, &mut self.input);
        let engine = &mut self.engine;
        match cmd {
            Command::UserMove { text, mv } => engine.opponent_move(&mut peer, &text, mv),
            Command::MoveNow => engine.move_now(&mut peer),
            Command::Black => engine.black(&mut peer),
            Command::White => engine.white(&mut peer),
            Command::Computer => engine.computer(&mut peer),
            Command::Debug(on) => {
                peer.set_debug(on);
                engine.set_debug(&mut peer, on);
            }
            Command::Pondering(on) => engine.set_pondering(&mut peer, on),
            Command::Force => engine.force(&mut peer),
            Command::Go => engine.go(&mut peer),
            Command::Level(control) => engine.set_time_control(&mut peer, control),
            Command::New => engine.new_game(&mut peer),
            Command::ShowThinking(on) => engine.set_show_thinking(&mut peer, on),
            Command::OpponentTime(time) => engine.set_opponent_time(&mut peer, time),
            Command::Perft(depth) => engine.perft(&mut peer, depth),
            Command::Protover(version) => engine.protover(&mut peer, version),
            Command::Quit => engine.quit(&mut peer),
            Command::Random => engine.random(&mut peer),
            Command::Remove => engine.remove(&mut peer),
            Command::Resign => engine.resign(&mut peer),
            Command::SearchDepth(depth) => engine.set_search_depth(&mut peer, depth),
            Command::SetBoard(fen) => engine.set_board(&mut peer, &fen),
            Command::MoveTime(seconds) => engine.set_move_time(&mut peer, seconds),
            Command::Time(time) => engine.set_time(&mut peer, time),
            Command::Undo => engine.undo(&mut peer),
            Command::XBoard => engine.xboard(&mut peer),
            Command::Unknown(line) => engine.unrecognized(&mut peer, &line),
        }
        self.pending.extend(peer.take_unhandled());
    }

    /// State implied by receiving `cmd`.
    fn advance(&mut self, cmd: &Command) {
        let next = match (self.state, cmd) {
            (SessionState::Idle, Command::Protover(_)) => SessionState::Negotiated,
            (SessionState::Idle | SessionState::Negotiated, _) => SessionState::Active,
            (state, _) => state,
        };
        self.transition(next);
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!("session {} -> {}", self.state, next);
            self.state = next;
        }
    }
}

impl<E: fmt::Debug, R> fmt::Debug for Session<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("engine", &self.engine)
            .field("output", &self.output)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AskUserEngine, NullEngine};
    use crate::xboard::notation::CoordinateMove;
    use std::io::Cursor;

    /// Records the name of every engine call.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Engine for Recorder {
        fn move_now(&mut self, _peer: &mut Peer<'_>) {
            self.calls.push("move_now".to_string());
        }

        fn new_game(&mut self, _peer: &mut Peer<'_>) {
            self.calls.push("new_game".to_string());
        }

        fn set_board(&mut self, _peer: &mut Peer<'_>, fen: &str) {
            self.calls.push(format!("set_board {fen}"));
        }

        fn go(&mut self, _peer: &mut Peer<'_>) {
            self.calls.push("go".to_string());
        }

        fn opponent_move(&mut self, _peer: &mut Peer<'_>, text: &str, _mv: CoordinateMove) {
            self.calls.push(format!("opponent_move {text}"));
        }

        fn quit(&mut self, _peer: &mut Peer<'_>) {
            self.calls.push("quit".to_string());
        }

        fn set_debug(&mut self, peer: &mut Peer<'_>, on: bool) {
            self.calls.push(format!("set_debug {on} {}", peer.debug_enabled()));
        }

        fn unrecognized(&mut self, _peer: &mut Peer<'_>, line: &str) {
            self.calls.push(format!("unrecognized {line:?}"));
        }
    }

    fn session(script: &str) -> (Session<Recorder, Cursor<Vec<u8>>>, output::Transcript) {
        let (output, transcript) = Output::transcript();
        let input = Cursor::new(script.as_bytes().to_vec());
        (Session::new(Recorder::default(), input, output), transcript)
    }

    #[test]
    fn test_quit_stops_reading() {
        let (mut session, _) = session("new\nquit\ngo\n");
        session.run().unwrap();
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(session.engine().calls, ["new_game", "quit"]);
    }

    #[test]
    fn test_end_of_input_terminates_cleanly() {
        let (mut session, _) = session("go");
        session.run().unwrap();
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(session.engine().calls, ["go"]);
    }

    #[test]
    fn test_debug_flag_is_set_before_engine_sees_it() {
        let (mut session, transcript) = session("debug on\nfoo\n");
        session.run().unwrap();
        assert_eq!(session.engine().calls[0], "set_debug true true");
        assert!(session.output().debug_enabled());
        assert!(transcript.text().is_empty());
    }

    #[test]
    fn test_fatal_argument_error_ends_session() {
        let (mut session, transcript) = session("debug on\ntime abc\ngo\n");
        let err = session.run().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidArgument { keyword: "time", .. }));
        assert_eq!(session.state(), SessionState::Terminated);
        assert!(!session.engine().calls.contains(&"go".to_string()));
        assert!(transcript.text().contains("# Invalid argument 'abc' for 'time'"));
    }

    #[test]
    fn test_malformed_level_is_dropped() {
        let (mut session, _) = session("level 40 five 0\ngo\n");
        session.run().unwrap();
        assert_eq!(session.engine().calls, ["go"]);
    }

    #[test]
    fn test_blank_lines_are_unrecognized() {
        let (mut session, _) = session("\n   \n");
        session.run().unwrap();
        assert_eq!(
            session.engine().calls,
            ["unrecognized \"\"", "unrecognized \"   \""]
        );
    }

    #[test]
    fn test_invalid_utf8_is_consumed() {
        let (output, _) = Output::transcript();
        let input = Cursor::new(b"\xff\xfe\ngo\n".to_vec());
        let mut session = Session::new(Recorder::default(), input, output);
        session.run().unwrap();
        assert_eq!(session.engine().calls, ["go"]);
    }

    #[test]
    fn test_state_transitions() {
        let (mut session, _) = session("");
        assert_eq!(session.state(), SessionState::Idle);
        session.dispatch(Command::Protover(2));
        assert_eq!(session.state(), SessionState::Negotiated);
        session.dispatch(Command::New);
        assert_eq!(session.state(), SessionState::Active);
        session.dispatch(Command::Protover(2));
        assert_eq!(session.state(), SessionState::Active);
        session.dispatch(Command::Quit);
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.engine().calls, ["new_game", "quit"]);
    }

    #[test]
    fn test_only_exact_quit_line_terminates() {
        let (mut session, _) = session("quit now\n quit\ngo\nquit\ngo\n");
        session.run().unwrap();
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(session.engine().calls, ["quit", "quit", "go", "quit"]);
    }

    #[test]
    fn test_cancelled_question_does_not_swallow_quit() {
        let (output, transcript) = Output::transcript();
        let input = Cursor::new(b"go\nquit\ngo\n".to_vec());
        let mut session = Session::new(AskUserEngine::new(), input, output);
        session.run().unwrap();

        assert_eq!(session.state(), SessionState::Terminated);
        let asked = transcript
            .lines()
            .iter()
            .filter(|line| line.starts_with("askuser "))
            .count();
        assert_eq!(asked, 1);
        assert!(!transcript.text().contains("move "));
    }

    #[test]
    fn test_handed_back_line_is_dispatched_before_further_input() {
        let (output, transcript) = Output::transcript();
        let input = Cursor::new(b"go\nforce\ne2e4\nquit\n".to_vec());
        let mut session = Session::new(AskUserEngine::new(), input, output);
        session.run().unwrap();

        // `force` was handed back and applied, so the move gets no question.
        assert_eq!(transcript.lines().len(), 1);
        assert_eq!(session.state(), SessionState::Terminated);
    }

    #[test]
    fn test_commands_before_protover_are_forwarded() {
        let (mut session, _) = session("go\nsetboard 8/8/8/8/8/8/8/8 w - - 0 1\n");
        session.run().unwrap();
        assert_eq!(
            session.engine().calls,
            ["go", "set_board 8/8/8/8/8/8/8/8 w - - 0 1"]
        );
    }

    #[test]
    fn test_protover_reads_reply_from_session_input() {
        let (output, transcript) = Output::transcript();
        let input = Cursor::new(b"protover 2\naccepted done\nquit\n".to_vec());
        let mut session = Session::new(NullEngine, input, output);
        session.run().unwrap();

        let lines = transcript.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("feature myname=\"xboard_adapter\""));
        assert_eq!(session.state(), SessionState::Terminated);
    }
}
