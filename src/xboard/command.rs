//! xboard command parsing.
//!
//! A line is either a coordinate move (checked first, over the whole line) or
//! a keyword followed by positional arguments. Each keyword has a fixed
//! argument shape and a fixed policy for what happens when those arguments
//! are malformed; both live in the tables below.

use std::collections::HashMap;
use std::str::FromStr;

use once_cell::sync::Lazy;

use super::notation::{Centiseconds, CoordinateMove, Level, TimeControl};
use crate::error::ProtocolError;

/// Recognized command keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    MoveNow,
    Black,
    Computer,
    Debug,
    Easy,
    Force,
    Go,
    Hard,
    Level,
    New,
    NoPost,
    Otim,
    Perft,
    Post,
    Protover,
    Quit,
    Random,
    Remove,
    Resign,
    Sd,
    SetBoard,
    St,
    Time,
    Undo,
    White,
    XBoard,
}

/// Shape of a keyword's arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    None,
    Int,
    Long,
    /// `on` or anything else
    Flag,
    /// Everything after the keyword, verbatim
    Rest,
    TimeControl,
}

/// What a malformed argument does to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// The command is a protocol violation and ends the session.
    Fatal,
    /// The command is dropped without reaching the engine.
    Drop,
}

impl Keyword {
    pub const ALL: [Keyword; 26] = [
        Keyword::MoveNow,
        Keyword::Black,
        Keyword::Computer,
        Keyword::Debug,
        Keyword::Easy,
        Keyword::Force,
        Keyword::Go,
        Keyword::Hard,
        Keyword::Level,
        Keyword::New,
        Keyword::NoPost,
        Keyword::Otim,
        Keyword::Perft,
        Keyword::Post,
        Keyword::Protover,
        Keyword::Quit,
        Keyword::Random,
        Keyword::Remove,
        Keyword::Resign,
        Keyword::Sd,
        Keyword::SetBoard,
        Keyword::St,
        Keyword::Time,
        Keyword::Undo,
        Keyword::White,
        Keyword::XBoard,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::MoveNow => "?",
            Keyword::Black => "black",
            Keyword::Computer => "computer",
            Keyword::Debug => "debug",
            Keyword::Easy => "easy",
            Keyword::Force => "force",
            Keyword::Go => "go",
            Keyword::Hard => "hard",
            Keyword::Level => "level",
            Keyword::New => "new",
            Keyword::NoPost => "nopost",
            Keyword::Otim => "otim",
            Keyword::Perft => "perft",
            Keyword::Post => "post",
            Keyword::Protover => "protover",
            Keyword::Quit => "quit",
            Keyword::Random => "random",
            Keyword::Remove => "remove",
            Keyword::Resign => "resign",
            Keyword::Sd => "sd",
            Keyword::SetBoard => "setboard",
            Keyword::St => "st",
            Keyword::Time => "time",
            Keyword::Undo => "undo",
            Keyword::White => "white",
            Keyword::XBoard => "xboard",
        }
    }

    #[must_use]
    pub fn args(self) -> ArgKind {
        match self {
            Keyword::Debug => ArgKind::Flag,
            Keyword::Level => ArgKind::TimeControl,
            Keyword::Otim | Keyword::Perft | Keyword::Protover | Keyword::Sd | Keyword::St => {
                ArgKind::Int
            }
            Keyword::Time => ArgKind::Long,
            Keyword::SetBoard => ArgKind::Rest,
            _ => ArgKind::None,
        }
    }

    /// Only `level` is tolerated when malformed; peers are known to send odd ones.
    #[must_use]
    pub fn recovery(self) -> Recovery {
        match self {
            Keyword::Level => Recovery::Drop,
            _ => Recovery::Fatal,
        }
    }

    /// Look up a keyword by its exact, case-sensitive spelling.
    #[must_use]
    pub fn lookup(word: &str) -> Option<Keyword> {
        KEYWORDS.get(word).copied()
    }
}

static KEYWORDS: Lazy<HashMap<&'static str, Keyword>> =
    Lazy::new(|| Keyword::ALL.iter().map(|k| (k.as_str(), *k)).collect());

/// A fully parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Opponent's move in coordinate notation, with its original text
    UserMove { text: String, mv: CoordinateMove },
    /// Interrupt the current think and move now
    MoveNow,
    Black,
    White,
    Computer,
    Debug(bool),
    /// Pondering on (`hard`) or off (`easy`)
    Pondering(bool),
    Force,
    Go,
    Level(TimeControl),
    New,
    /// Thinking output on (`post`) or off (`nopost`)
    ShowThinking(bool),
    OpponentTime(Centiseconds),
    Perft(u32),
    Protover(u32),
    Quit,
    Random,
    Remove,
    Resign,
    SearchDepth(u32),
    SetBoard(String),
    /// Fixed seconds per move
    MoveTime(u32),
    Time(Centiseconds),
    Undo,
    XBoard,
    /// Anything else, with the original line
    Unknown(String),
}

impl Command {
    #[must_use]
    pub fn is_quit(&self) -> bool {
        matches!(self, Command::Quit)
    }
}

/// Positional arguments following a keyword.
struct Args<'a> {
    keyword: Keyword,
    tokens: std::str::SplitWhitespace<'a>,
    rest: &'a str,
}

impl<'a> Args<'a> {
    fn new(keyword: Keyword, rest: &'a str) -> Self {
        Args {
            keyword,
            tokens: rest.split_whitespace(),
            rest,
        }
    }

    fn missing(&self) -> ProtocolError {
        ProtocolError::MissingArgument {
            keyword: self.keyword.as_str(),
        }
    }

    fn token(&mut self) -> Result<&'a str, ProtocolError> {
        self.tokens.next().ok_or_else(|| self.missing())
    }

    fn number<T: FromStr<Err = std::num::ParseIntError>>(&mut self) -> Result<T, ProtocolError> {
        let token = self.token()?;
        token
            .parse()
            .map_err(|source| ProtocolError::InvalidArgument {
                keyword: self.keyword.as_str(),
                value: token.to_string(),
                source,
            })
    }

    /// A 32-bit integer used as a count; negative values clamp to zero.
    fn count(&mut self) -> Result<u32, ProtocolError> {
        Ok(self.number::<i32>()?.max(0).unsigned_abs())
    }

    fn flag(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.token()? == "on")
    }

    fn rest(&self) -> Result<&'a str, ProtocolError> {
        if self.rest.is_empty() {
            Err(self.missing())
        } else {
            Ok(self.rest)
        }
    }
}

/// Parse a single line from the peer.
///
/// Returns `Ok(None)` when the command was malformed but tolerated (see
/// [`Keyword::recovery`]), and an error when it was malformed and not.
pub fn parse_command(line: &str) -> Result<Option<Command>, ProtocolError> {
    if let Some(mv) = CoordinateMove::parse(line) {
        return Ok(Some(Command::UserMove {
            text: line.to_string(),
            mv,
        }));
    }

    let trimmed = line.trim_start();
    let (word, rest) = match trimmed.find(char::is_whitespace) {
        Some(i) => (&trimmed[..i], trimmed[i..].trim_start()),
        None => (trimmed, ""),
    };

    let Some(keyword) = Keyword::lookup(word) else {
        return Ok(Some(Command::Unknown(line.to_string())));
    };

    match parse_arguments(keyword, Args::new(keyword, rest)) {
        Ok(cmd) => Ok(cmd),
        Err(e) => match keyword.recovery() {
            Recovery::Fatal => Err(e),
            Recovery::Drop => Ok(None),
        },
    }
}

fn parse_arguments(keyword: Keyword, mut args: Args<'_>) -> Result<Option<Command>, ProtocolError> {
    let cmd = match keyword {
        Keyword::MoveNow => Command::MoveNow,
        Keyword::Black => Command::Black,
        Keyword::White => Command::White,
        Keyword::Computer => Command::Computer,
        Keyword::Debug => Command::Debug(args.flag()?),
        Keyword::Easy => Command::Pondering(false),
        Keyword::Hard => Command::Pondering(true),
        Keyword::Force => Command::Force,
        Keyword::Go => Command::Go,
        Keyword::Level => match Level::parse(args.rest()?) {
            Some(level) => Command::Level(level.time_control()),
            None => return Ok(None),
        },
        Keyword::New => Command::New,
        Keyword::NoPost => Command::ShowThinking(false),
        Keyword::Post => Command::ShowThinking(true),
        Keyword::Otim => Command::OpponentTime(Centiseconds(i64::from(args.number::<i32>()?))),
        Keyword::Time => Command::Time(Centiseconds(args.number::<i64>()?)),
        Keyword::Perft => Command::Perft(args.count()?),
        Keyword::Protover => Command::Protover(args.count()?),
        Keyword::Sd => Command::SearchDepth(args.count()?),
        Keyword::St => Command::MoveTime(args.count()?),
        Keyword::Quit => Command::Quit,
        Keyword::Random => Command::Random,
        Keyword::Remove => Command::Remove,
        Keyword::Resign => Command::Resign,
        Keyword::SetBoard => Command::SetBoard(args.rest()?.to_string()),
        Keyword::Undo => Command::Undo,
        Keyword::XBoard => Command::XBoard,
    };
    Ok(Some(cmd))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xboard::notation::is_coordinate_move;
    use proptest::prelude::*;
    use std::time::Duration;

    fn parse(line: &str) -> Command {
        parse_command(line).unwrap().unwrap()
    }

    #[test]
    fn test_basic_commands() {
        assert_eq!(parse("new"), Command::New);
        assert_eq!(parse("quit"), Command::Quit);
        assert_eq!(parse("go"), Command::Go);
        assert_eq!(parse("force"), Command::Force);
        assert_eq!(parse("?"), Command::MoveNow);
        assert_eq!(parse("xboard"), Command::XBoard);
        assert_eq!(parse("hard"), Command::Pondering(true));
        assert_eq!(parse("easy"), Command::Pondering(false));
        assert_eq!(parse("post"), Command::ShowThinking(true));
        assert_eq!(parse("nopost"), Command::ShowThinking(false));
    }

    #[test]
    fn test_move_wins_over_tokenizing() {
        match parse("g7g8Q") {
            Command::UserMove { text, mv } => {
                assert_eq!(text, "g7g8Q");
                assert_eq!(mv.to_string(), "g7g8q");
            }
            other => panic!("Expected UserMove, got {other:?}"),
        }
    }

    #[test]
    fn test_move_with_padding_is_not_a_move() {
        assert_eq!(parse("e2e4 "), Command::Unknown("e2e4 ".to_string()));
    }

    #[test]
    fn test_numeric_arguments() {
        assert_eq!(parse("protover 2"), Command::Protover(2));
        assert_eq!(parse("time 6000"), Command::Time(Centiseconds(6000)));
        assert_eq!(parse("otim -150"), Command::OpponentTime(Centiseconds(-150)));
        assert_eq!(parse("sd 12"), Command::SearchDepth(12));
        assert_eq!(parse("st 30"), Command::MoveTime(30));
        assert_eq!(parse("perft 4"), Command::Perft(4));
        assert_eq!(parse("sd 7 extra"), Command::SearchDepth(7));
    }

    #[test]
    fn test_negative_counts_clamp_to_zero() {
        assert_eq!(parse("sd -1"), Command::SearchDepth(0));
        assert_eq!(parse("st -30"), Command::MoveTime(0));
        assert_eq!(parse("perft -2"), Command::Perft(0));
        assert_eq!(parse("protover -5"), Command::Protover(0));
        assert!(matches!(
            parse_command("sd 99999999999"),
            Err(ProtocolError::InvalidArgument { keyword: "sd", .. })
        ));
    }

    #[test]
    fn test_debug_flag() {
        assert_eq!(parse("debug on"), Command::Debug(true));
        assert_eq!(parse("debug off"), Command::Debug(false));
        assert_eq!(parse("debug maybe"), Command::Debug(false));
    }

    #[test]
    fn test_setboard_keeps_rest_of_line() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        assert_eq!(
            parse(&format!("setboard {fen}")),
            Command::SetBoard(fen.to_string())
        );
    }

    #[test]
    fn test_level() {
        assert_eq!(
            parse("level 40 3:30 2"),
            Command::Level(TimeControl::Tournament {
                moves_per_session: 40,
                base: Duration::from_millis(210_000),
            })
        );
        assert_eq!(
            parse("level 0 5 0"),
            Command::Level(TimeControl::Incremental {
                base: Duration::from_millis(300_000),
                increment: Duration::ZERO,
            })
        );
    }

    #[test]
    fn test_malformed_level_is_dropped() {
        for line in ["level", "level x 5 0", "level 40 5", "level 40 5:7 0"] {
            assert!(parse_command(line).unwrap().is_none(), "{line:?}");
        }
    }

    #[test]
    fn test_malformed_required_arguments_are_fatal() {
        for line in [
            "time", "time abc", "otim 1.5", "sd deep", "st", "protover two", "perft x",
            "debug", "setboard", "setboard   ",
        ] {
            assert!(parse_command(line).is_err(), "{line:?} should be fatal");
        }
        assert!(matches!(
            parse_command("otim 99999999999"),
            Err(ProtocolError::InvalidArgument { keyword: "otim", .. })
        ));
        assert!(matches!(
            parse_command("time"),
            Err(ProtocolError::MissingArgument { keyword: "time" })
        ));
    }

    #[test]
    fn test_unknown_keeps_original_line() {
        assert_eq!(parse("hint"), Command::Unknown("hint".to_string()));
        assert_eq!(parse("NEW"), Command::Unknown("NEW".to_string()));
        assert_eq!(
            parse("ping 7  please"),
            Command::Unknown("ping 7  please".to_string())
        );
    }

    #[test]
    fn test_empty_and_blank_lines_are_unknown() {
        assert_eq!(parse(""), Command::Unknown(String::new()));
        assert_eq!(parse("   \t "), Command::Unknown("   \t ".to_string()));
    }

    #[test]
    fn test_keyword_table_round_trips() {
        for keyword in Keyword::ALL {
            assert_eq!(Keyword::lookup(keyword.as_str()), Some(keyword));
        }
    }

    #[test]
    fn test_no_keyword_collides_with_move_grammar() {
        for keyword in Keyword::ALL {
            assert!(!is_coordinate_move(keyword.as_str()), "{keyword:?}");
        }
    }

    #[test]
    fn test_only_level_is_tolerant() {
        for keyword in Keyword::ALL {
            let expected = if keyword == Keyword::Level {
                Recovery::Drop
            } else {
                Recovery::Fatal
            };
            assert_eq!(keyword.recovery(), expected, "{keyword:?}");
        }
    }

    #[test]
    fn test_argument_free_keywords_ignore_trailing_tokens() {
        for keyword in Keyword::ALL {
            if keyword.args() == ArgKind::None {
                let line = format!("{} trailing", keyword.as_str());
                assert!(parse_command(&line).unwrap().is_some(), "{line:?}");
            }
        }
    }

    proptest! {
        /// Parsing has no hidden state: the same line always yields the same result.
        #[test]
        fn prop_classification_is_idempotent(line in "[ -~]{0,24}") {
            let first = parse_command(&line).ok();
            let second = parse_command(&line).ok();
            prop_assert_eq!(first, second);
        }

        /// Lines that are not moves and do not start with a keyword always reach the fallback.
        #[test]
        fn prop_unknown_words_fall_through(word in "[A-Z][a-z]{0,8}", tail in "[ a-z0-9]{0,12}") {
            let line = format!("{word}{tail}");
            prop_assert_eq!(parse_command(&line).unwrap(), Some(Command::Unknown(line.clone())));
        }
    }
}
