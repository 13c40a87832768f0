//! Coordinate-move and time-control notation.
//!
//! Both parsers are pure and never validate chess semantics: a move that
//! parses here may still be illegal, and the engine decides that.

use std::fmt;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Two squares and an optional promotion letter, matched over the whole token.
static COORDINATE_MOVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-h][1-8])([a-h][1-8])([qrnbQRNB])?$").expect("coordinate move pattern")
});

/// `MPS MINUTES[:SS] INC`, single-space separated.
static TIME_CONTROL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+) (\d+)(?::(\d{2}))? (\d+)$").expect("time control pattern")
});

/// A board square in coordinate notation.
///
/// Serialized as its name, e.g. `"e4"`, so a deserialized square is always on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    /// Build a square from zero-based file (a = 0) and rank (1 = 0).
    #[must_use]
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        (file < 8 && rank < 8).then_some(Square { file, rank })
    }

    /// Parse two characters such as "e4".
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.as_bytes() {
            [f @ b'a'..=b'h', r @ b'1'..=b'8'] => Square::new(f - b'a', r - b'1'),
            _ => None,
        }
    }

    #[must_use]
    pub fn file(self) -> u8 {
        self.file
    }

    #[must_use]
    pub fn rank(self) -> u8 {
        self.rank
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            char::from(b'a' + self.file),
            char::from(b'1' + self.rank)
        )
    }
}

/// Text that does not name a square.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSquare(pub String);

impl fmt::Display for InvalidSquare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a square", self.0)
    }
}

impl std::error::Error for InvalidSquare {}

impl TryFrom<String> for Square {
    type Error = InvalidSquare;

    fn try_from(name: String) -> Result<Self, InvalidSquare> {
        Square::parse(&name).ok_or(InvalidSquare(name))
    }
}

impl From<Square> for String {
    fn from(square: Square) -> String {
        square.to_string()
    }
}

/// Piece a pawn promotes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Promotion {
    Queen,
    Rook,
    Knight,
    Bishop,
}

impl Promotion {
    /// Parse a promotion letter, in either case.
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'q' => Some(Promotion::Queen),
            'r' => Some(Promotion::Rook),
            'n' => Some(Promotion::Knight),
            'b' => Some(Promotion::Bishop),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_char(self) -> char {
        match self {
            Promotion::Queen => 'q',
            Promotion::Rook => 'r',
            Promotion::Knight => 'n',
            Promotion::Bishop => 'b',
        }
    }
}

/// A move in coordinate notation, e.g. `e2e4` or `g7g8q`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoordinateMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Promotion>,
}

impl CoordinateMove {
    /// Parse a whole token as a coordinate move.
    ///
    /// Returns `None` for anything that is not exactly two squares plus an
    /// optional promotion letter; surrounding whitespace is not tolerated.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let caps = COORDINATE_MOVE.captures(s)?;
        let from = Square::parse(caps.get(1)?.as_str())?;
        let to = Square::parse(caps.get(2)?.as_str())?;
        let promotion = match caps.get(3) {
            Some(m) => Some(Promotion::from_char(m.as_str().chars().next()?)?),
            None => None,
        };
        Some(CoordinateMove {
            from,
            to,
            promotion,
        })
    }
}

impl fmt::Display for CoordinateMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promotion) = self.promotion {
            write!(f, "{}", promotion.to_char())?;
        }
        Ok(())
    }
}

/// True if `s` is a coordinate move in its entirety.
#[must_use]
pub fn is_coordinate_move(s: &str) -> bool {
    COORDINATE_MOVE.is_match(s)
}

/// A clock reading as sent by `time` and `otim`.
///
/// Kept signed: a peer may report a clock that has already run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Centiseconds(pub i64);

impl Centiseconds {
    #[must_use]
    pub fn as_millis(self) -> i64 {
        self.0.saturating_mul(10)
    }

    /// The reading as a duration, clamped at zero.
    #[must_use]
    pub fn as_duration(self) -> Duration {
        Duration::from_millis(u64::try_from(self.as_millis()).unwrap_or(0))
    }
}

/// Time control selected by the `level` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TimeControl {
    /// A fixed number of moves must be made within `base`; the clock then resets.
    Tournament { moves_per_session: u32, base: Duration },
    /// The whole game is played within `base`, plus `increment` after every move.
    Incremental { base: Duration, increment: Duration },
}

impl TimeControl {
    /// Base time of the control.
    #[must_use]
    pub fn base(&self) -> Duration {
        match *self {
            TimeControl::Tournament { base, .. } | TimeControl::Incremental { base, .. } => base,
        }
    }
}

/// The three numbers of a `level` command, normalized to milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub moves_per_session: u32,
    pub base_ms: u64,
    pub increment_ms: u64,
}

impl Level {
    /// Parse the arguments of `level`, e.g. `40 3:30 2` or `0 5 0`.
    ///
    /// Any deviation from the expected shape, or a number too large to
    /// represent, yields `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let caps = TIME_CONTROL.captures(s)?;
        let moves_per_session: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minutes: u64 = caps.get(2)?.as_str().parse().ok()?;
        let mut base_ms = minutes.checked_mul(60_000)?;
        if let Some(seconds) = caps.get(3) {
            let seconds: u64 = seconds.as_str().parse().ok()?;
            base_ms = base_ms.checked_add(seconds * 1000)?;
        }
        let increment: u64 = caps.get(4)?.as_str().parse().ok()?;
        let increment_ms = increment.checked_mul(1000)?;
        Some(Level {
            moves_per_session,
            base_ms,
            increment_ms,
        })
    }

    /// Classify as tournament or incremental; zero moves per session is always incremental.
    #[must_use]
    pub fn time_control(&self) -> TimeControl {
        let base = Duration::from_millis(self.base_ms);
        if self.moves_per_session > 0 {
            TimeControl::Tournament {
                moves_per_session: self.moves_per_session,
                base,
            }
        } else {
            TimeControl::Incremental {
                base,
                increment: Duration::from_millis(self.increment_ms),
            }
        }
    }
}
