//! Error types for the protocol session.

use std::fmt;
use std::num::ParseIntError;

/// Error raised when a peer violates the protocol badly enough to end the session.
#[derive(Debug)]
pub enum ProtocolError {
    /// A keyword that requires an argument arrived without one
    MissingArgument { keyword: &'static str },
    /// A numeric argument could not be parsed
    InvalidArgument {
        keyword: &'static str,
        value: String,
        source: ParseIntError,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::MissingArgument { keyword } => {
                write!(f, "Missing argument for '{keyword}'")
            }
            ProtocolError::InvalidArgument {
                keyword,
                value,
                source,
            } => {
                write!(f, "Invalid argument '{value}' for '{keyword}': {source}")
            }
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::InvalidArgument { source, .. } => Some(source),
            ProtocolError::MissingArgument { .. } => None,
        }
    }
}
