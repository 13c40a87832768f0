pub mod config;
pub mod engine;
pub mod error;
pub mod sync;
pub mod xboard;

pub use config::Config;
pub use engine::{AskUserEngine, Engine, NullEngine, Searcher, ThreadedEngine};
pub use error::ProtocolError;
pub use xboard::output::{Output, Peer};
pub use xboard::{Session, SessionState};
