//! Command-line configuration for the adapter binary.

use log::warn;

/// Settings taken from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Start with the debug sink enabled
    pub debug: bool,
    /// Arguments that were not understood
    pub ignored: Vec<String>,
}

impl Config {
    /// Build from arguments, excluding the program name.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = Config::default();
        for arg in args {
            let arg = arg.into();
            match arg.as_str() {
                "-debug" | "--debug" => config.debug = true,
                _ => config.ignored.push(arg),
            }
        }
        config
    }

    /// Log the arguments that were skipped.
    pub fn report_ignored(&self) {
        for arg in &self.ignored {
            warn!("ignoring argument {arg:?}");
        }
    }
}
