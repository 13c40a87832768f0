//! Bridge from the `log` facade into the protocol's debug sink.
//!
//! Records become `# LEVEL: message` comment lines, which the peer ignores,
//! and only while the session has debug output switched on.

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use super::output::{format_comment, Output};

pub struct DebugSinkLogger {
    output: Output,
}

impl DebugSinkLogger {
    #[must_use]
    pub fn new(output: Output) -> Self {
        DebugSinkLogger { output }
    }
}

impl Log for DebugSinkLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        self.output.debug_enabled()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = format_comment(&format!("{}: {}", record.level(), record.args()));
            // Never log a failure to log; the stream is the thing that failed.
            let _ = self.output.write_line(&line);
        }
    }

    fn flush(&self) {}
}

/// Install the bridge as the global logger.
///
/// Only the binary should call this; a library user keeps their own logger.
pub fn init(output: Output) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(DebugSinkLogger::new(output)))?;
    log::set_max_level(LevelFilter::Debug);
    Ok(())
}
