// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-controller logging sinks.
//!
//! Unlike a process-global logger, each [`crate::awg::AwgController`] and
//! [`crate::capture::CaptureController`] owns its own append-only list of
//! sinks: operation-level notices (validation
//! failures, timeouts, hardware faults) are fanned out to every sink the
//! caller registered. Low-level wire diagnostics (retries, fragment counts,
//! lock acquisition) go through the `log` crate facade instead, independent
//! of this list.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::Mutex;

/// Severity of a message passed to a [`Logger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
        }
    }
}

/// A sink controllers can append operation-level notices to.
///
/// Implementations must be thread-safe: a controller may be shared across
/// threads, and every public operation may emit through its logger list.
pub trait Logger: Send + Sync {
    /// Write one message. Errors are swallowed by the caller — a broken
    /// sink must not fail the hardware operation that triggered the log.
    fn log(&self, level: Level, message: &str) -> io::Result<()>;
}

/// Writes to stderr, one line per message.
pub struct ConsoleLogger {
    min_level: Level,
}

impl ConsoleLogger {
    pub fn new(min_level: Level) -> Self {
        Self { min_level }
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, level: Level, message: &str) -> io::Result<()> {
        if level < self.min_level {
            return Ok(());
        }
        eprintln!("[{}] {}", level.as_str(), message);
        Ok(())
    }
}

/// Appends to a file, one line per message. Thread-safe via internal mutex.
pub struct FileLogger {
    file: Mutex<std::fs::File>,
    min_level: Level,
}

impl FileLogger {
    pub fn open(path: impl AsRef<std::path::Path>, min_level: Level) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            min_level,
        })
    }
}

impl Logger for FileLogger {
    fn log(&self, level: Level, message: &str) -> io::Result<()> {
        if level < self.min_level {
            return Ok(());
        }
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("file logger mutex poisoned"))?;
        writeln!(file, "[{}] {}", level.as_str(), message)?;
        file.flush()
    }
}

/// Fan a message out to every sink in `sinks`, ignoring individual failures.
pub(crate) fn emit(sinks: &[std::sync::Arc<dyn Logger>], level: Level, message: &str) {
    for sink in sinks {
        let _ = sink.log(level, message);
    }
}
