// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types shared by every layer of the crate.
//!
//! Follows the taxonomy of the controlled instrument's failure modes:
//! caller mistakes are rejected before any hardware access, transport
//! failures surface the retry-exhausted cause, and polling deadlines
//! report what was being waited for.

use std::fmt;
use std::io;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type returned by accessors and controllers.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Validation errors — raised before any hardware access.
    // ========================================================================
    /// A caller-supplied argument was out of range or otherwise malformed.
    Validation(ValidationError),

    // ========================================================================
    // Transport errors — a UDP round trip failed after the retry budget.
    // ========================================================================
    /// The register/wave-RAM transport could not complete a request.
    Transport(TransportError),

    // ========================================================================
    // Timeout errors — a polling wait did not observe the expected state.
    // ========================================================================
    /// A poll loop (ready/busy/done) did not reach the expected state in time.
    Timeout(TimeoutError),
}

/// A caller-supplied argument was invalid. Raised locally; no packets sent.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Operation the caller attempted (e.g. `"set_wave_sequence"`).
    pub operation: &'static str,
    /// English description naming the offending value and the expected range.
    pub message: String,
}

impl ValidationError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// The underlying cause of a [`TransportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// No reply received within the per-attempt timeout, after all retries.
    Timeout,
    /// A reply was received but did not match the request (bad header,
    /// wrong length, echoed address mismatch).
    Malformed,
    /// The OS refused the send/receive (e.g. connection refused, unreachable).
    Refused,
}

/// A UDP register/wave-RAM round trip failed after exhausting retries.
#[derive(Debug)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    /// (host, port) of the endpoint the request targeted.
    pub endpoint: (String, u16),
    /// Number of attempts made, including the first.
    pub attempts: u32,
    /// Underlying I/O error, if any (absent for `Malformed`).
    pub source: Option<io::Error>,
}

/// A poll loop did not observe the expected hardware state before its deadline.
#[derive(Debug)]
pub struct TimeoutError {
    /// Operation that timed out (e.g. `"wait_for_awgs_to_stop"`).
    pub operation: &'static str,
    /// IDs that had not reached the expected state when the deadline expired.
    pub pending_ids: Vec<u32>,
    pub waited: std::time::Duration,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "{e}"),
            Self::Transport(e) => write!(f, "{e}"),
            Self::Timeout(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.operation, self.message)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (host, port) = &self.endpoint;
        write!(
            f,
            "transport {:?} to {host}:{port} after {} attempt(s)",
            self.kind, self.attempts
        )?;
        if let Some(src) = &self.source {
            write!(f, ": {src}")?;
        }
        Ok(())
    }
}

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} timed out after {:?}, ids still pending: {:?}",
            self.operation, self.waited, self.pending_ids
        )
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => e.source.as_ref().map(|e| e as _),
            _ => None,
        }
    }
}

impl std::error::Error for ValidationError {}
impl std::error::Error for TransportError {}
impl std::error::Error for TimeoutError {}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<TimeoutError> for Error {
    fn from(e: TimeoutError) -> Self {
        Self::Timeout(e)
    }
}

/// Ergonomic `?` at the transport boundary (e.g. opening a UDP socket):
/// no endpoint is known yet at that point, so `attempts` is fixed at 1.
impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Transport(TransportError {
            kind: TransportErrorKind::Refused,
            endpoint: (String::new(), 0),
            attempts: 1,
            source: Some(e),
        })
    }
}

/// Errors surfaced only via `check_err`, never raised spontaneously.
/// Hardware faults may be transient, so they are returned as data rather
/// than propagated as [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwgFault {
    /// Wave-RAM read error while streaming samples out.
    MemRead,
    /// The waveform sequence ran out of samples before the hardware expected.
    SampleShortage,
}

/// Capture-side hardware fault, surfaced only via `check_err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFault {
    /// Captured data overran its output region.
    Overflow,
    /// Wave-RAM write error while storing captured data.
    MemWrite,
}
