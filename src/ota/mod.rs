//! Fail-safe firmware update over HTTP.
//!
//! Flow: first chunk → locate payload → open inactive partition →
//! N × write → finalize → set boot partition → report to monitor.
//!
//! Any failure aborts the session and leaves the boot pointer on the
//! running image.

pub mod boundary;
pub mod pipeline;

use core::fmt;

use crate::error::StorageError;

pub use pipeline::{Committed, RECV_BUF_SIZE, UpdatePipeline, UpdateSession};

// ── Error type ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaError {
    /// `Content-Length` was zero.
    EmptyUpload,
    /// `Content-Length` exceeds the partition ceiling.
    TooLarge,
    /// The first chunk had no end-of-headers marker.
    MissingBoundary,
    /// The socket reported an error other than a timeout.
    StreamRead(i32),
    /// Too many consecutive receive timeouts.
    TimedOut,
    /// The peer closed the connection before `expected` bytes arrived.
    Incomplete { received: usize, expected: usize },
    Open(StorageError),
    Write(StorageError),
    Finalize(StorageError),
    Activate(StorageError),
}

impl OtaError {
    /// Transport-level failures; the HTTP handler answers these with 500.
    pub fn is_stream_failure(&self) -> bool {
        matches!(self, Self::StreamRead(_) | Self::TimedOut)
    }
}

impl fmt::Display for OtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUpload => write!(f, "empty upload"),
            Self::TooLarge => write!(f, "image larger than app partition"),
            Self::MissingBoundary => write!(f, "no end-of-headers in first chunk"),
            Self::StreamRead(code) => write!(f, "stream read failed ({code})"),
            Self::TimedOut => write!(f, "too many receive timeouts"),
            Self::Incomplete { received, expected } => {
                write!(f, "connection closed after {received} of {expected} bytes")
            }
            Self::Open(e) => write!(f, "open: {e}"),
            Self::Write(e) => write!(f, "write: {e}"),
            Self::Finalize(e) => write!(f, "finalize: {e}"),
            Self::Activate(e) => write!(f, "activate: {e}"),
        }
    }
}
