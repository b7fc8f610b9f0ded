//! Error types for range-dl
//!
//! Errors are split by how far they travel:
//! - [`Error`] aborts the whole operation (bad configuration, failed probe, broken sink)
//! - [`ProbeError`] is the precondition failure raised before any range is fetched
//! - [`RangeError`] stays local to one range and is only recorded in the outcome
//! - [`TransportError`] is what a [`Transport`](crate::transport::Transport) reports

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for range-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for range-dl
///
/// Every variant is fatal to the operation that returned it. Per-range failures never
/// surface here; they are collected in [`DownloadOutcome`](crate::types::DownloadOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "chunk_count")
        key: Option<String>,
    },

    /// The resource locator could not be parsed
    #[error("invalid locator {locator}: {reason}")]
    InvalidLocator {
        /// The locator as given by the caller
        locator: String,
        /// Why it was rejected
        reason: String,
    },

    /// Capability probe failed; nothing was fetched or written
    #[error("probe failed: {0}")]
    Probe(#[from] ProbeError),

    /// The range plan could not be built from the given inputs
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// Creating or sizing the destination artifact failed
    #[error("failed to prepare destination {path}: {source}")]
    Destination {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A positional write to the destination failed
    #[error("write of {len} bytes at offset {offset} failed: {source}")]
    Write {
        /// Absolute offset of the failed write
        offset: u64,
        /// Number of bytes that were being written
        len: usize,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A background task panicked or was cancelled unexpectedly
    #[error("task failed: {0}")]
    TaskFailed(String),
}

impl Error {
    /// Machine-readable error code, stable across releases
    pub fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidLocator { .. } => "invalid_locator",
            Error::Probe(ProbeError::RangesUnsupported { .. }) => "ranges_unsupported",
            Error::Probe(ProbeError::Transport(_)) => "probe_transport_error",
            Error::Probe(_) => "size_unknown",
            Error::InvalidPlan(_) => "invalid_plan",
            Error::Destination { .. } => "destination_error",
            Error::Write { .. } => "write_error",
            Error::Io(_) => "io_error",
            Error::TaskFailed(_) => "task_failed",
        }
    }
}

/// Precondition failures detected by the capability probe
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The metadata request itself failed
    #[error("metadata request failed: {0}")]
    Transport(#[from] TransportError),

    /// The server did not report a total size
    #[error("server did not report a content length")]
    MissingContentLength,

    /// The reported total size is not a non-negative integer
    #[error("content length {0:?} is not a valid size")]
    InvalidContentLength(String),

    /// The server explicitly refuses byte-range requests
    #[error("server does not support range requests (accept-ranges: {accept_ranges})")]
    RangesUnsupported {
        /// The value of the range-support indicator
        accept_ranges: String,
    },
}

/// Failure of a single range; recorded, never propagated to siblings
#[derive(Debug, Error)]
pub enum RangeError {
    /// The ranged request failed at the transport level
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with something other than partial content
    #[error("expected partial content (206), got status {status}")]
    ContentMismatch {
        /// Status code the server returned
        status: u16,
    },

    /// The partial content covers a different interval than the one requested
    #[error("requested {requested}, server sent content-range {content_range:?}")]
    RangeMismatch {
        /// The requested interval (`start-end`)
        requested: String,
        /// The `Content-Range` value received, empty if absent
        content_range: String,
    },

    /// The payload length does not match the requested interval
    ///
    /// For an overlong body `actual` counts only what was read before giving up.
    #[error("expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Length of the requested interval
        expected: u64,
        /// Length of the received payload
        actual: u64,
    },
}

/// Transport-level failures, independent of the HTTP client in use
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request timed out
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request could not be sent or was rejected
    #[error("request failed: {0}")]
    Request(String),

    /// Reading the response body failed
    #[error("failed to read response body: {0}")]
    Body(String),
}
