//! Core types for range-dl

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// What the capability probe learned about the remote resource
///
/// Produced once per download and never modified afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Total size of the resource in bytes
    pub total_size: u64,
    /// Whether the server accepts byte-range requests
    ///
    /// Only an explicit refusal makes this `false`, and such a descriptor is never
    /// handed to the planner.
    pub supports_range_requests: bool,
    /// Opaque integrity tag reported by the server (the `ETag`), if any
    pub integrity_tag: Option<String>,
}

/// One contiguous, inclusive byte interval of the resource
///
/// The planner only produces ranges with `start <= end`. A range built by hand with its
/// ends swapped reports [`is_empty`](Self::is_empty) and is rejected before any fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ByteRange {
    /// Position in planning order (0-based, contiguous)
    pub index: usize,
    /// First byte offset
    pub start: u64,
    /// Last byte offset (inclusive)
    pub end: u64,
}

impl ByteRange {
    /// Create a range covering `start..=end`
    pub fn new(index: usize, start: u64, end: u64) -> Self {
        let range = Self { index, start, end };
        debug_assert!(!range.is_empty(), "range {index} is inverted: {start} > {end}");
        range
    }

    /// Number of bytes in the range
    ///
    /// Only meaningful for a non-empty range that is not the whole `u64` space; see
    /// [`checked_len`](Self::checked_len).
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Number of bytes in the range, or `None` if it is inverted or too large for `u64`
    pub fn checked_len(&self) -> Option<u64> {
        if self.is_empty() {
            return None;
        }
        (self.end - self.start).checked_add(1)
    }

    /// True when the ends are swapped, so the range covers no bytes
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Value of the HTTP `Range` header requesting exactly this interval
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} [{}, {}]", self.index, self.start, self.end)
    }
}

/// The bytes of one successfully fetched range
///
/// `payload.len() == range.len()` is checked by the fetcher before a result is built.
#[derive(Clone, Debug)]
pub struct ChunkResult {
    /// The range these bytes belong to
    pub range: ByteRange,
    /// Exactly `range.len()` bytes
    pub payload: Bytes,
}

/// Aggregate per-range accounting for one download
///
/// Owned by the completion coordinator and updated as each fetcher terminates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    /// Number of ranges for which a fetcher was launched
    pub attempted: usize,
    /// Number of ranges that produced a chunk
    pub succeeded: usize,
    /// Indices of ranges that never produced a chunk
    pub failed: BTreeSet<usize>,
    /// Message of the first failure, for diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_error: Option<String>,
}

impl DownloadOutcome {
    /// Start accounting for `attempted` launched ranges
    pub fn new(attempted: usize) -> Self {
        Self {
            attempted,
            ..Self::default()
        }
    }

    /// Record a range that produced its chunk
    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    /// Record a range that gave up
    pub fn record_failure(&mut self, index: usize, error: impl std::fmt::Display) {
        if self.first_error.is_none() {
            self.first_error = Some(format!("range {index}: {error}"));
        }
        self.failed.insert(index);
    }

    /// Whether every launched range succeeded
    pub fn is_complete(&self) -> bool {
        self.succeeded == self.attempted && self.failed.is_empty()
    }
}

/// Final, externally observable result of a download
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadSummary {
    /// Resource locator that was fetched
    pub locator: String,
    /// What the probe reported
    pub descriptor: ResourceDescriptor,
    /// The ranges that were attempted, in planning order
    pub ranges: Vec<ByteRange>,
    /// Per-range accounting
    pub outcome: DownloadOutcome,
    /// Bytes written to the destination
    pub bytes_written: u64,
    /// Wall-clock time of the whole operation
    pub elapsed: Duration,
}

impl DownloadSummary {
    /// Whether the destination now holds every byte of the resource
    pub fn is_complete(&self) -> bool {
        self.outcome.is_complete()
    }

    /// Ranges that never produced a chunk, suitable for
    /// [`RangeDownloader::refetch`](crate::RangeDownloader::refetch)
    pub fn missing_ranges(&self) -> Vec<ByteRange> {
        self.ranges
            .iter()
            .filter(|r| self.outcome.failed.contains(&r.index))
            .copied()
            .collect()
    }
}

/// Event emitted during a download
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Probe succeeded
    Probed {
        /// Total size of the resource
        total_size: u64,
        /// Integrity tag, if the server sent one
        #[serde(skip_serializing_if = "Option::is_none")]
        integrity_tag: Option<String>,
    },

    /// Ranges were planned and fetchers are about to start
    Planned {
        /// Number of ranges
        chunks: usize,
    },

    /// A range was fetched and handed to the assembler
    ChunkDownloaded {
        /// Range index
        index: usize,
        /// First byte offset
        start: u64,
        /// Last byte offset (inclusive)
        end: u64,
    },

    /// A range gave up after its retries
    ChunkFailed {
        /// Range index
        index: usize,
        /// Error message
        error: String,
    },

    /// A chunk was written to the destination
    ChunkWritten {
        /// Range index
        index: usize,
        /// Bytes written so far across all chunks
        bytes_written: u64,
        /// Total bytes expected
        total_bytes: u64,
    },

    /// The download finished (completely or not)
    Finished {
        /// Number of ranges that succeeded
        succeeded: usize,
        /// Indices of ranges that failed
        failed: Vec<usize>,
    },
}
