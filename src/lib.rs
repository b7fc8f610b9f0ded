//! # range-dl
//!
//! Concurrent byte-range download engine for large remote resources.
//!
//! A download runs in five steps:
//! 1. **Probe** the resource for its size and range support (fails fast)
//! 2. **Plan** contiguous byte ranges that tile the whole resource
//! 3. **Fetch** every range in its own task, insisting on partial content of exact length
//! 4. **Assemble** arriving chunks with positional writes from a single writer
//! 5. **Report** which ranges succeeded and which are missing
//!
//! A failed range never stops its siblings. The returned summary lists every missing
//! range so the caller can [`refetch`](RangeDownloader::refetch) just those.
//!
//! ## Quick Start
//!
//! ```no_run
//! use range_dl::{Config, RangeDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         chunk_count: 16,
//!         ..Default::default()
//!     };
//!
//!     let downloader = RangeDownloader::new(config)?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = downloader
//!         .download("https://example.com/large.iso", "large.iso")
//!         .await?;
//!
//!     if !summary.is_complete() {
//!         let missing = summary.missing_ranges();
//!         downloader
//!             .refetch("https://example.com/large.iso", "large.iso", &missing)
//!             .await?;
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Range downloader (probe, plan, fetch, assemble)
pub mod downloader;
/// Error types
pub mod error;
/// Retry logic with exponential backoff
pub mod retry;
/// Destination artifacts written at absolute offsets
pub mod sink;
/// Protocol client abstraction and the HTTP implementation
pub mod transport;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, HttpConfig, RetryConfig};
pub use downloader::RangeDownloader;
pub use downloader::plan::plan_ranges;
pub use error::{Error, ProbeError, RangeError, Result, TransportError};
pub use sink::{ArtifactSink, FileSink, MemorySink};
pub use transport::{HttpTransport, RangeResponse, ResourceHeaders, Transport};
pub use types::{
    ByteRange, ChunkResult, DownloadOutcome, DownloadSummary, Event, ResourceDescriptor,
};
