//! Concurrent byte-range downloader split into focused submodules.
//!
//! The pipeline runs leaves first:
//! - [`probe`] - Capability probing (size, range support, integrity tag)
//! - [`plan`] - Range planning (contiguous tiling, last range absorbs the remainder)
//! - [`fetch`] - Fetching and validating one range
//! - [`coordinator`] - Fan-out of fetchers and channel closure once all are done
//! - [`assemble`] - Single-writer positional assembly
//! - [`orchestration`] - Lifecycle of one download

mod assemble;
mod coordinator;
pub mod fetch;
mod orchestration;
pub mod plan;
pub mod probe;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::sink::ArtifactSink;
use crate::transport::{HttpTransport, Transport};
use crate::types::{ByteRange, DownloadOutcome, DownloadSummary, Event};

use orchestration::Destination;

/// Main downloader instance (cloneable, all clones share the transport and event bus)
///
/// One instance can run any number of downloads; each call to [`download`] probes,
/// plans, fetches and assembles one resource.
///
/// [`download`]: RangeDownloader::download
#[derive(Clone)]
pub struct RangeDownloader {
    /// Protocol client shared by every range of every download
    pub(crate) transport: Arc<dyn Transport>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl RangeDownloader {
    /// Create a downloader using the HTTP transport described by `config.http`
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config.http)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a downloader on top of any [`Transport`]
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        // Lagging subscribers lose the oldest events, downloads never wait on them
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        Ok(Self {
            transport,
            config: Arc::new(config),
            event_tx,
        })
    }

    /// Subscribe to download events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Current configuration
    pub fn config(&self) -> Arc<Config> {
        self.config.clone()
    }

    /// Download `locator` into a file at `destination`.
    ///
    /// The file is created (or truncated) only after the probe and the plan succeeded,
    /// so a precondition failure leaves the filesystem untouched.
    ///
    /// Per-range failures do not make this return `Err`: they are listed in
    /// [`DownloadSummary::outcome`], and the artifact is incomplete exactly when
    /// [`DownloadSummary::is_complete`] is false.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidLocator`](crate::Error::InvalidLocator) if `locator` is not a URL
    /// - [`Error::Probe`](crate::Error::Probe) if the size is unknown or ranges are refused
    /// - [`Error::Destination`](crate::Error::Destination) if the file cannot be created
    /// - [`Error::Write`](crate::Error::Write) on the first failed write
    pub async fn download(
        &self,
        locator: &str,
        destination: impl AsRef<Path>,
    ) -> Result<DownloadSummary> {
        self.run_download(locator, Destination::File(destination.as_ref()))
            .await
    }

    /// Download `locator` into a caller-provided sink.
    ///
    /// Same semantics as [`download`](Self::download), except the sink is never sized
    /// or truncated.
    pub async fn download_into(
        &self,
        locator: &str,
        sink: Arc<dyn ArtifactSink>,
    ) -> Result<DownloadSummary> {
        self.run_download(locator, Destination::Sink(sink)).await
    }

    /// Fetch only `ranges` again and write them into the existing file at `destination`.
    ///
    /// Meant for the ranges of [`DownloadSummary::missing_ranges`] after an incomplete
    /// download. The resource is not probed again and the file is not truncated, so
    /// bytes written earlier stay in place.
    pub async fn refetch(
        &self,
        locator: &str,
        destination: impl AsRef<Path>,
        ranges: &[ByteRange],
    ) -> Result<DownloadOutcome> {
        self.run_refetch(locator, destination.as_ref(), ranges).await
    }
}
