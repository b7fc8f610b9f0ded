//! Download orchestration: probe, plan, fan out, assemble, report.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::sink::{ArtifactSink, FileSink};
use crate::types::{ByteRange, DownloadOutcome, DownloadSummary, Event};

use super::RangeDownloader;
use super::assemble::assemble;
use super::coordinator::{FetchContext, spawn_fetchers};
use super::plan::plan_ranges;
use super::probe::probe_resource;

/// Where the assembled bytes go, decided only once the probe and plan succeeded.
pub(super) enum Destination<'a> {
    /// Create (or truncate) a file at this path
    File(&'a Path),
    /// Write into a caller-provided sink
    Sink(Arc<dyn ArtifactSink>),
}

impl Destination<'_> {
    fn open(self, total_size: u64, preallocate: bool) -> Result<Arc<dyn ArtifactSink>> {
        match self {
            Destination::File(path) => {
                let size = preallocate.then_some(total_size);
                let sink = FileSink::create(path, size).map_err(|source| Error::Destination {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(Arc::new(sink))
            }
            Destination::Sink(sink) => Ok(sink),
        }
    }
}

impl RangeDownloader {
    /// Full lifecycle of a single download.
    ///
    /// Phases:
    /// 1. Probe the resource (fatal on failure, nothing is created)
    /// 2. Plan the ranges
    /// 3. Open the destination
    /// 4. Fetch every range concurrently while the assembler writes them
    /// 5. Report the outcome
    pub(super) async fn run_download(
        &self,
        locator: &str,
        destination: Destination<'_>,
    ) -> Result<DownloadSummary> {
        let started = Instant::now();
        validate_locator(locator)?;

        // Phase 1: probe
        let descriptor = match probe_resource(self.transport.as_ref(), locator).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::error!(locator, error = %e, "Probe failed");
                return Err(e.into());
            }
        };
        self.event_tx
            .send(Event::Probed {
                total_size: descriptor.total_size,
                integrity_tag: descriptor.integrity_tag.clone(),
            })
            .ok();

        // Phase 2: plan
        let ranges = plan_ranges(descriptor.total_size, self.config.chunk_count)?;
        if ranges.len() < self.config.chunk_count {
            tracing::debug!(
                requested = self.config.chunk_count,
                planned = ranges.len(),
                total_size = descriptor.total_size,
                "Chunk count clamped to resource size"
            );
        }
        self.event_tx
            .send(Event::Planned {
                chunks: ranges.len(),
            })
            .ok();

        // Phase 3: destination
        let sink = destination.open(descriptor.total_size, self.config.preallocate)?;

        tracing::info!(
            locator,
            total_size = descriptor.total_size,
            chunks = ranges.len(),
            max_in_flight = self.config.max_in_flight,
            "Starting download"
        );

        // Phase 4: fetch and assemble
        let (outcome, bytes_written) = self
            .transfer(locator, &ranges, sink, descriptor.total_size)
            .await?;

        // Phase 5: report
        let summary = DownloadSummary {
            locator: locator.to_string(),
            descriptor,
            ranges,
            outcome,
            bytes_written,
            elapsed: started.elapsed(),
        };
        self.report(&summary.outcome, locator, summary.elapsed);

        Ok(summary)
    }

    /// Fetch and write only `ranges` into an existing artifact.
    pub(super) async fn run_refetch(
        &self,
        locator: &str,
        destination: &Path,
        ranges: &[ByteRange],
    ) -> Result<DownloadOutcome> {
        let started = Instant::now();
        validate_locator(locator)?;

        let total_bytes = refetch_total(ranges)?;

        let sink = FileSink::open_existing(destination).map_err(|source| Error::Destination {
            path: destination.to_path_buf(),
            source,
        })?;

        tracing::info!(
            locator,
            destination = %destination.display(),
            chunks = ranges.len(),
            "Re-fetching ranges"
        );

        let (outcome, _) = self
            .transfer(locator, ranges, Arc::new(sink), total_bytes)
            .await?;
        self.report(&outcome, locator, started.elapsed());

        Ok(outcome)
    }

    /// Run the fetchers and the assembler side by side until both are done.
    ///
    /// A write failure aborts the coordinator, which takes every in-flight fetcher
    /// down with it.
    async fn transfer(
        &self,
        locator: &str,
        ranges: &[ByteRange],
        sink: Arc<dyn ArtifactSink>,
        total_bytes: u64,
    ) -> Result<(DownloadOutcome, u64)> {
        let ctx = FetchContext {
            transport: self.transport.clone(),
            config: self.config.clone(),
            locator: Arc::from(locator),
            event_tx: self.event_tx.clone(),
        };
        let (results, coordinator) = spawn_fetchers(ctx, ranges.to_vec());

        let report = match assemble(results, sink, total_bytes, &self.event_tx).await {
            Ok(report) => report,
            Err(e) => {
                coordinator.abort();
                return Err(e);
            }
        };

        let outcome = coordinator
            .await
            .map_err(|e| Error::TaskFailed(format!("completion coordinator failed: {e}")))?;

        debug_assert_eq!(report.chunks_written, outcome.succeeded);
        Ok((outcome, report.bytes_written))
    }

    fn report(&self, outcome: &DownloadOutcome, locator: &str, elapsed: Duration) {
        if outcome.is_complete() {
            tracing::info!(
                locator,
                chunks = outcome.succeeded,
                elapsed_ms = elapsed.as_millis() as u64,
                "Download complete"
            );
        } else {
            tracing::warn!(
                locator,
                succeeded = outcome.succeeded,
                attempted = outcome.attempted,
                failed = ?outcome.failed,
                first_error = outcome.first_error.as_deref(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Download incomplete"
            );
        }

        self.event_tx
            .send(Event::Finished {
                succeeded: outcome.succeeded,
                failed: outcome.failed.iter().copied().collect(),
            })
            .ok();
    }
}

/// Reject locators that are not absolute URLs before touching the network.
fn validate_locator(locator: &str) -> Result<()> {
    url::Url::parse(locator)
        .map(|_| ())
        .map_err(|e| Error::InvalidLocator {
            locator: locator.to_string(),
            reason: e.to_string(),
        })
}


/// Total bytes covered by caller-supplied ranges.
///
/// Inverted ranges and sizes that do not fit in a `u64` are an invalid plan.
fn refetch_total(ranges: &[ByteRange]) -> Result<u64> {
    ranges.iter().try_fold(0u64, |total, range| {
        if range.is_empty() {
            return Err(Error::InvalidPlan(format!(
                "range {} starts after it ends ({} > {})",
                range.index, range.start, range.end
            )));
        }
        range
            .checked_len()
            .and_then(|len| total.checked_add(len))
            .ok_or_else(|| {
                Error::InvalidPlan(format!(
                    "range {} ({}-{}) is larger than a u64 byte count",
                    range.index, range.start, range.end
                ))
            })
    })
}
