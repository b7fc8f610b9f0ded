//! Fan-out of range fetchers and completion tracking.
//!
//! Every planned range gets its own task. Successful fetchers push their chunk into a
//! bounded channel; failed ones push nothing and are only recorded in the
//! [`DownloadOutcome`]. The coordinator task joins every fetcher and then drops the last
//! sender, which closes the channel and tells the assembler no more chunks will arrive.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{Semaphore, broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};

use crate::config::Config;
use crate::transport::Transport;
use crate::types::{ByteRange, ChunkResult, DownloadOutcome, Event};

use super::fetch::fetch_range_with_retry;

/// Everything a fetcher needs, shared by all fetchers of one transfer.
#[derive(Clone)]
pub(crate) struct FetchContext {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) config: Arc<Config>,
    pub(crate) locator: Arc<str>,
    pub(crate) event_tx: broadcast::Sender<Event>,
}

/// How one fetcher ended
type FetcherExit = (usize, Result<(), String>);

/// Launch one fetcher per range and a coordinator that joins them all.
///
/// Returns the receiving end of the result channel and a handle resolving to the
/// outcome once every fetcher has terminated. The channel holds at least one slot per
/// range, so fetchers never wait on a slow assembler.
///
/// Aborting the returned handle aborts every fetcher still running.
pub(crate) fn spawn_fetchers(
    ctx: FetchContext,
    ranges: Vec<ByteRange>,
) -> (mpsc::Receiver<ChunkResult>, JoinHandle<DownloadOutcome>) {
    let (result_tx, result_rx) = mpsc::channel(ranges.len().max(1));
    let coordinator = tokio::spawn(coordinate(ctx, ranges, result_tx));
    (result_rx, coordinator)
}

async fn coordinate(
    ctx: FetchContext,
    ranges: Vec<ByteRange>,
    result_tx: mpsc::Sender<ChunkResult>,
) -> DownloadOutcome {
    let mut outcome = DownloadOutcome::new(ranges.len());
    let mut pending: BTreeSet<usize> = BTreeSet::new();
    let limiter = ctx
        .config
        .max_in_flight
        .map(|limit| Arc::new(Semaphore::new(limit)));

    let mut fetchers: JoinSet<FetcherExit> = JoinSet::new();

    for range in ranges {
        // Bounded mode: wait for a free slot before launching the next fetcher
        let permit = match &limiter {
            Some(semaphore) => match semaphore.clone().acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(e) => {
                    outcome.record_failure(range.index, e);
                    continue;
                }
            },
            None => None,
        };

        pending.insert(range.index);
        let ctx = ctx.clone();
        let result_tx = result_tx.clone();

        fetchers.spawn(async move {
            let fetched = fetch_range_with_retry(
                ctx.transport.as_ref(),
                &ctx.locator,
                range,
                &ctx.config.retry,
            )
            .await;
            drop(permit);

            let chunk = match fetched {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!(
                        index = range.index,
                        start = range.start,
                        end = range.end,
                        error = %e,
                        "Range failed"
                    );
                    ctx.event_tx
                        .send(Event::ChunkFailed {
                            index: range.index,
                            error: e.to_string(),
                        })
                        .ok();
                    return (range.index, Err(e.to_string()));
                }
            };

            tracing::debug!(
                index = range.index,
                start = range.start,
                end = range.end,
                "Range downloaded"
            );
            ctx.event_tx
                .send(Event::ChunkDownloaded {
                    index: range.index,
                    start: range.start,
                    end: range.end,
                })
                .ok();

            // Only fails once the assembler has given up
            if result_tx.send(chunk).await.is_err() {
                return (
                    range.index,
                    Err("assembler stopped before the chunk was delivered".to_string()),
                );
            }
            (range.index, Ok(()))
        });
    }

    while let Some(joined) = fetchers.join_next().await {
        match joined {
            Ok((index, Ok(()))) => {
                pending.remove(&index);
                outcome.record_success();
            }
            Ok((index, Err(message))) => {
                pending.remove(&index);
                outcome.record_failure(index, message);
            }
            Err(e) => {
                tracing::error!(error = %e, "Fetcher task failed");
            }
        }
    }

    // Fetchers that panicked never reported their index
    for index in pending {
        ctx.event_tx
            .send(Event::ChunkFailed {
                index,
                error: "fetcher task panicked".to_string(),
            })
            .ok();
        outcome.record_failure(index, "fetcher task panicked");
    }

    // Last sender: dropping it closes the channel
    drop(result_tx);

    tracing::debug!(
        attempted = outcome.attempted,
        succeeded = outcome.succeeded,
        failed = outcome.failed.len(),
        "All fetchers finished"
    );

    outcome
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::plan::plan_ranges;
    use crate::downloader::test_helpers::{
        MockTransport, RangeBehavior, TEST_LOCATOR, test_config, test_payload,
    };
    use crate::error::TransportError;
    use std::time::Duration;

    fn context(transport: Arc<MockTransport>, config: Config) -> FetchContext {
        let (event_tx, _rx) = broadcast::channel(1000);
        FetchContext {
            transport,
            config: Arc::new(config),
            locator: Arc::from(TEST_LOCATOR),
            event_tx,
        }
    }

    async fn drain(mut rx: mpsc::Receiver<ChunkResult>) -> Vec<ChunkResult> {
        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(chunk);
        }
        chunks
    }

    #[tokio::test]
    async fn all_successes_are_delivered_then_channel_closes() {
        let transport = Arc::new(MockTransport::new(test_payload(1000)));
        let ranges = plan_ranges(1000, 4).unwrap();

        let (rx, coordinator) =
            spawn_fetchers(context(transport.clone(), test_config(4)), ranges);
        let chunks = drain(rx).await;
        let outcome = coordinator.await.unwrap();

        let delivered: BTreeSet<usize> = chunks.iter().map(|c| c.range.index).collect();
        assert_eq!(delivered, BTreeSet::from([0, 1, 2, 3]));
        assert_eq!(outcome.attempted, 4);
        assert_eq!(outcome.succeeded, 4);
        assert!(outcome.failed.is_empty());
        assert_eq!(transport.fetch_count(), 4);
    }

    #[tokio::test]
    async fn failures_travel_on_the_side_path() {
        let transport = Arc::new(MockTransport::new(test_payload(100)).with_behavior(
            7,
            RangeBehavior::Fail(TransportError::Connect("refused".into())),
        ));
        let ranges = plan_ranges(100, 10).unwrap();

        let (rx, coordinator) = spawn_fetchers(context(transport, test_config(10)), ranges);
        let chunks = drain(rx).await;
        let outcome = coordinator.await.unwrap();

        assert_eq!(chunks.len(), 9);
        assert!(chunks.iter().all(|c| c.range.index != 7));
        assert_eq!(outcome.attempted, 10);
        assert_eq!(outcome.succeeded, 9);
        assert_eq!(outcome.failed, BTreeSet::from([7]));
        assert!(outcome.first_error.unwrap().starts_with("range 7:"));
    }

    #[tokio::test]
    async fn fetchers_complete_without_a_consumer() {
        // Capacity covers every range, so nobody blocks even if no one reads yet
        let transport = Arc::new(MockTransport::new(test_payload(500)));
        let ranges = plan_ranges(500, 50).unwrap();

        let (rx, coordinator) = spawn_fetchers(context(transport, test_config(50)), ranges);
        let outcome = tokio::time::timeout(Duration::from_secs(5), coordinator)
            .await
            .expect("coordinator blocked on a full channel")
            .unwrap();

        assert_eq!(outcome.succeeded, 50);
        assert_eq!(drain(rx).await.len(), 50);
    }

    #[tokio::test]
    async fn in_flight_fetches_respect_the_limit() {
        let transport =
            Arc::new(MockTransport::new(test_payload(200)).with_delay(Duration::from_millis(20)));
        let config = Config {
            max_in_flight: Some(3),
            ..test_config(20)
        };
        let ranges = plan_ranges(200, 20).unwrap();

        let (rx, coordinator) = spawn_fetchers(context(transport.clone(), config), ranges);
        let chunks = drain(rx).await;
        let outcome = coordinator.await.unwrap();

        assert_eq!(chunks.len(), 20);
        assert!(outcome.is_complete());
        assert!(transport.peak_in_flight() <= 3, "peak {}", transport.peak_in_flight());
        assert!(transport.peak_in_flight() >= 1);
    }

    #[tokio::test]
    async fn unbounded_mode_launches_everything_together() {
        let transport =
            Arc::new(MockTransport::new(test_payload(100)).with_delay(Duration::from_millis(50)));
        let ranges = plan_ranges(100, 10).unwrap();

        let (rx, coordinator) = spawn_fetchers(context(transport.clone(), test_config(10)), ranges);
        drain(rx).await;
        coordinator.await.unwrap();

        assert_eq!(transport.peak_in_flight(), 10);
    }

    #[tokio::test]
    async fn no_ranges_closes_immediately() {
        let transport = Arc::new(MockTransport::new(Vec::new()));

        let (rx, coordinator) = spawn_fetchers(context(transport, test_config(4)), Vec::new());

        assert!(drain(rx).await.is_empty());
        assert!(coordinator.await.unwrap().is_complete());
    }

    #[tokio::test]
    async fn dropped_receiver_marks_chunks_undelivered() {
        let transport =
            Arc::new(MockTransport::new(test_payload(40)).with_delay(Duration::from_millis(20)));
        let ranges = plan_ranges(40, 4).unwrap();

        let (rx, coordinator) = spawn_fetchers(context(transport, test_config(4)), ranges);
        drop(rx);
        let outcome = coordinator.await.unwrap();

        assert_eq!(outcome.succeeded, 0);
        assert_eq!(outcome.failed, BTreeSet::from([0, 1, 2, 3]));
    }
}
