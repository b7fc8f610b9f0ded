//! Shared test helpers: an in-memory transport serving a fixed byte buffer.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;

use crate::config::{Config, RetryConfig};
use crate::error::TransportError;
use crate::transport::{RangeResponse, ResourceHeaders, Transport};
use crate::types::ByteRange;

/// How the mock answers a ranged read for one range index.
#[derive(Clone, Debug)]
pub(crate) enum RangeBehavior {
    /// Always fail with this transport error
    Fail(TransportError),
    /// Answer with this status and the full resource body (server ignored the range)
    Status(u16),
    /// Answer 206 but drop the last byte of the slice
    Short,
    /// Answer 206 with one byte past the end of the slice
    Long,
    /// Answer 206 with the right length taken from offset 0, labelled as such
    Shifted,
    /// Answer 206 with the right slice but no `Content-Range`
    NoContentRange,
    /// Fail with a timeout this many times, then serve the range
    FlakyTimes(u32),
}

/// In-memory [`Transport`] serving `data`, with per-range failure injection.
pub(crate) struct MockTransport {
    data: Bytes,
    probe_response: Result<ResourceHeaders, TransportError>,
    behaviors: HashMap<usize, RangeBehavior>,
    attempts: Mutex<HashMap<usize, u32>>,
    delay: Option<Duration>,
    probes: AtomicUsize,
    fetches: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockTransport {
    /// Serve `data` with a well-behaved probe (`Accept-Ranges: bytes` and an ETag)
    pub(crate) fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let probe_response = Ok(ResourceHeaders {
            content_length: Some(data.len().to_string()),
            accept_ranges: Some("bytes".to_string()),
            etag: Some("\"mock-etag\"".to_string()),
        });
        Self {
            data,
            probe_response,
            behaviors: HashMap::new(),
            attempts: Mutex::new(HashMap::new()),
            delay: None,
            probes: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Replace the probe headers
    pub(crate) fn with_headers(mut self, headers: ResourceHeaders) -> Self {
        self.probe_response = Ok(headers);
        self
    }

    /// Make the probe itself fail
    pub(crate) fn with_probe_error(mut self, error: TransportError) -> Self {
        self.probe_response = Err(error);
        self
    }

    /// Change how the range with `index` is answered
    pub(crate) fn with_behavior(mut self, index: usize, behavior: RangeBehavior) -> Self {
        self.behaviors.insert(index, behavior);
        self
    }

    /// Hold every ranged read open for `delay`
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn slice(&self, range: &ByteRange) -> Bytes {
        let start = (range.start as usize).min(self.data.len());
        let end = (range.end as usize + 1).min(self.data.len());
        self.data.slice(start..end)
    }

    fn answer(&self, range: &ByteRange) -> Result<RangeResponse, TransportError> {
        let total = self.data.len();
        let partial = |start: u64, end: u64| RangeResponse {
            status: 206,
            content_range: Some(format!("bytes {}-{}/{}", start, end, total)),
            body: self.slice(&ByteRange::new(range.index, start, end)),
        };

        match self.behaviors.get(&range.index) {
            None => Ok(partial(range.start, range.end)),
            Some(RangeBehavior::Fail(e)) => Err(e.clone()),
            Some(RangeBehavior::Status(status)) => Ok(RangeResponse {
                status: *status,
                content_range: None,
                body: self.data.clone(),
            }),
            Some(RangeBehavior::Short) => {
                let mut response = partial(range.start, range.end);
                response.body = response.body.slice(..response.body.len().saturating_sub(1));
                Ok(response)
            }
            Some(RangeBehavior::Long) => {
                let mut response = partial(range.start, range.end);
                response.body = self.slice(&ByteRange::new(range.index, range.start, range.end + 1));
                Ok(response)
            }
            Some(RangeBehavior::Shifted) => Ok(partial(0, range.end - range.start)),
            Some(RangeBehavior::NoContentRange) => {
                let mut response = partial(range.start, range.end);
                response.content_range = None;
                Ok(response)
            }
            Some(RangeBehavior::FlakyTimes(times)) => {
                let mut attempts = self.attempts.lock().unwrap();
                let seen = attempts.entry(range.index).or_insert(0);
                *seen += 1;
                if *seen <= *times {
                    Err(TransportError::Timeout)
                } else {
                    Ok(partial(range.start, range.end))
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn probe(&self, _locator: &str) -> Result<ResourceHeaders, TransportError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.probe_response.clone()
    }

    async fn fetch_range(
        &self,
        _locator: &str,
        range: &ByteRange,
    ) -> Result<RangeResponse, TransportError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = self.answer(range);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }
}

/// Deterministic, non-repeating-looking test payload
pub(crate) fn test_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Config with `chunk_count` ranges and fast, jitter-free retries
pub(crate) fn test_config(chunk_count: usize) -> Config {
    Config {
        chunk_count,
        retry: RetryConfig {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        ..Config::default()
    }
}

pub(crate) const TEST_LOCATOR: &str = "http://example.com/resource.bin";
