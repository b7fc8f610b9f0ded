//! Range fetching: retrieve and validate the bytes of a single planned range.

use crate::config::RetryConfig;
use crate::error::RangeError;
use crate::retry::fetch_with_retry;
use crate::transport::Transport;
use crate::types::{ByteRange, ChunkResult};

/// HTTP status for a response that honored the requested range
const PARTIAL_CONTENT: u16 = 206;

/// Fetch exactly the bytes of `range` from `locator`, with a single attempt.
///
/// The response must be partial content: any other status (notably a 200 full-body
/// fallback) is a [`RangeError::ContentMismatch`]. Its `Content-Range` must name exactly
/// the requested interval, otherwise the bytes belong somewhere else in the file and the
/// result is a [`RangeError::RangeMismatch`]. The payload length is then checked against
/// the range explicitly, so a short or long body never becomes a chunk.
pub async fn fetch_range(
    transport: &dyn Transport,
    locator: &str,
    range: ByteRange,
) -> Result<ChunkResult, RangeError> {
    let response = transport.fetch_range(locator, &range).await?;

    if response.status != PARTIAL_CONTENT {
        return Err(RangeError::ContentMismatch {
            status: response.status,
        });
    }

    let served = response.content_range.as_deref().and_then(parse_content_range);
    if served != Some((range.start, range.end)) {
        return Err(RangeError::RangeMismatch {
            requested: format!("{}-{}", range.start, range.end),
            content_range: response.content_range.unwrap_or_default(),
        });
    }

    let actual = response.body.len() as u64;
    if actual != range.len() {
        return Err(RangeError::LengthMismatch {
            expected: range.len(),
            actual,
        });
    }

    Ok(ChunkResult {
        range,
        payload: response.body,
    })
}

/// Parse `bytes S-E/T` (T may be `*`) into `(S, E)`.
fn parse_content_range(value: &str) -> Option<(u64, u64)> {
    let spec = value.trim().strip_prefix("bytes")?.trim_start();
    let (interval, complete) = spec.split_once('/')?;
    if complete != "*" {
        complete.parse::<u64>().ok()?;
    }
    let (start, end) = interval.split_once('-')?;
    let start = start.parse::<u64>().ok()?;
    let end = end.parse::<u64>().ok()?;
    (start <= end).then_some((start, end))
}

/// [`fetch_range`] with bounded retries of transient failures.
pub async fn fetch_range_with_retry(
    transport: &dyn Transport,
    locator: &str,
    range: ByteRange,
    retry: &RetryConfig,
) -> Result<ChunkResult, RangeError> {
    fetch_with_retry(retry, || fetch_range(transport, locator, range)).await
}
