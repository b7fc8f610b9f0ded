//! HTTP transport built on `reqwest`.

use bytes::{Bytes, BytesMut};
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, ETAG, HeaderMap, RANGE};

use crate::config::HttpConfig;
use crate::error::{Result, TransportError};
use crate::types::ByteRange;

use super::{RangeResponse, ResourceHeaders, Transport};

/// Production [`Transport`] issuing `HEAD` probes and `Range` GETs.
///
/// One client (and so one connection pool) is shared by every range of a download.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport from HTTP settings
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| crate::error::Error::Config {
            message: format!("failed to build HTTP client: {}", e),
            key: Some("http".to_string()),
        })?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
}

/// Classify a reqwest failure without leaking the client type.
fn map_request_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else if e.is_body() || e.is_decode() {
        TransportError::Body(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

/// Read the body chunk by chunk, stopping as soon as it exceeds `limit` bytes.
///
/// An overlong body comes back longer than `limit` (but not necessarily complete), which
/// is enough for the caller to reject it.
async fn read_at_most(
    mut response: reqwest::Response,
    limit: u64,
) -> std::result::Result<Bytes, TransportError> {
    let capacity = usize::try_from(limit).unwrap_or(usize::MAX).min(1 << 20);
    let mut body = BytesMut::with_capacity(capacity);

    while let Some(chunk) = response.chunk().await.map_err(map_request_error)? {
        body.extend_from_slice(&chunk);
        if body.len() as u64 > limit {
            tracing::debug!(limit, received = body.len(), "Partial content longer than requested, stop reading");
            break;
        }
    }

    Ok(body.freeze())
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn probe(&self, locator: &str) -> std::result::Result<ResourceHeaders, TransportError> {
        let response = self
            .client
            .head(locator)
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            return Err(TransportError::Request(format!(
                "HEAD {} returned status {}",
                locator,
                response.status()
            )));
        }

        // Read the header itself: for HEAD responses the body size hint is always zero
        let headers = response.headers();
        Ok(ResourceHeaders {
            content_length: header_string(headers, CONTENT_LENGTH),
            accept_ranges: header_string(headers, ACCEPT_RANGES),
            etag: header_string(headers, ETAG),
        })
    }

    async fn fetch_range(
        &self,
        locator: &str,
        range: &ByteRange,
    ) -> std::result::Result<RangeResponse, TransportError> {
        let response = self
            .client
            .get(locator)
            .header(RANGE, range.header_value())
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status().as_u16();
        let content_range = header_string(response.headers(), CONTENT_RANGE);

        // A full-body fallback can be the whole resource; never buffer it
        if status != reqwest::StatusCode::PARTIAL_CONTENT.as_u16() {
            return Ok(RangeResponse {
                status,
                content_range,
                body: Bytes::new(),
            });
        }

        let body = read_at_most(response, range.len()).await?;
        Ok(RangeResponse {
            status,
            content_range,
            body,
        })
    }
}
