//! Transport abstraction for metadata probes and ranged reads.
//!
//! The downloader only ever needs two requests: a metadata-only probe and a read of one
//! byte interval. Both are behind [`Transport`] so the engine can be driven by
//! [`HttpTransport`] in production and by in-memory fakes in tests.

mod http;

pub use http::HttpTransport;

use bytes::Bytes;

use crate::error::TransportError;
use crate::types::ByteRange;

/// Raw metadata returned by a probe, before any interpretation
///
/// Header values are passed through untouched; parsing and validation belong to the
/// capability prober.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceHeaders {
    /// Declared total length of the resource (`Content-Length`)
    pub content_length: Option<String>,
    /// Range-support indicator (`Accept-Ranges`)
    pub accept_ranges: Option<String>,
    /// Opaque integrity tag (`ETag`)
    pub etag: Option<String>,
}

/// Response to a ranged read
#[derive(Clone, Debug)]
pub struct RangeResponse {
    /// Status code; 206 means the server honored the range
    pub status: u16,
    /// Interval the server says it sent (`Content-Range`), if any
    pub content_range: Option<String>,
    /// Response body
    ///
    /// Transports may leave this empty for any status other than 206, and may stop
    /// reading once it grows past the requested length.
    pub body: Bytes,
}

/// Abstraction over the protocol client, enabling testability.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Issue a metadata-only request for `locator` (no body transfer)
    async fn probe(&self, locator: &str) -> Result<ResourceHeaders, TransportError>;

    /// Request exactly the bytes of `range` from `locator`
    async fn fetch_range(
        &self,
        locator: &str,
        range: &ByteRange,
    ) -> Result<RangeResponse, TransportError>;
}
