//! Capability probing: learn the size and range support of a resource before planning.

use crate::error::ProbeError;
use crate::transport::Transport;
use crate::types::ResourceDescriptor;

/// Issue a metadata-only request and turn its headers into a [`ResourceDescriptor`].
///
/// Fails fast, before any range is planned:
/// - the request itself fails ([`ProbeError::Transport`])
/// - no total size is reported ([`ProbeError::MissingContentLength`])
/// - the size is not a non-negative integer ([`ProbeError::InvalidContentLength`])
/// - the server explicitly answers `Accept-Ranges: none` ([`ProbeError::RangesUnsupported`])
///
/// A missing range-support indicator is not a refusal. Servers that then ignore the
/// `Range` header are caught per range by the fetcher's partial-content check.
pub async fn probe_resource(
    transport: &dyn Transport,
    locator: &str,
) -> Result<ResourceDescriptor, ProbeError> {
    let headers = transport.probe(locator).await?;

    if let Some(accept_ranges) = headers.accept_ranges.as_deref()
        && accept_ranges.eq_ignore_ascii_case("none")
    {
        return Err(ProbeError::RangesUnsupported {
            accept_ranges: accept_ranges.to_string(),
        });
    }

    let raw_length = headers
        .content_length
        .ok_or(ProbeError::MissingContentLength)?;
    let total_size = raw_length
        .trim()
        .parse::<u64>()
        .map_err(|_| ProbeError::InvalidContentLength(raw_length.clone()))?;

    let descriptor = ResourceDescriptor {
        total_size,
        supports_range_requests: true,
        integrity_tag: headers.etag.filter(|tag| !tag.is_empty()),
    };

    tracing::debug!(
        locator,
        total_size,
        accept_ranges = headers.accept_ranges.as_deref().unwrap_or("<absent>"),
        integrity_tag = descriptor.integrity_tag.as_deref(),
        "Probed resource"
    );

    Ok(descriptor)
}
