//! Mock HTTP servers and test content generators

use std::collections::HashSet;
use std::sync::Arc;

use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Path the mock resource is served under
pub const RESOURCE_PATH: &str = "/resource.bin";

/// Deterministic content of `len` bytes
pub fn generate_content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 256) as u8).collect()
}

/// Parse a `Range: bytes=start-end` header value
pub fn parse_range(value: &str) -> Option<(u64, u64)> {
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.trim().parse().ok()?, end.trim().parse().ok()?))
}

/// Answers GETs the way a range-capable file server does
#[derive(Clone)]
pub struct RangeResponder {
    data: Arc<Vec<u8>>,
    honor_ranges: bool,
    from_start: bool,
    failing_starts: HashSet<u64>,
}

impl RangeResponder {
    /// Serve 206 slices of `data`
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(data),
            honor_ranges: true,
            from_start: false,
            failing_starts: HashSet::new(),
        }
    }

    /// Ignore the `Range` header and always send the full body with 200
    pub fn ignoring_ranges(mut self) -> Self {
        self.honor_ranges = false;
        self
    }

    /// Answer every range with the right number of bytes taken from offset 0
    pub fn serving_from_start(mut self) -> Self {
        self.from_start = true;
        self
    }

    /// Answer 500 to every range starting at `start`
    pub fn failing_at(mut self, start: u64) -> Self {
        self.failing_starts.insert(start);
        self
    }
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let total = self.data.len() as u64;
        let range = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_range);

        match range {
            Some((start, _)) if self.failing_starts.contains(&start) => {
                ResponseTemplate::new(500)
            }
            Some((start, end)) if self.honor_ranges && start <= end && end < total => {
                let (start, end) = if self.from_start {
                    (0, end - start)
                } else {
                    (start, end)
                };
                ResponseTemplate::new(206)
                    .insert_header("Content-Range", format!("bytes {start}-{end}/{total}").as_str())
                    .set_body_bytes(self.data[start as usize..=end as usize].to_vec())
            }
            Some(_) if self.honor_ranges => ResponseTemplate::new(416),
            _ => ResponseTemplate::new(200).set_body_bytes(self.data.as_ref().clone()),
        }
    }
}

/// Mount a HEAD answer reporting `len` bytes with the given `Accept-Ranges` value
pub async fn mount_head(server: &MockServer, len: usize, accept_ranges: Option<&str>) {
    let mut template = ResponseTemplate::new(200)
        .set_body_bytes(vec![0u8; len])
        .insert_header("ETag", "\"v1\"");
    if let Some(value) = accept_ranges {
        template = template.insert_header("Accept-Ranges", value);
    }
    Mock::given(method("HEAD"))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Mount a range-capable server for `data`
pub async fn mount_range_server(server: &MockServer, responder: RangeResponder, len: usize) {
    mount_head(server, len, Some("bytes")).await;
    Mock::given(method("GET"))
        .respond_with(responder)
        .mount(server)
        .await;
}

/// Locator of the mock resource on `server`
pub fn resource_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), RESOURCE_PATH)
}

/// Number of GET requests the server has seen
pub async fn get_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "GET")
        .count()
}
