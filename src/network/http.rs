use std::io::Read;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, ACCEPT_RANGES, CONNECTION, CONTENT_LENGTH, HeaderMap, HeaderValue,
    RANGE, USER_AGENT,
};
use tracing::debug;

use super::RangeSource;
use crate::download::models::{ChunkRange, ResourceDescriptor};
use crate::error::DownloadError;

// Upper bound for the body buffer reserved before a range response arrives.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whole-request timeout; `None` lets large chunks take as long as needed.
    pub request_timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: None,
            connect_timeout: Some(Duration::from_secs(30)),
            user_agent: format!("chunkcat/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

pub struct HttpRangeClient {
    client: Client,
}

impl HttpRangeClient {
    pub fn new(config: &HttpConfig) -> anyhow::Result<Self> {
        // Payload bytes must reach the sink exactly as stored on the server.
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        default_headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or(HeaderValue::from_static("chunkcat")),
        );

        let mut builder = Client::builder()
            .default_headers(default_headers)
            .timeout(config.request_timeout);
        if let Some(connect) = config.connect_timeout {
            builder = builder.connect_timeout(connect);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    fn send(&self, url: &str, request: RequestBuilder) -> Result<Response, DownloadError> {
        request
            .send()
            .and_then(Response::error_for_status)
            .map_err(|e| DownloadError::transport(url, e))
    }
}

impl RangeSource for HttpRangeClient {
    fn probe(&self, url: &str) -> Result<ResourceDescriptor, DownloadError> {
        let resp = self.send(url, self.client.head(url))?;
        debug!(target: "probe", status = %resp.status(), "HEAD {}", url);
        descriptor_from_headers(url, resp.headers())
    }

    fn fetch_range(&self, url: &str, range: ChunkRange) -> Result<Vec<u8>, DownloadError> {
        let request = self.client.get(url).header(RANGE, range.header_value());
        let mut resp = self.send(url, request)?;
        debug!(target: "fetch", status = %resp.status(), "GET {} {}", url, range);

        let hint = usize::try_from(range.len().min(MAX_PREALLOC)).unwrap_or(0);
        let mut body = Vec::with_capacity(hint);
        resp.read_to_end(&mut body)
            .map_err(|e| DownloadError::transport(url, e))?;
        Ok(body)
    }

    fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        let resp = self.send(url, self.client.get(url))?;
        resp.text().map_err(|e| DownloadError::transport(url, e))
    }
}

/// 从探测响应头中提取总大小；必须显式声明 `Accept-Ranges: bytes`。
pub(crate) fn descriptor_from_headers(
    url: &str,
    headers: &HeaderMap,
) -> Result<ResourceDescriptor, DownloadError> {
    let accept_ranges = headers
        .get(ACCEPT_RANGES)
        .map(|v| v.to_str().unwrap_or("<non-ascii>").trim());
    if accept_ranges != Some("bytes") {
        return Err(DownloadError::UnsupportedRange {
            url: url.to_string(),
            found: accept_ranges.unwrap_or("<absent>").to_string(),
        });
    }

    let size_unavailable = |reason: String| DownloadError::SizeUnavailable {
        url: url.to_string(),
        reason,
    };
    let raw = headers
        .get(CONTENT_LENGTH)
        .ok_or_else(|| size_unavailable("Content-Length header missing".to_string()))?;
    let text = raw
        .to_str()
        .map_err(|_| size_unavailable("Content-Length is not ASCII".to_string()))?
        .trim();
    let total_size = text
        .parse::<u64>()
        .map_err(|e| size_unavailable(format!("malformed Content-Length {text:?}: {e}")))?;

    Ok(ResourceDescriptor {
        url: url.to_string(),
        total_size,
    })
}
