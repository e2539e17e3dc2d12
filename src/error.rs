//! 下载链路的错误分类。

use std::io;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// 网络/DNS/TLS 失败、非 2xx 状态或读取响应体失败。
    #[error("transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("{url} does not support byte ranges (Accept-Ranges: {found})")]
    UnsupportedRange { url: String, found: String },
    #[error("size of {url} is unavailable: {reason}")]
    SizeUnavailable { url: String, reason: String },
    #[error("write to output failed: {0}")]
    SinkWrite(#[source] io::Error),
}

impl DownloadError {
    pub fn transport(url: &str, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            url: url.to_string(),
            source: source.into(),
        }
    }

    /// Only transport failures are worth another attempt at chunk level.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
