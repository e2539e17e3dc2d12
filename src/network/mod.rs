//! 网络访问层。
//!
//! `RangeSource` 是下载流程与传输层之间的接缝：生产环境使用 `http::HttpRangeClient`，
//! 测试中使用内存实现。

pub mod http;

use crate::download::models::{ChunkRange, ResourceDescriptor};
use crate::error::DownloadError;

pub trait RangeSource {
    /// Metadata-only probe: total size plus byte-range support. Never retried.
    fn probe(&self, url: &str) -> Result<ResourceDescriptor, DownloadError>;

    /// One range request for `range`. Partial bodies are never returned.
    fn fetch_range(&self, url: &str, range: ChunkRange) -> Result<Vec<u8>, DownloadError>;

    /// Whole body as text (manifest retrieval).
    fn fetch_text(&self, url: &str) -> Result<String, DownloadError>;
}
