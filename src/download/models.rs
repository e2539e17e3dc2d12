//! 下载相关的数据模型定义。
//!
//! 包含资源描述、分块区间、下载参数、进度快照与运行汇总。

use std::fmt;

use crate::base_system::retry::RetryPolicy;

/// 探测得到的资源信息，只在一次下载内有效。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub url: String,
    pub total_size: u64,
}

/// Half-open byte range `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub from: u64,
    pub to: u64,
}

impl ChunkRange {
    pub fn len(&self) -> u64 {
        self.to.saturating_sub(self.from)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Range` header value; the wire format uses an inclusive end.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.from, self.to.saturating_sub(1))
    }
}

impl fmt::Display for ChunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.from, self.to)
    }
}

/// 一次运行内不变的下载参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Chunk size in bytes, always > 0.
    pub batch_size: u64,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPhase {
    Idle,
    Probing,
    Planning,
    Fetching,
    Done,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// 1-based index of the chunk being fetched; 0 before the first chunk.
    pub chunk_index: usize,
    pub chunk_total: usize,
    pub range: ChunkRange,
    pub bytes_written: u64,
    pub total_size: u64,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            chunk_index: 0,
            chunk_total: 0,
            range: ChunkRange { from: 0, to: 0 },
            bytes_written: 0,
            total_size: 0,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub resources: usize,
    pub bytes: u64,
}
