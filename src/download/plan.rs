//! 分块计划：把 `[0, total_size)` 切成不超过 batch_size 的连续区间。

use super::models::ChunkRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    total_size: u64,
    batch_size: u64,
}

impl ChunkPlan {
    /// `batch_size` must be non-zero; `DownloadSettings` guarantees it.
    pub fn new(total_size: u64, batch_size: u64) -> Self {
        debug_assert!(batch_size > 0, "batch size must be positive");
        Self {
            total_size,
            batch_size: batch_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        usize::try_from(self.total_size.div_ceil(self.batch_size)).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.total_size == 0
    }

    pub fn iter(&self) -> ChunkIter {
        ChunkIter {
            next_from: 0,
            total_size: self.total_size,
            batch_size: self.batch_size,
        }
    }
}

impl IntoIterator for &ChunkPlan {
    type Item = ChunkRange;
    type IntoIter = ChunkIter;

    fn into_iter(self) -> ChunkIter {
        self.iter()
    }
}

/// 按偏移升序产出区间，不预先分配整张表。
#[derive(Debug, Clone)]
pub struct ChunkIter {
    next_from: u64,
    total_size: u64,
    batch_size: u64,
}

impl Iterator for ChunkIter {
    type Item = ChunkRange;

    fn next(&mut self) -> Option<ChunkRange> {
        if self.next_from >= self.total_size {
            return None;
        }
        let from = self.next_from;
        let to = from.saturating_add(self.batch_size).min(self.total_size);
        self.next_from = to;
        Some(ChunkRange { from, to })
    }
}
