//! 单个资源的分块下载主流程：探测 → 规划 → 逐块拉取并按偏移顺序写出。

use std::io::Write;

use tracing::{debug, info, warn};

use crate::error::DownloadError;
use crate::network::RangeSource;

use super::fetcher::RetryingFetcher;
use super::models::{DownloadPhase, DownloadSettings};
use super::plan::ChunkPlan;
use super::progress::ProgressReporter;

pub struct ChunkedDownloader<'a, S: RangeSource + ?Sized> {
    source: &'a S,
    settings: DownloadSettings,
    progress: ProgressReporter,
    phase: DownloadPhase,
}

impl<'a, S: RangeSource + ?Sized> ChunkedDownloader<'a, S> {
    pub fn new(source: &'a S, settings: DownloadSettings) -> Self {
        Self {
            source,
            settings,
            progress: ProgressReporter::silent(),
            phase: DownloadPhase::Idle,
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    #[cfg(test)]
    pub fn phase(&self) -> DownloadPhase {
        self.phase
    }

    fn enter(&mut self, phase: DownloadPhase) {
        debug!(target: "download", from = ?self.phase, to = ?phase, "phase change");
        self.phase = phase;
    }

    /// 下载 `url` 的全部内容并追加写入 `sink`，返回写入的字节数。
    ///
    /// Chunks are written strictly in ascending offset order, each one fully
    /// before the next is requested. On failure nothing already written is
    /// rolled back.
    pub fn download<W: Write + ?Sized>(
        &mut self,
        url: &str,
        sink: &mut W,
    ) -> Result<u64, DownloadError> {
        let result = self.run_phases(url, sink);
        self.progress.finish_bar();
        match &result {
            Ok(_) => self.enter(DownloadPhase::Done),
            Err(_) => self.enter(DownloadPhase::Aborted),
        }
        result
    }

    fn run_phases<W: Write + ?Sized>(
        &mut self,
        url: &str,
        sink: &mut W,
    ) -> Result<u64, DownloadError> {
        self.enter(DownloadPhase::Probing);
        let resource = self.source.probe(url)?;

        self.enter(DownloadPhase::Planning);
        let plan = ChunkPlan::new(resource.total_size, self.settings.batch_size);
        self.progress
            .begin_resource(url, resource.total_size, plan.len());
        if plan.is_empty() {
            info!(target: "download", "{} is empty, nothing to fetch", url);
            return Ok(0);
        }

        self.enter(DownloadPhase::Fetching);
        let fetcher = RetryingFetcher::new(self.source, self.settings.retry);
        let mut written = 0u64;
        for (idx, range) in plan.iter().enumerate() {
            self.progress.begin_chunk(url, idx + 1, range);
            let bytes = fetcher.fetch(url, range)?;
            sink.write_all(&bytes).map_err(DownloadError::SinkWrite)?;
            written += bytes.len() as u64;
            self.progress.chunk_written(bytes.len() as u64);
        }
        sink.flush().map_err(DownloadError::SinkWrite)?;

        if written != resource.total_size {
            warn!(
                target: "download",
                expected = resource.total_size,
                written,
                "{} size mismatch",
                url
            );
        }
        Ok(written)
    }
}
