//! 进度上报与 CLI 进度条管理。
//!
//! 每个分块开始时输出一行诊断日志；可选的 indicatif 进度条画在 stderr 上，
//! 与 stdout 上的数据流互不干扰。

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::info;

use super::models::{ChunkRange, ProgressSnapshot};

pub type ProgressCallback = Box<dyn FnMut(ProgressSnapshot) + Send>;

pub struct ProgressReporter {
    snapshot: ProgressSnapshot,
    cb: Option<ProgressCallback>, // optional observer
    use_bar: bool,
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub fn new(use_bar: bool, cb: Option<ProgressCallback>) -> Self {
        Self {
            snapshot: ProgressSnapshot::default(),
            cb,
            use_bar,
            bar: None,
        }
    }

    /// 只写日志，不画进度条，也不回调。
    pub fn silent() -> Self {
        Self::new(false, None)
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot
    }

    fn emit(&mut self) {
        if let Some(cb) = self.cb.as_mut() {
            cb(self.snapshot);
        }
    }

    pub(crate) fn begin_resource(&mut self, url: &str, total_size: u64, chunk_total: usize) {
        self.finish_bar();
        self.snapshot = ProgressSnapshot {
            chunk_total,
            total_size,
            ..ProgressSnapshot::default()
        };
        if self.use_bar && total_size > 0 {
            self.bar = Some(make_bar(url, total_size));
        }
        self.emit();
    }

    pub(crate) fn begin_chunk(&mut self, url: &str, index: usize, range: ChunkRange) {
        self.snapshot.chunk_index = index;
        self.snapshot.range = range;
        let line = format!(
            "downloading {}/{} {} from {}",
            index, self.snapshot.chunk_total, range, url
        );
        match self.bar.as_ref() {
            Some(bar) => bar.suspend(|| info!(target: "download", "{line}")),
            None => info!(target: "download", "{line}"),
        }
        self.emit();
    }

    pub(crate) fn chunk_written(&mut self, len: u64) {
        self.snapshot.bytes_written = self.snapshot.bytes_written.saturating_add(len);
        if let Some(bar) = self.bar.as_ref() {
            bar.inc(len);
        }
        self.emit();
    }

    pub(crate) fn finish_bar(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.finish_bar();
    }
}

fn make_bar(url: &str, total_size: u64) -> ProgressBar {
    let style = ProgressStyle::with_template(
        "{prefix} [{elapsed_precise}] {wide_bar} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("##-");

    let bar = ProgressBar::with_draw_target(Some(total_size), ProgressDrawTarget::stderr());
    bar.set_style(style);
    bar.set_prefix(short_name(url).to_string());
    bar
}

fn short_name(url: &str) -> &str {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(url)
}
