//! 整体运行：解析清单后按顺序逐个下载，任一资源失败即终止。

use std::io::Write;

use tracing::info;

use crate::error::DownloadError;
use crate::network::RangeSource;

use super::downloader::ChunkedDownloader;
use super::manifest::resolve_manifest;
use super::models::{DownloadSettings, RunSummary};
use super::progress::ProgressReporter;

pub fn run<S, W>(
    source: &S,
    settings: DownloadSettings,
    manifest_url: &str,
    sink: &mut W,
    progress: ProgressReporter,
) -> Result<RunSummary, DownloadError>
where
    S: RangeSource + ?Sized,
    W: Write + ?Sized,
{
    let urls = resolve_manifest(source, manifest_url)?;
    download_all(source, settings, &urls, sink, progress)
}

/// Download `urls` in order into one sink. The first fatal error stops the
/// run; resources after it are never touched.
pub fn download_all<S, W>(
    source: &S,
    settings: DownloadSettings,
    urls: &[String],
    sink: &mut W,
    progress: ProgressReporter,
) -> Result<RunSummary, DownloadError>
where
    S: RangeSource + ?Sized,
    W: Write + ?Sized,
{
    let mut downloader = ChunkedDownloader::new(source, settings).with_progress(progress);
    let mut summary = RunSummary::default();

    for (idx, url) in urls.iter().enumerate() {
        info!(target: "driver", "resource {}/{}: {}", idx + 1, urls.len(), url);
        let bytes = downloader.download(url, sink)?;
        summary.resources += 1;
        summary.bytes += bytes;
    }

    info!(
        target: "driver",
        resources = summary.resources,
        bytes = summary.bytes,
        "all resources written"
    );
    Ok(summary)
}
