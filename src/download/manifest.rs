//! 清单解析：拉取纯文本清单，保留以 `http` 开头的行。

use tracing::info;

use crate::error::DownloadError;
use crate::network::RangeSource;

pub fn resolve_manifest<S: RangeSource + ?Sized>(
    source: &S,
    url: &str,
) -> Result<Vec<String>, DownloadError> {
    let text = source.fetch_text(url)?;
    let urls = filter_manifest_lines(&text);
    info!(target: "manifest", "{} lists {} resources", url, urls.len());
    Ok(urls)
}

/// Lines are kept verbatim and in order; duplicates and malformed URLs pass
/// through and fail later at probe time.
pub fn filter_manifest_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| line.starts_with("http"))
        .map(str::to_string)
        .collect()
}
