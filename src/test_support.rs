//! 测试辅助：本地 HTTP 服务（axum，支持 HEAD 与单段 Range 请求）、
//! 内存数据源、可观察的输出端与日志捕获。

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;

use crate::download::models::{ChunkRange, ResourceDescriptor};
use crate::error::DownloadError;
use crate::network::RangeSource;

#[derive(Clone)]
struct FileState {
    body: Arc<Vec<u8>>,
    accept_ranges: bool,
    failures_left: Arc<AtomicUsize>,
}

pub(crate) fn sample_body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// `/file` serving `body`; HEAD advertises `Accept-Ranges: bytes` only when asked to.
pub(crate) fn ranged_file_app(body: Vec<u8>, accept_ranges: bool) -> Router {
    file_app(body, accept_ranges, 0)
}

/// Like `ranged_file_app`, but the first `failures` GETs answer 503.
pub(crate) fn flaky_file_app(body: Vec<u8>, failures: usize) -> Router {
    file_app(body, true, failures)
}

fn file_app(body: Vec<u8>, accept_ranges: bool, failures: usize) -> Router {
    let state = FileState {
        body: Arc::new(body),
        accept_ranges,
        failures_left: Arc::new(AtomicUsize::new(failures)),
    };
    Router::new()
        .route("/file", get(get_file).head(head_file))
        .with_state(state)
}

async fn head_file(State(file): State<FileState>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(file.body.len()));
    if file.accept_ranges {
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    }
    (StatusCode::OK, headers).into_response()
}

async fn get_file(State(file): State<FileState>, headers: HeaderMap) -> Response {
    let failing = file
        .failures_left
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return (StatusCode::SERVICE_UNAVAILABLE, "try again").into_response();
    }

    let len = file.body.len();
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_range);
    match range {
        Some((from, to)) if from < len && from <= to => {
            let to = to.min(len - 1);
            (
                StatusCode::PARTIAL_CONTENT,
                [(header::CONTENT_RANGE, format!("bytes {from}-{to}/{len}"))],
                file.body[from..=to].to_vec(),
            )
                .into_response()
        }
        Some(_) => StatusCode::RANGE_NOT_SATISFIABLE.into_response(),
        None => file.body.to_vec().into_response(),
    }
}

fn parse_range(value: &str) -> Option<(usize, usize)> {
    let (from, to) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((from.parse().ok()?, to.parse().ok()?))
}

/// Serve `app` on an ephemeral port from a background runtime; returns the base URL.
pub(crate) fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    listener
        .set_nonblocking(true)
        .expect("non-blocking listener");

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("test runtime");
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
            let _ = axum::serve(listener, app).await;
        });
    });

    format!("http://{addr}")
}

/// Calls observed by `MemorySource`, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Probe(String),
    Fetch(String, ChunkRange),
    Text(String),
}

/// 内存中的 `RangeSource`：可注入探测失败与按区间的传输失败。
#[derive(Default)]
pub(crate) struct MemorySource {
    files: HashMap<String, Vec<u8>>,
    no_ranges: HashSet<String>,
    texts: HashMap<String, String>,
    // (url, range start) -> remaining failures; u32::MAX never recovers
    failures: RefCell<HashMap<(String, u64), u32>>,
    pub(crate) calls: RefCell<Vec<Call>>,
}

impl MemorySource {
    pub(crate) fn with_file(mut self, url: &str, body: Vec<u8>) -> Self {
        self.files.insert(url.to_string(), body);
        self
    }

    pub(crate) fn without_ranges(mut self, url: &str) -> Self {
        self.no_ranges.insert(url.to_string());
        self
    }

    pub(crate) fn with_text(mut self, url: &str, text: &str) -> Self {
        self.texts.insert(url.to_string(), text.to_string());
        self
    }

    pub(crate) fn failing(self, url: &str, from: u64, times: u32) -> Self {
        self.failures
            .borrow_mut()
            .insert((url.to_string(), from), times);
        self
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Fetch(..)))
            .count()
    }

    pub(crate) fn probed(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Probe(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }
}

impl RangeSource for MemorySource {
    fn probe(&self, url: &str) -> Result<ResourceDescriptor, DownloadError> {
        self.calls.borrow_mut().push(Call::Probe(url.to_string()));
        let body = self
            .files
            .get(url)
            .ok_or_else(|| DownloadError::transport(url, "404 Not Found"))?;
        if self.no_ranges.contains(url) {
            return Err(DownloadError::UnsupportedRange {
                url: url.to_string(),
                found: "<absent>".to_string(),
            });
        }
        Ok(ResourceDescriptor {
            url: url.to_string(),
            total_size: body.len() as u64,
        })
    }

    fn fetch_range(&self, url: &str, range: ChunkRange) -> Result<Vec<u8>, DownloadError> {
        self.calls
            .borrow_mut()
            .push(Call::Fetch(url.to_string(), range));

        let mut failures = self.failures.borrow_mut();
        if let Some(left) = failures.get_mut(&(url.to_string(), range.from)) {
            if *left > 0 {
                if *left != u32::MAX {
                    *left -= 1;
                }
                return Err(DownloadError::transport(url, "connection reset"));
            }
        }

        let body = self
            .files
            .get(url)
            .ok_or_else(|| DownloadError::transport(url, "404 Not Found"))?;
        let end = (range.to as usize).min(body.len());
        let start = (range.from as usize).min(end);
        Ok(body[start..end].to_vec())
    }

    fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        self.calls.borrow_mut().push(Call::Text(url.to_string()));
        self.texts
            .get(url)
            .cloned()
            .ok_or_else(|| DownloadError::transport(url, "404 Not Found"))
    }
}

/// Sink that records every write call separately.
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) writes: Vec<Vec<u8>>,
}

impl RecordingSink {
    pub(crate) fn concat(&self) -> Vec<u8> {
        self.writes.concat()
    }
}

impl Write for RecordingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes.push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that rejects every write.
pub(crate) struct BrokenSink;

impl Write for BrokenSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Shared buffer behind the log writer installed by `capture_logs`.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log buffer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local fmt subscriber and return everything it logged.
pub(crate) fn capture_logs<F: FnOnce()>(f: F) -> String {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    tracing::subscriber::with_default(subscriber, f);

    let bytes = buffer.0.lock().unwrap().clone();
    String::from_utf8_lossy(&bytes).into_owned()
}
