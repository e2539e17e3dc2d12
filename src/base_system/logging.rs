//! 诊断日志：stderr 控制台输出（带 RFC 3339 时间戳）+ 可选的日志文件与退出归档。
//!
//! stdout 专用于下载数据，任何日志都不能写到 stdout。

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::{io, panic, thread, time::Duration};

use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{error, info};
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use zip::CompressionMethod;
use zip::write::FileOptions;

const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024; // 10MB
const ARCHIVE_WAIT_MS: u64 = 200; // allow file handles to settle on Windows
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("logging already initialized")]
    AlreadyInitialized,
    #[error("subscriber init failed: {0}")]
    SubscriberInit(#[from] tracing_subscriber::util::TryInitError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("time formatting failed: {0}")]
    Time(#[from] time::error::Format),
}

#[derive(Clone, Debug)]
pub struct LogOptions {
    pub debug: bool,
    pub use_color: bool,
    /// `Some(dir)` also writes `dir/latest.log`.
    pub log_dir: Option<PathBuf>,
    pub archive_on_exit: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            debug: false,
            use_color: true,
            log_dir: None,
            archive_on_exit: true,
        }
    }
}

pub struct LogSystem {
    runtime: Arc<LogRuntime>,
}

impl LogSystem {
    pub fn init(options: LogOptions) -> Result<Self, LogError> {
        let console_level = if options.debug {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };

        let console_layer = fmt::layer()
            .with_target(false)
            .with_level(true)
            .with_timer(UtcTime::rfc_3339())
            .with_ansi(options.use_color)
            .with_writer(io::stderr)
            .with_filter(console_level);

        let mut file_log = None;
        let mut guard = None;
        let file_layer = match options.log_dir.as_deref() {
            Some(logs_dir) => {
                fs::create_dir_all(logs_dir)?;
                let latest_log = logs_dir.join("latest.log");
                archive_if_large(&latest_log, logs_dir)?;

                let file_appender = rolling::never(logs_dir, "latest.log");
                let (file_writer, worker_guard) = non_blocking::NonBlockingBuilder::default()
                    .lossy(false)
                    .finish(file_appender);
                guard = Some(worker_guard);
                file_log = Some(FileLog {
                    logs_dir: logs_dir.to_path_buf(),
                    latest_log,
                });

                Some(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_thread_names(true)
                        .with_timer(UtcTime::rfc_3339())
                        .with_ansi(false)
                        .with_writer(file_writer)
                        .with_filter(LevelFilter::DEBUG),
                )
            }
            None => None,
        };

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("global subscriber") || msg.contains("already") {
                    LogError::AlreadyInitialized
                } else {
                    LogError::SubscriberInit(e)
                }
            })?;

        let runtime = Arc::new(LogRuntime {
            file_log,
            guard: Mutex::new(guard),
            exit_called: AtomicBool::new(false),
            archive_on_exit: options.archive_on_exit,
        });

        runtime.install_signal_handler();
        runtime.install_panic_hook();

        Ok(Self { runtime })
    }

    pub fn safe_exit(&self) {
        self.runtime.safe_exit();
    }
}

impl Drop for LogSystem {
    fn drop(&mut self) {
        self.runtime.safe_exit();
    }
}

struct FileLog {
    logs_dir: PathBuf,
    latest_log: PathBuf,
}

struct LogRuntime {
    file_log: Option<FileLog>,
    guard: Mutex<Option<WorkerGuard>>,
    exit_called: AtomicBool,
    archive_on_exit: bool,
}

impl LogRuntime {
    fn install_signal_handler(self: &Arc<Self>) {
        let runtime = Arc::clone(self);
        let _ = ctrlc::set_handler(move || {
            error!("interrupted, output is incomplete");
            runtime.safe_exit();
            std::process::exit(INTERRUPTED_EXIT_CODE);
        });
    }

    fn install_panic_hook(self: &Arc<Self>) {
        let runtime = Arc::clone(self);
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if let Some(location) = info.location() {
                error!("panic at {}:{}: {}", location.file(), location.line(), info);
            } else {
                error!("panic: {info}");
            }
            runtime.safe_exit();
            previous(info);
        }));
    }

    fn safe_exit(&self) {
        if self.exit_called.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Ok(mut guard) = self.guard.lock() {
            guard.take();
        }

        let Some(file_log) = self.file_log.as_ref() else {
            return;
        };
        if self.archive_on_exit && has_content(&file_log.latest_log) {
            thread::sleep(Duration::from_millis(ARCHIVE_WAIT_MS));
            if let Err(err) = archive_log_file(&file_log.latest_log, &file_log.logs_dir) {
                eprintln!("failed to archive log: {err}");
            }
        }
    }
}

fn has_content(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|meta| meta.len() > 0)
}

fn archive_if_large(latest_log: &Path, logs_dir: &Path) -> Result<(), LogError> {
    if let Ok(meta) = fs::metadata(latest_log) {
        if meta.len() >= MAX_LOG_BYTES {
            archive_log_file(latest_log, logs_dir)?;
        }
    }
    Ok(())
}

fn archive_log_file(latest_log: &Path, logs_dir: &Path) -> Result<Option<PathBuf>, LogError> {
    if !latest_log.exists() {
        return Ok(None);
    }
    let meta = fs::metadata(latest_log)?;
    if meta.len() == 0 {
        let _ = fs::remove_file(latest_log);
        return Ok(None);
    }

    let timestamp = OffsetDateTime::now_utc().format(format_description!(
        "[year][month][day]_[hour][minute][second]"
    ))?;
    let archive_path = logs_dir.join(format!("log_{timestamp}.zip"));

    let file = File::create(&archive_path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(format!("{timestamp}.log"), options)?;

    let mut source = File::open(latest_log)?;
    io::copy(&mut source, &mut zip)?;
    zip.finish()?;
    drop(source);

    let _ = fs::remove_file(latest_log);

    info!("log archived to {}", archive_path.display());
    Ok(Some(archive_path))
}
