//! chunkcat：按清单顺序以 HTTP Range 分块下载文件，并把内容依次写到同一个输出流。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置/日志/重试策略等基础设施
//! - `network`：HTTP 传输（探测 / Range 请求 / 清单拉取）
//! - `download`：分块计划、带重试的拉取、下载状态机与整体驱动
//!
//! stdout 只承载下载数据；进度、重试与错误信息全部写到 stderr。

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::{error, info};

mod base_system;
mod download;
mod error;
mod network;
#[cfg(test)]
mod test_support;

use base_system::config::{ConfigSpec, load_or_create};
use base_system::context::Config;
use base_system::logging::{LogOptions, LogSystem};
use download::progress::ProgressReporter;
use network::http::HttpRangeClient;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const COMPLETION_MARKER: &str = "COMPLETED!";

#[derive(Debug, Parser)]
#[command(name = "chunkcat")]
#[command(about = "Download every URL listed in a manifest in HTTP range chunks, in order, to one output")]
struct Cli {
    /// 每个分块的最大尝试次数（默认 100）
    #[arg(short = 'm', long = "max-retry")]
    max_retry: Option<u32>,

    /// 分块大小，单位 MiB（默认 16）
    #[arg(short = 'b', long = "batch-size-in-mb")]
    batch_size_in_mb: Option<u64>,

    /// 输出文件路径；省略时写到 stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 配置文件路径，或其所在目录（不存在时按默认值生成带注释的文件）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 额外写入日志文件的目录
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// 显示版本信息后退出
    #[arg(long, default_value_t = false)]
    version: bool,

    /// 清单地址（纯文本，每行一个 URL）
    #[arg(required_unless_present = "version")]
    url: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("chunkcat v{}", VERSION);
        return Ok(());
    }

    let config = load_config(&cli)?;
    let settings = config.download_settings().context("invalid settings")?;
    let log = init_logging(cli.debug, &config)?;

    let manifest_url = cli
        .url
        .as_deref()
        .ok_or_else(|| anyhow!("missing manifest URL"))?;
    info!(
        target: "startup",
        "chunkcat v{}: {} MiB chunks, up to {} attempts per chunk",
        VERSION,
        config.batch_size_mb,
        settings.retry.max_attempts
    );

    let client = HttpRangeClient::new(&config.http_config()).context("init http client")?;
    let mut sink: Box<dyn Write> = match cli.output.as_deref() {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("create output {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let progress = ProgressReporter::new(config.progress_bar, None);

    match download::driver::run(&client, settings, manifest_url, &mut *sink, progress) {
        Ok(_) => {
            eprintln!("{COMPLETION_MARKER}");
            Ok(())
        }
        Err(err) => {
            error!(target: "driver", "stopping: {err}");
            drop(sink);
            log.safe_exit();
            std::process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config.as_deref() {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(Config::FILE_NAME)
            } else {
                path.to_path_buf()
            };
            load_or_create::<Config>(&path)
                .with_context(|| format!("load config {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(max_retry) = cli.max_retry {
        config.max_retries = max_retry;
    }
    if let Some(batch) = cli.batch_size_in_mb {
        config.batch_size_mb = batch;
    }
    if let Some(dir) = cli.log_dir.as_ref() {
        config.log_dir = dir.to_string_lossy().into_owned();
    }
    Ok(config)
}

fn init_logging(debug: bool, config: &Config) -> Result<LogSystem> {
    let opts = LogOptions {
        debug,
        use_color: true,
        log_dir: config.log_dir(),
        archive_on_exit: true,
    };
    LogSystem::init(opts).context("init logging")
}
