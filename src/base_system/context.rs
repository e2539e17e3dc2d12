//! 全局配置结构（Config）与默认值。
//!
//! 该模块同时提供生成 `chunkcat.yml` 的字段元信息，以及从配置派生的
//! 下载参数与 HTTP 客户端参数。

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigError, ConfigSpec, FieldMeta};
use super::retry::{Backoff, RetryPolicy};
use crate::download::models::DownloadSettings;
use crate::network::http::HttpConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 重试配置
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub retry_backoff: Backoff,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,

    // 分块配置
    #[serde(default = "default_batch_size_mb")]
    pub batch_size_mb: u64,

    // 网络配置
    #[serde(default)]
    pub request_timeout: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    // 输出配置
    #[serde(default)]
    pub progress_bar: bool,
    #[serde(default)]
    pub log_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_backoff: Backoff::default(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            batch_size_mb: default_batch_size_mb(),
            request_timeout: 0,
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
            progress_bar: false,
            log_dir: String::new(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "chunkcat.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 10] = [
            FieldMeta {
                name: "max_retries",
                description: "每个分块的最大尝试次数",
            },
            FieldMeta {
                name: "retry_backoff",
                description: "重试间隔策略, 可选: [constant, linear, exponential]",
            },
            FieldMeta {
                name: "retry_delay_ms",
                description: "重试基础间隔, 单位ms",
            },
            FieldMeta {
                name: "max_retry_delay_ms",
                description: "重试最大间隔, 单位ms",
            },
            FieldMeta {
                name: "batch_size_mb",
                description: "分块大小, 单位MiB",
            },
            FieldMeta {
                name: "request_timeout",
                description: "单个请求超时时间（秒）, 0 表示不限制",
            },
            FieldMeta {
                name: "connect_timeout",
                description: "连接超时时间（秒）, 0 表示不限制",
            },
            FieldMeta {
                name: "user_agent",
                description: "请求使用的 User-Agent",
            },
            FieldMeta {
                name: "progress_bar",
                description: "是否在 stderr 显示下载进度条",
            },
            FieldMeta {
                name: "log_dir",
                description: "日志文件目录, 留空则只输出到 stderr",
            },
        ];
        &FIELDS
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::Validation(
                "max_retries must be at least 1".to_string(),
            ));
        }
        self.batch_size_bytes().map(|_| ())
    }
}

impl Config {
    pub fn batch_size_bytes(&self) -> Result<u64, ConfigError> {
        if self.batch_size_mb == 0 {
            return Err(ConfigError::Validation(
                "batch_size_mb must be at least 1".to_string(),
            ));
        }
        self.batch_size_mb
            .checked_mul(1 << 20)
            .ok_or_else(|| {
                ConfigError::Validation(format!(
                    "batch_size_mb {} is too large",
                    self.batch_size_mb
                ))
            })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            base_delay: Duration::from_millis(self.retry_delay_ms),
            max_delay: Duration::from_millis(self.max_retry_delay_ms),
            backoff: self.retry_backoff,
        }
    }

    /// 校验后生成一次运行内不变的下载参数。
    pub fn download_settings(&self) -> Result<DownloadSettings, ConfigError> {
        self.validate()?;
        Ok(DownloadSettings {
            batch_size: self.batch_size_bytes()?,
            retry: self.retry_policy(),
        })
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            request_timeout: secs_or_none(self.request_timeout),
            connect_timeout: secs_or_none(self.connect_timeout),
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        let trimmed = self.log_dir.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }
}

fn secs_or_none(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn default_max_retries() -> u32 {
    100
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_max_retry_delay_ms() -> u64 {
    30_000
}

fn default_batch_size_mb() -> u64 {
    16
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("chunkcat/{}", env!("CARGO_PKG_VERSION"))
}
