//! 下载流程模块入口。
//!
//! 子模块：
//! - `models`     ：数据模型（ResourceDescriptor / ChunkRange / DownloadSettings 等）
//! - `plan`       ：分块计划
//! - `fetcher`    ：带重试的分块请求
//! - `progress`   ：进度上报与 CLI 进度条
//! - `downloader` ：单个资源的下载状态机
//! - `manifest`   ：清单解析
//! - `driver`     ：按清单顺序驱动整次运行

pub mod downloader;
pub mod driver;
pub mod fetcher;
pub mod manifest;
pub mod models;
pub mod plan;
pub mod progress;
