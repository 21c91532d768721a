//! tracing 初始化：引擎无界面，日志只写入按天滚动的文件
//!
//! 过滤规则取 `RUST_LOG`，缺省为 `docsearch=info`。

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::kernel::services::adapters::ensure_log_dir;

pub const LOG_FILE_PREFIX: &str = "docsearch.log";
const DEFAULT_FILTER: &str = "docsearch=info";

/// 持有后台写线程；drop 时把缓冲的日志刷到文件
pub struct LoggingGuard {
    _guard: WorkerGuard,
    log_dir: PathBuf,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

fn resolve_log_dir(log_dir: Option<&Path>) -> Option<PathBuf> {
    let preferred = match log_dir {
        Some(dir) => std::fs::create_dir_all(dir).map(|_| dir.to_path_buf()),
        None => ensure_log_dir(),
    };
    preferred
        .or_else(|_| -> std::io::Result<PathBuf> {
            let dir = std::env::temp_dir().join("docsearch").join("logs");
            std::fs::create_dir_all(&dir)?;
            Ok(dir)
        })
        .ok()
}

/// 安装全局 subscriber
///
/// `log_dir` 为 None 时使用缓存目录下的 `.docsearch/logs`；目录不可用时退回临时目录。
/// 已有全局 subscriber 时返回 None。
pub fn init(log_dir: Option<&Path>) -> Option<LoggingGuard> {
    let log_dir = resolve_log_dir(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true),
    );

    if subscriber.try_init().is_err() {
        return None;
    }

    std::panic::set_hook(Box::new(|panic_info| {
        tracing::error!(panic = %panic_info, "panic");
    }));

    tracing::info!(log_dir = %log_dir.display(), "search engine logging initialized");

    Some(LoggingGuard {
        _guard: guard,
        log_dir,
    })
}
