// 日志初始化 - 同时输出到终端（stderr）和按天轮转的日志文件

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::fmt::writer::MakeWriterExt;

const LOG_FILE_PREFIX: &str = "petvision.log";

/// 默认日志目录
pub fn default_log_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join("Library/Logs/pet-vision")
    } else if cfg!(target_os = "windows") {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata).join("pet-vision").join("logs")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".local/share/pet-vision/logs")
    }
}

/// 初始化日志系统
///
/// 返回的 guard 必须在程序退出前一直持有，否则缓冲中的日志不会写入文件。
/// stdout 留给分析报告，日志只写 stderr。
pub fn init(log_dir: Option<PathBuf>, verbose: bool) -> Result<WorkerGuard> {
    let log_dir = log_dir.unwrap_or_else(default_log_dir);
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("无法创建日志目录: {:?}", log_dir))?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let writer = std::io::stderr.and(non_blocking);

    let timer = LocalTime::new(
        time::format_description::parse(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]",
        )
        .context("日志时间格式无效")?,
    );

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(writer)
        .with_timer(timer)
        .with_ansi(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("日志系统已初始化")?;

    tracing::debug!("日志文件位置: {:?}", log_dir);
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_dir_is_app_specific() {
        let dir = default_log_dir();
        assert!(dir.to_string_lossy().contains("pet-vision"));
    }
}
