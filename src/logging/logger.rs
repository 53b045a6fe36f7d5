use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::notify::Notification;

const LOG_FILE_NAME: &str = "moonbid.log";

/// Used when `RUST_LOG` is unset; HTTP internals are only interesting when debugging
const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn";

/// Install console and daily-rolling file logging
///
/// The returned guard flushes the file writer on drop; keep it alive in `main`.
pub fn init_logger() -> Result<WorkerGuard> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {:?}", log_dir))?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter())
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(true)
                .with_target(false),
        )
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::info!("Logger initialized, writing to {:?}", log_dir.join(LOG_FILE_NAME));
    Ok(guard)
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Logs go next to the executable so parallel instances keep separate logs
fn log_dir() -> PathBuf {
    match std::env::current_exe() {
        Ok(exe_path) => exe_dir_of(&exe_path),
        Err(e) => {
            eprintln!("Warning: Could not get executable path ({}), using current directory", e);
            PathBuf::from(".")
        }
    }
}

fn exe_dir_of(exe_path: &Path) -> PathBuf {
    exe_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Write a user-facing notification to the log
pub fn print_notification(notification: &Notification) {
    if notification.is_failure() {
        tracing::warn!("[Notice] {}: {}", notification.title(), notification.description());
    } else {
        tracing::info!("[Notice] {}: {}", notification.title(), notification.description());
    }
}
