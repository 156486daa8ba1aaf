use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::kernel::services::adapters::settings::ensure_log_dir;

pub const DEFAULT_FILTER: &str = "codepad=info";
const LOG_FILE_PREFIX: &str = "codepad.log";

/// Keeps the non-blocking writer alive; dropping it flushes pending lines.
pub struct LoggingGuard {
    _guard: WorkerGuard,
    log_dir: PathBuf,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

/// Installs the global subscriber: daily rolling file under `log_dir` (the
/// app data `logs/` dir when `None`), filtered by `RUST_LOG` or
/// `default_filter`.
///
/// `None` if no log directory is usable or a subscriber is already set.
pub fn init(log_dir: Option<&Path>, default_filter: Option<&str>) -> Option<LoggingGuard> {
    let log_dir = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).ok()?;
            dir.to_path_buf()
        }
        None => ensure_log_dir()
            .or_else(|_| -> std::io::Result<PathBuf> {
                let dir = std::env::temp_dir().join("codepad").join("logs");
                std::fs::create_dir_all(&dir)?;
                Ok(dir)
            })
            .ok()?,
    };

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_filter = default_filter.unwrap_or(DEFAULT_FILTER);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

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

    tracing::info!(log_dir = %log_dir.display(), "tracing initialized");

    Some(LoggingGuard {
        _guard: guard,
        log_dir,
    })
}
