//! Tracing subscriber setup.

use crate::config::LoggingConfig;
use crate::error::{Result, WatchError};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_FILE_PREFIX: &str = "contest-watch.log";

/// Install the global subscriber.
///
/// Logs always go to stderr. When `config.dir` is set, a daily rolling file
/// is written there too; keep the returned guard alive to flush it.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter).with(stderr);

    let Some(dir) = &config.dir else {
        registry
            .try_init()
            .map_err(|e| WatchError::Config(format!("tracing already initialised: {e}")))?;
        return Ok(None);
    };

    std::fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .max_log_files(config.max_files)
        .build(dir)
        .map_err(|e| WatchError::Config(format!("cannot open log dir {}: {e}", dir.display())))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    registry
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .try_init()
        .map_err(|e| WatchError::Config(format!("tracing already initialised: {e}")))?;
    Ok(Some(guard))
}
