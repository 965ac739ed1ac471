//! Subscriber setup for the simulation binary and embedding hosts.
//!
//! The library itself only emits `tracing` events; nothing here runs unless a
//! host asks for it.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::EngineConfig;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("cannot create log directory {dir}: {source}")]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// Flushes the background file writer on drop. Hold it until exit.
#[derive(Debug)]
pub struct LogGuard {
    file: Option<WorkerGuard>,
}

impl LogGuard {
    pub fn writes_file(&self) -> bool {
        self.file.is_some()
    }
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber described by `config`.
///
/// Always logs to stdout. With `log_dir` set, also writes a daily rolling
/// `log_file_prefix` file there. The directory is created before anything is
/// installed, so on `CreateDir` the caller can retry without file logging.
pub fn init_tracing(config: &EngineConfig) -> Result<LogGuard, LoggingError> {
    let filter = env_filter(&config.log_level);
    let stdout_layer = fmt::layer().with_target(true);

    let Some(dir) = &config.log_dir else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .try_init()
            .map_err(|_| LoggingError::AlreadyInstalled)?;
        return Ok(LogGuard { file: None });
    };

    std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
        dir: dir.clone(),
        source,
    })?;

    let appender = RollingFileAppender::new(Rotation::DAILY, dir, &config.log_file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)?;

    Ok(LogGuard { file: Some(guard) })
}
