use std::path::PathBuf;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::{GateError, Result};

const DEFAULT_LOG_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "push_hook_gate";

/// Daily rotated log files under a single directory
pub struct FileLogger {
    log_directory: PathBuf,
}

impl FileLogger {
    pub fn new(log_directory: PathBuf) -> Self {
        Self { log_directory }
    }

    /// Creates the log directory and a non-blocking rolling file writer.
    /// The guard must be kept alive for buffered lines to be flushed.
    pub fn setup_file_logging(&self) -> Result<(NonBlocking, WorkerGuard)> {
        std::fs::create_dir_all(&self.log_directory).map_err(|e| {
            GateError::ConfigError(format!(
                "Failed to create log directory {:?}: {}",
                self.log_directory, e
            ))
        })?;

        let file_appender =
            RollingFileAppender::new(Rotation::DAILY, &self.log_directory, LOG_FILE_PREFIX);
        Ok(tracing_appender::non_blocking(file_appender))
    }
}

/// Console logging filtered by `RUST_LOG`, plus a plain-text rolling file when
/// a log directory is given.
pub fn setup_logging(file_logger: Option<&FileLogger>) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (file_layer, guard) = match file_logger {
        Some(logger) => {
            let (writer, guard) = logger.setup_file_logging()?;
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}
