use std::path::PathBuf;
use std::sync::Mutex;

use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};
use serde::{Deserialize, Serialize};

static LOGGER: Mutex<Option<LoggerHandle>> = Mutex::new(None);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter spec, e.g. `"info"` or `"opgraph=trace,warn"`. `RUST_LOG` wins when set.
    pub level: String,
    /// Rotated log files are written here; `None` logs to stderr only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// Starts the global logger. Later calls, including concurrent ones, keep the
/// first logger and return `Ok`.
pub fn setup_logging(config: &LogConfig) -> anyhow::Result<()> {
    let mut logger_handle = LOGGER
        .lock()
        .map_err(|_| anyhow::anyhow!("Logger setup lock is poisoned"))?;
    if logger_handle.is_some() {
        return Ok(());
    }

    let logger = Logger::try_with_env_or_str(&config.level)?;
    let logger = match &config.directory {
        Some(directory) => logger
            .log_to_file(FileSpec::default().directory(directory))
            .duplicate_to_stderr(Duplicate::Warn)
            .rotate(
                Criterion::Size(1024 * 1024), //1MB
                Naming::Timestamps,
                Cleanup::KeepLogFiles(5),
            ),
        None => logger.log_to_stderr(),
    };

    *logger_handle = Some(logger.start()?);
    log::debug!("Logging started with level {}", config.level);

    Ok(())
}
