use std::path::Path;

use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{Builder, InitError, Rotation};

const LOG_PREFIX: &str = "timediff";
const MAX_LOG_FILES: usize = 5;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log directory: {0}")]
    Appender(#[from] InitError),
    #[error("unknown log level '{0}'")]
    Level(String),
    #[error("logger already installed: {0}")]
    Install(String),
}

pub fn parse_level(raw: &str) -> Result<LevelFilter, LoggingError> {
    raw.trim()
        .parse::<LevelFilter>()
        .map_err(|_| LoggingError::Level(raw.to_string()))
}

/// Sends `tracing` events to a daily rolling file under `state_dir/logs`.
pub fn enable_logging(state_dir: &Path, level: LevelFilter) -> Result<(), LoggingError> {
    let appender = Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(LOG_PREFIX)
        .filename_suffix("log")
        .build(state_dir.join("logs"))?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(format!(
            "{}={level}",
            env!("CARGO_PKG_NAME").replace('-', "_"),
        )))
        .with_writer(appender)
        .with_ansi(false)
        .try_init()
        .map_err(|err| LoggingError::Install(err.to_string()))
}

#[cfg(test)]
mod tests {
    use tracing::level_filters::LevelFilter;

    use super::{LoggingError, parse_level};

    #[test]
    fn parses_levels_case_insensitively() {
        assert_eq!(parse_level("DEBUG").ok(), Some(LevelFilter::DEBUG));
        assert_eq!(parse_level(" warn ").ok(), Some(LevelFilter::WARN));
        assert_eq!(parse_level("off").ok(), Some(LevelFilter::OFF));
        assert!(matches!(parse_level("loud"), Err(LoggingError::Level(_))));
    }
}
