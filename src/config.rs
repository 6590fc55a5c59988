use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{AdjustmentRule, DEFAULT_DELTA_HOURS, DEFAULT_THRESHOLD_HOURS, parse_clock};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse TOML config: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("failed to encode TOML config: {0}")]
    TomlEncode(#[from] toml::ser::Error),
    #[error("invalid default_time '{0}', expected HH:MM")]
    InvalidTime(String),
    #[error("invalid [adjustment]: {0}")]
    InvalidAdjustment(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentConfig {
    pub enabled: bool,
    pub delta_hours: f64,
    pub threshold_hours: f64,
}

impl Default for AdjustmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            delta_hours: DEFAULT_DELTA_HOURS,
            threshold_hours: DEFAULT_THRESHOLD_HOURS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_time: String,
    pub log_level: Option<String>,
    pub adjustment: AdjustmentConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_time: "09:00".to_string(),
            log_level: None,
            adjustment: AdjustmentConfig::default(),
        }
    }
}

impl Config {
    pub fn default_time(&self) -> Result<NaiveTime, ConfigError> {
        parse_clock(self.default_time.trim())
            .ok_or_else(|| ConfigError::InvalidTime(self.default_time.clone()))
    }

    pub fn rule(&self) -> AdjustmentRule {
        AdjustmentRule {
            enabled: self.adjustment.enabled,
            delta_hours: self.adjustment.delta_hours,
            threshold_hours: self.adjustment.threshold_hours,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if raw.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = toml::from_str(&raw)?;
    config.default_time()?;
    config.rule().validate().map_err(ConfigError::InvalidAdjustment)?;
    Ok(config)
}

pub fn save_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
    }

    let body = toml::to_string_pretty(config)?;
    fs::write(path, body).map_err(io_error)
}
