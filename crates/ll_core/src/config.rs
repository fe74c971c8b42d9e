//! Config loading: TOML file, then environment overrides.

use crate::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "logic-looper.toml";

pub const ENV_LOCAL_DB: &str = "LL_LOCAL_DB";
pub const ENV_SERVER_DB: &str = "LL_SERVER_DB";
pub const ENV_LOG: &str = "LL_LOG";
pub const ENV_LOG_FORMAT: &str = "LL_LOG_FORMAT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub gameplay: GameplayConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub local_db_path: PathBuf,
    pub server_db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_db_path: PathBuf::from(".logic-looper/local.sqlite"),
            server_db_path: PathBuf::from(".logic-looper/server.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" => Some(LogFormat::Plain),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive string.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Plain,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayConfig {
    pub win_score: i64,
    pub default_time_taken_secs: i64,
    pub difficulty: String,
    pub max_hints_per_day: u32,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            win_score: 100,
            default_time_taken_secs: 60,
            difficulty: "Medium".to_string(),
            max_hints_per_day: 3,
        }
    }
}

fn config_error(message: &str, details: serde_json::Value) -> AppError {
    AppError::new("LL_CONFIG_INVALID", "config", message, false, details)
}

pub fn parse_config(contents: &str) -> AppResult<AppConfig> {
    toml::from_str(contents).map_err(|e| {
        config_error(
            "failed to parse config toml",
            serde_json::json!({ "error": e.to_string() }),
        )
    })
}

pub fn load_config_file(path: &Path) -> AppResult<AppConfig> {
    let contents = fs::read_to_string(path).map_err(|e| {
        config_error(
            "failed to read config file",
            serde_json::json!({ "error": e.to_string(), "path": path }),
        )
    })?;
    parse_config(&contents)
}

/// An explicit path must exist. Without one, `./logic-looper.toml` is used when present
/// and defaults otherwise. Environment overrides apply last.
pub fn load_config(path: Option<&Path>) -> AppResult<AppConfig> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE_NAME);
            if default_path.exists() {
                load_config_file(default_path)?
            } else {
                AppConfig::default()
            }
        }
    };
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

pub fn apply_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(path) = lookup(ENV_LOCAL_DB).filter(|v| !v.trim().is_empty()) {
        config.storage.local_db_path = PathBuf::from(path);
    }
    if let Some(path) = lookup(ENV_SERVER_DB).filter(|v| !v.trim().is_empty()) {
        config.storage.server_db_path = PathBuf::from(path);
    }
    if let Some(filter) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) {
        config.logging.filter = filter;
    }
    if let Some(raw) = lookup(ENV_LOG_FORMAT) {
        match LogFormat::parse(&raw) {
            Some(format) => config.logging.format = format,
            None => tracing::warn!(value = %raw, "ignoring unknown {}", ENV_LOG_FORMAT),
        }
    }
}
