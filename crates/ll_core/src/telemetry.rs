use crate::app_error::{AppError, AppResult};
use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Logs go to stderr so command output on stdout stays
/// machine-readable.
pub fn init(config: &LoggingConfig) -> AppResult<()> {
    let filter = EnvFilter::try_new(&config.filter).map_err(|e| {
        AppError::new(
            "LL_CONFIG_INVALID",
            "config",
            "invalid log filter",
            false,
            serde_json::json!({ "error": e.to_string(), "filter": config.filter }),
        )
    })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let installed = match config.format {
        LogFormat::Plain => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| {
        AppError::new(
            "LL_TELEMETRY_INIT_FAILED",
            "internal",
            "failed to install tracing subscriber",
            false,
            serde_json::json!({ "error": e.to_string() }),
        )
    })
}
