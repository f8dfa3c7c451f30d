//! Adapter configuration loader.
//!
//! Reads a `flowguard.toml` and deserializes it into [`AdapterConfig`].
//! Falls back to defaults when the file is missing or malformed.

use std::path::Path;

use flowguard_types::config::AdapterConfig;

/// Conventional file name inside a data directory.
pub const CONFIG_FILE_NAME: &str = "flowguard.toml";

/// Load adapter configuration from `path`.
///
/// - If the file does not exist, returns [`AdapterConfig::default()`].
/// - If the file exists but cannot be read or parsed, logs a warning and
///   returns the default.
pub async fn load_adapter_config(path: &Path) -> AdapterConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            return AdapterConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return AdapterConfig::default();
        }
    };

    match toml::from_str::<AdapterConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            AdapterConfig::default()
        }
    }
}

/// Load `{data_dir}/flowguard.toml`.
pub async fn load_adapter_config_from_dir(data_dir: &Path) -> AdapterConfig {
    load_adapter_config(&data_dir.join(CONFIG_FILE_NAME)).await
}
