//! Configuration loading and types.
//!
//! Configuration is read once from a YAML file at startup and handed
//! around as an `Arc<Config>` -- `spec.md` §9 design note: "values such
//! as the windowed fetch count and the 1000-item cap are process-wide
//! read-only state: load once at startup, pass via an immutable
//! configuration handle, never mutate."

use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Action dispatch core settings (`spec.md` §5 "Shared-resource policy").
    #[serde(default)]
    pub action: ActionConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Action dispatch core configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    /// Window size for the delete-multi windowed KV fetch
    /// (`spec.md` §4.4.1 `fetch_objects_info`).
    #[serde(default = "default_index_fetch_count")]
    pub index_fetch_count: usize,

    /// Maximum number of keys accepted in one delete-multi request
    /// (`spec.md` §4.4.1 `validate_request`; fixed at 1000 in the source,
    /// exposed here as configuration per `SPEC_FULL.md` §2.2).
    #[serde(default = "default_max_delete_keys")]
    pub max_delete_keys: usize,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            index_fetch_count: default_index_fetch_count(),
            max_delete_keys: default_max_delete_keys(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9012
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_index_fetch_count() -> usize {
    100
}

fn default_max_delete_keys() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Loader ------------------------------------------------------------------

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_yaml::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_cap() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.action.max_delete_keys, 1000);
        assert_eq!(config.action.index_fetch_count, 100);
    }
}
