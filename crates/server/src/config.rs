//! Server configuration

use anyhow::Result;
use capacity_lib::EngineConfig;
use serde::Deserialize;
use tracing::warn;

/// Environment variable naming an optional config file
pub const CONFIG_FILE_ENV: &str = "CAPACITY_CONFIG";

/// Server configuration
///
/// Read from the optional file named by `CAPACITY_CONFIG`, then overridden
/// by `CAPACITY_*` environment variables (`__` separates nested keys, e.g.
/// `CAPACITY_ENGINE__CRITICAL_UTILIZATION_PCT=85`).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory of `<YYYY-MM-DD>.json` snapshots and `tenant_mappings.json`
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,

    /// Budget for fetching one report's inputs
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Failed source fetches in a row before `/readyz` reports not ready
    #[serde(default = "default_source_failure_threshold")]
    pub source_failure_threshold: u32,

    /// Name attached to structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_api_port() -> u16 {
    8080
}

fn default_snapshot_dir() -> String {
    "./data/snapshots".to_string()
}

fn default_fetch_timeout_ms() -> u64 {
    5_000
}

fn default_source_failure_threshold() -> u32 {
    capacity_lib::health::DEFAULT_SOURCE_FAILURE_THRESHOLD
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "capacity-server".to_string())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            snapshot_dir: default_snapshot_dir(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            source_failure_threshold: default_source_failure_threshold(),
            instance_name: default_instance_name(),
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            builder = builder.add_source(config::File::with_name(&path).required(false));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("CAPACITY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid server configuration, using defaults");
            ServerConfig::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.fetch_timeout_ms, 5_000);
        assert_eq!(config.source_failure_threshold, 3);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("capacity.json");
        std::fs::write(
            &path,
            r#"{"api_port": 9100, "engine": {"warning_utilization_pct": 65.0}}"#,
        )
        .unwrap();

        let config: ServerConfig = config::Config::builder()
            .add_source(config::File::from(path.as_path()))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.api_port, 9100);
        assert_eq!(config.snapshot_dir, "./data/snapshots");
        assert_eq!(config.engine.warning_utilization_pct, 65.0);
        assert_eq!(config.engine.critical_utilization_pct, 80.0);
    }
}
