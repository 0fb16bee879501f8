use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

const DEFAULT_CONFIG: &str = include_str!("default.toml");

/// The prefix of environment variables that override the default configuration.
/// A double underscore separates nested keys, e.g. `REJOIN__RESTART__RECOVERY_TIMEOUT_SECS`.
pub const CONFIG_ENV_PREFIX: &str = "REJOIN__";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub telemetry: TelemetryConfig,
    pub restart: RestartConfig,
}

impl AppConfig {
    pub fn load() -> CommonResult<Self> {
        Figment::from(Toml::string(DEFAULT_CONFIG))
            .admerge(Env::prefixed(CONFIG_ENV_PREFIX).map(|p| p.as_str().replace("__", ".").into()))
            .extract()
            .map_err(|e| CommonError::InvalidArgument(e.to_string()))
    }

    /// Loads the configuration from the defaults overridden by a TOML document
    /// instead of the process environment.
    pub fn load_from_toml(overrides: &str) -> CommonResult<Self> {
        Figment::from(Toml::string(DEFAULT_CONFIG))
            .admerge(Toml::string(overrides))
            .extract()
            .map_err(|e| CommonError::InvalidArgument(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub default_log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartConfig {
    pub recovery_timeout_secs: u64,
    pub preserver: PreserverConfig,
    pub detector: DetectorConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreserverKind {
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreserverConfig {
    pub kind: PreserverKind,
    /// The path of the evaluator change log, required for the file preserver.
    #[serde(deserialize_with = "deserialize_non_empty_string")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorKind {
    Local,
    Container,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub kind: DetectorKind,
    /// The environment variable holding the container identity of the driver process.
    pub container_id_env: String,
}

pub fn deserialize_non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if value.is_empty() {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() -> CommonResult<()> {
        let config = AppConfig::load_from_toml("")?;
        assert_eq!(config.telemetry.default_log_level, "info");
        assert_eq!(config.restart.recovery_timeout_secs, 0);
        assert_eq!(config.restart.preserver.kind, PreserverKind::Memory);
        assert_eq!(config.restart.preserver.path, None);
        assert_eq!(config.restart.detector.kind, DetectorKind::Local);
        assert_eq!(config.restart.detector.container_id_env, "CONTAINER_ID");
        Ok(())
    }

    #[test]
    fn test_config_overrides() -> CommonResult<()> {
        let config = AppConfig::load_from_toml(
            r#"
            [restart]
            recovery_timeout_secs = 30

            [restart.preserver]
            kind = "file"
            path = "/var/lib/driver/evaluators.log"

            [restart.detector]
            kind = "container"
            "#,
        )?;
        assert_eq!(config.restart.recovery_timeout_secs, 30);
        assert_eq!(config.restart.preserver.kind, PreserverKind::File);
        assert_eq!(
            config.restart.preserver.path.as_deref(),
            Some("/var/lib/driver/evaluators.log")
        );
        assert_eq!(config.restart.detector.kind, DetectorKind::Container);
        assert_eq!(config.restart.detector.container_id_env, "CONTAINER_ID");
        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        let result = AppConfig::load_from_toml(
            r#"
            [restart.preserver]
            kind = "zookeeper"
            "#,
        );
        assert!(matches!(result, Err(CommonError::InvalidArgument(_))));
    }
}
