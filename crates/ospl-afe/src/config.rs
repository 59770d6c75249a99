use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AfeError, Result};

/// Number of external configurations for the RX module.
pub const RX_CONFIG_COUNT: usize = 3;
/// Number of external configurations for the TX module.
pub const TX_CONFIG_COUNT: usize = 1;
/// Total cached external configurations (RX slots first, then TX).
pub const CONFIG_SLOTS: usize = RX_CONFIG_COUNT + TX_CONFIG_COUNT;

/// Logical firmware names of the external configurations, in slot order.
pub const DEFAULT_CONFIG_NAMES: [&str; CONFIG_SLOTS] = [
    "opalum.rx.ext.config.0",
    "opalum.rx.ext.config.1",
    "opalum.rx.ext.config.2",
    "opalum.tx.ext.config.0",
];

/// Default bound on a get round trip.
pub const DEFAULT_GET_TIMEOUT_MS: u64 = 300;

/// Default cap on a single configuration blob: 1 MiB.
pub const DEFAULT_MAX_CONFIG_SIZE: usize = 1024 * 1024;

/// Protocol engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AfeConfig {
    /// Maximum wait for a get response, in milliseconds.
    pub get_timeout_ms: u64,
    /// Only accept a get response whose parameter id matches the pending request.
    pub strict_correlation: bool,
    /// Firmware names of the four external configurations.
    pub config_names: [String; CONFIG_SLOTS],
    /// Maximum bytes accepted per configuration blob.
    pub max_config_size: usize,
    /// Directory the configuration blobs are read from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware_dir: Option<PathBuf>,
}

impl Default for AfeConfig {
    fn default() -> Self {
        Self {
            get_timeout_ms: DEFAULT_GET_TIMEOUT_MS,
            strict_correlation: false,
            config_names: DEFAULT_CONFIG_NAMES.map(str::to_string),
            max_config_size: DEFAULT_MAX_CONFIG_SIZE,
            firmware_dir: None,
        }
    }
}

impl AfeConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Get round-trip bound.
    pub fn get_timeout(&self) -> Duration {
        Duration::from_millis(self.get_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.get_timeout_ms == 0 {
            return Err(AfeError::InvalidConfig(
                "get_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_config_size == 0 {
            return Err(AfeError::InvalidConfig(
                "max_config_size must be greater than zero".to_string(),
            ));
        }
        if let Some(name) = self.config_names.iter().find(|name| !is_valid_name(name)) {
            return Err(AfeError::InvalidConfig(format!(
                "invalid config name '{name}'"
            )));
        }
        Ok(())
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && name != "."
        && name != ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_peripheral_layout() {
        let config = AfeConfig::default();
        assert_eq!(config.get_timeout(), Duration::from_millis(300));
        assert!(!config.strict_correlation);
        assert_eq!(config.config_names[0], "opalum.rx.ext.config.0");
        assert_eq!(config.config_names[3], "opalum.tx.ext.config.0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_partial_json_with_defaults() {
        let config =
            AfeConfig::from_json_str(r#"{"get_timeout_ms": 50, "strict_correlation": true}"#)
                .unwrap();
        assert_eq!(config.get_timeout(), Duration::from_millis(50));
        assert!(config.strict_correlation);
        assert_eq!(config.max_config_size, DEFAULT_MAX_CONFIG_SIZE);
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = AfeConfig::from_json_str(r#"{"get_timeout_ms": 0}"#).unwrap_err();
        assert!(matches!(err, AfeError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = AfeConfig::from_json_str(r#"{"timeout": 5}"#).unwrap_err();
        assert!(matches!(err, AfeError::Json(_)));
    }

    #[test]
    fn rejects_path_like_names() {
        let mut config = AfeConfig::default();
        config.config_names[1] = "../secret".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn serializes_roundtrip_through_file() {
        let dir = std::env::temp_dir().join(format!(
            "ospl-config-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let path = dir.join("afe.json");

        let config = AfeConfig {
            firmware_dir: Some(dir.clone()),
            ..AfeConfig::default()
        };
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let loaded = AfeConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
