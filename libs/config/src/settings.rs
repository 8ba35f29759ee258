//! Runtime Configuration
//!
//! Loads node settings from a TOML file, then applies environment
//! overrides. Every field has a default, so a file only needs the values
//! it changes.
//!
//! Environment variables use the `MAILROOM_` prefix and `__` between
//! nested keys, e.g. `MAILROOM_NETWORK__MAX_FRAME_SIZE=65536`.

use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::logging::LoggingConfig;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "MAILROOM";

/// Main runtime configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Human-readable name of this node, used in logs
    pub node_name: String,
    pub logging: LoggingConfig,
    pub mailbox: MailboxSettings,
    pub network: NetworkSettings,
}

/// Mailbox sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxSettings {
    /// Normal-priority envelopes a mailbox holds before refusing more
    pub capacity: usize,
}

/// Protocol stack limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub max_frame_size: usize,
    pub write_high_watermark: usize,
    pub read_chunk_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            node_name: "node".to_string(),
            logging: LoggingConfig::default(),
            mailbox: MailboxSettings::default(),
            network: NetworkSettings::default(),
        }
    }
}

impl Default for MailboxSettings {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024, // 16MB
            write_high_watermark: 1024 * 1024, // 1MB
            read_chunk_size: 64 * 1024,       // 64KB
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from an optional file with environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading runtime config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        // Override with environment variables (MAILROOM_ prefix)
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: RuntimeConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        debug!(node = %config.node_name, "Runtime config loaded");
        Ok(config)
    }

    /// Check cross-field constraints the types cannot express
    pub fn validate(&self) -> Result<()> {
        if self.node_name.trim().is_empty() {
            bail!("node_name cannot be empty");
        }
        if self.mailbox.capacity == 0 {
            bail!("mailbox.capacity cannot be zero");
        }
        self.network.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

impl NetworkSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_frame_size == 0 {
            bail!("network.max_frame_size cannot be zero");
        }
        if self.max_frame_size > u32::MAX as usize {
            bail!(
                "network.max_frame_size {} does not fit a 4-byte length prefix",
                self.max_frame_size
            );
        }
        if self.write_high_watermark == 0 {
            bail!("network.write_high_watermark cannot be zero");
        }
        if self.read_chunk_size == 0 {
            bail!("network.read_chunk_size cannot be zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("node.toml");

        let config_content = r#"
node_name = "edge-1"

[logging]
level = "debug,network=trace"
format = "json"

[network]
max_frame_size = 65536
"#;

        fs::write(&config_path, config_content).unwrap();

        let config = RuntimeConfig::load(Some(&config_path)).unwrap();

        assert_eq!(config.node_name, "edge-1");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.network.max_frame_size, 65536);
        assert_eq!(
            config.network.write_high_watermark,
            NetworkSettings::default().write_high_watermark
        );
    }

    #[test]
    fn test_environment_override() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("node.toml");
        fs::write(&config_path, "[mailbox]\ncapacity = 8\n").unwrap();

        std::env::set_var("MAILROOM_MAILBOX__CAPACITY", "77");
        let config = RuntimeConfig::load(Some(&config_path));
        std::env::remove_var("MAILROOM_MAILBOX__CAPACITY");

        assert_eq!(config.unwrap().mailbox.capacity, 77);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(RuntimeConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_validation_rejects_zero_limits() {
        let mut config = RuntimeConfig::default();
        config.validate().unwrap();

        config.network.write_high_watermark = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("write_high_watermark"));

        let config = RuntimeConfig {
            node_name: "  ".into(),
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialized_defaults_load_back() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("defaults.toml");
        let defaults = RuntimeConfig {
            node_name: "roundtrip".into(),
            ..RuntimeConfig::default()
        };
        fs::write(&config_path, toml::to_string(&defaults).unwrap()).unwrap();

        let loaded = RuntimeConfig::load(Some(&config_path)).unwrap();
        assert_eq!(loaded.node_name, "roundtrip");
        assert_eq!(loaded.network, defaults.network);
        assert_eq!(loaded.logging, defaults.logging);
    }
}
