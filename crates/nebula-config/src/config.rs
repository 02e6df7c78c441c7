//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level chunk cache configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Protocol version gates for the chunk wire format.
    pub protocol: ProtocolConfig,
    /// Compression settings for cached chunk packets.
    pub compression: CompressionConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Minimum protocol versions at which optional wire features appear.
///
/// A client speaking protocol `p` gets a feature iff `p >= gate`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProtocolConfig {
    /// First protocol whose compressed batches start with the compressor's
    /// network id byte.
    pub compression_prefix_min: u32,
    /// First protocol whose level chunk packet carries a dimension id.
    pub dimension_field_min: u32,
    /// Protocol used when no client protocol is known (inspection tooling).
    pub default_protocol: u32,
}

impl ProtocolConfig {
    /// Whether batches for `protocol` carry the compression algorithm byte.
    pub fn has_compression_prefix(&self, protocol: u32) -> bool {
        protocol >= self.compression_prefix_min
    }

    /// Whether level chunk packets for `protocol` carry the dimension id.
    pub fn has_dimension_field(&self, protocol: u32) -> bool {
        protocol >= self.dimension_field_min
    }
}

/// Compression algorithm used for cached chunk batches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CompressionAlgorithm {
    /// LZ4 block compression with the uncompressed size prepended.
    #[default]
    Lz4,
    /// Pass-through; batches are sent as-is.
    None,
}

impl std::str::FromStr for CompressionAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lz4" => Ok(Self::Lz4),
            "none" | "noop" => Ok(Self::None),
            other => Err(format!("unknown compression algorithm: {other}")),
        }
    }
}

/// Compression configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompressionConfig {
    /// Algorithm applied to both cached encodings.
    pub algorithm: CompressionAlgorithm,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            compression_prefix_min: 671,
            dimension_field_min: 649,
            default_protocol: 671,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let config = read_config(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let config_path = config_dir.join("config.ron");
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::Write {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = read_config(&config_dir.join("config.ron"))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&contents).map_err(ConfigError::Parse)
}
