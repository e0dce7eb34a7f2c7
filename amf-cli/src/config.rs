use anyhow::{Context, Result};
use bytearray::{Endian, StreamConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Byte order for streams ("big" or "little")
    pub endian: String,

    /// Initial length of freshly created streams
    pub initial_capacity: usize,

    /// Deflate/zlib level (0-9)
    pub compression_level: u32,

    /// Deadline for one compress/uncompress call in milliseconds (0 = none)
    pub compression_timeout_ms: u64,

    /// Pretty-print decoded JSON by default
    pub pretty: bool,

    /// Encode JSON arrays as strict arrays by default
    pub strict_arrays: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let stream = StreamConfig::default();
        Self {
            endian: "big".to_string(),
            initial_capacity: stream.initial_capacity,
            compression_level: stream.compression_level,
            compression_timeout_ms: 0,
            pretty: false,
            strict_arrays: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults when no
    /// path is given or the file does not exist.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)
                    .context("Failed to read configuration file")?;
                toml::from_str(&content).context("Failed to parse configuration file")
            }
            _ => Ok(Self::default()),
        }
    }

    /// Stream settings derived from this configuration
    pub fn stream_config(&self) -> Result<StreamConfig> {
        let endian: Endian = self
            .endian
            .parse()
            .with_context(|| format!("Invalid endian in configuration: {}", self.endian))?;

        Ok(StreamConfig::builder()
            .initial_capacity(self.initial_capacity)
            .endian(endian)
            .compression_level(self.compression_level)
            .compression_timeout_ms(self.compression_timeout_ms)
            .build())
    }

    /// Show current configuration as a formatted string
    pub fn show(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration for display")
    }
}
