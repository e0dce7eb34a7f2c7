use std::{fmt::Display, str::FromStr, time::Duration};

use crate::StreamError;

/// Byte order for multi-byte numeric reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endian {
    /// Most significant byte first.
    #[default]
    Big,
    /// Least significant byte first.
    Little,
}

impl Display for Endian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Big => f.write_str("bigEndian"),
            Self::Little => f.write_str("littleEndian"),
        }
    }
}

impl FromStr for Endian {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "big" | "bigendian" | "be" => Ok(Self::Big),
            "little" | "littleendian" | "le" => Ok(Self::Little),
            _ => Err(StreamError::InvalidEndian(s.to_owned())),
        }
    }
}

/// Settings applied to newly created streams.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    /// Length of a fresh stream, zero filled
    pub initial_capacity: usize,

    /// Byte order of numeric reads and writes
    pub endian: Endian,

    /// Opaque encoding tag, carried but never interpreted
    pub object_encoding: i32,

    /// Deflate/zlib level (0-9)
    pub compression_level: u32,

    /// Deadline for one compress/uncompress call
    pub compression_timeout: Option<Duration>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
            endian: Endian::Big,
            object_encoding: -1,
            compression_level: 6,
            compression_timeout: None,
        }
    }
}

impl Display for StreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let timeout_display = match self.compression_timeout {
            Some(duration) => format!("{:.2}s", duration.as_secs_f64()),
            None => "unlimited".to_string(),
        };

        write!(
            f,
            "StreamConfig {{ initial_capacity: {}, endian: {}, object_encoding: {}, compression_level: {}, compression_timeout: {} }}",
            self.initial_capacity,
            self.endian,
            self.object_encoding,
            self.compression_level,
            timeout_display
        )
    }
}

impl StreamConfig {
    pub fn builder() -> StreamConfigBuilder {
        StreamConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StreamConfigBuilder {
    config: StreamConfig,
}

impl StreamConfigBuilder {
    pub fn initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.config.initial_capacity = initial_capacity;
        self
    }

    pub fn endian(mut self, endian: Endian) -> Self {
        self.config.endian = endian;
        self
    }

    pub fn object_encoding(mut self, object_encoding: i32) -> Self {
        self.config.object_encoding = object_encoding;
        self
    }

    pub fn compression_level(mut self, compression_level: u32) -> Self {
        self.config.compression_level = compression_level.min(9);
        self
    }

    pub fn compression_timeout(mut self, compression_timeout: Duration) -> Self {
        self.config.compression_timeout = Some(compression_timeout);
        self
    }

    pub fn compression_timeout_ms(mut self, compression_timeout_ms: u64) -> Self {
        if compression_timeout_ms > 0 {
            self.config.compression_timeout = Some(Duration::from_millis(compression_timeout_ms));
        }
        self
    }

    pub fn build(self) -> StreamConfig {
        self.config
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.initial_capacity, 1024);
        assert_eq!(config.endian, Endian::Big);
        assert_eq!(config.object_encoding, -1);
        assert_eq!(config.compression_timeout, None);
        assert_eq!(
            config.to_string(),
            "StreamConfig { initial_capacity: 1024, endian: bigEndian, object_encoding: -1, compression_level: 6, compression_timeout: unlimited }"
        );
    }

    #[test]
    fn test_builder() {
        let config = StreamConfig::builder()
            .initial_capacity(32)
            .endian(Endian::Little)
            .compression_level(12)
            .compression_timeout_ms(0)
            .build();

        assert_eq!(config.initial_capacity, 32);
        assert_eq!(config.endian, Endian::Little);
        assert_eq!(config.compression_level, 9);
        assert_eq!(config.compression_timeout, None);

        let config = StreamConfig::builder().compression_timeout_ms(1500).build();
        assert!(config.to_string().contains("compression_timeout: 1.50s"));
    }

    #[test]
    fn test_endian_parse() {
        assert_eq!("LE".parse::<Endian>().unwrap(), Endian::Little);
        assert_eq!("bigEndian".parse::<Endian>().unwrap(), Endian::Big);
        assert!("middle".parse::<Endian>().is_err());
    }
}
