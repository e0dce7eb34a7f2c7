//! Whole-buffer compression transforms.
//!
//! Raw deflate and zlib are backed by `flate2`, LZMA ("alone" format) by
//! `lzma-rs`. Every transform is synchronous. When a deadline is configured
//! the transform runs on a helper thread and the caller waits on a bounded
//! channel; if the deadline passes the result is discarded.

use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use flate2::Compression;
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::{DeflateEncoder, ZlibEncoder};
use tracing::debug;

use crate::StreamError;

/// Compression algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CompressionAlgorithm {
    /// Raw deflate stream, no header.
    Deflate = 0,
    /// LZMA "alone" stream.
    Lzma = 1,
    /// Deflate wrapped in a zlib header and checksum.
    #[default]
    Zlib = 2,
}

impl CompressionAlgorithm {
    /// Lowercase name, as accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            Self::Deflate => "deflate",
            Self::Lzma => "lzma",
            Self::Zlib => "zlib",
        }
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for CompressionAlgorithm {
    type Error = StreamError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Deflate),
            1 => Ok(Self::Lzma),
            2 => Ok(Self::Zlib),
            other => Err(StreamError::UnsupportedAlgorithm(other)),
        }
    }
}

impl FromStr for CompressionAlgorithm {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deflate" | "raw-deflate" => Ok(Self::Deflate),
            "lzma" => Ok(Self::Lzma),
            "zlib" => Ok(Self::Zlib),
            _ => Err(StreamError::UnknownAlgorithm(s.to_owned())),
        }
    }
}

/// Compress `data` in one shot. `level` is 0-9; LZMA ignores it.
pub fn compress(data: &[u8], algorithm: CompressionAlgorithm, level: u32) -> io::Result<Vec<u8>> {
    let level = Compression::new(level.min(9));
    match algorithm {
        CompressionAlgorithm::Deflate => {
            let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len() / 2), level);
            encoder.write_all(data)?;
            encoder.finish()
        }
        CompressionAlgorithm::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), level);
            encoder.write_all(data)?;
            encoder.finish()
        }
        CompressionAlgorithm::Lzma => {
            let mut input = data;
            let mut output = Vec::with_capacity(data.len() / 2);
            lzma_rs::lzma_compress(&mut input, &mut output)?;
            Ok(output)
        }
    }
}

/// Decompress `data` in one shot.
pub fn decompress(data: &[u8], algorithm: CompressionAlgorithm) -> io::Result<Vec<u8>> {
    let mut output = Vec::with_capacity(data.len() * 2);
    match algorithm {
        CompressionAlgorithm::Deflate => {
            DeflateDecoder::new(data).read_to_end(&mut output)?;
        }
        CompressionAlgorithm::Zlib => {
            ZlibDecoder::new(data).read_to_end(&mut output)?;
        }
        CompressionAlgorithm::Lzma => {
            let mut input = data;
            lzma_rs::lzma_decompress(&mut input, &mut output)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        }
    }
    Ok(output)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Compress,
    Decompress,
}

/// Compression settings carried by a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compressor {
    /// Algorithm to apply.
    pub algorithm: CompressionAlgorithm,
    /// Deflate/zlib level, 0-9.
    pub level: u32,
    /// Deadline for one transform. `None` runs inline without a deadline.
    pub timeout: Option<Duration>,
}

impl Compressor {
    /// Settings for `algorithm` with level 6 and no deadline.
    pub const fn new(algorithm: CompressionAlgorithm) -> Self {
        Self {
            algorithm,
            level: 6,
            timeout: None,
        }
    }

    /// Compress `data`.
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, StreamError> {
        self.run(data, Direction::Compress)
    }

    /// Decompress `data`.
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, StreamError> {
        self.run(data, Direction::Decompress)
    }

    fn apply(
        data: &[u8],
        algorithm: CompressionAlgorithm,
        level: u32,
        direction: Direction,
    ) -> io::Result<Vec<u8>> {
        match direction {
            Direction::Compress => compress(data, algorithm, level),
            Direction::Decompress => decompress(data, algorithm),
        }
    }

    fn run(&self, data: &[u8], direction: Direction) -> Result<Vec<u8>, StreamError> {
        let algorithm = self.algorithm;
        let level = self.level;
        let wrap = |source: io::Error| StreamError::Compression { algorithm, source };

        let Some(timeout) = self.timeout else {
            return Self::apply(data, algorithm, level, direction).map_err(wrap);
        };

        let (tx, rx) = crossbeam_channel::bounded(1);
        let input = data.to_vec();
        thread::Builder::new()
            .name(format!("{algorithm}-worker"))
            .spawn(move || {
                // The receiver is gone once the deadline passed.
                let _ = tx.send(Self::apply(&input, algorithm, level, direction));
            })
            .map_err(wrap)?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result.map_err(wrap),
            Err(RecvTimeoutError::Timeout) => {
                debug!(%algorithm, ?direction, ?timeout, "compression deadline passed");
                Err(StreamError::CompressionTimeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(wrap(io::Error::other("compression worker exited without a result")))
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    fn payload() -> Vec<u8> {
        b"onMetaData duration width height framerate "
            .iter()
            .copied()
            .cycle()
            .take(4096)
            .collect()
    }

    #[test]
    fn test_round_trip_all_algorithms() {
        let data = payload();

        for algorithm in [
            CompressionAlgorithm::Deflate,
            CompressionAlgorithm::Zlib,
            CompressionAlgorithm::Lzma,
        ] {
            let compressed = compress(&data, algorithm, 6).unwrap();
            assert!(
                compressed.len() < data.len(),
                "{algorithm} did not shrink the payload"
            );
            assert_eq!(decompress(&compressed, algorithm).unwrap(), data);
        }
    }

    #[test]
    fn test_zlib_header() {
        let compressed = compress(b"hello", CompressionAlgorithm::Zlib, 6).unwrap();
        assert_eq!(compressed[0], 0x78);
    }

    #[test]
    fn test_decompress_garbage() {
        let garbage = [0xffu8; 16];
        assert!(decompress(&garbage, CompressionAlgorithm::Zlib).is_err());
        assert!(decompress(&garbage, CompressionAlgorithm::Lzma).is_err());
    }

    #[test]
    fn test_selector() {
        assert_eq!(CompressionAlgorithm::default(), CompressionAlgorithm::Zlib);
        assert_eq!(CompressionAlgorithm::try_from(0).unwrap(), CompressionAlgorithm::Deflate);
        assert_eq!(CompressionAlgorithm::try_from(1).unwrap(), CompressionAlgorithm::Lzma);
        assert_eq!(CompressionAlgorithm::try_from(2).unwrap(), CompressionAlgorithm::Zlib);
        assert!(matches!(
            CompressionAlgorithm::try_from(3),
            Err(StreamError::UnsupportedAlgorithm(3))
        ));

        assert_eq!("ZLIB".parse::<CompressionAlgorithm>().unwrap(), CompressionAlgorithm::Zlib);
        assert_eq!(
            "raw-deflate".parse::<CompressionAlgorithm>().unwrap(),
            CompressionAlgorithm::Deflate
        );
        assert!("brotli".parse::<CompressionAlgorithm>().is_err());
        assert_eq!(CompressionAlgorithm::Lzma.to_string(), "lzma");
    }

    #[test]
    fn test_compressor_with_deadline() {
        let data = payload();
        let compressor = Compressor {
            timeout: Some(Duration::from_secs(30)),
            ..Compressor::new(CompressionAlgorithm::Deflate)
        };

        let compressed = compressor.compress(&data).unwrap();
        assert_eq!(compressor.decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_compressor_deadline_passes() {
        let data: Vec<u8> = (0..8 * 1024 * 1024u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8)
            .collect();
        let compressor = Compressor {
            timeout: Some(Duration::ZERO),
            ..Compressor::new(CompressionAlgorithm::Lzma)
        };

        assert!(matches!(
            compressor.compress(&data),
            Err(StreamError::CompressionTimeout(_))
        ));
    }

    #[test]
    fn test_compressor_reports_algorithm() {
        let compressor = Compressor::new(CompressionAlgorithm::Zlib);
        let err = compressor.decompress(b"not zlib").unwrap_err();
        assert!(matches!(
            err,
            StreamError::Compression {
                algorithm: CompressionAlgorithm::Zlib,
                ..
            }
        ));
    }
}
