use std::io;
use std::time::Duration;

use amf0::{Amf0ReadError, Amf0WriteError};

use crate::compression::CompressionAlgorithm;

/// Errors produced by [`ByteStream`](crate::ByteStream) operations.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// A read or seek went past the end of the buffer.
    #[error("out of bounds: needed {needed} bytes at position {position}, length is {length}")]
    OutOfBounds {
        /// Cursor position of the failing access.
        position: usize,
        /// Bytes the access needed.
        needed: usize,
        /// Buffer length at the time.
        length: usize,
    },
    /// The charset name is not recognised.
    #[error("invalid charset: {0}")]
    InvalidCharset(String),
    /// Text could not be represented in, or decoded from, a charset.
    #[error("invalid {charset} text: {reason}")]
    InvalidEncodedText {
        /// Charset in use.
        charset: &'static str,
        /// What went wrong.
        reason: String,
    },
    /// The byte order name is not recognised.
    #[error("invalid byte order: {0}")]
    InvalidEndian(String),
    /// The numeric compression selector is not known.
    #[error("unsupported compression algorithm: {0}")]
    UnsupportedAlgorithm(u8),
    /// The compression algorithm name is not known.
    #[error("unknown compression algorithm: {0}")]
    UnknownAlgorithm(String),
    /// The compression worker did not finish in time.
    #[error("compression timed out after {0:?}")]
    CompressionTimeout(Duration),
    /// The compression backend failed.
    #[error("{algorithm} failed: {source}")]
    Compression {
        /// Algorithm in use.
        algorithm: CompressionAlgorithm,
        /// Backend error.
        #[source]
        source: io::Error,
    },
    /// A length prefixed string does not fit its u16 prefix.
    #[error("string too long: {0} bytes")]
    StringTooLong(usize),
    /// Bytes read as UTF-8 were not valid UTF-8.
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    /// The AMF0 decoder failed.
    #[error("amf0 read error: {0}")]
    Amf0Read(#[from] Amf0ReadError),
    /// The AMF0 encoder failed.
    #[error("amf0 write error: {0}")]
    Amf0Write(#[from] Amf0WriteError),
}

impl StreamError {
    /// Whether the error was caused by accessing bytes past the end.
    pub const fn is_out_of_bounds(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        let kind = match &err {
            StreamError::OutOfBounds { .. } => io::ErrorKind::UnexpectedEof,
            StreamError::CompressionTimeout(_) => io::ErrorKind::TimedOut,
            _ => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, err)
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let cases = [
            (
                StreamError::OutOfBounds {
                    position: 4,
                    needed: 8,
                    length: 6,
                },
                "out of bounds: needed 8 bytes at position 4, length is 6",
            ),
            (
                StreamError::InvalidCharset("ebcdic".into()),
                "invalid charset: ebcdic",
            ),
            (
                StreamError::UnsupportedAlgorithm(9),
                "unsupported compression algorithm: 9",
            ),
            (
                StreamError::CompressionTimeout(Duration::from_millis(5)),
                "compression timed out after 5ms",
            ),
            (
                StreamError::Compression {
                    algorithm: CompressionAlgorithm::Lzma,
                    source: io::Error::other("corrupt"),
                },
                "lzma failed: corrupt",
            ),
            (StreamError::StringTooLong(70000), "string too long: 70000 bytes"),
        ];

        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_into_io_error() {
        let err: io::Error = StreamError::OutOfBounds {
            position: 0,
            needed: 1,
            length: 0,
        }
        .into();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let err: io::Error = StreamError::CompressionTimeout(Duration::ZERO).into();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
