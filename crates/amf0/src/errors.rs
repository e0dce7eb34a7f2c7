use std::io;

use super::define::Amf0Marker;
use super::heap::ObjectId;

/// Errors that can occur when decoding AMF0 data.
#[derive(Debug, thiserror::Error)]
pub enum Amf0ReadError {
    /// An unknown marker was encountered.
    #[error("unknown marker: {0}")]
    UnknownMarker(u8),
    /// An unsupported type was encountered.
    #[error("unsupported type: {0:?}")]
    UnsupportedType(Amf0Marker),
    /// The input ended before a value was complete.
    #[error("unexpected end of data: needed {needed} bytes at offset {offset}")]
    UnexpectedEof {
        /// Offset of the read that failed.
        offset: usize,
        /// Width of the read that failed.
        needed: usize,
    },
    /// A string parse error occurred.
    #[error("string parse error: {0}")]
    StringParseError(#[from] std::str::Utf8Error),
    /// A reference pointed past the end of the reference table.
    #[error("invalid reference: {index} (table has {len} entries)")]
    InvalidReference {
        /// Index read from the data.
        index: u16,
        /// Size of the reference table at that point.
        len: usize,
    },
    /// Containers were nested deeper than the decoder allows.
    #[error("nesting too deep: {0}")]
    NestingTooDeep(usize),
    /// A wrong type was encountered. Created when using
    /// `Amf0Decoder::decode_with_type` and the next value is not the expected
    /// type.
    #[error("wrong type: expected {expected:?}, got {got:?}")]
    WrongType {
        /// Marker the caller asked for.
        expected: Amf0Marker,
        /// Marker found in the data.
        got: Amf0Marker,
    },
}

impl Amf0ReadError {
    /// Whether the error was caused by running out of input.
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::UnexpectedEof { .. })
    }
}

/// Errors that can occur when encoding AMF0 data.
#[derive(Debug, thiserror::Error)]
pub enum Amf0WriteError {
    /// A normal string was too long.
    #[error("normal string too long")]
    NormalStringTooLong,
    /// An IO error occurred.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// An unsupported type was encountered.
    #[error("unsupported type: {0:?}")]
    UnsupportedType(Amf0Marker),
    /// An explicit marker does not fit the value.
    #[error("cannot encode {value} as {marker:?}")]
    IncompatibleMarker {
        /// Marker requested by the caller.
        marker: Amf0Marker,
        /// Short description of the value.
        value: &'static str,
    },
    /// A value points at a container that is not in the heap.
    #[error("unknown object: {0}")]
    UnknownObject(ObjectId),
    /// The reference table grew past what a u16 index can address.
    #[error("too many references: {0}")]
    TooManyReferences(usize),
    /// Containers were nested deeper than the decoder would accept.
    #[error("nesting too deep: {0}")]
    NestingTooDeep(usize),
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use std::io::Cursor;

    use byteorder::ReadBytesExt;

    use super::*;

    #[test]
    fn test_read_error_display() {
        let cases = [
            (Amf0ReadError::UnknownMarker(100), "unknown marker: 100"),
            (
                Amf0ReadError::UnsupportedType(Amf0Marker::LongString),
                "unsupported type: LongString",
            ),
            (
                Amf0ReadError::WrongType {
                    expected: Amf0Marker::Reference,
                    got: Amf0Marker::Boolean,
                },
                "wrong type: expected Reference, got Boolean",
            ),
            (
                Amf0ReadError::StringParseError(
                    #[allow(unknown_lints, invalid_from_utf8)]
                    std::str::from_utf8(b"\xFF\xFF").unwrap_err(),
                ),
                "string parse error: invalid utf-8 sequence of 1 bytes from index 0",
            ),
            (
                Amf0ReadError::UnexpectedEof {
                    offset: 3,
                    needed: 8,
                },
                "unexpected end of data: needed 8 bytes at offset 3",
            ),
            (
                Amf0ReadError::InvalidReference { index: 4, len: 1 },
                "invalid reference: 4 (table has 1 entries)",
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_write_error_display() {
        let cases = [
            (
                Amf0WriteError::UnsupportedType(Amf0Marker::XmlDocument),
                "unsupported type: XmlDocument",
            ),
            (
                Amf0WriteError::Io(Cursor::new(Vec::<u8>::new()).read_u8().unwrap_err()),
                "io error: failed to fill whole buffer",
            ),
            (Amf0WriteError::NormalStringTooLong, "normal string too long"),
            (
                Amf0WriteError::IncompatibleMarker {
                    marker: Amf0Marker::TypedObject,
                    value: "number",
                },
                "cannot encode number as TypedObject",
            ),
            (
                Amf0WriteError::UnknownObject(ObjectId::new(7)),
                "unknown object: #7",
            ),
            (
                Amf0WriteError::TooManyReferences(65536),
                "too many references: 65536",
            ),
            (Amf0WriteError::NestingTooDeep(256), "nesting too deep: 256"),
        ];

        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_is_eof() {
        assert!(
            Amf0ReadError::UnexpectedEof {
                offset: 0,
                needed: 1
            }
            .is_eof()
        );
        assert!(!Amf0ReadError::UnknownMarker(0xff).is_eof());
    }
}
