use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::StreamError;

/// Text encodings understood by the multi-byte string operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    /// UTF-8. Invalid sequences decode to U+FFFD.
    Utf8,
    /// 7-bit ASCII. The high bit is dropped when decoding.
    Ascii,
    /// ISO-8859-1, one byte per code point.
    Latin1,
    /// UTF-16 little endian.
    Utf16Le,
    /// Bytes rendered as lowercase hex digits.
    Hex,
    /// Bytes rendered as standard padded base64.
    Base64,
}

impl Charset {
    /// Canonical name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Ascii => "ascii",
            Self::Latin1 => "latin1",
            Self::Utf16Le => "utf-16le",
            Self::Hex => "hex",
            Self::Base64 => "base64",
        }
    }

    fn invalid(self, reason: impl Into<String>) -> StreamError {
        StreamError::InvalidEncodedText {
            charset: self.name(),
            reason: reason.into(),
        }
    }

    /// Turn text into bytes.
    pub fn encode(self, text: &str) -> Result<Vec<u8>, StreamError> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Ascii => text
                .chars()
                .map(|c| {
                    if c.is_ascii() {
                        Ok(c as u8)
                    } else {
                        Err(self.invalid(format!("{c:?} is not ascii")))
                    }
                })
                .collect(),
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(c).map_err(|_| self.invalid(format!("{c:?} is outside latin1"))))
                .collect(),
            Self::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            Self::Hex => hex::decode(text).map_err(|e| self.invalid(e.to_string())),
            Self::Base64 => STANDARD
                .decode(text)
                .map_err(|e| self.invalid(e.to_string())),
        }
    }

    /// Turn bytes into text.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Ascii => bytes.iter().map(|b| (b & 0x7f) as char).collect(),
            Self::Latin1 => bytes.iter().map(|b| *b as char).collect(),
            Self::Utf16Le => {
                // A trailing odd byte is dropped.
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
            Self::Hex => hex::encode(bytes),
            Self::Base64 => STANDARD.encode(bytes),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            "latin1" | "binary" | "iso-8859-1" => Ok(Self::Latin1),
            "utf-16le" | "utf16le" | "ucs-2" | "ucs2" => Ok(Self::Utf16Le),
            "hex" => Ok(Self::Hex),
            "base64" => Ok(Self::Base64),
            _ => Err(StreamError::InvalidCharset(s.to_owned())),
        }
    }
}
