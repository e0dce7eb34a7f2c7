//! A cursor based, endianness aware byte stream.
//!
//! [`ByteStream`] reads and writes numbers, strings and byte ranges at a
//! single cursor over a growable buffer, hands AMF0 values to the [`amf0`]
//! codec, and compresses or decompresses the whole buffer in place.
//!
//! ```rust
//! # fn test() -> Result<(), bytearray::StreamError> {
//! use bytearray::ByteStream;
//!
//! let mut stream = ByteStream::with_capacity(0);
//! stream.write_boolean(true);
//! stream.write_unsigned_short(4);
//! stream.write_utf("hello")?;
//!
//! stream.reset();
//! assert!(stream.read_boolean()?);
//! assert_eq!(stream.read_unsigned_short()?, 4);
//! assert_eq!(stream.read_utf()?, "hello");
//! # Ok(())
//! # }
//! # test().expect("test failed");
//! ```
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(unsafe_code)]

pub mod charset;
pub mod compression;
pub mod config;
mod error;
mod stream;
#[cfg(test)]
mod test_utils;

pub use charset::Charset;
pub use compression::{CompressionAlgorithm, Compressor};
pub use config::{Endian, StreamConfig, StreamConfigBuilder};
pub use error::StreamError;
pub use stream::ByteStream;
