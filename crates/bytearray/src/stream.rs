use std::cell::RefCell;
use std::fmt;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use amf0::{Amf0Heap, Amf0Marker, Amf0ReadError, Amf0Value};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use tracing::{debug, trace};

use crate::StreamError;
use crate::charset::Charset;
use crate::compression::{CompressionAlgorithm, Compressor};
use crate::config::{Endian, StreamConfig};

const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

/// Generates a read/write pair for a fixed width number honoring the stream
/// byte order.
macro_rules! numeric {
    ($read:ident, $write:ident, $ty:ty, $width:literal, $get:ident, $put:ident) => {
        #[doc = concat!("Read a `", stringify!($ty), "` and advance by ", stringify!($width), " bytes.")]
        pub fn $read(&mut self) -> Result<$ty, StreamError> {
            let bytes = self.read_array::<$width>()?;
            Ok(match self.endian {
                Endian::Big => BigEndian::$get(&bytes),
                Endian::Little => LittleEndian::$get(&bytes),
            })
        }

        #[doc = concat!("Write a `", stringify!($ty), "` and advance by ", stringify!($width), " bytes.")]
        pub fn $write(&mut self, value: $ty) {
            let mut bytes = [0u8; $width];
            match self.endian {
                Endian::Big => BigEndian::$put(&mut bytes, value),
                Endian::Little => LittleEndian::$put(&mut bytes, value),
            }
            self.write_raw(&bytes);
        }
    };
}

/// A growable byte buffer with a read/write cursor.
///
/// Reads consume bytes at [`position`](Self::position) and fail with
/// [`StreamError::OutOfBounds`] when too few remain. Writes overwrite bytes at
/// the cursor and grow the buffer, zero filled, when they run past the end.
///
/// Streams created with [`ByteStream::from_stream`] share the same backing
/// buffer but keep their own cursor. Sharing is single threaded.
#[derive(Debug)]
pub struct ByteStream {
    buffer: Rc<RefCell<Vec<u8>>>,
    position: usize,
    endian: Endian,
    object_encoding: i32,
    compression_level: u32,
    compression_timeout: Option<Duration>,
}

impl Default for ByteStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteStream {
    /// A stream of 1024 zero bytes, big endian.
    pub fn new() -> Self {
        Self::with_config(&StreamConfig::default())
    }

    /// A stream of `capacity` zero bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(&StreamConfig::builder().initial_capacity(capacity).build())
    }

    pub fn with_config(config: &StreamConfig) -> Self {
        Self::from_parts(vec![0; config.initial_capacity], config)
    }

    /// Wrap existing bytes. The cursor starts at 0.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_parts(bytes.into(), &StreamConfig::default())
    }

    pub fn from_bytes_with_config(bytes: impl Into<Vec<u8>>, config: &StreamConfig) -> Self {
        Self::from_parts(bytes.into(), config)
    }

    /// Wrap signed bytes.
    pub fn from_array(array: &[i8]) -> Self {
        Self::from_bytes(array.iter().map(|b| *b as u8).collect::<Vec<u8>>())
    }

    /// A new cursor over the same backing buffer as `other`.
    ///
    /// Writes through either stream are visible to both. Settings are copied
    /// and the cursor starts at 0.
    pub fn from_stream(other: &ByteStream) -> Self {
        Self {
            buffer: Rc::clone(&other.buffer),
            position: 0,
            endian: other.endian,
            object_encoding: other.object_encoding,
            compression_level: other.compression_level,
            compression_timeout: other.compression_timeout,
        }
    }

    fn from_parts(buffer: Vec<u8>, config: &StreamConfig) -> Self {
        Self {
            buffer: Rc::new(RefCell::new(buffer)),
            position: 0,
            endian: config.endian,
            object_encoding: config.object_encoding,
            compression_level: config.compression_level,
            compression_timeout: config.compression_timeout,
        }
    }

    /// Whether both streams write to the same backing buffer.
    pub fn shares_buffer_with(&self, other: &ByteStream) -> bool {
        Rc::ptr_eq(&self.buffer, &other.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn position(&self) -> usize {
        self.position
    }

    /// Move the cursor. Positions past the end are rejected.
    pub fn set_position(&mut self, position: usize) -> Result<(), StreamError> {
        let length = self.len();
        if position > length {
            return Err(StreamError::OutOfBounds {
                position,
                needed: 0,
                length,
            });
        }

        self.position = position;
        Ok(())
    }

    /// Bytes between the cursor and the end of the buffer.
    pub fn bytes_available(&self) -> usize {
        self.len().saturating_sub(self.position)
    }

    /// Move the cursor back to 0.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    pub const fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub const fn object_encoding(&self) -> i32 {
        self.object_encoding
    }

    pub fn set_object_encoding(&mut self, object_encoding: i32) {
        self.object_encoding = object_encoding;
    }

    pub fn set_compression_timeout(&mut self, timeout: Option<Duration>) {
        self.compression_timeout = timeout;
    }

    /// Copy of the whole buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        self.buffer.borrow().clone()
    }

    /// Copy of the whole buffer as signed bytes.
    pub fn to_array(&self) -> Vec<i8> {
        self.buffer.borrow().iter().map(|b| *b as i8).collect()
    }

    fn out_of_bounds(&self, needed: usize) -> StreamError {
        StreamError::OutOfBounds {
            position: self.position,
            needed,
            length: self.len(),
        }
    }

    /// Hand `len` bytes at the cursor to `f` and advance past them.
    fn read_slice<R>(&mut self, len: usize, f: impl FnOnce(&[u8]) -> R) -> Result<R, StreamError> {
        let buffer = self.buffer.borrow();
        let Some(end) = self
            .position
            .checked_add(len)
            .filter(|end| *end <= buffer.len())
        else {
            drop(buffer);
            return Err(self.out_of_bounds(len));
        };

        let result = f(&buffer[self.position..end]);
        drop(buffer);

        self.position = end;
        Ok(result)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], StreamError> {
        self.read_slice(N, |bytes| {
            let mut array = [0u8; N];
            array.copy_from_slice(bytes);
            array
        })
    }

    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>, StreamError> {
        self.read_slice(len, <[u8]>::to_vec)
    }

    /// Write `bytes` at `offset` without touching the cursor.
    fn write_at(&self, offset: usize, bytes: &[u8]) {
        let mut buffer = self.buffer.borrow_mut();
        let end = offset + bytes.len();
        if end > buffer.len() {
            buffer.resize(end, 0);
        }
        buffer[offset..end].copy_from_slice(bytes);
    }

    fn write_raw(&mut self, bytes: &[u8]) {
        self.write_at(self.position, bytes);
        self.position += bytes.len();
    }

    pub fn read_boolean(&mut self) -> Result<bool, StreamError> {
        Ok(self.read_unsigned_byte()? != 0)
    }

    pub fn write_boolean(&mut self, value: bool) {
        self.write_unsigned_byte(value as u8);
    }

    pub fn read_byte(&mut self) -> Result<i8, StreamError> {
        Ok(self.read_unsigned_byte()? as i8)
    }

    pub fn write_byte(&mut self, value: i8) {
        self.write_unsigned_byte(value as u8);
    }

    pub fn read_unsigned_byte(&mut self) -> Result<u8, StreamError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn write_unsigned_byte(&mut self, value: u8) {
        self.write_raw(&[value]);
    }

    numeric!(read_short, write_short, i16, 2, read_i16, write_i16);
    numeric!(read_unsigned_short, write_unsigned_short, u16, 2, read_u16, write_u16);
    numeric!(read_int, write_int, i32, 4, read_i32, write_i32);
    numeric!(read_unsigned_int, write_unsigned_int, u32, 4, read_u32, write_u32);
    numeric!(read_float, write_float, f32, 4, read_f32, write_f32);
    numeric!(read_double, write_double, f64, 8, read_f64, write_f64);

    /// Read a UTF-8 string prefixed by its u16 byte length.
    ///
    /// The cursor is left where it was if the string is truncated or invalid.
    pub fn read_utf(&mut self) -> Result<String, StreamError> {
        let start = self.position;
        let result = self
            .read_unsigned_short()
            .and_then(|len| self.read_utf_bytes(len as usize));

        if result.is_err() {
            self.position = start;
        }
        result
    }

    /// Write a UTF-8 string prefixed by its u16 byte length.
    pub fn write_utf(&mut self, value: &str) -> Result<(), StreamError> {
        let len = u16::try_from(value.len()).map_err(|_| StreamError::StringTooLong(value.len()))?;
        self.write_unsigned_short(len);
        self.write_utf_bytes(value);
        Ok(())
    }

    /// Read `len` bytes as UTF-8 without a length prefix.
    pub fn read_utf_bytes(&mut self, len: usize) -> Result<String, StreamError> {
        let start = self.position;
        let bytes = self.read_vec(len)?;
        String::from_utf8(bytes).map_err(|err| {
            self.position = start;
            err.into()
        })
    }

    /// Write UTF-8 bytes without a length prefix.
    pub fn write_utf_bytes(&mut self, value: &str) {
        self.write_raw(value.as_bytes());
    }

    /// Read `len` bytes and decode them with the named charset.
    pub fn read_multi_byte(&mut self, len: usize, charset: &str) -> Result<String, StreamError> {
        let charset: Charset = charset.parse()?;
        self.read_slice(len, |bytes| charset.decode(bytes))
    }

    /// Encode text with the named charset and write the bytes.
    pub fn write_multi_byte(&mut self, value: &str, charset: &str) -> Result<(), StreamError> {
        let charset: Charset = charset.parse()?;
        let bytes = charset.encode(value)?;
        self.write_raw(&bytes);
        Ok(())
    }

    /// Copy bytes at the cursor into `dest` starting at index `offset`.
    ///
    /// `length` defaults to everything that is left. Only this stream's cursor
    /// moves; `dest` grows if needed.
    pub fn read_bytes(
        &mut self,
        dest: &mut ByteStream,
        offset: usize,
        length: Option<usize>,
    ) -> Result<(), StreamError> {
        let length = length.unwrap_or_else(|| self.bytes_available());
        let bytes = self.read_vec(length)?;
        dest.write_at(offset, &bytes);
        Ok(())
    }

    /// Copy bytes of `src` starting at index `offset` into this stream at the
    /// cursor.
    ///
    /// `length` defaults to everything from `offset` to the end of `src`. Only
    /// this stream's cursor moves.
    pub fn write_bytes(
        &mut self,
        src: &ByteStream,
        offset: usize,
        length: Option<usize>,
    ) -> Result<(), StreamError> {
        let bytes = {
            let source = src.buffer.borrow();
            let source_len = source.len();
            let length = length.unwrap_or_else(|| source_len.saturating_sub(offset));
            let range = offset
                .checked_add(length)
                .filter(|end| *end <= source_len)
                .map(|end| offset..end)
                .ok_or(StreamError::OutOfBounds {
                    position: offset,
                    needed: length,
                    length: source_len,
                })?;
            source[range].to_vec()
        };

        self.write_raw(&bytes);
        Ok(())
    }

    /// Decode one AMF0 value at the cursor, allocating containers in `heap`.
    ///
    /// The cursor advances by exactly the encoded size. On failure the cursor
    /// does not move and `heap` is left as it was.
    pub fn read_object(&mut self, heap: &mut Amf0Heap) -> Result<Amf0Value, StreamError> {
        let (value, read) = {
            let buffer = self.buffer.borrow();
            amf0::read_value(&buffer, self.position, heap).map_err(|err| match err {
                Amf0ReadError::UnexpectedEof { offset, needed } => StreamError::OutOfBounds {
                    position: offset,
                    needed,
                    length: buffer.len(),
                },
                err => err.into(),
            })?
        };

        trace!(position = self.position, read, "read amf0 value");
        self.position += read;
        Ok(value)
    }

    /// Encode `value` as AMF0 at the cursor, inferring its marker.
    ///
    /// Returns the number of bytes written; the cursor advances by the same.
    pub fn write_object(&mut self, heap: &Amf0Heap, value: &Amf0Value) -> Result<usize, StreamError> {
        self.write_amf0(heap, value, None)
    }

    /// Encode `value` as AMF0 at the cursor using `marker` for the top level.
    pub fn write_object_with_marker(
        &mut self,
        heap: &Amf0Heap,
        value: &Amf0Value,
        marker: Amf0Marker,
    ) -> Result<usize, StreamError> {
        self.write_amf0(heap, value, Some(marker))
    }

    fn write_amf0(
        &mut self,
        heap: &Amf0Heap,
        value: &Amf0Value,
        marker: Option<Amf0Marker>,
    ) -> Result<usize, StreamError> {
        let written =
            amf0::write_value(&mut self.buffer.borrow_mut(), self.position, heap, value, marker)?;

        trace!(position = self.position, written, "wrote amf0 value");
        self.position += written;
        Ok(written)
    }

    /// Drop every byte and move the cursor to 0.
    pub fn clear(&mut self) {
        self.buffer.borrow_mut().clear();
        self.position = 0;
    }

    /// Truncate or zero extend the buffer to `new_size`, which defaults to the
    /// cursor position. The cursor is clamped to the new length.
    pub fn resize(&mut self, new_size: Option<usize>) {
        let new_size = new_size.unwrap_or(self.position);
        let old_size = self.len();

        self.buffer.borrow_mut().resize(new_size, 0);
        self.position = self.position.min(new_size);

        debug!(old_size, new_size, position = self.position, "resized stream");
    }

    /// Same as [`resize`](Self::resize) with an explicit size.
    pub fn set_len(&mut self, len: usize) {
        self.resize(Some(len));
    }

    /// Resize to `new_len` only if the current length is `expected`.
    ///
    /// Returns the length before the call.
    pub fn atomic_compare_and_swap_length(&mut self, expected: usize, new_len: usize) -> usize {
        let previous = self.len();
        if previous == expected {
            self.resize(Some(new_len));
        } else {
            debug!(previous, expected, "length swap skipped");
        }
        previous
    }

    /// Overwrite the byte at `index` with `new` if it currently equals
    /// `expected`. Returns the byte before the call.
    pub fn atomic_compare_and_swap_int_at(
        &mut self,
        index: usize,
        expected: u8,
        new: u8,
    ) -> Result<u8, StreamError> {
        let mut buffer = self.buffer.borrow_mut();
        let length = buffer.len();
        let slot = buffer.get_mut(index).ok_or(StreamError::OutOfBounds {
            position: index,
            needed: 1,
            length,
        })?;

        let previous = *slot;
        if previous == expected {
            *slot = new;
        }
        Ok(previous)
    }

    fn compressor(&self, algorithm: CompressionAlgorithm) -> Compressor {
        Compressor {
            algorithm,
            level: self.compression_level,
            timeout: self.compression_timeout,
        }
    }

    /// Replace the whole buffer with its compressed form. The cursor ends up
    /// at the end.
    ///
    /// On failure the buffer is left untouched.
    pub fn compress(&mut self, algorithm: CompressionAlgorithm) -> Result<(), StreamError> {
        let compressed = self.compressor(algorithm).compress(&self.buffer.borrow())?;
        let before = self.len();
        let after = compressed.len();

        *self.buffer.borrow_mut() = compressed;
        self.position = after;

        debug!(%algorithm, before, after, "compressed stream");
        Ok(())
    }

    /// Replace the whole buffer with its decompressed form. The cursor moves
    /// to 0.
    ///
    /// On failure the buffer is left untouched.
    pub fn uncompress(&mut self, algorithm: CompressionAlgorithm) -> Result<(), StreamError> {
        let decompressed = self.compressor(algorithm).decompress(&self.buffer.borrow())?;
        let before = self.len();
        let after = decompressed.len();

        *self.buffer.borrow_mut() = decompressed;
        self.position = 0;

        debug!(%algorithm, before, after, "uncompressed stream");
        Ok(())
    }

    /// [`compress`](Self::compress) with raw deflate.
    pub fn deflate(&mut self) -> Result<(), StreamError> {
        self.compress(CompressionAlgorithm::Deflate)
    }

    /// [`uncompress`](Self::uncompress) with raw deflate.
    pub fn inflate(&mut self) -> Result<(), StreamError> {
        self.uncompress(CompressionAlgorithm::Deflate)
    }
}

/// The whole buffer as UTF-8, skipping a leading byte order mark. Invalid
/// sequences are replaced.
impl fmt::Display for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buffer = self.buffer.borrow();
        let text = buffer.strip_prefix(&UTF8_BOM[..]).unwrap_or(&buffer[..]);
        f.write_str(&String::from_utf8_lossy(text))
    }
}

impl io::Read for ByteStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.bytes_available());
        self.read_slice(len, |bytes| buf[..len].copy_from_slice(bytes))?;
        Ok(len)
    }
}

impl io::Write for ByteStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_raw(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
