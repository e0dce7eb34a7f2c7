use byteorder::{BigEndian, ByteOrder};
use tracing::trace;

use super::heap::{Amf0Heap, Amf0Object, ObjectId, Properties};
use super::{Amf0Marker, Amf0ReadError, Amf0Value};

/// Containers nested deeper than this are rejected instead of overflowing the
/// stack.
pub const MAX_NESTING_DEPTH: usize = 256;

/// An AMF0 Decoder.
///
/// The decoder reads from a byte slice starting at a given offset and
/// allocates every container it meets in the supplied [`Amf0Heap`]. Each call
/// to [`Amf0Decoder::decode`] starts with an empty reference table, so
/// references never leak between top level values.
pub struct Amf0Decoder<'a, 'h> {
    buf: &'a [u8],
    position: usize,
    heap: &'h mut Amf0Heap,
    references: Vec<ObjectId>,
    depth: usize,
}

impl<'a, 'h> Amf0Decoder<'a, 'h> {
    /// Create a new AMF0 decoder reading from the start of `buf`.
    pub fn new(buf: &'a [u8], heap: &'h mut Amf0Heap) -> Self {
        Self::with_offset(buf, 0, heap)
    }

    /// Create a new AMF0 decoder reading from `offset`.
    pub fn with_offset(buf: &'a [u8], offset: usize, heap: &'h mut Amf0Heap) -> Self {
        Self {
            buf,
            position: offset,
            heap,
            references: Vec::new(),
            depth: 0,
        }
    }

    /// Absolute offset of the next unread byte.
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Check if the decoder has reached the end of the AMF0 data.
    pub const fn is_empty(&self) -> bool {
        self.position >= self.buf.len()
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Amf0ReadError> {
        let end = self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or(Amf0ReadError::UnexpectedEof {
                offset: self.position,
                needed: len,
            })?;

        let bytes = &self.buf[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8, Amf0ReadError> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, Amf0ReadError> {
        Ok(BigEndian::read_u16(self.read_bytes(2)?))
    }

    fn read_u32(&mut self) -> Result<u32, Amf0ReadError> {
        Ok(BigEndian::read_u32(self.read_bytes(4)?))
    }

    /// Read all the encoded values from the decoder.
    /// Returns both successfully decoded values and any error that occurred.
    pub fn decode_all(&mut self) -> (Vec<Amf0Value>, Option<Amf0ReadError>) {
        let mut results = vec![];

        while !self.is_empty() {
            match self.decode() {
                Ok(value) => results.push(value),
                Err(err) => return (results, Some(err)),
            }
        }

        (results, None)
    }

    /// Read the next encoded value from the decoder.
    ///
    /// On failure the decoder position and the heap are restored to what they
    /// were before the call.
    pub fn decode(&mut self) -> Result<Amf0Value, Amf0ReadError> {
        let start = self.position;
        let heap_mark = self.heap.len();

        self.references.clear();
        self.depth = 0;

        let result = self.read_value();
        if let Err(err) = &result {
            trace!(offset = start, error = %err, "amf0 decode failed, rolling back");
            self.heap.truncate(heap_mark);
            self.position = start;
        }

        result
    }

    /// Read the next encoded value from the decoder and check if it matches the
    /// specified marker.
    pub fn decode_with_type(
        &mut self,
        specified_marker: Amf0Marker,
    ) -> Result<Amf0Value, Amf0ReadError> {
        let marker = *self
            .buf
            .get(self.position)
            .ok_or(Amf0ReadError::UnexpectedEof {
                offset: self.position,
                needed: 1,
            })?;

        let marker = Amf0Marker::from_byte(marker).ok_or(Amf0ReadError::UnknownMarker(marker))?;
        if marker != specified_marker {
            return Err(Amf0ReadError::WrongType {
                expected: specified_marker,
                got: marker,
            });
        }

        self.decode()
    }

    fn read_value(&mut self) -> Result<Amf0Value, Amf0ReadError> {
        let marker = self.read_u8()?;
        let marker = Amf0Marker::from_byte(marker).ok_or(Amf0ReadError::UnknownMarker(marker))?;

        match marker {
            Amf0Marker::Number => Ok(Amf0Value::Number(self.read_number()?)),
            Amf0Marker::Boolean => Ok(Amf0Value::Boolean(self.read_bool()?)),
            Amf0Marker::String => Ok(Amf0Value::String(self.read_string()?.to_owned())),
            Amf0Marker::Object => self.nested(Self::read_object),
            Amf0Marker::Null => Ok(Amf0Value::Null),
            Amf0Marker::Undefined => Ok(Amf0Value::Undefined),
            Amf0Marker::Reference => self.read_reference(),
            Amf0Marker::EcmaArray => self.nested(Self::read_ecma_array),
            Amf0Marker::ObjectEnd => Ok(Amf0Value::ObjectEnd),
            Amf0Marker::StrictArray => self.nested(Self::read_strict_array),
            Amf0Marker::Date => self.read_date(),
            Amf0Marker::TypedObject => self.nested(Self::read_typed_object),
            _ => Err(Amf0ReadError::UnsupportedType(marker)),
        }
    }

    fn nested(
        &mut self,
        read: fn(&mut Self) -> Result<ObjectId, Amf0ReadError>,
    ) -> Result<Amf0Value, Amf0ReadError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(Amf0ReadError::NestingTooDeep(self.depth));
        }

        self.depth += 1;
        let result = read(self);
        self.depth -= 1;

        result.map(Amf0Value::Object)
    }

    /// Allocate a container and make it addressable by references before any
    /// of its children are read.
    fn register(&mut self, object: Amf0Object) -> ObjectId {
        let id = self.heap.insert(object);
        self.references.push(id);
        id
    }

    fn read_number(&mut self) -> Result<f64, Amf0ReadError> {
        Ok(BigEndian::read_f64(self.read_bytes(8)?))
    }

    fn read_bool(&mut self) -> Result<bool, Amf0ReadError> {
        Ok(self.read_u8()? > 0)
    }

    fn read_string(&mut self) -> Result<&'a str, Amf0ReadError> {
        let l = self.read_u16()?;
        let bytes = self.read_bytes(l as usize)?;

        Ok(std::str::from_utf8(bytes)?)
    }

    fn read_object_body(&mut self) -> Result<Properties, Amf0ReadError> {
        let mut properties = Vec::new();

        loop {
            let key = self.read_string()?;
            let value = self.read_value()?;

            if value == Amf0Value::ObjectEnd {
                break;
            }

            properties.push((key.to_owned(), value));
        }

        Ok(properties)
    }

    fn read_object(&mut self) -> Result<ObjectId, Amf0ReadError> {
        let id = self.register(Amf0Object::Object(Vec::new()));
        let properties = self.read_object_body()?;

        trace!(%id, properties = properties.len(), "decoded object");
        self.heap.replace(id, Amf0Object::Object(properties));
        Ok(id)
    }

    fn read_reference(&mut self) -> Result<Amf0Value, Amf0ReadError> {
        let index = self.read_u16()?;

        self.references
            .get(index as usize)
            .map(|id| Amf0Value::Object(*id))
            .ok_or(Amf0ReadError::InvalidReference {
                index,
                len: self.references.len(),
            })
    }

    fn read_ecma_array(&mut self) -> Result<ObjectId, Amf0ReadError> {
        // The count is informational only, the body ends at the object end
        // marker like a regular object.
        let count = self.read_u32()?;

        let id = self.register(Amf0Object::EcmaArray(Vec::new()));
        let properties = self.read_object_body()?;

        trace!(%id, count, properties = properties.len(), "decoded ecma array");
        self.heap.replace(id, Amf0Object::EcmaArray(properties));
        Ok(id)
    }

    fn read_strict_array(&mut self) -> Result<ObjectId, Amf0ReadError> {
        let id = self.register(Amf0Object::StrictArray(Vec::new()));
        let len = self.read_u32()? as usize;

        // every element is at least one marker byte
        let remaining = self.buf.len().saturating_sub(self.position);
        let mut values = Vec::with_capacity(len.min(remaining));

        for _ in 0..len {
            values.push(self.read_value()?);
        }

        trace!(%id, len, "decoded strict array");
        self.heap.replace(id, Amf0Object::StrictArray(values));
        Ok(id)
    }

    fn read_date(&mut self) -> Result<Amf0Value, Amf0ReadError> {
        let millis = self.read_number()?;
        let timezone = BigEndian::read_i16(self.read_bytes(2)?);

        Ok(Amf0Value::Date { millis, timezone })
    }

    fn read_typed_object(&mut self) -> Result<ObjectId, Amf0ReadError> {
        let class_name = self.read_string()?.to_owned();
        let id = self.register(Amf0Object::TypedObject {
            class_name: class_name.clone(),
            properties: Vec::new(),
        });
        let properties = self.read_object_body()?;

        trace!(%id, class_name = %class_name, "decoded typed object");
        self.heap.replace(
            id,
            Amf0Object::TypedObject {
                class_name,
                properties,
            },
        );
        Ok(id)
    }
}

impl Iterator for Amf0Decoder<'_, '_> {
    type Item = Result<Amf0Value, Amf0ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_empty() {
            return None;
        }

        let result = self.decode();
        if result.is_err() {
            // the failed value cannot be skipped without knowing its shape
            self.position = self.buf.len();
        }

        Some(result)
    }
}
