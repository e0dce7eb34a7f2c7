use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use super::define::Amf0Marker;
use super::decode::MAX_NESTING_DEPTH;
use super::heap::{Amf0Heap, Amf0Object, ObjectId};
use super::{Amf0Value, Amf0WriteError};

/// AMF0 encoder.
///
/// Encodes values, including graphs stored in an [`Amf0Heap`], to some
/// writer. Every method returns the number of bytes it wrote so callers can
/// advance their own cursor by exactly that amount.
///
/// A container is written in full the first time it is met during one call
/// to [`Amf0Encoder::encode`]; every later occurrence, including a cycle back
/// to an ancestor, is written as a reference.
///
/// Containers nested deeper than [`MAX_NESTING_DEPTH`] are refused, so
/// anything this encoder writes can be read back by [`Amf0Decoder`].
///
/// [`Amf0Decoder`]: crate::Amf0Decoder
pub struct Amf0Encoder<'h> {
    heap: &'h Amf0Heap,
    references: FxHashMap<ObjectId, usize>,
    next_index: usize,
    depth: usize,
}

impl<'h> Amf0Encoder<'h> {
    /// Create an encoder reading containers from `heap`.
    pub fn new(heap: &'h Amf0Heap) -> Self {
        Self {
            heap,
            references: FxHashMap::default(),
            next_index: 0,
            depth: 0,
        }
    }

    /// Encode a value, inferring its marker.
    pub fn encode(
        &mut self,
        writer: &mut impl io::Write,
        value: &Amf0Value,
    ) -> Result<usize, Amf0WriteError> {
        self.reset();
        self.write_value(writer, value, None)
    }

    /// Encode a value with an explicit top level marker.
    ///
    /// This is the only way to produce strict arrays and typed objects; nested
    /// values still have their markers inferred.
    pub fn encode_with_marker(
        &mut self,
        writer: &mut impl io::Write,
        value: &Amf0Value,
        marker: Amf0Marker,
    ) -> Result<usize, Amf0WriteError> {
        self.reset();
        self.write_value(writer, value, Some(marker))
    }

    fn reset(&mut self) {
        self.references.clear();
        self.next_index = 0;
        self.depth = 0;
    }

    /// Pick the marker for a value when the caller did not supply one.
    fn infer_marker(&self, value: &Amf0Value) -> Result<Amf0Marker, Amf0WriteError> {
        let id = match value {
            Amf0Value::Object(id) => *id,
            _ => {
                return value
                    .scalar_marker()
                    .ok_or(Amf0WriteError::UnsupportedType(Amf0Marker::Object));
            }
        };

        if self.references.contains_key(&id) {
            return Ok(Amf0Marker::Reference);
        }

        let object = self
            .heap
            .get(id)
            .ok_or(Amf0WriteError::UnknownObject(id))?;

        Ok(if object.is_list() {
            Amf0Marker::EcmaArray
        } else {
            Amf0Marker::Object
        })
    }

    fn write_value(
        &mut self,
        writer: &mut impl io::Write,
        value: &Amf0Value,
        marker: Option<Amf0Marker>,
    ) -> Result<usize, Amf0WriteError> {
        let marker = match marker {
            Some(marker) => marker,
            None => self.infer_marker(value)?,
        };

        match (marker, value) {
            (Amf0Marker::Number, Amf0Value::Number(n)) => Self::encode_number(writer, *n),
            (Amf0Marker::Boolean, Amf0Value::Boolean(b)) => Self::encode_bool(writer, *b),
            (Amf0Marker::String, Amf0Value::String(s)) => Self::encode_string(writer, s),
            (Amf0Marker::Null, _) => Self::encode_null(writer),
            (Amf0Marker::Undefined, _) => Self::encode_undefined(writer),
            // only ever written as the terminator of an object body
            (Amf0Marker::ObjectEnd, _) => Err(Amf0WriteError::UnsupportedType(marker)),
            (Amf0Marker::Date, Amf0Value::Date { millis, timezone }) => {
                Self::encode_date(writer, *millis, *timezone)
            }
            (Amf0Marker::Date, Amf0Value::Number(millis)) => Self::encode_date(writer, *millis, 0),
            (Amf0Marker::Reference, Amf0Value::Object(id)) => self.encode_reference(writer, *id),
            (Amf0Marker::Object, Amf0Value::Object(id)) => {
                self.nested(|this| this.encode_object(writer, *id))
            }
            (Amf0Marker::EcmaArray, Amf0Value::Object(id)) => {
                self.nested(|this| this.encode_ecma_array(writer, *id))
            }
            (Amf0Marker::StrictArray, Amf0Value::Object(id)) => {
                self.nested(|this| this.encode_strict_array(writer, *id))
            }
            (Amf0Marker::TypedObject, Amf0Value::Object(id)) => {
                self.nested(|this| this.encode_typed_object(writer, *id))
            }
            (marker, _) if !marker.is_supported() => Err(Amf0WriteError::UnsupportedType(marker)),
            (marker, value) => Err(Amf0WriteError::IncompatibleMarker {
                marker,
                value: describe(value),
            }),
        }
    }

    fn nested(
        &mut self,
        encode: impl FnOnce(&mut Self) -> Result<usize, Amf0WriteError>,
    ) -> Result<usize, Amf0WriteError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(Amf0WriteError::NestingTooDeep(self.depth));
        }

        self.depth += 1;
        let result = encode(self);
        self.depth -= 1;

        result
    }

    fn lookup(&self, id: ObjectId) -> Result<&'h Amf0Object, Amf0WriteError> {
        self.heap.get(id).ok_or(Amf0WriteError::UnknownObject(id))
    }

    /// Give a container the next reference slot. Slots are handed out even
    /// when the container already has one, mirroring the decoder which pushes
    /// every container it reads.
    fn register(&mut self, id: ObjectId) {
        let index = self.next_index;
        self.references.entry(id).or_insert(index);
        self.next_index += 1;
    }

    /// Write a property key: u16 length followed by the UTF-8 bytes.
    pub fn encode_key(writer: &mut impl io::Write, key: &str) -> Result<usize, Amf0WriteError> {
        if key.len() > (u16::MAX as usize) {
            return Err(Amf0WriteError::NormalStringTooLong);
        }

        writer.write_u16::<BigEndian>(key.len() as u16)?;
        writer.write_all(key.as_bytes())?;
        Ok(2 + key.len())
    }

    /// Write object end marker to signify the end of an AMF0 object
    pub fn object_eof(writer: &mut impl io::Write) -> Result<usize, Amf0WriteError> {
        let written = Self::encode_key(writer, "")?;
        Ok(written + Self::encode_object_end(writer)?)
    }

    /// Encode an AMF0 number
    pub fn encode_number(writer: &mut impl io::Write, value: f64) -> Result<usize, Amf0WriteError> {
        writer.write_u8(Amf0Marker::Number as u8)?;
        writer.write_f64::<BigEndian>(value)?;
        Ok(9)
    }

    /// Encode an AMF0 boolean
    pub fn encode_bool(writer: &mut impl io::Write, value: bool) -> Result<usize, Amf0WriteError> {
        writer.write_u8(Amf0Marker::Boolean as u8)?;
        writer.write_u8(value as u8)?;
        Ok(2)
    }

    /// Encode an AMF0 string
    pub fn encode_string(writer: &mut impl io::Write, value: &str) -> Result<usize, Amf0WriteError> {
        if value.len() > (u16::MAX as usize) {
            return Err(Amf0WriteError::NormalStringTooLong);
        }

        writer.write_u8(Amf0Marker::String as u8)?;
        Ok(1 + Self::encode_key(writer, value)?)
    }

    /// Encode an AMF0 null
    pub fn encode_null(writer: &mut impl io::Write) -> Result<usize, Amf0WriteError> {
        writer.write_u8(Amf0Marker::Null as u8)?;
        Ok(1)
    }

    /// Encode an AMF0 undefined
    pub fn encode_undefined(writer: &mut impl io::Write) -> Result<usize, Amf0WriteError> {
        writer.write_u8(Amf0Marker::Undefined as u8)?;
        Ok(1)
    }

    fn encode_object_end(writer: &mut impl io::Write) -> Result<usize, Amf0WriteError> {
        writer.write_u8(Amf0Marker::ObjectEnd as u8)?;
        Ok(1)
    }

    /// Encode an AMF0 date. The time zone is reserved and should be zero.
    pub fn encode_date(
        writer: &mut impl io::Write,
        millis: f64,
        timezone: i16,
    ) -> Result<usize, Amf0WriteError> {
        writer.write_u8(Amf0Marker::Date as u8)?;
        writer.write_f64::<BigEndian>(millis)?;
        writer.write_i16::<BigEndian>(timezone)?;
        Ok(11)
    }

    fn encode_reference(
        &mut self,
        writer: &mut impl io::Write,
        id: ObjectId,
    ) -> Result<usize, Amf0WriteError> {
        let index = match self.references.get(&id) {
            Some(index) => *index,
            None => {
                warn!(%id, index = self.next_index, "reference to an object that was not written yet");
                self.next_index
            }
        };

        let index = u16::try_from(index).map_err(|_| Amf0WriteError::TooManyReferences(index))?;

        writer.write_u8(Amf0Marker::Reference as u8)?;
        writer.write_u16::<BigEndian>(index)?;
        Ok(3)
    }

    /// Write key/value pairs followed by the end marker. Strict arrays are
    /// written with their indices as keys.
    fn encode_body(
        &mut self,
        writer: &mut impl io::Write,
        object: &'h Amf0Object,
    ) -> Result<usize, Amf0WriteError> {
        let mut written = 0;

        match object {
            Amf0Object::StrictArray(values) => {
                for (index, value) in values.iter().enumerate() {
                    written += Self::encode_key(writer, &index.to_string())?;
                    written += self.write_value(writer, value, None)?;
                }
            }
            _ => {
                for (key, value) in object.properties().unwrap_or_default() {
                    written += Self::encode_key(writer, key)?;
                    written += self.write_value(writer, value, None)?;
                }
            }
        }

        Ok(written + Self::object_eof(writer)?)
    }

    fn encode_object(
        &mut self,
        writer: &mut impl io::Write,
        id: ObjectId,
    ) -> Result<usize, Amf0WriteError> {
        let object = self.lookup(id)?;
        self.register(id);
        trace!(%id, len = object.len(), "encoding object");

        writer.write_u8(Amf0Marker::Object as u8)?;
        Ok(1 + self.encode_body(writer, object)?)
    }

    fn encode_ecma_array(
        &mut self,
        writer: &mut impl io::Write,
        id: ObjectId,
    ) -> Result<usize, Amf0WriteError> {
        let object = self.lookup(id)?;
        trace!(%id, len = object.len(), "encoding ecma array");

        writer.write_u8(Amf0Marker::EcmaArray as u8)?;
        writer.write_u32::<BigEndian>(object.len() as u32)?;
        self.register(id);
        Ok(5 + self.encode_body(writer, object)?)
    }

    fn encode_strict_array(
        &mut self,
        writer: &mut impl io::Write,
        id: ObjectId,
    ) -> Result<usize, Amf0WriteError> {
        let values = match self.lookup(id)? {
            Amf0Object::StrictArray(values) => values,
            _ => {
                return Err(Amf0WriteError::IncompatibleMarker {
                    marker: Amf0Marker::StrictArray,
                    value: "keyed container",
                });
            }
        };
        self.register(id);
        trace!(%id, len = values.len(), "encoding strict array");

        writer.write_u8(Amf0Marker::StrictArray as u8)?;
        writer.write_u32::<BigEndian>(values.len() as u32)?;

        let mut written = 5;
        for value in values {
            written += self.write_value(writer, value, None)?;
        }

        Ok(written)
    }

    fn encode_typed_object(
        &mut self,
        writer: &mut impl io::Write,
        id: ObjectId,
    ) -> Result<usize, Amf0WriteError> {
        let object = self.lookup(id)?;
        let class_name = object
            .class_name()
            .ok_or(Amf0WriteError::IncompatibleMarker {
                marker: Amf0Marker::TypedObject,
                value: "untyped container",
            })?;
        self.register(id);
        trace!(%id, class_name, "encoding typed object");

        writer.write_u8(Amf0Marker::TypedObject as u8)?;
        let written = 1 + Self::encode_key(writer, class_name)?;
        Ok(written + self.encode_body(writer, object)?)
    }
}

fn describe(value: &Amf0Value) -> &'static str {
    match value {
        Amf0Value::Number(_) => "number",
        Amf0Value::Boolean(_) => "boolean",
        Amf0Value::String(_) => "string",
        Amf0Value::Null => "null",
        Amf0Value::Undefined => "undefined",
        Amf0Value::ObjectEnd => "object end",
        Amf0Value::Date { .. } => "date",
        Amf0Value::Object(_) => "container",
    }
}
