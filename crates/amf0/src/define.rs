use num_derive::FromPrimitive;

use crate::heap::ObjectId;

/// AMF0 marker types.
/// Defined in amf0_spec_121207.pdf section 2.1
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, FromPrimitive)]
#[repr(u8)]
pub enum Amf0Marker {
    /// number-marker
    Number = 0x00,
    /// boolean-marker
    Boolean = 0x01,
    /// string-marker
    String = 0x02,
    /// object-marker
    Object = 0x03,
    /// movieclip-marker
    ///
    /// reserved, not supported
    MovieClipMarker = 0x04,
    /// null-marker
    Null = 0x05,
    /// undefined-marker
    Undefined = 0x06,
    /// reference-marker
    Reference = 0x07,
    /// ecma-array-marker
    EcmaArray = 0x08,
    /// object-end-marker
    ObjectEnd = 0x09,
    /// strict-array-marker
    StrictArray = 0x0a,
    /// date-marker
    Date = 0x0b,
    /// long-string-marker
    ///
    /// not implemented
    LongString = 0x0c,
    /// unsupported-marker
    Unsupported = 0x0d,
    /// recordset-marker
    ///
    /// reserved, not supported
    Recordset = 0x0e,
    /// xml-document-marker
    ///
    /// not implemented
    XmlDocument = 0x0f,
    /// typed-object-marker
    TypedObject = 0x10,
}

impl Amf0Marker {
    /// Look up the marker for a tag byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        <Self as num_traits::FromPrimitive>::from_u8(byte)
    }

    /// Whether this crate can decode and encode values carrying this marker.
    pub const fn is_supported(self) -> bool {
        !matches!(
            self,
            Self::MovieClipMarker
                | Self::LongString
                | Self::Unsupported
                | Self::Recordset
                | Self::XmlDocument
        )
    }
}

/// AMF0 value types.
/// Defined in amf0_spec_121207.pdf section 2.2-2.18
///
/// Structured values (objects, arrays, typed objects) are stored in an
/// [`Amf0Heap`](crate::Amf0Heap) and referred to by [`ObjectId`]. Two values
/// holding the same id point at the same container, which is how shared and
/// cyclic graphs are expressed.
#[derive(PartialEq, Clone, Debug)]
pub enum Amf0Value {
    /// Number Type defined section 2.2
    Number(f64),
    /// Boolean Type defined section 2.3
    Boolean(bool),
    /// String Type defined section 2.4
    String(String),
    /// Null Type defined section 2.7
    Null,
    /// Undefined Type defined section 2.8
    Undefined,
    /// Object End Type defined section 2.11
    ///
    /// Only terminates object bodies, never a leaf of normal data.
    ObjectEnd,
    /// Date Type defined section 2.13
    Date {
        /// Milliseconds since the unix epoch, UTC.
        millis: f64,
        /// Reserved time zone field. Kept as read, never applied.
        timezone: i16,
    },
    /// A container stored in the heap: Object (2.5), ECMA Array (2.10),
    /// Strict Array (2.12) or Typed Object (2.18).
    Object(ObjectId),
}

impl Amf0Value {
    /// Create a date value with the reserved time zone set to zero.
    pub const fn date(millis: f64) -> Self {
        Self::Date {
            millis,
            timezone: 0,
        }
    }

    /// Get the number if this is a [`Amf0Value::Number`].
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the boolean if this is a [`Amf0Value::Boolean`].
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the string if this is a [`Amf0Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the heap id if this is a [`Amf0Value::Object`].
    pub const fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            Self::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Get the marker of a scalar value.
    ///
    /// Returns `None` for heap containers, whose marker depends on the
    /// reference table of the current encode.
    pub const fn scalar_marker(&self) -> Option<Amf0Marker> {
        match self {
            Self::Number(_) => Some(Amf0Marker::Number),
            Self::Boolean(_) => Some(Amf0Marker::Boolean),
            Self::String(_) => Some(Amf0Marker::String),
            Self::Null => Some(Amf0Marker::Null),
            Self::Undefined => Some(Amf0Marker::Undefined),
            Self::ObjectEnd => Some(Amf0Marker::ObjectEnd),
            Self::Date { .. } => Some(Amf0Marker::Date),
            Self::Object(_) => None,
        }
    }
}

impl From<f64> for Amf0Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Amf0Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Amf0Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Amf0Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<ObjectId> for Amf0Value {
    fn from(value: ObjectId) -> Self {
        Self::Object(value)
    }
}
