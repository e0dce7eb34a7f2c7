//! A pure-rust implementation of AMF0 encoder and decoder.
//!
//! Structured values live in an [`Amf0Heap`] and are referred to by id, which
//! lets the codec handle shared and cyclic graphs through the AMF0 reference
//! marker.
//!
//! # Examples
//!
//! ```rust
//! # fn test() -> Result<(), Box<dyn std::error::Error>> {
//! use amf0::{Amf0Decoder, Amf0Encoder, Amf0Heap, Amf0Value};
//!
//! let mut heap = Amf0Heap::new();
//! let value = heap.object([("id", Amf0Value::Number(1.0)), ("name", "uop".into())]);
//!
//! // Encode a value into a writer
//! let mut writer = Vec::new();
//! let written = Amf0Encoder::new(&heap).encode(&mut writer, &value)?;
//! assert_eq!(written, writer.len());
//!
//! // Decode it again into a fresh heap
//! let mut decoded = Amf0Heap::new();
//! let value = Amf0Decoder::new(&writer, &mut decoded).decode()?;
//! let object = decoded.resolve(&value).unwrap();
//! assert_eq!(object.get("name"), Some(&Amf0Value::from("uop")));
//! # Ok(())
//! # }
//! # test().expect("test failed");
//! ```
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

use std::io::Cursor;

mod decode;
mod define;
mod encode;
mod errors;
mod heap;
pub mod json;

pub use crate::decode::{Amf0Decoder, MAX_NESTING_DEPTH};
pub use crate::define::{Amf0Marker, Amf0Value};
pub use crate::encode::Amf0Encoder;
pub use crate::errors::{Amf0ReadError, Amf0WriteError};
pub use crate::heap::{Amf0Heap, Amf0Object, ObjectId, Properties};

/// Decode one value from `buf` starting at `offset`.
///
/// Returns the value together with the number of bytes it occupied.
pub fn read_value(
    buf: &[u8],
    offset: usize,
    heap: &mut Amf0Heap,
) -> Result<(Amf0Value, usize), Amf0ReadError> {
    let mut decoder = Amf0Decoder::with_offset(buf, offset, heap);
    let value = decoder.decode()?;
    Ok((value, decoder.position() - offset))
}

/// Encode one value into `buf` starting at `offset`, overwriting bytes already
/// there and growing the vector as needed.
///
/// Returns the number of bytes written.
pub fn write_value(
    buf: &mut Vec<u8>,
    offset: usize,
    heap: &Amf0Heap,
    value: &Amf0Value,
    marker: Option<Amf0Marker>,
) -> Result<usize, Amf0WriteError> {
    let mut encoded = Vec::new();
    let mut encoder = Amf0Encoder::new(heap);
    let written = match marker {
        Some(marker) => encoder.encode_with_marker(&mut encoded, value, marker)?,
        None => encoder.encode(&mut encoded, value)?,
    };

    let mut cursor = Cursor::new(buf);
    cursor.set_position(offset as u64);
    std::io::Write::write_all(&mut cursor, &encoded)?;
    Ok(written)
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_at_offset() {
        let mut heap = Amf0Heap::new();
        let value = heap.object([("id", Amf0Value::Number(1.0)), ("name", "uop".into())]);

        let mut buf = vec![0xaa; 4];
        let written = write_value(&mut buf, 2, &heap, &value, None).unwrap();
        assert_eq!(buf.len(), 2 + written);
        assert_eq!(&buf[..2], &[0xaa, 0xaa]);

        let mut decoded = Amf0Heap::new();
        let (value, read) = read_value(&buf, 2, &mut decoded).unwrap();
        assert_eq!(read, written);

        let object = decoded.resolve(&value).unwrap();
        assert_eq!(object.get("id"), Some(&Amf0Value::Number(1.0)));
        assert_eq!(object.get("name"), Some(&Amf0Value::from("uop")));
    }

    #[test]
    fn test_cycle_survives_round_trip() {
        let mut heap = Amf0Heap::new();
        let child = heap.object([("leaf", true)]);
        let root = heap.object([("child", child)]);
        let root_id = root.as_object_id().unwrap();
        let child_id = heap
            .resolve(&root)
            .and_then(|o| o.get("child"))
            .and_then(Amf0Value::as_object_id)
            .unwrap();
        if let Some(Amf0Object::Object(properties)) = heap.get_mut(child_id) {
            properties.push(("parent".into(), Amf0Value::Object(root_id)));
        }

        let mut buf = Vec::new();
        write_value(&mut buf, 0, &heap, &root, None).unwrap();

        let mut decoded = Amf0Heap::new();
        let (root, _) = read_value(&buf, 0, &mut decoded).unwrap();
        let child = decoded
            .resolve(&root)
            .and_then(|o| o.get("child"))
            .cloned()
            .unwrap();
        let parent = decoded.resolve(&child).and_then(|o| o.get("parent"));

        assert_eq!(parent, Some(&root));
    }

    fn self_referencing_list(heap: &mut Amf0Heap) -> Amf0Value {
        let list = heap.strict_array(Vec::<Amf0Value>::new());
        let id = list.as_object_id().unwrap();
        if let Some(Amf0Object::StrictArray(values)) = heap.get_mut(id) {
            values.push(Amf0Value::Object(id));
        }
        list
    }

    #[test]
    fn test_ecma_array_cycle_round_trip() {
        let mut heap = Amf0Heap::new();
        let list = self_referencing_list(&mut heap);

        let mut buf = Vec::new();
        let written = write_value(&mut buf, 0, &heap, &list, None).unwrap();
        assert_eq!(
            buf,
            vec![0x08, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, b'0', 0x07, 0x00, 0x00, 0x00, 0x00, 0x09]
        );

        let mut decoded = Amf0Heap::new();
        let (list, read) = read_value(&buf, 0, &mut decoded).unwrap();
        assert_eq!(read, written);
        assert_eq!(decoded.resolve(&list).and_then(|o| o.get("0")), Some(&list));
    }

    #[test]
    fn test_strict_array_cycle_round_trip() {
        let mut heap = Amf0Heap::new();
        let list = self_referencing_list(&mut heap);

        let mut buf = Vec::new();
        let written =
            write_value(&mut buf, 0, &heap, &list, Some(Amf0Marker::StrictArray)).unwrap();
        assert_eq!(buf, vec![0x0a, 0x00, 0x00, 0x00, 0x01, 0x07, 0x00, 0x00]);

        let mut decoded = Amf0Heap::new();
        let (list, read) = read_value(&buf, 0, &mut decoded).unwrap();
        assert_eq!(read, written);
        assert_eq!(
            decoded.resolve(&list).and_then(Amf0Object::elements),
            Some(&[list.clone()][..])
        );
    }

    #[test]
    fn test_strict_array_with_marker() {
        let mut heap = Amf0Heap::new();
        let value = heap.strict_array(["a", "b"]);

        let mut buf = Vec::new();
        write_value(&mut buf, 0, &heap, &value, Some(Amf0Marker::StrictArray)).unwrap();
        assert_eq!(buf[0], Amf0Marker::StrictArray as u8);

        let mut decoded = Amf0Heap::new();
        let (value, _) = read_value(&buf, 0, &mut decoded).unwrap();
        assert_eq!(
            decoded.resolve(&value).and_then(Amf0Object::elements),
            Some(&[Amf0Value::from("a"), Amf0Value::from("b")][..])
        );
    }
}
