//! Conversion between AMF0 graphs and [`serde_json::Value`].
//!
//! JSON has no shared or cyclic structure, so a container that is reached
//! again while it is still being converted is written as `{"$ref": N}` where
//! `N` is its heap index. Containers shared without forming a cycle are simply
//! expanded twice.
//!
//! Dates become `{"$date": millis}` and typed objects carry their class name
//! under `"$class"`. Both forms are recognised again by [`from_json`].
//! `{"$ref": N}` is not: the index only means something in the source heap, so
//! [`from_json`] reads it back as an ordinary object with a `$ref` property.

use serde_json::{Map, Number, Value};

use crate::heap::{Amf0Heap, Amf0Object, ObjectId, Properties};
use crate::{Amf0Value, Amf0WriteError, MAX_NESTING_DEPTH};

const DATE_KEY: &str = "$date";
const CLASS_KEY: &str = "$class";
const REF_KEY: &str = "$ref";

/// Convert a value and everything reachable from it to JSON.
///
/// Fails with [`Amf0WriteError::NestingTooDeep`] on graphs nested deeper than
/// [`MAX_NESTING_DEPTH`], the same bound the codec enforces.
pub fn to_json(heap: &Amf0Heap, value: &Amf0Value) -> Result<Value, Amf0WriteError> {
    let mut path = Vec::new();
    convert(heap, value, &mut path)
}

fn number(n: f64) -> Value {
    Number::from_f64(n).map_or(Value::Null, Value::Number)
}

fn convert(
    heap: &Amf0Heap,
    value: &Amf0Value,
    path: &mut Vec<ObjectId>,
) -> Result<Value, Amf0WriteError> {
    Ok(match value {
        Amf0Value::Number(n) => number(*n),
        Amf0Value::Boolean(b) => Value::Bool(*b),
        Amf0Value::String(s) => Value::String(s.clone()),
        Amf0Value::Null | Amf0Value::Undefined | Amf0Value::ObjectEnd => Value::Null,
        Amf0Value::Date { millis, .. } => {
            let mut map = Map::new();
            map.insert(DATE_KEY.to_owned(), number(*millis));
            Value::Object(map)
        }
        Amf0Value::Object(id) => {
            if path.contains(id) {
                let mut map = Map::new();
                map.insert(REF_KEY.to_owned(), Value::from(id.index()));
                return Ok(Value::Object(map));
            }

            let Some(object) = heap.get(*id) else {
                return Ok(Value::Null);
            };

            if path.len() >= MAX_NESTING_DEPTH {
                return Err(Amf0WriteError::NestingTooDeep(path.len()));
            }

            path.push(*id);
            let json = convert_object(heap, object, path);
            path.pop();
            json?
        }
    })
}

fn convert_object(
    heap: &Amf0Heap,
    object: &Amf0Object,
    path: &mut Vec<ObjectId>,
) -> Result<Value, Amf0WriteError> {
    Ok(match object {
        Amf0Object::StrictArray(values) => Value::Array(
            values
                .iter()
                .map(|v| convert(heap, v, path))
                .collect::<Result<_, _>>()?,
        ),
        Amf0Object::EcmaArray(properties) if is_dense(properties) => Value::Array(
            properties
                .iter()
                .map(|(_, v)| convert(heap, v, path))
                .collect::<Result<_, _>>()?,
        ),
        Amf0Object::TypedObject {
            class_name,
            properties,
        } => {
            let mut map = convert_properties(heap, properties, path)?;
            map.insert(CLASS_KEY.to_owned(), Value::String(class_name.clone()));
            Value::Object(map)
        }
        Amf0Object::Object(properties) | Amf0Object::EcmaArray(properties) => {
            Value::Object(convert_properties(heap, properties, path)?)
        }
    })
}

fn convert_properties(
    heap: &Amf0Heap,
    properties: &[(String, Amf0Value)],
    path: &mut Vec<ObjectId>,
) -> Result<Map<String, Value>, Amf0WriteError> {
    properties
        .iter()
        .map(|(k, v)| Ok((k.clone(), convert(heap, v, path)?)))
        .collect()
}

/// Keys are exactly "0", "1", ... in order.
fn is_dense(properties: &[(String, Amf0Value)]) -> bool {
    properties
        .iter()
        .enumerate()
        .all(|(i, (k, _))| k.parse::<usize>().is_ok_and(|k| k == i))
}

/// Build an AMF0 value from JSON, allocating containers in `heap`.
///
/// Arrays become strict arrays when `strict_arrays` is set and ECMA arrays
/// keyed by index otherwise.
pub fn from_json(heap: &mut Amf0Heap, json: &Value, strict_arrays: bool) -> Amf0Value {
    match json {
        Value::Null => Amf0Value::Null,
        Value::Bool(b) => Amf0Value::Boolean(*b),
        Value::Number(n) => Amf0Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) => Amf0Value::String(s.clone()),
        Value::Array(values) => {
            let values: Vec<Amf0Value> = values
                .iter()
                .map(|v| from_json(heap, v, strict_arrays))
                .collect();

            let object = if strict_arrays {
                Amf0Object::StrictArray(values)
            } else {
                Amf0Object::EcmaArray(
                    values
                        .into_iter()
                        .enumerate()
                        .map(|(i, v)| (i.to_string(), v))
                        .collect(),
                )
            };
            Amf0Value::Object(heap.insert(object))
        }
        Value::Object(map) => {
            if let (1, Some(millis)) = (map.len(), map.get(DATE_KEY).and_then(Value::as_f64)) {
                return Amf0Value::date(millis);
            }

            let class_name = map.get(CLASS_KEY).and_then(Value::as_str).map(str::to_owned);
            let properties: Properties = map
                .iter()
                .filter(|(k, _)| class_name.is_none() || k.as_str() != CLASS_KEY)
                .map(|(k, v)| (k.clone(), from_json(heap, v, strict_arrays)))
                .collect();

            let object = match class_name {
                Some(class_name) => Amf0Object::TypedObject {
                    class_name,
                    properties,
                },
                None => Amf0Object::Object(properties),
            };
            Amf0Value::Object(heap.insert(object))
        }
    }
}
