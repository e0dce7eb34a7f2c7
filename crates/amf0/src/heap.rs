use std::fmt;

use crate::define::{Amf0Marker, Amf0Value};

/// Index of a container inside an [`Amf0Heap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Wrap a raw arena index.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The raw arena index.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered key/value pairs of an object body.
pub type Properties = Vec<(String, Amf0Value)>;

/// A structured AMF0 value owned by the heap.
#[derive(Debug, Clone, PartialEq)]
pub enum Amf0Object {
    /// Anonymous object (section 2.5).
    Object(Properties),
    /// Associative array (section 2.10). Keys are usually indices.
    EcmaArray(Properties),
    /// Dense array (section 2.12).
    StrictArray(Vec<Amf0Value>),
    /// Object tagged with a class name (section 2.18).
    TypedObject {
        /// Class name written in front of the body.
        class_name: String,
        /// Object body.
        properties: Properties,
    },
}

impl Amf0Object {
    /// The marker this container decodes from when it is not a reference.
    pub const fn marker(&self) -> Amf0Marker {
        match self {
            Self::Object(_) => Amf0Marker::Object,
            Self::EcmaArray(_) => Amf0Marker::EcmaArray,
            Self::StrictArray(_) => Amf0Marker::StrictArray,
            Self::TypedObject { .. } => Amf0Marker::TypedObject,
        }
    }

    /// Whether the container is an ordered list. List shaped containers are
    /// encoded as ECMA arrays unless a marker is given explicitly.
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::StrictArray(_) | Self::EcmaArray(_))
    }

    /// Key/value pairs for keyed containers.
    pub fn properties(&self) -> Option<&[(String, Amf0Value)]> {
        match self {
            Self::Object(p) | Self::EcmaArray(p) | Self::TypedObject { properties: p, .. } => {
                Some(p)
            }
            Self::StrictArray(_) => None,
        }
    }

    /// Elements of a strict array.
    pub fn elements(&self) -> Option<&[Amf0Value]> {
        match self {
            Self::StrictArray(values) => Some(values),
            _ => None,
        }
    }

    /// Class name of a typed object.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Self::TypedObject { class_name, .. } => Some(class_name),
            _ => None,
        }
    }

    /// Look up a property by key. The first matching key wins.
    pub fn get(&self, key: &str) -> Option<&Amf0Value> {
        self.properties()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Number of properties or elements.
    pub fn len(&self) -> usize {
        match self {
            Self::StrictArray(values) => values.len(),
            Self::Object(p) | Self::EcmaArray(p) | Self::TypedObject { properties: p, .. } => {
                p.len()
            }
        }
    }

    /// Whether the container has no properties or elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Arena holding every container of one or more AMF0 graphs.
///
/// Decoding allocates containers here and returns [`Amf0Value::Object`]
/// handles. Encoding reads from it. Containers can point at each other
/// (including themselves) through their ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Amf0Heap {
    objects: Vec<Amf0Object>,
}

impl Amf0Heap {
    /// Create an empty heap.
    pub const fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    /// Store a container and return its id.
    pub fn insert(&mut self, object: Amf0Object) -> ObjectId {
        let id = ObjectId(self.objects.len());
        self.objects.push(object);
        id
    }

    /// Store an anonymous object built from `(key, value)` pairs.
    pub fn object<K, V>(&mut self, properties: impl IntoIterator<Item = (K, V)>) -> Amf0Value
    where
        K: Into<String>,
        V: Into<Amf0Value>,
    {
        let properties = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Amf0Value::Object(self.insert(Amf0Object::Object(properties)))
    }

    /// Store a strict array built from values.
    pub fn strict_array<V: Into<Amf0Value>>(
        &mut self,
        values: impl IntoIterator<Item = V>,
    ) -> Amf0Value {
        let values = values.into_iter().map(Into::into).collect();
        Amf0Value::Object(self.insert(Amf0Object::StrictArray(values)))
    }

    /// Get a container.
    pub fn get(&self, id: ObjectId) -> Option<&Amf0Object> {
        self.objects.get(id.0)
    }

    /// Get a container mutably, e.g. to add a property pointing back at an
    /// ancestor.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Amf0Object> {
        self.objects.get_mut(id.0)
    }

    /// Resolve a value to its container, if it is one.
    pub fn resolve(&self, value: &Amf0Value) -> Option<&Amf0Object> {
        self.get(value.as_object_id()?)
    }

    /// Number of containers.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the heap holds no containers.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Drop every container allocated after the heap had `len` entries.
    ///
    /// Used to undo a decode that failed half way.
    pub fn truncate(&mut self, len: usize) {
        self.objects.truncate(len);
    }

    pub(crate) fn replace(&mut self, id: ObjectId, object: Amf0Object) {
        self.objects[id.0] = object;
    }

    /// Iterate containers together with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Amf0Object)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, object)| (ObjectId(i), object))
    }
}
