//! Built-in object types
//!
//! These mirror the container shapes every graph needs: byte strings,
//! fixed-size tuples, sets, string-keyed dictionaries, type descriptors and
//! artefact ids. All of them match every version of their tag.

use std::collections::BTreeMap;

use crate::artefact_id::ArtefactId;
use crate::error::CoreError;
use crate::type_tag::{TypeDescriptor, TypeTag};
use crate::value::{Fields, FieldsExt, Object, Value};
use crate::version::Version;

/// Field holding the payload of single-valued built-ins
pub const INNER_FIELD: &str = "__inner__";

fn inner(value: Value) -> Fields {
    let mut fields = Fields::new();
    fields.insert(INNER_FIELD.to_string(), value);
    fields
}

/// Immutable byte string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::builtin("bytes")
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for Bytes {
    fn from(value: &[u8]) -> Self {
        Bytes(value.to_vec())
    }
}

impl Object for Bytes {
    fn descriptor(&self) -> TypeDescriptor {
        Self::type_descriptor()
    }

    fn documentation(&self) -> Option<String> {
        Some("Immutable sequence of raw bytes.".to_string())
    }

    fn state(&self) -> Option<Fields> {
        Some(inner(Value::Str(hex::encode(&self.0))))
    }

    fn restore_state(&mut self, mut state: Fields) -> Result<(), CoreError> {
        let text = state.take_str(INNER_FIELD)?;
        self.0 = hex::decode(&text).map_err(|e| CoreError::state(e.to_string()))?;
        Ok(())
    }

    fn encode_opaque(&self) -> Result<Option<Vec<u8>>, CoreError> {
        Ok(Some(self.0.clone()))
    }
}

/// Fixed-size heterogeneous record
#[derive(Debug, Clone, Default)]
pub struct Tuple(pub Vec<Value>);

impl Tuple {
    pub fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::builtin("tuple")
    }
}

impl Object for Tuple {
    fn descriptor(&self) -> TypeDescriptor {
        Self::type_descriptor()
    }

    fn documentation(&self) -> Option<String> {
        Some("Fixed-size ordered record of values.".to_string())
    }

    fn state(&self) -> Option<Fields> {
        Some(inner(Value::List(self.0.clone())))
    }

    fn restore_state(&mut self, mut state: Fields) -> Result<(), CoreError> {
        self.0 = state.take_list(INNER_FIELD)?;
        Ok(())
    }
}

/// Unordered collection without duplicates
///
/// Membership uses [`Value::same`]: objects by identity, everything else by
/// value. Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct Set(Vec<Value>);

impl Set {
    pub fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::builtin("set")
    }

    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning false when it was already present
    pub fn insert(&mut self, value: Value) -> bool {
        if self.contains(&value) {
            return false;
        }
        self.0.push(value);
        true
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.0.iter().any(|v| v.same(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Value> for Set {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut set = Set::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

impl Object for Set {
    fn descriptor(&self) -> TypeDescriptor {
        Self::type_descriptor()
    }

    fn documentation(&self) -> Option<String> {
        Some("Unordered collection of distinct values.".to_string())
    }

    fn state(&self) -> Option<Fields> {
        Some(inner(Value::List(self.0.clone())))
    }

    fn restore_state(&mut self, mut state: Fields) -> Result<(), CoreError> {
        *self = state.take_list(INNER_FIELD)?.into_iter().collect();
        Ok(())
    }
}

/// Shared string-keyed dictionary
///
/// Unlike [`Value::Map`], a `Dict` has identity, so it can be shared and can
/// contain itself.
#[derive(Debug, Clone, Default)]
pub struct Dict(pub BTreeMap<String, Value>);

impl Dict {
    pub fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::builtin("dict")
    }

    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl Object for Dict {
    fn descriptor(&self) -> TypeDescriptor {
        Self::type_descriptor()
    }

    fn state(&self) -> Option<Fields> {
        Some(self.0.clone())
    }

    fn restore_state(&mut self, state: Fields) -> Result<(), CoreError> {
        self.0 = state;
        Ok(())
    }
}

/// A type descriptor carried as a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeObject(pub TypeDescriptor);

impl TypeObject {
    pub fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::builtin("type")
    }
}

impl Default for TypeObject {
    fn default() -> Self {
        TypeObject(TypeDescriptor::new(
            TypeTag::builtin("object"),
            Version::AllVersions,
        ))
    }
}

impl Object for TypeObject {
    fn descriptor(&self) -> TypeDescriptor {
        Self::type_descriptor()
    }

    fn documentation(&self) -> Option<String> {
        Some("Descriptor of a type: module path, name and version.".to_string())
    }

    fn state(&self) -> Option<Fields> {
        let tag = &self.0.tag;
        let mut fields = Fields::new();
        fields.insert(
            "module".to_string(),
            Value::List(tag.module.iter().cloned().map(Value::Str).collect()),
        );
        fields.insert("name".to_string(), Value::Str(tag.name.clone()));
        fields.insert("version".to_string(), Value::Str(self.0.version.to_string()));
        Some(fields)
    }

    fn restore_state(&mut self, mut state: Fields) -> Result<(), CoreError> {
        let module = state
            .take_list("module")?
            .into_iter()
            .map(|segment| match segment {
                Value::Str(s) => Ok(s),
                _ => Err(CoreError::field_type("module", "a list of strings")),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let name = state.take_str("name")?;
        let version = state.take_str("version")?.parse()?;
        self.0 = TypeDescriptor::new(TypeTag::new(module, name), version);
        Ok(())
    }
}

impl ArtefactId {
    pub fn type_descriptor() -> TypeDescriptor {
        TypeTag::weaver("ArtefactID").with_version(Version::AllVersions)
    }
}

impl Default for ArtefactId {
    fn default() -> Self {
        ArtefactId::from_bytes([0u8; 32])
    }
}

impl Object for ArtefactId {
    fn descriptor(&self) -> TypeDescriptor {
        Self::type_descriptor()
    }

    fn documentation(&self) -> Option<String> {
        Some("Content hash of an artefact held in an artefact store.".to_string())
    }

    fn state(&self) -> Option<Fields> {
        Some(inner(Value::Str(self.to_hex())))
    }

    fn restore_state(&mut self, mut state: Fields) -> Result<(), CoreError> {
        *self = state.take_str(INNER_FIELD)?.parse()?;
        Ok(())
    }
}
