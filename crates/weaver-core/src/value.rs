//! Runtime object model
//!
//! The graphs Weaver walks are made of [`Value`]s. Scalars, lists and maps
//! are plain data; everything with identity lives behind an [`ObjectRef`]
//! (`Rc<RefCell<dyn Object>>`), so sharing and cycles are expressed with
//! ordinary reference counting and two values refer to the same object
//! exactly when their `Rc`s point to the same allocation.
//!
//! Types opt in by implementing [`Object`]. There is no reflection: a type
//! either exposes its state as a field map, provides an opaque encoding, or
//! has an explicit serializer registered for its [`TypeTag`](crate::TypeTag).

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::error::CoreError;
use crate::type_tag::TypeDescriptor;

/// Field name → value map describing an object's state
pub type Fields = BTreeMap<String, Value>;

/// Shared, mutable, identity-bearing object
pub type ObjectRef = Rc<RefCell<dyn Object>>;

/// Upcast helper so trait objects can be downcast to their concrete type
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A value with identity that can take part in a woven graph
pub trait Object: AsAny + fmt::Debug {
    /// Type tag and version of this object
    fn descriptor(&self) -> TypeDescriptor;

    /// Human-readable documentation for the type, if any
    fn documentation(&self) -> Option<String> {
        None
    }

    /// Source text of the methods this type wants recorded, keyed by name
    fn method_sources(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    /// Introspectable state. `None` means the object can only be stored
    /// through its opaque encoding.
    fn state(&self) -> Option<Fields> {
        None
    }

    /// Populate an empty instance from a state map
    fn restore_state(&mut self, state: Fields) -> Result<(), CoreError> {
        let _ = state;
        Err(CoreError::state(format!(
            "{} does not accept restored state",
            self.descriptor().tag
        )))
    }

    /// Opaque byte encoding used when there is no introspectable state
    fn encode_opaque(&self) -> Result<Option<Vec<u8>>, CoreError> {
        Ok(None)
    }
}

/// Wrap a concrete object into a shared reference
pub fn new_object<T: Object>(object: T) -> ObjectRef {
    Rc::new(RefCell::new(object))
}

/// Address of the shared allocation, unique while the object is alive
pub fn object_address(object: &ObjectRef) -> usize {
    Rc::as_ptr(object) as *const () as usize
}

/// Borrow an object as its concrete type
pub fn downcast_ref<T: Object>(object: &ObjectRef) -> Option<Ref<'_, T>> {
    Ref::filter_map(object.borrow(), |o| o.as_any().downcast_ref::<T>()).ok()
}

/// Mutably borrow an object as its concrete type
pub fn downcast_mut<T: Object>(object: &ObjectRef) -> Option<RefMut<'_, T>> {
    RefMut::filter_map(object.borrow_mut(), |o| o.as_any_mut().downcast_mut::<T>()).ok()
}

/// A node of a runtime object graph
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Ordered sequence; not identity-tracked itself
    List(Vec<Value>),
    /// String-keyed mapping; not identity-tracked itself
    Map(BTreeMap<String, Value>),
    /// Shared object with identity
    Object(ObjectRef),
}

impl Value {
    /// Wrap a concrete object
    pub fn object<T: Object>(object: T) -> Self {
        Value::Object(new_object(object))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Identity for objects, value equality for everything else
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.same(vb))
            }
            (Value::Object(_), _) | (_, Value::Object(_)) => false,
            _ => scalar_eq(self, other),
        }
    }

    /// Compare two graphs by shape, descriptors and state
    ///
    /// Object pairs already under comparison are assumed equal, so cyclic
    /// graphs terminate.
    pub fn structurally_eq(&self, other: &Value) -> bool {
        let mut visiting = HashSet::new();
        structural(self, other, &mut visiting)
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        _ => false,
    }
}

fn structural(a: &Value, b: &Value, visiting: &mut HashSet<(usize, usize)>) -> bool {
    match (a, b) {
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| structural(p, q, visiting))
        }
        (Value::Map(x), Value::Map(y)) => fields_eq(x, y, visiting),
        (Value::Object(x), Value::Object(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            if !visiting.insert((object_address(x), object_address(y))) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            if x.descriptor() != y.descriptor() {
                return false;
            }
            match (x.state(), y.state()) {
                (Some(sx), Some(sy)) => fields_eq(&sx, &sy, visiting),
                (None, None) => match (x.encode_opaque(), y.encode_opaque()) {
                    (Ok(Some(ex)), Ok(Some(ey))) => ex == ey,
                    _ => false,
                },
                _ => false,
            }
        }
        _ => scalar_eq(a, b),
    }
}

fn fields_eq(
    x: &BTreeMap<String, Value>,
    y: &BTreeMap<String, Value>,
    visiting: &mut HashSet<(usize, usize)>,
) -> bool {
    x.len() == y.len()
        && x.iter()
            .zip(y)
            .all(|((kx, vx), (ky, vy))| kx == ky && structural(vx, vy, visiting))
}

/// Objects print as their tag and address only, so cyclic graphs format
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Value::Object(object) => {
                let address = object_address(object);
                match object.try_borrow() {
                    Ok(inner) => write!(f, "Object({} @ {address:#x})", inner.descriptor().tag),
                    Err(_) => write!(f, "Object(<borrowed> @ {address:#x})"),
                }
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.structurally_eq(other)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::Object(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Typed extraction of fields from a state map during `restore_state`
pub trait FieldsExt {
    /// Remove a field, failing when it is absent
    fn take_value(&mut self, field: &str) -> Result<Value, CoreError>;
    /// Remove a field, defaulting to `Value::Null` when absent
    fn take_or_null(&mut self, field: &str) -> Value;
    fn take_str(&mut self, field: &str) -> Result<String, CoreError>;
    fn take_int(&mut self, field: &str) -> Result<i64, CoreError>;
    fn take_float(&mut self, field: &str) -> Result<f64, CoreError>;
    fn take_bool(&mut self, field: &str) -> Result<bool, CoreError>;
    fn take_list(&mut self, field: &str) -> Result<Vec<Value>, CoreError>;
}

impl FieldsExt for Fields {
    fn take_value(&mut self, field: &str) -> Result<Value, CoreError> {
        self.remove(field)
            .ok_or_else(|| CoreError::missing_field(field))
    }

    fn take_or_null(&mut self, field: &str) -> Value {
        self.remove(field).unwrap_or_default()
    }

    fn take_str(&mut self, field: &str) -> Result<String, CoreError> {
        match self.take_value(field)? {
            Value::Str(s) => Ok(s),
            _ => Err(CoreError::field_type(field, "a string")),
        }
    }

    fn take_int(&mut self, field: &str) -> Result<i64, CoreError> {
        match self.take_value(field)? {
            Value::Int(i) => Ok(i),
            _ => Err(CoreError::field_type(field, "an integer")),
        }
    }

    fn take_float(&mut self, field: &str) -> Result<f64, CoreError> {
        self.take_value(field)?
            .as_float()
            .ok_or_else(|| CoreError::field_type(field, "a number"))
    }

    fn take_bool(&mut self, field: &str) -> Result<bool, CoreError> {
        match self.take_value(field)? {
            Value::Bool(b) => Ok(b),
            _ => Err(CoreError::field_type(field, "a boolean")),
        }
    }

    fn take_list(&mut self, field: &str) -> Result<Vec<Value>, CoreError> {
        match self.take_value(field)? {
            Value::List(items) => Ok(items),
            _ => Err(CoreError::field_type(field, "a list")),
        }
    }
}
