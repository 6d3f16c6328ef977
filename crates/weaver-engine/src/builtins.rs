//! Built-in serializer pairs
//!
//! Explicit weaving for the container shapes every graph needs: byte
//! strings, tuples, sets, type descriptors and artefact ids. All are
//! registered under [`Version::AllVersions`].

use weaver_core::{
    ArtefactId, Bytes, Dict, INNER_FIELD, NodeId, Object, ObjectRef, Set, Tuple, TypeDescriptor,
    TypeObject, TypeTag, Value, Version, Woven, WovenNode, downcast_mut, new_object,
};

use crate::artefact::ArtefactKind;
use crate::error::WeaveError;
use crate::registry::{Deserializer, Registry, Serializer};
use crate::unweave::UnweaveContext;
use crate::weave::WeaveContext;

/// Field carrying an artefact reference's hex digest in document form
pub const ARTEFACT_ID_FIELD: &str = "_id";

/// Register every built-in pair, catalog entry and opaque decoder
pub fn register_builtins(registry: &mut Registry) {
    registry.register(BytesSerializer);
    registry.register(TupleSerializer);
    registry.register(SetSerializer);
    registry.register(TypeObjectSerializer);
    registry.register(ArtefactIdSerializer);

    registry.register_default::<Bytes>();
    registry.register_default::<Tuple>();
    registry.register_default::<Set>();
    registry.register_default::<Dict>();
    registry.register_default::<TypeObject>();
    registry.register_default::<ArtefactId>();

    registry.register_opaque(Bytes::type_descriptor().tag, |payload| {
        Ok(new_object(Bytes(payload.to_vec())))
    });
}

fn concrete<'o, T: Object>(object: &'o dyn Object, expected: &str) -> Result<&'o T, WeaveError> {
    object
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| WeaveError::mismatch(expected, object.descriptor().tag.to_string()))
}

fn inject_into<T: Object>(
    target: &ObjectRef,
    expected: &str,
    apply: impl FnOnce(&mut T),
) -> Result<(), WeaveError> {
    let mut object = downcast_mut::<T>(target)
        .ok_or_else(|| WeaveError::mismatch(expected, "another object type"))?;
    apply(&mut *object);
    Ok(())
}

fn inner_str<'n>(node: &'n WovenNode) -> Result<&'n str, WeaveError> {
    node.field(INNER_FIELD)
        .and_then(Woven::as_str)
        .ok_or_else(|| WeaveError::malformed(format!("{} node needs a string `{INNER_FIELD}`", node.tag())))
}

fn inner_list(node: &WovenNode, cx: &mut UnweaveContext<'_>) -> Result<Vec<Value>, WeaveError> {
    match cx.unweave_field(node, INNER_FIELD)? {
        Value::List(items) => Ok(items),
        _ => Err(WeaveError::malformed(format!(
            "{} node needs a list `{INNER_FIELD}`",
            node.tag()
        ))),
    }
}

fn woven_list(items: impl Iterator<Item = Value>, cx: &mut WeaveContext<'_>) -> Result<Woven, WeaveError> {
    items
        .map(|item| cx.weave(&item))
        .collect::<Result<Vec<_>, _>>()
        .map(Woven::List)
}

/// Byte strings: inline hex, or a `bytes` artefact once large
#[derive(Debug, Clone, Copy)]
pub struct BytesSerializer;

impl Serializer for BytesSerializer {
    fn descriptor(&self) -> TypeDescriptor {
        Bytes::type_descriptor()
    }

    fn weave(
        &self,
        object: &dyn Object,
        identity: NodeId,
        cx: &mut WeaveContext<'_>,
    ) -> Result<Woven, WeaveError> {
        let bytes = concrete::<Bytes>(object, "bytes")?;
        if bytes.len() >= cx.config().inline_bytes_limit {
            let id = cx.put_artefact(bytes.as_slice(), &ArtefactKind::Bytes)?;
            return Ok(Woven::Artefact(id));
        }
        let node = cx
            .node(identity, object)?
            .with_field(INNER_FIELD, Woven::Str(hex::encode(bytes.as_slice())));
        Ok(Woven::node(node))
    }
}

impl Deserializer for BytesSerializer {
    fn descriptor(&self) -> TypeDescriptor {
        Bytes::type_descriptor()
    }

    fn instantiate(&self, _node: &WovenNode) -> Result<ObjectRef, WeaveError> {
        Ok(new_object(Bytes::default()))
    }

    fn inject(
        &self,
        target: &ObjectRef,
        node: &WovenNode,
        _cx: &mut UnweaveContext<'_>,
    ) -> Result<(), WeaveError> {
        let decoded = hex::decode(inner_str(node)?)
            .map_err(|e| WeaveError::malformed(format!("bytes payload: {e}")))?;
        inject_into::<Bytes>(target, "bytes", |bytes| bytes.0 = decoded)
    }
}

/// Tuples: elements in order under `__inner__`
#[derive(Debug, Clone, Copy)]
pub struct TupleSerializer;

impl Serializer for TupleSerializer {
    fn descriptor(&self) -> TypeDescriptor {
        Tuple::type_descriptor()
    }

    fn weave(
        &self,
        object: &dyn Object,
        identity: NodeId,
        cx: &mut WeaveContext<'_>,
    ) -> Result<Woven, WeaveError> {
        let tuple = concrete::<Tuple>(object, "tuple")?;
        let items = woven_list(tuple.0.iter().cloned(), cx)?;
        Ok(Woven::node(cx.node(identity, object)?.with_field(INNER_FIELD, items)))
    }
}

impl Deserializer for TupleSerializer {
    fn descriptor(&self) -> TypeDescriptor {
        Tuple::type_descriptor()
    }

    fn instantiate(&self, _node: &WovenNode) -> Result<ObjectRef, WeaveError> {
        Ok(new_object(Tuple::default()))
    }

    fn inject(
        &self,
        target: &ObjectRef,
        node: &WovenNode,
        cx: &mut UnweaveContext<'_>,
    ) -> Result<(), WeaveError> {
        let items = inner_list(node, cx)?;
        inject_into::<Tuple>(target, "tuple", |tuple| tuple.0 = items)
    }
}

/// Sets: members in insertion order under `__inner__`
#[derive(Debug, Clone, Copy)]
pub struct SetSerializer;

impl Serializer for SetSerializer {
    fn descriptor(&self) -> TypeDescriptor {
        Set::type_descriptor()
    }

    fn weave(
        &self,
        object: &dyn Object,
        identity: NodeId,
        cx: &mut WeaveContext<'_>,
    ) -> Result<Woven, WeaveError> {
        let set = concrete::<Set>(object, "set")?;
        let items = woven_list(set.iter().cloned(), cx)?;
        Ok(Woven::node(cx.node(identity, object)?.with_field(INNER_FIELD, items)))
    }
}

impl Deserializer for SetSerializer {
    fn descriptor(&self) -> TypeDescriptor {
        Set::type_descriptor()
    }

    fn instantiate(&self, _node: &WovenNode) -> Result<ObjectRef, WeaveError> {
        Ok(new_object(Set::new()))
    }

    fn inject(
        &self,
        target: &ObjectRef,
        node: &WovenNode,
        cx: &mut UnweaveContext<'_>,
    ) -> Result<(), WeaveError> {
        let items = inner_list(node, cx)?;
        inject_into::<Set>(target, "set", |set| *set = items.into_iter().collect())
    }
}

/// Type descriptors: `module`, `name` and `version` fields
#[derive(Debug, Clone, Copy)]
pub struct TypeObjectSerializer;

impl Serializer for TypeObjectSerializer {
    fn descriptor(&self) -> TypeDescriptor {
        TypeObject::type_descriptor()
    }

    fn weave(
        &self,
        object: &dyn Object,
        identity: NodeId,
        cx: &mut WeaveContext<'_>,
    ) -> Result<Woven, WeaveError> {
        let described = &concrete::<TypeObject>(object, "type")?.0;
        let module = described.tag.module.iter().cloned().map(Woven::Str).collect();
        let node = cx
            .node(identity, object)?
            .with_field("module", Woven::List(module))
            .with_field("name", Woven::Str(described.tag.name.clone()))
            .with_field("version", Woven::Str(described.version.to_string()));
        Ok(Woven::node(node))
    }
}

impl Deserializer for TypeObjectSerializer {
    fn descriptor(&self) -> TypeDescriptor {
        TypeObject::type_descriptor()
    }

    fn instantiate(&self, _node: &WovenNode) -> Result<ObjectRef, WeaveError> {
        Ok(new_object(TypeObject::default()))
    }

    fn inject(
        &self,
        target: &ObjectRef,
        node: &WovenNode,
        _cx: &mut UnweaveContext<'_>,
    ) -> Result<(), WeaveError> {
        let text = |name: &str| {
            node.field(name)
                .and_then(Woven::as_str)
                .ok_or_else(|| WeaveError::malformed(format!("type node needs a string `{name}`")))
        };
        let module = node
            .field("module")
            .and_then(Woven::as_list)
            .ok_or_else(|| WeaveError::malformed("type node needs a `module` list"))?
            .iter()
            .map(|segment| {
                segment
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| WeaveError::malformed("type module segments must be strings"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let version: Version = text("version")?.parse()?;
        let descriptor = TypeTag::new(module, text("name")?).with_version(version);

        inject_into::<TypeObject>(target, "type", |object| object.0 = descriptor)
    }
}

/// Artefact ids held as ordinary values
///
/// Written with `__inner__`; `_id` is accepted on read as well.
#[derive(Debug, Clone, Copy)]
pub struct ArtefactIdSerializer;

impl Serializer for ArtefactIdSerializer {
    fn descriptor(&self) -> TypeDescriptor {
        ArtefactId::type_descriptor()
    }

    fn weave(
        &self,
        object: &dyn Object,
        identity: NodeId,
        cx: &mut WeaveContext<'_>,
    ) -> Result<Woven, WeaveError> {
        let id = concrete::<ArtefactId>(object, "artefact id")?;
        let node = cx
            .node(identity, object)?
            .with_field(INNER_FIELD, Woven::Str(id.to_hex()));
        Ok(Woven::node(node))
    }
}

impl Deserializer for ArtefactIdSerializer {
    fn descriptor(&self) -> TypeDescriptor {
        ArtefactId::type_descriptor()
    }

    fn instantiate(&self, _node: &WovenNode) -> Result<ObjectRef, WeaveError> {
        Ok(new_object(ArtefactId::default()))
    }

    fn inject(
        &self,
        target: &ObjectRef,
        node: &WovenNode,
        _cx: &mut UnweaveContext<'_>,
    ) -> Result<(), WeaveError> {
        let hex = node
            .field(INNER_FIELD)
            .or_else(|| node.field(ARTEFACT_ID_FIELD))
            .and_then(Woven::as_str)
            .ok_or_else(|| WeaveError::malformed("artefact id node needs a hex digest"))?;
        let parsed: ArtefactId = hex.parse()?;
        inject_into::<ArtefactId>(target, "artefact id", |id| *id = parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeaveConfig;
    use weaver_core::downcast_ref;
    use weaver_storage::InMemoryArtefactStore;

    fn round_trip(value: Value, config: &WeaveConfig) -> (Woven, Value) {
        let registry = Registry::defaults();
        let store = InMemoryArtefactStore::new();
        let woven = WeaveContext::new(&registry, &store, config)
            .weave(&value)
            .unwrap();
        let back = UnweaveContext::new(&registry, &store, config)
            .unweave(&woven)
            .unwrap();
        (woven, back)
    }

    #[test]
    fn test_small_bytes_inline_hex() {
        let (woven, back) = round_trip(Value::object(Bytes(b"123".to_vec())), &WeaveConfig::default());
        assert_eq!(
            woven.lookup(&[INNER_FIELD]).and_then(Woven::as_str),
            Some("313233")
        );
        let object = back.as_object().unwrap().clone();
        assert_eq!(downcast_ref::<Bytes>(&object).unwrap().as_slice(), b"123");
    }

    #[test]
    fn test_large_bytes_offloaded() {
        let config = WeaveConfig::default().with_inline_bytes_limit(8);
        let (woven, back) = round_trip(Value::object(Bytes(vec![9u8; 64])), &config);
        assert!(woven.as_artefact().is_some());
        let object = back.as_object().unwrap().clone();
        assert_eq!(downcast_ref::<Bytes>(&object).unwrap().len(), 64);
    }

    #[test]
    fn test_tuple_and_set() {
        let tuple = Value::object(Tuple(vec![Value::Int(1), Value::from("a")]));
        let (_, back) = round_trip(tuple.clone(), &WeaveConfig::default());
        assert_eq!(back, tuple);

        let set: Set = [Value::Int(1), Value::Int(2)].into_iter().collect();
        let set = Value::object(set);
        let (_, back) = round_trip(set.clone(), &WeaveConfig::default());
        assert_eq!(back, set);
    }

    #[test]
    fn test_type_object() {
        let described = TypeTag::new(["app"], "Model").with_version(Version::new(3, 1, 0));
        let (woven, back) = round_trip(
            Value::object(TypeObject(described.clone())),
            &WeaveConfig::default(),
        );
        assert_eq!(
            woven.lookup(&["version"]).and_then(Woven::as_str),
            Some("3.1.0")
        );
        let object = back.as_object().unwrap().clone();
        assert_eq!(downcast_ref::<TypeObject>(&object).unwrap().0, described);
    }

    #[test]
    fn test_artefact_id_stays_a_node() {
        let id = ArtefactId::of(b"referenced");
        let (woven, back) = round_trip(Value::object(id), &WeaveConfig::default());
        assert!(woven.as_node().is_some());
        let object = back.as_object().unwrap().clone();
        assert_eq!(*downcast_ref::<ArtefactId>(&object).unwrap(), id);
    }

    #[test]
    fn test_artefact_id_accepts_underscore_id() {
        let id = ArtefactId::of(b"legacy");
        let node = WovenNode::new(NodeId(0), ArtefactId::type_descriptor())
            .with_field(ARTEFACT_ID_FIELD, Woven::Str(id.to_hex()));
        let registry = Registry::defaults();
        let store = InMemoryArtefactStore::new();
        let config = WeaveConfig::default();
        let back = UnweaveContext::new(&registry, &store, &config)
            .unweave(&Woven::node(node))
            .unwrap();
        let object = back.as_object().unwrap().clone();
        assert_eq!(*downcast_ref::<ArtefactId>(&object).unwrap(), id);
    }

    #[test]
    fn test_serializer_rejects_wrong_object() {
        let registry = Registry::defaults();
        let store = InMemoryArtefactStore::new();
        let config = WeaveConfig::default();
        let mut cx = WeaveContext::new(&registry, &store, &config);
        let err = BytesSerializer
            .weave(&Tuple::default(), NodeId(0), &mut cx)
            .unwrap_err();
        assert!(matches!(err, WeaveError::TypeMismatch { .. }));
    }
}
