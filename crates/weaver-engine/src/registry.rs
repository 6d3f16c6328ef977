//! Type registry
//!
//! Maps a type's tag and version to the code responsible for it. Three
//! tables live here:
//!
//! - serializers and deserializers, keyed by (tag, version), used before
//!   any fallback;
//! - the type catalog, tag → factory for an empty instance, used by the
//!   generic state path;
//! - opaque decoders, tag → function rebuilding an object from the bytes
//!   its opaque encoding produced.
//!
//! Lookups match the tag first, then prefer an exact version and fall back
//! to an entry registered under [`Version::AllVersions`]. A miss is not an
//! error; the engine falls back to the generic or opaque path.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use weaver_core::{
    CoreError, NodeId, Object, ObjectRef, TypeDescriptor, TypeTag, Version, Woven, WovenNode,
    decode_postcard, new_object,
};

use crate::error::WeaveError;
use crate::unweave::UnweaveContext;
use crate::weave::WeaveContext;

/// Builds an empty instance of a type, ready for `restore_state`
pub type Factory = fn() -> ObjectRef;

/// Rebuilds an object from its opaque encoding
pub type OpaqueDecoder = fn(&[u8]) -> Result<ObjectRef, CoreError>;

/// Explicit weaving for one type
pub trait Serializer: Send + Sync {
    /// Tag and version this serializer is registered under
    fn descriptor(&self) -> TypeDescriptor;

    /// Weave `object`, already registered in the call cache as `identity`
    ///
    /// Nested values must be woven through `cx` so they share the call's
    /// identity cache.
    fn weave(
        &self,
        object: &dyn Object,
        identity: NodeId,
        cx: &mut WeaveContext<'_>,
    ) -> Result<Woven, WeaveError>;
}

/// Explicit unweaving for one type, in two steps
///
/// `instantiate` produces an empty object which the engine records under
/// the node's identity; `inject` then fills it. Cycle markers met while
/// injecting resolve to the half-built object.
pub trait Deserializer: Send + Sync {
    /// Tag and version this deserializer is registered under
    fn descriptor(&self) -> TypeDescriptor;

    fn instantiate(&self, node: &WovenNode) -> Result<ObjectRef, WeaveError>;

    fn inject(
        &self,
        target: &ObjectRef,
        node: &WovenNode,
        cx: &mut UnweaveContext<'_>,
    ) -> Result<(), WeaveError>;
}

type Table<T> = HashMap<TypeTag, HashMap<Version, Arc<T>>>;

fn insert<T: ?Sized>(table: &mut Table<T>, descriptor: TypeDescriptor, entry: Arc<T>) {
    table
        .entry(descriptor.tag)
        .or_default()
        .insert(descriptor.version, entry);
}

fn lookup<T: ?Sized>(table: &Table<T>, descriptor: &TypeDescriptor) -> Option<Arc<T>> {
    let versions = table.get(&descriptor.tag)?;
    versions
        .get(&descriptor.version)
        .or_else(|| versions.get(&Version::AllVersions))
        .cloned()
}

fn make<T: Object + Default>() -> ObjectRef {
    new_object(T::default())
}

/// Registry of serializers, deserializers and known types
#[derive(Clone, Default)]
pub struct Registry {
    serializers: Table<dyn Serializer>,
    deserializers: Table<dyn Deserializer>,
    catalog: HashMap<TypeTag, Factory>,
    opaque: HashMap<TypeTag, OpaqueDecoder>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in serializer pairs and types
    pub fn defaults() -> Self {
        let mut registry = Self::new();
        crate::builtins::register_builtins(&mut registry);
        registry
    }

    /// Register a serializer; replaces any entry for the same tag and version
    pub fn register_serializer(&mut self, serializer: impl Serializer + 'static) {
        insert(
            &mut self.serializers,
            serializer.descriptor(),
            Arc::new(serializer),
        );
    }

    /// Register a deserializer; replaces any entry for the same tag and version
    pub fn register_deserializer(&mut self, deserializer: impl Deserializer + 'static) {
        insert(
            &mut self.deserializers,
            deserializer.descriptor(),
            Arc::new(deserializer),
        );
    }

    /// Register a type implementing both directions
    pub fn register<P>(&mut self, pair: P)
    where
        P: Serializer + Deserializer + Clone + 'static,
    {
        self.register_serializer(pair.clone());
        self.register_deserializer(pair);
    }

    /// Add a type to the catalog used by the generic state path
    pub fn register_type(&mut self, tag: TypeTag, factory: Factory) {
        self.catalog.insert(tag, factory);
    }

    /// Add a `Default`-constructible type to the catalog
    pub fn register_default<T: Object + Default>(&mut self) {
        let tag = T::default().descriptor().tag;
        self.register_type(tag, make::<T>);
    }

    /// Register a decoder for artefacts produced by a type's opaque encoding
    pub fn register_opaque(&mut self, tag: TypeTag, decoder: OpaqueDecoder) {
        self.opaque.insert(tag, decoder);
    }

    /// Register a type whose opaque encoding is postcard
    pub fn register_postcard<T: Object + DeserializeOwned + Default>(&mut self) {
        let tag = T::default().descriptor().tag;
        self.register_opaque(tag, decode_postcard::<T>);
    }

    /// Serializer responsible for `object`, if any
    pub fn find_serializer(&self, object: &dyn Object) -> Option<Arc<dyn Serializer>> {
        lookup(&self.serializers, &object.descriptor())
    }

    /// Deserializer responsible for `node`, if any
    pub fn find_deserializer(&self, node: &WovenNode) -> Option<Arc<dyn Deserializer>> {
        lookup(&self.deserializers, &node.descriptor)
    }

    /// Factory for the generic state path
    pub fn factory(&self, tag: &TypeTag) -> Option<Factory> {
        self.catalog.get(tag).copied()
    }

    /// Whether the generic path can instantiate `tag`
    pub fn knows_type(&self, tag: &TypeTag) -> bool {
        self.catalog.contains_key(tag)
    }

    /// Decoder for opaque artefacts of `tag`
    pub fn opaque_decoder(&self, tag: &TypeTag) -> Option<OpaqueDecoder> {
        self.opaque.get(tag).copied()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let serializers: usize = self.serializers.values().map(HashMap::len).sum();
        let deserializers: usize = self.deserializers.values().map(HashMap::len).sum();
        f.debug_struct("Registry")
            .field("serializers", &serializers)
            .field("deserializers", &deserializers)
            .field("types", &self.catalog.len())
            .field("opaque", &self.opaque.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weaver_core::{Bytes, Dict, Tuple};

    #[derive(Debug)]
    struct Marked {
        version: Version,
    }

    impl Object for Marked {
        fn descriptor(&self) -> TypeDescriptor {
            TypeTag::new(["tests"], "Marked").with_version(self.version)
        }
    }

    #[derive(Clone)]
    struct Labelled(Version, &'static str);

    impl Serializer for Labelled {
        fn descriptor(&self) -> TypeDescriptor {
            TypeTag::new(["tests"], "Marked").with_version(self.0)
        }

        fn weave(
            &self,
            _object: &dyn Object,
            _identity: NodeId,
            _cx: &mut WeaveContext<'_>,
        ) -> Result<Woven, WeaveError> {
            Ok(Woven::Str(self.1.to_string()))
        }
    }

    fn resolved(registry: &Registry, version: Version) -> Option<Version> {
        registry
            .find_serializer(&Marked { version })
            .map(|serializer| serializer.descriptor().version)
    }

    #[test]
    fn test_exact_version_preferred() {
        let mut registry = Registry::new();
        registry.register_serializer(Labelled(Version::new(1, 0, 0), "exact"));
        registry.register_serializer(Labelled(Version::AllVersions, "any"));

        assert_eq!(
            resolved(&registry, Version::new(1, 0, 0)),
            Some(Version::new(1, 0, 0))
        );
        assert_eq!(
            resolved(&registry, Version::new(2, 0, 0)),
            Some(Version::AllVersions)
        );
    }

    #[test]
    fn test_no_wildcard_means_no_serializer() {
        let mut registry = Registry::new();
        registry.register_serializer(Labelled(Version::new(1, 0, 0), "exact"));
        assert!(resolved(&registry, Version::new(2, 0, 0)).is_none());
        assert!(resolved(&Registry::new(), Version::new(1, 0, 0)).is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = Registry::new();
        registry.register_serializer(Labelled(Version::AllVersions, "first"));
        registry.register_serializer(Labelled(Version::AllVersions, "second"));
        assert_eq!(registry.serializers.len(), 1);
        assert_eq!(registry.serializers[&TypeTag::new(["tests"], "Marked")].len(), 1);
    }

    #[test]
    fn test_defaults_cover_builtins() {
        let registry = Registry::defaults();
        assert!(registry.find_serializer(&Bytes::default()).is_some());
        assert!(registry.find_serializer(&Tuple::default()).is_some());
        assert!(registry.find_serializer(&Dict::new()).is_none());
        assert!(registry.knows_type(&Dict::type_descriptor().tag));
        assert!(registry.opaque_decoder(&Bytes::type_descriptor().tag).is_some());
    }

    #[test]
    fn test_register_default_catalog_entry() {
        let mut registry = Registry::new();
        registry.register_default::<Dict>();
        let factory = registry.factory(&Dict::type_descriptor().tag).unwrap();
        assert_eq!(factory().borrow().descriptor(), Dict::type_descriptor());
    }
}
