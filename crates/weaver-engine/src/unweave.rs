//! Unweaving: woven form → object graph
//!
//! Every rebuilt object is recorded under its node identity before its
//! fields are filled in, so a cycle marker met while filling them resolves
//! to the half-built object. Markers are therefore resolved in one pass,
//! including markers that point at an ancestor still being populated.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};
use weaver_core::{ArtefactId, Bytes, NodeId, ObjectRef, Value, Woven, WovenNode};
use weaver_storage::ArtefactStore;

use crate::artefact::ArtefactKind;
use crate::config::WeaveConfig;
use crate::error::WeaveError;
use crate::registry::Registry;
use crate::stack;

/// Call-scoped state for one unweave
pub struct UnweaveContext<'a> {
    registry: &'a Registry,
    store: &'a dyn ArtefactStore,
    config: &'a WeaveConfig,
    built: HashMap<NodeId, ObjectRef>,
    depth: usize,
}

impl<'a> UnweaveContext<'a> {
    pub fn new(
        registry: &'a Registry,
        store: &'a dyn ArtefactStore,
        config: &'a WeaveConfig,
    ) -> Self {
        Self {
            registry,
            store,
            config,
            built: HashMap::new(),
            depth: 0,
        }
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Number of objects rebuilt so far
    pub fn objects_built(&self) -> usize {
        self.built.len()
    }

    /// Unweave a nested value through this call's cache
    pub fn unweave(&mut self, woven: &Woven) -> Result<Value, WeaveError> {
        match woven {
            Woven::Null => Ok(Value::Null),
            Woven::Bool(b) => Ok(Value::Bool(*b)),
            Woven::Int(i) => Ok(Value::Int(*i)),
            Woven::Float(f) => Ok(Value::Float(*f)),
            Woven::Str(s) => Ok(Value::Str(s.clone())),
            Woven::List(items) => self.nested(|cx| {
                items
                    .iter()
                    .map(|item| cx.unweave(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List)
            }),
            Woven::Map(map) => self.nested(|cx| cx.unweave_fields(map).map(Value::Map)),
            Woven::Artefact(id) => self.resolve_artefact(id),
            Woven::Marker(marker) => {
                trace!(target = %marker.target, "Resolving cycle marker");
                self.built
                    .get(&marker.target)
                    .cloned()
                    .map(Value::Object)
                    .ok_or(WeaveError::UnresolvedCycleMarker(marker.target))
            }
            Woven::Node(node) => self.nested(|cx| cx.unweave_node(node).map(Value::Object)),
        }
    }

    /// Unweave every value of a field map
    pub fn unweave_fields(
        &mut self,
        fields: &BTreeMap<String, Woven>,
    ) -> Result<BTreeMap<String, Value>, WeaveError> {
        fields
            .iter()
            .map(|(name, woven)| Ok((name.clone(), self.unweave(woven)?)))
            .collect()
    }

    /// Unweave a required field of `node`
    pub fn unweave_field(&mut self, node: &WovenNode, name: &str) -> Result<Value, WeaveError> {
        let woven = node.field(name).ok_or_else(|| {
            WeaveError::malformed(format!("{} node has no field `{name}`", node.tag()))
        })?;
        self.unweave(woven)
    }

    /// Read an artefact and rebuild the value it holds
    ///
    /// Artefacts are not cached: each reference yields a fresh value.
    pub fn resolve_artefact(&mut self, id: &ArtefactId) -> Result<Value, WeaveError> {
        let resource = self.store.get(id)?;
        let kind = ArtefactKind::parse(resource.tag())?;
        debug!(id = %id.short(), kind = %kind, "Resolving artefact");

        match kind {
            ArtefactKind::Opaque(tag) => {
                let decoder = self
                    .registry
                    .opaque_decoder(&tag)
                    .ok_or(WeaveError::UnresolvedType(tag))?;
                Ok(Value::Object(decoder(resource.payload())?))
            }
            ArtefactKind::Bytes => Ok(Value::object(Bytes(resource.into_payload().to_vec()))),
            ArtefactKind::Text => String::from_utf8(resource.into_payload().to_vec())
                .map(Value::Str)
                .map_err(|_| WeaveError::mismatch("UTF-8 text", "binary payload")),
        }
    }

    fn nested<T>(
        &mut self,
        walk: impl FnOnce(&mut Self) -> Result<T, WeaveError>,
    ) -> Result<T, WeaveError> {
        if self.depth >= self.config.max_depth {
            return Err(WeaveError::DepthExceeded(self.config.max_depth));
        }
        self.depth += 1;
        let result = stack::guarded(|| walk(self));
        self.depth -= 1;
        result
    }

    fn unweave_node(&mut self, node: &WovenNode) -> Result<ObjectRef, WeaveError> {
        if let Some(existing) = self.built.get(&node.identity) {
            return Ok(existing.clone());
        }

        if let Some(deserializer) = self.registry.find_deserializer(node) {
            let target = deserializer.instantiate(node)?;
            self.built.insert(node.identity, target.clone());
            deserializer.inject(&target, node, self)?;
            return Ok(target);
        }

        let tag = node.tag();
        let factory = self
            .registry
            .factory(tag)
            .ok_or_else(|| WeaveError::UnresolvedType(tag.clone()))?;
        let target = factory();

        let current = target.borrow().descriptor().version;
        if current != node.descriptor.version {
            debug!(
                tag = %tag,
                stored = %node.descriptor.version,
                current = %current,
                "Restoring state across versions"
            );
        }

        self.built.insert(node.identity, target.clone());
        let state = self.unweave_fields(&node.fields)?;
        target.borrow_mut().restore_state(state)?;
        Ok(target)
    }
}
