//! Weaving: object graph → woven form
//!
//! The walk is depth-first. Every object is entered into the call cache
//! before its children are visited, so meeting it again anywhere below
//! (or later) produces a [`CycleMarker`] instead of a second node.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};
use weaver_core::{
    ArtefactId, CycleMarker, Documentation, NodeId, Object, ObjectRef, TypeTag, Value, Woven,
    WovenNode, object_address,
};
use weaver_storage::ArtefactStore;

use crate::artefact::ArtefactKind;
use crate::config::WeaveConfig;
use crate::error::WeaveError;
use crate::registry::Registry;
use crate::stack;

/// What an object was emitted as the first time it was met
#[derive(Debug, Clone, Copy)]
enum Emitted {
    Node(NodeId),
    Artefact(ArtefactId),
}

struct Seen {
    // Holds the allocation alive so its address is not reused in this call
    _object: ObjectRef,
    emitted: Emitted,
}

/// Call-scoped state for one weave
pub struct WeaveContext<'a> {
    registry: &'a Registry,
    store: &'a dyn ArtefactStore,
    config: &'a WeaveConfig,
    seen: HashMap<usize, Seen>,
    next_id: u64,
    depth: usize,
}

impl<'a> WeaveContext<'a> {
    pub fn new(
        registry: &'a Registry,
        store: &'a dyn ArtefactStore,
        config: &'a WeaveConfig,
    ) -> Self {
        Self {
            registry,
            store,
            config,
            seen: HashMap::new(),
            next_id: 0,
            depth: 0,
        }
    }

    pub fn config(&self) -> &WeaveConfig {
        self.config
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Number of distinct objects met so far
    pub fn objects_seen(&self) -> usize {
        self.seen.len()
    }

    /// Weave a nested value through this call's cache
    pub fn weave(&mut self, value: &Value) -> Result<Woven, WeaveError> {
        match value {
            Value::Null => Ok(Woven::Null),
            Value::Bool(b) => Ok(Woven::Bool(*b)),
            Value::Int(i) => Ok(Woven::Int(*i)),
            Value::Float(f) => Ok(Woven::Float(*f)),
            Value::Str(s) => Ok(Woven::Str(s.clone())),
            Value::List(items) => self.nested(|cx| {
                items
                    .iter()
                    .map(|item| cx.weave(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Woven::List)
            }),
            Value::Map(map) => self.nested(|cx| cx.weave_fields(map).map(Woven::Map)),
            Value::Object(object) => self.nested(|cx| cx.weave_object(object)),
        }
    }

    /// Weave every value of a field map
    pub fn weave_fields(
        &mut self,
        fields: &BTreeMap<String, Value>,
    ) -> Result<BTreeMap<String, Woven>, WeaveError> {
        fields
            .iter()
            .map(|(name, value)| Ok((name.clone(), self.weave(value)?)))
            .collect()
    }

    /// Start a node for `object`: descriptor, documentation and method sources
    ///
    /// Serializers call this and then add their fields.
    pub fn node(&mut self, identity: NodeId, object: &dyn Object) -> Result<WovenNode, WeaveError> {
        let descriptor = object.descriptor();
        let mut node = WovenNode::new(identity, descriptor);

        if self.config.capture_documentation
            && let Some(text) = object.documentation()
        {
            let doc = if text.len() > self.config.inline_documentation_limit {
                Documentation::Artefact(self.put_artefact(text.as_bytes(), &ArtefactKind::Text)?)
            } else {
                Documentation::Inline(text)
            };
            node.documentation.insert(node.descriptor.tag.clone(), doc);
        }

        if self.config.capture_method_sources {
            node.method_sources = object.method_sources();
        }

        Ok(node)
    }

    /// Write a payload to the artefact store under `kind`'s tag
    pub fn put_artefact(&self, payload: &[u8], kind: &ArtefactKind) -> Result<ArtefactId, WeaveError> {
        let id = self.store.put(payload, &kind.to_tag())?;
        debug!(id = %id.short(), kind = %kind, size = payload.len(), "Externalized artefact");
        Ok(id)
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

    fn weave_object(&mut self, object: &ObjectRef) -> Result<Woven, WeaveError> {
        let address = object_address(object);
        if let Some(seen) = self.seen.get(&address) {
            return Ok(match seen.emitted {
                Emitted::Node(target) => {
                    trace!(target = %target, "Cycle marker");
                    Woven::Marker(CycleMarker::new(target))
                }
                Emitted::Artefact(id) => Woven::Artefact(id),
            });
        }

        let identity = NodeId(self.next_id);
        self.next_id += 1;
        self.seen.insert(
            address,
            Seen {
                _object: object.clone(),
                emitted: Emitted::Node(identity),
            },
        );

        let borrowed = object.borrow();
        let mut woven = match self.registry.find_serializer(&*borrowed) {
            Some(serializer) => serializer.weave(&*borrowed, identity, self)?,
            None => self.weave_generic(&*borrowed, identity)?,
        };
        drop(borrowed);

        match &mut woven {
            Woven::Node(node) => node.absorb_artefacts(),
            Woven::Artefact(id) => {
                if let Some(seen) = self.seen.get_mut(&address) {
                    seen.emitted = Emitted::Artefact(*id);
                }
            }
            _ => {}
        }
        Ok(woven)
    }

    /// Fallback for objects without a serializer
    ///
    /// Introspectable state becomes a node. Objects whose state cannot be
    /// rebuilt by this registry, or that expose no state at all, go to the
    /// artefact store through their opaque encoding.
    fn weave_generic(&mut self, object: &dyn Object, identity: NodeId) -> Result<Woven, WeaveError> {
        let tag = object.descriptor().tag;

        if let Some(state) = object.state() {
            if self.registry.knows_type(&tag) {
                return self.state_node(object, identity, &state);
            }
            if let Some(woven) = self.weave_opaque(object, &tag)? {
                return Ok(woven);
            }
            return self.state_node(object, identity, &state);
        }

        self.weave_opaque(object, &tag)?
            .ok_or(WeaveError::Unserializable(tag))
    }

    fn state_node(
        &mut self,
        object: &dyn Object,
        identity: NodeId,
        state: &BTreeMap<String, Value>,
    ) -> Result<Woven, WeaveError> {
        let mut node = self.node(identity, object)?;
        node.fields = self.weave_fields(state)?;
        Ok(Woven::node(node))
    }

    fn weave_opaque(&mut self, object: &dyn Object, tag: &TypeTag) -> Result<Option<Woven>, WeaveError> {
        let Some(payload) = object.encode_opaque()? else {
            return Ok(None);
        };
        let id = self.put_artefact(&payload, &ArtefactKind::Opaque(tag.clone()))?;
        Ok(Some(Woven::Artefact(id)))
    }
}
