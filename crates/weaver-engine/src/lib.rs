//! # Weaver Engine
//!
//! Converts object graphs to woven form and back.
//!
//! Weaving walks a [`Value`] depth-first. Scalars, lists and maps are
//! copied across; every [`Object`](weaver_core::Object) becomes a
//! [`WovenNode`](weaver_core::WovenNode) the first time it is met and a
//! [`CycleMarker`](weaver_core::CycleMarker) every time after, so shared
//! references and cycles survive the round trip. Objects that only offer
//! an opaque encoding are written to an artefact store and referenced by
//! id.
//!
//! Dispatch goes through a [`Registry`]: an explicit serializer pair for
//! the object's tag and version if one is registered, otherwise the
//! generic state path (`state()` / `restore_state()` plus a catalog
//! factory), otherwise the opaque path.
//!
//! ## Example
//!
//! ```rust
//! use weaver_core::{Dict, Value, new_object, downcast_mut};
//! use weaver_engine::{weave, unweave};
//! use weaver_storage::InMemoryArtefactStore;
//!
//! let store = InMemoryArtefactStore::new();
//! let root = new_object(Dict::new());
//! downcast_mut::<Dict>(&root).unwrap().insert("self", Value::Object(root.clone()));
//!
//! let woven = weave(&Value::Object(root.clone()), None, &store).unwrap();
//! let back = unweave(&woven, None, &store).unwrap();
//! assert_eq!(back, Value::Object(root));
//! ```

pub mod artefact;
pub mod builtins;
pub mod config;
pub mod document;
pub mod error;
pub mod registry;
mod stack;
pub mod unweave;
pub mod weave;
pub mod weaver;

pub use artefact::ArtefactKind;
pub use config::WeaveConfig;
pub use document::{
    document_depth_limit, from_document, from_json_str, from_json_str_with_max_depth,
    minimal_document, to_document, to_json_string,
};
pub use error::WeaveError;
pub use registry::{Deserializer, Factory, OpaqueDecoder, Registry, Serializer};
pub use unweave::UnweaveContext;
pub use weave::WeaveContext;
pub use weaver::Weaver;

use weaver_core::{Value, Woven};
use weaver_storage::ArtefactStore;

/// Weave `value` with `registry`, or the default registry when `None`
pub fn weave(
    value: &Value,
    registry: Option<&Registry>,
    store: &dyn ArtefactStore,
) -> Result<Woven, WeaveError> {
    let defaults;
    let registry = match registry {
        Some(registry) => registry,
        None => {
            defaults = Registry::defaults();
            &defaults
        }
    };
    Weaver::new(registry, store).weave(value)
}

/// Unweave `woven` with `registry`, or the default registry when `None`
pub fn unweave(
    woven: &Woven,
    registry: Option<&Registry>,
    store: &dyn ArtefactStore,
) -> Result<Value, WeaveError> {
    let defaults;
    let registry = match registry {
        Some(registry) => registry,
        None => {
            defaults = Registry::defaults();
            &defaults
        }
    };
    Weaver::new(registry, store).unweave(woven)
}
