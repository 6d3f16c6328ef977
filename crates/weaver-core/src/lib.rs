//! # Weaver Core
//!
//! Core types shared by the Weaver crates.
//!
//! Weaver turns an in-memory object graph into a structured, inspectable
//! tree ("woven form") and rebuilds an equivalent graph from it later.
//! This crate holds the vocabulary both directions agree on.
//!
//! ## Key Types
//!
//! - [`Version`]: release number plus the `AllVersions` / `UnknownVersion` sentinels
//! - [`TypeTag`] / [`TypeDescriptor`]: namespaced type identity, with and without version
//! - [`ArtefactId`]: BLAKE3 content hash of a stored blob
//! - [`WovenNode`] / [`Woven`] / [`CycleMarker`]: the woven form
//! - [`Value`] / [`Object`] / [`ObjectRef`]: the runtime graphs being woven

pub mod artefact_id;
pub mod codec;
pub mod error;
pub mod node;
pub mod objects;
pub mod type_tag;
pub mod value;
pub mod version;

// Re-export main types
pub use artefact_id::ArtefactId;
pub use codec::{decode_postcard, encode_postcard};
pub use error::CoreError;
pub use node::{Census, CycleMarker, Documentation, NodeId, Woven, WovenNode};
pub use objects::{Bytes, Dict, INNER_FIELD, Set, Tuple, TypeObject};
pub use type_tag::{TypeDescriptor, TypeTag};
pub use value::{
    AsAny, Fields, FieldsExt, Object, ObjectRef, Value, downcast_mut, downcast_ref, new_object,
    object_address,
};
pub use version::{Version, WEAVER_VERSION};
