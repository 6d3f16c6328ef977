//! Entry point tying a registry, a store and a config together

use tracing::instrument;
use weaver_core::{Documentation, Value, Woven};
use weaver_storage::ArtefactStore;

use crate::artefact::ArtefactKind;
use crate::config::WeaveConfig;
use crate::document;
use crate::error::WeaveError;
use crate::registry::Registry;
use crate::unweave::UnweaveContext;
use crate::weave::WeaveContext;

/// Weaves and unweaves values against one registry and artefact store
///
/// Each call gets its own identity cache; nothing is shared between calls
/// except the store.
pub struct Weaver<'a> {
    registry: &'a Registry,
    store: &'a dyn ArtefactStore,
    config: WeaveConfig,
}

impl<'a> Weaver<'a> {
    pub fn new(registry: &'a Registry, store: &'a dyn ArtefactStore) -> Self {
        Self {
            registry,
            store,
            config: WeaveConfig::default(),
        }
    }

    pub fn with_config(mut self, config: WeaveConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &WeaveConfig {
        &self.config
    }

    /// Convert a value into woven form
    #[instrument(skip_all)]
    pub fn weave(&self, value: &Value) -> Result<Woven, WeaveError> {
        WeaveContext::new(self.registry, self.store, &self.config).weave(value)
    }

    /// Rebuild a value from woven form
    #[instrument(skip_all)]
    pub fn unweave(&self, woven: &Woven) -> Result<Value, WeaveError> {
        UnweaveContext::new(self.registry, self.store, &self.config).unweave(woven)
    }

    /// Parse a JSON document within this weaver's depth limit
    pub fn read_json(&self, text: &str) -> Result<Woven, WeaveError> {
        document::from_json_str_with_max_depth(text, self.config.max_depth)
    }

    /// Text of captured documentation, fetching it from the store if needed
    pub fn read_documentation(&self, documentation: &Documentation) -> Result<String, WeaveError> {
        match documentation {
            Documentation::Inline(text) => Ok(text.clone()),
            Documentation::Artefact(id) => {
                let resource = self.store.get(id)?;
                if ArtefactKind::parse(resource.tag())? != ArtefactKind::Text {
                    return Err(WeaveError::mismatch("text artefact", resource.tag()));
                }
                String::from_utf8(resource.into_payload().to_vec())
                    .map_err(|_| WeaveError::mismatch("UTF-8 text", "binary payload"))
            }
        }
    }
}
