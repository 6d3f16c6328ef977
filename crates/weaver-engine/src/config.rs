//! Engine configuration

use serde::{Deserialize, Serialize};

/// Knobs for a weave or unweave call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaveConfig {
    /// Record type documentation on each node
    pub capture_documentation: bool,
    /// Record method source text on each node
    pub capture_method_sources: bool,
    /// Documentation longer than this (bytes) goes to the artefact store
    pub inline_documentation_limit: usize,
    /// Byte strings at least this long go to the artefact store
    pub inline_bytes_limit: usize,
    /// Deepest nesting walked before giving up
    pub max_depth: usize,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            capture_documentation: true,
            capture_method_sources: true,
            inline_documentation_limit: 4096,
            inline_bytes_limit: 4096,
            max_depth: 1024,
        }
    }
}

impl WeaveConfig {
    /// Config that skips documentation and method sources
    pub fn lean() -> Self {
        Self {
            capture_documentation: false,
            capture_method_sources: false,
            ..Default::default()
        }
    }

    pub fn with_capture_documentation(mut self, capture: bool) -> Self {
        self.capture_documentation = capture;
        self
    }

    pub fn with_capture_method_sources(mut self, capture: bool) -> Self {
        self.capture_method_sources = capture;
        self
    }

    pub fn with_inline_documentation_limit(mut self, limit: usize) -> Self {
        self.inline_documentation_limit = limit;
        self
    }

    pub fn with_inline_bytes_limit(mut self, limit: usize) -> Self {
        self.inline_bytes_limit = limit;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WeaveConfig::default();
        assert!(config.capture_documentation);
        assert_eq!(config.inline_bytes_limit, 4096);
        assert_eq!(config.max_depth, 1024);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: WeaveConfig = serde_json::from_str(r#"{"max_depth": 8}"#).unwrap();
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.inline_documentation_limit, 4096);
    }

    #[test]
    fn test_lean() {
        let config = WeaveConfig::lean().with_max_depth(3);
        assert!(!config.capture_documentation);
        assert!(!config.capture_method_sources);
        assert_eq!(config.max_depth, 3);
    }
}
