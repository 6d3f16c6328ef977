//! Configuration for the file-backed artefact store

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variable overriding the artefact directory
pub const ARTEFACT_DIR_ENV: &str = "WEAVER_ARTEFACT_DIR";

/// Configuration for [`FileArtefactStore`](crate::FileArtefactStore)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtefactStoreConfig {
    /// Directory holding one file per artefact
    pub base_dir: PathBuf,
    /// Number of two-hex-character subdirectory levels (0 = flat)
    pub shard_depth: u8,
    /// Maximum framed artefact size (bytes)
    pub max_blob_size: u64,
    /// Re-hash artefacts when reading them back
    pub verify_on_read: bool,
}

impl Default for ArtefactStoreConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./.weaver/artefacts"),
            shard_depth: 0,
            max_blob_size: 100 * 1024 * 1024, // 100MB
            verify_on_read: true,
        }
    }
}

impl ArtefactStoreConfig {
    /// Create a config rooted at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }

    /// Resolve the artefact directory from the environment
    ///
    /// `WEAVER_ARTEFACT_DIR` wins; otherwise `$HOME/.weaver/artefacts`;
    /// otherwise the relative default.
    pub fn from_env() -> Self {
        if let Ok(dir) = std::env::var(ARTEFACT_DIR_ENV) {
            return Self::new(dir);
        }
        match std::env::var_os("HOME") {
            Some(home) => Self::new(PathBuf::from(home).join(".weaver").join("artefacts")),
            None => Self::default(),
        }
    }

    /// Set the shard depth
    pub fn with_shard_depth(mut self, depth: u8) -> Self {
        self.shard_depth = depth;
        self
    }

    /// Set the maximum artefact size
    pub fn with_max_blob_size(mut self, max: u64) -> Self {
        self.max_blob_size = max;
        self
    }

    /// Enable or disable read-time verification
    pub fn with_verify_on_read(mut self, verify: bool) -> Self {
        self.verify_on_read = verify;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ArtefactStoreConfig::default();
        assert_eq!(config.shard_depth, 0);
        assert!(config.verify_on_read);
    }

    #[test]
    fn test_builder() {
        let config = ArtefactStoreConfig::new("/tmp/weaver")
            .with_shard_depth(2)
            .with_max_blob_size(10)
            .with_verify_on_read(false);
        assert_eq!(config.base_dir, PathBuf::from("/tmp/weaver"));
        assert_eq!(config.shard_depth, 2);
        assert_eq!(config.max_blob_size, 10);
        assert!(!config.verify_on_read);
    }

    #[test]
    fn test_from_env_points_at_artefacts() {
        let config = ArtefactStoreConfig::from_env();
        assert!(!config.base_dir.as_os_str().is_empty());
    }

    #[test]
    fn test_serde_round_trip() {
        let config = ArtefactStoreConfig::new("/data").with_shard_depth(1);
        let json = serde_json::to_string(&config).unwrap();
        let back: ArtefactStoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
