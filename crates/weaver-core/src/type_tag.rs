//! Type identities used as registry keys

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::version::Version;

/// Separator between module segments in the string form
const MODULE_SEPARATOR: char = '$';
/// Separator between the module path and the type name
const NAME_SEPARATOR: char = ':';

/// Stable, version-independent identity of a type
///
/// A namespace path plus a short name, e.g. `["builtins"], "bytes"`.
/// The string form is `builtins:bytes` / `my$app$model:Layer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeTag {
    pub module: Vec<String>,
    pub name: String,
}

impl TypeTag {
    /// Create a type tag from module segments and a name
    pub fn new<I, S>(module: I, name: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            module: module.into_iter().map(Into::into).collect(),
            name: name.into(),
        }
    }

    /// Tag for a type living in the `builtins` namespace
    pub fn builtin(name: impl Into<String>) -> Self {
        Self::new(["builtins"], name)
    }

    /// Tag for a type defined by Weaver itself (`weaver$data`)
    pub fn weaver(name: impl Into<String>) -> Self {
        Self::new(["weaver", "data"], name)
    }

    /// Attach a version, producing a full descriptor
    pub fn with_version(self, version: Version) -> TypeDescriptor {
        TypeDescriptor { tag: self, version }
    }

    /// Dotted path used in compact views (`builtins.bytes`)
    pub fn dotted(&self) -> String {
        let mut out = self.module.join(".");
        if !out.is_empty() {
            out.push('.');
        }
        out.push_str(&self.name);
        out
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let module = self.module.join(&MODULE_SEPARATOR.to_string());
        write!(f, "{module}{NAME_SEPARATOR}{}", self.name)
    }
}

impl FromStr for TypeTag {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, name) = s
            .rsplit_once(NAME_SEPARATOR)
            .ok_or_else(|| CoreError::InvalidTypeTag(s.to_string()))?;
        if name.is_empty() {
            return Err(CoreError::InvalidTypeTag(s.to_string()));
        }
        let module = if module.is_empty() {
            Vec::new()
        } else {
            module.split(MODULE_SEPARATOR).map(str::to_string).collect()
        };
        Ok(Self {
            module,
            name: name.to_string(),
        })
    }
}

/// A type tag together with the version of the type that produced a value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeDescriptor {
    #[serde(flatten)]
    pub tag: TypeTag,
    pub version: Version,
}

impl TypeDescriptor {
    /// Create a descriptor
    pub fn new(tag: TypeTag, version: Version) -> Self {
        Self { tag, version }
    }

    /// Descriptor for a built-in type, matching every version
    pub fn builtin(name: impl Into<String>) -> Self {
        TypeTag::builtin(name).with_version(Version::AllVersions)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.tag, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let tag = TypeTag::new(["app", "model"], "Layer");
        assert_eq!(tag.to_string(), "app$model:Layer");
        assert_eq!("app$model:Layer".parse::<TypeTag>().unwrap(), tag);
    }

    #[test]
    fn test_builtin_tag() {
        let tag = TypeTag::builtin("bytes");
        assert_eq!(tag.to_string(), "builtins:bytes");
        assert_eq!(tag.dotted(), "builtins.bytes");
    }

    #[test]
    fn test_parse_rejects_missing_name() {
        assert!("builtins".parse::<TypeTag>().is_err());
        assert!("builtins:".parse::<TypeTag>().is_err());
    }

    #[test]
    fn test_descriptor_json_shape() {
        let descriptor = TypeTag::weaver("ArtefactID").with_version(Version::new(0, 1, 0));
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "module": ["weaver", "data"],
                "name": "ArtefactID",
                "version": "0.1.0",
            })
        );
        let back: TypeDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, descriptor);
    }
}
