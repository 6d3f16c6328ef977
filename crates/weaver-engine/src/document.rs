//! JSON document form of a woven tree
//!
//! A node is written as an envelope:
//!
//! ```text
//! {
//!   "pointer": 3,
//!   "metadata": {"module": ["app"], "name": "Layer", "version": "1.0.0"},
//!   "artefacts": [<artefact reference>...],
//!   "documentation": {"app:Layer": "text" | <artefact reference>},
//!   "method_source": {"forward": "..."},
//!   "json": {"<field>": <value>}
//! }
//! ```
//!
//! Artefact references and cycle markers reuse the envelope with
//! `weaver$data:ArtefactID` / `weaver$data:CacheMarker` metadata. A bare
//! `{"_id": "<hex>"}` object is also read as an artefact reference.
//! Untracked maps are wrapped as `{"__map__": {...}}` so they cannot be
//! mistaken for envelopes.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::{Map, Value as Json, json};
use weaver_core::{
    ArtefactId, CycleMarker, Documentation, NodeId, TypeDescriptor, TypeTag, Version,
    WEAVER_VERSION, Woven, WovenNode,
};

use crate::builtins::ARTEFACT_ID_FIELD;
use crate::config::WeaveConfig;
use crate::error::WeaveError;
use crate::stack;

const POINTER: &str = "pointer";
const METADATA: &str = "metadata";
const ARTEFACTS: &str = "artefacts";
const DOCUMENTATION: &str = "documentation";
const METHOD_SOURCE: &str = "method_source";
const FIELDS: &str = "json";
const MAP: &str = "__map__";

const REQUIRED: [&str; 5] = [POINTER, METADATA, ARTEFACTS, DOCUMENTATION, FIELDS];

fn marker_tag() -> TypeTag {
    TypeTag::weaver("CacheMarker")
}

fn artefact_tag() -> TypeTag {
    TypeTag::weaver("ArtefactID")
}

fn metadata(descriptor: &TypeDescriptor) -> Json {
    json!({
        "module": descriptor.tag.module,
        "name": descriptor.tag.name,
        "version": descriptor.version.to_string(),
    })
}

fn envelope(pointer: Json, descriptor: &TypeDescriptor, fields: Map<String, Json>) -> Json {
    json!({
        POINTER: pointer,
        METADATA: metadata(descriptor),
        ARTEFACTS: [],
        DOCUMENTATION: {},
        METHOD_SOURCE: {},
        FIELDS: fields,
    })
}

fn artefact_reference(id: &ArtefactId) -> Json {
    let mut fields = Map::new();
    fields.insert(ARTEFACT_ID_FIELD.to_string(), Json::String(id.to_hex()));
    envelope(
        Json::Null,
        &artefact_tag().with_version(WEAVER_VERSION),
        fields,
    )
}

/// Render a woven tree as a JSON document
///
/// Non-finite floats have no JSON form and are written as `null`.
pub fn to_document(woven: &Woven) -> Json {
    stack::guarded(|| render(woven))
}

fn render(woven: &Woven) -> Json {
    match woven {
        Woven::Null => Json::Null,
        Woven::Bool(b) => Json::Bool(*b),
        Woven::Int(i) => Json::from(*i),
        Woven::Float(f) => serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Woven::Str(s) => Json::String(s.clone()),
        Woven::List(items) => Json::Array(items.iter().map(to_document).collect()),
        Woven::Map(map) => {
            let inner: Map<String, Json> = map
                .iter()
                .map(|(key, value)| (key.clone(), to_document(value)))
                .collect();
            json!({ MAP: inner })
        }
        Woven::Artefact(id) => artefact_reference(id),
        Woven::Marker(marker) => envelope(
            Json::from(marker.target.0),
            &marker_tag().with_version(WEAVER_VERSION),
            Map::new(),
        ),
        Woven::Node(node) => node_document(node),
    }
}

fn node_document(node: &WovenNode) -> Json {
    let artefacts: Vec<Json> = node.artefacts.iter().map(artefact_reference).collect();
    let documentation: Map<String, Json> = node
        .documentation
        .iter()
        .map(|(tag, doc)| {
            let value = match doc {
                Documentation::Inline(text) => Json::String(text.clone()),
                Documentation::Artefact(id) => artefact_reference(id),
            };
            (tag.to_string(), value)
        })
        .collect();
    let fields: Map<String, Json> = node
        .fields
        .iter()
        .map(|(name, value)| (name.clone(), to_document(value)))
        .collect();

    json!({
        POINTER: node.identity.0,
        METADATA: metadata(&node.descriptor),
        ARTEFACTS: artefacts,
        DOCUMENTATION: documentation,
        METHOD_SOURCE: node.method_sources,
        FIELDS: fields,
    })
}

/// JSON nesting needed for a woven tree `max_depth` containers deep
///
/// Nodes and untracked maps take two levels each; a reference or marker
/// envelope at the bottom adds a few more.
pub fn document_depth_limit(max_depth: usize) -> usize {
    max_depth.saturating_mul(2).saturating_add(4)
}

/// Pretty-printed JSON text of a woven tree
pub fn to_json_string(woven: &Woven) -> Result<String, WeaveError> {
    let document = to_document(woven);
    let levels = json_depth(&document);
    let text = stack::with_json_headroom(levels, || serde_json::to_string_pretty(&document));
    dispose(document);
    Ok(text?)
}

/// Parse JSON text into a woven tree, within the default depth limit
pub fn from_json_str(text: &str) -> Result<Woven, WeaveError> {
    from_json_str_with_max_depth(text, WeaveConfig::default().max_depth)
}

/// Parse JSON text into a woven tree at most `max_depth` containers deep
///
/// Anything [`to_json_string`] writes for a tree within the same limit
/// reads back.
pub fn from_json_str_with_max_depth(text: &str, max_depth: usize) -> Result<Woven, WeaveError> {
    if nesting_depth(text) > document_depth_limit(max_depth) {
        return Err(WeaveError::DepthExceeded(max_depth));
    }

    let mut parser = serde_json::Deserializer::from_str(text);
    parser.disable_recursion_limit();
    let document = Json::deserialize(serde_stacker::Deserializer::new(&mut parser))?;
    parser.end()?;

    let woven = from_document(&document);
    dispose(document);
    woven
}

/// Deepest bracket nesting in JSON text, ignoring string contents
fn nesting_depth(text: &str) -> usize {
    let (mut depth, mut deepest) = (0usize, 0usize);
    let (mut in_string, mut escaped) = (false, false);
    for byte in text.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

fn json_depth(document: &Json) -> usize {
    let mut deepest = 0;
    let mut pending = vec![(document, 1usize)];
    while let Some((value, depth)) = pending.pop() {
        deepest = deepest.max(depth);
        match value {
            Json::Array(items) => pending.extend(items.iter().map(|item| (item, depth + 1))),
            Json::Object(map) => pending.extend(map.values().map(|item| (item, depth + 1))),
            _ => {}
        }
    }
    deepest
}

/// Drop a document without one stack frame per nesting level
fn dispose(document: Json) {
    let mut pending = vec![document];
    while let Some(value) = pending.pop() {
        match value {
            Json::Array(items) => pending.extend(items),
            Json::Object(map) => pending.extend(map.into_iter().map(|(_, item)| item)),
            _ => {}
        }
    }
}

/// Read a woven tree back from a JSON document
pub fn from_document(document: &Json) -> Result<Woven, WeaveError> {
    stack::guarded(|| read_value(document))
}

fn read_value(document: &Json) -> Result<Woven, WeaveError> {
    match document {
        Json::Null => Ok(Woven::Null),
        Json::Bool(b) => Ok(Woven::Bool(*b)),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Ok(Woven::Int(i)),
            None => n
                .as_f64()
                .map(Woven::Float)
                .ok_or_else(|| WeaveError::malformed(format!("unrepresentable number {n}"))),
        },
        Json::String(s) => Ok(Woven::Str(s.clone())),
        Json::Array(items) => items
            .iter()
            .map(from_document)
            .collect::<Result<Vec<_>, _>>()
            .map(Woven::List),
        Json::Object(object) => read_object(object),
    }
}

fn read_object(object: &Map<String, Json>) -> Result<Woven, WeaveError> {
    if object.len() == 1
        && let Some(Json::Object(inner)) = object.get(MAP)
    {
        return read_fields(inner).map(Woven::Map);
    }

    let Some(meta) = object.get(METADATA) else {
        if let Some(id) = object.get(ARTEFACT_ID_FIELD) {
            return read_artefact_id(id).map(Woven::Artefact);
        }
        return Err(WeaveError::malformed(format!("missing key `{METADATA}`")));
    };

    let descriptor = read_metadata(meta)?;
    if descriptor.tag == marker_tag() {
        let target = read_pointer(object)?;
        return Ok(Woven::Marker(CycleMarker::new(target)));
    }
    if descriptor.tag == artefact_tag()
        && let Some(id) = object
            .get(FIELDS)
            .and_then(Json::as_object)
            .and_then(|fields| fields.get(ARTEFACT_ID_FIELD))
    {
        return read_artefact_id(id).map(Woven::Artefact);
    }

    read_node(object, descriptor).map(Woven::node)
}

fn read_node(object: &Map<String, Json>, descriptor: TypeDescriptor) -> Result<WovenNode, WeaveError> {
    if let Some(missing) = REQUIRED.iter().find(|key| !object.contains_key(**key)) {
        return Err(WeaveError::malformed(format!("missing key `{missing}`")));
    }

    let mut node = WovenNode::new(read_pointer(object)?, descriptor);
    node.artefacts = read_artefact_list(&object[ARTEFACTS])?;
    node.documentation = read_documentation(&object[DOCUMENTATION])?;
    if let Some(sources) = object.get(METHOD_SOURCE) {
        node.method_sources = read_method_sources(sources)?;
    }
    node.fields = match &object[FIELDS] {
        Json::Object(fields) => read_fields(fields)?,
        _ => return Err(WeaveError::malformed(format!("`{FIELDS}` must be an object"))),
    };
    Ok(node)
}

fn read_fields(fields: &Map<String, Json>) -> Result<BTreeMap<String, Woven>, WeaveError> {
    fields
        .iter()
        .map(|(name, value)| Ok((name.clone(), from_document(value)?)))
        .collect()
}

fn read_pointer(object: &Map<String, Json>) -> Result<NodeId, WeaveError> {
    object
        .get(POINTER)
        .and_then(Json::as_u64)
        .map(NodeId)
        .ok_or_else(|| WeaveError::malformed(format!("`{POINTER}` must be a non-negative integer")))
}

fn read_metadata(meta: &Json) -> Result<TypeDescriptor, WeaveError> {
    let meta = meta
        .as_object()
        .ok_or_else(|| WeaveError::malformed(format!("`{METADATA}` must be an object")))?;
    let text = |key: &str| {
        meta.get(key)
            .and_then(Json::as_str)
            .ok_or_else(|| WeaveError::malformed(format!("metadata needs a string `{key}`")))
    };

    let module = meta
        .get("module")
        .and_then(Json::as_array)
        .ok_or_else(|| WeaveError::malformed("metadata needs a `module` list"))?
        .iter()
        .map(|segment| {
            segment
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| WeaveError::malformed("module segments must be strings"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let version: Version = text("version")?
        .parse()
        .map_err(|e| WeaveError::malformed(format!("metadata version: {e}")))?;

    Ok(TypeTag::new(module, text("name")?).with_version(version))
}

fn read_artefact_id(value: &Json) -> Result<ArtefactId, WeaveError> {
    let hex = value
        .as_str()
        .ok_or_else(|| WeaveError::malformed(format!("`{ARTEFACT_ID_FIELD}` must be a hex string")))?;
    hex.parse()
        .map_err(|e| WeaveError::malformed(format!("artefact id: {e}")))
}

fn read_artefact_reference(value: &Json) -> Result<ArtefactId, WeaveError> {
    match from_document(value)? {
        Woven::Artefact(id) => Ok(id),
        _ => Err(WeaveError::malformed("expected an artefact reference")),
    }
}

fn read_artefact_list(value: &Json) -> Result<BTreeSet<ArtefactId>, WeaveError> {
    value
        .as_array()
        .ok_or_else(|| WeaveError::malformed(format!("`{ARTEFACTS}` must be a list")))?
        .iter()
        .map(read_artefact_reference)
        .collect()
}

fn read_documentation(value: &Json) -> Result<BTreeMap<TypeTag, Documentation>, WeaveError> {
    let entries = value
        .as_object()
        .ok_or_else(|| WeaveError::malformed(format!("`{DOCUMENTATION}` must be an object")))?;
    entries
        .iter()
        .map(|(key, doc)| {
            let tag: TypeTag = key
                .parse()
                .map_err(|e| WeaveError::malformed(format!("documentation key: {e}")))?;
            let doc = match doc {
                Json::String(text) => Documentation::Inline(text.clone()),
                other => Documentation::Artefact(read_artefact_reference(other)?),
            };
            Ok((tag, doc))
        })
        .collect()
}

fn read_method_sources(value: &Json) -> Result<BTreeMap<String, String>, WeaveError> {
    let entries = value
        .as_object()
        .ok_or_else(|| WeaveError::malformed(format!("`{METHOD_SOURCE}` must be an object")))?;
    entries
        .iter()
        .map(|(name, source)| {
            source
                .as_str()
                .map(|s| (name.clone(), s.to_string()))
                .ok_or_else(|| WeaveError::malformed(format!("method source `{name}` must be text")))
        })
        .collect()
}

/// Compact view for reading, not for unweaving
///
/// Nodes collapse to their fields plus `"version": "<dotted.Name>"`;
/// artefacts and markers become short strings.
pub fn minimal_document(woven: &Woven) -> Json {
    stack::guarded(|| minimal(woven))
}

fn minimal(woven: &Woven) -> Json {
    match woven {
        Woven::Node(node) => {
            let mut fields: Map<String, Json> = node
                .fields
                .iter()
                .map(|(name, value)| (name.clone(), minimal_document(value)))
                .collect();
            fields.insert("version".to_string(), Json::String(node.tag().dotted()));
            Json::Object(fields)
        }
        Woven::Artefact(id) => Json::String(format!("ArtefactID: {id}")),
        Woven::Marker(marker) => Json::String(format!("CycleMarker: {}", marker.target.0)),
        Woven::List(items) => Json::Array(items.iter().map(minimal_document).collect()),
        Woven::Map(map) => Json::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), minimal_document(value)))
                .collect(),
        ),
        scalar => to_document(scalar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Woven {
        let blob = ArtefactId::of(b"doc");
        let mut child = WovenNode::new(NodeId(1), TypeTag::new(["app"], "Leaf").with_version(Version::new(1, 2, 0)))
            .with_field("parent", Woven::Marker(CycleMarker::new(NodeId(0))))
            .with_field("blob", Woven::Artefact(blob));
        child
            .documentation
            .insert(child.descriptor.tag.clone(), Documentation::Artefact(blob));
        child.absorb_artefacts();

        let mut meta = BTreeMap::new();
        meta.insert("ratio".to_string(), Woven::Float(0.5));
        let mut root = WovenNode::new(NodeId(0), TypeTag::new(["app"], "Root").with_version(Version::UnknownVersion))
            .with_field("child", Woven::node(child))
            .with_field("meta", Woven::Map(meta))
            .with_field("tags", Woven::List(vec![Woven::Str("a".into()), Woven::Null]));
        root.method_sources
            .insert("describe".to_string(), "fn describe(&self) {}".to_string());
        root.documentation.insert(
            root.descriptor.tag.clone(),
            Documentation::Inline("Root of the tree.".to_string()),
        );
        root.absorb_artefacts();
        Woven::node(root)
    }

    #[test]
    fn test_document_round_trip() {
        let woven = sample();
        let document = to_document(&woven);
        assert_eq!(from_document(&document).unwrap(), woven);

        let text = to_json_string(&woven).unwrap();
        assert_eq!(from_json_str(&text).unwrap(), woven);
    }

    #[test]
    fn test_node_envelope_shape() {
        let document = to_document(&sample());
        assert_eq!(document[POINTER], json!(0));
        assert_eq!(
            document[METADATA],
            json!({"module": ["app"], "name": "Root", "version": "UnknownVersion"})
        );
        assert_eq!(document[DOCUMENTATION]["app:Root"], json!("Root of the tree."));
        assert_eq!(document[FIELDS]["meta"], json!({"__map__": {"ratio": 0.5}}));
        assert_eq!(document[ARTEFACTS].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_marker_and_artefact_envelopes() {
        let marker = to_document(&Woven::Marker(CycleMarker::new(NodeId(4))));
        assert_eq!(marker[POINTER], json!(4));
        assert_eq!(marker[METADATA]["name"], json!("CacheMarker"));

        let id = ArtefactId::of(b"x");
        let reference = to_document(&Woven::Artefact(id));
        assert_eq!(reference[FIELDS][ARTEFACT_ID_FIELD], json!(id.to_hex()));
        assert_eq!(reference[METADATA]["version"], json!("0.1.0"));
    }

    #[test]
    fn test_bare_id_is_artefact() {
        let id = ArtefactId::of(b"x");
        let woven = from_document(&json!({"_id": id.to_hex()})).unwrap();
        assert_eq!(woven, Woven::Artefact(id));
    }

    #[test]
    fn test_missing_metadata_is_malformed() {
        let mut document = to_document(&sample());
        document.as_object_mut().unwrap().remove(METADATA);
        let err = from_document(&document).unwrap_err();
        assert!(matches!(err, WeaveError::MalformedDocument(msg) if msg.contains("metadata")));
    }

    #[test]
    fn test_missing_required_key_is_malformed() {
        for key in [POINTER, ARTEFACTS, DOCUMENTATION, FIELDS] {
            let mut document = to_document(&sample());
            document.as_object_mut().unwrap().remove(key);
            assert!(
                matches!(from_document(&document), Err(WeaveError::MalformedDocument(_))),
                "removing {key} should fail"
            );
        }
    }

    #[test]
    fn test_method_source_is_optional() {
        let mut document = to_document(&sample());
        document.as_object_mut().unwrap().remove(METHOD_SOURCE);
        let node = from_document(&document).unwrap();
        assert!(node.as_node().unwrap().method_sources.is_empty());
    }

    #[test]
    fn test_plain_object_is_malformed() {
        assert!(matches!(
            from_document(&json!({"a": 1})),
            Err(WeaveError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_invalid_json_text() {
        assert!(matches!(from_json_str("{not json"), Err(WeaveError::Json(_))));
    }

    #[test]
    fn test_nesting_depth_skips_strings() {
        assert_eq!(nesting_depth("1"), 0);
        assert_eq!(nesting_depth(r#"{"a": [[1], {"b": []}]}"#), 3);
        assert_eq!(nesting_depth(r#"["[[[", "\\\"{{"]"#), 1);
    }

    #[test]
    fn test_document_depth_covers_written_json() {
        let text = to_json_string(&sample()).unwrap();
        // Root node, child node, then a reference envelope
        assert!(nesting_depth(&text) <= document_depth_limit(2));
        assert!(from_json_str_with_max_depth(&text, 2).is_ok());
        assert!(matches!(
            from_json_str_with_max_depth(&text, 1),
            Err(WeaveError::DepthExceeded(1))
        ));
    }

    #[test]
    fn test_minimal_document() {
        let minimal = minimal_document(&sample());
        assert_eq!(minimal["version"], json!("app.Root"));
        assert_eq!(minimal["child"]["version"], json!("app.Leaf"));
        assert_eq!(minimal["child"]["parent"], json!("CycleMarker: 0"));
        let blob = minimal["child"]["blob"].as_str().unwrap();
        assert!(blob.starts_with("ArtefactID: "));
        assert_eq!(minimal["meta"], json!({"ratio": 0.5}));
    }
}
