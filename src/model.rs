//! Abstract type model consumed by the converter.
//!
//! The model is produced by an external host-source parser and handed over as a
//! JSON document; this module only describes its shape and loads it.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::GenError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// Input of one generation run.
pub struct TypeModel {
    /// Root types keyed by fully-qualified identity (`pkg/path.Name`).
    pub types: BTreeMap<String, TypeNode>,
    /// Qualified names already used by hand-written or previously generated code.
    #[serde(default)]
    pub prereserved: Vec<String>,
}

impl TypeModel {
    /// Parses a type model from JSON text.
    pub fn from_json_str(input: &str) -> Result<Self, GenError> {
        serde_json::from_str(input).map_err(|e| GenError::ModelError(e.to_string()))
    }

    /// Reads and parses a type model from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GenError> {
        let path = path.as_ref();
        let input = fs::read_to_string(path).map_err(|e| {
            GenError::ModelError(format!("failed to read '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&input)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// One host data type.
pub enum TypeNode {
    String,
    Number {
        #[serde(default)]
        numeric: NumberKind,
    },
    Boolean,
    /// Timestamp carried as text on the wire.
    Date,
    /// Untyped value.
    Any,
    Array {
        inner: Box<TypeNode>,
    },
    Map {
        key: Box<TypeNode>,
        value: Box<TypeNode>,
    },
    Nullable {
        inner: Box<TypeNode>,
    },
    Object(ObjectType),
    StringEnum(EnumType),
    NumberEnum(EnumType),
    /// Points at a root type by identity; how a named type refers to itself.
    Reference {
        name: String,
    },
    /// Any `kind` this crate does not know how to map.
    #[serde(other)]
    Unsupported,
}

impl TypeNode {
    pub fn number(numeric: NumberKind) -> Self {
        TypeNode::Number { numeric }
    }

    pub fn array(inner: TypeNode) -> Self {
        TypeNode::Array {
            inner: Box::new(inner),
        }
    }

    pub fn map(key: TypeNode, value: TypeNode) -> Self {
        TypeNode::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn nullable(inner: TypeNode) -> Self {
        TypeNode::Nullable {
            inner: Box::new(inner),
        }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        TypeNode::Reference { name: name.into() }
    }

    /// Short label used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeNode::String => "string",
            TypeNode::Number { .. } => "number",
            TypeNode::Boolean => "boolean",
            TypeNode::Date => "date",
            TypeNode::Any => "any",
            TypeNode::Array { .. } => "array",
            TypeNode::Map { .. } => "map",
            TypeNode::Nullable { .. } => "nullable",
            TypeNode::Object(_) => "object",
            TypeNode::StringEnum(_) => "string_enum",
            TypeNode::NumberEnum(_) => "number_enum",
            TypeNode::Reference { .. } => "reference",
            TypeNode::Unsupported => "unsupported",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Host numeric representation of a number type.
pub enum NumberKind {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    /// Kinds with no Dart counterpart; mapped to `dynamic`.
    #[default]
    #[serde(other)]
    Other,
}

impl NumberKind {
    /// Dart type name for values of this kind.
    pub fn dart_type(self) -> &'static str {
        match self {
            NumberKind::Int
            | NumberKind::Int8
            | NumberKind::Int16
            | NumberKind::Int32
            | NumberKind::Int64
            | NumberKind::Uint
            | NumberKind::Uint8
            | NumberKind::Uint16
            | NumberKind::Uint32
            | NumberKind::Uint64 => "int",
            NumberKind::Float32 | NumberKind::Float64 => "double",
            NumberKind::Other => "dynamic",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Named (or inline) struct type.
pub struct ObjectType {
    /// Fully-qualified identity; empty for anonymous inline structs.
    #[serde(default)]
    pub name: String,
    /// Field entries in host declaration order.
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>, fields: Vec<FieldEntry>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Anonymous struct declared inline in a field.
    pub fn inline(fields: Vec<FieldEntry>) -> Self {
        Self::new(String::new(), fields)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One struct field.
pub struct FieldEntry {
    /// Host field name.
    pub name: String,
    /// Key used in the JSON wire form.
    pub wire_key: String,
    #[serde(rename = "type")]
    pub ty: TypeNode,
    /// Field may be absent or null on the wire.
    #[serde(default)]
    pub optional: bool,
    /// Raw host struct tag, e.g. `json:"id,omitempty"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Field is explicitly left out of the wire form.
    #[serde(default)]
    pub excluded: bool,
}

impl FieldEntry {
    pub fn new(name: impl Into<String>, wire_key: impl Into<String>, ty: TypeNode) -> Self {
        Self {
            name: name.into(),
            wire_key: wire_key.into(),
            ty,
            optional: false,
            tag: None,
            excluded: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Whether the field is kept out of the JSON wire form, either explicitly or
    /// through a `json:"-"` tag.
    pub fn is_wire_excluded(&self) -> bool {
        if self.excluded {
            return true;
        }
        let Some(tag) = self.tag.as_deref() else {
            return false;
        };
        json_tag_regex()
            .captures(tag)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str() == "-")
            .unwrap_or(false)
    }
}

fn json_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?:^|\s)json:"([^"]*)""#).expect("valid json tag regex"))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Enumerated type with ordered members.
pub struct EnumType {
    /// Fully-qualified identity of the enumerated type.
    #[serde(default)]
    pub name: String,
    /// Numeric representation; only meaningful for number enums.
    #[serde(default)]
    pub numeric: NumberKind,
    /// Members in source declaration order.
    #[serde(default)]
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Single `(key, value)` enum member.
pub struct EnumMember {
    pub key: String,
    pub value: JsonValue,
}

impl EnumMember {
    pub fn new(key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tagged_nodes() {
        let model = TypeModel::from_json_str(
            &json!({
                "types": {
                    "pkg.User": {
                        "kind": "object",
                        "name": "pkg.User",
                        "fields": [
                            {"name": "Age", "wire_key": "age", "type": {"kind": "number", "numeric": "int64"}},
                            {"name": "Tags", "wire_key": "tags", "type": {"kind": "array", "inner": {"kind": "string"}}, "optional": true}
                        ]
                    }
                },
                "prereserved": ["other.User"]
            })
            .to_string(),
        )
        .unwrap();

        let TypeNode::Object(user) = &model.types["pkg.User"] else {
            panic!("expected object");
        };
        assert_eq!(user.fields.len(), 2);
        assert_eq!(user.fields[0].ty, TypeNode::number(NumberKind::Int64));
        assert!(user.fields[1].optional);
        assert_eq!(model.prereserved, vec!["other.User".to_string()]);
    }

    #[test]
    fn unknown_kinds_become_unsupported() {
        let node: TypeNode = serde_json::from_value(json!({"kind": "tuple"})).unwrap();
        assert_eq!(node, TypeNode::Unsupported);

        let node: TypeNode =
            serde_json::from_value(json!({"kind": "number", "numeric": "complex128"})).unwrap();
        assert_eq!(node, TypeNode::number(NumberKind::Other));
    }

    #[test]
    fn number_kinds_map_to_dart_types() {
        assert_eq!(NumberKind::Uint16.dart_type(), "int");
        assert_eq!(NumberKind::Float32.dart_type(), "double");
        assert_eq!(NumberKind::Other.dart_type(), "dynamic");
    }

    #[test]
    fn json_dash_tag_excludes_field() {
        let field = FieldEntry::new("Secret", "Secret", TypeNode::String);
        assert!(!field.is_wire_excluded());
        assert!(field.clone().with_tag(r#"json:"-""#).is_wire_excluded());
        assert!(field
            .clone()
            .with_tag(r#"firestore:"x" json:"-""#)
            .is_wire_excluded());
        assert!(!field.clone().with_tag(r#"json:"-,""#).is_wire_excluded());
        assert!(!field.with_tag(r#"json:"secret,omitempty""#).is_wire_excluded());
    }

    #[test]
    fn malformed_model_is_model_error() {
        let err = TypeModel::from_json_str("{").unwrap_err();
        assert!(err.to_string().contains("model error"));
    }
}
