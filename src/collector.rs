//! Declarations collected during one generation run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::Descriptor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Generated class for a host struct.
pub struct ObjectDecl {
    pub name: String,
    /// Fields ordered by wire key.
    pub fields: Vec<FieldDecl>,
}

impl ObjectDecl {
    /// Builds a declaration; fields are sorted by wire key, then Dart identifier.
    pub fn new(name: impl Into<String>, mut fields: Vec<FieldDecl>) -> Self {
        fields.sort_by(|a, b| {
            a.wire_key
                .cmp(&b.wire_key)
                .then_with(|| a.field.cmp(&b.field))
        });
        Self {
            name: name.into(),
            fields,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Single generated class field.
pub struct FieldDecl {
    /// Dart identifier.
    pub field: String,
    pub wire_key: String,
    /// Dart type expression.
    pub ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub required: bool,
    /// Kept on the class but left out of the JSON wire form.
    pub ignored_in_wire: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Generated enum for a host enumerated type.
pub struct ConstantDecl {
    pub name: String,
    /// Dart type of the wire value (`String`, `int`, ...).
    pub base: String,
    /// Members in source declaration order.
    pub members: Vec<ConstantMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantMember {
    pub name: String,
    /// Dart literal of the wire value.
    pub value: String,
}

/// Identity-keyed store of declarations and the descriptors that reference them.
#[derive(Debug, Default)]
pub struct DeclarationCollector {
    descriptors: HashMap<String, Descriptor>,
    objects: Vec<ObjectDecl>,
    constants: Vec<ConstantDecl>,
}

impl DeclarationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached descriptor for a named type already visited in this run.
    pub fn lookup(&self, identity: &str) -> Option<&Descriptor> {
        if identity.is_empty() {
            return None;
        }
        self.descriptors.get(identity)
    }

    /// Remembers the descriptor for `identity`; anonymous types are never cached.
    pub fn remember(&mut self, identity: &str, descriptor: &Descriptor) {
        if identity.is_empty() {
            return;
        }
        self.descriptors
            .entry(identity.to_string())
            .or_insert_with(|| descriptor.clone());
    }

    pub fn add_object(&mut self, object: ObjectDecl) {
        tracing::debug!(name = %object.name, fields = object.fields.len(), "collected object");
        self.objects.push(object);
    }

    pub fn add_constant(&mut self, constant: ConstantDecl) {
        tracing::debug!(name = %constant.name, members = constant.members.len(), "collected constant");
        self.constants.push(constant);
    }

    pub fn objects(&self) -> &[ObjectDecl] {
        &self.objects
    }

    pub fn constants(&self) -> &[ConstantDecl] {
        &self.constants
    }

    /// Hands over the collected declarations in collection order.
    pub fn into_declarations(self) -> (Vec<ObjectDecl>, Vec<ConstantDecl>) {
        (self.objects, self.constants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(wire_key: &str) -> FieldDecl {
        FieldDecl {
            field: wire_key.to_string(),
            wire_key: wire_key.to_string(),
            ty: "String".to_string(),
            converter: None,
            default: Some("''".to_string()),
            required: false,
            ignored_in_wire: false,
            tag: None,
        }
    }

    #[test]
    fn object_fields_sort_by_wire_key() {
        let object = ObjectDecl::new("User", vec![field("status"), field("Age"), field("age")]);
        let keys: Vec<&str> = object.fields.iter().map(|f| f.wire_key.as_str()).collect();
        assert_eq!(keys, vec!["Age", "age", "status"]);
    }

    #[test]
    fn equal_wire_keys_order_by_identifier() {
        let mut second = field("id");
        second.field = "legacyId".to_string();
        let mut first = field("id");
        first.field = "id".to_string();

        let forward = ObjectDecl::new("Row", vec![second.clone(), first.clone()]);
        let backward = ObjectDecl::new("Row", vec![first, second]);
        assert_eq!(forward, backward);
        assert_eq!(forward.fields[0].field, "id");
    }

    #[test]
    fn remember_ignores_anonymous_and_keeps_first() {
        let mut collector = DeclarationCollector::new();
        let first = Descriptor::object("User");
        collector.remember("", &first);
        assert!(collector.lookup("").is_none());

        collector.remember("pkg.User", &first);
        collector.remember("pkg.User", &Descriptor::object("Other"));
        assert_eq!(collector.lookup("pkg.User"), Some(&first));
    }

    #[test]
    fn declarations_keep_collection_order() {
        let mut collector = DeclarationCollector::new();
        collector.add_object(ObjectDecl::new("B", vec![]));
        collector.add_object(ObjectDecl::new("A", vec![]));
        let (objects, constants) = collector.into_declarations();
        assert_eq!(objects[0].name, "B");
        assert!(constants.is_empty());
    }
}
