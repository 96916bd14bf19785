//! Deterministic final structure of a generation run.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::collector::{ConstantDecl, ObjectDecl};
use crate::error::GenError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Everything a renderer needs to emit one Dart unit.
pub struct GeneratedUnit {
    /// Classes sorted by name.
    pub objects: Vec<ObjectDecl>,
    /// Enums sorted by name.
    pub constants: Vec<ConstantDecl>,
    /// Imported Dart paths, sorted and deduplicated.
    pub imports: Vec<String>,
    /// Some field carries a timestamp.
    pub uses_timestamp: bool,
    /// Alias of the unit providing the built-in converters, when external.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_converter_alias: Option<String>,
}

impl GeneratedUnit {
    /// Serializes the unit to JSON text.
    ///
    /// When `pretty` is `true`, output is formatted with indentation.
    pub fn to_json_string(&self, pretty: bool) -> Result<String, GenError> {
        if pretty {
            serde_json::to_string_pretty(self)
                .map_err(|e| GenError::SerializationError(e.to_string()))
        } else {
            serde_json::to_string(self).map_err(|e| GenError::SerializationError(e.to_string()))
        }
    }

    pub fn object(&self, name: &str) -> Option<&ObjectDecl> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn constant(&self, name: &str) -> Option<&ConstantDecl> {
        self.constants.iter().find(|c| c.name == name)
    }
}

/// Sorts collected declarations into their final order.
pub fn assemble(
    mut objects: Vec<ObjectDecl>,
    mut constants: Vec<ConstantDecl>,
    imports: BTreeSet<String>,
    uses_timestamp: bool,
    common_converter_alias: Option<String>,
) -> GeneratedUnit {
    objects.sort_by(|a, b| a.name.cmp(&b.name));
    constants.sort_by(|a, b| a.name.cmp(&b.name));

    GeneratedUnit {
        objects,
        constants,
        imports: imports.into_iter().collect(),
        uses_timestamp,
        common_converter_alias,
    }
}
