//! Caller-supplied hooks consulted by the converter.

use serde::{Deserialize, Serialize};

use crate::engine::Descriptor;
use crate::error::GenError;
use crate::model::{ObjectType, TypeNode};
use crate::naming::split_qualified;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Declaration living in another generated Dart unit.
pub struct ExternalRef {
    /// Import path of the other unit (e.g. `shared/gen.dart`).
    pub path: String,
    /// Declared class name inside that unit.
    pub name: String,
}

/// Redirects named object types to declarations generated elsewhere.
///
/// Returning `Ok(None)` inlines the object as usual. Errors abort the run.
pub trait ExternalResolver {
    fn resolve(&self, object: &ObjectType) -> Result<Option<ExternalRef>, GenError>;
}

impl<F> ExternalResolver for F
where
    F: Fn(&ObjectType) -> Result<Option<ExternalRef>, GenError>,
{
    fn resolve(&self, object: &ObjectType) -> Result<Option<ExternalRef>, GenError> {
        self(object)
    }
}

/// Preempts built-in conversion for selected nodes.
pub trait ConversionOverride {
    fn convert(&self, node: &TypeNode) -> Result<Option<Descriptor>, GenError>;
}

impl<F> ConversionOverride for F
where
    F: Fn(&TypeNode) -> Result<Option<Descriptor>, GenError>,
{
    fn convert(&self, node: &TypeNode) -> Result<Option<Descriptor>, GenError> {
        self(node)
    }
}

#[derive(Debug, Clone, Default)]
/// [`ExternalResolver`] backed by a package-prefix table.
///
/// An object whose package equals a prefix, or sits below it (`prefix/...`),
/// resolves to that rule's path; the longest matching prefix wins.
pub struct PrefixResolver {
    rules: Vec<(String, String)>,
}

impl PrefixResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, prefix: impl Into<String>, path: impl Into<String>) -> Self {
        self.rules.push((prefix.into(), path.into()));
        self
    }

    /// Parses a `prefix=path` rule.
    pub fn parse_rule(rule: &str) -> Result<(String, String), GenError> {
        let (prefix, path) = rule.split_once('=').ok_or_else(|| {
            GenError::ResolverError(format!(
                "invalid external rule '{rule}'; expected 'prefix=path'"
            ))
        })?;
        let prefix = prefix.trim();
        let path = path.trim();
        if prefix.is_empty() || path.is_empty() {
            return Err(GenError::ResolverError(format!(
                "invalid external rule '{rule}'; prefix and path must be non-empty"
            )));
        }
        Ok((prefix.to_string(), path.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn matching_path(&self, package: &str) -> Option<&str> {
        self.rules
            .iter()
            .filter(|(prefix, _)| {
                package == prefix
                    || package
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, path)| path.as_str())
    }
}

impl ExternalResolver for PrefixResolver {
    fn resolve(&self, object: &ObjectType) -> Result<Option<ExternalRef>, GenError> {
        if object.name.is_empty() {
            return Ok(None);
        }
        let (package, name) = split_qualified(&object.name);
        Ok(self.matching_path(package).map(|path| ExternalRef {
            path: path.to_string(),
            name: name.to_string(),
        }))
    }
}
