//! Recursive conversion of host type nodes into Dart type descriptors.
//!
//! One [`Engine`] owns every registry of a generation run. Named types are
//! memoized by identity before their fields are visited, so a struct that
//! refers to itself through a [`TypeNode::Reference`] terminates.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::collector::{ConstantDecl, ConstantMember, DeclarationCollector, FieldDecl, ObjectDecl};
use crate::error::GenError;
use crate::model::{EnumType, ObjectType, TypeModel, TypeNode};
use crate::naming::{escape_dart_string, field_identifier, lower_first};
use crate::output::{assemble, GeneratedUnit};
use crate::registry::{import_alias, InlineContext, NameRegistry};
use crate::resolver::{ConversionOverride, ExternalResolver};

const OBJECT_BASE: &str = "Map<String, dynamic>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Result of converting one type node.
pub struct Descriptor {
    /// Dart type used in the generated class.
    pub ty: String,
    /// Dart type of the JSON wire value.
    pub base: String,
    /// Converter expression; `None` when a structural copy suffices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converter: Option<String>,
    /// Dart literal used as the constructor default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub required: bool,
    /// Alias of the external unit the type lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_alias: Option<String>,
}

impl Descriptor {
    /// Descriptor of a locally generated class.
    pub fn object(name: &str) -> Self {
        Self {
            ty: name.to_string(),
            base: OBJECT_BASE.to_string(),
            converter: Some(format!("{name}Converter()")),
            default: None,
            required: true,
            import_alias: None,
        }
    }

    fn is_nullable(&self) -> bool {
        self.ty.ends_with('?')
    }
}

#[derive(Debug, Clone, Default)]
/// Run configuration.
pub struct EngineConfig {
    /// Extra qualified names to keep clear of, on top of the model's own list.
    pub prereserved: Vec<String>,
    /// Dart path providing the built-in converters instead of the generated unit.
    pub common_converter_path: Option<String>,
}

/// Converter for one generation run.
pub struct Engine {
    types: Rc<BTreeMap<String, TypeNode>>,
    registry: NameRegistry,
    collector: DeclarationCollector,
    external_resolver: Option<Box<dyn ExternalResolver>>,
    conversion_override: Option<Box<dyn ConversionOverride>>,
    common_converter_path: Option<String>,
    /// `alias.` prefix for built-in converter names, or empty.
    common_prefix: String,
    imported: BTreeSet<String>,
    uses_timestamp: bool,
    /// Identities of references being resolved (cycle detection)
    resolving: Vec<String>,
}

impl Engine {
    pub fn new(model: TypeModel) -> Self {
        Self::with_config(model, EngineConfig::default())
    }

    pub fn with_config(model: TypeModel, config: EngineConfig) -> Self {
        let registry = NameRegistry::new(model.prereserved.iter().chain(&config.prereserved));
        let common_prefix = config
            .common_converter_path
            .as_deref()
            .map(|path| format!("{}.", import_alias(path)))
            .unwrap_or_default();

        Self {
            types: Rc::new(model.types),
            registry,
            collector: DeclarationCollector::new(),
            external_resolver: None,
            conversion_override: None,
            common_converter_path: config.common_converter_path,
            common_prefix,
            imported: BTreeSet::new(),
            uses_timestamp: false,
            resolving: Vec::new(),
        }
    }

    pub fn with_external_resolver(mut self, resolver: impl ExternalResolver + 'static) -> Self {
        self.external_resolver = Some(Box::new(resolver));
        self
    }

    pub fn with_override(mut self, hook: impl ConversionOverride + 'static) -> Self {
        self.conversion_override = Some(Box::new(hook));
        self
    }

    /// Converts every root type and assembles the sorted output.
    ///
    /// Roots are visited in ascending identity order, which fixes who keeps a
    /// bare name when two identities share one.
    pub fn generate(mut self) -> Result<GeneratedUnit, GenError> {
        let types = Rc::clone(&self.types);
        for (identity, node) in types.iter() {
            tracing::trace!(identity = %identity, kind = node.kind_name(), "converting root");
            let node = named_root(identity, node);
            self.convert(&node, None)?;
        }

        let common_converter_alias = match &self.common_converter_path {
            Some(path) => {
                self.imported.insert(path.clone());
                Some(import_alias(path))
            }
            None => None,
        };

        let (objects, constants) = self.collector.into_declarations();
        let unit = assemble(
            objects,
            constants,
            self.imported,
            self.uses_timestamp,
            common_converter_alias,
        );

        tracing::info!(
            objects = unit.objects.len(),
            constants = unit.constants.len(),
            imports = unit.imports.len(),
            "generation finished"
        );
        Ok(unit)
    }

    /// Converts a single node.
    ///
    /// `context` names the enclosing declaration and field position, used for
    /// anonymous types.
    pub fn convert(
        &mut self,
        node: &TypeNode,
        context: Option<InlineContext<'_>>,
    ) -> Result<Descriptor, GenError> {
        if let Some(hook) = &self.conversion_override {
            if let Some(descriptor) = hook.convert(node)? {
                return Ok(descriptor);
            }
        }

        match node {
            TypeNode::Boolean => Ok(self.primitive("bool", "false")),
            TypeNode::String => Ok(self.primitive("String", "''")),
            TypeNode::Number { numeric } => Ok(self.primitive(numeric.dart_type(), "0")),
            TypeNode::Date => {
                self.uses_timestamp = true;
                Ok(Descriptor {
                    ty: "DateTime".to_string(),
                    base: "String".to_string(),
                    converter: Some(format!("{}DateTimeConverter()", self.common_prefix)),
                    default: None,
                    required: true,
                    import_alias: None,
                })
            }
            TypeNode::Any => Ok(self.primitive("dynamic", "null")),
            TypeNode::Array { inner } => {
                let inner = self.convert(inner, context)?;
                Ok(Descriptor {
                    converter: inner.converter.as_ref().map(|conv| {
                        format!(
                            "{}ListConverter<{}, {}>({})",
                            self.common_prefix, inner.ty, inner.base, conv
                        )
                    }),
                    ty: format!("List<{}>", inner.ty),
                    base: format!("List<{}>", inner.base),
                    default: Some("const []".to_string()),
                    required: false,
                    import_alias: inner.import_alias,
                })
            }
            TypeNode::Map { key, value } => {
                let key_slot;
                let value_slot;
                let (key_context, value_context) = match context {
                    Some(ctx) => {
                        key_slot = format!("{}K", ctx.slot);
                        value_slot = format!("{}V", ctx.slot);
                        (Some(ctx.branch(&key_slot)), Some(ctx.branch(&value_slot)))
                    }
                    None => (None, None),
                };

                // Keys travel as their wire text; the key converter is not used.
                let key = self.convert(key, key_context)?;
                let value = self.convert(value, value_context)?;
                Ok(Descriptor {
                    converter: value.converter.as_ref().map(|conv| {
                        format!(
                            "{}MapConverter<{}, {}, {}>({})",
                            self.common_prefix, key.ty, value.ty, value.base, conv
                        )
                    }),
                    ty: format!("Map<{}, {}>", key.ty, value.ty),
                    base: format!("Map<{}, {}>", key.ty, value.base),
                    default: Some("const {}".to_string()),
                    required: false,
                    import_alias: value.import_alias,
                })
            }
            TypeNode::Nullable { inner } => {
                let inner = self.convert(inner, context)?;
                if inner.is_nullable() {
                    return Ok(inner);
                }
                Ok(Descriptor {
                    converter: inner.converter.as_ref().map(|conv| {
                        format!(
                            "{}NullableConverter<{}, {}>({})",
                            self.common_prefix, inner.ty, inner.base, conv
                        )
                    }),
                    ty: format!("{}?", inner.ty),
                    base: format!("{}?", inner.base),
                    default: Some("null".to_string()),
                    required: false,
                    import_alias: inner.import_alias,
                })
            }
            TypeNode::StringEnum(enumeration) => {
                if enumeration.members.is_empty() {
                    return Ok(self.primitive("String", "''"));
                }
                self.convert_enum(enumeration, "String", context, |value| match value {
                    JsonValue::String(text) => format!("'{}'", escape_dart_string(text)),
                    other => format!("'{}'", escape_dart_string(&other.to_string())),
                })
            }
            TypeNode::NumberEnum(enumeration) => {
                let base = enumeration.numeric.dart_type();
                if enumeration.members.is_empty() {
                    return Ok(self.primitive(base, "0"));
                }
                self.convert_enum(enumeration, base, context, |value| match value {
                    JsonValue::String(text) => text.clone(),
                    other => other.to_string(),
                })
            }
            TypeNode::Object(object) => self.convert_object(object, context),
            TypeNode::Reference { name } => self.convert_reference(name, context),
            TypeNode::Unsupported => Err(GenError::UnsupportedType(format!(
                "type node of kind '{}' has no Dart mapping",
                node.kind_name()
            ))),
        }
    }

    fn primitive(&self, dart_type: &str, default: &str) -> Descriptor {
        Descriptor {
            ty: dart_type.to_string(),
            base: dart_type.to_string(),
            converter: Some(format!(
                "{}DoNothingConverter<{dart_type}>()",
                self.common_prefix
            )),
            default: Some(default.to_string()),
            required: false,
            import_alias: None,
        }
    }

    fn convert_enum(
        &mut self,
        enumeration: &EnumType,
        base: &str,
        context: Option<InlineContext<'_>>,
        literal: impl Fn(&JsonValue) -> String,
    ) -> Result<Descriptor, GenError> {
        if let Some(cached) = self.collector.lookup(&enumeration.name) {
            return Ok(cached.clone());
        }

        let name = self.registry.assign(&enumeration.name, context);
        let members: Vec<ConstantMember> = enumeration
            .members
            .iter()
            .map(|member| ConstantMember {
                name: lower_first(&member.key),
                value: literal(&member.value),
            })
            .collect();

        // Default names the first member in declaration order.
        let first = members
            .first()
            .map(|member| member.name.clone())
            .unwrap_or_default();

        let descriptor = Descriptor {
            ty: name.clone(),
            base: base.to_string(),
            converter: Some(format!("{name}Converter()")),
            default: Some(format!("{name}.{first}")),
            required: false,
            import_alias: None,
        };

        self.collector.add_constant(ConstantDecl {
            name,
            base: base.to_string(),
            members,
        });
        self.collector.remember(&enumeration.name, &descriptor);
        Ok(descriptor)
    }

    fn convert_object(
        &mut self,
        object: &ObjectType,
        context: Option<InlineContext<'_>>,
    ) -> Result<Descriptor, GenError> {
        let identity = object.name.as_str();
        if let Some(cached) = self.collector.lookup(identity) {
            return Ok(cached.clone());
        }

        let redirect = match &self.external_resolver {
            Some(resolver) => resolver.resolve(object)?,
            None => None,
        };
        if let Some(external) = redirect {
            let alias = import_alias(&external.path);
            tracing::debug!(
                identity,
                path = %external.path,
                alias = %alias,
                "redirected to external declaration"
            );
            self.imported.insert(external.path);

            let descriptor = Descriptor {
                ty: format!("{alias}.{}", external.name),
                base: OBJECT_BASE.to_string(),
                converter: Some(format!("{alias}.{}Converter()", external.name)),
                default: None,
                required: true,
                import_alias: Some(alias),
            };
            self.collector.remember(identity, &descriptor);
            return Ok(descriptor);
        }

        let name = self.registry.assign(identity, context);
        let descriptor = Descriptor::object(&name);
        self.collector.remember(identity, &descriptor);

        let mut fields = Vec::with_capacity(object.fields.len());
        for (position, entry) in object.fields.iter().enumerate() {
            let wrapped;
            let ty = if entry.optional {
                wrapped = TypeNode::nullable(entry.ty.clone());
                &wrapped
            } else {
                &entry.ty
            };

            let converted = self.convert(ty, Some(InlineContext::field(&name, position)))?;

            fields.push(FieldDecl {
                field: field_identifier(&entry.name),
                wire_key: entry.wire_key.clone(),
                ty: converted.ty,
                converter: converted.converter,
                default: converted.default,
                required: converted.required,
                ignored_in_wire: entry.is_wire_excluded(),
                tag: entry.tag.clone(),
            });
        }

        self.collector.add_object(ObjectDecl::new(name, fields));
        Ok(descriptor)
    }

    fn convert_reference(
        &mut self,
        identity: &str,
        context: Option<InlineContext<'_>>,
    ) -> Result<Descriptor, GenError> {
        let types = Rc::clone(&self.types);
        let target = types.get(identity).ok_or_else(|| {
            GenError::UnresolvedReference(format!("'{identity}' is not part of the type model"))
        })?;
        let target = named_root(identity, target);

        // Named types are memoized before their fields are visited, so recursion
        // through them terminates on its own.
        if matches!(
            *target,
            TypeNode::Object(_) | TypeNode::StringEnum(_) | TypeNode::NumberEnum(_)
        ) {
            return self.convert(&target, context);
        }

        if let Some(index) = self.resolving.iter().position(|seen| seen == identity) {
            let mut chain = self.resolving[index..].to_vec();
            chain.push(identity.to_string());
            return Err(GenError::UnresolvedReference(format!(
                "cyclic reference through anonymous types: {}",
                chain.join(" -> ")
            )));
        }

        self.resolving.push(identity.to_string());
        let converted = self.convert(&target, context);
        self.resolving.pop();
        converted
    }
}

/// Anonymous root objects and enums take the identity they are keyed by.
fn named_root<'n>(identity: &str, node: &'n TypeNode) -> Cow<'n, TypeNode> {
    match node {
        TypeNode::Object(object) if object.name.is_empty() => Cow::Owned(TypeNode::Object(
            ObjectType::new(identity, object.fields.clone()),
        )),
        TypeNode::StringEnum(enumeration) if enumeration.name.is_empty() => {
            Cow::Owned(TypeNode::StringEnum(EnumType {
                name: identity.to_string(),
                ..enumeration.clone()
            }))
        }
        TypeNode::NumberEnum(enumeration) if enumeration.name.is_empty() => {
            Cow::Owned(TypeNode::NumberEnum(EnumType {
                name: identity.to_string(),
                ..enumeration.clone()
            }))
        }
        _ => Cow::Borrowed(node),
    }
}
