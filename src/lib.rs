pub mod collector;
pub mod dart_codegen;
pub mod engine;
pub mod error;
pub mod model;
pub mod naming;
pub mod output;
pub mod registry;
pub mod resolver;

pub use collector::{ConstantDecl, ConstantMember, FieldDecl, ObjectDecl};
pub use dart_codegen::{generate_dart, generate_dart_from_path, render_dart, write_output};
pub use engine::{Descriptor, Engine, EngineConfig};
pub use error::GenError;
pub use model::{EnumMember, EnumType, FieldEntry, NumberKind, ObjectType, TypeModel, TypeNode};
pub use output::GeneratedUnit;
pub use registry::{import_alias, InlineContext, NameRegistry};
pub use resolver::{ConversionOverride, ExternalRef, ExternalResolver, PrefixResolver};

/// Converts a type model into its sorted declaration set.
pub fn generate(model: TypeModel, config: EngineConfig) -> Result<GeneratedUnit, GenError> {
    Engine::with_config(model, config).generate()
}

/// Parses a JSON type model and converts it.
pub fn generate_from_json(input: &str, config: EngineConfig) -> Result<GeneratedUnit, GenError> {
    let model = TypeModel::from_json_str(input)?;
    generate(model, config)
}
