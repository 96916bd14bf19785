//! Dart source generation from an assembled [`GeneratedUnit`].

use std::fs;
use std::path::Path;

use crate::collector::{ConstantDecl, FieldDecl, ObjectDecl};
use crate::engine::{Engine, EngineConfig};
use crate::error::GenError;
use crate::model::TypeModel;
use crate::naming::escape_dart_string;
use crate::output::GeneratedUnit;
use crate::registry::import_alias;

/// Generates Dart source for an in-memory type model.
pub fn generate_dart(model: TypeModel, config: EngineConfig) -> Result<String, GenError> {
    let unit = Engine::with_config(model, config).generate()?;
    Ok(render_dart(&unit))
}

/// Generates Dart source for a type model stored as JSON at `path`.
pub fn generate_dart_from_path(
    path: impl AsRef<Path>,
    config: EngineConfig,
) -> Result<String, GenError> {
    let model = TypeModel::from_path(path)?;
    generate_dart(model, config)
}

/// Writes generated text to `path`, creating missing parent directories.
pub fn write_output(path: impl AsRef<Path>, content: &str) -> Result<(), GenError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// Renders one Dart unit.
///
/// The built-in converters are emitted inline unless the unit names an external
/// unit providing them.
pub fn render_dart(unit: &GeneratedUnit) -> String {
    let mut out = String::new();
    out.push_str("// Generated by dartgen.\n");
    out.push_str("// WARNING: This file is generated. Do not edit manually.\n");
    out.push_str("// ignore_for_file: unused_import, constant_identifier_names\n");

    if !unit.imports.is_empty() {
        out.push('\n');
        for path in &unit.imports {
            out.push_str(&format!(
                "import '{}' as {};\n",
                escape_dart_string(path),
                import_alias(path)
            ));
        }
    }

    let base_class = match &unit.common_converter_alias {
        Some(alias) => format!("{alias}.WireConverter"),
        None => {
            out.push('\n');
            out.push_str(&render_converter_runtime(unit.uses_timestamp));
            "WireConverter".to_string()
        }
    };

    let mut definitions = Vec::with_capacity(unit.constants.len() + unit.objects.len());
    for constant in &unit.constants {
        definitions.push(render_enum(constant, &base_class));
    }
    for object in &unit.objects {
        definitions.push(render_class(object, &base_class));
    }

    if definitions.is_empty() {
        out.push_str("\n// No declarations generated.\n");
        return out;
    }

    out.push('\n');
    out.push_str(&definitions.join("\n\n"));
    out.push('\n');
    out
}

fn render_converter_runtime(uses_timestamp: bool) -> String {
    let mut out = concat!(
        "abstract class WireConverter<T, B> {\n",
        "  const WireConverter();\n",
        "\n",
        "  T fromJson(dynamic json);\n",
        "\n",
        "  B toJson(T value);\n",
        "}\n",
        "\n",
        "class DoNothingConverter<T> extends WireConverter<T, T> {\n",
        "  const DoNothingConverter();\n",
        "\n",
        "  @override\n",
        "  T fromJson(dynamic json) {\n",
        "    if (T == double && json is int) return json.toDouble() as T;\n",
        "    return json as T;\n",
        "  }\n",
        "\n",
        "  @override\n",
        "  T toJson(T value) => value;\n",
        "}\n",
        "\n",
        "class ListConverter<T, B> extends WireConverter<List<T>, List<B>> {\n",
        "  const ListConverter(this.inner);\n",
        "\n",
        "  final WireConverter<T, B> inner;\n",
        "\n",
        "  @override\n",
        "  List<T> fromJson(dynamic json) =>\n",
        "      (json as List<dynamic>).map((e) => inner.fromJson(e)).toList();\n",
        "\n",
        "  @override\n",
        "  List<B> toJson(List<T> value) => value.map(inner.toJson).toList();\n",
        "}\n",
        "\n",
        "class MapConverter<K, V, B> extends WireConverter<Map<K, V>, Map<K, B>> {\n",
        "  const MapConverter(this.inner);\n",
        "\n",
        "  final WireConverter<V, B> inner;\n",
        "\n",
        "  @override\n",
        "  Map<K, V> fromJson(dynamic json) => (json as Map<dynamic, dynamic>)\n",
        "      .map((k, v) => MapEntry(k as K, inner.fromJson(v)));\n",
        "\n",
        "  @override\n",
        "  Map<K, B> toJson(Map<K, V> value) =>\n",
        "      value.map((k, v) => MapEntry(k, inner.toJson(v)));\n",
        "}\n",
        "\n",
        "class NullableConverter<T, B> extends WireConverter<T?, B?> {\n",
        "  const NullableConverter(this.inner);\n",
        "\n",
        "  final WireConverter<T, B> inner;\n",
        "\n",
        "  @override\n",
        "  T? fromJson(dynamic json) => json == null ? null : inner.fromJson(json);\n",
        "\n",
        "  @override\n",
        "  B? toJson(T? value) => value == null ? null : inner.toJson(value);\n",
        "}\n",
    )
    .to_string();

    if uses_timestamp {
        out.push_str(concat!(
            "\n",
            "class DateTimeConverter extends WireConverter<DateTime, String> {\n",
            "  const DateTimeConverter();\n",
            "\n",
            "  @override\n",
            "  DateTime fromJson(dynamic json) => DateTime.parse(json as String);\n",
            "\n",
            "  @override\n",
            "  String toJson(DateTime value) => value.toUtc().toIso8601String();\n",
            "}\n",
        ));
    }

    out
}

fn render_enum(constant: &ConstantDecl, base_class: &str) -> String {
    let name = &constant.name;
    let base = &constant.base;

    let mut out = String::new();
    out.push_str(&format!("enum {name} {{\n"));
    let last = constant.members.len().saturating_sub(1);
    for (i, member) in constant.members.iter().enumerate() {
        let terminator = if i == last { ';' } else { ',' };
        out.push_str(&format!("  {}({}){terminator}\n", member.name, member.value));
    }
    out.push_str(&format!("\n  const {name}(this.value);\n\n  final {base} value;\n}}\n\n"));

    out.push_str(&format!(
        "class {name}Converter extends {base_class}<{name}, {base}> {{\n"
    ));
    out.push_str(&format!("  const {name}Converter();\n\n"));
    out.push_str(&format!(
        "  @override\n  {name} fromJson(dynamic json) =>\n      {name}.values.firstWhere((e) => e.value == json);\n\n"
    ));
    out.push_str(&format!(
        "  @override\n  {base} toJson({name} value) => value.value;\n}}"
    ));
    out
}

fn render_class(object: &ObjectDecl, base_class: &str) -> String {
    let name = &object.name;
    let mut out = String::new();
    out.push_str(&format!("class {name} {{\n"));

    if object.fields.is_empty() {
        out.push_str(&format!("  {name}();\n\n"));
        out.push_str(&format!(
            "  factory {name}.fromJson(Map<String, dynamic> json) => {name}();\n\n"
        ));
        out.push_str("  Map<String, dynamic> toJson() => <String, dynamic>{};\n}\n\n");
        out.push_str(&render_class_converter(name, base_class));
        return out;
    }

    out.push_str(&format!("  {name}({{\n"));
    for field in &object.fields {
        out.push_str(&format!("    {},\n", constructor_param(field)));
    }
    out.push_str("  });\n\n");

    out.push_str(&format!(
        "  factory {name}.fromJson(Map<String, dynamic> json) {{\n    return {name}(\n"
    ));
    for field in object.fields.iter().filter(|f| !f.ignored_in_wire) {
        out.push_str(&format!("      {}: {},\n", field.field, decode_field(field)));
    }
    out.push_str("    );\n  }\n\n");

    for field in &object.fields {
        if field.ignored_in_wire {
            out.push_str("  // Not part of the JSON wire form.\n");
        }
        out.push_str(&format!("  final {} {};\n", field_type(field), field.field));
    }
    out.push('\n');

    out.push_str("  Map<String, dynamic> toJson() => <String, dynamic>{\n");
    for field in object.fields.iter().filter(|f| !f.ignored_in_wire) {
        let value = match &field.converter {
            Some(converter) => format!("{converter}.toJson({})", field.field),
            None => field.field.clone(),
        };
        out.push_str(&format!(
            "        '{}': {value},\n",
            escape_dart_string(&field.wire_key)
        ));
    }
    out.push_str("      };\n}\n\n");

    out.push_str(&render_class_converter(name, base_class));
    out
}

fn render_class_converter(name: &str, base_class: &str) -> String {
    format!(
        concat!(
            "class {name}Converter extends {base}<{name}, Map<String, dynamic>> {{\n",
            "  const {name}Converter();\n",
            "\n",
            "  @override\n",
            "  {name} fromJson(dynamic json) =>\n",
            "      {name}.fromJson(json as Map<String, dynamic>);\n",
            "\n",
            "  @override\n",
            "  Map<String, dynamic> toJson({name} value) => value.toJson();\n",
            "}}"
        ),
        name = name,
        base = base_class
    )
}

/// Decode expression for one wire field; absent keys fall back to the default.
fn decode_field(field: &FieldDecl) -> String {
    let key = escape_dart_string(&field.wire_key);
    let raw = format!("json['{key}']");
    let decoded = match &field.converter {
        Some(converter) => format!("{converter}.fromJson({raw})"),
        None => format!("{raw} as {}", field.ty),
    };
    match &field.default {
        Some(default) => format!("json.containsKey('{key}') ? {decoded} : {default}"),
        None => decoded,
    }
}

/// Ignored fields without a default are nullable so decoding can skip them.
fn field_type(field: &FieldDecl) -> String {
    if field.ignored_in_wire && field.default.is_none() && !field.ty.ends_with('?') {
        format!("{}?", field.ty)
    } else {
        field.ty.clone()
    }
}

fn constructor_param(field: &FieldDecl) -> String {
    match &field.default {
        Some(default) => format!("this.{} = {default}", field.field),
        None if field_type(field).ends_with('?') => format!("this.{}", field.field),
        None => format!("required this.{}", field.field),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ConstantMember;
    use crate::output::assemble;
    use std::collections::BTreeSet;

    fn field(name: &str, ty: &str, default: Option<&str>) -> FieldDecl {
        FieldDecl {
            field: name.to_string(),
            wire_key: name.to_string(),
            ty: ty.to_string(),
            converter: Some(format!("DoNothingConverter<{ty}>()")),
            default: default.map(str::to_string),
            required: default.is_none(),
            ignored_in_wire: false,
            tag: None,
        }
    }

    #[test]
    fn renders_empty_unit() {
        let unit = assemble(vec![], vec![], BTreeSet::new(), false, None);
        let rendered = render_dart(&unit);
        assert!(rendered.contains("No declarations generated"));
        assert!(rendered.contains("abstract class WireConverter<T, B>"));
        assert!(!rendered.contains("class DateTimeConverter"));
    }

    #[test]
    fn renders_enum_with_values_and_converter() {
        let constant = ConstantDecl {
            name: "Status".to_string(),
            base: "String".to_string(),
            members: vec![
                ConstantMember {
                    name: "ok".to_string(),
                    value: "'OK'".to_string(),
                },
                ConstantMember {
                    name: "failure".to_string(),
                    value: "'Failure'".to_string(),
                },
            ],
        };
        let rendered = render_enum(&constant, "WireConverter");
        assert!(rendered.contains("enum Status {\n  ok('OK'),\n  failure('Failure');\n"));
        assert!(rendered.contains("final String value;"));
        assert!(rendered.contains("class StatusConverter extends WireConverter<Status, String>"));
    }

    #[test]
    fn required_fields_have_no_default() {
        let object = ObjectDecl::new(
            "Event",
            vec![field("at", "DateTime", None), field("name", "String", Some("''"))],
        );
        let rendered = render_class(&object, "WireConverter");
        assert!(rendered.contains("required this.at,"));
        assert!(rendered.contains("this.name = '',"));
        assert!(rendered.contains("at: DoNothingConverter<DateTime>().fromJson(json['at']),"));
        assert!(rendered.contains("'name': DoNothingConverter<String>().toJson(name),"));
        assert!(rendered.contains("class EventConverter extends WireConverter<Event, Map<String, dynamic>>"));
    }

    #[test]
    fn absent_keys_decode_to_the_default() {
        let mut tags = field("tags", "List<String>", Some("const []"));
        tags.converter =
            Some("ListConverter<String, String>(DoNothingConverter<String>())".to_string());
        let mut note = field("note", "String?", Some("null"));
        note.converter = None;
        let object = ObjectDecl::new("Post", vec![tags, note]);

        let rendered = render_class(&object, "WireConverter");
        assert!(rendered.contains(
            "      tags: json.containsKey('tags') ? ListConverter<String, String>(DoNothingConverter<String>()).fromJson(json['tags']) : const [],\n"
        ));
        assert!(rendered.contains(
            "      note: json.containsKey('note') ? json['note'] as String? : null,\n"
        ));
    }

    #[test]
    fn ignored_fields_stay_off_the_wire() {
        let mut secret = field("secret", "DateTime", None);
        secret.ignored_in_wire = true;
        let object = ObjectDecl::new("Account", vec![secret, field("login", "String", Some("''"))]);

        let rendered = render_class(&object, "WireConverter");
        assert!(rendered.contains("final DateTime? secret;"));
        assert!(rendered.contains("    this.secret,\n"));
        assert!(!rendered.contains("json['secret']"));
        assert!(!rendered.contains("'secret':"));
        assert!(rendered.contains("'login':"));
    }

    #[test]
    fn external_common_converters_skip_runtime() {
        let mut imports = BTreeSet::new();
        imports.insert("package:app/converters.dart".to_string());
        let alias = import_alias("package:app/converters.dart");
        let unit = assemble(
            vec![ObjectDecl::new("Empty", vec![])],
            vec![],
            imports,
            true,
            Some(alias.clone()),
        );

        let rendered = render_dart(&unit);
        assert!(rendered.contains(&format!("import 'package:app/converters.dart' as {alias};")));
        assert!(!rendered.contains("abstract class WireConverter"));
        assert!(rendered.contains(&format!("extends {alias}.WireConverter<Empty,")));
        assert!(rendered.contains("factory Empty.fromJson(Map<String, dynamic> json) => Empty();"));
    }
}
