//! Identifier helpers shared by the converter and the Dart renderer.

const DART_KEYWORDS: &[&str] = &[
    "abstract",
    "as",
    "assert",
    "async",
    "await",
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "covariant",
    "default",
    "deferred",
    "do",
    "dynamic",
    "else",
    "enum",
    "export",
    "extends",
    "extension",
    "external",
    "factory",
    "false",
    "final",
    "finally",
    "for",
    "Function",
    "get",
    "hide",
    "if",
    "implements",
    "import",
    "in",
    "interface",
    "is",
    "late",
    "library",
    "mixin",
    "new",
    "null",
    "on",
    "operator",
    "part",
    "required",
    "rethrow",
    "return",
    "set",
    "show",
    "static",
    "super",
    "switch",
    "sync",
    "this",
    "throw",
    "true",
    "try",
    "typedef",
    "var",
    "void",
    "while",
    "with",
    "yield",
];

/// Splits `pkg/path.Name` into `("pkg/path", "Name")`.
///
/// Identities without a `.` have an empty package part.
pub fn split_qualified(identity: &str) -> (&str, &str) {
    match identity.rfind('.') {
        Some(idx) => (&identity[..idx], &identity[idx + 1..]),
        None => ("", identity),
    }
}

/// Lower-cases only the first character; enum member keys keep the rest as-is.
pub fn lower_first(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Converts a host field name to a lowerCamel Dart identifier.
///
/// Uppercase runs collapse (`ID` -> `id`, `TPtr` -> `tptr`); `_`, `-`, `.` and
/// spaces are dropped and capitalize the following letter, as does a digit.
pub fn to_lower_camel(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut cap_next = false;
    let mut prev_is_cap = false;

    for (i, ch) in raw.trim().chars().enumerate() {
        let is_cap = ch.is_ascii_uppercase();
        let is_low = ch.is_ascii_lowercase();

        let ch = if cap_next {
            ch.to_ascii_uppercase()
        } else if i == 0 || (prev_is_cap && is_cap) {
            ch.to_ascii_lowercase()
        } else {
            ch
        };
        prev_is_cap = is_cap;

        if is_cap || is_low {
            out.push(ch);
            cap_next = false;
        } else if ch.is_ascii_digit() {
            out.push(ch);
            cap_next = true;
        } else {
            cap_next = matches!(ch, '_' | ' ' | '-' | '.');
            if !cap_next {
                out.push(ch);
            }
        }
    }

    out
}

/// Dart field identifier for a host field name; keywords get a trailing `_`.
pub fn field_identifier(raw: &str) -> String {
    let name = to_lower_camel(raw);
    if is_dart_keyword(&name) {
        format!("{name}_")
    } else {
        name
    }
}

pub fn is_dart_keyword(text: &str) -> bool {
    DART_KEYWORDS.iter().any(|kw| kw == &text)
}

/// Escapes text for a single-quoted Dart string literal.
pub fn escape_dart_string(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('$', "\\$")
        .replace('\n', "\\n")
}
