//! Maps protobuf scalar field kinds to JSON Schema primitives, plus the name
//! helpers used for titles and JSON field names.
//!
//! # Type Mapping Table
//!
//! | Proto kind | JSON Schema | Notes |
//! |-----------|-------------|-------|
//! | `double`, `float` | `number` | |
//! | `int32`, `uint32`, `sint32`, `fixed32`, `sfixed32` | `integer` | |
//! | `int64`, `sint64`, `sfixed64` | `string` matching `^-?[0-9]+$` | `integer` with `disallow_bigints_as_strings` |
//! | `uint64`, `fixed64` | `string` matching `^[0-9]+$` | `integer` with `disallow_bigints_as_strings` |
//! | `bool` | `boolean` | |
//! | `string` | `string` | |
//! | `bytes` | `string`, format `binary`, base64 | |
//! | `enum`, `message`, `group` | (resolved) | Resolved by the converter |

use crate::descriptor::FieldKind;
use crate::schema::{JsonType, Primitive, Schema, SchemaKind};

pub const SIGNED_BIGINT_PATTERN: &str = "^-?[0-9]+$";
pub const UNSIGNED_BIGINT_PATTERN: &str = "^[0-9]+$";

/// Map a scalar field kind to its JSON Schema node.
///
/// Returns `None` for kinds that need resolution against the registry
/// (enums, messages, groups) and for unknown kinds.
pub fn scalar_schema(kind: FieldKind, disallow_bigints_as_strings: bool) -> Option<Schema> {
    let primitive = match kind {
        FieldKind::Double | FieldKind::Float => Primitive::new(JsonType::Number),

        FieldKind::Int32
        | FieldKind::Uint32
        | FieldKind::Sint32
        | FieldKind::Fixed32
        | FieldKind::Sfixed32 => Primitive::new(JsonType::Integer),

        FieldKind::Int64 | FieldKind::Sint64 | FieldKind::Sfixed64 => {
            bigint(disallow_bigints_as_strings, SIGNED_BIGINT_PATTERN)
        }
        FieldKind::Uint64 | FieldKind::Fixed64 => {
            bigint(disallow_bigints_as_strings, UNSIGNED_BIGINT_PATTERN)
        }

        FieldKind::Bool => Primitive::new(JsonType::Boolean),
        FieldKind::String => Primitive::new(JsonType::String),
        FieldKind::Bytes => Primitive {
            format: Some("binary"),
            binary_encoding: Some("base64"),
            ..Primitive::new(JsonType::String)
        },

        FieldKind::Enum | FieldKind::Message | FieldKind::Group | FieldKind::Unknown => {
            return None;
        }
    };
    Some(Schema::new(SchemaKind::Primitive(primitive)))
}

/// 64-bit integers exceed JavaScript's safe range, so they travel as strings.
fn bigint(as_integer: bool, pattern: &'static str) -> Primitive {
    if as_integer {
        Primitive::new(JsonType::Integer)
    } else {
        Primitive {
            pattern: Some(pattern),
            ..Primitive::new(JsonType::String)
        }
    }
}

/// Human-readable name of a field kind, for error messages.
pub fn kind_name(kind: Option<FieldKind>) -> String {
    match kind {
        Some(kind) => format!("{kind:?}"),
        None => "<missing>".to_string(),
    }
}

/// Convert a snake_case or camelCase name to PascalCase.
///
/// - `"network_endpoint"` → `"NetworkEndpoint"`
/// - `"fooBar"` → `"FooBar"`
pub fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().to_string() + chars.as_str(),
            }
        })
        .collect()
}

/// Split a PascalCase name into words.
///
/// Splits at lower→upper transitions, between letters and digits, and before
/// the last capital of an acronym run:
/// - `"MessageWithComments"` → `["Message", "With", "Comments"]`
/// - `"HTTPServer2"` → `["HTTP", "Server", "2"]`
pub fn split_camel_case(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_alphabetic() != c.is_alphabetic())
                || (prev.is_uppercase()
                    && c.is_uppercase()
                    && next.is_some_and(|n| n.is_lowercase()));
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Default title for a declaration: its name, PascalCased and split into words.
///
/// - `"payload_message"` → `"Payload Message"`
pub fn humanize(name: &str) -> String {
    split_camel_case(&to_pascal_case(name)).join(" ")
}

/// Protoc's JSON name projection: drop underscores, upper-case the next character.
///
/// - `"user_name"` → `"userName"`
/// - `"ids"` → `"ids"`
pub fn to_json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
