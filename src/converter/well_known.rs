//! Fixed schemas for `google.protobuf` well-known types.
//!
//! These follow the canonical proto3 JSON mapping rather than the generic
//! message-to-object rule, and never become shared definitions.

use crate::descriptor::FieldKind;
use crate::error::{Error, Result};
use crate::options::ConverterFlags;
use crate::schema::{AdditionalProperties, JsonType, ObjectSchema, Primitive, Schema, SchemaKind};
use crate::type_map::scalar_schema;

pub const WELL_KNOWN_PACKAGE: &str = "google.protobuf";

/// Seconds with an optional fractional part, suffixed with `s` (e.g., `"3.5s"`).
pub const DURATION_PATTERN: &str = r"^([0-9]+\.?[0-9]*|\.[0-9]+)s$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellKnown {
    Duration,
    Timestamp,
    /// A wrapper message (`Int64Value`, `StringValue`...) around one scalar.
    Wrapper(FieldKind),
    Struct,
    Value,
    ListValue,
    Empty,
    Any,
    FieldMask,
}

impl WellKnown {
    /// Classify a fully-qualified message name (leading dot optional).
    ///
    /// Returns `Ok(None)` outside the well-known package, and
    /// `UnknownWellKnownType` for names inside it with no special case.
    pub fn from_full_name(full_name: &str) -> Result<Option<Self>> {
        let name = full_name.trim_start_matches('.');
        let Some(local) = name
            .strip_prefix(WELL_KNOWN_PACKAGE)
            .and_then(|rest| rest.strip_prefix('.'))
        else {
            return Ok(None);
        };

        let known = match local {
            "Duration" => WellKnown::Duration,
            "Timestamp" => WellKnown::Timestamp,
            "DoubleValue" => WellKnown::Wrapper(FieldKind::Double),
            "FloatValue" => WellKnown::Wrapper(FieldKind::Float),
            "Int64Value" => WellKnown::Wrapper(FieldKind::Int64),
            "UInt64Value" => WellKnown::Wrapper(FieldKind::Uint64),
            "Int32Value" => WellKnown::Wrapper(FieldKind::Int32),
            "UInt32Value" => WellKnown::Wrapper(FieldKind::Uint32),
            "BoolValue" => WellKnown::Wrapper(FieldKind::Bool),
            "StringValue" => WellKnown::Wrapper(FieldKind::String),
            "BytesValue" => WellKnown::Wrapper(FieldKind::Bytes),
            "Struct" => WellKnown::Struct,
            "Value" => WellKnown::Value,
            "ListValue" => WellKnown::ListValue,
            "Empty" => WellKnown::Empty,
            "Any" => WellKnown::Any,
            "FieldMask" => WellKnown::FieldMask,
            _ => {
                return Err(Error::UnknownWellKnownType {
                    name: name.to_string(),
                });
            }
        };
        Ok(Some(known))
    }

    /// Whether `allow_null_values` may wrap this type in `oneOf[null, ...]`.
    ///
    /// Durations and timestamps keep their string form; `Value` already
    /// admits null.
    pub fn null_wrappable(self) -> bool {
        !matches!(
            self,
            WellKnown::Duration | WellKnown::Timestamp | WellKnown::Value
        )
    }

    pub fn schema(self, flags: &ConverterFlags) -> Schema {
        match self {
            WellKnown::Duration => Schema::new(SchemaKind::Primitive(Primitive {
                pattern: Some(DURATION_PATTERN),
                ..Primitive::new(JsonType::String)
            })),
            WellKnown::Timestamp => Schema::new(SchemaKind::Primitive(Primitive {
                format: Some("date-time"),
                ..Primitive::new(JsonType::String)
            })),
            WellKnown::Wrapper(kind) => scalar_schema(kind, flags.disallow_bigints_as_strings)
                .unwrap_or_else(|| Schema::primitive(JsonType::String)),
            WellKnown::Struct => object(Vec::new(), Vec::new(), true),
            WellKnown::Value => Schema::new(SchemaKind::OneOf(vec![
                Schema::primitive(JsonType::Array),
                Schema::primitive(JsonType::Boolean),
                Schema::primitive(JsonType::Number),
                Schema::primitive(JsonType::Object),
                Schema::primitive(JsonType::String),
                Schema::primitive(JsonType::Null),
            ])),
            WellKnown::ListValue => Schema::primitive(JsonType::Array),
            WellKnown::Empty => object(Vec::new(), Vec::new(), false),
            WellKnown::Any => object(
                vec![("@type".to_string(), Schema::primitive(JsonType::String))],
                vec!["@type".to_string()],
                true,
            ),
            WellKnown::FieldMask => Schema::primitive(JsonType::String),
        }
    }
}

fn object(properties: Vec<(String, Schema)>, required: Vec<String>, open: bool) -> Schema {
    Schema::new(SchemaKind::Object(ObjectSchema {
        properties,
        required,
        additional_properties: Some(AdditionalProperties::Allowed(open)),
        exclusive_groups: Vec::new(),
    }))
}
