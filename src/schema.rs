//! JSON Schema output types and serialization.
//!
//! A [`Schema`] is a closed union: every node carries exactly one payload
//! ([`SchemaKind`]) plus optional documentation. Serialization is hand-ordered
//! so that identical input always produces byte-identical output, and object
//! properties keep the order their fields were declared in.

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// The JSON Schema dialect written into every document.
pub const SCHEMA_VERSION: &str = "http://json-schema.org/draft-04/schema#";

/// Prefix of every `$ref` pointing into a document's `definitions`.
pub const REF_PREFIX: &str = "#/definitions/";

/// JSON value types usable in a `type` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Object,
    Array,
}

impl JsonType {
    pub fn as_str(self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Boolean => "boolean",
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Object => "object",
            JsonType::Array => "array",
        }
    }
}

/// A single-typed node, optionally constrained by format or pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub json_type: JsonType,
    pub format: Option<&'static str>,
    pub pattern: Option<&'static str>,
    pub binary_encoding: Option<&'static str>,
}

impl Primitive {
    pub fn new(json_type: JsonType) -> Self {
        Primitive {
            json_type,
            format: None,
            pattern: None,
            binary_encoding: None,
        }
    }
}

/// The `additionalProperties` keyword of an object node.
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    Allowed(bool),
    /// Every unlisted property must match this schema (map values).
    Schema(Box<Schema>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    /// Properties in declaration order.
    pub properties: Vec<(String, Schema)>,
    pub required: Vec<String>,
    /// `None` leaves the keyword out (permissive).
    pub additional_properties: Option<AdditionalProperties>,
    /// Oneof exclusivity assertions, one per group, emitted as `allOf`.
    pub exclusive_groups: Vec<Schema>,
}

impl ObjectSchema {
    /// Insert or replace a property, keeping its first position.
    pub fn set_property(&mut self, name: String, schema: Schema) {
        match self.properties.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = schema,
            None => self.properties.push((name, schema)),
        }
    }
}

/// A literal in an `enum` list: enum values are listed by name and number.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumLiteral {
    Name(String),
    Number(i32),
}

/// The payload of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Primitive(Primitive),
    Object(ObjectSchema),
    Array(Box<Schema>),
    /// Name of an entry in the document's `definitions`.
    Reference(String),
    OneOf(Vec<Schema>),
    AnyOf(Vec<Schema>),
    Not(Box<Schema>),
    /// A bare `required` assertion, used by oneof exclusivity.
    Required(Vec<String>),
    /// Accepts the listed names or numbers.
    ///
    /// `typed` adds `oneOf[string, integer]` branches; array items omit them.
    Enumeration {
        values: Vec<EnumLiteral>,
        nullable: bool,
        typed: bool,
    },
}

/// A JSON Schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: SchemaKind,
}

impl Schema {
    pub fn new(kind: SchemaKind) -> Self {
        Schema {
            title: None,
            description: None,
            kind,
        }
    }

    pub fn primitive(json_type: JsonType) -> Self {
        Schema::new(SchemaKind::Primitive(Primitive::new(json_type)))
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Schema::new(SchemaKind::Reference(name.into()))
    }

    pub fn array(items: Schema) -> Self {
        Schema::new(SchemaKind::Array(Box::new(items)))
    }

    pub fn required(names: Vec<String>) -> Self {
        Schema::new(SchemaKind::Required(names))
    }

    /// Drop an enumeration's `oneOf[string, integer]` branches.
    pub fn without_type_branches(mut self) -> Self {
        if let SchemaKind::Enumeration { typed, .. } = &mut self.kind {
            *typed = false;
        }
        self
    }

    /// Wrap as `oneOf[null, self]`, moving documentation to the wrapper.
    ///
    /// Enumerations gain a null branch in place instead of being wrapped.
    pub fn nullable(mut self) -> Self {
        if let SchemaKind::Enumeration { nullable, .. } = &mut self.kind {
            *nullable = true;
            return self;
        }
        let title = self.title.take();
        let description = self.description.take();
        Schema {
            title,
            description,
            kind: SchemaKind::OneOf(vec![Schema::primitive(JsonType::Null), self]),
        }
    }

    pub fn with_docs(mut self, title: Option<String>, description: Option<String>) -> Self {
        if title.is_some() {
            self.title = title;
        }
        if description.is_some() {
            self.description = description;
        }
        self
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectSchema> {
        match &mut self.kind {
            SchemaKind::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Write this node's keywords into an already-open JSON map.
    fn write_fields<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        match &self.kind {
            SchemaKind::Reference(name) => {
                map.serialize_entry("$ref", &format!("{REF_PREFIX}{name}"))?;
            }
            SchemaKind::Object(object) => {
                if !object.properties.is_empty() {
                    map.serialize_entry("properties", &Properties(&object.properties))?;
                }
                match &object.additional_properties {
                    Some(AdditionalProperties::Allowed(allowed)) => {
                        map.serialize_entry("additionalProperties", allowed)?;
                    }
                    Some(AdditionalProperties::Schema(schema)) => {
                        map.serialize_entry("additionalProperties", schema.as_ref())?;
                    }
                    None => {}
                }
                if !object.required.is_empty() {
                    map.serialize_entry("required", &object.required)?;
                }
                if !object.exclusive_groups.is_empty() {
                    map.serialize_entry("allOf", &object.exclusive_groups)?;
                }
                map.serialize_entry("type", JsonType::Object.as_str())?;
            }
            SchemaKind::Array(items) => {
                map.serialize_entry("items", items.as_ref())?;
                map.serialize_entry("type", JsonType::Array.as_str())?;
            }
            SchemaKind::OneOf(branches) => map.serialize_entry("oneOf", branches)?,
            SchemaKind::AnyOf(branches) => map.serialize_entry("anyOf", branches)?,
            SchemaKind::Not(inner) => map.serialize_entry("not", inner.as_ref())?,
            SchemaKind::Required(names) => map.serialize_entry("required", names)?,
            SchemaKind::Enumeration {
                values,
                nullable,
                typed,
            } => {
                let mut branches = vec![
                    Schema::primitive(JsonType::String),
                    Schema::primitive(JsonType::Integer),
                ];
                let mut literals: Vec<serde_json::Value> = values.iter().map(literal).collect();
                if *nullable {
                    branches.push(Schema::primitive(JsonType::Null));
                    literals.push(serde_json::Value::Null);
                }
                if *typed {
                    map.serialize_entry("oneOf", &branches)?;
                }
                map.serialize_entry("enum", &literals)?;
            }
            SchemaKind::Primitive(primitive) => {
                map.serialize_entry("type", primitive.json_type.as_str())?;
                if let Some(format) = primitive.format {
                    map.serialize_entry("format", format)?;
                }
                if let Some(pattern) = primitive.pattern {
                    map.serialize_entry("pattern", pattern)?;
                }
                if let Some(encoding) = primitive.binary_encoding {
                    map.serialize_entry("binaryEncoding", encoding)?;
                }
            }
        }
        if let Some(title) = &self.title {
            map.serialize_entry("title", title)?;
        }
        if let Some(description) = &self.description {
            map.serialize_entry("description", description)?;
        }
        Ok(())
    }
}

fn literal(value: &EnumLiteral) -> serde_json::Value {
    match value {
        EnumLiteral::Name(name) => serde_json::Value::from(name.as_str()),
        EnumLiteral::Number(number) => serde_json::Value::from(*number),
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.write_fields(&mut map)?;
        map.end()
    }
}

/// Ordered property list, serialized as a JSON object.
struct Properties<'a>(&'a [(String, Schema)]);

impl Serialize for Properties<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, schema) in self.0 {
            map.serialize_entry(name, schema)?;
        }
        map.end()
    }
}

/// A complete JSON Schema document: a root node plus shared definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Schema,
    /// Shared definitions keyed by display name.
    pub definitions: BTreeMap<String, Schema>,
}

impl Document {
    pub fn new(root: Schema) -> Self {
        Document {
            root,
            definitions: BTreeMap::new(),
        }
    }

    /// Pretty-printed JSON text of this document.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("$schema", SCHEMA_VERSION)?;
        self.root.write_fields(&mut map)?;
        if !self.definitions.is_empty() {
            map.serialize_entry("definitions", &self.definitions)?;
        }
        map.end()
    }
}
