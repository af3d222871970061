//! Descriptor types, loading, and reading.
//!
//! The descriptor universe is the protobuf JSON mapping of a
//! `CodeGeneratorRequest`: every file of the compilation (imports included),
//! the names of the files to generate, and the plugin parameter string. Only
//! the subset of `descriptor.proto` needed for schema conversion is modelled.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::type_map::to_json_name;

/// A code generation request as produced by `protoc` / `buf` JSON tooling.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Files whose top-level declarations should become schema documents.
    #[serde(default)]
    pub file_to_generate: Vec<String>,

    /// Flat comma-separated plugin parameter string.
    #[serde(default)]
    pub parameter: Option<String>,

    /// Every file in the compilation, dependencies before dependents.
    #[serde(default)]
    pub proto_file: Vec<FileDescriptor>,
}

/// A single `.proto` file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    /// Path relative to the import root (e.g., `"samples/foo.proto"`).
    #[serde(default)]
    pub name: String,

    /// Dotted package name; empty for the root package.
    #[serde(default)]
    pub package: String,

    #[serde(default)]
    pub message_type: Vec<MessageDescriptor>,

    #[serde(default)]
    pub enum_type: Vec<EnumDescriptor>,

    #[serde(default)]
    pub source_code_info: Option<SourceCodeInfo>,

    /// `"proto3"`, `"proto2"`, or absent (proto2).
    #[serde(default)]
    pub syntax: Option<String>,
}

impl FileDescriptor {
    /// Whether the file uses proto2 semantics (labels carry cardinality).
    pub fn is_proto2(&self) -> bool {
        self.syntax.as_deref() != Some("proto3")
    }
}

/// A message declaration.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDescriptor {
    pub name: String,

    #[serde(default)]
    pub field: Vec<FieldDescriptor>,

    #[serde(default)]
    pub nested_type: Vec<MessageDescriptor>,

    #[serde(default)]
    pub enum_type: Vec<EnumDescriptor>,

    #[serde(default)]
    pub oneof_decl: Vec<OneofDescriptor>,

    #[serde(default)]
    pub options: Option<MessageOptions>,
}

impl MessageDescriptor {
    /// Whether this is the synthetic entry message protoc emits for `map<K, V>`.
    pub fn is_map_entry(&self) -> bool {
        self.options
            .as_ref()
            .and_then(|o| o.map_entry)
            .unwrap_or(false)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageOptions {
    #[serde(default)]
    pub map_entry: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OneofDescriptor {
    #[serde(default)]
    pub name: String,
}

/// A field inside a message.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,

    #[serde(default)]
    pub number: i32,

    #[serde(default)]
    pub label: Option<Label>,

    /// Declared kind. Absent or unknown kinds are rejected during conversion.
    #[serde(default, rename = "type")]
    pub kind: Option<FieldKind>,

    /// For message and enum fields, the (usually fully-qualified) type name.
    #[serde(default)]
    pub type_name: Option<String>,

    #[serde(default)]
    pub json_name: Option<String>,

    /// Index into the containing message's `oneofDecl`.
    #[serde(default)]
    pub oneof_index: Option<i32>,

    /// Proto3 `optional` presence marker (backed by a synthetic oneof).
    #[serde(default)]
    pub proto3_optional: Option<bool>,
}

impl FieldDescriptor {
    /// The camelCase JSON projection of the field name.
    pub fn json_name(&self) -> String {
        match &self.json_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => to_json_name(&self.name),
        }
    }

    pub fn label(&self) -> Label {
        self.label.unwrap_or(Label::Optional)
    }

    pub fn is_repeated(&self) -> bool {
        self.label() == Label::Repeated
    }

    pub fn is_proto3_optional(&self) -> bool {
        self.proto3_optional.unwrap_or(false)
    }

    /// Member of a real oneof group (synthetic proto3-optional oneofs excluded).
    pub fn real_oneof(&self) -> Option<i32> {
        if self.is_proto3_optional() {
            None
        } else {
            self.oneof_index
        }
    }
}

/// Field cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Label {
    #[serde(rename = "LABEL_OPTIONAL")]
    Optional,
    #[serde(rename = "LABEL_REQUIRED")]
    Required,
    #[serde(rename = "LABEL_REPEATED")]
    Repeated,
}

/// Declared field kind, as named in `descriptor.proto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FieldKind {
    #[serde(rename = "TYPE_DOUBLE")]
    Double,
    #[serde(rename = "TYPE_FLOAT")]
    Float,
    #[serde(rename = "TYPE_INT64")]
    Int64,
    #[serde(rename = "TYPE_UINT64")]
    Uint64,
    #[serde(rename = "TYPE_INT32")]
    Int32,
    #[serde(rename = "TYPE_FIXED64")]
    Fixed64,
    #[serde(rename = "TYPE_FIXED32")]
    Fixed32,
    #[serde(rename = "TYPE_BOOL")]
    Bool,
    #[serde(rename = "TYPE_STRING")]
    String,
    #[serde(rename = "TYPE_GROUP")]
    Group,
    #[serde(rename = "TYPE_MESSAGE")]
    Message,
    #[serde(rename = "TYPE_BYTES")]
    Bytes,
    #[serde(rename = "TYPE_UINT32")]
    Uint32,
    #[serde(rename = "TYPE_ENUM")]
    Enum,
    #[serde(rename = "TYPE_SFIXED32")]
    Sfixed32,
    #[serde(rename = "TYPE_SFIXED64")]
    Sfixed64,
    #[serde(rename = "TYPE_SINT32")]
    Sint32,
    #[serde(rename = "TYPE_SINT64")]
    Sint64,
    /// Anything this crate does not know about.
    #[serde(other)]
    Unknown,
}

/// An enum declaration.
#[derive(Debug, Default, Deserialize)]
pub struct EnumDescriptor {
    pub name: String,

    #[serde(default)]
    pub value: Vec<EnumValueDescriptor>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnumValueDescriptor {
    pub name: String,

    #[serde(default)]
    pub number: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct SourceCodeInfo {
    #[serde(default)]
    pub location: Vec<Location>,
}

/// A source location: a declaration path plus the comments attached to it.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub path: Vec<i32>,

    #[serde(default)]
    pub leading_comments: Option<String>,

    #[serde(default)]
    pub trailing_comments: Option<String>,

    #[serde(default)]
    pub leading_detached_comments: Vec<String>,
}

/// Load a generation request from a JSON file on disk.
pub fn load_request(path: &Path) -> Result<GenerationRequest> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let request: GenerationRequest = serde_json::from_str(&content)?;
    Ok(request)
}

/// Read a generation request from any reader (e.g., stdin).
pub fn read_request<R: Read>(mut reader: R) -> Result<GenerationRequest> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|e| Error::Read {
            path: "<stdin>".into(),
            source: e,
        })?;
    let request: GenerationRequest = serde_json::from_str(&content)?;
    Ok(request)
}
