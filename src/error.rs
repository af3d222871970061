//! Error types for the proto-jsonschema crate.

use std::path::PathBuf;

/// Errors that can occur while converting descriptors to JSON Schema.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A field's type name did not resolve to any package or message.
    #[error("no such type named '{name}' (resolving from '{scope}')")]
    UnresolvedReference { name: String, scope: String },

    /// A dotted type name resolved its outer message but not the nested part.
    #[error("no nested type '{name}' inside message '{message}'")]
    UnresolvedNestedType { name: String, message: String },

    /// A field kind the conversion switch does not cover.
    #[error("unrecognized type {kind} for field '{field}' in message '{message}'")]
    UnrecognizedFieldType {
        field: String,
        message: String,
        kind: String,
    },

    /// A synthetic map-entry message without a `value` field.
    #[error("map field '{field}' in message '{message}' has no 'value' property")]
    MalformedMapType { field: String, message: String },

    /// A message in `google.protobuf` that has no special-case schema.
    #[error("unknown well-known type '{name}'")]
    UnknownWellKnownType { name: String },

    /// Conversion of a target file failed.
    #[error("failed to convert {file}: {source}")]
    Conversion {
        file: String,
        source: Box<Error>,
    },

    /// Failed to write generated schema files.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read a file from disk.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON parse or encode error.
    #[error("failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Attach the originating file name to a conversion failure.
    pub(crate) fn in_file(self, file: &str) -> Self {
        Error::Conversion {
            file: file.to_string(),
            source: Box::new(self),
        }
    }
}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
