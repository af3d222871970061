//! Convert compiled Protocol Buffer descriptors into JSON Schema documents.
//!
//! `proto-jsonschema` reads a `CodeGeneratorRequest` in its protobuf JSON
//! form (the descriptor universe plus the files to generate) and emits one
//! draft-04 JSON Schema per top-level message, or per enum for files that
//! declare no messages.
//!
//! # Features
//!
//! - Protobuf scoping rules for type names, including nested types and
//!   cross-file references
//! - Self-referencing and shared messages become `definitions` entries
//! - Maps, oneofs, proto2 `required` and proto3 `optional` fields
//! - Canonical JSON forms of the `google.protobuf` well-known types
//! - Titles and descriptions taken from source comments
//! - Deterministic output: byte-identical across runs
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//!
//! use proto_jsonschema::{codegen, descriptor, options::ConverterOptions};
//!
//! let request = descriptor::load_request(Path::new("request.json"))?;
//! let options = ConverterOptions::from_parameter("enforce_oneof,json_fieldnames");
//! let files = codegen::generate(&request, &options)?;
//! codegen::write_files(&files, Path::new("schemas/"))?;
//! eprintln!("Generated {} schemas", files.len());
//! # Ok::<(), proto_jsonschema::error::Error>(())
//! ```

pub mod codegen;
pub mod comments;
pub mod converter;
pub mod descriptor;
pub mod error;
pub mod options;
pub mod registry;
pub mod schema;
pub mod type_map;
