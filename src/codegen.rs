//! Conversion orchestration and artifact writing.
//!
//! Every file of a request is registered before any target is converted, so
//! targets may reference types declared only in imported files. Targets then
//! produce one artifact per top-level message, or one per enum when a file
//! declares no messages. Artifacts follow the request's file order and the
//! declaration order within each file.
//!
//! The generated output is deterministic: identical input always produces
//! byte-identical output.

use std::path::Path;

use crate::comments::CommentIndex;
use crate::converter::Converter;
use crate::descriptor::{FileDescriptor, GenerationRequest};
use crate::error::{Error, Result};
use crate::options::ConverterOptions;
use crate::registry::Registry;

/// One generated schema document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Relative path of the artifact (e.g., `"acme.v1/Order.jsonschema"`).
    pub name: String,
    pub content: String,
}

/// Convert the request's target files with the given options.
///
/// Any failure aborts the whole run; the error names the file being
/// converted.
pub fn generate(
    request: &GenerationRequest,
    options: &ConverterOptions,
) -> Result<Vec<GeneratedFile>> {
    let files = request.proto_file.as_slice();
    let registry = Registry::build(files);
    let comments = CommentIndex::build(files);
    log::debug!(
        "registered {} files, {} commented declarations",
        files.len(),
        comments.len()
    );

    let targets: Vec<&FileDescriptor> = files
        .iter()
        .filter(|file| request.file_to_generate.contains(&file.name))
        .collect();
    if let Some(messages) = &options.target_messages {
        for name in unmatched_messages(messages, &targets) {
            log::warn!("message '{name}' is not declared in any file to generate");
        }
    }

    let converter = Converter::new(&registry, &comments, options);
    let mut generated = Vec::new();
    for file in targets {
        log::debug!("converting {}", file.name);
        convert_file(&registry, &converter, options, file, &mut generated)
            .map_err(|e| e.in_file(&file.name))?;
    }
    Ok(generated)
}

/// Convert a request using the options carried in its own `parameter`.
pub fn generate_from_request(request: &GenerationRequest) -> Result<Vec<GeneratedFile>> {
    let options = ConverterOptions::from_parameter(request.parameter.as_deref().unwrap_or_default());
    generate(request, &options)
}

fn convert_file(
    registry: &Registry<'_>,
    converter: &Converter<'_, '_>,
    options: &ConverterOptions,
    file: &FileDescriptor,
    out: &mut Vec<GeneratedFile>,
) -> Result<()> {
    if file.message_type.is_empty() && file.enum_type.is_empty() {
        log::debug!("{} declares no messages or enums", file.name);
        return Ok(());
    }
    let package = registry.lookup_package(&file.package)?;

    if file.message_type.is_empty() {
        if file.enum_type.len() > 1 {
            log::warn!(
                "{} declares {} enums; each gets its own schema",
                file.name,
                file.enum_type.len()
            );
        }
        for enum_desc in &file.enum_type {
            let (id, _) = registry.lookup_enum(package, &enum_desc.name)?;
            let document = converter.convert_enum(id);
            push(out, artifact_name(file, &enum_desc.name, options), document.to_json()?);
        }
        return Ok(());
    }

    if file.message_type.len() > 1 {
        log::warn!(
            "{} declares {} messages; each gets its own schema",
            file.name,
            file.message_type.len()
        );
    }

    let selected: Vec<&str> = match &options.target_messages {
        Some(targets) => targets
            .iter()
            .filter(|name| declares(file, name))
            .map(String::as_str)
            .collect(),
        None => file.message_type.iter().map(|m| m.name.as_str()).collect(),
    };

    for name in selected {
        let (id, _) = registry.lookup_message(package, name)?;
        let document = converter.convert_message(id)?;
        push(out, artifact_name(file, name, options), document.to_json()?);
    }
    Ok(())
}

fn declares(file: &FileDescriptor, message: &str) -> bool {
    file.message_type.iter().any(|m| m.name == message)
}

/// Filter names that no target file declares as a top-level message.
fn unmatched_messages<'n>(names: &'n [String], targets: &[&FileDescriptor]) -> Vec<&'n str> {
    names
        .iter()
        .map(String::as_str)
        .filter(|name| !targets.iter().any(|file| declares(file, name)))
        .collect()
}

fn push(out: &mut Vec<GeneratedFile>, name: String, content: String) {
    log::info!("generated {name}");
    out.push(GeneratedFile { name, content });
}

/// `<Name>.<ext>`, under a `<package>/` directory when prefixing is enabled.
fn artifact_name(file: &FileDescriptor, name: &str, options: &ConverterOptions) -> String {
    let base = format!("{name}.{}", options.file_extension);
    if options.flags.prefix_schema_files_with_package && !file.package.is_empty() {
        format!("{}/{base}", file.package)
    } else {
        base
    }
}

/// Write every artifact below `output_dir`, creating directories as needed.
pub fn write_files(files: &[GeneratedFile], output_dir: &Path) -> Result<()> {
    for file in files {
        write_file(&output_dir.join(&file.name), &file.content)?;
    }
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::Write {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, content).map_err(|e| Error::Write {
        path: path.to_path_buf(),
        source: e,
    })
}
