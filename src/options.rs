//! Conversion flags and plugin parameter parsing.
//!
//! Parameters arrive as one flat comma-separated string, e.g.
//! `allow_null_values,json_fieldnames,messages=[Foo,Bar]`. Commas inside
//! brackets do not split.

use crate::comments::CommentStyle;

/// Boolean switches that shape the generated schemas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConverterFlags {
    /// Wrap every field in `oneOf[null, ...]`.
    pub allow_null_values: bool,
    /// Emit `additionalProperties: false` on every object.
    pub disallow_additional_properties: bool,
    /// Require every field outside a oneof that is not explicitly optional.
    pub all_fields_required: bool,
    /// Assert that at most one member of each oneof group is present.
    pub enforce_oneof: bool,
    /// Emit 64-bit integers as `integer` instead of patterned strings.
    pub disallow_bigints_as_strings: bool,
    /// Key properties by JSON name only. Wins over `use_proto_and_json_field_names`.
    pub use_json_field_names_only: bool,
    /// Key properties by both the proto and the JSON name.
    pub use_proto_and_json_field_names: bool,
    /// Name definitions without their package prefix.
    pub type_names_without_package_prefix: bool,
    /// Place each artifact under a directory named after its package.
    pub prefix_schema_files_with_package: bool,
    /// Keep line breaks inside descriptions.
    pub keep_newlines_in_description: bool,
}

/// Everything that configures one conversion run.
#[derive(Debug, Clone)]
pub struct ConverterOptions {
    pub flags: ConverterFlags,
    /// Only convert these top-level messages, in this order.
    pub target_messages: Option<Vec<String>>,
    pub comment_delimiter: String,
    pub exclude_comment_token: String,
    /// Extension of generated artifacts, without the dot.
    pub file_extension: String,
    pub debug: bool,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        let style = CommentStyle::default();
        ConverterOptions {
            flags: ConverterFlags::default(),
            target_messages: None,
            comment_delimiter: style.delimiter,
            exclude_comment_token: style.exclude_token,
            file_extension: "jsonschema".to_string(),
            debug: false,
        }
    }
}

impl ConverterOptions {
    pub fn with_flags(flags: ConverterFlags) -> Self {
        ConverterOptions {
            flags,
            ..Default::default()
        }
    }

    /// Parse a plugin parameter string. Unknown keys are logged and ignored.
    pub fn from_parameter(parameter: &str) -> Self {
        let (options, ignored) = ConverterOptions::parse(parameter);
        for item in ignored {
            log::warn!("ignoring unknown parameter '{item}'");
        }
        options
    }

    /// Parse a plugin parameter string, returning the items it did not
    /// recognize alongside the options.
    pub fn parse(parameter: &str) -> (Self, Vec<String>) {
        let mut options = ConverterOptions::default();
        let mut ignored = Vec::new();
        for item in split_parameters(parameter) {
            if !options.apply(item) {
                ignored.push(item.to_string());
            }
        }
        (options, ignored)
    }

    fn apply(&mut self, item: &str) -> bool {
        let (key, value) = match item.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim())),
            None => (item, None),
        };
        let flags = &mut self.flags;
        match (key, value) {
            ("allow_null_values", None) => flags.allow_null_values = true,
            ("disallow_additional_properties", None) => {
                flags.disallow_additional_properties = true
            }
            ("disallow_bigints_as_strings", None) => flags.disallow_bigints_as_strings = true,
            ("proto_and_json_fieldnames", None) => flags.use_proto_and_json_field_names = true,
            ("json_fieldnames", None) => flags.use_json_field_names_only = true,
            ("all_fields_required", None) => flags.all_fields_required = true,
            ("enforce_oneof", None) => flags.enforce_oneof = true,
            ("type_names_with_no_package", None) => {
                flags.type_names_without_package_prefix = true
            }
            ("prefix_schema_files_with_package", None) => {
                flags.prefix_schema_files_with_package = true
            }
            ("keep_nulines_in_description" | "keep_newlines_in_description", None) => {
                flags.keep_newlines_in_description = true
            }
            ("debug", None) => self.debug = true,
            ("messages", Some(list)) => self.target_messages = Some(parse_list(list)),
            ("file_extension", Some(ext)) if !ext.is_empty() => {
                self.file_extension = ext.trim_start_matches('.').to_string()
            }
            ("exclude_comment_token", Some(token)) if !token.is_empty() => {
                self.exclude_comment_token = token.to_string()
            }
            _ => return false,
        }
        true
    }

    /// Comment formatting derived from these options.
    pub fn comment_style(&self) -> CommentStyle {
        CommentStyle {
            delimiter: self.comment_delimiter.clone(),
            exclude_token: self.exclude_comment_token.clone(),
            keep_newlines: self.flags.keep_newlines_in_description,
        }
    }
}

/// Split on top-level commas, leaving `[...]` groups intact.
fn split_parameters(parameter: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in parameter.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(&parameter[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&parameter[start..]);
    items
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

/// Parse `[A,B,C]` (brackets optional) into names. `+` also separates.
fn parse_list(list: &str) -> Vec<String> {
    list.trim_start_matches('[')
        .trim_end_matches(']')
        .split([',', '+'])
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
