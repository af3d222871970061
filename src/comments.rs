//! Recovers documentation from source-code-info comments.
//!
//! Every source location carries a path of integers that walks from the file
//! root to a declaration: a field tag selects a child list (messages, fields,
//! nested types...), the next element indexes into it. Paths that stop at a
//! sub-component (a name, a type, a field number) do not name a declaration
//! and are dropped.

use std::collections::HashMap;

use crate::descriptor::{EnumDescriptor, FileDescriptor, Location, MessageDescriptor};
use crate::type_map::humanize;

/// Field tags from `descriptor.proto` that lead to declarations.
pub mod tag {
    pub const FILE_MESSAGE_TYPE: i32 = 4;
    pub const FILE_ENUM_TYPE: i32 = 5;
    pub const MESSAGE_FIELD: i32 = 2;
    pub const MESSAGE_NESTED_TYPE: i32 = 3;
    pub const MESSAGE_ENUM_TYPE: i32 = 4;
    pub const MESSAGE_ONEOF_DECL: i32 = 8;
    pub const ENUM_VALUE: i32 = 2;
}

/// Identity of a declaration: its file and its source path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclarationKey {
    pub file: usize,
    pub path: Vec<i32>,
}

impl DeclarationKey {
    pub fn new(file: usize, path: Vec<i32>) -> Self {
        DeclarationKey { file, path }
    }

    /// The key of the `index`-th entry of this declaration's `tag` list.
    pub fn child(&self, tag: i32, index: usize) -> Self {
        let mut path = self.path.clone();
        path.push(tag);
        path.push(index as i32);
        DeclarationKey {
            file: self.file,
            path,
        }
    }
}

/// What a source path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declaration {
    Message,
    Enum,
    Field,
    Oneof,
    EnumValue,
}

/// Cursor used while replaying a path.
enum Cursor<'a> {
    File(&'a FileDescriptor),
    Message(&'a MessageDescriptor),
    Enum(&'a EnumDescriptor),
    Leaf(Declaration),
}

/// Resolve a source path to the kind of declaration it names, if any.
pub fn declaration_at(file: &FileDescriptor, path: &[i32]) -> Option<Declaration> {
    if path.is_empty() || path.len() % 2 != 0 {
        return None;
    }

    let mut cursor = Cursor::File(file);
    for step in path.chunks_exact(2) {
        let (tag, index) = (step[0], usize::try_from(step[1]).ok()?);
        cursor = match cursor {
            Cursor::File(f) => match tag {
                tag::FILE_MESSAGE_TYPE => Cursor::Message(f.message_type.get(index)?),
                tag::FILE_ENUM_TYPE => Cursor::Enum(f.enum_type.get(index)?),
                _ => return None,
            },
            Cursor::Message(m) => match tag {
                tag::MESSAGE_FIELD => {
                    m.field.get(index)?;
                    Cursor::Leaf(Declaration::Field)
                }
                tag::MESSAGE_NESTED_TYPE => Cursor::Message(m.nested_type.get(index)?),
                tag::MESSAGE_ENUM_TYPE => Cursor::Enum(m.enum_type.get(index)?),
                tag::MESSAGE_ONEOF_DECL => {
                    m.oneof_decl.get(index)?;
                    Cursor::Leaf(Declaration::Oneof)
                }
                _ => return None,
            },
            Cursor::Enum(e) => match tag {
                tag::ENUM_VALUE => {
                    e.value.get(index)?;
                    Cursor::Leaf(Declaration::EnumValue)
                }
                _ => return None,
            },
            Cursor::Leaf(_) => return None,
        };
    }

    match cursor {
        Cursor::File(_) => None,
        Cursor::Message(_) => Some(Declaration::Message),
        Cursor::Enum(_) => Some(Declaration::Enum),
        Cursor::Leaf(declaration) => Some(declaration),
    }
}

/// How comments are turned into titles and descriptions.
#[derive(Debug, Clone)]
pub struct CommentStyle {
    pub delimiter: String,
    pub exclude_token: String,
    pub keep_newlines: bool,
}

impl Default for CommentStyle {
    fn default() -> Self {
        CommentStyle {
            delimiter: "\n\n".to_string(),
            exclude_token: "@exclude".to_string(),
            keep_newlines: false,
        }
    }
}

/// Title and description derived for one declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Documentation {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Comments of every declaration in a request, keyed by declaration.
#[derive(Debug, Default)]
pub struct CommentIndex {
    locations: HashMap<DeclarationKey, Location>,
}

impl CommentIndex {
    /// Index the comment locations of all files.
    pub fn build(files: &[FileDescriptor]) -> Self {
        let mut locations = HashMap::new();
        for (file_index, file) in files.iter().enumerate() {
            let Some(info) = &file.source_code_info else {
                continue;
            };
            for location in &info.location {
                if declaration_at(file, &location.path).is_some() {
                    locations.insert(
                        DeclarationKey::new(file_index, location.path.clone()),
                        location.clone(),
                    );
                }
            }
        }
        CommentIndex { locations }
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn get(&self, key: &DeclarationKey) -> Option<&Location> {
        self.locations.get(key)
    }

    /// Title and description for a declaration.
    ///
    /// `name` provides the default title; pass `None` for declarations that
    /// should only get a title from an explicit detached comment. Nothing is
    /// returned for declarations without a recorded location.
    pub fn document(
        &self,
        key: &DeclarationKey,
        name: Option<&str>,
        style: &CommentStyle,
    ) -> Documentation {
        match self.locations.get(key) {
            Some(location) => format_comments(name, location, style),
            None => Documentation::default(),
        }
    }
}

/// Build a title and description from a location's comments.
pub fn format_comments(
    name: Option<&str>,
    location: &Location,
    style: &CommentStyle,
) -> Documentation {
    let mut title = name.filter(|n| !n.is_empty()).map(humanize);
    let mut comments: Vec<&str> = Vec::new();

    for detached in &location.leading_detached_comments {
        let trimmed = detached.trim();
        if trimmed.is_empty() {
            continue;
        }
        if comments.is_empty() {
            title = trimmed.lines().next().map(|line| line.trim().to_string());
        }
        comments.push(trimmed);
    }
    for comment in [&location.leading_comments, &location.trailing_comments]
        .into_iter()
        .flatten()
    {
        let trimmed = comment.trim();
        if !trimmed.is_empty() {
            comments.push(trimmed);
        }
    }

    if comments.iter().any(|c| c.contains(&style.exclude_token)) {
        return Documentation {
            title,
            description: None,
        };
    }

    let joined = comments.join(&style.delimiter);
    let description = if style.keep_newlines {
        joined
    } else {
        joined
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    };

    Documentation {
        title,
        description: Some(description).filter(|d| !d.is_empty()),
    }
}
