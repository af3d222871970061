//! Package/type registry and protobuf name resolution.
//!
//! Packages form a tree of [`PackageNode`]s; messages and enums live in flat
//! arenas and are addressed by [`MessageId`] / [`EnumId`]. Message reference
//! graphs may be cyclic, so every cross-reference is an id, never an owned
//! descriptor.
//!
//! Resolution follows protobuf's scoping rules: a name with a leading `.` is
//! absolute; anything else is looked up in the origin package first, then in
//! each enclosing package up to the root. A dotted name may continue into
//! nested types once its first component names a message.

use std::collections::{BTreeMap, HashMap};

use crate::comments::{DeclarationKey, tag};
use crate::descriptor::{EnumDescriptor, FileDescriptor, MessageDescriptor};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumId(usize);

/// One segment of the package namespace.
#[derive(Debug, Default)]
pub struct PackageNode {
    pub name: String,
    /// Dotted path from the root (empty for the root).
    pub full_name: String,
    pub parent: Option<PackageId>,
    pub children: BTreeMap<String, PackageId>,
    pub types: HashMap<String, MessageId>,
    pub enums: HashMap<String, EnumId>,
}

/// A registered message and where it was declared.
#[derive(Debug)]
pub struct MessageEntry<'a> {
    pub descriptor: &'a MessageDescriptor,
    /// Fully-qualified name without the leading dot (e.g., `"pkg.Outer.Inner"`).
    pub full_name: String,
    pub package: PackageId,
    /// Index of the declaring file in the request.
    pub file: usize,
    pub declaration: DeclarationKey,
    pub nested_types: HashMap<String, MessageId>,
    pub nested_enums: HashMap<String, EnumId>,
}

/// A registered enum and where it was declared.
#[derive(Debug)]
pub struct EnumEntry<'a> {
    pub descriptor: &'a EnumDescriptor,
    pub full_name: String,
    pub package: PackageId,
    pub file: usize,
    pub declaration: DeclarationKey,
}

/// What a name resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symbol {
    Message(MessageId),
    Enum(EnumId),
}

/// The namespace tree plus every message and enum of a request.
#[derive(Debug)]
pub struct Registry<'a> {
    packages: Vec<PackageNode>,
    messages: Vec<MessageEntry<'a>>,
    enums: Vec<EnumEntry<'a>>,
    files: &'a [FileDescriptor],
}

const ROOT: PackageId = PackageId(0);

impl<'a> Registry<'a> {
    /// Register every message and enum of every file.
    pub fn build(files: &'a [FileDescriptor]) -> Self {
        let mut registry = Registry {
            packages: vec![PackageNode::default()],
            messages: Vec::new(),
            enums: Vec::new(),
            files,
        };
        for (file_index, file) in files.iter().enumerate() {
            for (i, message) in file.message_type.iter().enumerate() {
                log::debug!(
                    "registering message {} in package '{}'",
                    message.name,
                    file.package
                );
                let declaration =
                    DeclarationKey::new(file_index, vec![tag::FILE_MESSAGE_TYPE, i as i32]);
                registry.register_message(&file.package, file_index, declaration, message);
            }
            for (i, enum_desc) in file.enum_type.iter().enumerate() {
                let declaration =
                    DeclarationKey::new(file_index, vec![tag::FILE_ENUM_TYPE, i as i32]);
                registry.register_enum(&file.package, file_index, declaration, enum_desc);
            }
        }
        registry
    }

    pub fn root(&self) -> PackageId {
        ROOT
    }

    pub fn package(&self, id: PackageId) -> &PackageNode {
        &self.packages[id.0]
    }

    pub fn message(&self, id: MessageId) -> &MessageEntry<'a> {
        &self.messages[id.0]
    }

    pub fn enumeration(&self, id: EnumId) -> &EnumEntry<'a> {
        &self.enums[id.0]
    }

    /// The file a message was declared in.
    pub fn message_file(&self, id: MessageId) -> &'a FileDescriptor {
        &self.files[self.messages[id.0].file]
    }

    /// Register a top-level message (and, recursively, its nested types)
    /// under `package`. Re-registering a name overwrites the earlier entry.
    pub fn register_message(
        &mut self,
        package: &str,
        file: usize,
        declaration: DeclarationKey,
        descriptor: &'a MessageDescriptor,
    ) -> MessageId {
        let package_id = self.ensure_package(package);
        let full_name = qualify(&self.packages[package_id.0].full_name, &descriptor.name);
        let id = self.insert_message(package_id, full_name, file, declaration, descriptor);
        self.packages[package_id.0]
            .types
            .insert(descriptor.name.clone(), id);
        id
    }

    /// Register a top-level enum under `package`.
    pub fn register_enum(
        &mut self,
        package: &str,
        file: usize,
        declaration: DeclarationKey,
        descriptor: &'a EnumDescriptor,
    ) -> EnumId {
        let package_id = self.ensure_package(package);
        let full_name = qualify(&self.packages[package_id.0].full_name, &descriptor.name);
        let id = self.insert_enum(package_id, full_name, file, declaration, descriptor);
        self.packages[package_id.0]
            .enums
            .insert(descriptor.name.clone(), id);
        id
    }

    fn insert_message(
        &mut self,
        package: PackageId,
        full_name: String,
        file: usize,
        declaration: DeclarationKey,
        descriptor: &'a MessageDescriptor,
    ) -> MessageId {
        let mut nested_types = HashMap::new();
        for (i, nested) in descriptor.nested_type.iter().enumerate() {
            let nested_id = self.insert_message(
                package,
                qualify(&full_name, &nested.name),
                file,
                declaration.child(tag::MESSAGE_NESTED_TYPE, i),
                nested,
            );
            nested_types.insert(nested.name.clone(), nested_id);
        }

        let mut nested_enums = HashMap::new();
        for (i, nested) in descriptor.enum_type.iter().enumerate() {
            let nested_id = self.insert_enum(
                package,
                qualify(&full_name, &nested.name),
                file,
                declaration.child(tag::MESSAGE_ENUM_TYPE, i),
                nested,
            );
            nested_enums.insert(nested.name.clone(), nested_id);
        }

        let id = MessageId(self.messages.len());
        self.messages.push(MessageEntry {
            descriptor,
            full_name,
            package,
            file,
            declaration,
            nested_types,
            nested_enums,
        });
        id
    }

    fn insert_enum(
        &mut self,
        package: PackageId,
        full_name: String,
        file: usize,
        declaration: DeclarationKey,
        descriptor: &'a EnumDescriptor,
    ) -> EnumId {
        let id = EnumId(self.enums.len());
        self.enums.push(EnumEntry {
            descriptor,
            full_name,
            package,
            file,
            declaration,
        });
        id
    }

    /// Descend from the root along `dotted`, creating missing nodes.
    fn ensure_package(&mut self, dotted: &str) -> PackageId {
        let mut current = ROOT;
        for segment in dotted.split('.').filter(|s| !s.is_empty()) {
            current = match self.packages[current.0].children.get(segment) {
                Some(&child) => child,
                None => {
                    let child = PackageId(self.packages.len());
                    let full_name = qualify(&self.packages[current.0].full_name, segment);
                    self.packages.push(PackageNode {
                        name: segment.to_string(),
                        full_name,
                        parent: Some(current),
                        ..Default::default()
                    });
                    self.packages[current.0]
                        .children
                        .insert(segment.to_string(), child);
                    child
                }
            };
        }
        current
    }

    /// Strict package lookup by dotted name. The empty name is the root.
    pub fn lookup_package(&self, dotted: &str) -> Result<PackageId> {
        let mut current = ROOT;
        for segment in dotted.split('.').filter(|s| !s.is_empty()) {
            current = *self.packages[current.0]
                .children
                .get(segment)
                .ok_or_else(|| Error::UnresolvedReference {
                    name: dotted.to_string(),
                    scope: self.packages[current.0].full_name.clone(),
                })?;
        }
        Ok(current)
    }

    /// Resolve a message type name as seen from `origin`.
    ///
    /// Returns the message and the package it was found in.
    pub fn lookup_message(
        &self,
        origin: PackageId,
        type_name: &str,
    ) -> Result<(MessageId, PackageId)> {
        match self.lookup(origin, type_name)? {
            Some((Symbol::Message(id), package)) => Ok((id, package)),
            _ => Err(self.unresolved(origin, type_name)),
        }
    }

    /// Resolve an enum type name as seen from `origin`.
    pub fn lookup_enum(&self, origin: PackageId, type_name: &str) -> Result<(EnumId, PackageId)> {
        match self.lookup(origin, type_name)? {
            Some((Symbol::Enum(id), package)) => Ok((id, package)),
            _ => Err(self.unresolved(origin, type_name)),
        }
    }

    fn unresolved(&self, origin: PackageId, type_name: &str) -> Error {
        Error::UnresolvedReference {
            name: type_name.to_string(),
            scope: self.packages[origin.0].full_name.clone(),
        }
    }

    fn lookup(&self, origin: PackageId, type_name: &str) -> Result<Option<(Symbol, PackageId)>> {
        if let Some(absolute) = type_name.strip_prefix('.') {
            return self.lookup_in(ROOT, absolute);
        }

        let mut scope = Some(origin);
        while let Some(package) = scope {
            if let Some(found) = self.lookup_in(package, type_name)? {
                return Ok(Some(found));
            }
            scope = self.packages[package.0].parent;
        }
        Ok(None)
    }

    /// Resolve `name` strictly inside `package` (no ascent).
    ///
    /// Package children are tried first; if the head names a message instead,
    /// the remainder must resolve among its nested types.
    fn lookup_in(&self, package: PackageId, name: &str) -> Result<Option<(Symbol, PackageId)>> {
        let node = &self.packages[package.0];
        let Some((head, tail)) = name.split_once('.') else {
            let symbol = node
                .types
                .get(name)
                .map(|&id| Symbol::Message(id))
                .or_else(|| node.enums.get(name).map(|&id| Symbol::Enum(id)));
            return Ok(symbol.map(|s| (s, package)));
        };

        if let Some(&child) = node.children.get(head) {
            if let Some(found) = self.lookup_in(child, tail)? {
                return Ok(Some(found));
            }
        }

        match node.types.get(head) {
            Some(&message) => self
                .lookup_nested(message, tail)
                .map(|symbol| Some((symbol, package))),
            None => Ok(None),
        }
    }

    /// Descend through nested declarations of `message` along `path`.
    fn lookup_nested(&self, message: MessageId, path: &str) -> Result<Symbol> {
        let entry = &self.messages[message.0];
        let missing = || Error::UnresolvedNestedType {
            name: path.to_string(),
            message: entry.full_name.clone(),
        };

        match path.split_once('.') {
            None => entry
                .nested_types
                .get(path)
                .map(|&id| Symbol::Message(id))
                .or_else(|| entry.nested_enums.get(path).map(|&id| Symbol::Enum(id)))
                .ok_or_else(missing),
            Some((head, tail)) => {
                let &inner = entry.nested_types.get(head).ok_or_else(missing)?;
                self.lookup_nested(inner, tail)
            }
        }
    }
}

fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> Vec<FileDescriptor> {
        serde_json::from_value(serde_json::json!([
            {
                "name": "outer.proto",
                "package": "acme",
                "messageType": [
                    {"name": "Shared"},
                    {
                        "name": "Outer",
                        "nestedType": [{
                            "name": "Inner",
                            "nestedType": [{"name": "Deepest"}]
                        }],
                        "enumType": [{"name": "Kind", "value": [{"name": "A", "number": 0}]}]
                    }
                ],
                "enumType": [{"name": "Color", "value": [{"name": "RED", "number": 0}]}]
            },
            {
                "name": "inner.proto",
                "package": "acme.billing.v1",
                "messageType": [{"name": "Invoice"}, {"name": "Shared"}]
            },
            {
                "name": "root.proto",
                "messageType": [{"name": "Top"}]
            }
        ]))
        .unwrap()
    }

    #[test]
    fn builds_package_tree() {
        let files = files();
        let registry = Registry::build(&files);

        let v1 = registry.lookup_package("acme.billing.v1").unwrap();
        let node = registry.package(v1);
        assert_eq!(node.name, "v1");
        assert_eq!(node.full_name, "acme.billing.v1");

        let billing = node.parent.unwrap();
        assert_eq!(registry.package(billing).name, "billing");
        assert_eq!(registry.lookup_package("").unwrap(), registry.root());
        assert!(registry.package(registry.root()).parent.is_none());
    }

    #[test]
    fn lookup_package_fails_on_missing_segment() {
        let files = files();
        let registry = Registry::build(&files);
        let err = registry.lookup_package("acme.shipping").unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { .. }));
    }

    #[test]
    fn absolute_lookup_starts_at_root() {
        let files = files();
        let registry = Registry::build(&files);
        let v1 = registry.lookup_package("acme.billing.v1").unwrap();

        let (id, package) = registry.lookup_message(v1, ".acme.Shared").unwrap();
        assert_eq!(registry.message(id).full_name, "acme.Shared");
        assert_eq!(registry.package(package).full_name, "acme");
    }

    #[test]
    fn relative_lookup_prefers_innermost_scope() {
        let files = files();
        let registry = Registry::build(&files);
        let v1 = registry.lookup_package("acme.billing.v1").unwrap();
        let acme = registry.lookup_package("acme").unwrap();

        let (inner, _) = registry.lookup_message(v1, "Shared").unwrap();
        assert_eq!(registry.message(inner).full_name, "acme.billing.v1.Shared");

        let (outer, _) = registry.lookup_message(acme, "Shared").unwrap();
        assert_eq!(registry.message(outer).full_name, "acme.Shared");
    }

    #[test]
    fn relative_lookup_ascends_to_parents() {
        let files = files();
        let registry = Registry::build(&files);
        let v1 = registry.lookup_package("acme.billing.v1").unwrap();

        let (id, _) = registry.lookup_message(v1, "Outer").unwrap();
        assert_eq!(registry.message(id).full_name, "acme.Outer");

        let (top, package) = registry.lookup_message(v1, "Top").unwrap();
        assert_eq!(registry.message(top).full_name, "Top");
        assert_eq!(package, registry.root());
    }

    #[test]
    fn dotted_lookup_descends_into_nested_types() {
        let files = files();
        let registry = Registry::build(&files);
        let root = registry.root();

        let (id, _) = registry.lookup_message(root, ".acme.Outer.Inner.Deepest").unwrap();
        assert_eq!(registry.message(id).full_name, "acme.Outer.Inner.Deepest");

        let v1 = registry.lookup_package("acme.billing.v1").unwrap();
        let (id, _) = registry.lookup_message(v1, "Outer.Inner").unwrap();
        assert_eq!(registry.message(id).full_name, "acme.Outer.Inner");
    }

    #[test]
    fn missing_nested_type_is_reported() {
        let files = files();
        let registry = Registry::build(&files);
        let err = registry
            .lookup_message(registry.root(), ".acme.Outer.Missing")
            .unwrap_err();
        match err {
            Error::UnresolvedNestedType { name, message } => {
                assert_eq!(name, "Missing");
                assert_eq!(message, "acme.Outer");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_type_is_unresolved() {
        let files = files();
        let registry = Registry::build(&files);
        let err = registry
            .lookup_message(registry.root(), ".acme.Nope")
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { .. }));
    }

    #[test]
    fn enums_resolve_at_top_level_and_nested() {
        let files = files();
        let registry = Registry::build(&files);
        let root = registry.root();

        let (color, _) = registry.lookup_enum(root, ".acme.Color").unwrap();
        assert_eq!(registry.enumeration(color).full_name, "acme.Color");

        let (kind, _) = registry.lookup_enum(root, ".acme.Outer.Kind").unwrap();
        assert_eq!(registry.enumeration(kind).full_name, "acme.Outer.Kind");

        // An enum name is not a message.
        assert!(registry.lookup_message(root, ".acme.Color").is_err());
    }

    #[test]
    fn declarations_record_source_paths() {
        let files = files();
        let registry = Registry::build(&files);
        let (deepest, _) = registry
            .lookup_message(registry.root(), ".acme.Outer.Inner.Deepest")
            .unwrap();
        let entry = registry.message(deepest);
        assert_eq!(entry.declaration.path, vec![4, 1, 3, 0, 3, 0]);
        assert_eq!(entry.file, 0);

        let (kind, _) = registry.lookup_enum(registry.root(), ".acme.Outer.Kind").unwrap();
        assert_eq!(registry.enumeration(kind).declaration.path, vec![4, 1, 4, 0]);
    }

    #[test]
    fn reregistration_overwrites() {
        let files = files();
        let mut registry = Registry::build(&files);
        let acme = registry.lookup_package("acme").unwrap();
        let (before, _) = registry.lookup_message(acme, "Shared").unwrap();

        let replacement = MessageDescriptor {
            name: "Shared".to_string(),
            ..Default::default()
        };
        let replacement: &'static MessageDescriptor = Box::leak(Box::new(replacement));
        let after = registry.register_message(
            "acme",
            0,
            DeclarationKey::new(0, vec![4, 0]),
            replacement,
        );

        let (found, _) = registry.lookup_message(acme, "Shared").unwrap();
        assert_ne!(before, after);
        assert_eq!(found, after);
    }
}
