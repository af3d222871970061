//! Descriptor-to-schema conversion engine.
//!
//! Converting one top-level message runs in three steps:
//! 1. [`DuplicateLedger::find`] walks the reference graph and picks the
//!    messages that become shared definitions.
//! 2. Every shared message is expanded into the document's `definitions`.
//! 3. The root is emitted, either inline or as a `$ref` when it is shared
//!    itself.
//!
//! While emitting, a message field whose target is shared becomes a
//! reference; any other message is expanded in place.

pub mod ledger;
pub mod well_known;

use std::collections::BTreeMap;

use crate::comments::{CommentIndex, CommentStyle, tag};
use crate::descriptor::{FieldDescriptor, FieldKind, Label};
use crate::error::{Error, Result};
use crate::options::{ConverterFlags, ConverterOptions};
use crate::registry::{EnumId, MessageEntry, MessageId, PackageId, Registry};
use crate::schema::{
    AdditionalProperties, Document, EnumLiteral, ObjectSchema, Schema, SchemaKind,
};
use crate::type_map::{kind_name, scalar_schema};

pub use ledger::DuplicateLedger;
pub use well_known::WellKnown;

/// What a message-typed field points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageTarget {
    Message(MessageId),
    WellKnown(WellKnown),
}

/// Resolve the type name of a message field.
///
/// Absolute `.google.protobuf.*` names are recognized without a registry
/// entry, so well-known imports need not be part of the request.
pub(crate) fn resolve_message_type(
    registry: &Registry<'_>,
    origin: PackageId,
    type_name: &str,
) -> Result<MessageTarget> {
    if type_name.starts_with('.') {
        if let Some(known) = WellKnown::from_full_name(type_name)? {
            return Ok(MessageTarget::WellKnown(known));
        }
    }
    let (id, _) = registry.lookup_message(origin, type_name)?;
    match WellKnown::from_full_name(&registry.message(id).full_name)? {
        Some(known) => Ok(MessageTarget::WellKnown(known)),
        None => Ok(MessageTarget::Message(id)),
    }
}

/// Converts messages and enums of a populated registry into schema documents.
pub struct Converter<'r, 'a> {
    registry: &'r Registry<'a>,
    comments: &'r CommentIndex,
    flags: ConverterFlags,
    style: CommentStyle,
}

impl<'r, 'a> Converter<'r, 'a> {
    pub fn new(
        registry: &'r Registry<'a>,
        comments: &'r CommentIndex,
        options: &ConverterOptions,
    ) -> Self {
        Converter {
            registry,
            comments,
            flags: options.flags,
            style: options.comment_style(),
        }
    }

    /// Convert one top-level message into a standalone document.
    pub fn convert_message(&self, root: MessageId) -> Result<Document> {
        let ledger = DuplicateLedger::find(
            self.registry,
            root,
            self.flags.type_names_without_package_prefix,
        )?;
        log::debug!(
            "{}: {} reachable messages, {} shared",
            self.registry.message(root).full_name,
            ledger.reachable_count(),
            ledger.shared().count()
        );

        let mut definitions = BTreeMap::new();
        for (id, name) in ledger.shared() {
            let schema = self.message_schema(id, &ledger)?;
            if definitions.insert(name.to_string(), schema).is_some() {
                log::warn!(
                    "definition name '{name}' is used by more than one message; keeping {}",
                    self.registry.message(id).full_name
                );
            }
        }

        let root_schema = match ledger.shared_name(root) {
            Some(name) => Schema::reference(name),
            None => self.message_schema(root, &ledger)?,
        };
        Ok(Document {
            root: root_schema,
            definitions,
        })
    }

    /// Convert a standalone enum into a document.
    pub fn convert_enum(&self, id: EnumId) -> Document {
        Document::new(self.enum_schema(id))
    }

    /// The object schema of a message, with shared messages as references.
    pub fn message_schema(&self, id: MessageId, ledger: &DuplicateLedger) -> Result<Schema> {
        let entry = self.registry.message(id);
        let descriptor = entry.descriptor;

        let mut object = ObjectSchema::default();
        if self.flags.disallow_additional_properties {
            object.additional_properties = Some(AdditionalProperties::Allowed(false));
        }

        let mut groups: BTreeMap<i32, Vec<String>> = BTreeMap::new();
        for (index, field) in descriptor.field.iter().enumerate() {
            let schema = self.field_schema(id, index, ledger)?;
            let names = self.property_names(field);
            let key = names[0].clone();
            for name in names {
                object.set_property(name, schema.clone());
            }

            if self.is_required(field) && !object.required.contains(&key) {
                object.required.push(key.clone());
            }
            if self.flags.enforce_oneof {
                if let Some(group) = field.real_oneof() {
                    groups.entry(group).or_default().push(key);
                }
            }
        }
        object.exclusive_groups = groups.into_values().map(at_most_one).collect();

        let docs = self
            .comments
            .document(&entry.declaration, Some(descriptor.name.as_str()), &self.style);
        Ok(Schema::new(SchemaKind::Object(object)).with_docs(docs.title, docs.description))
    }

    /// The schema of field `index` of message `owner`.
    pub fn field_schema(
        &self,
        owner: MessageId,
        index: usize,
        ledger: &DuplicateLedger,
    ) -> Result<Schema> {
        let entry = self.registry.message(owner);
        let field = &entry.descriptor.field[index];

        let kind = match field.kind {
            Some(kind) if kind != FieldKind::Unknown => kind,
            other => {
                return Err(Error::UnrecognizedFieldType {
                    field: field.name.clone(),
                    message: entry.full_name.clone(),
                    kind: kind_name(other),
                });
            }
        };

        let schema = match kind {
            FieldKind::Message | FieldKind::Group => {
                self.message_field_schema(owner, entry, field, ledger)?
            }
            FieldKind::Enum => {
                let type_name = field.type_name.as_deref().unwrap_or_default();
                let (enum_id, _) = self.registry.lookup_enum(entry.package, type_name)?;
                let mut element = self.enum_schema(enum_id);
                if field.is_repeated() {
                    element = element.without_type_branches();
                }
                self.finish(element, field)
            }
            scalar => {
                let element = scalar_schema(scalar, self.flags.disallow_bigints_as_strings)
                    .ok_or_else(|| Error::UnrecognizedFieldType {
                        field: field.name.clone(),
                        message: entry.full_name.clone(),
                        kind: kind_name(Some(scalar)),
                    })?;
                self.finish(element, field)
            }
        };

        let docs = self.comments.document(
            &entry.declaration.child(tag::MESSAGE_FIELD, index),
            None,
            &self.style,
        );
        Ok(schema.with_docs(docs.title, docs.description))
    }

    fn message_field_schema(
        &self,
        owner: MessageId,
        entry: &MessageEntry<'a>,
        field: &FieldDescriptor,
        ledger: &DuplicateLedger,
    ) -> Result<Schema> {
        let type_name = field.type_name.as_deref().unwrap_or_default();
        let target = match resolve_message_type(self.registry, entry.package, type_name)? {
            MessageTarget::Message(id) => id,
            MessageTarget::WellKnown(known) => {
                let mut schema = known.schema(&self.flags);
                if field.is_repeated() {
                    schema = Schema::array(schema);
                }
                if self.flags.allow_null_values && known.null_wrappable() {
                    schema = schema.nullable();
                }
                return Ok(schema);
            }
        };

        let target_entry = self.registry.message(target);
        if target_entry.descriptor.is_map_entry() {
            let value = target_entry
                .descriptor
                .field
                .iter()
                .position(|f| f.name == "value")
                .ok_or_else(|| Error::MalformedMapType {
                    field: field.name.clone(),
                    message: entry.full_name.clone(),
                })?;
            let value_schema = self.field_schema(target, value, ledger)?;
            let map = Schema::new(SchemaKind::Object(ObjectSchema {
                additional_properties: Some(AdditionalProperties::Schema(Box::new(value_schema))),
                ..Default::default()
            }));
            return Ok(self.nullable_if_allowed(map));
        }

        let element = match ledger.shared_name(target) {
            Some(name) => Schema::reference(name),
            None => {
                let mut inline = self.message_schema(target, ledger)?;
                let proto2 = self.registry.message_file(owner).is_proto2();
                if let Some(object) = inline.as_object_mut() {
                    self.apply_field_policy(object, field, proto2);
                }
                inline
            }
        };
        Ok(self.finish(element, field))
    }

    /// Cardinality-driven `additionalProperties` of an inlined message.
    fn apply_field_policy(&self, object: &mut ObjectSchema, field: &FieldDescriptor, proto2: bool) {
        let allowed = if self.flags.disallow_additional_properties {
            Some(false)
        } else if proto2 {
            match field.label() {
                Label::Required => Some(false),
                Label::Optional => Some(true),
                Label::Repeated => None,
            }
        } else {
            None
        };
        if let Some(allowed) = allowed {
            object.additional_properties = Some(AdditionalProperties::Allowed(allowed));
        }
    }

    /// Wrap a field's element schema for its cardinality and nullability.
    fn finish(&self, element: Schema, field: &FieldDescriptor) -> Schema {
        let schema = if field.is_repeated() {
            Schema::array(element)
        } else {
            element
        };
        self.nullable_if_allowed(schema)
    }

    fn nullable_if_allowed(&self, schema: Schema) -> Schema {
        if self.flags.allow_null_values {
            schema.nullable()
        } else {
            schema
        }
    }

    /// Names, values and numbers of an enum, accepted as string or integer.
    pub fn enum_schema(&self, id: EnumId) -> Schema {
        let entry = self.registry.enumeration(id);
        let values = entry
            .descriptor
            .value
            .iter()
            .flat_map(|value| {
                [
                    EnumLiteral::Name(value.name.clone()),
                    EnumLiteral::Number(value.number),
                ]
            })
            .collect();
        let docs =
            self.comments
                .document(&entry.declaration, Some(entry.descriptor.name.as_str()), &self.style);
        Schema::new(SchemaKind::Enumeration {
            values,
            nullable: false,
            typed: true,
        })
        .with_docs(docs.title, docs.description)
    }

    /// Property keys for a field. The first key names it in `required`.
    fn property_names(&self, field: &FieldDescriptor) -> Vec<String> {
        if self.flags.use_json_field_names_only {
            return vec![field.json_name()];
        }
        let mut names = vec![field.name.clone()];
        if self.flags.use_proto_and_json_field_names {
            let json = field.json_name();
            if json != field.name {
                names.push(json);
            }
        }
        names
    }

    fn is_required(&self, field: &FieldDescriptor) -> bool {
        if field.oneof_index.is_some() {
            return false;
        }
        (self.flags.all_fields_required && !field.is_proto3_optional())
            || field.label() == Label::Required
    }
}

/// `{oneOf: [none present, only m1, only m2, ...]}` for one oneof group.
fn at_most_one(members: Vec<String>) -> Schema {
    let each: Vec<Schema> = members
        .into_iter()
        .map(|member| Schema::required(vec![member]))
        .collect();
    let none = Schema::new(SchemaKind::Not(Box::new(Schema::new(SchemaKind::AnyOf(
        each.clone(),
    )))));
    let mut branches = Vec::with_capacity(each.len() + 1);
    branches.push(none);
    branches.extend(each);
    Schema::new(SchemaKind::OneOf(branches))
}
