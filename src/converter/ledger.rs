//! Pre-pass that decides which messages become shared definitions.
//!
//! A depth-first walk over the root's field-reference graph visits every
//! reachable message once. A message is shared when two or more field
//! references point at it, or when it is the target of a back-edge (self or
//! mutual recursion). Every other message is inlined where it is used, which
//! keeps emission finite: each cycle contains a back-edge target, and
//! emission stops at shared messages. Map entries are always inlined, so a
//! cycle that closes on a map entry is rejected.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::descriptor::FieldKind;
use crate::error::{Error, Result};
use crate::registry::{MessageId, Registry};

use super::{MessageTarget, resolve_message_type};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Messages reachable from one root, and which of them are shared.
#[derive(Debug, Default)]
pub struct DuplicateLedger {
    reachable: HashMap<MessageId, String>,
    shared: BTreeMap<MessageId, String>,
}

impl DuplicateLedger {
    /// Walk the reference graph of `root`.
    ///
    /// Names are fully qualified unless `without_package` is set.
    pub fn find(registry: &Registry<'_>, root: MessageId, without_package: bool) -> Result<Self> {
        let mut walk = Walk {
            registry,
            state: HashMap::new(),
            incoming: HashMap::new(),
            back_edge_targets: HashSet::new(),
        };
        walk.visit(root)?;

        let mut ledger = DuplicateLedger::default();
        for &id in walk.state.keys() {
            let entry = registry.message(id);
            let name = if without_package {
                entry.descriptor.name.clone()
            } else {
                entry.full_name.clone()
            };
            let repeated = walk.incoming.get(&id).copied().unwrap_or(0) >= 2;
            if (repeated || walk.back_edge_targets.contains(&id))
                && !entry.descriptor.is_map_entry()
            {
                ledger.shared.insert(id, name.clone());
            }
            ledger.reachable.insert(id, name);
        }
        Ok(ledger)
    }

    /// Definition name of `id`, if it is shared.
    pub fn shared_name(&self, id: MessageId) -> Option<&str> {
        self.shared.get(&id).map(String::as_str)
    }

    /// Shared messages and their definition names.
    pub fn shared(&self) -> impl Iterator<Item = (MessageId, &str)> {
        self.shared.iter().map(|(&id, name)| (id, name.as_str()))
    }

    pub fn is_reachable(&self, id: MessageId) -> bool {
        self.reachable.contains_key(&id)
    }

    pub fn reachable_count(&self) -> usize {
        self.reachable.len()
    }
}

struct Walk<'r, 'a> {
    registry: &'r Registry<'a>,
    state: HashMap<MessageId, Visit>,
    incoming: HashMap<MessageId, usize>,
    back_edge_targets: HashSet<MessageId>,
}

impl Walk<'_, '_> {
    fn visit(&mut self, id: MessageId) -> Result<()> {
        self.state.insert(id, Visit::InProgress);
        let entry = self.registry.message(id);

        for field in &entry.descriptor.field {
            if !matches!(field.kind, Some(FieldKind::Message | FieldKind::Group)) {
                continue;
            }
            let type_name = field.type_name.as_deref().unwrap_or_default();
            let target = match resolve_message_type(self.registry, entry.package, type_name)? {
                MessageTarget::Message(target) => target,
                MessageTarget::WellKnown(_) => continue,
            };

            *self.incoming.entry(target).or_default() += 1;
            match self.state.get(&target) {
                None => self.visit(target)?,
                Some(Visit::InProgress) => {
                    if self.registry.message(target).descriptor.is_map_entry() {
                        return Err(Error::MalformedMapType {
                            field: field.name.clone(),
                            message: entry.full_name.clone(),
                        });
                    }
                    self.back_edge_targets.insert(target);
                }
                Some(Visit::Done) => {}
            }
        }

        self.state.insert(id, Visit::Done);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FileDescriptor;

    fn message_field(name: &str, type_name: &str) -> serde_json::Value {
        serde_json::json!({
            "name": name, "number": 1, "label": "LABEL_OPTIONAL",
            "type": "TYPE_MESSAGE", "typeName": type_name
        })
    }

    fn files() -> Vec<FileDescriptor> {
        serde_json::from_value(serde_json::json!([{
            "name": "graph.proto",
            "package": "graph",
            "syntax": "proto3",
            "messageType": [
                {"name": "Leaf", "field": [{"name": "v", "number": 1, "type": "TYPE_STRING"}]},
                {"name": "Tree", "field": [
                    message_field("left", ".graph.Leaf"),
                    message_field("right", ".graph.Leaf"),
                    message_field("child", ".graph.Tree"),
                    message_field("when", ".google.protobuf.Timestamp")
                ]},
                {"name": "Ping", "field": [message_field("pong", ".graph.Pong")]},
                {"name": "Pong", "field": [message_field("ping", ".graph.Ping")]},
                {"name": "Wrapper", "field": [
                    message_field("only", ".graph.Leaf"),
                    {"name": "tags", "number": 2, "label": "LABEL_REPEATED",
                     "type": "TYPE_MESSAGE", "typeName": ".graph.Wrapper.TagsEntry"}
                ], "nestedType": [{
                    "name": "TagsEntry",
                    "options": {"mapEntry": true},
                    "field": [
                        {"name": "key", "number": 1, "type": "TYPE_STRING"},
                        message_field("value", ".graph.Wrapper")
                    ]
                }]},
                {"name": "Broken", "field": [message_field("gone", ".graph.Missing")]},
                {"name": "Holder", "field": [
                    {"name": "slots", "number": 1, "label": "LABEL_REPEATED",
                     "type": "TYPE_MESSAGE", "typeName": ".graph.Holder.SlotsEntry"}
                ], "nestedType": [{
                    "name": "SlotsEntry",
                    "options": {"mapEntry": true},
                    "field": [
                        {"name": "key", "number": 1, "type": "TYPE_STRING"},
                        message_field("value", ".graph.Slot")
                    ]
                }]},
                {"name": "Slot", "field": [
                    {"name": "more", "number": 1, "label": "LABEL_REPEATED",
                     "type": "TYPE_MESSAGE", "typeName": ".graph.Holder.SlotsEntry"}
                ]}
            ]
        }]))
        .unwrap()
    }

    fn id(registry: &Registry<'_>, name: &str) -> MessageId {
        registry.lookup_message(registry.root(), name).unwrap().0
    }

    #[test]
    fn repeated_and_self_references_are_shared() {
        let files = files();
        let registry = Registry::build(&files);
        let tree = id(&registry, ".graph.Tree");
        let ledger = DuplicateLedger::find(&registry, tree, false).unwrap();

        assert_eq!(ledger.reachable_count(), 2);
        assert_eq!(ledger.shared_name(tree), Some("graph.Tree"));
        assert_eq!(ledger.shared_name(id(&registry, ".graph.Leaf")), Some("graph.Leaf"));
    }

    #[test]
    fn mutual_recursion_breaks_at_back_edge() {
        let files = files();
        let registry = Registry::build(&files);
        let ping = id(&registry, ".graph.Ping");
        let ledger = DuplicateLedger::find(&registry, ping, true).unwrap();

        assert_eq!(ledger.reachable_count(), 2);
        assert_eq!(ledger.shared_name(ping), Some("Ping"));
        assert_eq!(ledger.shared_name(id(&registry, ".graph.Pong")), None);
    }

    #[test]
    fn single_use_messages_and_map_entries_are_inlined() {
        let files = files();
        let registry = Registry::build(&files);
        let wrapper = id(&registry, ".graph.Wrapper");
        let ledger = DuplicateLedger::find(&registry, wrapper, false).unwrap();

        let entry = id(&registry, ".graph.Wrapper.TagsEntry");
        assert!(ledger.is_reachable(entry));
        assert_eq!(ledger.shared_name(entry), None);
        assert_eq!(ledger.shared_name(id(&registry, ".graph.Leaf")), None);
        // Wrapper is reached again through its map values.
        assert_eq!(ledger.shared_name(wrapper), Some("graph.Wrapper"));
        assert_eq!(ledger.shared().count(), 1);
    }

    #[test]
    fn cycle_through_map_entry_is_rejected() {
        let files = files();
        let registry = Registry::build(&files);
        let holder = id(&registry, ".graph.Holder");
        match DuplicateLedger::find(&registry, holder, false) {
            Err(Error::MalformedMapType { field, message }) => {
                assert_eq!(field, "more");
                assert_eq!(message, "graph.Slot");
            }
            other => panic!("expected MalformedMapType, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_field_type_fails() {
        let files = files();
        let registry = Registry::build(&files);
        let broken = id(&registry, ".graph.Broken");
        assert!(DuplicateLedger::find(&registry, broken, false).is_err());
    }
}
