//! Transaction-scoped identifier resolution.
//!
//! Inserts carry a temporary name the device resolves within the same
//! transaction; once the result array comes back, the temporary name
//! maps to the real identifier reported for the corresponding insert.
//! The resolver also keeps a long-lived identity map so later passes
//! can find an entity's identifier before the monitor mirror catches
//! up.

use std::collections::HashMap;

use ovsdb_proto::Uuid;

use crate::entity::{EntityKind, NodeId};

/// Maps temporary names to resolved identifiers and tracks entity
/// identity across reconciliation passes.
#[derive(Debug, Default)]
pub struct UuidResolver {
    /// (node, kind, name) → device identifier, once known.
    identities: HashMap<(NodeId, EntityKind, String), Uuid>,
    /// Temporary name → the entity it will identify.
    pending: HashMap<String, (NodeId, EntityKind, String)>,
    counter: u64,
}

impl UuidResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a transaction-scoped temporary name for an entity
    /// about to be inserted. The name is a valid wire identifier
    /// (letters, digits and underscores) and unique per resolver.
    pub fn temp_name(&mut self, node: &NodeId, kind: EntityKind, name: &str) -> String {
        let sanitized: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.counter += 1;
        let temp = format!("row_{}_{}", sanitized, self.counter);
        self.pending
            .insert(temp.clone(), (node.clone(), kind, name.to_string()));
        temp
    }

    /// Records the identifier the device resolved a temporary name to.
    pub fn record(&mut self, temp: &str, uuid: Uuid) {
        if let Some(identity) = self.pending.remove(temp) {
            self.identities.insert(identity, uuid);
        }
    }

    /// The known identifier for an entity, from any prior resolution.
    pub fn identity(&self, node: &NodeId, kind: EntityKind, name: &str) -> Option<Uuid> {
        self.identities
            .get(&(node.clone(), kind, name.to_string()))
            .copied()
    }

    /// Forgets an entity's identity after deletion.
    pub fn forget(&mut self, node: &NodeId, kind: EntityKind, name: &str) {
        self.identities.remove(&(node.clone(), kind, name.to_string()));
    }

    /// Discards temporary names from a pass whose transaction failed;
    /// the identities they would have established never existed.
    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }
}
