//! Pass-level reporting.
//!
//! Extraction and command-building problems degrade to warnings so a
//! reconciliation pass favors partial progress; only transport-level
//! failures abort a pass.

use std::fmt;

use crate::entity::{EntityKind, NodeId};

/// A removal or update referenced an entity the operational cache has
/// no record of: configuration and device state have diverged, or the
/// same delete arrived twice. Recoverable; no operation is emitted for
/// the entity and the pass continues.
#[derive(Debug, Clone, PartialEq)]
pub struct RefIntegrityWarning {
    pub node: NodeId,
    pub kind: EntityKind,
    pub name: String,
    pub context: &'static str,
}

impl fmt::Display for RefIntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} on node {} not found in the operational cache ({})",
            self.kind.label(),
            self.name,
            self.node,
            self.context
        )
    }
}

/// Outcome bookkeeping for one reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PassReport {
    pub warnings: Vec<RefIntegrityWarning>,
    pub inserts: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl PassReport {
    /// Total side-effecting operations queued by the pass.
    pub fn queued(&self) -> usize {
        self.inserts + self.updates + self.deletes
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
