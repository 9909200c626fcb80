//! One reconciliation pass: configuration deltas in, a single ordered
//! transaction out.
//!
//! Deletions are queued first, child kinds before their parents, so no
//! operation ever orphans a live reference. Creations and updates
//! follow, parents before children, with temporary names bridging
//! forward references inside the transaction.

use tracing::{debug, info};

use ovsdb_proto::OperationResult;
use vtep_client::{ClientError, Transact, TransactionBuilder};

use crate::cache::CacheReader;
use crate::command::{EntityDescriptor, PendingInserts, TransactCommand};
use crate::entity::NodeModification;
use crate::extractor::{extract_added, extract_removed, extract_updated};
use crate::report::PassReport;
use crate::uuid_resolver::UuidResolver;

pub struct Reconciler {
    database: String,
    /// Sorted rank-ascending at construction.
    descriptors: Vec<EntityDescriptor>,
    resolver: UuidResolver,
}

/// The transaction a pass produced, before submission.
pub struct PassPlan {
    pub builder: TransactionBuilder,
    pub report: PassReport,
    pending: PendingInserts,
}

impl Reconciler {
    pub fn new(database: impl Into<String>, mut descriptors: Vec<EntityDescriptor>) -> Self {
        descriptors.sort_by_key(|d| d.rank);
        Self {
            database: database.into(),
            descriptors,
            resolver: UuidResolver::new(),
        }
    }

    pub fn resolver(&self) -> &UuidResolver {
        &self.resolver
    }

    fn parent_of<'a>(
        descriptors: &'a [EntityDescriptor],
        descriptor: &EntityDescriptor,
    ) -> Option<&'a EntityDescriptor> {
        let link = descriptor.parent?;
        descriptors.iter().find(|d| d.kind == link.kind)
    }

    /// Translates the change set into one ordered transaction against
    /// the current cache state. Queues nothing for entities already
    /// converged.
    pub fn plan(&mut self, changes: &[NodeModification], cache: &CacheReader) -> PassPlan {
        let mut builder = TransactionBuilder::new(self.database.clone());
        let mut report = PassReport::default();
        let mut pending = PendingInserts::default();

        // Children detach and die before their parents.
        for descriptor in self.descriptors.iter().rev() {
            let removed = extract_removed(changes, descriptor.kind);
            if removed.is_empty() {
                continue;
            }
            let command = TransactCommand {
                descriptor,
                parent: Self::parent_of(&self.descriptors, descriptor),
            };
            command.queue_removals(&mut builder, &removed, cache, &mut self.resolver, &mut report);
        }

        // Parents exist before anything references them.
        for descriptor in &self.descriptors {
            let command = TransactCommand {
                descriptor,
                parent: Self::parent_of(&self.descriptors, descriptor),
            };
            let added = extract_added(changes, descriptor.kind);
            if !added.is_empty() {
                command.queue_additions(
                    &mut builder,
                    &added,
                    cache,
                    &mut self.resolver,
                    &mut pending,
                    &mut report,
                );
            }
            let updated = extract_updated(changes, descriptor.kind);
            if !updated.is_empty() {
                command.queue_updates(&mut builder, &updated, cache, &self.resolver, &mut report);
            }
        }

        debug!(
            operations = builder.len(),
            inserts = report.inserts,
            updates = report.updates,
            deletes = report.deletes,
            "pass planned"
        );
        PassPlan {
            builder,
            report,
            pending,
        }
    }

    /// Plans and submits one pass. On success the device-assigned
    /// identifiers for this pass's inserts are recorded positionally
    /// from the result array; on rejection every temporary name is
    /// discarded so the next pass re-plans from scratch.
    pub async fn run(
        &mut self,
        changes: &[NodeModification],
        cache: &CacheReader,
        transactor: &dyn Transact,
    ) -> Result<PassReport, ClientError> {
        let plan = self.plan(changes, cache);
        if plan.builder.is_empty() {
            return Ok(plan.report);
        }

        let PassPlan {
            builder,
            report,
            pending,
        } = plan;
        match builder.execute(transactor).await {
            Ok(results) => {
                self.record_inserts(&pending, &results);
                info!(
                    inserts = report.inserts,
                    updates = report.updates,
                    deletes = report.deletes,
                    warnings = report.warnings.len(),
                    "pass committed"
                );
                Ok(report)
            }
            Err(err) => {
                self.resolver.discard_pending();
                Err(err)
            }
        }
    }

    fn record_inserts(&mut self, pending: &PendingInserts, results: &[OperationResult]) {
        for (index, temp) in pending.slots() {
            let Some(result) = results.get(*index) else {
                continue;
            };
            if let Some(uuid) = result.uuid {
                self.resolver.record(temp, uuid);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::operational_cache;
    use crate::descriptors::{hardware_vtep_descriptors, DATABASE};
    use crate::entity::{Entity, EntityKind, NodeSnapshot};
    use ovsdb_proto::Operation;
    use pretty_assertions::assert_eq;

    fn snapshot(entities: Vec<Entity>) -> Option<NodeSnapshot> {
        Some(NodeSnapshot::new(entities))
    }

    #[test]
    fn plan_orders_deletes_before_inserts() {
        let mut reconciler = Reconciler::new(DATABASE, hardware_vtep_descriptors());
        let (writer, cache) = operational_cache();
        let node = crate::entity::NodeId::from("node0");
        writer.upsert(
            &node,
            EntityKind::LogicalSwitch,
            "ls-old",
            crate::cache::CachedEntity {
                uuid: ovsdb_proto::Uuid::generate(),
                columns: ovsdb_proto::row([("name", "ls-old".into())]),
            },
        );

        let changes = vec![NodeModification::new(
            "node0",
            snapshot(vec![Entity::new(EntityKind::LogicalSwitch, "ls-old")]),
            snapshot(vec![Entity::new(EntityKind::LogicalSwitch, "ls-new")]),
        )];
        let plan = reconciler.plan(&changes, &cache);

        let ops = plan.builder.operations();
        let delete_at = ops
            .iter()
            .position(|op| matches!(op, Operation::Delete { .. }))
            .unwrap();
        let insert_at = ops
            .iter()
            .position(|op| matches!(op, Operation::Insert { .. }))
            .unwrap();
        assert!(delete_at < insert_at);
        assert_eq!(plan.report.deletes, 1);
        assert_eq!(plan.report.inserts, 1);
    }

    #[test]
    fn unchanged_configuration_plans_nothing() {
        let mut reconciler = Reconciler::new(DATABASE, hardware_vtep_descriptors());
        let (_writer, cache) = operational_cache();
        let same = vec![Entity::new(EntityKind::LogicalSwitch, "ls0")];
        let changes = vec![NodeModification::new(
            "node0",
            snapshot(same.clone()),
            snapshot(same),
        )];
        let plan = reconciler.plan(&changes, &cache);
        assert!(plan.builder.is_empty());
        assert_eq!(plan.report.queued(), 0);
    }
}
