//! The generic transact command.
//!
//! One reconciliation routine parameterized by an entity-type
//! descriptor replaces a per-type command class hierarchy. The
//! descriptor carries the extraction kind, the table schema, a
//! dependency rank for topological ordering, the optional parent link
//! (which reference-set column on which parent kind owns this entity),
//! and the encode/decode functions between entity and wire row.

use std::collections::HashMap;

use tracing::{debug, warn};

use ovsdb_proto::{Condition, Datum, Function, Mutation, Row, TableSchema, UUID_COLUMN};
use vtep_client::TransactionBuilder;

use crate::cache::CacheReader;
use crate::entity::{Entity, EntityKind, NodeId};
use crate::report::{PassReport, RefIntegrityWarning};
use crate::uuid_resolver::UuidResolver;

/// Encodes an entity's attributes into the columns of its table.
pub type EncodeFn = fn(&Entity, &TableSchema) -> Row;

/// Decodes a device row back into an entity, if it carries enough to
/// identify one.
pub type DecodeFn = fn(EntityKind, &Row) -> Option<Entity>;

/// Ownership edge: which set-valued column on which parent kind holds
/// references to entities of this descriptor's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    pub kind: EntityKind,
    pub column: &'static str,
}

/// Everything the generic command needs to drive one entity type.
#[derive(Clone)]
pub struct EntityDescriptor {
    pub kind: EntityKind,
    pub table: TableSchema,
    /// Topological rank: parents rank lower than the entities that
    /// reference them. Inserts run rank-ascending, deletes descending.
    pub rank: u8,
    pub parent: Option<ParentLink>,
    pub encode: EncodeFn,
    pub decode: DecodeFn,
}

impl EntityDescriptor {
    pub fn new(kind: EntityKind, table: TableSchema, rank: u8) -> Self {
        Self {
            kind,
            table,
            rank,
            parent: None,
            encode: encode_schema_columns,
            decode: decode_named_row,
        }
    }

    pub fn with_parent(mut self, kind: EntityKind, column: &'static str) -> Self {
        self.parent = Some(ParentLink { kind, column });
        self
    }
}

/// Default encode: the name column plus every entity attribute the
/// table schema knows.
pub fn encode_schema_columns(entity: &Entity, table: &TableSchema) -> Row {
    let mut row = Row::new();
    if table.has_column("name") {
        row.insert("name".into(), Datum::String(entity.name.clone()));
    }
    for (column, datum) in &entity.columns {
        if table.has_column(column) {
            row.insert(column.clone(), datum.clone());
        }
    }
    row
}

/// Default decode: an entity named by the row's `name` column; rows of
/// nameless tables (the root) decode with an empty name.
pub fn decode_named_row(kind: EntityKind, row: &Row) -> Option<Entity> {
    let name = match row.get("name") {
        Some(datum) => datum.as_str()?.to_string(),
        None if kind == EntityKind::Global => String::new(),
        None => return None,
    };
    let mut columns = row.clone();
    columns.remove("name");
    columns.remove(UUID_COLUMN);
    Some(Entity::new(kind, name).with_columns(columns))
}

/// True when every desired column is already present with the same
/// value in the device row.
pub fn realized(device_row: &Row, desired: &Row) -> bool {
    desired
        .iter()
        .all(|(column, datum)| device_row.get(column) == Some(datum))
}

/// Per-pass bookkeeping for inserts whose identifiers are still
/// temporary names.
#[derive(Debug, Default)]
pub struct PendingInserts {
    /// Operation index → temporary name, for positional resolution
    /// from the result array.
    slots: Vec<(usize, String)>,
    by_identity: HashMap<(NodeId, EntityKind, String), String>,
}

impl PendingInserts {
    fn register(&mut self, index: usize, temp: String, node: &NodeId, kind: EntityKind, name: &str) {
        self.slots.push((index, temp.clone()));
        self.by_identity
            .insert((node.clone(), kind, name.to_string()), temp);
    }

    /// The temporary name an entity inserted earlier in this pass goes
    /// by, for intra-transaction forward references.
    pub fn temp_for(&self, node: &NodeId, kind: EntityKind, name: &str) -> Option<&str> {
        self.by_identity
            .get(&(node.clone(), kind, name.to_string()))
            .map(String::as_str)
    }

    /// (operation index, temporary name) pairs, in append order.
    pub fn slots(&self) -> &[(usize, String)] {
        &self.slots
    }
}

/// The generic command for one entity type.
pub struct TransactCommand<'a> {
    pub descriptor: &'a EntityDescriptor,
    /// Descriptor of the parent kind, when this kind has an ownership
    /// edge; supplies the table the parent mutation targets.
    pub parent: Option<&'a EntityDescriptor>,
}

impl<'a> TransactCommand<'a> {
    /// Queues delete + comment + parent-detach operations for each
    /// removed entity whose identifier is known. Unknown entities emit
    /// no operations and are surfaced as referential-integrity
    /// warnings: the device has no record of something configuration
    /// says existed.
    pub fn queue_removals(
        &self,
        builder: &mut TransactionBuilder,
        removed: &[(NodeId, Entity)],
        cache: &CacheReader,
        resolver: &mut UuidResolver,
        report: &mut PassReport,
    ) {
        let descriptor = self.descriptor;
        for (node, entity) in removed {
            debug!("removing {} {:?}", descriptor.kind.label(), entity.name);
            let uuid = cache
                .lookup_uuid(node, descriptor.kind, &entity.name)
                .or_else(|| resolver.identity(node, descriptor.kind, &entity.name));
            let Some(uuid) = uuid else {
                let warning = RefIntegrityWarning {
                    node: node.clone(),
                    kind: descriptor.kind,
                    name: entity.name.clone(),
                    context: "delete",
                };
                warn!("{warning}");
                report.warnings.push(warning);
                continue;
            };

            builder.delete(
                descriptor.table.name.clone(),
                vec![Condition::uuid_equals(uuid)],
            );
            builder.comment(format!(
                "{}: Deleting {}",
                descriptor.kind.label(),
                entity.name
            ));
            if let Some(parent) = self.parent {
                let link = descriptor.parent.expect("parent descriptor without link");
                let clauses = self.parent_clauses(node, entity.parent_name(), cache, resolver, None);
                builder.mutate(
                    parent.table.name.clone(),
                    clauses,
                    vec![Mutation::delete(link.column, Datum::uuid_singleton(uuid))],
                );
            }
            resolver.forget(node, descriptor.kind, &entity.name);
            report.deletes += 1;
        }
    }

    /// Queues insert + comment + parent-attach operations for each
    /// added entity. The insert carries a transaction-scoped temporary
    /// name, and the parent mutation references that name so the
    /// device resolves the forward reference atomically. An entity the
    /// cache already holds is re-converged in place: an update when
    /// columns differ, nothing at all when the device row already
    /// matches.
    pub fn queue_additions(
        &self,
        builder: &mut TransactionBuilder,
        added: &[(NodeId, Entity)],
        cache: &CacheReader,
        resolver: &mut UuidResolver,
        pending: &mut PendingInserts,
        report: &mut PassReport,
    ) {
        let descriptor = self.descriptor;
        for (node, entity) in added {
            let encoded = (descriptor.encode)(entity, &descriptor.table);
            if let Some(cached) = cache.lookup(node, descriptor.kind, &entity.name) {
                if realized(&cached.columns, &encoded) {
                    debug!(
                        "{} {:?} already realized, skipping",
                        descriptor.kind.label(),
                        entity.name
                    );
                    continue;
                }
                builder.update(
                    descriptor.table.name.clone(),
                    vec![Condition::uuid_equals(cached.uuid)],
                    encoded,
                );
                report.updates += 1;
                continue;
            }

            let temp = resolver.temp_name(node, descriptor.kind, &entity.name);
            let index = builder.len();
            builder.insert(descriptor.table.name.clone(), encoded, Some(temp.clone()));
            builder.comment(format!(
                "{}: Creating {}",
                descriptor.kind.label(),
                entity.name
            ));
            if let Some(parent) = self.parent {
                let link = descriptor.parent.expect("parent descriptor without link");
                let clauses =
                    self.parent_clauses(node, entity.parent_name(), cache, resolver, Some(pending));
                builder.mutate(
                    parent.table.name.clone(),
                    clauses,
                    vec![Mutation::insert(link.column, Datum::named_singleton(&temp))],
                );
            }
            pending.register(index, temp, node, descriptor.kind, &entity.name);
            report.inserts += 1;
        }
    }

    /// Queues an update for each changed entity whose identifier is
    /// known; a cache miss is a warning, not a failure, and an entity
    /// whose device row already matches queues nothing.
    pub fn queue_updates(
        &self,
        builder: &mut TransactionBuilder,
        updated: &[(NodeId, Entity)],
        cache: &CacheReader,
        resolver: &UuidResolver,
        report: &mut PassReport,
    ) {
        let descriptor = self.descriptor;
        for (node, entity) in updated {
            let encoded = (descriptor.encode)(entity, &descriptor.table);
            let cached = cache.lookup(node, descriptor.kind, &entity.name);
            let uuid = cached
                .as_ref()
                .map(|c| c.uuid)
                .or_else(|| resolver.identity(node, descriptor.kind, &entity.name));
            let Some(uuid) = uuid else {
                let warning = RefIntegrityWarning {
                    node: node.clone(),
                    kind: descriptor.kind,
                    name: entity.name.clone(),
                    context: "update",
                };
                warn!("{warning}");
                report.warnings.push(warning);
                continue;
            };
            if let Some(cached) = &cached {
                if realized(&cached.columns, &encoded) {
                    continue;
                }
            }
            builder.update(
                descriptor.table.name.clone(),
                vec![Condition::uuid_equals(uuid)],
                encoded,
            );
            report.updates += 1;
        }
    }

    /// Where-clauses addressing the parent row: by cached identifier
    /// when acknowledged, by this pass's temporary name when the
    /// parent is inserted in the same transaction, with no clause at
    /// all for the singleton root row, and by name as a last resort.
    fn parent_clauses(
        &self,
        node: &NodeId,
        parent_name: &str,
        cache: &CacheReader,
        resolver: &UuidResolver,
        pending: Option<&PendingInserts>,
    ) -> Vec<Condition> {
        let link = self.descriptor.parent.expect("no parent link");
        let uuid = cache
            .lookup_uuid(node, link.kind, parent_name)
            .or_else(|| resolver.identity(node, link.kind, parent_name));
        if let Some(uuid) = uuid {
            return vec![Condition::uuid_equals(uuid)];
        }
        if let Some(temp) = pending.and_then(|p| p.temp_for(node, link.kind, parent_name)) {
            return vec![Condition(
                UUID_COLUMN.into(),
                Function::Equals,
                Datum::NamedUuid(temp.to_string()),
            )];
        }
        if link.kind == EntityKind::Global || parent_name.is_empty() {
            // The per-device root is a singleton; an unqualified
            // mutate addresses its only row.
            return Vec::new();
        }
        vec![Condition::equals("name", parent_name)]
    }
}
