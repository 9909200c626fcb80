//! Operational state cache.
//!
//! The last-known-good mirror of remote device state, keyed by node
//! and entity name. The monitor dispatcher is the only writer; commands
//! consult it through read-only handles. The split is enforced in the
//! type system: [`CacheWriter`] is not `Clone` and only the dispatcher
//! holds it, while any number of [`CacheReader`] clones may exist.
//!
//! An entity is addressable through this cache only once the remote
//! device has acknowledged it; nothing here is written on the
//! configuration path.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use ovsdb_proto::{Row, Uuid};

use crate::entity::{EntityKind, NodeId};

/// One acknowledged entity: its device-assigned identifier and the
/// last row the device reported for it.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntity {
    pub uuid: Uuid,
    pub columns: Row,
}

type NodeEntities = HashMap<(EntityKind, String), CachedEntity>;

#[derive(Debug, Default)]
struct CacheInner {
    nodes: HashMap<NodeId, NodeEntities>,
}

/// Creates an empty cache, returning its single writer handle and a
/// reader handle to clone out to consumers.
pub fn operational_cache() -> (CacheWriter, CacheReader) {
    let inner = Arc::new(RwLock::new(CacheInner::default()));
    (
        CacheWriter {
            inner: Arc::clone(&inner),
        },
        CacheReader { inner },
    )
}

/// Read-only view of the operational mirror.
#[derive(Clone)]
pub struct CacheReader {
    inner: Arc<RwLock<CacheInner>>,
}

impl CacheReader {
    /// Looks up one acknowledged entity by (node, kind, name).
    pub fn lookup(&self, node: &NodeId, kind: EntityKind, name: &str) -> Option<CachedEntity> {
        let inner = self.inner.read().unwrap();
        inner
            .nodes
            .get(node)
            .and_then(|entities| entities.get(&(kind, name.to_string())))
            .cloned()
    }

    /// The remote identifier for (node, kind, name), if acknowledged.
    pub fn lookup_uuid(&self, node: &NodeId, kind: EntityKind, name: &str) -> Option<Uuid> {
        self.lookup(node, kind, name).map(|e| e.uuid)
    }

    /// All acknowledged entities of one kind under a node, sorted by
    /// name for deterministic iteration.
    pub fn entities(&self, node: &NodeId, kind: EntityKind) -> Vec<(String, CachedEntity)> {
        let inner = self.inner.read().unwrap();
        let mut out: Vec<_> = inner
            .nodes
            .get(node)
            .map(|entities| {
                entities
                    .iter()
                    .filter(|((k, _), _)| *k == kind)
                    .map(|((_, name), entity)| (name.clone(), entity.clone()))
                    .collect()
            })
            .unwrap_or_default();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn is_empty(&self) -> bool {
        let inner = self.inner.read().unwrap();
        inner.nodes.values().all(HashMap::is_empty)
    }
}

/// The single writing handle, held by the monitor dispatcher.
pub struct CacheWriter {
    inner: Arc<RwLock<CacheInner>>,
}

impl CacheWriter {
    /// A read-only handle sharing this cache.
    pub fn reader(&self) -> CacheReader {
        CacheReader {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Inserts or replaces one acknowledged entity.
    pub fn upsert(
        &self,
        node: &NodeId,
        kind: EntityKind,
        name: impl Into<String>,
        entity: CachedEntity,
    ) {
        let mut inner = self.inner.write().unwrap();
        inner
            .nodes
            .entry(node.clone())
            .or_default()
            .insert((kind, name.into()), entity);
    }

    /// Merges changed columns into an existing entry, if present.
    pub fn merge_columns(&self, node: &NodeId, kind: EntityKind, name: &str, columns: &Row) {
        let mut inner = self.inner.write().unwrap();
        if let Some(entity) = inner
            .nodes
            .get_mut(node)
            .and_then(|entities| entities.get_mut(&(kind, name.to_string())))
        {
            for (column, datum) in columns {
                entity.columns.insert(column.clone(), datum.clone());
            }
        }
    }

    /// Removes one entity by name.
    pub fn remove(&self, node: &NodeId, kind: EntityKind, name: &str) -> Option<CachedEntity> {
        let mut inner = self.inner.write().unwrap();
        inner
            .nodes
            .get_mut(node)
            .and_then(|entities| entities.remove(&(kind, name.to_string())))
    }

    /// Removes one entity by its remote identifier, for deletions whose
    /// notification does not carry the name column.
    pub fn remove_by_uuid(
        &self,
        node: &NodeId,
        kind: EntityKind,
        uuid: Uuid,
    ) -> Option<(String, CachedEntity)> {
        let mut inner = self.inner.write().unwrap();
        let entities = inner.nodes.get_mut(node)?;
        let key = entities
            .iter()
            .find(|((k, _), e)| *k == kind && e.uuid == uuid)
            .map(|(key, _)| key.clone())?;
        let entity = entities.remove(&key)?;
        Some((key.1, entity))
    }

    /// Drops everything known about a node. Used when a connection is
    /// lost: the mirror is stale and must be resynchronized before it
    /// is trusted again.
    pub fn invalidate_node(&self, node: &NodeId) {
        let mut inner = self.inner.write().unwrap();
        inner.nodes.remove(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovsdb_proto::row;
    use pretty_assertions::assert_eq;

    fn cached(uuid: Uuid) -> CachedEntity {
        CachedEntity {
            uuid,
            columns: row([("name", "P1".into())]),
        }
    }

    #[test]
    fn reader_sees_writer_updates() {
        let (writer, reader) = operational_cache();
        let node = NodeId::from("node0");
        let uuid = Uuid::generate();

        assert!(reader.lookup(&node, EntityKind::PhysicalPort, "P1").is_none());
        writer.upsert(&node, EntityKind::PhysicalPort, "P1", cached(uuid));

        assert_eq!(
            reader.lookup_uuid(&node, EntityKind::PhysicalPort, "P1"),
            Some(uuid)
        );
        // A miss never creates an entry.
        assert!(reader.lookup(&node, EntityKind::PhysicalPort, "P2").is_none());
    }

    #[test]
    fn remove_by_uuid_finds_the_name() {
        let (writer, reader) = operational_cache();
        let node = NodeId::from("node0");
        let uuid = Uuid::generate();
        writer.upsert(&node, EntityKind::PhysicalPort, "P1", cached(uuid));

        let (name, entity) = writer
            .remove_by_uuid(&node, EntityKind::PhysicalPort, uuid)
            .unwrap();
        assert_eq!(name, "P1");
        assert_eq!(entity.uuid, uuid);
        assert!(reader.is_empty());
    }

    #[test]
    fn merge_columns_updates_in_place() {
        let (writer, reader) = operational_cache();
        let node = NodeId::from("node0");
        let uuid = Uuid::generate();
        writer.upsert(&node, EntityKind::PhysicalPort, "P1", cached(uuid));

        writer.merge_columns(
            &node,
            EntityKind::PhysicalPort,
            "P1",
            &row([("description", "uplink".into())]),
        );
        let entity = reader.lookup(&node, EntityKind::PhysicalPort, "P1").unwrap();
        assert_eq!(entity.columns["description"], ovsdb_proto::Datum::from("uplink"));
        assert_eq!(entity.uuid, uuid);
    }

    #[test]
    fn invalidate_node_clears_the_mirror() {
        let (writer, reader) = operational_cache();
        let node = NodeId::from("node0");
        writer.upsert(&node, EntityKind::PhysicalSwitch, "S1", cached(Uuid::generate()));
        writer.upsert(&node, EntityKind::PhysicalPort, "P1", cached(Uuid::generate()));

        assert_eq!(reader.entities(&node, EntityKind::PhysicalPort).len(), 1);
        writer.invalidate_node(&node);
        assert!(reader.is_empty());
    }
}
