//! Applies device monitor notifications to the operational cache and
//! republishes them as inventory events on a bounded channel.
//!
//! Cache mutation for a notification completes before its events are
//! sent, so a consumer that reads an event and then consults the cache
//! always observes the state that produced the event. The channel is
//! bounded; when consumers lag, the dispatcher waits rather than drop
//! or reorder.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use ovsdb_proto::TableUpdates;

use crate::cache::{CacheWriter, CachedEntity};
use crate::command::EntityDescriptor;
use crate::entity::{Entity, EntityKind, NodeId};

/// Default depth of the inventory event channel.
pub const INVENTORY_QUEUE_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityAction {
    Added,
    Removed,
}

/// One entity appearing on or disappearing from the device, as
/// observed through its monitor stream.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryEvent {
    pub node: NodeId,
    pub kind: EntityKind,
    pub entity: Entity,
    pub action: EntityAction,
}

/// Bounded channel for inventory events.
pub fn inventory_channel(
    depth: usize,
) -> (mpsc::Sender<InventoryEvent>, mpsc::Receiver<InventoryEvent>) {
    mpsc::channel(depth)
}

pub struct MonitorDispatcher {
    node: NodeId,
    descriptors: Vec<EntityDescriptor>,
    cache: CacheWriter,
    events: mpsc::Sender<InventoryEvent>,
}

impl MonitorDispatcher {
    pub fn new(
        node: NodeId,
        descriptors: Vec<EntityDescriptor>,
        cache: CacheWriter,
        events: mpsc::Sender<InventoryEvent>,
    ) -> Self {
        Self {
            node,
            descriptors,
            cache,
            events,
        }
    }

    /// Applies one notification to the cache and returns the events it
    /// produced, in table iteration order. Row modifications update
    /// the cache without producing an event; only appearance and
    /// disappearance are inventory-relevant.
    pub fn apply(&self, updates: &TableUpdates) -> Vec<InventoryEvent> {
        let mut events = Vec::new();
        for (table, uuid, row_update) in updates.iter() {
            let Some(descriptor) = self.descriptors.iter().find(|d| d.table.name == table) else {
                debug!(table, "notification for unmanaged table, ignoring");
                continue;
            };
            if row_update.is_insert() {
                let Some(new) = &row_update.new else { continue };
                let Some(entity) = (descriptor.decode)(descriptor.kind, new) else {
                    warn!(table, %uuid, "insert row did not decode, skipping");
                    continue;
                };
                self.cache.upsert(
                    &self.node,
                    descriptor.kind,
                    &entity.name,
                    CachedEntity {
                        uuid,
                        columns: new.clone(),
                    },
                );
                events.push(InventoryEvent {
                    node: self.node.clone(),
                    kind: descriptor.kind,
                    entity,
                    action: EntityAction::Added,
                });
            } else if row_update.is_delete() {
                let removed = match row_update
                    .old
                    .as_ref()
                    .and_then(|old| (descriptor.decode)(descriptor.kind, old))
                {
                    Some(entity) => self
                        .cache
                        .remove(&self.node, descriptor.kind, &entity.name)
                        .map(|_| entity),
                    // Delete notifications may omit columns; fall
                    // back to identifier lookup.
                    None => self
                        .cache
                        .remove_by_uuid(&self.node, descriptor.kind, uuid)
                        .and_then(|(name, cached)| {
                            let mut row = cached.columns;
                            row.insert("name".into(), ovsdb_proto::Datum::String(name));
                            (descriptor.decode)(descriptor.kind, &row)
                        }),
                };
                match removed {
                    Some(entity) => events.push(InventoryEvent {
                        node: self.node.clone(),
                        kind: descriptor.kind,
                        entity,
                        action: EntityAction::Removed,
                    }),
                    None => warn!(table, %uuid, "delete for row not in cache"),
                }
            } else {
                let Some(new) = &row_update.new else { continue };
                let Some(entity) = (descriptor.decode)(descriptor.kind, new) else {
                    continue;
                };
                self.cache
                    .merge_columns(&self.node, descriptor.kind, &entity.name, new);
            }
        }
        events
    }

    /// Drains a monitor update stream until it ends, forwarding the
    /// inventory events each notification produces. The stream ending
    /// means the connection is gone; the node's mirror is stale from
    /// that point and is dropped so nothing plans against it before a
    /// resync.
    pub async fn run(self, mut updates: mpsc::Receiver<TableUpdates>) {
        while let Some(batch) = updates.recv().await {
            for event in self.apply(&batch) {
                if self.events.send(event).await.is_err() {
                    debug!("inventory consumer gone, stopping dispatch");
                    return;
                }
            }
        }
        debug!(node = %self.node, "monitor stream ended, dropping stale mirror");
        self.cache.invalidate_node(&self.node);
    }
}
