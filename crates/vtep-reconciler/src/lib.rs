//! Configuration-to-device reconciliation over OVSDB.
//!
//! Before/after configuration snapshots come in as
//! [`NodeModification`]s; each pass extracts the per-kind deltas,
//! consults the operational cache for device-assigned identifiers, and
//! emits one ordered transaction. Monitor notifications flow back
//! through [`MonitorDispatcher`], which keeps the cache current and
//! republishes row lifecycle changes as inventory events.

pub mod cache;
pub mod command;
pub mod descriptors;
pub mod entity;
pub mod extractor;
pub mod monitor;
pub mod reconcile;
pub mod report;
pub mod uuid_resolver;

pub use cache::{operational_cache, CacheReader, CacheWriter, CachedEntity};
pub use command::{
    encode_schema_columns, realized, EntityDescriptor, ParentLink, PendingInserts, TransactCommand,
};
pub use descriptors::{hardware_vtep_descriptors, monitor_requests, DATABASE};
pub use entity::{Entity, EntityKind, NodeId, NodeModification, NodeSnapshot};
pub use extractor::{extract_added, extract_removed, extract_updated};
pub use monitor::{
    inventory_channel, EntityAction, InventoryEvent, MonitorDispatcher, INVENTORY_QUEUE_DEPTH,
};
pub use reconcile::{PassPlan, Reconciler};
pub use report::{PassReport, RefIntegrityWarning};
pub use uuid_resolver::UuidResolver;
