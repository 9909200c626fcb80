//! Entity descriptors for the hardware_vtep schema.
//!
//! Column sets are declared here explicitly rather than recovered from
//! type metadata at runtime; the encode step filters entity attributes
//! against them so unknown columns never reach the wire.

use ovsdb_proto::{AtomicType, ColumnType, MonitorRequest, MonitorRequests, TableSchema};

use crate::command::EntityDescriptor;
use crate::entity::EntityKind;

/// The database every reconciliation pass targets.
pub const DATABASE: &str = "hardware_vtep";

/// Descriptors for every entity kind the reconciler manages, in rank
/// order: the root first, then switches, then the entities that hang
/// off them.
pub fn hardware_vtep_descriptors() -> Vec<EntityDescriptor> {
    vec![
        EntityDescriptor::new(
            EntityKind::Global,
            TableSchema::new(
                "Global",
                [
                    ("switches", ColumnType::Set(AtomicType::Uuid)),
                    ("managers", ColumnType::Set(AtomicType::Uuid)),
                ],
            ),
            0,
        ),
        EntityDescriptor::new(
            EntityKind::PhysicalSwitch,
            TableSchema::new(
                "Physical_Switch",
                [
                    ("name", ColumnType::Atom(AtomicType::String)),
                    ("description", ColumnType::Atom(AtomicType::String)),
                    ("ports", ColumnType::Set(AtomicType::Uuid)),
                    ("tunnel_ips", ColumnType::Set(AtomicType::String)),
                    ("management_ips", ColumnType::Set(AtomicType::String)),
                ],
            ),
            1,
        )
        .with_parent(EntityKind::Global, "switches"),
        EntityDescriptor::new(
            EntityKind::LogicalSwitch,
            TableSchema::new(
                "Logical_Switch",
                [
                    ("name", ColumnType::Atom(AtomicType::String)),
                    ("description", ColumnType::Atom(AtomicType::String)),
                    ("tunnel_key", ColumnType::Set(AtomicType::Integer)),
                ],
            ),
            1,
        ),
        EntityDescriptor::new(
            EntityKind::LogicalRouter,
            TableSchema::new(
                "Logical_Router",
                [
                    ("name", ColumnType::Atom(AtomicType::String)),
                    ("description", ColumnType::Atom(AtomicType::String)),
                    ("switch_binding", ColumnType::Map(AtomicType::String, AtomicType::Uuid)),
                    ("static_routes", ColumnType::Map(AtomicType::String, AtomicType::String)),
                ],
            ),
            1,
        ),
        EntityDescriptor::new(
            EntityKind::PhysicalPort,
            TableSchema::new(
                "Physical_Port",
                [
                    ("name", ColumnType::Atom(AtomicType::String)),
                    ("description", ColumnType::Atom(AtomicType::String)),
                    ("vlan_bindings", ColumnType::Map(AtomicType::Integer, AtomicType::Uuid)),
                ],
            ),
            2,
        )
        .with_parent(EntityKind::PhysicalSwitch, "ports"),
    ]
}

/// One monitor request per managed table, selecting every column the
/// descriptor declares plus row lifecycle events.
pub fn monitor_requests(descriptors: &[EntityDescriptor]) -> MonitorRequests {
    descriptors
        .iter()
        .map(|descriptor| {
            let columns: Vec<String> = descriptor.table.columns.keys().cloned().collect();
            (descriptor.table.name.clone(), MonitorRequest::columns(columns))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ranks_respect_ownership_edges() {
        let descriptors = hardware_vtep_descriptors();
        for descriptor in &descriptors {
            let Some(link) = descriptor.parent else { continue };
            let parent = descriptors
                .iter()
                .find(|d| d.kind == link.kind)
                .expect("parent descriptor present");
            assert!(parent.rank < descriptor.rank, "{:?}", descriptor.kind);
            assert!(
                parent.table.has_column(link.column),
                "{:?} missing {}",
                link.kind,
                link.column
            );
        }
    }

    #[test]
    fn monitor_requests_cover_every_table() {
        let descriptors = hardware_vtep_descriptors();
        let requests = monitor_requests(&descriptors);
        assert_eq!(requests.len(), descriptors.len());
        let ports = &requests["Physical_Port"];
        assert!(ports.columns.contains(&"vlan_bindings".to_string()));
    }
}
