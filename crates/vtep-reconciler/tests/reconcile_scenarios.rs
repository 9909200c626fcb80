//! End-to-end reconciliation passes against a scripted device.

use std::sync::Mutex;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use ovsdb_proto::{row, Condition, Datum, Mutation, Operation, OperationResult, Uuid};
use vtep_client::{ClientError, Transact};
use vtep_reconciler::{
    hardware_vtep_descriptors, operational_cache, CacheWriter, CachedEntity, Entity, EntityKind,
    NodeId, NodeModification, NodeSnapshot, Reconciler, DATABASE,
};

/// Accepts every transaction, assigning a fresh identifier to each
/// insert, and keeps what it was sent for inspection.
#[derive(Default)]
struct AcceptingDevice {
    transactions: Mutex<Vec<Vec<Operation>>>,
}

impl AcceptingDevice {
    fn sent(&self) -> Vec<Vec<Operation>> {
        self.transactions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transact for AcceptingDevice {
    async fn transact(
        &self,
        _database: &str,
        operations: Vec<Operation>,
    ) -> Result<Vec<OperationResult>, ClientError> {
        let results = operations
            .iter()
            .map(|op| match op {
                Operation::Insert { .. } => OperationResult {
                    uuid: Some(Uuid::generate()),
                    ..OperationResult::default()
                },
                _ => OperationResult::default(),
            })
            .collect();
        self.transactions.lock().unwrap().push(operations);
        Ok(results)
    }
}

/// Rejects every transaction at the given operation index.
struct RejectingDevice {
    index: usize,
}

#[async_trait]
impl Transact for RejectingDevice {
    async fn transact(
        &self,
        _database: &str,
        operations: Vec<Operation>,
    ) -> Result<Vec<OperationResult>, ClientError> {
        let mut results: Vec<OperationResult> =
            operations.iter().map(|_| OperationResult::default()).collect();
        results[self.index].error = Some("constraint violation".into());
        Ok(results)
    }
}

fn seed_switch_and_port(writer: &CacheWriter, node: &NodeId) -> (Uuid, Uuid) {
    let switch_uuid = Uuid::generate();
    let port_uuid = Uuid::generate();
    writer.upsert(
        node,
        EntityKind::PhysicalSwitch,
        "S1",
        CachedEntity {
            uuid: switch_uuid,
            columns: row([("name", "S1".into())]),
        },
    );
    writer.upsert(
        node,
        EntityKind::PhysicalPort,
        "P2",
        CachedEntity {
            uuid: port_uuid,
            columns: row([("name", "P2".into())]),
        },
    );
    (switch_uuid, port_uuid)
}

fn port(name: &str) -> Entity {
    Entity::new(EntityKind::PhysicalPort, name).with_parent("S1")
}

fn switch_with_ports(ports: &[&str]) -> Vec<Entity> {
    let mut entities = vec![Entity::new(EntityKind::PhysicalSwitch, "S1")];
    entities.extend(ports.iter().map(|p| port(p)));
    entities
}

#[tokio::test]
async fn dropping_a_port_emits_delete_comment_and_parent_detach() {
    let (writer, cache) = operational_cache();
    let node = NodeId::from("node0");
    let (switch_uuid, port_uuid) = seed_switch_and_port(&writer, &node);

    let device = AcceptingDevice::default();
    let mut reconciler = Reconciler::new(DATABASE, hardware_vtep_descriptors());
    let changes = vec![NodeModification::new(
        "node0",
        Some(NodeSnapshot::new(switch_with_ports(&["P1", "P2"]))),
        Some(NodeSnapshot::new(switch_with_ports(&["P1"]))),
    )];

    let report = reconciler.run(&changes, &cache, &device).await.unwrap();
    assert_eq!(report.deletes, 1);

    let sent = device.sent();
    let ops = &sent[0];
    assert!(matches!(
        &ops[0],
        Operation::Delete { table, clauses }
            if table == "Physical_Port" && clauses[0] == Condition::uuid_equals(port_uuid)
    ));
    assert!(matches!(
        &ops[1],
        Operation::Comment { comment } if comment == "Physical Port: Deleting P2"
    ));
    assert!(matches!(
        &ops[2],
        Operation::Mutate { table, clauses, mutations }
            if table == "Physical_Switch"
            && clauses[0] == Condition::uuid_equals(switch_uuid)
            && mutations[0] == Mutation::delete("ports", Datum::uuid_singleton(port_uuid))
    ));
}

#[tokio::test]
async fn removal_of_unknown_entity_is_a_warning_not_an_operation() {
    let (_writer, cache) = operational_cache();
    let device = AcceptingDevice::default();
    let mut reconciler = Reconciler::new(DATABASE, hardware_vtep_descriptors());

    let changes = vec![NodeModification::new(
        "node0",
        Some(NodeSnapshot::new(vec![port("ghost")])),
        Some(NodeSnapshot::new(vec![])),
    )];
    let report = reconciler.run(&changes, &cache, &device).await.unwrap();

    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].name, "ghost");
    assert_eq!(report.queued(), 0);
    // Nothing was worth sending.
    assert!(device.sent().is_empty());
}

#[tokio::test]
async fn node_removal_deletes_the_whole_subtree_children_first() {
    let (writer, cache) = operational_cache();
    let node = NodeId::from("node0");
    seed_switch_and_port(&writer, &node);

    let device = AcceptingDevice::default();
    let mut reconciler = Reconciler::new(DATABASE, hardware_vtep_descriptors());
    let changes = vec![NodeModification::new(
        "node0",
        Some(NodeSnapshot::new(switch_with_ports(&["P2"]))),
        None,
    )];
    let report = reconciler.run(&changes, &cache, &device).await.unwrap();
    assert_eq!(report.deletes, 2);

    let sent = device.sent();
    let deletes: Vec<&str> = sent[0]
        .iter()
        .filter_map(|op| match op {
            Operation::Delete { table, .. } => Some(table.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(deletes, vec!["Physical_Port", "Physical_Switch"]);
}

#[tokio::test]
async fn creating_switch_and_port_links_them_with_temporary_names() {
    let (_writer, cache) = operational_cache();
    let device = AcceptingDevice::default();
    let mut reconciler = Reconciler::new(DATABASE, hardware_vtep_descriptors());

    let changes = vec![NodeModification::new(
        "node0",
        None,
        Some(NodeSnapshot::new(switch_with_ports(&["P1"]))),
    )];
    let report = reconciler.run(&changes, &cache, &device).await.unwrap();
    assert_eq!(report.inserts, 2);

    let sent = device.sent();
    let ops = &sent[0];
    // The switch insert comes before the port insert, and the port's
    // parent mutation references the switch's temporary name.
    let switch_temp = ops
        .iter()
        .find_map(|op| match op {
            Operation::Insert { table, uuid_name, .. } if table == "Physical_Switch" => {
                uuid_name.clone()
            }
            _ => None,
        })
        .unwrap();
    let port_attach = ops
        .iter()
        .find_map(|op| match op {
            Operation::Mutate { table, clauses, .. } if table == "Physical_Switch" => {
                Some(clauses[0].clone())
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(port_attach.2, Datum::NamedUuid(switch_temp));
}

#[tokio::test]
async fn recorded_identifier_survives_into_the_next_pass() {
    let (_writer, cache) = operational_cache();
    let device = AcceptingDevice::default();
    let mut reconciler = Reconciler::new(DATABASE, hardware_vtep_descriptors());

    let create = vec![NodeModification::new(
        "node0",
        None,
        Some(NodeSnapshot::new(vec![Entity::new(
            EntityKind::LogicalSwitch,
            "ls0",
        )])),
    )];
    reconciler.run(&create, &cache, &device).await.unwrap();

    // No monitor echo has refreshed the cache, yet the delete in the
    // next pass still resolves the identifier the device assigned.
    let remove = vec![NodeModification::new(
        "node0",
        Some(NodeSnapshot::new(vec![Entity::new(
            EntityKind::LogicalSwitch,
            "ls0",
        )])),
        Some(NodeSnapshot::new(vec![])),
    )];
    let report = reconciler.run(&remove, &cache, &device).await.unwrap();
    assert_eq!(report.deletes, 1);
    assert!(report.warnings.is_empty());

    let sent = device.sent();
    let assigned = match &sent[1][0] {
        Operation::Delete { clauses, .. } => clauses[0].2.clone(),
        other => panic!("expected delete, got {other:?}"),
    };
    assert!(matches!(assigned, Datum::Uuid(_)));
}

#[tokio::test]
async fn rejected_transaction_discards_temporary_names() {
    let (_writer, cache) = operational_cache();
    let mut reconciler = Reconciler::new(DATABASE, hardware_vtep_descriptors());

    let create = vec![NodeModification::new(
        "node0",
        None,
        Some(NodeSnapshot::new(vec![Entity::new(
            EntityKind::LogicalSwitch,
            "ls0",
        )])),
    )];
    let err = reconciler
        .run(&create, &cache, &RejectingDevice { index: 0 })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::TransactionRejected { index: 0, .. }
    ));

    // The failed insert left no identity behind; a removal of the
    // never-created entity warns instead of targeting a stale name.
    let node = NodeId::from("node0");
    assert!(reconciler
        .resolver()
        .identity(&node, EntityKind::LogicalSwitch, "ls0")
        .is_none());
}

#[tokio::test]
async fn replaying_a_converged_configuration_sends_nothing() {
    let (writer, cache) = operational_cache();
    let node = NodeId::from("node0");
    writer.upsert(
        &node,
        EntityKind::LogicalSwitch,
        "ls0",
        CachedEntity {
            uuid: Uuid::generate(),
            columns: row([("name", "ls0".into()), ("description", "tenant a".into())]),
        },
    );

    let device = AcceptingDevice::default();
    let mut reconciler = Reconciler::new(DATABASE, hardware_vtep_descriptors());
    let changes = vec![NodeModification::new(
        "node0",
        None,
        Some(NodeSnapshot::new(vec![Entity::new(
            EntityKind::LogicalSwitch,
            "ls0",
        )
        .with_columns(row([("description", "tenant a".into())]))])),
    )];

    let report = reconciler.run(&changes, &cache, &device).await.unwrap();
    assert_eq!(report.queued(), 0);
    assert!(device.sent().is_empty());
}

#[tokio::test]
async fn one_pass_never_adds_and_removes_the_same_entity() {
    let (writer, cache) = operational_cache();
    let node = NodeId::from("node0");
    seed_switch_and_port(&writer, &node);

    let device = AcceptingDevice::default();
    let mut reconciler = Reconciler::new(DATABASE, hardware_vtep_descriptors());
    // P2 survives the change untouched while P3 appears.
    let changes = vec![NodeModification::new(
        "node0",
        Some(NodeSnapshot::new(switch_with_ports(&["P2"]))),
        Some(NodeSnapshot::new(switch_with_ports(&["P2", "P3"]))),
    )];
    let report = reconciler.run(&changes, &cache, &device).await.unwrap();

    assert_eq!(report.deletes, 0);
    assert_eq!(report.inserts, 1);
    let sent = device.sent();
    for op in &sent[0] {
        assert!(!matches!(op, Operation::Delete { .. }), "{op:?}");
    }
}
