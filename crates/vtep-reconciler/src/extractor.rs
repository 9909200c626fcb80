//! Change extraction.
//!
//! Classifies entities of one kind into disjoint added/updated/removed
//! sequences by comparing before and after snapshots. Name equality is
//! the sole matching key; two instances with the same name but
//! different attributes are never both retained. Extraction never
//! fails: absent or empty inputs yield empty results.
//!
//! The three routines are intentionally separate rather than one
//! symmetric pass; only the removed path treats a missing after
//! snapshot as transitive whole-subtree removal, and only the added
//! path treats a missing before snapshot as all-new.

use std::collections::HashSet;

use crate::entity::{Entity, EntityKind, NodeId, NodeModification};

/// Entities of one kind removed by the given changes.
///
/// A node whose after snapshot is absent contributes every entity of
/// the kind its before snapshot owned, whether or not any per-entity
/// removal was enumerated. Otherwise an entity is removed when its
/// name has no counterpart in the after snapshot.
pub fn extract_removed(
    changes: &[NodeModification],
    kind: EntityKind,
) -> Vec<(NodeId, Entity)> {
    let mut removed = Vec::new();
    for change in changes {
        let Some(before) = &change.before else {
            continue;
        };
        match &change.after {
            None => {
                // Whole-subtree removal: containment implies removal.
                removed.extend(
                    before
                        .of_kind(kind)
                        .map(|e| (change.node.clone(), e.clone())),
                );
            }
            Some(after) => {
                let surviving: HashSet<&str> =
                    after.of_kind(kind).map(|e| e.name.as_str()).collect();
                removed.extend(
                    before
                        .of_kind(kind)
                        .filter(|e| !surviving.contains(e.name.as_str()))
                        .map(|e| (change.node.clone(), e.clone())),
                );
            }
        }
    }
    removed
}

/// Entities of one kind added by the given changes: present in after
/// with no same-named counterpart in before.
pub fn extract_added(changes: &[NodeModification], kind: EntityKind) -> Vec<(NodeId, Entity)> {
    let mut added = Vec::new();
    for change in changes {
        let Some(after) = &change.after else {
            continue;
        };
        let existing: HashSet<&str> = change
            .before
            .iter()
            .flat_map(|b| b.of_kind(kind))
            .map(|e| e.name.as_str())
            .collect();
        added.extend(
            after
                .of_kind(kind)
                .filter(|e| !existing.contains(e.name.as_str()))
                .map(|e| (change.node.clone(), e.clone())),
        );
    }
    added
}

/// Entities of one kind present in both snapshots under the same name
/// but with a different attribute set; the after instance is returned.
pub fn extract_updated(changes: &[NodeModification], kind: EntityKind) -> Vec<(NodeId, Entity)> {
    let mut updated = Vec::new();
    for change in changes {
        let (Some(before), Some(after)) = (&change.before, &change.after) else {
            continue;
        };
        for entity in after.of_kind(kind) {
            if let Some(previous) = before.find(kind, &entity.name) {
                if previous.columns != entity.columns || previous.parent != entity.parent {
                    updated.push((change.node.clone(), entity.clone()));
                }
            }
        }
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::NodeSnapshot;
    use ovsdb_proto::row;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn port(name: &str, switch: &str) -> Entity {
        Entity::new(EntityKind::PhysicalPort, name).with_parent(switch)
    }

    fn switch(name: &str) -> Entity {
        Entity::new(EntityKind::PhysicalSwitch, name)
    }

    fn names(extracted: &[(NodeId, Entity)]) -> Vec<&str> {
        extracted.iter().map(|(_, e)| e.name.as_str()).collect()
    }

    #[test]
    fn shrinking_port_set_yields_removed() {
        // before = S1 with [P1, P2], after = S1 with [P1] → removed = {P2}
        let before = NodeSnapshot::new(vec![switch("S1"), port("P1", "S1"), port("P2", "S1")]);
        let after = NodeSnapshot::new(vec![switch("S1"), port("P1", "S1")]);
        let changes = vec![NodeModification::new("node0", Some(before), Some(after))];

        let removed = extract_removed(&changes, EntityKind::PhysicalPort);
        assert_eq!(names(&removed), vec!["P2"]);
        assert!(extract_removed(&changes, EntityKind::PhysicalSwitch).is_empty());
        assert!(extract_added(&changes, EntityKind::PhysicalPort).is_empty());
    }

    #[test]
    fn node_removal_is_transitive() {
        // The node disappears entirely; P1 is removed even though no
        // per-port removal was enumerated.
        let before = NodeSnapshot::new(vec![switch("S1"), port("P1", "S1")]);
        let changes = vec![NodeModification::new("node0", Some(before), None)];

        assert_eq!(names(&extract_removed(&changes, EntityKind::PhysicalPort)), vec!["P1"]);
        assert_eq!(
            names(&extract_removed(&changes, EntityKind::PhysicalSwitch)),
            vec!["S1"]
        );
    }

    #[test]
    fn fresh_node_is_all_added() {
        let after = NodeSnapshot::new(vec![switch("S1"), port("P1", "S1")]);
        let changes = vec![NodeModification::new("node0", None, Some(after))];

        assert_eq!(names(&extract_added(&changes, EntityKind::PhysicalPort)), vec!["P1"]);
        assert!(extract_removed(&changes, EntityKind::PhysicalPort).is_empty());
        assert!(extract_updated(&changes, EntityKind::PhysicalPort).is_empty());
    }

    #[test]
    fn same_name_different_columns_is_updated_not_both() {
        let before = NodeSnapshot::new(vec![
            port("P1", "S1").with_columns(row([("description", "old".into())])),
        ]);
        let after = NodeSnapshot::new(vec![
            port("P1", "S1").with_columns(row([("description", "new".into())])),
        ]);
        let changes = vec![NodeModification::new("node0", Some(before), Some(after))];

        let updated = extract_updated(&changes, EntityKind::PhysicalPort);
        assert_eq!(names(&updated), vec!["P1"]);
        assert_eq!(updated[0].1.columns["description"], ovsdb_proto::Datum::from("new"));
        assert!(extract_removed(&changes, EntityKind::PhysicalPort).is_empty());
        assert!(extract_added(&changes, EntityKind::PhysicalPort).is_empty());
    }

    #[test]
    fn added_updated_removed_are_disjoint() {
        let before = NodeSnapshot::new(vec![
            port("P1", "S1"),
            port("P2", "S1").with_columns(row([("description", "old".into())])),
        ]);
        let after = NodeSnapshot::new(vec![
            port("P2", "S1").with_columns(row([("description", "new".into())])),
            port("P3", "S1"),
        ]);
        let changes = vec![NodeModification::new("node0", Some(before), Some(after))];

        let added_entities = extract_added(&changes, EntityKind::PhysicalPort);
        let added: HashSet<_> = names(&added_entities).into_iter().collect();
        let updated_entities = extract_updated(&changes, EntityKind::PhysicalPort);
        let updated: HashSet<_> = names(&updated_entities).into_iter().collect();
        let removed_entities = extract_removed(&changes, EntityKind::PhysicalPort);
        let removed: HashSet<_> = names(&removed_entities).into_iter().collect();

        assert_eq!(added, HashSet::from(["P3"]));
        assert_eq!(updated, HashSet::from(["P2"]));
        assert_eq!(removed, HashSet::from(["P1"]));
        assert!(added.is_disjoint(&removed));
        assert!(updated.is_disjoint(&removed));
    }

    #[test]
    fn empty_inputs_yield_empty_results() {
        assert!(extract_removed(&[], EntityKind::PhysicalPort).is_empty());
        let changes = vec![NodeModification::new("node0", None, None)];
        assert!(extract_removed(&changes, EntityKind::PhysicalPort).is_empty());
        assert!(extract_added(&changes, EntityKind::PhysicalPort).is_empty());
        assert!(extract_updated(&changes, EntityKind::PhysicalPort).is_empty());
    }

    #[test]
    fn unchanged_snapshots_produce_no_deltas() {
        let snapshot = NodeSnapshot::new(vec![switch("S1"), port("P1", "S1")]);
        let changes = vec![NodeModification::new(
            "node0",
            Some(snapshot.clone()),
            Some(snapshot),
        )];

        for kind in [EntityKind::PhysicalSwitch, EntityKind::PhysicalPort] {
            assert!(extract_removed(&changes, kind).is_empty());
            assert!(extract_added(&changes, kind).is_empty());
            assert!(extract_updated(&changes, kind).is_empty());
        }
    }
}
