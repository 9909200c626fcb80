//! Daemon configuration and the desired-state file.
//!
//! Both files are YAML. The daemon config covers the device endpoint
//! and runtime knobs; the desired-state file declares the entities the
//! device should converge to.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use ovsdb_proto::{Datum, Row};
use vtep_reconciler::{Entity, EntityKind, NodeModification, NodeSnapshot, DATABASE};

use crate::error::DaemonError;

fn default_endpoint() -> String {
    "127.0.0.1:6640".to_string()
}

fn default_database() -> String {
    DATABASE.to_string()
}

fn default_node() -> String {
    "vtep0".to_string()
}

fn default_queue_depth() -> usize {
    vtep_reconciler::INVENTORY_QUEUE_DEPTH
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Device endpoint, host:port.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_database")]
    pub database: String,

    /// Identity of the managed node within the reconciler.
    #[serde(default = "default_node")]
    pub node: String,

    /// Path to the desired-state file, when one should be applied at
    /// startup.
    #[serde(default)]
    pub desired_state: Option<String>,

    #[serde(default = "default_queue_depth")]
    pub inventory_queue_depth: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            database: default_database(),
            node: default_node(),
            desired_state: None,
            inventory_queue_depth: default_queue_depth(),
        }
    }
}

impl DaemonConfig {
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}

/// Desired device configuration, one entry per managed node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesiredState {
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: String,
    #[serde(default)]
    pub physical_switches: Vec<SwitchConfig>,
    #[serde(default)]
    pub logical_switches: Vec<LogicalSwitchConfig>,
    #[serde(default)]
    pub logical_routers: Vec<RouterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tunnel_ips: Vec<String>,
    #[serde(default)]
    pub management_ips: Vec<String>,
    #[serde(default)]
    pub ports: Vec<PortConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicalSwitchConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tunnel_key: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl DesiredState {
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Turns the file into change-source input: one modification per
    /// node, with the given previous snapshot as the before side. A
    /// first application passes `None` as before.
    pub fn into_modifications(
        self,
        before: Option<&DesiredState>,
    ) -> Vec<NodeModification> {
        self.nodes
            .into_iter()
            .map(|node| {
                let prior = before
                    .and_then(|b| b.nodes.iter().find(|n| n.id == node.id))
                    .map(|n| NodeSnapshot::new(n.clone().into_entities()));
                let id = node.id.clone();
                NodeModification::new(id, prior, Some(NodeSnapshot::new(node.into_entities())))
            })
            .collect()
    }
}

impl NodeConfig {
    fn into_entities(self) -> Vec<Entity> {
        let mut entities = Vec::new();
        for switch in self.physical_switches {
            let mut columns = Row::new();
            if let Some(description) = &switch.description {
                columns.insert("description".into(), Datum::String(description.clone()));
            }
            if !switch.tunnel_ips.is_empty() {
                columns.insert(
                    "tunnel_ips".into(),
                    Datum::Set(switch.tunnel_ips.iter().cloned().map(Datum::String).collect()),
                );
            }
            if !switch.management_ips.is_empty() {
                columns.insert(
                    "management_ips".into(),
                    Datum::Set(
                        switch
                            .management_ips
                            .iter()
                            .cloned()
                            .map(Datum::String)
                            .collect(),
                    ),
                );
            }
            entities.push(
                Entity::new(EntityKind::PhysicalSwitch, switch.name.clone())
                    .with_columns(columns),
            );
            for port in switch.ports {
                let mut columns = Row::new();
                if let Some(description) = port.description {
                    columns.insert("description".into(), Datum::String(description));
                }
                entities.push(
                    Entity::new(EntityKind::PhysicalPort, port.name)
                        .with_parent(switch.name.clone())
                        .with_columns(columns),
                );
            }
        }
        for ls in self.logical_switches {
            let mut columns = Row::new();
            if let Some(description) = ls.description {
                columns.insert("description".into(), Datum::String(description));
            }
            if let Some(key) = ls.tunnel_key {
                // Optional integer columns travel as singleton sets.
                columns.insert("tunnel_key".into(), Datum::Set(vec![Datum::Integer(key)]));
            }
            entities.push(Entity::new(EntityKind::LogicalSwitch, ls.name).with_columns(columns));
        }
        for router in self.logical_routers {
            let mut columns = Row::new();
            if let Some(description) = router.description {
                columns.insert("description".into(), Datum::String(description));
            }
            entities.push(Entity::new(EntityKind::LogicalRouter, router.name).with_columns(columns));
        }
        entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn daemon_config_defaults_apply() {
        let config: DaemonConfig = serde_yaml::from_str("endpoint: 10.0.0.5:6640\n").unwrap();
        assert_eq!(config.endpoint, "10.0.0.5:6640");
        assert_eq!(config.database, "hardware_vtep");
        assert_eq!(config.node, "vtep0");
        assert_eq!(config.desired_state, None);
    }

    #[test]
    fn desired_state_becomes_modifications() {
        let desired: DesiredState = serde_yaml::from_str(
            r#"
nodes:
  - id: node0
    physical_switches:
      - name: S1
        description: leaf switch
        tunnel_ips: ["192.0.2.1"]
        ports:
          - name: P1
    logical_switches:
      - name: ls0
        tunnel_key: 5000
"#,
        )
        .unwrap();

        let changes = desired.into_modifications(None);
        assert_eq!(changes.len(), 1);
        assert!(changes[0].before.is_none());
        let after = changes[0].after.as_ref().unwrap();

        let switch = after.find(EntityKind::PhysicalSwitch, "S1").unwrap();
        assert_eq!(switch.columns["description"], Datum::from("leaf switch"));
        let port = after.find(EntityKind::PhysicalPort, "P1").unwrap();
        assert_eq!(port.parent_name(), "S1");
        let ls = after.find(EntityKind::LogicalSwitch, "ls0").unwrap();
        assert_eq!(
            ls.columns["tunnel_key"],
            Datum::Set(vec![Datum::Integer(5000)])
        );
    }

    #[test]
    fn reapplication_carries_the_previous_snapshot() {
        let v1: DesiredState = serde_yaml::from_str(
            "nodes:\n  - id: node0\n    logical_switches:\n      - name: ls0\n",
        )
        .unwrap();
        let v2: DesiredState = serde_yaml::from_str(
            "nodes:\n  - id: node0\n    logical_switches:\n      - name: ls1\n",
        )
        .unwrap();

        let changes = v2.into_modifications(Some(&v1));
        let before = changes[0].before.as_ref().unwrap();
        assert!(before.find(EntityKind::LogicalSwitch, "ls0").is_some());
        let after = changes[0].after.as_ref().unwrap();
        assert!(after.find(EntityKind::LogicalSwitch, "ls1").is_some());
    }
}
