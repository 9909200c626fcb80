//! Node and entity model.
//!
//! A node is one managed device vertex; its desired view is a snapshot
//! of named entities supplied by the configuration source, and its
//! operational view lives in the cache. Entities reference each other
//! by identifier sets in their columns, never by embedding.

use std::fmt;

use ovsdb_proto::Row;

/// Stable key of one device/topology vertex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The configurable entity types this reconciler drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// The per-device root row.
    Global,
    PhysicalSwitch,
    PhysicalPort,
    LogicalSwitch,
    LogicalRouter,
}

impl EntityKind {
    /// Human-readable label used in comments and warnings.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Global => "Global",
            EntityKind::PhysicalSwitch => "Physical Switch",
            EntityKind::PhysicalPort => "Physical Port",
            EntityKind::LogicalSwitch => "Logical Switch",
            EntityKind::LogicalRouter => "Logical Router",
        }
    }
}

/// One configurable object within a node.
///
/// `name` is unique within the parent context; the remote-assigned
/// identifier is absent here and lives in the operational cache once
/// the device has acknowledged the entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub kind: EntityKind,
    pub name: String,
    /// Name of the owning entity of the parent kind, when ownership is
    /// nested below the root (a port names its switch). `None` means
    /// the parent is the node's singleton root row.
    pub parent: Option<String>,
    /// Typed attributes in wire notation, excluding the name column.
    pub columns: Row,
}

impl Entity {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            parent: None,
            columns: Row::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_columns(mut self, columns: Row) -> Self {
        self.columns = columns;
        self
    }

    /// Key the parent is looked up under; the root row keys as "".
    pub fn parent_name(&self) -> &str {
        self.parent.as_deref().unwrap_or("")
    }
}

/// One view (before or after) of a node's desired configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeSnapshot {
    pub entities: Vec<Entity>,
}

impl NodeSnapshot {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }

    /// Entities of one kind, in snapshot order.
    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    /// Looks an entity up by kind and name.
    pub fn find(&self, kind: EntityKind, name: &str) -> Option<&Entity> {
        self.of_kind(kind).find(|e| e.name == name)
    }
}

/// One before/after pair from the configuration change source.
///
/// `after == None` signals whole-subtree removal: every entity the
/// before snapshot owned is implicitly removed.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeModification {
    pub node: NodeId,
    pub before: Option<NodeSnapshot>,
    pub after: Option<NodeSnapshot>,
}

impl NodeModification {
    pub fn new(
        node: impl Into<NodeId>,
        before: Option<NodeSnapshot>,
        after: Option<NodeSnapshot>,
    ) -> Self {
        Self {
            node: node.into(),
            before,
            after,
        }
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
