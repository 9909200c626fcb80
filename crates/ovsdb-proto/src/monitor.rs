//! Monitor subscription shapes.
//!
//! A monitor request names the tables and columns of interest plus the
//! kinds of changes to stream; the device pushes `update` notifications
//! whose payload maps table → row uuid → old/new row pair.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtoError;
use crate::notation::{Row, Uuid};

/// Which change kinds a subscription streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSelect {
    pub initial: bool,
    pub insert: bool,
    pub delete: bool,
    pub modify: bool,
}

impl Default for MonitorSelect {
    fn default() -> Self {
        Self {
            initial: true,
            insert: true,
            delete: true,
            modify: true,
        }
    }
}

/// Per-table subscription: columns of interest plus change selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorRequest {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub select: MonitorSelect,
}

impl MonitorRequest {
    /// Subscribes to all change kinds on the named columns.
    pub fn columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            select: MonitorSelect::default(),
        }
    }
}

/// Table name → subscription, the `monitor` request payload.
pub type MonitorRequests = BTreeMap<String, MonitorRequest>;

/// Old/new row pair for one changed row.
///
/// Insert carries `new` only, delete `old` only, modify both (with
/// `old` restricted to the columns that changed).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<Row>,
}

impl RowUpdate {
    pub fn is_insert(&self) -> bool {
        self.old.is_none() && self.new.is_some()
    }

    pub fn is_delete(&self) -> bool {
        self.old.is_some() && self.new.is_none()
    }

    pub fn is_modify(&self) -> bool {
        self.old.is_some() && self.new.is_some()
    }
}

/// Row uuid → change, for one table.
pub type TableUpdate = BTreeMap<Uuid, RowUpdate>;

/// Table name → changed rows: the payload of one `update` notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableUpdates(pub BTreeMap<String, TableUpdate>);

impl TableUpdates {
    /// Decodes the params of an `update` notification:
    /// `[monitor-id, {table: {uuid: {old, new}}}]`.
    ///
    /// Returns the subscription tag alongside the decoded updates.
    pub fn from_notification(params: &Value) -> Result<(Value, Self), ProtoError> {
        let arr = params
            .as_array()
            .filter(|a| a.len() == 2)
            .ok_or_else(|| ProtoError::Frame(format!("update params are not a pair: {params}")))?;
        let updates = serde_json::from_value(arr[1].clone())
            .map_err(|e| ProtoError::Frame(format!("bad table updates: {e}")))?;
        Ok((arr[0].clone(), updates))
    }

    /// Iterates (table, row uuid, update) in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Uuid, &RowUpdate)> {
        self.0.iter().flat_map(|(table, rows)| {
            rows.iter().map(move |(uuid, update)| (table.as_str(), *uuid, update))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }
}
