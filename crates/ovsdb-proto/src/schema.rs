//! Explicit schema description values.
//!
//! Column typing is resolved once at startup into plain values (table
//! name plus a column name → type map) instead of reflective per-call
//! binding. Descriptors in the reconciler reference these values for
//! encode/decode.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::ProtoError;

/// Base type of one atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomicType {
    Integer,
    Real,
    Boolean,
    String,
    Uuid,
}

impl AtomicType {
    fn from_keyword(s: &str) -> Result<Self, ProtoError> {
        match s {
            "integer" => Ok(AtomicType::Integer),
            "real" => Ok(AtomicType::Real),
            "boolean" => Ok(AtomicType::Boolean),
            "string" => Ok(AtomicType::String),
            "uuid" => Ok(AtomicType::Uuid),
            other => Err(ProtoError::Schema(format!("unknown atomic type {other:?}"))),
        }
    }
}

/// Type of one column: an atom, a set of atoms, or a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Atom(AtomicType),
    Set(AtomicType),
    Map(AtomicType, AtomicType),
}

impl ColumnType {
    /// Decodes the `type` member of a column schema. A bare keyword is
    /// an atom; an object with min/max bounds other than exactly one is
    /// a set; a value member makes it a map.
    fn from_value(value: &Value) -> Result<Self, ProtoError> {
        if let Some(s) = value.as_str() {
            return Ok(ColumnType::Atom(AtomicType::from_keyword(s)?));
        }
        let obj = value
            .as_object()
            .ok_or_else(|| ProtoError::Schema(format!("bad column type: {value}")))?;

        let key = obj
            .get("key")
            .ok_or_else(|| ProtoError::Schema("column type without key".into()))?;
        let key_type = match key.as_str() {
            Some(s) => AtomicType::from_keyword(s)?,
            None => {
                let key_obj = key
                    .as_object()
                    .and_then(|o| o.get("type"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| ProtoError::Schema(format!("bad key type: {key}")))?;
                AtomicType::from_keyword(key_obj)?
            }
        };

        if let Some(value_member) = obj.get("value") {
            let value_type = match value_member.as_str() {
                Some(s) => AtomicType::from_keyword(s)?,
                None => {
                    let s = value_member
                        .as_object()
                        .and_then(|o| o.get("type"))
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            ProtoError::Schema(format!("bad value type: {value_member}"))
                        })?;
                    AtomicType::from_keyword(s)?
                }
            };
            return Ok(ColumnType::Map(key_type, value_type));
        }

        let min = obj.get("min").and_then(Value::as_u64).unwrap_or(1);
        let max_is_one = match obj.get("max") {
            None => true,
            Some(v) => v.as_u64() == Some(1),
        };
        if min == 1 && max_is_one {
            Ok(ColumnType::Atom(key_type))
        } else {
            Ok(ColumnType::Set(key_type))
        }
    }
}

/// One table: its name and column name → type map.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub columns: BTreeMap<String, ColumnType>,
}

impl TableSchema {
    /// Builds a table schema from column/type pairs.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnType)>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(|(c, t)| (c.into(), t)).collect(),
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn column(&self, column: &str) -> Option<ColumnType> {
        self.columns.get(column).copied()
    }
}

/// A full database schema as reported by `get_schema`.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseSchema {
    pub name: String,
    pub version: String,
    pub tables: BTreeMap<String, TableSchema>,
}

impl DatabaseSchema {
    /// Decodes a `get_schema` reply payload.
    pub fn from_json(value: &Value) -> Result<Self, ProtoError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ProtoError::Schema(format!("schema is not an object: {value}")))?;
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtoError::Schema("schema without a name".into()))?
            .to_string();
        let version = obj
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut tables = BTreeMap::new();
        let table_objs = obj
            .get("tables")
            .and_then(Value::as_object)
            .ok_or_else(|| ProtoError::Schema("schema without tables".into()))?;
        for (table_name, table_value) in table_objs {
            let mut columns = BTreeMap::new();
            let column_objs = table_value
                .get("columns")
                .and_then(Value::as_object)
                .ok_or_else(|| {
                    ProtoError::Schema(format!("table {table_name} without columns"))
                })?;
            for (column_name, column_value) in column_objs {
                let type_value = column_value.get("type").ok_or_else(|| {
                    ProtoError::Schema(format!("column {table_name}.{column_name} without type"))
                })?;
                columns.insert(column_name.clone(), ColumnType::from_value(type_value)?);
            }
            tables.insert(
                table_name.clone(),
                TableSchema {
                    name: table_name.clone(),
                    columns,
                },
            );
        }

        Ok(Self {
            name,
            version,
            tables,
        })
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }
}
