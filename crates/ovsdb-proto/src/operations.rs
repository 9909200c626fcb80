//! Transaction operations.
//!
//! One [`Operation`] is one atomic unit of a transact request. The wire
//! form is an object with an `"op"` discriminator plus kind-specific
//! members; `where` clauses and `mutations` are column/verb/value
//! triples serialized as three-element arrays.

use serde::{Deserialize, Serialize};

use crate::notation::{Datum, Row, Uuid};
use crate::UUID_COLUMN;

/// Comparison verb of a `where` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Function {
    #[serde(rename = "==")]
    Equals,
    #[serde(rename = "!=")]
    NotEquals,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEquals,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEquals,
    #[serde(rename = "includes")]
    Includes,
    #[serde(rename = "excludes")]
    Excludes,
}

/// One `[column, function, value]` predicate triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition(pub String, pub Function, pub Datum);

impl Condition {
    /// Equality predicate on a named column.
    pub fn equals(column: impl Into<String>, value: impl Into<Datum>) -> Self {
        Condition(column.into(), Function::Equals, value.into())
    }

    /// Equality predicate on the hidden `_uuid` column, the canonical
    /// way to address one acknowledged row.
    pub fn uuid_equals(uuid: Uuid) -> Self {
        Condition(UUID_COLUMN.into(), Function::Equals, Datum::Uuid(uuid))
    }
}

/// Set/column mutation verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutator {
    #[serde(rename = "+=")]
    Add,
    #[serde(rename = "-=")]
    Subtract,
    #[serde(rename = "*=")]
    Multiply,
    #[serde(rename = "/=")]
    Divide,
    #[serde(rename = "%=")]
    Remainder,
    #[serde(rename = "insert")]
    Insert,
    #[serde(rename = "delete")]
    Delete,
}

/// One `[column, mutator, value]` mutation triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation(pub String, pub Mutator, pub Datum);

impl Mutation {
    /// Inserts operand members into a set-valued column.
    pub fn insert(column: impl Into<String>, value: Datum) -> Self {
        Mutation(column.into(), Mutator::Insert, value)
    }

    /// Deletes operand members from a set-valued column.
    pub fn delete(column: impl Into<String>, value: Datum) -> Self {
        Mutation(column.into(), Mutator::Delete, value)
    }
}

/// One atomic unit of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    Insert {
        table: String,
        row: Row,
        /// Transaction-scoped temporary name other operations in the
        /// same transaction may reference as a named-uuid.
        #[serde(rename = "uuid-name", skip_serializing_if = "Option::is_none", default)]
        uuid_name: Option<String>,
    },
    Update {
        table: String,
        #[serde(rename = "where")]
        clauses: Vec<Condition>,
        row: Row,
    },
    Mutate {
        table: String,
        #[serde(rename = "where")]
        clauses: Vec<Condition>,
        mutations: Vec<Mutation>,
    },
    Delete {
        table: String,
        #[serde(rename = "where")]
        clauses: Vec<Condition>,
    },
    Select {
        table: String,
        #[serde(rename = "where")]
        clauses: Vec<Condition>,
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        columns: Vec<String>,
    },
    /// Informational only; always succeeds and lands in the device log.
    Comment { comment: String },
    /// Fails the transaction unless the client owns the named lock.
    Assert { lock: String },
    Commit { durable: bool },
    Abort,
}

impl Operation {
    /// The table this operation addresses, if any.
    pub fn table(&self) -> Option<&str> {
        match self {
            Operation::Insert { table, .. }
            | Operation::Update { table, .. }
            | Operation::Mutate { table, .. }
            | Operation::Delete { table, .. }
            | Operation::Select { table, .. } => Some(table),
            _ => None,
        }
    }

    /// True for operations that mutate remote state.
    pub fn has_side_effects(&self) -> bool {
        matches!(
            self,
            Operation::Insert { .. }
                | Operation::Update { .. }
                | Operation::Mutate { .. }
                | Operation::Delete { .. }
        )
    }
}
