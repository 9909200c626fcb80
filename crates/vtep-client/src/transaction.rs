//! Transaction builder.
//!
//! An append-only ordered operation list plus the metadata needed to
//! submit it as one atomic unit. Either every side-effecting operation
//! applies or the device reports an error for the failing one and the
//! transaction's effects are fully reverted; callers must never assume
//! partial application.

use ovsdb_proto::{Condition, Datum, Mutation, Operation, OperationResult, Row};

use crate::client::Transact;
use crate::error::{ClientError, Result};

/// Ordered, append-only transaction under construction.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    database: String,
    operations: Vec<Operation>,
}

impl TransactionBuilder {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            operations: Vec::new(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Appends one operation; operations execute in append order.
    pub fn add(&mut self, operation: Operation) -> &mut Self {
        self.operations.push(operation);
        self
    }

    /// Appends an insert carrying a transaction-scoped temporary name
    /// that later operations in the same transaction may reference.
    pub fn insert(
        &mut self,
        table: impl Into<String>,
        row: Row,
        uuid_name: Option<String>,
    ) -> &mut Self {
        self.add(Operation::Insert {
            table: table.into(),
            row,
            uuid_name,
        })
    }

    pub fn update(
        &mut self,
        table: impl Into<String>,
        clauses: Vec<Condition>,
        row: Row,
    ) -> &mut Self {
        self.add(Operation::Update {
            table: table.into(),
            clauses,
            row,
        })
    }

    pub fn mutate(
        &mut self,
        table: impl Into<String>,
        clauses: Vec<Condition>,
        mutations: Vec<Mutation>,
    ) -> &mut Self {
        self.add(Operation::Mutate {
            table: table.into(),
            clauses,
            mutations,
        })
    }

    pub fn delete(&mut self, table: impl Into<String>, clauses: Vec<Condition>) -> &mut Self {
        self.add(Operation::Delete {
            table: table.into(),
            clauses,
        })
    }

    pub fn select(
        &mut self,
        table: impl Into<String>,
        clauses: Vec<Condition>,
        columns: Vec<String>,
    ) -> &mut Self {
        self.add(Operation::Select {
            table: table.into(),
            clauses,
            columns,
        })
    }

    /// Appends an informational comment; comments always succeed.
    pub fn comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.add(Operation::Comment {
            comment: comment.into(),
        })
    }

    pub fn assert_lock(&mut self, lock: impl Into<String>) -> &mut Self {
        self.add(Operation::Assert { lock: lock.into() })
    }

    pub fn commit(&mut self, durable: bool) -> &mut Self {
        self.add(Operation::Commit { durable })
    }

    pub fn abort(&mut self) -> &mut Self {
        self.add(Operation::Abort)
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// References a row inserted earlier in this transaction by its
    /// temporary name, as a singleton-set mutation operand.
    pub fn named_ref(name: &str) -> Datum {
        Datum::named_singleton(name)
    }

    /// Submits the operation list as one transaction.
    ///
    /// Returns one result per operation, preserving input order. A
    /// device-reported error on any operation maps to
    /// [`ClientError::TransactionRejected`] carrying the failing
    /// operation's index and message.
    pub async fn execute(self, transactor: &dyn Transact) -> Result<Vec<OperationResult>> {
        if self.operations.is_empty() {
            return Ok(Vec::new());
        }

        let sent = self.operations.len();
        let results = transactor.transact(&self.database, self.operations).await?;

        if let Some((index, failed)) = results.iter().enumerate().find(|(_, r)| r.is_error()) {
            return Err(ClientError::TransactionRejected {
                index,
                message: failed.error_message().unwrap_or_default(),
            });
        }
        if results.len() != sent {
            return Err(ClientError::ResultMismatch {
                sent,
                got: results.len(),
            });
        }
        Ok(results)
    }
}
