//! OVSDB client API.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::info;

use ovsdb_proto::{
    decode_results, methods, DatabaseSchema, MonitorRequests, Operation, OperationResult,
    ProtoError, TableUpdates,
};

use crate::connection::{Connection, ConnectionState};
use crate::error::{ClientError, Result};

/// Submits an ordered operation list as one atomic transaction.
///
/// The seam between the transaction builder and whatever carries the
/// transaction to the device; tests substitute an in-memory transactor.
#[async_trait]
pub trait Transact: Send + Sync {
    async fn transact(&self, database: &str, operations: Vec<Operation>)
        -> Result<Vec<OperationResult>>;
}

/// An active monitor subscription.
///
/// `initial` holds the rows streamed in the monitor reply (when the
/// subscription selected them); `updates` yields subsequent
/// notifications in arrival order until cancellation or connection
/// loss ends the stream.
#[derive(Debug)]
pub struct MonitorHandle {
    pub id: String,
    pub initial: TableUpdates,
    pub updates: mpsc::Receiver<TableUpdates>,
}

/// Client for one managed OVSDB device.
///
/// Cloneable; all clones share the single underlying connection.
#[derive(Clone, Debug)]
pub struct OvsdbClient {
    conn: Connection,
}

impl OvsdbClient {
    /// Connects to a device over TCP.
    pub async fn connect(addr: &str) -> Result<Self> {
        info!("connecting to {addr}");
        Ok(Self {
            conn: Connection::connect(addr).await?,
        })
    }

    /// Wraps an already-established transport (tests use an in-memory
    /// duplex stream here).
    pub fn with_transport<S>(transport: S) -> Self
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            conn: Connection::start(transport),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    /// Lists the databases the device serves.
    pub async fn list_databases(&self) -> Result<Vec<String>> {
        let result = self.conn.call(methods::LIST_DBS, json!([])).await?;
        serde_json::from_value(result)
            .map_err(|e| ProtoError::from(e).into())
    }

    /// Fetches and decodes a database schema.
    pub async fn get_schema(&self, database: &str) -> Result<DatabaseSchema> {
        let result = self.conn.call(methods::GET_SCHEMA, json!([database])).await?;
        Ok(DatabaseSchema::from_json(&result)?)
    }

    /// Starts a monitor subscription.
    ///
    /// The subscription's queue is registered before the request goes
    /// out, so the first notification cannot be lost.
    pub async fn monitor(
        &self,
        database: &str,
        id: &str,
        requests: &MonitorRequests,
    ) -> Result<MonitorHandle> {
        let updates = self.conn.register_monitor(id)?;
        let params = json!([database, id, requests]);
        let reply = match self.conn.call(methods::MONITOR, params).await {
            Ok(reply) => reply,
            Err(e) => {
                self.conn.unregister_monitor(id);
                return Err(e);
            }
        };
        let initial = serde_json::from_value(reply)
            .map_err(|e| ClientError::Proto(ProtoError::from(e)))?;
        Ok(MonitorHandle {
            id: id.to_string(),
            initial,
            updates,
        })
    }

    /// Cancels a monitor subscription and ends its update stream.
    pub async fn cancel_monitor(&self, id: &str) -> Result<()> {
        let outcome = self.conn.call(methods::MONITOR_CANCEL, json!([id])).await;
        self.conn.unregister_monitor(id);
        outcome.map(|_| ())
    }

    async fn transact_raw(
        &self,
        database: &str,
        operations: Vec<Operation>,
    ) -> Result<Vec<OperationResult>> {
        let mut params = vec![Value::from(database)];
        for op in &operations {
            params.push(serde_json::to_value(op).map_err(ProtoError::from)?);
        }
        let result = self.conn.call(methods::TRANSACT, Value::Array(params)).await?;
        Ok(decode_results(&result)?)
    }
}

#[async_trait]
impl Transact for OvsdbClient {
    async fn transact(
        &self,
        database: &str,
        operations: Vec<Operation>,
    ) -> Result<Vec<OperationResult>> {
        self.transact_raw(database, operations).await
    }
}
