//! Error types for the protocol client.

use thiserror::Error;

/// Errors surfaced by the protocol client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connection dropped with requests still in flight. Pending
    /// transaction futures all fail with this; monitor subscriptions
    /// are stale and must be re-established after reconnection.
    #[error("connection lost")]
    ConnectionLost,

    /// A request was issued against a client that never connected or
    /// has already shut down.
    #[error("not connected")]
    NotConnected,

    /// Transport-level I/O failure while connecting.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A well-formed reply that cannot be decoded into the expected
    /// shape.
    #[error(transparent)]
    Proto(#[from] ovsdb_proto::ProtoError),

    /// The device answered a request with a JSON-RPC error member.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The device rejected one operation; the whole transaction's
    /// effects are void.
    #[error("transaction rejected at operation {index}: {message}")]
    TransactionRejected { index: usize, message: String },

    /// The result array does not line up with the submitted operation
    /// list and carries no error element to explain why.
    #[error("result count mismatch: sent {sent} operations, got {got} results")]
    ResultMismatch { sent: usize, got: usize },

    /// A monitor subscription with the same identifier already exists
    /// on this connection.
    #[error("duplicate monitor id {0:?}")]
    DuplicateMonitor(String),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
