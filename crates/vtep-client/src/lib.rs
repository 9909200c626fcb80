//! OVSDB protocol client.
//!
//! Owns the RPC connection to one managed device:
//!
//! - [`OvsdbClient`]: transact / monitor / schema RPCs over one
//!   connection, with request/response correlation handled by the
//!   connection's read loop
//! - [`TransactionBuilder`]: ordered, append-only operation list
//!   submitted as one atomic unit
//! - [`Transact`]: the seam between builder and transport, so the
//!   reconciler and its tests never need a live device
//!
//! Transaction submissions on a connection are serialized on the wire;
//! multiple transactions may be pending concurrently and complete in
//! reply order. Monitor notifications are queued per subscription and
//! never reordered. The client performs no retries and applies no
//! timeouts; both are caller policy.

mod client;
mod connection;
mod error;
mod transaction;

pub use client::{MonitorHandle, OvsdbClient, Transact};
pub use connection::ConnectionState;
pub use error::{ClientError, Result};
pub use transaction::TransactionBuilder;
