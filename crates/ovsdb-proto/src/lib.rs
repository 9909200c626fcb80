//! OVSDB wire notation and message shapes.
//!
//! This crate provides the data types that cross the wire between a
//! management daemon and an OVSDB-backed device:
//!
//! - [`Datum`], [`Uuid`], [`Row`]: column values in RFC 7047 notation
//! - [`Operation`], [`Condition`], [`Mutation`]: transaction operations
//! - [`OperationResult`]: positional per-operation transaction results
//! - [`Frame`], [`Request`]: JSON-RPC 1.0 framing
//! - [`MonitorRequest`], [`TableUpdates`]: monitor subscription shapes
//! - [`DatabaseSchema`], [`TableSchema`]: explicit schema description
//!   values resolved at startup (no reflection, no per-call binding)
//! - [`JsonCodec`]: stream codec for back-to-back JSON values over TCP
//!
//! Nothing in this crate talks to the network; it only encodes and decodes.

mod codec;
mod error;
mod jsonrpc;
mod monitor;
mod notation;
mod operations;
mod result;
mod schema;

pub use codec::JsonCodec;
pub use error::ProtoError;
pub use jsonrpc::{Frame, Request, methods};
pub use monitor::{MonitorRequest, MonitorRequests, MonitorSelect, RowUpdate, TableUpdate, TableUpdates};
pub use notation::{row, Datum, Row, Uuid};
pub use operations::{Condition, Function, Mutation, Mutator, Operation};
pub use result::{decode_results, OperationResult};
pub use schema::{AtomicType, ColumnType, DatabaseSchema, TableSchema};

/// Hidden column carrying the row identifier in every OVSDB table.
pub const UUID_COLUMN: &str = "_uuid";
