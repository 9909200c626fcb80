//! VTEP reconciliation daemon.
//!
//! Connects to an OVSDB-backed device, monitors the managed tables,
//! and converges the device toward a desired-state file.

pub mod config;
pub mod daemon;
pub mod error;

pub use config::{DaemonConfig, DesiredState};
pub use daemon::VtepDaemon;
pub use error::DaemonError;
