//! Daemon wiring: connect, monitor, dispatch, reconcile.

use std::path::Path;

use tokio::signal;
use tracing::{info, warn};

use vtep_client::{MonitorHandle, OvsdbClient};
use vtep_reconciler::{
    hardware_vtep_descriptors, inventory_channel, monitor_requests, operational_cache,
    MonitorDispatcher, NodeId, Reconciler,
};

use crate::config::{DaemonConfig, DesiredState};
use crate::error::DaemonError;

/// Monitor subscription identifier this daemon registers under.
const MONITOR_ID: &str = "vtepd";

pub struct VtepDaemon {
    config: DaemonConfig,
}

impl VtepDaemon {
    pub fn new(config: DaemonConfig) -> Self {
        Self { config }
    }

    /// Runs until the connection drops or the process is told to stop.
    pub async fn run(self) -> Result<(), DaemonError> {
        let config = self.config;
        let client = OvsdbClient::connect(&config.endpoint).await?;
        info!(endpoint = %config.endpoint, database = %config.database, "connected");

        let databases = client.list_databases().await?;
        if !databases.iter().any(|d| d == &config.database) {
            warn!(
                available = ?databases,
                "device does not serve {}, continuing anyway",
                config.database
            );
        }

        let descriptors = hardware_vtep_descriptors();
        let requests = monitor_requests(&descriptors);
        let MonitorHandle {
            initial, updates, ..
        } = client
            .monitor(&config.database, MONITOR_ID, &requests)
            .await?;

        let (writer, cache) = operational_cache();
        let node = NodeId::from(config.node.clone());
        let (events_tx, mut events_rx) = inventory_channel(config.inventory_queue_depth);
        let dispatcher = MonitorDispatcher::new(node, descriptors.clone(), writer, events_tx);

        // The initial monitor reply is a full dump; seed the cache
        // from it before anything plans against it.
        let seeded = dispatcher.apply(&initial);
        info!(entities = seeded.len(), "operational cache seeded");

        let dispatch = tokio::spawn(dispatcher.run(updates));

        let mut reconciler = Reconciler::new(config.database.clone(), descriptors);
        if let Some(path) = &config.desired_state {
            let desired = DesiredState::load(Path::new(path))?;
            let changes = desired.into_modifications(None);
            let report = reconciler.run(&changes, &cache, &client).await?;
            for warning in &report.warnings {
                warn!("{warning}");
            }
            info!(
                inserts = report.inserts,
                updates = report.updates,
                deletes = report.deletes,
                "desired state applied"
            );
        }

        loop {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("shutdown requested");
                    break;
                }
                event = events_rx.recv() => match event {
                    Some(event) => info!(
                        node = %event.node,
                        kind = event.kind.label(),
                        name = %event.entity.name,
                        action = ?event.action,
                        "inventory change"
                    ),
                    // Dispatcher gone: the monitor stream ended, which
                    // means the connection is down.
                    None => {
                        warn!("monitor stream ended, exiting");
                        break;
                    }
                },
            }
        }

        let _ = client.cancel_monitor(MONITOR_ID).await;
        dispatch.abort();
        Ok(())
    }
}
