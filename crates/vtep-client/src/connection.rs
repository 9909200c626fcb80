//! Connection ownership and the read loop.
//!
//! One [`Connection`] owns one transport. A writer task serializes all
//! outbound frames onto the wire, so one transaction's operations are
//! never interleaved with another's. The read loop classifies inbound
//! frames: responses complete pending request slots, echo requests are
//! answered in place, and update notifications are queued toward their
//! monitor subscription without blocking further decode.
//!
//! On transport loss every pending request fails with
//! [`ClientError::ConnectionLost`] and all monitor queues are closed;
//! subscribers observe the end of their stream and must re-establish
//! and resync after reconnection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt;
use tokio_util::codec::FramedRead;
use tracing::{debug, warn};

use ovsdb_proto::{methods, Frame, JsonCodec, ProtoError, Request, TableUpdates};

use crate::error::{ClientError, Result};

/// Depth of each monitor subscription's notification queue. A consumer
/// that falls this far behind backpressures the read loop rather than
/// losing or reordering notifications.
const MONITOR_QUEUE_DEPTH: usize = 256;

/// Depth of the outbound frame queue feeding the writer task.
const WRITE_QUEUE_DEPTH: usize = 64;

/// Lifecycle of the logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// The dial is in flight; no transport exists yet.
    Connecting,
    Connected,
    /// Connected with at least one active monitor subscription.
    Monitoring,
}

#[derive(Debug)]
struct Shared {
    /// Request id → pending result slot. `None` once disconnected.
    pending: Mutex<Option<HashMap<u64, oneshot::Sender<Result<Value>>>>>,
    /// Monitor id → notification queue.
    monitors: Mutex<HashMap<String, mpsc::Sender<TableUpdates>>>,
    state: Mutex<ConnectionState>,
    next_id: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Self {
            pending: Mutex::new(Some(HashMap::new())),
            monitors: Mutex::new(HashMap::new()),
            state: Mutex::new(ConnectionState::Connecting),
            next_id: AtomicU64::new(1),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap() = state;
    }

    /// Recomputes Connected/Monitoring from the live subscription set.
    fn refresh_monitor_state(&self) {
        let has_monitors = !self.monitors.lock().unwrap().is_empty();
        let mut state = self.state.lock().unwrap();
        *state = match (*state, has_monitors) {
            (ConnectionState::Disconnected, _) => ConnectionState::Disconnected,
            (_, true) => ConnectionState::Monitoring,
            (_, false) => ConnectionState::Connected,
        };
    }

    /// Fails all pending requests and closes all monitor queues.
    fn disconnect(&self) {
        self.set_state(ConnectionState::Disconnected);
        if let Some(pending) = self.pending.lock().unwrap().take() {
            for (_, slot) in pending {
                let _ = slot.send(Err(ClientError::ConnectionLost));
            }
        }
        // Dropping the senders ends every subscriber's stream.
        self.monitors.lock().unwrap().clear();
    }
}

/// Handle to one live connection.
#[derive(Clone, Debug)]
pub struct Connection {
    shared: Arc<Shared>,
    writer: mpsc::Sender<Value>,
}

impl Connection {
    /// Dials a device over TCP. The logical connection is Connecting
    /// for the duration of the dial.
    pub async fn connect(addr: &str) -> Result<Self> {
        let shared = Arc::new(Shared::new());
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::start_shared(shared, stream))
    }

    /// Takes ownership of an established transport and spawns its
    /// reader and writer tasks.
    pub fn start<S>(transport: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        Self::start_shared(Arc::new(Shared::new()), transport)
    }

    fn start_shared<S>(shared: Arc<Shared>, transport: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        // Before the reader spawns: it may observe loss immediately,
        // and Disconnected must not be overwritten afterwards.
        shared.set_state(ConnectionState::Connected);

        let (write_tx, mut write_rx) = mpsc::channel::<Value>(WRITE_QUEUE_DEPTH);
        let (read_half, mut write_half) = tokio::io::split(transport);

        let writer_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            while let Some(frame) = write_rx.recv().await {
                let bytes = match serde_json::to_vec(&frame) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!("dropping unencodable frame: {e}");
                        continue;
                    }
                };
                if let Err(e) = write_half.write_all(&bytes).await {
                    warn!("write failed, closing connection: {e}");
                    break;
                }
            }
            // A request accepted into the queue but never written must
            // not wait for the read loop to notice the loss.
            writer_shared.disconnect();
        });

        let reader_shared = Arc::clone(&shared);
        let reader_writer = write_tx.clone();
        tokio::spawn(async move {
            let mut frames = FramedRead::new(read_half, JsonCodec::new());
            loop {
                match frames.next().await {
                    Some(Ok(value)) => {
                        handle_frame(&reader_shared, &reader_writer, value).await;
                    }
                    Some(Err(ProtoError::Io(e))) => {
                        warn!("read failed: {e}");
                        break;
                    }
                    Some(Err(e)) => {
                        // Malformed frame: drop it, keep the connection.
                        warn!("dropping undecodable frame: {e}");
                    }
                    None => {
                        debug!("peer closed the connection");
                        break;
                    }
                }
            }
            reader_shared.disconnect();
        });

        Self {
            shared,
            writer: write_tx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock().unwrap()
    }

    /// Sends one request and awaits its response payload.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.shared.pending.lock().unwrap();
            match pending.as_mut() {
                Some(map) => {
                    map.insert(id, tx);
                }
                None => return Err(ClientError::NotConnected),
            }
        }

        let frame = serde_json::to_value(Request::new(id, method, params))
            .map_err(ProtoError::from)?;
        if self.writer.send(frame).await.is_err() {
            if let Some(map) = self.shared.pending.lock().unwrap().as_mut() {
                map.remove(&id);
            }
            return Err(ClientError::ConnectionLost);
        }

        rx.await.map_err(|_| ClientError::ConnectionLost)?
    }

    /// Registers a monitor queue under `id` before the monitor request
    /// is sent, so no notification can race past the subscriber.
    pub fn register_monitor(&self, id: &str) -> Result<mpsc::Receiver<TableUpdates>> {
        let (tx, rx) = mpsc::channel(MONITOR_QUEUE_DEPTH);
        {
            let mut monitors = self.shared.monitors.lock().unwrap();
            if monitors.contains_key(id) {
                return Err(ClientError::DuplicateMonitor(id.to_string()));
            }
            monitors.insert(id.to_string(), tx);
        }
        self.shared.refresh_monitor_state();
        Ok(rx)
    }

    /// Drops the monitor queue for `id`, ending its subscriber stream.
    pub fn unregister_monitor(&self, id: &str) {
        self.shared.monitors.lock().unwrap().remove(id);
        self.shared.refresh_monitor_state();
    }
}

async fn handle_frame(shared: &Arc<Shared>, writer: &mpsc::Sender<Value>, value: Value) {
    let frame = match Frame::from_value(value) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("dropping unclassifiable frame: {e}");
            return;
        }
    };

    match frame {
        Frame::Response { id, result, error } => {
            let slot = shared
                .pending
                .lock()
                .unwrap()
                .as_mut()
                .and_then(|map| map.remove(&id));
            let Some(slot) = slot else {
                debug!("response for unknown request id {id}");
                return;
            };
            let outcome = if error.is_null() {
                Ok(result)
            } else {
                Err(ClientError::Rpc(error.to_string()))
            };
            let _ = slot.send(outcome);
        }
        Frame::Request { id, method, params } => {
            if method == methods::ECHO {
                let _ = writer.send(Request::reply(id, params)).await;
            } else {
                warn!("unsupported device request {method:?}");
            }
        }
        Frame::Notification { method, params } => {
            if method != methods::UPDATE {
                debug!("ignoring notification {method:?}");
                return;
            }
            let (tag, updates) = match TableUpdates::from_notification(&params) {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!("dropping undecodable update notification: {e}");
                    return;
                }
            };
            let key = tag.as_str().map(str::to_string).unwrap_or_else(|| tag.to_string());
            let queue = shared.monitors.lock().unwrap().get(&key).cloned();
            match queue {
                // Queued outside the lock; a full queue backpressures
                // decode rather than dropping the notification.
                Some(queue) => {
                    if queue.send(updates).await.is_err() {
                        shared.monitors.lock().unwrap().remove(&key);
                    }
                }
                None => debug!("update for unknown monitor {key:?}"),
            }
        }
    }
}
