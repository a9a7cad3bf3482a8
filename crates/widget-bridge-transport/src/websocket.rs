//! WebSocket connection manager.
//!
//! Owns the single real-time connection. The connection is built in manual
//! mode and only opens on an explicit [`Connect::connect`], so no traffic
//! flows before a session credential exists.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::{SinkExt, StreamExt};
use serde_json::{Map, Value};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;
use uuid::Uuid;
use widget_bridge_core::{Connect, Store, paths};

use crate::{
    guard::{RawSend, TransportError},
    protocol::ServerFrame,
};

type Frame = Map<String, Value>;

/// Lifecycle state of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Constructed, not yet initialized.
    Uninitialized,
    /// Initialized with auto-connect disabled.
    ManualPending,
    /// Connect was triggered; the connection task owns the socket.
    Connected,
    /// The transport ended or was torn down. A later connect reopens it.
    Closed,
}

struct Inner {
    state: ConnectionState,
    /// Bumped on every connect/disconnect so stale tasks cannot clobber state.
    epoch: u64,
    outbound_tx: mpsc::UnboundedSender<Frame>,
    outbound_rx: Option<mpsc::UnboundedReceiver<Frame>>,
    task: Option<JoinHandle<()>>,
}

impl Inner {
    fn reset_channel(&mut self) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound_tx = tx;
        self.outbound_rx = Some(rx);
    }
}

/// Manager for the one real-time connection of a widget session.
pub struct ConnectionManager {
    id: Uuid,
    endpoint: Url,
    store: Arc<dyn Store>,
    inner: Arc<Mutex<Inner>>,
}

/// Build the connection manager for `endpoint` in manual-connect mode.
///
/// The endpoint is used verbatim; the session credential is never added to
/// it. If `store` already holds a session token the connection is opened
/// right away.
#[must_use]
pub fn init_socket(endpoint: Url, store: Arc<dyn Store>) -> Arc<ConnectionManager> {
    let manager = Arc::new(ConnectionManager::new(endpoint, store));
    manager.init();
    if manager.store.state().user.token.is_some() {
        manager.connect();
    }
    manager
}

impl ConnectionManager {
    /// Create an uninitialized manager.
    #[must_use]
    pub fn new(endpoint: Url, store: Arc<dyn Store>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            id: Uuid::new_v4(),
            endpoint,
            store,
            inner: Arc::new(Mutex::new(Inner {
                state: ConnectionState::Uninitialized,
                epoch: 0,
                outbound_tx,
                outbound_rx: Some(outbound_rx),
                task: None,
            })),
        }
    }

    /// Move to `ManualPending`. Does nothing once initialized.
    pub fn init(&self) {
        let mut inner = self.lock();
        if inner.state == ConnectionState::Uninitialized {
            inner.state = ConnectionState::ManualPending;
            tracing::debug!(connection_id = %self.id, endpoint = %self.endpoint, "socket initialized");
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Endpoint the connection targets.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Identifier used in logs.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connect for ConnectionManager {
    fn connect(&self) {
        let mut inner = self.lock();
        match inner.state {
            ConnectionState::Uninitialized => {
                tracing::warn!(connection_id = %self.id, "connect before init_socket ignored");
                return;
            }
            ConnectionState::Connected => {
                tracing::trace!(connection_id = %self.id, "already connected");
                return;
            }
            ConnectionState::ManualPending | ConnectionState::Closed => {}
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(connection_id = %self.id, "no async runtime, connect deferred");
            return;
        };

        if inner.outbound_rx.is_none() {
            inner.reset_channel();
        }
        let Some(outbound) = inner.outbound_rx.take() else {
            return;
        };
        inner.epoch += 1;
        inner.state = ConnectionState::Connected;

        let task = ConnectionTask {
            id: self.id,
            epoch: inner.epoch,
            endpoint: self.endpoint.clone(),
            store: Arc::clone(&self.store),
            inner: Arc::clone(&self.inner),
            outbound,
            opened: false,
        };
        tracing::info!(connection_id = %self.id, endpoint = %self.endpoint, "connecting");
        inner.task = Some(runtime.spawn(task.run()));
    }

    fn disconnect(&self) {
        let task = {
            let mut inner = self.lock();
            if inner.state != ConnectionState::Connected {
                return;
            }
            inner.epoch += 1;
            inner.state = ConnectionState::Closed;
            inner.reset_channel();
            inner.task.take()
        };
        if let Some(task) = task {
            task.abort();
        }
        tracing::info!(connection_id = %self.id, "disconnected");
        self.store.commit(paths::SOCKET_ONCLOSE, Value::Null);
    }
}

impl RawSend for ConnectionManager {
    fn send_obj(&self, payload: Frame) -> Result<(), TransportError> {
        let inner = self.lock();
        match inner.state {
            ConnectionState::Uninitialized => return Err(TransportError::NotInitialized),
            // Nothing reopens a closed connection on its own.
            ConnectionState::Closed => return Err(TransportError::ChannelClosed),
            ConnectionState::ManualPending | ConnectionState::Connected => {}
        }
        // Frames sent while pending queue up and flush once the socket opens.
        inner
            .outbound_tx
            .send(payload)
            .map_err(|_| TransportError::ChannelClosed)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(task) = self.lock().task.take() {
            task.abort();
        }
    }
}

struct ConnectionTask {
    id: Uuid,
    epoch: u64,
    endpoint: Url,
    store: Arc<dyn Store>,
    inner: Arc<Mutex<Inner>>,
    outbound: mpsc::UnboundedReceiver<Frame>,
    opened: bool,
}

impl ConnectionTask {
    async fn run(mut self) {
        let result = self.drive().await;

        {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if inner.epoch != self.epoch {
                return;
            }
            inner.state = ConnectionState::Closed;
            inner.task = None;
            inner.reset_channel();
        }

        match result {
            Ok(()) => tracing::info!(connection_id = %self.id, "connection closed"),
            Err(e) => {
                tracing::warn!(connection_id = %self.id, error = %e, "connection failed");
                self.store.commit(paths::SOCKET_ONERROR, Value::String(e));
            }
        }
        if self.opened {
            self.store.commit(paths::SOCKET_ONCLOSE, Value::Null);
        }
    }

    async fn drive(&mut self) -> Result<(), String> {
        let (stream, _) = connect_async(self.endpoint.as_str())
            .await
            .map_err(|e| format!("connect failed: {e}"))?;
        self.opened = true;
        tracing::info!(connection_id = %self.id, "connection open");
        self.store.commit(paths::SOCKET_ONOPEN, Value::Null);

        let (mut sender, mut receiver) = stream.split();

        loop {
            tokio::select! {
                frame = self.outbound.recv() => {
                    let Some(frame) = frame else {
                        let _ = sender.close().await;
                        return Ok(());
                    };
                    let json = match serde_json::to_string(&frame) {
                        Ok(j) => j,
                        Err(e) => {
                            tracing::error!("Failed to serialize frame: {e}");
                            continue;
                        }
                    };
                    sender
                        .send(Message::Text(json.into()))
                        .await
                        .map_err(|e| format!("send failed: {e}"))?;
                }
                msg = receiver.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.on_frame(text.as_str()),
                    Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                        Ok(text) => self.on_frame(text),
                        Err(_) => continue,
                    },
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(format!("receive failed: {e}")),
                },
            }
        }
    }

    fn is_current(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .epoch
            == self.epoch
    }

    fn on_frame(&self, text: &str) {
        if !self.is_current() {
            tracing::trace!(connection_id = %self.id, "frame from stale connection dropped");
            return;
        }
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(connection_id = %self.id, error = %e, "non-JSON frame dropped");
                return;
            }
        };

        match ServerFrame::route(value) {
            ServerFrame::Mutation { path, payload } => self.store.commit(&path, payload),
            ServerFrame::Action { path, payload } => self.store.dispatch(&path, payload),
            ServerFrame::Message(payload) => self.store.commit(paths::SOCKET_ONMESSAGE, payload),
        }
    }
}
