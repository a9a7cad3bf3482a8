//! Inbound cross-frame message dispatcher.
//!
//! The parent frame is not a trusted boundary: anything it posts is decoded
//! defensively, and undecodable or unknown messages are dropped without
//! touching the store.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use widget_bridge_core::{Connect, CredentialStore, SessionCredential, Store, paths};

use crate::{
    protocol::{InboundMessage, READY_SENTINEL},
    window::{HostWindow, WidgetWindow},
};

/// Route one decoded message to its reaction.
///
/// A login records the credential before the token is committed, so the
/// connect it triggers and any send that follows see it.
pub fn dispatch(
    store: &dyn Store,
    credentials: &dyn CredentialStore,
    connection: &dyn Connect,
    message: InboundMessage,
) {
    match message {
        InboundMessage::SingleItemPost(msg) => store.dispatch(paths::SAVE_FEED_ITEM, msg),
        // Polls share the feed-save path but stay a separate arm.
        InboundMessage::PollPost(msg) => store.dispatch(paths::SAVE_FEED_ITEM, msg),
        InboundMessage::InjectMerchantId { merchant_id } => {
            store.commit(paths::SET_MERCHANT_ID, merchant_id);
        }
        InboundMessage::LoggedIn { user_token } => {
            if let Err(e) = credentials.set(SessionCredential::new(user_token.as_str())) {
                tracing::warn!(error = %e, "failed to store session credential");
            }
            store.commit(paths::SET_TOKEN, Value::String(user_token));
            connection.connect();
        }
        InboundMessage::InjectSquadParams { squad } => {
            store.commit(paths::SET_SQUAD_PARAMS, squad);
        }
        InboundMessage::Malformed { kind, reason } => {
            tracing::debug!(%kind, %reason, "malformed cross-frame message dropped");
        }
        InboundMessage::Unrecognized { kind } => {
            tracing::debug!(?kind, "unknown cross-frame message dropped");
        }
    }
}

/// Dispatcher bound to a store, the credential store and the connection.
#[derive(Clone)]
pub struct InboundDispatcher {
    store: Arc<dyn Store>,
    credentials: Arc<dyn CredentialStore>,
    connection: Arc<dyn Connect>,
}

impl InboundDispatcher {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        credentials: Arc<dyn CredentialStore>,
        connection: Arc<dyn Connect>,
    ) -> Self {
        Self {
            store,
            credentials,
            connection,
        }
    }

    /// Decode raw message text and route it.
    pub fn on_message(&self, data: &str) {
        match InboundMessage::decode(data) {
            Ok(message) => self.dispatch(message),
            Err(e) => tracing::debug!(error = %e, "undecodable cross-frame message dropped"),
        }
    }

    /// Route an already decoded message.
    pub fn dispatch(&self, message: InboundMessage) {
        dispatch(
            self.store.as_ref(),
            self.credentials.as_ref(),
            self.connection.as_ref(),
            message,
        );
    }

    /// Start handling `window` messages in arrival order, then announce
    /// readiness to the parent frame.
    ///
    /// Must be called within a tokio runtime.
    pub fn attach(self, window: WidgetWindow) -> JoinHandle<()> {
        let WidgetWindow {
            mut messages,
            parent,
        } = window;

        let task = tokio::spawn(async move {
            while let Some(data) = messages.recv().await {
                self.on_message(&data);
            }
            tracing::debug!("parent frame closed, dispatcher stopped");
        });

        parent.post_to_parent(READY_SENTINEL);
        task
    }
}
