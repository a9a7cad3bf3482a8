//! Credential-gated, sanitizing wrapper around the raw send primitive.

use std::sync::Arc;

use serde_json::{Map, Value};
use widget_bridge_core::CredentialStore;

use crate::protocol::{FORBIDDEN_FIELDS, OutboundMessage};

/// Raw transport error.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection not initialized")]
    NotInitialized,
    #[error("Connection closed")]
    ChannelClosed,
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Raw "send object" primitive of a live connection.
pub trait RawSend: Send + Sync {
    /// Transmit one JSON object frame.
    ///
    /// # Errors
    /// Returns error if the connection can no longer accept frames.
    fn send_obj(&self, payload: Map<String, Value>) -> Result<(), TransportError>;
}

impl<T: RawSend + ?Sized> RawSend for Arc<T> {
    fn send_obj(&self, payload: Map<String, Value>) -> Result<(), TransportError> {
        (**self).send_obj(payload)
    }
}

/// What [`OutboundGuard::send`] did with a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the transport once.
    Sent,
    /// No credential; nothing was sent.
    Skipped,
    /// The transport rejected the frame.
    Failed,
}

/// Single enforcement point for outbound traffic.
///
/// Nothing is sent without a session credential, and bookkeeping fields are
/// stripped from every payload that is sent.
pub struct OutboundGuard<T> {
    transport: T,
    credentials: Arc<dyn CredentialStore>,
}

impl<T: RawSend> OutboundGuard<T> {
    /// Wrap `transport`.
    #[must_use]
    pub fn new(transport: T, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    /// Send `payload` if a credential is present.
    ///
    /// Never buffers, retries or panics; faults are logged and reported
    /// through the returned outcome.
    pub fn send(&self, payload: OutboundMessage) -> SendOutcome {
        let credential = match self.credentials.get() {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(error = %e, "credential unreadable, dropping outbound message");
                None
            }
        };
        if credential.is_none() {
            tracing::trace!("no session credential, outbound message skipped");
            return SendOutcome::Skipped;
        }

        match self.transport.send_obj(sanitize(payload)) {
            Ok(()) => SendOutcome::Sent,
            Err(e) => {
                tracing::warn!(error = %e, "outbound message not sent");
                SendOutcome::Failed
            }
        }
    }

    /// The wrapped transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }
}

fn sanitize(payload: OutboundMessage) -> Map<String, Value> {
    let mut fields = payload.into_inner();
    for name in FORBIDDEN_FIELDS {
        fields.remove(name);
    }
    fields
}
