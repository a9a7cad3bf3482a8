//! Core traits for the store, credential storage and the connection.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::StoreState;

/// Session token proving an authenticated user to the backend.
///
/// `Debug` output is redacted so the token never ends up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCredential(String);

impl SessionCredential {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Borrow the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCredential(<redacted>)")
    }
}

/// Storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt storage: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Durable holder of the current session credential.
///
/// Implementations must be read-after-write consistent: a `get` following a
/// `set` on the same store observes the new value.
pub trait CredentialStore: Send + Sync {
    /// Current credential, if any.
    ///
    /// # Errors
    /// Returns error if the backend cannot be read.
    fn get(&self) -> Result<Option<SessionCredential>, StorageError>;

    /// Replace the stored credential.
    ///
    /// # Errors
    /// Returns error if the backend cannot be written.
    fn set(&self, credential: SessionCredential) -> Result<(), StorageError>;

    /// Erase the stored credential.
    ///
    /// # Errors
    /// Returns error if the backend cannot be written.
    fn clear(&self) -> Result<(), StorageError>;
}

/// A committed mutation as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    /// Mutation path, e.g. `user/setToken`.
    pub path: String,
    /// Mutation payload.
    pub payload: Value,
}

impl Mutation {
    /// Create a mutation.
    #[must_use]
    pub fn new(path: impl Into<String>, payload: Value) -> Self {
        Self {
            path: path.into(),
            payload,
        }
    }
}

type SubscriberFn = dyn Fn(&Mutation, &StoreState) + Send + Sync;

/// Named mutation observer registered through [`Store::subscribe`].
pub struct Subscriber {
    name: &'static str,
    callback: Box<SubscriberFn>,
}

impl Subscriber {
    /// Create a named subscriber.
    pub fn new<F>(name: &'static str, callback: F) -> Self
    where
        F: Fn(&Mutation, &StoreState) + Send + Sync + 'static,
    {
        Self {
            name,
            callback: Box::new(callback),
        }
    }

    /// Subscriber name, used to identify it in tests and on unsubscribe.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Invoke the subscriber for a committed mutation.
    pub fn notify(&self, mutation: &Mutation, state: &StoreState) {
        (self.callback)(mutation, state);
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("name", &self.name).finish()
    }
}

/// Application state store the bridge mutates.
///
/// Subscribers run synchronously inside `commit`, in registration order.
pub trait Store: Send + Sync {
    /// Run a store action.
    fn dispatch(&self, action: &str, payload: Value);

    /// Apply a mutation and notify subscribers.
    fn commit(&self, mutation: &str, payload: Value);

    /// Register a mutation subscriber for the lifetime of the store.
    fn subscribe(&self, subscriber: Subscriber);

    /// Snapshot of the current state tree.
    fn state(&self) -> StoreState;
}

/// Connect capability of the real-time connection.
///
/// Both operations must be idempotent and callable from inside a store
/// subscriber.
pub trait Connect: Send + Sync {
    /// Open the connection unless it is already open.
    fn connect(&self);

    /// Tear the connection down unless it is already closed.
    fn disconnect(&self);
}
