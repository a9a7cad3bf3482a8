//! In-memory credential storage.

use std::sync::RwLock;

use widget_bridge_core::{CredentialStore, SessionCredential, StorageError};

/// In-memory credential store.
///
/// Useful for tests and hosts without durable storage.
/// The credential is lost on restart.
pub struct MemoryCredentialStore {
    credential: RwLock<Option<SessionCredential>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            credential: RwLock::new(None),
        }
    }

    /// Create a store already holding `credential`.
    #[must_use]
    pub const fn with_credential(credential: SessionCredential) -> Self {
        Self {
            credential: RwLock::new(Some(credential)),
        }
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<SessionCredential>, StorageError> {
        Ok(self
            .credential
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .clone())
    }

    fn set(&self, credential: SessionCredential) -> Result<(), StorageError> {
        *self
            .credential
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))? = Some(credential);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self
            .credential
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))? = None;
        Ok(())
    }
}
