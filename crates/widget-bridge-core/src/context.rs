//! Execution context handed to the bridge at startup.

use std::{fmt, sync::Arc};

use crate::traits::{CredentialStore, Store};

/// Navigation side effect, e.g. redirect to the login route.
pub type Redirect = Arc<dyn Fn(&str) + Send + Sync>;

/// Collaborators the bridge is wired against.
#[derive(Clone)]
pub struct BridgeContext {
    /// Application state store.
    pub store: Arc<dyn Store>,

    /// Navigation callback.
    pub redirect: Redirect,

    /// Durable session credential storage.
    pub credentials: Arc<dyn CredentialStore>,
}

impl BridgeContext {
    /// Create a context.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        redirect: Redirect,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            store,
            redirect,
            credentials,
        }
    }

    /// Redirect to `target`.
    pub fn redirect(&self, target: &str) {
        (self.redirect)(target);
    }
}

impl fmt::Debug for BridgeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeContext").finish_non_exhaustive()
    }
}
