//! In-memory application store with mutation history and broadcast.

use std::{
    collections::VecDeque,
    sync::{Arc, PoisonError, RwLock},
};

use futures::StreamExt;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::{
    StoreState,
    state::paths,
    traits::{CredentialStore, Mutation, SessionCredential, Store, Subscriber},
};

/// Number of events kept for late observers.
const HISTORY_LEN: usize = 1024;

/// Something that happened to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A mutation was applied.
    Committed(Mutation),
    /// An action was dispatched.
    Dispatched { action: String, payload: Value },
}

struct Inner {
    state: StoreState,
    history: VecDeque<StoreEvent>,
}

/// Reference [`Store`] implementation.
///
/// Keeps the state tree in memory, persists the session token through an
/// optional [`CredentialStore`], and records every commit and dispatch so
/// observers can replay history then follow live updates.
pub struct MemoryStore {
    inner: RwLock<Inner>,
    subscribers: RwLock<Vec<Arc<Subscriber>>>,
    credentials: Option<Arc<dyn CredentialStore>>,
    sender: broadcast::Sender<StoreEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store without credential persistence.
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(StoreState::default(), None)
    }

    /// Create a store whose session token is persisted through `credentials`.
    ///
    /// A token already present in `credentials` is restored into the state.
    #[must_use]
    pub fn with_credentials(credentials: Arc<dyn CredentialStore>) -> Self {
        let mut state = StoreState::default();
        match credentials.get() {
            Ok(token) => state.user.token = token.map(|t| t.as_str().to_owned()),
            Err(e) => tracing::warn!(error = %e, "failed to restore session credential"),
        }
        Self::with_state(state, Some(credentials))
    }

    fn with_state(state: StoreState, credentials: Option<Arc<dyn CredentialStore>>) -> Self {
        let (sender, _) = broadcast::channel(HISTORY_LEN);
        Self {
            inner: RwLock::new(Inner {
                state,
                history: VecDeque::with_capacity(32),
            }),
            subscribers: RwLock::new(Vec::new()),
            credentials,
            sender,
        }
    }

    /// Get a receiver for live events.
    #[must_use]
    pub fn get_receiver(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Get a snapshot of the recorded events.
    #[must_use]
    pub fn history(&self) -> Vec<StoreEvent> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .iter()
            .cloned()
            .collect()
    }

    /// Stream that yields history first, then live events.
    #[must_use]
    pub fn event_stream(&self) -> futures::stream::BoxStream<'static, StoreEvent> {
        let (history, rx) = (self.history(), self.get_receiver());

        let hist = futures::stream::iter(history);
        let live = BroadcastStream::new(rx).filter_map(|res| async move { res.ok() });

        Box::pin(hist.chain(live))
    }

    fn record(&self, inner: &mut Inner, event: StoreEvent) {
        let _ = self.sender.send(event.clone());
        if inner.history.len() == HISTORY_LEN {
            inner.history.pop_front();
        }
        inner.history.push_back(event);
    }

    fn persist_token(&self, token: Option<&str>) {
        let Some(credentials) = &self.credentials else {
            return;
        };
        let result = match token {
            Some(token) => credentials.set(SessionCredential::new(token)),
            None => credentials.clear(),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist session credential");
        }
    }
}

impl Store for MemoryStore {
    fn dispatch(&self, action: &str, payload: Value) {
        {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            self.record(
                &mut inner,
                StoreEvent::Dispatched {
                    action: action.to_owned(),
                    payload: payload.clone(),
                },
            );
        }

        match action {
            paths::SAVE_FEED_ITEM => self.commit(paths::ADD_FEED_ITEM, payload),
            _ => tracing::warn!(action, "unknown store action"),
        }
    }

    fn commit(&self, mutation: &str, payload: Value) {
        let mutation = Mutation::new(mutation, payload);

        let snapshot = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            if !inner.state.apply(&mutation) {
                tracing::warn!(path = %mutation.path, "unknown store mutation");
                return;
            }
            if matches!(mutation.path.as_str(), paths::SET_TOKEN | paths::LOGOUT) {
                self.persist_token(inner.state.user.token.as_deref());
            }
            self.record(&mut inner, StoreEvent::Committed(mutation.clone()));
            inner.state.clone()
        };

        // Subscribers may commit again; no lock is held while they run.
        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for subscriber in &subscribers {
            subscriber.notify(&mutation, &snapshot);
        }
    }

    fn subscribe(&self, subscriber: Subscriber) {
        tracing::debug!(name = subscriber.name(), "store subscriber registered");
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(subscriber));
    }

    fn state(&self) -> StoreState {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
            .clone()
    }
}
