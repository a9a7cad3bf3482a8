//! Store mutation listener driving the connection lifecycle.

use std::sync::Arc;

use widget_bridge_core::{Connect, CredentialStore, Mutation, Redirect, Subscriber, paths};

/// Name the listener is registered under.
pub const LISTENER_NAME: &str = "mutation_dispatcher";

/// Route the widget navigates to after a forced logout.
pub const LOGIN_ROUTE: &str = "/login";

/// Mutation the listener reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationInterest {
    /// A non-empty session token was just recorded.
    TokenSet,
    /// The session was dropped.
    LoggedOut,
}

impl MutationInterest {
    /// Interests in evaluation order; the first match wins.
    pub const ORDERED: [Self; 2] = [Self::TokenSet, Self::LoggedOut];

    /// Whether `mutation` is one this interest reacts to.
    #[must_use]
    pub fn matches(self, mutation: &Mutation) -> bool {
        match self {
            Self::TokenSet => {
                mutation.path == paths::SET_TOKEN
                    && mutation.payload.as_str().is_some_and(|t| !t.is_empty())
            }
            Self::LoggedOut => mutation.path == paths::LOGOUT,
        }
    }
}

/// Build the store subscriber that opens the connection on login and tears
/// it down on logout.
///
/// Logout erases the credential before the connection closes, so the
/// outbound guard stops sending at once. `redirect` runs synchronously
/// inside the mutation callback.
#[must_use]
pub fn mutation_listener(
    connection: Arc<dyn Connect>,
    credentials: Arc<dyn CredentialStore>,
    redirect: Redirect,
) -> Subscriber {
    Subscriber::new(LISTENER_NAME, move |mutation, _state| {
        let Some(interest) = MutationInterest::ORDERED
            .into_iter()
            .find(|interest| interest.matches(mutation))
        else {
            return;
        };

        tracing::debug!(?interest, path = %mutation.path, "mutation matched");
        match interest {
            MutationInterest::TokenSet => connection.connect(),
            MutationInterest::LoggedOut => {
                if let Err(e) = credentials.clear() {
                    tracing::warn!(error = %e, "failed to erase session credential");
                }
                connection.disconnect();
                redirect(LOGIN_ROUTE);
            }
        }
    })
}
