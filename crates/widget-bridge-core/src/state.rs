//! Store state tree and the mutation/action paths that act on it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::traits::Mutation;

/// Mutation and action paths understood by the reference store.
pub mod paths {
    /// Merchant identifier. Committed unscoped, unlike the other modules.
    pub const SET_MERCHANT_ID: &str = "SET_MERCHANT_ID";
    /// Record a newly issued session token.
    pub const SET_TOKEN: &str = "user/setToken";
    /// Drop the session token.
    pub const LOGOUT: &str = "user/logout";
    /// Squad/group parameters injected by the parent frame.
    pub const SET_SQUAD_PARAMS: &str = "squad/setSquadParams";
    /// Insert or replace a feed item.
    pub const ADD_FEED_ITEM: &str = "feed/addItem";
    /// Action: save a feed item (single posts and polls).
    pub const SAVE_FEED_ITEM: &str = "feed/saveItem";

    pub const SOCKET_ONOPEN: &str = "SOCKET_ONOPEN";
    pub const SOCKET_ONCLOSE: &str = "SOCKET_ONCLOSE";
    pub const SOCKET_ONERROR: &str = "SOCKET_ONERROR";
    pub const SOCKET_ONMESSAGE: &str = "SOCKET_ONMESSAGE";
}

/// Session slice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserState {
    /// Current session token.
    pub token: Option<String>,
}

/// Squad slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SquadState {
    /// Parameters injected by the host page.
    pub params: Option<Value>,
}

/// Feed slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedState {
    /// Saved items, in arrival order.
    pub items: Vec<Value>,
}

/// Real-time connection slice, driven by `SOCKET_*` mutations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocketState {
    pub is_connected: bool,
    /// Last frame that did not name a mutation or action.
    pub message: Option<Value>,
    /// Last transport error.
    pub error: Option<String>,
}

/// Readable application state tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    pub merchant_id: Option<String>,
    pub user: UserState,
    pub squad: SquadState,
    pub feed: FeedState,
    pub socket: SocketState,
}

impl StoreState {
    /// Apply a mutation to the tree.
    ///
    /// Returns `false` when the mutation path is unknown; the tree is then
    /// left untouched.
    pub fn apply(&mut self, mutation: &Mutation) -> bool {
        let payload = &mutation.payload;
        match mutation.path.as_str() {
            paths::SET_MERCHANT_ID => self.merchant_id = identifier(payload),
            paths::SET_TOKEN => {
                self.user.token = payload
                    .as_str()
                    .filter(|token| !token.is_empty())
                    .map(str::to_owned);
            }
            paths::LOGOUT => self.user.token = None,
            paths::SET_SQUAD_PARAMS => {
                self.squad.params = (!payload.is_null()).then(|| payload.clone());
            }
            paths::ADD_FEED_ITEM => self.upsert_item(payload.clone()),
            paths::SOCKET_ONOPEN => {
                self.socket.is_connected = true;
                self.socket.error = None;
            }
            paths::SOCKET_ONCLOSE => self.socket.is_connected = false,
            paths::SOCKET_ONERROR => {
                self.socket.error = Some(
                    payload
                        .as_str()
                        .map_or_else(|| payload.to_string(), str::to_owned),
                );
            }
            paths::SOCKET_ONMESSAGE => self.socket.message = Some(payload.clone()),
            _ => return false,
        }
        true
    }

    fn upsert_item(&mut self, item: Value) {
        let id = item.get("id").filter(|id| !id.is_null()).cloned();
        if let Some(id) = id {
            if let Some(existing) = self
                .feed
                .items
                .iter_mut()
                .find(|existing| existing.get("id") == Some(&id))
            {
                *existing = item;
                return;
            }
        }
        self.feed.items.push(item);
    }
}

/// Identifiers arrive as strings or numbers from the host page.
fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
