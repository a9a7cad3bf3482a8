//! Wire protocol for cross-frame and real-time messages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Handshake posted to the parent frame once the bridge is wired.
pub const READY_SENTINEL: &str = "SquadWidgetIsReady";

/// Bookkeeping fields that must never reach the backend.
pub const FORBIDDEN_FIELDS: [&str; 5] = ["guid", "error", "ts", "userId", "_jwt"];

/// Payload a caller intends to send to the backend.
///
/// Callers build it freely; [`crate::OutboundGuard`] strips
/// [`FORBIDDEN_FIELDS`] before transmission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutboundMessage(Map<String, Value>);

impl OutboundMessage {
    /// Create an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style field insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Serialize any value that encodes as a JSON object.
    ///
    /// # Errors
    /// Returns error if `value` does not serialize to a JSON object.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(serde::de::Error::custom(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    /// Borrow the fields.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Take the fields.
    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for OutboundMessage {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Cross-frame message text that is not JSON.
#[derive(Debug, Error)]
#[error("invalid cross-frame message: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// Message from the parent frame, keyed by its `type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// A single feed post. Carries the whole message.
    SingleItemPost(Value),
    /// A poll post. Carries the whole message.
    PollPost(Value),
    /// Merchant the widget is embedded for.
    InjectMerchantId { merchant_id: Value },
    /// The host page logged the user in.
    LoggedIn { user_token: String },
    /// Squad/group parameters.
    InjectSquadParams { squad: Value },
    /// Known type whose payload does not have the expected shape.
    Malformed { kind: String, reason: String },
    /// Any other type, or no type at all.
    Unrecognized { kind: Option<String> },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoggedInPayload {
    user_token: String,
}

impl InboundMessage {
    /// Parse raw message text.
    ///
    /// # Errors
    /// Returns error if `text` is not JSON. Valid JSON never fails; unknown
    /// shapes decode to [`InboundMessage::Unrecognized`].
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(value))
    }

    /// Classify an already parsed message.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let Some(kind) = value.get("type").and_then(Value::as_str).map(str::to_owned) else {
            return Self::Unrecognized { kind: None };
        };

        match kind.as_str() {
            "singleItemPost" => Self::SingleItemPost(value),
            "pollPost" => Self::PollPost(value),
            "injectMerchantId" => Self::InjectMerchantId {
                merchant_id: field(&value, "merchantId"),
            },
            "loggedIn" => match LoggedInPayload::deserialize(&value) {
                Ok(payload) => Self::LoggedIn {
                    user_token: payload.user_token,
                },
                Err(e) => Self::Malformed {
                    kind,
                    reason: e.to_string(),
                },
            },
            "injectSquadParams" => Self::InjectSquadParams {
                squad: field(&value, "squad"),
            },
            _ => Self::Unrecognized { kind: Some(kind) },
        }
    }

    /// The `type` discriminator, if any.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::SingleItemPost(_) => Some("singleItemPost"),
            Self::PollPost(_) => Some("pollPost"),
            Self::InjectMerchantId { .. } => Some("injectMerchantId"),
            Self::LoggedIn { .. } => Some("loggedIn"),
            Self::InjectSquadParams { .. } => Some("injectSquadParams"),
            Self::Malformed { kind, .. } => Some(kind.as_str()),
            Self::Unrecognized { kind } => kind.as_deref(),
        }
    }
}

fn field(value: &Value, name: &str) -> Value {
    value.get(name).cloned().unwrap_or(Value::Null)
}

/// Inbound frame from the backend, routed onto the store surface.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    /// `{"mutation": .., "namespace"?: ..}`: commit.
    Mutation { path: String, payload: Value },
    /// `{"action": .., "namespace"?: ..}`: dispatch.
    Action { path: String, payload: Value },
    /// Anything else, recorded as the last socket message.
    Message(Value),
}

impl ServerFrame {
    /// Route a parsed frame. A `mutation` field wins over `action`.
    #[must_use]
    pub fn route(value: Value) -> Self {
        let namespace = value.get("namespace").and_then(Value::as_str);
        let target = |key: &str| {
            value.get(key).and_then(Value::as_str).map(|name| match namespace {
                Some(ns) if !ns.is_empty() => format!("{ns}/{name}"),
                _ => name.to_owned(),
            })
        };

        if let Some(path) = target("mutation") {
            Self::Mutation {
                path,
                payload: value,
            }
        } else if let Some(path) = target("action") {
            Self::Action {
                path,
                payload: value,
            }
        } else {
            Self::Message(value)
        }
    }
}
