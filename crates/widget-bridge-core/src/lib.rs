//! Core abstractions for the embedded widget bridge.
//!
//! This crate provides the fundamental building blocks:
//! - `Store` - Application store surface the bridge mutates
//! - `CredentialStore` - Durable session credential storage
//! - `Connect` - Connect capability of the real-time connection
//! - `MemoryStore` - Reference store with history and broadcast
//! - `BridgeContext` / `BridgeConfig` - Startup wiring

pub mod config;
pub mod context;
pub mod state;
pub mod store;
pub mod traits;

pub use config::{BridgeConfig, ConfigError};
pub use context::{BridgeContext, Redirect};
pub use state::{StoreState, paths};
pub use store::{MemoryStore, StoreEvent};
pub use traits::{
    Connect, CredentialStore, Mutation, SessionCredential, StorageError, Store, Subscriber,
};
