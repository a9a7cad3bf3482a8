//! Session credential storage for the embedded widget bridge.
//!
//! Provides:
//! - `MemoryCredentialStore` - Process-local credential storage
//! - `FileCredentialStore` - Durable key/value file, the local-storage analogue

pub mod storage;

#[cfg(feature = "memory")]
pub use storage::MemoryCredentialStore;

#[cfg(feature = "file")]
pub use storage::FileCredentialStore;
