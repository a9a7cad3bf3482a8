//! Durable credential storage backed by a JSON key/value file.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use widget_bridge_core::{CredentialStore, SessionCredential, StorageError};

use super::TOKEN_KEY;

/// File-backed credential store.
///
/// The file is a flat JSON object of string entries, so other keys written by
/// the host survive. Reads are served from a cache that only takes a change
/// once it is on disk, which keeps `get` consistent with the last successful
/// `set`.
pub struct FileCredentialStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileCredentialStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// # Errors
    /// Returns error if an existing file cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), "opened credential store");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Open the store at [`Self::default_path`].
    ///
    /// # Errors
    /// Returns error if no data directory is known or the file is unreadable.
    pub fn open_default() -> Result<Self, StorageError> {
        let path = Self::default_path()
            .ok_or_else(|| StorageError::Internal("no local data directory".to_string()))?;
        Self::open(path)
    }

    /// `<local data dir>/widget-bridge/storage.json`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("widget-bridge").join("storage.json"))
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let mut updated = entries.clone();
        f(&mut updated);

        self.write_file(&updated)?;
        *entries = updated;
        Ok(())
    }

    fn write_file(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write then rename so a crash never leaves a truncated file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Option<SessionCredential>, StorageError> {
        Ok(self
            .entries
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .get(TOKEN_KEY)
            .filter(|token| !token.is_empty())
            .map(SessionCredential::new))
    }

    fn set(&self, credential: SessionCredential) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(TOKEN_KEY.to_owned(), credential.as_str().to_owned());
        })
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.remove(TOKEN_KEY);
        })
    }
}
