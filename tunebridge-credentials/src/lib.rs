//! # tunebridge-credentials
//!
//! Persistence for provider credentials (OAuth tokens and their expiry).
//!
//! This crate provides:
//! - [`CredentialStore`] - Trait over an opaque secure key/value store
//! - [`MemoryCredentialStore`] - In-memory store for tests and ephemeral hosts
//! - [`FileCredentialStore`] - JSON file store under the user's data directory
//!
//! Hosts with an OS keychain implement [`CredentialStore`] on top of it and
//! hand that to the providers instead.
//!
//! ## Example
//!
//! ```no_run
//! use tunebridge_credentials::{keys, CredentialStore, FileCredentialStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FileCredentialStore::with_default_path()?;
//!
//! if store.exists(keys::ACCESS_TOKEN).await {
//!     println!("Found a stored access token");
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use directories::ProjectDirs;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;
use tunebridge_core::MusicServiceError;

/// Well-known keys used for the persisted token state.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    /// RFC 3339 timestamp at which the access token stops being valid.
    pub const TOKEN_EXPIRY: &str = "tokenExpiry";
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Credential store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl From<StorageError> for MusicServiceError {
    fn from(err: StorageError) -> Self {
        MusicServiceError::TokenStorage(err.to_string())
    }
}

// ============================================================================
// CredentialStore Trait
// ============================================================================

/// An opaque key/value store for secrets.
///
/// Implementations serialize their own mutations; callers may share one
/// store between tasks.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    async fn store(&self, value: &str, key: &str) -> Result<()>;

    /// Retrieve the value stored under `key`.
    ///
    /// Read failures are reported as absence.
    async fn retrieve(&self, key: &str) -> Option<String>;

    /// Check whether a value is stored under `key`.
    async fn exists(&self, key: &str) -> bool;

    /// Delete the value stored under `key`.
    ///
    /// Returns `Ok(false)` if nothing was stored; absence is not an error.
    async fn delete(&self, key: &str) -> Result<bool>;
}

// ============================================================================
// In-Memory Implementation
// ============================================================================

/// Credential store that keeps values in memory only.
///
/// # Example
///
/// ```
/// use tunebridge_credentials::{CredentialStore, MemoryCredentialStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryCredentialStore::new().with_value("accessToken", "BQD...");
/// assert_eq!(store.retrieve("accessToken").await.as_deref(), Some("BQD..."));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value to the store.
    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.get_mut().insert(key.to_string(), value.to_string());
        self
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn store(&self, value: &str, key: &str) -> Result<()> {
        self.values.lock().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Option<String> {
        self.values.lock().await.get(key).cloned()
    }

    async fn exists(&self, key: &str) -> bool {
        self.values.lock().await.contains_key(key)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.values.lock().await.remove(key).is_some())
    }
}

// ============================================================================
// File Implementation
// ============================================================================

/// Credential store backed by a JSON file.
///
/// The whole map is rewritten on each mutation through a temporary file and
/// a rename, so readers never observe a half-written file. On Unix the file
/// is readable by the owner only.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    /// Loaded lazily on first access.
    cache: Mutex<Option<HashMap<String, String>>>,
}

impl FileCredentialStore {
    /// Create a store backed by the file at `path`.
    ///
    /// The file does not need to exist yet.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cache: Mutex::new(None),
        }
    }

    /// Create a store at the platform default location.
    ///
    /// See [`default_store_path`].
    pub fn with_default_path() -> Result<Self> {
        Ok(Self::new(default_store_path()?))
    }

    /// Get the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(&self, values: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(values)?;
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, json).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&tmp_path, &self.path).await?;
        debug!("Persisted {} credential(s) to {:?}", values.len(), self.path);
        Ok(())
    }

    /// Run `f` against the loaded map while holding the store lock.
    async fn with_values<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, String>) -> (T, bool),
    ) -> Result<T> {
        let mut guard = self.cache.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        let values = guard.get_or_insert_with(HashMap::new);

        let mut updated = values.clone();
        let (result, changed) = f(&mut updated);
        if changed {
            self.persist(&updated).await?;
            *values = updated;
        }
        Ok(result)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn store(&self, value: &str, key: &str) -> Result<()> {
        self.with_values(|values| {
            let previous = values.insert(key.to_string(), value.to_string());
            ((), previous.as_deref() != Some(value))
        })
        .await
    }

    async fn retrieve(&self, key: &str) -> Option<String> {
        match self.with_values(|values| (values.get(key).cloned(), false)).await {
            Ok(value) => value,
            Err(e) => {
                debug!("Failed to read credential store {:?}: {}", self.path, e);
                None
            }
        }
    }

    async fn exists(&self, key: &str) -> bool {
        self.retrieve(key).await.is_some()
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.with_values(|values| {
            let removed = values.remove(key).is_some();
            (removed, removed)
        })
        .await
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Get the default credential file path.
///
/// Returns `$XDG_DATA_HOME/tunebridge/credentials.json` or the platform
/// equivalent.
pub fn default_store_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "raibid-labs", "tunebridge").ok_or_else(|| {
        StorageError::Unavailable("Failed to determine project directories".to_string())
    })?;

    Ok(dirs.data_dir().join("credentials.json"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_store_path() {
        let path = default_store_path().unwrap();
        assert!(path.to_string_lossy().contains("tunebridge"));
        assert!(path.ends_with("credentials.json"));
    }

    #[tokio::test]
    async fn test_memory_store_lifecycle() {
        let store = MemoryCredentialStore::new();
        assert!(!store.exists(keys::ACCESS_TOKEN).await);

        store.store("token-1", keys::ACCESS_TOKEN).await.unwrap();
        assert!(store.exists(keys::ACCESS_TOKEN).await);
        assert_eq!(store.retrieve(keys::ACCESS_TOKEN).await.as_deref(), Some("token-1"));

        store.store("token-2", keys::ACCESS_TOKEN).await.unwrap();
        assert_eq!(store.retrieve(keys::ACCESS_TOKEN).await.as_deref(), Some("token-2"));

        assert!(store.delete(keys::ACCESS_TOKEN).await.unwrap());
        assert!(!store.delete(keys::ACCESS_TOKEN).await.unwrap());
        assert!(store.retrieve(keys::ACCESS_TOKEN).await.is_none());
    }

    #[tokio::test]
    async fn test_memory_store_builder() {
        let store = MemoryCredentialStore::new()
            .with_value(keys::ACCESS_TOKEN, "a")
            .with_value(keys::REFRESH_TOKEN, "r");

        assert_eq!(store.retrieve(keys::ACCESS_TOKEN).await.as_deref(), Some("a"));
        assert_eq!(store.retrieve(keys::REFRESH_TOKEN).await.as_deref(), Some("r"));
        assert!(!store.exists(keys::TOKEN_EXPIRY).await);
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));

        assert!(store.retrieve(keys::ACCESS_TOKEN).await.is_none());
        assert!(!store.delete(keys::ACCESS_TOKEN).await.unwrap());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let store = FileCredentialStore::new(path.clone());
        store.store("BQD-access", keys::ACCESS_TOKEN).await.unwrap();
        store.store("2030-01-01T00:00:00Z", keys::TOKEN_EXPIRY).await.unwrap();

        let reopened = FileCredentialStore::new(path);
        assert_eq!(reopened.retrieve(keys::ACCESS_TOKEN).await.as_deref(), Some("BQD-access"));
        assert!(reopened.exists(keys::TOKEN_EXPIRY).await);

        assert!(reopened.delete(keys::ACCESS_TOKEN).await.unwrap());
        let again = FileCredentialStore::new(reopened.path().to_path_buf());
        assert!(!again.exists(keys::ACCESS_TOKEN).await);
        assert!(again.exists(keys::TOKEN_EXPIRY).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        store.store("secret", keys::REFRESH_TOKEN).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileCredentialStore::new(path);
        assert!(store.retrieve(keys::ACCESS_TOKEN).await.is_none());

        let result = store.store("value", keys::ACCESS_TOKEN).await;
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_storage_error_conversion() {
        let err: MusicServiceError = StorageError::Unavailable("locked".to_string()).into();
        assert!(matches!(err, MusicServiceError::TokenStorage(_)));
    }
}
