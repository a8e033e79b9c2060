//! Session persistence
//!
//! The session is two entries: the bearer `token` and the serialized `user`
//! profile. Three backends implement [`SessionPersistence`]:
//!
//! - [`FileSessionStore`] -- a JSON file in the platform data directory
//! - [`KeyringSessionStore`] -- the OS native credential store (Keychain on
//!   macOS, Secret Service on Linux, Windows Credential Manager on Windows)
//! - [`MemorySessionStore`] -- in-process only, for tests
//!
//! Clearing always removes both entries.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::api::types::UserProfile;
use crate::config::{SessionBackend, SessionConfig};
use crate::error::{RemindrError, Result};

/// The persisted form of a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredSession {
    /// Opaque bearer token
    pub token: String,
    /// Cached profile; absent if the process stopped between receiving the
    /// token and fetching the profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

/// Storage for the current session
pub trait SessionPersistence: Send + Sync {
    /// Load the stored session, `Ok(None)` when nothing is stored
    fn load(&self) -> Result<Option<StoredSession>>;

    /// Replace the stored session
    fn save(&self, session: &StoredSession) -> Result<()>;

    /// Remove token and user; a no-op when nothing is stored
    fn clear(&self) -> Result<()>;
}

/// Open the backend selected by configuration
pub fn open(config: &SessionConfig) -> Result<Arc<dyn SessionPersistence>> {
    match config.backend {
        SessionBackend::File => {
            let path = match &config.file_path {
                Some(path) => path.clone(),
                None => FileSessionStore::default_path()?,
            };
            tracing::debug!("Using session file {}", path.display());
            Ok(Arc::new(FileSessionStore::new(path)))
        }
        SessionBackend::Keyring => {
            tracing::debug!("Using keyring session storage");
            Ok(Arc::new(KeyringSessionStore::default()))
        }
    }
}

// ---------------------------------------------------------------------------
// FileSessionStore
// ---------------------------------------------------------------------------

/// JSON file backend
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Use the given file path
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/session.json` for the current user
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "remindr", "remindr").ok_or_else(|| {
            RemindrError::Session("Could not determine data directory".to_string())
        })?;
        Ok(proj_dirs.data_dir().join("session.json"))
    }

    /// Path of the session file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionPersistence for FileSessionStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RemindrError::Io(e).into()),
        };
        match serde_json::from_str(&contents) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(
                    "Discarding unreadable session file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RemindrError::Session(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        let json = serde_json::to_string_pretty(session)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;

        // The creation mode does not apply to a file that already existed
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(json.as_bytes())?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RemindrError::Io(e).into()),
        }
    }
}

// ---------------------------------------------------------------------------
// KeyringSessionStore
// ---------------------------------------------------------------------------

/// OS keyring backend.
///
/// The token and the serialized user are separate keyring entries under one
/// service name.
#[derive(Debug, Clone)]
pub struct KeyringSessionStore {
    service: String,
}

impl Default for KeyringSessionStore {
    fn default() -> Self {
        Self::new("remindr-session")
    }
}

impl KeyringSessionStore {
    /// Use a custom keyring service name
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        Ok(keyring::Entry::new(&self.service, key).map_err(RemindrError::Keyring)?)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(RemindrError::Keyring(e).into()),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_password() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(RemindrError::Keyring(e).into()),
        }
    }
}

impl SessionPersistence for KeyringSessionStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        let Some(token) = self.get("token")? else {
            return Ok(None);
        };
        let user = match self.get("user")? {
            Some(json) => serde_json::from_str(&json).ok(),
            None => None,
        };
        Ok(Some(StoredSession { token, user }))
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        self.entry("token")?
            .set_password(&session.token)
            .map_err(RemindrError::Keyring)?;
        match &session.user {
            Some(user) => {
                let json = serde_json::to_string(user)?;
                self.entry("user")?
                    .set_password(&json)
                    .map_err(RemindrError::Keyring)?;
            }
            None => self.delete("user")?,
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.delete("token")?;
        self.delete("user")
    }
}

// ---------------------------------------------------------------------------
// MemorySessionStore
// ---------------------------------------------------------------------------

/// In-process backend; clones share the same slot
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    slot: Arc<Mutex<Option<StoredSession>>>,
}

impl MemorySessionStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a session
    pub fn with_session(session: StoredSession) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(session))),
        }
    }

    /// Current contents, for assertions
    pub fn snapshot(&self) -> Option<StoredSession> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SessionPersistence for MemorySessionStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        Ok(self.snapshot())
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> StoredSession {
        StoredSession {
            token: "tok-123".to_string(),
            user: Some(UserProfile {
                id: 3,
                email: "ada@example.com".to_string(),
                full_name: Some("Ada".to_string()),
                created_at: chrono::DateTime::from_timestamp(1_800_000_000, 0)
                    .expect("valid timestamp"),
            }),
        }
    }

    #[test]
    fn test_file_store_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_save_load_clear() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("session.json"));

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        assert!(!store.path().exists());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        store.save(&sample()).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_tightens_existing_file() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileSessionStore::new(path.clone());
        store.save(&sample()).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().unwrap(), Some(sample()));
    }

    #[test]
    fn test_file_store_discards_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileSessionStore::new(path);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemorySessionStore::new();
        let shared = store.clone();
        store.save(&sample()).unwrap();
        assert_eq!(shared.snapshot(), Some(sample()));
        store.clear().unwrap();
        assert!(shared.load().unwrap().is_none());
    }

    #[test]
    fn test_open_uses_configured_file() {
        let dir = TempDir::new().unwrap();
        let config = SessionConfig {
            backend: SessionBackend::File,
            file_path: Some(dir.path().join("s.json")),
        };
        let store = open(&config).unwrap();
        store.save(&sample()).unwrap();
        assert!(dir.path().join("s.json").exists());
    }

    #[test]
    #[ignore = "requires system keyring"]
    fn test_keyring_store_roundtrip() {
        let store = KeyringSessionStore::new("remindr-session-test");
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
