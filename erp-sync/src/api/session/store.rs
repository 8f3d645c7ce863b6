//! Session persistence keyed by API base URL
//!
//! [`SessionStore`] is the contract the session manager depends on. The
//! file-backed implementation keeps a JSON list of sessions shared by every
//! process on the host; [`MemorySessionStore`] is process-local.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;

use super::models::{Session, normalize_base_url};

/// Keyed persistence of sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Session stored for a base URL, if any
    async fn load(&self, base_url: &str) -> Option<Session>;

    /// Insert or update the session for its base URL
    async fn save(&self, session: &Session) -> bool;

    /// Forget the session for a base URL
    async fn remove(&self, base_url: &str) -> bool;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, base_url: &str) -> Option<Session> {
        let key = normalize_base_url(base_url);
        let sessions = self.sessions.lock().ok()?;
        sessions.get(&key).cloned()
    }

    async fn save(&self, session: &Session) -> bool {
        let Ok(mut sessions) = self.sessions.lock() else {
            return false;
        };
        sessions.insert(normalize_base_url(&session.base_url), session.clone());
        true
    }

    async fn remove(&self, base_url: &str) -> bool {
        let Ok(mut sessions) = self.sessions.lock() else {
            return false;
        };
        sessions.remove(&normalize_base_url(base_url)).is_some()
    }
}

/// Locks shared by every `FileSessionStore` in the process, one per path
static PATH_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Keyed on the absolute path so relative and absolute spellings of one
/// file share a lock
fn lock_for(path: &Path) -> Arc<tokio::sync::Mutex<()>> {
    let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut locks = PATH_LOCKS.lock().unwrap_or_else(|e| e.into_inner());
    locks
        .entry(key)
        .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
        .clone()
}

/// On-disk layouts: the current list and the older single-object file
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredSessions {
    List(Vec<Session>),
    Single(Session),
}

enum FileContents {
    Sessions(Vec<Session>),
    /// Old single-object layout; must be rewritten as a list
    Legacy(Vec<Session>),
    Malformed,
}

/// JSON file store shared by all processes on the host
///
/// Every read-modify-write runs under a per-path lock, and writes go to a
/// temporary file that is renamed over the original.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock = lock_for(&path);
        Self { path, lock }
    }

    /// Store at the default location in the user's config directory
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(default_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> FileContents {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return FileContents::Sessions(Vec::new());
            }
            Err(e) => {
                log::warn!("Failed to read session file {}: {}", self.path.display(), e);
                return FileContents::Malformed;
            }
        };

        if content.trim().is_empty() {
            return FileContents::Sessions(Vec::new());
        }

        match serde_json::from_str::<StoredSessions>(&content) {
            Ok(StoredSessions::List(sessions)) => FileContents::Sessions(sessions),
            Ok(StoredSessions::Single(session)) => FileContents::Legacy(vec![session]),
            Err(e) => {
                log::warn!(
                    "Ignoring malformed session file {}: {}",
                    self.path.display(),
                    e
                );
                FileContents::Malformed
            }
        }
    }

    async fn write(&self, sessions: &[Session]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(sessions).context("Failed to serialize sessions")?;
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sessions.json".to_string());
        let tmp = self
            .path
            .with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("Failed to replace {}", self.path.display()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, base_url: &str) -> Option<Session> {
        let _guard = self.lock.lock().await;
        let key = normalize_base_url(base_url);

        let sessions = match self.read().await {
            FileContents::Sessions(sessions) => sessions,
            FileContents::Legacy(sessions) => {
                log::info!("Migrating session file {} to list format", self.path.display());
                if let Err(e) = self.write(&sessions).await {
                    log::warn!("Session file migration failed: {:#}", e);
                }
                sessions
            }
            FileContents::Malformed => return None,
        };

        sessions
            .into_iter()
            .find(|s| normalize_base_url(&s.base_url) == key)
    }

    async fn save(&self, session: &Session) -> bool {
        let _guard = self.lock.lock().await;
        let key = normalize_base_url(&session.base_url);

        let mut sessions = match self.read().await {
            FileContents::Sessions(sessions) | FileContents::Legacy(sessions) => sessions,
            FileContents::Malformed => {
                log::warn!("Replacing malformed session file {}", self.path.display());
                Vec::new()
            }
        };

        match sessions
            .iter_mut()
            .find(|s| normalize_base_url(&s.base_url) == key)
        {
            Some(existing) => *existing = session.clone(),
            None => sessions.push(session.clone()),
        }

        match self.write(&sessions).await {
            Ok(()) => {
                log::debug!("Saved session for {}", key);
                true
            }
            Err(e) => {
                log::warn!("Failed to save session for {}: {:#}", key, e);
                false
            }
        }
    }

    async fn remove(&self, base_url: &str) -> bool {
        let _guard = self.lock.lock().await;
        let key = normalize_base_url(base_url);

        let mut sessions = match self.read().await {
            FileContents::Sessions(sessions) | FileContents::Legacy(sessions) => sessions,
            FileContents::Malformed => return false,
        };
        let before = sessions.len();
        sessions.retain(|s| normalize_base_url(&s.base_url) != key);
        if sessions.len() == before {
            return false;
        }

        match self.write(&sessions).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to remove session for {}: {:#}", key, e);
                false
            }
        }
    }
}

/// `<config dir>/erp-sync/sessions.json`
pub fn default_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("Could not determine the user config directory")?;
    Ok(dir.join("erp-sync").join("sessions.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemorySessionStore::new();
        assert!(store.load("https://a.example/rest").await.is_none());

        assert!(store.save(&Session::new("https://a.example/rest/", "one")).await);
        let loaded = store.load("https://a.example/rest").await.unwrap();
        assert_eq!(loaded.session_id, "one");

        assert!(store.remove("https://a.example/rest").await);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_file_store_keeps_entries_per_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("sessions.json"));

        assert!(store.save(&Session::new("https://a.example/rest", "a1")).await);
        assert!(store.save(&Session::new("https://b.example/rest", "b1")).await);
        assert!(store.save(&Session::new("https://a.example/rest", "a2")).await);

        assert_eq!(store.load("https://a.example/rest").await.unwrap().session_id, "a2");
        assert_eq!(store.load("https://b.example/rest").await.unwrap().session_id, "b1");

        let content = std::fs::read_to_string(store.path()).unwrap();
        let entries: Vec<serde_json::Value> = serde_json::from_str(&content).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn test_file_store_migrates_single_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(
            &path,
            json!({
                "base_url": "https://a.example/rest",
                "session_id": "legacy",
                "timestamp": "2024-05-01T10:00:00Z"
            })
            .to_string(),
        )
        .unwrap();

        let store = FileSessionStore::new(&path);
        let loaded = store.load("https://a.example/rest").await.unwrap();
        assert_eq!(loaded.session_id, "legacy");

        let migrated: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(migrated.is_array());
        assert_eq!(migrated[0]["session_id"], "legacy");
    }

    #[tokio::test]
    async fn test_file_store_malformed_is_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileSessionStore::new(&path);
        assert!(store.load("https://a.example/rest").await.is_none());

        assert!(store.save(&Session::new("https://a.example/rest", "fresh")).await);
        assert_eq!(store.load("https://a.example/rest").await.unwrap().session_id, "fresh");
    }

    #[tokio::test]
    async fn test_file_store_concurrent_writers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = FileSessionStore::new(&path);
            handles.push(tokio::spawn(async move {
                store
                    .save(&Session::new(format!("https://host{}.example/rest", i), format!("s{}", i)))
                    .await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        let store = FileSessionStore::new(&path);
        for i in 0..16 {
            let loaded = store.load(&format!("https://host{}.example/rest", i)).await.unwrap();
            assert_eq!(loaded.session_id, format!("s{}", i));
        }
    }

    #[tokio::test]
    async fn test_file_store_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("sessions.json"));

        assert!(!store.remove("https://a.example/rest").await);
        assert!(store.save(&Session::new("https://a.example/rest", "a1")).await);
        assert!(store.remove("https://a.example/rest").await);
        assert!(store.load("https://a.example/rest").await.is_none());
    }

    #[test]
    fn test_relative_and_absolute_paths_share_lock() {
        let relative = FileSessionStore::new("erp-sync-lock-test.json");
        let absolute = FileSessionStore::new(
            std::env::current_dir().unwrap().join("erp-sync-lock-test.json"),
        );
        assert!(Arc::ptr_eq(&relative.lock, &absolute.lock));

        let other = FileSessionStore::new("erp-sync-other-lock-test.json");
        assert!(!Arc::ptr_eq(&relative.lock, &other.lock));
    }
}
