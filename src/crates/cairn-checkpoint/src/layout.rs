//! On-disk layout, scope discovery, and document I/O
//!
//! Checkpoints live under a base directory, one subtree per scope:
//!
//! ```text
//! <base>/
//! ├── workspace-1/
//! │   ├── agent-a/
//! │   │   ├── index.json      (one IndexEntry per record)
//! │   │   ├── <id>.json       (full CheckpointRecord)
//! │   │   └── <id>.json
//! │   └── agent-b/
//! │       └── index.json
//! └── workspace-2/
//!     └── agent-a/
//!         └── ...
//! ```
//!
//! The global registry mirrors a single scope directory at its own fixed root.
//! Documents are pretty-printed JSON, written atomically through a `.tmp` sibling
//! so readers never observe a half-written file.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{CheckpointError, Result};

/// File name of the per-directory index document
pub const INDEX_FILE: &str = "index.json";

/// The (workspace, agent) pair that owns one checkpoint store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    pub workspace_id: String,
    pub agent_id: String,
}

impl Scope {
    pub fn new(workspace_id: String, agent_id: String) -> Self {
        Self {
            workspace_id,
            agent_id,
        }
    }

    /// Reject scope components that are empty or could escape the base directory
    pub fn validate(&self) -> Result<()> {
        if !is_safe_component(&self.workspace_id) {
            return Err(CheckpointError::Validation(format!(
                "invalid workspace id: {:?}",
                self.workspace_id
            )));
        }
        if !is_safe_component(&self.agent_id) {
            return Err(CheckpointError::Validation(format!(
                "invalid agent id: {:?}",
                self.agent_id
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.workspace_id, self.agent_id)
    }
}

/// Root directories for scoped stores and the global registry
#[derive(Debug, Clone)]
pub struct StorageLayout {
    base_dir: PathBuf,
    global_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(base_dir: PathBuf, global_dir: PathBuf) -> Self {
        Self {
            base_dir,
            global_dir,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn global_dir(&self) -> &Path {
        &self.global_dir
    }

    /// Directory holding one scope's index and record documents
    pub fn scope_dir(&self, scope: &Scope) -> PathBuf {
        self.base_dir.join(&scope.workspace_id).join(&scope.agent_id)
    }

    /// Walk the base directory and return every scope that has a directory,
    /// sorted by workspace then agent for a deterministic migration order.
    pub async fn discover_scopes(&self) -> Result<Vec<Scope>> {
        let mut scopes = Vec::new();
        for workspace_id in list_subdirectories(&self.base_dir).await? {
            let workspace_dir = self.base_dir.join(&workspace_id);
            for agent_id in list_subdirectories(&workspace_dir).await? {
                scopes.push(Scope::new(workspace_id.clone(), agent_id));
            }
        }
        scopes.sort_by(|a, b| {
            (&a.workspace_id, &a.agent_id).cmp(&(&b.workspace_id, &b.agent_id))
        });
        debug!("Discovered {} checkpoint scopes", scopes.len());
        Ok(scopes)
    }
}

/// Path of the index document inside a store directory
pub fn index_path(dir: &Path) -> PathBuf {
    dir.join(INDEX_FILE)
}

/// Path of one record's document inside a store directory
pub fn record_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{id}.json"))
}

/// Whether an ID is usable as a record file name
///
/// A single path component with no separators or dot-prefixes, and not the
/// reserved index stem. Anything else is treated as not found rather than
/// touching the filesystem.
pub fn is_safe_id(id: &str) -> bool {
    is_safe_component(id) && id != "index"
}

fn is_safe_component(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Subdirectory names under `dir`, skipping files and non-UTF8 names.
/// A missing directory yields an empty list.
async fn list_subdirectories(dir: &Path) -> Result<Vec<String>> {
    let mut reader = match tokio::fs::read_dir(dir).await {
        Ok(reader) => reader,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CheckpointError::storage(dir, e)),
    };

    let mut names = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| CheckpointError::storage(dir, e))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| CheckpointError::storage(entry.path(), e))?;
        if !file_type.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

/// Write a document as pretty-printed JSON through a `.tmp` sibling
pub(crate) async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CheckpointError::storage(parent, e))?;
    }

    let payload = serde_json::to_string_pretty(value)?;
    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, payload.as_bytes())
        .await
        .map_err(|e| CheckpointError::storage(&tmp_path, e))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| CheckpointError::storage(path, e))?;
    Ok(())
}

/// Read a JSON document, returning `None` when the file does not exist
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CheckpointError::storage(path, e)),
    };
    Ok(Some(serde_json::from_str(&contents)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_safe_ids() {
        assert!(is_safe_id("0b5d8a3e-9f2c-4e7a-b1d6-3c8f5a2e9d41"));
        assert!(is_safe_id("checkpoint_7"));

        assert!(!is_safe_id(""));
        assert!(!is_safe_id("index"));
        assert!(!is_safe_id(".."));
        assert!(!is_safe_id("../escape"));
        assert!(!is_safe_id("a/b"));
        assert!(!is_safe_id("a\\b"));
        assert!(!is_safe_id(".hidden"));
    }

    #[test]
    fn test_scope_validation() {
        assert!(Scope::new("workspace-1".to_string(), "agent_a".to_string())
            .validate()
            .is_ok());
        assert!(Scope::new("".to_string(), "agent".to_string())
            .validate()
            .is_err());
        assert!(Scope::new("ws".to_string(), "../other".to_string())
            .validate()
            .is_err());
    }

    #[test]
    fn test_paths_inside_scope_dir() {
        let layout =
            StorageLayout::new(PathBuf::from("/data/scoped"), PathBuf::from("/data/global"));
        let scope = Scope::new("ws-1".to_string(), "agent-a".to_string());

        let dir = layout.scope_dir(&scope);
        assert_eq!(dir, PathBuf::from("/data/scoped/ws-1/agent-a"));
        assert_eq!(index_path(&dir), dir.join("index.json"));
        assert_eq!(record_path(&dir, "abc"), dir.join("abc.json"));
    }

    #[tokio::test]
    async fn test_write_and_read_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("doc.json");

        write_json_atomic(&path, &vec!["a", "b"]).await.unwrap();
        let back: Option<Vec<String>> = read_json(&path).await.unwrap();
        assert_eq!(back, Some(vec!["a".to_string(), "b".to_string()]));

        // No stray temp file left behind
        assert!(!tmp.path().join("nested").join("doc.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_missing_file_is_none() {
        let tmp = TempDir::new().unwrap();
        let result: Option<Vec<String>> =
            read_json(&tmp.path().join("absent.json")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_read_corrupt_file_is_serialization_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let result: Result<Option<Vec<String>>> = read_json(&path).await;
        assert!(matches!(result, Err(CheckpointError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_discover_scopes_sorted() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("scoped");
        for (ws, agent) in [("ws-b", "agent-2"), ("ws-a", "agent-9"), ("ws-a", "agent-1")] {
            tokio::fs::create_dir_all(base.join(ws).join(agent))
                .await
                .unwrap();
        }
        // Stray file at workspace level is ignored
        tokio::fs::write(base.join("notes.txt"), b"x").await.unwrap();

        let layout = StorageLayout::new(base, tmp.path().join("global"));
        let scopes = layout.discover_scopes().await.unwrap();

        assert_eq!(
            scopes,
            vec![
                Scope::new("ws-a".to_string(), "agent-1".to_string()),
                Scope::new("ws-a".to_string(), "agent-9".to_string()),
                Scope::new("ws-b".to_string(), "agent-2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_discover_scopes_missing_base_is_empty() {
        let tmp = TempDir::new().unwrap();
        let layout = StorageLayout::new(tmp.path().join("nowhere"), tmp.path().join("global"));
        assert!(layout.discover_scopes().await.unwrap().is_empty());
    }
}
