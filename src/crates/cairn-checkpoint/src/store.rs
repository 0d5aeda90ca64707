//! Checkpoint storage contract and the file-backed store
//!
//! This module defines the **[`CheckpointStore`]** trait - the storage abstraction every
//! checkpoint backend implements - and **[`FileCheckpointStore`]**, the document-file
//! implementation that owns one scope directory.
//!
//! # Overview
//!
//! A store provides four operations over the records it owns:
//!
//! - **save** - Validate a draft, assign an ID, persist the record and its index entry
//! - **list** - Enumerate index entries, newest first, without loading message payloads
//! - **get** - Load one full record by ID
//! - **delete** - Remove a record and its index entry
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  CheckpointService                            │
//! │  • one cached FileCheckpointStore per scope   │
//! └────────────────┬─────────────────────────────┘
//!                  │ CheckpointStore trait
//!                  ↓
//! ┌──────────────────────────────────────────────┐
//! │  FileCheckpointStore (one scope directory)    │
//! │                                               │
//! │  save ──► write <id>.json                     │
//! │       ──► read index.json ─ append ─ rewrite  │
//! │             (exclusive section per store)     │
//! │                                               │
//! │  list ──► read index.json, sort newest first  │
//! │  get  ──► read <id>.json                      │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Index Consistency
//!
//! The index document is a shared mutable resource with no lock manager on disk.
//! Each store serializes its own index mutations through an async mutex held across
//! the read-merge-write section, and re-reads the index under that lock before
//! merging, so writers in the same process never lose each other's entries. Two
//! *processes* writing the same scope can still interleave between read and write:
//! both record documents land, but the later index write wins, leaving the loser's
//! record invisible to `list` though still retrievable by `get`.
//!
//! # Corrupt Index Recovery
//!
//! An unparsable index never fails a listing: `list` logs a warning and returns an
//! empty vector, leaving the file on disk untouched for operators. The next
//! successful save rebuilds the index from the merged in-memory view.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::{CheckpointError, Result};
use crate::layout::{index_path, is_safe_id, read_json, record_path, write_json_atomic};
use crate::record::{
    sort_newest_first, CheckpointDraft, CheckpointId, CheckpointRecord, IndexEntry, ModelCatalog,
};

/// Storage contract shared by scoped stores and the global registry
///
/// All methods run to completion before returning; there is no streaming or
/// partial-result interface. Implementations must be safe to share across tasks.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Validate a draft and persist it as a new record
    ///
    /// # Returns
    ///
    /// The identifier assigned to the record. Nothing is written when validation
    /// fails.
    async fn save(&self, draft: CheckpointDraft) -> Result<CheckpointId>;

    /// Enumerate this store's records, newest first
    ///
    /// # Returns
    ///
    /// Index entries sorted by creation time descending. A missing or unreadable
    /// index yields an empty vector, never an error.
    async fn list(&self) -> Result<Vec<IndexEntry>>;

    /// Load one full record
    ///
    /// Reads the record document directly without consulting the index.
    ///
    /// # Returns
    ///
    /// The record, or `None` (not an error) if it does not exist.
    async fn get(&self, id: &str) -> Result<Option<CheckpointRecord>>;

    /// Remove a record document and its index entry
    ///
    /// Succeeds when either side is present, leaving the store self-consistent
    /// afterwards.
    ///
    /// # Returns
    ///
    /// `false` only when neither the record document nor an index entry existed.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// Document-file store owning one directory of checkpoints
///
/// Holds `index.json` plus one `<id>.json` per record. All index mutations go
/// through this instance's mutex, so a store must be the single in-process owner
/// of its directory; [`CheckpointService`](crate::service::CheckpointService)
/// guarantees that by caching one store per scope.
pub struct FileCheckpointStore {
    dir: PathBuf,
    catalog: ModelCatalog,
    index_lock: Mutex<()>,
}

impl FileCheckpointStore {
    /// Open a store at a directory, creating nothing until the first write
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            catalog: ModelCatalog::default(),
            index_lock: Mutex::new(()),
        }
    }

    /// Replace the model catalog used by draft validation
    pub fn with_catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Directory this store owns
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub(crate) async fn lock_index(&self) -> MutexGuard<'_, ()> {
        self.index_lock.lock().await
    }

    /// Read the index, treating a missing or unparsable document as empty.
    /// I/O failures other than absence still propagate.
    pub(crate) async fn load_index_lenient(&self) -> Result<Vec<IndexEntry>> {
        match read_json::<Vec<IndexEntry>>(&index_path(&self.dir)).await {
            Ok(Some(entries)) => Ok(entries),
            Ok(None) => Ok(Vec::new()),
            Err(CheckpointError::Serialization(e)) => {
                warn!(
                    "Unreadable checkpoint index at {}, listing as empty: {}",
                    self.dir.display(),
                    e
                );
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn persist_index(&self, entries: &[IndexEntry]) -> Result<()> {
        write_json_atomic(&index_path(&self.dir), &entries).await
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, draft: CheckpointDraft) -> Result<CheckpointId> {
        let record = CheckpointRecord::from_draft(draft, &self.catalog)?;
        let entry = IndexEntry::from(&record);
        let id = record.id.clone();

        let _guard = self.index_lock.lock().await;

        // Re-read under the lock so entries appended since our last view survive
        let mut entries = self.load_index_lenient().await?;
        if entries.iter().any(|existing| existing.id == id) {
            return Err(CheckpointError::storage(
                record_path(&self.dir, &id),
                std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!("duplicate checkpoint id: {id}"),
                ),
            ));
        }

        // Record document first, so the index never references a missing document
        write_json_atomic(&record_path(&self.dir, &id), &record).await?;
        entries.push(entry);
        self.persist_index(&entries).await?;

        debug!("Saved checkpoint {} to {}", id, self.dir.display());
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<IndexEntry>> {
        let mut entries = self.load_index_lenient().await?;
        sort_newest_first(&mut entries);
        Ok(entries)
    }

    async fn get(&self, id: &str) -> Result<Option<CheckpointRecord>> {
        if !is_safe_id(id) {
            return Ok(None);
        }
        read_json(&record_path(&self.dir, id)).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        if !is_safe_id(id) {
            return Ok(false);
        }

        let _guard = self.index_lock.lock().await;

        let path = record_path(&self.dir, id);
        let document_removed = match tokio::fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(CheckpointError::storage(path, e)),
        };

        let mut entries = self.load_index_lenient().await?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        let entry_removed = entries.len() != before;
        if entry_removed {
            self.persist_index(&entries).await?;
        }

        if document_removed || entry_removed {
            debug!("Deleted checkpoint {} from {}", id, self.dir.display());
        }
        Ok(document_removed || entry_removed)
    }
}
