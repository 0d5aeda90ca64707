//! Global checkpoint registry
//!
//! The registry is a [`FileCheckpointStore`] at a single well-known root shared by
//! all scopes. It honors the same [`CheckpointStore`] contract for normal CRUD, and
//! additionally exposes [`RegistryBatch`] - the bulk-insert surface migration uses.
//!
//! A batch loads the global index once, then stages entries in memory while record
//! documents are written immediately. [`RegistryBatch::flush`] persists the staged
//! index (the durability unit between scopes) and [`RegistryBatch::finish`] writes
//! the final index sorted newest first. The batch holds the registry's index lock
//! for its whole lifetime, so no other writer in the process can interleave with a
//! running migration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::MutexGuard;
use tracing::debug;

use crate::error::Result;
use crate::layout::{record_path, write_json_atomic};
use crate::record::{
    dedup_by_id, sort_newest_first, CheckpointDraft, CheckpointId, CheckpointRecord, IndexEntry,
    ModelCatalog,
};
use crate::store::{CheckpointStore, FileCheckpointStore};

/// Store over the single fixed root all scopes migrate into
pub struct GlobalCheckpointRegistry {
    store: FileCheckpointStore,
}

impl GlobalCheckpointRegistry {
    /// Open the registry at its root directory
    pub fn new(dir: PathBuf) -> Self {
        Self {
            store: FileCheckpointStore::new(dir),
        }
    }

    /// Replace the model catalog used when saving directly into the registry
    pub fn with_catalog(mut self, catalog: ModelCatalog) -> Self {
        self.store = self.store.with_catalog(catalog);
        self
    }

    /// Registry root directory
    pub fn dir(&self) -> &Path {
        self.store.dir()
    }

    /// Begin a bulk insert, taking exclusive ownership of the index
    ///
    /// Loads the index once; an unreadable index is treated as empty and rebuilt
    /// when the batch persists.
    pub async fn begin_batch(&self) -> Result<RegistryBatch<'_>> {
        let guard = self.store.lock_index().await;
        let entries = self.store.load_index_lenient().await?;
        let ids = entries.iter().map(|entry| entry.id.clone()).collect();
        Ok(RegistryBatch {
            registry: self,
            _guard: guard,
            entries,
            ids,
            dirty: false,
        })
    }
}

#[async_trait]
impl CheckpointStore for GlobalCheckpointRegistry {
    async fn save(&self, draft: CheckpointDraft) -> Result<CheckpointId> {
        self.store.save(draft).await
    }

    async fn list(&self) -> Result<Vec<IndexEntry>> {
        self.store.list().await
    }

    async fn get(&self, id: &str) -> Result<Option<CheckpointRecord>> {
        self.store.get(id).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }
}

/// In-progress bulk insert into the registry
///
/// Staged index entries live in memory until [`flush`](Self::flush) or
/// [`finish`](Self::finish); record documents are written as they are inserted, so
/// an interrupted batch leaves the registry consistent with its last flush and the
/// next run re-copies only what the persisted index does not mention.
pub struct RegistryBatch<'a> {
    registry: &'a GlobalCheckpointRegistry,
    _guard: MutexGuard<'a, ()>,
    entries: Vec<IndexEntry>,
    ids: HashSet<CheckpointId>,
    dirty: bool,
}

impl RegistryBatch<'_> {
    /// Whether a record with this ID is already in the registry or staged
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Write a record document and stage its index entry
    ///
    /// A record whose ID is already known is left untouched.
    pub async fn insert(&mut self, record: CheckpointRecord) -> Result<()> {
        if !self.ids.insert(record.id.clone()) {
            return Ok(());
        }
        write_json_atomic(&record_path(self.registry.dir(), &record.id), &record).await?;
        self.entries.push(IndexEntry::from(&record));
        self.dirty = true;
        Ok(())
    }

    /// Persist the staged index if anything changed since the last flush
    pub async fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.registry.store.persist_index(&self.entries).await?;
        self.dirty = false;
        debug!(
            "Flushed global index with {} entries to {}",
            self.entries.len(),
            self.registry.dir().display()
        );
        Ok(())
    }

    /// Persist the final index, deduplicated and sorted newest first
    pub async fn finish(mut self) -> Result<()> {
        dedup_by_id(&mut self.entries);
        sort_newest_first(&mut self.entries);
        self.registry.store.persist_index(&self.entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ConversationMessage, MessageRole, MigrationStamp};
    use tempfile::TempDir;

    fn record(name: &str) -> CheckpointRecord {
        let draft = CheckpointDraft::new(
            name.to_string(),
            "helper".to_string(),
            "Helper".to_string(),
            "claude-3-5-sonnet".to_string(),
        )
        .with_message(ConversationMessage::new(
            MessageRole::User,
            "hello".to_string(),
        ));
        CheckpointRecord::from_draft(draft, &ModelCatalog::default()).unwrap()
    }

    fn migrated_record(name: &str) -> CheckpointRecord {
        record(name).with_migration_stamp(MigrationStamp::new(
            "ws-1".to_string(),
            "agent-a".to_string(),
        ))
    }

    #[tokio::test]
    async fn test_batch_insert_then_finish_is_listed_with_provenance() {
        let tmp = TempDir::new().unwrap();
        let registry = GlobalCheckpointRegistry::new(tmp.path().to_path_buf());

        let record = migrated_record("Imported");
        let id = record.id.clone();

        let mut batch = registry.begin_batch().await.unwrap();
        assert!(!batch.contains(&id));
        batch.insert(record).await.unwrap();
        assert!(batch.contains(&id));
        batch.finish().await.unwrap();

        let entries = registry.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source_workspace_id, Some("ws-1".to_string()));

        let stored = registry.get(&id).await.unwrap().unwrap();
        assert!(stored.provenance.is_migrated());
    }

    #[tokio::test]
    async fn test_flush_persists_between_batch_steps() {
        let tmp = TempDir::new().unwrap();
        let registry = GlobalCheckpointRegistry::new(tmp.path().to_path_buf());

        let mut batch = registry.begin_batch().await.unwrap();
        batch.insert(migrated_record("One")).await.unwrap();
        batch.flush().await.unwrap();
        batch.insert(migrated_record("Two")).await.unwrap();
        // Dropped without finish: the second insert never reached the index
        drop(batch);

        assert_eq!(registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_batch_sees_persisted_ids() {
        let tmp = TempDir::new().unwrap();
        let registry = GlobalCheckpointRegistry::new(tmp.path().to_path_buf());

        let record = migrated_record("Sticky");
        let id = record.id.clone();

        let mut batch = registry.begin_batch().await.unwrap();
        batch.insert(record).await.unwrap();
        batch.finish().await.unwrap();

        let batch = registry.begin_batch().await.unwrap();
        assert!(batch.contains(&id));
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let registry = GlobalCheckpointRegistry::new(tmp.path().to_path_buf());

        let record = migrated_record("Dup");
        let mut batch = registry.begin_batch().await.unwrap();
        batch.insert(record.clone()).await.unwrap();
        batch.insert(record).await.unwrap();
        batch.finish().await.unwrap();

        assert_eq!(registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_direct_save_into_registry_is_local() {
        let tmp = TempDir::new().unwrap();
        let registry = GlobalCheckpointRegistry::new(tmp.path().to_path_buf());

        let draft = CheckpointDraft::new(
            "Direct".to_string(),
            "helper".to_string(),
            "Helper".to_string(),
            "claude-3-5-sonnet".to_string(),
        )
        .with_message(ConversationMessage::new(
            MessageRole::User,
            "hi".to_string(),
        ));

        let id = registry.save(draft).await.unwrap();
        let stored = registry.get(&id).await.unwrap().unwrap();
        assert!(!stored.provenance.is_migrated());

        let entries = registry.list().await.unwrap();
        assert_eq!(entries[0].source_workspace_id, None);
    }
}
