//! Facade boundary for checkpoint operations
//!
//! [`CheckpointService`] is what API handlers and CLI entry points talk to: save,
//! list, restore, delete, each scoped to a (workspace, agent) pair. The service
//! resolves one [`FileCheckpointStore`] per scope and caches it, which makes that
//! store the single in-process owner of the scope's index mutations.
//!
//! Restore is read-only: the caller re-hydrates an agent session from the returned
//! messages, and the stored record is never mutated. At this boundary a missing
//! record is an error ([`CheckpointError::NotFound`]) rather than the stores'
//! `None`, so transport layers have something to map to a status code.
//!
//! ```rust,ignore
//! use cairn_checkpoint::{CheckpointService, Scope, StorageLayout};
//!
//! let service = CheckpointService::new(StorageLayout::new(base_dir, global_dir));
//! let scope = Scope::new("workspace-1".to_string(), "agent-a".to_string());
//!
//! let id = service.save_checkpoint(&scope, draft).await?;
//! let listing = service.list_checkpoints(&scope).await?;
//! let record = service.restore_checkpoint(&scope, &id).await?;
//! service.delete_checkpoint(&scope, &id).await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{CheckpointError, Result};
use crate::layout::{Scope, StorageLayout};
use crate::record::{CheckpointDraft, CheckpointId, CheckpointRecord, IndexEntry, ModelCatalog};
use crate::store::{CheckpointStore, FileCheckpointStore};

/// Scoped checkpoint operations behind one shared entry point
pub struct CheckpointService {
    layout: StorageLayout,
    catalog: ModelCatalog,
    stores: RwLock<HashMap<Scope, Arc<FileCheckpointStore>>>,
}

impl CheckpointService {
    pub fn new(layout: StorageLayout) -> Self {
        Self {
            layout,
            catalog: ModelCatalog::default(),
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the model catalog handed to every scope store
    pub fn with_catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Validate and persist a draft into a scope
    pub async fn save_checkpoint(
        &self,
        scope: &Scope,
        draft: CheckpointDraft,
    ) -> Result<CheckpointId> {
        self.store_for(scope).await?.save(draft).await
    }

    /// Entries for one scope, newest first
    pub async fn list_checkpoints(&self, scope: &Scope) -> Result<Vec<IndexEntry>> {
        self.store_for(scope).await?.list().await
    }

    /// Load the full record the caller will re-hydrate a session from
    pub async fn restore_checkpoint(&self, scope: &Scope, id: &str) -> Result<CheckpointRecord> {
        let store = self.store_for(scope).await?;
        store
            .get(id)
            .await?
            .ok_or_else(|| CheckpointError::NotFound(format!("{id} in scope {scope}")))
    }

    /// Remove a record from a scope
    pub async fn delete_checkpoint(&self, scope: &Scope, id: &str) -> Result<()> {
        let store = self.store_for(scope).await?;
        if store.delete(id).await? {
            Ok(())
        } else {
            Err(CheckpointError::NotFound(format!("{id} in scope {scope}")))
        }
    }

    /// Resolve the cached store owning a scope's directory
    async fn store_for(&self, scope: &Scope) -> Result<Arc<FileCheckpointStore>> {
        scope.validate()?;

        {
            let stores = self.stores.read().await;
            if let Some(store) = stores.get(scope) {
                return Ok(Arc::clone(store));
            }
        }

        let mut stores = self.stores.write().await;
        let store = stores.entry(scope.clone()).or_insert_with(|| {
            debug!("Opening checkpoint store for scope {}", scope);
            Arc::new(
                FileCheckpointStore::new(self.layout.scope_dir(scope))
                    .with_catalog(self.catalog.clone()),
            )
        });
        Ok(Arc::clone(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ConversationMessage, MessageRole};
    use tempfile::TempDir;

    fn service(tmp: &TempDir) -> CheckpointService {
        CheckpointService::new(StorageLayout::new(
            tmp.path().join("scoped"),
            tmp.path().join("global"),
        ))
    }

    fn scope() -> Scope {
        Scope::new("ws-1".to_string(), "agent-a".to_string())
    }

    fn draft(name: &str) -> CheckpointDraft {
        CheckpointDraft::new(
            name.to_string(),
            "helper".to_string(),
            "Helper".to_string(),
            "claude-3-5-sonnet".to_string(),
        )
        .with_message(ConversationMessage::new(
            MessageRole::User,
            "hello".to_string(),
        ))
    }

    #[tokio::test]
    async fn test_save_list_restore_delete() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);
        let scope = scope();

        let id = service.save_checkpoint(&scope, draft("Session")).await.unwrap();

        let listing = service.list_checkpoints(&scope).await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].id, id);

        let record = service.restore_checkpoint(&scope, &id).await.unwrap();
        assert_eq!(record.name, "Session");

        service.delete_checkpoint(&scope, &id).await.unwrap();
        assert!(service.list_checkpoints(&scope).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restore_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);

        let err = service
            .restore_checkpoint(&scope(), "no-such-id")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckpointError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);

        let err = service
            .delete_checkpoint(&scope(), "no-such-id")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckpointError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_scope_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);
        let bad = Scope::new("../outside".to_string(), "agent".to_string());

        let err = service.list_checkpoints(&bad).await.unwrap_err();
        assert!(matches!(err, CheckpointError::Validation(_)));
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);
        let a = Scope::new("ws-1".to_string(), "agent-a".to_string());
        let b = Scope::new("ws-1".to_string(), "agent-b".to_string());

        let id = service.save_checkpoint(&a, draft("Only in A")).await.unwrap();

        assert!(service.list_checkpoints(&b).await.unwrap().is_empty());
        assert!(matches!(
            service.restore_checkpoint(&b, &id).await,
            Err(CheckpointError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_store_is_cached_per_scope() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);
        let scope = scope();

        let first = service.store_for(&scope).await.unwrap();
        let second = service.store_for(&scope).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
