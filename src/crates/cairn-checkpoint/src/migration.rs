//! One-way consolidation of scoped checkpoints into the global registry
//!
//! [`MigrationCoordinator`] walks every scope under the base directory and copies
//! records the global registry does not yet hold, stamping each copy with its
//! originating scope and the migration time. The walk is strictly sequential: one
//! scope at a time against a single [`RegistryBatch`](crate::registry::RegistryBatch),
//! with the global index flushed after each scope so an interrupted run stays
//! consistent with the scopes already committed.
//!
//! Two guarantees hold across runs:
//!
//! - **Idempotent** - records already present (by ID) are counted, not re-copied;
//!   a second run over an unchanged tree changes nothing.
//! - **Non-destructive** - scoped stores are only ever read; originals survive
//!   migration and remain independently deletable.
//!
//! A scope with a missing or unreadable index contributes zero records and the run
//! continues. A single malformed record document is logged, counted, and skipped
//! rather than failing the run.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{CheckpointError, Result};
use crate::layout::StorageLayout;
use crate::record::MigrationStamp;
use crate::registry::GlobalCheckpointRegistry;
use crate::store::{CheckpointStore, FileCheckpointStore};

/// Counts reported by one migration run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// Scopes found under the base directory
    pub scopes_discovered: usize,

    /// Records referenced by scope indexes
    pub records_discovered: usize,

    /// Records newly copied into the registry
    pub records_migrated: usize,

    /// Records already in the registry before this run
    pub records_already_present: usize,

    /// Records skipped because their document was missing or malformed
    pub records_skipped: usize,
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "migrated {} of {} records across {} scopes ({} already present, {} skipped)",
            self.records_migrated,
            self.records_discovered,
            self.scopes_discovered,
            self.records_already_present,
            self.records_skipped
        )
    }
}

/// Walks scoped stores and consolidates them into the global registry
pub struct MigrationCoordinator {
    layout: StorageLayout,
}

impl MigrationCoordinator {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// Run one full migration pass
    ///
    /// Loads the global index once, then processes scopes in sequence. Safe to
    /// re-run at any time; see the module docs for the idempotence and
    /// non-destructiveness guarantees.
    pub async fn run(&self) -> Result<MigrationReport> {
        let registry = GlobalCheckpointRegistry::new(self.layout.global_dir().to_path_buf());
        let mut batch = registry.begin_batch().await?;

        let scopes = self.layout.discover_scopes().await?;
        let mut report = MigrationReport {
            scopes_discovered: scopes.len(),
            ..Default::default()
        };

        for scope in &scopes {
            let store = FileCheckpointStore::new(self.layout.scope_dir(scope));
            let entries = match store.list().await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Skipping scope {}: index unreadable: {}", scope, e);
                    continue;
                }
            };

            for entry in entries {
                report.records_discovered += 1;
                if batch.contains(&entry.id) {
                    report.records_already_present += 1;
                    continue;
                }

                match store.get(&entry.id).await {
                    Ok(Some(record)) => {
                        let stamp = MigrationStamp::new(
                            scope.workspace_id.clone(),
                            scope.agent_id.clone(),
                        );
                        batch.insert(record.with_migration_stamp(stamp)).await?;
                        report.records_migrated += 1;
                    }
                    Ok(None) => {
                        warn!(
                            "Skipping checkpoint {} in scope {}: record document missing",
                            entry.id, scope
                        );
                        report.records_skipped += 1;
                    }
                    Err(CheckpointError::Serialization(e)) => {
                        warn!(
                            "Skipping checkpoint {} in scope {}: malformed record: {}",
                            entry.id, scope, e
                        );
                        report.records_skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
            }

            // Per-scope durability unit: an interrupted run keeps everything
            // committed up to the last completed scope
            batch.flush().await?;
        }

        batch.finish().await?;
        info!("Migration complete: {}", report);
        Ok(report)
    }
}
