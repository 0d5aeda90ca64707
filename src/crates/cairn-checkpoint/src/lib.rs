//! # cairn-checkpoint - Checkpoint Persistence & Migration for Agent Workspaces
//!
//! **Durable conversation snapshots** for AI agent workspaces: save an agent's
//! message history as an immutable checkpoint, list and restore it later, and
//! consolidate per-scope checkpoints into a single global registry without data
//! loss or duplication.
//!
//! ## Overview
//!
//! Every checkpoint belongs to a **scope** - the (workspace, agent) pair that
//! produced it. Each scope owns a directory holding one index document for fast
//! listing plus one JSON document per record. The crate provides:
//!
//! - **Scoped Stores** - Per-scope CRUD over checkpoints ([`FileCheckpointStore`])
//! - **Global Registry** - The same contract at one fixed root, with provenance
//!   ([`GlobalCheckpointRegistry`])
//! - **Migration** - Idempotent, non-destructive consolidation of every scope into
//!   the registry ([`MigrationCoordinator`])
//! - **Service Facade** - The save/list/restore/delete boundary API handlers and
//!   CLI entry points consume ([`CheckpointService`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cairn_checkpoint::{
//!     CheckpointDraft, CheckpointService, ConversationMessage, MessageRole, Scope,
//!     StorageLayout,
//! };
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let layout = StorageLayout::new(
//!         PathBuf::from("data/checkpoints"),
//!         PathBuf::from("data/global-checkpoints"),
//!     );
//!     let service = CheckpointService::new(layout);
//!     let scope = Scope::new("workspace-1".to_string(), "react-helper".to_string());
//!
//!     let draft = CheckpointDraft::new(
//!         "React Helper Expert".to_string(),
//!         "react-helper".to_string(),
//!         "React Helper".to_string(),
//!         "claude-3-5-sonnet".to_string(),
//!     )
//!     .with_message(ConversationMessage::new(
//!         MessageRole::User,
//!         "How do hooks work?".to_string(),
//!     ));
//!
//!     let id = service.save_checkpoint(&scope, draft).await?;
//!     let restored = service.restore_checkpoint(&scope, &id).await?;
//!     println!("Restored {} messages", restored.messages.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Callers (API layer, CLI)                                 │
//! └───────────────┬──────────────────────────┬───────────────┘
//!                 │ save/list/restore/delete │ migrate
//!                 ▼                          ▼
//! ┌───────────────────────────┐  ┌──────────────────────────┐
//! │  CheckpointService        │  │  MigrationCoordinator    │
//! │  • one store per scope    │  │  • walks every scope     │
//! └───────────────┬───────────┘  │  • sequential batches    │
//!                 │              └────────────┬─────────────┘
//!                 ▼                           ▼
//! ┌───────────────────────────┐  ┌──────────────────────────┐
//! │  FileCheckpointStore      │  │  GlobalCheckpointRegistry│
//! │  <base>/<ws>/<agent>/     │  │  <global>/               │
//! │  index.json + <id>.json   │  │  index.json + <id>.json  │
//! └───────────────────────────┘  └──────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`record`] - [`CheckpointRecord`], [`CheckpointDraft`], [`IndexEntry`],
//!   [`Provenance`], validation
//! - [`store`] - [`CheckpointStore`] trait and [`FileCheckpointStore`]
//! - [`registry`] - [`GlobalCheckpointRegistry`] and its bulk-insert batch
//! - [`migration`] - [`MigrationCoordinator`] and [`MigrationReport`]
//! - [`service`] - [`CheckpointService`] facade
//! - [`layout`] - [`StorageLayout`], [`Scope`], path and document helpers
//! - [`error`] - [`CheckpointError`] taxonomy
//!
//! ## Guarantees
//!
//! - Records are immutable once saved; restore never mutates the stored copy
//! - Listing is always newest first; a corrupt index lists as empty instead of
//!   failing, and the file is left in place
//! - Migration only ever reads scoped stores, skips records the registry already
//!   holds, and can be interrupted and re-run safely

pub mod error;
pub mod layout;
pub mod migration;
pub mod record;
pub mod registry;
pub mod service;
pub mod store;

// Re-export main types
pub use error::{CheckpointError, Result};
pub use layout::{Scope, StorageLayout};
pub use migration::{MigrationCoordinator, MigrationReport};
pub use record::{
    CheckpointDraft, CheckpointId, CheckpointMetadata, CheckpointRecord, ConversationMessage,
    IndexEntry, MessageRole, MigrationStamp, ModelCatalog, Provenance, TokenUsage,
};
pub use registry::{GlobalCheckpointRegistry, RegistryBatch};
pub use service::CheckpointService;
pub use store::{CheckpointStore, FileCheckpointStore};
