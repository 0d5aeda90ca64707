//! Core checkpoint data structures for conversation snapshot persistence
//!
//! This module defines the fundamental data types for the checkpoint system:
//! **[`CheckpointRecord`]**, **[`CheckpointDraft`]**, **[`ConversationMessage`]**, and
//! **[`IndexEntry`]**. A record is a complete, immutable snapshot of an agent
//! conversation; an index entry is its lightweight projection used for listing without
//! loading message payloads.
//!
//! # Overview
//!
//! The record model provides:
//!
//! - **Conversation Snapshots** - Complete point-in-time captures of message history
//! - **Agent Identity** - Name, title, and selected model captured with each snapshot
//! - **Metadata** - Message count, session tracking, tags, custom data
//! - **Provenance** - Explicit local-vs-migrated origin on every record
//! - **Serializable** - All types support JSON serialization via serde (camelCase wire names)
//!
//! # Core Types
//!
//! - [`CheckpointRecord`] - A saved snapshot with messages, agent identity, and provenance
//! - [`CheckpointDraft`] - The save request; validated before any I/O
//! - [`ConversationMessage`] - One conversation turn (role, content, timestamp)
//! - [`CheckpointMetadata`] - Message count, last session ID, tags, custom data
//! - [`IndexEntry`] - Compact listing projection of a record
//! - [`Provenance`] / [`MigrationStamp`] - Where a record came from
//! - [`ModelCatalog`] - The model identifiers draft validation recognizes
//!
//! # Record Document Shape
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  CheckpointRecord (one JSON document per record) │
//! │  • id: "a1b2c3..."          (UUID v4)            │
//! │  • name: "React Helper"                          │
//! │  • createdAt: 2024-06-01T12:00:00Z               │
//! │  • messages: [ {role, content, timestamp}, ... ] │
//! │  • agentName / agentTitle / selectedModel        │
//! │  • metadata: { messageCount, tags, ... }         │
//! │  • sourceWorkspaceId ┐                           │
//! │  • sourceAgentId     ├ present only when the     │
//! │  • migratedAt        ┘ record was migrated       │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cairn_checkpoint::{CheckpointDraft, CheckpointRecord, ConversationMessage, MessageRole, ModelCatalog};
//!
//! let draft = CheckpointDraft::new(
//!     "React Helper Expert".to_string(),
//!     "react-helper".to_string(),
//!     "React Helper".to_string(),
//!     "claude-3-5-sonnet".to_string(),
//! )
//! .with_message(ConversationMessage::new(MessageRole::User, "How do hooks work?".to_string()))
//! .with_message(ConversationMessage::new(MessageRole::Assistant, "Hooks let you...".to_string()));
//!
//! let record = CheckpointRecord::from_draft(draft, &ModelCatalog::default())?;
//! assert_eq!(record.metadata.message_count, 2);
//! ```
//!
//! # Provenance
//!
//! A record's origin is a tagged sum type rather than a bag of optional fields.
//! Locally saved records serialize with no provenance keys at all; migrated copies
//! carry `sourceWorkspaceId`, `sourceAgentId`, and `migratedAt`:
//!
//! ```rust,ignore
//! let migrated = record.with_migration_stamp(MigrationStamp::new(
//!     "workspace-7".to_string(),
//!     "agent-3".to_string(),
//! ));
//! assert!(migrated.provenance.is_migrated());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::error::{CheckpointError, Result};

/// Checkpoint ID type
pub type CheckpointId = String;

/// Model identifiers recognized when no custom catalog is supplied
const DEFAULT_MODELS: &[&str] = &[
    "claude-3-5-sonnet",
    "claude-3-5-haiku",
    "claude-3-opus",
    "gpt-4o",
    "gpt-4o-mini",
    "o1-mini",
    "gemini-1.5-pro",
];

/// Role of a conversation participant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message authored by the human user
    User,
    /// Message authored by the agent
    Assistant,
    /// System prompt or instruction
    System,
    /// Tool invocation result
    Tool,
}

/// Token accounting for a single message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// One conversation turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    /// Who authored this turn
    pub role: MessageRole,

    /// Message body
    pub content: String,

    /// When the turn occurred
    pub timestamp: DateTime<Utc>,

    /// Token accounting, when the runtime reported it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,

    /// Session the turn belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ConversationMessage {
    /// Create a message timestamped now
    pub fn new(role: MessageRole, content: String) -> Self {
        Self {
            role,
            content,
            timestamp: Utc::now(),
            usage: None,
            session_id: None,
        }
    }

    /// Set token usage
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Set the session ID
    pub fn with_session_id(mut self, session_id: String) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

/// Metadata associated with a checkpoint
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointMetadata {
    /// Number of messages in the snapshot, derived at save time
    #[serde(default)]
    pub message_count: usize,

    /// Session ID of the most recent message carrying one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_session_id: Option<String>,

    /// Free-form labels
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Additional custom metadata
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl CheckpointMetadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: String) -> Self {
        self.tags.push(tag);
        self
    }

    /// Set the last session ID
    pub fn with_last_session_id(mut self, session_id: String) -> Self {
        self.last_session_id = Some(session_id);
        self
    }

    /// Add custom metadata
    pub fn with_extra(mut self, key: String, value: serde_json::Value) -> Self {
        self.extra.insert(key, value);
        self
    }
}

/// Origin stamp carried by records copied into the global registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStamp {
    /// Workspace the record was originally saved under
    pub source_workspace_id: String,

    /// Agent the record was originally saved under
    pub source_agent_id: String,

    /// When the copy was made
    pub migrated_at: DateTime<Utc>,
}

impl MigrationStamp {
    /// Create a stamp dated now
    pub fn new(source_workspace_id: String, source_agent_id: String) -> Self {
        Self {
            source_workspace_id,
            source_agent_id,
            migrated_at: Utc::now(),
        }
    }
}

/// Where a record came from
///
/// Serialized untagged and flattened into the record document: local records carry
/// no provenance keys, migrated ones carry the full [`MigrationStamp`]. `Migrated`
/// must stay the first variant so deserialization tries the stamp fields before
/// falling back to `Local`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Provenance {
    /// Copied into the global registry by migration
    Migrated(MigrationStamp),
    /// Saved directly into the store that holds it
    Local {},
}

impl Provenance {
    /// Whether this record was produced by migration
    pub fn is_migrated(&self) -> bool {
        matches!(self, Self::Migrated(_))
    }

    /// The migration stamp, if any
    pub fn stamp(&self) -> Option<&MigrationStamp> {
        match self {
            Self::Migrated(stamp) => Some(stamp),
            Self::Local {} => None,
        }
    }
}

impl Default for Provenance {
    fn default() -> Self {
        Self::Local {}
    }
}

/// A saved conversation snapshot
///
/// Records are immutable once saved: restore returns a copy and never mutates the
/// stored document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRecord {
    /// Unique within the store that holds this record
    pub id: CheckpointId,

    /// Display name, never empty
    pub name: String,

    /// Optional longer description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// When the snapshot was saved
    pub created_at: DateTime<Utc>,

    /// Ordered conversation history
    pub messages: Vec<ConversationMessage>,

    /// Agent identifier the snapshot belongs to
    pub agent_name: String,

    /// Human-readable agent title
    pub agent_title: String,

    /// Model the agent was running
    pub selected_model: String,

    /// Derived and custom metadata
    #[serde(default)]
    pub metadata: CheckpointMetadata,

    /// Local or migrated origin, flattened into the document
    #[serde(flatten)]
    pub provenance: Provenance,
}

impl CheckpointRecord {
    /// Validate a draft and build a record from it
    ///
    /// Assigns a fresh UUID v4 identifier and stamps `created_at` with the current
    /// time. `metadata.message_count` is derived from the message list, and
    /// `metadata.last_session_id` is filled from the most recent message carrying a
    /// session ID when the draft did not set it. Fails with
    /// [`CheckpointError::Validation`] before any I/O if the draft is incomplete.
    pub fn from_draft(draft: CheckpointDraft, catalog: &ModelCatalog) -> Result<Self> {
        draft.validate(catalog)?;

        let mut metadata = draft.metadata.unwrap_or_default();
        metadata.message_count = draft.messages.len();
        if metadata.last_session_id.is_none() {
            metadata.last_session_id = draft
                .messages
                .iter()
                .rev()
                .find_map(|message| message.session_id.clone());
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            description: draft.description,
            created_at: Utc::now(),
            messages: draft.messages,
            agent_name: draft.agent_name,
            agent_title: draft.agent_title,
            selected_model: draft.selected_model,
            metadata,
            provenance: Provenance::default(),
        })
    }

    /// Mark this record as a migrated copy
    pub fn with_migration_stamp(mut self, stamp: MigrationStamp) -> Self {
        self.provenance = Provenance::Migrated(stamp);
        self
    }
}

/// A save request, validated before any I/O
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointDraft {
    /// Display name for the snapshot
    pub name: String,

    /// Optional longer description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Full conversation history to snapshot
    pub messages: Vec<ConversationMessage>,

    /// Agent identifier
    pub agent_name: String,

    /// Human-readable agent title
    pub agent_title: String,

    /// Model the agent was running
    pub selected_model: String,

    /// Caller-supplied metadata; message count is overwritten at save time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CheckpointMetadata>,
}

impl CheckpointDraft {
    /// Create a draft with no messages yet
    pub fn new(
        name: String,
        agent_name: String,
        agent_title: String,
        selected_model: String,
    ) -> Self {
        Self {
            name,
            description: None,
            messages: Vec::new(),
            agent_name,
            agent_title,
            selected_model,
            metadata: None,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    /// Append one message
    pub fn with_message(mut self, message: ConversationMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Replace the message list
    pub fn with_messages(mut self, messages: Vec<ConversationMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// Set caller metadata
    pub fn with_metadata(mut self, metadata: CheckpointMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Check the draft is complete enough to persist
    pub fn validate(&self, catalog: &ModelCatalog) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CheckpointError::Validation(
                "checkpoint name must not be empty".to_string(),
            ));
        }
        if self.messages.is_empty() {
            return Err(CheckpointError::Validation(
                "checkpoint must contain at least one message".to_string(),
            ));
        }
        if !catalog.recognizes(&self.selected_model) {
            return Err(CheckpointError::Validation(format!(
                "unrecognized model: {}",
                self.selected_model
            )));
        }
        Ok(())
    }
}

/// Compact listing projection of a record
///
/// Index documents hold one entry per record so listing never loads message
/// payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Record identifier
    pub id: CheckpointId,

    /// Display name
    pub name: String,

    /// When the record was saved
    pub created_at: DateTime<Utc>,

    /// Number of messages in the snapshot
    pub message_count: usize,

    /// Model the agent was running
    pub selected_model: String,

    /// Free-form labels
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Originating workspace, for migrated records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_workspace_id: Option<String>,

    /// Originating agent, for migrated records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_agent_id: Option<String>,
}

impl From<&CheckpointRecord> for IndexEntry {
    fn from(record: &CheckpointRecord) -> Self {
        let stamp = record.provenance.stamp();
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            created_at: record.created_at,
            message_count: record.metadata.message_count,
            selected_model: record.selected_model.clone(),
            tags: record.metadata.tags.clone(),
            source_workspace_id: stamp.map(|s| s.source_workspace_id.clone()),
            source_agent_id: stamp.map(|s| s.source_agent_id.clone()),
        }
    }
}

/// The model identifiers draft validation recognizes
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: HashSet<String>,
}

impl ModelCatalog {
    /// Build a catalog from explicit model identifiers
    pub fn new(models: Vec<String>) -> Self {
        Self {
            models: models.into_iter().collect(),
        }
    }

    /// Whether the catalog recognizes this model identifier
    pub fn recognizes(&self, model: &str) -> bool {
        self.models.contains(model)
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_MODELS.iter().map(|m| m.to_string()).collect())
    }
}

/// Sort entries by creation time, newest first
pub(crate) fn sort_newest_first(entries: &mut [IndexEntry]) {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Drop entries whose ID already appeared, keeping the first occurrence
pub(crate) fn dedup_by_id(entries: &mut Vec<IndexEntry>) {
    let mut seen = HashSet::new();
    entries.retain(|entry| seen.insert(entry.id.clone()));
}
