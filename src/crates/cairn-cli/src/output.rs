//! Output formatting for CLI commands
//!
//! Renders checkpoint listings, records, and migration reports as JSON,
//! table, or plain text.

use cairn_checkpoint::{CheckpointRecord, IndexEntry, MigrationReport};

/// Output format options
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
    Plain,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            "plain" => Ok(OutputFormat::Plain),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

/// Render a checkpoint listing
pub fn format_entries(entries: &[IndexEntry], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_pretty_json(entries),
        OutputFormat::Table => entries_table(entries),
        OutputFormat::Plain => entries
            .iter()
            .map(|entry| {
                format!("{} {} ({} messages)", entry.id, entry.name, entry.message_count)
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Render a single restored record
pub fn format_record(record: &CheckpointRecord, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_pretty_json(record),
        OutputFormat::Table => record_details(record),
        OutputFormat::Plain => record
            .messages
            .iter()
            .map(|message| format!("{:?}: {}", message.role, message.content))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Render a migration report
pub fn format_report(report: &MigrationReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_pretty_json(report),
        OutputFormat::Table => [
            format!("{:<20}: {}", "scopes discovered", report.scopes_discovered),
            format!("{:<20}: {}", "records discovered", report.records_discovered),
            format!("{:<20}: {}", "records migrated", report.records_migrated),
            format!("{:<20}: {}", "already present", report.records_already_present),
            format!("{:<20}: {}", "records skipped", report.records_skipped),
        ]
        .join("\n"),
        OutputFormat::Plain => report.to_string(),
    }
}

fn to_pretty_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(s) => s,
        Err(e) => format!("{{\"error\": \"{}\"}}", e),
    }
}

/// Format an entry listing as a fixed-column table
fn entries_table(entries: &[IndexEntry]) -> String {
    if entries.is_empty() {
        return "No checkpoints to display".to_string();
    }

    let mut output = String::new();

    output.push_str(&format!(
        "{:<36} | {:<22} | {:<16} | {:>8} | {:<18} | {}\n",
        "ID", "NAME", "CREATED", "MESSAGES", "MODEL", "SOURCE"
    ));
    output.push_str(&format!(
        "{}-+-{}-+-{}-+-{}-+-{}-+-{}\n",
        "-".repeat(36),
        "-".repeat(22),
        "-".repeat(16),
        "-".repeat(8),
        "-".repeat(18),
        "-".repeat(16),
    ));

    for entry in entries {
        let source = match (&entry.source_workspace_id, &entry.source_agent_id) {
            (Some(workspace), Some(agent)) => format!("{}/{}", workspace, agent),
            _ => "-".to_string(),
        };
        output.push_str(&format!(
            "{:<36} | {:<22} | {:<16} | {:>8} | {:<18} | {}\n",
            entry.id,
            truncate_string(&entry.name, 22),
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.message_count,
            truncate_string(&entry.selected_model, 18),
            truncate_string(&source, 24),
        ));
    }

    output
}

/// Format a single record as key: value lines
fn record_details(record: &CheckpointRecord) -> String {
    let mut output = String::new();

    output.push_str(&format!("{:<16}: {}\n", "id", record.id));
    output.push_str(&format!("{:<16}: {}\n", "name", record.name));
    if let Some(description) = &record.description {
        output.push_str(&format!("{:<16}: {}\n", "description", description));
    }
    output.push_str(&format!("{:<16}: {}\n", "agent", record.agent_title));
    output.push_str(&format!("{:<16}: {}\n", "model", record.selected_model));
    output.push_str(&format!(
        "{:<16}: {}\n",
        "created",
        record.created_at.format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str(&format!("{:<16}: {}\n", "messages", record.messages.len()));
    if !record.metadata.tags.is_empty() {
        output.push_str(&format!("{:<16}: {}\n", "tags", record.metadata.tags.join(", ")));
    }
    if let Some(stamp) = record.provenance.stamp() {
        output.push_str(&format!(
            "{:<16}: {}/{} at {}\n",
            "migrated from",
            stamp.source_workspace_id,
            stamp.source_agent_id,
            stamp.migrated_at.format("%Y-%m-%d %H:%M:%S")
        ));
    }

    output
}

/// Truncate string to specified length
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_checkpoint::{CheckpointDraft, ConversationMessage, MessageRole, ModelCatalog};

    fn sample_record() -> CheckpointRecord {
        let draft = CheckpointDraft::new(
            "Sample".to_string(),
            "helper".to_string(),
            "Helper".to_string(),
            "claude-3-5-sonnet".to_string(),
        )
        .with_message(ConversationMessage::new(MessageRole::User, "hello".to_string()));
        CheckpointRecord::from_draft(draft, &ModelCatalog::default()).unwrap()
    }

    #[test]
    fn test_output_format_parsing() {
        let format: OutputFormat = "json".parse().unwrap();
        assert!(matches!(format, OutputFormat::Json));

        let format: OutputFormat = "TaBlE".parse().unwrap();
        assert!(matches!(format, OutputFormat::Table));

        let result: Result<OutputFormat, _> = "invalid".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_listing_table() {
        let output = format_entries(&[], OutputFormat::Table);
        assert_eq!(output, "No checkpoints to display");
    }

    #[test]
    fn test_listing_table_contains_entry_fields() {
        let record = sample_record();
        let entries = vec![IndexEntry::from(&record)];

        let output = format_entries(&entries, OutputFormat::Table);
        assert!(output.contains("ID"));
        assert!(output.contains(&record.id));
        assert!(output.contains("Sample"));
    }

    #[test]
    fn test_listing_json_is_parseable() {
        let record = sample_record();
        let entries = vec![IndexEntry::from(&record)];

        let output = format_entries(&entries, OutputFormat::Json);
        let parsed: Vec<IndexEntry> = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn test_listing_plain_is_one_line_per_entry() {
        let first = sample_record();
        let second = sample_record();
        let entries = vec![IndexEntry::from(&first), IndexEntry::from(&second)];

        let output = format_entries(&entries, OutputFormat::Plain);
        assert_eq!(output.lines().count(), 2);
        assert!(output.contains(&first.id));
    }

    #[test]
    fn test_record_table_shows_details() {
        let record = sample_record();
        let output = format_record(&record, OutputFormat::Table);
        assert!(output.contains(&record.id));
        assert!(output.contains("claude-3-5-sonnet"));
        assert!(!output.contains("migrated from"));
    }

    #[test]
    fn test_report_plain_uses_summary_line() {
        let report = MigrationReport::default();
        let output = format_report(&report, OutputFormat::Plain);
        assert!(output.contains("migrated 0 of 0 records"));
    }

    #[test]
    fn test_truncate_string() {
        let result = truncate_string("hello world", 5);
        assert_eq!(result.len(), 5);
        assert!(result.ends_with("..."));

        let result = truncate_string("hi", 5);
        assert_eq!(result, "hi");
    }

    #[test]
    fn test_truncate_string_clips_on_char_boundaries() {
        let result = truncate_string("日本語のチェックポイント名がとても長い場合", 18);
        assert!(result.ends_with("..."));
        assert_eq!(result.chars().count(), 18);

        let result = truncate_string("日本語", 18);
        assert_eq!(result, "日本語");
    }

    #[test]
    fn test_listing_table_handles_multibyte_names() {
        let mut record = sample_record();
        record.name = "チェックポイントの名前がとても長い場合の切り詰め".to_string();
        let entries = vec![IndexEntry::from(&record)];

        let output = format_entries(&entries, OutputFormat::Table);
        assert!(output.contains("..."));
    }
}
