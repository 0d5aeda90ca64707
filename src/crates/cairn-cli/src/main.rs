//! cairn - CLI entry point for checkpoint management

mod config;
mod output;

use anyhow::{bail, Context, Result};
use cairn_checkpoint::{
    CheckpointDraft, CheckpointService, CheckpointStore, GlobalCheckpointRegistry,
    MigrationCoordinator, Scope, StorageLayout,
};
use clap::{Parser, Subcommand};
use config::{CairnConfig, ConfigLoader};
use output::OutputFormat;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{info, warn, Level};
use tracing_subscriber;

/// cairn checkpoint manager
#[derive(Parser, Debug)]
#[command(name = "cairn")]
#[command(version)]
#[command(about = "Checkpoint manager for agent workspaces", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output format (json, table, plain)
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save a checkpoint draft into a workspace/agent scope
    Save {
        /// Workspace the checkpoint belongs to
        #[arg(short, long)]
        workspace: String,

        /// Agent the checkpoint belongs to
        #[arg(short, long)]
        agent: String,

        /// Draft JSON file (reads stdin when omitted)
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// List checkpoints in a scope or the global registry
    List {
        /// Workspace to list
        #[arg(short, long)]
        workspace: Option<String>,

        /// Agent to list
        #[arg(short, long)]
        agent: Option<String>,

        /// List the global registry instead of a scope
        #[arg(long, conflicts_with_all = ["workspace", "agent"])]
        global: bool,
    },
    /// Print a stored checkpoint
    Restore {
        /// Checkpoint identifier
        #[arg(value_name = "ID")]
        id: String,

        /// Workspace holding the checkpoint
        #[arg(short, long)]
        workspace: Option<String>,

        /// Agent holding the checkpoint
        #[arg(short, long)]
        agent: Option<String>,

        /// Read from the global registry instead of a scope
        #[arg(long, conflicts_with_all = ["workspace", "agent"])]
        global: bool,
    },
    /// Delete a checkpoint
    Delete {
        /// Checkpoint identifier
        #[arg(value_name = "ID")]
        id: String,

        /// Workspace holding the checkpoint
        #[arg(short, long)]
        workspace: Option<String>,

        /// Agent holding the checkpoint
        #[arg(short, long)]
        agent: Option<String>,

        /// Delete from the global registry instead of a scope
        #[arg(long, conflicts_with_all = ["workspace", "agent"])]
        global: bool,
    },
    /// Copy every scoped checkpoint into the global registry
    Migrate,
    /// Initialize cairn configuration for a project
    Init,
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = load_config(&args).await;

    // Initialize logging based on config
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        match config.ui.log_level.as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .init();

    info!("Starting cairn version {}", env!("CARGO_PKG_VERSION"));

    let layout = StorageLayout::new(
        config.storage.base_dir.clone(),
        config.storage.global_dir.clone(),
    );

    match args.command {
        Command::Save { workspace, agent, file } => {
            let scope = Scope::new(workspace, agent);
            let draft = read_draft(file.as_deref()).await?;

            let service = CheckpointService::new(layout);
            let id = service.save_checkpoint(&scope, draft).await?;
            println!("{}", id);
        }
        Command::List { workspace, agent, global } => {
            let entries = if global {
                let registry = GlobalCheckpointRegistry::new(layout.global_dir().to_path_buf());
                registry.list().await?
            } else {
                let scope = resolve_scope(workspace, agent)?;
                let service = CheckpointService::new(layout);
                service.list_checkpoints(&scope).await?
            };
            println!("{}", output::format_entries(&entries, args.format));
        }
        Command::Restore { id, workspace, agent, global } => {
            let record = if global {
                let registry = GlobalCheckpointRegistry::new(layout.global_dir().to_path_buf());
                registry
                    .get(&id)
                    .await?
                    .with_context(|| format!("Checkpoint not found: {}", id))?
            } else {
                let scope = resolve_scope(workspace, agent)?;
                let service = CheckpointService::new(layout);
                service.restore_checkpoint(&scope, &id).await?
            };
            println!("{}", output::format_record(&record, args.format));
        }
        Command::Delete { id, workspace, agent, global } => {
            if global {
                let registry = GlobalCheckpointRegistry::new(layout.global_dir().to_path_buf());
                if !registry.delete(&id).await? {
                    bail!("Checkpoint not found: {}", id);
                }
            } else {
                let scope = resolve_scope(workspace, agent)?;
                let service = CheckpointService::new(layout);
                service.delete_checkpoint(&scope, &id).await?;
            }
            println!("Deleted {}", id);
        }
        Command::Migrate => {
            info!("Checkpoint tree: {}", layout.base_dir().display());
            info!("Global registry: {}", layout.global_dir().display());

            let report = MigrationCoordinator::new(layout).run().await?;
            println!("{}", output::format_report(&report, args.format));
        }
        Command::Init => {
            info!("Initializing cairn configuration...");
            tokio::fs::create_dir_all(layout.base_dir())
                .await
                .with_context(|| format!("Failed to create {}", layout.base_dir().display()))?;
            tokio::fs::create_dir_all(layout.global_dir())
                .await
                .with_context(|| format!("Failed to create {}", layout.global_dir().display()))?;
            let config_path = config::init_project_config().await?;
            info!("Created checkpoint tree: {}", layout.base_dir().display());
            info!("Created global registry: {}", layout.global_dir().display());
            info!("Created config file: {}", config_path.display());
        }
        Command::Config => {
            show_config(&config)?;
        }
    }

    Ok(())
}

/// Load configuration with fallback to defaults
async fn load_config(args: &Args) -> CairnConfig {
    match ConfigLoader::new().load().await {
        Ok(config) => config,
        Err(e) => {
            if args.verbose {
                warn!("Failed to load config: {}, using defaults", e);
            }
            CairnConfig::default()
        }
    }
}

/// Build a scope from the workspace/agent flags
fn resolve_scope(workspace: Option<String>, agent: Option<String>) -> Result<Scope> {
    match (workspace, agent) {
        (Some(workspace), Some(agent)) => Ok(Scope::new(workspace, agent)),
        _ => bail!("--workspace and --agent are required unless --global is set"),
    }
}

/// Read a checkpoint draft from a file or stdin
async fn read_draft(file: Option<&Path>) -> Result<CheckpointDraft> {
    let content = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read draft file: {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("Failed to read draft from stdin")?;
            buffer
        }
    };

    let draft = serde_json::from_str(&content).context("Failed to parse checkpoint draft")?;
    Ok(draft)
}

/// Show current configuration
fn show_config(config: &CairnConfig) -> Result<()> {
    let config_toml = toml::to_string_pretty(&config)
        .unwrap_or_else(|_| "Failed to serialize config".to_string());

    println!("Current Configuration:");
    println!("=====================");
    println!("{}", config_toml);
    println!();

    let loader = ConfigLoader::new();
    println!("Config Locations:");
    println!("  User:    {}", loader.get_user_config_path().display());
    println!("  Project: {}", loader.get_project_config_path().display());

    Ok(())
}
