//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use parcel_audit_query::AuditQueryService;
use parcel_audit_store::{AuditStore, SqliteStore};
use parcel_common_config::{ConfigLoader, ParcelConfig};
use tracing::debug;

use crate::commands::{
    CleanupCommand, ExportCommand, IngestCommand, ListCommand, ShowCommand, StatsCommand,
    SummaryCommand,
};
use crate::error::CliError;
use crate::output::{OutputFormat, TableStyle};

/// Parcel audit log operator tool
///
/// Query, export and prune the audit store, or feed it events.
#[derive(Debug, Parser)]
#[command(
    name = "parcel-audit",
    author,
    version,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Increase verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to the YAML configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "PARCEL_CONFIG_PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config: Option<PathBuf>,

    /// Audit database file (overrides configuration)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub database: Option<PathBuf>,

    /// Output format for listings and reports
    #[arg(long = "output-format", global = true, default_value = "text", value_enum)]
    pub format: OutputFormat,

    /// Render tables as Markdown
    #[arg(long, global = true)]
    pub markdown: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List audit logs, newest first
    #[command(visible_alias = "ls")]
    List(ListCommand),

    /// Show one audit log by id
    Show(ShowCommand),

    /// Per-action summary with store-wide statistics
    Summary(SummaryCommand),

    /// Activity bucketed by hour, day or month
    Stats(StatsCommand),

    /// Export matching audit logs as CSV, JSON or JSON Lines
    Export(ExportCommand),

    /// Delete audit logs older than the retention window
    Cleanup(CleanupCommand),

    /// Read JSON-lines event submissions from stdin into the store
    Ingest(IngestCommand),
}

impl Cli {
    /// Load configuration from the given file or the default location.
    pub fn load_config(&self) -> Result<ParcelConfig, CliError> {
        let loader = match &self.config {
            Some(path) => ConfigLoader::new(path),
            None => ConfigLoader::default(),
        };
        debug!(path = %loader.path().display(), "Loading configuration");

        let mut config = loader.load()?;
        if let Some(database) = &self.database {
            config.audit.database_path = database.clone();
        }
        Ok(config)
    }

    /// Execute the selected command
    pub async fn execute(self, config: ParcelConfig) -> Result<(), CliError> {
        let ctx = CommandContext {
            config,
            format: self.format,
            table_style: if self.markdown {
                TableStyle::Markdown
            } else {
                TableStyle::Plain
            },
        };

        match self.command {
            Command::List(cmd) => cmd.execute(&ctx).await,
            Command::Show(cmd) => cmd.execute(&ctx).await,
            Command::Summary(cmd) => cmd.execute(&ctx).await,
            Command::Stats(cmd) => cmd.execute(&ctx).await,
            Command::Export(cmd) => cmd.execute(&ctx).await,
            Command::Cleanup(cmd) => cmd.execute(&ctx).await,
            Command::Ingest(cmd) => cmd.execute(&ctx).await,
        }
    }
}

/// Context passed to all commands
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: ParcelConfig,
    pub format: OutputFormat,
    pub table_style: TableStyle,
}

impl CommandContext {
    /// Open the configured SQLite store.
    pub fn open_store(&self) -> Result<Arc<dyn AuditStore>, CliError> {
        let path = &self.config.audit.database_path;
        let store = SqliteStore::open(path)?;
        debug!(path = %path.display(), "Opened audit store");
        Ok(Arc::new(store))
    }

    /// Query service over the configured store.
    pub fn query_service(&self) -> Result<AuditQueryService, CliError> {
        Ok(AuditQueryService::new(self.open_store()?))
    }
}
