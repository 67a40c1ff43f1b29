//! Subcommand implementations.

mod cleanup;
mod export;
mod filter;
mod ingest;
mod list;
mod show;
mod stats;
mod summary;

pub use cleanup::CleanupCommand;
pub use export::ExportCommand;
pub use filter::{parse_end, parse_start, FilterArgs};
pub use ingest::{ingest, EventSubmission, IngestCommand, IngestReport};
pub use list::{render_events, ListCommand};
pub use show::{render_event, ShowCommand};
pub use stats::{render_buckets, StatsCommand};
pub use summary::{render_summary, SummaryCommand};
