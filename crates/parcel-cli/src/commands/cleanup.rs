//! `cleanup` command.

use clap::Parser;
use serde::Serialize;

use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::emit;

/// Delete audit logs older than the retention window
#[derive(Debug, Parser)]
pub struct CleanupCommand {
    /// Retention in days; defaults to `audit.retention_days`
    #[arg(long)]
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CleanupReport {
    retention_days: u32,
    deleted_count: u64,
}

impl CleanupCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let retention_days = self.days.unwrap_or(ctx.config.audit.retention_days);
        let deleted_count = ctx.query_service()?.cleanup(retention_days).await?;

        let report = CleanupReport {
            retention_days,
            deleted_count,
        };
        emit(ctx.format, &report, |r| {
            format!(
                "Deleted {} audit logs older than {} days",
                r.deleted_count, r.retention_days
            )
        })?;
        Ok(())
    }
}
