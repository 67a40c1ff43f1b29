//! `summary` command.

use chrono::{DateTime, Utc};
use clap::Parser;
use parcel_audit_query::AuditSummary;
use std::fmt::Write as _;

use super::{parse_end, parse_start};
use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::{emit, Alignment, Column, Table, TableStyle};

/// Per-action summary with store-wide statistics
#[derive(Debug, Parser)]
pub struct SummaryCommand {
    /// Start of the range (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_start)]
    pub since: Option<DateTime<Utc>>,

    /// End of the range (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_end)]
    pub until: Option<DateTime<Utc>>,
}

impl SummaryCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let summary = ctx
            .query_service()?
            .summary(self.since, self.until)
            .await?;
        emit(ctx.format, &summary, |s| render_summary(s, ctx.table_style))?;
        Ok(())
    }
}

/// Action breakdown table followed by the statistics block.
pub fn render_summary(summary: &AuditSummary, style: TableStyle) -> String {
    let mut table = Table::new(vec![
        Column::new("Action"),
        Column::new("Outcome"),
        Column::new("Priority"),
        Column::new("Count").align(Alignment::Right),
    ])
    .style(style);

    for action in &summary.summary {
        for status in &action.statuses {
            table.add_row(vec![
                action.action.to_string(),
                status.outcome.to_string(),
                status.priority.to_string(),
                status.count.to_string(),
            ]);
        }
    }

    let mut out = table.render();
    let stats = &summary.statistics;
    let _ = writeln!(out, "\nMatched:  {}", summary.matched);
    let _ = writeln!(out, "Total:    {}", stats.total_logs);
    let _ = writeln!(out, "Today:    {}", stats.today_logs);
    let _ = writeln!(out, "Errors:   {}", stats.error_logs);
    let _ = writeln!(out, "Security: {}", stats.security_logs);
    out
}
