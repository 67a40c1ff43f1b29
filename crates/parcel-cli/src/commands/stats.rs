//! `stats` command.

use chrono::{DateTime, Utc};
use clap::Parser;
use parcel_audit_query::{DateRangeReport, Granularity, TimeBucket};

use super::{parse_end, parse_start};
use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::{emit, Alignment, Column, Table, TableStyle};

/// Activity bucketed by hour, day or month
#[derive(Debug, Parser)]
pub struct StatsCommand {
    /// Start of the range (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_start)]
    pub since: DateTime<Utc>,

    /// End of the range (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_end)]
    pub until: DateTime<Utc>,

    /// Bucket width: hour, day or month
    #[arg(long, default_value_t = Granularity::Day)]
    pub granularity: Granularity,
}

impl StatsCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let report = ctx
            .query_service()?
            .by_date_range(Some(self.since), Some(self.until), self.granularity)
            .await?;
        emit(ctx.format, &report, |r: &DateRangeReport| {
            render_buckets(&r.buckets, ctx.table_style)
        })?;
        Ok(())
    }
}

/// One row per time bucket.
pub fn render_buckets(buckets: &[TimeBucket], style: TableStyle) -> String {
    let mut table = Table::new(vec![
        Column::new("Bucket"),
        Column::new("Events").align(Alignment::Right),
        Column::new("Errors").align(Alignment::Right),
        Column::new("Security").align(Alignment::Right),
        Column::new("Actions").max_width(60),
    ])
    .style(style);

    for bucket in buckets {
        let actions: Vec<String> = bucket.actions.iter().map(ToString::to_string).collect();
        table.add_row(vec![
            bucket.key.clone(),
            bucket.count.to_string(),
            bucket.errors.to_string(),
            bucket.security.to_string(),
            actions.join(", "),
        ]);
    }

    table.render()
}
