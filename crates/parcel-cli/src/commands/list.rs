//! `list` command.

use chrono::SecondsFormat;
use clap::Parser;
use parcel_audit_query::{Listing, Page};
use parcel_audit_types::AuditEvent;

use super::FilterArgs;
use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::{emit, Column, Table, TableStyle};

/// List audit logs, newest first
#[derive(Debug, Parser)]
pub struct ListCommand {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Records per page
    #[arg(long, default_value_t = 50)]
    pub limit: u32,
}

impl ListCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let service = ctx.query_service()?;
        let listing = service
            .list(&self.filter.to_filter(), Page::new(self.page, self.limit))
            .await?;

        emit(ctx.format, &listing, |listing: &Listing| {
            let p = &listing.pagination;
            format!(
                "{}page {}/{} ({} total)\n",
                render_events(&listing.logs, ctx.table_style),
                p.page,
                p.pages.max(1),
                p.total
            )
        })?;
        Ok(())
    }
}

/// One table row per event.
pub fn render_events(events: &[AuditEvent], style: TableStyle) -> String {
    let mut table = Table::new(vec![
        Column::new("Timestamp"),
        Column::new("Action"),
        Column::new("User"),
        Column::new("Resource").max_width(24),
        Column::new("Outcome"),
        Column::new("Priority"),
        Column::new("Id"),
    ])
    .style(style);

    for event in events {
        let resource = event
            .resource()
            .map(|r| match &r.id {
                Some(id) => format!("{}:{id}", r.resource_type),
                None => r.resource_type.to_string(),
            })
            .unwrap_or_default();

        table.add_row(vec![
            event.timestamp().to_rfc3339_opts(SecondsFormat::Secs, true),
            event.action().to_string(),
            event.actor().map(|a| a.identifier().to_string()).unwrap_or_default(),
            resource,
            event.outcome().to_string(),
            event.priority().to_string(),
            event.id().to_string(),
        ]);
    }

    table.render()
}
