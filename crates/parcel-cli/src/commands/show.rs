//! `show` command.

use chrono::SecondsFormat;
use clap::Parser;
use parcel_audit_types::AuditEvent;
use std::fmt::Write as _;

use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::emit;

/// Show one audit log by id
#[derive(Debug, Parser)]
pub struct ShowCommand {
    /// Audit log id (`aud_<uuid>` or a bare uuid)
    pub id: String,
}

impl ShowCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let event = ctx.query_service()?.get_by_id(&self.id).await?;
        emit(ctx.format, &event, render_event)?;
        Ok(())
    }
}

/// Labelled, multi-line rendering of one event.
pub fn render_event(event: &AuditEvent) -> String {
    let mut out = String::new();
    let mut line = |label: &str, value: &str| {
        if !value.is_empty() {
            let _ = writeln!(out, "{label:<12}{value}");
        }
    };

    line("Id", &event.id().to_string());
    line(
        "Timestamp",
        &event.timestamp().to_rfc3339_opts(SecondsFormat::Millis, true),
    );
    line("Action", &event.action().to_string());
    line("Outcome", &event.outcome().to_string());
    line("Priority", &event.priority().to_string());

    if let Some(actor) = event.actor() {
        line("User", &actor.user_id);
        line("Email", actor.email.as_deref().unwrap_or_default());
        line("Role", actor.role.as_deref().unwrap_or_default());
    }
    line("Session", event.session_id().unwrap_or_default());

    if let Some(resource) = event.resource() {
        line("Resource", &resource.resource_type.to_string());
        line("Resource id", resource.id.as_deref().unwrap_or_default());
        line("Name", resource.name.as_deref().unwrap_or_default());
    }

    if let Some(request) = event.request() {
        let method = request.method.map(|m| m.to_string()).unwrap_or_default();
        let endpoint = request.endpoint.as_deref().unwrap_or_default();
        line("Request", format!("{method} {endpoint}").trim());
        line("IP", request.ip_address.as_deref().unwrap_or_default());
        line("User agent", request.user_agent.as_deref().unwrap_or_default());
    }
    line(
        "Status",
        &event.status_code().map(|c| c.to_string()).unwrap_or_default(),
    );
    if let Some(duration) = event.metrics().and_then(|m| m.duration_ms) {
        line("Duration", &format!("{duration} ms"));
    }
    line("Error", event.error_message().unwrap_or_default());

    let tags: Vec<&str> = event.tags().iter().map(String::as_str).collect();
    line("Tags", &tags.join(", "));

    if let Some(changes) = event.change_set() {
        for change in &changes.changes {
            line("Change", change);
        }
    }
    for (key, value) in event.metadata() {
        line("Metadata", &format!("{key} = {value}"));
    }

    out
}
