//! `ingest` command: JSON-lines event submissions into the batching engine.

use std::collections::BTreeMap;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Parser, ValueHint};
use parcel_audit_capture::{AuditLogger, BatchConfig};
use parcel_audit_types::{
    AuditAction, AuditActor, AuditEvent, AuditOutcome, AuditPriority, RequestContext,
    RequestMetrics, ResourceRef,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::emit;

/// Read JSON-lines event submissions from stdin into the store
///
/// Each line is one submission. Malformed lines are logged and skipped.
/// Pending events are drained on end of input or Ctrl-C.
#[derive(Debug, Parser)]
pub struct IngestCommand {
    /// Read from this file instead of stdin
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    /// How long to wait for the final drain (ms)
    #[arg(long, default_value_t = 10_000)]
    pub drain_wait_ms: u64,
}

/// One event as submitted by a producer.
///
/// Tags are derived on build; `tags` only adds extra markers.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventSubmission {
    pub action: AuditAction,
    #[serde(default)]
    pub actor: Option<AuditActor>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub resource: Option<ResourceRef>,
    #[serde(default)]
    pub request: Option<RequestContext>,
    #[serde(default)]
    pub before: Option<Value>,
    #[serde(default)]
    pub after: Option<Value>,
    #[serde(default)]
    pub outcome: AuditOutcome,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub error_stack: Option<String>,
    #[serde(default)]
    pub metrics: Option<RequestMetrics>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: AuditPriority,
    /// Occurrence time; defaults to the time of ingestion.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl EventSubmission {
    pub fn into_event(self) -> AuditEvent {
        let mut builder = AuditEvent::builder(self.action)
            .maybe_actor(self.actor)
            .maybe_session_id(self.session_id)
            .outcome(self.outcome)
            .maybe_status_code(self.status_code)
            .priority(self.priority);

        if let Some(resource) = self.resource {
            builder = builder.resource(resource);
        }
        if let Some(request) = self.request {
            builder = builder.request(request);
        }
        if self.before.is_some() || self.after.is_some() {
            builder = builder.changes(self.before, self.after);
        }
        if let Some(message) = self.error_message {
            builder = builder.error(message, self.error_stack);
        }
        if let Some(metrics) = self.metrics {
            builder = builder.metrics(metrics);
        }
        for (key, value) in self.metadata {
            builder = builder.metadata(key, value);
        }
        for tag in self.tags {
            builder = builder.tag(tag);
        }

        builder.build_at(self.timestamp.unwrap_or_else(Utc::now))
    }
}

/// What an ingest run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Submissions handed to the engine and admitted by it.
    pub accepted: u64,
    /// Submissions below the configured level or with auditing disabled.
    pub skipped: u64,
    /// Lines that did not parse.
    pub rejected: u64,
    /// Input stopped early because of a shutdown signal.
    pub interrupted: bool,
    /// The final drain finished within its wait.
    pub drained: bool,
    /// Events queued or mid-write when the drain gave up.
    pub lost: usize,
}

/// Feed JSON-lines submissions from `reader` into `logger` until end of
/// input or until `shutdown` resolves, then drain within `drain_wait`.
///
/// Read errors stop the loop and are returned after the drain.
pub async fn ingest<R, S>(
    reader: R,
    logger: &AuditLogger,
    shutdown: S,
    drain_wait: Duration,
) -> io::Result<IngestReport>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = reader.lines();
    let mut report = IngestReport::default();
    let mut line_no: u64 = 0;
    let mut read_error = None;
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            _ = &mut shutdown => {
                info!(line = line_no, "Shutdown requested; stopping ingest");
                report.interrupted = true;
                break;
            }
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(line = line_no, error = %e, "Failed to read input");
                read_error = Some(e);
                break;
            }
        };
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<EventSubmission>(&line) {
            Ok(submission) => {
                let event = submission.into_event();
                if logger.admits(&event) {
                    report.accepted += 1;
                } else {
                    report.skipped += 1;
                }
                logger.submit(event).await;
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "Rejected event submission");
                report.rejected += 1;
            }
        }
    }

    report.drained = logger.shutdown(drain_wait).await;
    report.lost = logger.unsettled_len();
    debug!(?report, stats = ?logger.stats(), "Ingest finished");

    match read_error {
        Some(e) => Err(e),
        None => Ok(report),
    }
}

impl IngestCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let logger = AuditLogger::new(BatchConfig::from(&ctx.config.audit), ctx.open_store()?);
        let wait = Duration::from_millis(self.drain_wait_ms);

        let report = match &self.file {
            Some(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|e| {
                    CliError::io_with_path(format!("Failed to open {}", path.display()), e, path)
                })?;
                ingest(BufReader::new(file), &logger, ctrl_c(), wait).await?
            }
            None => ingest(BufReader::new(tokio::io::stdin()), &logger, ctrl_c(), wait).await?,
        };

        emit(ctx.format, &report, |r| {
            format!(
                "Ingested {} events ({} skipped, {} rejected){}",
                r.accepted,
                r.skipped,
                r.rejected,
                if r.drained { "" } else { "; drain timed out" }
            )
        })?;

        if !report.drained {
            return Err(CliError::Store {
                message: format!("{} audit events were not persisted", report.lost),
                source: None,
            });
        }
        if report.interrupted {
            return Err(CliError::Interrupted);
        }
        Ok(())
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C; ingest stops only at end of input");
        std::future::pending::<()>().await;
    }
}
