//! `export` command.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, ValueHint};
use parcel_audit_query::ExportFormat;
use tracing::info;

use super::FilterArgs;
use crate::cli::CommandContext;
use crate::error::CliError;

/// Export matching audit logs as CSV, JSON or JSON Lines
#[derive(Debug, Parser)]
pub struct ExportCommand {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Export format: csv, json or jsonlines
    #[arg(long = "format", short = 'f', default_value_t = ExportFormat::Csv)]
    pub export_format: ExportFormat,

    /// Output file, or a directory to receive `audit-logs-<date>.<ext>`.
    /// Writes to stdout when omitted.
    #[arg(short, long, value_hint = ValueHint::AnyPath)]
    pub output: Option<PathBuf>,
}

impl ExportCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let export = ctx
            .query_service()?
            .export(&self.filter.to_filter(), self.export_format)
            .await?;

        match &self.output {
            None => {
                let stdout = std::io::stdout();
                let mut out = stdout.lock();
                out.write_all(&export.body)?;
                if export.format == ExportFormat::Csv {
                    writeln!(out)?;
                }
                out.flush()?;
            }
            Some(path) => {
                let path = if path.is_dir() {
                    path.join(&export.file_name)
                } else {
                    path.clone()
                };
                std::fs::write(&path, &export.body).map_err(|e| {
                    CliError::io_with_path(
                        format!("Failed to write export to {}", path.display()),
                        e,
                        &path,
                    )
                })?;
                info!(
                    path = %path.display(),
                    count = export.count,
                    content_type = export.content_type,
                    "Export written"
                );
            }
        }
        Ok(())
    }
}
