//! Audit export writers.

use chrono::{DateTime, SecondsFormat, Utc};
use parcel_audit_types::AuditEvent;
use serde::{Deserialize, Serialize};
use std::io::Write;
use strum::{Display, EnumString};
use thiserror::Error;

/// Export format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    /// Quoted CSV with a fixed header.
    #[default]
    Csv,
    /// JSON object `{"logs": [...], "count": n}`.
    Json,
    /// JSON Lines (one event per line).
    JsonLines,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::JsonLines => "jsonl",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
            Self::JsonLines => "application/x-ndjson",
        }
    }

    /// Download file name for an export taken at `at`.
    pub fn file_name(&self, at: DateTime<Utc>) -> String {
        format!("audit-logs-{}.{}", at.format("%Y-%m-%d"), self.extension())
    }
}

/// Export error.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Export result.
pub type ExportResult<T> = Result<T, ExportError>;

/// Trait for export writers.
pub trait ExportWriter: Send {
    /// Write the export header.
    fn write_header(&mut self) -> ExportResult<()>;

    /// Write a single event.
    fn write_event(&mut self, event: &AuditEvent) -> ExportResult<()>;

    /// Write the export footer.
    fn write_footer(&mut self) -> ExportResult<()>;

    /// Flush all buffered data.
    fn flush(&mut self) -> ExportResult<()>;

    /// Get bytes written so far.
    fn bytes_written(&self) -> u64;
}

/// Create an export writer for the given format.
pub fn create_exporter<'w, W: Write + Send + 'w>(
    writer: W,
    format: ExportFormat,
) -> Box<dyn ExportWriter + 'w> {
    match format {
        ExportFormat::Csv => Box::new(CsvExporter::new(writer)),
        ExportFormat::Json => Box::new(JsonExporter::new(writer)),
        ExportFormat::JsonLines => Box::new(JsonLinesExporter::new(writer)),
    }
}

/// Write all events through the writer for `format`. Returns bytes written.
pub fn write_all<W: Write + Send>(
    writer: W,
    format: ExportFormat,
    events: &[AuditEvent],
) -> ExportResult<u64> {
    let mut exporter = create_exporter(writer, format);
    exporter.write_header()?;
    for event in events {
        exporter.write_event(event)?;
    }
    exporter.write_footer()?;
    exporter.flush()?;
    Ok(exporter.bytes_written())
}

/// CSV column headers, in output order.
pub const CSV_HEADERS: [&str; 14] = [
    "Timestamp",
    "Action",
    "User Email",
    "User Role",
    "Resource Type",
    "Resource Name",
    "Method",
    "Endpoint",
    "IP Address",
    "Status",
    "Status Code",
    "Duration (ms)",
    "Priority",
    "Tags",
];

/// Byte-counting wrapper shared by the writers.
struct Counted<W> {
    inner: W,
    written: u64,
}

impl<W: Write> Counted<W> {
    fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    fn put(&mut self, bytes: &[u8]) -> ExportResult<()> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }
}

/// CSV exporter.
///
/// Every field is double-quoted with embedded quotes doubled. Rows are
/// separated by `\n` with no trailing newline; tags are joined by `", "`.
pub struct CsvExporter<W> {
    out: Counted<W>,
}

impl<W: Write> CsvExporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            out: Counted::new(writer),
        }
    }

    fn write_row<S: AsRef<str>>(&mut self, fields: &[S]) -> ExportResult<()> {
        let row = fields
            .iter()
            .map(|f| format!("\"{}\"", f.as_ref().replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(",");
        self.out.put(row.as_bytes())
    }

    /// Column values for one event.
    pub fn row(event: &AuditEvent) -> [String; 14] {
        let actor = event.actor();
        let resource = event.resource();
        let request = event.request();
        let text = |v: Option<&str>| v.unwrap_or_default().to_string();

        [
            event
                .timestamp()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            event.action().to_string(),
            text(actor.and_then(|a| a.email.as_deref())),
            text(actor.and_then(|a| a.role.as_deref())),
            resource
                .map(|r| r.resource_type.to_string())
                .unwrap_or_default(),
            text(resource.and_then(|r| r.name.as_deref())),
            request
                .and_then(|r| r.method)
                .map(|m| m.to_string())
                .unwrap_or_default(),
            text(request.and_then(|r| r.endpoint.as_deref())),
            text(event.ip_address()),
            event.outcome().to_string(),
            event
                .status_code()
                .map(|c| c.to_string())
                .unwrap_or_default(),
            event
                .metrics()
                .and_then(|m| m.duration_ms)
                .map(|d| d.to_string())
                .unwrap_or_default(),
            event.priority().to_string(),
            event
                .tags()
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        ]
    }
}

impl<W: Write + Send> ExportWriter for CsvExporter<W> {
    fn write_header(&mut self) -> ExportResult<()> {
        self.write_row(&CSV_HEADERS)
    }

    fn write_event(&mut self, event: &AuditEvent) -> ExportResult<()> {
        self.out.put(b"\n")?;
        self.write_row(&Self::row(event))
    }

    fn write_footer(&mut self) -> ExportResult<()> {
        Ok(())
    }

    fn flush(&mut self) -> ExportResult<()> {
        self.out.inner.flush()?;
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.out.written
    }
}

/// JSON exporter producing `{"logs":[...],"count":n}`.
pub struct JsonExporter<W> {
    out: Counted<W>,
    count: usize,
}

impl<W: Write> JsonExporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            out: Counted::new(writer),
            count: 0,
        }
    }
}

impl<W: Write + Send> ExportWriter for JsonExporter<W> {
    fn write_header(&mut self) -> ExportResult<()> {
        self.out.put(b"{\"logs\":[")
    }

    fn write_event(&mut self, event: &AuditEvent) -> ExportResult<()> {
        if self.count > 0 {
            self.out.put(b",")?;
        }
        let json = serde_json::to_vec(event)?;
        self.out.put(&json)?;
        self.count += 1;
        Ok(())
    }

    fn write_footer(&mut self) -> ExportResult<()> {
        let footer = format!("],\"count\":{}}}", self.count);
        self.out.put(footer.as_bytes())
    }

    fn flush(&mut self) -> ExportResult<()> {
        self.out.inner.flush()?;
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.out.written
    }
}

/// JSON Lines exporter.
pub struct JsonLinesExporter<W> {
    out: Counted<W>,
}

impl<W: Write> JsonLinesExporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            out: Counted::new(writer),
        }
    }
}

impl<W: Write + Send> ExportWriter for JsonLinesExporter<W> {
    fn write_header(&mut self) -> ExportResult<()> {
        Ok(())
    }

    fn write_event(&mut self, event: &AuditEvent) -> ExportResult<()> {
        let mut json = serde_json::to_vec(event)?;
        json.push(b'\n');
        self.out.put(&json)
    }

    fn write_footer(&mut self) -> ExportResult<()> {
        Ok(())
    }

    fn flush(&mut self) -> ExportResult<()> {
        self.out.inner.flush()?;
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.out.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use parcel_audit_types::{
        AuditAction, AuditActor, AuditOutcome, AuditPriority, HttpMethod, RequestContext,
        RequestMetrics, ResourceRef, ResourceType,
    };
    use serde_json::Value;

    fn sample() -> AuditEvent {
        AuditEvent::builder(AuditAction::LandUpdate)
            .actor(AuditActor::user("u1").with_email("ana@example.com").with_role("seller"))
            .resource(ResourceRef::new(ResourceType::Land).with_name("Plot \"A\""))
            .request(RequestContext {
                method: Some(HttpMethod::Put),
                endpoint: Some("/api/lands/1".into()),
                ip_address: Some("10.0.0.1".into()),
                user_agent: None,
            })
            .status_code(200)
            .metrics(RequestMetrics {
                duration_ms: Some(35),
                ..Default::default()
            })
            .outcome(AuditOutcome::Success)
            .priority(AuditPriority::Medium)
            .build_at(Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap())
    }

    #[test]
    fn test_csv_row_columns() {
        let row = CsvExporter::<Vec<u8>>::row(&sample());
        assert_eq!(row[0], "2024-06-01T08:30:00.000Z");
        assert_eq!(row[1], "LAND_UPDATE");
        assert_eq!(row[2], "ana@example.com");
        assert_eq!(row[4], "LAND");
        assert_eq!(row[6], "PUT");
        assert_eq!(row[9], "SUCCESS");
        assert_eq!(row[10], "200");
        assert_eq!(row[11], "35");
        assert_eq!(row[12], "MEDIUM");
        assert_eq!(row[13], "LAND_MANAGEMENT, MEDIUM, SUCCESS");
    }

    #[test]
    fn test_csv_quotes_every_field() {
        let mut out = Vec::new();
        write_all(&mut out, ExportFormat::Csv, &[sample()]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.split('\n').collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("\"Timestamp\",\"Action\",\"User Email\""));
        assert!(lines[1].contains("\"Plot \"\"A\"\"\""));
    }

    #[test]
    fn test_json_export_counts() {
        let mut out = Vec::new();
        let bytes = write_all(&mut out, ExportFormat::Json, &[sample(), sample()]).unwrap();
        assert_eq!(bytes, out.len() as u64);

        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["count"], 2);
        assert_eq!(value["logs"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_json_lines_export() {
        let mut out = Vec::new();
        write_all(&mut out, ExportFormat::JsonLines, &[sample(), sample()]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 2, 9, 23, 59, 0).unwrap();
        assert_eq!(ExportFormat::Csv.file_name(at), "audit-logs-2024-02-09.csv");
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
    }
}
