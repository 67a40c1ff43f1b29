//! Filter flags shared by `list` and `export`.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Args;
use parcel_audit_query::AuditFilter;
use parcel_audit_types::{AuditAction, AuditOutcome, AuditPriority, ResourceType};

/// Audit log filter flags.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Only this action (e.g. USER_SIGNIN)
    #[arg(long)]
    pub action: Option<AuditAction>,

    /// Only these outcomes (repeatable: SUCCESS, FAILURE, WARNING, ERROR)
    #[arg(long = "outcome")]
    pub outcomes: Vec<AuditOutcome>,

    /// Only this priority (LOW, MEDIUM, HIGH, CRITICAL)
    #[arg(long)]
    pub priority: Option<AuditPriority>,

    /// Only this resource type (e.g. LAND)
    #[arg(long)]
    pub resource_type: Option<ResourceType>,

    /// Only events acted by this user id
    #[arg(long = "user")]
    pub user_id: Option<String>,

    /// Only events in this session
    #[arg(long = "session")]
    pub session_id: Option<String>,

    /// Only events from this client IP
    #[arg(long = "ip")]
    pub ip_address: Option<String>,

    /// Only events carrying every given tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Start of the range (RFC 3339 or YYYY-MM-DD, inclusive)
    #[arg(long, value_parser = parse_start)]
    pub since: Option<DateTime<Utc>>,

    /// End of the range (RFC 3339 or YYYY-MM-DD, inclusive of the whole day)
    #[arg(long, value_parser = parse_end)]
    pub until: Option<DateTime<Utc>>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> AuditFilter {
        AuditFilter {
            action: self.action,
            outcomes: self.outcomes.clone(),
            priority: self.priority,
            resource_type: self.resource_type,
            actor_id: self.user_id.clone(),
            session_id: self.session_id.clone(),
            ip_address: self.ip_address.clone(),
            tags: self.tags.clone(),
            start: self.since,
            end: self.until,
        }
    }
}

/// Parse a range start; a bare date means its first instant (UTC).
pub fn parse_start(value: &str) -> Result<DateTime<Utc>, String> {
    parse_instant(value, NaiveTime::MIN)
}

/// Parse a range end; a bare date means its last millisecond (UTC).
pub fn parse_end(value: &str) -> Result<DateTime<Utc>, String> {
    let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    parse_instant(value, end_of_day)
}

fn parse_instant(value: &str, date_time: NaiveTime) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| Utc.from_utc_datetime(&date.and_time(date_time)))
        .map_err(|_| format!("expected RFC 3339 timestamp or YYYY-MM-DD, got {value:?}"))
}
