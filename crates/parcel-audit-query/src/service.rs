//! Read-side operations over stored audit events.

use crate::error::{QueryError, QueryResult};
use crate::export::{write_all, ExportFormat};
use crate::summary::{bucket_events, summarize, AuditSummary, Granularity, TimeBucket};
use chrono::{DateTime, Duration, FixedOffset, Local, TimeZone, Utc};
use parcel_audit_store::{AuditFilter, AuditStore, Page};
use parcel_audit_types::{
    AuditEvent, AuditEventId, AuditOutcome, Clock, ResourceType, SystemClock, SECURITY_TAG,
};
use parcel_common_log::spans::query_span;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, Instrument};

/// Page position reported with a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    /// `ceil(total / limit)`.
    pub pages: u64,
}

impl Pagination {
    fn new(page: Page, total: u64) -> Self {
        let limit = u64::from(page.size);
        Self {
            page: page.number,
            limit: page.size,
            total,
            pages: total.div_ceil(limit),
        }
    }
}

/// One page of events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub logs: Vec<AuditEvent>,
    pub pagination: Pagination,
}

/// Rendered export ready to hand to a client.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutput {
    pub format: ExportFormat,
    pub file_name: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub count: usize,
}

/// Bucketed activity over a date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRangeReport {
    pub granularity: Granularity,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub buckets: Vec<TimeBucket>,
}

/// Query, aggregation, export and retention over an [`AuditStore`].
///
/// Every operation except [`AuditQueryService::cleanup`] is read-only.
/// Authorization is the caller's job.
#[derive(Clone)]
pub struct AuditQueryService {
    store: Arc<dyn AuditStore>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl AuditQueryService {
    /// Service using the system clock and the local UTC offset for "today".
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            offset: *Local::now().offset(),
        }
    }

    /// Use `clock` for "now".
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the UTC offset whose midnight starts "today".
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// One page of matching events, newest first.
    pub async fn list(&self, filter: &AuditFilter, page: Page) -> QueryResult<Listing> {
        validate_page(page)?;
        validate_range(filter)?;

        async {
            let total = self.store.count(filter).await?;
            let logs = self.store.find(filter, Some(page)).await?;
            debug!(total, returned = logs.len(), "Listed audit logs");
            Ok::<_, QueryError>(Listing {
                logs,
                pagination: Pagination::new(page, total),
            })
        }
        .instrument(query_span("list"))
        .await
    }

    /// Fetch one event by id (`aud_<uuid>` or bare uuid).
    pub async fn get_by_id(&self, id: &str) -> QueryResult<AuditEvent> {
        let parsed: AuditEventId = id
            .parse()
            .map_err(|_| QueryError::validation(format!("malformed audit log id: {id}")))?;
        self.store
            .get(parsed)
            .await?
            .ok_or_else(|| QueryError::NotFound(id.to_string()))
    }

    /// Per-action breakdown within an optional range, plus global counters.
    pub async fn summary(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> QueryResult<AuditSummary> {
        let filter = AuditFilter::new().between(start, end);
        validate_range(&filter)?;

        async {
            let matched = self.store.find(&filter, None).await?;
            let mut summary = summarize(&matched);

            let stats = &mut summary.statistics;
            stats.total_logs = self.store.count(&AuditFilter::new()).await?;
            stats.today_logs = self
                .store
                .count(&AuditFilter::new().between(Some(self.start_of_today()), None))
                .await?;
            stats.error_logs = self.store.count(&error_filter()).await?;
            stats.security_logs = self
                .store
                .count(&AuditFilter::new().tag(SECURITY_TAG))
                .await?;
            Ok::<_, QueryError>(summary)
        }
        .instrument(query_span("summary"))
        .await
    }

    /// Activity bucketed by hour, day or month. Both bounds are required.
    pub async fn by_date_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        granularity: Granularity,
    ) -> QueryResult<DateRangeReport> {
        let (Some(start), Some(end)) = (start, end) else {
            return Err(QueryError::validation(
                "start date and end date are required",
            ));
        };
        let filter = AuditFilter::new().between(Some(start), Some(end));
        validate_range(&filter)?;

        let events = self
            .store
            .find(&filter, None)
            .instrument(query_span("by_date_range"))
            .await?;
        Ok(DateRangeReport {
            granularity,
            start,
            end,
            buckets: bucket_events(&events, granularity),
        })
    }

    /// Render every matching event, newest first.
    pub async fn export(&self, filter: &AuditFilter, format: ExportFormat) -> QueryResult<ExportOutput> {
        validate_range(filter)?;
        let events = self
            .store
            .find(filter, None)
            .instrument(query_span("export"))
            .await?;

        let mut body = Vec::new();
        write_all(&mut body, format, &events)?;
        info!(format = %format, count = events.len(), bytes = body.len(), "Exported audit logs");

        Ok(ExportOutput {
            format,
            file_name: format.file_name(self.clock.now()),
            content_type: format.content_type(),
            body,
            count: events.len(),
        })
    }

    /// Delete events older than `retention_days`. Returns the number deleted.
    pub async fn cleanup(&self, retention_days: u32) -> QueryResult<u64> {
        if retention_days == 0 {
            return Err(QueryError::validation("retention must be at least one day"));
        }
        let cutoff = self
            .clock
            .now()
            .checked_sub_signed(Duration::days(i64::from(retention_days)))
            .ok_or_else(|| QueryError::validation("retention period out of range"))?;
        let deleted = self.store.delete_before(cutoff).await?;
        info!(retention_days, deleted, %cutoff, "Deleted old audit logs");
        Ok(deleted)
    }

    /// Events acted by one user.
    pub async fn user_logs(
        &self,
        user_id: &str,
        filter: AuditFilter,
        page: Page,
    ) -> QueryResult<Listing> {
        self.list(&filter.actor_id(user_id), page).await
    }

    /// Events about the system itself.
    pub async fn system_logs(&self, filter: AuditFilter, page: Page) -> QueryResult<Listing> {
        self.list(&filter.resource_type(ResourceType::System), page)
            .await
    }

    /// Security-tagged events.
    pub async fn security_logs(&self, filter: AuditFilter, page: Page) -> QueryResult<Listing> {
        let mut filter = filter;
        filter.tags = vec![SECURITY_TAG.to_string()];
        self.list(&filter, page).await
    }

    /// Events with an `ERROR` or `FAILURE` outcome.
    pub async fn error_logs(&self, filter: AuditFilter, page: Page) -> QueryResult<Listing> {
        let mut filter = filter;
        filter.outcomes = error_filter().outcomes;
        self.list(&filter, page).await
    }

    fn start_of_today(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        now.with_timezone(&self.offset)
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| self.offset.from_local_datetime(&midnight).single())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now)
    }
}

fn error_filter() -> AuditFilter {
    AuditFilter::new()
        .outcome(AuditOutcome::Error)
        .outcome(AuditOutcome::Failure)
}

fn validate_page(page: Page) -> QueryResult<()> {
    if page.number == 0 {
        return Err(QueryError::validation("page numbers start at 1"));
    }
    if page.size == 0 {
        return Err(QueryError::validation("page size must be at least 1"));
    }
    Ok(())
}

fn validate_range(filter: &AuditFilter) -> QueryResult<()> {
    match (filter.start, filter.end) {
        (Some(start), Some(end)) if start > end => Err(QueryError::validation(
            "start date must not be after end date",
        )),
        _ => Ok(()),
    }
}
