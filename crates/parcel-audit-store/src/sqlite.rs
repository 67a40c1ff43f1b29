//! SQLite-backed audit store.

use crate::{AuditFilter, AuditStore, Page, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parcel_audit_types::{AuditEvent, AuditEventId};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS audit_events (
    id            TEXT PRIMARY KEY,
    timestamp     TEXT NOT NULL,
    action        TEXT NOT NULL,
    user_id       TEXT,
    session_id    TEXT,
    resource_type TEXT,
    resource_id   TEXT,
    outcome       TEXT NOT NULL,
    priority      TEXT NOT NULL,
    ip_address    TEXT,
    tags          TEXT NOT NULL,
    payload       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_audit_user_time ON audit_events (user_id, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_audit_action_time ON audit_events (action, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_audit_resource ON audit_events (resource_type, resource_id);
CREATE INDEX IF NOT EXISTS idx_audit_outcome_time ON audit_events (outcome, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_audit_time ON audit_events (timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_audit_session ON audit_events (session_id);
CREATE INDEX IF NOT EXISTS idx_audit_ip_time ON audit_events (ip_address, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_audit_priority_time ON audit_events (priority, timestamp DESC);
";

const INSERT: &str = "INSERT OR IGNORE INTO audit_events
    (id, timestamp, action, user_id, session_id, resource_type, resource_id,
     outcome, priority, ip_address, tags, payload)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)";

/// Audit store persisted in a SQLite database.
///
/// Queryable fields are kept in indexed columns; the full event is kept as
/// JSON in `payload`. All statements run on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(Duration::from_secs(5))?;
        debug!(path = %path.as_ref().display(), "Opened audit database");
        Self::with_connection(conn)
    }

    /// Create a private in-memory database.
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }
}

/// Fixed-width UTC timestamp so text order equals time order.
fn timestamp_key(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn insert_row(conn: &Connection, event: &AuditEvent) -> StoreResult<usize> {
    let tags = serde_json::to_string(event.tags())?;
    let payload = serde_json::to_string(event)?;
    let resource = event.resource();

    let changed = conn.execute(
        INSERT,
        params![
            event.id().to_string(),
            timestamp_key(event.timestamp()),
            event.action().to_string(),
            event.user_id(),
            event.session_id(),
            resource.map(|r| r.resource_type.to_string()),
            resource.and_then(|r| r.id.as_deref()),
            event.outcome().to_string(),
            event.priority().to_string(),
            event.ip_address(),
            tags,
            payload,
        ],
    )?;
    Ok(changed)
}

/// Translate a filter into a WHERE clause and its bound values.
fn where_clause(filter: &AuditFilter) -> (String, Vec<Value>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    let mut eq = |column: &str, value: String| {
        conditions.push(format!("{column} = ?"));
        values.push(Value::Text(value));
    };

    if let Some(action) = filter.action {
        eq("action", action.to_string());
    }
    if let Some(priority) = filter.priority {
        eq("priority", priority.to_string());
    }
    if let Some(resource_type) = filter.resource_type {
        eq("resource_type", resource_type.to_string());
    }
    if let Some(actor) = &filter.actor_id {
        eq("user_id", actor.clone());
    }
    if let Some(session) = &filter.session_id {
        eq("session_id", session.clone());
    }
    if let Some(ip) = &filter.ip_address {
        eq("ip_address", ip.clone());
    }

    if !filter.outcomes.is_empty() {
        let marks = vec!["?"; filter.outcomes.len()].join(", ");
        conditions.push(format!("outcome IN ({marks})"));
        values.extend(filter.outcomes.iter().map(|o| Value::Text(o.to_string())));
    }
    if !filter.tags.is_empty() {
        let marks = vec!["?"; filter.tags.len()].join(", ");
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM json_each(audit_events.tags) WHERE json_each.value IN ({marks}))"
        ));
        values.extend(filter.tags.iter().cloned().map(Value::Text));
    }
    if let Some(start) = filter.start {
        conditions.push("timestamp >= ?".into());
        values.push(Value::Text(timestamp_key(start)));
    }
    if let Some(end) = filter.end {
        conditions.push("timestamp <= ?".into());
        values.push(Value::Text(timestamp_key(end)));
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

fn decode(payloads: Vec<String>) -> StoreResult<Vec<AuditEvent>> {
    payloads
        .iter()
        .map(|p| serde_json::from_str(p).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl AuditStore for SqliteStore {
    async fn insert(&self, event: &AuditEvent) -> StoreResult<()> {
        let event = event.clone();
        self.run(move |conn| insert_row(conn, &event).map(|_| ())).await
    }

    async fn insert_many(&self, events: &[AuditEvent]) -> StoreResult<usize> {
        if events.is_empty() {
            return Ok(0);
        }
        let events = events.to_vec();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            for event in &events {
                inserted += insert_row(&tx, event)?;
            }
            tx.commit()?;
            Ok(inserted)
        })
        .await
    }

    async fn get(&self, id: AuditEventId) -> StoreResult<Option<AuditEvent>> {
        self.run(move |conn| {
            let payload: Option<String> = conn
                .query_row(
                    "SELECT payload FROM audit_events WHERE id = ?1",
                    params![id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            payload
                .map(|p| serde_json::from_str(&p).map_err(StoreError::from))
                .transpose()
        })
        .await
    }

    async fn find(&self, filter: &AuditFilter, page: Option<Page>) -> StoreResult<Vec<AuditEvent>> {
        let (clause, mut values) = where_clause(filter);
        let mut sql = format!(
            "SELECT payload FROM audit_events{clause} ORDER BY timestamp DESC, id DESC"
        );
        if let Some(page) = page {
            sql.push_str(" LIMIT ? OFFSET ?");
            values.push(Value::Integer(i64::from(page.size)));
            values.push(Value::Integer(page.offset() as i64));
        }

        self.run(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let payloads = stmt
                .query_map(params_from_iter(values.iter()), |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            decode(payloads)
        })
        .await
    }

    async fn count(&self, filter: &AuditFilter) -> StoreResult<u64> {
        let (clause, values) = where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM audit_events{clause}");
        self.run(move |conn| {
            let count: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        self.run(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM audit_events WHERE timestamp < ?1",
                params![timestamp_key(cutoff)],
            )?;
            Ok(deleted as u64)
        })
        .await
    }
}
