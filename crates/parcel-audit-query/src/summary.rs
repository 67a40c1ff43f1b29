//! Aggregations over event sets.

use parcel_audit_types::{AuditAction, AuditEvent, AuditOutcome, AuditPriority, SECURITY_TAG};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use strum::{Display, EnumString};

/// Count of events sharing an outcome and priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeCount {
    pub outcome: AuditOutcome,
    pub priority: AuditPriority,
    pub count: u64,
}

/// Breakdown for one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSummary {
    pub action: AuditAction,
    pub statuses: Vec<OutcomeCount>,
    pub total_count: u64,
}

/// Store-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_logs: u64,
    /// Events since local midnight.
    pub today_logs: u64,
    /// Events with an `ERROR` or `FAILURE` outcome.
    pub error_logs: u64,
    pub security_logs: u64,
}

/// Result of a summary query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    /// Per-action breakdown, ordered by action.
    pub summary: Vec<ActionSummary>,
    /// Events that matched the summary range.
    pub matched: u64,
    pub statistics: Statistics,
}

/// Group events by action, then by outcome and priority.
///
/// Statistics are left zeroed for the caller to fill in.
pub fn summarize(events: &[AuditEvent]) -> AuditSummary {
    let mut groups: BTreeMap<AuditAction, BTreeMap<(String, String), OutcomeCount>> =
        BTreeMap::new();

    for event in events {
        let key = (event.outcome().to_string(), event.priority().to_string());
        groups
            .entry(event.action())
            .or_default()
            .entry(key)
            .or_insert_with(|| OutcomeCount {
                outcome: event.outcome(),
                priority: event.priority(),
                count: 0,
            })
            .count += 1;
    }

    let summary = groups
        .into_iter()
        .map(|(action, statuses)| {
            let statuses: Vec<OutcomeCount> = statuses.into_values().collect();
            ActionSummary {
                action,
                total_count: statuses.iter().map(|s| s.count).sum(),
                statuses,
            }
        })
        .collect();

    AuditSummary {
        summary,
        matched: events.len() as u64,
        statistics: Statistics::default(),
    }
}

/// Width of a time bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Granularity {
    Hour,
    #[default]
    Day,
    Month,
}

impl Granularity {
    /// `strftime` pattern of the bucket key; keys sort chronologically.
    pub fn key_format(&self) -> &'static str {
        match self {
            Self::Hour => "%Y-%m-%d-%H",
            Self::Day => "%Y-%m-%d",
            Self::Month => "%Y-%m",
        }
    }
}

/// Activity within one time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeBucket {
    /// UTC bucket key, e.g. `2024-06-01` for day buckets.
    pub key: String,
    pub count: u64,
    pub errors: u64,
    pub security: u64,
    pub actions: BTreeSet<AuditAction>,
}

/// Group events into UTC time buckets, ascending by key.
pub fn bucket_events(events: &[AuditEvent], granularity: Granularity) -> Vec<TimeBucket> {
    let mut buckets: BTreeMap<String, TimeBucket> = BTreeMap::new();

    for event in events {
        let key = event
            .timestamp()
            .format(granularity.key_format())
            .to_string();
        let bucket = buckets.entry(key.clone()).or_insert_with(|| TimeBucket {
            key,
            count: 0,
            errors: 0,
            security: 0,
            actions: BTreeSet::new(),
        });
        bucket.count += 1;
        if event.outcome().is_error() {
            bucket.errors += 1;
        }
        if event.has_tag(SECURITY_TAG) {
            bucket.security += 1;
        }
        bucket.actions.insert(event.action());
    }

    buckets.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use test_case::test_case;

    fn at(action: AuditAction, outcome: AuditOutcome, hour: u32, day: u32) -> AuditEvent {
        AuditEvent::builder(action)
            .outcome(outcome)
            .build_at(Utc.with_ymd_and_hms(2024, 3, day, hour, 15, 0).unwrap())
    }

    #[test]
    fn test_summary_groups_by_action_then_outcome_priority() {
        let events = vec![
            at(AuditAction::UserSignin, AuditOutcome::Success, 1, 1),
            at(AuditAction::UserSignin, AuditOutcome::Success, 2, 1),
            at(AuditAction::UserSignin, AuditOutcome::Failure, 3, 1),
            at(AuditAction::LandCreate, AuditOutcome::Success, 4, 1),
        ];
        let summary = summarize(&events);

        assert_eq!(summary.matched, 4);
        assert_eq!(summary.summary.len(), 2);
        let signin = summary
            .summary
            .iter()
            .find(|s| s.action == AuditAction::UserSignin)
            .unwrap();
        assert_eq!(signin.total_count, 3);
        assert_eq!(signin.statuses.len(), 2);
        let total: u64 = summary.summary.iter().map(|s| s.total_count).sum();
        assert_eq!(total, summary.matched);
    }

    #[test_case(Granularity::Hour, 3 ; "hourly")]
    #[test_case(Granularity::Day, 2 ; "daily")]
    #[test_case(Granularity::Month, 1 ; "monthly")]
    fn test_bucket_counts(granularity: Granularity, buckets: usize) {
        let events = vec![
            at(AuditAction::LoginFailed, AuditOutcome::Failure, 9, 1),
            at(AuditAction::UserSignin, AuditOutcome::Success, 9, 1),
            at(AuditAction::ApiError, AuditOutcome::Error, 10, 1),
            at(AuditAction::UserSignin, AuditOutcome::Success, 9, 2),
        ];
        let result = bucket_events(&events, granularity);
        assert_eq!(result.len(), buckets);
        assert_eq!(result.iter().map(|b| b.count).sum::<u64>(), 4);
        assert!(result.windows(2).all(|w| w[0].key < w[1].key));
    }

    #[test]
    fn test_bucket_contents() {
        let events = vec![
            at(AuditAction::LoginFailed, AuditOutcome::Failure, 9, 1),
            at(AuditAction::UserSignin, AuditOutcome::Success, 9, 1),
            at(AuditAction::UserSignin, AuditOutcome::Success, 9, 1),
        ];
        let result = bucket_events(&events, Granularity::Hour);
        assert_eq!(result[0].key, "2024-03-01-09");
        assert_eq!(result[0].errors, 1);
        assert_eq!(result[0].security, 1);
        assert_eq!(
            result[0].actions,
            BTreeSet::from([AuditAction::UserSignin, AuditAction::LoginFailed])
        );
    }
}
