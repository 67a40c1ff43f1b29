//! Tag derivation.

use crate::{AuditAction, AuditOutcome, AuditPriority};
use std::collections::BTreeSet;

/// Marker tag for security-relevant events.
pub const SECURITY_TAG: &str = "SECURITY";

/// Marker tag for failed or errored events.
pub const ERROR_TAG: &str = "ERROR";

/// Actions that always carry the security marker.
pub const SECURITY_ACTIONS: [AuditAction; 4] = [
    AuditAction::LoginAttempt,
    AuditAction::LoginFailed,
    AuditAction::UnauthorizedAccess,
    AuditAction::SuspiciousActivity,
];

/// Derive the tag set of an event.
///
/// The result is the category, outcome and priority names, the security
/// marker for allowlisted actions, the error marker for `ERROR`/`FAILURE`
/// outcomes, and any caller-supplied markers. Feeding the output back in as
/// `extra` yields the same set.
pub fn derive_tags<I, S>(
    action: AuditAction,
    outcome: AuditOutcome,
    priority: AuditPriority,
    extra: I,
) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tags: BTreeSet<String> = extra.into_iter().map(|t| t.as_ref().to_string()).collect();

    tags.insert(action.category().to_string());
    tags.insert(outcome.to_string());
    tags.insert(priority.to_string());

    if SECURITY_ACTIONS.contains(&action) {
        tags.insert(SECURITY_TAG.to_string());
    }
    if outcome.is_error() {
        tags.insert(ERROR_TAG.to_string());
    }

    tags
}
