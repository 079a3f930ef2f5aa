// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cron expressions on deliverables.

use std::str::FromStr;

use accrue_core::{AccrueError, Deliverable, DeliverableVersion, VersionStatus};
use chrono::{DateTime, Utc};
use croner::Cron;

/// Parses a five-field cron expression.
pub fn parse_schedule(expression: &str) -> Result<Cron, AccrueError> {
    Cron::from_str(expression)
        .map_err(|e| AccrueError::InvalidRequest(format!("invalid schedule `{expression}`: {e}")))
}

/// First occurrence strictly after `after`.
pub fn next_occurrence(
    expression: &str,
    after: DateTime<Utc>,
) -> Result<DateTime<Utc>, AccrueError> {
    parse_schedule(expression)?
        .find_next_occurrence(&after, false)
        .map_err(|e| AccrueError::InvalidRequest(format!("schedule `{expression}` never fires: {e}")))
}

/// Whether a scheduled deliverable should run at `now`.
///
/// `history` is every version of the deliverable in ascending number order.
/// The anchor is the latest of creation, last successful run and last
/// attempt, so each occurrence is attempted at most once and a failed
/// attempt never stops later occurrences. With `retry_failed`, a failure
/// that follows a non-failed run is retried once on the next check instead
/// of waiting for the next occurrence.
pub fn scheduled_run_due(
    deliverable: &Deliverable,
    history: &[DeliverableVersion],
    retry_failed: bool,
    now: DateTime<Utc>,
) -> Result<bool, AccrueError> {
    let Some(expression) = deliverable.schedule.as_deref() else {
        return Ok(false);
    };
    if deliverable.paused {
        return Ok(false);
    }
    let failed = |v: &DeliverableVersion| v.status == VersionStatus::Failed;
    let first_failure = match history {
        [.., previous, last] => failed(last) && !failed(previous),
        [last] => failed(last),
        [] => false,
    };
    let latest = history.last();
    if retry_failed && first_failure && latest.is_some_and(|v| v.created_at < now) {
        return Ok(true);
    }
    let anchor = [
        Some(deliverable.created_at),
        deliverable.last_run_at,
        latest.map(|v| v.created_at),
    ]
    .into_iter()
    .flatten()
    .max()
    .unwrap_or(deliverable.created_at);
    Ok(next_occurrence(expression, anchor)? <= now)
}

#[cfg(test)]
mod tests {
    use accrue_core::{DeliverableType, DeliveryStatus, GovernanceMode};
    use chrono::TimeZone;

    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn deliverable(schedule: &str) -> Deliverable {
        Deliverable {
            id: "d1".into(),
            user_id: "u1".into(),
            title: "t".into(),
            deliverable_type: DeliverableType::Digest,
            schedule: Some(schedule.into()),
            sources: vec![],
            governance_mode: GovernanceMode::Manual,
            destination: None,
            instructions: None,
            paused: false,
            created_at: at(8, 0),
            last_run_at: None,
        }
    }

    fn version(status: VersionStatus, created_at: DateTime<Utc>) -> DeliverableVersion {
        DeliverableVersion {
            id: "v1".into(),
            deliverable_id: "d1".into(),
            version_number: 1,
            status,
            draft_content: None,
            final_content: None,
            delivery_status: DeliveryStatus::NotApplicable,
            failure_kind: None,
            error_reason: None,
            created_at,
            staged_at: None,
            decided_at: None,
            auto_approve_at: None,
        }
    }

    #[test]
    fn next_occurrence_is_strictly_after() {
        assert_eq!(next_occurrence("0 9 * * *", at(8, 0)).unwrap(), at(9, 0));
        assert_eq!(
            next_occurrence("0 9 * * *", at(9, 0)).unwrap(),
            at(9, 0) + chrono::TimeDelta::days(1)
        );
        assert!(parse_schedule("not a cron").is_err());
    }

    #[test]
    fn due_once_per_occurrence() {
        let d = deliverable("0 9 * * *");
        assert!(!scheduled_run_due(&d, &[], false, at(8, 59)).unwrap());
        assert!(scheduled_run_due(&d, &[], false, at(9, 0)).unwrap());

        let staged = version(VersionStatus::Staged, at(9, 0));
        assert!(!scheduled_run_due(&d, &[staged], false, at(12, 0)).unwrap());
    }

    #[test]
    fn a_failed_run_does_not_stop_later_occurrences() {
        let d = deliverable("0 9 * * *");
        let failed = version(VersionStatus::Failed, at(9, 0));
        let history = [failed];
        assert!(!scheduled_run_due(&d, &history, false, at(12, 0)).unwrap());
        let next_day = at(9, 0) + chrono::TimeDelta::days(1);
        assert!(scheduled_run_due(&d, &history, false, next_day).unwrap());
        let month_later = at(9, 0) + chrono::TimeDelta::days(30);
        assert!(scheduled_run_due(&d, &history, false, month_later).unwrap());
    }

    #[test]
    fn retry_enabled_reruns_a_first_failure_once_before_the_next_occurrence() {
        let d = deliverable("0 9 * * *");
        let ok = version(VersionStatus::Approved, at(8, 0) - chrono::TimeDelta::days(1));
        let failed = version(VersionStatus::Failed, at(9, 0));
        assert!(!scheduled_run_due(&d, &[failed.clone()], true, at(9, 0)).unwrap());
        assert!(scheduled_run_due(&d, &[failed.clone()], true, at(9, 1)).unwrap());
        assert!(scheduled_run_due(&d, &[ok, failed.clone()], true, at(9, 1)).unwrap());

        let retry_failed = version(VersionStatus::Failed, at(9, 1));
        let history = [failed, retry_failed];
        assert!(!scheduled_run_due(&d, &history, true, at(12, 0)).unwrap());
        let next_day = at(9, 0) + chrono::TimeDelta::days(1);
        assert!(scheduled_run_due(&d, &history, true, next_day).unwrap());
    }

    #[test]
    fn paused_and_unscheduled_never_run() {
        let mut d = deliverable("* * * * *");
        d.paused = true;
        assert!(!scheduled_run_due(&d, &[], false, at(12, 0)).unwrap());
        d.paused = false;
        d.schedule = None;
        assert!(!scheduled_run_due(&d, &[], false, at(12, 0)).unwrap());
    }
}
