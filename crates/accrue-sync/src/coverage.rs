// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Coverage state, derived on every read from a resource's stored sync
//! timestamps. Nothing persists the state itself.

use accrue_core::{CoverageState, Resource};
use chrono::{DateTime, TimeDelta, Utc};

/// Threshold after which synced content counts as stale.
pub fn stale_after(interval: TimeDelta, multiplier: f64) -> TimeDelta {
    let millis = interval.num_milliseconds() as f64 * multiplier;
    TimeDelta::milliseconds(millis.round() as i64)
}

/// Classifies a scheduled resource.
///
/// Errors do not feature here: a failed attempt leaves the state wherever the
/// last successful sync put it.
pub fn coverage_state(
    resource: &Resource,
    interval: TimeDelta,
    stale_multiplier: f64,
    now: DateTime<Utc>,
) -> CoverageState {
    if resource.excluded {
        return CoverageState::Excluded;
    }
    let Some(last_synced) = resource.last_synced else {
        return CoverageState::Uncovered;
    };
    if now - last_synced > stale_after(interval, stale_multiplier) {
        CoverageState::Stale
    } else if resource.last_sync_partial {
        CoverageState::Partial
    } else {
        CoverageState::Covered
    }
}

/// Whether a scheduled sync of `resource` is due at `now`.
///
/// A recent failure defers the next scheduled attempt by `retry_backoff`;
/// manual triggers bypass both checks.
pub fn sync_due(
    resource: &Resource,
    interval: TimeDelta,
    retry_backoff: TimeDelta,
    now: DateTime<Utc>,
) -> bool {
    if !resource.is_active() {
        return false;
    }
    if let Some(failed_at) = resource.last_error_at
        && resource.last_synced.is_none_or(|synced| failed_at > synced)
        && now - failed_at < retry_backoff
    {
        return false;
    }
    match resource.last_synced {
        None => true,
        Some(synced) => now - synced >= interval,
    }
}
