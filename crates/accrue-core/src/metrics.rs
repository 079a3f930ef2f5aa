// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. Without an installed recorder every call is a
//! no-op.

use ::metrics::{describe_counter, describe_histogram};

/// Register all Accrue metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("accrue_sync_runs_total", "Resource sync attempts by outcome");
    describe_counter!("accrue_items_ingested_total", "Context items newly stored by syncs");
    describe_counter!(
        "accrue_generation_runs_total",
        "Generation pipeline runs by outcome"
    );
    describe_histogram!(
        "accrue_generation_duration_seconds",
        "Wall time of one draft generator call"
    );
    describe_counter!(
        "accrue_version_transitions_total",
        "Version status transitions by target status"
    );
    describe_counter!(
        "accrue_feedback_preferences_learned_total",
        "Learned preference items written by the feedback loop"
    );
    describe_counter!(
        "accrue_context_sources_failed_total",
        "Deliverable sources that failed during aggregation"
    );
}

/// Record a sync attempt (`ok`, `partial`, `error`, `timeout`).
pub fn record_sync(outcome: &'static str, inserted: usize) {
    ::metrics::counter!("accrue_sync_runs_total", "outcome" => outcome).increment(1);
    if inserted > 0 {
        ::metrics::counter!("accrue_items_ingested_total").increment(inserted as u64);
    }
}

/// Record the end of a generation run (`staged`, `failed`, `conflict`).
pub fn record_generation(outcome: &'static str) {
    ::metrics::counter!("accrue_generation_runs_total", "outcome" => outcome).increment(1);
}

pub fn record_generation_duration(seconds: f64) {
    ::metrics::histogram!("accrue_generation_duration_seconds").record(seconds);
}

pub fn record_transition(to: &'static str) {
    ::metrics::counter!("accrue_version_transitions_total", "to" => to).increment(1);
}

pub fn record_preference_learned() {
    ::metrics::counter!("accrue_feedback_preferences_learned_total").increment(1);
}

pub fn record_source_failed() {
    ::metrics::counter!("accrue_context_sources_failed_total").increment(1);
}
