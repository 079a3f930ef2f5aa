// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tick loop driving every periodic job.
//!
//! Each tick runs, in order: stuck-version recovery, due syncs, scheduled
//! deliverables, the semi-auto sweep, delivery retries, the feedback sweep
//! and the retention purge. A failing job is logged and the tick moves on.

use std::sync::Arc;
use std::time::Duration;

use accrue_config::model::GenerationConfig;
use accrue_context::ContextStore;
use accrue_core::{AccrueError, StorageAdapter};
use accrue_feedback::FeedbackLoop;
use accrue_pipeline::GenerationPipeline;
use accrue_sync::{SyncOutcome, SyncScheduler};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::schedule::scheduled_run_due;

/// Approved versions observed per tick.
const FEEDBACK_BATCH: usize = 100;

/// The components the runner drives.
#[derive(Clone)]
pub struct CronJobs {
    pub storage: Arc<dyn StorageAdapter>,
    pub scheduler: Arc<SyncScheduler>,
    pub pipeline: Arc<GenerationPipeline>,
    pub feedback: Arc<FeedbackLoop>,
    pub store: Arc<ContextStore>,
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub recovered: usize,
    pub synced: usize,
    pub sync_failures: usize,
    pub runs_started: usize,
    pub auto_approved: usize,
    pub deliveries_retried: usize,
    pub observed: usize,
    pub purged: usize,
}

pub struct CronRunner {
    jobs: CronJobs,
    tick_interval: Duration,
    stuck_after: TimeDelta,
    retry_failed: bool,
}

impl CronRunner {
    pub fn new(jobs: CronJobs, tick_interval: Duration, generation: &GenerationConfig) -> Self {
        Self {
            jobs,
            tick_interval,
            stuck_after: TimeDelta::seconds(
                i64::try_from(generation.stuck_after_secs).unwrap_or(i64::MAX / 1000),
            ),
            retry_failed: generation.auto_retry_failed,
        }
    }

    /// Ticks until `cancel` fires. The first tick runs immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(interval_secs = self.tick_interval.as_secs(), "cron runner started");
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("cron runner stopping");
                    break;
                }
                _ = interval.tick() => {
                    let report = self.tick(Utc::now()).await;
                    debug!(?report, "cron tick finished");
                }
            }
        }
    }

    /// Runs every job once as of `now`.
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();
        let governance = self.jobs.pipeline.governance();

        match governance.recover_stuck(now, self.stuck_after).await {
            Ok(recovered) => report.recovered = recovered.len(),
            Err(e) => warn!(error = %e, "stuck version recovery failed"),
        }

        match self.jobs.scheduler.run_due(now).await {
            Ok(syncs) => {
                for sync in syncs {
                    match sync.outcome {
                        SyncOutcome::Synced { .. } => report.synced += 1,
                        SyncOutcome::Failed { .. } => report.sync_failures += 1,
                        SyncOutcome::Skipped { .. } => {}
                    }
                }
            }
            Err(e) => warn!(error = %e, "due sync pass failed"),
        }

        match self.run_scheduled(now).await {
            Ok(started) => report.runs_started = started,
            Err(e) => warn!(error = %e, "scheduled deliverable pass failed"),
        }

        match governance.sweep_auto_approvals(now).await {
            Ok(approved) => report.auto_approved = approved.len(),
            Err(e) => warn!(error = %e, "semi-auto sweep failed"),
        }

        match governance.retry_deliveries(now).await {
            Ok(retried) => report.deliveries_retried = retried.len(),
            Err(e) => warn!(error = %e, "delivery retry failed"),
        }

        match self.jobs.feedback.sweep(now, FEEDBACK_BATCH).await {
            Ok(observed) => report.observed = observed,
            Err(e) => warn!(error = %e, "feedback sweep failed"),
        }

        match self.jobs.store.purge_expired(now).await {
            Ok(purged) => report.purged = purged,
            Err(e) => warn!(error = %e, "retention purge failed"),
        }

        report
    }

    /// Starts every due scheduled deliverable concurrently. Returns how many
    /// runs produced a version.
    async fn run_scheduled(&self, now: DateTime<Utc>) -> Result<usize, AccrueError> {
        let mut due = Vec::new();
        for deliverable in self.jobs.storage.list_deliverables(None).await? {
            if deliverable.schedule.is_none() || deliverable.paused {
                continue;
            }
            let versions = self.jobs.storage.list_versions(&deliverable.id).await?;
            match scheduled_run_due(&deliverable, &versions, self.retry_failed, now) {
                Ok(true) => due.push(deliverable.id),
                Ok(false) => {}
                Err(e) => warn!(deliverable_id = %deliverable.id, error = %e, "skipping deliverable"),
            }
        }

        let runs = due.iter().map(|id| async move {
            match self.jobs.pipeline.run_deliverable(id, now).await {
                Ok(_) => true,
                Err(AccrueError::ConcurrencyConflict { .. }) => {
                    debug!(deliverable_id = %id, "scheduled run skipped, already running");
                    false
                }
                Err(e) => {
                    warn!(deliverable_id = %id, error = %e, "scheduled run failed");
                    false
                }
            }
        });
        let started = futures::future::join_all(runs)
            .await
            .into_iter()
            .filter(|ok| *ok)
            .count();
        Ok(started)
    }
}
