// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use accrue_context::{ContextAggregator, ContextStore};
use accrue_core::{
    ContentType, ContextItem, Deliverable, DeliverableType, FetchedItem, GovernanceMode, PlanTier,
    Platform, ResourceKey, StorageAdapter, VersionStatus,
};
use accrue_cron::{CronJobs, CronRunner};
use accrue_feedback::FeedbackLoop;
use accrue_pipeline::{GenerationPipeline, Governance};
use accrue_sync::{SyncScheduler, TierPolicy};
use accrue_test_utils::{TestHarness, t0};
use chrono::TimeDelta;
use tokio_util::sync::CancellationToken;

async fn setup(
    configure: impl FnOnce(&mut accrue_config::model::AccrueConfig),
) -> (TestHarness, CronRunner) {
    let h = TestHarness::builder()
        .with_user("u1", PlanTier::Pro)
        .configure(configure)
        .build()
        .await
        .unwrap();
    let policy = Arc::new(TierPolicy::from_config(&h.config.tiers));
    let scheduler = Arc::new(SyncScheduler::new(
        h.storage(),
        h.connector.clone(),
        policy,
        h.config.sync.clone(),
    ));
    let aggregator = Arc::new(ContextAggregator::new(
        h.storage(),
        h.connector.clone(),
        h.fetcher.clone(),
        &h.config.context,
        &h.config.tiers,
    ));
    let governance = Arc::new(Governance::new(
        h.storage(),
        Some(h.delivery.clone()),
        &h.config.governance,
    ));
    let pipeline = Arc::new(GenerationPipeline::new(
        h.storage(),
        aggregator,
        h.generator.clone(),
        governance,
        h.config.generation.clone(),
    ));
    let jobs = CronJobs {
        storage: h.storage(),
        scheduler,
        pipeline,
        feedback: Arc::new(FeedbackLoop::new(h.storage(), &h.config.feedback)),
        store: Arc::new(ContextStore::new(h.storage(), &h.config.context)),
    };
    let runner = CronRunner::new(jobs, Duration::from_secs(3600), &h.config.generation);
    (h, runner)
}

async fn scheduled(h: &TestHarness, id: &str, schedule: &str, mode: GovernanceMode) {
    h.storage
        .create_deliverable(&Deliverable {
            id: id.into(),
            user_id: "u1".into(),
            title: "Morning digest".into(),
            deliverable_type: DeliverableType::Digest,
            schedule: Some(schedule.into()),
            sources: vec![],
            governance_mode: mode,
            destination: None,
            instructions: None,
            paused: false,
            created_at: t0() - TimeDelta::hours(1),
            last_run_at: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn scheduled_deliverables_run_once_per_occurrence() {
    let (h, runner) = setup(|_| {}).await;
    scheduled(&h, "d1", "0 9 * * *", GovernanceMode::Manual).await;
    scheduled(&h, "d2", "0 12 * * *", GovernanceMode::Manual).await;

    let first = runner.tick(t0()).await;
    assert_eq!(first.runs_started, 1);
    assert_eq!(h.storage.list_versions("d1").await.unwrap().len(), 1);
    assert!(h.storage.list_versions("d2").await.unwrap().is_empty());

    let again = runner.tick(t0() + TimeDelta::hours(1)).await;
    assert_eq!(again.runs_started, 0);

    let noon = runner.tick(t0() + TimeDelta::hours(3)).await;
    assert_eq!(noon.runs_started, 1);
    assert_eq!(h.storage.list_versions("d2").await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_scheduled_runs_wait_for_the_next_occurrence_by_default() {
    let (h, runner) = setup(|_| {}).await;
    scheduled(&h, "d1", "0 * * * *", GovernanceMode::Manual).await;
    h.generator.add_error("boom").await;

    assert_eq!(runner.tick(t0()).await.runs_started, 1);
    let versions = h.storage.list_versions("d1").await.unwrap();
    assert_eq!(versions[0].status, VersionStatus::Failed);

    assert_eq!(runner.tick(t0() + TimeDelta::minutes(30)).await.runs_started, 0);
    assert_eq!(runner.tick(t0() + TimeDelta::hours(1)).await.runs_started, 1);
    let versions = h.storage.list_versions("d1").await.unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[1].status, VersionStatus::Staged);
}

#[tokio::test]
async fn daily_deliverable_keeps_running_after_a_failure() {
    let (h, runner) = setup(|_| {}).await;
    scheduled(&h, "d1", "0 9 * * *", GovernanceMode::Manual).await;
    h.generator.add_error("boom").await;

    runner.tick(t0()).await;
    assert_eq!(runner.tick(t0() + TimeDelta::hours(6)).await.runs_started, 0);
    assert_eq!(runner.tick(t0() + TimeDelta::days(1)).await.runs_started, 1);
    let statuses: Vec<VersionStatus> = h
        .storage
        .list_versions("d1")
        .await
        .unwrap()
        .iter()
        .map(|v| v.status)
        .collect();
    assert_eq!(statuses, vec![VersionStatus::Failed, VersionStatus::Staged]);
}

#[tokio::test]
async fn failed_scheduled_runs_retry_on_the_next_tick_when_enabled() {
    let (h, runner) = setup(|c| c.generation.auto_retry_failed = true).await;
    scheduled(&h, "d1", "0 * * * *", GovernanceMode::Manual).await;
    h.generator.add_error("boom").await;
    h.generator.add_error("boom again").await;

    runner.tick(t0()).await;
    assert_eq!(runner.tick(t0() + TimeDelta::minutes(1)).await.runs_started, 1);
    // The retry failed too; no further retry before the next occurrence.
    assert_eq!(runner.tick(t0() + TimeDelta::minutes(2)).await.runs_started, 0);
    assert_eq!(runner.tick(t0() + TimeDelta::hours(1)).await.runs_started, 1);
    let statuses: Vec<VersionStatus> = h
        .storage
        .list_versions("d1")
        .await
        .unwrap()
        .iter()
        .map(|v| v.status)
        .collect();
    assert_eq!(
        statuses,
        vec![VersionStatus::Failed, VersionStatus::Failed, VersionStatus::Staged]
    );
}

#[tokio::test]
async fn semi_auto_versions_approve_and_feed_back_on_later_ticks() {
    let (h, runner) = setup(|c| c.governance.semi_auto_window_secs = 600).await;
    scheduled(&h, "d1", "0 9 * * *", GovernanceMode::SemiAuto).await;

    let first = runner.tick(t0()).await;
    assert_eq!(first.runs_started, 1);
    assert_eq!(first.auto_approved, 0);

    let later = runner.tick(t0() + TimeDelta::minutes(10)).await;
    assert_eq!(later.auto_approved, 1);
    assert_eq!(later.observed, 1);
    let versions = h.storage.list_versions("d1").await.unwrap();
    assert_eq!(versions[0].status, VersionStatus::Approved);
}

#[tokio::test]
async fn due_syncs_recovery_and_purge_run_each_tick() {
    let (h, runner) = setup(|_| {}).await;
    h.seed_resource("u1", Platform::Slack, "C1", Some(t0() - TimeDelta::days(1)))
        .await
        .unwrap();

    let key = ResourceKey::new("u1", Platform::Slack, "OLD");
    let old = ContextItem::from_fetched(
        &key,
        FetchedItem {
            external_id: "m-old".into(),
            content: "ancient".into(),
            content_type: ContentType::Message,
            source_timestamp: t0() - TimeDelta::days(200),
        },
        t0() - TimeDelta::days(200),
    );
    h.storage.insert_items(&[old]).await.unwrap();

    h.storage
        .create_deliverable(&Deliverable {
            id: "manual".into(),
            user_id: "u1".into(),
            title: "On demand".into(),
            deliverable_type: DeliverableType::Custom,
            schedule: None,
            sources: vec![],
            governance_mode: GovernanceMode::Manual,
            destination: None,
            instructions: None,
            paused: false,
            created_at: t0() - TimeDelta::days(1),
            last_run_at: None,
        })
        .await
        .unwrap();
    let stuck = h
        .storage
        .allocate_version("manual", t0() - TimeDelta::hours(1))
        .await
        .unwrap();

    let report = runner.tick(t0()).await;
    assert_eq!(report.synced, 1);
    assert_eq!(report.sync_failures, 0);
    assert_eq!(report.recovered, 1);
    assert_eq!(report.purged, 1);
    assert_eq!(report.runs_started, 0);
    let recovered = h.storage.get_version(&stuck.id).await.unwrap().unwrap();
    assert_eq!(recovered.status, VersionStatus::Failed);

    let quiet = runner.tick(t0() + TimeDelta::minutes(1)).await;
    assert_eq!(quiet.synced, 0);
    assert_eq!(quiet.recovered, 0);
}

#[tokio::test]
async fn runner_stops_on_cancellation() {
    let (_h, runner) = setup(|_| {}).await;
    let runner = Arc::new(runner);
    let cancel = CancellationToken::new();
    let task = {
        let runner = runner.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { runner.run(cancel).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("runner did not stop")
        .unwrap();
}
