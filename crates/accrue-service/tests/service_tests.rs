// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end scenarios through the service surface.

use std::sync::{Arc, Mutex};

use accrue_core::{
    AccrueError, CoverageState, DeliverableType, FetchPage, FetchedItem, ContentType,
    GovernanceMode, PlanTier, Platform, ResourceKey, SourceSpec, VersionStatus,
};
use accrue_service::{AccrueService, Clock, NewDeliverable, SyncTarget};
use accrue_sync::SyncOutcome;
use accrue_test_utils::{TestHarness, discovered, t0};
use chrono::{DateTime, TimeDelta, Utc};

struct TestClock(Mutex<DateTime<Utc>>);

impl TestClock {
    fn advance(&self, by: TimeDelta) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

struct Env {
    h: TestHarness,
    clock: Arc<TestClock>,
    service: AccrueService,
}

async fn env(tier: PlanTier) -> Env {
    let h = TestHarness::builder().build().await.unwrap();
    let clock = Arc::new(TestClock(Mutex::new(t0())));
    let service = AccrueService::builder(h.config.clone())
        .storage(h.storage())
        .connector(h.connector.clone())
        .generator(h.generator.clone())
        .fetcher(h.fetcher.clone())
        .delivery(h.delivery.clone())
        .clock(clock.clone())
        .build()
        .unwrap();
    service.register_user("u1", tier).await.unwrap();
    Env { h, clock, service }
}

fn digest(sources: Vec<SourceSpec>, mode: GovernanceMode) -> NewDeliverable {
    NewDeliverable {
        user_id: "u1".into(),
        title: "Team digest".into(),
        deliverable_type: DeliverableType::Digest,
        schedule: None,
        sources,
        governance_mode: mode,
        destination: None,
        instructions: Some("Mention blockers first.".into()),
    }
}

fn slack(id: &str) -> SourceSpec {
    SourceSpec::Resource {
        platform: Platform::Slack,
        resource_id: id.into(),
    }
}

#[tokio::test]
async fn scenario_a_selected_resource_goes_from_uncovered_to_covered() {
    let e = env(PlanTier::Free).await;
    e.h.connector
        .set_landscape("u1", Platform::Slack, vec![discovered("R1", "eng")])
        .await;
    e.service
        .discover_resources("u1", Platform::Slack)
        .await
        .unwrap();
    e.service
        .update_selected_resources("u1", Platform::Slack, &["R1".to_string()])
        .await
        .unwrap();

    let summary = e.service.get_coverage_summary("u1").await.unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].state, Some(CoverageState::Uncovered));

    let key = ResourceKey::new("u1", Platform::Slack, "R1");
    e.h.connector
        .push_page(
            &key,
            FetchPage {
                items: vec![FetchedItem {
                    external_id: "m1".into(),
                    content: "standup notes".into(),
                    content_type: ContentType::Message,
                    source_timestamp: t0() - TimeDelta::hours(1),
                }],
                next_cursor: Some("c1".into()),
                partial: false,
            },
        )
        .await;
    let reports = e
        .service
        .trigger_sync(
            "u1",
            SyncTarget::Resource {
                platform: Platform::Slack,
                resource_id: "R1".into(),
            },
        )
        .await
        .unwrap();
    assert!(matches!(
        reports[0].outcome,
        SyncOutcome::Synced { inserted: 1, partial: false }
    ));

    let summary = e.service.get_coverage_summary("u1").await.unwrap();
    assert_eq!(summary[0].state, Some(CoverageState::Covered));

    // Daily cadence: stale only after twice the interval.
    e.clock.advance(TimeDelta::hours(47));
    let summary = e.service.get_coverage_summary("u1").await.unwrap();
    assert_eq!(summary[0].state, Some(CoverageState::Covered));
    e.clock.advance(TimeDelta::hours(2));
    let summary = e.service.get_coverage_summary("u1").await.unwrap();
    assert_eq!(summary[0].state, Some(CoverageState::Stale));
}

#[tokio::test]
async fn scenario_b_downgrade_excludes_newest_selections() {
    let e = env(PlanTier::Starter).await;
    let landscape = (0..8)
        .map(|i| discovered(&format!("C{i}"), &format!("chan-{i}")))
        .collect();
    e.h.connector
        .set_landscape("u1", Platform::Slack, landscape)
        .await;
    e.service
        .discover_resources("u1", Platform::Slack)
        .await
        .unwrap();
    let mut selected = Vec::new();
    for i in 0..8 {
        selected.push(format!("C{i}"));
        e.service
            .update_selected_resources("u1", Platform::Slack, &selected)
            .await
            .unwrap();
        e.clock.advance(TimeDelta::minutes(1));
    }

    let excluded = e.service.set_user_tier("u1", PlanTier::Free).await.unwrap();
    let ids: Vec<&str> = excluded.iter().map(|k| k.resource_id.as_str()).collect();
    assert_eq!(ids, vec!["C5", "C6", "C7"]);

    let summary = e.service.get_coverage_summary("u1").await.unwrap();
    let excluded_count = summary
        .iter()
        .filter(|c| c.state == Some(CoverageState::Excluded))
        .count();
    assert_eq!(excluded_count, 3);

    let six: Vec<String> = (0..6).map(|i| format!("C{i}")).collect();
    let err = e
        .service
        .update_selected_resources("u1", Platform::Slack, &six)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AccrueError::TierLimitExceeded {
            current: 5,
            requested: 6,
            limit: 5,
            ..
        }
    ));
}

#[tokio::test]
async fn scenario_c_manual_generation_then_reject() {
    let e = env(PlanTier::Pro).await;
    let d = e
        .service
        .create_deliverable(digest(vec![slack("C1")], GovernanceMode::Manual))
        .await
        .unwrap();

    let report = e.service.run_deliverable_now(&d.id).await.unwrap();
    assert_eq!(report.version.status, VersionStatus::Staged);

    let rejected = e.service.reject_version(&report.version.id).await.unwrap();
    assert_eq!(rejected.status, VersionStatus::Rejected);
    assert!(rejected.final_content.is_none());

    let versions = e.service.list_versions(&d.id).await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].status, VersionStatus::Rejected);

    let prompt = &e.h.generator.requests().await[0].prompt;
    assert!(prompt.contains("Mention blockers first."));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scenario_d_concurrent_run_now_creates_one_version() {
    let e = Arc::new(env(PlanTier::Pro).await);
    let d = e
        .service
        .create_deliverable(digest(vec![slack("C1")], GovernanceMode::Manual))
        .await
        .unwrap();
    e.h.generator.close_gate().await;

    let a = {
        let e = e.clone();
        let id = d.id.clone();
        tokio::spawn(async move { e.service.run_deliverable_now(&id).await })
    };
    for _ in 0..500 {
        if e.h.generator.in_flight() == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    let second = e.service.run_deliverable_now(&d.id).await.unwrap_err();
    assert!(matches!(second, AccrueError::ConcurrencyConflict { .. }));

    e.h.generator.open_gate(1).await;
    a.await.unwrap().unwrap();
    assert_eq!(e.service.list_versions(&d.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn approval_round_trip_and_feedback_observation() {
    let e = env(PlanTier::Pro).await;
    let d = e
        .service
        .create_deliverable(digest(vec![slack("C1")], GovernanceMode::Manual))
        .await
        .unwrap();
    let v1 = e.service.run_deliverable_now(&d.id).await.unwrap().version;
    let approved = e.service.approve_version(&v1.id, None).await.unwrap();
    assert_eq!(approved.final_content, approved.draft_content);
    let observation = e.service.observe_feedback(&v1.id).await.unwrap();
    assert_eq!(observation.distance, 0.0);

    let v2 = e.service.run_deliverable_now(&d.id).await.unwrap().version;
    assert_eq!(v2.version_number, 2);
    let edited = e
        .service
        .approve_version(&v2.id, Some("Blockers: none. Shipped sync.".into()))
        .await
        .unwrap();
    assert_ne!(edited.final_content, edited.draft_content);
    assert!(e.service.observe_feedback(&v2.id).await.unwrap().distance > 0.0);

    let record = e.service.get_work_record(&v2.id).await.unwrap();
    assert_eq!(record.deliverable_id, d.id);
}

#[tokio::test]
async fn hold_and_discard_through_the_service() {
    let e = env(PlanTier::Pro).await;
    let d = e
        .service
        .create_deliverable(digest(vec![slack("C1")], GovernanceMode::SemiAuto))
        .await
        .unwrap();
    let v = e.service.run_deliverable_now(&d.id).await.unwrap().version;
    assert!(v.auto_approve_at.is_some());
    let held = e.service.hold_version(&v.id).await.unwrap();
    assert!(held.auto_approve_at.is_none());
    let discarded = e.service.discard_version(&v.id).await.unwrap();
    assert_eq!(discarded.status, VersionStatus::Discarded);
}

#[tokio::test]
async fn create_deliverable_validates_input() {
    let e = env(PlanTier::Pro).await;

    let mut no_title = digest(vec![slack("C1")], GovernanceMode::Manual);
    no_title.title = "  ".into();
    let mut bad_schedule = digest(vec![slack("C1")], GovernanceMode::Manual);
    bad_schedule.schedule = Some("every tuesday".into());
    let no_sources = digest(vec![], GovernanceMode::Manual);
    let ftp = digest(
        vec![SourceSpec::Url {
            url: "ftp://example.com/x".into(),
        }],
        GovernanceMode::Manual,
    );
    for request in [no_title, bad_schedule, no_sources, ftp] {
        let err = e.service.create_deliverable(request).await.unwrap_err();
        assert!(matches!(err, AccrueError::InvalidRequest(_)), "got {err}");
    }

    let mut stranger = digest(vec![slack("C1")], GovernanceMode::Manual);
    stranger.user_id = "nobody".into();
    assert!(matches!(
        e.service.create_deliverable(stranger).await.unwrap_err(),
        AccrueError::NotFound { entity: "user", .. }
    ));

    let mut ok = digest(vec![slack("C1")], GovernanceMode::Manual);
    ok.schedule = Some("0 9 * * 1".into());
    let d = e.service.create_deliverable(ok).await.unwrap();
    assert_eq!(e.service.list_deliverables("u1").await.unwrap(), vec![d.clone()]);
    let paused = e.service.set_deliverable_paused(&d.id, true).await.unwrap();
    assert!(paused.paused);
}

#[tokio::test]
async fn missing_entities_are_not_found() {
    let e = env(PlanTier::Pro).await;
    assert!(matches!(
        e.service.list_versions("nope").await.unwrap_err(),
        AccrueError::NotFound { entity: "deliverable", .. }
    ));
    assert!(matches!(
        e.service.get_work_record("nope").await.unwrap_err(),
        AccrueError::NotFound { entity: "work record", .. }
    ));
    assert!(matches!(
        e.service.set_deliverable_paused("nope", true).await.unwrap_err(),
        AccrueError::NotFound { .. }
    ));
    assert!(matches!(
        e.service.register_user("u1", PlanTier::Free).await.unwrap_err(),
        AccrueError::InvalidRequest(_)
    ));
}

#[tokio::test]
async fn user_facts_reach_generation_context() {
    let e = env(PlanTier::Pro).await;
    e.service
        .add_user_fact("u1", "Our launch date is April 14.")
        .await
        .unwrap();
    let d = e
        .service
        .create_deliverable(digest(vec![slack("C1")], GovernanceMode::Manual))
        .await
        .unwrap();
    e.service.run_deliverable_now(&d.id).await.unwrap();
    let context = &e.h.generator.requests().await[0].context;
    assert!(context.contains("Our launch date is April 14."));
}
