// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service facade and its builder.

use std::sync::Arc;
use std::time::Duration;

use accrue_config::model::AccrueConfig;
use accrue_context::{ContextAggregator, ContextStore};
use accrue_core::{
    AccrueError, ConnectorDirectory, ContextItem, Deliverable, DeliverableType, DeliverableVersion,
    DeliveryAdapter, Destination, DiscoveredResource, DraftGenerator, FeedbackObservation,
    GovernanceMode, PlanTier, Platform, Resource, ResourceKey, SourceFetcher, SourceSpec,
    StorageAdapter, User, WorkRecord,
};
use accrue_cron::{CronJobs, CronRunner, parse_schedule};
use accrue_feedback::FeedbackLoop;
use accrue_pipeline::{GenerationPipeline, Governance, RunReport};
use accrue_sync::{
    CoverageEntry, ResourceSelector, SyncReport, SyncScheduler, SyncTrigger, TierPolicy,
};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clock::{Clock, SystemClock};

/// What a sync trigger targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncTarget {
    Resource {
        platform: Platform,
        resource_id: String,
    },
    /// Every active resource of the platform.
    Platform { platform: Platform },
}

/// Input for [`AccrueService::create_deliverable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDeliverable {
    pub user_id: String,
    pub title: String,
    pub deliverable_type: DeliverableType,
    #[serde(default)]
    pub schedule: Option<String>,
    pub sources: Vec<SourceSpec>,
    pub governance_mode: GovernanceMode,
    #[serde(default)]
    pub destination: Option<Destination>,
    #[serde(default)]
    pub instructions: Option<String>,
}

pub struct AccrueServiceBuilder {
    config: AccrueConfig,
    storage: Option<Arc<dyn StorageAdapter>>,
    connector: Option<Arc<dyn ConnectorDirectory>>,
    generator: Option<Arc<dyn DraftGenerator>>,
    fetcher: Option<Arc<dyn SourceFetcher>>,
    delivery: Option<Arc<dyn DeliveryAdapter>>,
    clock: Arc<dyn Clock>,
}

impl AccrueServiceBuilder {
    pub fn storage(mut self, storage: Arc<dyn StorageAdapter>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn connector(mut self, connector: Arc<dyn ConnectorDirectory>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn DraftGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Optional: without one, approved versions with a destination are
    /// marked as failed deliveries.
    pub fn delivery(mut self, delivery: Arc<dyn DeliveryAdapter>) -> Self {
        self.delivery = Some(delivery);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Result<AccrueService, AccrueError> {
        fn required<T>(part: Option<T>, name: &str) -> Result<T, AccrueError> {
            part.ok_or_else(|| AccrueError::Config(format!("service requires a {name}")))
        }
        let storage = required(self.storage, "storage adapter")?;
        let connector = required(self.connector, "connector directory")?;
        let generator = required(self.generator, "draft generator")?;
        let fetcher = required(self.fetcher, "source fetcher")?;
        let config = self.config;

        let policy = Arc::new(TierPolicy::from_config(&config.tiers));
        let scheduler = Arc::new(SyncScheduler::new(
            storage.clone(),
            connector.clone(),
            policy.clone(),
            config.sync.clone(),
        ));
        let selector = ResourceSelector::new(storage.clone(), policy);
        let store = Arc::new(ContextStore::new(storage.clone(), &config.context));
        let aggregator = Arc::new(ContextAggregator::new(
            storage.clone(),
            connector,
            fetcher,
            &config.context,
            &config.tiers,
        ));
        let governance = Arc::new(Governance::new(
            storage.clone(),
            self.delivery,
            &config.governance,
        ));
        let pipeline = Arc::new(GenerationPipeline::new(
            storage.clone(),
            aggregator,
            generator,
            governance.clone(),
            config.generation.clone(),
        ));
        let feedback = Arc::new(FeedbackLoop::new(storage.clone(), &config.feedback));

        Ok(AccrueService {
            storage,
            scheduler,
            selector,
            store,
            pipeline,
            governance,
            feedback,
            clock: self.clock,
            config,
        })
    }
}

pub struct AccrueService {
    storage: Arc<dyn StorageAdapter>,
    scheduler: Arc<SyncScheduler>,
    selector: ResourceSelector,
    store: Arc<ContextStore>,
    pipeline: Arc<GenerationPipeline>,
    governance: Arc<Governance>,
    feedback: Arc<FeedbackLoop>,
    clock: Arc<dyn Clock>,
    config: AccrueConfig,
}

impl AccrueService {
    pub fn builder(config: AccrueConfig) -> AccrueServiceBuilder {
        AccrueServiceBuilder {
            config,
            storage: None,
            connector: None,
            generator: None,
            fetcher: None,
            delivery: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn config(&self) -> &AccrueConfig {
        &self.config
    }

    /// A periodic runner over the same components.
    pub fn cron_runner(&self) -> CronRunner {
        let jobs = CronJobs {
            storage: self.storage.clone(),
            scheduler: self.scheduler.clone(),
            pipeline: self.pipeline.clone(),
            feedback: self.feedback.clone(),
            store: self.store.clone(),
        };
        CronRunner::new(
            jobs,
            Duration::from_secs(self.config.service.tick_interval_secs),
            &self.config.generation,
        )
    }

    // --- Users and resources ---

    pub async fn register_user(&self, user_id: &str, tier: PlanTier) -> Result<User, AccrueError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AccrueError::InvalidRequest("user id is empty".into()));
        }
        if self.storage.get_user(user_id).await?.is_some() {
            return Err(AccrueError::InvalidRequest(format!(
                "user {user_id} already exists"
            )));
        }
        let user = User {
            id: user_id.to_string(),
            tier,
            created_at: self.clock.now(),
        };
        self.storage.upsert_user(&user).await?;
        info!(user_id, tier = %tier, "user registered");
        Ok(user)
    }

    /// Changes the plan tier. Returns the resources excluded by a downgrade.
    pub async fn set_user_tier(
        &self,
        user_id: &str,
        tier: PlanTier,
    ) -> Result<Vec<ResourceKey>, AccrueError> {
        self.selector
            .apply_tier_change(user_id, tier, self.clock.now())
            .await
    }

    pub async fn discover_resources(
        &self,
        user_id: &str,
        platform: Platform,
    ) -> Result<Vec<DiscoveredResource>, AccrueError> {
        self.scheduler
            .discover(user_id, platform, self.clock.now())
            .await
    }

    pub async fn get_coverage_summary(
        &self,
        user_id: &str,
    ) -> Result<Vec<CoverageEntry>, AccrueError> {
        self.scheduler
            .coverage_summary(user_id, self.clock.now())
            .await
    }

    /// Replaces the platform's selection with exactly `resource_ids`.
    pub async fn update_selected_resources(
        &self,
        user_id: &str,
        platform: Platform,
        resource_ids: &[String],
    ) -> Result<Vec<Resource>, AccrueError> {
        self.selector
            .update_selected_resources(user_id, platform, resource_ids, self.clock.now())
            .await
    }

    pub async fn trigger_sync(
        &self,
        user_id: &str,
        target: SyncTarget,
    ) -> Result<Vec<SyncReport>, AccrueError> {
        let now = self.clock.now();
        match target {
            SyncTarget::Resource {
                platform,
                resource_id,
            } => {
                let key = ResourceKey::new(user_id, platform, resource_id);
                let report = self
                    .scheduler
                    .sync_resource(&key, SyncTrigger::Manual, now)
                    .await?;
                Ok(vec![report])
            }
            SyncTarget::Platform { platform } => {
                self.scheduler.trigger_platform(user_id, platform, now).await
            }
        }
    }

    // --- Context store ---

    pub async fn add_user_fact(
        &self,
        user_id: &str,
        content: &str,
    ) -> Result<ContextItem, AccrueError> {
        self.store
            .add_user_fact(user_id, content, self.clock.now())
            .await
    }

    pub async fn promote_item(&self, item_id: &str) -> Result<(), AccrueError> {
        self.store.promote_item(item_id).await
    }

    pub async fn purge_expired(&self) -> Result<usize, AccrueError> {
        self.store.purge_expired(self.clock.now()).await
    }

    // --- Deliverables ---

    pub async fn create_deliverable(
        &self,
        request: NewDeliverable,
    ) -> Result<Deliverable, AccrueError> {
        if self.storage.get_user(&request.user_id).await?.is_none() {
            return Err(AccrueError::NotFound {
                entity: "user",
                id: request.user_id,
            });
        }
        validate_new_deliverable(&request)?;

        let deliverable = Deliverable {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: request.user_id,
            title: request.title.trim().to_string(),
            deliverable_type: request.deliverable_type,
            schedule: request.schedule.map(|s| s.trim().to_string()),
            sources: request.sources,
            governance_mode: request.governance_mode,
            destination: request.destination,
            instructions: request.instructions.filter(|i| !i.trim().is_empty()),
            paused: false,
            created_at: self.clock.now(),
            last_run_at: None,
        };
        self.storage.create_deliverable(&deliverable).await?;
        info!(
            deliverable_id = %deliverable.id,
            user_id = %deliverable.user_id,
            kind = %deliverable.deliverable_type,
            "deliverable created"
        );
        Ok(deliverable)
    }

    pub async fn get_deliverable(&self, deliverable_id: &str) -> Result<Deliverable, AccrueError> {
        self.storage
            .get_deliverable(deliverable_id)
            .await?
            .ok_or_else(|| AccrueError::NotFound {
                entity: "deliverable",
                id: deliverable_id.to_string(),
            })
    }

    pub async fn list_deliverables(&self, user_id: &str) -> Result<Vec<Deliverable>, AccrueError> {
        self.storage.list_deliverables(Some(user_id)).await
    }

    /// Paused deliverables are skipped by the scheduler; run-now still works.
    pub async fn set_deliverable_paused(
        &self,
        deliverable_id: &str,
        paused: bool,
    ) -> Result<Deliverable, AccrueError> {
        if !self
            .storage
            .set_deliverable_paused(deliverable_id, paused)
            .await?
        {
            return Err(AccrueError::NotFound {
                entity: "deliverable",
                id: deliverable_id.to_string(),
            });
        }
        self.get_deliverable(deliverable_id).await
    }

    pub async fn run_deliverable_now(&self, deliverable_id: &str) -> Result<RunReport, AccrueError> {
        self.pipeline
            .run_deliverable(deliverable_id, self.clock.now())
            .await
    }

    // --- Versions ---

    /// Every version of the deliverable, terminal ones included.
    pub async fn list_versions(
        &self,
        deliverable_id: &str,
    ) -> Result<Vec<DeliverableVersion>, AccrueError> {
        self.get_deliverable(deliverable_id).await?;
        self.storage.list_versions(deliverable_id).await
    }

    pub async fn get_version(&self, version_id: &str) -> Result<DeliverableVersion, AccrueError> {
        self.storage
            .get_version(version_id)
            .await?
            .ok_or_else(|| AccrueError::NotFound {
                entity: "version",
                id: version_id.to_string(),
            })
    }

    pub async fn approve_version(
        &self,
        version_id: &str,
        final_content: Option<String>,
    ) -> Result<DeliverableVersion, AccrueError> {
        self.governance
            .approve(version_id, final_content, self.clock.now())
            .await
    }

    pub async fn reject_version(&self, version_id: &str) -> Result<DeliverableVersion, AccrueError> {
        self.governance.reject(version_id, self.clock.now()).await
    }

    /// Cancels a pending semi-auto approval; the version waits for a decision.
    pub async fn hold_version(&self, version_id: &str) -> Result<DeliverableVersion, AccrueError> {
        self.governance.hold(version_id, self.clock.now()).await
    }

    pub async fn discard_version(
        &self,
        version_id: &str,
    ) -> Result<DeliverableVersion, AccrueError> {
        self.governance.discard(version_id, self.clock.now()).await
    }

    pub async fn recover_stuck_versions(&self) -> Result<Vec<DeliverableVersion>, AccrueError> {
        let stuck_after = TimeDelta::seconds(
            i64::try_from(self.config.generation.stuck_after_secs).unwrap_or(i64::MAX / 1000),
        );
        self.governance
            .recover_stuck(self.clock.now(), stuck_after)
            .await
    }

    pub async fn get_work_record(&self, version_id: &str) -> Result<WorkRecord, AccrueError> {
        self.storage
            .get_work_record(version_id)
            .await?
            .ok_or_else(|| AccrueError::NotFound {
                entity: "work record",
                id: version_id.to_string(),
            })
    }

    /// Runs the feedback comparison for one approved version now instead of
    /// waiting for the cron sweep.
    pub async fn observe_feedback(
        &self,
        version_id: &str,
    ) -> Result<FeedbackObservation, AccrueError> {
        Ok(self
            .feedback
            .observe(version_id, self.clock.now())
            .await?
            .observation)
    }
}

fn validate_new_deliverable(request: &NewDeliverable) -> Result<(), AccrueError> {
    let invalid = |msg: String| Err(AccrueError::InvalidRequest(msg));
    if request.title.trim().is_empty() {
        return invalid("deliverable title is empty".into());
    }
    if let Some(schedule) = &request.schedule {
        parse_schedule(schedule.trim())?;
    }
    if request.sources.is_empty() {
        return invalid("a deliverable needs at least one source".into());
    }
    for source in &request.sources {
        match source {
            SourceSpec::Resource { resource_id, .. } if resource_id.trim().is_empty() => {
                return invalid("resource source has an empty id".into());
            }
            SourceSpec::Url { url }
                if !(url.starts_with("http://") || url.starts_with("https://")) =>
            {
                return invalid(format!("URL source `{url}` must be http or https"));
            }
            SourceSpec::Document { name, content }
                if name.trim().is_empty() || content.trim().is_empty() =>
            {
                return invalid("document source needs a name and content".into());
            }
            _ => {}
        }
    }
    if let Some(destination) = &request.destination
        && (destination.channel.trim().is_empty() || destination.target.trim().is_empty())
    {
        return invalid("destination needs a channel and a target".into());
    }
    Ok(())
}
