// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sync scheduler: decides which resources are due and runs one bounded,
//! leased fetch per resource.

use std::collections::HashMap;
use std::sync::Arc;

use accrue_config::model::SyncConfig;
use accrue_core::{
    AccrueError, ConnectorDirectory, ContextItem, CoverageState, DiscoveredResource, Lease,
    PlanTier, Platform, Resource, ResourceKey, StorageAdapter, metrics,
};
use chrono::{DateTime, TimeDelta, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::coverage::{coverage_state, sync_due};
use crate::tier::{Cadence, TierPolicy};

/// What asked for a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// A scheduler pass; honors cadence and retry backoff.
    Scheduled,
    /// A user request; forces due-ness.
    Manual,
}

/// Why a sync did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    LiveQuery,
    Inactive,
    NotDue,
    InFlight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Synced { inserted: usize, partial: bool },
    Failed { error: String },
    Skipped { reason: SkipReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub key: ResourceKey,
    #[serde(flatten)]
    pub outcome: SyncOutcome,
}

/// One row of a user's coverage summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageEntry {
    pub resource: Resource,
    /// `None` for live-query resources, which are never cached.
    pub state: Option<CoverageState>,
    pub live_query: bool,
}

fn to_delta(secs: u64) -> TimeDelta {
    TimeDelta::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1000))
}

pub struct SyncScheduler {
    storage: Arc<dyn StorageAdapter>,
    connector: Arc<dyn ConnectorDirectory>,
    policy: Arc<TierPolicy>,
    config: SyncConfig,
}

impl SyncScheduler {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        connector: Arc<dyn ConnectorDirectory>,
        policy: Arc<TierPolicy>,
        config: SyncConfig,
    ) -> Self {
        Self {
            storage,
            connector,
            policy,
            config,
        }
    }

    async fn tier_of(&self, user_id: &str) -> Result<PlanTier, AccrueError> {
        self.storage
            .get_user(user_id)
            .await?
            .map(|u| u.tier)
            .ok_or_else(|| AccrueError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            })
    }

    /// Runs the landscape query and records every resource it reports.
    /// Rediscovery refreshes descriptive fields only.
    pub async fn discover(
        &self,
        user_id: &str,
        platform: Platform,
        now: DateTime<Utc>,
    ) -> Result<Vec<DiscoveredResource>, AccrueError> {
        self.tier_of(user_id).await?;
        let found = self.connector.list_resources(user_id, platform).await?;
        for resource in &found {
            self.storage
                .upsert_discovered_resource(user_id, platform, resource, now)
                .await?;
        }
        info!(user_id, platform = %platform, count = found.len(), "resources discovered");
        Ok(found)
    }

    /// Every known resource of a user with its derived coverage state.
    pub async fn coverage_summary(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<CoverageEntry>, AccrueError> {
        let tier = self.tier_of(user_id).await?;
        let resources = self.storage.list_resources(user_id, None).await?;
        Ok(resources
            .into_iter()
            .map(|resource| match self.policy.policy_for(tier, resource.platform).cadence {
                Cadence::LiveQuery => CoverageEntry {
                    resource,
                    state: None,
                    live_query: true,
                },
                Cadence::Scheduled(freq) => {
                    let state = coverage_state(
                        &resource,
                        freq.interval(),
                        self.config.stale_multiplier,
                        now,
                    );
                    CoverageEntry {
                        resource,
                        state: Some(state),
                        live_query: false,
                    }
                }
            })
            .collect())
    }

    /// Syncs one resource if the trigger allows it.
    ///
    /// A manual trigger on a resource that is already syncing is a
    /// concurrency conflict; a scheduled one is skipped quietly.
    pub async fn sync_resource(
        &self,
        key: &ResourceKey,
        trigger: SyncTrigger,
        now: DateTime<Utc>,
    ) -> Result<SyncReport, AccrueError> {
        let tier = self.tier_of(&key.user_id).await?;
        self.sync_with_tier(key, tier, trigger, now).await
    }

    async fn sync_with_tier(
        &self,
        key: &ResourceKey,
        tier: PlanTier,
        trigger: SyncTrigger,
        now: DateTime<Utc>,
    ) -> Result<SyncReport, AccrueError> {
        let skipped = |reason| SyncReport {
            key: key.clone(),
            outcome: SyncOutcome::Skipped { reason },
        };
        let frequency = match self.policy.policy_for(tier, key.platform).cadence {
            Cadence::LiveQuery => return Ok(skipped(SkipReason::LiveQuery)),
            Cadence::Scheduled(freq) => freq,
        };

        let ttl = to_delta(self.config.lease_ttl_secs);
        let Some(lease) =
            Lease::acquire(self.storage.as_ref(), key.sync_lease_key(), ttl, now).await?
        else {
            return match trigger {
                SyncTrigger::Manual => Err(AccrueError::already_running(key.sync_lease_key())),
                SyncTrigger::Scheduled => Ok(skipped(SkipReason::InFlight)),
            };
        };

        // Re-read under the lease: a concurrent run may have just finished.
        let result = match self.storage.get_resource(key).await {
            Err(e) => Err(e),
            Ok(None) => Err(AccrueError::NotFound {
                entity: "resource",
                id: key.to_string(),
            }),
            Ok(Some(resource)) if !resource.is_active() => match trigger {
                SyncTrigger::Manual => Err(AccrueError::InvalidRequest(format!(
                    "resource {key} is not selected"
                ))),
                SyncTrigger::Scheduled => Ok(skipped(SkipReason::Inactive)),
            },
            Ok(Some(resource)) => {
                let due = trigger == SyncTrigger::Manual
                    || sync_due(
                        &resource,
                        frequency.interval(),
                        to_delta(self.config.retry_backoff_secs),
                        now,
                    );
                if due {
                    self.fetch_and_store(&resource, now).await
                } else {
                    Ok(skipped(SkipReason::NotDue))
                }
            }
        };
        lease.release(self.storage.as_ref()).await;
        result
    }

    async fn fetch_and_store(
        &self,
        resource: &Resource,
        now: DateTime<Utc>,
    ) -> Result<SyncReport, AccrueError> {
        let key = resource.key();
        let timeout = self.config.fetch_timeout();
        let fetched = tokio::time::timeout(
            timeout,
            self.connector.fetch_items(&key, resource.cursor.as_deref()),
        )
        .await;

        let failure = match fetched {
            Ok(Ok(page)) => {
                let items: Vec<ContextItem> = page
                    .items
                    .into_iter()
                    .map(|item| ContextItem::from_fetched(&key, item, now))
                    .collect();
                let fetched_count = items.len();
                let inserted = self
                    .storage
                    .apply_sync_page(&key, &items, page.next_cursor.as_deref(), page.partial, now)
                    .await?;
                metrics::record_sync(if page.partial { "partial" } else { "ok" }, inserted);
                info!(
                    resource = %key,
                    fetched = fetched_count,
                    inserted,
                    partial = page.partial,
                    "resource synced"
                );
                return Ok(SyncReport {
                    key,
                    outcome: SyncOutcome::Synced {
                        inserted,
                        partial: page.partial,
                    },
                });
            }
            Ok(Err(e)) => {
                metrics::record_sync("error", 0);
                e.to_string()
            }
            Err(_) => {
                metrics::record_sync("timeout", 0);
                AccrueError::Timeout { duration: timeout }.to_string()
            }
        };

        warn!(resource = %key, error = %failure, "resource sync failed");
        self.storage.record_sync_failure(&key, &failure, now).await?;
        Ok(SyncReport {
            key,
            outcome: SyncOutcome::Failed { error: failure },
        })
    }

    /// Manual sync of every active resource of a user on one platform.
    /// Resources already syncing are reported as skipped.
    pub async fn trigger_platform(
        &self,
        user_id: &str,
        platform: Platform,
        now: DateTime<Utc>,
    ) -> Result<Vec<SyncReport>, AccrueError> {
        let tier = self.tier_of(user_id).await?;
        let resources = self.storage.list_resources(user_id, Some(platform)).await?;
        let mut reports = Vec::new();
        for resource in resources.iter().filter(|r| r.is_active()) {
            let key = resource.key();
            match self.sync_with_tier(&key, tier, SyncTrigger::Manual, now).await {
                Ok(report) => reports.push(report),
                Err(AccrueError::ConcurrencyConflict { .. }) => reports.push(SyncReport {
                    key,
                    outcome: SyncOutcome::Skipped {
                        reason: SkipReason::InFlight,
                    },
                }),
                Err(e) => return Err(e),
            }
        }
        Ok(reports)
    }

    /// One scheduler pass over every active resource. Runs up to
    /// `max_concurrent_syncs` fetches at once; one resource's storage error
    /// does not stop the pass.
    pub async fn run_due(&self, now: DateTime<Utc>) -> Result<Vec<SyncReport>, AccrueError> {
        let active = self.storage.list_active_resources().await?;
        let mut tiers: HashMap<String, PlanTier> = HashMap::new();
        let mut candidates = Vec::new();
        for resource in active {
            let tier = match tiers.get(&resource.user_id) {
                Some(tier) => *tier,
                None => {
                    let tier = self.tier_of(&resource.user_id).await?;
                    tiers.insert(resource.user_id.clone(), tier);
                    tier
                }
            };
            if let Cadence::Scheduled(freq) = self.policy.policy_for(tier, resource.platform).cadence
                && sync_due(
                    &resource,
                    freq.interval(),
                    to_delta(self.config.retry_backoff_secs),
                    now,
                )
            {
                candidates.push((resource.key(), tier));
            }
        }
        debug!(due = candidates.len(), "scheduler pass");

        let reports: Vec<SyncReport> = stream::iter(candidates)
            .map(|(key, tier)| async move {
                match self.sync_with_tier(&key, tier, SyncTrigger::Scheduled, now).await {
                    Ok(report) => Some(report),
                    Err(e) => {
                        warn!(resource = %key, error = %e, "scheduled sync errored");
                        None
                    }
                }
            })
            .buffer_unordered(self.config.max_concurrent_syncs.max(1))
            .filter_map(|r| async move { r })
            .collect()
            .await;
        Ok(reports)
    }
}
