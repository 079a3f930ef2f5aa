// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Observation of approved versions and preference write-back.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

use accrue_config::model::FeedbackConfig;
use accrue_core::{
    AccrueError, ContentType, ContextItem, DeliverableVersion, FeedbackObservation, StorageAdapter,
    metrics,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::diff::{EditCategory, analyze};

/// External id of the learned preference for one deliverable and category.
/// Unique per user, so writing the same preference twice is a no-op.
pub fn preference_external_id(deliverable_id: &str, category: EditCategory) -> String {
    format!("pref:{deliverable_id}:{category}")
}

/// What observing one version produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Observed {
    pub observation: FeedbackObservation,
    /// `false` when the version had been observed before.
    pub new: bool,
    /// Preference items written by this call.
    pub learned: Vec<ContextItem>,
}

pub struct FeedbackLoop {
    storage: Arc<dyn StorageAdapter>,
    config: FeedbackConfig,
}

impl FeedbackLoop {
    pub fn new(storage: Arc<dyn StorageAdapter>, config: &FeedbackConfig) -> Self {
        Self {
            storage,
            config: config.clone(),
        }
    }

    /// Analyzes one approved version. Re-observing a version returns the
    /// stored observation and learns nothing.
    pub async fn observe(
        &self,
        version_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Observed, AccrueError> {
        if let Some(existing) = self.storage.get_feedback_observation(version_id).await? {
            return Ok(Observed {
                observation: existing,
                new: false,
                learned: Vec::new(),
            });
        }
        let version = self
            .storage
            .get_version(version_id)
            .await?
            .ok_or_else(|| AccrueError::NotFound {
                entity: "version",
                id: version_id.to_string(),
            })?;
        self.observe_version(&version, now).await
    }

    async fn observe_version(
        &self,
        version: &DeliverableVersion,
        now: DateTime<Utc>,
    ) -> Result<Observed, AccrueError> {
        let (Some(draft), Some(final_content)) = (&version.draft_content, &version.final_content)
        else {
            return Err(AccrueError::InvalidRequest(format!(
                "version {} is {} and has no approved content to compare",
                version.id, version.status
            )));
        };
        let analysis = analyze(draft, final_content, &self.config);
        let observation = FeedbackObservation {
            version_id: version.id.clone(),
            deliverable_id: version.deliverable_id.clone(),
            version_number: version.version_number,
            distance: analysis.distance,
            categories: analysis.categories.iter().map(ToString::to_string).collect(),
            observed_at: now,
        };

        if !self.storage.insert_feedback_observation(&observation).await? {
            // Lost a race with another sweep.
            let stored = self
                .storage
                .get_feedback_observation(&version.id)
                .await?
                .unwrap_or(observation);
            return Ok(Observed {
                observation: stored,
                new: false,
                learned: Vec::new(),
            });
        }
        debug!(
            version_id = %version.id,
            distance = observation.distance,
            categories = ?observation.categories,
            "version observed"
        );

        let learned = self.learn(&observation.deliverable_id, now).await?;
        Ok(Observed {
            observation,
            new: true,
            learned,
        })
    }

    /// Writes a preference for every category shared by the newest
    /// `min_consecutive` observations of the deliverable.
    async fn learn(
        &self,
        deliverable_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ContextItem>, AccrueError> {
        let min = self.config.min_consecutive.max(1);
        let history = self.storage.list_feedback_observations(deliverable_id).await?;
        if history.len() < min {
            return Ok(Vec::new());
        }

        let mut recurring: BTreeSet<&str> =
            history[0].categories.iter().map(String::as_str).collect();
        for observation in &history[1..min] {
            let categories: BTreeSet<&str> =
                observation.categories.iter().map(String::as_str).collect();
            recurring.retain(|c| categories.contains(c));
        }
        if recurring.is_empty() {
            return Ok(Vec::new());
        }

        let deliverable = self
            .storage
            .get_deliverable(deliverable_id)
            .await?
            .ok_or_else(|| AccrueError::NotFound {
                entity: "deliverable",
                id: deliverable_id.to_string(),
            })?;

        let mut learned = Vec::new();
        for name in recurring {
            let Ok(category) = EditCategory::from_str(name) else {
                continue;
            };
            let item = ContextItem {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: deliverable.user_id.clone(),
                platform: None,
                resource_id: None,
                deliverable_id: Some(deliverable.id.clone()),
                external_id: preference_external_id(&deliverable.id, category),
                content: format!("{} ({})", category.preference(), deliverable.title),
                content_type: ContentType::LearnedPreference,
                source_timestamp: now,
                fetched_at: now,
                retained: true,
            };
            if self.storage.insert_items(std::slice::from_ref(&item)).await? > 0 {
                metrics::record_preference_learned();
                info!(
                    deliverable_id = %deliverable.id,
                    category = %category,
                    "preference learned"
                );
                learned.push(item);
            }
        }
        Ok(learned)
    }

    /// Observes up to `limit` approved versions that have no observation yet,
    /// oldest version first within each deliverable. Returns how many were
    /// observed.
    pub async fn sweep(&self, now: DateTime<Utc>, limit: usize) -> Result<usize, AccrueError> {
        let pending = self.storage.approved_without_feedback(limit).await?;
        let mut observed = 0;
        for version in pending {
            if self.observe_version(&version, now).await?.new {
                observed += 1;
            }
        }
        Ok(observed)
    }
}
