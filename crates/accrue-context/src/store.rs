// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context store operations that sit above raw storage.

use std::sync::Arc;

use accrue_config::model::ContextConfig;
use accrue_core::{AccrueError, ContentType, ContextItem, StorageAdapter};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::info;

pub struct ContextStore {
    storage: Arc<dyn StorageAdapter>,
    retention: TimeDelta,
}

impl ContextStore {
    pub fn new(storage: Arc<dyn StorageAdapter>, config: &ContextConfig) -> Self {
        Self {
            storage,
            retention: TimeDelta::days(i64::from(config.retention_days)),
        }
    }

    /// Records something the user stated directly. Facts are retained from
    /// the start and appear in every aggregation for the user.
    pub async fn add_user_fact(
        &self,
        user_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<ContextItem, AccrueError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AccrueError::InvalidRequest("fact content is empty".into()));
        }
        if self.storage.get_user(user_id).await?.is_none() {
            return Err(AccrueError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            });
        }
        let id = uuid::Uuid::new_v4().to_string();
        let item = ContextItem {
            external_id: format!("fact:{id}"),
            id,
            user_id: user_id.to_string(),
            platform: None,
            resource_id: None,
            deliverable_id: None,
            content: content.to_string(),
            content_type: ContentType::UserFact,
            source_timestamp: now,
            fetched_at: now,
            retained: true,
        };
        self.storage.insert_items(std::slice::from_ref(&item)).await?;
        info!(user_id, item_id = %item.id, "user fact recorded");
        Ok(item)
    }

    /// Marks an item retained so expiry never removes it.
    pub async fn promote_item(&self, item_id: &str) -> Result<(), AccrueError> {
        if self.storage.set_item_retained(item_id, true).await? {
            info!(item_id, "context item promoted");
            Ok(())
        } else {
            Err(AccrueError::NotFound {
                entity: "context item",
                id: item_id.to_string(),
            })
        }
    }

    /// Deletes non-retained items fetched more than the retention horizon
    /// before `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, AccrueError> {
        let purged = self.storage.purge_items_before(now - self.retention).await?;
        if purged > 0 {
            info!(purged, "expired context items purged");
        }
        Ok(purged)
    }
}
