// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable records: the shapes persisted by the storage adapter and
//! exchanged with external collaborators.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    ContentType, DeliverableType, DeliveryStatus, Destination, FailureKind, GovernanceMode,
    PlanTier, Platform, SourceSpec, VersionStatus,
};

/// A user and their plan tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub tier: PlanTier,
    pub created_at: DateTime<Utc>,
}

/// Identity of one syncable unit: the same remote id on two platforms, or for
/// two users, is two different resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub user_id: String,
    pub platform: Platform,
    pub resource_id: String,
}

impl ResourceKey {
    pub fn new(user_id: impl Into<String>, platform: Platform, resource_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            platform,
            resource_id: resource_id.into(),
        }
    }

    /// Lease key serializing syncs of this resource.
    pub fn sync_lease_key(&self) -> String {
        format!("sync:{self}")
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.user_id, self.platform, self.resource_id)
    }
}

/// A resource as reported by the connector directory's landscape query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredResource {
    pub resource_id: String,
    pub resource_type: String,
    pub name: String,
    pub is_private: bool,
    pub metadata: Option<serde_json::Value>,
}

/// A syncable unit with its selection and sync bookkeeping.
///
/// Coverage state is not stored: it is derived from these fields on
/// every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub user_id: String,
    pub platform: Platform,
    pub resource_id: String,
    pub resource_type: String,
    pub name: String,
    pub is_private: bool,
    pub metadata: Option<serde_json::Value>,
    pub selected: bool,
    pub selected_at: Option<DateTime<Utc>>,
    pub excluded: bool,
    /// Last successfully processed position at the source.
    pub cursor: Option<String>,
    pub last_synced: Option<DateTime<Utc>>,
    /// Whether the last successful fetch stopped before ingesting everything.
    pub last_sync_partial: bool,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub discovered_at: DateTime<Utc>,
}

impl Resource {
    /// Builds a fresh, unselected resource from a landscape entry.
    pub fn from_discovered(
        user_id: &str,
        platform: Platform,
        discovered: DiscoveredResource,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            platform,
            resource_id: discovered.resource_id,
            resource_type: discovered.resource_type,
            name: discovered.name,
            is_private: discovered.is_private,
            metadata: discovered.metadata,
            selected: false,
            selected_at: None,
            excluded: false,
            cursor: None,
            last_synced: None,
            last_sync_partial: false,
            last_error: None,
            last_error_at: None,
            discovered_at: now,
        }
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.user_id, self.platform, &self.resource_id)
    }

    /// Selected and not excluded.
    pub fn is_active(&self) -> bool {
        self.selected && !self.excluded
    }
}

/// A selection flag change applied atomically with its siblings.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionChange {
    pub key: ResourceKey,
    pub selected: bool,
    pub excluded: bool,
    pub selected_at: Option<DateTime<Utc>>,
}

/// One item returned by a connector fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedItem {
    /// The source's own identifier, used to dedupe re-fetches.
    pub external_id: String,
    pub content: String,
    pub content_type: ContentType,
    pub source_timestamp: DateTime<Utc>,
}

/// The result of one connector fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchPage {
    pub items: Vec<FetchedItem>,
    /// Position to resume from; `None` keeps the previous cursor.
    pub next_cursor: Option<String>,
    /// The fetch stopped early (rate limited mid-page, for instance).
    pub partial: bool,
}

/// One unit of context, immutable once written except for `retained`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    pub id: String,
    pub user_id: String,
    pub platform: Option<Platform>,
    pub resource_id: Option<String>,
    /// Set for preferences learned about one deliverable.
    pub deliverable_id: Option<String>,
    pub external_id: String,
    pub content: String,
    pub content_type: ContentType,
    pub source_timestamp: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    /// Retained items are exempt from age-based expiry.
    pub retained: bool,
}

impl ContextItem {
    /// Builds an item ingested from a resource fetch.
    pub fn from_fetched(key: &ResourceKey, item: FetchedItem, fetched_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: key.user_id.clone(),
            platform: Some(key.platform),
            resource_id: Some(key.resource_id.clone()),
            deliverable_id: None,
            external_id: item.external_id,
            content: item.content,
            content_type: item.content_type,
            source_timestamp: item.source_timestamp,
            fetched_at,
            retained: false,
        }
    }
}

/// Which timestamp bounds a read of a resource's items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "since", rename_all = "snake_case")]
pub enum ItemWindow {
    /// Items ingested at or after the instant, whenever they were written at
    /// the source. Incremental reads since a deliverable's last run use this,
    /// so content synced late is still picked up once.
    FetchedSince(DateTime<Utc>),
    /// Items written at the source at or after the instant.
    SourceSince(DateTime<Utc>),
}

/// A recurring generation target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deliverable {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub deliverable_type: DeliverableType,
    /// Cron expression; `None` means run-on-demand only.
    pub schedule: Option<String>,
    pub sources: Vec<SourceSpec>,
    pub governance_mode: GovernanceMode,
    pub destination: Option<Destination>,
    /// Free-form guidance appended to the type template.
    pub instructions: Option<String>,
    pub paused: bool,
    pub created_at: DateTime<Utc>,
    pub last_run_at: Option<DateTime<Utc>>,
}

/// One generation attempt for a deliverable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverableVersion {
    pub id: String,
    pub deliverable_id: String,
    pub version_number: i64,
    pub status: VersionStatus,
    /// Content as generated; never overwritten once set.
    pub draft_content: Option<String>,
    /// Content as approved; set iff the status is approved or delivered.
    pub final_content: Option<String>,
    pub delivery_status: DeliveryStatus,
    pub failure_kind: Option<FailureKind>,
    pub error_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub staged_at: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
    /// Semi-auto deadline after which a staged version approves itself.
    pub auto_approve_at: Option<DateTime<Utc>>,
}

/// A conditional version update: applied only if the stored status equals
/// `expected`. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionTransition {
    pub version_id: String,
    pub expected: VersionStatus,
    pub next: VersionStatus,
    pub at: DateTime<Utc>,
    pub draft_content: Option<String>,
    pub final_content: Option<String>,
    pub delivery_status: Option<DeliveryStatus>,
    pub failure_kind: Option<FailureKind>,
    pub error_reason: Option<String>,
    /// `Some(None)` clears the deadline.
    pub auto_approve_at: Option<Option<DateTime<Utc>>>,
}

impl VersionTransition {
    pub fn new(
        version_id: impl Into<String>,
        expected: VersionStatus,
        next: VersionStatus,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            version_id: version_id.into(),
            expected,
            next,
            at,
            draft_content: None,
            final_content: None,
            delivery_status: None,
            failure_kind: None,
            error_reason: None,
            auto_approve_at: None,
        }
    }
}

/// Audit log of one generation attempt. Observability only: nothing reads it
/// to decide version state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    pub id: String,
    pub version_id: String,
    pub deliverable_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub input_log: serde_json::Value,
    pub output_log: serde_json::Value,
}

/// The feedback loop's analysis of one approved version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackObservation {
    pub version_id: String,
    pub deliverable_id: String,
    pub version_number: i64,
    /// Normalized word-level edit distance in `[0, 1]`.
    pub distance: f64,
    pub categories: Vec<String>,
    pub observed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_key_display_and_lease() {
        let key = ResourceKey::new("u1", Platform::Slack, "C42");
        assert_eq!(key.to_string(), "u1/slack/C42");
        assert_eq!(key.sync_lease_key(), "sync:u1/slack/C42");
    }

    #[test]
    fn fetched_items_carry_provenance() {
        let key = ResourceKey::new("u1", Platform::Gmail, "INBOX");
        let item = FetchedItem {
            external_id: "m-1".into(),
            content: "hello".into(),
            content_type: ContentType::Email,
            source_timestamp: Utc::now(),
        };
        let ctx = ContextItem::from_fetched(&key, item, Utc::now());
        assert!(!ctx.retained);
        assert_eq!(ctx.user_id, "u1");
        assert_eq!(ctx.platform, Some(Platform::Gmail));
        assert_eq!(ctx.resource_id.as_deref(), Some("INBOX"));
        assert_eq!(ctx.external_id, "m-1");
        assert!(ctx.deliverable_id.is_none());
    }
}
