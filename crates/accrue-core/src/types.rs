// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enumerations and small value types shared across the pipeline.
//!
//! Every enum round-trips through its snake_case string form, which is what
//! the storage layer writes to SQLite and what the API layer renders.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Connector,
    Generator,
    SourceFetcher,
    Delivery,
}

/// A connected work platform.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Message channels.
    Slack,
    /// Email labels.
    Gmail,
    /// Document workspace pages.
    Notion,
    /// Calendars.
    Calendar,
}

/// A user's plan tier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Starter,
    Pro,
    Business,
}

/// How often scheduled platforms are synced.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
pub enum SyncFrequency {
    #[strum(serialize = "hourly")]
    #[serde(rename = "hourly")]
    Hourly,
    #[strum(serialize = "every_6h")]
    #[serde(rename = "every_6h")]
    Every6h,
    #[strum(serialize = "twice_daily")]
    #[serde(rename = "twice_daily")]
    TwiceDaily,
    #[strum(serialize = "daily")]
    #[serde(rename = "daily")]
    Daily,
}

impl SyncFrequency {
    /// The expected interval between two syncs of one resource.
    pub fn interval(&self) -> TimeDelta {
        match self {
            SyncFrequency::Hourly => TimeDelta::hours(1),
            SyncFrequency::Every6h => TimeDelta::hours(6),
            SyncFrequency::TwiceDaily => TimeDelta::hours(12),
            SyncFrequency::Daily => TimeDelta::hours(24),
        }
    }
}

/// Freshness classification of a resource's synced content.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CoverageState {
    Uncovered,
    Partial,
    Covered,
    Stale,
    Excluded,
}

/// Policy controlling whether a staged version needs human approval.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GovernanceMode {
    /// Explicit approval or rejection required.
    Manual,
    /// Auto-approves once the cancellation window passes without intervention.
    SemiAuto,
    /// Approves immediately after staging.
    FullAuto,
}

/// Lifecycle status of a deliverable version.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Generating,
    Staged,
    Approved,
    Delivered,
    Rejected,
    Discarded,
    Failed,
}

impl VersionStatus {
    /// Terminal statuses never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VersionStatus::Delivered
                | VersionStatus::Rejected
                | VersionStatus::Discarded
                | VersionStatus::Failed
        )
    }

    /// Statuses that carry `final_content`.
    pub fn is_approved(&self) -> bool {
        matches!(self, VersionStatus::Approved | VersionStatus::Delivered)
    }
}

/// Delivery progress of an approved version.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// No destination configured, or not approved yet.
    NotApplicable,
    Pending,
    Delivered,
    Failed,
}

/// Why a version ended in `failed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The generator returned an error.
    Generation,
    /// The generator did not answer within the bounded timeout.
    Timeout,
    /// The generator answered with unusable output.
    Validation,
    /// The run was abandoned mid-flight and recovered later.
    Abandoned,
}

/// Kind of content held by a context item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Message,
    Email,
    Page,
    Event,
    Document,
    Url,
    /// A fact the user stated directly.
    UserFact,
    /// A preference inferred by the feedback loop.
    LearnedPreference,
}

/// The shape of output a deliverable produces.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliverableType {
    StatusReport,
    Digest,
    MeetingPrep,
    ResearchBrief,
    Custom,
}

/// One configured input of a deliverable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    /// A synced platform resource.
    Resource {
        platform: Platform,
        resource_id: String,
    },
    /// An ad hoc URL fetched at generation time.
    Url { url: String },
    /// An uploaded document held inline.
    Document { name: String, content: String },
}

impl SourceSpec {
    /// Stable label used in provenance headers and failure reports.
    pub fn label(&self) -> String {
        match self {
            SourceSpec::Resource {
                platform,
                resource_id,
            } => format!("{platform}/{resource_id}"),
            SourceSpec::Url { url } => format!("url/{url}"),
            SourceSpec::Document { name, .. } => format!("document/{name}"),
        }
    }
}

/// Where approved content is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Delivery channel, e.g. `email` or `slack`.
    pub channel: String,
    /// Channel-specific target: an address, a channel id.
    pub target: String,
}
