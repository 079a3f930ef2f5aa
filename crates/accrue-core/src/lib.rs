// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core types, errors, and adapter traits for the Accrue context pipeline.
//!
//! This crate defines the shared vocabulary used by every other crate in the
//! workspace: the records persisted by storage, the enums that classify them,
//! and the traits behind which storage, connectors, generators, source
//! fetchers and delivery channels are plugged in.

pub mod error;
pub mod lease;
pub mod metrics;
pub mod records;
pub mod time;
pub mod traits;
pub mod types;

pub use error::{AccrueError, ErrorKind};
pub use lease::Lease;
pub use records::{
    ContextItem, Deliverable, DeliverableVersion, DiscoveredResource, FeedbackObservation,
    FetchPage, FetchedItem, ItemWindow, Resource, ResourceKey, SelectionChange, User, VersionTransition,
    WorkRecord,
};
pub use traits::{
    ConnectorDirectory, DeliveryAdapter, DraftGenerator, DraftRequest, FetchedDocument,
    PluginAdapter, SourceFetcher, StorageAdapter,
};
pub use types::{
    AdapterType, ContentType, CoverageState, DeliverableType, DeliveryStatus, Destination,
    FailureKind, GovernanceMode, HealthStatus, PlanTier, Platform, SourceSpec, SyncFrequency,
    VersionStatus,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_are_stable_strings() {
        let err = AccrueError::already_running("sync:u1/slack/C1");
        assert_eq!(err.kind(), ErrorKind::ConcurrencyConflict);
        assert_eq!(err.kind().to_string(), "concurrency_conflict");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("sync:u1/slack/C1"));
    }

    #[test]
    fn tier_limit_error_names_counts() {
        let err = AccrueError::TierLimitExceeded {
            platform: Platform::Slack,
            current: 4,
            requested: 7,
            limit: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("slack"));
        assert!(msg.contains("7 requested"));
        assert!(msg.contains("limit is 5"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn provider_errors_report_as_generation() {
        let err = AccrueError::Provider {
            message: "HTTP 500".into(),
            source: None,
        };
        assert_eq!(err.kind(), ErrorKind::Generation);
    }

    #[test]
    fn invalid_transition_display() {
        let err = AccrueError::InvalidTransition {
            version_id: "v1".into(),
            from: VersionStatus::Rejected,
            to: VersionStatus::Approved,
        };
        assert_eq!(
            err.to_string(),
            "invalid transition for version v1: rejected -> approved"
        );
    }

    #[test]
    fn adapter_traits_are_object_safe() {
        fn _storage(_: &dyn StorageAdapter) {}
        fn _connector(_: &dyn ConnectorDirectory) {}
        fn _generator(_: &dyn DraftGenerator) {}
        fn _fetcher(_: &dyn SourceFetcher) {}
        fn _delivery(_: &dyn DeliveryAdapter) {}
    }
}
