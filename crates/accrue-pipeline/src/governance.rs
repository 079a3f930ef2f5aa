// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Version state machine and governance gates.
//!
//! ```text
//! generating -> staged -> approved -> delivered
//!     |           |  \-> rejected
//!     v           \----> discarded
//!   failed
//! ```
//!
//! Every write is conditional on the status it was decided from, so two
//! triggers racing on one version cannot both win.

use std::sync::Arc;

use accrue_config::model::GovernanceConfig;
use accrue_core::{
    AccrueError, Deliverable, DeliverableVersion, DeliveryAdapter, DeliveryStatus, FailureKind,
    GovernanceMode, StorageAdapter, VersionStatus, VersionTransition, metrics,
};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{info, warn};

/// Whether the state machine allows `from -> to`. Self-loops are the
/// bookkeeping updates: a hold on a staged version and a delivery status
/// change on an approved one.
pub fn is_allowed(from: VersionStatus, to: VersionStatus) -> bool {
    use VersionStatus::*;
    matches!(
        (from, to),
        (Generating, Staged)
            | (Generating, Failed)
            | (Staged, Staged)
            | (Staged, Approved)
            | (Staged, Rejected)
            | (Staged, Discarded)
            | (Approved, Approved)
            | (Approved, Delivered)
    )
}

pub struct Governance {
    storage: Arc<dyn StorageAdapter>,
    delivery: Option<Arc<dyn DeliveryAdapter>>,
    semi_auto_window: TimeDelta,
}

impl Governance {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        delivery: Option<Arc<dyn DeliveryAdapter>>,
        config: &GovernanceConfig,
    ) -> Self {
        Self {
            storage,
            delivery,
            semi_auto_window: TimeDelta::seconds(
                i64::try_from(config.semi_auto_window_secs).unwrap_or(i64::MAX / 1000),
            ),
        }
    }

    async fn load(&self, version_id: &str) -> Result<DeliverableVersion, AccrueError> {
        self.storage
            .get_version(version_id)
            .await?
            .ok_or_else(|| AccrueError::NotFound {
                entity: "version",
                id: version_id.to_string(),
            })
    }

    async fn deliverable_of(&self, version: &DeliverableVersion) -> Result<Deliverable, AccrueError> {
        self.storage
            .get_deliverable(&version.deliverable_id)
            .await?
            .ok_or_else(|| AccrueError::NotFound {
                entity: "deliverable",
                id: version.deliverable_id.clone(),
            })
    }

    /// Applies one conditional transition and returns the stored result.
    ///
    /// If the version moved on in the meantime the transition is reported
    /// as invalid from the status it is actually in.
    pub async fn apply(
        &self,
        transition: VersionTransition,
    ) -> Result<DeliverableVersion, AccrueError> {
        if !is_allowed(transition.expected, transition.next) {
            return Err(AccrueError::InvalidTransition {
                version_id: transition.version_id,
                from: transition.expected,
                to: transition.next,
            });
        }
        if !self.storage.transition_version(&transition).await? {
            let current = self.load(&transition.version_id).await?;
            return Err(AccrueError::InvalidTransition {
                version_id: transition.version_id,
                from: current.status,
                to: transition.next,
            });
        }
        if transition.expected != transition.next {
            metrics::record_transition(transition.next.into());
            info!(
                version_id = %transition.version_id,
                from = %transition.expected,
                to = %transition.next,
                "version transitioned"
            );
        }
        self.load(&transition.version_id).await
    }

    fn require(version: &DeliverableVersion, status: VersionStatus, to: VersionStatus) -> Result<(), AccrueError> {
        if version.status == status {
            Ok(())
        } else {
            Err(AccrueError::InvalidTransition {
                version_id: version.id.clone(),
                from: version.status,
                to,
            })
        }
    }

    /// Ends a generating version in `failed`.
    pub async fn fail(
        &self,
        version_id: &str,
        kind: FailureKind,
        reason: &str,
        draft: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<DeliverableVersion, AccrueError> {
        let mut t =
            VersionTransition::new(version_id, VersionStatus::Generating, VersionStatus::Failed, now);
        t.failure_kind = Some(kind);
        t.error_reason = Some(reason.to_string());
        t.draft_content = draft;
        let version = self.apply(t).await?;
        warn!(version_id, kind = %kind, reason, "version failed");
        Ok(version)
    }

    /// Stages a validated draft, then applies the deliverable's governance
    /// mode: manual waits, semi-auto arms the approval deadline, full-auto
    /// approves straight away.
    pub async fn stage(
        &self,
        deliverable: &Deliverable,
        version_id: &str,
        draft: String,
        now: DateTime<Utc>,
    ) -> Result<DeliverableVersion, AccrueError> {
        let mut t =
            VersionTransition::new(version_id, VersionStatus::Generating, VersionStatus::Staged, now);
        t.draft_content = Some(draft);
        if deliverable.governance_mode == GovernanceMode::SemiAuto {
            t.auto_approve_at = Some(Some(now + self.semi_auto_window));
        }
        let staged = self.apply(t).await?;
        match deliverable.governance_mode {
            GovernanceMode::FullAuto => self.approve_staged(deliverable, staged, None, now).await,
            GovernanceMode::Manual | GovernanceMode::SemiAuto => Ok(staged),
        }
    }

    async fn approve_staged(
        &self,
        deliverable: &Deliverable,
        version: DeliverableVersion,
        edited: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<DeliverableVersion, AccrueError> {
        let final_content = match edited {
            Some(text) if text.trim().is_empty() => {
                return Err(AccrueError::InvalidRequest(
                    "approved content is empty".to_string(),
                ));
            }
            Some(text) => text,
            None => version.draft_content.clone().ok_or_else(|| {
                AccrueError::Internal(format!("staged version {} has no draft", version.id))
            })?,
        };
        let mut t =
            VersionTransition::new(&version.id, VersionStatus::Staged, VersionStatus::Approved, now);
        t.final_content = Some(final_content);
        t.auto_approve_at = Some(None);
        t.delivery_status = Some(if deliverable.destination.is_some() {
            DeliveryStatus::Pending
        } else {
            DeliveryStatus::NotApplicable
        });
        let approved = self.apply(t).await?;
        self.deliver(deliverable, approved, now).await
    }

    /// Approves a staged version. Without edits the final content is the
    /// draft; with edits both are kept.
    pub async fn approve(
        &self,
        version_id: &str,
        final_content: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<DeliverableVersion, AccrueError> {
        let version = self.load(version_id).await?;
        Self::require(&version, VersionStatus::Staged, VersionStatus::Approved)?;
        let deliverable = self.deliverable_of(&version).await?;
        self.approve_staged(&deliverable, version, final_content, now)
            .await
    }

    pub async fn reject(
        &self,
        version_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DeliverableVersion, AccrueError> {
        self.apply(VersionTransition::new(
            version_id,
            VersionStatus::Staged,
            VersionStatus::Rejected,
            now,
        ))
        .await
    }

    pub async fn discard(
        &self,
        version_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DeliverableVersion, AccrueError> {
        self.apply(VersionTransition::new(
            version_id,
            VersionStatus::Staged,
            VersionStatus::Discarded,
            now,
        ))
        .await
    }

    /// Cancels a pending semi-auto approval; the version then waits for a
    /// manual decision.
    pub async fn hold(
        &self,
        version_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DeliverableVersion, AccrueError> {
        let mut t =
            VersionTransition::new(version_id, VersionStatus::Staged, VersionStatus::Staged, now);
        t.auto_approve_at = Some(None);
        let held = self.apply(t).await?;
        info!(version_id, "semi-auto approval held");
        Ok(held)
    }

    /// Approves every staged version whose semi-auto deadline has passed.
    /// Versions decided concurrently are skipped.
    pub async fn sweep_auto_approvals(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<DeliverableVersion>, AccrueError> {
        let mut approved = Vec::new();
        for version in self.storage.due_auto_approvals(now).await? {
            let deliverable = self.deliverable_of(&version).await?;
            let id = version.id.clone();
            match self.approve_staged(&deliverable, version, None, now).await {
                Ok(v) => approved.push(v),
                Err(AccrueError::InvalidTransition { .. }) => {
                    info!(version_id = %id, "auto-approval skipped, version already decided");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(approved)
    }

    /// Sends an approved version to its destination. A failed delivery
    /// leaves the version approved with `delivery_status = failed`.
    pub async fn deliver(
        &self,
        deliverable: &Deliverable,
        version: DeliverableVersion,
        now: DateTime<Utc>,
    ) -> Result<DeliverableVersion, AccrueError> {
        let Some(destination) = deliverable.destination.as_ref() else {
            return Ok(version);
        };
        Self::require(&version, VersionStatus::Approved, VersionStatus::Delivered)?;
        let content = version.final_content.clone().unwrap_or_default();

        let outcome = match &self.delivery {
            Some(adapter) => adapter
                .deliver(destination, deliverable, &version, &content)
                .await
                .map_err(|e| e.to_string()),
            None => Err("no delivery adapter configured".to_string()),
        };
        match outcome {
            Ok(()) => {
                let mut t = VersionTransition::new(
                    &version.id,
                    VersionStatus::Approved,
                    VersionStatus::Delivered,
                    now,
                );
                t.delivery_status = Some(DeliveryStatus::Delivered);
                self.apply(t).await
            }
            Err(error) => {
                warn!(
                    version_id = %version.id,
                    channel = %destination.channel,
                    error = %error,
                    "delivery failed"
                );
                let mut t = VersionTransition::new(
                    &version.id,
                    VersionStatus::Approved,
                    VersionStatus::Approved,
                    now,
                );
                t.delivery_status = Some(DeliveryStatus::Failed);
                self.apply(t).await
            }
        }
    }

    /// Retries delivery of approved versions whose delivery is pending or
    /// failed.
    pub async fn retry_deliveries(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<DeliverableVersion>, AccrueError> {
        let mut out = Vec::new();
        for version in self
            .storage
            .list_versions_with_status(VersionStatus::Approved)
            .await?
        {
            if !matches!(
                version.delivery_status,
                DeliveryStatus::Pending | DeliveryStatus::Failed
            ) {
                continue;
            }
            let deliverable = self.deliverable_of(&version).await?;
            out.push(self.deliver(&deliverable, version, now).await?);
        }
        Ok(out)
    }

    /// Fails versions left generating longer than `stuck_after`, which
    /// happens only when a run died mid-flight.
    pub async fn recover_stuck(
        &self,
        now: DateTime<Utc>,
        stuck_after: TimeDelta,
    ) -> Result<Vec<DeliverableVersion>, AccrueError> {
        let mut recovered = Vec::new();
        for version in self
            .storage
            .list_versions_with_status(VersionStatus::Generating)
            .await?
        {
            if now - version.created_at < stuck_after {
                continue;
            }
            match self
                .fail(
                    &version.id,
                    FailureKind::Abandoned,
                    "generation abandoned: no result before the stuck threshold",
                    None,
                    now,
                )
                .await
            {
                Ok(v) => recovered.push(v),
                Err(AccrueError::InvalidTransition { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(recovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [VersionStatus; 7] = [
        VersionStatus::Generating,
        VersionStatus::Staged,
        VersionStatus::Approved,
        VersionStatus::Delivered,
        VersionStatus::Rejected,
        VersionStatus::Discarded,
        VersionStatus::Failed,
    ];

    #[test]
    fn terminal_statuses_have_no_exits() {
        for from in ALL.into_iter().filter(VersionStatus::is_terminal) {
            for to in ALL {
                assert!(!is_allowed(from, to), "{from} -> {to} must be rejected");
            }
        }
    }

    #[test]
    fn approval_only_from_staged() {
        assert!(is_allowed(VersionStatus::Staged, VersionStatus::Approved));
        assert!(!is_allowed(VersionStatus::Generating, VersionStatus::Approved));
        assert!(!is_allowed(VersionStatus::Rejected, VersionStatus::Approved));
        assert!(!is_allowed(VersionStatus::Generating, VersionStatus::Generating));
        assert!(!is_allowed(VersionStatus::Staged, VersionStatus::Failed));
    }
}
