// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The generation pipeline: one strictly ordered run per deliverable.
//!
//! lease -> allocate version -> aggregate -> generate -> validate -> stage
//! -> governance -> audit record -> release.

use std::sync::Arc;
use std::time::Instant;

use accrue_config::model::GenerationConfig;
use accrue_context::{ContextAggregator, ContextPayload, FailedSource};
use accrue_core::{
    AccrueError, Deliverable, DeliverableVersion, DraftGenerator, DraftRequest, FailureKind, Lease,
    StorageAdapter, VersionStatus, WorkRecord, metrics,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::governance::Governance;
use crate::templates::instruction_prompt;
use crate::validation::{bounds_for, validate_output};

/// Lease key serializing runs of one deliverable.
pub fn run_lease_key(deliverable_id: &str) -> String {
    format!("deliverable:{deliverable_id}")
}

/// The result of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// The version in the state the run left it.
    pub version: DeliverableVersion,
    pub failed_sources: Vec<FailedSource>,
    pub context_truncated: bool,
}

pub struct GenerationPipeline {
    storage: Arc<dyn StorageAdapter>,
    aggregator: Arc<ContextAggregator>,
    generator: Arc<dyn DraftGenerator>,
    governance: Arc<Governance>,
    config: GenerationConfig,
}

impl GenerationPipeline {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        aggregator: Arc<ContextAggregator>,
        generator: Arc<dyn DraftGenerator>,
        governance: Arc<Governance>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            storage,
            aggregator,
            generator,
            governance,
            config,
        }
    }

    pub fn governance(&self) -> &Arc<Governance> {
        &self.governance
    }

    /// Runs the deliverable once.
    ///
    /// A concurrent run of the same deliverable makes this fail with
    /// [`AccrueError::ConcurrencyConflict`] before any version is created.
    /// Generator and validation failures are not errors: they end the
    /// version in `failed` and the report says so.
    pub async fn run_deliverable(
        &self,
        deliverable_id: &str,
        now: DateTime<Utc>,
    ) -> Result<RunReport, AccrueError> {
        let deliverable = self
            .storage
            .get_deliverable(deliverable_id)
            .await?
            .ok_or_else(|| AccrueError::NotFound {
                entity: "deliverable",
                id: deliverable_id.to_string(),
            })?;

        let ttl = TimeDelta::seconds(i64::try_from(self.config.lease_ttl_secs).unwrap_or(i64::MAX / 1000));
        let lease = match Lease::acquire_or_conflict(
            self.storage.as_ref(),
            run_lease_key(deliverable_id),
            ttl,
            now,
        )
        .await
        {
            Ok(lease) => lease,
            Err(e) => {
                metrics::record_generation("conflict");
                return Err(e);
            }
        };
        let result = self.run_leased(&deliverable, now).await;
        lease.release(self.storage.as_ref()).await;

        match &result {
            Ok(report) => metrics::record_generation(match report.version.status {
                VersionStatus::Failed => "failed",
                _ => "staged",
            }),
            Err(AccrueError::ConcurrencyConflict { .. }) => metrics::record_generation("conflict"),
            Err(_) => metrics::record_generation("failed"),
        }
        result
    }

    async fn run_leased(
        &self,
        deliverable: &Deliverable,
        now: DateTime<Utc>,
    ) -> Result<RunReport, AccrueError> {
        let started = Utc::now();
        let version = self.storage.allocate_version(&deliverable.id, now).await?;
        info!(
            deliverable_id = %deliverable.id,
            version = version.version_number,
            "generation started"
        );

        let payload = match self.aggregator.aggregate(deliverable, now).await {
            Ok(payload) => payload,
            Err(e) => {
                let reason = format!("context aggregation failed: {e}");
                self.governance
                    .fail(&version.id, FailureKind::Generation, &reason, None, now)
                    .await?;
                return Err(e);
            }
        };

        let request = DraftRequest {
            deliverable_id: deliverable.id.clone(),
            deliverable_type: deliverable.deliverable_type,
            prompt: instruction_prompt(deliverable),
            context: payload.text.clone(),
            max_chars: bounds_for(deliverable.deliverable_type).max_chars,
        };
        let timeout = self.config.timeout();
        let clock = Instant::now();
        let generated = tokio::time::timeout(timeout, self.generator.generate(request.clone())).await;
        metrics::record_generation_duration(clock.elapsed().as_secs_f64());

        let version = match generated {
            Ok(Ok(raw)) => match validate_output(deliverable.deliverable_type, &raw) {
                Ok(()) => {
                    self.governance
                        .stage(deliverable, &version.id, raw, now)
                        .await?
                }
                Err(reason) => {
                    self.governance
                        .fail(&version.id, FailureKind::Validation, &reason, Some(raw), now)
                        .await?
                }
            },
            Ok(Err(e)) => {
                let reason = AccrueError::Generation {
                    version_id: version.id.clone(),
                    message: e.to_string(),
                }
                .to_string();
                self.governance
                    .fail(&version.id, FailureKind::Generation, &reason, None, now)
                    .await?
            }
            Err(_) => {
                let reason = AccrueError::Timeout { duration: timeout }.to_string();
                self.governance
                    .fail(&version.id, FailureKind::Timeout, &reason, None, now)
                    .await?
            }
        };

        if version.status != VersionStatus::Failed {
            self.storage
                .set_deliverable_last_run(&deliverable.id, now)
                .await?;
        }
        self.write_work_record(deliverable, &version, &request, &payload, started)
            .await;

        info!(
            deliverable_id = %deliverable.id,
            version = version.version_number,
            status = %version.status,
            "generation finished"
        );
        Ok(RunReport {
            version,
            failed_sources: payload.failed_sources,
            context_truncated: payload.truncated,
        })
    }

    /// The audit record is best effort: losing it never affects the version.
    async fn write_work_record(
        &self,
        deliverable: &Deliverable,
        version: &DeliverableVersion,
        request: &DraftRequest,
        payload: &ContextPayload,
        started_at: DateTime<Utc>,
    ) {
        let record = WorkRecord {
            id: uuid::Uuid::new_v4().to_string(),
            version_id: version.id.clone(),
            deliverable_id: deliverable.id.clone(),
            started_at,
            finished_at: Some(Utc::now()),
            input_log: json!({
                "sources": deliverable.sources,
                "window": self.aggregator.window(deliverable, version.created_at),
                "prompt": request.prompt,
                "context": payload.text,
                "included_item_ids": payload.included_item_ids,
                "dropped_items": payload.dropped,
                "truncated": payload.truncated,
                "failed_sources": payload.failed_sources,
            }),
            output_log: json!({
                "status": version.status,
                "draft": version.draft_content,
                "failure_kind": version.failure_kind,
                "error": version.error_reason,
            }),
        };
        if let Err(e) = self.storage.insert_work_record(&record).await {
            warn!(version_id = %version.id, error = %e, "failed to write work record");
        }
    }
}
