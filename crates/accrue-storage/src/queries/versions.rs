// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deliverable version queries.
//!
//! Version numbers come from the deliverable's `next_version_number` counter,
//! read and bumped in the same transaction that inserts the version. Status
//! changes are conditional on the expected prior status.

use accrue_core::{
    AccrueError, DeliverableVersion, DeliveryStatus, VersionStatus, VersionTransition,
};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::rows::{get_enum, get_opt_enum, get_opt_ts, get_ts, opt_ts, ts};

const COLUMNS: &str = "id, deliverable_id, version_number, status, draft_content, final_content,
     delivery_status, failure_kind, error_reason, created_at, staged_at, decided_at,
     auto_approve_at";

fn row_to_version(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeliverableVersion> {
    Ok(DeliverableVersion {
        id: row.get(0)?,
        deliverable_id: row.get(1)?,
        version_number: row.get(2)?,
        status: get_enum(row, 3)?,
        draft_content: row.get(4)?,
        final_content: row.get(5)?,
        delivery_status: get_enum(row, 6)?,
        failure_kind: get_opt_enum(row, 7)?,
        error_reason: row.get(8)?,
        created_at: get_ts(row, 9)?,
        staged_at: get_opt_ts(row, 10)?,
        decided_at: get_opt_ts(row, 11)?,
        auto_approve_at: get_opt_ts(row, 12)?,
    })
}

enum Allocation {
    Created(DeliverableVersion),
    AlreadyGenerating,
    MissingDeliverable,
}

/// Allocates the next version number and inserts a `generating` version.
pub async fn allocate_version(
    db: &Database,
    deliverable_id: &str,
    at: DateTime<Utc>,
) -> Result<DeliverableVersion, AccrueError> {
    let id = deliverable_id.to_string();
    let outcome = db
        .connection()
        .call(move |conn| -> Result<Allocation, rusqlite::Error> {
            let tx = conn.transaction()?;
            let next: Option<i64> = tx
                .query_row(
                    "SELECT next_version_number FROM deliverables WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(version_number) = next else {
                return Ok(Allocation::MissingDeliverable);
            };

            let generating: bool = tx.query_row(
                "SELECT EXISTS (SELECT 1 FROM deliverable_versions
                                WHERE deliverable_id = ?1 AND status = 'generating')",
                params![id],
                |row| row.get(0),
            )?;
            if generating {
                return Ok(Allocation::AlreadyGenerating);
            }

            let version = DeliverableVersion {
                id: uuid::Uuid::new_v4().to_string(),
                deliverable_id: id.clone(),
                version_number,
                status: VersionStatus::Generating,
                draft_content: None,
                final_content: None,
                delivery_status: DeliveryStatus::NotApplicable,
                failure_kind: None,
                error_reason: None,
                created_at: at,
                staged_at: None,
                decided_at: None,
                auto_approve_at: None,
            };
            tx.execute(
                "INSERT INTO deliverable_versions
                     (id, deliverable_id, version_number, status, delivery_status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    version.id,
                    version.deliverable_id,
                    version.version_number,
                    version.status.to_string(),
                    version.delivery_status.to_string(),
                    ts(&version.created_at),
                ],
            )?;
            tx.execute(
                "UPDATE deliverables SET next_version_number = ?2 WHERE id = ?1",
                params![id, version_number + 1],
            )?;
            tx.commit()?;
            Ok(Allocation::Created(version))
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        Allocation::Created(version) => Ok(version),
        Allocation::AlreadyGenerating => Err(AccrueError::already_running(format!(
            "deliverable:{deliverable_id}"
        ))),
        Allocation::MissingDeliverable => Err(AccrueError::NotFound {
            entity: "deliverable",
            id: deliverable_id.to_string(),
        }),
    }
}

pub async fn get_version(
    db: &Database,
    version_id: &str,
) -> Result<Option<DeliverableVersion>, AccrueError> {
    let version_id = version_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<DeliverableVersion>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM deliverable_versions WHERE id = ?1"),
                params![version_id],
                row_to_version,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_versions(
    db: &Database,
    deliverable_id: &str,
) -> Result<Vec<DeliverableVersion>, AccrueError> {
    let deliverable_id = deliverable_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<DeliverableVersion>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM deliverable_versions
                 WHERE deliverable_id = ?1 ORDER BY version_number ASC"
            ))?;
            let rows = stmt.query_map(params![deliverable_id], row_to_version)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_with_status(
    db: &Database,
    status: VersionStatus,
) -> Result<Vec<DeliverableVersion>, AccrueError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<DeliverableVersion>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM deliverable_versions
                 WHERE status = ?1 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![status], row_to_version)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Applies `transition` iff the stored status still equals `transition.expected`.
///
/// `staged_at` is stamped on entering staged and `decided_at` on entering any
/// decided status; a same-status update stamps neither. Leaving staged
/// clears the semi-auto deadline unless the transition sets one explicitly.
pub async fn transition_version(
    db: &Database,
    transition: &VersionTransition,
) -> Result<bool, AccrueError> {
    let t = transition.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let (set_deadline, deadline) = match t.auto_approve_at {
                Some(value) => (true, opt_ts(value.as_ref())),
                None => (false, None),
            };
            let changed = conn.execute(
                "UPDATE deliverable_versions SET
                     status = ?3,
                     draft_content = COALESCE(?4, draft_content),
                     final_content = COALESCE(?5, final_content),
                     delivery_status = COALESCE(?6, delivery_status),
                     failure_kind = COALESCE(?7, failure_kind),
                     error_reason = COALESCE(?8, error_reason),
                     auto_approve_at = CASE
                         WHEN ?9 THEN ?10
                         WHEN ?3 <> 'staged' THEN NULL
                         ELSE auto_approve_at END,
                     staged_at = CASE WHEN ?3 = 'staged' AND ?2 <> 'staged' THEN ?11 ELSE staged_at END,
                     decided_at = CASE
                         WHEN ?3 <> ?2 AND ?3 IN ('approved', 'rejected', 'discarded', 'failed') THEN ?11
                         ELSE decided_at END
                 WHERE id = ?1 AND status = ?2",
                params![
                    t.version_id,
                    t.expected.to_string(),
                    t.next.to_string(),
                    t.draft_content,
                    t.final_content,
                    t.delivery_status.map(|s| s.to_string()),
                    t.failure_kind.map(|k| k.to_string()),
                    t.error_reason,
                    set_deadline,
                    deadline,
                    ts(&t.at),
                ],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn due_auto_approvals(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<Vec<DeliverableVersion>, AccrueError> {
    let now = ts(&now);
    db.connection()
        .call(move |conn| -> Result<Vec<DeliverableVersion>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM deliverable_versions
                 WHERE status = 'staged' AND auto_approve_at IS NOT NULL AND auto_approve_at <= ?1
                 ORDER BY auto_approve_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![now], row_to_version)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn approved_without_feedback(
    db: &Database,
    limit: usize,
) -> Result<Vec<DeliverableVersion>, AccrueError> {
    let limit = limit as i64;
    db.connection()
        .call(move |conn| -> Result<Vec<DeliverableVersion>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM deliverable_versions v
                 WHERE v.status IN ('approved', 'delivered')
                   AND NOT EXISTS (SELECT 1 FROM feedback_observations f WHERE f.version_id = v.id)
                 ORDER BY v.deliverable_id ASC, v.version_number ASC
                 LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], row_to_version)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
