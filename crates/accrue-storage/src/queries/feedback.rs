// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feedback observation queries. One observation per version, enforced by
//! the primary key.

use accrue_core::{AccrueError, FeedbackObservation};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::rows::{get_json, get_ts, to_json, ts};

const COLUMNS: &str = "version_id, deliverable_id, version_number, distance, categories, observed_at";

fn row_to_observation(row: &rusqlite::Row<'_>) -> rusqlite::Result<FeedbackObservation> {
    Ok(FeedbackObservation {
        version_id: row.get(0)?,
        deliverable_id: row.get(1)?,
        version_number: row.get(2)?,
        distance: row.get(3)?,
        categories: get_json(row, 4)?,
        observed_at: get_ts(row, 5)?,
    })
}

/// Returns `false` when the version was already observed.
pub async fn insert_observation(
    db: &Database,
    observation: &FeedbackObservation,
) -> Result<bool, AccrueError> {
    let o = observation.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let categories = to_json(&o.categories)?;
            let changed = conn.execute(
                "INSERT OR IGNORE INTO feedback_observations
                     (version_id, deliverable_id, version_number, distance, categories, observed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    o.version_id,
                    o.deliverable_id,
                    o.version_number,
                    o.distance,
                    categories,
                    ts(&o.observed_at),
                ],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Observations of one deliverable, newest version first.
pub async fn list_observations(
    db: &Database,
    deliverable_id: &str,
) -> Result<Vec<FeedbackObservation>, AccrueError> {
    let deliverable_id = deliverable_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<FeedbackObservation>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM feedback_observations
                 WHERE deliverable_id = ?1 ORDER BY version_number DESC"
            ))?;
            let rows = stmt.query_map(params![deliverable_id], row_to_observation)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_observation(
    db: &Database,
    version_id: &str,
) -> Result<Option<FeedbackObservation>, AccrueError> {
    let version_id = version_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<FeedbackObservation>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM feedback_observations WHERE version_id = ?1"),
                params![version_id],
                row_to_observation,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
