// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Work record (audit log) queries.

use accrue_core::{AccrueError, WorkRecord};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::rows::{get_json, get_opt_ts, get_ts, opt_ts, to_json, ts};

/// Inserts the record, replacing any earlier record for the same version.
pub async fn insert_work_record(db: &Database, record: &WorkRecord) -> Result<(), AccrueError> {
    let r = record.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let input_log = to_json(&r.input_log)?;
            let output_log = to_json(&r.output_log)?;
            conn.execute(
                "INSERT OR REPLACE INTO work_records
                     (id, version_id, deliverable_id, started_at, finished_at, input_log, output_log)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    r.id,
                    r.version_id,
                    r.deliverable_id,
                    ts(&r.started_at),
                    opt_ts(r.finished_at.as_ref()),
                    input_log,
                    output_log,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_work_record(
    db: &Database,
    version_id: &str,
) -> Result<Option<WorkRecord>, AccrueError> {
    let version_id = version_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<WorkRecord>, rusqlite::Error> {
            conn.query_row(
                "SELECT id, version_id, deliverable_id, started_at, finished_at, input_log, output_log
                 FROM work_records WHERE version_id = ?1",
                params![version_id],
                |row| {
                    Ok(WorkRecord {
                        id: row.get(0)?,
                        version_id: row.get(1)?,
                        deliverable_id: row.get(2)?,
                        started_at: get_ts(row, 3)?,
                        finished_at: get_opt_ts(row, 4)?,
                        input_log: get_json(row, 5)?,
                        output_log: get_json(row, 6)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_work_record(db: &Database, version_id: &str) -> Result<bool, AccrueError> {
    let version_id = version_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "DELETE FROM work_records WHERE version_id = ?1",
                params![version_id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}
