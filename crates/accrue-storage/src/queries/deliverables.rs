// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deliverable queries. Generation only ever touches the bookkeeping columns.

use accrue_core::{AccrueError, Deliverable};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::rows::{get_enum, get_json, get_opt_json, get_opt_ts, get_ts, opt_ts, to_json, ts};

const COLUMNS: &str = "id, user_id, title, deliverable_type, schedule, sources,
     governance_mode, destination, instructions, paused, created_at, last_run_at";

fn row_to_deliverable(row: &rusqlite::Row<'_>) -> rusqlite::Result<Deliverable> {
    Ok(Deliverable {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        deliverable_type: get_enum(row, 3)?,
        schedule: row.get(4)?,
        sources: get_json(row, 5)?,
        governance_mode: get_enum(row, 6)?,
        destination: get_opt_json(row, 7)?,
        instructions: row.get(8)?,
        paused: row.get(9)?,
        created_at: get_ts(row, 10)?,
        last_run_at: get_opt_ts(row, 11)?,
    })
}

pub async fn create_deliverable(db: &Database, deliverable: &Deliverable) -> Result<(), AccrueError> {
    let d = deliverable.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let sources = to_json(&d.sources)?;
            let destination = d.destination.as_ref().map(to_json).transpose()?;
            conn.execute(
                "INSERT INTO deliverables
                     (id, user_id, title, deliverable_type, schedule, sources,
                      governance_mode, destination, instructions, paused, created_at, last_run_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    d.id,
                    d.user_id,
                    d.title,
                    d.deliverable_type.to_string(),
                    d.schedule,
                    sources,
                    d.governance_mode.to_string(),
                    destination,
                    d.instructions,
                    d.paused,
                    ts(&d.created_at),
                    opt_ts(d.last_run_at.as_ref()),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_deliverable(db: &Database, id: &str) -> Result<Option<Deliverable>, AccrueError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Deliverable>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM deliverables WHERE id = ?1"),
                params![id],
                row_to_deliverable,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_deliverables(
    db: &Database,
    user_id: Option<&str>,
) -> Result<Vec<Deliverable>, AccrueError> {
    let user_id = user_id.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<Vec<Deliverable>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM deliverables
                 WHERE ?1 IS NULL OR user_id = ?1
                 ORDER BY created_at, id"
            ))?;
            let rows = stmt.query_map(params![user_id], row_to_deliverable)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_last_run(db: &Database, id: &str, at: DateTime<Utc>) -> Result<(), AccrueError> {
    let id = id.to_string();
    let at = ts(&at);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE deliverables SET last_run_at = ?2 WHERE id = ?1",
                params![id, at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_paused(db: &Database, id: &str, paused: bool) -> Result<bool, AccrueError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE deliverables SET paused = ?2 WHERE id = ?1",
                params![id, paused],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}
