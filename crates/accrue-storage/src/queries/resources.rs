// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resource registry queries: discovery, selection and sync bookkeeping.

use accrue_core::{
    AccrueError, ContextItem, DiscoveredResource, Platform, Resource, ResourceKey,
    SelectionChange,
};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use tracing::debug;

use crate::database::{Database, map_tr_err};
use crate::queries::items::insert_items_tx;
use crate::rows::{get_opt_json, get_opt_ts, get_enum, get_ts, opt_ts, to_json, ts};

const COLUMNS: &str = "user_id, platform, resource_id, resource_type, name, is_private, metadata,
     selected, selected_at, excluded, cursor, last_synced, last_sync_partial,
     last_error, last_error_at, discovered_at";

fn row_to_resource(row: &rusqlite::Row<'_>) -> rusqlite::Result<Resource> {
    Ok(Resource {
        user_id: row.get(0)?,
        platform: get_enum(row, 1)?,
        resource_id: row.get(2)?,
        resource_type: row.get(3)?,
        name: row.get(4)?,
        is_private: row.get(5)?,
        metadata: get_opt_json(row, 6)?,
        selected: row.get(7)?,
        selected_at: get_opt_ts(row, 8)?,
        excluded: row.get(9)?,
        cursor: row.get(10)?,
        last_synced: get_opt_ts(row, 11)?,
        last_sync_partial: row.get(12)?,
        last_error: row.get(13)?,
        last_error_at: get_opt_ts(row, 14)?,
        discovered_at: get_ts(row, 15)?,
    })
}

/// Records a landscape entry. Only descriptive columns are refreshed when the
/// resource already exists.
pub async fn upsert_discovered(
    db: &Database,
    user_id: &str,
    platform: Platform,
    discovered: &DiscoveredResource,
    now: DateTime<Utc>,
) -> Result<(), AccrueError> {
    let user_id = user_id.to_string();
    let platform = platform.to_string();
    let d = discovered.clone();
    let now = ts(&now);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let metadata = d.metadata.as_ref().map(to_json).transpose()?;
            conn.execute(
                "INSERT INTO resources
                     (user_id, platform, resource_id, resource_type, name, is_private, metadata, discovered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(user_id, platform, resource_id) DO UPDATE SET
                     resource_type = excluded.resource_type,
                     name = excluded.name,
                     is_private = excluded.is_private,
                     metadata = excluded.metadata",
                params![
                    user_id,
                    platform,
                    d.resource_id,
                    d.resource_type,
                    d.name,
                    d.is_private,
                    metadata,
                    now
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_resource(db: &Database, key: &ResourceKey) -> Result<Option<Resource>, AccrueError> {
    let key = key.clone();
    db.connection()
        .call(move |conn| -> Result<Option<Resource>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM resources
                     WHERE user_id = ?1 AND platform = ?2 AND resource_id = ?3"
                ),
                params![key.user_id, key.platform.to_string(), key.resource_id],
                row_to_resource,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_resources(
    db: &Database,
    user_id: &str,
    platform: Option<Platform>,
) -> Result<Vec<Resource>, AccrueError> {
    let user_id = user_id.to_string();
    let platform = platform.map(|p| p.to_string());
    db.connection()
        .call(move |conn| -> Result<Vec<Resource>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM resources
                 WHERE user_id = ?1 AND (?2 IS NULL OR platform = ?2)
                 ORDER BY platform, resource_id"
            ))?;
            let rows = stmt.query_map(params![user_id, platform], row_to_resource)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_active(db: &Database) -> Result<Vec<Resource>, AccrueError> {
    db.connection()
        .call(|conn| -> Result<Vec<Resource>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM resources
                 WHERE selected = 1 AND excluded = 0
                 ORDER BY user_id, platform, resource_id"
            ))?;
            let rows = stmt.query_map([], row_to_resource)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Applies every selection change in one transaction.
pub async fn update_selection(
    db: &Database,
    changes: &[SelectionChange],
) -> Result<(), AccrueError> {
    let changes = changes.to_vec();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            write_selection(&tx, &changes)?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Applies selection flag changes inside the caller's transaction.
pub(crate) fn write_selection(
    tx: &rusqlite::Transaction<'_>,
    changes: &[SelectionChange],
) -> Result<(), rusqlite::Error> {
    let mut stmt = tx.prepare(
        "UPDATE resources SET selected = ?4, excluded = ?5, selected_at = ?6
         WHERE user_id = ?1 AND platform = ?2 AND resource_id = ?3",
    )?;
    for change in changes {
        stmt.execute(params![
            change.key.user_id,
            change.key.platform.to_string(),
            change.key.resource_id,
            change.selected,
            change.excluded,
            opt_ts(change.selected_at.as_ref()),
        ])?;
    }
    Ok(())
}

/// Persists one successful fetch: new items, cursor, sync time, partial flag.
///
/// The error fields are cleared. Returns the number of items inserted after
/// dedupe.
pub async fn apply_sync_page(
    db: &Database,
    key: &ResourceKey,
    items: &[ContextItem],
    next_cursor: Option<&str>,
    partial: bool,
    synced_at: DateTime<Utc>,
) -> Result<usize, AccrueError> {
    let key = key.clone();
    let items = items.to_vec();
    let next_cursor = next_cursor.map(str::to_string);
    let synced_at = ts(&synced_at);
    let inserted = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            let inserted = insert_items_tx(&tx, &items)?;
            tx.execute(
                "UPDATE resources SET
                     cursor = COALESCE(?4, cursor),
                     last_synced = ?5,
                     last_sync_partial = ?6,
                     last_error = NULL,
                     last_error_at = NULL
                 WHERE user_id = ?1 AND platform = ?2 AND resource_id = ?3",
                params![
                    key.user_id,
                    key.platform.to_string(),
                    key.resource_id,
                    next_cursor,
                    synced_at,
                    partial
                ],
            )?;
            tx.commit()?;
            Ok(inserted)
        })
        .await
        .map_err(map_tr_err)?;
    debug!(inserted, "sync page applied");
    Ok(inserted)
}

/// Records a failed attempt without touching cursor or sync timestamps.
pub async fn record_sync_failure(
    db: &Database,
    key: &ResourceKey,
    error: &str,
    at: DateTime<Utc>,
) -> Result<(), AccrueError> {
    let key = key.clone();
    let error = error.to_string();
    let at = ts(&at);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE resources SET last_error = ?4, last_error_at = ?5
                 WHERE user_id = ?1 AND platform = ?2 AND resource_id = ?3",
                params![
                    key.user_id,
                    key.platform.to_string(),
                    key.resource_id,
                    error,
                    at
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_items(db: &Database, key: &ResourceKey) -> Result<usize, AccrueError> {
    let key = key.clone();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM context_items
                 WHERE user_id = ?1 AND platform = ?2 AND resource_id = ?3",
                params![key.user_id, key.platform.to_string(), key.resource_id],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await
        .map_err(map_tr_err)
}
