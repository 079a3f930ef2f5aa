// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context store queries.

use accrue_core::{AccrueError, ContextItem, ItemWindow, ResourceKey};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::rows::{get_enum, get_opt_enum, get_ts, ts};

const COLUMNS: &str = "id, user_id, platform, resource_id, deliverable_id, external_id,
     content, content_type, source_timestamp, fetched_at, retained";

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<ContextItem> {
    Ok(ContextItem {
        id: row.get(0)?,
        user_id: row.get(1)?,
        platform: get_opt_enum(row, 2)?,
        resource_id: row.get(3)?,
        deliverable_id: row.get(4)?,
        external_id: row.get(5)?,
        content: row.get(6)?,
        content_type: get_enum(row, 7)?,
        source_timestamp: get_ts(row, 8)?,
        fetched_at: get_ts(row, 9)?,
        retained: row.get(10)?,
    })
}

/// Inserts items inside an open transaction, skipping duplicates of an
/// existing `(user, platform, resource, external_id)`.
pub(crate) fn insert_items_tx(
    tx: &rusqlite::Transaction<'_>,
    items: &[ContextItem],
) -> rusqlite::Result<usize> {
    let mut stmt = tx.prepare(
        "INSERT OR IGNORE INTO context_items
             (id, user_id, platform, resource_id, deliverable_id, external_id,
              content, content_type, source_timestamp, fetched_at, retained)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;
    let mut inserted = 0;
    for item in items {
        inserted += stmt.execute(params![
            item.id,
            item.user_id,
            item.platform.map(|p| p.to_string()),
            item.resource_id,
            item.deliverable_id,
            item.external_id,
            item.content,
            item.content_type.to_string(),
            ts(&item.source_timestamp),
            ts(&item.fetched_at),
            item.retained,
        ])?;
    }
    Ok(inserted)
}

pub async fn insert_items(db: &Database, items: &[ContextItem]) -> Result<usize, AccrueError> {
    let items = items.to_vec();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            let inserted = insert_items_tx(&tx, &items)?;
            tx.commit()?;
            Ok(inserted)
        })
        .await
        .map_err(map_tr_err)
}

/// The most recent `limit` items of a resource inside `window`, returned
/// oldest first. Recency is always by `source_timestamp`.
pub async fn list_resource_items(
    db: &Database,
    key: &ResourceKey,
    window: ItemWindow,
    limit: usize,
) -> Result<Vec<ContextItem>, AccrueError> {
    let key = key.clone();
    let (column, since) = match window {
        ItemWindow::FetchedSince(at) => ("fetched_at", ts(&at)),
        ItemWindow::SourceSince(at) => ("source_timestamp", ts(&at)),
    };
    let limit = limit as i64;
    db.connection()
        .call(move |conn| -> Result<Vec<ContextItem>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM (
                     SELECT {COLUMNS} FROM context_items
                     WHERE user_id = ?1 AND platform = ?2 AND resource_id = ?3
                       AND {column} >= ?4
                     ORDER BY source_timestamp DESC, id DESC
                     LIMIT ?5
                 ) ORDER BY source_timestamp ASC, id ASC"
            ))?;
            let rows = stmt.query_map(
                params![
                    key.user_id,
                    key.platform.to_string(),
                    key.resource_id,
                    since,
                    limit
                ],
                row_to_item,
            )?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Retained items that are user-wide or scoped to `deliverable_id`.
pub async fn list_retained(
    db: &Database,
    user_id: &str,
    deliverable_id: Option<&str>,
) -> Result<Vec<ContextItem>, AccrueError> {
    let user_id = user_id.to_string();
    let deliverable_id = deliverable_id.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<Vec<ContextItem>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM context_items
                 WHERE user_id = ?1 AND retained = 1
                   AND (deliverable_id IS NULL OR deliverable_id = ?2)
                 ORDER BY source_timestamp ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![user_id, deliverable_id], row_to_item)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_item(db: &Database, item_id: &str) -> Result<Option<ContextItem>, AccrueError> {
    let item_id = item_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ContextItem>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM context_items WHERE id = ?1"),
                params![item_id],
                row_to_item,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_retained(db: &Database, item_id: &str, retained: bool) -> Result<bool, AccrueError> {
    let item_id = item_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE context_items SET retained = ?2 WHERE id = ?1",
                params![item_id, retained],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes non-retained items fetched before `cutoff`. Retained items are never touched.
pub async fn purge_before(db: &Database, cutoff: DateTime<Utc>) -> Result<usize, AccrueError> {
    let cutoff = ts(&cutoff);
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM context_items WHERE retained = 0 AND fetched_at < ?1",
                params![cutoff],
            )
        })
        .await
        .map_err(map_tr_err)
}
