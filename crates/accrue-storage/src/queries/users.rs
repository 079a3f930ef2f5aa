// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User and plan tier queries.

use accrue_core::{AccrueError, PlanTier, SelectionChange, User};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::queries::resources::write_selection;
use crate::rows::{get_enum, get_ts, ts};

const COLUMNS: &str = "id, tier, created_at";

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        tier: get_enum(row, 1)?,
        created_at: get_ts(row, 2)?,
    })
}

/// Inserts the user; an existing user keeps `created_at` and takes the new tier.
pub async fn upsert_user(db: &Database, user: &User) -> Result<(), AccrueError> {
    let id = user.id.clone();
    let tier = user.tier.to_string();
    let created_at = ts(&user.created_at);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO users (id, tier, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET tier = excluded.tier",
                params![id, tier, created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_user(db: &Database, user_id: &str) -> Result<Option<User>, AccrueError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<User>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
                params![user_id],
                row_to_user,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_users(db: &Database) -> Result<Vec<User>, AccrueError> {
    db.connection()
        .call(|conn| -> Result<Vec<User>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM users ORDER BY id"))?;
            let rows = stmt.query_map([], row_to_user)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Sets the tier and applies the accompanying selection changes in one
/// transaction. Nothing is written if the user does not exist.
pub async fn change_tier(
    db: &Database,
    user_id: &str,
    tier: PlanTier,
    changes: &[SelectionChange],
) -> Result<bool, AccrueError> {
    let user_id = user_id.to_string();
    let tier = tier.to_string();
    let changes = changes.to_vec();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE users SET tier = ?2 WHERE id = ?1",
                params![user_id, tier],
            )?;
            if changed != 1 {
                return Ok(false);
            }
            write_selection(&tx, &changes)?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_user_tier(
    db: &Database,
    user_id: &str,
    tier: PlanTier,
) -> Result<bool, AccrueError> {
    let user_id = user_id.to_string();
    let tier = tier.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE users SET tier = ?2 WHERE id = ?1",
                params![user_id, tier],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}
