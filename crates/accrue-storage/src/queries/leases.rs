// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lease queries.
//!
//! A lease is a row keyed by an operation key (`sync:<resource>` or
//! `deliverable:<id>`). Acquisition is a single conditional upsert, so two
//! callers racing for the same key cannot both win. Expired leases may be
//! taken over, which bounds how long a crashed holder blocks a key.

use accrue_core::AccrueError;
use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::rows::ts;

pub async fn try_acquire(
    db: &Database,
    key: &str,
    holder: &str,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<bool, AccrueError> {
    let key = key.to_string();
    let holder = holder.to_string();
    let now = ts(&now);
    let expires_at = ts(&expires_at);
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "INSERT INTO leases (key, holder, acquired_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                     holder = excluded.holder,
                     acquired_at = excluded.acquired_at,
                     expires_at = excluded.expires_at
                 WHERE leases.expires_at <= excluded.acquired_at",
                params![key, holder, now, expires_at],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn release(db: &Database, key: &str, holder: &str) -> Result<bool, AccrueError> {
    let key = key.to_string();
    let holder = holder.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "DELETE FROM leases WHERE key = ?1 AND holder = ?2",
                params![key, holder],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}
