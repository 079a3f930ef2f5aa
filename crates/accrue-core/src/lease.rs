// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage-backed leases serializing work on one key.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use crate::error::AccrueError;
use crate::traits::StorageAdapter;

/// A held lease. Release it explicitly on every path; an unreleased lease
/// blocks its key until it expires.
#[derive(Debug)]
#[must_use = "a lease must be released"]
pub struct Lease {
    key: String,
    holder: String,
}

impl Lease {
    /// Tries to take `key` for `ttl`. Returns `None` if someone else holds it.
    pub async fn acquire(
        storage: &dyn StorageAdapter,
        key: impl Into<String>,
        ttl: TimeDelta,
        now: DateTime<Utc>,
    ) -> Result<Option<Lease>, AccrueError> {
        let key = key.into();
        let holder = uuid::Uuid::new_v4().to_string();
        if storage
            .try_acquire_lease(&key, &holder, now, now + ttl)
            .await?
        {
            debug!(key = %key, "lease acquired");
            Ok(Some(Lease { key, holder }))
        } else {
            debug!(key = %key, "lease busy");
            Ok(None)
        }
    }

    /// Like [`Lease::acquire`], but a busy key is a
    /// [`AccrueError::ConcurrencyConflict`].
    pub async fn acquire_or_conflict(
        storage: &dyn StorageAdapter,
        key: impl Into<String>,
        ttl: TimeDelta,
        now: DateTime<Utc>,
    ) -> Result<Lease, AccrueError> {
        let key = key.into();
        Lease::acquire(storage, key.clone(), ttl, now)
            .await?
            .ok_or_else(|| AccrueError::already_running(key))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Releases the lease. A lease that expired and was taken over is left to
    /// its new holder.
    pub async fn release(self, storage: &dyn StorageAdapter) {
        match storage.release_lease(&self.key, &self.holder).await {
            Ok(true) => debug!(key = %self.key, "lease released"),
            Ok(false) => warn!(key = %self.key, "lease expired before release"),
            Err(e) => warn!(key = %self.key, error = %e, "failed to release lease"),
        }
    }
}
