// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Accrue context pipeline.

use std::time::Duration;

use strum::{Display, EnumString};
use thiserror::Error;

use crate::types::{Platform, VersionStatus};

/// The primary error type used across all Accrue adapter traits and core operations.
#[derive(Debug, Error)]
pub enum AccrueError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A single source failed to fetch. Recoverable: aggregation proceeds without it.
    #[error("source `{source_id}` failed to fetch: {message}")]
    SourceFetch { source_id: String, message: String },

    /// The draft generator failed or timed out for a version.
    #[error("generation failed for version {version_id}: {message}")]
    Generation { version_id: String, message: String },

    /// Transport-level failure talking to a generation provider.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generated output was empty or outside the bounds declared for its type.
    #[error("output validation failed: {message}")]
    Validation {
        version_id: Option<String>,
        message: String,
    },

    /// A lease could not be acquired; the operation is already in progress.
    #[error("{message}")]
    ConcurrencyConflict { key: String, message: String },

    /// A resource selection exceeds the plan cap for the platform.
    #[error(
        "tier limit exceeded on {platform}: {requested} requested, {current} currently selected, limit is {limit}"
    )]
    TierLimitExceeded {
        platform: Platform,
        current: usize,
        requested: usize,
        limit: usize,
    },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A version status change that the state machine does not allow.
    #[error("invalid transition for version {version_id}: {from} -> {to}")]
    InvalidTransition {
        version_id: String,
        from: VersionStatus,
        to: VersionStatus,
    },

    /// The request itself is malformed or targets something it cannot act on.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Machine-readable error category for the API layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Storage,
    SourceFetch,
    Generation,
    Validation,
    ConcurrencyConflict,
    TierLimitExceeded,
    NotFound,
    InvalidTransition,
    InvalidRequest,
    Timeout,
    Internal,
}

impl AccrueError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccrueError::Config(_) => ErrorKind::Config,
            AccrueError::Storage { .. } => ErrorKind::Storage,
            AccrueError::SourceFetch { .. } => ErrorKind::SourceFetch,
            AccrueError::Generation { .. } | AccrueError::Provider { .. } => ErrorKind::Generation,
            AccrueError::Validation { .. } => ErrorKind::Validation,
            AccrueError::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            AccrueError::TierLimitExceeded { .. } => ErrorKind::TierLimitExceeded,
            AccrueError::NotFound { .. } => ErrorKind::NotFound,
            AccrueError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            AccrueError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            AccrueError::Timeout { .. } => ErrorKind::Timeout,
            AccrueError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller may succeed by retrying the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AccrueError::ConcurrencyConflict { .. }
                | AccrueError::SourceFetch { .. }
                | AccrueError::Generation { .. }
                | AccrueError::Provider { .. }
                | AccrueError::Timeout { .. }
        )
    }

    /// Shorthand for a [`AccrueError::ConcurrencyConflict`] on a lease key.
    pub fn already_running(key: impl Into<String>) -> Self {
        let key = key.into();
        AccrueError::ConcurrencyConflict {
            message: format!("operation already in progress for `{key}`; retry later"),
            key,
        }
    }
}
