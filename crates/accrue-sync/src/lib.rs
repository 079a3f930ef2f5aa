// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tier policy, resource selection, coverage derivation and sync scheduling.

pub mod coverage;
pub mod scheduler;
pub mod selection;
pub mod tier;

pub use coverage::{coverage_state, stale_after, sync_due};
pub use scheduler::{CoverageEntry, SkipReason, SyncOutcome, SyncReport, SyncScheduler, SyncTrigger};
pub use selection::{ResourceSelector, downgrade_order};
pub use tier::{Cadence, PlatformPolicy, TierLimits, TierPolicy};
