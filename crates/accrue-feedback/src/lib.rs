// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feedback loop: compares drafts with approved content and turns edit
//! patterns that recur across versions into retained preferences.

pub mod diff;
pub mod learner;

pub use diff::{EditAnalysis, EditCategory, analyze, word_distance};
pub use learner::{FeedbackLoop, Observed, preference_external_id};
