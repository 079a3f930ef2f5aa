// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Draft generator trait for text generation providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AccrueError;
use crate::traits::adapter::PluginAdapter;
use crate::types::DeliverableType;

/// Everything a generator receives for one draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRequest {
    pub deliverable_id: String,
    pub deliverable_type: DeliverableType,
    /// Type-specific instructions.
    pub prompt: String,
    /// The aggregated context payload.
    pub context: String,
    /// Upper bound the output is validated against.
    pub max_chars: usize,
}

/// Turns a prompt and a context payload into draft text.
///
/// The pipeline bounds every call with its own timeout, so implementations
/// need not enforce one.
#[async_trait]
pub trait DraftGenerator: PluginAdapter {
    async fn generate(&self, request: DraftRequest) -> Result<String, AccrueError>;
}
