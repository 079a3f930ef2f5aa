// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock draft generator for deterministic pipeline tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore};

use accrue_core::types::{AdapterType, HealthStatus};
use accrue_core::{AccrueError, DraftGenerator, DraftRequest, PluginAdapter};

/// Draft returned when the queue is empty.
pub const DEFAULT_DRAFT: &str =
    "Weekly summary: the team shipped the sync scheduler and reviewed the roadmap.";

/// A mock generator that pops drafts from a FIFO queue.
///
/// With a gate installed, every call blocks until [`MockGenerator::open_gate`]
/// hands out permits, which lets tests hold a run inside the generator.
#[derive(Clone, Default)]
pub struct MockGenerator {
    responses: Arc<Mutex<VecDeque<Result<String, String>>>>,
    requests: Arc<Mutex<Vec<DraftRequest>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    gate: Arc<Mutex<Option<Arc<Semaphore>>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().map(Ok).collect())),
            ..Self::default()
        }
    }

    pub async fn add_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(Ok(text.into()));
    }

    /// Queues a provider error.
    pub async fn add_error(&self, message: impl Into<String>) {
        self.responses.lock().await.push_back(Err(message.into()));
    }

    /// Every call sleeps this long before answering.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.lock().await = Some(delay);
    }

    /// Installs a closed gate.
    pub async fn close_gate(&self) {
        *self.gate.lock().await = Some(Arc::new(Semaphore::new(0)));
    }

    /// Lets `n` waiting or future calls through.
    pub async fn open_gate(&self, n: usize) {
        if let Some(gate) = self.gate.lock().await.as_ref() {
            gate.add_permits(n);
        }
    }

    pub async fn requests(&self) -> Vec<DraftRequest> {
        self.requests.lock().await.clone()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PluginAdapter for MockGenerator {
    fn name(&self) -> &str {
        "mock-generator"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generator
    }

    async fn health_check(&self) -> Result<HealthStatus, AccrueError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AccrueError> {
        Ok(())
    }
}

#[async_trait]
impl DraftGenerator for MockGenerator {
    async fn generate(&self, request: DraftRequest) -> Result<String, AccrueError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.requests.lock().await.push(request);

        let gate = self.gate.lock().await.clone();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| AccrueError::Internal(e.to_string()))?;
            permit.forget();
        }
        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.responses.lock().await.pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(AccrueError::Provider {
                message,
                source: None,
            }),
            None => Ok(DEFAULT_DRAFT.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use accrue_core::DeliverableType;

    use super::*;

    fn request() -> DraftRequest {
        DraftRequest {
            deliverable_id: "d1".into(),
            deliverable_type: DeliverableType::Digest,
            prompt: "summarize".into(),
            context: "ctx".into(),
            max_chars: 1000,
        }
    }

    #[tokio::test]
    async fn queued_then_default() {
        let generator = MockGenerator::with_responses(vec!["first".into()]);
        generator.add_error("boom").await;
        assert_eq!(generator.generate(request()).await.unwrap(), "first");
        assert!(generator.generate(request()).await.is_err());
        assert_eq!(generator.generate(request()).await.unwrap(), DEFAULT_DRAFT);
        assert_eq!(generator.requests().await.len(), 3);
    }

    #[tokio::test]
    async fn gate_holds_calls_until_opened() {
        let generator = MockGenerator::new();
        generator.close_gate().await;
        let g = generator.clone();
        let call = tokio::spawn(async move { g.generate(request()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(generator.in_flight(), 1);
        generator.open_gate(1).await;
        assert!(call.await.unwrap().is_ok());
        assert_eq!(generator.in_flight(), 0);
        assert_eq!(generator.max_in_flight(), 1);
    }
}
