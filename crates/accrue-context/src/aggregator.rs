// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context aggregation: one bounded payload from a deliverable's sources.
//!
//! Resource sources read stored items ingested since the deliverable last
//! ran, or recent source activity on the first run. Live-query platforms are read from the
//! connector instead. Retained items for the user and deliverable are
//! appended unconditionally. A source that fails to load is recorded and
//! skipped.

use std::sync::Arc;
use std::time::Duration;

use accrue_config::model::{ContextConfig, TiersConfig};
use accrue_core::{
    AccrueError, ConnectorDirectory, ContextItem, Deliverable, ItemWindow, Platform, ResourceKey,
    SourceFetcher, SourceSpec, StorageAdapter, metrics, time::format_ts,
};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use crate::payload::{ContextPayload, Entry, FailedSource, Section, header, render};

const RETAINED_LABEL: &str = "retained";

fn item_entry(item: &ContextItem) -> Entry {
    Entry {
        item_id: Some(item.id.clone()),
        text: format!(
            "[{}] ({}) {}",
            format_ts(&item.source_timestamp),
            item.content_type,
            item.content
        ),
        retained: item.retained,
        timestamp: item.source_timestamp,
        tie: item.id.clone(),
    }
}

pub struct ContextAggregator {
    storage: Arc<dyn StorageAdapter>,
    connector: Arc<dyn ConnectorDirectory>,
    fetcher: Arc<dyn SourceFetcher>,
    live_query_platforms: Vec<Platform>,
    recent_window: TimeDelta,
    max_payload_chars: usize,
    max_items_per_source: usize,
    fetch_timeout: Duration,
}

impl ContextAggregator {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        connector: Arc<dyn ConnectorDirectory>,
        fetcher: Arc<dyn SourceFetcher>,
        context: &ContextConfig,
        tiers: &TiersConfig,
    ) -> Self {
        Self {
            storage,
            connector,
            fetcher,
            live_query_platforms: tiers.live_query_platforms.clone(),
            recent_window: TimeDelta::days(i64::from(context.recent_window_days)),
            max_payload_chars: context.max_payload_chars,
            max_items_per_source: context.max_items_per_source,
            fetch_timeout: Duration::from_secs(context.url_fetch_timeout_secs),
        }
    }

    /// The window read from each stored resource: everything ingested since
    /// the last run, or recent source activity on the first run.
    pub fn window(&self, deliverable: &Deliverable, now: DateTime<Utc>) -> ItemWindow {
        match deliverable.last_run_at {
            Some(last_run) => ItemWindow::FetchedSince(last_run),
            None => ItemWindow::SourceSince(now - self.recent_window),
        }
    }

    /// Builds the payload. Only storage errors on the retained-item read
    /// abort aggregation; per-source failures land in `failed_sources`.
    pub async fn aggregate(
        &self,
        deliverable: &Deliverable,
        now: DateTime<Utc>,
    ) -> Result<ContextPayload, AccrueError> {
        let window = self.window(deliverable, now);
        let mut sections = Vec::with_capacity(deliverable.sources.len() + 1);
        let mut failed = Vec::new();

        for source in &deliverable.sources {
            let label = source.label();
            match self.load_source(deliverable, source, window, now).await {
                Ok(entries) => {
                    debug!(
                        deliverable_id = %deliverable.id,
                        source = %label,
                        entries = entries.len(),
                        "source loaded"
                    );
                    sections.push(Section {
                        header: header(&label),
                        entries,
                    });
                }
                Err(e) => {
                    warn!(
                        deliverable_id = %deliverable.id,
                        source = %label,
                        error = %e,
                        "source failed, continuing without it"
                    );
                    metrics::record_source_failed();
                    failed.push(FailedSource {
                        label,
                        error: e.to_string(),
                    });
                }
            }
        }

        let retained = self
            .storage
            .list_retained_items(&deliverable.user_id, Some(&deliverable.id))
            .await?;
        sections.push(Section {
            header: header(RETAINED_LABEL),
            entries: retained.iter().map(item_entry).collect(),
        });

        let mut payload = render(&sections, self.max_payload_chars);
        payload.failed_sources = failed;
        if payload.truncated {
            debug!(
                deliverable_id = %deliverable.id,
                dropped = payload.dropped,
                "context payload truncated"
            );
        }
        Ok(payload)
    }

    async fn load_source(
        &self,
        deliverable: &Deliverable,
        source: &SourceSpec,
        window: ItemWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<Entry>, AccrueError> {
        match source {
            SourceSpec::Resource {
                platform,
                resource_id,
            } => {
                let key = ResourceKey::new(&deliverable.user_id, *platform, resource_id);
                if self.live_query_platforms.contains(platform) {
                    // Live items are fetched right now, so only source time
                    // can bound them.
                    let since = match window {
                        ItemWindow::FetchedSince(at) | ItemWindow::SourceSince(at) => at,
                    };
                    self.live_entries(&key, since, now).await
                } else {
                    let items = self
                        .storage
                        .list_resource_items(&key, window, self.max_items_per_source)
                        .await?;
                    // Retained items show up once, in the retained section.
                    Ok(items
                        .iter()
                        .filter(|i| !i.retained)
                        .map(item_entry)
                        .collect())
                }
            }
            SourceSpec::Url { url } => {
                let doc = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch_url(url))
                    .await
                    .map_err(|_| AccrueError::SourceFetch {
                        source_id: url.clone(),
                        message: format!("timed out after {:?}", self.fetch_timeout),
                    })??;
                let text = match doc.title {
                    Some(title) => format!("{title}\n{}", doc.text),
                    None => doc.text,
                };
                Ok(vec![Entry {
                    item_id: None,
                    text,
                    retained: false,
                    timestamp: now,
                    tie: source.label(),
                }])
            }
            SourceSpec::Document { content, .. } => Ok(vec![Entry {
                item_id: None,
                text: content.clone(),
                retained: false,
                timestamp: now,
                tie: source.label(),
            }]),
        }
    }

    async fn live_entries(
        &self,
        key: &ResourceKey,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Entry>, AccrueError> {
        let page = tokio::time::timeout(self.fetch_timeout, self.connector.fetch_items(key, None))
            .await
            .map_err(|_| AccrueError::SourceFetch {
                source_id: key.to_string(),
                message: format!("timed out after {:?}", self.fetch_timeout),
            })??;
        let mut items: Vec<ContextItem> = page
            .items
            .into_iter()
            .filter(|i| i.source_timestamp >= since)
            .map(|i| ContextItem::from_fetched(key, i, now))
            .collect();
        items.sort_by(|a, b| {
            a.source_timestamp
                .cmp(&b.source_timestamp)
                .then_with(|| a.external_id.cmp(&b.external_id))
        });
        let skip = items.len().saturating_sub(self.max_items_per_source);
        Ok(items
            .iter()
            .skip(skip)
            .map(|item| Entry {
                // Live items are never stored, so they carry no item id.
                item_id: None,
                tie: item.external_id.clone(),
                ..item_entry(item)
            })
            .collect())
    }
}
