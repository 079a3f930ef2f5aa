// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP fetcher for ad hoc URL sources.
//!
//! Bodies are read up to `max_url_bytes`; HTML is reduced to its visible
//! text. Every failure is a [`AccrueError::SourceFetch`] so the aggregator
//! can carry on without the source.

use std::sync::LazyLock;
use std::time::Duration;

use accrue_config::model::ContextConfig;
use accrue_core::{
    AccrueError, AdapterType, FetchedDocument, HealthStatus, PluginAdapter, SourceFetcher,
};
use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"));
static INVISIBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|head)[^>]*>.*?</(script|style|noscript|head)>")
        .expect("valid regex")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static BLANKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\f]+").expect("valid regex"));
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("valid regex"));

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Extracts the title and visible text of an HTML document.
pub fn html_to_text(html: &str) -> FetchedDocument {
    let title = TITLE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|t| !t.is_empty());
    let body = INVISIBLE.replace_all(html, " ");
    let body = TAG.replace_all(&body, "\n");
    let body = decode_entities(&body);
    let body = BLANKS.replace_all(&body, " ");
    let text = BLANK_LINES
        .replace_all(&body, "\n")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    FetchedDocument { title, text }
}

/// Decodes at most `max` bytes, replacing invalid sequences (a Latin-1 page,
/// say) with U+FFFD. A character split by the cap is dropped.
fn lossy_prefix(bytes: &[u8], max: usize) -> String {
    let mut cut = &bytes[..bytes.len().min(max)];
    if cut.len() < bytes.len() {
        cut = &cut[..cut.len() - split_char_len(cut)];
    }
    String::from_utf8_lossy(cut).into_owned()
}

/// Length of an incomplete multi-byte sequence at the end of `bytes`.
fn split_char_len(bytes: &[u8]) -> usize {
    let tail = &bytes[bytes.len().saturating_sub(3)..];
    for (back, &b) in tail.iter().rev().enumerate() {
        if b & 0xC0 == 0x80 {
            continue;
        }
        let width = match b {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        let present = back + 1;
        return if present < width { present } else { 0 };
    }
    0
}

pub struct HttpSourceFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpSourceFetcher {
    pub fn new(config: &ContextConfig) -> Result<Self, AccrueError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.url_fetch_timeout_secs))
            .user_agent(concat!("accrue/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AccrueError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            max_bytes: config.max_url_bytes,
        })
    }

    async fn fetch(&self, url: &str) -> Result<FetchedDocument, String> {
        let parsed = reqwest::Url::parse(url).map_err(|e| format!("invalid URL: {e}"))?;
        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(format!("URL scheme '{scheme}' not allowed"));
        }

        let mut response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("html"));

        let mut body = Vec::new();
        while body.len() < self.max_bytes {
            match response.chunk().await {
                Ok(Some(chunk)) => body.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) => return Err(format!("failed to read body: {e}")),
            }
        }
        let truncated = body.len() > self.max_bytes;
        let raw = lossy_prefix(&body, self.max_bytes);
        debug!(url, bytes = body.len(), truncated, "url fetched");

        if is_html {
            Ok(html_to_text(&raw))
        } else {
            Ok(FetchedDocument {
                title: None,
                text: raw.trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl PluginAdapter for HttpSourceFetcher {
    fn name(&self) -> &str {
        "http-fetcher"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::SourceFetcher
    }

    async fn health_check(&self) -> Result<HealthStatus, AccrueError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AccrueError> {
        Ok(())
    }
}

#[async_trait]
impl SourceFetcher for HttpSourceFetcher {
    async fn fetch_url(&self, url: &str) -> Result<FetchedDocument, AccrueError> {
        self.fetch(url)
            .await
            .map_err(|message| AccrueError::SourceFetch {
                source_id: url.to_string(),
                message,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_is_reduced_to_visible_text() {
        let html = r#"<html><head><title>Q3 &amp; Roadmap</title>
            <style>body { color: red }</style></head>
            <body><h1>Plan</h1><script>alert(1)</script>
            <p>Ship   the <b>scheduler</b>.</p></body></html>"#;
        let doc = html_to_text(html);
        assert_eq!(doc.title.as_deref(), Some("Q3 & Roadmap"));
        assert!(doc.text.contains("Plan"));
        assert!(doc.text.contains("scheduler"));
        assert!(!doc.text.contains("alert"));
        assert!(!doc.text.contains("color"));
        assert!(!doc.text.contains('<'));
    }

    #[test]
    fn prefix_never_splits_a_character() {
        let s = "héllo".as_bytes();
        assert_eq!(lossy_prefix(s, 2), "h");
        assert_eq!(lossy_prefix(s, 3), "hé");
        assert_eq!(lossy_prefix(s, 100), "héllo");
    }

    #[test]
    fn invalid_bytes_are_replaced_not_truncated() {
        let latin1 = b"Quarterly plan caf\xE9 -- the rest of a long document";
        let text = lossy_prefix(latin1, 1024);
        assert_eq!(text, "Quarterly plan caf\u{FFFD} -- the rest of a long document");

        let cut = lossy_prefix(latin1, 25);
        assert!(cut.starts_with("Quarterly plan caf\u{FFFD} -"));
    }

    #[test]
    fn split_four_byte_character_is_dropped() {
        let s = "ok 🦀".as_bytes();
        assert_eq!(s.len(), 7);
        for max in 4..7 {
            assert_eq!(lossy_prefix(s, max), "ok ");
        }
        assert_eq!(lossy_prefix(s, 7), "ok 🦀");
    }
}
