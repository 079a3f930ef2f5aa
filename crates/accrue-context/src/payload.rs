// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload rendering and truncation.
//!
//! A payload is a list of sections, each a fixed header followed by entry
//! lines. While the rendered text exceeds the cap, entries are dropped in a
//! fixed order: non-retained entries oldest first by `(timestamp, tie)`, then
//! retained entries in the same order. Headers are never dropped; if they
//! alone exceed the cap the text is cut at a character boundary.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One line of context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Stored item id, if the entry came from the context store.
    pub item_id: Option<String>,
    pub text: String,
    pub retained: bool,
    pub timestamp: DateTime<Utc>,
    /// Second sort key: an id unique within the payload.
    pub tie: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub header: String,
    pub entries: Vec<Entry>,
}

pub fn header(label: &str) -> String {
    format!("=== source: {label} ===")
}

/// A source that could not be read during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSource {
    pub label: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextPayload {
    pub text: String,
    /// Stored items that made it into `text`.
    pub included_item_ids: Vec<String>,
    /// Entries removed to respect the cap.
    pub dropped: usize,
    pub truncated: bool,
    pub failed_sources: Vec<FailedSource>,
}

fn chars(s: &str) -> usize {
    s.chars().count()
}

/// Renders sections into a payload of at most `cap` characters.
pub fn render(sections: &[Section], cap: usize) -> ContextPayload {
    // Every header and entry is one line; sections are separated by a blank
    // line.
    let separators = sections.len().saturating_sub(1);
    let mut total: usize = separators
        + sections
            .iter()
            .map(|s| {
                chars(&s.header) + 1 + s.entries.iter().map(|e| chars(&e.text) + 1).sum::<usize>()
            })
            .sum::<usize>();

    let mut order: Vec<(usize, usize)> = sections
        .iter()
        .enumerate()
        .flat_map(|(si, s)| (0..s.entries.len()).map(move |ei| (si, ei)))
        .collect();
    order.sort_by(|&(sa, ea), &(sb, eb)| {
        let a = &sections[sa].entries[ea];
        let b = &sections[sb].entries[eb];
        a.retained
            .cmp(&b.retained)
            .then_with(|| a.timestamp.cmp(&b.timestamp))
            .then_with(|| a.tie.cmp(&b.tie))
            .then_with(|| (sa, ea).cmp(&(sb, eb)))
    });

    let mut dropped: Vec<Vec<bool>> = sections
        .iter()
        .map(|s| vec![false; s.entries.len()])
        .collect();
    let mut dropped_count = 0;
    for (si, ei) in order {
        if total <= cap {
            break;
        }
        total -= chars(&sections[si].entries[ei].text) + 1;
        dropped[si][ei] = true;
        dropped_count += 1;
    }

    let mut text = String::new();
    let mut included_item_ids = Vec::new();
    for (si, section) in sections.iter().enumerate() {
        if si > 0 {
            text.push('\n');
        }
        text.push_str(&section.header);
        text.push('\n');
        for (ei, entry) in section.entries.iter().enumerate() {
            if dropped[si][ei] {
                continue;
            }
            text.push_str(&entry.text);
            text.push('\n');
            if let Some(id) = &entry.item_id {
                included_item_ids.push(id.clone());
            }
        }
    }

    let mut truncated = dropped_count > 0;
    if chars(&text) > cap {
        text = text.chars().take(cap).collect();
        truncated = true;
    }
    ContextPayload {
        text,
        included_item_ids,
        dropped: dropped_count,
        truncated,
        failed_sources: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};
    use proptest::prelude::*;

    use super::*;

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + TimeDelta::minutes(minutes)
    }

    fn entry(id: &str, minutes: i64, retained: bool, len: usize) -> Entry {
        Entry {
            item_id: Some(id.to_string()),
            text: format!("{id}:{}", "x".repeat(len)),
            retained,
            timestamp: t(minutes),
            tie: id.to_string(),
        }
    }

    fn sections() -> Vec<Section> {
        vec![
            Section {
                header: header("slack/C1"),
                entries: vec![entry("a", 1, false, 20), entry("b", 5, false, 20)],
            },
            Section {
                header: header("retained"),
                entries: vec![entry("r", 0, true, 20)],
            },
        ]
    }

    #[test]
    fn fits_without_dropping() {
        let p = render(&sections(), 10_000);
        assert!(!p.truncated);
        assert_eq!(p.dropped, 0);
        assert_eq!(p.included_item_ids, vec!["a", "b", "r"]);
        assert!(p.text.starts_with("=== source: slack/C1 ===\n"));
        assert!(p.text.contains("\n\n=== source: retained ===\n"));
    }

    #[test]
    fn drops_oldest_non_retained_first() {
        let full = render(&sections(), 10_000).text.chars().count();
        // One entry line is 23 chars including the newline.
        let p = render(&sections(), full - 1);
        assert_eq!(p.dropped, 1);
        assert_eq!(p.included_item_ids, vec!["b", "r"]);

        let p = render(&sections(), full - 24);
        assert_eq!(p.included_item_ids, vec!["r"]);

        // The retained entry goes only after every non-retained one.
        let p = render(&sections(), full - 47);
        assert!(p.included_item_ids.is_empty());
        assert!(p.truncated);
        assert!(p.text.contains("=== source: retained ==="));
    }

    #[test]
    fn headers_over_cap_are_cut() {
        let p = render(&sections(), 10);
        assert_eq!(p.text.chars().count(), 10);
        assert_eq!(p.dropped, 3);
        assert!(p.truncated);
    }

    fn arb_sections() -> impl Strategy<Value = Vec<Section>> {
        let entry = (0i64..50, any::<bool>(), "[a-zé ]{0,40}").prop_map(|(m, retained, text)| {
            Entry {
                item_id: None,
                text,
                retained,
                timestamp: t(m),
                tie: String::new(),
            }
        });
        prop::collection::vec(
            ("[a-z/]{1,12}", prop::collection::vec(entry, 0..8)).prop_map(|(label, entries)| {
                Section {
                    header: header(&label),
                    entries,
                }
            }),
            0..5,
        )
        .prop_map(|mut sections| {
            for (si, section) in sections.iter_mut().enumerate() {
                for (ei, entry) in section.entries.iter_mut().enumerate() {
                    let id = format!("s{si}e{ei}");
                    entry.item_id = Some(id.clone());
                    entry.tie = id;
                }
            }
            sections
        })
    }

    proptest! {
        #[test]
        fn render_is_deterministic_and_bounded(sections in arb_sections(), cap in 0usize..600) {
            let a = render(&sections, cap);
            let b = render(&sections, cap);
            prop_assert_eq!(&a, &b);
            prop_assert!(a.text.chars().count() <= cap);
        }

        #[test]
        fn retained_survive_while_non_retained_remain(sections in arb_sections(), cap in 0usize..600) {
            let p = render(&sections, cap);
            let included: std::collections::HashSet<_> = p.included_item_ids.iter().cloned().collect();
            let all: Vec<&Entry> = sections.iter().flat_map(|s| s.entries.iter()).collect();
            let any_non_retained_kept = all.iter().any(|e| !e.retained && included.contains(e.item_id.as_ref().unwrap()));
            let any_retained_dropped = all.iter().any(|e| e.retained && !included.contains(e.item_id.as_ref().unwrap()));
            prop_assert!(!(any_non_retained_kept && any_retained_dropped));
        }
    }
}
