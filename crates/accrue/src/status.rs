// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `accrue status` table rendering.

use std::io::IsTerminal;

use accrue_core::CoverageState;
use accrue_sync::CoverageEntry;
use colored::Colorize;

fn state_label(entry: &CoverageEntry) -> &'static str {
    match entry.state {
        Some(state) => state.into(),
        None => "live",
    }
}

fn paint(label: &str, state: Option<CoverageState>) -> String {
    match state {
        Some(CoverageState::Covered) => label.green().to_string(),
        Some(CoverageState::Partial) => label.yellow().to_string(),
        Some(CoverageState::Stale) => label.red().to_string(),
        Some(CoverageState::Uncovered) | Some(CoverageState::Excluded) => label.dimmed().to_string(),
        None => label.cyan().to_string(),
    }
}

/// One line per resource: platform, id, name, state, last sync.
pub fn render_row(entry: &CoverageEntry, color: bool) -> String {
    let r = &entry.resource;
    let last = r
        .last_synced
        .map(|ts| accrue_core::time::format_ts(&ts))
        .unwrap_or_else(|| "never".to_string());
    let state = format!("{:<10}", state_label(entry));
    let state = if color { paint(&state, entry.state) } else { state };
    format!(
        "{:<9} {:<24} {:<28} {} {}",
        r.platform.to_string(),
        r.resource_id,
        r.name,
        state,
        last
    )
}

pub fn print_table(summary: &[CoverageEntry]) {
    if summary.is_empty() {
        println!("no resources discovered");
        return;
    }
    let color = std::io::stdout().is_terminal();
    println!(
        "{:<9} {:<24} {:<28} {:<10} {}",
        "PLATFORM", "RESOURCE", "NAME", "STATE", "LAST SYNC"
    );
    for entry in summary {
        println!("{}", render_row(entry, color));
    }
}

#[cfg(test)]
mod tests {
    use accrue_core::{DiscoveredResource, Platform, Resource};
    use chrono::{TimeZone, Utc};

    use super::*;

    fn entry(id: &str, state: Option<CoverageState>) -> CoverageEntry {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let mut resource = Resource::from_discovered(
            "u1",
            Platform::Slack,
            DiscoveredResource {
                resource_id: id.into(),
                resource_type: "channel".into(),
                name: "eng".into(),
                is_private: false,
                metadata: None,
            },
            now,
        );
        if state == Some(CoverageState::Covered) {
            resource.last_synced = Some(now);
        }
        CoverageEntry {
            resource,
            state,
            live_query: state.is_none(),
        }
    }

    #[test]
    fn rows_show_state_and_last_sync() {
        let rows: Vec<String> = [
            entry("C1", Some(CoverageState::Covered)),
            entry("C2", Some(CoverageState::Uncovered)),
            entry("K1", None),
        ]
        .iter()
        .map(|e| render_row(e, false))
        .collect();
        assert!(rows[0].contains("covered"));
        assert!(rows[0].contains("2026-03-02T09:00:00"));
        assert!(rows[1].contains("uncovered"));
        assert!(rows[1].ends_with("never"));
        assert!(rows[2].contains("live"));
    }
}
