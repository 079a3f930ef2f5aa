// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Draft versus final content comparison.

use accrue_config::model::FeedbackConfig;
use serde::Serialize;
use strum::{Display, EnumString, IntoStaticStr};

/// A recognizable kind of edit a user made before approving.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, IntoStaticStr, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EditCategory {
    Shortened,
    Lengthened,
    IntroRewritten,
    ClosingRewritten,
    BulletsAdded,
    BulletsRemoved,
}

impl EditCategory {
    /// Instruction-style wording of the preference the category implies.
    pub fn preference(&self) -> &'static str {
        match self {
            EditCategory::Shortened => "The user consistently shortens drafts. Be more concise.",
            EditCategory::Lengthened => {
                "The user consistently expands drafts. Include more detail."
            }
            EditCategory::IntroRewritten => {
                "The user consistently rewrites the opening. Start with the most important point."
            }
            EditCategory::ClosingRewritten => {
                "The user consistently rewrites the closing. Keep the ending brief and concrete."
            }
            EditCategory::BulletsAdded => "The user prefers bulleted lists over prose.",
            EditCategory::BulletsRemoved => "The user prefers prose over bulleted lists.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditAnalysis {
    pub distance: f64,
    pub categories: Vec<EditCategory>,
}

/// Word-level Levenshtein distance normalized by the longer side, in `[0, 1]`.
pub fn word_distance(draft: &str, final_content: &str) -> f64 {
    let a: Vec<&str> = draft.split_whitespace().collect();
    let b: Vec<&str> = final_content.split_whitespace().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 0.0;
    }
    strsim::generic_levenshtein(&a, &b) as f64 / longest as f64
}

fn normalized_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect()
}

fn is_bullet(line: &str) -> bool {
    line.starts_with("- ")
        || line.starts_with("* ")
        || line.starts_with("• ")
        || line
            .split_once(". ")
            .is_some_and(|(n, _)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Classifies the edits between `draft` and `final_content`.
///
/// Identical texts (ignoring whitespace) have no categories.
pub fn analyze(draft: &str, final_content: &str, config: &FeedbackConfig) -> EditAnalysis {
    let distance = word_distance(draft, final_content);
    let mut categories = Vec::new();
    if distance == 0.0 {
        return EditAnalysis {
            distance,
            categories,
        };
    }

    let draft_len = draft.trim().chars().count();
    let final_len = final_content.trim().chars().count();
    if draft_len > 0 {
        let ratio = final_len as f64 / draft_len as f64;
        if ratio <= config.shorten_ratio {
            categories.push(EditCategory::Shortened);
        } else if ratio >= config.lengthen_ratio {
            categories.push(EditCategory::Lengthened);
        }
    }

    let draft_lines = normalized_lines(draft);
    let final_lines = normalized_lines(final_content);
    // Single-line texts have no separate intro or closing.
    if draft_lines.len() > 1 && final_lines.len() > 1 {
        if draft_lines.first() != final_lines.first() {
            categories.push(EditCategory::IntroRewritten);
        }
        if draft_lines.last() != final_lines.last() {
            categories.push(EditCategory::ClosingRewritten);
        }
    }

    let draft_bullets = draft_lines.iter().filter(|l| is_bullet(l)).count();
    let final_bullets = final_lines.iter().filter(|l| is_bullet(l)).count();
    if final_bullets > draft_bullets {
        categories.push(EditCategory::BulletsAdded);
    } else if final_bullets < draft_bullets {
        categories.push(EditCategory::BulletsRemoved);
    }

    EditAnalysis {
        distance,
        categories,
    }
}
