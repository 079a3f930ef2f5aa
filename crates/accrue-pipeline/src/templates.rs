// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Type-specific instruction templates.

use accrue_core::{Deliverable, DeliverableType};

use crate::validation::bounds_for;

fn base_instructions(deliverable_type: DeliverableType) -> &'static str {
    match deliverable_type {
        DeliverableType::StatusReport => {
            "Write a status report from the context below. Lead with overall status, \
             then progress since the last report, risks and blockers, and next steps. \
             Attribute facts to their source when it matters."
        }
        DeliverableType::Digest => {
            "Write a digest of the activity in the context below. Group related items, \
             keep each point to one or two sentences, and call out anything that needs \
             the reader's attention first."
        }
        DeliverableType::MeetingPrep => {
            "Prepare the reader for an upcoming meeting using the context below: who is \
             involved, open questions, relevant recent decisions, and suggested talking points."
        }
        DeliverableType::ResearchBrief => {
            "Write a research brief synthesizing the sources below. State the key findings, \
             where sources agree or conflict, and what remains unknown."
        }
        DeliverableType::Custom => "Produce the requested output from the context below.",
    }
}

/// The prompt sent with the aggregated context.
///
/// Retained context holds preferences learned from earlier edits; the prompt
/// asks the generator to honor them.
pub fn instruction_prompt(deliverable: &Deliverable) -> String {
    let bounds = bounds_for(deliverable.deliverable_type);
    let mut prompt = format!(
        "{}\n\nTitle: {}\n",
        base_instructions(deliverable.deliverable_type),
        deliverable.title
    );
    if let Some(extra) = deliverable
        .instructions
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        prompt.push_str("\nAdditional instructions:\n");
        prompt.push_str(extra);
        prompt.push('\n');
    }
    prompt.push_str(
        "\nFollow any preferences listed under the retained section, \
         and use only information present in the context.\n",
    );
    prompt.push_str(&format!(
        "Keep the output under {} characters.\n",
        bounds.max_chars
    ));
    prompt
}
