// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Output validation: a draft must be non-empty, printable text within the
//! bounds declared for its deliverable type.

use accrue_core::DeliverableType;

/// Length bounds in characters, after trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputBounds {
    pub min_chars: usize,
    pub max_chars: usize,
}

pub fn bounds_for(deliverable_type: DeliverableType) -> OutputBounds {
    let (min_chars, max_chars) = match deliverable_type {
        DeliverableType::StatusReport => (40, 12_000),
        DeliverableType::Digest => (40, 16_000),
        DeliverableType::MeetingPrep => (40, 8_000),
        DeliverableType::ResearchBrief => (80, 24_000),
        DeliverableType::Custom => (1, 24_000),
    };
    OutputBounds {
        min_chars,
        max_chars,
    }
}

/// Checks the trimmed view of `output`. The output itself is left as is.
pub fn validate_output(deliverable_type: DeliverableType, output: &str) -> Result<(), String> {
    let text = output.trim();
    if text.is_empty() {
        return Err("output is empty".to_string());
    }
    if let Some(c) = text
        .chars()
        .find(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    {
        return Err(format!("output contains control character U+{:04X}", c as u32));
    }
    let bounds = bounds_for(deliverable_type);
    let len = text.chars().count();
    if len < bounds.min_chars {
        return Err(format!(
            "output has {len} characters, {deliverable_type} needs at least {}",
            bounds.min_chars
        ));
    }
    if len > bounds.max_chars {
        return Err(format!(
            "output has {len} characters, {deliverable_type} allows at most {}",
            bounds.max_chars
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_are_rejected() {
        assert_eq!(
            validate_output(DeliverableType::Custom, "  \n\t ").unwrap_err(),
            "output is empty"
        );
    }

    #[test]
    fn bounds_apply_per_type() {
        let short = "Too short.";
        assert!(validate_output(DeliverableType::StatusReport, short).is_err());
        assert!(validate_output(DeliverableType::Custom, short).is_ok());

        let long = "x".repeat(8_001);
        let err = validate_output(DeliverableType::MeetingPrep, &long).unwrap_err();
        assert!(err.contains("at most 8000"));
        assert!(validate_output(DeliverableType::Digest, &long).is_ok());
    }

    #[test]
    fn control_characters_are_rejected() {
        let text = format!("{}\u{0}", "a".repeat(50));
        assert!(validate_output(DeliverableType::Digest, &text)
            .unwrap_err()
            .contains("U+0000"));
    }

    #[test]
    fn surrounding_whitespace_does_not_count_toward_bounds() {
        let body = "a".repeat(39);
        let padded = format!("\n\n{body}{}\n", " ".repeat(20));
        assert!(validate_output(DeliverableType::Digest, &padded).is_err());
        let padded = format!("\n\n{}a  \n", body);
        assert!(validate_output(DeliverableType::Digest, &padded).is_ok());
    }
}
