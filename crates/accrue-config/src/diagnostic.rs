// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment extraction errors into miette diagnostics.
//!
//! Unknown keys are located in the TOML text they came from so the report
//! can underline them, and both unknown keys and unknown enum variants get a
//! "did you mean" hint.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler similarity a candidate must exceed to be suggested.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A TOML document that contributed to the extracted configuration.
#[derive(Debug, Clone)]
pub struct TomlSource {
    pub name: String,
    pub content: String,
}

impl TomlSource {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(code(accrue::config::unknown_key), help("{}", key_help(suggestion.as_deref(), valid_keys)))]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        /// Keys accepted in the enclosing table, comma separated.
        valid_keys: String,
        #[label("not a recognized key here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(accrue::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("invalid value for key `{key}`: {detail}")]
    #[diagnostic(code(accrue::config::invalid_value))]
    InvalidValue { key: String, detail: String },

    /// Raised after extraction by cross-field checks.
    #[error("validation error: {message}")]
    #[diagnostic(code(accrue::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(accrue::config::other))]
    Other(String),
}

fn key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    let listing = format!("valid keys: {valid_keys}");
    match suggestion {
        Some(s) => format!("did you mean `{s}`? {listing}"),
        None => listing,
    }
}

/// Splits one figment error into per-key diagnostics.
pub fn from_figment(err: figment::Error, sources: &[TomlSource]) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let located = origin(&error, sources).and_then(|src| {
                        locate_key(&src.content, &path, field).map(|offset| {
                            (
                                SourceSpan::new(offset.into(), field.len()),
                                NamedSource::new(src.name.clone(), src.content.clone()),
                            )
                        })
                    });
                    let (span, src) = located.unzip();
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                    key: path.join("."),
                    detail: format!("found {actual}, expected {expected}"),
                    expected: expected.clone(),
                },
                Kind::UnknownVariant(found, expected) => {
                    let mut detail = format!("`{found}` is not one of {}", expected.join(", "));
                    if let Some(s) = suggest_key(found, expected) {
                        detail.push_str(&format!("; did you mean `{s}`?"));
                    }
                    ConfigError::InvalidValue {
                        key: path.join("."),
                        detail,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// The source document an error was raised from. Errors without a file
/// origin (inline strings) resolve only when exactly one source was given.
fn origin<'a>(error: &figment::error::Error, sources: &'a [TomlSource]) -> Option<&'a TomlSource> {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    match (file, sources) {
        (Some(name), _) => sources.iter().find(|s| s.name == name),
        (None, [only]) => Some(only),
        (None, _) => None,
    }
}

/// Byte offset of `field` inside the table named by `table` (`[]` is the
/// root table). Dotted tables such as `["tiers", "pro"]` match `[tiers.pro]`.
pub fn locate_key(content: &str, table: &[String], field: &str) -> Option<usize> {
    let wanted = table.join(".");
    let mut current = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let trimmed = line.trim();

        if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.split(']').next()) {
            current = header.trim().to_string();
            continue;
        }
        if current != wanted {
            continue;
        }
        let indent = line.len() - line.trim_start().len();
        let rest = &line[indent..];
        if let Some(after) = rest.strip_prefix(field)
            && after.trim_start().starts_with('=')
        {
            return Some(start + indent);
        }
    }
    None
}

/// The closest candidate by Jaro-Winkler similarity, if any is close enough.
pub fn suggest_key<S: AsRef<str>>(unknown: &str, candidates: &[S]) -> Option<String> {
    candidates
        .iter()
        .map(|c| (strsim::jaro_winkler(unknown, c.as_ref()), c.as_ref()))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c.to_string())
}

/// Prints every error to stderr as a graphical miette report.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_keys() {
        let valid = ["fetch_timeout_secs", "lease_ttl_secs", "retry_backoff_secs"];
        assert_eq!(
            suggest_key("lease_tll_secs", &valid),
            Some("lease_ttl_secs".to_string())
        );
        assert_eq!(suggest_key("zzzzzz", &valid), None);
    }

    #[test]
    fn locates_key_in_dotted_table() {
        let content = "[sync]\nmax_resources = 1\n\n[tiers.pro]\n  max_resources = 3\n";
        let table = vec!["tiers".to_string(), "pro".to_string()];
        let o = locate_key(content, &table, "max_resources").unwrap();
        assert_eq!(&content[o..o + 13], "max_resources");
        assert!(o > content.find("[tiers.pro]").unwrap());
    }

    #[test]
    fn key_must_sit_in_the_named_table() {
        let content = "[sync]\nfoo = 1\n[context]\nbar = 2\n";
        let context = vec!["context".to_string()];
        assert!(locate_key(content, &context, "foo").is_none());
        assert!(locate_key(content, &[], "foo").is_none());
        assert_eq!(locate_key("foo = 1\n", &[], "foo"), Some(0));
    }

    #[test]
    fn prefix_of_a_longer_key_is_not_a_match() {
        let content = "[sync]\nfoo_bar = 1\n";
        assert!(locate_key(content, &["sync".to_string()], "foo").is_none());
    }
}
