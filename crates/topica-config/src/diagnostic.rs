// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with "did you mean" suggestions.
//!
//! Threshold keys such as `short_term_threshold` and `long_term_threshold`
//! are easy to mistype; unknown keys are matched against the valid keys of
//! their section with Jaro-Winkler similarity.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler score for a suggestion to be shown.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// A configuration error with enough context for miette to render it.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key not present in the config model.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(topica::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong type, e.g. a string where a threshold is expected.
    #[error("invalid type for `{key}`: found {found}")]
    #[diagnostic(code(topica::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
    },

    /// A required key is absent.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(topica::config::missing_key),
        help("add `{key} = <value>` to topica.toml")
    )]
    MissingKey { key: String },

    /// A value that parsed but violates a semantic constraint.
    #[error("validation error: {message}")]
    #[diagnostic(code(topica::config::validation))]
    Validation { message: String },

    /// Anything else figment reports.
    #[error("configuration error: {0}")]
    #[diagnostic(code(topica::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Convert every error carried by a `figment::Error` into a diagnostic.
///
/// `sources` pairs a file path with its TOML contents so unknown keys can be
/// underlined in place.
pub fn figment_to_config_errors(
    err: figment::Error,
    sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.iter().map(|p| p.to_string()).collect();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let (span, src) = source_for(&error, &path, field, sources);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: field.to_string(),
                },
                Kind::InvalidType(found, expected) => ConfigError::InvalidType {
                    key: path.join("."),
                    found: found.to_string(),
                    expected: expected.to_string(),
                },
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn source_for(
    error: &figment::error::Error,
    section_path: &[String],
    field: &str,
    sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    let found = origin.and_then(|origin| sources.iter().find(|(p, _)| *p == origin));
    let Some((path, content)) = found else {
        return (None, None);
    };

    match locate_key(content, section_path.first().map(String::as_str), field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` inside `[section]` (or before any header when
/// `section` is `None`).
pub fn locate_key(content: &str, section: Option<&str>, field: &str) -> Option<usize> {
    let mut current: Option<&str> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            current = Some(header.trim());
        } else if current == section {
            let indent = line.len() - line.trim_start().len();
            let rest = line.trim_start();
            if let Some(after) = rest.strip_prefix(field)
                && after.trim_start().starts_with('=')
            {
                return Some(offset + indent);
            }
        }
        offset += line.len();
    }

    None
}

/// Best Jaro-Winkler match for `unknown` among `valid_keys`, if close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (*key, strsim::jaro_winkler(unknown, key)))
        .filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key.to_string())
}

/// Render diagnostics to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMORY_KEYS: &[&str] = &[
        "short_term_threshold",
        "long_term_threshold",
        "fact_capacity",
        "max_context_chars",
    ];

    #[test]
    fn suggests_threshold_key_for_typo() {
        assert_eq!(
            suggest_key("short_term_treshold", MEMORY_KEYS),
            Some("short_term_threshold".to_string())
        );
        assert_eq!(
            suggest_key("fact_capcity", MEMORY_KEYS),
            Some("fact_capacity".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_unrelated_key() {
        assert_eq!(suggest_key("zzzz", MEMORY_KEYS), None);
    }

    #[test]
    fn locate_key_respects_section() {
        let content = "[agent]\nname = \"a\"\n\n[memory]\nfact_capcity = 3\n";
        let offset = locate_key(content, Some("memory"), "fact_capcity").unwrap();
        assert_eq!(&content[offset..offset + 12], "fact_capcity");
        assert_eq!(locate_key(content, Some("agent"), "fact_capcity"), None);
    }

    #[test]
    fn locate_key_requires_assignment() {
        let content = "[memory]\nfact_capacity_note = 1\n";
        assert_eq!(locate_key(content, Some("memory"), "fact_capacity"), None);
    }
}
