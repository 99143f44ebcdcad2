// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config errors as miette diagnostics.
//!
//! Unknown keys are the common mistake in `tidyread.toml`, so they carry the
//! table they appeared in, the keys that table accepts, and a span into the
//! file when the key can be found again.

#![allow(unused_assignments)] // miette's Diagnostic derive triggers this lint

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Name used for configuration passed in as a string.
pub const INLINE_SOURCE: &str = "<inline>";

/// Minimum normalized Damerau-Levenshtein similarity for a suggestion.
const MIN_SIMILARITY: f64 = 0.6;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("{} has no setting `{key}`", table_label(table))]
    #[diagnostic(
        code(tidyread::config::unknown_key),
        help("{}", unknown_key_help(table, suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Dotted table path; empty for the document root.
        table: String,
        suggestion: Option<String>,
        valid_keys: Vec<String>,
        #[label("unknown key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` should be {expected}, found {found}")]
    #[diagnostic(code(tidyread::config::invalid_type))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
    },

    #[error("{message}")]
    #[diagnostic(code(tidyread::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(tidyread::config::other))]
    Other(String),
}

fn table_label(table: &str) -> String {
    if table.is_empty() {
        "the configuration".to_string()
    } else {
        format!("[{table}]")
    }
}

fn unknown_key_help(table: &str, suggestion: Option<&str>, valid_keys: &[String]) -> String {
    let accepted = if table.is_empty() {
        format!("sections: {}", valid_keys.join(", "))
    } else {
        format!("[{table}] accepts: {}", valid_keys.join(", "))
    };
    match suggestion {
        Some(s) => format!("did you mean `{s}`? {accepted}"),
        None => accepted,
    }
}

/// Turn each error inside a figment failure into a [`ConfigError`].
///
/// `sources` holds `(name, content)` pairs for the TOML documents that were
/// merged; they are only used to point at unknown keys.
pub fn figment_to_config_errors(
    err: figment::Error,
    sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| {
            let table = error.path.join(".");
            match &error.kind {
                Kind::UnknownField(key, expected) => {
                    let valid_keys: Vec<String> =
                        expected.iter().map(|k| (*k).to_string()).collect();
                    let (span, src) = match source_of(&error, sources) {
                        Some((name, content)) => match key_span(content, &table, key) {
                            Some(span) => (
                                Some(span),
                                Some(NamedSource::new(name, content.to_string())),
                            ),
                            None => (None, None),
                        },
                        None => (None, None),
                    };
                    ConfigError::UnknownKey {
                        key: key.clone(),
                        suggestion: closest_key(key, expected),
                        table,
                        valid_keys,
                        span,
                        src,
                    }
                }
                Kind::InvalidType(found, expected) => ConfigError::InvalidType {
                    key: table,
                    found: found.to_string(),
                    expected: expected.clone(),
                },
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// The TOML document an error came from, by figment's recorded origin.
fn source_of<'a>(
    error: &figment::Error,
    sources: &'a [(String, String)],
) -> Option<(&'a str, &'a str)> {
    let origin = match error.metadata.as_ref().and_then(|m| m.source.as_ref()) {
        Some(figment::Source::File(path)) => path.display().to_string(),
        _ => INLINE_SOURCE.to_string(),
    };
    sources
        .iter()
        .find(|(name, _)| *name == origin)
        .map(|(name, content)| (name.as_str(), content.as_str()))
}

/// Span of `key` inside `table` (dotted path, empty for the root).
///
/// Tracks `[header]` lines while scanning; array tables and inline tables
/// are not resolved.
pub fn key_span(content: &str, table: &str, key: &str) -> Option<SourceSpan> {
    let mut current = String::new();
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let text = line.trim();
        if let Some(header) = text.strip_prefix('[').and_then(|h| h.split(']').next()) {
            current = header.trim().to_string();
        } else if current == table
            && let Some(rest) = text.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            return Some(SourceSpan::new((offset + indent).into(), key.len()));
        }
        offset += line.len();
    }
    None
}

/// The accepted key closest to `unknown`, if any is similar enough.
pub fn closest_key(unknown: &str, accepted: &[&str]) -> Option<String> {
    accepted
        .iter()
        .map(|key| (strsim::normalized_damerau_levenshtein(unknown, key), *key))
        .filter(|(similarity, _)| *similarity >= MIN_SIMILARITY)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print every error to stderr as a miette report.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    eprintln!(
        "tidyread: {} configuration problem{}",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    );
    for error in errors {
        let mut out = String::new();
        if handler.render_report(&mut out, error).is_ok() {
            eprint!("{out}");
        } else {
            eprintln!("  {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typos_map_to_queue_keys() {
        let accepted = &["workers", "max_tries", "poll_interval_ms"];
        assert_eq!(closest_key("max_trys", accepted).as_deref(), Some("max_tries"));
        assert_eq!(closest_key("wrokers", accepted).as_deref(), Some("workers"));
        assert_eq!(closest_key("zzzzzz", accepted), None);
    }

    #[test]
    fn key_is_found_in_its_own_table_only() {
        let content = "[app]\nworkers = 1\n\n[queue]\n  wrokers = 2\n";
        let span = key_span(content, "queue", "wrokers").unwrap();
        assert_eq!(&content[span.offset()..span.offset() + span.len()], "wrokers");
        assert!(key_span(content, "app", "wrokers").is_none());
    }

    #[test]
    fn root_keys_stop_at_first_header() {
        let content = "telegram = 1\n[queue]\ntelegram = 2\n";
        assert_eq!(key_span(content, "", "telegram").unwrap().offset(), 0);
    }

    #[test]
    fn prefix_of_longer_key_is_not_a_match() {
        let content = "[queue]\nworkers_max = 3\n";
        assert!(key_span(content, "queue", "workers").is_none());
    }

    #[test]
    fn unknown_key_help_names_the_table() {
        let keys = vec!["workers".to_string(), "max_tries".to_string()];
        assert_eq!(
            unknown_key_help("queue", Some("max_tries"), &keys),
            "did you mean `max_tries`? [queue] accepts: workers, max_tries"
        );
        assert_eq!(unknown_key_help("", None, &keys), "sections: workers, max_tries");
    }
}
