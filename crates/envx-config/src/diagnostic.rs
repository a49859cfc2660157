// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment load failures into miette diagnostics.
//!
//! Unknown keys are pointed at in the offending `envx.toml` when the source
//! text is available, and get a "did you mean" hint when a known key of the
//! same table is close enough by Jaro-Winkler similarity.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Similarity a candidate must exceed before it is offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Everything that can go wrong while loading `envx.toml`.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key or table that the config schema does not know.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(envx::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Closest known key, if any is similar enough.
        suggestion: Option<String>,
        /// Known keys of the enclosing table, comma separated.
        valid_keys: String,
        #[label("not a known key here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(envx::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path of the value, e.g. `kdf.iterations`.
        key: String,
        detail: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(envx::config::missing_key),
        help("set `{key}` in envx.toml or remove the table that requires it")
    )]
    MissingKey { key: String },

    /// A value that parsed but is out of range or inconsistent.
    #[error("validation error: {message}")]
    #[diagnostic(code(envx::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(envx::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    let known = if valid_keys.is_empty() {
        "none".to_string()
    } else {
        valid_keys.to_string()
    };
    match suggestion {
        Some(near) => format!("did you mean `{near}`? Valid keys: {known}"),
        None => format!("valid keys: {known}"),
    }
}

impl ConfigError {
    /// Classify one figment error. `sources` pairs file names with the
    /// TOML text that was loaded from them.
    fn from_figment(error: &figment::Error, sources: &[(String, String)]) -> Self {
        match &error.kind {
            Kind::UnknownField(field, known) => {
                let (span, src) = match locate_in_sources(error, field, sources) {
                    Some((name, text, offset)) => (
                        Some(SourceSpan::new(offset.into(), field.len())),
                        Some(NamedSource::new(name, text.to_string())),
                    ),
                    None => (None, None),
                };
                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion: suggest_key(field, *known),
                    valid_keys: known.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: dotted(&error.path, field),
            },
            Kind::InvalidType(found, expected) => ConfigError::InvalidType {
                key: error.path.join("."),
                detail: format!("found {found}, expected {expected}"),
                expected: expected.clone(),
            },
            _ => ConfigError::Other(error.to_string()),
        }
    }
}

fn dotted(path: &[String], leaf: &str) -> String {
    if path.is_empty() {
        leaf.to_string()
    } else {
        format!("{}.{leaf}", path.join("."))
    }
}

/// Split a figment error into one diagnostic per underlying failure.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| ConfigError::from_figment(&error, toml_sources))
        .collect()
}

/// Pick the TOML text an error came from and find `field` inside it.
fn locate_in_sources<'a>(
    error: &figment::Error,
    field: &str,
    sources: &'a [(String, String)],
) -> Option<(&'a str, &'a str, usize)> {
    let origin = error.metadata.as_ref().and_then(|m| match m.source.as_ref() {
        Some(figment::Source::File(path)) => Some(path.display().to_string()),
        _ => None,
    });

    let (name, text) = match origin {
        Some(path) => sources.iter().find(|(name, _)| *name == path)?,
        // Inline strings carry no file metadata.
        None if sources.len() == 1 => &sources[0],
        None => return None,
    };

    let offset = find_key_offset(text, &error.path, field)?;
    Some((name.as_str(), text.as_str(), offset))
}

/// Byte offset of `field` inside the table named by `path`.
///
/// Lines are scanned in order while tracking the current `[table]` header,
/// so `memroy_kb` under `path = ["kdf"]` is only matched below `[kdf]`.
/// A field naming a whole table (an unknown `[vault]` section, say) is
/// matched at its header.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let wanted = path.join(".");
    let mut table = String::new();
    let mut line_start = 0;

    for line in content.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let body = line.trim();

        if let Some(header) = body.strip_prefix('[').and_then(|h| h.split(']').next()) {
            let header = header.trim();
            if dotted(path, field) == header {
                let inner = line[indent + 1..].find(field)?;
                return Some(line_start + indent + 1 + inner);
            }
            table = header.to_string();
        } else if table == wanted {
            let key = body.split('=').next().map(str::trim);
            if body.contains('=') && key == Some(field) {
                return Some(line_start + indent);
            }
        }

        line_start += line.len();
    }

    None
}

/// The known key most similar to `unknown`, if any clears the threshold.
pub fn suggest_key<S: AsRef<str>>(unknown: &str, valid_keys: &[S]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key.as_ref()), key.as_ref()))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print each diagnostic to stderr with miette's graphical renderer.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}
