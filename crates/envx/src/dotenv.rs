// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `.env` text parsing and rendering.
//!
//! Supported syntax:
//!
//! ```text
//! # comment
//! export NAME=value            # trailing comment
//! SINGLE='literal $value'
//! DOUBLE="line one\nline two"
//! MULTI="first
//! second"
//! ```

use envx_vault::SecretSet;
use thiserror::Error;

/// A syntax error with the 1-based line it was found on.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Parse `.env` text into `(name, value)` pairs in file order.
///
/// Duplicate names are kept; collecting into a [`SecretSet`] makes the last
/// one win.
pub fn parse(text: &str) -> Result<Vec<(String, String)>, ParseError> {
    let mut entries = Vec::new();
    let mut lines = text.lines().enumerate();

    while let Some((idx, raw)) = lines.next() {
        let line_no = idx + 1;
        let line = raw.trim_start();
        if line.trim_end().is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line
            .strip_prefix("export ")
            .map(str::trim_start)
            .unwrap_or(line);

        let (name, rest) = line
            .split_once('=')
            .ok_or_else(|| ParseError::new(line_no, "expected NAME=value"))?;
        let name = name.trim();
        if !is_valid_name(name) {
            return Err(ParseError::new(
                line_no,
                format!("invalid variable name `{name}`"),
            ));
        }

        let rest = rest.trim_start();
        let value = if let Some(quoted) = rest.strip_prefix('"') {
            parse_double_quoted(quoted, line_no, &mut lines)?
        } else if let Some(quoted) = rest.strip_prefix('\'') {
            parse_single_quoted(quoted, line_no)?
        } else {
            parse_unquoted(rest)
        };

        entries.push((name.to_string(), value));
    }

    Ok(entries)
}

/// Render `secrets` as `NAME="value"` lines sorted by name.
///
/// Output parses back to the same set.
pub fn render(secrets: &SecretSet) -> String {
    let mut out = String::new();
    for (name, value) in secrets.iter() {
        out.push_str(name);
        out.push_str("=\"");
        for c in value.chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '"' => out.push_str("\\\""),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c => out.push(c),
            }
        }
        out.push_str("\"\n");
    }
    out
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_unquoted(rest: &str) -> String {
    let mut end = rest.len();
    let mut prev_is_space = true;
    for (i, c) in rest.char_indices() {
        if c == '#' && prev_is_space {
            end = i;
            break;
        }
        prev_is_space = c.is_whitespace();
    }
    rest[..end].trim().to_string()
}

fn parse_single_quoted(rest: &str, line_no: usize) -> Result<String, ParseError> {
    let close = rest
        .find('\'')
        .ok_or_else(|| ParseError::new(line_no, "unterminated single-quoted value"))?;
    expect_line_end(&rest[close + 1..], line_no)?;
    Ok(rest[..close].to_string())
}

fn parse_double_quoted<'a>(
    first: &'a str,
    start_line: usize,
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
) -> Result<String, ParseError> {
    let mut value = String::new();
    let mut current = first;
    let mut line_no = start_line;

    loop {
        let mut chars = current.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    expect_line_end(&current[i + 1..], line_no)?;
                    return Ok(value);
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, '"')) => value.push('"'),
                    Some((_, '\\')) => value.push('\\'),
                    Some((_, other)) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => value.push('\\'),
                },
                c => value.push(c),
            }
        }

        let (idx, next) = lines
            .next()
            .ok_or_else(|| ParseError::new(start_line, "unterminated double-quoted value"))?;
        value.push('\n');
        current = next;
        line_no = idx + 1;
    }
}

fn expect_line_end(rest: &str, line_no: usize) -> Result<(), ParseError> {
    let rest = rest.trim();
    if rest.is_empty() || rest.starts_with('#') {
        Ok(())
    } else {
        Err(ParseError::new(
            line_no,
            "unexpected characters after closing quote",
        ))
    }
}
