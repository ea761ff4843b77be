//! Parsers for plaintext status report pages.
//!
//! Both report formats are strictly positional: a fixed number of
//! newline-separated lines, each line a fixed sentence ending in numeric
//! tokens. The parsers validate line and token counts exactly and fail
//! atomically; a malformed report never yields a partially-filled record.

pub mod nchan;
pub mod nginx;

use std::num::ParseIntError;

use thiserror::Error;

/// Errors raised while decoding a status report.
///
/// Carries enough context (field label, offending line or token) to diagnose
/// a malformed report without re-fetching it.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected {expected} lines in status report, got {found}")]
    LineCount { expected: usize, found: usize },

    #[error("unexpected token count for {field} in line {line:?}: expected {expected}, got {found}")]
    TokenCount {
        field: &'static str,
        line: String,
        expected: usize,
        found: usize,
    },

    #[error("invalid {field} value {token:?}: {source}")]
    InvalidValue {
        field: &'static str,
        token: String,
        source: ParseIntError,
    },
}

/// Splits a status line into space-separated tokens, enforcing an exact
/// token count.
///
/// Surrounding whitespace is trimmed first; internal runs of multiple spaces
/// are not collapsed, so a doubled space shifts the count and fails.
fn split_line<'a>(
    line: &'a str,
    field: &'static str,
    expected: usize,
) -> Result<Vec<&'a str>, ParseError> {
    let tokens: Vec<&str> = line.trim().split(' ').collect();
    if tokens.len() != expected {
        return Err(ParseError::TokenCount {
            field,
            line: line.to_string(),
            expected,
            found: tokens.len(),
        });
    }
    Ok(tokens)
}

/// Converts a value token to a signed 64-bit integer in base 10.
fn parse_value(field: &'static str, token: &str) -> Result<i64, ParseError> {
    token
        .parse::<i64>()
        .map_err(|source| ParseError::InvalidValue {
            field,
            token: token.to_string(),
            source,
        })
}
