//! Wire grammar for telemetry lines
//!
//! A record line is printable ASCII, split on whitespace into an even number
//! of at least four tokens read as `name value name value ...`:
//!
//! ```text
//! temp 21.5 hum 40.2 pressure 1013
//! ```
//!
//! Runs of characters outside 0x20..=0x7E count as a single space. A line of
//! the wrong shape is rejected as a whole; a pair whose value is not a number
//! is skipped on its own and the rest of the line is kept.

use thiserror::Error;

/// Smallest number of tokens a record line may have
pub const MIN_TOKENS: usize = 4;

/// Why a whole line was rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    /// Fewer than [`MIN_TOKENS`] tokens
    #[error("expected at least {MIN_TOKENS} tokens, found {0}")]
    TooFewTokens(usize),

    /// Names and values do not pair up
    #[error("expected an even number of tokens, found {0}")]
    OddTokenCount(usize),
}

/// The pairs extracted from one line
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    /// Valid `(name, value)` pairs in token order
    pub pairs: Vec<(String, f64)>,
    /// Pairs dropped because the value did not parse
    pub rejected_pairs: usize,
}

impl Record {
    /// Whether no pair survived
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Stateless parser for record lines
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordParser;

impl RecordParser {
    /// Create a parser
    pub fn new() -> Self {
        Self
    }

    /// Parse one line into its `(name, value)` pairs
    pub fn parse(&self, line: &str) -> Result<Record, RecordError> {
        let cleaned = sanitize(line);
        let tokens: Vec<&str> = cleaned.split_whitespace().collect();

        if tokens.len() < MIN_TOKENS {
            return Err(RecordError::TooFewTokens(tokens.len()));
        }
        if tokens.len() % 2 != 0 {
            return Err(RecordError::OddTokenCount(tokens.len()));
        }

        let mut record = Record {
            pairs: Vec::with_capacity(tokens.len() / 2),
            rejected_pairs: 0,
        };
        for pair in tokens.chunks_exact(2) {
            match pair[1].parse::<f64>() {
                Ok(value) => record.pairs.push((pair[0].to_string(), value)),
                Err(_) => {
                    tracing::trace!("Skipping non-numeric value '{}' for '{}'", pair[1], pair[0]);
                    record.rejected_pairs += 1;
                }
            }
        }
        Ok(record)
    }
}

/// Replace every run of non-printable characters with one space
fn sanitize(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_run = false;
    for c in line.chars() {
        if (' '..='~').contains(&c) {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push(' ');
            in_run = true;
        }
    }
    out
}
