//! Error types and utilities for the nvdb2osm toolkit
//!
//! Provides typed errors for input validation and fuzzy matching for
//! misspelled simplify-method names.

use std::fmt;
use strsim::jaro_winkler;

/// Simplify methods accepted by the way builder, in documentation order.
pub const VALID_METHODS: [&str; 3] = ["refname", "connected", "route"];

/// Find the closest known simplify method for a misspelled input.
///
/// Jaro-Winkler favors shared prefixes, which fits method names well:
/// "refnam" → "refname", "conected" → "connected". The 0.75 threshold is
/// stricter than a generic fuzzy search because the candidate set is tiny
/// and a wrong suggestion is worse than none.
fn find_best_fuzzy_match(input: &str, candidates: &[&str]) -> Option<String> {
    let input_lower = input.to_lowercase();
    let min_threshold = 0.75;

    let mut best_match = None;
    let mut best_score = 0.0f64;

    for candidate in candidates {
        let score = jaro_winkler(&input_lower, candidate);
        if score >= min_threshold && score > best_score {
            best_score = score;
            best_match = Some(candidate.to_string());
        }
    }

    best_match
}

/// Suggest a correction for a potentially misspelled simplify method.
///
/// Returns `None` for exact matches (no suggestion needed) and for inputs
/// too far from any known method.
pub fn suggest_method(method: &str) -> Option<String> {
    for valid in VALID_METHODS {
        if valid.eq_ignore_ascii_case(method) {
            return None;
        }
    }

    find_best_fuzzy_match(method, &VALID_METHODS)
}

/// Main error type for nvdb2osm operations
#[derive(Debug)]
pub enum Error {
    /// Simplify method name not recognized
    UnknownMethod(String),

    /// Input record could not be decoded (bad JSON line, bad hex, ...)
    InvalidInput(String),

    /// An id band would overflow its 10^7 slot
    IdBandOverflow(String),

    /// File I/O error
    IoError(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownMethod(method) => match suggest_method(method) {
                Some(suggestion) => write!(
                    f,
                    "Unknown simplify method '{method}' (did you mean '{suggestion}'?)"
                ),
                None => write!(
                    f,
                    "Unknown simplify method '{method}' (expected one of: {})",
                    VALID_METHODS.join(", ")
                ),
            },
            Error::InvalidInput(msg) => {
                write!(f, "Invalid input: {msg}")
            }
            Error::IdBandOverflow(msg) => {
                write!(f, "Id band overflow: {msg}")
            }
            Error::IoError(err) => {
                write!(f, "I/O error: {err}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

/// Convenience result type for nvdb2osm operations
pub type Result<T> = std::result::Result<T, Error>;
