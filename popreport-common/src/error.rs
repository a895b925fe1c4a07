//! Common error types for the population report service

use serde::Serialize;
use thiserror::Error;

/// Common result type for population report operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the workspace
#[derive(Error, Debug)]
pub enum Error {
    /// Blank or missing search term. Surfaced verbatim, never retried.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Raw record failed a required-field coercion
    #[error(transparent)]
    MalformedRecord(#[from] MalformedRecord),

    /// Record store failed to respond (wraps sqlx::Error)
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding error (wraps serde_json::Error)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Admissibility clause a raw record failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Neither artist nor album is present
    MissingIdentity,
    /// Grade absent, unparsable or outside 0..=10
    InvalidGrade,
    /// Item type absent, blank or "Unknown"
    MissingItemType,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::MissingIdentity => "no artist/album",
            RejectionReason::InvalidGrade => "no grade",
            RejectionReason::MissingItemType => "no item type",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record rejected by the admissibility policy
///
/// Always carries at least one reason.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("Malformed record: {}", join_reasons(.reasons))]
pub struct MalformedRecord {
    pub reasons: Vec<RejectionReason>,
}

fn join_reasons(reasons: &[RejectionReason]) -> String {
    let reasons: Vec<&str> = reasons.iter().map(RejectionReason::as_str).collect();
    reasons.join(", ")
}
