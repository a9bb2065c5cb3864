// src/error.rs
use thiserror::Error;

/// Faults raised inside the matching and grouping passes.
///
/// None of these abort a batch. Callers log the fault, substitute a safe
/// default (empty result, empty feature list, similarity 0.0) and keep going.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Search criteria cannot anchor a comparison (no location, no type,
    /// or none of build area / bedrooms / price present).
    #[error("invalid search criteria: {0}")]
    InvalidCriteria(String),

    /// A raw catalog field could not be parsed into its structured form.
    #[error("malformed {field} field: {reason}")]
    MalformedField { field: String, reason: String },

    /// The configured name-similarity backend failed for a comparison.
    #[error("name similarity backend unavailable: {0}")]
    SimilarityUnavailable(String),

    /// Scoring failed for a single candidate record.
    #[error("scoring failed for record {record_id}: {reason}")]
    ScoringFault { record_id: String, reason: String },
}
