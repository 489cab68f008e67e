use thiserror::Error;

/// Errors surfaced by the scoring core. Raised at the point of detection and
/// never retried internally; retries are the caller's responsibility when the
/// failure stems from collaborator data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed dates, negative durations, or an input that would force an
    /// undefined ratio.
    #[error("validation error: {0}")]
    Validation(String),

    /// Weights that do not sum to 1.0, malformed cap tables, negative
    /// thresholds. Detected when configuration is loaded, not mid-scoring.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Resume or job description missing required structural fields.
    #[error("input shape error: {0}")]
    InputShape(String),
}
