//! Engine error types

use thiserror::Error;

/// Fatal errors of a single engine operation.
///
/// Everything else an analyzer observes (missing topics, bias hits, weak
/// sub-scores) is reported as data on the result, not as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The document has no sentences, so per-sentence metrics are undefined
    #[error("not enough text to analyze: {0}")]
    InsufficientContent(String),

    /// Aggregation was requested before any analysis was run
    #[error("no analyses available to aggregate; run at least one analysis first")]
    InsufficientAnalysis,
}
