//! Failure taxonomy for the feature pipeline.
//!
//! Every stage fails fast and propagates to the caller; a run either
//! produces a complete feature table or no table at all.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reference or store data is unreadable, malformed, or unusable
    /// after cleaning.
    #[error("data integrity: {0}")]
    DataIntegrity(String),

    /// The accident store is unreachable or a query timed out. Not
    /// retried here; the caller re-invokes with the same as-of date.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A facet aggregation or the final rollup produced zero rows. This
    /// is surfaced, never silently treated as "no priorities".
    #[error("empty result: {0}")]
    EmptyResult(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
