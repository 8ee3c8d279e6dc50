//! Error types surfaced by the coverage analyzer.
//!
//! Per the propagation policy for this system, the cache layer underneath
//! already absorbs I/O and consistency failures into misses; only build
//! failures, cancellation, argument errors, and use-after-dispose cross
//! this boundary as `Err`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The external `CallGraphBuilder` collaborator failed.
    #[error("call graph build failed: {0}")]
    BuildError(String),

    /// Cooperative cancellation observed at a suspension point.
    #[error("operation cancelled")]
    Cancelled,

    /// Operation attempted on a disposed component; always a programming error.
    #[error("operation on disposed analyzer: {0}")]
    Disposed(String),
}

impl From<tia_core::TiaError> for AnalyzerError {
    fn from(err: tia_core::TiaError) -> Self {
        match err {
            tia_core::TiaError::InvalidArgument(msg) => AnalyzerError::InvalidArgument(msg),
            tia_core::TiaError::BuildError(msg) => AnalyzerError::BuildError(msg),
            tia_core::TiaError::Cancelled => AnalyzerError::Cancelled,
            tia_core::TiaError::Disposed(msg) => AnalyzerError::Disposed(msg),
        }
    }
}
