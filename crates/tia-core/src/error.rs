//! Shared error taxonomy for the test-impact cache and traversal layers.
//!
//! Mirrors the semantic error kinds described for this system: most I/O and
//! cache-consistency failures are absorbed into `Option`/miss semantics by
//! the layer that owns them (never constructed as `TiaError` at all), and
//! only the kinds that must cross a public API boundary as `Err` appear here.

use thiserror::Error;

/// Errors that cross a public API boundary of the cache or analyzer layers.
///
/// `NotFound`, `Invalidation`, and `Corruption` are deliberately absent:
/// per the propagation policy, those collapse to a cache miss (`Ok(None)`)
/// at the layer that detects them, paired with a counter bump and a
/// `tracing::warn!`/`tracing::debug!` event, and never reach a caller as
/// an `Err(TiaError)`.
#[derive(Debug, Error)]
pub enum TiaError {
    /// Null/empty id, null/empty solution path, unsupported framework
    /// value, or a reference to a file that does not exist.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The external source-analysis builder failed to produce a call graph.
    #[error("build failed: {0}")]
    BuildError(String),

    /// Cooperative cancellation reached the top of the originating call.
    #[error("operation cancelled")]
    Cancelled,

    /// An operation was attempted on a component that has already been
    /// shut down. Always a programming error; never recovered from.
    #[error("operation on disposed component: {0}")]
    Disposed(String),
}

impl TiaError {
    /// Shorthand for the common "argument was empty" case.
    pub fn empty(field: &str) -> Self {
        TiaError::InvalidArgument(format!("{field} must not be empty"))
    }
}
