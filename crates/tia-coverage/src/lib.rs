//! Coverage analysis: orchestrates the call-graph cache and traversal
//! engine to answer "which tests exercise this method?", "what does this
//! test execute?", and diff-based impact queries.

pub mod analyzer;
pub mod collaborators;
pub mod error;
pub mod stream;

pub use analyzer::{CoverageAnalyzer, CoverageReport, CoverageStatistics, DiffCoverageResult, Solution};
pub use collaborators::{CallGraphBuilder, ChangeSet, ChangeType, DiffParser, FileChange};
pub use error::AnalyzerError;
