//! Bounded breadth-first traversal over a method call graph, answering
//! "what does this test execute?" (forward) and "which tests exercise this
//! method?" (reverse), with namespace-prefix category classification.

pub mod bfs;
pub mod category;
pub mod confidence;
pub mod config;

pub use bfs::{trace_forward, trace_reverse, ForwardTraversal, ReverseTraversal};
pub use category::classify;
pub use confidence::default_confidence;
pub use config::TraversalConfig;
