//! Bounds and classification rules for a single traversal.

/// Caps a BFS walk over a call graph so a pathological or cyclic graph
/// cannot make a single query run unbounded.
#[derive(Debug, Clone)]
pub struct TraversalConfig {
    /// Stop descending past this many hops from the start node.
    pub max_depth: u32,
    /// Stop enqueueing new neighbors from a node once this many have
    /// already been taken at the same depth.
    pub max_breadth_per_level: usize,
    /// Hard cap on total nodes visited across the whole walk.
    pub max_visited_nodes: usize,
    /// Dotted-prefix allowlist (e.g. `"System."`, `"Microsoft."`) used by
    /// [`crate::category::classify`] to recognize framework code.
    pub framework_prefixes: Vec<String>,
    /// Prefixes recognized as data-access code (e.g. `"Dapper."`, `"EntityFrameworkCore."`).
    pub data_access_prefixes: Vec<String>,
    /// Prefixes recognized as infrastructure/cross-cutting code (e.g. `"Logging."`, `"Telemetry."`).
    pub infrastructure_prefixes: Vec<String>,
    /// Prefixes recognized as test-utility code (e.g. `"TestUtilities."`, `"Fixtures."`).
    pub test_utility_prefixes: Vec<String>,
    /// Whether [`Category::Infrastructure`](tia_core::Category::Infrastructure)
    /// methods count as production code when a traversal marks
    /// `ExecutedMethod::is_production`. Mirrors the caller's
    /// `CoverageAnalyzer` configuration so a forward trace's per-method
    /// production flag and a coverage report's production-method set
    /// agree on the same policy.
    pub infrastructure_counts: bool,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        TraversalConfig {
            max_depth: 20,
            max_breadth_per_level: 50,
            max_visited_nodes: 5000,
            framework_prefixes: vec!["System.".into(), "Microsoft.".into()],
            data_access_prefixes: vec!["Dapper.".into(), "EntityFrameworkCore.".into()],
            infrastructure_prefixes: vec!["Logging.".into(), "Telemetry.".into(), "Configuration.".into()],
            test_utility_prefixes: vec!["TestUtilities.".into(), "Fixtures.".into(), "Mocks.".into()],
            infrastructure_counts: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds_match_spec_defaults() {
        let cfg = TraversalConfig::default();
        assert_eq!(cfg.max_depth, 20);
        assert_eq!(cfg.max_breadth_per_level, 50);
        assert_eq!(cfg.max_visited_nodes, 5000);
    }
}
