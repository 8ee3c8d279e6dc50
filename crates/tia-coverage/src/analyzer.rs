//! Orchestrates [`tia_storage::CallGraphCache`] and [`tia_traversal`] to
//! answer per-method and diff-based coverage queries.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tia_core::{
    CallGraph, Category, CoverageRecord, CoveringTest, ExecutedMethod, ExecutionTrace, MethodId,
};
use tia_storage::CallGraphCache;
use tia_traversal::{trace_forward, trace_reverse, TraversalConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::collaborators::{CallGraphBuilder, ChangeSet, DiffParser};
use crate::error::AnalyzerError;

/// Identifies the project this analyzer builds and caches a call graph
/// for. Construction validates neither path existence nor content; that
/// is the external builder's responsibility.
#[derive(Debug, Clone)]
pub struct Solution {
    pub project_path: PathBuf,
    pub compiler_version: String,
    pub dependency_hashes: Vec<String>,
}

/// Aggregate statistics for [`CoverageReport`].
#[derive(Debug, Clone, Default)]
pub struct CoverageStatistics {
    pub total_production_methods: usize,
    pub covered_production_methods: usize,
    pub uncovered_production_methods: usize,
    pub coverage_percentage: f64,
    pub per_category: HashMap<String, usize>,
}

/// Result of `generate_coverage_report`.
#[derive(Debug, Clone)]
pub struct CoverageReport {
    pub test_to_execution: HashMap<MethodId, ExecutionTrace>,
    pub uncovered_methods: Vec<MethodId>,
    pub statistics: CoverageStatistics,
}

/// Result of an `analyze_diff_coverage*` call.
#[derive(Debug, Clone)]
pub struct DiffCoverageResult {
    pub total_changed_methods: usize,
    pub covered_changed_methods: usize,
    pub uncovered_methods: Vec<String>,
    pub percentage: f64,
}

/// Orchestrates call-graph retrieval, traversal, and coverage aggregation.
pub struct CoverageAnalyzer {
    cache: Arc<CallGraphCache>,
    builder: Arc<dyn CallGraphBuilder>,
    diff_parser: Arc<dyn DiffParser>,
    traversal_config: TraversalConfig,
    infrastructure_counts: bool,
    trace_cache: DashMap<(String, MethodId), Arc<ExecutionTrace>>,
}

impl CoverageAnalyzer {
    pub fn new(
        cache: Arc<CallGraphCache>,
        builder: Arc<dyn CallGraphBuilder>,
        diff_parser: Arc<dyn DiffParser>,
        mut traversal_config: TraversalConfig,
        infrastructure_counts: bool,
    ) -> Self {
        // Keep the traversal's own production-classification policy in
        // lockstep with the analyzer's, so `ExecutedMethod::is_production`
        // and `generate_coverage_report`'s production-method set never
        // disagree about whether infrastructure code counts.
        traversal_config.infrastructure_counts = infrastructure_counts;
        CoverageAnalyzer {
            cache,
            builder,
            diff_parser,
            traversal_config,
            infrastructure_counts,
            trace_cache: DashMap::new(),
        }
    }

    fn graph_version(solution: &Solution) -> String {
        tia_core::fingerprint::cache_key(
            &solution.project_path.to_string_lossy(),
            &solution.compiler_version,
            &solution.dependency_hashes,
        )
    }

    /// Returns the current call graph for `solution`, reading from cache
    /// when fresh and falling back to the external builder otherwise.
    async fn graph_for(
        &self,
        solution: &Solution,
        cancel: &CancellationToken,
    ) -> Result<CallGraph, AnalyzerError> {
        if solution.project_path.as_os_str().is_empty() {
            return Err(AnalyzerError::InvalidArgument(
                "solution project_path must not be empty".into(),
            ));
        }

        if let Some(graph) = self.cache.get(
            &solution.project_path,
            &solution.compiler_version,
            &solution.dependency_hashes,
        ) {
            return Ok(graph);
        }

        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        info!(project = %solution.project_path.display(), "building call graph via external builder");
        let graph = self
            .builder
            .build(&[solution.project_path.clone()], cancel)
            .await?;

        if let Err(e) = self.cache.store(
            &solution.project_path,
            graph.clone(),
            &solution.compiler_version,
            &solution.dependency_hashes,
            None,
        ) {
            warn!(error = %e, "failed to persist freshly built call graph");
        }

        Ok(graph)
    }

    /// Traces `test_id`'s forward execution, caching the result for the
    /// lifetime of this analyzer keyed by graph version and test id.
    pub async fn trace_test_execution(
        &self,
        test_id: &MethodId,
        solution: &Solution,
        cancel: &CancellationToken,
    ) -> Result<Arc<ExecutionTrace>, AnalyzerError> {
        let version = Self::graph_version(solution);
        if let Some(cached) = self.trace_cache.get(&(version.clone(), test_id.clone())) {
            return Ok(Arc::clone(&cached));
        }

        let graph = self.graph_for(solution, cancel).await?;
        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let test_info = graph.definitions.get(test_id);
        let result = trace_forward(&graph, test_id, &self.traversal_config);
        let trace = Arc::new(ExecutionTrace {
            test_id: test_id.clone(),
            test_name: test_info.map(|i| i.name.clone()).unwrap_or_default(),
            test_class: test_info.map(|i| i.containing_type.clone()).unwrap_or_default(),
            executed: result
                .executed
                .into_iter()
                .filter(|m| m.id != *test_id)
                .collect::<Vec<ExecutedMethod>>(),
            timestamp: chrono::Utc::now(),
        });

        self.trace_cache.insert((version, test_id.clone()), Arc::clone(&trace));
        Ok(trace)
    }

    /// Traces several tests' forward executions against the same graph.
    pub async fn trace_multiple_tests(
        &self,
        test_ids: &[MethodId],
        solution: &Solution,
        cancel: &CancellationToken,
    ) -> Result<Vec<Arc<ExecutionTrace>>, AnalyzerError> {
        let mut traces = Vec::with_capacity(test_ids.len());
        for id in test_ids {
            if cancel.is_cancelled() {
                return Err(AnalyzerError::Cancelled);
            }
            traces.push(self.trace_test_execution(id, solution, cancel).await?);
        }
        Ok(traces)
    }

    /// Finds every test that (transitively) reaches `method_id`.
    pub async fn tests_covering_method(
        &self,
        method_id: &MethodId,
        solution: &Solution,
        cancel: &CancellationToken,
    ) -> Result<CoverageRecord, AnalyzerError> {
        let graph = self.graph_for(solution, cancel).await?;
        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }
        let result = trace_reverse(&graph, method_id, &self.traversal_config);
        Ok(CoverageRecord {
            production_method: method_id.clone(),
            covering_tests: result.covering_tests,
        })
    }

    /// Builds the graph once, then runs reverse traversal for every id in
    /// `method_ids`, keeping only ids with at least one covering test.
    pub async fn tests_covering_methods(
        &self,
        method_ids: &[MethodId],
        solution: &Solution,
        cancel: &CancellationToken,
    ) -> Result<HashMap<MethodId, CoverageRecord>, AnalyzerError> {
        let graph = self.graph_for(solution, cancel).await?;
        let mut out = HashMap::new();
        for id in method_ids {
            if cancel.is_cancelled() {
                return Err(AnalyzerError::Cancelled);
            }
            let result = trace_reverse(&graph, id, &self.traversal_config);
            if !result.covering_tests.is_empty() {
                out.insert(
                    id.clone(),
                    CoverageRecord {
                        production_method: id.clone(),
                        covering_tests: result.covering_tests,
                    },
                );
            }
        }
        Ok(out)
    }

    /// Forward-traces every test in the graph, then inverts the resulting
    /// mapping to `method -> [test]`.
    pub async fn build_coverage_map(
        &self,
        solution: &Solution,
        cancel: &CancellationToken,
    ) -> Result<HashMap<MethodId, Vec<MethodId>>, AnalyzerError> {
        let graph = self.graph_for(solution, cancel).await?;
        let test_ids: Vec<MethodId> = graph
            .definitions
            .iter()
            .filter(|(_, info)| info.is_test)
            .map(|(id, _)| id.clone())
            .collect();

        let mut map: HashMap<MethodId, Vec<MethodId>> = HashMap::new();
        for test_id in test_ids {
            if cancel.is_cancelled() {
                return Err(AnalyzerError::Cancelled);
            }
            let result = trace_forward(&graph, &test_id, &self.traversal_config);
            for method in result.executed {
                if method.id != test_id {
                    map.entry(method.id).or_default().push(test_id.clone());
                }
            }
        }
        Ok(map)
    }

    /// Forward-traces every test and aggregates production coverage,
    /// uncovered methods, and per-category breakdown.
    pub async fn generate_coverage_report(
        &self,
        solution: &Solution,
        cancel: &CancellationToken,
    ) -> Result<CoverageReport, AnalyzerError> {
        let graph = self.graph_for(solution, cancel).await?;
        let test_ids: Vec<MethodId> = graph
            .definitions
            .iter()
            .filter(|(_, info)| info.is_test)
            .map(|(id, _)| id.clone())
            .collect();

        let mut test_to_execution = HashMap::new();
        let mut covered: std::collections::HashSet<MethodId> = std::collections::HashSet::new();
        let mut per_category: HashMap<String, usize> = HashMap::new();

        for test_id in &test_ids {
            if cancel.is_cancelled() {
                return Err(AnalyzerError::Cancelled);
            }
            let result = trace_forward(&graph, test_id, &self.traversal_config);
            let test_info = graph.definitions.get(test_id);
            let executed: Vec<ExecutedMethod> = result
                .executed
                .into_iter()
                .filter(|m| m.id != *test_id)
                .collect();
            for m in &executed {
                if m.is_production {
                    covered.insert(m.id.clone());
                }
                *per_category.entry(format!("{:?}", m.category)).or_insert(0) += 1;
            }
            test_to_execution.insert(
                test_id.clone(),
                ExecutionTrace {
                    test_id: test_id.clone(),
                    test_name: test_info.map(|i| i.name.clone()).unwrap_or_default(),
                    test_class: test_info.map(|i| i.containing_type.clone()).unwrap_or_default(),
                    executed,
                    timestamp: chrono::Utc::now(),
                },
            );
        }

        let production_ids: std::collections::HashSet<MethodId> = graph
            .definitions
            .iter()
            .filter(|(_, info)| !info.is_test && classify_production(info, self.infrastructure_counts))
            .map(|(id, _)| id.clone())
            .collect();

        let uncovered_methods: Vec<MethodId> = production_ids.difference(&covered).cloned().collect();
        let total = production_ids.len();
        let covered_count = production_ids.intersection(&covered).count();

        Ok(CoverageReport {
            test_to_execution,
            uncovered_methods,
            statistics: CoverageStatistics {
                total_production_methods: total,
                covered_production_methods: covered_count,
                uncovered_production_methods: total.saturating_sub(covered_count),
                coverage_percentage: if total == 0 {
                    0.0
                } else {
                    (covered_count as f64 / total as f64) * 100.0
                },
                per_category,
            },
        })
    }

    /// Intersects a change set's changed methods with the executed sets of
    /// `candidate_tests`.
    pub async fn analyze_diff_coverage(
        &self,
        change_set: &ChangeSet,
        candidate_tests: &[MethodId],
        solution: &Solution,
        cancel: &CancellationToken,
    ) -> Result<DiffCoverageResult, AnalyzerError> {
        let changed: std::collections::HashSet<&str> =
            change_set.changed_method_names().into_iter().collect();
        if changed.is_empty() {
            return Ok(DiffCoverageResult {
                total_changed_methods: 0,
                covered_changed_methods: 0,
                uncovered_methods: Vec::new(),
                percentage: 0.0,
            });
        }

        let traces = self.trace_multiple_tests(candidate_tests, solution, cancel).await?;
        let mut executed_names: std::collections::HashSet<String> = std::collections::HashSet::new();
        for trace in &traces {
            for m in &trace.executed {
                executed_names.insert(m.id.as_str().to_string());
            }
        }

        let mut uncovered = Vec::new();
        let mut covered_count = 0usize;
        for name in &changed {
            if executed_names.iter().any(|e| e.contains(name)) {
                covered_count += 1;
            } else {
                uncovered.push(name.to_string());
            }
        }

        let total = changed.len();
        Ok(DiffCoverageResult {
            total_changed_methods: total,
            covered_changed_methods: covered_count,
            uncovered_methods: uncovered,
            percentage: if total == 0 {
                0.0
            } else {
                (covered_count as f64 / total as f64) * 100.0
            },
        })
    }

    pub async fn analyze_diff_coverage_from_file(
        &self,
        diff_file: &std::path::Path,
        candidate_tests: &[MethodId],
        solution: &Solution,
        cancel: &CancellationToken,
    ) -> Result<DiffCoverageResult, AnalyzerError> {
        let change_set = self.diff_parser.parse_file(diff_file).await?;
        self.analyze_diff_coverage(&change_set, candidate_tests, solution, cancel).await
    }

    pub async fn analyze_diff_coverage_from_git(
        &self,
        git_ref_or_command: &str,
        candidate_tests: &[MethodId],
        solution: &Solution,
        cancel: &CancellationToken,
    ) -> Result<DiffCoverageResult, AnalyzerError> {
        let change_set = self.diff_parser.parse_git(git_ref_or_command).await?;
        self.analyze_diff_coverage(&change_set, candidate_tests, solution, cancel).await
    }
}

fn classify_production(info: &tia_core::MethodInfo, infrastructure_counts: bool) -> bool {
    let category = if info.containing_type.contains("Repository")
        || info.containing_type.contains("DbContext")
    {
        Category::DataAccess
    } else if info.containing_type.contains("Logger")
        || info.containing_type.contains("Cache")
        || info.containing_type.contains("Config")
        || info.containing_type.contains("Metrics")
    {
        Category::Infrastructure
    } else {
        Category::BusinessLogic
    };
    category.is_production(infrastructure_counts)
}
