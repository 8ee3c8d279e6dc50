//! Lazy, cancellable streaming variant of `tests_covering_method`.
//!
//! The stream is finite and non-restartable: it yields each covering test
//! as the reverse traversal discovers it, and ends either when traversal
//! is exhausted or when the caller's [`CancellationToken`] fires, whichever
//! comes first.

use std::pin::Pin;

use futures_core::Stream;
use tia_core::{CoveringTest, MethodId};
use tokio_util::sync::CancellationToken;

use crate::analyzer::{CoverageAnalyzer, Solution};
use crate::error::AnalyzerError;

impl CoverageAnalyzer {
    /// Streams covering tests for `method_id` one at a time. Cancellation
    /// closes the stream at the next yield point; the consumer observes
    /// end-of-stream, not an error.
    pub fn tests_covering_method_stream(
        &self,
        method_id: MethodId,
        solution: Solution,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Stream<Item = Result<CoveringTest, AnalyzerError>> + Send + '_>> {
        Box::pin(async_stream::try_stream! {
            if cancel.is_cancelled() {
                return;
            }
            let record = self.tests_covering_method(&method_id, &solution, &cancel).await?;
            for test in record.covering_tests {
                if cancel.is_cancelled() {
                    return;
                }
                yield test;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{CallGraphBuilder, ChangeSet, DiffParser};
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tia_core::{CallGraph, MethodInfo};
    use tia_storage::{CacheConfig, CallGraphCache};

    struct NoopBuilder;
    #[async_trait]
    impl CallGraphBuilder for NoopBuilder {
        async fn build(&self, _paths: &[PathBuf], _cancel: &CancellationToken) -> Result<CallGraph, AnalyzerError> {
            Err(AnalyzerError::BuildError("no builder configured for this test".into()))
        }
    }

    struct NoopDiffParser;
    #[async_trait]
    impl DiffParser for NoopDiffParser {
        async fn parse_text(&self, _s: &str) -> Result<ChangeSet, AnalyzerError> {
            Ok(ChangeSet::default())
        }
        async fn parse_file(&self, _p: &Path) -> Result<ChangeSet, AnalyzerError> {
            Ok(ChangeSet::default())
        }
        async fn parse_git(&self, _s: &str) -> Result<ChangeSet, AnalyzerError> {
            Ok(ChangeSet::default())
        }
    }

    fn mid(s: &str) -> MethodId {
        MethodId::from_canonical(s)
    }

    #[tokio::test]
    async fn stream_yields_every_covering_test_then_ends() {
        let cache_dir = tempfile::tempdir().unwrap();
        let project_dir = tempfile::tempdir().unwrap();
        std::fs::write(project_dir.path().join("Foo.cs"), "class Foo {}").unwrap();

        let cache = Arc::new(CallGraphCache::open(CacheConfig::default().with_cache_root(cache_dir.path())).unwrap());

        let mut graph = CallGraph::new();
        graph.add_edge(mid("DirectTest()"), mid("Target()"));
        graph.add_definition(MethodInfo {
            id: mid("DirectTest()"),
            name: "DirectTest".into(),
            containing_type: "App".into(),
            file_path: "t.cs".into(),
            line: 1,
            is_test: true,
        });
        cache
            .store(project_dir.path(), graph, "4.8.0", &[], None)
            .unwrap();

        let analyzer = CoverageAnalyzer::new(
            cache,
            Arc::new(NoopBuilder),
            Arc::new(NoopDiffParser),
            tia_traversal::TraversalConfig::default(),
            false,
        );
        let solution = Solution {
            project_path: project_dir.path().to_path_buf(),
            compiler_version: "4.8.0".into(),
            dependency_hashes: vec![],
        };

        let token = CancellationToken::new();
        let mut stream = analyzer.tests_covering_method_stream(mid("Target()"), solution, token);
        let mut found = Vec::new();
        while let Some(item) = stream.next().await {
            found.push(item.unwrap());
        }
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].test_id, mid("DirectTest()"));
    }

    #[tokio::test]
    async fn cancelled_token_yields_empty_stream() {
        let cache_dir = tempfile::tempdir().unwrap();
        let project_dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(CallGraphCache::open(CacheConfig::default().with_cache_root(cache_dir.path())).unwrap());
        let analyzer = CoverageAnalyzer::new(
            cache,
            Arc::new(NoopBuilder),
            Arc::new(NoopDiffParser),
            tia_traversal::TraversalConfig::default(),
            false,
        );
        let solution = Solution {
            project_path: project_dir.path().to_path_buf(),
            compiler_version: "4.8.0".into(),
            dependency_hashes: vec![],
        };

        let token = CancellationToken::new();
        token.cancel();
        let mut stream = analyzer.tests_covering_method_stream(mid("Target()"), solution, token);
        assert!(stream.next().await.is_none());
    }
}
