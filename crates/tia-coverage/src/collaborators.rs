//! External collaborator boundaries this crate consumes but never
//! implements: the source-code analyzer that builds call graphs, and the
//! diff parser that turns a textual diff into a change set. Both are
//! treated as capabilities supplied by the embedding application at
//! construction, not as concrete implementations owned here.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tia_core::CallGraph;
use tokio_util::sync::CancellationToken;

use crate::error::AnalyzerError;

/// The source-level analyzer that turns a set of project paths into a
/// [`CallGraph`]. Implemented outside this crate; building a call graph
/// from source text is explicitly out of scope here.
#[async_trait]
pub trait CallGraphBuilder: Send + Sync {
    async fn build(
        &self,
        project_paths: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<CallGraph, AnalyzerError>;
}

/// Kind of change a [`FileChange`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
    Renamed,
}

/// One changed file from a diff, with the method and type names the diff
/// parser attributes the change to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub file: String,
    pub change_type: ChangeType,
    pub methods: Vec<String>,
    pub types: Vec<String>,
}

/// A parsed diff: every file changed plus the methods/types attributed to
/// each change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    pub changes: Vec<FileChange>,
}

impl ChangeSet {
    /// Every method name touched by this change set, across all files.
    pub fn changed_method_names(&self) -> Vec<&str> {
        self.changes
            .iter()
            .flat_map(|c| c.methods.iter().map(String::as_str))
            .collect()
    }
}

/// Parses a textual diff, a diff file, or the output of a git command into
/// a [`ChangeSet`]. Implemented outside this crate; diff text parsing
/// itself is explicitly out of scope here.
#[async_trait]
pub trait DiffParser: Send + Sync {
    async fn parse_text(&self, diff_text: &str) -> Result<ChangeSet, AnalyzerError>;
    async fn parse_file(&self, path: &Path) -> Result<ChangeSet, AnalyzerError>;
    async fn parse_git(&self, git_ref_or_command: &str) -> Result<ChangeSet, AnalyzerError>;
}
