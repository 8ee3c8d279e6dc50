//! The in-memory call graph: forward/reverse adjacency plus method
//! definitions, with an integrity checker that flags violations of the
//! forward/reverse transpose invariant.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::id::MethodId;
use crate::method::MethodInfo;

/// A directed call graph: `forward[a]` is the set of methods `a` may call,
/// `reverse[b]` is the set of methods that may call `b`.
///
/// Invariant: `b ∈ forward[a]` iff `a ∈ reverse[b]`, for every id that
/// appears as a key of either map. `definitions` holds `MethodInfo` for
/// every id with a known definition; an id may appear in an edge without
/// a definition (an "external" method, never a test).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallGraph {
    /// Caller -> callees.
    pub forward: HashMap<MethodId, HashSet<MethodId>>,
    /// Callee -> callers (the transpose of `forward`).
    pub reverse: HashMap<MethodId, HashSet<MethodId>>,
    /// Known method definitions, keyed by id.
    pub definitions: HashMap<MethodId, MethodInfo>,
}

/// One consistency problem found by [`CallGraph::check_integrity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// `forward` has an edge with a null/empty-looking caller or callee id.
    /// Always critical.
    EmptyEndpoint { caller: String, callee: String },
    /// An edge exists in `forward` but not in the transpose of `reverse`
    /// (or vice versa). Non-critical: a one-directional edge.
    Asymmetric { caller: MethodId, callee: MethodId },
}

impl IntegrityIssue {
    /// Critical issues (empty/null endpoints) always invalidate a cache
    /// entry; non-critical ones (one-directional edges) are reported but
    /// do not, by themselves, make `IntegrityReport::is_valid` false.
    pub fn is_critical(&self) -> bool {
        matches!(self, IntegrityIssue::EmptyEndpoint { .. })
    }
}

/// Result of [`CallGraph::check_integrity`]: up to `max_issues` problems,
/// plus whether the graph is considered valid overall.
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    /// Whether the graph passed integrity checking. `false` iff at least
    /// one critical issue was found among the (possibly truncated) list.
    pub is_valid: bool,
    /// Issues found, truncated to `max_issues`.
    pub issues: Vec<IntegrityIssue>,
    /// Whether `issues` was truncated before every problem was found.
    pub truncated: bool,
}

impl CallGraph {
    /// An empty call graph.
    pub fn new() -> Self {
        CallGraph::default()
    }

    /// Inserts a `caller -> callee` edge into both the forward and reverse
    /// maps, maintaining the transpose invariant by construction.
    pub fn add_edge(&mut self, caller: MethodId, callee: MethodId) {
        self.forward
            .entry(caller.clone())
            .or_default()
            .insert(callee.clone());
        self.reverse.entry(callee).or_default().insert(caller);
    }

    /// Records a method definition.
    pub fn add_definition(&mut self, info: MethodInfo) {
        self.definitions.insert(info.id.clone(), info);
    }

    /// Checks the forward/reverse transpose invariant, reporting up to
    /// `max_issues` problems before truncating.
    ///
    /// A critical issue (empty/null endpoint) makes `is_valid` false.
    /// The implementation does not treat asymmetric edges as critical by
    /// itself; callers that want a stricter policy can check
    /// `issues.is_empty()` instead of `is_valid`.
    pub fn check_integrity(&self, max_issues: usize) -> IntegrityReport {
        let mut issues = Vec::new();
        let mut truncated = false;
        let mut is_valid = true;

        'outer: for (caller, callees) in &self.forward {
            if caller.as_str().trim().is_empty() {
                issues.push(IntegrityIssue::EmptyEndpoint {
                    caller: caller.as_str().to_string(),
                    callee: String::new(),
                });
                is_valid = false;
                if issues.len() >= max_issues {
                    truncated = true;
                    break 'outer;
                }
            }
            for callee in callees {
                if callee.as_str().trim().is_empty() {
                    issues.push(IntegrityIssue::EmptyEndpoint {
                        caller: caller.as_str().to_string(),
                        callee: callee.as_str().to_string(),
                    });
                    is_valid = false;
                } else if !self
                    .reverse
                    .get(callee)
                    .is_some_and(|callers| callers.contains(caller))
                {
                    issues.push(IntegrityIssue::Asymmetric {
                        caller: caller.clone(),
                        callee: callee.clone(),
                    });
                }
                if issues.len() >= max_issues {
                    truncated = true;
                    break 'outer;
                }
            }
        }

        IntegrityReport {
            is_valid,
            issues,
            truncated,
        }
    }

    /// All method ids with a known, non-test definition.
    pub fn production_candidate_ids(&self) -> impl Iterator<Item = &MethodId> {
        self.definitions
            .iter()
            .filter(|(_, info)| !info.is_test)
            .map(|(id, _)| id)
    }
}
