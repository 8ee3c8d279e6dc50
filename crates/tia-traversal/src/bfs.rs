//! Breadth-first traversal over a [`CallGraph`], in both directions:
//! forward from a test method to everything it (transitively) calls, and
//! reverse from a production method back to every test that (transitively)
//! reaches it.
//!
//! Both walks are bounded by [`TraversalConfig`] so a cyclic or
//! pathologically connected graph cannot make a single query run
//! unbounded: depth, per-node fan-out, and total visited-node count are
//! all capped. Neighbors are visited in sorted [`MethodId`] order so two
//! runs over the same graph produce the same path and the same
//! truncation, regardless of `HashMap` iteration order.

use std::collections::{HashSet, VecDeque};

use tia_core::{CallGraph, Category, CoveringTest, ExecutedMethod, MethodId};
use tracing::debug;

use crate::category::classify;
use crate::confidence::default_confidence;
use crate::config::TraversalConfig;

/// Result of [`trace_forward`].
#[derive(Debug, Clone)]
pub struct ForwardTraversal {
    pub executed: Vec<ExecutedMethod>,
    /// `true` if the walk stopped early due to `max_visited_nodes`,
    /// `max_depth`, or `max_breadth_per_level` rather than exhausting the
    /// reachable set.
    pub truncated: bool,
}

/// Result of [`trace_reverse`].
#[derive(Debug, Clone)]
pub struct ReverseTraversal {
    pub covering_tests: Vec<CoveringTest>,
    pub truncated: bool,
}

/// Walks forward from `start` (typically a test method), following
/// `graph.forward`, producing every method reached and the category it
/// was classified into along the way.
pub fn trace_forward(graph: &CallGraph, start: &MethodId, config: &TraversalConfig) -> ForwardTraversal {
    let production_category = |id: &MethodId| -> (Category, bool) {
        match graph.definitions.get(id) {
            Some(info) => {
                let cat = classify(&info.containing_type, config);
                (cat, cat.is_production(config.infrastructure_counts))
            }
            None => (Category::ThirdParty, false),
        }
    };

    let mut visited: HashSet<MethodId> = HashSet::new();
    let mut executed = Vec::new();
    let mut queue: VecDeque<(MethodId, u32, Vec<MethodId>)> = VecDeque::new();
    visited.insert(start.clone());
    queue.push_back((start.clone(), 0, vec![start.clone()]));
    let mut truncated = false;

    while let Some((current, depth, path)) = queue.pop_front() {
        if visited.len() > config.max_visited_nodes {
            truncated = true;
            break;
        }
        let (category, is_production) = production_category(&current);
        executed.push(ExecutedMethod {
            id: current.clone(),
            depth,
            path: path.clone(),
            category,
            is_production,
        });

        if depth >= config.max_depth {
            if graph.forward.get(&current).is_some_and(|c| !c.is_empty()) {
                truncated = true;
            }
            continue;
        }

        let Some(callees) = graph.forward.get(&current) else { continue };
        let mut sorted: Vec<&MethodId> = callees.iter().collect();
        sorted.sort();
        if sorted.len() > config.max_breadth_per_level {
            truncated = true;
            sorted.truncate(config.max_breadth_per_level);
        }

        for callee in sorted {
            if visited.insert(callee.clone()) {
                let mut next_path = path.clone();
                next_path.push(callee.clone());
                queue.push_back((callee.clone(), depth + 1, next_path));
            }
        }
    }

    debug!(start = %start, visited = executed.len(), truncated, "forward traversal complete");
    ForwardTraversal { executed, truncated }
}

/// Walks backward from `target` (a production method), following
/// `graph.reverse`, collecting every test method that transitively calls
/// it. A node classified as a test method is recorded as a covering test
/// and is not itself expanded further (tests are traversal roots).
pub fn trace_reverse(graph: &CallGraph, target: &MethodId, config: &TraversalConfig) -> ReverseTraversal {
    let mut visited: HashSet<MethodId> = HashSet::new();
    let mut covering_tests = Vec::new();
    let mut queue: VecDeque<(MethodId, u32, Vec<MethodId>)> = VecDeque::new();
    visited.insert(target.clone());
    queue.push_back((target.clone(), 0, vec![target.clone()]));
    let mut truncated = false;

    while let Some((current, depth, path)) = queue.pop_front() {
        if visited.len() > config.max_visited_nodes {
            truncated = true;
            break;
        }

        let is_test = graph
            .definitions
            .get(&current)
            .is_some_and(|info| info.is_test);
        if is_test && current != *target {
            let mut test_path = path.clone();
            test_path.reverse();
            covering_tests.push(CoveringTest {
                test_id: current.clone(),
                confidence: default_confidence(test_path.len()),
                path: test_path,
            });
            continue;
        }

        if depth >= config.max_depth {
            if graph.reverse.get(&current).is_some_and(|c| !c.is_empty()) {
                truncated = true;
            }
            continue;
        }

        let Some(callers) = graph.reverse.get(&current) else { continue };
        let mut sorted: Vec<&MethodId> = callers.iter().collect();
        sorted.sort();
        if sorted.len() > config.max_breadth_per_level {
            truncated = true;
            sorted.truncate(config.max_breadth_per_level);
        }

        for caller in sorted {
            if visited.insert(caller.clone()) {
                let mut next_path = path.clone();
                next_path.push(caller.clone());
                queue.push_back((caller.clone(), depth + 1, next_path));
            }
        }
    }

    debug!(target = %target, tests = covering_tests.len(), truncated, "reverse traversal complete");
    ReverseTraversal { covering_tests, truncated }
}
