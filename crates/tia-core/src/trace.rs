//! Execution traces produced by forward traversal, and the coverage
//! records produced by inverting reverse traversal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::MethodId;
use crate::method::Category;

/// A single non-test method reached during a forward trace, with the path
/// that reached it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedMethod {
    /// The method reached.
    pub id: MethodId,
    /// Number of edges from the originating test to this method.
    pub depth: u32,
    /// Full path from the test method to this one, inclusive of both ends.
    pub path: Vec<MethodId>,
    /// Classification of the containing type.
    pub category: Category,
    /// Whether this category counts as production code for this query.
    pub is_production: bool,
}

/// The result of tracing forward from a single test method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTrace {
    /// Id of the originating test method.
    pub test_id: MethodId,
    /// Unqualified test method name.
    pub test_name: String,
    /// Containing test class.
    pub test_class: String,
    /// Non-test methods reached, in BFS discovery order.
    pub executed: Vec<ExecutedMethod>,
    /// When this trace was computed.
    pub timestamp: DateTime<Utc>,
}

impl ExecutionTrace {
    /// Ids of every non-test method reached by this trace.
    pub fn executed_ids(&self) -> impl Iterator<Item = &MethodId> {
        self.executed.iter().map(|m| &m.id)
    }
}

/// A covering test found during reverse traversal, with its confidence
/// and the path from the test to the target method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveringTest {
    /// Id of the covering test method.
    pub test_id: MethodId,
    /// Monotonically decreasing function of path length; see
    /// [`crate::fingerprint`] sibling module `tia_traversal::confidence`.
    pub confidence: f64,
    /// Path from the test to the target method.
    pub path: Vec<MethodId>,
}

/// The set of tests that cover a single production method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageRecord {
    /// The production method being covered.
    pub production_method: MethodId,
    /// Tests that transitively reach it, most confident first.
    pub covering_tests: Vec<CoveringTest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executed_ids_maps_over_executed() {
        let trace = ExecutionTrace {
            test_id: MethodId::from_canonical("T.Test"),
            test_name: "Test".into(),
            test_class: "T".into(),
            executed: vec![ExecutedMethod {
                id: MethodId::from_canonical("A.M"),
                depth: 1,
                path: vec![
                    MethodId::from_canonical("T.Test"),
                    MethodId::from_canonical("A.M"),
                ],
                category: Category::BusinessLogic,
                is_production: true,
            }],
            timestamp: Utc::now(),
        };
        let ids: Vec<&str> = trace.executed_ids().map(|i| i.as_str()).collect();
        assert_eq!(ids, vec!["A.M"]);
    }

    #[test]
    fn coverage_record_serde_roundtrip() {
        let record = CoverageRecord {
            production_method: MethodId::from_canonical("A.M"),
            covering_tests: vec![CoveringTest {
                test_id: MethodId::from_canonical("T.Test"),
                confidence: 1.0,
                path: vec![
                    MethodId::from_canonical("T.Test"),
                    MethodId::from_canonical("A.M"),
                ],
            }],
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: CoverageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record.production_method, back.production_method);
        assert_eq!(record.covering_tests.len(), back.covering_tests.len());
    }
}
