//! Method metadata and the category taxonomy used to classify non-test
//! methods encountered during traversal.

use serde::{Deserialize, Serialize};

use crate::id::MethodId;

/// Immutable description of a method, as reported by the external
/// source-code analyzer.
///
/// Immutable once constructed: callers that need a modified copy clone
/// the whole struct rather than mutating a shared instance in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    /// Stable identity.
    pub id: MethodId,
    /// Unqualified method name.
    pub name: String,
    /// Fully-qualified containing type name.
    pub containing_type: String,
    /// Source file the method is defined in.
    pub file_path: String,
    /// 1-based source line of the method declaration.
    pub line: u32,
    /// Whether the external analyzer classified this as a test method
    /// (carries a testing-framework attribute).
    pub is_test: bool,
}

/// Classification of a non-test method by its containing type, used to
/// distinguish production code from framework/infrastructure noise when
/// reporting coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Containing type lives under a configured standard-library/system
    /// namespace prefix.
    Framework,
    /// Containing type lives under a configured third-party namespace prefix.
    ThirdParty,
    /// Type name ends in `Repository`, contains `DbContext`, or the file
    /// path matches a configured data-access pattern.
    DataAccess,
    /// Type name contains `Logger`, `Cache`, `Config`, or `Metrics`.
    Infrastructure,
    /// Defined under a test project but not itself a test method.
    TestUtility,
    /// None of the above; ordinary application code.
    BusinessLogic,
}

impl Category {
    /// Whether methods in this category count toward production coverage.
    ///
    /// `Infrastructure` is configurable; the caller-supplied flag decides
    /// whether infrastructure code counts as production for this query.
    pub fn is_production(self, infrastructure_counts: bool) -> bool {
        match self {
            Category::BusinessLogic | Category::DataAccess => true,
            Category::Infrastructure => infrastructure_counts,
            Category::Framework | Category::ThirdParty | Category::TestUtility => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(is_test: bool) -> MethodInfo {
        MethodInfo {
            id: MethodId::new("T", "M", &[]),
            name: "M".into(),
            containing_type: "T".into(),
            file_path: "t.cs".into(),
            line: 1,
            is_test,
        }
    }

    #[test]
    fn business_logic_is_always_production() {
        assert!(Category::BusinessLogic.is_production(false));
        assert!(Category::BusinessLogic.is_production(true));
    }

    #[test]
    fn data_access_is_always_production() {
        assert!(Category::DataAccess.is_production(false));
    }

    #[test]
    fn infrastructure_follows_flag() {
        assert!(!Category::Infrastructure.is_production(false));
        assert!(Category::Infrastructure.is_production(true));
    }

    #[test]
    fn framework_and_third_party_and_test_utility_never_production() {
        assert!(!Category::Framework.is_production(true));
        assert!(!Category::ThirdParty.is_production(true));
        assert!(!Category::TestUtility.is_production(true));
    }

    #[test]
    fn method_info_carries_is_test_flag() {
        assert!(info(true).is_test);
        assert!(!info(false).is_test);
    }

    #[test]
    fn serde_roundtrip() {
        let m = info(true);
        let json = serde_json::to_string(&m).unwrap();
        let back: MethodInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(m, back);
    }
}
