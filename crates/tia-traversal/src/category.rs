//! Classifies a method's containing type into a [`Category`] by dotted
//! namespace prefix, per the configured prefix lists.

use tia_core::Category;

use crate::config::TraversalConfig;

/// Classifies `containing_type` (e.g. `"MyApp.Services.OrderService"`)
/// into a [`Category`], checking prefix lists in a fixed priority order
/// so a type matching more than one list (rare, but possible with
/// overlapping conventions) resolves deterministically.
pub fn classify(containing_type: &str, config: &TraversalConfig) -> Category {
    if matches_any(containing_type, &config.test_utility_prefixes) {
        Category::TestUtility
    } else if matches_any(containing_type, &config.framework_prefixes) {
        Category::Framework
    } else if matches_any(containing_type, &config.data_access_prefixes) {
        Category::DataAccess
    } else if matches_any(containing_type, &config.infrastructure_prefixes) {
        Category::Infrastructure
    } else if containing_type.contains("ThirdParty.") {
        Category::ThirdParty
    } else {
        Category::BusinessLogic
    }
}

fn matches_any(containing_type: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| containing_type.starts_with(p.as_str()))
}
