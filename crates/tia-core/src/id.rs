//! Stable, opaque identifier for a method.
//!
//! A [`MethodId`] is minted once from a fully-qualified name plus normalized
//! parameter types and never changes. It is comparable by value, cheap to
//! clone (backed by `Arc<str>`), and suitable as a hash-map key in forward
//! and reverse call-graph adjacency.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque method identity.
///
/// Two `MethodId`s are equal iff their canonical strings are equal; nothing
/// about internal representation is exposed. Construction happens once, at
/// the external analyzer boundary (`CallGraphBuilder`), and the id is
/// immutable afterward.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodId(Arc<str>);

impl MethodId {
    /// Mints a method id from a fully-qualified name and normalized
    /// parameter type list, e.g. `MethodId::new("MyApp.Orders.Repo", "Save", &["int", "string"])`.
    pub fn new(containing_type: &str, name: &str, normalized_params: &[&str]) -> Self {
        let mut canonical = String::with_capacity(containing_type.len() + name.len() + 8);
        canonical.push_str(containing_type);
        canonical.push('.');
        canonical.push_str(name);
        canonical.push('(');
        canonical.push_str(&normalized_params.join(","));
        canonical.push(')');
        MethodId(Arc::from(canonical))
    }

    /// Wraps an already-canonical string as a method id without reformatting it.
    ///
    /// Used when the external analyzer has already produced a stable,
    /// normalized key (e.g. replaying a cached entry from disk).
    pub fn from_canonical(canonical: impl Into<Arc<str>>) -> Self {
        MethodId(canonical.into())
    }

    /// Returns the canonical string form of this id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MethodId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialOrd for MethodId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MethodId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_composes_canonical_form() {
        let id = MethodId::new("MyApp.Orders.Repo", "Save", &["int", "string"]);
        assert_eq!(id.as_str(), "MyApp.Orders.Repo.Save(int,string)");
    }

    #[test]
    fn equal_names_produce_equal_ids() {
        let a = MethodId::new("T", "M", &["int"]);
        let b = MethodId::new("T", "M", &["int"]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_params_are_distinct() {
        let a = MethodId::new("T", "M", &["int"]);
        let b = MethodId::new("T", "M", &["string"]);
        assert_ne!(a, b);
    }

    #[test]
    fn sorts_deterministically() {
        let mut ids = vec![
            MethodId::new("T", "Z", &[]),
            MethodId::new("T", "A", &[]),
            MethodId::new("T", "M", &[]),
        ];
        ids.sort();
        let names: Vec<&str> = ids.iter().map(|i| i.as_str()).collect();
        assert_eq!(names, vec!["T.A()", "T.M()", "T.Z()"]);
    }

    #[test]
    fn display_matches_as_str() {
        let id = MethodId::new("T", "M", &[]);
        assert_eq!(format!("{id}"), id.as_str());
    }

    #[test]
    fn from_canonical_preserves_string() {
        let id = MethodId::from_canonical("Already.Canonical(int)");
        assert_eq!(id.as_str(), "Already.Canonical(int)");
    }

    #[test]
    fn serde_roundtrip() {
        let id = MethodId::new("T", "M", &["int"]);
        let json = serde_json::to_string(&id).unwrap();
        let back: MethodId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn clone_is_cheap_arc_share() {
        let id = MethodId::new("T", "M", &[]);
        let clone = id.clone();
        assert_eq!(id, clone);
    }
}
