//! Confidence scoring for a path discovered during reverse traversal.
//!
//! The default function decays with path length: a test that calls a
//! method directly is a stronger signal than one that reaches it five
//! calls deep. Callers that want a different decay curve can supply their
//! own function to [`crate::bfs::trace_reverse`].

/// Default confidence function: `1 / path_length`, so a direct call
/// (`path_length == 1`) scores `1.0` and it decays harmonically from
/// there. `path_length` is the number of edges between the test and the
/// target method, inclusive of the edge into the target.
pub fn default_confidence(path_length: usize) -> f64 {
    1.0 / path_length.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_call_has_full_confidence() {
        assert_eq!(default_confidence(1), 1.0);
    }

    #[test]
    fn confidence_decays_with_distance() {
        let near = default_confidence(2);
        let far = default_confidence(5);
        assert!(near > far);
    }

    #[test]
    fn zero_length_does_not_divide_by_zero() {
        assert_eq!(default_confidence(0), 1.0);
    }
}
