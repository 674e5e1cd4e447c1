//! Property-based tests for the comparator and embedded expectations
//!
//! These tests use proptest to verify invariants across many randomly
//! generated inputs.

use conformance_core::fixture::extract_embedded;
use conformance_core::{TestResult, compare};
use proptest::prelude::*;

// =============================================================================
// Comparator Properties
// =============================================================================

proptest! {
    /// Identical text always passes and carries the text.
    #[test]
    fn compare_identical_passes(text in ".*") {
        prop_assert_eq!(compare(&text, Some(&text)), TestResult::Passed(text.clone()));
    }

    /// Any difference, including trailing whitespace, fails with both sides kept.
    #[test]
    fn compare_different_fails(expected in "[a-z \n]{0,20}", actual in "[a-z \n]{0,20}") {
        prop_assume!(expected != actual);
        prop_assert_eq!(
            compare(&expected, Some(&actual)),
            TestResult::mismatch(actual.clone(), expected.clone())
        );
    }

    /// Trailing newline is significant.
    #[test]
    fn compare_trailing_newline_matters(text in "[a-z0-9]{0,12}") {
        let with_newline = format!("{text}\n");
        prop_assert!(compare(&text, Some(&with_newline)).has_failed());
    }

    /// Absent output only matches an empty expectation.
    #[test]
    fn compare_absent_output(expected in ".*") {
        let result = compare(&expected, None);
        prop_assert_eq!(result.has_passed(), expected.is_empty());
    }
}

// =============================================================================
// Embedded Expectation Properties
// =============================================================================

proptest! {
    /// Lines written as `# <line>` come back verbatim, and the body after them is ignored.
    #[test]
    fn embedded_round_trip(lines in prop::collection::vec("[a-z0-9 ]{0,10}", 0..6), body in "[a-z(){};\n]{0,40}") {
        let header: String = lines.iter().map(|l| format!("# {l}\n")).collect();
        let source = format!("{header}fn{body}");
        let expected: String = lines.iter().map(|l| format!("{l}\n")).collect();
        prop_assert_eq!(extract_embedded(&source, "#", 2), expected);
    }

    /// A fixture that does not start with the marker has no embedded expectation.
    #[test]
    fn embedded_requires_leading_marker(source in "[a-z][a-z# \n]{0,40}") {
        prop_assert_eq!(extract_embedded(&source, "#", 2), "");
    }
}
