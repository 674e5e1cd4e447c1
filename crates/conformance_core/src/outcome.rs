//! Test outcomes and the exact-match comparator.

use std::fmt;

/// Terminal outcome of running one fixture (or one phase of it).
///
/// Payloads are kept on every variant that has them, including `Passed`: golden regeneration
/// persists the passing output and reporters print it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestResult {
    /// Output matched, or every step succeeded where no output was asserted.
    Passed(String),
    /// Output diverged, a step exited non-zero, or an expected-failure assertion did not hold.
    Failed {
        actual: String,
        expected: Option<String>,
    },
    /// A process exceeded the bound. Never folded into `Failed`.
    TimedOut,
    /// Evaluation was elided on purpose (compile failure accepted by the case).
    Skipped,
}

impl TestResult {
    pub fn passed(output: impl Into<String>) -> Self {
        TestResult::Passed(output.into())
    }

    /// A failure with no expected payload (e.g. a non-zero exit).
    pub fn failed(actual: impl Into<String>) -> Self {
        TestResult::Failed {
            actual: actual.into(),
            expected: None,
        }
    }

    /// A failure with both payloads, for diff printing.
    pub fn mismatch(actual: impl Into<String>, expected: impl Into<String>) -> Self {
        TestResult::Failed {
            actual: actual.into(),
            expected: Some(expected.into()),
        }
    }

    pub fn has_passed(&self) -> bool {
        matches!(self, TestResult::Passed(_))
    }

    pub fn has_failed(&self) -> bool {
        matches!(self, TestResult::Failed { .. })
    }

    pub fn has_timed_out(&self) -> bool {
        matches!(self, TestResult::TimedOut)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TestResult::Skipped)
    }

    /// The actual output carried by `Passed` or `Failed`.
    pub fn output(&self) -> Option<&str> {
        match self {
            TestResult::Passed(output) => Some(output),
            TestResult::Failed { actual, .. } => Some(actual),
            TestResult::TimedOut | TestResult::Skipped => None,
        }
    }

    pub fn expected(&self) -> Option<&str> {
        match self {
            TestResult::Failed { expected, .. } => expected.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            TestResult::Passed(_) => Status::Passed,
            TestResult::Failed { .. } => Status::Failed,
            TestResult::TimedOut => Status::TimedOut,
            TestResult::Skipped => Status::Skipped,
        }
    }
}

/// Payload-free discriminant of [`TestResult`], used for tallies and report keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Passed,
    Failed,
    TimedOut,
    Skipped,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
            Status::TimedOut => "timedout",
            Status::Skipped => "skipped",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare an expected payload against what a phase produced.
///
/// `actual = None` means the phase had no output object. That matches only an empty expectation.
/// Otherwise this is exact string equality: no trimming, no normalization.
pub fn compare(expected: &str, actual: Option<&str>) -> TestResult {
    match actual {
        None if expected.is_empty() => TestResult::passed(""),
        None => TestResult::mismatch("", expected),
        Some(actual) if actual == expected => TestResult::passed(actual),
        Some(actual) => TestResult::mismatch(actual, expected),
    }
}
