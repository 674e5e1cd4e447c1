//! Errors that prevent the harness from producing a verdict.
//!
//! A compiler that rejects its input, prints the wrong thing or hangs is *not* an error here: those
//! are ordinary [`TestResult`](crate::outcome::TestResult) values. `HarnessError` covers the cases
//! where the harness itself cannot do its job for a fixture (missing golden file, executable that
//! cannot be spawned, unreadable fixture).

use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result type for core harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;

#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    /// The expected-output file for a fixture does not exist.
    #[error("missing expected output file: {}", path.display())]
    #[diagnostic(
        code(conformance::missing_expected),
        help("run `conformance generate` to create golden files from the current compiler")
    )]
    MissingExpected { path: PathBuf },

    /// An executable could not be started at all.
    #[error("failed to spawn `{program}`: {source}")]
    #[diagnostic(
        code(conformance::spawn),
        help("check that the executable exists and is runnable (see --compiler)")
    )]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    #[diagnostic(code(conformance::io))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A fixture path without a usable UTF-8 file name.
    #[error("fixture path has no usable file name: {}", path.display())]
    #[diagnostic(code(conformance::fixture_name))]
    InvalidFixtureName { path: PathBuf },
}

impl HarnessError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_expected_message_names_path() {
        let err = HarnessError::MissingExpected {
            path: PathBuf::from("expected/json/add.shtk.json"),
        };
        assert_eq!(
            err.to_string(),
            "missing expected output file: expected/json/add.shtk.json"
        );
    }

    #[test]
    fn test_spawn_error_keeps_source() {
        let err = HarnessError::Spawn {
            program: "shtkc".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().starts_with("failed to spawn `shtkc`"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
