//! Fixtures and their expected outputs.
//!
//! A fixture is a source file in a category directory (`tests/parser`, `tests/compiler`, ...). Its
//! expected output comes from exactly one place, chosen per suite:
//!
//! - **Embedded**: the leading comment block of the fixture itself. Every line starting with the
//!   marker contributes its text after a fixed-width prefix; the first other line ends the block.
//!   This is a textual convention and never looks at the fixture's syntax.
//! - **External**: `<category>/expected/<kind>/<fixture-file-name><extension>`.
//!
//! The store reads and writes the external tree with the same path construction, so regenerating a
//! golden file and reading it back always agree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::{HarnessError, HarnessResult};

/// Directory under a category root holding external expected outputs.
pub const EXPECTED_DIR: &str = "expected";

/// Default comment marker for embedded expectations.
pub const DEFAULT_MARKER: &str = "#";

/// Marker plus one separator character (`"# 3"` -> `"3"`).
pub const DEFAULT_PREFIX_WIDTH: usize = 2;

/// A discovered source file under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    path: PathBuf,
    name: String,
}

impl Fixture {
    pub fn new(path: impl Into<PathBuf>) -> HarnessResult<Self> {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .ok_or_else(|| HarnessError::InvalidFixtureName { path: path.clone() })?;
        Ok(Self { path, name })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including the suffix (`add_test.shtk`). This is what the compiler is given, since
    /// it always runs inside the fixture's own directory.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Where a suite takes its expected output from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedSource {
    Embedded { marker: String, prefix_width: usize },
    External { kind: String, extension: String },
}

impl ExpectedSource {
    pub fn embedded() -> Self {
        ExpectedSource::Embedded {
            marker: DEFAULT_MARKER.to_string(),
            prefix_width: DEFAULT_PREFIX_WIDTH,
        }
    }

    pub fn external(kind: impl Into<String>, extension: impl Into<String>) -> Self {
        ExpectedSource::External {
            kind: kind.into(),
            extension: extension.into(),
        }
    }
}

/// Collect the embedded expected output from the start of a fixture's text.
///
/// `prefix_width` counts characters, not bytes. Line terminators belong to the line, so they
/// survive unless the prefix swallows them (a bare `"#\n"` contributes nothing).
pub fn extract_embedded(source: &str, marker: &str, prefix_width: usize) -> String {
    source
        .split_inclusive('\n')
        .take_while(|line| line.starts_with(marker))
        .map(|line| line.char_indices().nth(prefix_width).map_or("", |(i, _)| &line[i..]))
        .collect()
}

/// Reads and writes expected outputs for the fixtures of one category directory.
#[derive(Debug, Clone)]
pub struct FixtureStore {
    root: PathBuf,
}

impl FixtureStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fixtures directly inside the category root whose file name ends with `suffix`, sorted by name.
    pub fn discover(&self, suffix: &str) -> HarnessResult<Vec<Fixture>> {
        let entries = fs::read_dir(&self.root).map_err(|e| HarnessError::io(&self.root, e))?;

        let mut fixtures = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| HarnessError::io(&self.root, e))?.path();
            if !path.is_file() {
                continue;
            }
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(suffix) && n.len() > suffix.len());
            if matches {
                fixtures.push(Fixture::new(path)?);
            }
        }

        fixtures.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(fixtures)
    }

    /// `<root>/expected/<kind>/<fixture-name><extension>`
    pub fn expected_path(&self, fixture: &Fixture, kind: &str, extension: &str) -> PathBuf {
        self.root
            .join(EXPECTED_DIR)
            .join(kind)
            .join(format!("{}{}", fixture.name(), extension))
    }

    pub fn load_expected(&self, fixture: &Fixture, source: &ExpectedSource) -> HarnessResult<String> {
        match source {
            ExpectedSource::Embedded { marker, prefix_width } => {
                let text = fs::read_to_string(fixture.path()).map_err(|e| HarnessError::io(fixture.path(), e))?;
                Ok(extract_embedded(&text, marker, *prefix_width))
            }
            ExpectedSource::External { kind, extension } => {
                let path = self.expected_path(fixture, kind, extension);
                fs::read_to_string(&path).map_err(|e| match e.kind() {
                    io::ErrorKind::NotFound => HarnessError::MissingExpected { path: path.clone() },
                    _ => HarnessError::io(&path, e),
                })
            }
        }
    }

    /// Overwrite the golden file for `fixture`, creating directories as needed.
    pub fn write_expected(&self, fixture: &Fixture, kind: &str, extension: &str, content: &str) -> HarnessResult<PathBuf> {
        let path = self.expected_path(fixture, kind, extension);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| HarnessError::io(parent, e))?;
        }
        fs::write(&path, content).map_err(|e| HarnessError::io(&path, e))?;
        Ok(path)
    }
}
