//! Harness configuration
//!
//! Defaults follow the compiler repository layout: the compiler under `bin/<build>/shtkc`, fixtures
//! under `tests/<category>/`, object files of the instrumented build under `obj/<build>/`.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use conformance_core::fixture::{DEFAULT_MARKER, DEFAULT_PREFIX_WIDTH};
use conformance_core::{DEFAULT_TIMEOUT, ExternalTool, PipelineSettings};

/// Name of the compiler executable inside `bin/<build>/`.
pub const COMPILER_NAME: &str = "shtkc";

/// Which build of the compiler is under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildType {
    #[default]
    Debug,
    /// Coverage-instrumented build
    Gcov,
}

impl BuildType {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildType::Debug => "debug",
            BuildType::Gcov => "gcov",
        }
    }

    /// `bin/<build>/shtkc`
    pub fn compiler_path(self) -> PathBuf {
        Path::new("bin").join(self.as_str()).join(COMPILER_NAME)
    }
}

/// Inputs prepared for the external coverage report step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageConfig {
    pub enabled: bool,
    /// Where the instrumented build keeps its object and coverage data files
    pub obj_dir: PathBuf,
    /// Recreated at run start; receives profile output and the passed-fixture list
    pub testinfo_dir: PathBuf,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            obj_dir: Path::new("obj").join(BuildType::Debug.as_str()),
            testinfo_dir: Path::new("tests").join("testinfo"),
        }
    }
}

impl CoverageConfig {
    /// Coverage enabled for the gcov build.
    pub fn gcov() -> Self {
        Self {
            enabled: true,
            obj_dir: Path::new("obj").join(BuildType::Gcov.as_str()),
            ..Self::default()
        }
    }
}

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Compiler-under-test
    pub compiler: PathBuf,
    /// Directory holding one sub-directory per fixture category
    pub tests_root: PathBuf,
    /// Bound applied to every process
    pub timeout: Duration,
    /// Links emitted objects into the test executable
    pub linker: ExternalTool,
    /// Secondary lowering tool fed with the dumped low-level IR
    pub lowering_tool: PathBuf,
    /// File-name suffix that marks a fixture
    pub fixture_suffix: String,
    /// Read execution expectations from each fixture's leading comment block instead of
    /// `expected/output/`
    pub embedded_expectations: bool,
    /// Comment marker that opens an embedded expectation line
    pub embedded_marker: String,
    /// Characters stripped from the start of each embedded expectation line (marker included)
    pub embedded_prefix_width: usize,
    /// Also regenerate `expected/output/` by compiling, linking and running each fixture
    pub generate_exec_fixtures: bool,
    /// Stop a suite at its first failure
    pub stop_on_fail: bool,
    pub coverage: CoverageConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            compiler: BuildType::Debug.compiler_path(),
            tests_root: PathBuf::from("tests"),
            timeout: DEFAULT_TIMEOUT,
            linker: ExternalTool::new("gcc").with_args(["-lm"]),
            lowering_tool: PathBuf::from("llc"),
            fixture_suffix: ".shtk".to_string(),
            embedded_expectations: false,
            embedded_marker: DEFAULT_MARKER.to_string(),
            embedded_prefix_width: DEFAULT_PREFIX_WIDTH,
            generate_exec_fixtures: true,
            stop_on_fail: false,
            coverage: CoverageConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compiler(mut self, compiler: impl Into<PathBuf>) -> Self {
        self.compiler = compiler.into();
        self
    }

    pub fn with_tests_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.tests_root = root.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_linker(mut self, linker: ExternalTool) -> Self {
        self.linker = linker;
        self
    }

    pub fn with_lowering_tool(mut self, tool: impl Into<PathBuf>) -> Self {
        self.lowering_tool = tool.into();
        self
    }

    pub fn with_fixture_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.fixture_suffix = suffix.into();
        self
    }

    pub fn with_embedded_expectations(mut self, embedded: bool) -> Self {
        self.embedded_expectations = embedded;
        self
    }

    pub fn with_embedded_marker(mut self, marker: impl Into<String>) -> Self {
        self.embedded_marker = marker.into();
        self
    }

    pub fn with_embedded_prefix_width(mut self, width: usize) -> Self {
        self.embedded_prefix_width = width;
        self
    }

    pub fn with_exec_fixtures(mut self, generate: bool) -> Self {
        self.generate_exec_fixtures = generate;
        self
    }

    pub fn with_stop_on_fail(mut self, stop: bool) -> Self {
        self.stop_on_fail = stop;
        self
    }

    pub fn with_coverage(mut self, coverage: CoverageConfig) -> Self {
        self.coverage = coverage;
        self
    }

    /// `<tests_root>/<category>`
    pub fn category_dir(&self, category: &str) -> PathBuf {
        self.tests_root.join(category)
    }

    /// Make every filesystem path absolute.
    ///
    /// Processes run inside category directories, so relative paths would resolve against the wrong
    /// directory. Bare program names (`gcc`, `llc`) are left for `PATH` lookup.
    pub fn resolved(mut self) -> io::Result<Self> {
        self.compiler = absolute_if_path(&self.compiler)?;
        self.lowering_tool = absolute_if_path(&self.lowering_tool)?;
        self.linker.program = absolute_if_path(&self.linker.program)?;
        self.tests_root = std::path::absolute(&self.tests_root)?;
        self.coverage.obj_dir = std::path::absolute(&self.coverage.obj_dir)?;
        self.coverage.testinfo_dir = std::path::absolute(&self.coverage.testinfo_dir)?;
        Ok(self)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        let settings = PipelineSettings::new(&self.compiler)
            .with_timeout(self.timeout)
            .with_linker(self.linker.clone());
        if self.coverage.enabled {
            settings.with_profile_dir(&self.coverage.testinfo_dir)
        } else {
            settings
        }
    }
}

fn absolute_if_path(program: &Path) -> io::Result<PathBuf> {
    if program.components().count() > 1 {
        std::path::absolute(program)
    } else {
        Ok(program.to_path_buf())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // ========================================
    // Default config tests
    // ========================================

    #[test]
    fn test_default_compiler_path() {
        let config = HarnessConfig::default();
        assert_eq!(config.compiler, PathBuf::from("bin/debug/shtkc"));
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(HarnessConfig::default().timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_default_linker_is_gcc_with_libm() {
        let config = HarnessConfig::default();
        assert_eq!(config.linker.program, PathBuf::from("gcc"));
        assert_eq!(config.linker.args, vec!["-lm"]);
    }

    #[test]
    fn test_default_generates_exec_fixtures() {
        let config = HarnessConfig::default();
        assert!(config.generate_exec_fixtures);
        assert!(!config.embedded_expectations);
        assert!(!config.coverage.enabled);
    }

    #[test]
    fn test_default_embedded_prefix_is_hash_and_space() {
        let config = HarnessConfig::default();
        assert_eq!(config.embedded_marker, "#");
        assert_eq!(config.embedded_prefix_width, 2);
    }

    #[test]
    fn test_new_equals_default() {
        assert_eq!(HarnessConfig::new(), HarnessConfig::default());
    }

    // ========================================
    // Builder tests
    // ========================================

    #[test]
    fn test_builder_chain() {
        let config = HarnessConfig::new()
            .with_compiler("/opt/shtkc")
            .with_tests_root("/repo/tests")
            .with_timeout(Duration::from_secs(1))
            .with_fixture_suffix("_test.uhll")
            .with_embedded_expectations(true)
            .with_embedded_marker("//")
            .with_embedded_prefix_width(3)
            .with_exec_fixtures(false)
            .with_stop_on_fail(true);
        assert_eq!(config.compiler, PathBuf::from("/opt/shtkc"));
        assert_eq!(config.category_dir("parser"), PathBuf::from("/repo/tests/parser"));
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(config.fixture_suffix, "_test.uhll");
        assert!(config.embedded_expectations);
        assert_eq!(config.embedded_marker, "//");
        assert_eq!(config.embedded_prefix_width, 3);
        assert!(!config.generate_exec_fixtures);
        assert!(config.stop_on_fail);
    }

    #[test]
    fn test_build_type_paths() {
        assert_eq!(BuildType::Gcov.compiler_path(), PathBuf::from("bin/gcov/shtkc"));
        assert_eq!(CoverageConfig::gcov().obj_dir, PathBuf::from("obj/gcov"));
    }

    #[test]
    fn test_pipeline_settings_profile_dir_only_with_coverage() {
        let plain = HarnessConfig::new().pipeline_settings();
        assert!(plain.profile_dir.is_none());

        let covered = HarnessConfig::new().with_coverage(CoverageConfig::gcov()).pipeline_settings();
        assert_eq!(covered.profile_dir, Some(PathBuf::from("tests/testinfo")));
    }

    #[test]
    fn test_resolved_keeps_bare_program_names() {
        let config = HarnessConfig::new().resolved().unwrap();
        assert!(config.compiler.is_absolute());
        assert!(config.tests_root.is_absolute());
        assert_eq!(config.linker.program, PathBuf::from("gcc"));
        assert_eq!(config.lowering_tool, PathBuf::from("llc"));
    }
}
