//! CLI module for the conformance harness
//!
//! ## Commands
//!
//! - `test` - Run the conformance suites (default when no subcommand is given)
//! - `generate` - Regenerate golden files from the current compiler
//! - `list` - List the built-in suites
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//! - `locate` - Compiler discovery
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod locate;

use std::fmt;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{BuildType, CoverageConfig, HarnessConfig};
use crate::suites;
use crate::version::HARNESS_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Render a diagnostic (code, help text, source chain) as the error message.
    pub fn diagnostic<D>(diagnostic: D) -> Self
    where
        D: miette::Diagnostic + Send + Sync + 'static,
    {
        Self::failure(format!("{:?}", miette::Report::new(diagnostic)))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Conformance harness for the shtkc compiler
#[derive(Parser, Debug)]
#[command(name = "conformance")]
#[command(version = HARNESS_VERSION)]
#[command(about = "Conformance harness for the shtkc compiler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CommonArgs {
    /// Compiler-under-test (default: bin/<build>/shtkc)
    #[arg(long, value_name = "PATH", global = true)]
    pub compiler: Option<PathBuf>,

    /// Directory holding one sub-directory per fixture category
    #[arg(long = "tests-dir", value_name = "DIR", default_value = "tests", global = true)]
    pub tests_dir: PathBuf,

    /// Per-process timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 15, global = true)]
    pub timeout: u64,

    /// Read execution expectations from each fixture's leading `#` comments
    #[arg(long = "embedded-expectations", global = true)]
    pub embedded_expectations: bool,

    /// Test the coverage-instrumented build and prepare coverage inputs
    #[arg(long, global = true)]
    pub gcov: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the conformance suites
    Test(TestArgs),

    /// Regenerate golden files from the current compiler
    Generate {
        /// Do not regenerate expected program output
        #[arg(long = "no-exec")]
        no_exec: bool,
    },

    /// List the built-in suites
    List,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct TestArgs {
    /// Only run this suite (repeatable)
    #[arg(long = "suite", value_name = "NAME", value_parser = PossibleValuesParser::new(suites::suite_names()))]
    pub suites: Vec<String>,

    /// Stop a suite at its first failure
    #[arg(short = 'x', long = "exitfirst")]
    pub stop_on_fail: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    pub format: ReportFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Console,
    Json,
}

impl CommonArgs {
    fn build_type(&self) -> BuildType {
        if self.gcov { BuildType::Gcov } else { BuildType::Debug }
    }

    /// Build the harness configuration, locating the compiler when none was given.
    pub fn config(&self) -> CliResult<HarnessConfig> {
        let build = self.build_type();
        let compiler = match &self.compiler {
            Some(path) => path.clone(),
            None => locate::find_compiler(build).map_err(CliError::diagnostic)?,
        };
        let coverage = if self.gcov {
            CoverageConfig::gcov()
        } else {
            CoverageConfig::default()
        };

        HarnessConfig::new()
            .with_compiler(compiler)
            .with_tests_root(&self.tests_dir)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_embedded_expectations(self.embedded_expectations)
            .with_coverage(coverage)
            .resolved()
            .map_err(|e| CliError::failure(format!("Error resolving harness paths: {e}")))
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Some(Command::Test(args)) => commands::run_tests(cli.common.config()?, &args),
        Some(Command::Generate { no_exec }) => {
            commands::generate(cli.common.config()?.with_exec_fixtures(!no_exec))
        }
        Some(Command::List) => commands::list(),
        // Default: run every suite
        None => commands::run_tests(cli.common.config()?, &TestArgs::default()),
    }
}

// ============================================================================
// Tests
// ============================================================================
