#![forbid(unsafe_code)]
//! Conformance harness for the shtkc compiler
//!
//! Runs directories of source fixtures through the compiler-under-test (and, for executable
//! suites, the linker and the compiled program), compares what comes out with golden files, and
//! can regenerate those golden files from the current compiler.
//!
//! The per-fixture engine lives in `conformance_core`; this crate adds the suite table, the
//! reporters, golden generation, coverage hand-off and the command line.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module
//!   and the core crate enforce `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod cli_checks;
pub mod config;
pub mod coverage;
pub mod generator;
pub mod runner;
pub mod suites;
pub mod version;

pub use config::{BuildType, CoverageConfig, HarnessConfig};
pub use generator::{GenerationReport, generate, generate_all};
pub use runner::{ConsoleReporter, JsonReporter, Reporter, RunSummary, SuiteRunner, SuiteTally};
pub use suites::{SUITES, SuiteDef, SuiteKind};
