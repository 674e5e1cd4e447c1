#![forbid(unsafe_code)]
// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
//! Core engine of the shtkc conformance harness.
//!
//! This crate knows how to run one fixture through the compiler-under-test and turn what happened
//! into a verdict. It does not know about suites, reporting or the command line.
//!
//! ## Modules
//!
//! - `process` - bounded-time subprocess invocation (combined output, exit code, timeout)
//! - `outcome` - the closed set of test outcomes and the exact-match comparator
//! - `fixture` - fixtures on disk, embedded and external expected outputs
//! - `workdir` - the working directory and its artifact cleanup discipline
//! - `pipeline` - compile, then optionally link/execute or run a secondary tool
//! - `errors` - conditions that prevent a verdict from being produced
//!
//! ## Data flow
//!
//! ```text
//! Fixture ──► FixtureStore::load_expected ──► CaseSpec
//!                                               │
//!                     Pipeline::run_case ◄──────┘
//!                        │  ProcessRunner (compiler, linker, program, tool)
//!                        ▼
//!                     outcome::compare ──► TestResult
//! ```

pub mod errors;
pub mod fixture;
pub mod outcome;
pub mod pipeline;
pub mod process;
pub mod workdir;

pub use errors::{HarnessError, HarnessResult};
pub use fixture::{ExpectedSource, Fixture, FixtureStore};
pub use outcome::{Status, TestResult, compare};
pub use pipeline::{
    CaseSpec, CompileErrorPolicy, ExternalTool, FinalStage, ModeFlag, PROFILE_PREFIX_ENV, Pipeline, PipelineSettings,
};
pub use process::{DEFAULT_TIMEOUT, Invocation, ProcessOutcome, ProcessRunner, SystemRunner};
pub use workdir::{ArtifactPolicy, ArtifactStore, EXECUTABLE_NAME, WorkDir};
