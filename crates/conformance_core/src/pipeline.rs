//! The per-fixture phase pipeline.
//!
//! ```text
//! Setup ─► Compile ─┬─ timeout ─────────────────────────────► TimedOut
//!                   ├─ non-zero ─► CompileErrorPolicy ──────► Failed | Skipped | compare
//!                   └─ zero ─► [dump] ─► final stage
//!                                          ├─ CompilerOutput ─► compare
//!                                          ├─ Execute ────────► link ─► run program ─► compare
//!                                          └─ Tool ───────────► run tool ─► compare
//! Teardown (always)
//! ```
//!
//! Phases run strictly in order and the first timeout or failure ends the case. Setup and teardown
//! both clean the working directory; teardown runs on every exit path, including timeouts and
//! harness errors, so the next fixture never sees this one's artifacts.
//!
//! A compile failure is only tolerated when the case opts in through [`CompileErrorPolicy`]. A
//! secondary tool that exits non-zero is always `Failed`, whatever the compile policy says: the
//! compiler already accepted the input by then.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::errors::{HarnessError, HarnessResult};
use crate::fixture::Fixture;
use crate::outcome::{TestResult, compare};
use crate::process::{DEFAULT_TIMEOUT, Invocation, ProcessOutcome, ProcessRunner};
use crate::workdir::{ArtifactStore, EXECUTABLE_NAME};

/// Environment variable naming the profiling output of an instrumented compiler.
pub const PROFILE_PREFIX_ENV: &str = "GMON_OUT_PREFIX";

/// Output mode requested from the compiler-under-test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeFlag {
    CompileToObject,
    ParseTreeText,
    ParseTreeJson,
    IntermediateText,
    IntermediateJson,
    IntermediateCodeText,
    IntermediateCodeJson,
    LowLevelIr,
    Version,
}

impl ModeFlag {
    pub fn as_flag(self) -> &'static str {
        match self {
            ModeFlag::CompileToObject => "-c",
            ModeFlag::ParseTreeText => "-ast",
            ModeFlag::ParseTreeJson => "-json-ast",
            ModeFlag::IntermediateText => "-ir",
            ModeFlag::IntermediateJson => "-json-ir",
            ModeFlag::IntermediateCodeText => "-icode-all",
            ModeFlag::IntermediateCodeJson => "-json-icode-all",
            ModeFlag::LowLevelIr => "-llvm",
            ModeFlag::Version => "-version",
        }
    }
}

/// An external program with fixed trailing arguments (`gcc ... -lm`, `llc <file>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTool {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ExternalTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// What to do when the compiler exits non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileErrorPolicy {
    /// Stop with `Failed(compiler output)`.
    Fail,
    /// Stop with `Skipped`; nothing further is meaningful.
    Skip,
    /// The case expects this exact diagnostic; compare against it.
    Expect(String),
}

/// What happens after a successful compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalStage {
    /// The compiler's own output is the payload.
    CompilerOutput,
    /// Link the emitted objects and run the program; its output is the payload.
    Execute,
    /// Run a secondary tool (usually over the dumped compiler output).
    Tool(ExternalTool),
}

/// One fixture, fully described for the pipeline.
#[derive(Debug, Clone)]
pub struct CaseSpec {
    pub fixture: Fixture,
    pub flag: ModeFlag,
    /// Persist the compiler output under this file name in the working directory.
    pub dump_file: Option<String>,
    pub on_compile_error: CompileErrorPolicy,
    pub final_stage: FinalStage,
    /// Expected payload of the final stage; `None` asserts only successful completion.
    pub expected: Option<String>,
}

impl CaseSpec {
    pub fn new(fixture: Fixture, flag: ModeFlag) -> Self {
        Self {
            fixture,
            flag,
            dump_file: None,
            on_compile_error: CompileErrorPolicy::Fail,
            final_stage: FinalStage::CompilerOutput,
            expected: None,
        }
    }

    pub fn dump_to(mut self, file_name: impl Into<String>) -> Self {
        self.dump_file = Some(file_name.into());
        self
    }

    pub fn on_compile_error(mut self, policy: CompileErrorPolicy) -> Self {
        self.on_compile_error = policy;
        self
    }

    pub fn then(mut self, stage: FinalStage) -> Self {
        self.final_stage = stage;
        self
    }

    pub fn expect(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }
}

/// Settings shared by every case of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub compiler: PathBuf,
    pub timeout: Duration,
    /// Invoked as `<program> <objects...> -o test_executable <args...>`.
    pub linker: ExternalTool,
    /// When set, every compiler invocation gets a per-fixture profile prefix inside this directory.
    pub profile_dir: Option<PathBuf>,
}

impl PipelineSettings {
    pub fn new(compiler: impl Into<PathBuf>) -> Self {
        Self {
            compiler: compiler.into(),
            timeout: DEFAULT_TIMEOUT,
            linker: ExternalTool::new("gcc").with_args(["-lm"]),
            profile_dir: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_linker(mut self, linker: ExternalTool) -> Self {
        self.linker = linker;
        self
    }

    pub fn with_profile_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profile_dir = Some(dir.into());
        self
    }
}

/// Drives one case at a time through a runner and a working directory.
pub struct Pipeline<R, S> {
    runner: R,
    store: S,
    settings: PipelineSettings,
}

impl<R: ProcessRunner, S: ArtifactStore> Pipeline<R, S> {
    pub fn new(runner: R, store: S, settings: PipelineSettings) -> Self {
        Self {
            runner,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run a case from setup to teardown.
    #[tracing::instrument(skip_all, fields(fixture = case.fixture.name(), flag = case.flag.as_flag()))]
    pub fn run_case(&self, case: &CaseSpec) -> HarnessResult<TestResult> {
        self.store.clean()?;
        let result = self.run_phases(case);
        let teardown = self.store.clean();

        let result = result?;
        teardown?;
        debug!(status = %result.status(), "case finished");
        Ok(result)
    }

    fn run_phases(&self, case: &CaseSpec) -> HarnessResult<TestResult> {
        let (output, exit_code) = match self.runner.run(&self.compile_invocation(case))? {
            ProcessOutcome::TimedOut => return Ok(TestResult::TimedOut),
            ProcessOutcome::Completed { output, exit_code } => (output, exit_code),
        };

        if exit_code != 0 {
            debug!(exit_code, "compiler rejected fixture");
            return Ok(match &case.on_compile_error {
                CompileErrorPolicy::Fail => TestResult::failed(output),
                CompileErrorPolicy::Skip => TestResult::Skipped,
                CompileErrorPolicy::Expect(expected) => compare(expected, Some(&output)),
            });
        }

        if let Some(file_name) = &case.dump_file {
            self.store.dump(file_name, &output)?;
        }

        match &case.final_stage {
            FinalStage::CompilerOutput => Ok(assert_output(case, output)),
            FinalStage::Execute => self.link_and_execute(case),
            FinalStage::Tool(tool) => {
                let invocation = self.in_workdir(Invocation::new(&tool.program).args(&tool.args));
                let outcome = self.runner.run(&invocation)?;
                Ok(judge(case, outcome))
            }
        }
    }

    fn compile_invocation(&self, case: &CaseSpec) -> Invocation {
        let mut invocation = Invocation::new(&self.settings.compiler)
            .arg(case.fixture.name())
            .arg(case.flag.as_flag());
        if let Some(dir) = &self.settings.profile_dir {
            invocation = invocation.env(PROFILE_PREFIX_ENV, profile_prefix(dir, case.fixture.name()));
        }
        self.in_workdir(invocation)
    }

    fn link_and_execute(&self, case: &CaseSpec) -> HarnessResult<TestResult> {
        let linker = &self.settings.linker;
        let link = Invocation::new(&linker.program)
            .args(self.store.objects()?)
            .arg("-o")
            .arg(EXECUTABLE_NAME)
            .args(&linker.args);
        let linked = self.runner.run(&self.in_workdir(link))?;
        if linked.timed_out() {
            return Ok(TestResult::TimedOut);
        }
        if !self.store.exists(EXECUTABLE_NAME) {
            debug!("linker produced no executable");
            return Ok(TestResult::failed(linked.output().unwrap_or_default()));
        }

        let executable = std::path::absolute(self.store.root().join(EXECUTABLE_NAME))
            .map_err(|e| HarnessError::io(self.store.root(), e))?;
        let outcome = self.runner.run(&self.in_workdir(Invocation::new(executable)))?;
        Ok(judge(case, outcome))
    }

    fn in_workdir(&self, invocation: Invocation) -> Invocation {
        invocation
            .current_dir(self.store.root())
            .timeout(self.settings.timeout)
    }
}

/// `<dir>/<fixture-name>.gmon.out`
pub fn profile_prefix(dir: &std::path::Path, fixture_name: &str) -> OsString {
    dir.join(format!("{fixture_name}.gmon.out")).into_os_string()
}

fn assert_output(case: &CaseSpec, output: String) -> TestResult {
    match &case.expected {
        Some(expected) => compare(expected, Some(&output)),
        None => TestResult::Passed(output),
    }
}

/// Verdict for a process that ran after a successful compile (program or secondary tool).
fn judge(case: &CaseSpec, outcome: ProcessOutcome) -> TestResult {
    match outcome {
        ProcessOutcome::TimedOut => TestResult::TimedOut,
        ProcessOutcome::Completed { output, exit_code } if exit_code != 0 => TestResult::Failed {
            actual: output,
            expected: case.expected.clone(),
        },
        ProcessOutcome::Completed { output, .. } => assert_output(case, output),
    }
}
