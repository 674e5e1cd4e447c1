//! Suite runner and reporting
//!
//! ## Reporter Trait
//!
//! The runner uses a `Reporter` trait to separate reporting from execution. The console reporter
//! prints a status line per fixture and the classic summary; the JSON reporter emits one document
//! per run for CI tooling.
//!
//! ## Ordering
//!
//! Suites run one after another and fixtures one at a time, in discovery order. Every process of a
//! suite shares the category directory, which is only safe because no two fixtures overlap.

use std::io::{IsTerminal, Write};
use std::time::{Duration, Instant};

use conformance_core::{FixtureStore, HarnessResult, Pipeline, ProcessRunner, Status, TestResult, WorkDir};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::cli_checks;
use crate::config::HarnessConfig;
use crate::suites::{CLI_SUITE, SuiteDef};
use crate::version::HARNESS_VERSION;

// ============================================================================
// Tally
// ============================================================================

/// Counters and fixture lists for one suite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteTally {
    pub passed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub skipped: usize,
    pub passed_fixtures: Vec<String>,
    pub failed_fixtures: Vec<String>,
    pub timed_out_fixtures: Vec<String>,
}

impl SuiteTally {
    /// Count one fixture. Harness errors count as failures.
    pub fn record(&mut self, fixture: &str, outcome: &HarnessResult<TestResult>) {
        let status = match outcome {
            Ok(result) => result.status(),
            Err(_) => Status::Failed,
        };
        match status {
            Status::Passed => {
                self.passed += 1;
                self.passed_fixtures.push(fixture.to_string());
            }
            Status::Failed => {
                self.failed += 1;
                self.failed_fixtures.push(fixture.to_string());
            }
            Status::TimedOut => {
                self.timed_out += 1;
                self.timed_out_fixtures.push(fixture.to_string());
            }
            Status::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.timed_out + self.skipped
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.timed_out == 0
    }
}

/// Summary of a whole run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub suites: Vec<(String, SuiteTally)>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn total(&self, field: fn(&SuiteTally) -> usize) -> usize {
        self.suites.iter().map(|(_, tally)| field(tally)).sum()
    }

    /// Any fixture failed or timed out.
    pub fn has_failures(&self) -> bool {
        self.suites.iter().any(|(_, tally)| !tally.is_clean())
    }

    /// `<suite>/<fixture>` for every passed fixture, in run order.
    pub fn passed_fixtures(&self) -> Vec<String> {
        self.suites
            .iter()
            .flat_map(|(suite, tally)| tally.passed_fixtures.iter().map(move |f| format!("{suite}/{f}")))
            .collect()
    }
}

// ============================================================================
// Reporter Trait
// ============================================================================

/// Trait for reporting suite execution.
pub trait Reporter {
    /// Called when a suite begins
    fn on_suite_start(&mut self, _suite: &str, _fixture_count: usize) {}

    /// Called when a fixture completes
    fn on_fixture_complete(&mut self, suite: &str, fixture: &str, outcome: &HarnessResult<TestResult>);

    /// Called when a suite has completed
    fn on_suite_complete(&mut self, suite: &str, tally: &SuiteTally);

    /// Called when all suites have completed
    fn on_run_complete(&mut self, _summary: &RunSummary) {}
}

/// Default console reporter
pub struct ConsoleReporter<W: Write> {
    out: W,
    color: bool,
}

impl ConsoleReporter<std::io::Stdout> {
    /// Colour only when stdout is a terminal.
    pub fn stdout() -> Self {
        let out = std::io::stdout();
        let color = out.is_terminal();
        Self::new(out, color)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn on_suite_start(&mut self, suite: &str, _fixture_count: usize) {
        let header = self.paint("1", &format!("--=[Running {suite} tests]=--"));
        let _ = writeln!(self.out, "{header}");
    }

    fn on_fixture_complete(&mut self, _suite: &str, fixture: &str, outcome: &HarnessResult<TestResult>) {
        let line = match outcome {
            Ok(TestResult::Passed(_)) => format!(" {} {fixture}", self.paint("32", "PASSED  ")),
            Ok(TestResult::Failed { .. }) => format!(" {} {fixture}", self.paint("31", "FAILED  ")),
            Ok(TestResult::TimedOut) => format!(" {} {fixture}", self.paint("33", "TIMEOUT ")),
            Ok(TestResult::Skipped) => format!(" {} {fixture}", self.paint("33", "SKIPPED ")),
            Err(_) => format!(" {} {fixture}", self.paint("31", "ERROR   ")),
        };
        let _ = writeln!(self.out, "{line}");

        // Payload dumps only for failures
        match outcome {
            Ok(TestResult::Failed { actual, expected }) => {
                let _ = writeln!(self.out, "[Program output]");
                let _ = writeln!(self.out, "{actual}");
                if let Some(expected) = expected {
                    let _ = writeln!(self.out, "[Defined test output]");
                    let _ = writeln!(self.out, "{expected}");
                }
            }
            Err(err) => {
                let message = self.paint("31", &err.to_string());
                let _ = writeln!(self.out, "{message}");
            }
            _ => {}
        }
    }

    fn on_suite_complete(&mut self, _suite: &str, tally: &SuiteTally) {
        let _ = writeln!(self.out, "{} tests failed.", tally.failed);
        let _ = writeln!(self.out, "{} tests passed.", tally.passed);
        if tally.timed_out > 0 {
            let _ = writeln!(self.out, "{} tests timed out.", tally.timed_out);
        }
        if tally.skipped > 0 {
            let _ = writeln!(self.out, "{} tests skipped.", tally.skipped);
        }
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        let failed = summary.total(|t| t.failed);
        let timed_out = summary.total(|t| t.timed_out);
        let passed = summary.total(|t| t.passed);
        let code = if summary.has_failures() { "1;31" } else { "1;32" };
        let line = format!(
            "====== {passed} passed, {failed} failed, {timed_out} timed out in {:.2}s ======",
            summary.duration.as_secs_f64()
        );
        let line = self.paint(code, &line);
        let _ = writeln!(self.out);
        let _ = writeln!(self.out, "{line}");
    }
}

/// Machine-readable reporter: one JSON document per run.
pub struct JsonReporter<W: Write> {
    out: W,
    suites: Vec<Value>,
    current: Vec<Value>,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            suites: Vec::new(),
            current: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// The document written by `on_run_complete`.
    pub fn document(&self, summary: &RunSummary) -> Value {
        json!({
            "harness_version": HARNESS_VERSION,
            "duration_ms": u64::try_from(summary.duration.as_millis()).unwrap_or(u64::MAX),
            "passed": summary.total(|t| t.passed),
            "failed": summary.total(|t| t.failed),
            "timed_out": summary.total(|t| t.timed_out),
            "skipped": summary.total(|t| t.skipped),
            "suites": self.suites,
        })
    }
}

fn fixture_json(fixture: &str, outcome: &HarnessResult<TestResult>) -> Value {
    match outcome {
        Ok(result) => json!({
            "name": fixture,
            "status": result.status().as_str(),
            "actual": result.output(),
            "expected": result.expected(),
        }),
        Err(err) => json!({
            "name": fixture,
            "status": Status::Failed.as_str(),
            "error": err.to_string(),
        }),
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn on_fixture_complete(&mut self, _suite: &str, fixture: &str, outcome: &HarnessResult<TestResult>) {
        self.current.push(fixture_json(fixture, outcome));
    }

    fn on_suite_complete(&mut self, suite: &str, tally: &SuiteTally) {
        let fixtures = std::mem::take(&mut self.current);
        self.suites.push(json!({
            "name": suite,
            "passed": tally.passed,
            "failed": tally.failed,
            "timed_out": tally.timed_out,
            "skipped": tally.skipped,
            "fixtures": fixtures,
        }));
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        let document = self.document(summary);
        let _ = serde_json::to_writer_pretty(&mut self.out, &document);
        let _ = writeln!(self.out);
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Runs suites through one process runner and reports to one reporter.
pub struct SuiteRunner<'a, R> {
    config: &'a HarnessConfig,
    runner: R,
    reporter: &'a mut dyn Reporter,
}

impl<'a, R: ProcessRunner> SuiteRunner<'a, R> {
    pub fn new(config: &'a HarnessConfig, runner: R, reporter: &'a mut dyn Reporter) -> Self {
        Self {
            config,
            runner,
            reporter,
        }
    }

    /// Run every fixture of `suite` found under its category directory.
    #[tracing::instrument(skip_all, fields(suite = suite.name))]
    pub fn run_suite(&mut self, suite: &SuiteDef) -> HarnessResult<SuiteTally> {
        let dir = self.config.category_dir(suite.category);
        let store = FixtureStore::new(&dir);
        let fixtures = store.discover(&self.config.fixture_suffix)?;
        let pipeline = Pipeline::new(&self.runner, WorkDir::new(&dir), self.config.pipeline_settings());

        info!(fixtures = fixtures.len(), dir = %dir.display(), "running suite");
        self.reporter.on_suite_start(suite.name, fixtures.len());

        let mut tally = SuiteTally::default();
        for fixture in &fixtures {
            let outcome = suite
                .build_case(self.config, &store, fixture)
                .and_then(|case| pipeline.run_case(&case));
            if let Err(err) = &outcome {
                warn!(fixture = fixture.name(), error = %err, "fixture could not be judged");
            }
            tally.record(fixture.name(), &outcome);
            self.reporter.on_fixture_complete(suite.name, fixture.name(), &outcome);

            if self.config.stop_on_fail && is_failure(&outcome) {
                break;
            }
        }

        self.reporter.on_suite_complete(suite.name, &tally);
        Ok(tally)
    }

    /// Run the compiler command-line checks as a suite of their own.
    pub fn run_cli_checks(&mut self) -> SuiteTally {
        let dir = self.config.category_dir("compiler");
        self.reporter.on_suite_start(CLI_SUITE, cli_checks::CHECKS.len());

        let mut tally = SuiteTally::default();
        for check in cli_checks::CHECKS {
            let outcome = check.run(&self.runner, &self.config.compiler, &dir, self.config.timeout);
            tally.record(check.name, &outcome);
            self.reporter.on_fixture_complete(CLI_SUITE, check.name, &outcome);
        }

        self.reporter.on_suite_complete(CLI_SUITE, &tally);
        tally
    }

    /// Run the named suites (all of them when `names` is empty) and finish the report.
    pub fn run_all(&mut self, names: &[String]) -> HarnessResult<RunSummary> {
        let start = Instant::now();
        let mut summary = RunSummary::default();

        for suite in crate::suites::SUITES {
            if selected(names, suite.name) {
                let tally = self.run_suite(suite)?;
                summary.suites.push((suite.name.to_string(), tally));
            }
        }
        if selected(names, CLI_SUITE) {
            let tally = self.run_cli_checks();
            summary.suites.push((CLI_SUITE.to_string(), tally));
        }

        summary.duration = start.elapsed();
        self.reporter.on_run_complete(&summary);
        Ok(summary)
    }
}

fn selected(names: &[String], suite: &str) -> bool {
    names.is_empty() || names.iter().any(|n| n == suite)
}

fn is_failure(outcome: &HarnessResult<TestResult>) -> bool {
    match outcome {
        Ok(result) => result.has_failed() || result.has_timed_out(),
        Err(_) => true,
    }
}
