//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use conformance_core::SystemRunner;
use tracing::info;

use crate::config::HarnessConfig;
use crate::coverage::CoverageSession;
use crate::generator::generate_all;
use crate::runner::{ConsoleReporter, JsonReporter, Reporter, SuiteRunner};
use crate::suites::{CLI_SUITE, SUITES, SuiteKind};

use super::{CliError, CliResult, ExitCode, ReportFormat, TestArgs};

/// Run the selected suites and report. Fails when any fixture failed or timed out.
pub fn run_tests(config: HarnessConfig, args: &TestArgs) -> CliResult<ExitCode> {
    let config = config.with_stop_on_fail(args.stop_on_fail);
    info!(compiler = %config.compiler.display(), tests = %config.tests_root.display(), "starting run");

    let coverage = if config.coverage.enabled {
        Some(CoverageSession::prepare(&config.coverage).map_err(CliError::diagnostic)?)
    } else {
        None
    };

    let mut reporter: Box<dyn Reporter> = match args.format {
        ReportFormat::Console => Box::new(ConsoleReporter::stdout()),
        ReportFormat::Json => Box::new(JsonReporter::new(std::io::stdout())),
    };
    let summary = SuiteRunner::new(&config, SystemRunner, reporter.as_mut())
        .run_all(&args.suites)
        .map_err(CliError::diagnostic)?;

    if let Some(session) = coverage {
        let list = session
            .finish(&summary.passed_fixtures())
            .map_err(CliError::diagnostic)?;
        info!(list = %list.display(), "wrote coverage inputs");
    }

    if summary.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Overwrite golden files with the current compiler's output.
pub fn generate(config: HarnessConfig) -> CliResult<ExitCode> {
    let reports = generate_all(&config, &SystemRunner).map_err(CliError::diagnostic)?;

    for (target, report) in &reports {
        println!(
            "{}/expected/{}: {} written, {} skipped",
            target.category,
            target.kind,
            report.written.len(),
            report.skipped.len()
        );
        for name in &report.skipped {
            println!("  skipped {name}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Print the built-in suites.
pub fn list() -> CliResult<ExitCode> {
    for suite in SUITES {
        let stage = match suite.kind {
            SuiteKind::CompilerOutput { kind, .. } => format!("compare expected/{kind}"),
            SuiteKind::Execute => "link and execute".to_string(),
            SuiteKind::Lowering => "lower with llc".to_string(),
        };
        println!("{:<16} {:<9} {:<16} {stage}", suite.name, suite.category, suite.flag.as_flag());
    }
    println!("{:<16} {:<9} {:<16} compiler command line", CLI_SUITE, "compiler", "");
    Ok(ExitCode::SUCCESS)
}
