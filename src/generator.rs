//! Golden-file regeneration.
//!
//! Runs fixtures through the compile phase (or compile + link + execute) without any comparison and
//! overwrites their expected files with whatever the current compiler produces. Fixtures the
//! compiler cannot handle right now (non-zero exit, timeout) are skipped, and so are fixtures the
//! pipeline cannot run at all (a tool that fails to spawn, an unreadable dump). No golden file is
//! ever made up. Existing expected files are never read.

use std::path::PathBuf;

use conformance_core::{
    ArtifactStore, CaseSpec, FinalStage, Fixture, FixtureStore, HarnessResult, Pipeline, ProcessRunner, TestResult,
    WorkDir,
};
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::suites::{GoldenTarget, golden_targets};

/// What one target's regeneration did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub written: Vec<PathBuf>,
    /// Fixtures left alone because the compiler (or program) failed, timed out or could not be run
    pub skipped: Vec<String>,
}

/// Regenerate one target for the given fixtures.
pub fn generate<R, S>(
    pipeline: &Pipeline<R, S>,
    store: &FixtureStore,
    fixtures: &[Fixture],
    target: &GoldenTarget,
) -> HarnessResult<GenerationReport>
where
    R: ProcessRunner,
    S: ArtifactStore,
{
    let mut report = GenerationReport::default();

    for fixture in fixtures {
        let mut case = CaseSpec::new(fixture.clone(), target.flag);
        if target.execute {
            case = case.then(FinalStage::Execute);
        }

        match pipeline.run_case(&case) {
            Ok(TestResult::Passed(output)) => {
                let path = store.write_expected(fixture, target.kind, target.extension, &output)?;
                debug!(path = %path.display(), "wrote golden file");
                report.written.push(path);
            }
            Ok(other) => {
                debug!(fixture = fixture.name(), status = %other.status(), "not regenerated");
                report.skipped.push(fixture.name().to_string());
            }
            Err(err) => {
                warn!(fixture = fixture.name(), error = %err, "could not run fixture, not regenerated");
                report.skipped.push(fixture.name().to_string());
            }
        }
    }

    Ok(report)
}

/// Regenerate every golden target configured for the run.
pub fn generate_all<R: ProcessRunner>(
    config: &HarnessConfig,
    runner: &R,
) -> HarnessResult<Vec<(GoldenTarget, GenerationReport)>> {
    let mut reports = Vec::new();

    for target in golden_targets(config) {
        let dir = config.category_dir(target.category);
        let store = FixtureStore::new(&dir);
        let fixtures = store.discover(&config.fixture_suffix)?;
        let pipeline = Pipeline::new(runner, WorkDir::new(&dir), config.pipeline_settings());

        info!(
            category = target.category,
            kind = target.kind,
            flag = target.flag.as_flag(),
            fixtures = fixtures.len(),
            "regenerating golden files"
        );
        let report = generate(&pipeline, &store, &fixtures, &target)?;
        reports.push((target, report));
    }

    Ok(reports)
}
