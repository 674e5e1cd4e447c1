//! Built-in suites and golden-file targets.
//!
//! Each suite runs every fixture of one category directory through the phase pipeline with one
//! compiler mode. The category directory doubles as the working directory of every process the
//! suite starts.

use conformance_core::{
    CaseSpec, CompileErrorPolicy, ExpectedSource, ExternalTool, FinalStage, Fixture, FixtureStore, HarnessResult,
    ModeFlag,
};

use crate::config::HarnessConfig;

/// Expected-tree kind holding program output of executed fixtures.
pub const OUTPUT_KIND: &str = "output";

/// How a suite judges its fixtures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteKind {
    /// Compare the compiler's own output with `expected/<kind>/<fixture><extension>`.
    CompilerOutput {
        kind: &'static str,
        extension: &'static str,
    },
    /// Compile to objects, link, run, compare program output.
    Execute,
    /// Dump low-level IR and feed it to the lowering tool; compile errors are skipped.
    Lowering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiteDef {
    pub name: &'static str,
    /// Sub-directory of the tests root
    pub category: &'static str,
    pub flag: ModeFlag,
    pub kind: SuiteKind,
}

/// Every built-in suite, in run order.
pub const SUITES: &[SuiteDef] = &[
    SuiteDef {
        name: "parser-pretty",
        category: "parser",
        flag: ModeFlag::ParseTreeText,
        kind: SuiteKind::CompilerOutput {
            kind: "pretty",
            extension: ".txt",
        },
    },
    SuiteDef {
        name: "parser-json",
        category: "parser",
        flag: ModeFlag::ParseTreeJson,
        kind: SuiteKind::CompilerOutput {
            kind: "json",
            extension: ".json",
        },
    },
    SuiteDef {
        name: "ir-json",
        category: "ir",
        flag: ModeFlag::IntermediateJson,
        kind: SuiteKind::CompilerOutput {
            kind: "json",
            extension: ".json",
        },
    },
    SuiteDef {
        name: "compiler-pretty",
        category: "compiler",
        flag: ModeFlag::IntermediateCodeText,
        kind: SuiteKind::CompilerOutput {
            kind: "pretty",
            extension: ".txt",
        },
    },
    SuiteDef {
        name: "compiler-json",
        category: "compiler",
        flag: ModeFlag::IntermediateCodeJson,
        kind: SuiteKind::CompilerOutput {
            kind: "json",
            extension: ".json",
        },
    },
    SuiteDef {
        name: "compiler",
        category: "compiler",
        flag: ModeFlag::CompileToObject,
        kind: SuiteKind::Execute,
    },
    SuiteDef {
        name: "llc",
        category: "compiler",
        flag: ModeFlag::LowLevelIr,
        kind: SuiteKind::Lowering,
    },
];

/// Name of the pseudo-suite that checks the compiler's own command line.
pub const CLI_SUITE: &str = "cli";

pub fn find_suite(name: &str) -> Option<&'static SuiteDef> {
    SUITES.iter().find(|s| s.name == name)
}

/// All suite names, including the CLI checks.
pub fn suite_names() -> impl Iterator<Item = &'static str> {
    SUITES.iter().map(|s| s.name).chain(std::iter::once(CLI_SUITE))
}

impl SuiteDef {
    /// Where this suite reads expected output from, if it asserts any.
    pub fn expected_source(&self, config: &HarnessConfig) -> Option<ExpectedSource> {
        match self.kind {
            SuiteKind::CompilerOutput { kind, extension } => Some(ExpectedSource::external(kind, extension)),
            SuiteKind::Execute if config.embedded_expectations => Some(ExpectedSource::Embedded {
                marker: config.embedded_marker.clone(),
                prefix_width: config.embedded_prefix_width,
            }),
            SuiteKind::Execute => Some(ExpectedSource::external(OUTPUT_KIND, ".txt")),
            SuiteKind::Lowering => None,
        }
    }

    /// Describe one fixture for the pipeline, loading its expected output.
    pub fn build_case(&self, config: &HarnessConfig, store: &FixtureStore, fixture: &Fixture) -> HarnessResult<CaseSpec> {
        let expected = match self.expected_source(config) {
            Some(source) => Some(store.load_expected(fixture, &source)?),
            None => None,
        };

        let case = CaseSpec::new(fixture.clone(), self.flag);
        let case = match (self.kind, expected) {
            (SuiteKind::CompilerOutput { .. }, Some(expected)) => case.expect(expected),
            // A fixture that must not compile keeps the diagnostic as its expected output.
            (SuiteKind::Execute, Some(expected)) => case
                .then(FinalStage::Execute)
                .on_compile_error(CompileErrorPolicy::Expect(expected.clone()))
                .expect(expected),
            (SuiteKind::Lowering, _) => {
                let dump = format!("{}.llc", fixture.name());
                case.dump_to(dump.clone())
                    .on_compile_error(CompileErrorPolicy::Skip)
                    .then(FinalStage::Tool(ExternalTool::new(&config.lowering_tool).with_args([dump])))
            }
            (_, None) => case,
        };
        Ok(case)
    }
}

/// One golden-file family regenerated by `generate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoldenTarget {
    pub category: &'static str,
    pub kind: &'static str,
    pub extension: &'static str,
    pub flag: ModeFlag,
    /// Persist the output of the linked program instead of the compiler's.
    pub execute: bool,
}

/// Targets in generation order: every compiler-output suite, then program output when asked for.
pub fn golden_targets(config: &HarnessConfig) -> Vec<GoldenTarget> {
    let mut targets: Vec<GoldenTarget> = SUITES
        .iter()
        .filter_map(|suite| match suite.kind {
            SuiteKind::CompilerOutput { kind, extension } => Some(GoldenTarget {
                category: suite.category,
                kind,
                extension,
                flag: suite.flag,
                execute: false,
            }),
            _ => None,
        })
        .collect();

    if config.generate_exec_fixtures && !config.embedded_expectations {
        targets.push(GoldenTarget {
            category: "compiler",
            kind: OUTPUT_KIND,
            extension: ".txt",
            flag: ModeFlag::CompileToObject,
            execute: true,
        });
    }
    targets
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn scratch_category(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("conformance_suites_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_suite_names_are_unique() {
        let names: Vec<_> = suite_names().collect();
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
        assert!(names.contains(&"cli"));
    }

    #[test]
    fn test_find_suite() {
        assert_eq!(find_suite("llc").unwrap().flag, ModeFlag::LowLevelIr);
        assert!(find_suite("nope").is_none());
    }

    #[test]
    fn test_golden_targets_include_exec_only_when_enabled() {
        let config = HarnessConfig::new();
        let targets = golden_targets(&config);
        assert_eq!(targets.len(), 6);
        assert!(targets.last().unwrap().execute);

        let config = HarnessConfig::new().with_exec_fixtures(false);
        assert!(golden_targets(&config).iter().all(|t| !t.execute));

        let config = HarnessConfig::new().with_embedded_expectations(true);
        assert!(golden_targets(&config).iter().all(|t| !t.execute));
    }

    #[test]
    fn test_execute_case_uses_embedded_expectation() {
        let dir = scratch_category("embedded");
        fs::write(dir.join("add_test.shtk"), "# 3\nfn main() {}\n").unwrap();
        let config = HarnessConfig::new().with_embedded_expectations(true);
        let store = FixtureStore::new(&dir);
        let fixture = Fixture::new(dir.join("add_test.shtk")).unwrap();

        let case = find_suite("compiler").unwrap().build_case(&config, &store, &fixture).unwrap();

        assert_eq!(case.expected.as_deref(), Some("3\n"));
        assert_eq!(case.final_stage, FinalStage::Execute);
        assert_eq!(case.on_compile_error, CompileErrorPolicy::Expect("3\n".to_string()));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_execute_case_honors_configured_comment_prefix() {
        let dir = scratch_category("embedded_prefix");
        fs::write(dir.join("add_test.shtk"), "// 3\n// 4\n# not expected\nfn main() {}\n").unwrap();
        let config = HarnessConfig::new()
            .with_embedded_expectations(true)
            .with_embedded_marker("//")
            .with_embedded_prefix_width(3);
        let store = FixtureStore::new(&dir);
        let fixture = Fixture::new(dir.join("add_test.shtk")).unwrap();
        let suite = find_suite("compiler").unwrap();

        assert_eq!(
            suite.expected_source(&config),
            Some(ExpectedSource::Embedded {
                marker: "//".to_string(),
                prefix_width: 3,
            })
        );
        let case = suite.build_case(&config, &store, &fixture).unwrap();
        assert_eq!(case.expected.as_deref(), Some("3\n4\n"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_execute_case_reads_output_tree() {
        let dir = scratch_category("tree");
        fs::write(dir.join("add.shtk"), "fn main() {}\n").unwrap();
        fs::create_dir_all(dir.join("expected/output")).unwrap();
        fs::write(dir.join("expected/output/add.shtk.txt"), "3\n").unwrap();
        let store = FixtureStore::new(&dir);
        let fixture = Fixture::new(dir.join("add.shtk")).unwrap();

        let case = find_suite("compiler")
            .unwrap()
            .build_case(&HarnessConfig::new(), &store, &fixture)
            .unwrap();

        assert_eq!(case.expected.as_deref(), Some("3\n"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_lowering_case_needs_no_expected_file() {
        let dir = scratch_category("llc");
        fs::write(dir.join("a.shtk"), "").unwrap();
        let config = HarnessConfig::new();
        let store = FixtureStore::new(&dir);
        let fixture = Fixture::new(dir.join("a.shtk")).unwrap();

        let case = find_suite("llc").unwrap().build_case(&config, &store, &fixture).unwrap();

        assert_eq!(case.dump_file.as_deref(), Some("a.shtk.llc"));
        assert_eq!(case.on_compile_error, CompileErrorPolicy::Skip);
        assert_eq!(
            case.final_stage,
            FinalStage::Tool(ExternalTool::new("llc").with_args(["a.shtk.llc"]))
        );
        assert!(case.expected.is_none());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_compiler_output_case_missing_golden_is_error() {
        let dir = scratch_category("missing");
        fs::write(dir.join("a.shtk"), "").unwrap();
        let store = FixtureStore::new(&dir);
        let fixture = Fixture::new(dir.join("a.shtk")).unwrap();

        let err = find_suite("parser-json")
            .unwrap()
            .build_case(&HarnessConfig::new(), &store, &fixture)
            .unwrap_err();
        assert!(matches!(err, conformance_core::HarnessError::MissingExpected { .. }));
        let _ = fs::remove_dir_all(&dir);
    }
}
