//! Coverage input preparation.
//!
//! The harness does not produce coverage reports. With coverage enabled it only makes sure the
//! external lcov/genhtml step has what it needs: a fresh test-info directory that receives the
//! per-fixture profile output, the list of fixtures that passed, and the object directory of the
//! instrumented build.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use conformance_core::{HarnessError, HarnessResult};
use tracing::info;

use crate::config::CoverageConfig;

/// List of passed fixtures, one per line.
pub const PASSED_LIST: &str = "passed.list";

/// Path of the instrumented build's object directory.
pub const OBJDIR_FILE: &str = "objdir";

#[derive(Debug)]
pub struct CoverageSession {
    testinfo_dir: PathBuf,
    obj_dir: PathBuf,
}

impl CoverageSession {
    /// Recreate the test-info directory.
    pub fn prepare(config: &CoverageConfig) -> HarnessResult<Self> {
        let dir = &config.testinfo_dir;
        match fs::remove_dir_all(dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(HarnessError::io(dir, e)),
        }
        fs::create_dir_all(dir).map_err(|e| HarnessError::io(dir, e))?;
        info!(dir = %dir.display(), "prepared coverage directory");

        Ok(Self {
            testinfo_dir: dir.clone(),
            obj_dir: config.obj_dir.clone(),
        })
    }

    pub fn testinfo_dir(&self) -> &Path {
        &self.testinfo_dir
    }

    /// Write the hand-off files for the report step. Returns the passed-list path.
    pub fn finish(&self, passed: &[String]) -> HarnessResult<PathBuf> {
        let list = self.testinfo_dir.join(PASSED_LIST);
        let mut contents = passed.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        fs::write(&list, contents).map_err(|e| HarnessError::io(&list, e))?;

        let objdir = self.testinfo_dir.join(OBJDIR_FILE);
        fs::write(&objdir, format!("{}\n", self.obj_dir.display())).map_err(|e| HarnessError::io(&objdir, e))?;

        Ok(list)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_recreates_directory_and_finish_writes_inputs() {
        let root = std::env::temp_dir().join(format!("conformance_coverage_{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        let config = CoverageConfig {
            enabled: true,
            obj_dir: root.join("obj/gcov"),
            testinfo_dir: root.join("testinfo"),
        };
        fs::create_dir_all(&config.testinfo_dir).unwrap();
        fs::write(config.testinfo_dir.join("stale.info"), "old").unwrap();

        let session = CoverageSession::prepare(&config).unwrap();
        assert!(session.testinfo_dir().is_dir());
        assert!(!config.testinfo_dir.join("stale.info").exists());

        let list = session
            .finish(&["compiler/add.shtk".to_string(), "parser-json/if.shtk".to_string()])
            .unwrap();
        assert_eq!(
            fs::read_to_string(list).unwrap(),
            "compiler/add.shtk\nparser-json/if.shtk\n"
        );
        let objdir = fs::read_to_string(config.testinfo_dir.join(OBJDIR_FILE)).unwrap();
        assert_eq!(objdir.trim_end(), root.join("obj/gcov").display().to_string());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_finish_with_no_passes_writes_empty_list() {
        let root = std::env::temp_dir().join(format!("conformance_coverage_empty_{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        let config = CoverageConfig {
            enabled: true,
            obj_dir: root.join("obj"),
            testinfo_dir: root.join("testinfo"),
        };

        let session = CoverageSession::prepare(&config).unwrap();
        let list = session.finish(&[]).unwrap();
        assert_eq!(fs::read_to_string(list).unwrap(), "");

        let _ = fs::remove_dir_all(&root);
    }
}
