//! The working directory shared by the processes of one fixture run.
//!
//! The compiler drops object files next to where it runs, the linker writes an executable there,
//! and the lowering tool reads and writes its own files there. None of that may leak into the next
//! fixture, so the pipeline cleans the directory before and after every case through
//! [`ArtifactStore::clean`]. Removal is explicit and scoped: only plain files directly inside the
//! root that match the [`ArtifactPolicy`] are touched, and a file that is already gone is fine.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::{HarnessError, HarnessResult};

/// File name of the linked test program.
pub const EXECUTABLE_NAME: &str = "test_executable";

/// Suffix of object files produced by the compiler.
pub const OBJECT_SUFFIX: &str = ".o";

/// Which files in a working directory are artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPolicy {
    /// File-name suffixes (`.o`, `.llc`, ...)
    pub suffixes: Vec<String>,
    /// Exact file names (`test_executable`)
    pub files: Vec<String>,
}

impl Default for ArtifactPolicy {
    fn default() -> Self {
        Self {
            suffixes: vec![OBJECT_SUFFIX.to_string(), ".llc".to_string(), ".llc.s".to_string()],
            files: vec![EXECUTABLE_NAME.to_string()],
        }
    }
}

impl ArtifactPolicy {
    pub fn is_artifact(&self, file_name: &str) -> bool {
        self.files.iter().any(|f| f == file_name) || self.suffixes.iter().any(|s| file_name.ends_with(s.as_str()))
    }
}

/// Filesystem boundary used by the phase pipeline.
pub trait ArtifactStore {
    /// Directory every process of a case runs in.
    fn root(&self) -> &Path;

    /// Remove all artifacts. Missing files are a no-op.
    fn clean(&self) -> HarnessResult<()>;

    /// File names of the object files currently in the directory, sorted.
    fn objects(&self) -> HarnessResult<Vec<String>>;

    /// Write `content` to `file_name` inside the directory.
    fn dump(&self, file_name: &str, content: &str) -> HarnessResult<PathBuf>;

    fn exists(&self, file_name: &str) -> bool;
}

/// A real directory on disk.
#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
    policy: ArtifactPolicy,
}

impl WorkDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            policy: ArtifactPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ArtifactPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &ArtifactPolicy {
        &self.policy
    }

    fn files(&self) -> HarnessResult<Vec<(String, PathBuf)>> {
        let entries = fs::read_dir(&self.root).map_err(|e| HarnessError::io(&self.root, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| HarnessError::io(&self.root, e))?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.push((name.to_string(), path.clone()));
            }
        }
        files.sort();
        Ok(files)
    }
}

impl ArtifactStore for WorkDir {
    fn root(&self) -> &Path {
        &self.root
    }

    fn clean(&self) -> HarnessResult<()> {
        for (name, path) in self.files()? {
            if self.policy.is_artifact(&name) {
                remove_if_exists(&path)?;
            }
        }
        Ok(())
    }

    fn objects(&self) -> HarnessResult<Vec<String>> {
        Ok(self
            .files()?
            .into_iter()
            .map(|(name, _)| name)
            .filter(|name| name.ends_with(OBJECT_SUFFIX))
            .collect())
    }

    fn dump(&self, file_name: &str, content: &str) -> HarnessResult<PathBuf> {
        let path = self.root.join(file_name);
        fs::write(&path, content).map_err(|e| HarnessError::io(&path, e))?;
        Ok(path)
    }

    fn exists(&self, file_name: &str) -> bool {
        self.root.join(file_name).is_file()
    }
}

/// Delete a file, treating "not found" as success.
pub fn remove_if_exists(path: &Path) -> HarnessResult<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed artifact");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to remove artifact");
            Err(HarnessError::io(path, e))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("conformance_workdir_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_policy_matches_suffixes_and_names() {
        let policy = ArtifactPolicy::default();
        assert!(policy.is_artifact("add_test.o"));
        assert!(policy.is_artifact("add_test.shtk.llc"));
        assert!(policy.is_artifact("add_test.shtk.llc.s"));
        assert!(policy.is_artifact("test_executable"));
        assert!(!policy.is_artifact("add_test.shtk"));
        assert!(!policy.is_artifact("README"));
    }

    #[test]
    fn test_clean_removes_only_artifacts() {
        let dir = scratch_dir("clean");
        for name in ["a.o", "b.o", "test_executable", "a.shtk.llc", "a.shtk"] {
            fs::write(dir.join(name), "x").unwrap();
        }
        fs::create_dir_all(dir.join("expected/output")).unwrap();

        let workdir = WorkDir::new(&dir);
        workdir.clean().unwrap();

        assert!(dir.join("a.shtk").exists());
        assert!(dir.join("expected/output").is_dir());
        assert!(!dir.join("a.o").exists());
        assert!(!dir.join("b.o").exists());
        assert!(!dir.join("test_executable").exists());
        assert!(!dir.join("a.shtk.llc").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_clean_on_clean_directory_is_noop() {
        let dir = scratch_dir("noop");
        let workdir = WorkDir::new(&dir);
        workdir.clean().unwrap();
        workdir.clean().unwrap();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_remove_missing_file_is_ok() {
        let dir = scratch_dir("missing");
        remove_if_exists(&dir.join("nope.o")).unwrap();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_remove_failure_is_io_error() {
        // A directory cannot be removed as a file.
        let dir = scratch_dir("remove_dir");
        let err = remove_if_exists(&dir).unwrap_err();
        assert!(matches!(err, HarnessError::Io { ref path, .. } if path == &dir));
        assert!(dir.is_dir());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_objects_are_sorted() {
        let dir = scratch_dir("objects");
        fs::write(dir.join("z.o"), "").unwrap();
        fs::write(dir.join("a.o"), "").unwrap();
        fs::write(dir.join("a.shtk"), "").unwrap();

        let objects = WorkDir::new(&dir).objects().unwrap();
        assert_eq!(objects, vec!["a.o", "z.o"]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_dump_and_exists() {
        let dir = scratch_dir("dump");
        let workdir = WorkDir::new(&dir);
        assert!(!workdir.exists("a.shtk.llc"));
        let path = workdir.dump("a.shtk.llc", "define i32 @main()").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "define i32 @main()");
        assert!(workdir.exists("a.shtk.llc"));
        let _ = fs::remove_dir_all(&dir);
    }
}
