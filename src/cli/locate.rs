//! Compiler discovery

use std::env;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::config::BuildType;

/// Overrides discovery when `--compiler` is not given and no build tree is found.
pub const COMPILER_ENV: &str = "SHTKC_COMPILER";

#[derive(Debug, Error, Diagnostic)]
#[error("could not find the {} build of the compiler ({})", .build.as_str(), .build.compiler_path().display())]
#[diagnostic(
    code(conformance::compiler_not_found),
    help("run from the compiler checkout, pass --compiler <PATH>, or set SHTKC_COMPILER")
)]
pub struct CompilerNotFound {
    pub build: BuildType,
}

/// Find `bin/<build>/shtkc` relative to the current directory or the harness executable.
pub fn find_compiler(build: BuildType) -> Result<PathBuf, CompilerNotFound> {
    // Development mode: run from the compiler checkout
    if let Some(found) = candidate_in(Path::new("."), build) {
        return Ok(found);
    }

    // Harness installed inside the checkout (e.g. target/debug/conformance)
    if let Ok(exe_path) = env::current_exe() {
        if let Some(found) = exe_path.ancestors().skip(1).find_map(|dir| candidate_in(dir, build)) {
            return Ok(found);
        }
    }

    if let Ok(path) = env::var(COMPILER_ENV) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Ok(path);
        }
    }

    Err(CompilerNotFound { build })
}

fn candidate_in(base: &Path, build: BuildType) -> Option<PathBuf> {
    let path = base.join(build.compiler_path());
    path.is_file().then_some(path)
}
