//! Bounded-time subprocess invocation.
//!
//! Every process the harness starts (compiler, linker, compiled program, lowering tool) goes through
//! a [`ProcessRunner`]. The system implementation spawns exactly one child, waits at most
//! `invocation.timeout`, and either reports the combined output and exit code or kills the child and
//! reports [`ProcessOutcome::TimedOut`]. Partial output of a timed-out child is discarded.
//!
//! The bound covers the output pipes too: a child that exits while a background process it started
//! still holds stdout or stderr open is reported as timed out once the deadline passes.
//!
//! Non-zero exit codes are not errors. The only `Err` a runner returns is for a process that could
//! not be started (or waited on) at all.

use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::errors::{HarnessError, HarnessResult};

/// Wall-clock bound applied to every invocation unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One process to run: program, arguments, working directory, extra environment, timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(OsString, OsString)>,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env.push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Shell-like rendering for logs and diagnostics.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// What happened to one invocation.
///
/// Either the bound elapsed (no output, no code) or the process completed (output and code).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    TimedOut,
    Completed {
        /// stdout followed by stderr
        output: String,
        /// Exit status; a process killed by signal `n` reports `-n`.
        exit_code: i32,
    },
}

impl ProcessOutcome {
    pub fn timed_out(&self) -> bool {
        matches!(self, ProcessOutcome::TimedOut)
    }

    pub fn output(&self) -> Option<&str> {
        match self {
            ProcessOutcome::TimedOut => None,
            ProcessOutcome::Completed { output, .. } => Some(output),
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessOutcome::TimedOut => None,
            ProcessOutcome::Completed { exit_code, .. } => Some(*exit_code),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code() == Some(0)
    }
}

/// Runs invocations.
///
/// The trait is the seam that lets the phase pipeline be exercised without real processes.
pub trait ProcessRunner {
    fn run(&self, invocation: &Invocation) -> HarnessResult<ProcessOutcome>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, invocation: &Invocation) -> HarnessResult<ProcessOutcome> {
        (**self).run(invocation)
    }
}

/// Spawns real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    #[tracing::instrument(skip_all, fields(program = %invocation.program.display()))]
    fn run(&self, invocation: &Invocation) -> HarnessResult<ProcessOutcome> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }

        debug!(command = %invocation.command_line(), timeout = ?invocation.timeout, "spawning");

        let spawn_error = |source: std::io::Error| HarnessError::Spawn {
            program: invocation.program.display().to_string(),
            source,
        };

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(spawn_error)?;

        // Drain both pipes concurrently so a chatty child cannot block on a full pipe.
        let (tx, rx) = mpsc::channel();
        let mut open_pipes = 0;
        if let Some(pipe) = child.stdout.take() {
            spawn_reader(Pipe::Stdout, pipe, tx.clone());
            open_pipes += 1;
        }
        if let Some(pipe) = child.stderr.take() {
            spawn_reader(Pipe::Stderr, pipe, tx.clone());
            open_pipes += 1;
        }
        drop(tx);

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(source) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(spawn_error(source));
                }
            }

            if start.elapsed() >= invocation.timeout {
                let _ = child.kill();
                let _ = child.wait();
                // Reader threads are left detached: a grandchild may still hold the pipes open.
                debug!(elapsed = ?start.elapsed(), "timed out");
                return Ok(ProcessOutcome::TimedOut);
            }

            thread::sleep(POLL_INTERVAL);
        };

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        for _ in 0..open_pipes {
            let remaining = invocation.timeout.saturating_sub(start.elapsed());
            match rx.recv_timeout(remaining) {
                Ok((Pipe::Stdout, bytes)) => stdout = bytes,
                Ok((Pipe::Stderr, bytes)) => stderr = bytes,
                Err(RecvTimeoutError::Timeout) => {
                    debug!(elapsed = ?start.elapsed(), "output still open after exit, timed out");
                    return Ok(ProcessOutcome::TimedOut);
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let mut output = String::from_utf8_lossy(&stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&stderr));
        let exit_code = exit_code(status);

        debug!(exit_code, elapsed = ?start.elapsed(), "completed");
        Ok(ProcessOutcome::Completed { output, exit_code })
    }
}

#[derive(Debug, Clone, Copy)]
enum Pipe {
    Stdout,
    Stderr,
}

/// Reads `pipe` to EOF on its own thread and sends the bytes once the pipe closes.
fn spawn_reader(which: Pipe, mut pipe: impl Read + Send + 'static, tx: mpsc::Sender<(Pipe, Vec<u8>)>) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        // The receiver is gone once the run has timed out.
        let _ = tx.send((which, buf));
    });
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|sig| -sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let inv = Invocation::new("shtkc")
            .arg("add.shtk")
            .arg("-c")
            .current_dir("tests/compiler")
            .env("GMON_OUT_PREFIX", "add")
            .timeout(Duration::from_secs(3));
        assert_eq!(inv.command_line(), "shtkc add.shtk -c");
        assert_eq!(inv.cwd.as_deref(), Some(Path::new("tests/compiler")));
        assert_eq!(inv.env.len(), 1);
        assert_eq!(inv.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_default_timeout_is_fifteen_seconds() {
        assert_eq!(Invocation::new("x").timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_outcome_accessors() {
        let done = ProcessOutcome::Completed {
            output: "3\n".to_string(),
            exit_code: 0,
        };
        assert!(done.succeeded());
        assert_eq!(done.output(), Some("3\n"));
        assert!(!done.timed_out());

        let hung = ProcessOutcome::TimedOut;
        assert!(hung.timed_out());
        assert_eq!(hung.output(), None);
        assert_eq!(hung.exit_code(), None);
        assert!(!hung.succeeded());
    }

    #[test]
    fn test_spawn_failure_is_error() {
        let inv = Invocation::new("/nonexistent/definitely-not-a-compiler");
        let err = SystemRunner.run(&inv).unwrap_err();
        assert!(matches!(err, HarnessError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_then_stderr() {
        let inv = Invocation::new("sh").arg("-c").arg("echo err 1>&2; echo out");
        let outcome = SystemRunner.run(&inv).unwrap();
        assert_eq!(
            outcome,
            ProcessOutcome::Completed {
                output: "out\nerr\n".to_string(),
                exit_code: 0
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_an_outcome() {
        let inv = Invocation::new("sh").arg("-c").arg("echo 'syntax error'; exit 1");
        let outcome = SystemRunner.run(&inv).unwrap();
        assert_eq!(outcome.exit_code(), Some(1));
        assert_eq!(outcome.output(), Some("syntax error\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_discards_partial_output() {
        let inv = Invocation::new("sh")
            .arg("-c")
            .arg("echo partial; exec sleep 10")
            .timeout(Duration::from_millis(300));
        let start = Instant::now();
        let outcome = SystemRunner.run(&inv).unwrap();
        assert_eq!(outcome, ProcessOutcome::TimedOut);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn test_background_process_holding_pipes_times_out() {
        // The shell exits at once; the backgrounded sleep keeps stdout open.
        let inv = Invocation::new("sh")
            .arg("-c")
            .arg("sleep 6 & echo hi")
            .timeout(Duration::from_millis(500));
        let start = Instant::now();
        let outcome = SystemRunner.run(&inv).unwrap();
        assert_eq!(outcome, ProcessOutcome::TimedOut);
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_env_and_cwd_are_applied() {
        let dir = std::env::temp_dir();
        let inv = Invocation::new("sh")
            .arg("-c")
            .arg("printf '%s' \"$GMON_OUT_PREFIX\"")
            .env("GMON_OUT_PREFIX", "add.shtk")
            .current_dir(&dir);
        let outcome = SystemRunner.run(&inv).unwrap();
        assert_eq!(outcome.output(), Some("add.shtk"));
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_exit_is_negative() {
        let inv = Invocation::new("sh").arg("-c").arg("kill -9 $$");
        let outcome = SystemRunner.run(&inv).unwrap();
        assert_eq!(outcome.exit_code(), Some(-9));
    }
}
