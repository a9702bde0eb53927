//! Command runner trait and its `std::process` implementation.

use std::io;
use std::process::{Child, Command, Stdio};

use crate::orchestrator::{StepError, StepResult};

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
    /// Captured stdout (lossy UTF-8).
    pub stdout: String,
    /// Captured stderr (lossy UTF-8).
    pub stderr: String,
}

impl CommandOutput {
    /// Output of a command that exited 0 with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Output of a command that exited with `code` and the given stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the command exited 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// A long-running process started by [`CommandRunner::spawn`].
pub trait ProcessHandle: Send {
    /// OS process id, if known.
    fn id(&self) -> Option<u32>;

    /// Stop the process and reap it.
    fn terminate(&mut self) -> io::Result<()>;
}

/// Runs external programs on behalf of the cleanup steps.
pub trait CommandRunner: Send + Sync {
    /// Run `program` to completion and capture its output.
    ///
    /// `Err` means the program could not be started at all; a non-zero
    /// exit is reported through [`CommandOutput::code`].
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput>;

    /// Start `program` in the background.
    fn spawn(&self, program: &str, args: &[&str]) -> io::Result<Box<dyn ProcessHandle>>;
}

/// [`CommandRunner`] backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCommandRunner;

impl CommandRunner for HostCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        tracing::debug!("Running: {} {}", program, args.join(" "));

        let output = Command::new(program).args(args).output()?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn spawn(&self, program: &str, args: &[&str]) -> io::Result<Box<dyn ProcessHandle>> {
        tracing::debug!("Starting: {} {}", program, args.join(" "));

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(Box::new(HostProcess { child }))
    }
}

/// Background process started by [`HostCommandRunner`].
#[derive(Debug)]
pub struct HostProcess {
    child: Child,
}

impl ProcessHandle for HostProcess {
    fn id(&self) -> Option<u32> {
        Some(self.child.id())
    }

    fn terminate(&mut self) -> io::Result<()> {
        // Already exited on its own.
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }
        self.child.kill()?;
        self.child.wait()?;
        Ok(())
    }
}

/// Run a command and turn spawn failures or non-zero exits into a [`StepError`].
pub fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
) -> StepResult<CommandOutput> {
    let output = runner
        .run(program, args)
        .map_err(|e| StepError::spawn(program, e))?;

    if !output.success() {
        return Err(StepError::command_failed(
            program,
            output.code.unwrap_or(-1),
            output.stderr.trim(),
        ));
    }

    Ok(output)
}
