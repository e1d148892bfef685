//! External collaborators
//!
//! Process execution, git and project templates. Everything that leaves the
//! process goes through [`ProcessRunner`] so it can be swapped out in tests.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

pub mod git;
pub mod templates;

/// A command line to run outside the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Exit status of an external command; `None` when killed by a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    pub code: Option<i32>,
}

impl ExitStatus {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external commands. Success is judged by exit status alone.
pub trait ProcessRunner {
    fn run(&self, command: &ExternalCommand) -> io::Result<ExitStatus>;
}

/// Runs commands as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &ExternalCommand) -> io::Result<ExitStatus> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }

        tracing::debug!(command = %command, "running external command");
        let output = cmd.output()?;
        if !output.status.success() {
            tracing::warn!(
                command = %command,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "external command failed"
            );
        }
        Ok(ExitStatus {
            code: output.status.code(),
        })
    }
}
