//! VCS command execution abstraction

use async_trait::async_trait;
use prerun_core::{PrerunError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::{Arc, Mutex};
use tokio::process::Command;
use tracing::{debug, instrument};

/// Output from a VCS command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
            success: true,
        }
    }

    /// Failed output with the given stderr
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
            success: false,
        }
    }

    /// Turn a non-zero exit into `CommandFailed`
    pub fn into_checked(self, program: &Path, args: &[&str]) -> Result<Self> {
        if self.success {
            return Ok(self);
        }

        let stderr = self.stderr.trim();
        let stdout = self.stdout.trim();
        let detail = if !stderr.is_empty() {
            stderr.to_string()
        } else if !stdout.is_empty() {
            stdout.to_string()
        } else {
            match self.exit_code {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            }
        };

        Err(PrerunError::CommandFailed {
            command: render_command(program, args),
            detail,
        })
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
            success: output.status.success(),
        }
    }
}

pub(crate) fn render_command(program: &Path, args: &[&str]) -> String {
    let mut rendered = program.display().to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(arg);
    }
    rendered
}

/// Trait for executing VCS commands (allows mocking in tests)
///
/// A runner is bound to one working directory for its whole life.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Execute `program` with the given arguments in the working directory
    async fn run(&self, program: &Path, args: &[&str]) -> Result<CommandOutput>;
}

/// Builds a runner for a workspace root
pub type RunnerFactory = Arc<dyn Fn(&Path) -> Arc<dyn CommandRunner> + Send + Sync>;

/// Factory producing [`ProcessRunner`]s
pub fn process_runner_factory() -> RunnerFactory {
    Arc::new(|root: &Path| Arc::new(ProcessRunner::new(root)) as Arc<dyn CommandRunner>)
}

/// Real command runner backed by `tokio::process`
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    working_dir: PathBuf,
}

impl ProcessRunner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    #[instrument(skip(self), fields(cwd = %self.working_dir.display()))]
    async fn run(&self, program: &Path, args: &[&str]) -> Result<CommandOutput> {
        debug!("Executing {}", render_command(program, args));

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.working_dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| PrerunError::CommandSpawn {
                program: program.display().to_string(),
                source,
            })?;

        let output = CommandOutput::from(output);

        if !output.success {
            debug!("Command failed: {}", output.stderr.trim());
        }

        Ok(output)
    }
}

/// Mock command runner for testing
///
/// Responses are keyed by the arguments joined with single spaces; the
/// program name is not part of the key. Every call is recorded.
#[derive(Clone, Default)]
pub struct MockCommandRunner {
    responses: HashMap<String, CommandOutput>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, command: &str, output: CommandOutput) -> Self {
        self.responses.insert(command.to_string(), output);
        self
    }

    /// Shortcut for a successful response
    pub fn with_stdout(self, command: &str, stdout: &str) -> Self {
        self.with_response(command, CommandOutput::ok(stdout))
    }

    /// Argument strings of every call made so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CommandRunner for MockCommandRunner {
    async fn run(&self, program: &Path, args: &[&str]) -> Result<CommandOutput> {
        let key = args.join(" ");
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(key.clone());
        }
        self.responses
            .get(&key)
            .cloned()
            .ok_or_else(|| PrerunError::CommandSpawn {
                program: program.display().to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no mock response for: {}", key),
                ),
            })
    }
}
