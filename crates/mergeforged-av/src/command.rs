//! Builder for executing external tool commands with timeout and cancellation.
//!
//! Every stage process of a merge is spawned from here and awaited before the
//! next stage starts, so a job never has two live processes.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::BufReader;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::progress::{next_line_lossy, DiagnosticTail, ProgressTracker, TrackerOutput};
use crate::{Error, Result};

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Upper bound on reading leftover diagnostics once the process has exited.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8). Empty for tracked runs.
    pub stdout: String,
    /// Captured standard error, or its tail for tracked runs.
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use mergeforged_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> mergeforged_av::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .stage("probe")
///     .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
///     .arg("/path/to/video.mkv")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    stage: String,
    args: Vec<String>,
    timeout: Duration,
    cancel: CancellationToken,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            stage: "run".to_string(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }

    /// Name of the merge stage, used in errors and logs.
    pub fn stage(&mut self, stage: impl Into<String>) -> &mut Self {
        self.stage = stage.into();
        self
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Kill the process and fail with [`Error::Cancelled`] when `token` fires.
    pub fn cancel_on(&mut self, token: &CancellationToken) -> &mut Self {
        self.cancel = token.clone();
        self
    }

    /// The arguments assembled so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    fn failed(&self, status: Option<ExitStatus>, message: impl Into<String>) -> Error {
        Error::tool_failed(self.program_name(), &self.stage, status, message)
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::tool_not_found(self.program_name())
        } else {
            self.failed(None, format!("failed to spawn: {e}"))
        }
    }

    fn exit_error(&self, status: ExitStatus, tail: &DiagnosticTail) -> Error {
        self.failed(
            Some(status),
            format!("exited with status {}: {}", status, tail.render()),
        )
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if the cancellation token fires (the child is killed).
    /// - [`Error::ToolFailed`] on timeout, non-zero exit (with the stderr
    ///   tail) or spawn failure.
    pub async fn execute(&self) -> Result<ToolOutput> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        tracing::debug!("{}: {} {}", self.stage, self.program.display(), self.args.join(" "));

        let child = self
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // Dropping the wait future drops the child, which kills it.
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            r = tokio::time::timeout(self.timeout, child.wait_with_output()) => r,
        };

        match result {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !output.status.success() {
                    let tail = DiagnosticTail::from_text(&tool_output.stderr);
                    return Err(self.exit_error(output.status, &tail));
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(self.failed(None, format!("I/O error waiting for process: {e}"))),
            Err(_elapsed) => Err(self.failed(None, format!("timed out after {:?}", self.timeout))),
        }
    }

    /// Execute the command while `tracker` follows its stderr.
    ///
    /// The tracker runs as its own task and is stopped as soon as the wait on
    /// the child returns. Leftover stderr is then drained for a bounded time
    /// into the diagnostic tail attached to errors.
    pub async fn execute_tracked(&self, tracker: ProgressTracker) -> Result<ToolOutput> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        tracing::debug!("{}: {} {}", self.stage, self.program.display(), self.args.join(" "));

        let mut child = self
            .command()
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| self.failed(None, "stderr was not captured"))?;

        let stop = CancellationToken::new();
        let progress = tokio::spawn(tracker.run(BufReader::new(stderr), stop.clone()));

        let waited = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            r = tokio::time::timeout(self.timeout, child.wait()) => Some(r),
        };
        stop.cancel();

        let TrackerOutput {
            mut reader,
            mut partial,
            mut tail,
            ..
        } = progress
            .await
            .map_err(|e| self.failed(None, format!("progress task failed: {e}")))?;

        let waited = match waited {
            Some(Ok(waited)) => waited,
            None => {
                let _ = child.kill().await;
                return Err(Error::Cancelled);
            }
            Some(Err(_elapsed)) => {
                let _ = child.kill().await;
                return Err(self.failed(None, format!("timed out after {:?}", self.timeout)));
            }
        };

        let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;
        while let Ok(Ok(Some(line))) =
            tokio::time::timeout_at(deadline, next_line_lossy(&mut reader, &mut partial)).await
        {
            tail.push(&line);
        }

        let status =
            waited.map_err(|e| self.failed(None, format!("I/O error waiting for process: {e}")))?;
        if !status.success() {
            return Err(self.exit_error(status, &tail));
        }

        Ok(ToolOutput {
            status,
            stdout: String::new(),
            stderr: tail.render(),
        })
    }
}

/// Lossy string form of a path for use as a tool argument.
pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
