//! External command execution.
//!
//! Every command runs through a [`ProcessExecutor`] with an explicit working
//! directory, so nothing in this crate changes the process-wide current
//! directory. [`ShellExecutor`] is the real implementation: it hands the
//! command line to `sh -c`, captures output, and kills the child when the
//! configured timeout expires.
//!
//! # Example
//!
//! ```rust,ignore
//! use sam_deployer::process::{run_checked, ShellExecutor};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! let executor = ShellExecutor::new(Duration::from_secs(60));
//! run_checked(&executor, "zip -r fnA.zip .", Path::new("lambdas/fnA/dist"))?;
//! ```

use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::ExternalCommandError;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Result of a command that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs a shell command line in a given directory.
///
/// Implementations return `Ok` for any command that ran to completion,
/// whatever its exit code; only failures to start or timeouts are `Err`.
pub trait ProcessExecutor {
    fn execute(
        &self,
        command: &str,
        working_dir: &Path,
    ) -> Result<CommandOutput, ExternalCommandError>;
}

impl<E: ProcessExecutor + ?Sized> ProcessExecutor for &E {
    fn execute(
        &self,
        command: &str,
        working_dir: &Path,
    ) -> Result<CommandOutput, ExternalCommandError> {
        (**self).execute(command, working_dir)
    }
}

/// Executes commands with `sh -c`, enforcing a wall-clock timeout.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    timeout: Duration,
}

impl ShellExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl ProcessExecutor for ShellExecutor {
    fn execute(
        &self,
        command: &str,
        working_dir: &Path,
    ) -> Result<CommandOutput, ExternalCommandError> {
        debug!(command, dir = %working_dir.display(), "running");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|cause| ExternalCommandError::Spawn {
                command: command.to_string(),
                working_dir: working_dir.to_path_buf(),
                cause,
            })?;

        // Drain both pipes on their own threads so a chatty child can't
        // block on a full pipe while we poll for its exit.
        let (tx, rx) = mpsc::channel();
        if let Some(pipe) = child.stdout.take() {
            spawn_reader(Stream::Stdout, pipe, tx.clone());
        }
        if let Some(pipe) = child.stderr.take() {
            spawn_reader(Stream::Stderr, pipe, tx.clone());
        }
        drop(tx);

        let timed_out = || ExternalCommandError::TimedOut {
            command: command.to_string(),
            working_dir: working_dir.to_path_buf(),
            timeout: self.timeout,
        };

        let deadline = Instant::now() + self.timeout;
        let status: ExitStatus = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(cause) => {
                    let _ = child.kill();
                    return Err(ExternalCommandError::Spawn {
                        command: command.to_string(),
                        working_dir: working_dir.to_path_buf(),
                        cause,
                    });
                }
            }

            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(timed_out());
            }
            thread::sleep(POLL_INTERVAL);
        };

        // Background grandchildren can keep the pipes open after `sh`
        // exits; output collection shares the deadline and the readers are
        // abandoned when it passes.
        let (stdout, stderr) = collect_output(&rx, deadline).ok_or_else(timed_out)?;

        let output = CommandOutput {
            code: status.code(),
            stdout,
            stderr,
        };
        debug!(
            command,
            code = ?output.code,
            stdout = output.stdout.trim(),
            stderr = output.stderr.trim(),
            "finished"
        );
        Ok(output)
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn spawn_reader<R: Read + Send + 'static>(stream: Stream, mut pipe: R, tx: Sender<(Stream, String)>) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send((stream, String::from_utf8_lossy(&buf).into_owned()));
    });
}

/// Wait for both readers to finish, or `None` once `deadline` passes.
fn collect_output(rx: &Receiver<(Stream, String)>, deadline: Instant) -> Option<(String, String)> {
    let mut stdout = String::new();
    let mut stderr = String::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((Stream::Stdout, text)) => stdout = text,
            Ok((Stream::Stderr, text)) => stderr = text,
            Err(RecvTimeoutError::Disconnected) => return Some((stdout, stderr)),
            Err(RecvTimeoutError::Timeout) => return None,
        }
    }
}

/// Run a command and turn a nonzero exit into an error.
pub fn run_checked(
    executor: &dyn ProcessExecutor,
    command: &str,
    working_dir: &Path,
) -> Result<CommandOutput, ExternalCommandError> {
    let output = executor.execute(command, working_dir)?;
    if output.success() {
        return Ok(output);
    }
    Err(ExternalCommandError::NonZeroExit {
        command: command.to_string(),
        working_dir: working_dir.to_path_buf(),
        code: output.code,
        stderr: output.stderr,
    })
}

/// Quote a value for inclusion in a `sh` command line.
///
/// Values made only of `[A-Za-z0-9._/-]` pass through untouched.
pub fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-'));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// Substitute `{name}` placeholders in a command template.
///
/// Values are shell-quoted and inserted in a single pass, so a value that
/// itself looks like a placeholder is never expanded. Unknown placeholders
/// are left as-is.
pub fn render_command(template: &str, vars: &[(&str, &str)]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let known = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(var, _)| *var == name)
                .map(|(_, value)| (close, *value))
        });
        match known {
            Some((close, value)) => {
                rendered.push_str(&shell_quote(value));
                rest = &after[close + 1..];
            }
            None => {
                rendered.push('{');
                rest = after;
            }
        }
    }
    rendered.push_str(rest);
    rendered
}

/// First word of a command template, i.e. the program it runs.
pub fn command_program(template: &str) -> Option<&str> {
    template.split_whitespace().next()
}
