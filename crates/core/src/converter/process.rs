//! Bounded invocation of external engine processes.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::error::ConverterError;
use super::strategy::Attempt;

/// One command line for an external engine.
#[derive(Debug, Clone)]
pub struct EngineCommand {
    engine: String,
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
    absent_exit_code: Option<i32>,
}

impl EngineCommand {
    pub fn new(engine: impl Into<String>, program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            engine: engine.into(),
            program: program.into(),
            args: Vec::new(),
            timeout,
            absent_exit_code: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Exit code the program uses to say the engine behind it is unavailable.
    ///
    /// Lets wrapper programs (a shell driving an automation server, say)
    /// report absence instead of failure.
    pub fn absent_on_exit_code(mut self, code: i32) -> Self {
        self.absent_exit_code = Some(code);
        self
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn argv(&self) -> &[OsString] {
        &self.args
    }

    /// Runs the command to completion or until the timeout elapses.
    ///
    /// A missing program is reported as [`Attempt::Absent`]; a non-zero
    /// exit or timeout is [`Attempt::Failed`]. On timeout the child is
    /// killed.
    pub async fn run(&self) -> Attempt<Output> {
        let start = Instant::now();
        debug!(engine = %self.engine, program = %self.program.display(), args = ?self.args, "Spawning engine");

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Attempt::Absent {
                    engine: self.engine.clone(),
                    reason: format!("{} not found", self.program.display()),
                };
            }
            Err(e) => {
                return Attempt::Failed(ConverterError::engine_failed(
                    &self.engine,
                    format!("could not be started: {}", e),
                    None,
                ));
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Attempt::Failed(ConverterError::Io(e)),
            Err(_) => {
                warn!(engine = %self.engine, timeout_secs = self.timeout.as_secs(), "Engine timed out, killed");
                return Attempt::Failed(ConverterError::Timeout {
                    engine: self.engine.clone(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        debug!(
            engine = %self.engine,
            status = %output.status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Engine exited"
        );

        if output.status.success() {
            return Attempt::Succeeded(output);
        }

        if self.absent_exit_code.is_some() && output.status.code() == self.absent_exit_code {
            return Attempt::Absent {
                engine: self.engine.clone(),
                reason: "engine reported it is not available".to_string(),
            };
        }

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let reason = match last_meaningful_line(&stderr) {
            Some(line) => format!("exited with {}: {}", output.status, line),
            None => format!("exited with {}", output.status),
        };
        Attempt::Failed(ConverterError::engine_failed(
            &self.engine,
            reason,
            if stderr.is_empty() { None } else { Some(stderr) },
        ))
    }
}

/// The last non-blank line of engine output, where most tools put the cause.
fn last_meaningful_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).rev().find(|l| !l.is_empty())
}
