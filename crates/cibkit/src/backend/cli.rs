//! Real command runner.

use super::{CommandRunner, Invocation};
use crate::error::{Error, Result};
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Runs the cluster tools as child processes.
#[derive(Debug, Clone)]
pub struct CliRunner {
    default_timeout: Duration,
}

impl Default for CliRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CliRunner {
    /// Create a runner with a 60 second default deadline.
    pub fn new() -> Self {
        Self {
            default_timeout: Duration::from_secs(60),
        }
    }

    /// Set the deadline used for invocations that carry none.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    fn execute(&self, program: &str, invocation: &Invocation) -> Result<String> {
        let command = invocation.command_line();
        let timeout = invocation.timeout.unwrap_or(self.default_timeout);
        log::trace!("Running: {command}");

        let mut child = Command::new(program)
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::CommandFailed {
                command: command.clone(),
                stderr: e.to_string(),
                status: None,
            })?;

        // A full CIB dump does not fit in the pipe buffer
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let Some(status) = child.wait_timeout(timeout)? else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Timeout { command, timeout });
        };

        let stdout = collect(stdout);
        if status.success() {
            Ok(stdout)
        } else {
            Err(Error::CommandFailed {
                command,
                stderr: collect(stderr).trim().to_string(),
                status: status.code(),
            })
        }
    }
}

impl CommandRunner for CliRunner {
    fn run(&self, invocation: &Invocation) -> Result<String> {
        self.execute(invocation.tool.binary(), invocation)
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = reader.read_to_end(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Tool;

    fn shell(script: &str) -> Invocation {
        Invocation::new(Tool::Cibadmin, ["-c", script])
    }

    #[test]
    fn test_stdout_is_returned() {
        let runner = CliRunner::new();
        let output = runner.execute("sh", &shell("echo '<cib/>'")).unwrap();
        assert_eq!(output.trim(), "<cib/>");
    }

    #[test]
    fn test_environment_is_passed() {
        let runner = CliRunner::new();
        let invocation = shell("echo $CIB_shadow").with_env("CIB_shadow", "staging");
        let output = runner.execute("sh", &invocation).unwrap();
        assert_eq!(output.trim(), "staging");
    }

    #[test]
    fn test_non_zero_exit_is_command_failure() {
        let runner = CliRunner::new();
        let err = runner
            .execute("sh", &shell("echo 'Signon failed' >&2; exit 107"))
            .unwrap_err();

        match err {
            Error::CommandFailed { stderr, status, .. } => {
                assert_eq!(stderr, "Signon failed");
                assert_eq!(status, Some(107));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_deadline_kills_the_child() {
        let runner = CliRunner::new();
        let invocation = shell("sleep 5").with_timeout(Duration::from_millis(100));
        let err = runner.execute("sh", &invocation).unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_missing_program_is_command_failure() {
        let runner = CliRunner::new();
        let err = runner
            .execute("pcmkctl-no-such-tool", &shell("true"))
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { status: None, .. }));
    }
}
