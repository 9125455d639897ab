//! In-memory runner for tests.

use super::{CommandRunner, Invocation, Tool};
use crate::error::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

#[derive(Debug, Default)]
struct MockState {
    cib: Option<String>,
    queued_cibs: VecDeque<String>,
    responses: HashMap<Tool, VecDeque<std::result::Result<String, String>>>,
    calls: Vec<Invocation>,
    latency: Duration,
}

/// Records every invocation and answers from canned data.
///
/// `cibadmin -Q` is answered from the queued dumps first, then from the
/// configured CIB document (failing when there is none). Other calls pop
/// the next queued response for their tool and succeed with empty output
/// once the queue is empty.
#[derive(Debug, Default)]
pub struct MockRunner {
    state: Mutex<MockState>,
}

impl MockRunner {
    /// Create a runner with no CIB and no queued responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a runner serving `cib` as the dump output.
    pub fn with_cib(cib: impl Into<String>) -> Self {
        let runner = Self::new();
        runner.set_cib(cib);
        runner
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the dump output.
    pub fn set_cib(&self, cib: impl Into<String>) {
        self.state().cib = Some(cib.into());
    }

    /// Serve `cib` for one dump before falling back to the configured one.
    pub fn push_cib(&self, cib: impl Into<String>) {
        self.state().queued_cibs.push_back(cib.into());
    }

    /// Make subsequent dumps fail.
    pub fn clear_cib(&self) {
        self.state().cib = None;
    }

    /// Queue a successful output for the next call of `tool`.
    pub fn push_ok(&self, tool: Tool, output: impl Into<String>) {
        self.state()
            .responses
            .entry(tool)
            .or_default()
            .push_back(Ok(output.into()));
    }

    /// Queue a failure for the next call of `tool`.
    pub fn push_err(&self, tool: Tool, stderr: impl Into<String>) {
        self.state()
            .responses
            .entry(tool)
            .or_default()
            .push_back(Err(stderr.into()));
    }

    /// Make every call take at least `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = latency;
    }

    /// Every invocation seen so far.
    pub fn calls(&self) -> Vec<Invocation> {
        self.state().calls.clone()
    }

    /// Invocations that change cluster state.
    pub fn mutations(&self) -> Vec<Invocation> {
        self.calls().into_iter().filter(Invocation::is_mutation).collect()
    }

    /// Number of calls of `tool` carrying `flag`.
    pub fn call_count(&self, tool: Tool, flag: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.tool == tool && call.has_flag(flag))
            .count()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, invocation: &Invocation) -> Result<String> {
        let latency = self.state().latency;
        if !latency.is_zero() {
            thread::sleep(latency);
        }
        let mut state = self.state();
        state.calls.push(invocation.clone());
        let command = invocation.command_line();

        if invocation.tool == Tool::Cibadmin && invocation.has_flag("-Q") {
            if let Some(cib) = state.queued_cibs.pop_front() {
                return Ok(cib);
            }
            return state.cib.clone().ok_or_else(|| Error::CommandFailed {
                command,
                stderr: "Could not connect to the CIB: Transport endpoint is not connected"
                    .to_string(),
                status: Some(107),
            });
        }

        match state
            .responses
            .get_mut(&invocation.tool)
            .and_then(VecDeque::pop_front)
        {
            Some(Ok(output)) => Ok(output),
            Some(Err(stderr)) => Err(Error::CommandFailed {
                command,
                stderr,
                status: Some(1),
            }),
            None => Ok(String::new()),
        }
    }
}
