//! Command boundary to the cluster manager's CLI tools.
//!
//! The [`CommandRunner`] trait is the only way the crate talks to the
//! cluster, allowing for different implementations:
//! - [`cli::CliRunner`] spawns the real tools under a deadline
//! - [`dry_run::DryRunRunner`] logs mutating commands instead of running them
//! - [`mock::MockRunner`] serves canned output for tests

pub mod cli;
pub mod dry_run;
pub mod mock;

use crate::error::Result;
use std::fmt;
use std::time::Duration;

/// Cluster manager command line tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Read and patch the CIB
    Cibadmin,
    /// Node membership queries
    CrmNode,
    /// Primitive control
    CrmResource,
    /// Cluster and node attributes
    CrmAttribute,
}

impl Tool {
    /// Executable name.
    pub fn binary(&self) -> &'static str {
        match self {
            Tool::Cibadmin => "cibadmin",
            Tool::CrmNode => "crm_node",
            Tool::CrmResource => "crm_resource",
            Tool::CrmAttribute => "crm_attribute",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binary())
    }
}

/// One command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Tool to run
    pub tool: Tool,
    /// Positional arguments
    pub args: Vec<String>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
    /// Deadline; the runner's default applies when unset
    pub timeout: Option<Duration>,
}

impl Invocation {
    /// Create an invocation with no extra environment and no deadline.
    pub fn new<I, S>(tool: Tool, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tool,
            args: args.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            timeout: None,
        }
    }

    /// Set the deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Whether `flag` is one of the arguments.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|arg| arg == flag)
    }

    /// The command line as shown in logs and errors.
    pub fn command_line(&self) -> String {
        std::iter::once(self.tool.binary())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether the invocation changes cluster state.
    pub fn is_mutation(&self) -> bool {
        match self.tool {
            Tool::Cibadmin => ["--create", "--delete", "--modify", "--replace"]
                .iter()
                .any(|flag| self.has_flag(flag)),
            Tool::CrmAttribute => self.has_flag("--update") || self.has_flag("--delete"),
            Tool::CrmResource => self.has_flag("--cleanup"),
            Tool::CrmNode => false,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_line())
    }
}

/// Runs cluster commands.
///
/// Returns the command's standard output, or fails with
/// [`Error::CommandFailed`](crate::Error::CommandFailed) /
/// [`Error::Timeout`](crate::Error::Timeout).
pub trait CommandRunner: Send + Sync {
    /// Run one invocation to completion.
    fn run(&self, invocation: &Invocation) -> Result<String>;
}

/// Get the default runner (real cluster CLI).
pub fn default_runner() -> cli::CliRunner {
    cli::CliRunner::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_rendering() {
        let invocation = Invocation::new(
            Tool::CrmAttribute,
            ["-q", "--type", "crm_config", "--query", "--name", "dc-version"],
        );
        assert_eq!(
            invocation.to_string(),
            "crm_attribute -q --type crm_config --query --name dc-version"
        );
        assert!(invocation.has_flag("--query"));
        assert!(!invocation.is_mutation());
    }

    #[test]
    fn test_mutation_detection() {
        let create = Invocation::new(Tool::Cibadmin, ["--force", "--sync-call", "--create"]);
        assert!(create.is_mutation());
        assert!(!Invocation::new(Tool::Cibadmin, ["-Q"]).is_mutation());

        let update = Invocation::new(
            Tool::CrmAttribute,
            ["--type", "crm_config", "--name", "stonith-enabled", "--update", "false"],
        );
        assert!(update.is_mutation());
    }
}
