//! Runner that only reports what it would do.

use super::{CommandRunner, Invocation};
use crate::error::Result;

/// Logs mutating commands instead of running them.
///
/// Never used for reads: every call returns empty output.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run(&self, invocation: &Invocation) -> Result<String> {
        log::debug!("Would run: {invocation}");
        Ok(String::new())
    }
}
