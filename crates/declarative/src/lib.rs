//! # Declarative
//!
//! A framework for declarative resource management.
//!
//! This crate provides the core abstractions for declaring desired state,
//! detecting current state, and converging systems to match the desired state.
//!
//! ## Core Concepts
//!
//! - **Resource**: A declared object plus the hooks that reconcile it
//!   (`exists`, `create`, `destroy`, `sync_property`, `flush`)
//! - **ResourceDiff**: Observed vs declared ensure state and changed properties
//! - **ExecutionPlan**: Resources ordered by priority
//! - **Executor**: Drives the hooks for every resource with a difference
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ExecuteOptions, ExecutionPlan, execute_simple};
//!
//! let mut plan = ExecutionPlan::new();
//! plan.add_resource(Box::new(Setting::new("stonith-enabled", "false")));
//!
//! let summary = execute_simple(plan, &mut store, &ExecuteOptions::default())?;
//! println!("{} changes", summary.total_changes());
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use diff::{DiffSummary, ResourceDiff, compute_diffs, group_by_type};
pub use executor::{execute, execute_simple};
pub use planner::ExecutionPlan;
pub use resource::{BoxedResource, Resource};
pub use types::{ApplyResult, Ensure, ExecuteOptions, ExecuteSummary, PropertyChange};

#[cfg(test)]
pub(crate) mod testing {
    //! A resource that records its hook calls.

    use crate::resource::{BoxedResource, Resource};
    use crate::types::{Ensure, PropertyChange};
    use anyhow::{Result, bail};

    #[derive(Debug, Default)]
    pub struct Journal {
        pub calls: Vec<String>,
        pub fail_exists: bool,
        pub fail_flush: bool,
    }

    #[derive(Debug)]
    pub struct JournalResource {
        id: String,
        current: Ensure,
        desired: Ensure,
        changed: Vec<&'static str>,
        priority: u32,
    }

    impl Journal {
        pub fn resource(
            id: &str,
            current: Ensure,
            desired: Ensure,
            changed: &[&'static str],
        ) -> BoxedResource<Journal> {
            Box::new(JournalResource {
                id: id.to_string(),
                current,
                desired,
                changed: changed.to_vec(),
                priority: 100,
            })
        }

        pub fn resource_with_priority(id: &str, priority: u32) -> BoxedResource<Journal> {
            Box::new(JournalResource {
                id: id.to_string(),
                current: Ensure::Present,
                desired: Ensure::Present,
                changed: Vec::new(),
                priority,
            })
        }
    }

    impl Resource<Journal> for JournalResource {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn description(&self) -> String {
            format!("Test resource {}", self.id)
        }

        fn resource_type(&self) -> &'static str {
            "test"
        }

        fn desired_ensure(&self) -> Ensure {
            self.desired
        }

        fn exists(&mut self, journal: &mut Journal) -> Result<bool> {
            journal.calls.push(format!("exists {}", self.id));
            if journal.fail_exists {
                bail!("cluster unreachable");
            }
            Ok(self.current.is_present())
        }

        fn create(&mut self, journal: &mut Journal) -> Result<()> {
            journal.calls.push(format!("create {}", self.id));
            Ok(())
        }

        fn destroy(&mut self, journal: &mut Journal) -> Result<()> {
            journal.calls.push(format!("destroy {}", self.id));
            Ok(())
        }

        fn property_diffs(&self) -> Vec<PropertyChange> {
            self.changed
                .iter()
                .map(|name| PropertyChange::new(*name, Some("old".into()), "new"))
                .collect()
        }

        fn sync_property(&mut self, name: &str, journal: &mut Journal) -> Result<()> {
            journal.calls.push(format!("sync {} {name}", self.id));
            Ok(())
        }

        fn flush(&mut self, journal: &mut Journal) -> Result<()> {
            journal.calls.push(format!("flush {}", self.id));
            if journal.fail_flush {
                bail!("flush failed");
            }
            Ok(())
        }

        fn priority(&self) -> u32 {
            self.priority
        }
    }
}
