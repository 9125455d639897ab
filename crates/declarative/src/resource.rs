//! Resource trait for declarative state management
//!
//! A Resource is one declared object plus the provider hooks that
//! reconcile it. The executor drives the hooks in a fixed order:
//! `exists` first, then `create`, `destroy` or one `sync_property` per
//! changed property, and `flush` last.

use crate::types::{Ensure, PropertyChange};
use anyhow::Result;
use std::fmt;

/// Core trait for declarative resources
///
/// `C` is the context shared by every resource of one run (for a
/// cluster, the cached configuration and the command runner).
///
/// # Example
///
/// ```ignore
/// use declarative::{Ensure, PropertyChange, Resource};
///
/// #[derive(Debug)]
/// struct Setting { name: String, value: String, observed: Option<String> }
///
/// impl Resource<Store> for Setting {
///     fn id(&self) -> String { self.name.clone() }
///     fn description(&self) -> String { format!("Set {} to {}", self.name, self.value) }
///     fn resource_type(&self) -> &'static str { "setting" }
///     fn desired_ensure(&self) -> Ensure { Ensure::Present }
///
///     fn exists(&mut self, store: &mut Store) -> anyhow::Result<bool> {
///         self.observed = store.get(&self.name);
///         Ok(self.observed.is_some())
///     }
///
///     fn create(&mut self, store: &mut Store) -> anyhow::Result<()> {
///         store.set(&self.name, &self.value)
///     }
///
///     fn destroy(&mut self, store: &mut Store) -> anyhow::Result<()> {
///         store.unset(&self.name)
///     }
///
///     fn property_diffs(&self) -> Vec<PropertyChange> {
///         match &self.observed {
///             Some(v) if v == &self.value => vec![],
///             current => vec![PropertyChange::new("value", current.clone(), &self.value)],
///         }
///     }
///
///     fn sync_property(&mut self, _name: &str, store: &mut Store) -> anyhow::Result<()> {
///         store.set(&self.name, &self.value)
///     }
/// }
/// ```
pub trait Resource<C>: fmt::Debug {
    /// Unique identifier for this resource
    ///
    /// This should be stable and uniquely identify the resource
    /// within its type.
    fn id(&self) -> String;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Resource type category
    ///
    /// Used for grouping and filtering (e.g. "pcmk_order").
    fn resource_type(&self) -> &'static str;

    /// Declared ensure state
    fn desired_ensure(&self) -> Ensure;

    /// Check whether the resource currently exists
    ///
    /// Also refreshes whatever observed state later hooks rely on.
    fn exists(&mut self, ctx: &mut C) -> Result<bool>;

    /// Bring a missing resource into existence
    fn create(&mut self, ctx: &mut C) -> Result<()>;

    /// Remove an existing resource
    fn destroy(&mut self, ctx: &mut C) -> Result<()>;

    /// Properties that differ between observed and declared state
    ///
    /// Only meaningful after `exists` returned true.
    fn property_diffs(&self) -> Vec<PropertyChange>;

    /// Assign the declared value of one property
    fn sync_property(&mut self, name: &str, ctx: &mut C) -> Result<()>;

    /// Write any pending change
    ///
    /// Called once after the other hooks of a change have run.
    fn flush(&mut self, _ctx: &mut C) -> Result<()> {
        Ok(())
    }

    /// Execution order; lower values run first
    fn priority(&self) -> u32 {
        100
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource<C> = Box<dyn Resource<C>>;
