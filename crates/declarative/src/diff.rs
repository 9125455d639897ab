//! Diff computation for resources

use crate::resource::{BoxedResource, Resource};
use crate::types::{Ensure, PropertyChange};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A diff between observed and declared state of a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// Observed ensure state
    pub current: Ensure,
    /// Declared ensure state
    pub desired: Ensure,
    /// Changed properties (present -> present only)
    pub changes: Vec<PropertyChange>,
}

impl ResourceDiff {
    /// Create a diff from a resource, returning None if no changes needed
    ///
    /// Runs the resource's `exists` hook, which refreshes its observed state.
    pub fn from_resource<C>(resource: &mut dyn Resource<C>, ctx: &mut C) -> Result<Option<Self>> {
        let current = Ensure::from(resource.exists(ctx)?);
        let desired = resource.desired_ensure();

        let changes = match (current, desired) {
            (Ensure::Present, Ensure::Present) => resource.property_diffs(),
            _ => Vec::new(),
        };
        if current == desired && changes.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            current,
            desired,
            changes,
        }))
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        self.current.is_absent() && self.desired.is_present()
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        self.current.is_present() && self.desired.is_absent()
    }

    /// Check if this diff represents a modification
    pub fn is_modification(&self) -> bool {
        self.current.is_present() && self.desired.is_present() && !self.changes.is_empty()
    }
}

/// Compute diffs for a list of resources
///
/// Returns only resources that have differences between observed and
/// declared state. Fails on the first resource whose state cannot be read.
pub fn compute_diffs<C>(resources: &mut [BoxedResource<C>], ctx: &mut C) -> Result<Vec<ResourceDiff>> {
    let mut diffs = Vec::new();
    for resource in resources.iter_mut() {
        let id = resource.id();
        let resource_type = resource.resource_type();
        let diff = ResourceDiff::from_resource(resource.as_mut(), ctx)
            .with_context(|| format!("Could not check {resource_type} '{id}'"))?;
        diffs.extend(diff);
    }
    Ok(diffs)
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else {
                summary.modifications += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type(diffs: &[ResourceDiff]) -> BTreeMap<String, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<String, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}
