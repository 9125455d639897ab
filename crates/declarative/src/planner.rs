//! Execution planner - builds resource execution plans

use crate::resource::{BoxedResource, Resource};

/// An execution plan: resources in the order they will be applied
pub struct ExecutionPlan<C> {
    /// Resources, kept sorted by priority
    pub resources: Vec<BoxedResource<C>>,
}

impl<C> ExecutionPlan<C> {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self {
            resources: Vec::new(),
        }
    }

    /// Add a resource, keeping the plan ordered by priority
    ///
    /// Resources of equal priority keep their insertion order.
    pub fn add_resource(&mut self, resource: BoxedResource<C>) {
        let position = self
            .resources
            .partition_point(|r| r.priority() <= resource.priority());
        self.resources.insert(position, resource);
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource<C>) -> bool,
    {
        Self {
            resources: self
                .resources
                .into_iter()
                .filter(|r| predicate(r.as_ref()))
                .collect(),
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type" or "type.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.filter(|r| matches_filter(r, resource_type.as_deref(), name.as_deref()))
            }
        }
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.resources.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl<C> Default for ExecutionPlan<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> FromIterator<BoxedResource<C>> for ExecutionPlan<C> {
    fn from_iter<I: IntoIterator<Item = BoxedResource<C>>>(iter: I) -> Self {
        let mut plan = Self::new();
        for resource in iter {
            plan.add_resource(resource);
        }
        plan
    }
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((resource_type, name)) if !name.contains('.') => {
            (Some(resource_type.to_string()), Some(name.to_string()))
        }
        Some(_) => (None, Some(target.to_string())),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter<C>(
    resource: &dyn Resource<C>,
    resource_type: Option<&str>,
    name: Option<&str>,
) -> bool {
    if let Some(rt) = resource_type {
        // Allow common aliases
        let matches_type = match rt {
            "orders" | "order" => resource.resource_type() == "pcmk_order",
            "colocations" | "colocation" => resource.resource_type() == "pcmk_colocation",
            "properties" | "property" => resource.resource_type() == "pcmk_property",
            "constraints" => {
                matches!(resource.resource_type(), "pcmk_order" | "pcmk_colocation")
            }
            _ => resource.resource_type() == rt,
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name
        && !resource.id().contains(n)
    {
        return false;
    }

    true
}
