//! Core types for declarative resource management

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a resource should exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    /// Resource exists/is configured
    #[default]
    Present,
    /// Resource does not exist/is not configured
    Absent,
}

impl Ensure {
    /// Check if state represents presence
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present)
    }

    /// Check if state represents absence
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl From<bool> for Ensure {
    fn from(exists: bool) -> Self {
        if exists { Self::Present } else { Self::Absent }
    }
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// A property whose observed value differs from the declared one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyChange {
    /// Property name
    pub name: String,
    /// Observed value, if any
    pub current: Option<String>,
    /// Declared value
    pub desired: String,
}

impl PropertyChange {
    /// Create a change record
    pub fn new(name: impl Into<String>, current: Option<String>, desired: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current,
            desired: desired.into(),
        }
    }
}

impl fmt::Display for PropertyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.current {
            Some(current) => write!(f, "{}: {} -> {}", self.name, current, self.desired),
            None => write!(f, "{}: (unset) -> {}", self.name, self.desired),
        }
    }
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was modified
    Modified,
    /// Resource was removed
    Removed,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Modified | Self::Removed)
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.created + self.modified + self.removed + self.skipped + self.failed + self.no_change
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.modified += other.modified;
        self.removed += other.removed;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.no_change += other.no_change;
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Verbose output
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut summary = ExecuteSummary::default();
        summary.add_result(&ApplyResult::Created);
        summary.add_result(&ApplyResult::Removed);
        summary.add_result(&ApplyResult::Failed {
            error: "primitive 'vip' does not exist".into(),
        });

        assert_eq!(summary.total_changes(), 2);
        assert_eq!(summary.total(), 3);
        assert!(!summary.is_success());

        let mut other = ExecuteSummary::default();
        other.merge(&summary);
        assert_eq!(other.failed, 1);
    }

    #[test]
    fn test_ensure_serde() {
        let ensure: Ensure = serde_json::from_str("\"absent\"").unwrap();
        assert!(ensure.is_absent());
        assert_eq!(Ensure::from(true), Ensure::Present);
        assert_eq!(Ensure::default().to_string(), "present");
    }

    #[test]
    fn test_property_change_display() {
        let change = PropertyChange::new("score", Some("100".into()), "INFINITY");
        assert_eq!(change.to_string(), "score: 100 -> INFINITY");
        let change = PropertyChange::new("value", None, "false");
        assert_eq!(change.to_string(), "value: (unset) -> false");
    }
}
