use colored::{ColoredString, Colorize};
use declarative::{ExecuteSummary, ResourceDiff};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Diffs and summaries
// ============================================================================

/// `+`, `-` or `~` for a diff
pub fn diff_marker(diff: &ResourceDiff) -> ColoredString {
    if diff.is_addition() {
        "+".green().bold()
    } else if diff.is_removal() {
        "-".red().bold()
    } else {
        "~".yellow().bold()
    }
}

/// One line per diff, plus one per changed property
pub fn diff_lines(diff: &ResourceDiff) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {} {}",
        diff_marker(diff),
        diff.resource_id,
        format!("({})", diff.description).dimmed()
    )];
    lines.extend(diff.changes.iter().map(|change| format!("    {change}")));
    lines
}

/// Print the totals of an execution
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Cluster configuration applied", "✓".green().bold());
    } else {
        println!("  {} Cluster configuration applied with errors", "⚠".yellow().bold());
    }

    for (count, label) in [
        (summary.created, "created"),
        (summary.modified, "modified"),
        (summary.removed, "removed"),
        (summary.skipped, "skipped"),
    ] {
        if count > 0 {
            println!("    • {count} {label}");
        }
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Ensure, PropertyChange};

    fn diff(current: Ensure, desired: Ensure, changes: Vec<PropertyChange>) -> ResourceDiff {
        ResourceDiff {
            resource_id: "vip-before-web".to_string(),
            resource_type: "pcmk_order".to_string(),
            description: "Start vip before webserver (INFINITY)".to_string(),
            current,
            desired,
            changes,
        }
    }

    #[test]
    fn test_diff_lines() {
        colored::control::set_override(false);

        let added = diff(Ensure::Absent, Ensure::Present, vec![]);
        assert_eq!(
            diff_lines(&added),
            ["+ vip-before-web (Start vip before webserver (INFINITY))"]
        );

        let changed = diff(
            Ensure::Present,
            Ensure::Present,
            vec![PropertyChange::new("score", Some("100".into()), "INFINITY")],
        );
        let lines = diff_lines(&changed);
        assert!(lines[0].starts_with("~ vip-before-web"));
        assert_eq!(lines[1], "    score: 100 -> INFINITY");

        let removed = diff(Ensure::Present, Ensure::Absent, vec![]);
        assert_eq!(diff_marker(&removed).to_string(), "-");
    }
}
