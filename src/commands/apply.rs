//! Diff and apply a manifest of declared constraints and properties.

use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use declarative::{
    AutoConfirm, ConfirmCallback, DiffSummary, ExecuteOptions, ExecuteSummary, ResourceDiff,
    compute_diffs, execute, group_by_type,
};
use std::path::Path;

use crate::Context;
use crate::config::Manifest;
use crate::progress::ApplyProgress;
use crate::ui;

/// Asks on the terminal before changing the cluster
struct DialoguerConfirm;

impl ConfirmCallback for DialoguerConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()
            .context("Failed to read confirmation")
    }
}

/// Show what apply would change
pub fn diff(ctx: &Context, path: &Path, target: Option<&str>) -> Result<()> {
    let manifest = Manifest::load(path)?;
    let diffs = plan_diffs(ctx, &manifest, target)?;

    if !ctx.quiet {
        ui::header("Cluster Diff");
    }
    print_diffs(&diffs);

    let summary = DiffSummary::from_diffs(&diffs);
    if summary.has_changes() {
        println!(
            "\n  {} to add, {} to change, {} to remove",
            summary.additions.to_string().green(),
            summary.modifications.to_string().yellow(),
            summary.removals.to_string().red()
        );
    } else {
        ui::success("Cluster matches the manifest");
    }
    Ok(())
}

/// Make the cluster match a manifest
pub fn apply(ctx: &Context, path: &Path, target: Option<&str>, dry_run: bool, yes: bool) -> Result<()> {
    let manifest = Manifest::load(path)?;
    if manifest.is_empty() {
        ui::warn(&format!("Nothing declared in {}", path.display()));
        return Ok(());
    }

    if !ctx.quiet {
        ui::header(if dry_run { "Apply (dry run)" } else { "Apply" });
        let diffs = plan_diffs(ctx, &manifest, target)?;
        if diffs.is_empty() {
            ui::success("Cluster matches the manifest");
            return Ok(());
        }
        print_diffs(&diffs);
        println!();
    }

    let summary = if yes || dry_run {
        converge(ctx, &manifest, target, dry_run, &mut AutoConfirm)?
    } else {
        converge(ctx, &manifest, target, dry_run, &mut DialoguerConfirm)?
    };

    ui::print_summary(&summary);
    if dry_run {
        ui::info("Dry run - no changes made");
    }
    if summary.failed > 0 {
        bail!("{} object(s) failed to apply", summary.failed);
    }
    Ok(())
}

/// Differences between the manifest and every CIB it targets
pub fn plan_diffs(ctx: &Context, manifest: &Manifest, target: Option<&str>) -> Result<Vec<ResourceDiff>> {
    let mut diffs = Vec::new();
    for target_plan in manifest.plans()? {
        let mut store = ctx.store(target_plan.cib.as_deref());
        let mut plan = target_plan.plan.filter_by_target(target);
        diffs.extend(compute_diffs(&mut plan.resources, &mut store)?);
    }
    Ok(diffs)
}

/// Run every target plan, one store per CIB
pub fn converge(
    ctx: &Context,
    manifest: &Manifest,
    target: Option<&str>,
    dry_run: bool,
    confirm: &mut impl ConfirmCallback,
) -> Result<ExecuteSummary> {
    let opts = ExecuteOptions {
        dry_run,
        verbose: ctx.verbose > 0,
    };
    let mut summary = ExecuteSummary::default();

    for target_plan in manifest.plans()? {
        let plan = target_plan.plan.filter_by_target(target);
        if plan.is_empty() {
            continue;
        }
        if let Some(cib) = &target_plan.cib {
            log::info!("Applying {} object(s) to shadow CIB '{cib}'", plan.total_resources());
        }
        let mut store = ctx.store(target_plan.cib.as_deref());
        let mut progress = ApplyProgress::default();
        let result = execute(plan, &mut store, &opts, &mut progress, confirm)?;
        summary.merge(&result);
    }
    Ok(summary)
}

fn print_diffs(diffs: &[ResourceDiff]) {
    for (resource_type, group) in group_by_type(diffs) {
        ui::section(&resource_type);
        for diff in group {
            for line in ui::diff_lines(diff) {
                println!("  {line}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{CIB, context};
    use crate::config::ConfigFormat;
    use cibkit::backend::Tool;
    use declarative::AutoDecline;

    const MANIFEST: &str = r#"
[[order]]
name = "vip-before-web"
first = "vip"
second = "webserver"
score = "INFINITY"

[[colocation]]
name = "web-with-vip"
first = "webserver"
second = "vip"

[[property]]
name = "stonith-enabled"
value = "false"
"#;

    fn manifest() -> Manifest {
        Manifest::parse(MANIFEST, ConfigFormat::Toml).unwrap()
    }

    #[test]
    fn test_plan_diffs() {
        let (runner, ctx) = context(CIB);
        let diffs = plan_diffs(&ctx, &manifest(), None).unwrap();
        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(summary.additions, 2);
        assert_eq!(summary.modifications, 1);
        assert!(runner.mutations().is_empty());

        let order = diffs.iter().find(|d| d.resource_id == "vip-before-web").unwrap();
        assert_eq!(order.changes.len(), 1);
        assert_eq!(order.changes[0].name, "score");
    }

    #[test]
    fn test_plan_diffs_with_target() {
        let (_, ctx) = context(CIB);
        let diffs = plan_diffs(&ctx, &manifest(), Some("properties")).unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].resource_id, "stonith-enabled");
    }

    #[test]
    fn test_unreachable_cib_aborts() {
        let (runner, ctx) = context(CIB);
        let ctx = Context::with_runner(0, false, ctx.options.clone(), runner.clone());
        runner.clear_cib();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster.toml");
        std::fs::write(&path, MANIFEST).unwrap();

        let err = plan_diffs(&ctx, &manifest(), None).unwrap_err();
        assert!(format!("{err:#}").contains("Could not check"));
        assert!(diff(&ctx, &path, None).is_err());
        assert!(apply(&ctx, &path, None, false, true).is_err());
        assert!(runner.mutations().is_empty());
    }

    #[test]
    fn test_converge_applies_in_order() {
        let (runner, ctx) = context(CIB);
        let summary = converge(&ctx, &manifest(), None, false, &mut AutoConfirm).unwrap();
        assert_eq!(summary.created, 2);
        assert_eq!(summary.modified, 1);
        assert_eq!(summary.failed, 0);

        let mutations = runner.mutations();
        assert_eq!(mutations.len(), 3);
        assert_eq!(mutations[0].tool, Tool::CrmAttribute);
        assert!(mutations[0].has_flag("--update"));
        assert!(mutations[1].has_flag("--modify"));
        assert!(mutations[2].has_flag("--create"));
    }

    #[test]
    fn test_converge_dry_run() {
        let (runner, ctx) = context(CIB);
        let summary = converge(&ctx, &manifest(), None, true, &mut AutoDecline).unwrap();
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.total_changes(), 0);
        assert!(runner.mutations().is_empty());
    }

    #[test]
    fn test_converge_declined() {
        let (runner, ctx) = context(CIB);
        let summary = converge(&ctx, &manifest(), None, false, &mut AutoDecline).unwrap();
        assert_eq!(summary.skipped, 3);
        assert!(runner.mutations().is_empty());
    }

    #[test]
    fn test_converge_reports_missing_primitive() {
        let (runner, ctx) = context(CIB);
        let content = r#"{"order": [{"name": "ghost-first", "first": "ghost", "second": "vip"}]}"#;
        let manifest = Manifest::parse(content, ConfigFormat::Json).unwrap();
        let summary = converge(&ctx, &manifest, None, false, &mut AutoConfirm).unwrap();
        assert_eq!(summary.failed, 1);
        assert!(runner.mutations().is_empty());
    }
}
