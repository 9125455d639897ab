//! Execution engine - converges resources one at a time

use crate::context::{ConfirmCallback, ProgressCallback};
use crate::diff::ResourceDiff;
use crate::planner::ExecutionPlan;
use crate::resource::Resource;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use anyhow::Result;

/// Execute a plan with the given options and callbacks
///
/// Every resource is checked first; only resources with a difference are
/// applied. Removals run before additions and modifications so that ids
/// freed by a removal can be reused in the same run. A failing resource
/// is recorded as [`ApplyResult::Failed`] and does not stop the others.
///
/// # Arguments
/// * `plan` - The execution plan to run
/// * `ctx` - Context shared by all resources
/// * `opts` - Execution options (dry_run, verbose)
/// * `progress` - Progress callback
/// * `confirm` - Confirmation callback
///
/// # Returns
/// Summary of execution results
pub fn execute<C, P, F>(
    mut plan: ExecutionPlan<C>,
    ctx: &mut C,
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut F,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    F: ConfirmCallback,
{
    let mut summary = ExecuteSummary::default();
    let mut pending = Vec::new();

    for resource in &mut plan.resources {
        match ResourceDiff::from_resource(resource.as_mut(), ctx) {
            Ok(Some(diff)) => pending.push((resource, diff)),
            Ok(None) => {}
            Err(e) => {
                let result = ApplyResult::Failed {
                    error: format!("{e:#}"),
                };
                progress.on_resource_complete(&resource.id(), &result);
                summary.add_result(&result);
            }
        }
    }

    if pending.is_empty() {
        return Ok(summary);
    }

    // Confirm before proceeding (unless dry_run)
    if !opts.dry_run && !confirm.confirm(&format!("Apply {} changes?", pending.len()))? {
        summary.skipped += pending.len();
        return Ok(summary);
    }

    // Stable: priority order is kept within each group
    pending.sort_by_key(|(_, diff)| !diff.is_removal());

    progress.on_batch_start(pending.len());
    for (resource, diff) in pending {
        progress.on_resource_start(&resource.id(), &resource.description());
        let result = if opts.dry_run {
            ApplyResult::Skipped {
                reason: "Dry run".into(),
            }
        } else {
            converge(resource.as_mut(), &diff, ctx)
        };
        if opts.verbose
            && let ApplyResult::Failed { error } = &result
        {
            log::warn!("{} '{}' failed: {error}", diff.resource_type, diff.resource_id);
        }
        progress.on_resource_complete(&resource.id(), &result);
        summary.add_result(&result);
    }
    progress.on_batch_complete();

    Ok(summary)
}

/// Run the hooks that turn one diff into a change
fn converge<C>(resource: &mut dyn Resource<C>, diff: &ResourceDiff, ctx: &mut C) -> ApplyResult {
    run_hooks(resource, diff, ctx).unwrap_or_else(|e| ApplyResult::Failed {
        error: format!("{e:#}"),
    })
}

fn run_hooks<C>(
    resource: &mut dyn Resource<C>,
    diff: &ResourceDiff,
    ctx: &mut C,
) -> Result<ApplyResult> {
    if diff.is_removal() {
        resource.destroy(ctx)?;
        resource.flush(ctx)?;
        return Ok(ApplyResult::Removed);
    }
    if diff.is_addition() {
        resource.create(ctx)?;
        resource.flush(ctx)?;
        return Ok(ApplyResult::Created);
    }
    for change in &diff.changes {
        log::debug!("{} '{}': {change}", diff.resource_type, diff.resource_id);
        resource.sync_property(&change.name, ctx)?;
    }
    resource.flush(ctx)?;
    Ok(ApplyResult::Modified)
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple<C>(
    plan: ExecutionPlan<C>,
    ctx: &mut C,
    opts: &ExecuteOptions,
) -> Result<ExecuteSummary> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, ctx, opts, &mut NoProgress, &mut AutoConfirm)
}
