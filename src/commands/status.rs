use anyhow::{Context as AnyhowContext, Result};
use cibkit::report;
use colored::Colorize;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context, tag: Option<&str>) -> Result<()> {
    let mut store = ctx.store(None);
    let snapshot = store.fetch().context("Could not read the CIB")?;

    ui::header("Cluster Status");
    ui::kv(
        "Designated controller",
        &snapshot
            .designated_controller()
            .map_or_else(|| "none".yellow().to_string(), str::to_string),
    );
    ui::kv("Nodes", &snapshot.status().nodes.len().to_string());
    if let Some(file) = &ctx.options.cib_file {
        ui::kv("CIB file", &file.display().to_string());
    }

    match report::cluster_debug_report(&store, tag) {
        Some(report) => println!("{report}"),
        None => ui::warn("No report available"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{CIB, context};

    #[test]
    fn test_status_reads_cib_once() {
        let (runner, ctx) = context(CIB);
        run(&ctx, Some("test")).unwrap();
        assert_eq!(runner.call_count(cibkit::backend::Tool::Cibadmin, "-Q"), 1);
    }

    #[test]
    fn test_status_fails_without_cib() {
        let (runner, ctx) = context(CIB);
        runner.clear_cib();
        let err = run(&ctx, None).unwrap_err();
        assert!(err.to_string().contains("Could not read the CIB"));
    }
}
