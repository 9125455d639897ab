use anyhow::{Context as AnyhowContext, Result};
use cibkit::provider::ConstraintProvider;
use cibkit::{CibStore, ConstraintKind};
use colored::Colorize;
use std::collections::BTreeMap;

use crate::Context;
use crate::cli::ListTarget;
use crate::ui;

/// What the CIB holds right now
#[derive(Default)]
pub struct Listing {
    pub orders: Vec<ConstraintProvider>,
    pub colocations: Vec<ConstraintProvider>,
    pub properties: BTreeMap<String, String>,
}

pub fn run(ctx: &Context, target: ListTarget) -> Result<()> {
    let mut store = ctx.store(None);
    let listing = discover(&mut store, target).context("Could not list the CIB")?;

    if matches!(target, ListTarget::Orders | ListTarget::All) {
        print_constraints("Orders", &listing.orders);
    }
    if matches!(target, ListTarget::Colocations | ListTarget::All) {
        print_constraints("Colocations", &listing.colocations);
    }
    if matches!(target, ListTarget::Properties | ListTarget::All) {
        ui::section(&format!("Properties ({})", listing.properties.len()));
        for (name, value) in &listing.properties {
            println!("  {} = {value}", name.bold());
        }
    }
    Ok(())
}

/// Read every object of the requested kinds from one snapshot
pub fn discover(store: &mut CibStore, target: ListTarget) -> cibkit::Result<Listing> {
    let mut listing = Listing::default();
    if matches!(target, ListTarget::Orders | ListTarget::All) {
        listing.orders = ConstraintProvider::instances(store, ConstraintKind::Order)?;
    }
    if matches!(target, ListTarget::Colocations | ListTarget::All) {
        listing.colocations = ConstraintProvider::instances(store, ConstraintKind::Colocation)?;
    }
    if matches!(target, ListTarget::Properties | ListTarget::All) {
        listing.properties = store.cluster_properties()?;
    }
    Ok(listing)
}

fn print_constraints(title: &str, constraints: &[ConstraintProvider]) {
    ui::section(&format!("{title} ({})", constraints.len()));
    if constraints.is_empty() {
        ui::dim("none");
    }
    for constraint in constraints {
        println!(
            "  {} {} {} {}",
            constraint.declared().name.bold(),
            constraint.first().unwrap_or("?"),
            "->".dimmed(),
            constraint.second().unwrap_or("?"),
        );
        ui::dim(&format!("score {}", constraint.score().unwrap_or("?")));
    }
}
