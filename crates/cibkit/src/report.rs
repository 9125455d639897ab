//! Human-readable cluster state reports.
//!
//! Markers after a node entry:
//! - `(F)` the primitive has failed on this node and is not running there
//! - `(L)` a location constraint pins the primitive to this node
//!
//! and after a primitive name:
//! - `(M)` the primitive is not managed

use crate::cib::CibStore;
use crate::status::{ClusterStatus, PrimitiveStatus};
use std::collections::BTreeMap;

/// Primitive id -> node name -> status.
pub type StatusByNode = BTreeMap<String, BTreeMap<String, Option<PrimitiveStatus>>>;

/// Regroup per-node state by primitive.
pub fn primitives_status_by_node(status: &ClusterStatus) -> StatusByNode {
    let mut report = StatusByNode::new();
    for (node, primitives) in &status.nodes {
        for (primitive, state) in primitives {
            report
                .entry(primitive.clone())
                .or_default()
                .insert(node.clone(), state.status);
        }
    }
    report
}

/// Build the debug report of the cached snapshot.
///
/// Returns `None` until the store has fetched the CIB at least once.
pub fn cluster_debug_report(store: &CibStore, tag: Option<&str>) -> Option<String> {
    let snapshot = store.snapshot()?;
    let status = snapshot.status();
    let at = tag.map(|t| format!(" at '{t}'")).unwrap_or_default();

    let mut lines = vec![String::new(), format!("Pacemaker debug block start{at}")];
    for (primitive, nodes) in primitives_status_by_node(status) {
        let kind = if status.is_multistate(&primitive) {
            "Multistate"
        } else if status.is_clone(&primitive) {
            "Cloned"
        } else {
            "Simple"
        };
        let unmanaged = if status.is_managed(&primitive) { "" } else { " (M)" };
        lines.push(format!("-> {kind} primitive: '{primitive}'{unmanaged}"));

        let full_name = status.full_name(&primitive);
        let blocks: Vec<String> = nodes
            .iter()
            .map(|(node, node_status)| {
                let mut block = format!(
                    "{node}: {}",
                    node_status.map_or_else(|| "?".to_string(), |s| s.to_string().to_uppercase())
                );
                if status.primitive_has_failures(&primitive, Some(node.as_str()))
                    && status.primitive_is_running(&primitive, Some(node.as_str())) != Some(true)
                {
                    block.push_str(" (F)");
                }
                if status.location_exists(full_name, node) {
                    block.push_str(" (L)");
                }
                block
            })
            .collect();
        lines.push(format!("   {}", blocks.join(" | ")));
    }

    for property in &store.options().debug_show_properties {
        if let Some(value) = status.property_value(property) {
            lines.push(format!("* {property}: {value}"));
        }
    }
    lines.push(format!("Pacemaker debug block end{at}"));
    lines.push(String::new());
    Some(lines.join("\n"))
}

/// Log the debug report at debug level, if one is available.
pub fn log_debug_report(store: &CibStore, tag: &str) {
    if let Some(report) = cluster_debug_report(store, Some(tag)) {
        log::debug!("{report}");
    }
}
