//! Keyed constraint collections backed by the CIB snapshot.

use super::codec::{self, ConstraintFields};
use crate::cib::{CibStore, Snapshot};
use crate::error::{Error, Result};
use crate::types::{CONSTRAINTS_SCOPE, ConstraintKind};
use std::collections::BTreeMap;

/// Constraints of one kind, keyed by id.
pub type ConstraintMap = BTreeMap<String, ConstraintFields>;

impl Snapshot {
    /// Constraints of one kind, memoized with the snapshot.
    pub fn constraints(&self, kind: ConstraintKind) -> &ConstraintMap {
        let memo = match kind {
            ConstraintKind::Order => &self.orders,
            ConstraintKind::Colocation => &self.colocations,
        };
        memo.get_or_init(|| {
            self.section("configuration/constraints")
                .map(|section| {
                    section
                        .children_named(kind.tag())
                        .filter_map(codec::decode)
                        .filter_map(|(_, fields)| Some((fields.id.clone()?, fields)))
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    /// Tag of the constraints-section element holding `id`, any kind.
    pub fn constraint_tag(&self, id: &str) -> Option<&str> {
        self.section("configuration/constraints")?
            .children
            .iter()
            .find(|element| element.id() == Some(id))
            .map(|element| element.name.as_str())
    }
}

impl CibStore {
    /// All constraints of one kind.
    pub fn all_constraints(&mut self, kind: ConstraintKind) -> Result<ConstraintMap> {
        Ok(self.fetch()?.constraints(kind).clone())
    }

    /// Whether a constraint of this kind exists.
    pub fn constraint_exists(&mut self, kind: ConstraintKind, id: &str) -> Result<bool> {
        Ok(self.fetch()?.constraints(kind).contains_key(id))
    }

    /// Fields of one constraint.
    pub fn constraint(&mut self, kind: ConstraintKind, id: &str) -> Result<Option<ConstraintFields>> {
        Ok(self.fetch()?.constraints(kind).get(id).cloned())
    }

    /// Create a constraint.
    ///
    /// Fails with [`Error::IdConflict`] if another element of the
    /// constraints section already uses the id.
    pub fn constraint_add(&mut self, kind: ConstraintKind, fields: &ConstraintFields) -> Result<()> {
        let xml = patch(kind, fields)?;
        if let Some(id) = &fields.id {
            self.check_id_available(kind, id)?;
        }
        log::debug!("Creating {kind} '{}'", fields.id.as_deref().unwrap_or_default());
        self.create(&xml, Some(CONSTRAINTS_SCOPE))
    }

    /// Replace an existing constraint with the full new element.
    pub fn constraint_modify(&mut self, kind: ConstraintKind, fields: &ConstraintFields) -> Result<()> {
        let xml = patch(kind, fields)?;
        log::debug!("Updating {kind} '{}'", fields.id.as_deref().unwrap_or_default());
        self.modify(&xml, Some(CONSTRAINTS_SCOPE))
    }

    /// Delete a constraint by id.
    pub fn constraint_remove(&mut self, kind: ConstraintKind, id: &str) -> Result<()> {
        let xml = patch_xml(kind, id, &codec::removal_element(kind, id))?;
        log::debug!("Removing {kind} '{id}'");
        self.delete(&xml, Some(CONSTRAINTS_SCOPE))
    }

    fn check_id_available(&mut self, kind: ConstraintKind, id: &str) -> Result<()> {
        match self.fetch()?.constraint_tag(id) {
            Some(existing) if existing != kind.tag() => Err(Error::IdConflict {
                id: id.to_string(),
                existing: existing.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

fn patch(kind: ConstraintKind, fields: &ConstraintFields) -> Result<String> {
    let id = fields.id.as_deref().unwrap_or_default();
    let element = codec::encode(kind, fields).ok_or_else(|| Error::PatchBuild {
        kind: kind.tag().to_string(),
        id: id.to_string(),
    })?;
    patch_xml(kind, id, &element)
}

fn patch_xml(kind: ConstraintKind, id: &str, element: &crate::xml::Element) -> Result<String> {
    element.to_xml().ok_or_else(|| Error::PatchBuild {
        kind: kind.tag().to_string(),
        id: id.to_string(),
    })
}
