//! Order and colocation constraint provider.
//!
//! Lifecycle of one declared constraint:
//!
//! - `exists` reads the constraint and refreshes the observed record
//! - `create` and the setters only record the desired change
//! - `flush` validates the merged record and writes it in one patch
//! - `destroy` removes the constraint immediately

use super::with_debug;
use crate::cib::CibStore;
use crate::constraint::ConstraintFields;
use crate::error::{Error, Result};
use crate::report;
use crate::types::{ConstraintKind, Score};
use declarative::{Ensure, PropertyChange, Resource};
use serde::{Deserialize, Serialize};

/// A constraint as written in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredConstraint {
    /// Constraint id
    pub name: String,
    #[serde(default)]
    pub ensure: Ensure,
    /// First primitive (`first` / `rsc`)
    #[serde(default)]
    pub first: Option<String>,
    /// Second primitive (`then` / `with-rsc`)
    #[serde(default)]
    pub second: Option<String>,
    #[serde(default)]
    pub score: Score,
    /// Shadow CIB to patch instead of the live one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cib: Option<String>,
    /// Only log the writes of this constraint
    #[serde(default)]
    pub debug: bool,
}

impl DeclaredConstraint {
    /// A present constraint between two primitives.
    pub fn new(
        name: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
        score: Score,
    ) -> Self {
        Self {
            name: name.into(),
            ensure: Ensure::Present,
            first: Some(first.into()),
            second: Some(second.into()),
            score,
            cib: None,
            debug: false,
        }
    }

    fn fields(&self) -> ConstraintFields {
        ConstraintFields {
            id: Some(self.name.clone()),
            first: self.first.clone(),
            second: self.second.clone(),
            score: Some(self.score.to_string()),
            extra: Default::default(),
        }
    }
}

/// Whether a flush created a constraint or replaced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOperation {
    Create,
    Modify,
}

/// The write a flush performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchIntent {
    pub operation: PatchOperation,
    pub kind: ConstraintKind,
    /// Observed fields with the pending delta applied
    pub fields: ConstraintFields,
}

/// Observed state plus the pending change.
#[derive(Debug, Clone, Default)]
struct Record {
    /// Whether the constraint existed when last observed
    ensure: Option<Ensure>,
    observed: ConstraintFields,
    delta: ConstraintFields,
}

impl Record {
    fn observed(fields: Option<ConstraintFields>) -> Self {
        Self {
            ensure: Some(Ensure::from(fields.is_some())),
            observed: fields.unwrap_or_default(),
            delta: ConstraintFields::default(),
        }
    }

    fn is_empty(&self) -> bool {
        self.observed.is_empty() && self.delta.is_empty()
    }

    fn merged(&self) -> ConstraintFields {
        let mut fields = self.observed.clone();
        fields.merge(&self.delta);
        fields
    }
}

/// Reconciles one declared order or colocation constraint.
#[derive(Debug)]
pub struct ConstraintProvider {
    kind: ConstraintKind,
    declared: DeclaredConstraint,
    record: Record,
}

impl ConstraintProvider {
    pub fn new(kind: ConstraintKind, declared: DeclaredConstraint) -> Self {
        Self {
            kind,
            declared,
            record: Record::default(),
        }
    }

    /// Every constraint of `kind` in the CIB, as present declarations.
    ///
    /// All instances are read from the same snapshot.
    pub fn instances(store: &mut CibStore, kind: ConstraintKind) -> Result<Vec<Self>> {
        let instances = store
            .all_constraints(kind)?
            .into_iter()
            .map(|(id, fields)| {
                log::debug!("Discovered {kind} '{id}'");
                let score = fields.score.as_deref().and_then(Score::from_cib);
                let declared = DeclaredConstraint {
                    name: id,
                    ensure: Ensure::Present,
                    first: fields.first.clone(),
                    second: fields.second.clone(),
                    score: score.unwrap_or_default(),
                    cib: store.shadow().map(str::to_string),
                    debug: false,
                };
                Self {
                    kind,
                    declared,
                    record: Record::observed(Some(fields)),
                }
            })
            .collect();
        Ok(instances)
    }

    /// Attach the observed state of every declared constraint in one read.
    ///
    /// Does nothing unless the `prefetch` option is set.
    pub fn prefetch(store: &mut CibStore, providers: &mut [Self]) -> Result<()> {
        if !store.options().prefetch {
            return Ok(());
        }
        let snapshot = store.fetch()?;
        for provider in providers {
            let observed = snapshot
                .constraints(provider.kind)
                .get(&provider.declared.name)
                .cloned();
            if observed.is_some() {
                log::debug!("Prefetched {} '{}'", provider.kind, provider.declared.name);
            }
            provider.record = Record::observed(observed);
        }
        Ok(())
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    pub fn declared(&self) -> &DeclaredConstraint {
        &self.declared
    }

    /// Whether the constraint is in the CIB.
    ///
    /// Refreshes the observed record either way.
    pub fn exists(&mut self, store: &mut CibStore) -> Result<bool> {
        let observed = store.constraint(self.kind, &self.declared.name)?;
        let exists = observed.is_some();
        self.record = Record::observed(observed);
        log::debug!("{} '{}' exists: {exists}", self.kind, self.declared.name);
        Ok(exists)
    }

    /// Record the declared constraint for creation by the next flush.
    pub fn create(&mut self) {
        self.record = Record {
            ensure: Some(Ensure::Absent),
            observed: ConstraintFields::default(),
            delta: self.declared.fields(),
        };
    }

    /// Remove the constraint from the CIB.
    pub fn destroy(&mut self, store: &mut CibStore) -> Result<()> {
        let (kind, name) = (self.kind, self.declared.name.clone());
        with_debug(store, self.declared.debug, |store| {
            store.constraint_remove(kind, &name)
        })?;
        self.record = Record::default();
        report::log_debug_report(store, &format!("{kind} '{name}' destroy"));
        store.reset();
        Ok(())
    }

    pub fn first(&self) -> Option<&str> {
        self.current(|fields| fields.first.as_deref())
    }

    pub fn second(&self) -> Option<&str> {
        self.current(|fields| fields.second.as_deref())
    }

    pub fn score(&self) -> Option<&str> {
        self.current(|fields| fields.score.as_deref())
    }

    fn current<'a>(&'a self, field: impl Fn(&'a ConstraintFields) -> Option<&'a str>) -> Option<&'a str> {
        field(&self.record.delta).or_else(|| field(&self.record.observed))
    }

    pub fn set_first(&mut self, first: impl Into<String>) {
        self.record.delta.first = Some(first.into());
    }

    pub fn set_second(&mut self, second: impl Into<String>) {
        self.record.delta.second = Some(second.into());
    }

    pub fn set_score(&mut self, score: Score) {
        self.record.delta.score = Some(score.to_string());
    }

    /// Write the pending change, if any.
    ///
    /// A constraint observed as present is replaced, any other is created.
    /// The record is cleared and the store reset once the write succeeded.
    pub fn flush(&mut self, store: &mut CibStore) -> Result<Option<PatchIntent>> {
        if self.record.is_empty() {
            log::debug!("{} '{}': nothing to flush", self.kind, self.declared.name);
            return Ok(None);
        }

        let fields = self.record.merged();
        for primitive in [&fields.first, &fields.second].into_iter().flatten() {
            if !store.primitive_exists(primitive)? {
                return Err(Error::MissingPrimitive {
                    id: primitive.clone(),
                });
            }
        }
        let missing = fields.missing();
        if !missing.is_empty() {
            return Err(Error::IncompleteConstraint {
                id: self.declared.name.clone(),
                missing,
            });
        }

        let operation = if self.record.ensure == Some(Ensure::Present) {
            PatchOperation::Modify
        } else {
            PatchOperation::Create
        };
        let kind = self.kind;
        with_debug(store, self.declared.debug, |store| match operation {
            PatchOperation::Modify => store.constraint_modify(kind, &fields),
            PatchOperation::Create => store.constraint_add(kind, &fields),
        })?;

        self.record = Record::default();
        report::log_debug_report(store, &format!("{kind} '{}' flush", self.declared.name));
        store.reset();
        Ok(Some(PatchIntent {
            operation,
            kind,
            fields,
        }))
    }

    fn describe(&self) -> String {
        let first = self.declared.first.as_deref().unwrap_or("?");
        let second = self.declared.second.as_deref().unwrap_or("?");
        match self.kind {
            ConstraintKind::Order => format!("Start {first} before {second} ({})", self.declared.score),
            ConstraintKind::Colocation => format!("Place {first} with {second} ({})", self.declared.score),
        }
    }
}

impl Resource<CibStore> for ConstraintProvider {
    fn id(&self) -> String {
        self.declared.name.clone()
    }

    fn description(&self) -> String {
        self.describe()
    }

    fn resource_type(&self) -> &'static str {
        self.kind.resource_type()
    }

    fn desired_ensure(&self) -> Ensure {
        self.declared.ensure
    }

    fn exists(&mut self, store: &mut CibStore) -> anyhow::Result<bool> {
        Ok(Self::exists(self, store)?)
    }

    fn create(&mut self, _store: &mut CibStore) -> anyhow::Result<()> {
        Self::create(self);
        Ok(())
    }

    fn destroy(&mut self, store: &mut CibStore) -> anyhow::Result<()> {
        Ok(Self::destroy(self, store)?)
    }

    fn property_diffs(&self) -> Vec<PropertyChange> {
        let observed = &self.record.observed;
        let mut changes = Vec::new();
        if self.declared.first.is_some() && observed.first != self.declared.first {
            changes.push(PropertyChange::new(
                "first",
                observed.first.clone(),
                self.declared.first.clone().unwrap_or_default(),
            ));
        }
        if self.declared.second.is_some() && observed.second != self.declared.second {
            changes.push(PropertyChange::new(
                "second",
                observed.second.clone(),
                self.declared.second.clone().unwrap_or_default(),
            ));
        }
        if observed.score.as_deref().and_then(Score::from_cib) != Some(self.declared.score) {
            changes.push(PropertyChange::new(
                "score",
                observed.score.clone(),
                self.declared.score.to_string(),
            ));
        }
        changes
    }

    fn sync_property(&mut self, name: &str, _store: &mut CibStore) -> anyhow::Result<()> {
        match name {
            "first" => {
                if let Some(first) = self.declared.first.clone() {
                    self.set_first(first);
                }
            }
            "second" => {
                if let Some(second) = self.declared.second.clone() {
                    self.set_second(second);
                }
            }
            "score" => self.set_score(self.declared.score),
            other => {
                return Err(Error::InvalidDeclaration {
                    name: self.declared.name.clone(),
                    message: format!("unknown property '{other}'"),
                }
                .into());
            }
        }
        Ok(())
    }

    fn flush(&mut self, store: &mut CibStore) -> anyhow::Result<()> {
        Self::flush(self, store)?;
        Ok(())
    }
}
