//! Cluster property provider.

use super::with_debug;
use crate::cib::CibStore;
use crate::error::{Error, Result};
use declarative::{Ensure, PropertyChange, Resource};
use serde::{Deserialize, Serialize};

/// A cluster property as written in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredProperty {
    /// Property name, e.g. `no-quorum-policy`
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub ensure: Ensure,
    #[serde(default)]
    pub debug: bool,
}

impl DeclaredProperty {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            ensure: Ensure::Present,
            debug: false,
        }
    }

    pub fn absent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            ensure: Ensure::Absent,
            debug: false,
        }
    }
}

/// Reconciles one cluster property.
///
/// Properties carry no pending state: every hook writes immediately.
#[derive(Debug)]
pub struct PropertyProvider {
    declared: DeclaredProperty,
    observed: Option<String>,
}

impl PropertyProvider {
    /// Fails when a present property has no value.
    pub fn new(declared: DeclaredProperty) -> Result<Self> {
        if declared.ensure.is_present() && declared.value.is_none() {
            return Err(Error::InvalidDeclaration {
                name: declared.name,
                message: "option \"value\" is required".to_string(),
            });
        }
        Ok(Self {
            declared,
            observed: None,
        })
    }

    pub fn declared(&self) -> &DeclaredProperty {
        &self.declared
    }

    /// Whether the property is defined.
    pub fn exists(&mut self, store: &mut CibStore) -> Result<bool> {
        self.observed = store.cluster_property_value(&self.declared.name)?;
        Ok(self.observed.is_some())
    }

    /// Value last observed by [`PropertyProvider::exists`].
    pub fn value(&self) -> Option<&str> {
        self.observed.as_deref()
    }

    /// Set the declared value.
    pub fn set_value(&mut self, store: &mut CibStore) -> Result<()> {
        let Some(value) = self.declared.value.clone() else {
            return Ok(());
        };
        let name = self.declared.name.clone();
        with_debug(store, self.declared.debug, |store| {
            store.cluster_property_set(&name, &value)
        })?;
        self.observed = Some(value);
        store.reset();
        Ok(())
    }

    pub fn destroy(&mut self, store: &mut CibStore) -> Result<()> {
        let name = self.declared.name.clone();
        with_debug(store, self.declared.debug, |store| {
            store.cluster_property_delete(&name)
        })?;
        self.observed = None;
        store.reset();
        Ok(())
    }
}

impl Resource<CibStore> for PropertyProvider {
    fn id(&self) -> String {
        self.declared.name.clone()
    }

    fn description(&self) -> String {
        match &self.declared.value {
            Some(value) => format!("Set cluster property {} = {value}", self.declared.name),
            None => format!("Unset cluster property {}", self.declared.name),
        }
    }

    fn resource_type(&self) -> &'static str {
        "pcmk_property"
    }

    fn desired_ensure(&self) -> Ensure {
        self.declared.ensure
    }

    fn exists(&mut self, store: &mut CibStore) -> anyhow::Result<bool> {
        Ok(Self::exists(self, store)?)
    }

    fn create(&mut self, store: &mut CibStore) -> anyhow::Result<()> {
        Ok(self.set_value(store)?)
    }

    fn destroy(&mut self, store: &mut CibStore) -> anyhow::Result<()> {
        Ok(Self::destroy(self, store)?)
    }

    fn property_diffs(&self) -> Vec<PropertyChange> {
        match &self.declared.value {
            Some(value) if self.observed.as_ref() != Some(value) => {
                vec![PropertyChange::new("value", self.observed.clone(), value)]
            }
            _ => Vec::new(),
        }
    }

    fn sync_property(&mut self, name: &str, store: &mut CibStore) -> anyhow::Result<()> {
        if name != "value" {
            anyhow::bail!("property '{}' has no attribute '{name}'", self.declared.name);
        }
        Ok(self.set_value(store)?)
    }

    // Cluster-wide options are in place before any constraint is written
    fn priority(&self) -> u32 {
        50
    }
}
