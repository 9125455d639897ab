//! Settings file and manifests of declared objects.
//!
//! Both are read as TOML or JSON, chosen by file extension.

use anyhow::{Context, Result, bail};
use cibkit::provider::{ConstraintProvider, DeclaredConstraint, DeclaredProperty, PropertyProvider};
use cibkit::{CibStore, ConstraintKind, Options};
use declarative::ExecutionPlan;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Format of a file, from its extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            _ => bail!(
                "Unsupported file format: {} (expected .toml or .json)",
                path.display()
            ),
        }
    }

    fn parse<T: DeserializeOwned>(self, content: &str) -> Result<T> {
        match self {
            Self::Toml => toml::from_str(content).context("Invalid TOML format"),
            Self::Json => serde_json::from_str(content).context("Invalid JSON format"),
        }
    }
}

/// Read and parse a TOML or JSON file
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    format
        .parse(&content)
        .with_context(|| format!("Could not parse {}", path.display()))
}

/// `config.toml` or `config.json` in `dir`, if either exists
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    ["config.toml", "config.json"]
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Load options from `path`, or from the config directory when unset.
///
/// A missing settings file yields the defaults.
pub fn load_options(path: Option<&Path>) -> Result<Options> {
    let file = match path {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(&paths::config_dir()?),
    };
    let mut options: Options = match file {
        Some(file) => {
            log::debug!("Loading settings from {}", file.display());
            load_file(&file)?
        }
        None => Options::default(),
    };
    if let Some(cib_file) = &options.cib_file {
        options.cib_file = Some(paths::expand(&cib_file.to_string_lossy()));
    }
    Ok(options)
}

/// Declared constraints and properties
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "order")]
    pub orders: Vec<DeclaredConstraint>,

    #[serde(default, rename = "colocation")]
    pub colocations: Vec<DeclaredConstraint>,

    #[serde(default, rename = "property")]
    pub properties: Vec<DeclaredProperty>,
}

/// Declared objects that target one CIB (`None` is the live one)
pub struct TargetPlan {
    pub cib: Option<String>,
    pub plan: ExecutionPlan<CibStore>,
}

impl Manifest {
    /// Load and validate a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let manifest: Self = load_file(path)?;
        manifest
            .validate()
            .with_context(|| format!("Invalid manifest {}", path.display()))?;
        Ok(manifest)
    }

    /// Parse and validate manifest text
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let manifest: Self = format.parse(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check that names are unique
    ///
    /// Orders and colocations share one id namespace in the CIB.
    pub fn validate(&self) -> Result<()> {
        let mut constraints = HashSet::new();
        for declared in self.orders.iter().chain(&self.colocations) {
            if declared.name.is_empty() {
                bail!("Constraint with an empty name");
            }
            if !constraints.insert(declared.name.as_str()) {
                bail!("Duplicate constraint name '{}'", declared.name);
            }
        }

        let mut properties = HashSet::new();
        for declared in &self.properties {
            if !properties.insert(declared.name.as_str()) {
                bail!("Duplicate property '{}'", declared.name);
            }
        }
        Ok(())
    }

    /// Total number of declared objects
    pub fn len(&self) -> usize {
        self.orders.len() + self.colocations.len() + self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build one execution plan per target CIB
    ///
    /// Properties always target the live CIB. The live CIB comes first.
    pub fn plans(&self) -> Result<Vec<TargetPlan>> {
        let mut plans: BTreeMap<Option<String>, ExecutionPlan<CibStore>> = BTreeMap::new();

        for declared in &self.properties {
            let provider = PropertyProvider::new(declared.clone())?;
            plans.entry(None).or_default().add_resource(Box::new(provider));
        }
        let constraints = self
            .orders
            .iter()
            .map(|d| (ConstraintKind::Order, d))
            .chain(self.colocations.iter().map(|d| (ConstraintKind::Colocation, d)));
        for (kind, declared) in constraints {
            let provider = ConstraintProvider::new(kind, declared.clone());
            plans
                .entry(declared.cib.clone())
                .or_default()
                .add_resource(Box::new(provider));
        }

        Ok(plans
            .into_iter()
            .map(|(cib, plan)| TargetPlan { cib, plan })
            .collect())
    }
}
