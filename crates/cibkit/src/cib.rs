//! CIB access: the cached snapshot and the command wrappers that patch it.
//!
//! A [`CibStore`] is the context object of one reconciliation pass. It
//! fetches the document on first use and keeps it until [`CibStore::reset`]
//! is called. Mutations go to the cluster out of band and never touch the
//! cached tree, so callers reset before relying on fresh reads.

use crate::backend::dry_run::DryRunRunner;
use crate::backend::{CommandRunner, Invocation, Tool};
use crate::constraint::ConstraintMap;
use crate::error::{Error, Result};
use crate::retry::{self, Attempt, LogCallback};
use crate::status::ClusterStatus;
use crate::types::Options;
use crate::xml::{self, Element};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Value of `dc-uuid` while no controller has been elected.
const NO_CONTROLLER: &str = "NONE";

/// One fetched CIB document.
///
/// Immutable after parse; derived views are computed on first use and
/// memoized for the lifetime of the snapshot.
#[derive(Debug)]
pub struct Snapshot {
    raw: String,
    root: Element,
    pub(crate) orders: OnceLock<ConstraintMap>,
    pub(crate) colocations: OnceLock<ConstraintMap>,
    status: OnceLock<ClusterStatus>,
}

impl Snapshot {
    /// Parse a dump.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(Error::CibUnavailable {
                reason: "the dump is empty".to_string(),
            });
        }
        let root = xml::parse(&raw)?;
        Ok(Self {
            raw,
            root,
            orders: OnceLock::new(),
            colocations: OnceLock::new(),
            status: OnceLock::new(),
        })
    }

    /// The dump text as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The root `cib` element.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// A section below the root, e.g. `configuration/constraints`.
    pub fn section(&self, path: &str) -> Option<&Element> {
        self.root.path(path)
    }

    /// The node currently acting as Designated Controller.
    pub fn designated_controller(&self) -> Option<&str> {
        self.root
            .attribute("dc-uuid")
            .filter(|dc| !dc.is_empty() && *dc != NO_CONTROLLER)
    }

    /// Primitives, node states, locations and properties.
    pub fn status(&self) -> &ClusterStatus {
        self.status.get_or_init(|| ClusterStatus::from_root(&self.root))
    }
}

/// Reads and patches the CIB for one reconciliation pass.
pub struct CibStore {
    runner: Arc<dyn CommandRunner>,
    dry_run: DryRunRunner,
    options: Options,
    shadow: Option<String>,
    debug: bool,
    snapshot: Option<Arc<Snapshot>>,
}

impl CibStore {
    /// Create a store over a runner.
    pub fn new(runner: Arc<dyn CommandRunner>, options: Options) -> Self {
        Self {
            runner,
            dry_run: DryRunRunner,
            debug: options.debug_enabled,
            options,
            shadow: None,
            snapshot: None,
        }
    }

    /// Direct every command at a shadow CIB instead of the live one.
    pub fn with_shadow(mut self, shadow: impl Into<String>) -> Self {
        self.shadow = Some(shadow.into());
        self
    }

    /// Shadow CIB in use, if any.
    pub fn shadow(&self) -> Option<&str> {
        self.shadow.as_deref()
    }

    /// Options of this pass.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Whether mutations are only logged.
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Switch debug mode, returning the previous setting.
    pub fn set_debug(&mut self, enabled: bool) -> bool {
        std::mem::replace(&mut self.debug, enabled)
    }

    /// Build an invocation carrying the shadow/file environment.
    pub fn invocation<I, S>(&self, tool: Tool, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut invocation = Invocation::new(tool, args);
        if let Some(shadow) = &self.shadow {
            invocation = invocation.with_env("CIB_shadow", shadow.as_str());
        }
        if let Some(file) = &self.options.cib_file {
            invocation = invocation.with_env("CIB_file", file.to_string_lossy());
        }
        invocation
    }

    /// Run a read-only command once, under `timeout`.
    pub fn query<I, S>(&self, tool: Tool, args: I, timeout: Duration) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runner
            .run(&self.invocation(tool, args).with_timeout(timeout))
    }

    fn read(&self, timeout: Duration) -> Result<String> {
        if let Some(path) = &self.options.cib_file {
            return std::fs::read_to_string(path).map_err(|source| Error::CibFile {
                path: path.clone(),
                source,
            });
        }
        self.query(Tool::Cibadmin, ["-Q"], timeout)
            .map_err(|e| Error::CibUnavailable {
                reason: e.to_string(),
            })
    }

    /// The cached snapshot, fetching it first if needed.
    pub fn fetch(&mut self) -> Result<Arc<Snapshot>> {
        self.fetch_within(self.options.attempt_timeout())
    }

    /// Like [`CibStore::fetch`], bounding the dump command by `timeout`.
    pub fn fetch_within(&mut self, timeout: Duration) -> Result<Arc<Snapshot>> {
        if let Some(snapshot) = &self.snapshot {
            return Ok(Arc::clone(snapshot));
        }
        let snapshot = Arc::new(Snapshot::parse(self.read(timeout)?)?);
        log::trace!("Fetched CIB ({} bytes)", snapshot.raw().len());
        self.snapshot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Drop the cached snapshot so the next read queries the cluster.
    pub fn reset(&mut self) {
        if self.snapshot.take().is_some() {
            log::trace!("Reset CIB memoization");
        }
    }

    /// Whether a snapshot is cached.
    pub fn is_fetched(&self) -> bool {
        self.snapshot.is_some()
    }

    /// The cached snapshot without fetching.
    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.snapshot.as_ref()
    }

    /// Designated Controller of the current snapshot.
    pub fn designated_controller(&mut self) -> Result<Option<String>> {
        Ok(self.fetch()?.designated_controller().map(str::to_string))
    }

    /// Add an XML fragment below `scope`.
    pub fn create(&self, xml: &str, scope: Option<&str>) -> Result<()> {
        self.cibadmin("--create", xml, scope)
    }

    /// Remove the element matching an XML fragment.
    pub fn delete(&self, xml: &str, scope: Option<&str>) -> Result<()> {
        self.cibadmin("--delete", xml, scope)
    }

    /// Replace the element matching an XML fragment.
    pub fn modify(&self, xml: &str, scope: Option<&str>) -> Result<()> {
        self.cibadmin("--modify", xml, scope)
    }

    fn cibadmin(&self, action: &str, xml: &str, scope: Option<&str>) -> Result<()> {
        let mut args = vec!["--force", "--sync-call", action];
        if let Some(scope) = scope {
            args.extend(["--scope", scope]);
        }
        args.extend(["--xml-text", xml]);
        self.mutate(&self.invocation(Tool::Cibadmin, args))
    }

    /// Run a mutating command inside the retry engine.
    ///
    /// In debug mode the command is only logged. Exhausting the budget is
    /// always an error.
    pub fn mutate(&self, invocation: &Invocation) -> Result<()> {
        let writer: &dyn CommandRunner = if self.debug {
            &self.dry_run
        } else {
            self.runner.as_ref()
        };
        let policy = self.options.retry_policy().false_is_failure(false);

        retry::retry_or_fail(&policy, Some(&LogCallback), |deadline| {
            let attempt = invocation.clone().with_timeout(deadline.remaining());
            Attempt::from(writer.run(&attempt).map(drop))
        })
        .inspect_err(|_| log::debug!("Command execution has failed: {invocation}"))
    }
}
