//! Cluster status model: primitives, per-node state, locations and
//! cluster properties, read from one snapshot.

use crate::cib::CibStore;
use crate::error::Result;
use crate::xml::Element;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Return code of a successful operation.
const RC_OK: i64 = 0;
/// Return code of a monitor on a stopped primitive.
const RC_NOT_RUNNING: i64 = 7;
/// Return code of a monitor on a running master.
const RC_RUNNING_MASTER: i64 = 8;
/// Return code of an operation still in flight.
const RC_PENDING: i64 = 193;

/// Observed state of a primitive on one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveStatus {
    /// Stopped
    Stop,
    /// Running
    Start,
    /// Running as master
    Master,
}

impl fmt::Display for PrimitiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveStatus::Stop => "stop",
            PrimitiveStatus::Start => "start",
            PrimitiveStatus::Master => "master",
        };
        write!(f, "{name}")
    }
}

/// Wrapper that runs a primitive on several nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complex {
    /// `clone`
    Clone,
    /// `master`, or a `clone` with `promotable=true`
    Multistate,
}

/// A configured primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Primitive {
    /// Primitive id
    pub id: String,
    /// Agent class (`ocf`, `systemd`...)
    pub class: Option<String>,
    /// Agent provider
    pub provider: Option<String>,
    /// Agent type
    #[serde(rename = "type")]
    pub agent: Option<String>,
    /// False when `is-managed=false` is set on it or its wrapper
    pub managed: bool,
    /// Clone or multistate wrapper
    pub complex: Option<Complex>,
    /// Id of the clone/master wrapper
    pub parent: Option<String>,
}

impl Primitive {
    /// The name constraints refer to: the wrapper id when wrapped.
    pub fn full_name(&self) -> &str {
        self.parent.as_deref().unwrap_or(&self.id)
    }
}

/// State of a primitive on one node, from its operation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PrimitiveState {
    /// Last conclusive status
    pub status: Option<PrimitiveStatus>,
    /// An operation returned an unexpected code
    pub failed: bool,
}

/// A location constraint pinning a primitive to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    /// Constraint id
    pub id: String,
    /// Primitive or wrapper id
    pub rsc: String,
    /// Node name
    pub node: String,
    /// Score as written
    pub score: Option<String>,
}

/// Everything the status queries need, parsed once per snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterStatus {
    /// Configured primitives by id
    pub primitives: BTreeMap<String, Primitive>,
    /// Node name -> primitive id -> state
    pub nodes: BTreeMap<String, BTreeMap<String, PrimitiveState>>,
    /// Location constraints
    pub locations: Vec<Location>,
    /// Cluster properties from `crm_config`
    pub properties: BTreeMap<String, String>,
    /// Whether the status section has any `node_state`
    pub has_node_state: bool,
}

/// Strip a clone instance suffix and wrapper prefixes from a name.
///
/// `p_haproxy:0`, `clone_p_haproxy` and `master_p_mysql` name the
/// primitives `p_haproxy`, `p_haproxy` and `p_mysql`.
pub fn primitive_base_name(name: &str) -> &str {
    let name = name.split(':').next().unwrap_or(name);
    name.strip_prefix("clone_")
        .or_else(|| name.strip_prefix("master_"))
        .unwrap_or(name)
}

impl ClusterStatus {
    /// Build the model from a `cib` root element.
    pub fn from_root(root: &Element) -> Self {
        let mut status = Self::default();

        if let Some(resources) = root.path("configuration/resources") {
            for element in &resources.children {
                status.add_resource(element, None);
            }
        }

        if let Some(constraints) = root.path("configuration/constraints") {
            status.locations = constraints
                .children_named("rsc_location")
                .filter_map(|element| {
                    Some(Location {
                        id: element.id()?.to_string(),
                        rsc: element.attribute("rsc")?.to_string(),
                        node: element.attribute("node")?.to_string(),
                        score: element.attribute("score").map(str::to_string),
                    })
                })
                .collect();
        }

        if let Some(crm_config) = root.path("configuration/crm_config") {
            status.properties = crm_config
                .children_named("cluster_property_set")
                .flat_map(|set| set.children_named("nvpair"))
                .filter_map(|nvpair| {
                    Some((
                        nvpair.attribute("name")?.to_string(),
                        nvpair.attribute("value").unwrap_or_default().to_string(),
                    ))
                })
                .collect();
        }

        if let Some(section) = root.child("status") {
            for node_state in section.children_named("node_state") {
                status.has_node_state = true;
                let Some(node) = node_state.attribute("uname").or_else(|| node_state.id()) else {
                    continue;
                };
                status
                    .nodes
                    .insert(node.to_string(), node_primitives(node_state));
            }
        }

        status
    }

    fn add_resource(&mut self, element: &Element, wrapper: Option<(&str, Complex, bool)>) {
        match element.name.as_str() {
            "primitive" => {
                let Some(id) = element.id() else { return };
                let (parent, complex, wrapper_managed) = match wrapper {
                    Some((parent, complex, managed)) => (Some(parent.to_string()), Some(complex), managed),
                    None => (None, None, true),
                };
                self.primitives.insert(
                    id.to_string(),
                    Primitive {
                        id: id.to_string(),
                        class: element.attribute("class").map(str::to_string),
                        provider: element.attribute("provider").map(str::to_string),
                        agent: element.attribute("type").map(str::to_string),
                        managed: wrapper_managed && is_managed(element),
                        complex,
                        parent,
                    },
                );
            }
            // a plain group adds no wrapper of its own
            "group" => {
                let wrapper = wrapper.map(|(p, c, m)| (p, c, m && is_managed(element)));
                for child in &element.children {
                    self.add_resource(child, wrapper);
                }
            }
            "clone" | "master" => {
                let Some(id) = element.id() else { return };
                let complex = if element.name == "master"
                    || meta_attribute(element, "promotable").as_deref() == Some("true")
                {
                    Complex::Multistate
                } else {
                    Complex::Clone
                };
                for child in &element.children {
                    self.add_resource(child, Some((id, complex, is_managed(element))));
                }
            }
            _ => {}
        }
    }

    fn primitive(&self, id: &str) -> Option<&Primitive> {
        self.primitives.get(primitive_base_name(id))
    }

    /// Whether the primitive is configured.
    pub fn primitive_exists(&self, id: &str) -> bool {
        self.primitive(id).is_some()
    }

    /// Whether the primitive is configured and managed.
    pub fn is_managed(&self, id: &str) -> bool {
        self.primitive(id).is_some_and(|p| p.managed)
    }

    /// Whether the primitive is wrapped in a clone.
    pub fn is_clone(&self, id: &str) -> bool {
        self.primitive(id)
            .is_some_and(|p| p.complex == Some(Complex::Clone))
    }

    /// Whether the primitive is wrapped in a multistate resource.
    pub fn is_multistate(&self, id: &str) -> bool {
        self.primitive(id)
            .is_some_and(|p| p.complex == Some(Complex::Multistate))
    }

    /// Whether the primitive is wrapped at all.
    pub fn is_complex(&self, id: &str) -> bool {
        self.primitive(id).is_some_and(|p| p.complex.is_some())
    }

    /// The name constraints refer to.
    pub fn full_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.primitive(id).map_or(id, Primitive::full_name)
    }

    fn states<'a>(
        &'a self,
        id: &'a str,
        node: Option<&'a str>,
    ) -> impl Iterator<Item = &'a PrimitiveState> + 'a {
        let id = primitive_base_name(id);
        self.nodes
            .iter()
            .filter(move |(name, _)| node.is_none_or(|n| n == name.as_str()))
            .filter_map(move |(_, primitives)| primitives.get(id))
    }

    /// Status on `node`, or the best status across all nodes.
    pub fn primitive_status(&self, id: &str, node: Option<&str>) -> Option<PrimitiveStatus> {
        self.states(id, node).filter_map(|state| state.status).max()
    }

    /// `Some(true)` if running (as master or not), `Some(false)` if
    /// stopped, `None` if unknown.
    pub fn primitive_is_running(&self, id: &str, node: Option<&str>) -> Option<bool> {
        self.primitive_status(id, node)
            .map(|status| status != PrimitiveStatus::Stop)
    }

    /// Like [`ClusterStatus::primitive_is_running`] but only master counts.
    pub fn primitive_has_master_running(&self, id: &str, node: Option<&str>) -> Option<bool> {
        self.primitive_status(id, node)
            .map(|status| status == PrimitiveStatus::Master)
    }

    /// Whether any operation of the primitive has failed.
    pub fn primitive_has_failures(&self, id: &str, node: Option<&str>) -> bool {
        self.states(id, node).any(|state| state.failed)
    }

    /// Whether a location constraint pins `rsc` to `node`.
    pub fn location_exists(&self, rsc: &str, node: &str) -> bool {
        self.locations
            .iter()
            .any(|location| location.rsc == rsc && location.node == node)
    }

    /// Value of a cluster property.
    pub fn property_value(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

fn meta_attribute(element: &Element, name: &str) -> Option<String> {
    element
        .children_named("meta_attributes")
        .flat_map(|meta| meta.children_named("nvpair"))
        .find(|nvpair| nvpair.attribute("name") == Some(name))
        .and_then(|nvpair| nvpair.attribute("value"))
        .map(str::to_string)
}

fn is_managed(element: &Element) -> bool {
    meta_attribute(element, "is-managed").as_deref() != Some("false")
}

fn node_primitives(node_state: &Element) -> BTreeMap<String, PrimitiveState> {
    let mut primitives: BTreeMap<String, PrimitiveState> = BTreeMap::new();
    let Some(resources) = node_state.path("lrm/lrm_resources") else {
        return primitives;
    };

    for resource in resources.children_named("lrm_resource") {
        let Some(id) = resource.id() else { continue };
        let mut operations: Vec<&Element> = resource.children_named("lrm_rsc_op").collect();
        operations.sort_by_key(|op| number(op, "call-id").unwrap_or(-1));

        let state = primitives
            .entry(primitive_base_name(id).to_string())
            .or_default();
        for op in operations {
            apply_operation(state, op);
        }
    }
    primitives
}

fn number(element: &Element, attribute: &str) -> Option<i64> {
    element.attribute(attribute)?.trim().parse().ok()
}

fn apply_operation(state: &mut PrimitiveState, op: &Element) {
    let Some(rc) = number(op, "rc-code") else { return };
    if rc == RC_PENDING || number(op, "op-status") == Some(-1) {
        return;
    }

    let operation = op.attribute("operation").unwrap_or_default();
    let status = match (operation, rc) {
        ("monitor", RC_OK) => Some(PrimitiveStatus::Start),
        ("monitor", RC_NOT_RUNNING) => Some(PrimitiveStatus::Stop),
        ("monitor", RC_RUNNING_MASTER) => Some(PrimitiveStatus::Master),
        ("start" | "migrate_from" | "demote", RC_OK) => Some(PrimitiveStatus::Start),
        ("stop" | "migrate_to", RC_OK) => Some(PrimitiveStatus::Stop),
        ("promote", RC_OK) => Some(PrimitiveStatus::Master),
        (_, RC_OK) => None,
        _ => {
            state.failed = true;
            None
        }
    };
    if status.is_some() {
        state.status = status;
    }
}

impl CibStore {
    /// Status model of the current snapshot.
    pub fn cluster_status(&mut self) -> Result<ClusterStatus> {
        Ok(self.fetch()?.status().clone())
    }

    /// Whether the primitive is configured.
    pub fn primitive_exists(&mut self, id: &str) -> Result<bool> {
        Ok(self.fetch()?.status().primitive_exists(id))
    }

    /// Status of a primitive, on `node` or across nodes.
    pub fn primitive_status(&mut self, id: &str, node: Option<&str>) -> Result<Option<PrimitiveStatus>> {
        Ok(self.fetch()?.status().primitive_status(id, node))
    }

    /// See [`ClusterStatus::primitive_is_running`].
    pub fn primitive_is_running(&mut self, id: &str, node: Option<&str>) -> Result<Option<bool>> {
        Ok(self.fetch()?.status().primitive_is_running(id, node))
    }

    /// See [`ClusterStatus::primitive_has_master_running`].
    pub fn primitive_has_master_running(&mut self, id: &str, node: Option<&str>) -> Result<Option<bool>> {
        Ok(self.fetch()?.status().primitive_has_master_running(id, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cib::tests::{CIB, store_with};
    use crate::xml;

    fn model() -> ClusterStatus {
        ClusterStatus::from_root(&xml::parse(CIB).unwrap())
    }

    #[test]
    fn test_base_name() {
        assert_eq!(primitive_base_name("p_haproxy:0"), "p_haproxy");
        assert_eq!(primitive_base_name("clone_p_haproxy"), "p_haproxy");
        assert_eq!(primitive_base_name("master_p_mysql"), "p_mysql");
        assert_eq!(primitive_base_name("vip"), "vip");
    }

    #[test]
    fn test_primitives_and_wrappers() {
        let status = model();
        assert_eq!(status.primitives.len(), 4);
        assert!(status.primitive_exists("vip"));
        assert!(!status.primitive_exists("nope"));

        assert!(status.is_clone("haproxy"));
        assert!(status.is_clone("clone_haproxy"));
        assert_eq!(status.full_name("haproxy"), "clone_haproxy");
        assert!(status.is_multistate("db"));
        assert_eq!(status.full_name("vip"), "vip");
        assert!(!status.is_complex("vip"));

        assert!(status.is_managed("vip"));
        assert!(!status.is_managed("webserver"));
    }

    #[test]
    fn test_status_from_operation_history() {
        let status = model();
        assert_eq!(status.primitive_status("vip", Some("node-1")), Some(PrimitiveStatus::Start));
        assert_eq!(status.primitive_status("vip", Some("node-2")), Some(PrimitiveStatus::Stop));
        assert_eq!(status.primitive_status("vip", None), Some(PrimitiveStatus::Start));
        assert_eq!(status.primitive_status("haproxy", Some("node-1")), Some(PrimitiveStatus::Start));
        assert_eq!(status.primitive_status("db", None), Some(PrimitiveStatus::Master));
        assert_eq!(status.primitive_has_master_running("db", Some("node-2")), Some(false));
        assert_eq!(status.primitive_status("webserver", Some("node-1")), None);
        assert_eq!(status.primitive_is_running("webserver", None), Some(false));
        assert_eq!(status.primitive_is_running("nope", None), None);
    }

    #[test]
    fn test_failures_and_locations() {
        let status = model();
        assert!(status.primitive_has_failures("webserver", Some("node-2")));
        assert!(!status.primitive_has_failures("vip", None));
        assert!(status.location_exists("vip", "node-1"));
        assert!(!status.location_exists("vip", "node-2"));
        assert_eq!(status.property_value("no-quorum-policy"), Some("ignore"));
        assert!(status.has_node_state);
    }

    #[test]
    fn test_pending_operation_is_ignored() {
        let root = xml::parse(
            r#"<cib><status><node_state uname="n1"><lrm><lrm_resources>
                <lrm_resource id="vip">
                  <lrm_rsc_op operation="stop" call-id="2" rc-code="0" op-status="0"/>
                  <lrm_rsc_op operation="start" call-id="3" rc-code="193" op-status="-1"/>
                </lrm_resource>
              </lrm_resources></lrm></node_state></status></cib>"#,
        )
        .unwrap();
        let status = ClusterStatus::from_root(&root);
        assert_eq!(status.primitive_status("vip", None), Some(PrimitiveStatus::Stop));
        assert!(!status.primitive_has_failures("vip", None));
    }

    #[test]
    fn test_promotable_clone_is_multistate() {
        let root = xml::parse(
            r#"<cib><configuration><resources>
                <clone id="db-clone">
                  <meta_attributes id="m"><nvpair id="m1" name="promotable" value="true"/></meta_attributes>
                  <group id="g"><primitive id="db" class="ocf" type="pgsql"/></group>
                </clone>
              </resources></configuration></cib>"#,
        )
        .unwrap();
        let status = ClusterStatus::from_root(&root);
        assert!(status.is_multistate("db"));
        assert_eq!(status.full_name("db"), "db-clone");
        assert!(!status.has_node_state);
    }

    #[test]
    fn test_store_queries() {
        let (_, mut store) = store_with(CIB);
        assert!(store.primitive_exists("webserver").unwrap());
        assert_eq!(
            store.primitive_is_running("vip", Some("node-1")).unwrap(),
            Some(true)
        );
        assert_eq!(
            store.primitive_has_master_running("db", None).unwrap(),
            Some(true)
        );
    }
}
