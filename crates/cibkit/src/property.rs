//! Cluster-wide properties (`crm_config`).

use crate::backend::Tool;
use crate::cib::CibStore;
use crate::error::Result;
use std::collections::BTreeMap;
use std::time::Duration;

impl CibStore {
    /// All cluster properties of the current snapshot.
    pub fn cluster_properties(&mut self) -> Result<BTreeMap<String, String>> {
        Ok(self.fetch()?.status().properties.clone())
    }

    /// Value of one cluster property.
    pub fn cluster_property_value(&mut self, name: &str) -> Result<Option<String>> {
        Ok(self
            .fetch()?
            .status()
            .property_value(name)
            .map(str::to_string))
    }

    /// Whether a cluster property is set.
    pub fn cluster_property_defined(&mut self, name: &str) -> Result<bool> {
        Ok(self.cluster_property_value(name)?.is_some())
    }

    /// Set a cluster property.
    pub fn cluster_property_set(&self, name: &str, value: &str) -> Result<()> {
        log::debug!("Setting cluster property '{name}' to '{value}'");
        let invocation = self.invocation(
            Tool::CrmAttribute,
            ["--type", "crm_config", "--name", name, "--update", value],
        );
        self.mutate(&invocation)
    }

    /// Delete a cluster property.
    pub fn cluster_property_delete(&self, name: &str) -> Result<()> {
        log::debug!("Deleting cluster property '{name}'");
        let invocation =
            self.invocation(Tool::CrmAttribute, ["--type", "crm_config", "--name", name, "--delete"]);
        self.mutate(&invocation)
    }

    /// Version of the controller, empty until one is elected.
    pub fn dc_version(&self, timeout: Duration) -> Result<String> {
        let output = self.query(
            Tool::CrmAttribute,
            ["-q", "--type", "crm_config", "--query", "--name", "dc-version"],
            timeout,
        )?;
        Ok(output.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::Tool;
    use crate::cib::tests::{CIB, store_with};
    use std::time::Duration;

    #[test]
    fn test_property_reads() {
        let (_, mut store) = store_with(CIB);
        assert_eq!(
            store.cluster_property_value("symmetric-cluster").unwrap().as_deref(),
            Some("true")
        );
        assert!(store.cluster_property_defined("no-quorum-policy").unwrap());
        assert!(!store.cluster_property_defined("stonith-enabled").unwrap());
        assert_eq!(store.cluster_properties().unwrap().len(), 2);
    }

    #[test]
    fn test_property_writes() {
        let (runner, store) = store_with(CIB);
        store.cluster_property_set("stonith-enabled", "false").unwrap();
        store.cluster_property_delete("no-quorum-policy").unwrap();

        let mutations = runner.mutations();
        assert_eq!(mutations.len(), 2);
        assert_eq!(
            mutations[0].command_line(),
            "crm_attribute --type crm_config --name stonith-enabled --update false"
        );
        assert_eq!(
            mutations[1].command_line(),
            "crm_attribute --type crm_config --name no-quorum-policy --delete"
        );
    }

    #[test]
    fn test_dc_version_is_trimmed() {
        let (runner, store) = store_with(CIB);
        runner.push_ok(Tool::CrmAttribute, "2.1.6-6fdc9deea29\n");
        assert_eq!(store.dc_version(Duration::from_secs(1)).unwrap(), "2.1.6-6fdc9deea29");
    }
}
