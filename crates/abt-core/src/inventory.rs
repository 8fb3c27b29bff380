//! Ansible dynamic inventory rendering
//!
//! Produces the JSON Ansible expects from `--list`:
//!
//! ```json
//! {
//!   "_meta": { "hostvars": { "server01": { "ansible_host": "127.0.0.1", ... } } },
//!   "all": { "children": ["azure_hosts"] },
//!   "azure_hosts": { "hosts": ["server01"] }
//! }
//! ```

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::config::{HostEntry, InventoryConfig};
use crate::tunnel::LaunchReport;

/// What to do with a host whose tunnel neither existed nor could be started
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingTunnelPolicy {
    /// Keep the host, pointing at its configured endpoint
    #[default]
    Include,
    /// Leave the host out of groups and hostvars
    Exclude,
}

/// Connection variables for one host (also the `--host <name>` output)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostVars {
    pub ansible_host: String,
    pub ansible_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_user: Option<String>,
    pub resource_group: String,
}

impl From<&HostEntry> for HostVars {
    fn from(host: &HostEntry) -> Self {
        Self {
            ansible_host: host.ansible_host.clone(),
            ansible_port: host.ansible_port,
            ansible_user: host.ansible_user.clone(),
            resource_group: host.resource_group.clone(),
        }
    }
}

/// Variables of a configured host, `None` for unknown names
pub fn host_vars(config: &InventoryConfig, name: &str) -> Option<HostVars> {
    config.host(name).map(HostVars::from)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Meta {
    pub hostvars: BTreeMap<String, HostVars>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllGroup {
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupHosts {
    pub hosts: Vec<String>,
}

/// Full `--list` document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InventoryDocument {
    #[serde(rename = "_meta")]
    pub meta: Meta,
    pub all: AllGroup,
    #[serde(flatten)]
    pub groups: BTreeMap<String, GroupHosts>,
}

impl InventoryDocument {
    /// Build the document for every configured host
    ///
    /// Hosts keep their configuration order inside each group. A host is
    /// considered unresolved only when a report says its launch failed;
    /// `policy` then decides whether it stays in the document.
    pub fn build(
        config: &InventoryConfig,
        reports: &[LaunchReport],
        policy: MissingTunnelPolicy,
    ) -> Self {
        let unresolved: HashSet<&str> = reports
            .iter()
            .filter(|r| !r.has_tunnel())
            .map(|r| r.host.as_str())
            .collect();

        let mut doc = Self::default();
        for group in &config.groups {
            let mut members = GroupHosts::default();
            for host in &group.hosts {
                if policy == MissingTunnelPolicy::Exclude && unresolved.contains(host.name.as_str()) {
                    tracing::debug!("Excluding {} from inventory: no tunnel", host.name);
                    continue;
                }
                members.hosts.push(host.name.clone());
                doc.meta.hostvars.insert(host.name.clone(), HostVars::from(host));
            }
            doc.all.children.push(group.name.clone());
            doc.groups.insert(group.name.clone(), members);
        }
        doc
    }

    /// Render as JSON with object keys sorted
    ///
    /// Flattened groups would otherwise follow `_meta` and `all` regardless
    /// of their names; going through `Value` sorts every object.
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        let value = serde_json::to_value(self)?;
        if pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        }
    }
}
