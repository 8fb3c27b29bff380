//! Host entries and groups

use serde::Deserialize;

/// Loopback address used when a host does not set `ansible_host`
pub const DEFAULT_ANSIBLE_HOST: &str = "127.0.0.1";

/// Remote port the bastion forwards to when `resource_port` is unset
pub const DEFAULT_RESOURCE_PORT: u16 = 22;

/// One configured target host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    /// Logical host name, unique across the file
    pub name: String,

    /// Address Ansible connects to (the local tunnel endpoint)
    pub ansible_host: String,

    /// Local listen port of the tunnel
    pub ansible_port: u16,

    /// Remote login user
    pub ansible_user: Option<String>,

    /// Resource group holding the bastion and the VM
    pub resource_group: String,

    /// VM name inside the resource group, when it differs from `name`
    pub vm_name: Option<String>,

    /// Full VM resource id; skips the `az vm show` lookup
    pub resource_id: Option<String>,

    /// Bastion host name; skips the `az network bastion list` lookup
    pub bastion_name: Option<String>,

    /// Port on the VM the tunnel forwards to
    pub resource_port: u16,
}

impl HostEntry {
    /// Create an entry with defaults for every optional attribute
    pub fn new(name: impl Into<String>, ansible_port: u16, resource_group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ansible_host: DEFAULT_ANSIBLE_HOST.to_string(),
            ansible_port,
            ansible_user: None,
            resource_group: resource_group.into(),
            vm_name: None,
            resource_id: None,
            bastion_name: None,
            resource_port: DEFAULT_RESOURCE_PORT,
        }
    }

    /// Name of the Azure VM backing this host
    pub fn vm_name(&self) -> &str {
        self.vm_name.as_deref().unwrap_or(&self.name)
    }
}

/// A named inventory group and its hosts in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostGroup {
    pub name: String,
    pub hosts: Vec<HostEntry>,
}

/// The validated contents of a host file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryConfig {
    pub groups: Vec<HostGroup>,
}

impl InventoryConfig {
    /// Iterate over every host in file order
    pub fn hosts(&self) -> impl Iterator<Item = &HostEntry> {
        self.groups.iter().flat_map(|g| g.hosts.iter())
    }

    /// Look up a host by name
    pub fn host(&self, name: &str) -> Option<&HostEntry> {
        self.hosts().find(|h| h.name == name)
    }

    /// Total number of hosts
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.hosts.len()).sum()
    }

    /// Check if no hosts are configured
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Group record as written in YAML
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawGroup {
    #[serde(default)]
    pub hosts: Option<serde_yaml::Mapping>,
}

/// Host attributes as written in YAML, before validation
///
/// Unknown keys are ignored so the file can carry notes for humans.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawHost {
    pub ansible_host: Option<String>,
    pub ansible_port: Option<u16>,
    pub ansible_user: Option<String>,
    pub resource_group: Option<String>,
    pub vm_name: Option<String>,
    pub resource_id: Option<String>,
    pub bastion_name: Option<String>,
    pub resource_port: Option<u16>,
}
