//! Host file loading and validation
//!
//! The host file is a YAML document in Ansible's inventory shape:
//!
//! ```yaml
//! azure_hosts:
//!   hosts:
//!     server01:
//!       ansible_port: 63933
//!       ansible_user: azureuser
//!       resource_group: AnsibleHosts
//! ```
//!
//! Validation is eager: the first missing or unusable attribute aborts the
//! load with an error naming the host and field.

mod host;

pub use host::{HostEntry, HostGroup, InventoryConfig, DEFAULT_ANSIBLE_HOST, DEFAULT_RESOURCE_PORT};

use host::{RawGroup, RawHost};

use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default host file name
pub const DEFAULT_CONFIG_FILE: &str = "ansible_bastion_tunnels.yml";

/// Group names Ansible's inventory protocol already uses
const RESERVED_GROUPS: &[&str] = &["all", "_meta"];

/// Resolve the host file path
///
/// An explicit path always wins. Otherwise the default file name is looked
/// up in the working directory, then beside the executable, since Ansible
/// runs inventory scripts from wherever the playbook is launched.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return local;
    }

    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_CONFIG_FILE)))
        .filter(|candidate| candidate.exists())
        .unwrap_or(local)
}

/// Load and validate a host file
pub fn load_config(path: &Path) -> Result<InventoryConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config(&content, path)
}

/// Parse and validate host file contents
///
/// `path` is only used in error messages.
pub fn parse_config(content: &str, path: &Path) -> Result<InventoryConfig, ConfigError> {
    let parse_err = |source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let document: serde_yaml::Value = serde_yaml::from_str(content).map_err(parse_err)?;
    let groups: serde_yaml::Mapping = match document {
        serde_yaml::Value::Null => return Err(ConfigError::NoHosts(path.to_path_buf())),
        other => serde_yaml::from_value(other).map_err(parse_err)?,
    };

    let mut config = InventoryConfig::default();
    let mut ports: HashMap<u16, String> = HashMap::new();

    for (group_key, group_value) in groups {
        let group_name: String = serde_yaml::from_value(group_key).map_err(parse_err)?;
        if RESERVED_GROUPS.contains(&group_name.as_str()) {
            return Err(ConfigError::ReservedGroup(group_name));
        }

        let raw: Option<RawGroup> = serde_yaml::from_value(group_value).map_err(parse_err)?;
        let mut group = HostGroup {
            name: group_name,
            hosts: Vec::new(),
        };

        for (host_key, host_value) in raw.and_then(|g| g.hosts).unwrap_or_default() {
            let name: String = serde_yaml::from_value(host_key).map_err(parse_err)?;
            let raw: Option<RawHost> =
                serde_yaml::from_value(host_value).map_err(|source| ConfigError::HostParse {
                    path: path.to_path_buf(),
                    host: name.clone(),
                    source,
                })?;
            let entry = validate_host(name, raw.unwrap_or_default())?;

            if config.host(&entry.name).is_some() || group.hosts.iter().any(|h| h.name == entry.name) {
                return Err(ConfigError::DuplicateHost(entry.name));
            }
            if let Some(first) = ports.insert(entry.ansible_port, entry.name.clone()) {
                return Err(ConfigError::DuplicatePort {
                    port: entry.ansible_port,
                    first,
                    second: entry.name,
                });
            }

            group.hosts.push(entry);
        }

        config.groups.push(group);
    }

    if config.is_empty() {
        return Err(ConfigError::NoHosts(path.to_path_buf()));
    }

    tracing::debug!(
        "Loaded {} host(s) in {} group(s) from {:?}",
        config.len(),
        config.groups.len(),
        path
    );
    Ok(config)
}

fn validate_host(name: String, raw: RawHost) -> Result<HostEntry, ConfigError> {
    let ansible_port = raw.ansible_port.ok_or_else(|| ConfigError::MissingField {
        host: name.clone(),
        field: "ansible_port",
    })?;
    let resource_group = raw.resource_group.ok_or_else(|| ConfigError::MissingField {
        host: name.clone(),
        field: "resource_group",
    })?;

    if ansible_port == 0 {
        return Err(ConfigError::InvalidField {
            host: name,
            field: "ansible_port",
            reason: "port 0 cannot be listened on".to_string(),
        });
    }
    if resource_group.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            host: name,
            field: "resource_group",
            reason: "must not be empty".to_string(),
        });
    }

    Ok(HostEntry {
        ansible_host: raw
            .ansible_host
            .unwrap_or_else(|| DEFAULT_ANSIBLE_HOST.to_string()),
        ansible_port,
        ansible_user: raw.ansible_user,
        resource_group,
        vm_name: raw.vm_name,
        resource_id: raw.resource_id,
        bastion_name: raw.bastion_name,
        resource_port: raw.resource_port.unwrap_or(DEFAULT_RESOURCE_PORT),
        name,
    })
}
