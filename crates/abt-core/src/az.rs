//! Azure CLI integration
//!
//! Everything Azure-specific goes through the `az` binary: locating it,
//! checking the login, resolving the bastion host and VM resource id, and
//! building the `az network bastion tunnel` invocation.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::HostEntry;
use crate::error::LaunchError;
use crate::tunnel::TUNNEL_SUBCOMMAND;

/// Program name searched on `PATH`
pub const AZ_PROGRAM: &str = "az";

/// Entry of `az network bastion list --output json`
#[derive(Debug, Deserialize)]
struct BastionHost {
    name: String,
}

/// Subset of `az vm show --output json`
#[derive(Debug, Deserialize)]
struct VirtualMachine {
    id: String,
}

/// Handle on a located `az` binary
#[derive(Debug, Clone)]
pub struct AzureCli {
    program: PathBuf,
}

impl AzureCli {
    /// Locate the Azure CLI
    ///
    /// An explicit path must point at an existing file; otherwise `az` is
    /// searched on `PATH`.
    pub fn locate(explicit: Option<&Path>) -> Result<Self, LaunchError> {
        let program = match explicit {
            Some(path) if path.is_file() => path.to_path_buf(),
            Some(path) => return Err(LaunchError::CliNotFound(path.display().to_string())),
            None => which::which(AZ_PROGRAM)
                .map_err(|e| LaunchError::CliNotFound(format!("'{}' on PATH: {}", AZ_PROGRAM, e)))?,
        };

        tracing::debug!("Using Azure CLI at {:?}", program);
        Ok(Self { program })
    }

    /// Path of the binary in use
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Check whether the CLI has a usable login
    pub fn is_logged_in(&self) -> bool {
        Command::new(&self.program)
            .args(["account", "show", "--output", "none"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Name of the bastion host in a resource group
    pub fn bastion_name(&self, resource_group: &str) -> Result<String, LaunchError> {
        let output = self.run_json(&[
            "network",
            "bastion",
            "list",
            "--resource-group",
            resource_group,
            "--output",
            "json",
        ])?;

        let hosts: Vec<BastionHost> = serde_json::from_slice(&output)
            .map_err(|e| LaunchError::Lookup(format!("unreadable bastion list: {}", e)))?;
        if hosts.len() > 1 {
            tracing::debug!(
                "{} bastion hosts in {}, using the last one",
                hosts.len(),
                resource_group
            );
        }

        hosts
            .into_iter()
            .last()
            .map(|h| h.name)
            .ok_or_else(|| LaunchError::Lookup(format!("no bastion host in resource group {}", resource_group)))
    }

    /// Resource id of a VM
    pub fn vm_resource_id(&self, resource_group: &str, vm_name: &str) -> Result<String, LaunchError> {
        let output = self.run_json(&[
            "vm",
            "show",
            "--resource-group",
            resource_group,
            "--name",
            vm_name,
            "--output",
            "json",
        ])?;

        let vm: VirtualMachine = serde_json::from_slice(&output)
            .map_err(|e| LaunchError::Lookup(format!("unreadable VM {}: {}", vm_name, e)))?;
        Ok(vm.id)
    }

    /// Command that opens a tunnel for a host
    pub fn tunnel_command(&self, host: &HostEntry, bastion_name: &str, resource_id: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(tunnel_args(host, bastion_name, resource_id));
        cmd
    }

    fn run_json(&self, args: &[&str]) -> Result<Vec<u8>, LaunchError> {
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LaunchError::Lookup(format!(
                "az {} failed: {}",
                args.iter().take(3).copied().collect::<Vec<_>>().join(" "),
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

/// Arguments of `az network bastion tunnel` for a host
pub fn tunnel_args(host: &HostEntry, bastion_name: &str, resource_id: &str) -> Vec<String> {
    let mut args: Vec<String> = TUNNEL_SUBCOMMAND.iter().map(|s| s.to_string()).collect();
    args.extend([
        "--name".to_string(),
        bastion_name.to_string(),
        "--resource-group".to_string(),
        host.resource_group.clone(),
        "--target-resource-id".to_string(),
        resource_id.to_string(),
        "--resource-port".to_string(),
        host.resource_port.to_string(),
        "--port".to_string(),
        host.ansible_port.to_string(),
    ]);
    args
}
