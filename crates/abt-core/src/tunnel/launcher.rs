//! Starting tunnels for hosts that have none

use std::collections::HashMap;
use std::process::Stdio;

use super::TunnelRegistry;
use crate::az::AzureCli;
use crate::config::HostEntry;
use crate::error::LaunchError;

/// Tunnel situation of one host after `ensure`
#[derive(Debug)]
pub enum TunnelState {
    /// A tunnel was already listening on the host's port
    Running { pid: u32 },
    /// A new tunnel subprocess was spawned; it may still be connecting
    Launched { pid: u32 },
    /// No tunnel could be started
    Failed(LaunchError),
}

/// Outcome for one host
#[derive(Debug)]
pub struct LaunchReport {
    pub host: String,
    pub port: u16,
    pub state: TunnelState,
}

impl LaunchReport {
    /// Check if the host has (or will shortly have) a local endpoint
    pub fn has_tunnel(&self) -> bool {
        !matches!(self.state, TunnelState::Failed(_))
    }
}

/// Spawns `az network bastion tunnel` for unsatisfied hosts
///
/// Launches are fire-and-forget: the child handle is dropped right after
/// spawning and readiness is never awaited. Ansible's own connection retries
/// cover the window while the tunnel authenticates.
pub struct TunnelLauncher {
    cli: Result<AzureCli, String>,
    logged_in: Option<bool>,
    bastions: HashMap<String, String>,
}

impl TunnelLauncher {
    /// Create a launcher around a (possibly missing) Azure CLI
    ///
    /// A missing CLI is not an error here; every host that needs a tunnel
    /// reports it individually.
    pub fn new(cli: Result<AzureCli, LaunchError>) -> Self {
        Self {
            cli: cli.map_err(|e| e.to_string()),
            logged_in: None,
            bastions: HashMap::new(),
        }
    }

    /// Make sure every host has a tunnel
    ///
    /// Hosts already satisfied by the registry are left alone, so calling
    /// this again with a fresh scan starts nothing new. A failure for one
    /// host never stops the others.
    pub fn ensure<'a>(
        &mut self,
        hosts: impl IntoIterator<Item = &'a HostEntry>,
        registry: &TunnelRegistry,
    ) -> Vec<LaunchReport> {
        hosts
            .into_iter()
            .map(|host| {
                let state = match registry.satisfying(host) {
                    Some(tunnel) => {
                        tracing::debug!(
                            "{}: tunnel pid={} already on port {}",
                            host.name,
                            tunnel.pid,
                            host.ansible_port
                        );
                        TunnelState::Running { pid: tunnel.pid }
                    }
                    None => match self.launch(host) {
                        Ok(pid) => TunnelState::Launched { pid },
                        Err(e) => {
                            tracing::warn!("{}: {}", host.name, e);
                            TunnelState::Failed(e)
                        }
                    },
                };

                LaunchReport {
                    host: host.name.clone(),
                    port: host.ansible_port,
                    state,
                }
            })
            .collect()
    }

    /// Spawn a detached tunnel for one host and return its pid
    pub fn launch(&mut self, host: &HostEntry) -> Result<u32, LaunchError> {
        let cli = self
            .cli
            .as_ref()
            .map_err(|e| LaunchError::CliNotFound(e.clone()))?
            .clone();

        let needs_lookup = host.bastion_name.is_none() || host.resource_id.is_none();
        if needs_lookup && !self.check_login(&cli) {
            return Err(LaunchError::NotLoggedIn);
        }

        let bastion_name = match &host.bastion_name {
            Some(name) => name.clone(),
            None => self.bastion_for(&cli, &host.resource_group)?,
        };
        let resource_id = match &host.resource_id {
            Some(id) => id.clone(),
            None => cli.vm_resource_id(&host.resource_group, host.vm_name())?,
        };

        let mut cmd = cli.tunnel_command(host, &bastion_name, &resource_id);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Own process group, so a Ctrl+C aimed at Ansible leaves the tunnel up
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd.spawn()?;
        let pid = child.id();
        tracing::info!(
            "{}: launched tunnel pid={} on port {} via bastion {}",
            host.name,
            pid,
            host.ansible_port,
            bastion_name
        );
        Ok(pid)
    }

    fn check_login(&mut self, cli: &AzureCli) -> bool {
        *self.logged_in.get_or_insert_with(|| cli.is_logged_in())
    }

    fn bastion_for(&mut self, cli: &AzureCli, resource_group: &str) -> Result<String, LaunchError> {
        if let Some(name) = self.bastions.get(resource_group) {
            return Ok(name.clone());
        }
        let name = cli.bastion_name(resource_group)?;
        self.bastions
            .insert(resource_group.to_string(), name.clone());
        Ok(name)
    }
}
