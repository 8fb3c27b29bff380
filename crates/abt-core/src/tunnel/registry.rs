//! Point-in-time view of the running tunnels

use std::collections::BTreeMap;

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, Uid, UpdateKind};

use super::{parse_tunnel_cmdline, TunnelProcess};
use crate::config::{HostEntry, InventoryConfig};
use crate::traits::{ProcessSnapshot, ProcessTable};

/// Tunnels owned by the invoking user, keyed by local port
///
/// Built fresh from the process table every time it is needed. A tunnel that
/// exits after the scan simply disappears from the next one.
#[derive(Debug, Clone, Default)]
pub struct TunnelRegistry {
    tunnels: BTreeMap<u16, TunnelProcess>,
}

impl TunnelRegistry {
    /// Scan a process table
    pub fn scan(table: &impl ProcessTable) -> Self {
        let uid = table.current_uid();
        Self::from_processes(uid.as_deref(), table.processes())
    }

    /// Build a registry from snapshots
    ///
    /// When `uid` is known, processes of other users are ignored. Processes
    /// whose command line does not carry the tunnel signature are never
    /// included, whatever port they hold.
    pub fn from_processes(
        uid: Option<&str>,
        processes: impl IntoIterator<Item = ProcessSnapshot>,
    ) -> Self {
        let mut tunnels: BTreeMap<u16, TunnelProcess> = BTreeMap::new();

        for process in processes {
            if uid.is_some() && process.uid.as_deref() != uid {
                continue;
            }
            let Some(args) = parse_tunnel_cmdline(&process.cmd) else {
                continue;
            };

            tracing::debug!("Found tunnel pid={} port={}", process.pid, args.port);
            let tunnel = TunnelProcess {
                pid: process.pid,
                port: args.port,
                owner_uid: process.uid,
                resource_group: args.resource_group,
                target_resource_id: args.target_resource_id,
                bastion_name: args.bastion_name,
                cmd: process.cmd,
            };

            if let Some(existing) = tunnels.get(&tunnel.port) {
                tracing::warn!(
                    "Port {} claimed by tunnels {} and {}, keeping {}",
                    tunnel.port,
                    existing.pid,
                    tunnel.pid,
                    existing.pid.min(tunnel.pid)
                );
                if existing.pid <= tunnel.pid {
                    continue;
                }
            }
            tunnels.insert(tunnel.port, tunnel);
        }

        Self { tunnels }
    }

    /// Tunnel bound to a local port
    pub fn get(&self, port: u16) -> Option<&TunnelProcess> {
        self.tunnels.get(&port)
    }

    /// Tunnel that satisfies a host, if any
    pub fn satisfying(&self, host: &HostEntry) -> Option<&TunnelProcess> {
        self.get(host.ansible_port)
    }

    /// Hosts with no tunnel on their port, in config order
    pub fn unmatched_hosts<'a>(&self, config: &'a InventoryConfig) -> Vec<&'a HostEntry> {
        config
            .hosts()
            .filter(|host| self.satisfying(host).is_none())
            .collect()
    }

    /// Tunnels ordered by port
    pub fn iter(&self) -> impl Iterator<Item = &TunnelProcess> {
        self.tunnels.values()
    }

    /// Number of tunnels
    pub fn len(&self) -> usize {
        self.tunnels.len()
    }

    /// Check if no tunnels are running
    pub fn is_empty(&self) -> bool {
        self.tunnels.is_empty()
    }
}

/// Process table backed by `sysinfo`
pub struct SystemProcessTable {
    system: System,
}

impl SystemProcessTable {
    /// Take a snapshot of the process table
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new()
                .with_cmd(UpdateKind::Always)
                .with_user(UpdateKind::Always),
        );
        Self { system }
    }
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SystemProcessTable {
    fn current_uid(&self) -> Option<String> {
        let pid = sysinfo::get_current_pid().ok()?;
        self.system.process(pid)?.user_id().map(uid_key)
    }

    fn processes(&self) -> Vec<ProcessSnapshot> {
        self.system
            .processes()
            .iter()
            // Linux threads show up as tasks sharing the parent's command line
            .filter(|(_, process)| process.thread_kind().is_none())
            .map(|(pid, process)| ProcessSnapshot {
                pid: pid.as_u32(),
                uid: process.user_id().map(uid_key),
                cmd: process
                    .cmd()
                    .iter()
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect(),
            })
            .collect()
    }
}

fn uid_key(uid: &Uid) -> String {
    format!("{:?}", uid)
}
