//! Bastion tunnel processes
//!
//! A tunnel is an `az network bastion tunnel` subprocess listening on a
//! local port. Tunnels are never tracked in a state file: the OS process
//! table is scanned on every invocation and the local port links a live
//! process back to the configured host.

mod launcher;
mod registry;
mod terminator;

pub use launcher::{LaunchReport, TunnelLauncher, TunnelState};
pub use registry::{SystemProcessTable, TunnelRegistry};
pub use terminator::{terminate, terminate_pid, TerminationOutcome, TerminationReport};

/// Subcommand tokens every tunnel invocation carries, in order
pub const TUNNEL_SUBCOMMAND: [&str; 3] = ["network", "bastion", "tunnel"];

/// A live tunnel subprocess observed in the process table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelProcess {
    /// Process ID
    pub pid: u32,
    /// Local listen port (`--port`)
    pub port: u16,
    /// Owner as reported by the process table
    pub owner_uid: Option<String>,
    /// `--resource-group`
    pub resource_group: String,
    /// `--target-resource-id`
    pub target_resource_id: String,
    /// `--name`, when given
    pub bastion_name: Option<String>,
    /// Full command line
    pub cmd: Vec<String>,
}

/// Arguments recovered from a tunnel command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelArgs {
    pub port: u16,
    pub resource_group: String,
    pub target_resource_id: String,
    pub bastion_name: Option<String>,
}

/// Match a command line against the tunnel signature
///
/// Returns `None` unless the command line carries the contiguous
/// `network bastion tunnel` subcommand plus `--resource-group`,
/// `--target-resource-id` and a numeric `--port`. The interpreter prefix
/// (`python -m azure.cli` on Linux, `az.cmd` on Windows) is ignored.
pub fn parse_tunnel_cmdline(cmd: &[String]) -> Option<TunnelArgs> {
    let has_subcommand = cmd
        .windows(TUNNEL_SUBCOMMAND.len())
        .any(|w| w.iter().zip(TUNNEL_SUBCOMMAND).all(|(arg, want)| arg == want));
    if !has_subcommand {
        return None;
    }

    let resource_group = flag_value(cmd, &["--resource-group", "-g"])?;
    let target_resource_id = flag_value(cmd, &["--target-resource-id"])?;
    let port = flag_value(cmd, &["--port"])?.parse::<u16>().ok()?;

    Some(TunnelArgs {
        port,
        resource_group,
        target_resource_id,
        bastion_name: flag_value(cmd, &["--name", "-n"]),
    })
}

/// Value of the first matching flag, in `--flag value` or `--flag=value` form
fn flag_value(cmd: &[String], names: &[&str]) -> Option<String> {
    let mut iter = cmd.iter();
    while let Some(arg) = iter.next() {
        for name in names {
            if arg == name {
                return iter.next().cloned();
            }
            if let Some(value) = arg
                .strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('='))
            {
                return Some(value.to_string());
            }
        }
    }
    None
}
