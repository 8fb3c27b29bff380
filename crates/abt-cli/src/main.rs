//! ansible-bastion-tunnels CLI
//!
//! Dynamic inventory script for Ansible:
//! - `--list` / `--host` (called by Ansible, JSON on stdout)
//! - `--list-tunnels` / `--kill-tunnels` (tunnel housekeeping)

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgGroup, Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use abt_core::config::resolve_config_path;
use abt_core::MissingTunnelPolicy;
use ansible_bastion_tunnels::commands::{self, InventoryOptions};

#[derive(Parser)]
#[command(name = "ansible-bastion-tunnels")]
#[command(author, version, about = "Ansible connections through Azure Bastion tunnels")]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["list", "host", "list_tunnels", "kill_tunnels"])
))]
struct Cli {
    /// Path to the host file [default: ansible_bastion_tunnels.yml]
    #[arg(short = 'c', long = "config-file", value_name = "PATH")]
    config_file: Option<PathBuf>,

    /// Print the inventory
    #[arg(short, long)]
    list: bool,

    /// Print the variables of one host
    #[arg(long, value_name = "NAME")]
    host: Option<String>,

    /// List tunnel processes
    #[arg(short = 't', long)]
    list_tunnels: bool,

    /// Terminate tunnel processes (all, or only those of the named hosts)
    #[arg(short = 'k', long, value_name = "HOST", num_args = 0..)]
    kill_tunnels: Option<Vec<String>>,

    /// Azure CLI binary to use instead of `az` on PATH
    #[arg(long, value_name = "PATH")]
    az_path: Option<PathBuf>,

    /// Keep or drop hosts whose tunnel could not be started
    #[arg(long, value_enum, default_value_t = MissingTunnel::Include)]
    missing_tunnel: MissingTunnel,

    /// Print JSON on a single line
    #[arg(long)]
    compact: bool,

    /// Enable verbose output (on stderr)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum MissingTunnel {
    /// Keep the host with its configured address
    Include,
    /// Leave the host out of the inventory
    Exclude,
}

impl From<MissingTunnel> for MissingTunnelPolicy {
    fn from(value: MissingTunnel) -> Self {
        match value {
            MissingTunnel::Include => MissingTunnelPolicy::Include,
            MissingTunnel::Exclude => MissingTunnelPolicy::Exclude,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity; stdout is reserved for Ansible
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let explicit_config = cli.config_file.is_some();
    let config_path = resolve_config_path(cli.config_file.as_deref());
    tracing::debug!("Host file: {:?}", config_path);

    let options = InventoryOptions {
        config_path: config_path.clone(),
        az_path: cli.az_path,
        policy: cli.missing_tunnel.into(),
        pretty: !cli.compact,
    };

    if cli.list {
        commands::list_command(&options)?;
    } else if let Some(host) = cli.host {
        commands::host_command(&options, &host)?;
    } else if cli.list_tunnels {
        commands::list_tunnels_command(&config_path, explicit_config)?;
    } else if let Some(hosts) = cli.kill_tunnels {
        commands::kill_tunnels_command(&config_path, &hosts)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_kill_tunnels_without_hosts() {
        let cli = Cli::try_parse_from(["ansible-bastion-tunnels", "-k"]).unwrap();
        assert_eq!(cli.kill_tunnels, Some(vec![]));
    }

    #[test]
    fn test_kill_tunnels_with_hosts_and_config() {
        let cli = Cli::try_parse_from([
            "ansible-bastion-tunnels",
            "--kill-tunnels",
            "server01",
            "server02",
            "-c",
            "hosts.yml",
        ])
        .unwrap();
        assert_eq!(
            cli.kill_tunnels,
            Some(vec!["server01".to_string(), "server02".to_string()])
        );
        assert_eq!(cli.config_file, Some(PathBuf::from("hosts.yml")));
    }

    #[test]
    fn test_mode_is_required() {
        assert!(Cli::try_parse_from(["ansible-bastion-tunnels"]).is_err());
        assert!(Cli::try_parse_from(["ansible-bastion-tunnels", "-c", "x.yml"]).is_err());
    }

    #[test]
    fn test_modes_are_exclusive() {
        assert!(Cli::try_parse_from(["ansible-bastion-tunnels", "--list", "--list-tunnels"]).is_err());
    }

    #[test]
    fn test_missing_tunnel_policy() {
        let cli =
            Cli::try_parse_from(["ansible-bastion-tunnels", "-l", "--missing-tunnel", "exclude"])
                .unwrap();
        assert_eq!(
            MissingTunnelPolicy::from(cli.missing_tunnel),
            MissingTunnelPolicy::Exclude
        );
    }
}
