//! Inventory commands (`--list`, `--host`)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use abt_core::az::AzureCli;
use abt_core::config::{self, InventoryConfig};
use abt_core::inventory::{self, InventoryDocument, MissingTunnelPolicy};
use abt_core::tunnel::{SystemProcessTable, TunnelLauncher, TunnelRegistry};

use crate::output::{print_warning, report_launches};

/// Settings shared by the inventory modes
#[derive(Debug, Clone)]
pub struct InventoryOptions {
    /// Host file
    pub config_path: PathBuf,
    /// Explicit Azure CLI binary
    pub az_path: Option<PathBuf>,
    /// Handling of hosts without a tunnel
    pub policy: MissingTunnelPolicy,
    /// Indented JSON
    pub pretty: bool,
}

/// Execute `--list`: start missing tunnels and print the inventory
///
/// The inventory is printed even when some launches failed; the command
/// still exits with an error afterwards so the failure is not silent.
pub fn list_command(opts: &InventoryOptions) -> Result<()> {
    let config = load(&opts.config_path)?;

    let registry = TunnelRegistry::scan(&SystemProcessTable::new());
    let mut launcher = TunnelLauncher::new(AzureCli::locate(opts.az_path.as_deref()));
    let reports = launcher.ensure(config.hosts(), &registry);
    report_launches(&reports);

    let doc = InventoryDocument::build(&config, &reports, opts.policy);
    println!("{}", doc.to_json(opts.pretty)?);

    let failed = reports.iter().filter(|r| !r.has_tunnel()).count();
    if failed > 0 {
        if opts.policy == MissingTunnelPolicy::Exclude {
            print_warning(&format!("{} host(s) left out of the inventory", failed));
        }
        anyhow::bail!("Failed to start {} of {} tunnel(s)", failed, reports.len());
    }

    Ok(())
}

/// Execute `--host <name>`: print one host's variables
///
/// Unknown hosts print `{}`, which is what Ansible expects.
pub fn host_command(opts: &InventoryOptions, name: &str) -> Result<()> {
    let config = load(&opts.config_path)?;

    let Some(host) = config.host(name) else {
        tracing::debug!("Host {} not in {:?}", name, opts.config_path);
        println!("{{}}");
        return Ok(());
    };

    let registry = TunnelRegistry::scan(&SystemProcessTable::new());
    let mut launcher = TunnelLauncher::new(AzureCli::locate(opts.az_path.as_deref()));
    let reports = launcher.ensure([host], &registry);
    report_launches(&reports);

    let failed = reports.iter().any(|r| !r.has_tunnel());
    let dropped = failed && opts.policy == MissingTunnelPolicy::Exclude;
    if let Some(vars) = inventory::host_vars(&config, name).filter(|_| !dropped) {
        let json = if opts.pretty {
            serde_json::to_string_pretty(&vars)?
        } else {
            serde_json::to_string(&vars)?
        };
        println!("{}", json);
    } else {
        println!("{{}}");
    }

    if failed {
        anyhow::bail!("Failed to start tunnel for {}", name);
    }
    Ok(())
}

fn load(path: &Path) -> Result<InventoryConfig> {
    config::load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
}
