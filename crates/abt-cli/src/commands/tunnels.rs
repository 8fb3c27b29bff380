//! List-tunnels command implementation

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

use abt_core::config;
use abt_core::ConfigError;
use abt_core::tunnel::{SystemProcessTable, TunnelRegistry};

use crate::output::format_tunnels;

/// Execute `--list-tunnels`
///
/// The host file only labels ports, so a missing default file is skipped.
/// A file given with `-c` must exist, and a broken one is always an error.
pub fn list_tunnels_command(config_path: &Path, explicit: bool) -> Result<()> {
    let host_names: HashMap<u16, String> = match config::load_config(config_path) {
        Ok(config) => config
            .hosts()
            .map(|h| (h.ansible_port, h.name.clone()))
            .collect(),
        Err(ConfigError::NotFound(path)) if !explicit => {
            tracing::debug!("No host file at {:?}, ports stay unlabelled", path);
            HashMap::new()
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to load config from {:?}", config_path));
        }
    };

    let registry = TunnelRegistry::scan(&SystemProcessTable::new());
    println!("{}", format_tunnels(&registry, &host_names));
    Ok(())
}
