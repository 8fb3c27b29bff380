//! Kill-tunnels command implementation

use std::path::Path;

use anyhow::{Context, Result};

use abt_core::config;
use abt_core::tunnel::{terminate, SystemProcessTable, TerminationOutcome, TunnelRegistry};

use crate::output::{print_error, print_info, print_success};

/// Execute `--kill-tunnels`
///
/// With no host names every tunnel of the current user is stopped;
/// otherwise only the tunnels on those hosts' ports.
pub fn kill_tunnels_command(config_path: &Path, hosts: &[String]) -> Result<()> {
    let ports = if hosts.is_empty() {
        None
    } else {
        let config = config::load_config(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?;
        let ports = hosts
            .iter()
            .map(|name| {
                config
                    .host(name)
                    .map(|h| h.ansible_port)
                    .with_context(|| format!("Unknown host: {}", name))
            })
            .collect::<Result<Vec<u16>>>()?;
        Some(ports)
    };

    let registry = TunnelRegistry::scan(&SystemProcessTable::new());
    let reports = terminate(&registry, ports.as_deref());

    if reports.is_empty() {
        if ports.is_some() {
            print_info("No tunnels running for the given hosts");
        } else {
            print_info("No tunnels running");
        }
        return Ok(());
    }

    let mut errors = 0;
    for report in &reports {
        match &report.result {
            Ok(TerminationOutcome::Terminated) => {
                print_success(&format!(
                    "Terminated tunnel on port {} (PID: {})",
                    report.port, report.pid
                ));
            }
            Ok(TerminationOutcome::AlreadyExited) => {
                print_success(&format!(
                    "Tunnel on port {} (PID: {}) had already exited",
                    report.port, report.pid
                ));
            }
            Err(e) => {
                print_error(&format!("Failed to terminate tunnel on port {}: {}", report.port, e));
                errors += 1;
            }
        }
    }

    println!(
        "Stopped {} of {} tunnel(s)",
        reports.len() - errors,
        reports.len()
    );

    if errors > 0 {
        anyhow::bail!("Failed to terminate {} tunnel(s)", errors);
    }
    Ok(())
}
