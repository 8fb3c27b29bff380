//! Output formatting utilities for the CLI
//!
//! Human-readable output only. In inventory modes stdout belongs to Ansible,
//! so everything here that may run alongside `--list` writes to stderr.

use std::collections::HashMap;
use std::io::{self, Write};

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

use tabled::{settings::Style, Table, Tabled};

use abt_core::tunnel::{LaunchReport, TunnelState};
use abt_core::TunnelRegistry;

/// Format running tunnels as an ASCII table
///
/// `host_names` maps local ports to configured host names and may be empty
/// when no host file is available.
pub fn format_tunnels(registry: &TunnelRegistry, host_names: &HashMap<u16, String>) -> String {
    if registry.is_empty() {
        return "No tunnels running".to_string();
    }

    #[derive(Tabled)]
    struct TunnelRow {
        #[tabled(rename = "PID")]
        pid: u32,
        #[tabled(rename = "PORT")]
        port: u16,
        #[tabled(rename = "HOST")]
        host: String,
        #[tabled(rename = "RESOURCE GROUP")]
        resource_group: String,
        #[tabled(rename = "BASTION")]
        bastion: String,
        #[tabled(rename = "TARGET")]
        target: String,
        #[tabled(rename = "OWNER")]
        owner: String,
    }

    // Scans only ever return tunnels of the invoking user
    let owner = whoami::username();

    let rows: Vec<TunnelRow> = registry
        .iter()
        .map(|t| TunnelRow {
            pid: t.pid,
            port: t.port,
            host: host_names
                .get(&t.port)
                .cloned()
                .unwrap_or_else(|| "-".to_string()),
            resource_group: t.resource_group.clone(),
            bastion: t.bastion_name.clone().unwrap_or_else(|| "-".to_string()),
            target: resource_name(&t.target_resource_id).to_string(),
            owner: owner.clone(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Report per-host launch results on stderr
///
/// Successful launches are only logged; failures are always shown.
pub fn report_launches(reports: &[LaunchReport]) {
    for report in reports {
        match &report.state {
            TunnelState::Running { pid } => {
                tracing::debug!("{} uses tunnel pid {}", report.host, pid);
            }
            TunnelState::Launched { pid } => {
                tracing::info!(
                    "Started tunnel for {} on port {} (PID: {})",
                    report.host,
                    report.port,
                    pid
                );
            }
            TunnelState::Failed(e) => {
                print_error(&format!("{} (port {}): {}", report.host, report.port, e));
            }
        }
    }
}

/// Last segment of an Azure resource id (the VM name)
fn resource_name(resource_id: &str) -> &str {
    resource_id
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(resource_id)
}

/// Write `mark msg` with the mark coloured
fn write_marked(out: &mut impl Write, color: Color, mark: &str, msg: &str) -> io::Result<()> {
    crossterm::queue!(
        out,
        SetForegroundColor(color),
        Print(mark),
        Print(' '),
        ResetColor,
        Print(msg),
        Print('\n')
    )?;
    out.flush()
}

/// `✓` line on stdout
pub fn print_success(msg: &str) {
    let _ = write_marked(&mut io::stdout(), Color::Green, "✓", msg);
}

/// `✗` line on stderr
pub fn print_error(msg: &str) {
    let _ = write_marked(&mut io::stderr(), Color::Red, "✗", msg);
}

/// `⚠` line on stderr, next to the inventory JSON
pub fn print_warning(msg: &str) {
    let _ = write_marked(&mut io::stderr(), Color::Yellow, "⚠", msg);
}

pub fn print_info(msg: &str) {
    let _ = write_marked(&mut io::stdout(), Color::Cyan, "ℹ", msg);
}
