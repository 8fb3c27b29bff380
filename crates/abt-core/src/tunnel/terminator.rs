//! Stopping tunnel processes

use super::TunnelRegistry;
use crate::error::TerminationError;

/// What happened to a tunnel we tried to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// SIGTERM delivered
    Terminated,
    /// The process was gone before the signal was sent
    AlreadyExited,
}

/// Result of stopping one tunnel
#[derive(Debug)]
pub struct TerminationReport {
    pub pid: u32,
    pub port: u16,
    pub result: Result<TerminationOutcome, TerminationError>,
}

impl TerminationReport {
    /// Check if the tunnel is no longer running
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Stop the tunnels in a registry snapshot
///
/// With `ports`, only tunnels bound to one of those ports are signalled.
/// Nothing outside the registry is ever touched, so a process squatting on a
/// configured port survives.
pub fn terminate(registry: &TunnelRegistry, ports: Option<&[u16]>) -> Vec<TerminationReport> {
    registry
        .iter()
        .filter(|tunnel| ports.map_or(true, |p| p.contains(&tunnel.port)))
        .map(|tunnel| {
            let result = terminate_pid(tunnel.pid);
            match &result {
                Ok(outcome) => {
                    tracing::info!("Tunnel pid={} port={}: {:?}", tunnel.pid, tunnel.port, outcome)
                }
                Err(e) => tracing::warn!("Tunnel pid={} port={}: {}", tunnel.pid, tunnel.port, e),
            }
            TerminationReport {
                pid: tunnel.pid,
                port: tunnel.port,
                result,
            }
        })
        .collect()
}

/// Send SIGTERM to one process
///
/// `ESRCH` means the process already exited, which counts as success.
#[cfg(unix)]
pub fn terminate_pid(pid: u32) -> Result<TerminationOutcome, TerminationError> {
    let pid_t = libc::pid_t::try_from(pid).map_err(|_| TerminationError::Signal {
        pid,
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "pid out of range"),
    })?;

    // SAFETY: kill(2) has no memory-safety preconditions
    let result = unsafe { libc::kill(pid_t, libc::SIGTERM) };
    if result == 0 {
        return Ok(TerminationOutcome::Terminated);
    }

    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(TerminationOutcome::AlreadyExited)
    } else {
        Err(TerminationError::Signal { pid, source: err })
    }
}

#[cfg(not(unix))]
pub fn terminate_pid(pid: u32) -> Result<TerminationOutcome, TerminationError> {
    use sysinfo::{Pid, ProcessesToUpdate, System};

    let pid_key = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid_key]), true);

    match system.process(pid_key) {
        None => Ok(TerminationOutcome::AlreadyExited),
        Some(process) if process.kill() => Ok(TerminationOutcome::Terminated),
        Some(_) => Err(TerminationError::Signal {
            pid,
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "kill refused"),
        }),
    }
}
