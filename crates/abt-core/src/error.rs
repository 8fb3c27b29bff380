//! Core error types for ansible-bastion-tunnels

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the host list
///
/// Any of these aborts the whole invocation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Config file exists but could not be read
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed YAML or a wrongly typed attribute
    #[error("YAML parse error in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A host's attributes have the wrong type
    #[error("YAML parse error in {path:?} for host '{host}': {source}")]
    HostParse {
        path: PathBuf,
        host: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Missing required field
    #[error("Host '{host}' is missing required field '{field}'")]
    MissingField { host: String, field: &'static str },

    /// Field present but unusable
    #[error("Host '{host}' has invalid '{field}': {reason}")]
    InvalidField {
        host: String,
        field: &'static str,
        reason: String,
    },

    /// Two hosts share a local port
    #[error("Port {port} is used by both '{first}' and '{second}'")]
    DuplicatePort {
        port: u16,
        first: String,
        second: String,
    },

    /// Host name appears more than once
    #[error("Host '{0}' is defined more than once")]
    DuplicateHost(String),

    /// Group name collides with an inventory keyword
    #[error("Group name '{0}' is reserved")]
    ReservedGroup(String),

    /// Document defines no hosts at all
    #[error("No hosts defined in {0:?}")]
    NoHosts(PathBuf),
}

/// Per-host failure to bring up a tunnel
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The Azure CLI binary could not be found
    #[error("Azure CLI not found: {0}")]
    CliNotFound(String),

    /// `az account show` reported no usable login
    #[error("Azure CLI is not logged in. Run: az login")]
    NotLoggedIn,

    /// Spawning the tunnel subprocess failed
    #[error("Failed to spawn tunnel: {0}")]
    Spawn(#[from] std::io::Error),

    /// Resolving the bastion or VM through `az` failed
    #[error("Azure lookup failed: {0}")]
    Lookup(String),
}

/// Per-process failure to stop a tunnel
#[derive(Error, Debug)]
pub enum TerminationError {
    /// Signal delivery failed for a live process
    #[error("Failed to signal pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}
