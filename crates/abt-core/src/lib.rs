//! abt-core: Core types for ansible-bastion-tunnels
//!
//! This crate loads the bastion host list, tracks the `az network bastion
//! tunnel` processes that expose each host on a local port, and renders the
//! result as an Ansible dynamic inventory.

pub mod az;
pub mod config;
pub mod error;
pub mod inventory;
pub mod traits;
pub mod tunnel;

pub use config::{HostEntry, HostGroup, InventoryConfig};
pub use error::{ConfigError, LaunchError, TerminationError};
pub use inventory::{HostVars, InventoryDocument, MissingTunnelPolicy};
pub use tunnel::{TunnelProcess, TunnelRegistry};
