//! CLI command implementations

mod inventory;
mod kill;
mod tunnels;

pub use inventory::{host_command, list_command, InventoryOptions};
pub use kill::kill_tunnels_command;
pub use tunnels::list_tunnels_command;
