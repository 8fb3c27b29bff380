//! ansible-bastion-tunnels: Ansible dynamic inventory over Azure Bastion
//!
//! Provides the `ansible-bastion-tunnels` CLI, which Ansible runs as an
//! inventory script, plus commands to inspect and stop the tunnels it starts.

pub mod commands;
pub mod output;
