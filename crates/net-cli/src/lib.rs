//! Fabric isolation CLI
//!
//! Operator commands over an inventory file: VLAN range checks, switch
//! configuration validation, channel listing, port inspection, and
//! connect/detach/revert requests applied through the action queue.

pub mod commands;
