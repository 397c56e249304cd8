//! simple-server-provision - single EC2 web server with a backup/restore cycle
//!
//! Creates a security group, key pair and launch template, boots one
//! instance running Apache, waits for it to serve HTTP, then snapshots its
//! root volume and swaps a restored copy back in as the boot disk.

pub mod aws;
pub mod config;
pub mod defaults;
pub mod probe;
pub mod provision;
pub mod wait;
