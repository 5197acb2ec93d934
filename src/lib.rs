//! solarkbridge - poll Sol-Ark Cloud inverter telemetry and expose
//! normalized snapshots to a host automation platform.

pub mod core;
pub mod integration;
pub mod server;
pub mod services;
pub mod snapshot;
