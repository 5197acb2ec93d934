//! Core application modules.
pub mod config;
pub mod container;
