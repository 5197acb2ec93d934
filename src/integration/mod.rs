//! Integration modules for external systems.
pub mod solark;
