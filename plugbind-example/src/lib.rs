//! Flap auto-retract plugin built on plugbind.
//!
//! This module exports the plugin, its configuration and the simulated host
//! run so they can be tested without the binary.

pub mod config;
pub mod flaps;
pub mod logging;
pub mod simulation;
