//! Electrical side of the motor simulation
//!
//! This crate provides:
//! - Voltage supplies (ideal, RC, single and three phase AC) behind one trait
//! - Supply configuration from JSON-compatible parameter mappings
//! - A PMSM motor bank integrated in the dq frame
//! - The physical system composing supply and motors into one step

pub mod bus;
pub mod error;
pub mod motor;
pub mod supply;
pub mod system;

pub use bus::*;
pub use error::*;
pub use motor::*;
pub use supply::*;
pub use system::*;
