//! Voltage supplies
//!
//! Every supply answers the same two questions once per simulation step: what
//! voltage does it deliver at the start of an episode, and what does it deliver
//! at time `t` while the system draws `i_sup` from it. Stateful supplies own
//! whatever they need to answer that (capacitor voltage, phase angle) and
//! rebuild it on every reset.

mod ac;
mod config;
mod ideal;
mod rc;

pub use ac::*;
pub use config::*;
pub use ideal::*;
pub use rc::*;

use serde_json::{Map, Value};
use simcore::SimError;

use crate::error::ConfigError;

/// Untyped supply parameters as they arrive from configuration.
pub type SupplyParameter = Map<String, Value>;

/// A source of supply voltage for the physical system.
pub trait VoltageSupply: Send {
    /// Rated voltage of the supply.
    fn u_nominal(&self) -> f64;

    /// Admissible instantaneous voltage, one closed interval per phase.
    fn supply_range(&self) -> &[(f64, f64)];

    /// Number of voltages returned per call.
    fn phases(&self) -> usize {
        self.supply_range().len()
    }

    /// Restores the episode start state and returns the initial voltage.
    fn reset(&mut self) -> Result<Vec<f64>, SimError> {
        self.get_voltage(0.0, 0.0)
    }

    /// Supply voltage at time `t` while `i_sup` flows into the system.
    fn get_voltage(&mut self, t: f64, i_sup: f64) -> Result<Vec<f64>, SimError>;

    /// Reseeds any random source owned by the supply.
    fn seed(&mut self, _seed: u64) {}
}

fn required<'a>(parameter: &'a SupplyParameter, key: &'static str) -> Result<&'a Value, ConfigError> {
    parameter.get(key).ok_or(ConfigError::MissingKey(key))
}

pub(crate) fn required_f64(parameter: &SupplyParameter, key: &'static str) -> Result<f64, ConfigError> {
    let value = required(parameter, key)?
        .as_f64()
        .ok_or(ConfigError::InvalidType { key, expected: "number" })?;
    if !value.is_finite() {
        return Err(ConfigError::InvalidValue {
            key,
            reason: format!("{value} is not finite"),
        });
    }
    Ok(value)
}

pub(crate) fn required_bool(parameter: &SupplyParameter, key: &'static str) -> Result<bool, ConfigError> {
    required(parameter, key)?
        .as_bool()
        .ok_or(ConfigError::InvalidType { key, expected: "boolean" })
}

pub(crate) fn positive(key: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            key,
            reason: format!("{value} must be positive"),
        })
    }
}
