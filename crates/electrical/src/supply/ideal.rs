use simcore::SimError;

use super::VoltageSupply;

pub const IDEAL_DEFAULT_U_NOMINAL: f64 = 600.0;

/// Supplies `u_nominal` regardless of time and load.
#[derive(Debug, Clone, Copy)]
pub struct IdealVoltageSupply {
    u_nominal: f64,
    supply_range: [(f64, f64); 1],
}

impl IdealVoltageSupply {
    pub fn new(u_nominal: f64) -> Self {
        IdealVoltageSupply {
            u_nominal,
            supply_range: [(u_nominal, u_nominal)],
        }
    }
}

impl Default for IdealVoltageSupply {
    fn default() -> Self {
        IdealVoltageSupply::new(IDEAL_DEFAULT_U_NOMINAL)
    }
}

impl VoltageSupply for IdealVoltageSupply {
    fn u_nominal(&self) -> f64 {
        self.u_nominal
    }

    fn supply_range(&self) -> &[(f64, f64)] {
        &self.supply_range
    }

    fn get_voltage(&mut self, _t: f64, _i_sup: f64) -> Result<Vec<f64>, SimError> {
        Ok(vec![self.u_nominal])
    }
}
