use log::{debug, warn};
use nalgebra::DVector;
use simcore::{EulerSolver, OdeSolver, SimError};

use super::{SupplyParameter, VoltageSupply, positive, required_f64};
use crate::error::ConfigError;

pub const RC_DEFAULT_U_NOMINAL: f64 = 600.0;

/// Below this R*C (s) the Euler update overshoots at common step sizes (1e-5 .. 1e-3 s).
pub const MIN_RC_TIME_CONSTANT: f64 = 1e-4;

/// Series resistance and capacitance of an RC supply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RcParameter {
    /// Resistance (Ohm)
    pub r: f64,
    /// Capacitance (F)
    pub c: f64,
}

impl Default for RcParameter {
    fn default() -> Self {
        RcParameter { r: 1.0, c: 4e-3 }
    }
}

impl RcParameter {
    /// Reads `R` and `C` from a parameter mapping.
    pub fn from_mapping(parameter: &SupplyParameter) -> Result<Self, ConfigError> {
        let r = positive("R", required_f64(parameter, "R")?)?;
        let c = positive("C", required_f64(parameter, "C")?)?;
        Ok(RcParameter { r, c })
    }

    pub fn time_constant(&self) -> f64 {
        self.r * self.c
    }

    /// Whether the time constant is too short for a stable fixed-step integration.
    pub fn time_constant_too_small(&self) -> bool {
        self.time_constant() < MIN_RC_TIME_CONSTANT
    }
}

/// du_sup/dt = (u_0 - u_sup - R * i_sup) / (R * C), params = [u_0, i_sup, R, C]
fn system_equation(_t: f64, u_sup: &DVector<f64>, params: &[f64]) -> DVector<f64> {
    let (u_0, i_sup, r, c) = (params[0], params[1], params[2], params[3]);
    DVector::from_element(1, (u_0 - u_sup[0] - r * i_sup) / (r * c))
}

/// Non-ideal DC source: an ideal source `u_0` behind a series resistor, buffered
/// by a capacitor. The capacitor voltage lags the load with time constant R*C.
///
/// The output is not clamped to the supply range, so an unstable integration
/// shows up in the returned voltage.
#[derive(Debug)]
pub struct RcVoltageSupply {
    u_nominal: f64,
    u_0: f64,
    parameter: RcParameter,
    supply_range: [(f64, f64); 1],
    solver: EulerSolver,
}

impl RcVoltageSupply {
    pub fn new(u_nominal: f64, parameter: RcParameter) -> Self {
        if parameter.time_constant_too_small() {
            warn!(
                "RC supply time constant R*C = {:e} s is below {:e} s; the supply voltage may be computed incorrectly. Consider R*C as a time constant relative to the step size.",
                parameter.time_constant(),
                MIN_RC_TIME_CONSTANT
            );
        }

        let mut solver = EulerSolver::new();
        solver.set_system_equation(Box::new(system_equation));
        solver.set_initial_value(DVector::from_element(1, u_nominal), 0.0);

        RcVoltageSupply {
            u_nominal,
            u_0: u_nominal,
            parameter,
            // Empty capacitor up to fully loaded capacitor
            supply_range: [(0.0, u_nominal)],
            solver,
        }
    }

    /// Builds the supply from an optional parameter mapping, defaulting to R = 1, C = 4e-3.
    pub fn from_parameter(
        u_nominal: f64,
        parameter: Option<&SupplyParameter>,
    ) -> Result<Self, ConfigError> {
        let parameter = match parameter {
            Some(mapping) => RcParameter::from_mapping(mapping)?,
            None => RcParameter::default(),
        };
        Ok(RcVoltageSupply::new(u_nominal, parameter))
    }

    pub fn parameter(&self) -> RcParameter {
        self.parameter
    }

    /// Present capacitor voltage.
    pub fn capacitor_voltage(&self) -> f64 {
        self.solver.y()[0]
    }

    pub fn solver(&self) -> &EulerSolver {
        &self.solver
    }
}

impl VoltageSupply for RcVoltageSupply {
    fn u_nominal(&self) -> f64 {
        self.u_nominal
    }

    fn supply_range(&self) -> &[(f64, f64)] {
        &self.supply_range
    }

    fn reset(&mut self) -> Result<Vec<f64>, SimError> {
        // The capacitor starts every episode fully loaded
        self.solver
            .set_initial_value(DVector::from_element(1, self.u_0), 0.0);
        debug!("RC supply reset to {} V", self.u_0);
        Ok(vec![self.u_0])
    }

    fn get_voltage(&mut self, t: f64, i_sup: f64) -> Result<Vec<f64>, SimError> {
        self.solver
            .set_f_params(&[self.u_0, i_sup, self.parameter.r, self.parameter.c]);
        let u_sup = self.solver.integrate(t)?;
        Ok(vec![u_sup[0]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn mapping(value: serde_json::Value) -> SupplyParameter {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_reset_restores_nominal_and_time() {
        let mut supply = RcVoltageSupply::new(600.0, RcParameter::default());
        for k in 1..=50 {
            supply.get_voltage(k as f64 * 1e-4, 80.0).unwrap();
        }
        assert!(supply.capacitor_voltage() < 600.0);

        assert_eq!(supply.reset().unwrap(), vec![600.0]);
        assert_eq!(supply.solver().t(), 0.0);
        assert_eq!(supply.capacitor_voltage(), 600.0);
    }

    #[test]
    fn test_euler_update_under_load() {
        let mut supply = RcVoltageSupply::new(600.0, RcParameter { r: 1.0, c: 4e-3 });
        supply.reset().unwrap();

        let u = supply.get_voltage(1e-4, 10.0).unwrap();

        // 600 + 1e-4 * (600 - 600 - 1 * 10) / 4e-3
        assert_relative_eq!(u[0], 600.0 - 0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_load_approaches_source_voltage() {
        let mut supply = RcVoltageSupply::new(600.0, RcParameter::default());
        supply.reset().unwrap();

        // Discharge under load, then release it
        let mut t = 0.0;
        for _ in 0..100 {
            t += 1e-4;
            supply.get_voltage(t, 100.0).unwrap();
        }
        let mut previous = supply.capacitor_voltage();
        assert!(previous < 600.0);

        for _ in 0..1000 {
            t += 1e-4;
            let u = supply.get_voltage(t, 0.0).unwrap()[0];
            assert!(u >= previous);
            assert!(u <= 600.0);
            previous = u;
        }
        assert_relative_eq!(previous, 600.0, epsilon = 1e-3);
    }

    #[test]
    fn test_steady_state_voltage_drop() {
        let mut supply = RcVoltageSupply::new(600.0, RcParameter { r: 0.5, c: 1e-2 });
        supply.reset().unwrap();
        let mut u = 600.0;
        for k in 1..=20_000 {
            u = supply.get_voltage(k as f64 * 1e-4, 40.0).unwrap()[0];
        }
        // u_0 - R * i_sup
        assert_relative_eq!(u, 580.0, epsilon = 1e-6);
    }

    #[test]
    fn test_time_constant_threshold() {
        assert!(RcParameter { r: 1.0, c: 1e-5 }.time_constant_too_small());
        assert!(!RcParameter { r: 1.0, c: 4e-3 }.time_constant_too_small());
        assert!(!RcParameter { r: 1.0, c: 1e-4 }.time_constant_too_small());
    }

    #[test]
    fn test_time_constant_warning_on_construction() {
        let assert_warnings = |parameter: RcParameter, expected: usize| {
            testing_logger::setup();
            let _supply = RcVoltageSupply::new(600.0, parameter);
            testing_logger::validate(|logs| {
                let warnings = logs.iter().filter(|record| record.level == log::Level::Warn).count();
                assert_eq!(warnings, expected);
            });
        };

        assert_warnings(RcParameter { r: 1.0, c: 1e-5 }, 1);
        assert_warnings(RcParameter { r: 1.0, c: 4e-3 }, 0);
    }

    #[test]
    fn test_unstable_output_is_not_clamped() {
        // h / (R C) = 10 makes every Euler step overshoot
        let mut supply = RcVoltageSupply::new(600.0, RcParameter { r: 1.0, c: 1e-5 });
        supply.reset().unwrap();
        let u = supply.get_voltage(1e-4, 100.0).unwrap()[0];

        assert_relative_eq!(u, 600.0 - 1000.0, epsilon = 1e-6);
        assert!(u < supply.supply_range()[0].0);
    }

    #[test]
    fn test_from_parameter() {
        let supply = RcVoltageSupply::from_parameter(400.0, Some(&mapping(json!({ "R": 2, "C": 0.5 })))).unwrap();
        assert_eq!(supply.parameter(), RcParameter { r: 2.0, c: 0.5 });
        assert_eq!(supply.supply_range(), &[(0.0, 400.0)]);

        let supply = RcVoltageSupply::from_parameter(400.0, None).unwrap();
        assert_eq!(supply.parameter(), RcParameter::default());
    }

    #[test]
    fn test_missing_keys() {
        assert_eq!(
            RcVoltageSupply::from_parameter(600.0, Some(&mapping(json!({ "C": 4e-3 })))).err(),
            Some(ConfigError::MissingKey("R"))
        );
        assert_eq!(
            RcVoltageSupply::from_parameter(600.0, Some(&mapping(json!({ "R": 1.0 })))).err(),
            Some(ConfigError::MissingKey("C"))
        );
    }

    #[test]
    fn test_non_positive_resistance_rejected() {
        let err = RcVoltageSupply::from_parameter(600.0, Some(&mapping(json!({ "R": 0.0, "C": 4e-3 })))).err();
        assert!(matches!(err, Some(ConfigError::InvalidValue { key: "R", .. })));
    }
}
