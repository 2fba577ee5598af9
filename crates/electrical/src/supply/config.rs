use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::{
    AC1_DEFAULT_U_NOMINAL, AC3_DEFAULT_U_NOMINAL, Ac1PhaseSupply, Ac3PhaseSupply,
    IDEAL_DEFAULT_U_NOMINAL, IdealVoltageSupply, RC_DEFAULT_U_NOMINAL, RcVoltageSupply,
    SupplyParameter, VoltageSupply, positive,
};
use crate::error::ConfigError;

/// Supply model selected by a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplyKind {
    #[serde(rename = "ideal")]
    Ideal,
    #[serde(rename = "rc")]
    Rc,
    #[serde(rename = "ac1_phase")]
    Ac1Phase,
    #[serde(rename = "ac3_phase")]
    Ac3Phase,
}

impl SupplyKind {
    /// Nominal voltage used when the configuration leaves it out.
    pub fn default_u_nominal(self) -> f64 {
        match self {
            SupplyKind::Ideal => IDEAL_DEFAULT_U_NOMINAL,
            SupplyKind::Rc => RC_DEFAULT_U_NOMINAL,
            SupplyKind::Ac1Phase => AC1_DEFAULT_U_NOMINAL,
            SupplyKind::Ac3Phase => AC3_DEFAULT_U_NOMINAL,
        }
    }
}

/// Configuration of a voltage supply
///
/// ```json
/// { "kind": "rc", "u_nominal": 600.0, "supply_parameter": { "R": 1.0, "C": 4e-3 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyConfig {
    pub kind: SupplyKind,
    /// Rated voltage (V), the variant default when absent
    #[serde(default)]
    pub u_nominal: Option<f64>,
    /// Variant specific parameters, the variant default when absent
    #[serde(default)]
    pub supply_parameter: Option<SupplyParameter>,
}

impl SupplyConfig {
    pub fn new(kind: SupplyKind) -> Self {
        Self {
            kind,
            u_nominal: None,
            supply_parameter: None,
        }
    }

    /// Set the nominal voltage
    pub fn with_u_nominal(mut self, u_nominal: f64) -> Self {
        self.u_nominal = Some(u_nominal);
        self
    }

    /// Set the variant parameters
    pub fn with_parameter(mut self, parameter: SupplyParameter) -> Self {
        self.supply_parameter = Some(parameter);
        self
    }

    /// Nominal voltage after defaults are applied.
    pub fn resolved_u_nominal(&self) -> f64 {
        self.u_nominal.unwrap_or_else(|| self.kind.default_u_nominal())
    }

    /// Constructs the configured supply.
    ///
    /// `seed` fixes the random source of supplies that draw a phase; without it
    /// the source is seeded from entropy.
    pub fn build(&self, seed: Option<u64>) -> Result<Box<dyn VoltageSupply>, ConfigError> {
        let u_nominal = positive("u_nominal", self.resolved_u_nominal())?;
        let parameter = self.supply_parameter.as_ref();
        let rng = || match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        debug!("building {:?} supply, u_nominal = {} V", self.kind, u_nominal);

        let supply: Box<dyn VoltageSupply> = match self.kind {
            SupplyKind::Ideal => Box::new(IdealVoltageSupply::new(u_nominal)),
            SupplyKind::Rc => Box::new(RcVoltageSupply::from_parameter(u_nominal, parameter)?),
            SupplyKind::Ac1Phase => {
                Box::new(Ac1PhaseSupply::from_parameter(u_nominal, parameter, rng())?)
            }
            SupplyKind::Ac3Phase => {
                Box::new(Ac3PhaseSupply::from_parameter(u_nominal, parameter, rng())?)
            }
        };
        Ok(supply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_and_build_rc() {
        let config: SupplyConfig = serde_json::from_value(json!({
            "kind": "rc",
            "u_nominal": 600.0,
            "supply_parameter": { "R": 1, "C": 4e-3 }
        }))
        .unwrap();
        let mut supply = config.build(None).unwrap();

        assert_eq!(supply.reset().unwrap(), vec![600.0]);
        assert_eq!(supply.supply_range(), &[(0.0, 600.0)]);
    }

    #[test]
    fn test_defaults_per_kind() {
        let cases = [
            (SupplyKind::Ideal, 600.0, 1),
            (SupplyKind::Rc, 600.0, 1),
            (SupplyKind::Ac1Phase, 230.0, 1),
            (SupplyKind::Ac3Phase, 400.0, 3),
        ];
        for (kind, u_nominal, phases) in cases {
            let supply = SupplyConfig::new(kind).build(Some(0)).unwrap();
            assert_eq!(supply.u_nominal(), u_nominal);
            assert_eq!(supply.phases(), phases);
        }
    }

    #[test]
    fn test_kind_names() {
        let config: SupplyConfig = serde_json::from_str(r#"{ "kind": "ac3_phase" }"#).unwrap();
        assert_eq!(config.kind, SupplyKind::Ac3Phase);
        assert_eq!(config.u_nominal, None);
        assert!(serde_json::from_str::<SupplyConfig>(r#"{ "kind": "dc" }"#).is_err());
    }

    #[test]
    fn test_seeded_builds_agree() {
        let config = SupplyConfig::new(SupplyKind::Ac1Phase);
        let mut a = config.build(Some(42)).unwrap();
        let mut b = config.build(Some(42)).unwrap();
        for _ in 0..3 {
            assert_eq!(a.reset().unwrap(), b.reset().unwrap());
            assert_eq!(a.get_voltage(1e-3, 0.0).unwrap(), b.get_voltage(1e-3, 0.0).unwrap());
        }
    }

    #[test]
    fn test_parameter_errors_surface() {
        let parameter = json!({ "frequency": 50, "phase": 0.0, "fixed_phase": 0 });
        let config = SupplyConfig::new(SupplyKind::Ac1Phase)
            .with_parameter(parameter.as_object().cloned().unwrap());
        assert_eq!(
            config.build(None).err(),
            Some(ConfigError::InvalidType { key: "fixed_phase", expected: "boolean" })
        );
    }

    #[test]
    fn test_invalid_nominal_voltage() {
        let err = SupplyConfig::new(SupplyKind::Ideal)
            .with_u_nominal(-5.0)
            .build(None)
            .err();
        assert!(matches!(err, Some(ConfigError::InvalidValue { key: "u_nominal", .. })));
    }
}
