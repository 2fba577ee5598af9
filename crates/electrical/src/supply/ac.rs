use std::f64::consts::{SQRT_2, TAU};

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simcore::SimError;

use super::{SupplyParameter, VoltageSupply, required_bool, required_f64};
use crate::error::ConfigError;

pub const AC1_DEFAULT_U_NOMINAL: f64 = 230.0;
pub const AC3_DEFAULT_U_NOMINAL: f64 = 400.0;
pub const AC_DEFAULT_FREQUENCY: f64 = 50.0;

/// Waveform parameters shared by the single and three phase AC supplies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcParameter {
    /// Grid frequency (Hz)
    pub frequency: f64,
    /// Phase at t = 0 (rad)
    pub phase: f64,
    /// Keep `phase` for every episode instead of redrawing it on reset
    pub fixed_phase: bool,
}

impl AcParameter {
    /// Reads `frequency`, `phase` and `fixed_phase` from a parameter mapping.
    pub fn from_mapping(parameter: &SupplyParameter) -> Result<Self, ConfigError> {
        let frequency = required_f64(parameter, "frequency")?;
        let phase = required_f64(parameter, "phase")?;
        let fixed_phase = required_bool(parameter, "fixed_phase")?;
        if frequency < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "frequency",
                reason: format!("{frequency} Hz is negative"),
            });
        }
        Ok(AcParameter {
            frequency,
            phase,
            fixed_phase,
        })
    }

    /// 50 Hz grid with a random, per-episode phase.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        AcParameter {
            frequency: AC_DEFAULT_FREQUENCY,
            phase: draw_phase(rng),
            fixed_phase: false,
        }
    }
}

fn draw_phase<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.r#gen::<f64>() * TAU
}

/// Sinusoidal source state: nominal voltage, frequency and the phase owned
/// across episodes.
#[derive(Debug, Clone)]
struct AcSource {
    u_nominal: f64,
    frequency: f64,
    phase: f64,
    fixed_phase: bool,
    rng: StdRng,
}

impl AcSource {
    fn new(u_nominal: f64, parameter: AcParameter, rng: StdRng) -> Self {
        AcSource {
            u_nominal,
            frequency: parameter.frequency,
            phase: parameter.phase,
            fixed_phase: parameter.fixed_phase,
            rng,
        }
    }

    fn redraw_phase(&mut self) {
        if !self.fixed_phase {
            self.phase = draw_phase(&mut self.rng);
            debug!("AC supply phase redrawn to {:.4} rad", self.phase);
        }
    }

    fn angle(&self, t: f64) -> f64 {
        TAU * self.frequency * t + self.phase
    }
}

fn build_source(
    u_nominal: f64,
    parameter: Option<&SupplyParameter>,
    mut rng: StdRng,
) -> Result<AcSource, ConfigError> {
    let parameter = match parameter {
        Some(mapping) => AcParameter::from_mapping(mapping)?,
        None => AcParameter::random(&mut rng),
    };
    Ok(AcSource::new(u_nominal, parameter, rng))
}

/// Single phase grid: `u(t) = u_nominal * sqrt(2) * sin(2 pi f t + phi)`.
///
/// `u_nominal` is the RMS value. The supply current does not affect the output.
#[derive(Debug, Clone)]
pub struct Ac1PhaseSupply {
    source: AcSource,
    supply_range: [(f64, f64); 1],
}

impl Ac1PhaseSupply {
    /// Supply with an entropy-seeded phase source.
    pub fn new(u_nominal: f64, parameter: AcParameter) -> Self {
        Ac1PhaseSupply::with_rng(u_nominal, parameter, StdRng::from_entropy())
    }

    pub fn with_rng(u_nominal: f64, parameter: AcParameter, rng: StdRng) -> Self {
        Ac1PhaseSupply {
            source: AcSource::new(u_nominal, parameter, rng),
            supply_range: [(-u_nominal, u_nominal)],
        }
    }

    /// Builds the supply from an optional parameter mapping. Without one the
    /// supply runs at 50 Hz with a phase drawn from `rng` on every reset.
    pub fn from_parameter(
        u_nominal: f64,
        parameter: Option<&SupplyParameter>,
        rng: StdRng,
    ) -> Result<Self, ConfigError> {
        Ok(Ac1PhaseSupply {
            source: build_source(u_nominal, parameter, rng)?,
            supply_range: [(-u_nominal, u_nominal)],
        })
    }

    pub fn frequency(&self) -> f64 {
        self.source.frequency
    }

    /// Phase used by the current episode (rad).
    pub fn phase(&self) -> f64 {
        self.source.phase
    }

    pub fn fixed_phase(&self) -> bool {
        self.source.fixed_phase
    }
}

impl VoltageSupply for Ac1PhaseSupply {
    fn u_nominal(&self) -> f64 {
        self.source.u_nominal
    }

    fn supply_range(&self) -> &[(f64, f64)] {
        &self.supply_range
    }

    fn reset(&mut self) -> Result<Vec<f64>, SimError> {
        self.source.redraw_phase();
        self.get_voltage(0.0, 0.0)
    }

    fn get_voltage(&mut self, t: f64, _i_sup: f64) -> Result<Vec<f64>, SimError> {
        Ok(vec![self.source.u_nominal * SQRT_2 * self.source.angle(t).sin()])
    }

    fn seed(&mut self, seed: u64) {
        self.source.rng = StdRng::seed_from_u64(seed);
    }
}

/// Three phase grid. Phase `i` delivers
/// `u_nominal / sqrt(3) * sqrt(2) * sin(2 pi f t + phi + i * 2 pi / 3)`.
///
/// `u_nominal` is the line-to-line RMS voltage, the outputs are the phase
/// voltages against the star point.
#[derive(Debug, Clone)]
pub struct Ac3PhaseSupply {
    source: AcSource,
    supply_range: [(f64, f64); 3],
}

impl Ac3PhaseSupply {
    /// Supply with an entropy-seeded phase source.
    pub fn new(u_nominal: f64, parameter: AcParameter) -> Self {
        Ac3PhaseSupply::with_rng(u_nominal, parameter, StdRng::from_entropy())
    }

    pub fn with_rng(u_nominal: f64, parameter: AcParameter, rng: StdRng) -> Self {
        Ac3PhaseSupply {
            source: AcSource::new(u_nominal, parameter, rng),
            supply_range: [(-u_nominal, u_nominal); 3],
        }
    }

    pub fn from_parameter(
        u_nominal: f64,
        parameter: Option<&SupplyParameter>,
        rng: StdRng,
    ) -> Result<Self, ConfigError> {
        Ok(Ac3PhaseSupply {
            source: build_source(u_nominal, parameter, rng)?,
            supply_range: [(-u_nominal, u_nominal); 3],
        })
    }

    pub fn frequency(&self) -> f64 {
        self.source.frequency
    }

    pub fn phase(&self) -> f64 {
        self.source.phase
    }

    pub fn fixed_phase(&self) -> bool {
        self.source.fixed_phase
    }
}

impl VoltageSupply for Ac3PhaseSupply {
    fn u_nominal(&self) -> f64 {
        self.source.u_nominal
    }

    fn supply_range(&self) -> &[(f64, f64)] {
        &self.supply_range
    }

    fn reset(&mut self) -> Result<Vec<f64>, SimError> {
        self.source.redraw_phase();
        self.get_voltage(0.0, 0.0)
    }

    fn get_voltage(&mut self, t: f64, _i_sup: f64) -> Result<Vec<f64>, SimError> {
        let amplitude = self.source.u_nominal / 3f64.sqrt() * SQRT_2;
        let angle = self.source.angle(t);
        Ok((0..3)
            .map(|i| amplitude * (angle + i as f64 * TAU / 3.0).sin())
            .collect())
    }

    fn seed(&mut self, seed: u64) {
        self.source.rng = StdRng::seed_from_u64(seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use serde_json::json;

    fn fixed(phase: f64) -> AcParameter {
        AcParameter {
            frequency: 50.0,
            phase,
            fixed_phase: true,
        }
    }

    fn free(phase: f64) -> AcParameter {
        AcParameter {
            fixed_phase: false,
            ..fixed(phase)
        }
    }

    fn mapping(value: serde_json::Value) -> SupplyParameter {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_single_phase_zero_at_start() {
        let mut supply = Ac1PhaseSupply::with_rng(230.0, fixed(0.0), StdRng::seed_from_u64(1));
        supply.reset().unwrap();
        assert_eq!(supply.get_voltage(0.0, 0.0).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_single_phase_waveform() {
        let mut supply = Ac1PhaseSupply::with_rng(230.0, fixed(0.0), StdRng::seed_from_u64(1));
        supply.reset().unwrap();

        // Quarter period of 50 Hz hits the positive peak
        let u = supply.get_voltage(0.005, 12.0).unwrap();
        assert_relative_eq!(u[0], 230.0 * SQRT_2, epsilon = 1e-9);

        let u = supply.get_voltage(0.015, 0.0).unwrap();
        assert_relative_eq!(u[0], -230.0 * SQRT_2, epsilon = 1e-9);
    }

    #[test]
    fn test_single_phase_amplitude_bound() {
        let mut supply = Ac1PhaseSupply::with_rng(230.0, free(0.0), StdRng::seed_from_u64(7));
        let bound = 230.0 * SQRT_2 + 1e-9;
        for _ in 0..5 {
            supply.reset().unwrap();
            for k in 0..2000 {
                let u = supply.get_voltage(k as f64 * 3.7e-5, 0.0).unwrap();
                assert!(u[0].abs() <= bound);
            }
        }
    }

    #[test]
    fn test_three_phase_formula_and_balance() {
        let phase = 0.3;
        let mut supply = Ac3PhaseSupply::with_rng(400.0, fixed(phase), StdRng::seed_from_u64(3));
        supply.reset().unwrap();
        let amplitude = 400.0 / 3f64.sqrt() * SQRT_2;

        for k in 0..500 {
            let t = k as f64 * 1.3e-4;
            let u = supply.get_voltage(t, 5.0).unwrap();
            assert_eq!(u.len(), 3);
            for (i, value) in u.iter().enumerate() {
                let expected = amplitude * (TAU * 50.0 * t + phase + i as f64 * TAU / 3.0).sin();
                assert_abs_diff_eq!(*value, expected, epsilon = 1e-9);
            }
            assert_abs_diff_eq!(u.iter().sum::<f64>(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_three_phase_range_per_phase() {
        let supply = Ac3PhaseSupply::with_rng(400.0, fixed(0.0), StdRng::seed_from_u64(3));
        assert_eq!(supply.phases(), 3);
        assert_eq!(supply.supply_range(), &[(-400.0, 400.0); 3]);
    }

    #[test]
    fn test_free_phase_redrawn_on_reset() {
        let mut supply = Ac1PhaseSupply::with_rng(230.0, free(1.0), StdRng::seed_from_u64(11));
        let mut phases = Vec::new();
        for _ in 0..10 {
            supply.reset().unwrap();
            let phi = supply.phase();
            assert!((0.0..TAU).contains(&phi));
            phases.push(phi);
        }
        for window in phases.windows(2) {
            assert_ne!(window[0], window[1]);
        }
    }

    #[test]
    fn test_fixed_phase_kept_on_reset() {
        let mut supply = Ac3PhaseSupply::with_rng(400.0, fixed(1.25), StdRng::seed_from_u64(11));
        for _ in 0..10 {
            supply.reset().unwrap();
            assert_eq!(supply.phase(), 1.25);
        }
    }

    #[test]
    fn test_seed_reproduces_phases() {
        let mut a = Ac3PhaseSupply::new(400.0, free(0.0));
        let mut b = Ac3PhaseSupply::new(400.0, free(0.0));
        a.seed(99);
        b.seed(99);
        for _ in 0..3 {
            assert_eq!(a.reset().unwrap(), b.reset().unwrap());
        }
    }

    #[test]
    fn test_from_parameter_validation() {
        let rng = || StdRng::seed_from_u64(0);

        let supply = Ac1PhaseSupply::from_parameter(
            230.0,
            Some(&mapping(json!({ "frequency": 60, "phase": 0.5, "fixed_phase": true }))),
            rng(),
        )
        .unwrap();
        assert_eq!(supply.frequency(), 60.0);
        assert_eq!(supply.phase(), 0.5);
        assert!(supply.fixed_phase());

        assert_eq!(
            Ac1PhaseSupply::from_parameter(230.0, Some(&mapping(json!({ "phase": 0.0, "fixed_phase": true }))), rng()).err(),
            Some(ConfigError::MissingKey("frequency"))
        );
        assert_eq!(
            Ac3PhaseSupply::from_parameter(400.0, Some(&mapping(json!({ "frequency": 50, "fixed_phase": true }))), rng()).err(),
            Some(ConfigError::MissingKey("phase"))
        );
        assert_eq!(
            Ac3PhaseSupply::from_parameter(400.0, Some(&mapping(json!({ "frequency": 50, "phase": 0.0 }))), rng()).err(),
            Some(ConfigError::MissingKey("fixed_phase"))
        );
        assert_eq!(
            Ac3PhaseSupply::from_parameter(
                400.0,
                Some(&mapping(json!({ "frequency": 50, "phase": 0.0, "fixed_phase": "yes" }))),
                rng()
            )
            .err(),
            Some(ConfigError::InvalidType { key: "fixed_phase", expected: "boolean" })
        );
    }

    #[test]
    fn test_default_parameter_is_random_50hz() {
        let supply = Ac1PhaseSupply::from_parameter(230.0, None, StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(supply.frequency(), 50.0);
        assert!(!supply.fixed_phase());
        assert!((0.0..TAU).contains(&supply.phase()));
        assert_eq!(supply.u_nominal(), 230.0);
    }
}
