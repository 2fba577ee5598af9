//! Physical system
//!
//! Composes a voltage supply and a motor bank into one state-space system that
//! advances by a fixed control step `tau`. Per step the supply is queried first
//! with the current drawn during the previous step, then the motors integrate
//! against the resulting DC-link voltage and report the new supply current.

use log::debug;
use simcore::{ElectricalModel, Model, MotorInput, SimContext, SimError, SimState};

use crate::bus::SupplyBus;
use crate::motor::MotorBank;
use crate::supply::VoltageSupply;

pub struct PhysicalSystem {
    supply: SupplyBus,
    motors: MotorBank,
    state: SimState,
    tau: f64,
    k: u64,
}

impl PhysicalSystem {
    pub fn new(supply: Box<dyn VoltageSupply>, motors: MotorBank, tau: f64) -> Result<Self, SimError> {
        if !(tau.is_finite() && tau > 0.0) {
            return Err(SimError::InvalidTimestep(tau));
        }
        Ok(PhysicalSystem {
            supply: SupplyBus::new(supply),
            motors,
            state: SimState::default(),
            tau,
            k: 0,
        })
    }

    /// Starts a new episode and returns the initial state.
    pub fn reset(&mut self) -> Result<&SimState, SimError> {
        self.k = 0;
        self.state = SimState::default();
        self.state.control_input.motor_inputs = vec![MotorInput::default(); self.motors.len()];
        self.supply.reset(&mut self.state)?;
        self.motors.reset(&mut self.state)?;
        debug!("physical system reset, u_sup = {:?}", self.state.supply.voltages);
        Ok(&self.state)
    }

    /// Applies one control input per motor for one step of length `tau`.
    pub fn step(&mut self, inputs: &[MotorInput]) -> Result<&SimState, SimError> {
        self.state.control_input.motor_inputs.clear();
        self.state.control_input.motor_inputs.extend_from_slice(inputs);

        let ctx = SimContext {
            dt: self.tau,
            t: self.t(),
        };
        self.supply.step_electrical(ctx, &mut self.state)?;
        self.motors.step_electrical(ctx, &mut self.state)?;
        self.k += 1;

        if !self.state.is_finite() {
            return Err(SimError::Diverged(format!("non-finite state at t = {:.6} s", self.t())));
        }
        Ok(&self.state)
    }

    /// Simulation time of the present state.
    pub fn t(&self) -> f64 {
        self.k as f64 * self.tau
    }

    pub fn tau(&self) -> f64 {
        self.tau
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn supply(&self) -> &dyn VoltageSupply {
        self.supply.supply()
    }

    pub fn supply_mut(&mut self) -> &mut dyn VoltageSupply {
        self.supply.supply_mut()
    }
}
