use serde::{Deserialize, Serialize};

use crate::error::SimError;

// Supply Traits
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupplyState {
    /// Instantaneous voltage of every supply phase
    pub voltages: Vec<f64>,
    /// Rectified voltage seen by the inverters
    pub dc_link_voltage: f64,
    /// Current drawn from the supply during the last step
    pub current_draw: f64,
}

// Electrical Traits
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MotorState {
    pub current_d: f64,
    pub current_q: f64,
    pub mechanical_velocity: f64,
    /// Mechanical rotor angle (rad)
    pub position: f64,
    pub applied_torque: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MotorInput {
    pub duty_cycle_q: f64,
    pub duty_cycle_d: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ActuatorInput {
    pub motor_inputs: Vec<MotorInput>,
}

// General Traits
#[derive(Debug, Clone, Default)]
pub struct SimState {
    pub supply: SupplyState,
    pub motors: Vec<MotorState>,
    pub control_input: ActuatorInput,
}

impl SimState {
    /// True when every continuous quantity on the bus is finite.
    pub fn is_finite(&self) -> bool {
        self.supply.voltages.iter().all(|u| u.is_finite())
            && self.supply.dc_link_voltage.is_finite()
            && self.supply.current_draw.is_finite()
            && self.motors.iter().all(|m| {
                m.current_d.is_finite()
                    && m.current_q.is_finite()
                    && m.mechanical_velocity.is_finite()
                    && m.position.is_finite()
            })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SimContext {
    pub dt: f64,
    pub t: f64,
}

pub trait Model {
    /// Returns the model to its episode start and publishes its initial values on the bus.
    fn reset(&mut self, state: &mut SimState) -> Result<(), SimError>;
}

pub trait ElectricalModel: Model {
    fn step_electrical(&mut self, ctx: SimContext, state: &mut SimState) -> Result<(), SimError>;
}
