use log::debug;
use nalgebra::DVector;
use simcore::{
    ElectricalModel, EulerSolver, Model, MotorState, OdeSolver, SimContext, SimError, SimState,
};

/// Permanent magnet synchronous motor parameters in the dq frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorConstant {
    pub pole_pairs: u32,
    /// Stator resistance (Ohm)
    pub resistance: f64,
    /// d-axis inductance (H)
    pub inductance_d: f64,
    /// q-axis inductance (H)
    pub inductance_q: f64,
    /// Permanent magnet flux linkage (Wb)
    pub flux_linkage: f64,
    /// Largest admissible stator current magnitude (A)
    pub current_limit: f64,
}

impl MotorConstant {
    pub fn new(pole_pairs: u32, resistance: f64, inductance_d: f64, inductance_q: f64, flux_linkage: f64, current_limit: f64) -> Self {
        MotorConstant {
            pole_pairs,
            resistance,
            inductance_d,
            inductance_q,
            flux_linkage,
            current_limit,
        }
    }

    /// Torque constant Kt (Nm/A)
    pub fn kt(&self) -> f64 {
        1.5 * (self.pole_pairs as f64) * self.flux_linkage
    }

    /// Back-EMF constant Ke (V/(rad/s))
    pub fn ke(&self) -> f64 {
        (self.pole_pairs as f64) * self.flux_linkage
    }

    /// Theoretical free speed at the given voltage (rad/s)
    pub fn free_speed(&self, voltage: f64) -> f64 {
        voltage / self.ke()
    }

    /// Electromagnetic torque including reluctance torque (Nm)
    pub fn torque(&self, current_d: f64, current_q: f64) -> f64 {
        1.5 * (self.pole_pairs as f64)
            * (self.flux_linkage * current_q
                + (self.inductance_d - self.inductance_q) * current_d * current_q)
    }
}

impl Default for MotorConstant {
    /// Interior PMSM, 3 pole pairs, 240 A.
    fn default() -> Self {
        MotorConstant::new(3, 18e-3, 0.37e-3, 1.2e-3, 65.6e-3, 240.0)
    }
}

/// Mechanical load on the motor shaft.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MechanicalLoad {
    /// Rotor plus load inertia (kg m^2)
    pub inertia: f64,
    /// Viscous friction (Nm s/rad)
    pub viscous_friction: f64,
    /// Constant load torque (Nm)
    pub load_torque: f64,
}

impl Default for MechanicalLoad {
    fn default() -> Self {
        MechanicalLoad {
            inertia: 0.03883,
            viscous_friction: 0.0,
            load_torque: 0.0,
        }
    }
}

fn derivative_current_d(current_d: f64, current_q: f64, voltage_d: f64, motor: &MotorConstant, electrical_velocity: f64) -> f64 {
    (voltage_d - motor.resistance * current_d + motor.inductance_q * electrical_velocity * current_q) / motor.inductance_d
}

fn derivative_current_q(current_d: f64, current_q: f64, voltage_q: f64, motor: &MotorConstant, electrical_velocity: f64) -> f64 {
    (voltage_q - motor.resistance * current_q - electrical_velocity * (motor.inductance_d * current_d + motor.flux_linkage)) / motor.inductance_q
}

/// State [i_d, i_q, omega, epsilon], params [u_d, u_q]
fn motor_equation(motor: &MotorConstant, load: &MechanicalLoad, y: &DVector<f64>, params: &[f64]) -> DVector<f64> {
    let (current_d, current_q, velocity) = (y[0], y[1], y[2]);
    let (voltage_d, voltage_q) = (params[0], params[1]);
    let electrical_velocity = velocity * motor.pole_pairs as f64;

    let torque = motor.torque(current_d, current_q);
    DVector::from_vec(vec![
        derivative_current_d(current_d, current_q, voltage_d, motor, electrical_velocity),
        derivative_current_q(current_d, current_q, voltage_q, motor, electrical_velocity),
        (torque - load.viscous_friction * velocity - load.load_torque) / load.inertia,
        velocity,
    ])
}

struct MotorUnit {
    constants: MotorConstant,
    solver: EulerSolver,
}

/// Bank of PMSMs fed from the common DC link.
///
/// Every motor owns a solver over its electrical and mechanical state. The
/// applied dq voltages are the clamped duty cycles times the DC-link voltage,
/// and the current drawn from the supply follows from the power balance.
#[derive(Default)]
pub struct MotorBank {
    motors: Vec<MotorUnit>,
}

impl MotorBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_motor(&mut self, motor: MotorConstant, load: MechanicalLoad) {
        let mut solver = EulerSolver::new();
        solver.set_system_equation(Box::new(move |_t: f64, y: &DVector<f64>, params: &[f64]| {
            motor_equation(&motor, &load, y, params)
        }));
        solver.set_initial_value(DVector::zeros(4), 0.0);
        self.motors.push(MotorUnit { constants: motor, solver });
    }

    pub fn len(&self) -> usize {
        self.motors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motors.is_empty()
    }

    pub fn constants(&self, index: usize) -> Option<&MotorConstant> {
        self.motors.get(index).map(|unit| &unit.constants)
    }
}

impl Model for MotorBank {
    fn reset(&mut self, state: &mut SimState) -> Result<(), SimError> {
        for unit in &mut self.motors {
            unit.solver.set_initial_value(DVector::zeros(4), 0.0);
        }
        state.motors = vec![MotorState::default(); self.motors.len()];
        debug!("motor bank reset, {} motors", self.motors.len());
        Ok(())
    }
}

impl ElectricalModel for MotorBank {
    fn step_electrical(&mut self, ctx: SimContext, state: &mut SimState) -> Result<(), SimError> {
        let dc_link_voltage = state.supply.dc_link_voltage;
        if state.motors.len() != self.motors.len() {
            state.motors.resize(self.motors.len(), MotorState::default());
        }

        let mut current_draw = 0.0;
        for (i, unit) in self.motors.iter_mut().enumerate() {
            let input = state
                .control_input
                .motor_inputs
                .get(i)
                .copied()
                .ok_or(SimError::MissingInput { motor: i })?;
            let voltage_d = input.duty_cycle_d.clamp(-1.0, 1.0) * dc_link_voltage;
            let voltage_q = input.duty_cycle_q.clamp(-1.0, 1.0) * dc_link_voltage;

            unit.solver.set_f_params(&[voltage_d, voltage_q]);
            let y = unit.solver.integrate(ctx.t + ctx.dt)?;

            let motor = &mut state.motors[i];
            motor.current_d = y[0];
            motor.current_q = y[1];
            motor.mechanical_velocity = y[2];
            motor.position = y[3];
            motor.applied_torque = unit.constants.torque(y[0], y[1]);

            if dc_link_voltage > 0.0 {
                current_draw += 1.5 * (voltage_d * y[0] + voltage_q * y[1]) / dc_link_voltage;
            }

            let current = y[0].hypot(y[1]);
            if current > unit.constants.current_limit {
                return Err(SimError::LimitViolation {
                    motor: i,
                    current,
                    limit: unit.constants.current_limit,
                });
            }
        }
        state.supply.current_draw = current_draw;
        Ok(())
    }
}
