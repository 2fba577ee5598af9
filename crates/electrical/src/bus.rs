use log::debug;
use simcore::{ElectricalModel, Model, SimContext, SimError, SimState};

use crate::supply::VoltageSupply;

/// Voltage seen by the inverters after an uncontrolled rectifier.
///
/// A single value is taken as its magnitude (DC source or single phase bridge),
/// several phases give the spread between the highest and lowest phase (B6 bridge).
pub fn dc_link_voltage(voltages: &[f64]) -> f64 {
    match voltages {
        [] => 0.0,
        [u] => u.abs(),
        phases => {
            let max = phases.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min = phases.iter().copied().fold(f64::INFINITY, f64::min);
            max - min
        }
    }
}

/// Publishes the supply voltage on the simulation bus.
///
/// Each step queries the supply at the start of the step with the current the
/// motors drew during the previous step.
pub struct SupplyBus {
    supply: Box<dyn VoltageSupply>,
}

impl SupplyBus {
    pub fn new(supply: Box<dyn VoltageSupply>) -> Self {
        SupplyBus { supply }
    }

    pub fn supply(&self) -> &dyn VoltageSupply {
        self.supply.as_ref()
    }

    pub fn supply_mut(&mut self) -> &mut dyn VoltageSupply {
        self.supply.as_mut()
    }

    fn publish(state: &mut SimState, voltages: Vec<f64>) {
        state.supply.dc_link_voltage = dc_link_voltage(&voltages);
        state.supply.voltages = voltages;
    }
}

impl Model for SupplyBus {
    fn reset(&mut self, state: &mut SimState) -> Result<(), SimError> {
        let voltages = self.supply.reset()?;
        debug!("supply reset, u = {:?}", voltages);
        state.supply.current_draw = 0.0;
        Self::publish(state, voltages);
        Ok(())
    }
}

impl ElectricalModel for SupplyBus {
    fn step_electrical(&mut self, ctx: SimContext, state: &mut SimState) -> Result<(), SimError> {
        let voltages = self.supply.get_voltage(ctx.t, state.supply.current_draw)?;
        Self::publish(state, voltages);
        Ok(())
    }
}
