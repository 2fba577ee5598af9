use electrical::{RcParameter, RcVoltageSupply, VoltageSupply};
use std::fs::File;
use std::io::Write;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Supply params (tweak as needed)
    let mut supply = RcVoltageSupply::new(600.0, RcParameter { r: 1.0, c: 4e-3 });

    // Sim settings
    let tau = 1e-5; // 10 us control step
    let t_end = 0.2; // seconds
    let spike_interval = 0.03; // seconds between spikes
    let spike_duration = 0.02; // seconds
    let mut spike_counter = spike_interval + spike_duration;
    let i_nominal = 5.0; // A (idle)
    let i_spike = 150.0; // A (sudden load)
    let mut i_load = i_nominal;

    let mut csv = File::create("rc_supply_step.csv")?;
    writeln!(csv, "t,u_sup,current")?;

    let mut u_sup = supply.reset()?[0];
    let mut k = 0u64;
    let mut t = 0.0;
    while t <= t_end {
        writeln!(csv, "{:.6},{:.6},{:.6}", t, u_sup, i_load)?;

        // Load current ramps towards the spike level while the spike lasts
        i_load = if spike_counter <= spike_duration {
            i_load + (i_spike - i_load) * 0.05
        } else {
            i_load + (i_nominal - i_load) * 0.05
        };
        spike_counter -= tau;
        if spike_counter <= 0.0 {
            spike_counter = spike_interval + spike_duration;
        }

        k += 1;
        t = k as f64 * tau;
        u_sup = supply.get_voltage(t, i_load)?[0];
    }

    println!("Wrote rc_supply_step.csv");
    Ok(())
}
