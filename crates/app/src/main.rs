//! Runs a voltage supply scenario and writes the supply voltages to CSV.
//!
//! ```text
//! supply-sim <scenario.json> [out.csv]
//! ```
//!
//! The scenario names the supply and the stepping:
//!
//! ```json
//! {
//!   "supply": { "kind": "ac3_phase", "u_nominal": 400, "supply_parameter": { "frequency": 50, "phase": 0.0, "fixed_phase": true } },
//!   "tau": 1e-4,
//!   "steps": 400,
//!   "seed": 3,
//!   "load_current": 20.0
//! }
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};

use electrical::SupplyConfig;
use log::{LevelFilter, info, warn};
use serde::Deserialize;
use simcore::SupplyState;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

#[derive(Debug, Deserialize)]
struct Scenario {
    supply: SupplyConfig,
    /// Step size (s)
    tau: f64,
    steps: u64,
    #[serde(default)]
    seed: Option<u64>,
    /// Constant current drawn from the supply (A)
    #[serde(default)]
    load_current: f64,
}

/// Outcome of a scenario run.
#[derive(Debug)]
struct RunReport {
    samples: u64,
    out_of_range: u64,
    final_state: SupplyState,
}

/// Steps the scenario's supply and writes one CSV row per sample, `t` included.
fn run_scenario<W: Write>(scenario: &Scenario, out: &mut W) -> Result<RunReport, Box<dyn std::error::Error>> {
    if !(scenario.tau.is_finite() && scenario.tau > 0.0) {
        return Err(format!("tau must be positive, got {}", scenario.tau).into());
    }

    let mut supply = scenario.supply.build(scenario.seed)?;
    info!(
        "{:?} supply, u_nominal = {} V, range = {:?}",
        scenario.supply.kind,
        supply.u_nominal(),
        supply.supply_range()
    );

    let header: Vec<String> = (0..supply.phases()).map(|i| format!("u_{i}")).collect();
    writeln!(out, "t,{}", header.join(","))?;

    let mut voltages = supply.reset()?;
    let mut out_of_range = 0u64;
    for k in 0..=scenario.steps {
        let t = k as f64 * scenario.tau;
        if k > 0 {
            voltages = supply.get_voltage(t, scenario.load_current)?;
        }
        let in_range = voltages
            .iter()
            .zip(supply.supply_range())
            .all(|(u, (low, high))| (*low..=*high).contains(u));
        if !in_range {
            out_of_range += 1;
        }
        let row: Vec<String> = voltages.iter().map(|u| format!("{u:.6}")).collect();
        writeln!(out, "{t:.6},{}", row.join(","))?;
    }
    out.flush()?;

    Ok(RunReport {
        samples: scenario.steps + 1,
        out_of_range,
        final_state: SupplyState {
            dc_link_voltage: electrical::dc_link_voltage(&voltages),
            voltages,
            current_draw: scenario.load_current,
        },
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    TermLogger::init(LevelFilter::Info, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)?;

    let mut args = std::env::args().skip(1);
    let scenario_path = args.next().ok_or("usage: supply-sim <scenario.json> [out.csv]")?;
    let out_path = args.next().unwrap_or_else(|| "supply.csv".to_string());

    let scenario: Scenario = serde_json::from_reader(File::open(&scenario_path)?)?;
    let mut csv = BufWriter::new(File::create(&out_path)?);
    let report = run_scenario(&scenario, &mut csv)?;

    if report.out_of_range > 0 {
        warn!("{} samples left the supply range", report.out_of_range);
    }
    info!("final supply state: {}", serde_json::to_string(&report.final_state)?);
    info!("wrote {} samples to {}", report.samples, out_path);
    Ok(())
}
