//! `tte` - smartphone battery time-to-empty estimates
//!
//! ```bash
//! # Baseline 4575 mAh cell at the heavy-usage load
//! tte baseline --power 3.87
//!
//! # A scenario file (battery, temperature, options, load)
//! tte run scenario.json --trace
//!
//! # Tornado data for +/-10 % parameter changes
//! tte sensitivity --perturbation 0.1
//!
//! # Aged cells
//! tte aging --r0 0.05,0.11,0.15
//! ```

mod config;
mod error;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use electrical::analysis::{DischargeRun, RunOptions, simulate_constant_power, simulate_schedule, sweep};
use electrical::load::{PowerCoefficients, UsageScenario, naive_tte_hours};
use electrical::sensitivity::{SensitivityBaseline, analyze};
use electrical::BatteryParameters;
use log::{error, info};
use simcore::LoadSchedule;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use config::ScenarioFile;
use error::AppResult;

/// Nominal cell voltage used for energy-division estimates
const NOMINAL_VOLTAGE: f64 = 3.87;

#[derive(Parser)]
#[command(name = "tte")]
#[command(about = "Battery discharge and time-to-empty estimation", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the run summary as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discharge the baseline cell at constant power
    Baseline {
        /// Load in watts
        #[arg(long, default_value_t = 3.87)]
        power: f64,
        /// Starting state of charge, 0..1
        #[arg(long, default_value_t = 1.0)]
        initial_soc: f64,
        /// Print the sampled discharge curve
        #[arg(long)]
        trace: bool,
    },
    /// Run a JSON scenario file
    Run {
        scenario: PathBuf,
        /// Print the sampled discharge curve
        #[arg(long)]
        trace: bool,
    },
    /// Run the built-in day schedule from 09:00
    Day,
    /// One-at-a-time sensitivity of TTE
    Sensitivity {
        /// Fractional perturbation applied to each parameter
        #[arg(long, default_value_t = 0.1)]
        perturbation: f64,
    },
    /// Power breakdown and TTE for the usage presets
    Breakdown,
    /// Runtime of aged cells with raised series resistance
    Aging {
        /// Load in watts
        #[arg(long, default_value_t = 3.87)]
        power: f64,
        /// Series resistances to compare, comma separated (ohm)
        #[arg(long, value_delimiter = ',', default_values_t = [0.05, 0.11, 0.15])]
        r0: Vec<f64>,
    },
}

fn init_logging(verbose: bool) -> AppResult<()> {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)?;
    Ok(())
}

fn print_run(run: &DischargeRun, trace: bool, json: bool) -> AppResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&run.summary)?);
    } else if trace {
        print!("{}", report::Trace(run));
    } else {
        print!("{}", report::Summary(&run.summary));
    }
    Ok(())
}

fn run(cli: Cli) -> AppResult<()> {
    match cli.command {
        Commands::Baseline { power, initial_soc, trace } => {
            let options = RunOptions::default().with_initial_soc(initial_soc);
            let run = simulate_constant_power(BatteryParameters::default(), power, &options)?;
            print_run(&run, trace, cli.json)
        }
        Commands::Run { scenario, trace } => {
            info!("loading scenario {}", scenario.display());
            let scenario = ScenarioFile::load(&scenario)?;
            let run = scenario.run()?;
            print_run(&run, trace, cli.json)
        }
        Commands::Day => {
            let schedule = LoadSchedule::typical_day();
            let run = simulate_schedule(BatteryParameters::default(), &schedule, &RunOptions::default())?;
            if !cli.json {
                // 09:00 start
                let drained_min = 9 * 60 + (run.summary.elapsed_s / 60.0).floor() as u64;
                if run.summary.termination.is_battery_limited() {
                    println!("DRAINED at {:02}:{:02}", (drained_min / 60) % 24, drained_min % 60);
                } else {
                    println!("Battery lasted the whole day");
                }
            }
            print_run(&run, false, cli.json)
        }
        Commands::Sensitivity { perturbation } => {
            let report = analyze(&SensitivityBaseline::default(), perturbation, &RunOptions::default())?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report::Sensitivity(&report));
            }
            Ok(())
        }
        Commands::Breakdown => {
            let params = BatteryParameters::default();
            let coeffs = PowerCoefficients::default();
            for (name, scenario) in UsageScenario::presets() {
                let breakdown = scenario.breakdown(&coeffs)?;
                print!("{}", report::Breakdown { name, breakdown: &breakdown });
                for soc in [1.0, 0.75, 0.5, 0.25] {
                    let naive = naive_tte_hours(params.capacity_mah(), NOMINAL_VOLTAGE, soc, breakdown.total_w())?;
                    let options = RunOptions::default().with_initial_soc(soc);
                    let simulated = simulate_constant_power(params, breakdown.total_w(), &options)?;
                    println!(
                        "  {:>3.0}% SoC: naive {} | simulated {}",
                        soc * 100.0,
                        report::format_hours(naive),
                        report::format_hours(simulated.summary.tte_hours())
                    );
                }
            }
            Ok(())
        }
        Commands::Aging { power, r0 } => {
            let points = sweep(
                &r0,
                |resistance| BatteryParameters::default().with_series_resistance(resistance),
                power,
                &RunOptions::default(),
            )?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&points)?);
            } else {
                print!("{}", report::Sweep { parameter: "R0", points: &points });
            }
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
