//! Scenario files
//!
//! A scenario names a battery, an optional ambient temperature, run options
//! and one load description. Everything except the load has defaults.

use std::fs;
use std::path::Path;

use electrical::analysis::{DischargeRun, RunOptions, simulate_constant_power, simulate_schedule};
use electrical::load::{PowerCoefficients, UsageScenario};
use electrical::temperature::{BatteryRating, ThermalModel, derive_parameters};
use electrical::BatteryParameters;
use log::info;
use serde::{Deserialize, Serialize};
use simcore::{LoadSchedule, LoadSegment};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub duration_h: f64,
    pub power_w: f64,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadConfig {
    Constant {
        power_w: f64,
    },
    Schedule {
        segments: Vec<ScheduleEntry>,
    },
    Usage {
        scenario: UsageScenario,
        #[serde(default)]
        coefficients: PowerCoefficients,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub battery: BatteryRating,
    #[serde(default)]
    pub thermal: ThermalModel,
    /// Ambient temperature in °C; absent means reference conditions
    #[serde(default)]
    pub ambient_c: Option<f64>,
    #[serde(default)]
    pub options: RunOptions,
    pub load: LoadConfig,
}

impl ScenarioFile {
    pub fn load(path: &Path) -> AppResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| AppError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parameters(&self) -> AppResult<BatteryParameters> {
        Ok(derive_parameters(&self.battery, &self.thermal, self.ambient_c)?)
    }

    pub fn run(&self) -> AppResult<DischargeRun> {
        let params = self.parameters()?;
        info!(
            "battery: {:.0} mAh, R0={:.4} Ω, tau={:.0} s",
            params.capacity_mah(),
            params.series_resistance,
            params.polarization.time_constant()
        );

        let run = match &self.load {
            LoadConfig::Constant { power_w } => simulate_constant_power(params, *power_w, &self.options)?,
            LoadConfig::Schedule { segments } => {
                let schedule = LoadSchedule::new(
                    segments
                        .iter()
                        .map(|entry| {
                            let segment = LoadSegment::hours(entry.duration_h, entry.power_w);
                            match &entry.label {
                                Some(label) => segment.with_label(label.clone()),
                                None => segment,
                            }
                        })
                        .collect(),
                )?;
                simulate_schedule(params, &schedule, &self.options)?
            }
            LoadConfig::Usage { scenario, coefficients } => {
                let breakdown = scenario.breakdown(coefficients)?;
                info!("usage scenario draws {:.3} W", breakdown.total_w());
                simulate_constant_power(params, breakdown.total_w(), &self.options)?
            }
        };
        Ok(run)
    }
}
