//! One-at-a-time sensitivity of time-to-empty
//!
//! Each parameter is nudged down and up by the same fraction while the others
//! stay at baseline. The resulting percent changes in TTE are the bars of a
//! tornado chart.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use simcore::SimError;
use simcore::error::SimResult;

use crate::analysis::{RunOptions, simulate_constant_power};
use crate::battery::{BatteryParameters, RCBranch};

/// Brightness level assumed for the screen term of the load
pub const BASELINE_BRIGHTNESS: f64 = 150.0;
/// CPU contribution to the load (W)
pub const BASELINE_CPU_W: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityBaseline {
    pub capacity_mah: f64,
    pub r0_ohm: f64,
    /// System floor power (W)
    pub p_base_w: f64,
    /// Screen watts per brightness level
    pub p_screen_coeff: f64,
}

impl Default for SensitivityBaseline {
    fn default() -> Self {
        SensitivityBaseline {
            capacity_mah: 4575.0,
            r0_ohm: 0.05,
            p_base_w: 0.4,
            p_screen_coeff: 0.005,
        }
    }
}

impl SensitivityBaseline {
    pub fn load_power_w(&self) -> f64 {
        self.p_base_w + self.p_screen_coeff * BASELINE_BRIGHTNESS + BASELINE_CPU_W
    }

    pub fn parameters(&self) -> SimResult<BatteryParameters> {
        let rc = RCBranch::default();
        BatteryParameters::from_mah(self.capacity_mah, self.r0_ohm, rc.resistance, rc.capacitance, 3.0)
    }

    fn get(&self, parameter: SensitivityParameter) -> f64 {
        match parameter {
            SensitivityParameter::Capacity => self.capacity_mah,
            SensitivityParameter::SeriesResistance => self.r0_ohm,
            SensitivityParameter::BasePower => self.p_base_w,
            SensitivityParameter::ScreenCoefficient => self.p_screen_coeff,
        }
    }

    /// Copy with one parameter multiplied by `factor`
    pub fn scaled(&self, parameter: SensitivityParameter, factor: f64) -> Self {
        let mut out = *self;
        let value = self.get(parameter) * factor;
        match parameter {
            SensitivityParameter::Capacity => out.capacity_mah = value,
            SensitivityParameter::SeriesResistance => out.r0_ohm = value,
            SensitivityParameter::BasePower => out.p_base_w = value,
            SensitivityParameter::ScreenCoefficient => out.p_screen_coeff = value,
        }
        out
    }

    /// TTE in hours for a full battery at the baseline load
    pub fn tte_hours(&self, options: &RunOptions) -> SimResult<f64> {
        let run = simulate_constant_power(self.parameters()?, self.load_power_w(), options)?;
        Ok(run.summary.tte_hours())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensitivityParameter {
    Capacity,
    SeriesResistance,
    BasePower,
    ScreenCoefficient,
}

impl SensitivityParameter {
    pub const ALL: [SensitivityParameter; 4] = [
        SensitivityParameter::Capacity,
        SensitivityParameter::SeriesResistance,
        SensitivityParameter::BasePower,
        SensitivityParameter::ScreenCoefficient,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SensitivityParameter::Capacity => "Battery Capacity (Q)",
            SensitivityParameter::SeriesResistance => "Internal Resistance (R0)",
            SensitivityParameter::BasePower => "Base Power (P_base)",
            SensitivityParameter::ScreenCoefficient => "Screen Efficiency (k_scr)",
        }
    }
}

/// One bar pair of the tornado chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRow {
    pub parameter: SensitivityParameter,
    pub tte_low_h: f64,
    pub tte_high_h: f64,
    /// Percent change in TTE with the parameter lowered
    pub delta_low_pct: f64,
    /// Percent change in TTE with the parameter raised
    pub delta_high_pct: f64,
    /// Mean absolute percent change per percent of perturbation
    pub index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityReport {
    pub baseline_tte_h: f64,
    pub perturbation: f64,
    pub rows: Vec<SensitivityRow>,
}

impl SensitivityReport {
    /// Rows ordered from most to least influential
    pub fn ranked(&self) -> Vec<SensitivityRow> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| b.index.total_cmp(&a.index));
        rows
    }

    pub fn row(&self, parameter: SensitivityParameter) -> Option<&SensitivityRow> {
        self.rows.iter().find(|r| r.parameter == parameter)
    }
}

/// Perturb every parameter by `±perturbation` (a fraction, e.g. 0.1).
pub fn analyze(
    baseline: &SensitivityBaseline,
    perturbation: f64,
    options: &RunOptions,
) -> SimResult<SensitivityReport> {
    if !(perturbation.is_finite() && perturbation > 0.0 && perturbation < 1.0) {
        return Err(SimError::InvalidArgument {
            what: "perturbation fraction",
            value: perturbation,
        });
    }

    let base_tte = baseline.tte_hours(options)?;
    if base_tte <= 0.0 {
        return Err(SimError::NonPhysical {
            what: "baseline battery is empty before the first step",
        });
    }
    info!("baseline TTE: {base_tte:.4} h at {:.3} W", baseline.load_power_w());

    let mut rows = Vec::with_capacity(SensitivityParameter::ALL.len());
    for parameter in SensitivityParameter::ALL {
        let tte_low_h = baseline.scaled(parameter, 1.0 - perturbation).tte_hours(options)?;
        let tte_high_h = baseline.scaled(parameter, 1.0 + perturbation).tte_hours(options)?;

        let delta_low_pct = (tte_low_h - base_tte) / base_tte * 100.0;
        let delta_high_pct = (tte_high_h - base_tte) / base_tte * 100.0;
        let index = (delta_high_pct.abs() + delta_low_pct.abs()) / 2.0 / (perturbation * 100.0);

        debug!(
            "{}: low={delta_low_pct:.2}%, high={delta_high_pct:.2}%, index={index:.2}",
            parameter.label()
        );
        rows.push(SensitivityRow {
            parameter,
            tte_low_h,
            tte_high_h,
            delta_low_pct,
            delta_high_pct,
            index,
        });
    }

    Ok(SensitivityReport {
        baseline_tte_h: base_tte,
        perturbation,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_load() {
        let baseline = SensitivityBaseline::default();
        assert!((baseline.load_power_w() - 2.15).abs() < 1e-12);
    }

    #[test]
    fn test_scaled_touches_one_parameter() {
        let baseline = SensitivityBaseline::default();
        let raised = baseline.scaled(SensitivityParameter::SeriesResistance, 1.1);
        assert!((raised.r0_ohm - 0.055).abs() < 1e-12);
        assert_eq!(raised.capacity_mah, baseline.capacity_mah);
        assert_eq!(raised.p_base_w, baseline.p_base_w);
        assert_eq!(raised.p_screen_coeff, baseline.p_screen_coeff);
    }

    #[test]
    fn test_directions_of_influence() {
        let report = analyze(&SensitivityBaseline::default(), 0.1, &RunOptions::default()).unwrap();
        assert_eq!(report.rows.len(), 4);

        let capacity = report.row(SensitivityParameter::Capacity).unwrap();
        assert!(capacity.delta_high_pct > 0.0 && capacity.delta_low_pct < 0.0);

        for parameter in [
            SensitivityParameter::SeriesResistance,
            SensitivityParameter::BasePower,
            SensitivityParameter::ScreenCoefficient,
        ] {
            let row = report.row(parameter).unwrap();
            assert!(row.delta_high_pct < 0.0, "{parameter:?} raised should shorten TTE");
            assert!(row.delta_low_pct > 0.0, "{parameter:?} lowered should extend TTE");
        }

        // Capacity is close to proportional; resistance barely matters
        let ranked = report.ranked();
        assert_eq!(ranked[0].parameter, SensitivityParameter::Capacity);
        assert_eq!(ranked[3].parameter, SensitivityParameter::SeriesResistance);
    }

    #[test]
    fn test_rejects_bad_perturbation() {
        let baseline = SensitivityBaseline::default();
        let options = RunOptions::default();
        assert!(analyze(&baseline, 0.0, &options).is_err());
        assert!(analyze(&baseline, 1.0, &options).is_err());
        assert!(analyze(&baseline, f64::NAN, &options).is_err());
    }
}
