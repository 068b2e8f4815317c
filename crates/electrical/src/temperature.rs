//! Ambient-temperature parameter derivation
//!
//! Converts a reference battery rating into the [`BatteryParameters`] of one
//! run. Resistance follows an Arrhenius-style law; capacity derates linearly
//! below 25 °C and gains slightly above it. This runs once before a
//! simulation and never during one.

use serde::{Deserialize, Serialize};
use simcore::SimError;
use simcore::error::{SimResult, require_positive};

use crate::battery::{BatteryParameters, COULOMBS_PER_MAH, RCBranch};

pub const KELVIN_OFFSET: f64 = 273.15;

/// Datasheet-style description of a cell at 25 °C.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryRating {
    pub capacity_mah: f64,
    /// Ohmic resistance at the reference temperature. New cells sit near
    /// 0.05 Ω; heavily cycled ones climb past 0.1 Ω.
    pub r0_ref_ohm: f64,
    pub rp_ohm: f64,
    pub cp_farad: f64,
    pub cutoff_voltage: f64,
}

impl Default for BatteryRating {
    fn default() -> Self {
        BatteryRating {
            capacity_mah: 4575.0,
            r0_ref_ohm: 0.05,
            rp_ohm: 0.03,
            cp_farad: 2000.0,
            cutoff_voltage: 3.0,
        }
    }
}

impl BatteryRating {
    /// Parameters at reference conditions, with no temperature correction.
    pub fn at_reference(&self) -> SimResult<BatteryParameters> {
        BatteryParameters::from_mah(
            self.capacity_mah,
            self.r0_ref_ohm,
            self.rp_ohm,
            self.cp_farad,
            self.cutoff_voltage,
        )
    }
}

/// Temperature coefficients of the cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalModel {
    /// Reference temperature in kelvin
    pub reference_k: f64,
    /// Activation constant `Ea / kB` of the resistance law, in kelvin
    pub resistance_activation_k: f64,
    /// Fractional capacity lost per °C below reference
    pub cold_derating_per_c: f64,
    /// Fractional capacity gained per °C above reference
    pub warm_gain_per_c: f64,
}

impl Default for ThermalModel {
    fn default() -> Self {
        ThermalModel {
            reference_k: 298.15,
            resistance_activation_k: 2500.0,
            cold_derating_per_c: 0.01,
            warm_gain_per_c: 0.001,
        }
    }
}

impl ThermalModel {
    fn reference_c(&self) -> f64 {
        self.reference_k - KELVIN_OFFSET
    }

    /// `R0_ref · exp(k · (1/T − 1/T_ref))`
    pub fn resistance_factor(&self, ambient_c: f64) -> SimResult<f64> {
        let t_k = ambient_c + KELVIN_OFFSET;
        if !(t_k.is_finite() && t_k > 0.0) {
            return Err(SimError::InvalidArgument {
                what: "ambient temperature (°C)",
                value: ambient_c,
            });
        }
        Ok((self.resistance_activation_k * (1.0 / t_k - 1.0 / self.reference_k)).exp())
    }

    pub fn capacity_factor(&self, ambient_c: f64) -> SimResult<f64> {
        let reference_c = self.reference_c();
        let factor = if ambient_c < reference_c {
            1.0 - self.cold_derating_per_c * (reference_c - ambient_c)
        } else {
            1.0 + self.warm_gain_per_c * (ambient_c - reference_c)
        };
        if factor.is_finite() && factor > 0.0 {
            Ok(factor)
        } else {
            Err(SimError::InvalidArgument {
                what: "ambient temperature leaves no usable capacity (°C)",
                value: ambient_c,
            })
        }
    }
}

/// Fold an ambient temperature into the parameters of one run.
///
/// `None` means reference conditions.
pub fn derive_parameters(
    rating: &BatteryRating,
    thermal: &ThermalModel,
    ambient_c: Option<f64>,
) -> SimResult<BatteryParameters> {
    let Some(ambient_c) = ambient_c else {
        return rating.at_reference();
    };

    let capacity_mah = require_positive("capacity (mAh)", rating.capacity_mah)?;
    let series_resistance = rating.r0_ref_ohm * thermal.resistance_factor(ambient_c)?;
    let capacity_factor = thermal.capacity_factor(ambient_c)?;

    let params = BatteryParameters {
        rated_capacity_c: (capacity_mah * capacity_factor) * COULOMBS_PER_MAH,
        series_resistance,
        polarization: RCBranch {
            resistance: rating.rp_ohm,
            capacitance: rating.cp_farad,
        },
        cutoff_voltage: rating.cutoff_voltage,
    };
    params.validate()?;
    Ok(params)
}
