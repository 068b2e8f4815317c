use log::debug;
use serde::{Deserialize, Serialize};
use simcore::error::{SimResult, require_in_range, require_non_negative, require_positive};
use simcore::{BatteryState, DischargeModel, Model, SimContext, SimError, StepResult};

/// Coulombs per milliamp-hour
pub const COULOMBS_PER_MAH: f64 = 3.6;

/// Open-circuit voltage of the phone cell.
///
/// Quadratic fit anchored at 3.2 V empty and 4.4 V full. Not clamped: a SoC
/// pushed slightly below zero by the last coulomb-counting step still maps to
/// a voltage.
pub fn ocv_from_soc(soc: f64) -> f64 {
    3.2 + 0.9 * soc + 0.3 * (soc * soc)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RCBranch {
    pub resistance: f64,
    pub capacitance: f64,
}

impl Default for RCBranch {
    fn default() -> Self {
        RCBranch {
            resistance: 0.03,
            capacitance: 2000.0,
        }
    }
}

impl RCBranch {
    pub fn time_constant(&self) -> f64 {
        self.resistance * self.capacitance
    }

    /// Exact first-order response of the branch voltage over `dt` at constant current.
    pub fn relax(&self, branch_voltage: f64, current: f64, dt: f64) -> f64 {
        let decay = (-dt / self.time_constant()).exp();
        branch_voltage * decay + current * self.resistance * (1.0 - decay)
    }
}

/// Electrical constants of one simulation run. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryParameters {
    /// Usable charge in coulombs
    pub rated_capacity_c: f64,
    /// Ohmic resistance R0 (ohm)
    pub series_resistance: f64,
    /// Polarization network Rp || Cp
    pub polarization: RCBranch,
    /// Terminal voltage at which the cell counts as empty (V)
    pub cutoff_voltage: f64,
}

impl Default for BatteryParameters {
    /// 4575 mAh phone cell at 25 °C
    fn default() -> Self {
        BatteryParameters {
            rated_capacity_c: 4575.0 * COULOMBS_PER_MAH,
            series_resistance: 0.05,
            polarization: RCBranch::default(),
            cutoff_voltage: 3.0,
        }
    }
}

impl BatteryParameters {
    /// Build parameters from a capacity in mAh and the circuit constants.
    pub fn from_mah(
        capacity_mah: f64,
        series_resistance: f64,
        polarization_resistance: f64,
        polarization_capacitance: f64,
        cutoff_voltage: f64,
    ) -> SimResult<Self> {
        let capacity_mah = require_positive("capacity (mAh)", capacity_mah)?;
        let params = BatteryParameters {
            rated_capacity_c: capacity_mah * COULOMBS_PER_MAH,
            series_resistance,
            polarization: RCBranch {
                resistance: polarization_resistance,
                capacitance: polarization_capacitance,
            },
            cutoff_voltage,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn capacity_mah(&self) -> f64 {
        self.rated_capacity_c / COULOMBS_PER_MAH
    }

    pub fn with_series_resistance(mut self, series_resistance: f64) -> SimResult<Self> {
        self.series_resistance = series_resistance;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> SimResult<()> {
        require_positive("rated capacity (C)", self.rated_capacity_c)?;
        require_positive("series resistance", self.series_resistance)?;
        require_positive("polarization resistance", self.polarization.resistance)?;
        require_positive("polarization capacitance", self.polarization.capacitance)?;
        require_positive("cutoff voltage", self.cutoff_voltage)?;
        Ok(())
    }
}

/// Thevenin (R0 + one RC branch) cell driven at constant power per step.
#[derive(Debug, Clone)]
pub struct DischargeSimulator {
    params: BatteryParameters,
    initial: BatteryState,
    state: BatteryState,
    terminal: Option<StepResult>,
}

impl DischargeSimulator {
    /// Fully charged, relaxed cell.
    pub fn new(params: BatteryParameters) -> SimResult<Self> {
        Self::with_initial_soc(params, 1.0)
    }

    pub fn with_initial_soc(params: BatteryParameters, initial_soc: f64) -> SimResult<Self> {
        params.validate()?;
        let soc = require_in_range("initial state of charge", initial_soc, 0.0, 1.0)?;
        let initial = BatteryState::with_state_of_charge(soc);
        Ok(DischargeSimulator {
            params,
            initial,
            state: initial,
            terminal: None,
        })
    }

    pub fn parameters(&self) -> &BatteryParameters {
        &self.params
    }

    pub fn state(&self) -> BatteryState {
        self.state
    }

    pub fn state_of_charge(&self) -> f64 {
        self.state.state_of_charge
    }

    pub fn polarization_voltage(&self) -> f64 {
        self.state.polarization_voltage
    }

    /// The terminal result, once one has been returned.
    pub fn terminal(&self) -> Option<StepResult> {
        self.terminal
    }

    pub fn is_terminated(&self) -> bool {
        self.terminal.is_some()
    }

    /// Advance the cell by `dt` seconds while it supplies `power_w` watts.
    ///
    /// Solves `R0·I² − (OCV − Up)·I + P = 0` for the load current and keeps the
    /// root nearer zero. State only changes on `StepResult::Ok`. Once a
    /// terminal result has been returned, the same result is returned again on
    /// every later call until [`Model::reset`].
    ///
    /// Negative or non-finite power and non-positive `dt` are rejected.
    pub fn step(&mut self, power_w: f64, dt: f64) -> SimResult<StepResult> {
        let power_w = require_non_negative("power draw (W)", power_w)?;
        let dt = require_positive("time step (s)", dt)?;

        if let Some(terminal) = self.terminal {
            return Ok(terminal);
        }

        let soc = self.state.state_of_charge;
        let up = self.state.polarization_voltage;
        let r0 = self.params.series_resistance;
        let emf = ocv_from_soc(soc) - up;
        let solution = solve_load_current(r0, emf, power_w);

        // An empty cell reports Depleted even when the load would also collapse.
        if soc <= 0.0 {
            let current = solution.unwrap_or(emf / (2.0 * r0));
            let voltage = emf - current * r0;
            return self.deplete(voltage, current);
        }

        let Some(current) = solution else {
            return Ok(self.terminate(StepResult::VoltageCollapse));
        };
        let voltage = emf - current * r0;

        if voltage < self.params.cutoff_voltage {
            return self.deplete(voltage, current);
        }

        let next_soc = soc - (current * dt) / self.params.rated_capacity_c;
        let next_up = self.params.polarization.relax(up, current, dt);
        if !next_soc.is_finite() || !next_up.is_finite() {
            return Err(SimError::NonPhysical {
                what: "battery state became non-finite",
            });
        }

        self.state.state_of_charge = next_soc;
        self.state.polarization_voltage = next_up;

        Ok(StepResult::Ok {
            voltage,
            current,
            state_of_charge: next_soc,
        })
    }

    fn deplete(&mut self, voltage: f64, current: f64) -> SimResult<StepResult> {
        if !voltage.is_finite() || !current.is_finite() {
            return Err(SimError::NonPhysical {
                what: "terminal voltage or current became non-finite",
            });
        }
        Ok(self.terminate(StepResult::Depleted { voltage, current }))
    }

    fn terminate(&mut self, result: StepResult) -> StepResult {
        debug!(
            "discharge terminated at soc={:.4}, up={:.4} V: {:?}",
            self.state.state_of_charge, self.state.polarization_voltage, result
        );
        self.terminal = Some(result);
        result
    }
}

impl Model for DischargeSimulator {
    fn reset(&mut self) {
        self.state = self.initial;
        self.terminal = None;
    }
}

impl DischargeModel for DischargeSimulator {
    fn step_discharge(&mut self, ctx: SimContext, power_w: f64) -> SimResult<StepResult> {
        self.step(power_w, ctx.dt)
    }

    fn battery_state(&self) -> BatteryState {
        self.state
    }
}

/// Load current the cell would draw for `power_w` at a given internal state,
/// or `None` when the load collapses the voltage.
pub fn load_current(params: &BatteryParameters, state: &BatteryState, power_w: f64) -> Option<f64> {
    let emf = ocv_from_soc(state.state_of_charge) - state.polarization_voltage;
    solve_load_current(params.series_resistance, emf, power_w)
}

/// Root of `R0·I² − emf·I + P = 0` nearer zero, `None` when the discriminant
/// is negative.
fn solve_load_current(r0: f64, emf: f64, power_w: f64) -> Option<f64> {
    let discriminant = emf * emf - 4.0 * r0 * power_w;
    if discriminant < 0.0 {
        None
    } else {
        Some((emf - discriminant.sqrt()) / (2.0 * r0))
    }
}

/// Largest power the cell can deliver from a given state: the vertex of the
/// power-current parabola, `(OCV − Up)² / 4·R0`.
pub fn max_deliverable_power(params: &BatteryParameters, state: &BatteryState) -> f64 {
    let emf = ocv_from_soc(state.state_of_charge) - state.polarization_voltage;
    emf * emf / (4.0 * params.series_resistance)
}
