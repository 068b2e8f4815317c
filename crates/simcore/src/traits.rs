use serde::{Deserialize, Serialize};

use crate::error::SimResult;

// Battery Traits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryState {
    pub state_of_charge: f64,
    pub polarization_voltage: f64,
}

impl Default for BatteryState {
    fn default() -> Self {
        BatteryState {
            state_of_charge: 1.0,
            polarization_voltage: 0.0,
        }
    }
}

impl BatteryState {
    pub fn with_state_of_charge(state_of_charge: f64) -> Self {
        BatteryState {
            state_of_charge,
            ..Default::default()
        }
    }
}

/// Outcome of a single discharge step.
///
/// `Depleted` and `VoltageCollapse` are terminal: a model that returned one of
/// them will not make further progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepResult {
    Ok {
        voltage: f64,
        current: f64,
        state_of_charge: f64,
    },
    /// Terminal voltage fell under cutoff, or the charge is used up.
    Depleted { voltage: f64, current: f64 },
    /// The requested power has no real current solution.
    VoltageCollapse,
}

impl StepResult {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepResult::Ok { .. })
    }

    /// Terminal voltage, if the step produced one
    pub fn voltage(&self) -> Option<f64> {
        match *self {
            StepResult::Ok { voltage, .. } | StepResult::Depleted { voltage, .. } => Some(voltage),
            StepResult::VoltageCollapse => None,
        }
    }

    /// Load current, if the step produced one
    pub fn current(&self) -> Option<f64> {
        match *self {
            StepResult::Ok { current, .. } | StepResult::Depleted { current, .. } => Some(current),
            StepResult::VoltageCollapse => None,
        }
    }
}

// General Traits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimContext {
    pub dt: f64,
    pub t: f64,
}

pub trait Model {
    fn reset(&mut self);
}

/// A battery model driven by a requested electrical power.
pub trait DischargeModel: Model {
    fn step_discharge(&mut self, ctx: SimContext, power_w: f64) -> SimResult<StepResult>;

    fn battery_state(&self) -> BatteryState;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_result_accessors() {
        let ok = StepResult::Ok { voltage: 4.1, current: 0.9, state_of_charge: 0.8 };
        assert!(!ok.is_terminal());
        assert_eq!(ok.voltage(), Some(4.1));

        let depleted = StepResult::Depleted { voltage: 2.9, current: 1.4 };
        assert!(depleted.is_terminal());
        assert_eq!(depleted.current(), Some(1.4));

        assert!(StepResult::VoltageCollapse.is_terminal());
        assert_eq!(StepResult::VoltageCollapse.voltage(), None);
    }

    #[test]
    fn test_step_result_is_tagged_in_json() {
        let json = serde_json::to_string(&StepResult::VoltageCollapse).unwrap();
        assert_eq!(json, r#"{"kind":"voltage_collapse"}"#);

        let depleted: StepResult =
            serde_json::from_str(r#"{"kind":"depleted","voltage":2.95,"current":1.3}"#).unwrap();
        assert_eq!(depleted, StepResult::Depleted { voltage: 2.95, current: 1.3 });
    }

    #[test]
    fn test_default_battery_state_is_full_and_relaxed() {
        let state = BatteryState::default();
        assert_eq!(state.state_of_charge, 1.0);
        assert_eq!(state.polarization_voltage, 0.0);
        assert_eq!(BatteryState::with_state_of_charge(0.5).polarization_voltage, 0.0);
    }
}
