pub mod analysis;
pub mod battery;
pub mod load;
pub mod sensitivity;
pub mod temperature;

pub use analysis::{DischargeRun, DischargeTrace, RunOptions, RunSummary, Termination};
pub use battery::{BatteryParameters, DischargeSimulator, RCBranch, ocv_from_soc};
pub use temperature::{BatteryRating, ThermalModel, derive_parameters};
