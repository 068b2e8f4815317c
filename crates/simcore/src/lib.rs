pub mod error;
pub mod schedule;
pub mod timestep;
mod traits;

pub use error::{SimError, SimResult};
pub use schedule::{LoadSchedule, LoadSegment};
pub use timestep::FixedTimestep;
pub use traits::*;
