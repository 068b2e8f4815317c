use log::debug;

use crate::SimContext;
use crate::error::{SimResult, require_positive};

/// Slack applied before truncating `duration / dt`, so that durations which
/// are whole multiples of `dt` are not lost to rounding (e.g. 1800 / 0.1).
const STEP_COUNT_EPSILON: f64 = 1e-9;

/// Fixed-timestep clock.
///
/// Hands out one [`SimContext`] per step and converts segment durations into
/// whole step counts. Time is derived from the step index rather than summed,
/// so long runs do not drift.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    fixed_dt: f64,
    steps: u64,
}

impl FixedTimestep {
    pub fn new(fixed_dt: f64) -> SimResult<Self> {
        Ok(FixedTimestep {
            fixed_dt: require_positive("time step", fixed_dt)?,
            steps: 0,
        })
    }

    pub fn dt(&self) -> f64 {
        self.fixed_dt
    }

    /// Number of steps taken so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Simulated time at the start of the next step.
    pub fn time(&self) -> f64 {
        self.steps as f64 * self.fixed_dt
    }

    /// Context for the step about to run. Does not advance the clock.
    pub fn context(&self) -> SimContext {
        SimContext {
            dt: self.fixed_dt,
            t: self.time(),
        }
    }

    /// Marks the current step as taken.
    pub fn advance(&mut self) {
        self.steps += 1;
    }

    /// Whole steps that fit in `duration`. The remainder of a segment is
    /// dropped, not carried into the next one.
    pub fn steps_in(&self, duration: f64) -> SimResult<u64> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(crate::SimError::InvalidArgument {
                what: "segment duration",
                value: duration,
            });
        }
        let exact = duration / self.fixed_dt;
        let whole = (exact + STEP_COUNT_EPSILON).floor();
        if exact - whole > STEP_COUNT_EPSILON {
            debug!(
                "segment of {duration} s is not a multiple of dt={}; dropping {:.3} s",
                self.fixed_dt,
                (exact - whole) * self.fixed_dt
            );
        }
        Ok(whole as u64)
    }

    pub fn reset(&mut self) {
        self.steps = 0;
    }
}
