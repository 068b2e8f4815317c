//! Discharge drivers and time-to-empty analysis
//!
//! These functions feed a [`DischargeModel`] one power value per fixed
//! timestep and record what comes back, stopping at the first terminal
//! result. Three driving modes are provided:
//!
//! - constant power until the battery gives out ([`run_constant_power`])
//! - a piecewise-constant schedule, state carried across segments ([`run_schedule`])
//! - parameter sweeps, one fresh simulator per value ([`sweep`], [`sweep_power`])

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use simcore::error::{SimResult, require_in_range, require_positive};
use simcore::{DischargeModel, FixedTimestep, LoadSchedule, StepResult};

use crate::battery::{BatteryParameters, DischargeSimulator};

/// Seven simulated days
pub const DEFAULT_MAX_DURATION_S: f64 = 7.0 * 24.0 * 3600.0;

/// Settings shared by every driver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Fixed step length (s)
    pub dt_s: f64,
    /// Spacing of recorded trace samples in simulated time (s)
    pub sample_interval_s: f64,
    /// Hard stop for loads the battery can sustain indefinitely (s)
    pub max_duration_s: f64,
    /// State of charge of freshly built simulators
    pub initial_soc: f64,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            dt_s: 1.0,
            sample_interval_s: 60.0,
            max_duration_s: DEFAULT_MAX_DURATION_S,
            initial_soc: 1.0,
        }
    }
}

impl RunOptions {
    pub fn validate(&self) -> SimResult<()> {
        require_positive("time step (s)", self.dt_s)?;
        require_positive("sample interval (s)", self.sample_interval_s)?;
        require_positive("max duration (s)", self.max_duration_s)?;
        require_in_range("initial state of charge", self.initial_soc, 0.0, 1.0)?;
        Ok(())
    }

    pub fn with_initial_soc(mut self, initial_soc: f64) -> Self {
        self.initial_soc = initial_soc;
        self
    }

    /// Steps between two recorded samples, at least one.
    fn sample_every(&self) -> u64 {
        ((self.sample_interval_s / self.dt_s).round() as u64).max(1)
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Cutoff voltage reached or charge used up
    Depleted,
    /// The load could not be supplied at any current
    VoltageCollapse,
    /// `max_duration_s` elapsed with the battery still alive
    TimeLimit,
    /// Every schedule segment ran with the battery still alive
    ScheduleComplete,
}

impl Termination {
    pub fn is_battery_limited(&self) -> bool {
        matches!(self, Termination::Depleted | Termination::VoltageCollapse)
    }
}

/// Sampled discharge curve, one entry per recorded step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DischargeTrace {
    pub times_s: Vec<f64>,
    pub voltages: Vec<f64>,
    pub currents: Vec<f64>,
    pub soc: Vec<f64>,
    pub power_w: Vec<f64>,
}

impl DischargeTrace {
    fn push(&mut self, t: f64, voltage: f64, current: f64, soc: f64, power_w: f64) {
        self.times_s.push(t);
        self.voltages.push(voltage);
        self.currents.push(current);
        self.soc.push(soc);
        self.power_w.push(power_w);
    }

    pub fn len(&self) -> usize {
        self.times_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times_s.is_empty()
    }

    pub fn last_time_s(&self) -> Option<f64> {
        self.times_s.last().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub termination: Termination,
    /// Simulated time covered by successful steps (s). This is the
    /// time-to-empty when the battery ended the run.
    pub elapsed_s: f64,
    /// Successful steps taken
    pub steps: u64,
    /// Last terminal voltage the model reported
    pub final_voltage: Option<f64>,
    pub final_state_of_charge: f64,
}

impl RunSummary {
    pub fn tte_hours(&self) -> f64 {
        self.elapsed_s / 3600.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DischargeRun {
    pub trace: DischargeTrace,
    pub summary: RunSummary,
}

/// Bookkeeping shared by the drivers
struct Recorder {
    clock: FixedTimestep,
    sample_every: u64,
    trace: DischargeTrace,
    last_sampled_step: Option<u64>,
    last_ok: Option<(f64, f64, f64, f64, f64)>,
    final_voltage: Option<f64>,
}

enum Advance {
    Continue,
    Stopped(Termination),
}

impl Recorder {
    fn new(options: &RunOptions) -> SimResult<Self> {
        options.validate()?;
        Ok(Recorder {
            clock: FixedTimestep::new(options.dt_s)?,
            sample_every: options.sample_every(),
            trace: DischargeTrace::default(),
            last_sampled_step: None,
            last_ok: None,
            final_voltage: None,
        })
    }

    fn step<M: DischargeModel>(&mut self, model: &mut M, power_w: f64) -> SimResult<Advance> {
        let ctx = self.clock.context();
        match model.step_discharge(ctx, power_w)? {
            StepResult::Ok {
                voltage,
                current,
                state_of_charge,
            } => {
                let index = self.clock.steps();
                if index % self.sample_every == 0 {
                    self.trace.push(ctx.t, voltage, current, state_of_charge, power_w);
                    self.last_sampled_step = Some(index);
                }
                self.last_ok = Some((ctx.t, voltage, current, state_of_charge, power_w));
                self.final_voltage = Some(voltage);
                self.clock.advance();
                Ok(Advance::Continue)
            }
            StepResult::Depleted { voltage, .. } => {
                self.final_voltage = Some(voltage);
                Ok(Advance::Stopped(Termination::Depleted))
            }
            StepResult::VoltageCollapse => Ok(Advance::Stopped(Termination::VoltageCollapse)),
        }
    }

    fn finish<M: DischargeModel>(mut self, model: &M, termination: Termination) -> DischargeRun {
        // Always end the trace on the last good step
        if let Some((t, voltage, current, soc, power_w)) = self.last_ok {
            let last_index = self.clock.steps() - 1;
            if self.last_sampled_step != Some(last_index) {
                self.trace.push(t, voltage, current, soc, power_w);
            }
        }
        let summary = RunSummary {
            termination,
            elapsed_s: self.clock.time(),
            steps: self.clock.steps(),
            final_voltage: self.final_voltage,
            final_state_of_charge: model.battery_state().state_of_charge,
        };
        debug!(
            "run finished: {:?} after {} steps ({:.3} h), soc={:.4}",
            summary.termination,
            summary.steps,
            summary.tte_hours(),
            summary.final_state_of_charge
        );
        DischargeRun {
            trace: self.trace,
            summary,
        }
    }
}

/// Drive `model` at a fixed power until it reports a terminal result or
/// `options.max_duration_s` passes.
pub fn run_constant_power<M: DischargeModel>(
    model: &mut M,
    power_w: f64,
    options: &RunOptions,
) -> SimResult<DischargeRun> {
    let mut recorder = Recorder::new(options)?;
    let max_steps = recorder.clock.steps_in(options.max_duration_s)?;
    debug!("constant-power run: {power_w} W, dt={} s, up to {max_steps} steps", options.dt_s);

    while recorder.clock.steps() < max_steps {
        if let Advance::Stopped(termination) = recorder.step(model, power_w)? {
            return Ok(recorder.finish(model, termination));
        }
    }

    warn!(
        "battery still alive after {} s at {power_w} W; stopping at the time limit",
        options.max_duration_s
    );
    Ok(recorder.finish(model, Termination::TimeLimit))
}

/// Apply each segment of `schedule` in order without resetting the model.
///
/// Each segment contributes `floor(duration / dt)` steps. The run ends early
/// on a terminal result, otherwise with [`Termination::ScheduleComplete`];
/// `options.max_duration_s` does not apply.
pub fn run_schedule<M: DischargeModel>(
    model: &mut M,
    schedule: &LoadSchedule,
    options: &RunOptions,
) -> SimResult<DischargeRun> {
    let mut recorder = Recorder::new(options)?;

    for segment in schedule.segments() {
        let steps = recorder.clock.steps_in(segment.duration_s)?;
        debug!(
            "segment {}: {} W for {steps} steps",
            segment.label.as_deref().unwrap_or("-"),
            segment.power_w
        );
        for _ in 0..steps {
            if let Advance::Stopped(termination) = recorder.step(model, segment.power_w)? {
                return Ok(recorder.finish(model, termination));
            }
        }
    }

    Ok(recorder.finish(model, Termination::ScheduleComplete))
}

/// Fresh simulator at `options.initial_soc`, driven at constant power.
pub fn simulate_constant_power(
    params: BatteryParameters,
    power_w: f64,
    options: &RunOptions,
) -> SimResult<DischargeRun> {
    let mut sim = DischargeSimulator::with_initial_soc(params, options.initial_soc)?;
    run_constant_power(&mut sim, power_w, options)
}

/// Fresh simulator at `options.initial_soc`, driven through a schedule.
pub fn simulate_schedule(
    params: BatteryParameters,
    schedule: &LoadSchedule,
    options: &RunOptions,
) -> SimResult<DischargeRun> {
    let mut sim = DischargeSimulator::with_initial_soc(params, options.initial_soc)?;
    run_schedule(&mut sim, schedule, options)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    /// The swept parameter value
    pub value: f64,
    pub summary: RunSummary,
}

/// Run one constant-power discharge per parameter value. `make_params` maps
/// each value to the parameters of an independent, freshly built simulator.
pub fn sweep<F>(
    values: &[f64],
    make_params: F,
    power_w: f64,
    options: &RunOptions,
) -> SimResult<Vec<SweepPoint>>
where
    F: Fn(f64) -> SimResult<BatteryParameters>,
{
    values
        .iter()
        .map(|&value| {
            let params = make_params(value)?;
            let run = simulate_constant_power(params, power_w, options)?;
            debug!("sweep value {value}: {:.3} h", run.summary.tte_hours());
            Ok(SweepPoint {
                value,
                summary: run.summary,
            })
        })
        .collect()
}

/// One constant-power discharge per load level on the same battery.
pub fn sweep_power(
    params: BatteryParameters,
    powers_w: &[f64],
    options: &RunOptions,
) -> SimResult<Vec<SweepPoint>> {
    powers_w
        .iter()
        .map(|&power_w| {
            let run = simulate_constant_power(params, power_w, options)?;
            Ok(SweepPoint {
                value: power_w,
                summary: run.summary,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use simcore::LoadSegment;

    #[test]
    fn test_constant_power_ends_depleted() {
        let run = simulate_constant_power(BatteryParameters::default(), 3.87, &RunOptions::default()).unwrap();

        assert_eq!(run.summary.termination, Termination::Depleted);
        // The OCV floor keeps the terminal voltage above 3.0 V at this load,
        // so the charge runs out first
        assert!(run.summary.final_state_of_charge <= 0.0);
        assert!(run.summary.final_voltage.unwrap() > 3.0);
        // A 17.7 Wh cell cannot last longer than its energy allows at 3.87 W
        assert!(run.summary.tte_hours() > 3.0 && run.summary.tte_hours() < 4.575);
        assert_eq!(run.summary.elapsed_s, run.summary.steps as f64);
    }

    #[test]
    fn test_trace_sampled_every_minute() {
        let run = simulate_constant_power(BatteryParameters::default(), 3.87, &RunOptions::default()).unwrap();
        let trace = &run.trace;

        assert_eq!(trace.times_s[0], 0.0);
        assert_eq!(trace.times_s[1], 60.0);
        // last sample is the last good step
        assert_eq!(trace.last_time_s(), Some(run.summary.elapsed_s - 1.0));
        assert!(trace.soc.windows(2).all(|w| w[1] < w[0]));
        assert!(trace.power_w.iter().all(|&p| p == 3.87));
        assert_eq!(trace.len(), trace.voltages.len());
    }

    #[test]
    fn test_zero_power_hits_time_limit() {
        let options = RunOptions {
            max_duration_s: 600.0,
            ..RunOptions::default()
        };
        let run = simulate_constant_power(BatteryParameters::default(), 0.0, &options).unwrap();

        assert_eq!(run.summary.termination, Termination::TimeLimit);
        assert_eq!(run.summary.steps, 600);
        assert_eq!(run.summary.final_state_of_charge, 1.0);
        assert_eq!(run.trace.len(), 11);
    }

    #[test]
    fn test_collapse_reported() {
        let run = simulate_constant_power(BatteryParameters::default(), 150.0, &RunOptions::default()).unwrap();
        assert_eq!(run.summary.termination, Termination::VoltageCollapse);
        assert_eq!(run.summary.steps, 0);
        assert!(run.trace.is_empty());
        assert_eq!(run.summary.final_voltage, None);
    }

    #[test]
    fn test_lower_initial_soc_shortens_run() {
        let params = BatteryParameters::default();
        let full = simulate_constant_power(params, 2.21, &RunOptions::default()).unwrap();
        let half = simulate_constant_power(params, 2.21, &RunOptions::default().with_initial_soc(0.5)).unwrap();
        assert!(half.summary.elapsed_s < full.summary.elapsed_s);
        assert_eq!(half.summary.termination, Termination::Depleted);
    }

    #[test]
    fn test_short_schedule_completes() {
        let schedule = LoadSchedule::new(vec![
            LoadSegment::seconds(120.0, 2.0),
            LoadSegment::seconds(60.5, 1.0),
        ])
        .unwrap();
        let run = simulate_schedule(BatteryParameters::default(), &schedule, &RunOptions::default()).unwrap();

        assert_eq!(run.summary.termination, Termination::ScheduleComplete);
        assert_eq!(run.summary.steps, 180);
        assert_eq!(run.trace.times_s, vec![0.0, 60.0, 120.0, 179.0]);
        assert_eq!(run.trace.power_w, vec![2.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_rejects_bad_options() {
        let options = RunOptions {
            dt_s: 0.0,
            ..RunOptions::default()
        };
        assert!(simulate_constant_power(BatteryParameters::default(), 1.0, &options).is_err());

        let options = RunOptions::default().with_initial_soc(1.5);
        assert!(simulate_constant_power(BatteryParameters::default(), 1.0, &options).is_err());
    }

    #[test]
    fn test_power_sweep_is_monotonic() {
        let points = sweep_power(BatteryParameters::default(), &[0.8, 1.0, 1.2], &RunOptions::default()).unwrap();
        assert_eq!(points.len(), 3);
        assert!(points[0].summary.elapsed_s > points[1].summary.elapsed_s);
        assert!(points[1].summary.elapsed_s > points[2].summary.elapsed_s);
    }
}
