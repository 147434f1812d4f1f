//! The Simulation Runner.
//!
//! Binds positions into an [`Engine`], minimizes, thermalizes and then
//! advances the dynamics for exactly `total_steps` steps. Frames go to a
//! [`TrajectorySink`] every `record_interval` steps (plus one frame for the
//! minimized start), progress events to a [`ProgressSink`] every tenth of the
//! run.
//!
//! Failures are never retried. Frames recorded before a failure have already
//! been flushed and stay in the sink.

mod reporter;

pub use reporter::{ConsoleReporter, NullProgress};

use crate::engine::{Engine, EngineState, LangevinIntegrator};
use crate::error::Error;
use crate::model::system::SimulationSystem;
use crate::trajectory::{Frame, TrajectoryFormat, TrajectorySink};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Ratios within this relative distance of an integer count as that integer.
const STEP_SNAP_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizationSettings {
    /// RMS force threshold in kcal/mol/Å.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for MinimizationSettings {
    fn default() -> Self {
        Self {
            // 10 kJ/mol/nm
            tolerance: 0.239,
            max_iterations: 5000,
        }
    }
}

/// Immutable scalar configuration of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunParameters {
    /// K
    pub temperature: f64,
    /// 1/ps
    pub friction: f64,
    /// ps
    pub timestep: f64,
    pub total_steps: u64,
    /// Steps between trajectory frames.
    pub record_interval: u64,
    /// Seeds both the initial velocities and the thermostat noise.
    pub seed: u64,
    pub minimization: MinimizationSettings,
}

impl RunParameters {
    pub fn new(
        temperature: f64,
        friction: f64,
        timestep: f64,
        total_steps: u64,
        record_interval: u64,
    ) -> Result<Self, Error> {
        let params = Self {
            temperature,
            friction,
            timestep,
            total_steps,
            record_interval,
            seed: 0,
            minimization: MinimizationSettings::default(),
        };
        params.validate()?;
        Ok(params)
    }

    /// Derives `total_steps` from a simulated duration.
    ///
    /// The step count is `duration / timestep` truncated toward zero, except
    /// that ratios within 1e-9 (relative) of an integer snap to it, so
    /// 400 ps at 0.002 ps gives 200000 steps despite floating-point error.
    pub fn from_duration(
        duration: f64,
        timestep: f64,
        temperature: f64,
        friction: f64,
        record_interval: u64,
    ) -> Result<Self, Error> {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(Error::invalid_parameters(format!(
                "duration must be positive, got {duration} ps"
            )));
        }
        if !(timestep.is_finite() && timestep > 0.0) {
            return Err(Error::invalid_parameters(format!(
                "timestep must be positive, got {timestep} ps"
            )));
        }
        let total_steps = steps_for_duration(duration, timestep);
        Self::new(temperature, friction, timestep, total_steps, record_interval)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_minimization(mut self, minimization: MinimizationSettings) -> Self {
        self.minimization = minimization;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        let positive = |value: f64, what: &str, unit: &str| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(Error::invalid_parameters(format!(
                    "{what} must be positive, got {value} {unit}"
                )))
            }
        };
        positive(self.temperature, "temperature", "K")?;
        positive(self.timestep, "timestep", "ps")?;
        if !(self.friction.is_finite() && self.friction >= 0.0) {
            return Err(Error::invalid_parameters(format!(
                "friction must be non-negative, got {} /ps",
                self.friction
            )));
        }
        if self.total_steps == 0 {
            return Err(Error::invalid_parameters("total step count must be positive"));
        }
        if self.record_interval == 0 {
            return Err(Error::invalid_parameters("record interval must be positive"));
        }
        positive(self.minimization.tolerance, "minimization tolerance", "kcal/mol/Å")?;
        Ok(())
    }

    /// Number of frames a complete run records, the minimized start included.
    pub fn frame_count(&self) -> u64 {
        self.total_steps / self.record_interval + 1
    }

    /// Step of the last recorded frame; never beyond `total_steps`.
    pub fn last_recorded_step(&self) -> u64 {
        (self.total_steps / self.record_interval) * self.record_interval
    }

    /// Steps between progress events.
    pub fn progress_interval(&self) -> u64 {
        (self.total_steps / 10).max(1)
    }

    /// Simulated time of the whole run in ps.
    pub fn duration(&self) -> f64 {
        self.total_steps as f64 * self.timestep
    }

    pub fn integrator(&self) -> LangevinIntegrator {
        LangevinIntegrator {
            temperature: self.temperature,
            friction: self.friction,
            timestep: self.timestep,
            seed: self.seed,
        }
    }
}

fn steps_for_duration(duration: f64, timestep: f64) -> u64 {
    let ratio = duration / timestep;
    let nearest = ratio.round();
    if (ratio - nearest).abs() <= STEP_SNAP_TOLERANCE * nearest.max(1.0) {
        nearest as u64
    } else {
        ratio.trunc() as u64
    }
}

/// Observability record emitted at a coarser cadence than frames.
#[derive(Debug, Clone, PartialEq)]
pub struct RunProgressEvent {
    pub step: u64,
    pub total_steps: u64,
    /// ps
    pub time: f64,
    /// kcal/mol
    pub potential_energy: f64,
    /// K
    pub temperature: f64,
    pub percent_complete: f64,
    /// Wall-clock time since dynamics started.
    pub elapsed: Duration,
}

impl RunProgressEvent {
    /// Simulated nanoseconds per wall-clock day so far.
    pub fn ns_per_day(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        (secs > 0.0).then(|| self.time * 1e-3 * 86_400.0 / secs)
    }
}

/// What a completed run reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub total_steps: u64,
    pub frames_written: usize,
    /// kcal/mol before minimization.
    pub initial_energy: f64,
    /// kcal/mol after minimization.
    pub minimized_energy: f64,
    pub final_potential_energy: f64,
    pub final_temperature: f64,
    pub elapsed: Duration,
}

/// Receiver of run observability; not part of the scientific record.
pub trait ProgressSink {
    fn minimized(&mut self, _initial_energy: f64, _minimized_energy: f64) {}

    fn progress(&mut self, event: &RunProgressEvent);

    fn completed(&mut self, _summary: &RunSummary) {}
}

impl ProgressSink for Vec<RunProgressEvent> {
    fn progress(&mut self, event: &RunProgressEvent) {
        self.push(event.clone());
    }
}

/// Creates an engine for `system` and runs it from the system's own positions.
pub fn run<E: Engine>(
    system: &SimulationSystem,
    params: &RunParameters,
    trajectory: &mut dyn TrajectorySink,
    progress: &mut dyn ProgressSink,
) -> Result<RunSummary, Error> {
    params.validate()?;
    let mut engine = E::create(system, &params.integrator())?;
    run_with_engine(
        &mut engine,
        &system.positions(),
        params,
        trajectory,
        progress,
    )
}

/// Runs an already created engine from `positions`.
pub fn run_with_engine<E: Engine>(
    engine: &mut E,
    positions: &[[f64; 3]],
    params: &RunParameters,
    trajectory: &mut dyn TrajectorySink,
    progress: &mut dyn ProgressSink,
) -> Result<RunSummary, Error> {
    params.validate()?;
    if params.total_steps % params.record_interval != 0 {
        log::warn!(
            "record interval {} does not divide {} steps; last frame at step {}",
            params.record_interval,
            params.total_steps,
            params.last_recorded_step()
        );
    }

    engine.set_positions(positions)?;
    let initial_energy = engine.state().potential_energy;

    log::info!(
        "minimizing (tolerance {} kcal/mol/Å, at most {} iterations)",
        params.minimization.tolerance,
        params.minimization.max_iterations
    );
    engine.minimize(
        params.minimization.tolerance,
        params.minimization.max_iterations,
    )?;
    let minimized_energy = engine.state().potential_energy;
    progress.minimized(initial_energy, minimized_energy);

    engine.set_velocities_to_temperature(params.temperature, params.seed);

    let mut recorder = Recorder {
        sink: trajectory,
        timestep: params.timestep,
        written: 0,
    };
    recorder.record(0, &engine.state())?;

    log::info!(
        "running {} steps ({} ps) at {} K, {} frames expected",
        params.total_steps,
        params.duration(),
        params.temperature,
        params.frame_count()
    );

    let started = Instant::now();
    let progress_interval = params.progress_interval();
    let mut step = 0u64;
    while step < params.total_steps {
        let next = next_event(step, params.record_interval, progress_interval)
            .min(params.total_steps);
        if let Err(e) = engine.step(next - step) {
            if let Err(flush) = recorder.sink.flush() {
                log::error!("failed to flush trajectory after divergence: {flush}");
            }
            log::error!("{e}; {} frames were written", recorder.written);
            return Err(e.into());
        }
        step = next;

        let record = step % params.record_interval == 0;
        let report = step % progress_interval == 0;
        if !(record || report) {
            continue;
        }
        let state = engine.state();
        if record {
            recorder.record(step, &state)?;
        }
        if report {
            progress.progress(&RunProgressEvent {
                step,
                total_steps: params.total_steps,
                time: step as f64 * params.timestep,
                potential_energy: state.potential_energy,
                temperature: state.temperature,
                percent_complete: 100.0 * step as f64 / params.total_steps as f64,
                elapsed: started.elapsed(),
            });
        }
    }

    recorder.sink.finish().map_err(Error::TrajectoryWrite)?;

    let last = engine.state();
    let summary = RunSummary {
        total_steps: params.total_steps,
        frames_written: recorder.written,
        initial_energy,
        minimized_energy,
        final_potential_energy: last.potential_energy,
        final_temperature: last.temperature,
        elapsed: started.elapsed(),
    };
    log::info!(
        "run complete: {} frames, final energy {:.3} kcal/mol, {:.1} K",
        summary.frames_written,
        summary.final_potential_energy,
        summary.final_temperature
    );
    progress.completed(&summary);
    Ok(summary)
}

/// Smallest multiple of either interval strictly after `step`.
fn next_event(step: u64, record_interval: u64, progress_interval: u64) -> u64 {
    let next_multiple = |interval: u64| (step / interval + 1) * interval;
    next_multiple(record_interval).min(next_multiple(progress_interval))
}

struct Recorder<'a> {
    sink: &'a mut dyn TrajectorySink,
    timestep: f64,
    written: usize,
}

impl Recorder<'_> {
    fn record(&mut self, step: u64, state: &EngineState) -> Result<(), Error> {
        let frame = Frame {
            index: self.written,
            step,
            time: step as f64 * self.timestep,
            positions: state.positions.clone(),
            potential_energy: Some(state.potential_energy),
            temperature: Some(state.temperature),
            box_vectors: state.box_vectors,
        };
        self.sink
            .write_frame(&frame)
            .and_then(|()| self.sink.flush())
            .map_err(Error::TrajectoryWrite)?;
        self.written += 1;
        log::debug!(
            "frame {} at step {}: {:.3} kcal/mol, {:.1} K",
            frame.index,
            step,
            state.potential_energy,
            state.temperature
        );
        Ok(())
    }
}

/// Renders a temperature the way it appears in file names (`300`, `310.5`).
fn temperature_label(temperature: f64) -> String {
    format!("{temperature}K")
}

fn stem(input: &Path) -> String {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("trajectory")
        .to_string()
}

/// `<output_dir>/<input stem>_<temperature>K.<ext>`
pub fn trajectory_path(
    output_dir: &Path,
    input: &Path,
    temperature: f64,
    format: TrajectoryFormat,
) -> PathBuf {
    output_dir.join(format!(
        "{}_{}.{}",
        stem(input),
        temperature_label(temperature),
        format.extension()
    ))
}

/// `<output_dir>/<input stem>_<temperature>K_topology.pdb`, the prepared
/// system the trajectory's atoms refer to.
pub fn topology_path(output_dir: &Path, input: &Path, temperature: f64) -> PathBuf {
    output_dir.join(format!(
        "{}_{}_topology.pdb",
        stem(input),
        temperature_label(temperature)
    ))
}
