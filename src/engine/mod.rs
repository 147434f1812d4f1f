//! The delegated simulation engine.
//!
//! The runner only talks to the [`Engine`] trait, so any backend that can
//! minimize, thermalize and integrate a [`SimulationSystem`] can drive a run.
//! [`ReferenceEngine`] is the bundled CPU implementation; tests substitute
//! their own deterministic engines.

pub mod reference;
pub mod units;

pub use reference::ReferenceEngine;

use crate::error::{Error, SimulationDivergedError};
use crate::model::system::SimulationSystem;

/// Langevin thermostat and integration settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LangevinIntegrator {
    /// Bath temperature in K.
    pub temperature: f64,
    /// Friction coefficient in 1/ps.
    pub friction: f64,
    /// Integration timestep in ps.
    pub timestep: f64,
    /// Seed of the random force stream.
    pub seed: u64,
}

/// Snapshot of an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    /// Dynamics steps taken since the engine was created.
    pub step: u64,
    /// Simulated time in ps.
    pub time: f64,
    pub positions: Vec<[f64; 3]>,
    /// kcal/mol.
    pub potential_energy: f64,
    /// kcal/mol.
    pub kinetic_energy: f64,
    /// Instantaneous temperature in K.
    pub temperature: f64,
    pub box_vectors: Option<[[f64; 3]; 3]>,
}

/// A backend able to run Langevin dynamics on a [`SimulationSystem`].
///
/// Setup failures (bad positions, incompatible systems) are reported as
/// [`Error`]; anything that goes wrong numerically afterwards is a
/// [`SimulationDivergedError`].
pub trait Engine: Sized {
    fn create(system: &SimulationSystem, integrator: &LangevinIntegrator) -> Result<Self, Error>;

    fn set_positions(&mut self, positions: &[[f64; 3]]) -> Result<(), Error>;

    /// Local energy minimization until the RMS force drops below
    /// `tolerance` (kcal/mol/Å) or `max_iterations` is reached.
    fn minimize(
        &mut self,
        tolerance: f64,
        max_iterations: usize,
    ) -> Result<(), SimulationDivergedError>;

    /// Draws Maxwell-Boltzmann velocities for `temperature`.
    fn set_velocities_to_temperature(&mut self, temperature: f64, seed: u64);

    fn step(&mut self, steps: u64) -> Result<(), SimulationDivergedError>;

    fn state(&self) -> EngineState;
}
