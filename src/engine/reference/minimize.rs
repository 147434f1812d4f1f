use super::ReferenceEngine;
use super::forces::Vec3;
use crate::error::{SimulationDivergedError, SimulationPhase};

const INITIAL_STEP: f64 = 0.01;
const MAX_STEP: f64 = 0.2;
const MIN_STEP: f64 = 1e-7;

/// Outcome of a steepest-descent run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MinimizationReport {
    pub iterations: usize,
    pub initial_energy: f64,
    pub final_energy: f64,
    pub rms_force: f64,
    pub converged: bool,
}

pub(crate) fn rms_force(forces: &[Vec3]) -> f64 {
    if forces.is_empty() {
        return 0.0;
    }
    let sum: f64 = forces
        .iter()
        .map(|f| f[0] * f[0] + f[1] * f[1] + f[2] * f[2])
        .sum();
    (sum / (3 * forces.len()) as f64).sqrt()
}

fn max_force(forces: &[Vec3]) -> f64 {
    forces
        .iter()
        .map(|f| (f[0] * f[0] + f[1] * f[1] + f[2] * f[2]).sqrt())
        .fold(0.0, f64::max)
}

/// Forces tangent to the constraint surface; convergence is measured on these.
fn free_forces(engine: &ReferenceEngine) -> Vec<Vec3> {
    engine.constraints.project_forces(
        &engine.force_field.geometry,
        &engine.positions,
        &engine.forces,
        &engine.inv_masses,
    )
}

/// Adaptive steepest descent.
///
/// Each trial moves every atom along its constraint-projected force so that
/// the largest displacement equals the current step length, then SHAKEs
/// back onto the constraints. Accepted trials grow the step, rejected ones
/// halve it.
pub(crate) fn steepest_descent(
    engine: &mut ReferenceEngine,
    tolerance: f64,
    max_iterations: usize,
) -> Result<MinimizationReport, SimulationDivergedError> {
    engine.refresh_forces();
    let initial_energy = engine.potential_energy;
    if !initial_energy.is_finite() {
        return Err(SimulationDivergedError::new(
            SimulationPhase::Minimization,
            0,
            "initial potential energy is not finite",
        ));
    }

    let mut step = INITIAL_STEP;
    let mut iterations = 0;
    let mut direction = free_forces(engine);
    let mut rms = rms_force(&direction);

    while iterations < max_iterations && rms >= tolerance && step >= MIN_STEP {
        iterations += 1;
        let f_max = max_force(&direction);
        if f_max == 0.0 {
            break;
        }

        let saved_positions = engine.positions.clone();
        let saved_forces = engine.forces.clone();
        let saved_energy = engine.potential_energy;

        let scale = step / f_max;
        for (x, f) in engine.positions.iter_mut().zip(&direction) {
            x[0] += scale * f[0];
            x[1] += scale * f[1];
            x[2] += scale * f[2];
        }
        let projected = engine.constraints.shake(
            &engine.force_field.geometry,
            &saved_positions,
            &mut engine.positions,
            &engine.inv_masses,
        );
        if projected.is_some() {
            engine.refresh_forces();
        }

        if projected.is_some()
            && engine.potential_energy.is_finite()
            && engine.potential_energy < saved_energy
        {
            step = (step * 1.2).min(MAX_STEP);
            direction = free_forces(engine);
            rms = rms_force(&direction);
        } else {
            engine.positions = saved_positions;
            engine.forces = saved_forces;
            engine.potential_energy = saved_energy;
            step *= 0.5;
        }
    }

    // a rejected final trial may leave a stale list built for trial positions
    engine.neighbors.update(&engine.force_field, &engine.positions);

    Ok(MinimizationReport {
        iterations,
        initial_energy,
        final_energy: engine.potential_energy,
        rms_force: rms,
        converged: rms < tolerance,
    })
}
