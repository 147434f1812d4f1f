use super::forces::{Geometry, Vec3, dot};
use crate::model::system::DistanceConstraint;

const MAX_ITERATIONS: usize = 500;

/// Relative tolerance on squared constraint lengths.
const TOLERANCE: f64 = 1e-8;

/// SHAKE for positions and RATTLE for velocities over a fixed constraint set.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConstraintSolver {
    constraints: Vec<DistanceConstraint>,
}

impl ConstraintSolver {
    pub(crate) fn new(constraints: &[DistanceConstraint]) -> Self {
        Self {
            constraints: constraints.to_vec(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Moves `positions` back onto the constraint surface. Corrections are
    /// directed along the bond vectors of `reference`.
    ///
    /// Returns the number of sweeps, or `None` when SHAKE failed to converge.
    pub(crate) fn shake(
        &self,
        geometry: &Geometry,
        reference: &[Vec3],
        positions: &mut [Vec3],
        inv_masses: &[f64],
    ) -> Option<usize> {
        if self.is_empty() {
            return Some(0);
        }
        for sweep in 1..=MAX_ITERATIONS {
            let mut converged = true;
            for c in &self.constraints {
                let (i, j) = (c.i, c.j);
                let s = geometry.delta(positions[i], positions[j]);
                let target = c.distance * c.distance;
                let diff = target - dot(s, s);
                if diff.abs() <= TOLERANCE * target {
                    continue;
                }
                converged = false;

                let r = geometry.delta(reference[i], reference[j]);
                let w = inv_masses[i] + inv_masses[j];
                let denom = 2.0 * w * dot(s, r);
                if denom.abs() < 1e-12 || !diff.is_finite() {
                    return None;
                }
                let g = diff / denom;
                for k in 0..3 {
                    positions[i][k] += g * inv_masses[i] * r[k];
                    positions[j][k] -= g * inv_masses[j] * r[k];
                }
            }
            if converged {
                return Some(sweep);
            }
        }
        None
    }

    /// Removes velocity components along every constrained bond.
    pub(crate) fn rattle(
        &self,
        geometry: &Geometry,
        positions: &[Vec3],
        velocities: &mut [Vec3],
        inv_masses: &[f64],
    ) {
        if self.is_empty() {
            return;
        }
        for _ in 0..MAX_ITERATIONS {
            let mut converged = true;
            for c in &self.constraints {
                let (i, j) = (c.i, c.j);
                let r = geometry.delta(positions[i], positions[j]);
                let v = [
                    velocities[i][0] - velocities[j][0],
                    velocities[i][1] - velocities[j][1],
                    velocities[i][2] - velocities[j][2],
                ];
                let r2 = dot(r, r);
                let w = inv_masses[i] + inv_masses[j];
                if r2 < 1e-12 || w == 0.0 {
                    continue;
                }
                let rv = dot(r, v);
                if rv.abs() <= TOLERANCE * r2.sqrt() {
                    continue;
                }
                converged = false;
                let k = rv / (r2 * w);
                for d in 0..3 {
                    velocities[i][d] -= k * inv_masses[i] * r[d];
                    velocities[j][d] += k * inv_masses[j] * r[d];
                }
            }
            if converged {
                return;
            }
        }
    }

    /// `forces` minus the part the constraint forces would cancel: the
    /// accelerations they produce have no component along any constrained
    /// bond.
    pub(crate) fn project_forces(
        &self,
        geometry: &Geometry,
        positions: &[Vec3],
        forces: &[Vec3],
        inv_masses: &[f64],
    ) -> Vec<Vec3> {
        if self.is_empty() {
            return forces.to_vec();
        }
        let mut accelerations: Vec<Vec3> = forces
            .iter()
            .zip(inv_masses)
            .map(|(f, w)| [f[0] * w, f[1] * w, f[2] * w])
            .collect();
        self.rattle(geometry, positions, &mut accelerations, inv_masses);
        accelerations
            .iter()
            .zip(inv_masses)
            .map(|(a, &w)| {
                if w > 0.0 {
                    [a[0] / w, a[1] / w, a[2] / w]
                } else {
                    [0.0; 3]
                }
            })
            .collect()
    }
}
