//! Pure-Rust CPU engine.
//!
//! Integrates with the "middle" Langevin splitting (kick, half drift,
//! Ornstein-Uhlenbeck velocity update, half drift), keeps constrained bonds
//! rigid with SHAKE/RATTLE and evaluates nonbonded terms through a Verlet
//! neighbor list. The O(N²) list build makes it suitable for small and
//! medium systems.

mod constraints;
mod forces;
mod minimize;
mod neighbor;

use self::constraints::ConstraintSolver;
use self::forces::{ForceField, Geometry, Vec3};
use self::neighbor::NeighborList;
use super::units::{self, BOLTZMANN, KCAL_PER_MOL_TO_INTERNAL};
use super::{Engine, EngineState, LangevinIntegrator};
use crate::error::{Error, SimulationDivergedError, SimulationPhase};
use crate::model::system::SimulationSystem;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Coordinates beyond this magnitude (Å) mean the integration blew up.
const MAX_COORDINATE: f64 = 1.0e6;

#[derive(Debug, Clone)]
pub struct ReferenceEngine {
    force_field: ForceField,
    constraints: ConstraintSolver,
    neighbors: NeighborList,
    integrator: LangevinIntegrator,
    masses: Vec<f64>,
    inv_masses: Vec<f64>,
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    forces: Vec<Vec3>,
    potential_energy: f64,
    box_vectors: Option<[[f64; 3]; 3]>,
    dof: usize,
    rng: StdRng,
    step: u64,
}

impl ReferenceEngine {
    /// Current forces in kcal/mol/Å.
    pub fn forces(&self) -> &[[f64; 3]] {
        &self.forces
    }

    pub fn velocities(&self) -> &[[f64; 3]] {
        &self.velocities
    }

    pub fn potential_energy(&self) -> f64 {
        self.potential_energy
    }

    fn refresh_forces(&mut self) {
        self.neighbors.update(&self.force_field, &self.positions);
        self.potential_energy =
            self.force_field
                .compute(&self.positions, &self.neighbors, &mut self.forces);
    }

    fn kinetic_energy(&self) -> f64 {
        units::kinetic_energy(&self.masses, &self.velocities)
    }

    fn diverged(&self, detail: impl Into<String>) -> SimulationDivergedError {
        SimulationDivergedError::new(SimulationPhase::Dynamics, self.step, detail)
    }

    fn check_finite(&self) -> Result<(), SimulationDivergedError> {
        if !self.potential_energy.is_finite() {
            return Err(self.diverged("potential energy is not finite"));
        }
        if let Some(atom) = self
            .positions
            .iter()
            .position(|x| x.iter().any(|c| !c.is_finite() || c.abs() > MAX_COORDINATE))
        {
            return Err(self.diverged(format!("coordinates of atom {} blew up", atom + 1)));
        }
        if self.velocities.iter().flatten().any(|v| !v.is_finite()) {
            return Err(self.diverged("velocities are not finite"));
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<(), SimulationDivergedError> {
        let dt = self.integrator.timestep;
        let half = 0.5 * dt;
        let geometry = self.force_field.geometry;

        for ((v, f), w) in self
            .velocities
            .iter_mut()
            .zip(&self.forces)
            .zip(&self.inv_masses)
        {
            let a = dt * KCAL_PER_MOL_TO_INTERNAL * w;
            v[0] += a * f[0];
            v[1] += a * f[1];
            v[2] += a * f[2];
        }
        self.constraints
            .rattle(&geometry, &self.positions, &mut self.velocities, &self.inv_masses);

        let previous = self.positions.clone();
        drift(&mut self.positions, &self.velocities, half);

        let decay = (-self.integrator.friction * dt).exp();
        let noise = (1.0 - decay * decay).max(0.0).sqrt();
        let kt = BOLTZMANN * self.integrator.temperature * KCAL_PER_MOL_TO_INTERNAL;
        for (v, w) in self.velocities.iter_mut().zip(&self.inv_masses) {
            let sigma = noise * (kt * w).sqrt();
            for c in v.iter_mut() {
                let r: f64 = self.rng.sample(StandardNormal);
                *c = decay * *c + sigma * r;
            }
        }

        drift(&mut self.positions, &self.velocities, half);

        if !self.constraints.is_empty() {
            let unconstrained = self.positions.clone();
            self.constraints
                .shake(&geometry, &previous, &mut self.positions, &self.inv_masses)
                .ok_or_else(|| self.diverged("SHAKE failed to converge"))?;
            for ((v, x), x1) in self
                .velocities
                .iter_mut()
                .zip(&self.positions)
                .zip(&unconstrained)
            {
                v[0] += (x[0] - x1[0]) / dt;
                v[1] += (x[1] - x1[1]) / dt;
                v[2] += (x[2] - x1[2]) / dt;
            }
        }

        self.step += 1;
        self.refresh_forces();
        self.check_finite()
    }
}

fn drift(positions: &mut [Vec3], velocities: &[Vec3], dt: f64) {
    for (x, v) in positions.iter_mut().zip(velocities) {
        x[0] += dt * v[0];
        x[1] += dt * v[1];
        x[2] += dt * v[2];
    }
}

fn validate_integrator(integrator: &LangevinIntegrator) -> Result<(), Error> {
    if !(integrator.timestep.is_finite() && integrator.timestep > 0.0) {
        return Err(Error::invalid_parameters(format!(
            "timestep must be positive, got {} ps",
            integrator.timestep
        )));
    }
    if !(integrator.friction.is_finite() && integrator.friction >= 0.0) {
        return Err(Error::invalid_parameters(format!(
            "friction must be non-negative, got {} /ps",
            integrator.friction
        )));
    }
    if !(integrator.temperature.is_finite() && integrator.temperature >= 0.0) {
        return Err(Error::invalid_parameters(format!(
            "temperature must be non-negative, got {} K",
            integrator.temperature
        )));
    }
    Ok(())
}

impl Engine for ReferenceEngine {
    fn create(system: &SimulationSystem, integrator: &LangevinIntegrator) -> Result<Self, Error> {
        validate_integrator(integrator)?;

        let n = system.atom_count();
        if n == 0 {
            return Err(Error::invalid_parameters("system has no atoms"));
        }
        if system.atom_params.len() != n {
            return Err(Error::invalid_parameters(format!(
                "system has {} atoms but {} atom parameter sets",
                n,
                system.atom_params.len()
            )));
        }
        if let Some(bad) = system
            .atom_params
            .iter()
            .position(|p| !(p.mass.is_finite() && p.mass > 0.0))
        {
            return Err(Error::invalid_parameters(format!(
                "atom {} has non-positive mass",
                bad + 1
            )));
        }

        let geometry = if system.nonbonded.method.is_periodic() {
            let edges = system.structure.orthorhombic_box().ok_or_else(|| {
                Error::invalid_parameters("periodic nonbonded method needs an orthorhombic box")
            })?;
            Geometry::Periodic(edges)
        } else {
            Geometry::Open
        };

        let masses: Vec<f64> = system.atom_params.iter().map(|p| p.mass).collect();
        let inv_masses = masses.iter().map(|m| 1.0 / m).collect();
        let force_field = ForceField::new(system, geometry);
        let positions = system.positions();
        let neighbors = NeighborList::build(&force_field, &positions);

        log::debug!(
            "reference engine: {} atoms, {} constraints, {} neighbor pairs, {:?}",
            n,
            system.constraints.len(),
            neighbors.pairs().len(),
            geometry
        );

        let mut engine = Self {
            force_field,
            constraints: ConstraintSolver::new(&system.constraints),
            neighbors,
            integrator: *integrator,
            masses,
            inv_masses,
            positions,
            velocities: vec![[0.0; 3]; n],
            forces: vec![[0.0; 3]; n],
            potential_energy: 0.0,
            box_vectors: system.structure.box_vectors,
            dof: system.degrees_of_freedom(),
            rng: StdRng::seed_from_u64(integrator.seed),
            step: 0,
        };
        engine.refresh_forces();
        Ok(engine)
    }

    fn set_positions(&mut self, positions: &[[f64; 3]]) -> Result<(), Error> {
        if positions.len() != self.force_field.atom_count() {
            return Err(Error::invalid_parameters(format!(
                "expected {} positions, got {}",
                self.force_field.atom_count(),
                positions.len()
            )));
        }
        if positions.iter().flatten().any(|c| !c.is_finite()) {
            return Err(Error::invalid_parameters("positions must be finite"));
        }
        self.positions = positions.to_vec();
        self.neighbors = NeighborList::build(&self.force_field, &self.positions);
        self.refresh_forces();
        Ok(())
    }

    fn minimize(
        &mut self,
        tolerance: f64,
        max_iterations: usize,
    ) -> Result<(), SimulationDivergedError> {
        let report = minimize::steepest_descent(self, tolerance, max_iterations)?;
        if report.converged {
            log::info!(
                "minimization converged after {} iterations: {:.3} -> {:.3} kcal/mol",
                report.iterations,
                report.initial_energy,
                report.final_energy
            );
        } else {
            log::info!(
                "minimization stopped after {} iterations (RMS force {:.3} kcal/mol/Å): {:.3} -> {:.3} kcal/mol",
                report.iterations,
                report.rms_force,
                report.initial_energy,
                report.final_energy
            );
        }
        Ok(())
    }

    fn set_velocities_to_temperature(&mut self, temperature: f64, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let kt = BOLTZMANN * temperature.max(0.0) * KCAL_PER_MOL_TO_INTERNAL;
        for (v, w) in self.velocities.iter_mut().zip(&self.inv_masses) {
            let sigma = (kt * w).sqrt();
            for c in v.iter_mut() {
                let r: f64 = rng.sample(StandardNormal);
                *c = sigma * r;
            }
        }

        let total_mass: f64 = self.masses.iter().sum();
        let mut momentum = [0.0; 3];
        for (v, m) in self.velocities.iter().zip(&self.masses) {
            for d in 0..3 {
                momentum[d] += m * v[d];
            }
        }
        for v in &mut self.velocities {
            for d in 0..3 {
                v[d] -= momentum[d] / total_mass;
            }
        }

        self.constraints.rattle(
            &self.force_field.geometry,
            &self.positions,
            &mut self.velocities,
            &self.inv_masses,
        );
    }

    fn step(&mut self, steps: u64) -> Result<(), SimulationDivergedError> {
        for _ in 0..steps {
            self.advance()?;
        }
        Ok(())
    }

    fn state(&self) -> EngineState {
        let kinetic_energy = self.kinetic_energy();
        EngineState {
            step: self.step,
            time: self.step as f64 * self.integrator.timestep,
            positions: self.positions.clone(),
            potential_energy: self.potential_energy,
            kinetic_energy,
            temperature: units::temperature(kinetic_energy, self.dof),
            box_vectors: self.box_vectors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::structure::{Atom, Structure};
    use crate::model::system::{
        AtomParam, BondPotential, DistanceConstraint, NonbondedMethod, NonbondedSettings,
        Potentials, VdwPairPotential,
    };
    use crate::model::types::Element;

    fn system(positions: &[Vec3], masses: &[f64], potentials: Potentials) -> SimulationSystem {
        let mut structure = Structure::new();
        for &p in positions {
            structure.atoms.push(Atom::new(Element::C, p));
        }
        SimulationSystem {
            structure,
            force_field: "test".into(),
            atom_types: vec!["C_3".into()],
            atom_params: masses
                .iter()
                .map(|&mass| AtomParam {
                    charge: 0.0,
                    mass,
                    type_index: 0,
                })
                .collect(),
            potentials,
            exclusions: Vec::new(),
            constraints: Vec::new(),
            nonbonded: NonbondedSettings {
                method: NonbondedMethod::NoCutoff,
                cutoff: 10.0,
                reaction_field_dielectric: 78.3,
            },
        }
    }

    fn stretched_bond() -> SimulationSystem {
        system(
            &[[0.0; 3], [1.6, 0.0, 0.0]],
            &[12.0, 12.0],
            Potentials {
                bonds: vec![BondPotential::Harmonic {
                    i: 0,
                    j: 1,
                    k_force: 700.0,
                    r0: 1.5,
                }],
                ..Default::default()
            },
        )
    }

    fn water() -> SimulationSystem {
        let half = 104.52f64.to_radians() / 2.0;
        let mut sys = system(
            &[
                [0.0, 0.0, 0.0],
                [0.9572 * half.sin(), 0.9572 * half.cos(), 0.0],
                [-0.9572 * half.sin(), 0.9572 * half.cos(), 0.0],
            ],
            &[15.999, 1.008, 1.008],
            Potentials::default(),
        );
        sys.constraints = vec![
            DistanceConstraint {
                i: 0,
                j: 1,
                distance: 0.9572,
            },
            DistanceConstraint {
                i: 0,
                j: 2,
                distance: 0.9572,
            },
            DistanceConstraint {
                i: 1,
                j: 2,
                distance: 2.0 * 0.9572 * half.sin(),
            },
        ];
        sys
    }

    fn langevin(temperature: f64, friction: f64, timestep: f64) -> LangevinIntegrator {
        LangevinIntegrator {
            temperature,
            friction,
            timestep,
            seed: 7,
        }
    }

    fn distance(a: Vec3, b: Vec3) -> f64 {
        let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
        (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
    }

    #[test]
    fn create_rejects_inconsistent_systems() {
        let mut sys = stretched_bond();
        sys.atom_params.pop();
        assert!(matches!(
            ReferenceEngine::create(&sys, &langevin(300.0, 1.0, 0.002)),
            Err(Error::InvalidParameters(_))
        ));

        let sys = stretched_bond();
        assert!(ReferenceEngine::create(&sys, &langevin(300.0, 1.0, 0.0)).is_err());
        assert!(ReferenceEngine::create(&sys, &langevin(-5.0, 1.0, 0.002)).is_err());
    }

    #[test]
    fn periodic_method_requires_a_box() {
        let mut sys = stretched_bond();
        sys.nonbonded.method = NonbondedMethod::CutoffPeriodic;
        assert!(ReferenceEngine::create(&sys, &langevin(300.0, 1.0, 0.002)).is_err());

        sys.structure.box_vectors = Some([[30.0, 0.0, 0.0], [0.0, 30.0, 0.0], [0.0, 0.0, 30.0]]);
        let engine = ReferenceEngine::create(&sys, &langevin(300.0, 1.0, 0.002)).unwrap();
        assert_eq!(engine.state().box_vectors, sys.structure.box_vectors);
    }

    #[test]
    fn frictionless_dynamics_conserves_energy() {
        let sys = stretched_bond();
        let mut engine = ReferenceEngine::create(&sys, &langevin(0.0, 0.0, 0.0002)).unwrap();
        let initial = engine.state().potential_energy;
        assert!((initial - 3.5).abs() < 1e-9);

        for _ in 0..20 {
            engine.step(100).unwrap();
            let state = engine.state();
            let total = state.potential_energy + state.kinetic_energy;
            assert!(
                (total - initial).abs() < 0.05 * initial,
                "step {}: total energy {} drifted from {}",
                state.step,
                total,
                initial
            );
        }
        assert_eq!(engine.state().step, 2000);
        assert!((engine.state().time - 0.4).abs() < 1e-12);
    }

    #[test]
    fn minimization_relaxes_a_stretched_bond() {
        let sys = stretched_bond();
        let mut engine = ReferenceEngine::create(&sys, &langevin(300.0, 1.0, 0.002)).unwrap();
        engine.minimize(0.1, 1000).unwrap();
        let state = engine.state();
        assert!(state.potential_energy < 1e-3);
        assert!((distance(state.positions[0], state.positions[1]) - 1.5).abs() < 1e-3);
    }

    #[test]
    fn constrained_water_stays_rigid() {
        let sys = water();
        let mut engine = ReferenceEngine::create(&sys, &langevin(300.0, 1.0, 0.002)).unwrap();
        engine.set_velocities_to_temperature(300.0, 11);
        engine.step(200).unwrap();

        let p = engine.state().positions;
        for c in &sys.constraints {
            assert!(
                (distance(p[c.i], p[c.j]) - c.distance).abs() < 1e-5,
                "constraint {}-{} violated",
                c.i,
                c.j
            );
        }
    }

    #[test]
    fn same_seed_gives_identical_trajectories() {
        let sys = water();
        let run = |seed: u64| {
            let mut integrator = langevin(300.0, 1.0, 0.002);
            integrator.seed = seed;
            let mut engine = ReferenceEngine::create(&sys, &integrator).unwrap();
            engine.set_velocities_to_temperature(300.0, seed);
            engine.step(50).unwrap();
            engine.state().positions
        };
        assert_eq!(run(3), run(3));
        assert_ne!(run(3), run(4));
    }

    #[test]
    fn initial_velocities_match_temperature_without_drift() {
        let positions: Vec<Vec3> = (0..500)
            .map(|i| [(i % 10) as f64 * 4.0, (i / 10 % 10) as f64 * 4.0, (i / 100) as f64 * 4.0])
            .collect();
        let sys = system(&positions, &vec![12.0; 500], Potentials::default());
        let mut engine = ReferenceEngine::create(&sys, &langevin(300.0, 1.0, 0.002)).unwrap();
        engine.set_velocities_to_temperature(300.0, 42);

        let t = engine.state().temperature;
        assert!((t - 300.0).abs() < 45.0, "temperature {t}");

        let mut momentum = [0.0; 3];
        for v in engine.velocities() {
            for d in 0..3 {
                momentum[d] += 12.0 * v[d];
            }
        }
        assert!(momentum.iter().all(|p| p.abs() < 1e-9));
    }

    #[test]
    fn overlapping_atoms_diverge_during_dynamics() {
        let mut sys = system(&[[0.0; 3], [0.5, 0.0, 0.0]], &[12.0, 12.0], Potentials::default());
        sys.potentials.vdw_pairs.push(VdwPairPotential::LennardJones {
            type1_idx: 0,
            type2_idx: 0,
            sigma: 3.473,
            epsilon: 0.0951,
        });
        let mut engine = ReferenceEngine::create(&sys, &langevin(300.0, 1.0, 0.002)).unwrap();
        let err = engine.step(10).unwrap_err();
        assert_eq!(err.phase, SimulationPhase::Dynamics);
        assert_eq!(err.step, 1);
    }

    #[test]
    fn set_positions_checks_length() {
        let sys = stretched_bond();
        let mut engine = ReferenceEngine::create(&sys, &langevin(300.0, 1.0, 0.002)).unwrap();
        assert!(engine.set_positions(&[[0.0; 3]]).is_err());
        engine
            .set_positions(&[[0.0; 3], [1.5, 0.0, 0.0]])
            .unwrap();
        assert!(engine.potential_energy().abs() < 1e-12);
        assert!(engine.forces().iter().flatten().all(|f| f.abs() < 1e-9));
    }
}
