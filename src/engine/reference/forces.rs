//! Energy and force evaluation for the reference backend.

use super::neighbor::NeighborList;
use crate::engine::units::COULOMB;
use crate::model::system::{
    AnglePotential, BondPotential, DihedralPotential, ImproperPotential, NonbondedMethod,
    SimulationSystem, VdwPairPotential,
};

/// Below this distance (Å) a pair is treated as overlapping.
const MIN_DISTANCE: f64 = 1e-6;

pub(crate) type Vec3 = [f64; 3];

#[inline]
pub(crate) fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub(crate) fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub(crate) fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub(crate) fn scale(a: Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

#[inline]
fn add_to(target: &mut Vec3, v: Vec3) {
    target[0] += v[0];
    target[1] += v[1];
    target[2] += v[2];
}

#[inline]
fn sub_from(target: &mut Vec3, v: Vec3) {
    target[0] -= v[0];
    target[1] -= v[1];
    target[2] -= v[2];
}

/// Distance convention: open space or an orthorhombic periodic cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Geometry {
    Open,
    Periodic([f64; 3]),
}

impl Geometry {
    /// `a - b`, minimum-imaged when periodic.
    #[inline]
    pub(crate) fn delta(&self, a: Vec3, b: Vec3) -> Vec3 {
        let mut d = sub(a, b);
        if let Geometry::Periodic(edges) = self {
            for k in 0..3 {
                d[k] -= edges[k] * (d[k] / edges[k]).round();
            }
        }
        d
    }
}

#[derive(Debug, Clone, Copy)]
enum VdwTerm {
    LennardJones { sigma: f64, epsilon: f64 },
    Exponential6 { a: f64, b: f64, c: f64 },
    Zero,
}

impl VdwTerm {
    /// Energy and `-(dE/dr)/r` at squared distance `r2`.
    #[inline]
    fn evaluate(&self, r2: f64) -> (f64, f64) {
        match *self {
            VdwTerm::LennardJones { sigma, epsilon } => {
                let s2 = sigma * sigma / r2;
                let s6 = s2 * s2 * s2;
                let s12 = s6 * s6;
                let energy = 4.0 * epsilon * (s12 - s6);
                let f_over_r = 24.0 * epsilon * (2.0 * s12 - s6) / r2;
                (energy, f_over_r)
            }
            VdwTerm::Exponential6 { a, b, c } => {
                let r = r2.sqrt();
                let r6 = r2 * r2 * r2;
                let rep = a * (-b * r).exp();
                let energy = rep - c / r6;
                let f_over_r = (b * rep - 6.0 * c / (r6 * r)) / r;
                (energy, f_over_r)
            }
            VdwTerm::Zero => (0.0, 0.0),
        }
    }
}

/// Electrostatics beyond the bare Coulomb law.
#[derive(Debug, Clone, Copy)]
struct ReactionField {
    k_rf: f64,
    c_rf: f64,
}

/// The potential-energy function of one system, laid out for evaluation.
#[derive(Debug, Clone)]
pub(crate) struct ForceField {
    bonds: Vec<BondPotential>,
    angles: Vec<AnglePotential>,
    dihedrals: Vec<DihedralPotential>,
    impropers: Vec<ImproperPotential>,
    charges: Vec<f64>,
    type_index: Vec<usize>,
    n_types: usize,
    vdw: Vec<VdwTerm>,
    exclusions: Vec<(usize, usize)>,
    method: NonbondedMethod,
    cutoff: f64,
    reaction_field: Option<ReactionField>,
    pub(crate) geometry: Geometry,
}

impl ForceField {
    pub(crate) fn new(system: &SimulationSystem, geometry: Geometry) -> Self {
        let n_types = system.atom_types.len().max(1);
        let mut vdw = vec![VdwTerm::Zero; n_types * n_types];
        for pair in &system.potentials.vdw_pairs {
            let (t1, t2) = pair.types();
            if t1 >= n_types || t2 >= n_types {
                continue;
            }
            let term = match *pair {
                VdwPairPotential::LennardJones { sigma, epsilon, .. } => {
                    VdwTerm::LennardJones { sigma, epsilon }
                }
                VdwPairPotential::Exponential6 { a, b, c, .. } => VdwTerm::Exponential6 { a, b, c },
            };
            vdw[t1 * n_types + t2] = term;
            vdw[t2 * n_types + t1] = term;
        }

        let settings = system.nonbonded;
        let reaction_field = settings.method.uses_cutoff().then(|| {
            let eps = settings.reaction_field_dielectric;
            let rc = settings.cutoff;
            let k_rf = (eps - 1.0) / ((2.0 * eps + 1.0) * rc * rc * rc);
            ReactionField {
                k_rf,
                c_rf: 1.0 / rc + k_rf * rc * rc,
            }
        });

        let mut exclusions = system.exclusions.clone();
        exclusions.sort_unstable();
        exclusions.dedup();

        Self {
            bonds: system.potentials.bonds.clone(),
            angles: system.potentials.angles.clone(),
            dihedrals: system.potentials.dihedrals.clone(),
            impropers: system.potentials.impropers.clone(),
            charges: system.atom_params.iter().map(|p| p.charge).collect(),
            type_index: system.atom_params.iter().map(|p| p.type_index).collect(),
            n_types,
            vdw,
            exclusions,
            method: settings.method,
            cutoff: settings.cutoff,
            reaction_field,
            geometry,
        }
    }

    pub(crate) fn atom_count(&self) -> usize {
        self.charges.len()
    }

    pub(crate) fn uses_cutoff(&self) -> bool {
        self.method.uses_cutoff()
    }

    pub(crate) fn cutoff(&self) -> f64 {
        self.cutoff
    }

    #[inline]
    pub(crate) fn is_excluded(&self, i: usize, j: usize) -> bool {
        let key = if i < j { (i, j) } else { (j, i) };
        self.exclusions.binary_search(&key).is_ok()
    }

    /// Potential energy at `positions`; `forces` is overwritten.
    pub(crate) fn compute(
        &self,
        positions: &[Vec3],
        neighbors: &NeighborList,
        forces: &mut [Vec3],
    ) -> f64 {
        forces.iter_mut().for_each(|f| *f = [0.0; 3]);
        self.bond_terms(positions, forces)
            + self.angle_terms(positions, forces)
            + self.torsion_terms(positions, forces)
            + self.nonbonded_terms(positions, neighbors, forces)
    }

    fn bond_terms(&self, pos: &[Vec3], forces: &mut [Vec3]) -> f64 {
        let mut energy = 0.0;
        for bond in &self.bonds {
            let (i, j) = bond.atoms();
            let d = self.geometry.delta(pos[j], pos[i]);
            let r = dot(d, d).sqrt().max(MIN_DISTANCE);
            let (e, de_dr) = match *bond {
                BondPotential::Harmonic { k_force, r0, .. } => {
                    let dr = r - r0;
                    (0.5 * k_force * dr * dr, k_force * dr)
                }
                BondPotential::Morse { r0, d0, alpha, .. } => {
                    let x = (-alpha * (r - r0)).exp();
                    (d0 * (1.0 - x) * (1.0 - x), 2.0 * d0 * alpha * x * (1.0 - x))
                }
            };
            energy += e;
            let f = scale(d, de_dr / r);
            add_to(&mut forces[i], f);
            sub_from(&mut forces[j], f);
        }
        energy
    }

    fn angle_terms(&self, pos: &[Vec3], forces: &mut [Vec3]) -> f64 {
        let mut energy = 0.0;
        for angle in &self.angles {
            let (i, j, k) = angle.atoms();
            let u = self.geometry.delta(pos[i], pos[j]);
            let v = self.geometry.delta(pos[k], pos[j]);
            let ru = dot(u, u).sqrt().max(MIN_DISTANCE);
            let rv = dot(v, v).sqrt().max(MIN_DISTANCE);
            let cos_t = (dot(u, v) / (ru * rv)).clamp(-1.0, 1.0);

            let (e, de_dcos) = match *angle {
                AnglePotential::CosineHarmonic {
                    k_force, theta0, ..
                } => {
                    let dc = cos_t - theta0.cos();
                    (0.5 * k_force * dc * dc, k_force * dc)
                }
                AnglePotential::ThetaHarmonic {
                    k_force, theta0, ..
                } => {
                    let theta = cos_t.acos();
                    let dt = theta - theta0;
                    let sin_t = (1.0 - cos_t * cos_t).sqrt().max(1e-8);
                    (0.5 * k_force * dt * dt, -k_force * dt / sin_t)
                }
            };
            energy += e;

            // d(cos θ)/d(r_i) and d(cos θ)/d(r_k)
            let dci = sub(scale(v, 1.0 / (ru * rv)), scale(u, cos_t / (ru * ru)));
            let dck = sub(scale(u, 1.0 / (ru * rv)), scale(v, cos_t / (rv * rv)));
            let fi = scale(dci, -de_dcos);
            let fk = scale(dck, -de_dcos);
            add_to(&mut forces[i], fi);
            add_to(&mut forces[k], fk);
            sub_from(&mut forces[j], fi);
            sub_from(&mut forces[j], fk);
        }
        energy
    }

    fn torsion_terms(&self, pos: &[Vec3], forces: &mut [Vec3]) -> f64 {
        let mut energy = 0.0;
        for d in &self.dihedrals {
            let n = d.periodicity as f64;
            let v = d.v_barrier;
            let phase = d.phase;
            energy += self.apply_dihedral(pos, forces, [d.i, d.j, d.k, d.l], |phi| {
                let x = n * (phi - phase);
                (0.5 * v * (1.0 - x.cos()), 0.5 * v * n * x.sin())
            });
        }
        for imp in &self.impropers {
            let k = imp.k_force;
            energy += self.apply_dihedral(pos, forces, [imp.i, imp.j, imp.k, imp.l], |chi| {
                (0.5 * k * (1.0 - (2.0 * chi).cos()), k * (2.0 * chi).sin())
            });
        }
        energy
    }

    /// Evaluates `term(φ) -> (E, dE/dφ)` on the dihedral `i-j-k-l` and
    /// distributes the forces.
    fn apply_dihedral(
        &self,
        pos: &[Vec3],
        forces: &mut [Vec3],
        [i, j, k, l]: [usize; 4],
        term: impl Fn(f64) -> (f64, f64),
    ) -> f64 {
        let r_ij = self.geometry.delta(pos[i], pos[j]);
        let r_kj = self.geometry.delta(pos[k], pos[j]);
        let r_kl = self.geometry.delta(pos[k], pos[l]);

        let m = cross(r_ij, r_kj);
        let n = cross(r_kj, r_kl);
        let m2 = dot(m, m);
        let n2 = dot(n, n);
        let rkj2 = dot(r_kj, r_kj);
        if m2 < 1e-12 || n2 < 1e-12 || rkj2 < 1e-12 {
            return 0.0;
        }

        let cos_phi = (dot(m, n) / (m2 * n2).sqrt()).clamp(-1.0, 1.0);
        let sign = if dot(r_ij, n) < 0.0 { -1.0 } else { 1.0 };
        let phi = sign * cos_phi.acos();

        let (energy, de_dphi) = term(phi);

        let rkj = rkj2.sqrt();
        let f_i = scale(m, -de_dphi * rkj / m2);
        let f_l = scale(n, de_dphi * rkj / n2);
        let p = dot(r_ij, r_kj) / rkj2;
        let q = dot(r_kl, r_kj) / rkj2;
        let s = sub(scale(f_i, p), scale(f_l, q));
        let f_j = sub(f_i, s);
        let f_k = [f_l[0] + s[0], f_l[1] + s[1], f_l[2] + s[2]];

        add_to(&mut forces[i], f_i);
        sub_from(&mut forces[j], f_j);
        sub_from(&mut forces[k], f_k);
        add_to(&mut forces[l], f_l);
        energy
    }

    fn nonbonded_terms(&self, pos: &[Vec3], neighbors: &NeighborList, forces: &mut [Vec3]) -> f64 {
        let mut energy = 0.0;
        if self.uses_cutoff() {
            let rc2 = self.cutoff * self.cutoff;
            for &(i, j) in neighbors.pairs() {
                energy += self.pair(pos, forces, i, j, Some(rc2));
            }
        } else {
            let n = pos.len();
            for i in 0..n {
                for j in (i + 1)..n {
                    if !self.is_excluded(i, j) {
                        energy += self.pair(pos, forces, i, j, None);
                    }
                }
            }
        }
        energy
    }

    #[inline]
    fn pair(&self, pos: &[Vec3], forces: &mut [Vec3], i: usize, j: usize, rc2: Option<f64>) -> f64 {
        let d = self.geometry.delta(pos[i], pos[j]);
        let r2 = dot(d, d).max(MIN_DISTANCE * MIN_DISTANCE);
        if rc2.is_some_and(|rc2| r2 > rc2) {
            return 0.0;
        }

        let vdw = self.vdw[self.type_index[i] * self.n_types + self.type_index[j]];
        let (e_vdw, f_vdw) = vdw.evaluate(r2);

        let qq = COULOMB * self.charges[i] * self.charges[j];
        let r = r2.sqrt();
        let (e_el, f_el) = match self.reaction_field {
            Some(rf) => (
                qq * (1.0 / r + rf.k_rf * r2 - rf.c_rf),
                qq * (1.0 / (r2 * r) - 2.0 * rf.k_rf),
            ),
            None => (qq / r, qq / (r2 * r)),
        };

        let f = scale(d, f_vdw + f_el);
        add_to(&mut forces[i], f);
        sub_from(&mut forces[j], f);
        e_vdw + e_el
    }
}
