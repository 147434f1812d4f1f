use super::structure::Structure;
use std::fmt;

/// Per-atom nonbonded and inertial parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomParam {
    /// Partial charge in elementary charge units.
    pub charge: f64,
    /// Mass in amu.
    pub mass: f64,
    /// Index into [`SimulationSystem::atom_types`].
    pub type_index: usize,
}

/// Bond stretching term.
///
/// Harmonic: `E = ½·k_force·(r − r0)²`.
/// Morse: `E = d0·[1 − exp(−alpha·(r − r0))]²`.
#[derive(Debug, Clone, PartialEq)]
pub enum BondPotential {
    Harmonic {
        i: usize,
        j: usize,
        k_force: f64,
        r0: f64,
    },
    Morse {
        i: usize,
        j: usize,
        r0: f64,
        d0: f64,
        alpha: f64,
    },
}

impl BondPotential {
    pub fn atoms(&self) -> (usize, usize) {
        match *self {
            BondPotential::Harmonic { i, j, .. } | BondPotential::Morse { i, j, .. } => (i, j),
        }
    }

    pub fn r0(&self) -> f64 {
        match *self {
            BondPotential::Harmonic { r0, .. } | BondPotential::Morse { r0, .. } => r0,
        }
    }
}

/// Angle bending term around the central atom `j`. `theta0` is in radians.
///
/// CosineHarmonic: `E = ½·k_force·(cos θ − cos θ0)²`.
/// ThetaHarmonic: `E = ½·k_force·(θ − θ0)²`.
#[derive(Debug, Clone, PartialEq)]
pub enum AnglePotential {
    CosineHarmonic {
        i: usize,
        j: usize,
        k: usize,
        k_force: f64,
        theta0: f64,
    },
    ThetaHarmonic {
        i: usize,
        j: usize,
        k: usize,
        k_force: f64,
        theta0: f64,
    },
}

impl AnglePotential {
    pub fn atoms(&self) -> (usize, usize, usize) {
        match *self {
            AnglePotential::CosineHarmonic { i, j, k, .. }
            | AnglePotential::ThetaHarmonic { i, j, k, .. } => (i, j, k),
        }
    }

    pub fn theta0(&self) -> f64 {
        match *self {
            AnglePotential::CosineHarmonic { theta0, .. }
            | AnglePotential::ThetaHarmonic { theta0, .. } => theta0,
        }
    }
}

/// Periodic torsion `E = ½·v_barrier·[1 − cos(n·(φ − phase))]`, phase in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct DihedralPotential {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub l: usize,
    pub v_barrier: f64,
    pub periodicity: u32,
    pub phase: f64,
}

/// Planarity restraint `E = ½·k_force·(1 − cos 2χ)` on the dihedral `i-j-k-l`,
/// minimal whenever the four atoms are coplanar.
#[derive(Debug, Clone, PartialEq)]
pub struct ImproperPotential {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub l: usize,
    pub k_force: f64,
}

/// Van der Waals interaction between two atom types.
///
/// LennardJones: `E = 4ε[(σ/r)¹² − (σ/r)⁶]`.
/// Exponential6: `E = a·exp(−b·r) − c/r⁶`.
#[derive(Debug, Clone, PartialEq)]
pub enum VdwPairPotential {
    LennardJones {
        type1_idx: usize,
        type2_idx: usize,
        sigma: f64,
        epsilon: f64,
    },
    Exponential6 {
        type1_idx: usize,
        type2_idx: usize,
        a: f64,
        b: f64,
        c: f64,
    },
}

impl VdwPairPotential {
    pub fn types(&self) -> (usize, usize) {
        match *self {
            VdwPairPotential::LennardJones {
                type1_idx,
                type2_idx,
                ..
            }
            | VdwPairPotential::Exponential6 {
                type1_idx,
                type2_idx,
                ..
            } => (type1_idx, type2_idx),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Potentials {
    pub bonds: Vec<BondPotential>,
    pub angles: Vec<AnglePotential>,
    pub dihedrals: Vec<DihedralPotential>,
    pub impropers: Vec<ImproperPotential>,
    pub vdw_pairs: Vec<VdwPairPotential>,
}

/// Holonomic distance constraint between two atoms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceConstraint {
    pub i: usize,
    pub j: usize,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NonbondedMethod {
    /// Every non-excluded pair interacts with bare Coulomb.
    NoCutoff,
    /// Pairs beyond the cutoff are ignored, reaction-field electrostatics.
    CutoffNonPeriodic,
    /// As `CutoffNonPeriodic` plus minimum-image distances in the box.
    #[default]
    CutoffPeriodic,
}

impl NonbondedMethod {
    pub fn uses_cutoff(&self) -> bool {
        !matches!(self, NonbondedMethod::NoCutoff)
    }

    pub fn is_periodic(&self) -> bool {
        matches!(self, NonbondedMethod::CutoffPeriodic)
    }
}

impl fmt::Display for NonbondedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonbondedMethod::NoCutoff => write!(f, "no cutoff"),
            NonbondedMethod::CutoffNonPeriodic => write!(f, "cutoff (non-periodic)"),
            NonbondedMethod::CutoffPeriodic => write!(f, "cutoff (periodic)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonbondedSettings {
    pub method: NonbondedMethod,
    /// Cutoff distance in Å. Ignored for [`NonbondedMethod::NoCutoff`].
    pub cutoff: f64,
    /// Dielectric of the continuum beyond the cutoff.
    pub reaction_field_dielectric: f64,
}

/// A fully parameterized assembly ready for an [`Engine`](crate::Engine).
///
/// Holds the prepared structure (hydrogens and solvent included), the
/// potential-energy function and the constraint set.
#[derive(Debug, Clone)]
pub struct SimulationSystem {
    pub structure: Structure,
    /// Human-readable name of the force-field preset that produced this system.
    pub force_field: String,
    pub atom_types: Vec<String>,
    pub atom_params: Vec<AtomParam>,
    pub potentials: Potentials,
    /// Sorted `(i, j)` pairs with `i < j` that skip nonbonded interactions.
    pub exclusions: Vec<(usize, usize)>,
    pub constraints: Vec<DistanceConstraint>,
    pub nonbonded: NonbondedSettings,
}

impl SimulationSystem {
    #[inline]
    pub fn atom_count(&self) -> usize {
        self.structure.atom_count()
    }

    pub fn positions(&self) -> Vec<[f64; 3]> {
        self.structure.positions()
    }

    pub fn total_charge(&self) -> f64 {
        self.atom_params.iter().map(|p| p.charge).sum()
    }

    /// Degrees of freedom used for temperature: `3N − constraints − 3`.
    pub fn degrees_of_freedom(&self) -> usize {
        let raw = 3 * self.atom_count();
        raw.saturating_sub(self.constraints.len() + 3).max(1)
    }

    pub fn is_excluded(&self, i: usize, j: usize) -> bool {
        let key = if i < j { (i, j) } else { (j, i) };
        self.exclusions.binary_search(&key).is_ok()
    }
}
