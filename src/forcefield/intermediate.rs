//! Working representation used while a structure is parameterized.
//!
//! [`IntermediateSystem`] starts as a copy of the bond graph and is filled in
//! stage by stage: the typer assigns types, hybridizations and internal
//! coordinates, the charge stage assigns partial charges.

use crate::error::ForceFieldMismatchError;
use crate::model::structure::Structure;
use crate::model::types::{BondOrder, Element};

pub use dreid_typer::{Hybridization, TopologyBondOrder as PhysicalBondOrder};

#[derive(Debug, Clone)]
pub struct IntermediateAtom {
    pub element: Element,
    /// DREIDING atom type (e.g. "C_3", "O_2"); empty until typed.
    pub atom_type: String,
    pub hybridization: Hybridization,
    pub charge: f64,
    pub neighbors: Vec<usize>,
}

impl IntermediateAtom {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            atom_type: String::new(),
            hybridization: Hybridization::Unknown,
            charge: 0.0,
            neighbors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntermediateBond {
    pub i: usize,
    pub j: usize,
    pub order: BondOrder,
    /// Order assigned by the typer (Single, Double, Triple or Resonant).
    pub physical_order: Option<PhysicalBondOrder>,
}

pub trait PhysicalBondOrderExt {
    /// Force constant multiplier: 1, 2, 3 for single, double, triple and
    /// 1.5 for resonant bonds.
    fn multiplier(&self) -> f64;
}

impl PhysicalBondOrderExt for PhysicalBondOrder {
    fn multiplier(&self) -> f64 {
        match self {
            PhysicalBondOrder::Single => 1.0,
            PhysicalBondOrder::Double => 2.0,
            PhysicalBondOrder::Triple => 3.0,
            PhysicalBondOrder::Resonant => 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntermediateAngle {
    pub i: usize,
    /// Vertex.
    pub j: usize,
    pub k: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntermediateDihedral {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub l: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntermediateImproper {
    /// Planar center.
    pub center: usize,
    pub p1: usize,
    pub p2: usize,
    pub p3: usize,
}

#[derive(Debug, Clone)]
pub struct IntermediateSystem {
    pub atoms: Vec<IntermediateAtom>,
    pub bonds: Vec<IntermediateBond>,
    pub angles: Vec<IntermediateAngle>,
    pub dihedrals: Vec<IntermediateDihedral>,
    pub impropers: Vec<IntermediateImproper>,
}

impl IntermediateSystem {
    /// Copies atoms and bonds from `structure` and builds neighbor lists.
    pub fn from_structure(structure: &Structure) -> Result<Self, ForceFieldMismatchError> {
        if structure.atoms.is_empty() {
            return Err(ForceFieldMismatchError::AtomTyping(
                "structure has no atoms".to_string(),
            ));
        }

        let n_atoms = structure.atoms.len();
        let mut atoms: Vec<IntermediateAtom> = structure
            .atoms
            .iter()
            .map(|a| IntermediateAtom::new(a.element))
            .collect();

        let mut bonds = Vec::with_capacity(structure.bonds.len());
        for bond in &structure.bonds {
            if bond.i >= n_atoms || bond.j >= n_atoms {
                return Err(ForceFieldMismatchError::AtomTyping(format!(
                    "bond {}-{} references an atom outside 0..{}",
                    bond.i, bond.j, n_atoms
                )));
            }
            bonds.push(IntermediateBond {
                i: bond.i,
                j: bond.j,
                order: bond.order,
                physical_order: None,
            });
            atoms[bond.i].neighbors.push(bond.j);
            atoms[bond.j].neighbors.push(bond.i);
        }

        Ok(Self {
            atoms,
            bonds,
            angles: Vec::new(),
            dihedrals: Vec::new(),
            impropers: Vec::new(),
        })
    }
}
