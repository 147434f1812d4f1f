//! The Trajectory Analyzer.
//!
//! A [`Universe`] pairs a [`Topology`] (per-atom identity) with the frames of
//! a written trajectory. Building one checks that every frame has exactly
//! as many atoms as the topology; the trajectory itself is never modified.
//! The result can be summarised with [`metrics`] or handed to a [`Viewer`].

pub mod elements;
pub mod metrics;
pub mod viewer;

pub use elements::{ElementPolicy, infer_element};
pub use viewer::{HtmlViewer, SummaryViewer, ViewError, Viewer};

use crate::error::TrajectoryReadError;
use crate::model::structure::Structure;
use crate::model::types::Element;
use crate::trajectory::{self, Frame, check_atom_counts, pdb};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const WATER_RESIDUES: &[&str] = &["HOH", "WAT", "SOL", "H2O", "TIP3", "TIP", "SPC", "OPC"];

/// Identity of one atom as seen by the analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyAtom {
    pub name: String,
    pub residue_name: String,
    pub residue_id: i32,
    pub chain_id: char,
    pub element: Option<Element>,
    /// Water or a monatomic ion.
    pub solvent: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    atoms: Vec<TopologyAtom>,
}

impl Topology {
    pub fn from_structure(structure: &Structure) -> Self {
        let atoms = pdb::PdbAtom::from_structure(structure)
            .into_iter()
            .enumerate()
            .map(|(i, label)| {
                let solvent = structure
                    .metadata
                    .atom_info
                    .get(i)
                    .map_or_else(|| is_solvent_label(&label), |info| info.is_solvent());
                TopologyAtom {
                    name: label.name,
                    residue_name: label.residue_name,
                    residue_id: label.residue_id,
                    chain_id: label.chain_id,
                    element: label.element,
                    solvent,
                }
            })
            .collect();
        Self { atoms }
    }

    /// Reads the first model of a PDB file. Elements are taken from the
    /// element columns and may be missing.
    pub fn from_pdb_reader<R: BufRead>(reader: R) -> Result<Self, TrajectoryReadError> {
        let atoms = pdb::read_atoms(reader)?
            .into_iter()
            .map(|(label, _)| TopologyAtom {
                solvent: is_solvent_label(&label),
                name: label.name,
                residue_name: label.residue_name,
                residue_id: label.residue_id,
                chain_id: label.chain_id,
                element: label.element,
            })
            .collect();
        Ok(Self { atoms })
    }

    pub fn from_pdb(path: impl AsRef<Path>) -> Result<Self, TrajectoryReadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TrajectoryReadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_pdb_reader(BufReader::new(file))
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn atoms(&self) -> &[TopologyAtom] {
        &self.atoms
    }

    pub fn missing_elements(&self) -> usize {
        self.atoms.iter().filter(|a| a.element.is_none()).count()
    }

    /// Applies `policy`; returns how many elements were filled in.
    pub fn apply_element_policy(&mut self, policy: ElementPolicy) -> usize {
        if policy == ElementPolicy::Keep {
            return 0;
        }
        let mut inferred = 0;
        for atom in self.atoms.iter_mut().filter(|a| a.element.is_none()) {
            atom.element = infer_element(&atom.name, &atom.residue_name);
            if atom.element.is_some() {
                inferred += 1;
            }
        }
        inferred
    }

    /// Indices of non-solvent atoms.
    pub fn solute(&self) -> Vec<usize> {
        self.atoms
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.solvent)
            .map(|(i, _)| i)
            .collect()
    }
}

fn is_solvent_label(label: &pdb::PdbAtom) -> bool {
    let residue = label.residue_name.trim().to_ascii_uppercase();
    WATER_RESIDUES.contains(&residue.as_str())
        || (label.hetero && label.name.trim().eq_ignore_ascii_case(&residue))
}

/// Topology plus per-frame coordinates.
#[derive(Debug, Clone)]
pub struct Universe {
    topology: Topology,
    frames: Vec<Frame>,
}

impl Universe {
    pub fn new(
        mut topology: Topology,
        frames: Vec<Frame>,
        policy: ElementPolicy,
    ) -> Result<Self, TrajectoryReadError> {
        if frames.is_empty() {
            return Err(TrajectoryReadError::Empty);
        }
        check_atom_counts(&frames, topology.atom_count())?;

        let inferred = topology.apply_element_policy(policy);
        if inferred > 0 {
            log::info!("inferred {inferred} missing elements from atom names");
        }
        let missing = topology.missing_elements();
        if missing > 0 {
            log::warn!("{missing} atoms have no element");
        }
        Ok(Self { topology, frames })
    }

    /// Reads the trajectory at `path` against `topology`.
    pub fn load(
        topology: Topology,
        path: impl AsRef<Path>,
        policy: ElementPolicy,
    ) -> Result<Self, TrajectoryReadError> {
        let frames = trajectory::read_trajectory(path)?;
        Self::new(topology, frames, policy)
    }

    /// Reads both the topology PDB and the trajectory from disk.
    pub fn open(
        topology_path: impl AsRef<Path>,
        trajectory_path: impl AsRef<Path>,
        policy: ElementPolicy,
    ) -> Result<Self, TrajectoryReadError> {
        let topology = Topology::from_pdb(topology_path)?;
        Self::load(topology, trajectory_path, policy)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.topology.atom_count()
    }

    /// Solute radius of gyration per frame (all atoms if there is no solute).
    pub fn radius_of_gyration(&self) -> Vec<f64> {
        let selection = self.selection();
        self.frames
            .iter()
            .map(|f| metrics::radius_of_gyration(&f.positions, &selection).unwrap_or(0.0))
            .collect()
    }

    /// Solute RMSD of every frame from frame 0, translation removed.
    pub fn rmsd(&self) -> Vec<f64> {
        let selection = self.selection();
        let reference = &self.frames[0].positions;
        self.frames
            .iter()
            .map(|f| metrics::rmsd(reference, &f.positions, &selection).unwrap_or(0.0))
            .collect()
    }

    fn selection(&self) -> Vec<usize> {
        let solute = self.topology.solute();
        if solute.is_empty() {
            (0..self.atom_count()).collect()
        } else {
            solute
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TOPOLOGY_PDB: &str = "\
ATOM      1  N   GLY A   1       0.000   0.000   0.000  1.00  0.00
ATOM      2  CA  GLY A   1       1.450   0.000   0.000  1.00  0.00
HETATM    3 NA    NA I   2       5.000   5.000   5.000  1.00  0.00
ATOM      4  O   HOH W   3       8.000   0.000   0.000  1.00  0.00           O
END
";

    fn topology() -> Topology {
        Topology::from_pdb_reader(Cursor::new(TOPOLOGY_PDB)).unwrap()
    }

    fn frame(index: usize, shift: f64, atoms: usize) -> Frame {
        Frame {
            index,
            step: index as u64 * 100,
            time: index as f64 * 0.2,
            positions: (0..atoms)
                .map(|i| [i as f64 * 1.45 + shift, 0.0, 0.0])
                .collect(),
            potential_energy: None,
            temperature: None,
            box_vectors: None,
        }
    }

    #[test]
    fn pdb_topology_reads_labels_and_solvent() {
        let t = topology();
        assert_eq!(t.atom_count(), 4);
        assert_eq!(t.missing_elements(), 3);
        assert_eq!(t.atoms()[1].name, "CA");
        assert_eq!(t.atoms()[3].element, Some(Element::O));
        assert_eq!(t.solute(), vec![0, 1]);
    }

    #[test]
    fn missing_elements_are_inferred_on_request() {
        let mut keep = topology();
        assert_eq!(keep.apply_element_policy(ElementPolicy::Keep), 0);
        assert_eq!(keep.missing_elements(), 3);

        let u = Universe::new(topology(), vec![frame(0, 0.0, 4)], ElementPolicy::InferMissing)
            .unwrap();
        let elements: Vec<_> = u.topology().atoms().iter().map(|a| a.element).collect();
        assert_eq!(
            elements,
            [
                Some(Element::N),
                Some(Element::C),
                Some(Element::Na),
                Some(Element::O)
            ]
        );
    }

    #[test]
    fn frame_atom_count_must_match_topology() {
        let err = Universe::new(
            topology(),
            vec![frame(0, 0.0, 4), frame(1, 0.0, 3)],
            ElementPolicy::Keep,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TrajectoryReadError::AtomCountMismatch {
                frame: 1,
                expected: 4,
                found: 3
            }
        ));
        assert!(matches!(
            Universe::new(topology(), Vec::new(), ElementPolicy::Keep),
            Err(TrajectoryReadError::Empty)
        ));
    }

    #[test]
    fn rigid_translation_keeps_metrics_constant() {
        let u = Universe::new(
            topology(),
            vec![frame(0, 0.0, 4), frame(1, 3.0, 4)],
            ElementPolicy::Keep,
        )
        .unwrap();
        let rg = u.radius_of_gyration();
        assert!((rg[0] - 0.725).abs() < 1e-12);
        assert!((rg[0] - rg[1]).abs() < 1e-12);
        assert_eq!(u.rmsd()[0], 0.0);
        assert!(u.rmsd()[1].abs() < 1e-12);
    }

    #[test]
    fn structure_topology_keeps_elements() {
        use crate::model::metadata::{AtomResidueInfo, ResidueCategory, StandardResidue};
        use crate::model::structure::Atom;

        let mut s = Structure::new();
        s.push_atom(
            Atom::new(Element::O, [0.0; 3]),
            AtomResidueInfo::builder("O", "HOH", 1, 'W')
                .standard_name(Some(StandardResidue::HOH))
                .category(ResidueCategory::Standard)
                .build(),
        );
        s.push_atom(
            Atom::new(Element::C, [1.0, 0.0, 0.0]),
            AtomResidueInfo::builder("CA", "ALA", 2, 'A')
                .standard_name(Some(StandardResidue::ALA))
                .category(ResidueCategory::Standard)
                .build(),
        );
        let t = Topology::from_structure(&s);
        assert_eq!(t.missing_elements(), 0);
        assert!(t.atoms()[0].solvent);
        assert!(!t.atoms()[1].solvent);
    }
}
