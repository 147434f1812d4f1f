use super::metadata::{AtomResidueInfo, BioMetadata, ResidueCategory, StandardResidue};
use super::types::{BondOrder, Element};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: Element,
    pub position: [f64; 3],
}

impl Atom {
    pub fn new(element: Element, position: [f64; 3]) -> Self {
        Self { element, position }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bond {
    pub i: usize,
    pub j: usize,
    pub order: BondOrder,
}

impl Bond {
    pub fn new(idx1: usize, idx2: usize, order: BondOrder) -> Self {
        if idx1 <= idx2 {
            Self { i: idx1, j: idx2, order }
        } else {
            Self { i: idx2, j: idx1, order }
        }
    }
}

/// An atomic structure with residue annotations.
///
/// `atoms` and `metadata.atom_info` are parallel arrays. Atoms of one residue
/// are contiguous. Bonds are empty for a freshly loaded structure and are
/// filled in once the builder has perceived the bond graph.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    pub atoms: Vec<Atom>,
    pub bonds: Vec<Bond>,
    pub box_vectors: Option<[[f64; 3]; 3]>,
    pub metadata: BioMetadata,
}

/// A contiguous run of atoms sharing one residue key.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidueSpan<'a> {
    pub info: &'a AtomResidueInfo,
    pub atoms: Range<usize>,
}

impl ResidueSpan<'_> {
    #[inline]
    pub fn name(&self) -> &str {
        &self.info.residue_name
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    #[inline]
    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    #[inline]
    pub fn is_periodic(&self) -> bool {
        self.box_vectors.is_some()
    }

    pub fn positions(&self) -> Vec<[f64; 3]> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    pub fn push_atom(&mut self, atom: Atom, info: AtomResidueInfo) {
        self.atoms.push(atom);
        self.metadata.atom_info.push(info);
    }

    /// Iterates over residues in file order.
    pub fn residues(&self) -> impl Iterator<Item = ResidueSpan<'_>> + '_ {
        let info = &self.metadata.atom_info;
        let mut start = 0;
        std::iter::from_fn(move || {
            if start >= info.len() {
                return None;
            }
            let key = info[start].residue_key();
            let end = info[start..]
                .iter()
                .position(|a| a.residue_key() != key)
                .map_or(info.len(), |offset| start + offset);
            let span = ResidueSpan {
                info: &info[start],
                atoms: start..end,
            };
            start = end;
            Some(span)
        })
    }

    pub fn residue_count(&self) -> usize {
        self.residues().count()
    }

    pub fn chain_ids(&self) -> Vec<char> {
        let mut ids: Vec<char> = Vec::new();
        for info in &self.metadata.atom_info {
            if !ids.contains(&info.chain_id) {
                ids.push(info.chain_id);
            }
        }
        ids
    }

    pub fn water_count(&self) -> usize {
        self.residues()
            .filter(|r| r.info.standard_name == Some(StandardResidue::HOH))
            .count()
    }

    pub fn ion_count(&self) -> usize {
        self.residues()
            .filter(|r| r.info.category == ResidueCategory::Ion)
            .count()
    }

    pub fn hydrogen_count(&self) -> usize {
        self.atoms.iter().filter(|a| a.element.is_hydrogen()).count()
    }

    /// Box edge lengths for an orthorhombic cell, `None` if the cell is
    /// absent or triclinic.
    pub fn orthorhombic_box(&self) -> Option<[f64; 3]> {
        let b = self.box_vectors?;
        let off_diagonal = [b[0][1], b[0][2], b[1][0], b[1][2], b[2][0], b[2][1]];
        if off_diagonal.iter().any(|v| v.abs() > 1e-6) {
            return None;
        }
        Some([b[0][0], b[1][1], b[2][2]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::metadata::ResiduePosition;

    fn info(atom: &str, res: &str, id: i32, chain: char) -> AtomResidueInfo {
        AtomResidueInfo::builder(atom, res, id, chain)
            .category(ResidueCategory::Standard)
            .position(ResiduePosition::Internal)
            .build()
    }

    fn dipeptide_with_water() -> Structure {
        let mut s = Structure::new();
        s.push_atom(Atom::new(Element::N, [0.0, 0.0, 0.0]), info("N", "ALA", 1, 'A'));
        s.push_atom(Atom::new(Element::C, [1.4, 0.0, 0.0]), info("CA", "ALA", 1, 'A'));
        s.push_atom(Atom::new(Element::N, [3.0, 0.0, 0.0]), info("N", "GLY", 2, 'A'));
        s.push_atom(
            Atom::new(Element::O, [8.0, 0.0, 0.0]),
            AtomResidueInfo::builder("O", "HOH", 3, 'W')
                .standard_name(Some(StandardResidue::HOH))
                .category(ResidueCategory::Standard)
                .build(),
        );
        s.push_atom(
            Atom::new(Element::Na, [9.0, 0.0, 0.0]),
            AtomResidueInfo::builder("NA", "NA", 4, 'W')
                .category(ResidueCategory::Ion)
                .build(),
        );
        s
    }

    #[test]
    fn bond_new_normalizes_index_order() {
        let b = Bond::new(5, 2, BondOrder::Single);
        assert_eq!((b.i, b.j), (2, 5));
    }

    #[test]
    fn residues_are_grouped_in_file_order() {
        let s = dipeptide_with_water();
        let spans: Vec<_> = s.residues().collect();
        assert_eq!(spans.len(), 4);
        assert_eq!(spans[0].name(), "ALA");
        assert_eq!(spans[0].atoms, 0..2);
        assert_eq!(spans[1].name(), "GLY");
        assert_eq!(spans[1].atoms, 2..3);
        assert_eq!(spans[3].len(), 1);
    }

    #[test]
    fn counts_solvent_and_chains() {
        let s = dipeptide_with_water();
        assert_eq!(s.atom_count(), 5);
        assert_eq!(s.residue_count(), 4);
        assert_eq!(s.water_count(), 1);
        assert_eq!(s.ion_count(), 1);
        assert_eq!(s.chain_ids(), vec!['A', 'W']);
        assert_eq!(s.hydrogen_count(), 0);
    }

    #[test]
    fn empty_structure_has_no_residues() {
        let s = Structure::new();
        assert_eq!(s.residues().count(), 0);
        assert!(!s.is_periodic());
    }

    #[test]
    fn orthorhombic_box_rejects_triclinic_cells() {
        let mut s = Structure::new();
        s.box_vectors = Some([[30.0, 0.0, 0.0], [0.0, 31.0, 0.0], [0.0, 0.0, 32.0]]);
        assert_eq!(s.orthorhombic_box(), Some([30.0, 31.0, 32.0]));

        s.box_vectors = Some([[30.0, 0.0, 0.0], [5.0, 31.0, 0.0], [0.0, 0.0, 32.0]]);
        assert_eq!(s.orthorhombic_box(), None);
    }
}
