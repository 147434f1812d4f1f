use crate::io::{error::Error, util};
use crate::model::structure::Structure;
use bio_forge as bf;
use std::io::Write;

pub fn write<W: Write>(writer: W, structure: &Structure) -> Result<(), Error> {
    let topo = util::to_bio_topology(structure)?;
    bf::io::write_pdb_topology(writer, &topo).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{Format, StructureReader};
    use crate::model::metadata::{AtomResidueInfo, ResidueCategory, ResiduePosition, StandardResidue};
    use crate::model::structure::Atom;
    use crate::model::types::Element;
    use std::io::Cursor;

    fn glycine_fragment() -> Structure {
        let mut s = Structure::new();
        for (name, element, pos) in [
            ("N", Element::N, [0.0, 0.0, 0.0]),
            ("CA", Element::C, [1.45, 0.0, 0.0]),
            ("C", Element::C, [2.0, 1.4, 0.0]),
            ("O", Element::O, [1.3, 2.4, 0.0]),
        ] {
            s.push_atom(
                Atom::new(element, pos),
                AtomResidueInfo::builder(name, "GLY", 1, 'A')
                    .standard_name(Some(StandardResidue::GLY))
                    .category(ResidueCategory::Standard)
                    .position(ResiduePosition::Internal)
                    .build(),
            );
        }
        s
    }

    #[test]
    fn written_pdb_reads_back_with_same_atoms() {
        let original = glycine_fragment();
        let mut buf = Vec::new();
        write(&mut buf, &original).expect("write pdb");

        let back = StructureReader::new(Cursor::new(buf), Format::Pdb)
            .read()
            .expect("read pdb");

        assert_eq!(back.atom_count(), original.atom_count());
        for (atom, info) in original.atoms.iter().zip(&original.metadata.atom_info) {
            let idx = back
                .metadata
                .atom_info
                .iter()
                .position(|b| b.atom_name == info.atom_name)
                .expect("atom present after roundtrip");
            let other = &back.atoms[idx];
            assert_eq!(atom.element, other.element);
            for k in 0..3 {
                assert!((atom.position[k] - other.position[k]).abs() < 1e-3);
            }
        }
    }
}
