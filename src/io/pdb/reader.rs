use crate::io::{error::Error, util};
use crate::model::structure::Structure;
use bio_forge as bf;
use std::io::{BufRead, Read};

/// Residues without a standard template are read as hetero groups.
pub fn read<R: BufRead>(mut reader: R) -> Result<Structure, Error> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let bio_context = bf::io::IoContext::new_default();
    let bio_struct = util::parse_with_unknown_as_hetero(
        text,
        |t| bf::io::read_pdb_structure(t.as_bytes(), &bio_context),
        util::pdb_unknown_as_hetero,
    )?;
    Ok(util::from_bio_structure(&bio_struct)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::metadata::{ResidueCategory, StandardResidue};
    use crate::model::types::Element;
    use std::io::Cursor;

    fn atom_line(serial: usize, name: &str, res: &str, resid: i32, xyz: [f64; 3], el: &str) -> String {
        format!(
            "ATOM  {:>5} {:<4} {:>3} A{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
            serial,
            format!(" {name}"),
            res,
            resid,
            xyz[0],
            xyz[1],
            xyz[2],
            1.0,
            0.0,
            el
        )
    }

    fn alanine_pdb() -> String {
        let lines = [
            atom_line(1, "N", "ALA", 1, [-0.966, 0.493, 1.500], "N"),
            atom_line(2, "CA", "ALA", 1, [0.257, 0.418, 0.692], "C"),
            atom_line(3, "C", "ALA", 1, [-0.094, 0.017, -0.716], "C"),
            atom_line(4, "O", "ALA", 1, [-1.056, -0.682, -0.923], "O"),
            atom_line(5, "CB", "ALA", 1, [1.204, -0.620, 1.296], "C"),
        ];
        let mut text = lines.join("\n");
        text.push_str("\nEND\n");
        text
    }

    #[test]
    fn reads_every_atom_with_coordinates() {
        let structure = read(Cursor::new(alanine_pdb())).expect("read pdb");

        assert_eq!(structure.atom_count(), 5);
        assert!(structure.bonds.is_empty());
        assert_eq!(structure.metadata.atom_info.len(), 5);
        for atom in &structure.atoms {
            assert!(atom.position.iter().all(|c| c.is_finite()));
        }
        assert!(structure.atoms.iter().any(|a| a.element == Element::O));
    }

    #[test]
    fn annotates_standard_residues() {
        let structure = read(Cursor::new(alanine_pdb())).expect("read pdb");
        let info = &structure.metadata.atom_info[0];
        assert_eq!(info.residue_name, "ALA");
        assert_eq!(info.residue_id, 1);
        assert_eq!(info.chain_id, 'A');
        assert_eq!(info.standard_name, Some(StandardResidue::ALA));
        assert_eq!(info.category, ResidueCategory::Standard);
    }

    #[test]
    fn handles_invalid_input_gracefully() {
        let structure = read(Cursor::new(b"ATOM".as_slice())).expect("parsing should not panic");
        assert_eq!(structure.atom_count(), 0);
    }

    #[test]
    fn unknown_residue_in_atom_records_is_read_as_hetero() {
        let mut text = alanine_pdb().replace("END\n", "");
        text.push_str(&atom_line(6, "C1", "XYZ", 2, [2.0, 1.0, 0.0], "C"));
        text.push('\n');
        text.push_str(&atom_line(7, "O1", "XYZ", 2, [3.1, 1.2, 0.3], "O"));
        text.push_str("\nEND\n");

        let structure = read(Cursor::new(text)).expect("unknown residue still loads");

        assert_eq!(structure.atom_count(), 7);
        let xyz: Vec<_> = structure
            .metadata
            .atom_info
            .iter()
            .filter(|info| info.residue_name == "XYZ")
            .collect();
        assert_eq!(xyz.len(), 2);
        assert!(xyz.iter().all(|info| info.category == ResidueCategory::Hetero));
        assert!(xyz.iter().all(|info| info.standard_name.is_none()));
        assert_eq!(
            structure.metadata.atom_info[0].category,
            ResidueCategory::Standard
        );
    }
}
