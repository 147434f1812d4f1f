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
        |t| bf::io::read_mmcif_structure(t.as_bytes(), &bio_context),
        util::mmcif_unknown_as_hetero,
    )?;
    Ok(util::from_bio_structure(&bio_struct)?)
}
