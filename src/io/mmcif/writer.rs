use crate::io::{error::Error, util};
use crate::model::structure::Structure;
use bio_forge as bf;
use std::io::Write;

pub fn write<W: Write>(writer: W, structure: &Structure) -> Result<(), Error> {
    let topo = util::to_bio_topology(structure)?;
    bf::io::write_mmcif_topology(writer, &topo).map_err(Error::from)
}
