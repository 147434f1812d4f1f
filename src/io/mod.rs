//! Structure loading and saving.
//!
//! Parsing, alias normalisation and writing are delegated to `bio-forge`;
//! this module converts between its model and [`Structure`] and maps failures
//! onto [`StructureLoadError`].

use crate::error::StructureLoadError;
use crate::model::structure::Structure;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub mod error;
pub mod util;

mod mmcif;
mod pdb;

pub use error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pdb,
    Mmcif,
}

impl Format {
    /// Infers the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdb" | "ent" => Some(Format::Pdb),
            "cif" | "mmcif" => Some(Format::Mmcif),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Pdb => write!(f, "PDB"),
            Format::Mmcif => write!(f, "mmCIF"),
        }
    }
}

/// Reads a [`Structure`] from any buffered source.
pub struct StructureReader<R: BufRead> {
    reader: R,
    format: Format,
}

impl<R: BufRead> StructureReader<R> {
    pub fn new(reader: R, format: Format) -> Self {
        Self { reader, format }
    }

    pub fn read(self) -> Result<Structure, Error> {
        match self.format {
            Format::Pdb => pdb::reader::read(self.reader),
            Format::Mmcif => mmcif::reader::read(self.reader),
        }
    }
}

/// Writes a [`Structure`] (with its bonds, if any) to any sink.
pub struct StructureWriter<W: Write> {
    writer: W,
    format: Format,
}

impl<W: Write> StructureWriter<W> {
    pub fn new(writer: W, format: Format) -> Self {
        Self { writer, format }
    }

    pub fn write(self, structure: &Structure) -> Result<(), Error> {
        match self.format {
            Format::Pdb => pdb::writer::write(self.writer, structure),
            Format::Mmcif => mmcif::writer::write(self.writer, structure),
        }
    }
}

/// Loads the structure stored at `path`.
///
/// The format is inferred from the extension. A file that parses but holds
/// no atoms is rejected.
pub fn load_structure(path: impl AsRef<Path>) -> Result<Structure, StructureLoadError> {
    let path = path.as_ref();
    let format = Format::from_path(path).ok_or_else(|| StructureLoadError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    let file = File::open(path).map_err(|source| StructureLoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let structure = StructureReader::new(BufReader::new(file), format)
        .read()
        .map_err(|source| StructureLoadError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    if structure.atoms.is_empty() {
        return Err(StructureLoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    log::info!(
        "loaded {} atoms in {} residues from {} ({})",
        structure.atom_count(),
        structure.residue_count(),
        path.display(),
        format
    );

    Ok(structure)
}

/// Writes `structure` to any sink in the given format.
pub fn write_structure<W: Write>(writer: W, structure: &Structure, format: Format) -> Result<(), Error> {
    StructureWriter::new(writer, format).write(structure)
}

/// Saves a structure to `path`, inferring the format from the extension
/// (PDB when the extension is unrecognised).
pub fn save_structure(path: impl AsRef<Path>, structure: &Structure) -> Result<(), Error> {
    let path = path.as_ref();
    let format = Format::from_path(path).unwrap_or(Format::Pdb);
    let mut writer = BufWriter::new(File::create(path)?);
    write_structure(&mut writer, structure, format)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("1aki.pdb")), Some(Format::Pdb));
        assert_eq!(Format::from_path(Path::new("1AKI.PDB")), Some(Format::Pdb));
        assert_eq!(Format::from_path(Path::new("pdb1aki.ent")), Some(Format::Pdb));
        assert_eq!(Format::from_path(Path::new("1aki.cif")), Some(Format::Mmcif));
        assert_eq!(Format::from_path(Path::new("1aki.mmcif")), Some(Format::Mmcif));
        assert_eq!(Format::from_path(Path::new("1aki.xyz")), None);
        assert_eq!(Format::from_path(Path::new("noext")), None);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let path = PathBuf::from("definitely/not/here/protein.pdb");
        let err = load_structure(&path).unwrap_err();
        assert!(matches!(err, StructureLoadError::Open { .. }));
        assert_eq!(err.path(), path.as_path());
    }

    #[test]
    fn unknown_extension_is_rejected_before_opening() {
        let err = load_structure("protein.gro").unwrap_err();
        assert!(matches!(err, StructureLoadError::UnsupportedFormat { .. }));
    }

    #[test]
    fn file_without_atoms_is_empty_error() {
        let dir = std::env::temp_dir().join(format!("dreid-md-io-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("empty.pdb");
        std::fs::write(&path, "ATOM").unwrap();

        let err = load_structure(&path).unwrap_err();
        assert!(matches!(err, StructureLoadError::Empty { .. }));

        std::fs::remove_dir_all(&dir).ok();
    }
}
