//! Trajectory persistence.
//!
//! The runner is the only writer and pushes [`Frame`]s into a
//! [`TrajectorySink`]; the analyzer reads whole trajectories back with
//! [`read_trajectory`]. Two on-disk formats are supported:
//!
//! - multi-model PDB ([`pdb`]), human-readable and carrying per-frame energy
//!   and temperature in `REMARK 250` records;
//! - CHARMM/NAMD DCD ([`dcd`]), compact single-precision coordinates.
//!
//! Both writers keep the file a valid prefix after every frame, so a run
//! that stops early leaves a readable partial trajectory behind.

pub mod dcd;
pub mod pdb;

use crate::error::TrajectoryReadError;
use crate::model::structure::Structure;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

/// One recorded snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Zero-based position in the trajectory.
    pub index: usize,
    /// Dynamics step the snapshot was taken at (0 is the minimized start).
    pub step: u64,
    /// Simulated time in ps.
    pub time: f64,
    pub positions: Vec<[f64; 3]>,
    /// kcal/mol, when the format stores it.
    pub potential_energy: Option<f64>,
    /// K, when the format stores it.
    pub temperature: Option<f64>,
    pub box_vectors: Option<[[f64; 3]; 3]>,
}

impl Frame {
    #[inline]
    pub fn atom_count(&self) -> usize {
        self.positions.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrajectoryFormat {
    #[default]
    Pdb,
    Dcd,
}

impl TrajectoryFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdb" => Some(TrajectoryFormat::Pdb),
            "dcd" => Some(TrajectoryFormat::Dcd),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TrajectoryFormat::Pdb => "pdb",
            TrajectoryFormat::Dcd => "dcd",
        }
    }
}

impl fmt::Display for TrajectoryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrajectoryFormat::Pdb => write!(f, "PDB"),
            TrajectoryFormat::Dcd => write!(f, "DCD"),
        }
    }
}

/// Destination for recorded frames.
///
/// `flush` must leave everything written so far durable and readable.
pub trait TrajectorySink {
    fn write_frame(&mut self, frame: &Frame) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Writes any trailer the format needs. No frames may follow.
    fn finish(&mut self) -> io::Result<()> {
        self.flush()
    }
}

/// In-memory sink, mostly for tests and embedding.
impl TrajectorySink for Vec<Frame> {
    fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.push(frame.clone());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// How frames relate to dynamics steps; stored in the DCD header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    /// Integration timestep in ps.
    pub timestep: f64,
    /// Steps between consecutive frames.
    pub record_interval: u64,
}

/// Creates a file-backed sink at `path` labelled with `structure`'s atoms.
pub fn create_writer(
    path: &Path,
    format: TrajectoryFormat,
    structure: &Structure,
    sampling: Sampling,
) -> io::Result<Box<dyn TrajectorySink>> {
    let file = BufWriter::new(File::create(path)?);
    Ok(match format {
        TrajectoryFormat::Pdb => Box::new(pdb::PdbTrajectoryWriter::new(
            file,
            pdb::PdbAtom::from_structure(structure),
            structure.box_vectors,
        )?),
        TrajectoryFormat::Dcd => Box::new(dcd::DcdWriter::new(
            file,
            structure.atom_count(),
            sampling,
            structure.box_vectors.is_some(),
        )?),
    })
}

/// Reads every frame of the trajectory at `path`.
///
/// The format is inferred from the extension.
pub fn read_trajectory(path: impl AsRef<Path>) -> Result<Vec<Frame>, TrajectoryReadError> {
    let path = path.as_ref();
    let format = TrajectoryFormat::from_path(path).ok_or_else(|| {
        TrajectoryReadError::UnsupportedFormat {
            path: path.to_path_buf(),
        }
    })?;
    let file = File::open(path).map_err(|source| TrajectoryReadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let frames = match format {
        TrajectoryFormat::Pdb => pdb::read_frames(BufReader::new(file))?,
        TrajectoryFormat::Dcd => dcd::read_frames(BufReader::new(file))?,
    };
    log::debug!(
        "read {} frames of {} atoms from {}",
        frames.len(),
        frames.first().map_or(0, Frame::atom_count),
        path.display()
    );
    Ok(frames)
}

/// Checks that every frame has the same atom count as the first one.
pub(crate) fn check_atom_counts(
    frames: &[Frame],
    expected: usize,
) -> Result<(), TrajectoryReadError> {
    match frames.iter().find(|f| f.atom_count() != expected) {
        Some(f) => Err(TrajectoryReadError::AtomCountMismatch {
            frame: f.index,
            expected,
            found: f.atom_count(),
        }),
        None => Ok(()),
    }
}

/// Box vectors to `[a, b, c, alpha, beta, gamma]` (Å, degrees).
pub(crate) fn cell_parameters(v: &[[f64; 3]; 3]) -> [f64; 6] {
    let norm = |x: &[f64; 3]| (x[0] * x[0] + x[1] * x[1] + x[2] * x[2]).sqrt();
    let angle = |x: &[f64; 3], y: &[f64; 3]| {
        let cos = (x[0] * y[0] + x[1] * y[1] + x[2] * y[2]) / (norm(x) * norm(y));
        cos.clamp(-1.0, 1.0).acos().to_degrees()
    };
    [
        norm(&v[0]),
        norm(&v[1]),
        norm(&v[2]),
        angle(&v[1], &v[2]),
        angle(&v[0], &v[2]),
        angle(&v[0], &v[1]),
    ]
}

/// Inverse of [`cell_parameters`] in the standard lower-triangular setting.
pub(crate) fn box_from_cell([a, b, c, alpha, beta, gamma]: [f64; 6]) -> [[f64; 3]; 3] {
    let (ca, cb, cg) = (
        alpha.to_radians().cos(),
        beta.to_radians().cos(),
        gamma.to_radians().cos(),
    );
    let sg = gamma.to_radians().sin();
    let clean = |x: f64| if x.abs() < 1e-9 { 0.0 } else { x };
    let cx = c * cb;
    let cy = c * (ca - cb * cg) / sg;
    let cz = (c * c - cx * cx - cy * cy).max(0.0).sqrt();
    [
        [a, 0.0, 0.0],
        [clean(b * cg), clean(b * sg), 0.0],
        [clean(cx), clean(cy), cz],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: usize, atoms: usize) -> Frame {
        Frame {
            index,
            step: index as u64 * 10,
            time: index as f64 * 0.02,
            positions: vec![[0.0; 3]; atoms],
            potential_energy: None,
            temperature: None,
            box_vectors: None,
        }
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            TrajectoryFormat::from_path(Path::new("run_300K.pdb")),
            Some(TrajectoryFormat::Pdb)
        );
        assert_eq!(
            TrajectoryFormat::from_path(Path::new("run_300K.DCD")),
            Some(TrajectoryFormat::Dcd)
        );
        assert_eq!(TrajectoryFormat::from_path(Path::new("run.xtc")), None);
        assert_eq!(TrajectoryFormat::Dcd.extension(), "dcd");
    }

    #[test]
    fn vec_sink_collects_frames() {
        let mut sink: Vec<Frame> = Vec::new();
        sink.write_frame(&frame(0, 3)).unwrap();
        sink.write_frame(&frame(1, 3)).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[1].step, 10);
    }

    #[test]
    fn atom_count_check_names_first_offending_frame() {
        let frames = vec![frame(0, 3), frame(1, 3), frame(2, 2)];
        let err = check_atom_counts(&frames, 3).unwrap_err();
        assert!(matches!(
            err,
            TrajectoryReadError::AtomCountMismatch {
                frame: 2,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn cell_parameters_roundtrip_orthorhombic() {
        let v = [[30.0, 0.0, 0.0], [0.0, 40.0, 0.0], [0.0, 0.0, 50.0]];
        let cell = cell_parameters(&v);
        assert_eq!(&cell[..3], &[30.0, 40.0, 50.0]);
        for angle in &cell[3..] {
            assert!((angle - 90.0).abs() < 1e-9);
        }
        let back = box_from_cell(cell);
        for i in 0..3 {
            for k in 0..3 {
                assert!((back[i][k] - v[i][k]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn missing_trajectory_is_open_error() {
        let err = read_trajectory("no/such/run_300K.pdb").unwrap_err();
        assert!(matches!(err, TrajectoryReadError::Open { .. }));
        let err = read_trajectory("run_300K.trr").unwrap_err();
        assert!(matches!(err, TrajectoryReadError::UnsupportedFormat { .. }));
    }
}
