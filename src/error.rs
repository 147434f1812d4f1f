//! Error taxonomy for the simulation pipeline.
//!
//! Each pipeline stage has one failure kind:
//!
//! | Stage | Error |
//! | --- | --- |
//! | Structure loading | [`StructureLoadError`] |
//! | System building | [`ForceFieldMismatchError`] |
//! | Simulation | [`SimulationDivergedError`] |
//! | Trajectory analysis | [`TrajectoryReadError`] |
//!
//! [`Error`] wraps all four together with the failures that do not belong to
//! a single stage (invalid run parameters, configuration files, output I/O).

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The input structure could not be turned into a [`Structure`](crate::Structure).
#[derive(Debug, Error)]
pub enum StructureLoadError {
    #[error("cannot open structure file '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed structure file '{}': {source}", path.display())]
    Malformed {
        path: PathBuf,
        source: crate::io::Error,
    },

    #[error("structure file '{}' contains no atoms", path.display())]
    Empty { path: PathBuf },

    #[error(
        "cannot infer structure format of '{}' (expected .pdb, .ent, .cif or .mmcif)",
        path.display()
    )]
    UnsupportedFormat { path: PathBuf },
}

impl StructureLoadError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Open { path, .. }
            | Self::Malformed { path, .. }
            | Self::Empty { path }
            | Self::UnsupportedFormat { path } => path,
        }
    }
}

/// The force field cannot parameterize part of the topology.
#[derive(Debug, Error)]
pub enum ForceFieldMismatchError {
    /// A residue has no template in the selected force field.
    #[error(
        "force field '{force_field}' has no template for residue {residue_name} {residue_id} (chain {chain_id})"
    )]
    UnknownResidue {
        force_field: String,
        residue_name: String,
        residue_id: i32,
        chain_id: char,
    },

    /// A residue is known but one of its atoms is not.
    #[error(
        "force field '{force_field}' has no charge for atom '{atom_name}' in residue {residue_name} {residue_id} (chain {chain_id})"
    )]
    UnknownAtom {
        force_field: String,
        atom_name: String,
        residue_name: String,
        residue_id: i32,
        chain_id: char,
    },

    /// The bond graph could not be typed.
    #[error("atom typing failed: {0}")]
    AtomTyping(String),

    /// An assigned atom type is absent from the parameter table.
    #[error("missing force field parameter for atom type '{atom_type}': {detail}")]
    MissingParameter { atom_type: String, detail: String },

    /// A user-supplied parameter table could not be parsed.
    #[error("failed to parse force field parameters: {0}")]
    ParameterParse(#[from] toml::de::Error),
}

impl ForceFieldMismatchError {
    pub fn missing_parameter(atom_type: &str, detail: impl Into<String>) -> Self {
        Self::MissingParameter {
            atom_type: atom_type.to_string(),
            detail: detail.into(),
        }
    }
}

impl From<dreid_typer::TyperError> for ForceFieldMismatchError {
    fn from(e: dreid_typer::TyperError) -> Self {
        Self::AtomTyping(e.to_string())
    }
}

/// Which numerical pass produced an invalid state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationPhase {
    Minimization,
    Dynamics,
}

impl fmt::Display for SimulationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationPhase::Minimization => write!(f, "energy minimization"),
            SimulationPhase::Dynamics => write!(f, "dynamics"),
        }
    }
}

/// The integrator or minimizer produced a numerically invalid state.
#[derive(Debug, Clone, Error)]
#[error("simulation diverged during {phase} at step {step}: {detail}")]
pub struct SimulationDivergedError {
    pub phase: SimulationPhase,
    pub step: u64,
    pub detail: String,
}

impl SimulationDivergedError {
    pub fn new(phase: SimulationPhase, step: u64, detail: impl Into<String>) -> Self {
        Self {
            phase,
            step,
            detail: detail.into(),
        }
    }
}

/// A trajectory file could not be read back consistently.
#[derive(Debug, Error)]
pub enum TrajectoryReadError {
    #[error("cannot open trajectory '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error while reading trajectory: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed trajectory at line {line}: {detail}")]
    Malformed { line: usize, detail: String },

    #[error("malformed binary record {record}: {detail}")]
    InvalidRecord { record: usize, detail: String },

    #[error("trajectory is truncated inside frame {frame}")]
    Truncated { frame: usize },

    #[error("frame {frame} has {found} atoms but the topology has {expected}")]
    AtomCountMismatch {
        frame: usize,
        expected: usize,
        found: usize,
    },

    #[error("trajectory contains no frames")]
    Empty,

    #[error("cannot infer trajectory format of '{}' (expected .pdb or .dcd)", path.display())]
    UnsupportedFormat { path: PathBuf },
}

impl TrajectoryReadError {
    pub fn malformed(line: usize, detail: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            detail: detail.into(),
        }
    }
}

/// Any failure of the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    StructureLoad(#[from] StructureLoadError),

    #[error(transparent)]
    ForceFieldMismatch(#[from] ForceFieldMismatchError),

    #[error(transparent)]
    SimulationDiverged(#[from] SimulationDivergedError),

    #[error(transparent)]
    TrajectoryRead(#[from] TrajectoryReadError),

    /// Structure preparation (repair, protonation, solvation, bond perception) failed.
    #[error("system preparation failed: {0}")]
    Preparation(String),

    #[error("invalid run parameters: {0}")]
    InvalidParameters(String),

    #[error("failed to write trajectory: {0}")]
    TrajectoryWrite(#[source] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<bio_forge::ops::Error> for Error {
    fn from(e: bio_forge::ops::Error) -> Self {
        Error::Preparation(e.to_string())
    }
}

impl Error {
    pub fn invalid_parameters(detail: impl Into<String>) -> Self {
        Self::InvalidParameters(detail.into())
    }
}
