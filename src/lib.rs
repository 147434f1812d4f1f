//! Run and inspect one molecular-dynamics trajectory of a biomolecule with
//! the DREIDING force field.
//!
//! The crate is a single forward pipeline of four stages:
//!
//! 1. **Load** a PDB or mmCIF file into a [`Structure`] ([`io::load_structure`]).
//! 2. **Build** a [`SimulationSystem`]: remove solvent, repair, add hydrogens,
//!    solvate, perceive bonds and assign DREIDING parameters ([`build_system`]).
//! 3. **Run** Langevin dynamics after an energy minimization, writing frames to
//!    a [`TrajectorySink`] and progress to a [`ProgressSink`] ([`runner::run`]).
//! 4. **Analyze** the written trajectory against its topology ([`Universe`]).
//!
//! Each stage fails with its own error kind ([`StructureLoadError`],
//! [`ForceFieldMismatchError`], [`SimulationDivergedError`],
//! [`TrajectoryReadError`]), all of which convert into [`Error`].
//!
//! # Quick Start
//!
//! A harmonic diatomic integrated with the bundled [`ReferenceEngine`]:
//!
//! ```
//! use dreid_md::{Atom, AtomParam, BondPotential, Element, Frame, NonbondedMethod,
//!     NonbondedSettings, Potentials, ReferenceEngine, RunParameters, RunProgressEvent,
//!     SimulationSystem, Structure};
//!
//! let mut structure = Structure::new();
//! structure.atoms.push(Atom::new(Element::C, [0.0, 0.0, 0.0]));
//! structure.atoms.push(Atom::new(Element::C, [1.6, 0.0, 0.0]));
//!
//! let system = SimulationSystem {
//!     structure,
//!     force_field: "example".into(),
//!     atom_types: vec!["C_3".into()],
//!     atom_params: vec![AtomParam { charge: 0.0, mass: 12.011, type_index: 0 }; 2],
//!     potentials: Potentials {
//!         bonds: vec![BondPotential::Harmonic { i: 0, j: 1, k_force: 700.0, r0: 1.53 }],
//!         ..Default::default()
//!     },
//!     exclusions: vec![(0, 1)],
//!     constraints: Vec::new(),
//!     nonbonded: NonbondedSettings {
//!         method: NonbondedMethod::NoCutoff,
//!         cutoff: 10.0,
//!         reaction_field_dielectric: 1.0,
//!     },
//! };
//!
//! // 1000 steps of 1 fs at 300 K, one frame every 100 steps.
//! let params = RunParameters::new(300.0, 1.0, 0.001, 1000, 100)?.with_seed(7);
//!
//! let mut frames: Vec<Frame> = Vec::new();
//! let mut events: Vec<RunProgressEvent> = Vec::new();
//! let summary = dreid_md::runner::run::<ReferenceEngine>(&system, &params, &mut frames, &mut events)?;
//!
//! // Minimized start plus one frame per interval.
//! assert_eq!(frames.len(), 11);
//! assert_eq!(frames[0].step, 0);
//! assert_eq!(frames[10].step, 1000);
//! assert_eq!(summary.frames_written, 11);
//!
//! // Progress every tenth of the run.
//! assert_eq!(events.len(), 10);
//! # Ok::<(), dreid_md::Error>(())
//! ```
//!
//! # Module Organization
//!
//! - [`io`] – Structure loading and saving (PDB, mmCIF)
//! - [`engine`] – The [`Engine`] seam and the [`ReferenceEngine`] backend
//! - [`trajectory`] – [`Frame`], multi-model PDB and DCD trajectories
//! - [`runner`] – [`RunParameters`], the Simulation Runner and progress reporting
//! - [`analysis`] – [`Universe`], per-frame metrics and viewers
//! - [`config`] – TOML pipeline configuration with a structure catalog
//! - [`pipeline`] – The stages chained end to end
//!
//! # Configuration
//!
//! ```
//! use dreid_md::{Constraints, ForceFieldConfig, ForceFieldPreset, NonbondedMethod};
//!
//! let config = ForceFieldConfig {
//!     preset: ForceFieldPreset::CharmmTip3p,
//!     nonbonded_cutoff: 12.0,
//!     constraints: Constraints::AllBonds,
//!     ..Default::default()
//! };
//! assert_eq!(config.nonbonded_method, NonbondedMethod::CutoffPeriodic);
//! assert!(config.rigid_water);
//! ```

mod builder;
mod error;
mod forcefield;
mod model;

pub mod analysis;
pub mod config;
pub mod engine;
pub mod io;
pub mod pipeline;
pub mod runner;
pub mod trajectory;

pub use model::structure::{Atom, Bond, ResidueSpan, Structure};
pub use model::types::{BondOrder, Element, ParseBondOrderError, ParseElementError};

pub use model::metadata::{
    AtomResidueBuilder, AtomResidueInfo, BioMetadata, ResidueCategory, ResiduePosition,
    StandardResidue,
};

pub use model::system::{
    AnglePotential, AtomParam, BondPotential, DihedralPotential, DistanceConstraint,
    ImproperPotential, NonbondedMethod, NonbondedSettings, Potentials, SimulationSystem,
    VdwPairPotential,
};

pub use forcefield::{
    AnglePotentialType, BondPotentialType, Constraints, ForceFieldConfig, ForceFieldPreset,
    VdwPotentialType, check_coverage, parameterize,
};

pub use builder::{Anion, BuildConfig, Cation, HisStrategy, SolvationConfig, build_system};

pub use engine::{Engine, EngineState, LangevinIntegrator, ReferenceEngine};

pub use trajectory::{Frame, TrajectoryFormat, TrajectorySink};

pub use runner::{
    ConsoleReporter, MinimizationSettings, NullProgress, ProgressSink, RunParameters,
    RunProgressEvent, RunSummary,
};

pub use analysis::{ElementPolicy, HtmlViewer, SummaryViewer, Topology, Universe, Viewer};

pub use config::{OutputConfig, PipelineConfig, RunSettings};

pub use error::{
    Error, ForceFieldMismatchError, SimulationDivergedError, SimulationPhase,
    StructureLoadError, TrajectoryReadError,
};
