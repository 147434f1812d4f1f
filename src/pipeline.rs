//! The four stages wired together: load, build, run, analyze.

use crate::analysis::{ElementPolicy, Topology, Universe};
use crate::builder::{self, BuildConfig};
use crate::config::PipelineConfig;
use crate::engine::Engine;
use crate::error::{Error, TrajectoryReadError};
use crate::forcefield::ForceFieldConfig;
use crate::io;
use crate::model::structure::Structure;
use crate::model::system::SimulationSystem;
use crate::runner::{self, ProgressSink, RunParameters, RunSummary};
use crate::trajectory::{self, Sampling, TrajectoryFormat};
use std::fs;
use std::path::{Path, PathBuf};

/// Where a run left its results.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub trajectory: PathBuf,
    /// The prepared system, when it was saved.
    pub topology: Option<PathBuf>,
    pub format: TrajectoryFormat,
    pub summary: RunSummary,
}

/// Loads `input` and builds a simulatable system from it.
pub fn prepare(
    input: &Path,
    forcefield: &ForceFieldConfig,
    build: &BuildConfig,
) -> Result<SimulationSystem, Error> {
    let structure = io::load_structure(input)?;
    builder::build_system(&structure, forcefield, build)
}

/// Output layout for [`simulate`].
#[derive(Debug, Clone, Copy)]
pub struct OutputSpec<'a> {
    pub directory: &'a Path,
    /// Names the output files.
    pub input: &'a Path,
    pub format: TrajectoryFormat,
    pub write_topology: bool,
}

/// Runs `system` with engine `E` and writes the trajectory into the output
/// directory.
///
/// On divergence the frames written so far are kept on disk and the error is
/// returned.
pub fn simulate<E: Engine>(
    system: &SimulationSystem,
    params: &RunParameters,
    output: OutputSpec<'_>,
    progress: &mut dyn ProgressSink,
) -> Result<RunOutcome, Error> {
    fs::create_dir_all(output.directory).map_err(Error::TrajectoryWrite)?;

    let topology = if output.write_topology {
        let path = runner::topology_path(output.directory, output.input, params.temperature);
        write_topology(&path, &system.structure)?;
        log::info!("wrote prepared topology to {}", path.display());
        Some(path)
    } else {
        None
    };

    let path = runner::trajectory_path(
        output.directory,
        output.input,
        params.temperature,
        output.format,
    );
    let mut sink = trajectory::create_writer(
        &path,
        output.format,
        &system.structure,
        Sampling {
            timestep: params.timestep,
            record_interval: params.record_interval,
        },
    )
    .map_err(Error::TrajectoryWrite)?;
    log::info!("writing {} trajectory to {}", output.format, path.display());

    let summary = runner::run::<E>(system, params, sink.as_mut(), progress)?;

    Ok(RunOutcome {
        trajectory: path,
        topology,
        format: output.format,
        summary,
    })
}

fn write_topology(path: &Path, structure: &Structure) -> Result<(), Error> {
    io::save_structure(path, structure).map_err(|e| match e {
        io::Error::Io(source) => Error::TrajectoryWrite(source),
        other => Error::TrajectoryWrite(std::io::Error::other(other)),
    })
}

/// Load, build and run as described by `config`.
pub fn run_pipeline<E: Engine>(
    config: &PipelineConfig,
    input: &Path,
    progress: &mut dyn ProgressSink,
) -> Result<RunOutcome, Error> {
    let params = config.run.to_parameters()?;
    let system = prepare(input, &config.forcefield_config()?, &config.build)?;
    let directory = config.output_directory();
    simulate::<E>(
        &system,
        &params,
        OutputSpec {
            directory: &directory,
            input,
            format: config.output.format,
            write_topology: config.output.write_topology,
        },
        progress,
    )
}

/// Reloads a finished trajectory against the structure it was run from.
pub fn analyze(
    structure: &Structure,
    trajectory: &Path,
    policy: ElementPolicy,
) -> Result<Universe, TrajectoryReadError> {
    Universe::load(Topology::from_structure(structure), trajectory, policy)
}
