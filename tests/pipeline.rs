use std::fs;
use std::path::{Path, PathBuf};

use dreid_md::pipeline;
use dreid_md::runner::{self, run_with_engine};
use dreid_md::trajectory::{self, Sampling, read_trajectory};
use dreid_md::{
    Atom, AtomParam, AtomResidueInfo, BondPotential, Element, ElementPolicy, Engine, EngineState,
    Error, Frame, LangevinIntegrator, NonbondedMethod, NonbondedSettings, NullProgress,
    PipelineConfig, Potentials, ReferenceEngine, RunParameters, RunProgressEvent,
    SimulationDivergedError, SimulationPhase, SimulationSystem, Structure, Topology,
    TrajectoryFormat, TrajectoryReadError, Universe, VdwPairPotential,
};

struct TempDir(PathBuf);

impl TempDir {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("dreid-md-it-{}-{}", name, std::process::id()));
        fs::create_dir_all(&path).unwrap();
        Self(path)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        fs::remove_dir_all(&self.0).ok();
    }
}

/// A bent C-C-C chain with a nonbonded 1-3 pair left in.
fn propane_backbone() -> SimulationSystem {
    let mut structure = Structure::new();
    let coords = [[0.0, 0.0, 0.0], [1.53, 0.0, 0.0], [2.04, 1.44, 0.0]];
    for (k, p) in coords.into_iter().enumerate() {
        structure.push_atom(
            Atom::new(Element::C, p),
            AtomResidueInfo::builder(format!("C{}", k + 1), "PRP", 1, 'A').build(),
        );
    }

    SimulationSystem {
        structure,
        force_field: "test".into(),
        atom_types: vec!["C_3".into()],
        atom_params: vec![
            AtomParam {
                charge: 0.0,
                mass: 12.011,
                type_index: 0,
            };
            3
        ],
        potentials: Potentials {
            bonds: vec![
                BondPotential::Harmonic {
                    i: 0,
                    j: 1,
                    k_force: 700.0,
                    r0: 1.53,
                },
                BondPotential::Harmonic {
                    i: 1,
                    j: 2,
                    k_force: 700.0,
                    r0: 1.53,
                },
            ],
            vdw_pairs: vec![VdwPairPotential::LennardJones {
                type1_idx: 0,
                type2_idx: 0,
                sigma: 3.47,
                epsilon: 0.0951,
            }],
            ..Default::default()
        },
        exclusions: vec![(0, 1), (1, 2)],
        constraints: Vec::new(),
        nonbonded: NonbondedSettings {
            method: NonbondedMethod::NoCutoff,
            cutoff: 10.0,
            reaction_field_dielectric: 1.0,
        },
    }
}

fn params(total_steps: u64, record_interval: u64) -> RunParameters {
    RunParameters::new(300.0, 1.0, 0.001, total_steps, record_interval)
        .unwrap()
        .with_seed(2024)
}

fn run_to_file(
    system: &SimulationSystem,
    params: &RunParameters,
    path: &Path,
    format: TrajectoryFormat,
) -> Result<dreid_md::RunSummary, Error> {
    let mut sink = trajectory::create_writer(
        path,
        format,
        &system.structure,
        Sampling {
            timestep: params.timestep,
            record_interval: params.record_interval,
        },
    )
    .unwrap();
    runner::run::<ReferenceEngine>(system, params, sink.as_mut(), &mut NullProgress)
}

#[test]
fn pdb_trajectory_round_trips_through_the_analyzer() {
    let dir = TempDir::new("pdb");
    let system = propane_backbone();
    let params = params(500, 50);
    let path = dir.path().join("propane_300K.pdb");

    let summary = run_to_file(&system, &params, &path, TrajectoryFormat::Pdb).unwrap();
    assert_eq!(summary.frames_written, 11);
    assert!(summary.minimized_energy <= summary.initial_energy);

    let universe = Universe::load(
        Topology::from_structure(&system.structure),
        &path,
        ElementPolicy::Keep,
    )
    .unwrap();
    assert_eq!(universe.frame_count(), 11);
    assert_eq!(universe.atom_count(), 3);

    let steps: Vec<u64> = universe.frames().iter().map(|f| f.step).collect();
    assert_eq!(steps, (0..=10).map(|k| k * 50).collect::<Vec<_>>());

    let rg = universe.radius_of_gyration();
    assert_eq!(rg.len(), 11);
    assert!(rg.iter().all(|r| *r > 0.5 && *r < 3.0));

    let rmsd = universe.rmsd();
    assert!(rmsd[0].abs() < 1e-9);
}

#[test]
fn dcd_trajectory_matches_in_memory_frames() {
    let dir = TempDir::new("dcd");
    let system = propane_backbone();
    let params = params(400, 100);

    let mut memory: Vec<Frame> = Vec::new();
    runner::run::<ReferenceEngine>(&system, &params, &mut memory, &mut NullProgress).unwrap();

    let path = dir.path().join("propane_300K.dcd");
    run_to_file(&system, &params, &path, TrajectoryFormat::Dcd).unwrap();
    let on_disk = read_trajectory(&path).unwrap();

    assert_eq!(on_disk.len(), memory.len());
    for (a, b) in on_disk.iter().zip(&memory) {
        assert_eq!(a.step, b.step);
        for (p, q) in a.positions.iter().zip(&b.positions) {
            for d in 0..3 {
                // single precision on disk
                assert!((p[d] - q[d]).abs() < 1e-4, "{p:?} vs {q:?}");
            }
        }
    }
}

#[test]
fn identical_seeds_give_identical_trajectories() {
    let system = propane_backbone();
    let params = params(300, 30);

    let mut first: Vec<Frame> = Vec::new();
    let mut second: Vec<Frame> = Vec::new();
    runner::run::<ReferenceEngine>(&system, &params, &mut first, &mut NullProgress).unwrap();
    runner::run::<ReferenceEngine>(&system, &params, &mut second, &mut NullProgress).unwrap();
    assert_eq!(first, second);

    let mut other: Vec<Frame> = Vec::new();
    runner::run::<ReferenceEngine>(&system, &params.with_seed(7), &mut other, &mut NullProgress)
        .unwrap();
    assert_eq!(other.len(), first.len());
    assert_ne!(other.last().unwrap().positions, first.last().unwrap().positions);
}

#[test]
fn progress_is_reported_every_tenth() {
    let system = propane_backbone();
    let mut frames: Vec<Frame> = Vec::new();
    let mut events: Vec<RunProgressEvent> = Vec::new();
    runner::run::<ReferenceEngine>(&system, &params(1000, 100), &mut frames, &mut events).unwrap();

    let steps: Vec<u64> = events.iter().map(|e| e.step).collect();
    assert_eq!(steps, (1..=10).map(|k| k * 100).collect::<Vec<_>>());
    assert!(events.iter().all(|e| e.temperature.is_finite()));
}

/// Drifts atoms along x and blows up at a chosen step.
struct FailingEngine {
    positions: Vec<[f64; 3]>,
    step: u64,
    fail_at: u64,
}

impl Engine for FailingEngine {
    fn create(system: &SimulationSystem, _: &LangevinIntegrator) -> Result<Self, Error> {
        Ok(Self {
            positions: system.positions(),
            step: 0,
            fail_at: u64::MAX,
        })
    }

    fn set_positions(&mut self, positions: &[[f64; 3]]) -> Result<(), Error> {
        self.positions = positions.to_vec();
        Ok(())
    }

    fn minimize(&mut self, _: f64, _: usize) -> Result<(), SimulationDivergedError> {
        Ok(())
    }

    fn set_velocities_to_temperature(&mut self, _: f64, _: u64) {}

    fn step(&mut self, steps: u64) -> Result<(), SimulationDivergedError> {
        for _ in 0..steps {
            self.step += 1;
            if self.step == self.fail_at {
                return Err(SimulationDivergedError::new(
                    SimulationPhase::Dynamics,
                    self.step,
                    "non-finite energy",
                ));
            }
            for p in &mut self.positions {
                p[0] += 0.01;
            }
        }
        Ok(())
    }

    fn state(&self) -> EngineState {
        EngineState {
            step: self.step,
            time: self.step as f64 * 0.001,
            positions: self.positions.clone(),
            potential_energy: -1.0,
            kinetic_energy: 1.0,
            temperature: 300.0,
            box_vectors: None,
        }
    }
}

#[test]
fn divergence_keeps_the_frames_already_written() {
    let dir = TempDir::new("diverge");
    let system = propane_backbone();
    let params = params(1000, 100);

    for format in [TrajectoryFormat::Pdb, TrajectoryFormat::Dcd] {
        let path = dir.path().join(format!("propane.{}", format.extension()));
        let mut sink = trajectory::create_writer(
            &path,
            format,
            &system.structure,
            Sampling {
                timestep: params.timestep,
                record_interval: params.record_interval,
            },
        )
        .unwrap();

        let mut engine = FailingEngine::create(&system, &params.integrator()).unwrap();
        engine.fail_at = 450;
        let err = run_with_engine(
            &mut engine,
            &system.positions(),
            &params,
            sink.as_mut(),
            &mut NullProgress,
        )
        .unwrap_err();
        assert!(matches!(err, Error::SimulationDiverged(ref e) if e.step == 450));
        drop(sink);

        // frames 0, 100, 200, 300, 400; a PDB has no END record but every
        // model is closed
        let frames = read_trajectory(&path).unwrap();
        assert_eq!(frames.len(), 5, "{format}");
        assert_eq!(frames.last().unwrap().step, 400);
    }
}

#[test]
fn topology_of_another_system_is_rejected() {
    let dir = TempDir::new("mismatch");
    let system = propane_backbone();
    let path = dir.path().join("propane.pdb");
    run_to_file(&system, &params(100, 50), &path, TrajectoryFormat::Pdb).unwrap();

    let mut smaller = system.structure.clone();
    smaller.atoms.pop();
    smaller.metadata.atom_info.pop();

    let err = Universe::load(Topology::from_structure(&smaller), &path, ElementPolicy::Keep)
        .unwrap_err();
    assert!(matches!(
        err,
        TrajectoryReadError::AtomCountMismatch {
            expected: 2,
            found: 3,
            ..
        }
    ));
}

#[test]
fn config_file_drives_run_parameters() {
    let config = PipelineConfig::from_toml_str(
        r#"
        structure = "lysozyme"

        [structures]
        lysozyme = "inputs/1aki.pdb"

        [run]
        temperature = 300.0
        timestep = 0.002
        duration = 400.0
        record-interval = 1000
        seed = 11
        "#,
    )
    .unwrap();

    let input = config.input_path(None, None).unwrap();
    let params = config.run.to_parameters().unwrap();
    assert_eq!(params.total_steps, 200_000);
    assert_eq!(params.frame_count(), 201);
    assert_eq!(params.progress_interval(), 20_000);
    assert_eq!(
        runner::trajectory_path(Path::new("out"), &input, params.temperature, TrajectoryFormat::Pdb),
        PathBuf::from("out/1aki_300K.pdb")
    );
}

const ALANINE: &str = "\
ATOM      1  N   ALA A   1      -0.966   0.493   1.500  1.00  0.00           N
ATOM      2  CA  ALA A   1       0.257   0.418   0.692  1.00  0.00           C
ATOM      3  C   ALA A   1      -0.094   0.017  -0.716  1.00  0.00           C
ATOM      4  O   ALA A   1      -1.056  -0.682  -0.923  1.00  0.00           O
ATOM      5  CB  ALA A   1       1.204  -0.620   1.296  1.00  0.00           C
END
";

#[test]
fn config_file_runs_the_whole_pipeline() {
    let dir = TempDir::new("run-pipeline");
    fs::write(dir.path().join("ala.pdb"), ALANINE).unwrap();
    let config_path = dir.path().join("run.toml");
    fs::write(
        &config_path,
        r#"
        structure = "ala"

        [structures]
        ala = "ala.pdb"

        [forcefield]
        nonbonded-method = "no-cutoff"
        constraints = "h-bonds"

        [build.solvation]
        enabled = false

        [run]
        temperature = 300.0
        timestep = 0.001
        steps = 50
        record-interval = 10
        seed = 9

        [output]
        directory = "out"
        format = "pdb"
        "#,
    )
    .unwrap();

    let config = PipelineConfig::from_file(&config_path).unwrap();
    let input = config.input_path(None, None).unwrap();
    assert_eq!(input, dir.path().join("ala.pdb"));

    let outcome =
        pipeline::run_pipeline::<ReferenceEngine>(&config, &input, &mut NullProgress).unwrap();

    let out = dir.path().join("out");
    assert_eq!(outcome.trajectory, out.join("ala_300K.pdb"));
    assert_eq!(outcome.topology, Some(out.join("ala_300K_topology.pdb")));
    assert_eq!(outcome.format, TrajectoryFormat::Pdb);
    assert_eq!(outcome.summary.frames_written, 6);

    let topology = Topology::from_pdb(outcome.topology.as_ref().unwrap()).unwrap();
    assert!(topology.atom_count() > 5);

    let universe = Universe::load(topology, &outcome.trajectory, ElementPolicy::Keep).unwrap();
    assert_eq!(universe.frame_count(), 6);
    let steps: Vec<u64> = universe.frames().iter().map(|f| f.step).collect();
    assert_eq!(steps, vec![0, 10, 20, 30, 40, 50]);
}
