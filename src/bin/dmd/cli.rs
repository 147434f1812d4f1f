use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "dmd",
    about = "DREIDING molecular dynamics: prepare, simulate and inspect one trajectory",
    version,
    author,
    before_help = crate::display::banner_for_help(),
    propagate_version = true
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load, prepare, minimize and simulate a structure
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// Inspect a written trajectory
    #[command(visible_alias = "v")]
    View(ViewArgs),
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputOptions,

    #[command(flatten)]
    pub forcefield: ForceFieldOptions,

    #[command(flatten)]
    pub preparation: PreparationOptions,

    #[command(flatten)]
    pub dynamics: DynamicsOptions,

    #[command(flatten)]
    pub output: OutputOptions,
}

/// Every option here overrides the value from --config.
#[derive(Args)]
#[command(next_help_heading = "Input/Output")]
pub struct InputOptions {
    /// Input structure (PDB or mmCIF)
    #[arg(short, long, value_name = "FILE", conflicts_with = "structure")]
    pub input: Option<PathBuf>,

    /// Structure name from the config catalog
    #[arg(short, long, value_name = "NAME")]
    pub structure: Option<String>,

    /// Pipeline configuration (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Suppress banner, spinners and tables (for scripting)
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args)]
#[command(next_help_heading = "Force Field")]
pub struct ForceFieldOptions {
    /// Charge library and water model
    #[arg(long, value_name = "PRESET")]
    pub preset: Option<Preset>,

    /// Bond potential functional form
    #[arg(long, value_name = "TYPE")]
    pub bond_potential: Option<BondPotential>,

    /// Angle potential functional form
    #[arg(long, value_name = "TYPE")]
    pub angle_potential: Option<AnglePotential>,

    /// Van der Waals potential functional form
    #[arg(long, value_name = "TYPE")]
    pub vdw_potential: Option<VdwPotential>,

    /// Nonbonded interaction method
    #[arg(long = "nonbonded", value_name = "METHOD")]
    pub nonbonded_method: Option<Nonbonded>,

    /// Nonbonded cutoff distance (Å)
    #[arg(long, value_name = "Å")]
    pub cutoff: Option<f64>,

    /// Bonds held rigid during dynamics
    #[arg(long, value_name = "POLICY")]
    pub constraints: Option<ConstraintPolicy>,

    /// Let water molecules flex instead of keeping them rigid
    #[arg(long)]
    pub flexible_water: bool,

    /// Custom typing rules (TOML file)
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Custom force field parameters (TOML file)
    #[arg(long, value_name = "FILE")]
    pub params: Option<PathBuf>,
}

#[derive(Args)]
#[command(next_help_heading = "Preparation")]
pub struct PreparationOptions {
    /// Target pH for protonation state assignment
    #[arg(long, value_name = "PH")]
    pub ph: Option<f64>,

    /// Histidine tautomer selection strategy
    #[arg(long, value_name = "STRATEGY")]
    pub his: Option<HisStrategy>,

    /// Remove ions present in the input
    #[arg(long)]
    pub no_ions: bool,

    /// Remove hetero residues present in the input
    #[arg(long)]
    pub no_hetero: bool,

    /// Remove specific residues (comma-separated names)
    #[arg(long, value_name = "RES", value_delimiter = ',')]
    pub remove: Vec<String>,

    /// Simulate in vacuum (no water box)
    #[arg(long)]
    pub no_solvate: bool,

    /// Water box padding around the solute (Å)
    #[arg(long, value_name = "Å")]
    pub padding: Option<f64>,

    /// Water molecule spacing (Å)
    #[arg(long = "water-spacing", value_name = "Å")]
    pub water_spacing: Option<f64>,

    /// Minimum solute-water distance (Å)
    #[arg(long = "solv-cutoff", value_name = "Å")]
    pub vdw_cutoff: Option<f64>,

    /// Cation type for neutralization
    #[arg(long, value_name = "ION")]
    pub cation: Option<Cation>,

    /// Anion type for neutralization
    #[arg(long, value_name = "ION")]
    pub anion: Option<Anion>,

    /// Target net charge after ion addition
    #[arg(long = "target-charge", value_name = "Q", allow_hyphen_values = true)]
    pub target_charge: Option<i32>,

    /// Random seed for reproducible water and ion placement
    #[arg(long = "solv-seed", value_name = "SEED")]
    pub solvation_seed: Option<u64>,

    /// Disulfide bond detection cutoff (Å)
    #[arg(long = "ss-cutoff", value_name = "Å")]
    pub ss_cutoff: Option<f64>,
}

#[derive(Args)]
#[command(next_help_heading = "Dynamics")]
pub struct DynamicsOptions {
    /// Bath temperature (K)
    #[arg(short = 'T', long, value_name = "K")]
    pub temperature: Option<f64>,

    /// Langevin friction coefficient (1/ps)
    #[arg(long, value_name = "1/ps")]
    pub friction: Option<f64>,

    /// Integration timestep (ps)
    #[arg(long, value_name = "PS")]
    pub timestep: Option<f64>,

    /// Simulated time (ps)
    #[arg(short, long, value_name = "PS", conflicts_with = "steps")]
    pub duration: Option<f64>,

    /// Exact number of dynamics steps
    #[arg(short = 'n', long, value_name = "N")]
    pub steps: Option<u64>,

    /// Steps between trajectory frames
    #[arg(long = "record-interval", value_name = "N")]
    pub record_interval: Option<u64>,

    /// Random seed for velocities and thermostat noise
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Minimization RMS force tolerance (kcal/mol/Å)
    #[arg(long = "min-tolerance", value_name = "TOL")]
    pub minimize_tolerance: Option<f64>,

    /// Maximum minimization iterations
    #[arg(long = "min-max-iter", value_name = "N")]
    pub minimize_max_iterations: Option<usize>,
}

#[derive(Args)]
#[command(next_help_heading = "Output")]
pub struct OutputOptions {
    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Trajectory file format
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<TrajectoryFormat>,

    /// Do not save the prepared topology beside the trajectory
    #[arg(long)]
    pub no_topology: bool,

    /// Open the finished trajectory in a viewer
    #[arg(long, value_name = "MODE")]
    pub view: Option<ViewMode>,
}

#[derive(Args)]
pub struct ViewArgs {
    /// Topology PDB written by `dmd run`
    #[arg(short, long, value_name = "FILE")]
    pub topology: PathBuf,

    /// Trajectory file (PDB or DCD)
    #[arg(value_name = "TRAJECTORY")]
    pub trajectory: PathBuf,

    /// How to present the trajectory
    #[arg(short, long, value_name = "MODE", default_value = "summary")]
    pub mode: ViewMode,

    /// HTML page to write (default: next to the trajectory)
    #[arg(long, value_name = "FILE")]
    pub html: Option<PathBuf>,

    /// Keep missing elements instead of inferring them from atom names
    #[arg(long)]
    pub no_infer_elements: bool,

    /// Suppress banner and tables
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Preset {
    #[value(name = "amber-ffsb-tip3p-fb", alias = "ffsb-fb")]
    AmberFfsbTip3pFb,
    #[value(name = "amber-ffsb-tip3p", alias = "ffsb")]
    AmberFfsbTip3p,
    #[value(name = "amber-ffsb-opc3")]
    AmberFfsbOpc3,
    #[value(name = "amber-ff03-tip3p", alias = "ff03")]
    AmberFf03Tip3p,
    #[value(name = "charmm-tip3p", alias = "charmm")]
    CharmmTip3p,
    #[value(name = "charmm-spce")]
    CharmmSpcE,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum BondPotential {
    /// Harmonic bond stretching
    Harmonic,
    /// Morse anharmonic potential
    Morse,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum AnglePotential {
    /// Cosine-harmonic (DREIDING original)
    Cosine,
    /// Theta-harmonic (simple harmonic in angle)
    #[value(name = "theta-harmonic", alias = "theta")]
    ThetaHarmonic,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum VdwPotential {
    /// Lennard-Jones 12-6
    #[value(alias = "lennard-jones")]
    Lj,
    /// Exponential-6 (Buckingham)
    #[value(alias = "buckingham")]
    Exp6,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Nonbonded {
    /// All pairs, bare Coulomb
    #[value(name = "no-cutoff")]
    NoCutoff,
    /// Cutoff with reaction field, open boundaries
    #[value(name = "cutoff")]
    CutoffNonPeriodic,
    /// Cutoff with reaction field, minimum image in the box
    #[value(name = "periodic")]
    CutoffPeriodic,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ConstraintPolicy {
    None,
    /// Bonds to hydrogen
    #[value(name = "h-bonds")]
    HBonds,
    #[value(name = "all-bonds")]
    AllBonds,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum HisStrategy {
    /// Always HID (Nδ protonated)
    Hid,
    /// Always HIE (Nε protonated)
    Hie,
    /// Random selection
    Random,
    /// H-bond network analysis
    Network,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Cation {
    Na,
    K,
    Mg,
    Ca,
    Li,
    Zn,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Anion {
    Cl,
    Br,
    I,
    F,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TrajectoryFormat {
    /// Multi-model PDB
    Pdb,
    /// CHARMM/NAMD binary DCD
    Dcd,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewMode {
    /// Per-frame table on stdout
    Summary,
    /// Self-contained NGL page
    Html,
    /// Table and page
    Both,
}

pub fn parse() -> Cli {
    Cli::parse()
}
