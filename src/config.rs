//! Pipeline configuration files.
//!
//! A single TOML document describes one run. Structures are listed once in a
//! `[structures]` catalog and selected by name, so switching inputs never
//! means commenting lines in and out:
//!
//! ```toml
//! structure = "lysozyme"
//!
//! [structures]
//! lysozyme = "inputs/1aki.pdb"
//! ubiquitin = "inputs/1ubq.cif"
//!
//! [forcefield]
//! preset = "charmm-tip3p"
//!
//! [run]
//! temperature = 310.0
//! duration = 400.0
//! ```
//!
//! Relative paths are resolved against the directory of the config file.

use crate::builder::BuildConfig;
use crate::error::Error;
use crate::forcefield::ForceFieldConfig;
use crate::runner::{MinimizationSettings, RunParameters};
use crate::trajectory::TrajectoryFormat;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Dynamics settings as written in a config file.
///
/// Unlike [`RunParameters`] the run length is a duration; the step count is
/// derived when the parameters are built.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct RunSettings {
    /// K
    pub temperature: f64,
    /// 1/ps
    pub friction: f64,
    /// ps
    pub timestep: f64,
    /// Simulated time in ps.
    pub duration: f64,
    /// Exact step count; takes precedence over `duration`.
    pub steps: Option<u64>,
    pub record_interval: u64,
    /// Fixed seed for reproducible runs; drawn at random when absent.
    pub seed: Option<u64>,
    /// kcal/mol/Å
    pub minimize_tolerance: f64,
    pub minimize_max_iterations: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        let minimization = MinimizationSettings::default();
        Self {
            temperature: 300.0,
            friction: 1.0,
            timestep: 0.002,
            duration: 10.0,
            steps: None,
            record_interval: 500,
            seed: None,
            minimize_tolerance: minimization.tolerance,
            minimize_max_iterations: minimization.max_iterations,
        }
    }
}

impl RunSettings {
    /// Builds validated, immutable run parameters.
    ///
    /// When no seed is configured one is drawn from the thread RNG and logged
    /// so the run can be repeated.
    pub fn to_parameters(&self) -> Result<RunParameters, Error> {
        let params = match self.steps {
            Some(steps) => RunParameters::new(
                self.temperature,
                self.friction,
                self.timestep,
                steps,
                self.record_interval,
            )?,
            None => RunParameters::from_duration(
                self.duration,
                self.timestep,
                self.temperature,
                self.friction,
                self.record_interval,
            )?,
        };

        if self.minimize_max_iterations == 0 {
            return Err(Error::invalid_parameters(
                "minimize-max-iterations must be at least 1",
            ));
        }
        if !(self.minimize_tolerance.is_finite() && self.minimize_tolerance > 0.0) {
            return Err(Error::invalid_parameters(format!(
                "minimize-tolerance must be positive, got {}",
                self.minimize_tolerance
            )));
        }

        let seed = self.seed.unwrap_or_else(|| {
            let seed = rand::random::<u64>();
            log::info!("no seed configured, using random seed {seed}");
            seed
        });

        Ok(params
            .with_seed(seed)
            .with_minimization(MinimizationSettings {
                tolerance: self.minimize_tolerance,
                max_iterations: self.minimize_max_iterations,
            }))
    }
}

/// Where and how results are written.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub format: TrajectoryFormat,
    /// Save the prepared system as a PDB beside the trajectory.
    pub write_topology: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            format: TrajectoryFormat::Pdb,
            write_topology: true,
        }
    }
}

/// One complete run description.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct PipelineConfig {
    /// Catalog key of the structure to simulate.
    pub structure: Option<String>,
    pub structures: BTreeMap<String, PathBuf>,
    /// Custom DREIDING parameter table.
    pub params_file: Option<PathBuf>,
    /// Custom atom typing rules.
    pub rules_file: Option<PathBuf>,
    pub forcefield: ForceFieldConfig,
    pub build: BuildConfig,
    pub run: RunSettings,
    pub output: OutputConfig,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reads a config file; relative paths inside it resolve against its
    /// directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read '{}': {e}", path.display())))?;
        let mut config: Self = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        log::debug!(
            "loaded config '{}' with {} catalog entries",
            path.display(),
            config.structures.len()
        );
        Ok(config)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Picks the input structure.
    ///
    /// An explicit path wins, then a catalog name given by the caller, then
    /// the file's own `structure` selector.
    pub fn input_path(&self, explicit: Option<&Path>, name: Option<&str>) -> Result<PathBuf, Error> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        let name = name.or(self.structure.as_deref()).ok_or_else(|| {
            Error::Config("no input structure given and no `structure` selected".to_string())
        })?;
        let path = self.structures.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.structures.keys().map(String::as_str).collect();
            Error::Config(format!(
                "structure '{name}' is not in the catalog (known: {})",
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            ))
        })?;
        Ok(self.resolve(path))
    }

    pub fn output_directory(&self) -> PathBuf {
        self.resolve(&self.output.directory)
    }

    /// The force field settings with any custom parameter and rule files
    /// read in.
    pub fn forcefield_config(&self) -> Result<ForceFieldConfig, Error> {
        let read = |path: &PathBuf| {
            let path = self.resolve(path);
            fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("cannot read '{}': {e}", path.display())))
        };
        let mut config = self.forcefield.clone();
        if let Some(path) = &self.params_file {
            config.params = Some(read(path)?);
        }
        if let Some(path) = &self.rules_file {
            config.rules = Some(read(path)?);
        }
        Ok(config)
    }
}
