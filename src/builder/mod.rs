//! System Builder: from a loaded [`Structure`] to a [`SimulationSystem`].
//!
//! Preparation (cleanup, repair, protonation, solvation and bond perception)
//! is delegated to `bio-forge`; parameterization to [`crate::forcefield`].
//! The whole stage is atomic: it either returns a complete system or an
//! error, and never touches the input structure.

use crate::error::Error;
use crate::forcefield::{self, ForceFieldConfig};
use crate::io::util;
use crate::model::structure::Structure;
use crate::model::system::SimulationSystem;
use bio_forge as bf;
use serde::Deserialize;
use std::collections::HashSet;

/// Histidine tautomer selection during protonation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HisStrategy {
    /// Choose per residue from the local hydrogen-bond network.
    #[default]
    Network,
    Hid,
    Hie,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cation {
    Na,
    K,
    Mg,
    Ca,
    Li,
    Zn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anion {
    Cl,
    Br,
    I,
    F,
}

/// Explicit-solvent box settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct SolvationConfig {
    /// Disable for a vacuum system.
    pub enabled: bool,
    /// Minimum distance in Å between the solute and the box faces.
    pub padding: f64,
    pub water_spacing: f64,
    /// Waters closer than this to any solute atom are discarded.
    pub vdw_cutoff: f64,
    pub cations: Vec<Cation>,
    pub anions: Vec<Anion>,
    /// Net charge the counter-ions neutralize towards.
    pub target_charge: i32,
    pub seed: Option<u64>,
}

impl Default for SolvationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            padding: 10.0,
            water_spacing: 3.1,
            vdw_cutoff: 2.4,
            cations: vec![Cation::Na],
            anions: vec![Anion::Cl],
            target_charge: 0,
            seed: None,
        }
    }
}

/// Structural preparation applied before parameterization.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// pH used for protonation and terminal charge states.
    pub ph: f64,
    pub his_strategy: HisStrategy,
    pub remove_ions: bool,
    pub remove_hetero: bool,
    /// Residue names dropped during cleanup (e.g. crystallization agents).
    pub remove_residues: Vec<String>,
    pub disulfide_cutoff: f64,
    pub solvation: SolvationConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            ph: 7.0,
            his_strategy: HisStrategy::Network,
            remove_ions: false,
            remove_hetero: false,
            remove_residues: Vec::new(),
            disulfide_cutoff: 2.2,
            solvation: SolvationConfig::default(),
        }
    }
}

/// Builds a simulatable system from `structure`.
///
/// Pre-existing solvent is always removed. Residues the force field cannot
/// charge are rejected right after cleanup, before protonation or
/// solvation run.
///
/// # Errors
///
/// - [`Error::ForceFieldMismatch`] for residues or atoms without parameters.
/// - [`Error::Preparation`] when `bio-forge` cannot repair, protonate,
///   solvate or bond the structure.
/// - [`Error::InvalidParameters`] when the nonbonded policy does not fit the
///   prepared system (periodic cutoff without an orthorhombic box, cutoff
///   longer than half the box).
pub fn build_system(
    structure: &Structure,
    forcefield: &ForceFieldConfig,
    config: &BuildConfig,
) -> Result<SimulationSystem, Error> {
    let mut bio = util::to_bio_structure(structure).map_err(preparation)?;

    bf::ops::clean_structure(&mut bio, &to_bf_clean_config(config))?;
    let cleaned = util::from_bio_structure(&bio).map_err(preparation)?;
    log::info!(
        "removed solvent: {} -> {} atoms",
        structure.atom_count(),
        cleaned.atom_count()
    );
    forcefield::check_coverage(&cleaned, forcefield.preset)?;

    bf::ops::repair_structure(&mut bio)?;
    bf::ops::add_hydrogens(&mut bio, &to_bf_hydro_config(config))?;

    if config.solvation.enabled {
        bf::ops::solvate_structure(&mut bio, &to_bf_solvate_config(&config.solvation))?;
    }

    let topology = bf::ops::TopologyBuilder::new()
        .disulfide_cutoff(config.disulfide_cutoff)
        .build(bio)?;
    let prepared = util::from_bio_topology(&topology).map_err(preparation)?;
    log::info!(
        "prepared system: {} atoms, {} bonds, {} waters, {} ions",
        prepared.atom_count(),
        prepared.bond_count(),
        prepared.water_count(),
        prepared.ion_count()
    );

    check_nonbonded(&prepared, forcefield)?;

    let system = forcefield::parameterize(prepared, forcefield, config.ph)?;
    log::info!(
        "parameterized with {} ({} atom types, net charge {:+.3} e)",
        system.force_field,
        system.atom_types.len(),
        system.total_charge()
    );
    Ok(system)
}

fn preparation(e: util::ConversionError) -> Error {
    Error::Preparation(e.to_string())
}

/// Periodic cutoffs need an orthorhombic box at least twice the cutoff.
fn check_nonbonded(structure: &Structure, forcefield: &ForceFieldConfig) -> Result<(), Error> {
    let method = forcefield.nonbonded_method;
    if method.uses_cutoff() && forcefield.nonbonded_cutoff <= 0.0 {
        return Err(Error::invalid_parameters(format!(
            "nonbonded cutoff must be positive, got {} Å",
            forcefield.nonbonded_cutoff
        )));
    }
    if !method.is_periodic() {
        return Ok(());
    }

    let edges = match (structure.box_vectors, structure.orthorhombic_box()) {
        (None, _) => {
            return Err(Error::invalid_parameters(
                "periodic nonbonded method requires a periodic box; enable solvation or choose a non-periodic method",
            ));
        }
        (Some(_), None) => {
            return Err(Error::invalid_parameters(
                "only orthorhombic periodic boxes are supported",
            ));
        }
        (Some(_), Some(edges)) => edges,
    };

    let shortest = edges.iter().copied().fold(f64::INFINITY, f64::min);
    if 2.0 * forcefield.nonbonded_cutoff > shortest {
        return Err(Error::invalid_parameters(format!(
            "nonbonded cutoff {} Å exceeds half the shortest box edge ({:.2} Å)",
            forcefield.nonbonded_cutoff, shortest
        )));
    }
    Ok(())
}

fn to_bf_clean_config(config: &BuildConfig) -> bf::ops::CleanConfig {
    bf::ops::CleanConfig {
        remove_water: true,
        remove_ions: config.remove_ions,
        remove_hydrogens: false,
        remove_hetero: config.remove_hetero,
        remove_residue_names: config.remove_residues.iter().cloned().collect(),
        keep_residue_names: HashSet::new(),
    }
}

fn to_bf_hydro_config(config: &BuildConfig) -> bf::ops::HydroConfig {
    bf::ops::HydroConfig {
        target_ph: Some(config.ph),
        remove_existing_h: true,
        his_strategy: match config.his_strategy {
            HisStrategy::Hid => bf::ops::HisStrategy::DirectHID,
            HisStrategy::Hie => bf::ops::HisStrategy::DirectHIE,
            HisStrategy::Random => bf::ops::HisStrategy::Random,
            HisStrategy::Network => bf::ops::HisStrategy::HbNetwork,
        },
    }
}

fn to_bf_solvate_config(config: &SolvationConfig) -> bf::ops::SolvateConfig {
    bf::ops::SolvateConfig {
        margin: config.padding,
        water_spacing: config.water_spacing,
        vdw_cutoff: config.vdw_cutoff,
        remove_existing: true,
        cations: config.cations.iter().map(|&c| to_bf_cation(c)).collect(),
        anions: config.anions.iter().map(|&a| to_bf_anion(a)).collect(),
        target_charge: config.target_charge,
        rng_seed: config.seed,
    }
}

fn to_bf_cation(cation: Cation) -> bf::ops::Cation {
    match cation {
        Cation::Na => bf::ops::Cation::Na,
        Cation::K => bf::ops::Cation::K,
        Cation::Mg => bf::ops::Cation::Mg,
        Cation::Ca => bf::ops::Cation::Ca,
        Cation::Li => bf::ops::Cation::Li,
        Cation::Zn => bf::ops::Cation::Zn,
    }
}

fn to_bf_anion(anion: Anion) -> bf::ops::Anion {
    match anion {
        Anion::Cl => bf::ops::Anion::Cl,
        Anion::Br => bf::ops::Anion::Br,
        Anion::I => bf::ops::Anion::I,
        Anion::F => bf::ops::Anion::F,
    }
}
