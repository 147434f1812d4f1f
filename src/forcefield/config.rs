//! Force-field configuration.
//!
//! A [`ForceFieldConfig`] is chosen once per run and never mutated. It names
//! the charge library preset, the functional forms of the DREIDING terms, the
//! nonbonded cutoff policy and the bond-constraint policy.

use crate::model::system::NonbondedMethod;
use ffcharge::{NucleicScheme, ProteinScheme, WaterScheme};
use serde::Deserialize;
use std::fmt;

/// Bond stretching potential function type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BondPotentialType {
    #[default]
    Harmonic,
    Morse,
}

/// Angle bending potential function type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnglePotentialType {
    /// Cosine-harmonic angle potential (DREIDING original).
    CosineHarmonic,
    #[default]
    ThetaHarmonic,
}

/// Van der Waals potential function type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VdwPotentialType {
    #[default]
    LennardJones,
    /// Exponential-6 (Buckingham) potential.
    Exponential6,
}

/// Which bonds are held rigid during dynamics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Constraints {
    None,
    /// Every bond with a hydrogen at either end.
    #[default]
    HBonds,
    AllBonds,
}

impl fmt::Display for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraints::None => write!(f, "none"),
            Constraints::HBonds => write!(f, "bonds to hydrogen"),
            Constraints::AllBonds => write!(f, "all bonds"),
        }
    }
}

/// Named charge library: protein and nucleic-acid residue charges plus a
/// water model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ForceFieldPreset {
    #[default]
    #[serde(rename = "amber-ffsb-tip3p-fb")]
    AmberFfsbTip3pFb,
    #[serde(rename = "amber-ffsb-tip3p")]
    AmberFfsbTip3p,
    #[serde(rename = "amber-ffsb-opc3")]
    AmberFfsbOpc3,
    #[serde(rename = "amber-ff03-tip3p")]
    AmberFf03Tip3p,
    #[serde(rename = "charmm-tip3p")]
    CharmmTip3p,
    #[serde(rename = "charmm-spce")]
    CharmmSpcE,
}

impl ForceFieldPreset {
    pub const ALL: [ForceFieldPreset; 6] = [
        ForceFieldPreset::AmberFfsbTip3pFb,
        ForceFieldPreset::AmberFfsbTip3p,
        ForceFieldPreset::AmberFfsbOpc3,
        ForceFieldPreset::AmberFf03Tip3p,
        ForceFieldPreset::CharmmTip3p,
        ForceFieldPreset::CharmmSpcE,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ForceFieldPreset::AmberFfsbTip3pFb => "amber-ffsb/tip3p-fb",
            ForceFieldPreset::AmberFfsbTip3p => "amber-ffsb/tip3p",
            ForceFieldPreset::AmberFfsbOpc3 => "amber-ffsb/opc3",
            ForceFieldPreset::AmberFf03Tip3p => "amber-ff03/tip3p",
            ForceFieldPreset::CharmmTip3p => "charmm/tip3p",
            ForceFieldPreset::CharmmSpcE => "charmm/spc-e",
        }
    }

    pub fn protein_scheme(&self) -> ProteinScheme {
        match self {
            ForceFieldPreset::AmberFfsbTip3pFb
            | ForceFieldPreset::AmberFfsbTip3p
            | ForceFieldPreset::AmberFfsbOpc3 => ProteinScheme::AmberFFSB,
            ForceFieldPreset::AmberFf03Tip3p => ProteinScheme::AmberFF03,
            ForceFieldPreset::CharmmTip3p | ForceFieldPreset::CharmmSpcE => ProteinScheme::Charmm,
        }
    }

    pub fn nucleic_scheme(&self) -> NucleicScheme {
        match self {
            ForceFieldPreset::CharmmTip3p | ForceFieldPreset::CharmmSpcE => NucleicScheme::Charmm,
            _ => NucleicScheme::Amber,
        }
    }

    pub fn water_scheme(&self) -> WaterScheme {
        match self {
            ForceFieldPreset::AmberFfsbTip3pFb => WaterScheme::Tip3pFb,
            ForceFieldPreset::AmberFfsbTip3p
            | ForceFieldPreset::AmberFf03Tip3p
            | ForceFieldPreset::CharmmTip3p => WaterScheme::Tip3p,
            ForceFieldPreset::AmberFfsbOpc3 => WaterScheme::Opc3,
            ForceFieldPreset::CharmmSpcE => WaterScheme::SpcE,
        }
    }
}

impl fmt::Display for ForceFieldPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Complete force-field selection for one run.
///
/// # Examples
///
/// ```
/// use dreid_md::{Constraints, ForceFieldConfig, ForceFieldPreset, NonbondedMethod};
///
/// let config = ForceFieldConfig {
///     preset: ForceFieldPreset::CharmmTip3p,
///     nonbonded_cutoff: 12.0,
///     constraints: Constraints::AllBonds,
///     ..Default::default()
/// };
/// assert_eq!(config.nonbonded_method, NonbondedMethod::CutoffPeriodic);
/// assert!(config.rigid_water);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct ForceFieldConfig {
    pub preset: ForceFieldPreset,
    pub bond_potential: BondPotentialType,
    pub angle_potential: AnglePotentialType,
    pub vdw_potential: VdwPotentialType,
    pub nonbonded_method: NonbondedMethod,
    /// Nonbonded cutoff in Å.
    pub nonbonded_cutoff: f64,
    pub reaction_field_dielectric: f64,
    pub constraints: Constraints,
    /// Keep water molecules fully rigid (O–H and H–H distances).
    pub rigid_water: bool,
    /// Custom atom typing rules (TOML text) for `dreid-typer`.
    #[serde(skip)]
    pub rules: Option<String>,
    /// Custom DREIDING parameter table (TOML text).
    #[serde(skip)]
    pub params: Option<String>,
}

impl Default for ForceFieldConfig {
    fn default() -> Self {
        Self {
            preset: ForceFieldPreset::default(),
            bond_potential: BondPotentialType::Harmonic,
            angle_potential: AnglePotentialType::ThetaHarmonic,
            vdw_potential: VdwPotentialType::LennardJones,
            nonbonded_method: NonbondedMethod::CutoffPeriodic,
            nonbonded_cutoff: 10.0,
            reaction_field_dielectric: 78.3,
            constraints: Constraints::HBonds,
            rigid_water: true,
            rules: None,
            params: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = ForceFieldConfig::default();
        assert_eq!(config.preset, ForceFieldPreset::AmberFfsbTip3pFb);
        assert_eq!(config.bond_potential, BondPotentialType::Harmonic);
        assert_eq!(config.angle_potential, AnglePotentialType::ThetaHarmonic);
        assert_eq!(config.vdw_potential, VdwPotentialType::LennardJones);
        assert_eq!(config.constraints, Constraints::HBonds);
        assert_eq!(config.nonbonded_cutoff, 10.0);
        assert!(config.rigid_water);
        assert!(config.rules.is_none());
        assert!(config.params.is_none());
    }

    #[test]
    fn deserializes_partial_table_with_defaults() {
        let config: ForceFieldConfig = toml::from_str(
            r#"
            preset = "charmm-tip3p"
            bond-potential = "morse"
            nonbonded-cutoff = 9.0
            constraints = "all-bonds"
            "#,
        )
        .expect("parse");
        assert_eq!(config.preset, ForceFieldPreset::CharmmTip3p);
        assert_eq!(config.bond_potential, BondPotentialType::Morse);
        assert_eq!(config.nonbonded_cutoff, 9.0);
        assert_eq!(config.constraints, Constraints::AllBonds);
        assert_eq!(config.vdw_potential, VdwPotentialType::LennardJones);
    }

    #[test]
    fn rejects_unknown_keys() {
        let result: Result<ForceFieldConfig, _> = toml::from_str("cutoff-radius = 8.0");
        assert!(result.is_err());
    }

    #[test]
    fn preset_names_are_distinct() {
        let mut names: Vec<_> = ForceFieldPreset::ALL.iter().map(|p| p.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ForceFieldPreset::ALL.len());
    }

    #[test]
    fn preset_scheme_mapping() {
        assert!(matches!(
            ForceFieldPreset::AmberFf03Tip3p.protein_scheme(),
            ProteinScheme::AmberFF03
        ));
        assert!(matches!(
            ForceFieldPreset::CharmmSpcE.water_scheme(),
            WaterScheme::SpcE
        ));
        assert!(matches!(
            ForceFieldPreset::CharmmTip3p.nucleic_scheme(),
            NucleicScheme::Charmm
        ));
    }
}
