//! Classical partial charges from residue libraries.
//!
//! Protein and nucleic-acid atoms are looked up by residue name, atom name
//! and chain position; waters use the preset's water model; monatomic ions
//! carry their formal charge. Anything else has no template.

use super::config::ForceFieldPreset;
use super::intermediate::IntermediateSystem;
use crate::error::ForceFieldMismatchError;
use crate::model::metadata::{AtomResidueInfo, BioMetadata, ResidueCategory, ResiduePosition};
use ffcharge::{IonScheme, Position as FfPosition};

/// pH above which the N-terminal amine is neutral (NH₂).
const N_TERMINAL_PKA: f64 = 8.0;
/// pH below which the C-terminal carboxyl is protonated (COOH).
const C_TERMINAL_PKA: f64 = 3.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AtomClass {
    Protein,
    NucleicAcid,
    Water,
    Ion,
    Unsupported,
}

fn classify_atom(info: &AtomResidueInfo) -> AtomClass {
    match (info.category, info.standard_name) {
        (ResidueCategory::Ion, _) => AtomClass::Ion,
        (_, Some(std)) if std.is_water() => AtomClass::Water,
        (_, Some(std)) if std.is_amino_acid() => AtomClass::Protein,
        (_, Some(std)) if std.is_nucleotide() => AtomClass::NucleicAcid,
        _ => AtomClass::Unsupported,
    }
}

/// Assigns a partial charge to every atom of `system`.
pub fn assign_charges(
    system: &mut IntermediateSystem,
    metadata: &BioMetadata,
    preset: ForceFieldPreset,
    ph: f64,
) -> Result<(), ForceFieldMismatchError> {
    if metadata.atom_info.len() != system.atoms.len() {
        return Err(ForceFieldMismatchError::AtomTyping(format!(
            "residue annotations cover {} of {} atoms",
            metadata.atom_info.len(),
            system.atoms.len()
        )));
    }

    for (atom, info) in system.atoms.iter_mut().zip(&metadata.atom_info) {
        atom.charge = match classify_atom(info) {
            AtomClass::Protein => lookup_protein_charge(preset, info, ph)?,
            AtomClass::NucleicAcid => lookup_nucleic_charge(preset, info)?,
            AtomClass::Water => lookup_water_charge(preset, info)?,
            AtomClass::Ion => lookup_ion_charge(preset, info)?,
            AtomClass::Unsupported => return Err(unknown_residue(preset, info)),
        };
    }

    let total: f64 = system.atoms.iter().map(|a| a.charge).sum();
    log::debug!("assigned {} charges (net {:+.3} e)", system.atoms.len(), total);
    Ok(())
}

fn map_residue_position(position: ResiduePosition, ph: f64) -> FfPosition {
    match position {
        ResiduePosition::NTerminal if ph < N_TERMINAL_PKA => FfPosition::NTerminal,
        ResiduePosition::NTerminal => FfPosition::NTerminalDeprotonated,
        ResiduePosition::CTerminal if ph < C_TERMINAL_PKA => FfPosition::CTerminalProtonated,
        ResiduePosition::CTerminal => FfPosition::CTerminal,
        ResiduePosition::FivePrime => FfPosition::FivePrime,
        ResiduePosition::ThreePrime => FfPosition::ThreePrime,
        ResiduePosition::Internal | ResiduePosition::None => FfPosition::Middle,
    }
}

fn lookup_protein_charge(
    preset: ForceFieldPreset,
    info: &AtomResidueInfo,
    ph: f64,
) -> Result<f64, ForceFieldMismatchError> {
    let position = map_residue_position(info.position, ph);
    preset
        .protein_scheme()
        .charge(position, &info.residue_name, &info.atom_name)
        .map(f64::from)
        .ok_or_else(|| unknown_atom(preset, info))
}

fn lookup_nucleic_charge(
    preset: ForceFieldPreset,
    info: &AtomResidueInfo,
) -> Result<f64, ForceFieldMismatchError> {
    // Terminal protonation only applies to amino acids.
    let position = map_residue_position(info.position, 7.0);
    preset
        .nucleic_scheme()
        .charge(position, &info.residue_name, &info.atom_name)
        .map(f64::from)
        .ok_or_else(|| unknown_atom(preset, info))
}

fn lookup_water_charge(
    preset: ForceFieldPreset,
    info: &AtomResidueInfo,
) -> Result<f64, ForceFieldMismatchError> {
    let charges = preset
        .water_scheme()
        .charges()
        .ok_or_else(|| unknown_residue(preset, info))?;
    let charge = match info.atom_name.as_str() {
        "O" => charges.o,
        "H1" => charges.h1,
        "H2" => charges.h2,
        _ => return Err(unknown_atom(preset, info)),
    };
    Ok(f64::from(charge))
}

fn lookup_ion_charge(
    preset: ForceFieldPreset,
    info: &AtomResidueInfo,
) -> Result<f64, ForceFieldMismatchError> {
    IonScheme::Classic
        .charge(&info.residue_name)
        .map(f64::from)
        .ok_or_else(|| unknown_residue(preset, info))
}

pub(crate) fn unknown_residue(
    preset: ForceFieldPreset,
    info: &AtomResidueInfo,
) -> ForceFieldMismatchError {
    ForceFieldMismatchError::UnknownResidue {
        force_field: preset.name().to_string(),
        residue_name: info.residue_name.clone(),
        residue_id: info.residue_id,
        chain_id: info.chain_id,
    }
}

fn unknown_atom(preset: ForceFieldPreset, info: &AtomResidueInfo) -> ForceFieldMismatchError {
    ForceFieldMismatchError::UnknownAtom {
        force_field: preset.name().to_string(),
        atom_name: info.atom_name.clone(),
        residue_name: info.residue_name.clone(),
        residue_id: info.residue_id,
        chain_id: info.chain_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forcefield::intermediate::IntermediateAtom;
    use crate::model::metadata::StandardResidue;
    use crate::model::types::Element;

    fn system_of(elements: &[Element]) -> IntermediateSystem {
        IntermediateSystem {
            atoms: elements.iter().map(|&e| IntermediateAtom::new(e)).collect(),
            bonds: Vec::new(),
            angles: Vec::new(),
            dihedrals: Vec::new(),
            impropers: Vec::new(),
        }
    }

    fn water_info(atom: &str) -> AtomResidueInfo {
        AtomResidueInfo::builder(atom, "HOH", 1, 'W')
            .standard_name(Some(StandardResidue::HOH))
            .category(ResidueCategory::Standard)
            .build()
    }

    #[test]
    fn water_model_charges_are_neutral() {
        let mut sys = system_of(&[Element::O, Element::H, Element::H]);
        let metadata = BioMetadata {
            atom_info: vec![water_info("O"), water_info("H1"), water_info("H2")],
        };
        assign_charges(&mut sys, &metadata, ForceFieldPreset::AmberFfsbTip3p, 7.0).unwrap();
        let total: f64 = sys.atoms.iter().map(|a| a.charge).sum();
        assert!(total.abs() < 1e-4);
        assert!(sys.atoms[0].charge < 0.0);
        assert!(sys.atoms[1].charge > 0.0);
    }

    #[test]
    fn unexpected_water_atom_name_is_unknown_atom() {
        let mut sys = system_of(&[Element::O]);
        let metadata = BioMetadata {
            atom_info: vec![water_info("OW")],
        };
        let err = assign_charges(&mut sys, &metadata, ForceFieldPreset::default(), 7.0)
            .unwrap_err();
        assert!(matches!(err, ForceFieldMismatchError::UnknownAtom { ref atom_name, .. } if atom_name == "OW"));
    }

    #[test]
    fn sodium_ion_carries_unit_charge() {
        let mut sys = system_of(&[Element::Na]);
        let metadata = BioMetadata {
            atom_info: vec![
                AtomResidueInfo::builder("NA", "NA", 1, 'I')
                    .category(ResidueCategory::Ion)
                    .build(),
            ],
        };
        assign_charges(&mut sys, &metadata, ForceFieldPreset::default(), 7.0).unwrap();
        assert!((sys.atoms[0].charge - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ligand_has_no_template() {
        let mut sys = system_of(&[Element::C]);
        let metadata = BioMetadata {
            atom_info: vec![AtomResidueInfo::builder("C1", "LIG", 301, 'A').build()],
        };
        let err = assign_charges(&mut sys, &metadata, ForceFieldPreset::default(), 7.0)
            .unwrap_err();
        match err {
            ForceFieldMismatchError::UnknownResidue {
                residue_name,
                residue_id,
                chain_id,
                force_field,
            } => {
                assert_eq!(residue_name, "LIG");
                assert_eq!(residue_id, 301);
                assert_eq!(chain_id, 'A');
                assert_eq!(force_field, "amber-ffsb/tip3p-fb");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn terminal_positions_follow_ph() {
        assert_eq!(
            map_residue_position(ResiduePosition::NTerminal, 7.0),
            FfPosition::NTerminal
        );
        assert_eq!(
            map_residue_position(ResiduePosition::NTerminal, 9.0),
            FfPosition::NTerminalDeprotonated
        );
        assert_eq!(
            map_residue_position(ResiduePosition::CTerminal, 7.0),
            FfPosition::CTerminal
        );
        assert_eq!(
            map_residue_position(ResiduePosition::CTerminal, 2.0),
            FfPosition::CTerminalProtonated
        );
        assert_eq!(
            map_residue_position(ResiduePosition::Internal, 7.0),
            FfPosition::Middle
        );
    }

    #[test]
    fn mismatched_metadata_length_is_rejected() {
        let mut sys = system_of(&[Element::O, Element::H]);
        let metadata = BioMetadata {
            atom_info: vec![water_info("O")],
        };
        assert!(assign_charges(&mut sys, &metadata, ForceFieldPreset::default(), 7.0).is_err());
    }
}
