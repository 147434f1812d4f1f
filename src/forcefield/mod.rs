//! DREIDING parameterization of prepared biomolecular structures.
//!
//! [`parameterize`] turns a protonated, bonded [`Structure`] into a
//! [`SimulationSystem`]:
//!
//! 1. load the parameter table (embedded or user supplied),
//! 2. assign DREIDING atom types and enumerate internal coordinates,
//! 3. assign classical partial charges from the preset's residue library,
//! 4. generate potentials, constraints and exclusions.
//!
//! [`check_coverage`] rejects residues the preset cannot charge before any
//! expensive preparation work is done.

mod charge;
mod config;
mod intermediate;
mod paramgen;
mod params;
mod typer;

pub use config::{
    AnglePotentialType, BondPotentialType, Constraints, ForceFieldConfig, ForceFieldPreset,
    VdwPotentialType,
};

use crate::error::ForceFieldMismatchError;
use crate::model::metadata::ResidueCategory;
use crate::model::structure::Structure;
use crate::model::system::SimulationSystem;
use ffcharge::IonScheme;

/// Verifies every residue of `structure` has a charge template in `preset`.
///
/// Standard amino acids, nucleotides and water are always covered; ions are
/// covered when the ion library knows their residue name. Everything else
/// (ligands, cofactors, modified residues) is rejected.
pub fn check_coverage(
    structure: &Structure,
    preset: ForceFieldPreset,
) -> Result<(), ForceFieldMismatchError> {
    for residue in structure.residues() {
        let info = residue.info;
        let covered = match (info.category, info.standard_name) {
            (ResidueCategory::Ion, _) => IonScheme::Classic.charge(&info.residue_name).is_some(),
            (_, Some(std)) => std.is_amino_acid() || std.is_nucleotide() || std.is_water(),
            (_, None) => false,
        };
        if !covered {
            return Err(charge::unknown_residue(preset, info));
        }
    }
    Ok(())
}

/// Parameterizes a prepared structure. `ph` selects terminal protonation
/// states when looking up charges.
pub fn parameterize(
    structure: Structure,
    config: &ForceFieldConfig,
    ph: f64,
) -> Result<SimulationSystem, ForceFieldMismatchError> {
    let ff_params = params::load_parameters(config.params.as_deref())?;

    let mut intermediate = intermediate::IntermediateSystem::from_structure(&structure)?;

    typer::assign_atom_types(&mut intermediate, config.rules.as_deref())?;

    charge::assign_charges(&mut intermediate, &structure.metadata, config.preset, ph)?;

    paramgen::generate_parameters(structure, &intermediate, &ff_params, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::metadata::{AtomResidueInfo, StandardResidue};
    use crate::model::structure::Atom;
    use crate::model::types::Element;

    fn push(structure: &mut Structure, element: Element, info: AtomResidueInfo) {
        structure.push_atom(Atom::new(element, [0.0; 3]), info);
    }

    #[test]
    fn coverage_accepts_protein_water_and_known_ions() {
        let mut s = Structure::new();
        push(
            &mut s,
            Element::C,
            AtomResidueInfo::builder("CA", "ALA", 1, 'A')
                .standard_name(Some(StandardResidue::ALA))
                .category(ResidueCategory::Standard)
                .build(),
        );
        push(
            &mut s,
            Element::O,
            AtomResidueInfo::builder("O", "HOH", 2, 'W')
                .standard_name(Some(StandardResidue::HOH))
                .category(ResidueCategory::Standard)
                .build(),
        );
        push(
            &mut s,
            Element::Cl,
            AtomResidueInfo::builder("CL", "CL", 3, 'I')
                .category(ResidueCategory::Ion)
                .build(),
        );
        assert!(check_coverage(&s, ForceFieldPreset::default()).is_ok());
    }

    #[test]
    fn coverage_rejects_ligands() {
        let mut s = Structure::new();
        push(
            &mut s,
            Element::C,
            AtomResidueInfo::builder("C1", "HEM", 154, 'A').build(),
        );
        let err = check_coverage(&s, ForceFieldPreset::CharmmTip3p).unwrap_err();
        assert_eq!(
            err.to_string(),
            "force field 'charmm/tip3p' has no template for residue HEM 154 (chain A)"
        );
    }

    #[test]
    fn parameterizes_a_single_water() {
        let mut s = Structure::new();
        for (name, element, pos) in [
            ("O", Element::O, [0.0, 0.0, 0.0]),
            ("H1", Element::H, [0.96, 0.0, 0.0]),
            ("H2", Element::H, [-0.24, 0.93, 0.0]),
        ] {
            s.push_atom(
                Atom::new(element, pos),
                AtomResidueInfo::builder(name, "HOH", 1, 'W')
                    .standard_name(Some(StandardResidue::HOH))
                    .category(ResidueCategory::Standard)
                    .build(),
            );
        }
        s.bonds.push(crate::model::structure::Bond::new(
            0,
            1,
            crate::model::types::BondOrder::Single,
        ));
        s.bonds.push(crate::model::structure::Bond::new(
            0,
            2,
            crate::model::types::BondOrder::Single,
        ));

        let sys = parameterize(s, &ForceFieldConfig::default(), 7.0).unwrap();
        assert_eq!(sys.atom_count(), 3);
        assert_eq!(sys.constraints.len(), 3);
        assert!(sys.total_charge().abs() < 1e-4);
        assert_eq!(sys.force_field, "amber-ffsb/tip3p-fb");
    }
}
