use dreid_md::{
    AnglePotentialType, Anion as LibAnion, BondPotentialType, Cation as LibCation, Constraints,
    ElementPolicy, ForceFieldConfig, ForceFieldPreset, HisStrategy as LibHisStrategy,
    NonbondedMethod, TrajectoryFormat as LibTrajectoryFormat, VdwPotentialType,
};

use crate::cli;

impl From<cli::Preset> for ForceFieldPreset {
    fn from(p: cli::Preset) -> Self {
        match p {
            cli::Preset::AmberFfsbTip3pFb => Self::AmberFfsbTip3pFb,
            cli::Preset::AmberFfsbTip3p => Self::AmberFfsbTip3p,
            cli::Preset::AmberFfsbOpc3 => Self::AmberFfsbOpc3,
            cli::Preset::AmberFf03Tip3p => Self::AmberFf03Tip3p,
            cli::Preset::CharmmTip3p => Self::CharmmTip3p,
            cli::Preset::CharmmSpcE => Self::CharmmSpcE,
        }
    }
}

impl From<cli::BondPotential> for BondPotentialType {
    fn from(p: cli::BondPotential) -> Self {
        match p {
            cli::BondPotential::Harmonic => Self::Harmonic,
            cli::BondPotential::Morse => Self::Morse,
        }
    }
}

impl From<cli::AnglePotential> for AnglePotentialType {
    fn from(p: cli::AnglePotential) -> Self {
        match p {
            cli::AnglePotential::Cosine => Self::CosineHarmonic,
            cli::AnglePotential::ThetaHarmonic => Self::ThetaHarmonic,
        }
    }
}

impl From<cli::VdwPotential> for VdwPotentialType {
    fn from(p: cli::VdwPotential) -> Self {
        match p {
            cli::VdwPotential::Lj => Self::LennardJones,
            cli::VdwPotential::Exp6 => Self::Exponential6,
        }
    }
}

impl From<cli::Nonbonded> for NonbondedMethod {
    fn from(m: cli::Nonbonded) -> Self {
        match m {
            cli::Nonbonded::NoCutoff => Self::NoCutoff,
            cli::Nonbonded::CutoffNonPeriodic => Self::CutoffNonPeriodic,
            cli::Nonbonded::CutoffPeriodic => Self::CutoffPeriodic,
        }
    }
}

impl From<cli::ConstraintPolicy> for Constraints {
    fn from(c: cli::ConstraintPolicy) -> Self {
        match c {
            cli::ConstraintPolicy::None => Self::None,
            cli::ConstraintPolicy::HBonds => Self::HBonds,
            cli::ConstraintPolicy::AllBonds => Self::AllBonds,
        }
    }
}

impl From<cli::HisStrategy> for LibHisStrategy {
    fn from(s: cli::HisStrategy) -> Self {
        match s {
            cli::HisStrategy::Hid => Self::Hid,
            cli::HisStrategy::Hie => Self::Hie,
            cli::HisStrategy::Random => Self::Random,
            cli::HisStrategy::Network => Self::Network,
        }
    }
}

impl From<cli::Cation> for LibCation {
    fn from(c: cli::Cation) -> Self {
        match c {
            cli::Cation::Na => Self::Na,
            cli::Cation::K => Self::K,
            cli::Cation::Mg => Self::Mg,
            cli::Cation::Ca => Self::Ca,
            cli::Cation::Li => Self::Li,
            cli::Cation::Zn => Self::Zn,
        }
    }
}

impl From<cli::Anion> for LibAnion {
    fn from(a: cli::Anion) -> Self {
        match a {
            cli::Anion::Cl => Self::Cl,
            cli::Anion::Br => Self::Br,
            cli::Anion::I => Self::I,
            cli::Anion::F => Self::F,
        }
    }
}

impl From<cli::TrajectoryFormat> for LibTrajectoryFormat {
    fn from(f: cli::TrajectoryFormat) -> Self {
        match f {
            cli::TrajectoryFormat::Pdb => Self::Pdb,
            cli::TrajectoryFormat::Dcd => Self::Dcd,
        }
    }
}

pub fn element_policy(no_infer: bool) -> ElementPolicy {
    if no_infer {
        ElementPolicy::Keep
    } else {
        ElementPolicy::InferMissing
    }
}

pub fn potential_display_names(
    config: &ForceFieldConfig,
) -> (&'static str, &'static str, &'static str) {
    let bond = match config.bond_potential {
        BondPotentialType::Harmonic => "Harmonic",
        BondPotentialType::Morse => "Morse",
    };
    let angle = match config.angle_potential {
        AnglePotentialType::CosineHarmonic => "Cosine",
        AnglePotentialType::ThetaHarmonic => "θ-Harm",
    };
    let vdw = match config.vdw_potential {
        VdwPotentialType::LennardJones => "LJ 12-6",
        VdwPotentialType::Exponential6 => "Exp-6",
    };
    (bond, angle, vdw)
}

pub fn his_display_name(strategy: LibHisStrategy) -> &'static str {
    match strategy {
        LibHisStrategy::Network => "network analysis",
        LibHisStrategy::Hid => "HID",
        LibHisStrategy::Hie => "HIE",
        LibHisStrategy::Random => "random",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonbonded_names_map_to_methods() {
        assert_eq!(
            NonbondedMethod::from(cli::Nonbonded::CutoffPeriodic),
            NonbondedMethod::CutoffPeriodic
        );
        assert_eq!(
            NonbondedMethod::from(cli::Nonbonded::NoCutoff),
            NonbondedMethod::NoCutoff
        );
    }

    #[test]
    fn display_names_follow_config() {
        let config = ForceFieldConfig {
            bond_potential: BondPotentialType::Morse,
            vdw_potential: VdwPotentialType::Exponential6,
            ..Default::default()
        };
        assert_eq!(potential_display_names(&config), ("Morse", "θ-Harm", "Exp-6"));
    }

    #[test]
    fn element_policy_from_flag() {
        assert_eq!(element_policy(true), ElementPolicy::Keep);
        assert_eq!(element_policy(false), ElementPolicy::InferMissing);
    }
}
