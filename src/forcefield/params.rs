use super::intermediate::Hybridization;
use crate::error::ForceFieldMismatchError;
use crate::model::types::Element;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

const DEFAULT_PARAMS_TOML: &str = include_str!("../../resources/dreiding.params.toml");

static DEFAULT_PARAMS: OnceLock<ForceFieldParams> = OnceLock::new();

#[derive(Debug, Clone, Deserialize)]
pub struct ForceFieldParams {
    #[serde(default)]
    pub global: GlobalParams,
    #[serde(default)]
    pub atoms: HashMap<String, AtomTypeParams>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalParams {
    #[serde(default = "default_bond_k")]
    pub bond_k: f64,
    #[serde(default = "default_bond_d")]
    pub bond_d: f64,
    #[serde(default = "default_angle_k")]
    pub angle_k: f64,
    #[serde(default = "default_inversion_k")]
    pub inversion_k: f64,
    #[serde(default = "default_bond_delta")]
    pub bond_delta: f64,
}

fn default_bond_k() -> f64 {
    700.0
}
fn default_bond_d() -> f64 {
    70.0
}
fn default_angle_k() -> f64 {
    100.0
}
fn default_inversion_k() -> f64 {
    40.0
}
fn default_bond_delta() -> f64 {
    0.01
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self {
            bond_k: default_bond_k(),
            bond_d: default_bond_d(),
            angle_k: default_angle_k(),
            inversion_k: default_inversion_k(),
            bond_delta: default_bond_delta(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AtomTypeParams {
    pub bond_radius: f64,
    /// Natural bond angle in degrees.
    pub bond_angle: f64,
    pub vdw_r0: f64,
    pub vdw_d0: f64,
    #[serde(default = "default_vdw_zeta")]
    pub vdw_zeta: f64,
}

fn default_vdw_zeta() -> f64 {
    12.0
}

impl ForceFieldParams {
    /// Parameters for `atom_type`, falling back to the element's own entry
    /// (`Na`, `I_`, ...) for monatomic species the typer names differently.
    pub fn atom(&self, atom_type: &str, element: Element) -> Option<&AtomTypeParams> {
        self.atoms.get(atom_type).or_else(|| {
            let symbol = element.symbol();
            self.atoms
                .get(symbol)
                .or_else(|| self.atoms.get(&format!("{symbol}_")))
        })
    }
}

pub fn load_parameters(custom_toml: Option<&str>) -> Result<ForceFieldParams, ForceFieldMismatchError> {
    match custom_toml {
        Some(toml) => Ok(toml::from_str(toml)?),
        None => Ok(get_default_parameters().clone()),
    }
}

pub fn get_default_parameters() -> &'static ForceFieldParams {
    DEFAULT_PARAMS.get_or_init(|| {
        toml::from_str(DEFAULT_PARAMS_TOML)
            .expect("embedded DREIDING parameter table must parse")
    })
}

/// Torsion term for one dihedral. `phase` is in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorsionParams {
    pub v_barrier: f64,
    pub periodicity: u32,
    pub phase: f64,
}

impl TorsionParams {
    fn new(v_barrier: f64, periodicity: u32, phase_deg: f64) -> Self {
        Self {
            v_barrier,
            periodicity,
            phase: phase_deg.to_radians(),
        }
    }
}

/// DREIDING torsion rules keyed on the hybridization of the central bond
/// `j-k`. `i_hyb` distinguishes the conjugated sp3–sp2 case.
pub fn get_torsion_params(
    j_hyb: Hybridization,
    k_hyb: Hybridization,
    j_is_oxygen_column: bool,
    k_is_oxygen_column: bool,
    i_hyb: Hybridization,
) -> Option<TorsionParams> {
    use Hybridization::{Resonant, SP2, SP3};

    match (j_hyb, k_hyb) {
        (SP3, SP3) if j_is_oxygen_column && k_is_oxygen_column => {
            Some(TorsionParams::new(2.0, 2, 90.0))
        }
        (SP3, SP3) => Some(TorsionParams::new(2.0, 3, 180.0)),
        (SP2, SP2) => Some(TorsionParams::new(45.0, 2, 180.0)),
        (Resonant, Resonant) => Some(TorsionParams::new(25.0, 2, 180.0)),
        (SP2, Resonant) | (Resonant, SP2) => Some(TorsionParams::new(5.0, 2, 180.0)),
        (SP2 | Resonant, SP3) | (SP3, SP2 | Resonant) => {
            let sp3_is_oxygen = if j_hyb == SP3 {
                j_is_oxygen_column
            } else {
                k_is_oxygen_column
            };

            if sp3_is_oxygen {
                Some(TorsionParams::new(2.0, 2, 180.0))
            } else if matches!(i_hyb, SP2 | Resonant) {
                Some(TorsionParams::new(1.0, 6, 0.0))
            } else {
                Some(TorsionParams::new(2.0, 3, 180.0))
            }
        }
        _ => None,
    }
}

pub fn is_oxygen_column(element: Element) -> bool {
    matches!(element, Element::O | Element::S | Element::Se)
}
