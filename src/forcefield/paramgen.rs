use super::config::{
    AnglePotentialType, BondPotentialType, Constraints, ForceFieldConfig, VdwPotentialType,
};
use super::intermediate::{IntermediateBond, IntermediateSystem, PhysicalBondOrderExt};
use super::params::{AtomTypeParams, ForceFieldParams, get_torsion_params, is_oxygen_column};
use crate::error::ForceFieldMismatchError;
use crate::model::structure::Structure;
use crate::model::system::{
    AnglePotential, AtomParam, BondPotential, DihedralPotential, DistanceConstraint,
    ImproperPotential, NonbondedSettings, Potentials, SimulationSystem, VdwPairPotential,
};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Below this `sin θ0` an angle is treated as linear.
const LINEAR_ANGLE_EPS: f64 = 1e-3;

fn collect_atom_types(intermediate: &IntermediateSystem) -> (Vec<String>, HashMap<String, usize>) {
    let types: BTreeSet<&str> = intermediate
        .atoms
        .iter()
        .map(|a| a.atom_type.as_str())
        .collect();
    let atom_types: Vec<String> = types.into_iter().map(str::to_string).collect();
    let type_indices = atom_types
        .iter()
        .enumerate()
        .map(|(idx, t)| (t.clone(), idx))
        .collect();
    (atom_types, type_indices)
}

fn resolve_type_params<'a>(
    intermediate: &IntermediateSystem,
    params: &'a ForceFieldParams,
) -> Result<Vec<&'a AtomTypeParams>, ForceFieldMismatchError> {
    intermediate
        .atoms
        .iter()
        .map(|atom| {
            params
                .atom(&atom.atom_type, atom.element)
                .ok_or_else(|| {
                    ForceFieldMismatchError::missing_parameter(
                        &atom.atom_type,
                        "no entry in parameter table",
                    )
                })
        })
        .collect()
}

/// Which bonds become rigid, and the extra H–H constraints of rigid waters.
struct ConstraintPlan {
    constrained_bonds: HashSet<(usize, usize)>,
    rigid_water_angles: HashSet<(usize, usize, usize)>,
    constraints: Vec<DistanceConstraint>,
}

fn plan_constraints(
    structure: &Structure,
    intermediate: &IntermediateSystem,
    type_params: &[&AtomTypeParams],
    params: &ForceFieldParams,
    config: &ForceFieldConfig,
) -> ConstraintPlan {
    let is_water = |idx: usize| {
        structure
            .metadata
            .atom_info
            .get(idx)
            .is_some_and(|info| info.is_water())
    };

    let mut constrained_bonds = HashSet::new();
    let mut constraints = Vec::new();
    for bond in &intermediate.bonds {
        let involves_h = intermediate.atoms[bond.i].element.is_hydrogen()
            || intermediate.atoms[bond.j].element.is_hydrogen();
        let rigid = match config.constraints {
            Constraints::None => false,
            Constraints::HBonds => involves_h,
            Constraints::AllBonds => true,
        } || (config.rigid_water && is_water(bond.i) && is_water(bond.j));

        if rigid {
            constrained_bonds.insert((bond.i, bond.j));
            constraints.push(DistanceConstraint {
                i: bond.i,
                j: bond.j,
                distance: equilibrium_length(bond, type_params, params),
            });
        }
    }

    let mut rigid_water_angles = HashSet::new();
    if config.rigid_water {
        for (center, atom) in intermediate.atoms.iter().enumerate() {
            if !is_water(center) || atom.neighbors.len() != 2 {
                continue;
            }
            let (h1, h2) = (atom.neighbors[0], atom.neighbors[1]);
            let r1 = type_params[center].bond_radius + type_params[h1].bond_radius
                - params.global.bond_delta;
            let r2 = type_params[center].bond_radius + type_params[h2].bond_radius
                - params.global.bond_delta;
            let theta0 = type_params[center].bond_angle.to_radians();
            let distance = (r1 * r1 + r2 * r2 - 2.0 * r1 * r2 * theta0.cos()).sqrt();
            constraints.push(DistanceConstraint {
                i: h1.min(h2),
                j: h1.max(h2),
                distance,
            });
            rigid_water_angles.insert((h1.min(h2), center, h1.max(h2)));
        }
    }

    ConstraintPlan {
        constrained_bonds,
        rigid_water_angles,
        constraints,
    }
}

fn equilibrium_length(
    bond: &IntermediateBond,
    type_params: &[&AtomTypeParams],
    params: &ForceFieldParams,
) -> f64 {
    type_params[bond.i].bond_radius + type_params[bond.j].bond_radius - params.global.bond_delta
}

fn generate_bond_potentials(
    intermediate: &IntermediateSystem,
    type_params: &[&AtomTypeParams],
    params: &ForceFieldParams,
    config: &ForceFieldConfig,
    plan: &ConstraintPlan,
) -> Result<Vec<BondPotential>, ForceFieldMismatchError> {
    intermediate
        .bonds
        .iter()
        .filter(|bond| !plan.constrained_bonds.contains(&(bond.i, bond.j)))
        .map(|bond| {
            let r0 = equilibrium_length(bond, type_params, params);
            let physical_order = bond.physical_order.ok_or_else(|| {
                ForceFieldMismatchError::AtomTyping(format!(
                    "bond {}-{} has no physical order assigned",
                    bond.i, bond.j
                ))
            })?;

            let order_mult = physical_order.multiplier();
            let k_force = params.global.bond_k * order_mult;
            let d0 = params.global.bond_d * order_mult;

            Ok(match config.bond_potential {
                BondPotentialType::Harmonic => BondPotential::Harmonic {
                    i: bond.i,
                    j: bond.j,
                    k_force,
                    r0,
                },
                BondPotentialType::Morse => BondPotential::Morse {
                    i: bond.i,
                    j: bond.j,
                    r0,
                    d0,
                    alpha: (k_force / (2.0 * d0)).sqrt(),
                },
            })
        })
        .collect()
}

fn generate_angle_potentials(
    intermediate: &IntermediateSystem,
    type_params: &[&AtomTypeParams],
    params: &ForceFieldParams,
    config: &ForceFieldConfig,
    plan: &ConstraintPlan,
) -> Vec<AnglePotential> {
    intermediate
        .angles
        .iter()
        .filter(|a| {
            !plan
                .rigid_water_angles
                .contains(&(a.i.min(a.k), a.j, a.i.max(a.k)))
        })
        .map(|a| {
            let theta0 = type_params[a.j].bond_angle.to_radians();
            match config.angle_potential {
                AnglePotentialType::CosineHarmonic => {
                    let sin0 = theta0.sin();
                    let k_force = if sin0.abs() < LINEAR_ANGLE_EPS {
                        params.global.angle_k
                    } else {
                        params.global.angle_k / (sin0 * sin0)
                    };
                    AnglePotential::CosineHarmonic {
                        i: a.i,
                        j: a.j,
                        k: a.k,
                        k_force,
                        theta0,
                    }
                }
                AnglePotentialType::ThetaHarmonic => AnglePotential::ThetaHarmonic {
                    i: a.i,
                    j: a.j,
                    k: a.k,
                    k_force: params.global.angle_k,
                    theta0,
                },
            }
        })
        .collect()
}

/// Torsion barriers are shared among all dihedrals about one central bond.
fn generate_dihedral_potentials(intermediate: &IntermediateSystem) -> Vec<DihedralPotential> {
    let central = |j: usize, k: usize| (j.min(k), j.max(k));

    let mut multiplicity: HashMap<(usize, usize), usize> = HashMap::new();
    for d in &intermediate.dihedrals {
        *multiplicity.entry(central(d.j, d.k)).or_default() += 1;
    }

    intermediate
        .dihedrals
        .iter()
        .filter_map(|d| {
            let atoms = &intermediate.atoms;
            let torsion = get_torsion_params(
                atoms[d.j].hybridization,
                atoms[d.k].hybridization,
                is_oxygen_column(atoms[d.j].element),
                is_oxygen_column(atoms[d.k].element),
                atoms[d.i].hybridization,
            )?;
            let count = multiplicity.get(&central(d.j, d.k)).copied().unwrap_or(1).max(1);
            let v_barrier = torsion.v_barrier / count as f64;
            (v_barrier > 0.0).then_some(DihedralPotential {
                i: d.i,
                j: d.j,
                k: d.k,
                l: d.l,
                v_barrier,
                periodicity: torsion.periodicity,
                phase: torsion.phase,
            })
        })
        .collect()
}

fn generate_improper_potentials(
    intermediate: &IntermediateSystem,
    params: &ForceFieldParams,
) -> Vec<ImproperPotential> {
    intermediate
        .impropers
        .iter()
        .map(|imp| ImproperPotential {
            i: imp.p1,
            j: imp.p2,
            k: imp.center,
            l: imp.p3,
            k_force: params.global.inversion_k,
        })
        .collect()
}

fn generate_vdw_pairs(
    atom_types: &[String],
    intermediate: &IntermediateSystem,
    type_indices: &HashMap<String, usize>,
    params: &ForceFieldParams,
    config: &ForceFieldConfig,
) -> Result<Vec<VdwPairPotential>, ForceFieldMismatchError> {
    // One representative element per type for the ion fallback lookup.
    let mut per_type: Vec<Option<&AtomTypeParams>> = vec![None; atom_types.len()];
    for atom in &intermediate.atoms {
        let idx = type_indices[&atom.atom_type];
        if per_type[idx].is_none() {
            per_type[idx] = params.atom(&atom.atom_type, atom.element);
        }
    }
    let per_type: Vec<&AtomTypeParams> = per_type
        .into_iter()
        .zip(atom_types)
        .map(|(p, name)| {
            p.ok_or_else(|| ForceFieldMismatchError::missing_parameter(name, "van der Waals"))
        })
        .collect::<Result<_, _>>()?;

    let mut pairs = Vec::with_capacity(atom_types.len() * (atom_types.len() + 1) / 2);
    for t1 in 0..atom_types.len() {
        for t2 in t1..atom_types.len() {
            let (p1, p2) = (per_type[t1], per_type[t2]);
            let r0 = (p1.vdw_r0 * p2.vdw_r0).sqrt();
            let d0 = (p1.vdw_d0 * p2.vdw_d0).sqrt();
            pairs.push(match config.vdw_potential {
                VdwPotentialType::LennardJones => VdwPairPotential::LennardJones {
                    type1_idx: t1,
                    type2_idx: t2,
                    sigma: r0 / 2f64.powf(1.0 / 6.0),
                    epsilon: d0,
                },
                VdwPotentialType::Exponential6 => {
                    let zeta = 0.5 * (p1.vdw_zeta + p2.vdw_zeta);
                    VdwPairPotential::Exponential6 {
                        type1_idx: t1,
                        type2_idx: t2,
                        a: d0 * 6.0 / (zeta - 6.0) * zeta.exp(),
                        b: zeta / r0,
                        c: d0 * zeta / (zeta - 6.0) * r0.powi(6),
                    }
                }
            });
        }
    }
    Ok(pairs)
}

/// 1-2 and 1-3 pairs, sorted and unique.
fn generate_exclusions(intermediate: &IntermediateSystem) -> Vec<(usize, usize)> {
    let mut set: BTreeSet<(usize, usize)> = BTreeSet::new();
    for bond in &intermediate.bonds {
        set.insert((bond.i.min(bond.j), bond.i.max(bond.j)));
    }
    for atom in &intermediate.atoms {
        for (n, &a) in atom.neighbors.iter().enumerate() {
            for &b in &atom.neighbors[n + 1..] {
                if a != b {
                    set.insert((a.min(b), a.max(b)));
                }
            }
        }
    }
    set.into_iter().collect()
}

pub fn generate_parameters(
    structure: Structure,
    intermediate: &IntermediateSystem,
    params: &ForceFieldParams,
    config: &ForceFieldConfig,
) -> Result<SimulationSystem, ForceFieldMismatchError> {
    let (atom_types, type_indices) = collect_atom_types(intermediate);
    let type_params = resolve_type_params(intermediate, params)?;

    let atom_params = intermediate
        .atoms
        .iter()
        .map(|atom| AtomParam {
            charge: atom.charge,
            mass: atom.element.atomic_mass(),
            type_index: type_indices[&atom.atom_type],
        })
        .collect();

    let plan = plan_constraints(&structure, intermediate, &type_params, params, config);

    let potentials = Potentials {
        bonds: generate_bond_potentials(intermediate, &type_params, params, config, &plan)?,
        angles: generate_angle_potentials(intermediate, &type_params, params, config, &plan),
        dihedrals: generate_dihedral_potentials(intermediate),
        impropers: generate_improper_potentials(intermediate, params),
        vdw_pairs: generate_vdw_pairs(&atom_types, intermediate, &type_indices, params, config)?,
    };

    log::info!(
        "generated {} bonds, {} angles, {} torsions, {} inversions, {} constraints over {} atom types",
        potentials.bonds.len(),
        potentials.angles.len(),
        potentials.dihedrals.len(),
        potentials.impropers.len(),
        plan.constraints.len(),
        atom_types.len()
    );

    Ok(SimulationSystem {
        structure,
        force_field: config.preset.name().to_string(),
        atom_types,
        atom_params,
        potentials,
        exclusions: generate_exclusions(intermediate),
        constraints: plan.constraints,
        nonbonded: NonbondedSettings {
            method: config.nonbonded_method,
            cutoff: config.nonbonded_cutoff,
            reaction_field_dielectric: config.reaction_field_dielectric,
        },
    })
}
