use super::intermediate::{
    IntermediateAngle, IntermediateDihedral, IntermediateImproper, IntermediateSystem,
};
use crate::error::ForceFieldMismatchError;
use crate::model::types::{BondOrder, Element};
use dreid_typer::{
    Element as TyperElement, GraphBondOrder, MolecularGraph, MolecularTopology, assign_topology,
    assign_topology_with_rules, rules,
};

/// Assigns DREIDING types and enumerates angles, torsions and inversions.
pub fn assign_atom_types(
    system: &mut IntermediateSystem,
    rules: Option<&str>,
) -> Result<(), ForceFieldMismatchError> {
    let graph = build_molecular_graph(system)?;

    let topology = match rules {
        Some(rules_toml) => {
            let rules = rules::parse_rules(rules_toml).map_err(|e| {
                ForceFieldMismatchError::AtomTyping(format!("invalid typing rules: {e}"))
            })?;
            assign_topology_with_rules(&graph, &rules)?
        }
        None => assign_topology(&graph)?,
    };

    apply_topology(system, &topology);
    log::debug!(
        "typed {} atoms: {} angles, {} torsions, {} inversions",
        system.atoms.len(),
        system.angles.len(),
        system.dihedrals.len(),
        system.impropers.len()
    );

    Ok(())
}

fn apply_topology(system: &mut IntermediateSystem, topology: &MolecularTopology) {
    for (int_atom, topo_atom) in system.atoms.iter_mut().zip(topology.atoms.iter()) {
        int_atom.atom_type = topo_atom.atom_type.clone();
        int_atom.hybridization = topo_atom.hybridization;
    }

    let orders: std::collections::HashMap<(usize, usize), _> = topology
        .bonds
        .iter()
        .map(|b| (b.atom_ids, b.order))
        .collect();
    for bond in &mut system.bonds {
        let key = (bond.i.min(bond.j), bond.i.max(bond.j));
        bond.physical_order = orders.get(&key).copied();
    }

    system.angles = topology
        .angles
        .iter()
        .map(|a| IntermediateAngle {
            i: a.atom_ids.0,
            j: a.atom_ids.1,
            k: a.atom_ids.2,
        })
        .collect();

    system.dihedrals = topology
        .propers
        .iter()
        .map(|d| IntermediateDihedral {
            i: d.atom_ids.0,
            j: d.atom_ids.1,
            k: d.atom_ids.2,
            l: d.atom_ids.3,
        })
        .collect();

    system.impropers = topology
        .impropers
        .iter()
        .map(|imp| IntermediateImproper {
            p1: imp.atom_ids.0,
            p2: imp.atom_ids.1,
            center: imp.atom_ids.2,
            p3: imp.atom_ids.3,
        })
        .collect();
}

fn build_molecular_graph(system: &IntermediateSystem) -> Result<MolecularGraph, ForceFieldMismatchError> {
    let mut graph = MolecularGraph::new();

    for atom in &system.atoms {
        graph.add_atom(convert_element(atom.element)?);
    }

    for bond in &system.bonds {
        graph
            .add_bond(bond.i, bond.j, bond_order_to_graph_order(bond.order))
            .map_err(|e| ForceFieldMismatchError::AtomTyping(e.to_string()))?;
    }

    Ok(graph)
}

fn convert_element(elem: Element) -> Result<TyperElement, ForceFieldMismatchError> {
    elem.symbol().parse::<TyperElement>().map_err(|_| {
        ForceFieldMismatchError::AtomTyping(format!(
            "element {} is not supported by the atom typer",
            elem.symbol()
        ))
    })
}

fn bond_order_to_graph_order(order: BondOrder) -> GraphBondOrder {
    match order {
        BondOrder::Single => GraphBondOrder::Single,
        BondOrder::Double => GraphBondOrder::Double,
        BondOrder::Triple => GraphBondOrder::Triple,
        BondOrder::Aromatic => GraphBondOrder::Aromatic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forcefield::intermediate::PhysicalBondOrder;
    use crate::model::structure::{Atom, Bond, Structure};

    fn water() -> Structure {
        let mut s = Structure::new();
        s.atoms.push(Atom::new(Element::O, [0.0, 0.0, 0.0]));
        s.atoms.push(Atom::new(Element::H, [0.96, 0.0, 0.0]));
        s.atoms.push(Atom::new(Element::H, [-0.24, 0.93, 0.0]));
        s.bonds.push(Bond::new(0, 1, BondOrder::Single));
        s.bonds.push(Bond::new(0, 2, BondOrder::Single));
        s
    }

    fn ethane() -> Structure {
        let mut s = Structure::new();
        s.atoms.push(Atom::new(Element::C, [0.0, 0.0, 0.0]));
        s.atoms.push(Atom::new(Element::C, [1.54, 0.0, 0.0]));
        for pos in [
            [-0.36, 1.03, 0.0],
            [-0.36, -0.51, -0.89],
            [-0.36, -0.51, 0.89],
            [1.90, 1.03, 0.0],
            [1.90, -0.51, -0.89],
            [1.90, -0.51, 0.89],
        ] {
            s.atoms.push(Atom::new(Element::H, pos));
        }
        s.bonds.push(Bond::new(0, 1, BondOrder::Single));
        for h in 2..5 {
            s.bonds.push(Bond::new(0, h, BondOrder::Single));
        }
        for h in 5..8 {
            s.bonds.push(Bond::new(1, h, BondOrder::Single));
        }
        s
    }

    fn benzene() -> Structure {
        let mut s = Structure::new();
        for radius_element in [(1.4, Element::C), (2.5, Element::H)] {
            for i in 0..6 {
                let angle = (i as f64) * std::f64::consts::PI / 3.0;
                let (r, el) = radius_element;
                s.atoms.push(Atom::new(el, [r * angle.cos(), r * angle.sin(), 0.0]));
            }
        }
        for i in 0..6 {
            s.bonds.push(Bond::new(i, (i + 1) % 6, BondOrder::Aromatic));
            s.bonds.push(Bond::new(i, i + 6, BondOrder::Single));
        }
        s
    }

    fn typed(structure: &Structure) -> IntermediateSystem {
        let mut int = IntermediateSystem::from_structure(structure).unwrap();
        assign_atom_types(&mut int, None).unwrap();
        int
    }

    #[test]
    fn types_water() {
        let int = typed(&water());
        assert_eq!(int.atoms[0].atom_type, "O_3");
        assert_eq!(int.atoms[1].atom_type, "H_HB");
        assert_eq!(int.atoms[2].atom_type, "H_HB");
        assert_eq!(int.angles.len(), 1);
        assert!(int.dihedrals.is_empty());
    }

    #[test]
    fn types_ethane_and_enumerates_torsions() {
        let int = typed(&ethane());
        assert_eq!(int.atoms[0].atom_type, "C_3");
        assert_eq!(int.atoms[1].atom_type, "C_3");
        assert!(int.atoms[2..].iter().all(|a| a.atom_type == "H_"));
        assert_eq!(int.dihedrals.len(), 9);
        assert!(int.impropers.is_empty());
    }

    #[test]
    fn benzene_ring_is_resonant_with_inversions() {
        let int = typed(&benzene());
        assert!(int.atoms[..6].iter().all(|a| a.atom_type == "C_R"));
        for bond in int.bonds.iter().filter(|b| b.i < 6 && b.j < 6) {
            assert_eq!(bond.physical_order, Some(PhysicalBondOrder::Resonant));
        }
        assert_eq!(int.impropers.len(), 6);
    }

    #[test]
    fn invalid_rules_are_a_typing_error() {
        let mut int = IntermediateSystem::from_structure(&water()).unwrap();
        let result = assign_atom_types(&mut int, Some("not valid [[[ toml rules"));
        assert!(matches!(result, Err(ForceFieldMismatchError::AtomTyping(_))));
    }

    #[test]
    fn element_conversion() {
        assert_eq!(convert_element(Element::C).unwrap(), TyperElement::C);
        assert_eq!(convert_element(Element::S).unwrap(), TyperElement::S);
        assert_eq!(convert_element(Element::Na).unwrap(), TyperElement::Na);
    }

    #[test]
    fn bond_order_conversion() {
        assert_eq!(
            bond_order_to_graph_order(BondOrder::Aromatic),
            GraphBondOrder::Aromatic
        );
        assert_eq!(
            bond_order_to_graph_order(BondOrder::Double),
            GraphBondOrder::Double
        );
    }
}
