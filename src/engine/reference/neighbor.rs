use super::forces::{ForceField, Vec3, dot};

/// Buffer added to the cutoff when collecting pairs, in Å.
pub(crate) const SKIN: f64 = 2.0;

/// Verlet list of non-excluded pairs within `cutoff + SKIN`.
///
/// Valid until some atom has moved more than half the skin since the build.
#[derive(Debug, Clone, Default)]
pub(crate) struct NeighborList {
    pairs: Vec<(usize, usize)>,
    reference: Vec<Vec3>,
}

impl NeighborList {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn build(ff: &ForceField, positions: &[Vec3]) -> Self {
        if !ff.uses_cutoff() {
            return Self::empty();
        }
        let reach = ff.cutoff() + SKIN;
        let reach2 = reach * reach;
        let n = positions.len();
        let mut pairs = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                if ff.is_excluded(i, j) {
                    continue;
                }
                let d = ff.geometry.delta(positions[i], positions[j]);
                if dot(d, d) <= reach2 {
                    pairs.push((i, j));
                }
            }
        }
        log::trace!("neighbor list rebuilt: {} pairs", pairs.len());
        Self {
            pairs,
            reference: positions.to_vec(),
        }
    }

    pub(crate) fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Rebuilds when the list no longer covers every pair inside the cutoff.
    pub(crate) fn update(&mut self, ff: &ForceField, positions: &[Vec3]) {
        if !ff.uses_cutoff() {
            return;
        }
        if self.needs_rebuild(ff, positions) {
            *self = Self::build(ff, positions);
        }
    }

    fn needs_rebuild(&self, ff: &ForceField, positions: &[Vec3]) -> bool {
        if self.reference.len() != positions.len() {
            return true;
        }
        let limit = 0.25 * SKIN * SKIN;
        self.reference.iter().zip(positions).any(|(old, new)| {
            let d = ff.geometry.delta(*new, *old);
            let d2 = dot(d, d);
            !d2.is_finite() || d2 > limit
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::reference::forces::Geometry;
    use crate::model::structure::{Atom, Structure};
    use crate::model::system::{
        AtomParam, NonbondedMethod, NonbondedSettings, Potentials, SimulationSystem,
    };
    use crate::model::types::Element;

    fn line_system(n: usize, spacing: f64, exclusions: Vec<(usize, usize)>) -> SimulationSystem {
        let mut structure = Structure::new();
        for i in 0..n {
            structure
                .atoms
                .push(Atom::new(Element::O, [i as f64 * spacing, 0.0, 0.0]));
        }
        SimulationSystem {
            structure,
            force_field: "test".into(),
            atom_types: vec!["O_3".into()],
            atom_params: vec![
                AtomParam {
                    charge: 0.0,
                    mass: 15.999,
                    type_index: 0,
                };
                n
            ],
            potentials: Potentials::default(),
            exclusions,
            constraints: Vec::new(),
            nonbonded: NonbondedSettings {
                method: NonbondedMethod::CutoffNonPeriodic,
                cutoff: 4.0,
                reaction_field_dielectric: 78.3,
            },
        }
    }

    #[test]
    fn collects_pairs_within_cutoff_plus_skin() {
        let sys = line_system(4, 3.0, Vec::new());
        let ff = ForceField::new(&sys, Geometry::Open);
        let list = NeighborList::build(&ff, &sys.positions());
        // reach is 6 Å: neighbors 3 and 6 apart are kept, 9 apart is not.
        assert_eq!(list.pairs(), &[(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)]);
    }

    #[test]
    fn skips_excluded_pairs() {
        let sys = line_system(3, 1.0, vec![(0, 1)]);
        let ff = ForceField::new(&sys, Geometry::Open);
        let list = NeighborList::build(&ff, &sys.positions());
        assert!(!list.pairs().contains(&(0, 1)));
        assert!(list.pairs().contains(&(1, 2)));
    }

    #[test]
    fn rebuilds_only_after_half_skin_displacement() {
        let sys = line_system(2, 8.0, Vec::new());
        let ff = ForceField::new(&sys, Geometry::Open);
        let mut positions = sys.positions();
        let mut list = NeighborList::build(&ff, &positions);
        assert!(list.pairs().is_empty());

        positions[1][0] = 7.5;
        list.update(&ff, &positions);
        assert!(list.pairs().is_empty());

        positions[1][0] = 5.5;
        list.update(&ff, &positions);
        assert_eq!(list.pairs(), &[(0, 1)]);
    }

    #[test]
    fn periodic_pairs_use_minimum_image() {
        let sys = line_system(2, 18.0, Vec::new());
        let ff = ForceField::new(&sys, Geometry::Periodic([20.0, 20.0, 20.0]));
        let list = NeighborList::build(&ff, &sys.positions());
        assert_eq!(list.pairs(), &[(0, 1)]);
    }
}
