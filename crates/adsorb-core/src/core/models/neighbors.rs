use super::structure::{AtomicStructure, StructureError};
use nalgebra::Vector3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Covalent-radius cutoffs scaled by `multiplier`, one per atom.
pub fn natural_cutoffs(structure: &AtomicStructure, multiplier: f64) -> Vec<f64> {
    structure
        .atoms()
        .iter()
        .map(|atom| atom.element.covalent_radius() * multiplier)
        .collect()
}

/// Bond connectivity of a structure under natural cutoffs.
///
/// Atoms `i` and `j` are bonded when some periodic image of `j` lies closer to `i`
/// than `cutoff_i + cutoff_j + skin`. An atom may be bonded to its own periodic
/// image. Two lists compare equal exactly when they describe the same bond graph,
/// which is what the anomaly checks rely on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborList {
    neighbors: Vec<Vec<usize>>,
}

impl NeighborList {
    pub fn build(
        structure: &AtomicStructure,
        multiplier: f64,
        skin: f64,
    ) -> Result<Self, StructureError> {
        let cutoffs = natural_cutoffs(structure, multiplier);
        let max_cutoff = cutoffs.iter().copied().fold(0.0, f64::max);
        let images = structure
            .cell()
            .image_translations(structure.pbc(), 2.0 * max_cutoff + skin)?;
        let positions = structure.positions();
        let count = positions.len();

        let search = |i: usize| -> Vec<usize> {
            let origin = positions[i];
            (0..count)
                .filter(|&j| {
                    let limit = cutoffs[i] + cutoffs[j] + skin;
                    images.iter().any(|translation: &Vector3<f64>| {
                        if i == j && translation.norm() == 0.0 {
                            return false;
                        }
                        (positions[j] + translation - origin).norm() < limit
                    })
                })
                .collect()
        };

        #[cfg(feature = "parallel")]
        let neighbors = (0..count).into_par_iter().map(search).collect();
        #[cfg(not(feature = "parallel"))]
        let neighbors = (0..count).map(search).collect();

        Ok(Self { neighbors })
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Sorted indices of the atoms bonded to `index`.
    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.neighbors.get(index).map_or(&[], Vec::as_slice)
    }

    pub fn are_bonded(&self, i: usize, j: usize) -> bool {
        self.neighbors(i).binary_search(&j).is_ok()
    }

    /// Unique bonded pairs `(i, j)` with `i <= j`.
    pub fn bonded_pairs(&self) -> Vec<(usize, usize)> {
        self.neighbors
            .iter()
            .enumerate()
            .flat_map(|(i, list)| list.iter().filter(move |&&j| j >= i).map(move |&j| (i, j)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::elements::Element;
    use crate::core::models::atom::Atom;
    use crate::core::models::cell::Cell;
    use nalgebra::Point3;

    fn atom(symbol: &str, x: f64, y: f64, z: f64) -> Atom {
        Atom::new(Element::from_symbol(symbol).unwrap(), Point3::new(x, y, z))
    }

    #[test]
    fn carbon_monoxide_is_bonded_at_equilibrium_distance() {
        let structure =
            AtomicStructure::from_atoms(vec![atom("C", 0.0, 0.0, 0.0), atom("O", 0.0, 0.0, 1.13)]);
        let list = NeighborList::build(&structure, 1.0, 0.3).unwrap();
        assert!(list.are_bonded(0, 1));
        assert!(list.are_bonded(1, 0));
        assert_eq!(list.bonded_pairs(), vec![(0, 1)]);
    }

    #[test]
    fn distant_atoms_are_not_bonded() {
        let structure =
            AtomicStructure::from_atoms(vec![atom("C", 0.0, 0.0, 0.0), atom("O", 0.0, 0.0, 4.0)]);
        let list = NeighborList::build(&structure, 1.0, 0.3).unwrap();
        assert!(list.neighbors(0).is_empty());
        assert!(list.bonded_pairs().is_empty());
    }

    #[test]
    fn periodic_images_create_bonds_across_the_boundary() {
        let structure = AtomicStructure::new(
            vec![atom("Cu", 0.2, 0.0, 0.0), atom("Cu", 4.8, 0.0, 0.0)],
            Cell::orthorhombic(5.0, 5.0, 5.0),
            [true, false, false],
        );
        let list = NeighborList::build(&structure, 1.0, 0.3).unwrap();
        assert!(list.are_bonded(0, 1));

        let isolated = AtomicStructure::new(
            structure.atoms().to_vec(),
            *structure.cell(),
            [false, false, false],
        );
        assert!(!NeighborList::build(&isolated, 1.0, 0.3).unwrap().are_bonded(0, 1));
    }

    #[test]
    fn short_periodic_cell_bonds_atom_to_its_own_image() {
        let structure = AtomicStructure::new(
            vec![atom("Cu", 0.0, 0.0, 0.0)],
            Cell::orthorhombic(2.5, 10.0, 10.0),
            [true, false, false],
        );
        let list = NeighborList::build(&structure, 1.0, 0.3).unwrap();
        assert_eq!(list.neighbors(0), &[0]);
        assert_eq!(list.bonded_pairs(), vec![(0, 0)]);
    }

    #[test]
    fn multiplier_scales_the_bond_cutoff() {
        let structure =
            AtomicStructure::from_atoms(vec![atom("C", 0.0, 0.0, 0.0), atom("O", 0.0, 0.0, 1.9)]);
        assert!(!NeighborList::build(&structure, 1.0, 0.3).unwrap().are_bonded(0, 1));
        assert!(NeighborList::build(&structure, 1.5, 0.3).unwrap().are_bonded(0, 1));
    }
}
