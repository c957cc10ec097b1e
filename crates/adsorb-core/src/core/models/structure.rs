use super::atom::{Atom, AtomTag};
use super::cell::Cell;
use crate::core::elements::Element;
use itertools::iproduct;
use nalgebra::{Point3, Vector3};
use std::collections::BTreeMap;
use thiserror::Error;

/// Thinnest periodic cell, in Angstroms, accepted by [`AtomicStructure::validate`].
pub const MIN_PERIODIC_SPACING: f64 = 0.5;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum StructureError {
    #[error("Structure contains no atoms")]
    Empty,
    #[error("Atom {index} ({element}) has a non-finite position")]
    NonFinitePosition { index: usize, element: String },
    #[error("Cell vectors contain non-finite components")]
    NonFiniteCell,
    #[error("Periodic cell is only {spacing} Angstroms thick along axis {axis} (minimum {minimum})")]
    CellTooThin {
        axis: usize,
        spacing: f64,
        minimum: f64,
    },
    #[error("Cell is too thin for a {cutoff} Angstrom cutoff (more than {limit} periodic images)")]
    TooManyImages { cutoff: f64, limit: usize },
    #[error("Repeat counts must be at least 1 along every axis (got {0:?})")]
    InvalidRepeat([usize; 3]),
    #[error("Axis index {0} is out of range (expected 0, 1 or 2)")]
    InvalidAxis(usize),
    #[error("Expected {expected} positions, got {actual}")]
    PositionCountMismatch { expected: usize, actual: usize },
}

/// An atomic structure: atoms, simulation cell and periodic boundary flags.
///
/// Structures are plain values. Pipeline stages that need to mutate one clone it
/// first, so a structure handed to the engine is never modified behind the caller's
/// back.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AtomicStructure {
    atoms: Vec<Atom>,
    cell: Cell,
    pbc: [bool; 3],
}

impl AtomicStructure {
    pub fn new(atoms: Vec<Atom>, cell: Cell, pbc: [bool; 3]) -> Self {
        Self { atoms, cell, pbc }
    }

    /// Creates an isolated structure (zero cell, no periodicity).
    pub fn from_atoms(atoms: Vec<Atom>) -> Self {
        Self::new(atoms, Cell::default(), [false; 3])
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut [Atom] {
        &mut self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    pub fn set_cell(&mut self, cell: Cell) {
        self.cell = cell;
    }

    pub fn pbc(&self) -> [bool; 3] {
        self.pbc
    }

    pub fn set_pbc(&mut self, pbc: [bool; 3]) {
        self.pbc = pbc;
    }

    pub fn push(&mut self, atom: Atom) {
        self.atoms.push(atom);
    }

    /// Appends copies of all atoms of `other`, keeping this structure's cell and pbc.
    pub fn extend(&mut self, other: &AtomicStructure) {
        self.atoms.extend_from_slice(&other.atoms);
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|atom| atom.position).collect()
    }

    pub fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<(), StructureError> {
        if positions.len() != self.atoms.len() {
            return Err(StructureError::PositionCountMismatch {
                expected: self.atoms.len(),
                actual: positions.len(),
            });
        }
        for (atom, position) in self.atoms.iter_mut().zip(positions) {
            atom.position = *position;
        }
        Ok(())
    }

    pub fn elements(&self) -> Vec<Element> {
        self.atoms.iter().map(|atom| atom.element).collect()
    }

    pub fn tags(&self) -> Vec<AtomTag> {
        self.atoms.iter().map(|atom| atom.tag).collect()
    }

    pub fn set_all_tags(&mut self, tag: AtomTag) {
        for atom in &mut self.atoms {
            atom.tag = tag;
        }
    }

    pub fn translate(&mut self, displacement: &Vector3<f64>) {
        for atom in &mut self.atoms {
            atom.position += displacement;
        }
    }

    /// Index of the atom with the largest z coordinate. Ties resolve to the first one.
    pub fn top_atom_index(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (index, atom) in self.atoms.iter().enumerate() {
            match best {
                Some((_, z)) if atom.position.z <= z => {}
                _ => best = Some((index, atom.position.z)),
            }
        }
        best.map(|(index, _)| index)
    }

    /// Returns a new structure containing the selected atoms (in the given order),
    /// sharing this structure's cell and periodicity.
    pub fn select(&self, indices: &[usize]) -> AtomicStructure {
        let atoms = indices
            .iter()
            .filter_map(|&index| self.atoms.get(index).copied())
            .collect();
        AtomicStructure::new(atoms, self.cell, self.pbc)
    }

    /// Centers the atoms along `axis` and, when `vacuum` is given, resizes the cell
    /// vector so that there is exactly `vacuum` Angstroms of empty space on each side.
    ///
    /// Heights are measured along the normal of the lattice plane spanned by the other
    /// two vectors, so sheared cells are handled correctly. A zero cell vector is
    /// replaced by a vector along that normal when vacuum is requested.
    pub fn center(&mut self, vacuum: Option<f64>, axis: usize) -> Result<(), StructureError> {
        if axis > 2 {
            return Err(StructureError::InvalidAxis(axis));
        }
        let original_vector = self.cell.vector(axis);
        if vacuum.is_none() && original_vector.norm() == 0.0 {
            return Ok(());
        }

        let normal = self.cell.plane_normal(axis);
        let basis_vector = self.cell.completed()[axis];

        let (low, high) = if self.atoms.is_empty() {
            (0.0, 0.0)
        } else {
            self.atoms.iter().fold((f64::MAX, f64::MIN), |(lo, hi), atom| {
                let h = atom.position.coords.dot(&normal);
                (lo.min(h), hi.max(h))
            })
        };

        let height = basis_vector.dot(&normal);
        let lengthening = match vacuum {
            Some(padding) => (high - low + 2.0 * padding) - height,
            None => 0.0,
        };
        let top = lengthening + height - high;
        let shift_along_normal = 0.5 * (top - low);

        let current_length = basis_vector.norm();
        let cos_phi = height / current_length;
        let longer = lengthening / cos_phi;
        let shift = shift_along_normal / cos_phi;

        self.cell
            .set_vector(axis, basis_vector * (1.0 + longer / current_length));
        let translation = basis_vector * (shift / current_length);
        self.translate(&translation);
        Ok(())
    }

    /// Tiles the structure `counts[i]` times along each lattice vector.
    pub fn repeat(&self, counts: [usize; 3]) -> Result<AtomicStructure, StructureError> {
        if counts.iter().any(|&n| n == 0) {
            return Err(StructureError::InvalidRepeat(counts));
        }
        let vectors = self.cell.vectors();
        let mut atoms = Vec::with_capacity(self.atoms.len() * counts.iter().product::<usize>());
        for (i, j, k) in iproduct!(0..counts[0], 0..counts[1], 0..counts[2]) {
            let offset = vectors[0] * i as f64 + vectors[1] * j as f64 + vectors[2] * k as f64;
            atoms.extend(self.atoms.iter().map(|atom| Atom {
                position: atom.position + offset,
                ..*atom
            }));
        }
        let cell = Cell::new(
            vectors[0] * counts[0] as f64,
            vectors[1] * counts[1] as f64,
            vectors[2] * counts[2] as f64,
        );
        Ok(AtomicStructure::new(atoms, cell, self.pbc))
    }

    /// Chemical formula in Hill notation (carbon first, then hydrogen, then the rest
    /// alphabetically; purely alphabetical when there is no carbon).
    pub fn chemical_formula(&self) -> String {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for atom in &self.atoms {
            *counts.entry(atom.element.symbol()).or_default() += 1;
        }

        let mut formula = String::new();
        let mut append = |symbol: &str, count: usize| {
            formula.push_str(symbol);
            if count > 1 {
                formula.push_str(&count.to_string());
            }
        };

        if let Some(carbon) = counts.remove("C") {
            append("C", carbon);
            if let Some(hydrogen) = counts.remove("H") {
                append("H", hydrogen);
            }
        }
        for (symbol, count) in counts {
            append(symbol, count);
        }
        formula
    }

    /// Checks that the structure is usable by the relaxation engine.
    pub fn validate(&self) -> Result<(), StructureError> {
        if self.atoms.is_empty() {
            return Err(StructureError::Empty);
        }
        if let Some((index, atom)) = self
            .atoms
            .iter()
            .enumerate()
            .find(|(_, atom)| !atom.position.iter().all(|c| c.is_finite()))
        {
            return Err(StructureError::NonFinitePosition {
                index,
                element: atom.element.symbol().to_string(),
            });
        }
        if !self.cell.is_finite() {
            return Err(StructureError::NonFiniteCell);
        }
        let lengths = self.cell.lengths();
        for axis in (0..3).filter(|&axis| self.pbc[axis] && lengths[axis] > 0.0) {
            let spacing = self.cell.plane_spacing(axis);
            if spacing.is_nan() || spacing < MIN_PERIODIC_SPACING {
                return Err(StructureError::CellTooThin {
                    axis,
                    spacing,
                    minimum: MIN_PERIODIC_SPACING,
                });
            }
        }
        Ok(())
    }
}
