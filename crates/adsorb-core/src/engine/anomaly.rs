use crate::core::models::atom::AtomTag;
use crate::core::models::neighbors::NeighborList;
use crate::core::models::structure::{AtomicStructure, StructureError};

/// Natural-cutoff multiplier for bonds inside the adsorbate and between the
/// adsorbate and subsurface atoms.
pub const ADSORBATE_BOND_MULTIPLIER: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnomalyFlags {
    pub adsorbate_dissociated: bool,
    pub adsorbate_desorbed: bool,
    pub surface_changed: bool,
    pub adsorbate_intercalated: bool,
}

/// Compares the first and last frames of an adsorbate relaxation.
///
/// Roles come from the tags of the initial frame: `Adsorbate` atoms form the
/// molecule, everything else the slab, and `Subsurface` atoms are the ones an
/// intercalating adsorbate would bond to.
pub struct AnomalyDetector<'a> {
    initial: &'a AtomicStructure,
    last: &'a AtomicStructure,
    tags: Vec<AtomTag>,
    surface_change_multiplier: f64,
    desorption_multiplier: f64,
    skin: f64,
}

impl<'a> AnomalyDetector<'a> {
    pub fn new(
        initial: &'a AtomicStructure,
        last: &'a AtomicStructure,
        surface_change_multiplier: f64,
        desorption_multiplier: f64,
        skin: f64,
    ) -> Self {
        Self {
            initial,
            last,
            tags: initial.tags(),
            surface_change_multiplier,
            desorption_multiplier,
            skin,
        }
    }

    fn indices(&self, keep: impl Fn(AtomTag) -> bool) -> Vec<usize> {
        self.tags
            .iter()
            .enumerate()
            .filter(|&(_, &tag)| keep(tag))
            .map(|(i, _)| i)
            .collect()
    }

    fn connectivity_changed(
        &self,
        indices: &[usize],
        multiplier: f64,
    ) -> Result<bool, StructureError> {
        let before = NeighborList::build(&self.initial.select(indices), multiplier, self.skin)?;
        let after = NeighborList::build(&self.last.select(indices), multiplier, self.skin)?;
        Ok(before != after)
    }

    pub fn is_adsorbate_dissociated(&self) -> Result<bool, StructureError> {
        let adsorbate = self.indices(|t| t == AtomTag::Adsorbate);
        self.connectivity_changed(&adsorbate, ADSORBATE_BOND_MULTIPLIER)
    }

    pub fn has_surface_changed(&self) -> Result<bool, StructureError> {
        let slab = self.indices(|t| t != AtomTag::Adsorbate);
        self.connectivity_changed(&slab, self.surface_change_multiplier)
    }

    /// True when, in the last frame, no adsorbate atom is bonded to any slab atom.
    pub fn is_adsorbate_desorbed(&self) -> Result<bool, StructureError> {
        let neighbors = NeighborList::build(self.last, self.desorption_multiplier, self.skin)?;
        let adsorbate = self.indices(|t| t == AtomTag::Adsorbate);
        Ok(!adsorbate.iter().any(|&i| {
            neighbors
                .neighbors(i)
                .iter()
                .any(|&j| self.tags.get(j).is_some_and(|&t| t != AtomTag::Adsorbate))
        }))
    }

    /// True when, in the last frame, an adsorbate atom is bonded to a subsurface atom.
    pub fn is_adsorbate_intercalated(&self) -> Result<bool, StructureError> {
        let neighbors = NeighborList::build(self.last, ADSORBATE_BOND_MULTIPLIER, self.skin)?;
        Ok(self.indices(|t| t == AtomTag::Adsorbate).iter().any(|&i| {
            neighbors
                .neighbors(i)
                .iter()
                .any(|&j| self.tags.get(j) == Some(&AtomTag::Subsurface))
        }))
    }

    pub fn detect(&self) -> Result<AnomalyFlags, StructureError> {
        Ok(AnomalyFlags {
            adsorbate_dissociated: self.is_adsorbate_dissociated()?,
            adsorbate_desorbed: self.is_adsorbate_desorbed()?,
            surface_changed: self.has_surface_changed()?,
            adsorbate_intercalated: self.is_adsorbate_intercalated()?,
        })
    }
}
