use super::config::AdsorbateSite;
use crate::core::models::atom::AtomTag;
use crate::core::models::structure::AtomicStructure;
use nalgebra::Vector3;
use tracing::debug;

/// Places `adsorbate` above `slab` and appends its atoms, tagged as adsorbate.
///
/// The adsorbate is rigidly translated so that its first atom sits `height` Angstroms
/// above the highest slab atom, over the requested site. An empty slab places the
/// adsorbate with its first atom at height `height` above `z = 0`.
pub fn add_adsorbate(
    slab: &mut AtomicStructure,
    adsorbate: &AtomicStructure,
    height: f64,
    site: AdsorbateSite,
) {
    let Some(anchor) = adsorbate.atoms().first().map(|a| a.position) else {
        return;
    };

    let top = slab.top_atom_index().map(|i| slab.atoms()[i].position);
    let (x, y) = match site {
        AdsorbateSite::TopAtom => top.map(|p| (p.x, p.y)).unwrap_or((0.0, 0.0)),
        AdsorbateSite::Origin => (0.0, 0.0),
        AdsorbateSite::Position { x, y } => (x, y),
    };
    let z = top.map(|p| p.z).unwrap_or(0.0) + height;

    let mut placed = adsorbate.clone();
    placed.translate(&(Vector3::new(x, y, z) - anchor.coords));
    placed.set_all_tags(AtomTag::Adsorbate);
    debug!(atoms = placed.len(), x, y, z, "Placed adsorbate");
    slab.extend(&placed);
}

/// Prepares adsorbent tags for anomaly detection.
///
/// Atoms already tagged as adsorbate belong to the material itself, so they are
/// demoted to subsurface. If nothing is tagged as surface afterwards, every atom
/// within `tolerance` of the highest atom (along z) becomes a surface atom.
pub fn assign_surface_tags(adsorbent: &mut AtomicStructure, tolerance: f64) {
    for atom in adsorbent.atoms_mut() {
        if atom.tag == AtomTag::Adsorbate {
            atom.tag = AtomTag::Subsurface;
        }
    }
    if adsorbent.atoms().iter().any(|a| a.tag == AtomTag::Surface) {
        return;
    }
    let Some(top) = adsorbent.top_atom_index() else {
        return;
    };
    let top_z = adsorbent.atoms()[top].position.z;
    let mut surface = 0;
    for atom in adsorbent.atoms_mut() {
        if top_z - atom.position.z <= tolerance {
            atom.tag = AtomTag::Surface;
            surface += 1;
        } else {
            atom.tag = AtomTag::Subsurface;
        }
    }
    debug!(surface, "Assigned surface tags by height");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::elements::Element;
    use crate::core::models::atom::Atom;
    use crate::core::models::formula::molecule_from_formula;
    use nalgebra::Point3;

    fn atom(symbol: &str, x: f64, y: f64, z: f64) -> Atom {
        Atom::new(Element::from_symbol(symbol).unwrap(), Point3::new(x, y, z))
    }

    fn slab() -> AtomicStructure {
        AtomicStructure::from_atoms(vec![
            atom("Cu", 0.0, 0.0, 0.0),
            atom("Cu", 1.8, 0.0, 0.0),
            atom("Cu", 0.9, 0.9, 1.8),
        ])
    }

    #[test]
    fn first_adsorbate_atom_sits_above_top_atom() {
        let mut slab = slab();
        let co2 = molecule_from_formula("CO2").unwrap();
        add_adsorbate(&mut slab, &co2, 1.2, AdsorbateSite::TopAtom);

        assert_eq!(slab.len(), 6);
        let first = slab.atoms()[3].position;
        assert!((first - Point3::new(0.9, 0.9, 3.0)).norm() < 1e-12);
        assert!(slab.atoms()[3..].iter().all(|a| a.tag == AtomTag::Adsorbate));
        assert!(slab.atoms()[..3].iter().all(|a| a.tag != AtomTag::Adsorbate));
    }

    #[test]
    fn adsorbate_is_translated_rigidly() {
        let mut slab = slab();
        let co2 = molecule_from_formula("CO2").unwrap();
        add_adsorbate(&mut slab, &co2, 2.0, AdsorbateSite::Position { x: 5.0, y: -1.0 });

        let placed = &slab.atoms()[3..];
        for (original, moved) in co2.atoms().iter().zip(placed) {
            let shift = moved.position - original.position;
            let expected = placed[0].position - co2.atoms()[0].position;
            assert!((shift - expected).norm() < 1e-12);
        }
        assert!((placed[0].position.x - 5.0).abs() < 1e-12);
        assert!((placed[0].position.z - 3.8).abs() < 1e-12);
    }

    #[test]
    fn origin_site_ignores_top_atom_xy() {
        let mut slab = slab();
        let h2 = molecule_from_formula("H2").unwrap();
        add_adsorbate(&mut slab, &h2, 1.0, AdsorbateSite::Origin);
        let first = slab.atoms()[3].position;
        assert_eq!((first.x, first.y), (0.0, 0.0));
        assert!((first.z - 2.8).abs() < 1e-12);
    }

    #[test]
    fn surface_tags_follow_height_when_absent() {
        let mut slab = slab();
        slab.atoms_mut()[0].tag = AtomTag::Adsorbate;
        assign_surface_tags(&mut slab, 1.0);
        let tags = slab.tags();
        assert_eq!(
            tags,
            vec![AtomTag::Subsurface, AtomTag::Subsurface, AtomTag::Surface]
        );
    }

    #[test]
    fn existing_surface_tags_are_kept() {
        let mut slab = slab();
        slab.atoms_mut()[1].tag = AtomTag::Surface;
        assign_surface_tags(&mut slab, 1.0);
        assert_eq!(
            slab.tags(),
            vec![AtomTag::Subsurface, AtomTag::Surface, AtomTag::Subsurface]
        );
    }

    #[test]
    fn single_atom_becomes_surface() {
        let mut single = AtomicStructure::from_atoms(vec![atom("Cu", 0.0, 0.0, 0.0)]);
        assign_surface_tags(&mut single, 1.0);
        assert_eq!(single.tags(), vec![AtomTag::Surface]);
    }
}
