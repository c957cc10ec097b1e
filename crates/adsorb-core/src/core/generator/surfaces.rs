use super::MAX_GENERATED_ATOMS;
use crate::core::elements::Element;
use crate::core::models::atom::{Atom, AtomTag};
use crate::core::models::cell::Cell;
use crate::core::models::structure::AtomicStructure;
use nalgebra::{Point3, Vector3};
use std::str::FromStr;

/// Low-index surface facets the generator language can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Fcc100,
    Fcc111,
    Bcc100,
    Hcp0001,
}

impl FromStr for SurfaceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fcc100" => Ok(SurfaceKind::Fcc100),
            "fcc111" => Ok(SurfaceKind::Fcc111),
            "bcc100" => Ok(SurfaceKind::Bcc100),
            "hcp0001" => Ok(SurfaceKind::Hcp0001),
            other => Err(format!(
                "Unknown surface '{}' (expected fcc100, fcc111, bcc100 or hcp0001)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSpec {
    pub kind: SurfaceKind,
    pub element: Element,
    /// Repetitions along the two in-plane vectors and number of layers.
    pub size: [usize; 3],
    pub lattice_constant: f64,
    /// Only used by hcp surfaces. Defaults to the ideal `a * sqrt(8/3)`.
    pub c: Option<f64>,
    pub vacuum: Option<f64>,
}

struct Lattice {
    in_plane: [Vector3<f64>; 2],
    layer_spacing: f64,
    /// In-plane offset of layer `k` is `stacking[k % stacking.len()]`.
    stacking: Vec<Vector3<f64>>,
}

fn lattice(spec: &SurfaceSpec) -> Lattice {
    let a = spec.lattice_constant;
    match spec.kind {
        SurfaceKind::Fcc100 => {
            let d = a / 2f64.sqrt();
            Lattice {
                in_plane: [Vector3::new(d, 0.0, 0.0), Vector3::new(0.0, d, 0.0)],
                layer_spacing: a / 2.0,
                stacking: vec![Vector3::zeros(), Vector3::new(d / 2.0, d / 2.0, 0.0)],
            }
        }
        SurfaceKind::Bcc100 => Lattice {
            in_plane: [Vector3::new(a, 0.0, 0.0), Vector3::new(0.0, a, 0.0)],
            layer_spacing: a / 2.0,
            stacking: vec![Vector3::zeros(), Vector3::new(a / 2.0, a / 2.0, 0.0)],
        },
        SurfaceKind::Fcc111 => {
            let d = a / 2f64.sqrt();
            let v1 = Vector3::new(d, 0.0, 0.0);
            let v2 = Vector3::new(d / 2.0, d * 3f64.sqrt() / 2.0, 0.0);
            let step = (v1 + v2) / 3.0;
            Lattice {
                in_plane: [v1, v2],
                layer_spacing: a / 3f64.sqrt(),
                stacking: vec![Vector3::zeros(), step, step * 2.0],
            }
        }
        SurfaceKind::Hcp0001 => {
            let c = spec.c.unwrap_or(a * (8.0f64 / 3.0).sqrt());
            let v1 = Vector3::new(a, 0.0, 0.0);
            let v2 = Vector3::new(a / 2.0, a * 3f64.sqrt() / 2.0, 0.0);
            Lattice {
                in_plane: [v1, v2],
                layer_spacing: c / 2.0,
                stacking: vec![Vector3::zeros(), (v1 + v2) / 3.0],
            }
        }
    }
}

/// Builds a slab periodic in the surface plane. The topmost layer is tagged as
/// surface and every other layer as subsurface.
pub fn build_surface(spec: &SurfaceSpec) -> Result<AtomicStructure, String> {
    if !(spec.lattice_constant.is_finite() && spec.lattice_constant > 0.0) {
        return Err(format!(
            "Lattice constant must be a positive number (got {})",
            spec.lattice_constant
        ));
    }
    if let Some(c) = spec.c.filter(|c| !(c.is_finite() && *c > 0.0)) {
        return Err(format!("Lattice constant c must be positive (got {})", c));
    }
    if spec.size.iter().any(|&n| n == 0) {
        return Err(format!(
            "Surface size must be at least 1 along every axis (got {:?})",
            spec.size
        ));
    }
    if let Some(vacuum) = spec.vacuum.filter(|v| !(v.is_finite() && *v >= 0.0)) {
        return Err(format!("Vacuum must be non-negative (got {})", vacuum));
    }

    let [nx, ny, layers] = spec.size;
    let count = nx
        .checked_mul(ny)
        .and_then(|n| n.checked_mul(layers))
        .filter(|&n| n <= MAX_GENERATED_ATOMS)
        .ok_or_else(|| {
            format!(
                "Surface size {:?} would exceed {} atoms",
                spec.size, MAX_GENERATED_ATOMS
            )
        })?;

    let lattice = lattice(spec);
    let mut atoms = Vec::with_capacity(count);
    for k in 0..layers {
        let tag = if k + 1 == layers {
            AtomTag::Surface
        } else {
            AtomTag::Subsurface
        };
        let offset = lattice.stacking[k % lattice.stacking.len()]
            + Vector3::new(0.0, 0.0, k as f64 * lattice.layer_spacing);
        for j in 0..ny {
            for i in 0..nx {
                let position = lattice.in_plane[0] * i as f64 + lattice.in_plane[1] * j as f64 + offset;
                atoms.push(Atom::new(spec.element, Point3::from(position)).with_tag(tag));
            }
        }
    }

    let cell = Cell::new(
        lattice.in_plane[0] * nx as f64,
        lattice.in_plane[1] * ny as f64,
        Vector3::new(0.0, 0.0, layers as f64 * lattice.layer_spacing),
    );
    let mut slab = AtomicStructure::new(atoms, cell, [true, true, false]);
    if let Some(vacuum) = spec.vacuum {
        slab.center(Some(vacuum), 2).map_err(|e| e.to_string())?;
    }
    Ok(slab)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: SurfaceKind, size: [usize; 3]) -> SurfaceSpec {
        SurfaceSpec {
            kind,
            element: Element::from_symbol("Cu").unwrap(),
            size,
            lattice_constant: 3.61,
            c: None,
            vacuum: Some(10.0),
        }
    }

    fn min_distance(structure: &AtomicStructure) -> f64 {
        let positions = structure.positions();
        let images = structure.cell().image_translations(structure.pbc(), 4.0).unwrap();
        let mut best = f64::MAX;
        for (i, a) in positions.iter().enumerate() {
            for (j, b) in positions.iter().enumerate() {
                for t in &images {
                    if i == j && t.norm() == 0.0 {
                        continue;
                    }
                    best = best.min((b + t - a).norm());
                }
            }
        }
        best
    }

    #[test]
    fn fcc111_slab_has_nearest_neighbour_spacing() {
        let slab = build_surface(&spec(SurfaceKind::Fcc111, [2, 2, 3])).unwrap();
        assert_eq!(slab.len(), 12);
        assert!((min_distance(&slab) - 3.61 / 2f64.sqrt()).abs() < 1e-9);
        assert_eq!(slab.pbc(), [true, true, false]);
    }

    #[test]
    fn fcc100_slab_has_nearest_neighbour_spacing() {
        let slab = build_surface(&spec(SurfaceKind::Fcc100, [2, 2, 2])).unwrap();
        assert_eq!(slab.len(), 8);
        assert!((min_distance(&slab) - 3.61 / 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn only_the_top_layer_is_tagged_surface() {
        let slab = build_surface(&spec(SurfaceKind::Bcc100, [2, 2, 3])).unwrap();
        let surface: Vec<_> = slab
            .atoms()
            .iter()
            .filter(|a| a.tag == AtomTag::Surface)
            .collect();
        assert_eq!(surface.len(), 4);
        let top = slab.atoms().iter().map(|a| a.position.z).fold(f64::MIN, f64::max);
        assert!(surface.iter().all(|a| (a.position.z - top).abs() < 1e-9));
    }

    #[test]
    fn vacuum_pads_both_sides_of_the_slab() {
        let slab = build_surface(&spec(SurfaceKind::Hcp0001, [1, 1, 2])).unwrap();
        let zs: Vec<f64> = slab.atoms().iter().map(|a| a.position.z).collect();
        let bottom = zs.iter().copied().fold(f64::MAX, f64::min);
        let top = zs.iter().copied().fold(f64::MIN, f64::max);
        assert!((bottom - 10.0).abs() < 1e-9);
        assert!((slab.cell().lengths()[2] - (top + 10.0)).abs() < 1e-9);
    }

    #[test]
    fn oversized_slab_is_rejected_before_building() {
        for size in [[100_000, 100_000, 100_000], [u32::MAX as usize; 3], [224, 224, 1]] {
            let error = build_surface(&spec(SurfaceKind::Fcc100, size)).unwrap_err();
            assert!(error.contains("would exceed"), "{}", error);
        }
        let largest = build_surface(&spec(SurfaceKind::Fcc100, [50, 50, 20])).unwrap();
        assert_eq!(largest.len(), MAX_GENERATED_ATOMS);
    }

    #[test]
    fn rejects_invalid_parameters() {
        let mut bad = spec(SurfaceKind::Fcc111, [2, 0, 3]);
        assert!(build_surface(&bad).is_err());
        bad.size = [1, 1, 1];
        bad.lattice_constant = -1.0;
        assert!(build_surface(&bad).is_err());
    }

    #[test]
    fn surface_kind_parses_case_insensitively() {
        assert_eq!("FCC111".parse::<SurfaceKind>(), Ok(SurfaceKind::Fcc111));
        assert!("fcc110".parse::<SurfaceKind>().is_err());
    }
}
