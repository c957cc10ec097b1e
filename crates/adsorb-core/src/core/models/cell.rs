use super::structure::StructureError;
use itertools::iproduct;
use nalgebra::{Matrix3, Vector3};

const ZERO_VECTOR_EPS: f64 = 1e-12;

/// Most periodic images a single pair search may visit.
pub const MAX_IMAGE_TRANSLATIONS: usize = 100_000;

fn unit_axis(axis: usize) -> Vector3<f64> {
    let mut v = Vector3::zeros();
    v[axis] = 1.0;
    v
}

fn is_zero_vector(v: &Vector3<f64>) -> bool {
    v.norm() < ZERO_VECTOR_EPS
}

/// The simulation cell, stored as three lattice vectors `a`, `b` and `c`.
///
/// Any of the vectors may be zero, which means the structure has no extent along
/// that direction (an isolated molecule has an all-zero cell).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    vectors: [Vector3<f64>; 3],
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            vectors: [Vector3::zeros(); 3],
        }
    }
}

impl Cell {
    pub fn new(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Self {
        Self { vectors: [a, b, c] }
    }

    pub fn orthorhombic(x: f64, y: f64, z: f64) -> Self {
        Self::new(
            Vector3::new(x, 0.0, 0.0),
            Vector3::new(0.0, y, 0.0),
            Vector3::new(0.0, 0.0, z),
        )
    }

    pub fn vector(&self, axis: usize) -> Vector3<f64> {
        self.vectors[axis]
    }

    pub fn vectors(&self) -> &[Vector3<f64>; 3] {
        &self.vectors
    }

    pub fn set_vector(&mut self, axis: usize, vector: Vector3<f64>) {
        self.vectors[axis] = vector;
    }

    pub fn is_zero(&self) -> bool {
        self.vectors.iter().all(is_zero_vector)
    }

    pub fn is_finite(&self) -> bool {
        self.vectors
            .iter()
            .all(|v| v.iter().all(|component| component.is_finite()))
    }

    pub fn lengths(&self) -> [f64; 3] {
        [
            self.vectors[0].norm(),
            self.vectors[1].norm(),
            self.vectors[2].norm(),
        ]
    }

    pub fn volume(&self) -> f64 {
        self.vectors[0]
            .dot(&self.vectors[1].cross(&self.vectors[2]))
            .abs()
    }

    /// Returns the lattice vectors with every zero vector replaced by a unit vector
    /// orthogonal to the others, so that geometric operations always have a full basis.
    pub fn completed(&self) -> [Vector3<f64>; 3] {
        let mut filled = self.vectors;
        for axis in 0..3 {
            if !is_zero_vector(&filled[axis]) {
                continue;
            }
            let first = filled[(axis + 1) % 3];
            let second = filled[(axis + 2) % 3];
            let replacement = match (is_zero_vector(&first), is_zero_vector(&second)) {
                (false, false) => {
                    let normal = first.cross(&second);
                    if is_zero_vector(&normal) {
                        orthogonal_unit(&first, axis)
                    } else {
                        normal.normalize()
                    }
                }
                (false, true) => orthogonal_unit(&first, axis),
                (true, false) => orthogonal_unit(&second, axis),
                (true, true) => unit_axis(axis),
            };
            filled[axis] = replacement;
        }
        filled
    }

    /// Unit normal of the lattice plane spanned by the two vectors other than `axis`,
    /// oriented to point along the positive side of `axis`.
    pub fn plane_normal(&self, axis: usize) -> Vector3<f64> {
        let basis = self.completed();
        let mut normal = basis[(axis + 1) % 3]
            .cross(&basis[(axis + 2) % 3])
            .normalize();
        if normal.dot(&basis[axis]) < 0.0 {
            normal = -normal;
        }
        normal
    }

    /// Distance between the two lattice planes bounding the cell along `axis`.
    pub fn plane_spacing(&self, axis: usize) -> f64 {
        self.vectors[axis].dot(&self.plane_normal(axis)).abs()
    }

    /// Converts a Cartesian vector into fractional coordinates of the completed basis.
    pub fn to_fractional(&self, cartesian: &Vector3<f64>) -> Option<Vector3<f64>> {
        let basis = self.completed();
        Matrix3::from_columns(&basis)
            .try_inverse()
            .map(|inverse| inverse * cartesian)
    }

    /// Lattice translations that can bring a periodic image within `cutoff` of the
    /// home cell. Non-periodic or degenerate axes contribute no images. The zero
    /// translation is always first.
    ///
    /// Fails when the cell is so thin relative to `cutoff` that more than
    /// [`MAX_IMAGE_TRANSLATIONS`] images would be needed.
    pub fn image_translations(
        &self,
        pbc: [bool; 3],
        cutoff: f64,
    ) -> Result<Vec<Vector3<f64>>, StructureError> {
        let too_many = StructureError::TooManyImages {
            cutoff,
            limit: MAX_IMAGE_TRANSLATIONS,
        };
        let mut ranges = [0i64; 3];
        let mut count = 1usize;
        for axis in 0..3 {
            if !pbc[axis] || is_zero_vector(&self.vectors[axis]) {
                continue;
            }
            let spacing = self.plane_spacing(axis);
            if spacing <= ZERO_VECTOR_EPS {
                continue;
            }
            let reach = (cutoff / spacing).ceil();
            if !reach.is_finite() || reach > MAX_IMAGE_TRANSLATIONS as f64 {
                return Err(too_many);
            }
            let range = reach.max(0.0) as i64;
            count = count.saturating_mul(2 * range as usize + 1);
            if count > MAX_IMAGE_TRANSLATIONS {
                return Err(too_many);
            }
            ranges[axis] = range;
        }

        let mut translations = Vec::with_capacity(count);
        translations.push(Vector3::zeros());
        translations.extend(
            iproduct!(
                -ranges[0]..=ranges[0],
                -ranges[1]..=ranges[1],
                -ranges[2]..=ranges[2]
            )
            .filter(|&shift| shift != (0, 0, 0))
            .map(|(i, j, k)| {
                self.vectors[0] * i as f64 + self.vectors[1] * j as f64 + self.vectors[2] * k as f64
            }),
        );
        Ok(translations)
    }
}

fn orthogonal_unit(reference: &Vector3<f64>, preferred_axis: usize) -> Vector3<f64> {
    let direction = reference.normalize();
    let candidate = if direction[preferred_axis].abs() < 0.9 {
        unit_axis(preferred_axis)
    } else {
        (0..3)
            .map(unit_axis)
            .min_by(|a, b| {
                a.dot(&direction)
                    .abs()
                    .partial_cmp(&b.dot(&direction).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or_else(|| unit_axis(preferred_axis))
    };
    (candidate - direction * candidate.dot(&direction)).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn default_cell_is_zero() {
        let cell = Cell::default();
        assert!(cell.is_zero());
        assert_eq!(cell.volume(), 0.0);
    }

    #[test]
    fn orthorhombic_cell_reports_lengths_and_volume() {
        let cell = Cell::orthorhombic(2.0, 3.0, 4.0);
        assert_eq!(cell.lengths(), [2.0, 3.0, 4.0]);
        assert!((cell.volume() - 24.0).abs() < TOLERANCE);
    }

    #[test]
    fn completed_fills_an_all_zero_cell_with_identity() {
        let basis = Cell::default().completed();
        assert_eq!(basis[0], Vector3::x());
        assert_eq!(basis[1], Vector3::y());
        assert_eq!(basis[2], Vector3::z());
    }

    #[test]
    fn completed_fills_missing_axis_with_plane_normal() {
        let cell = Cell::new(
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(1.0, 2.0, 0.0),
            Vector3::zeros(),
        );
        let basis = cell.completed();
        assert!((basis[2] - Vector3::z()).norm() < TOLERANCE);
    }

    #[test]
    fn completed_handles_single_vector_parallel_to_axis() {
        let cell = Cell::new(Vector3::zeros(), Vector3::zeros(), Vector3::new(0.0, 0.0, 5.0));
        let basis = cell.completed();
        let matrix = Matrix3::from_columns(&basis);
        assert!(matrix.determinant().abs() > 0.5);
    }

    #[test]
    fn plane_spacing_of_sheared_cell_is_perpendicular_height() {
        let cell = Cell::new(
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::new(0.0, 3.0, 0.0),
            Vector3::new(1.0, 1.0, 5.0),
        );
        assert!((cell.plane_spacing(2) - 5.0).abs() < TOLERANCE);
    }

    #[test]
    fn to_fractional_inverts_the_lattice() {
        let cell = Cell::orthorhombic(2.0, 4.0, 8.0);
        let frac = cell.to_fractional(&Vector3::new(1.0, 1.0, 2.0)).unwrap();
        assert!((frac - Vector3::new(0.5, 0.25, 0.25)).norm() < TOLERANCE);
    }

    #[test]
    fn image_translations_are_empty_without_periodicity() {
        let cell = Cell::orthorhombic(5.0, 5.0, 5.0);
        let images = cell.image_translations([false, false, false], 6.0).unwrap();
        assert_eq!(images, vec![Vector3::zeros()]);
    }

    #[test]
    fn image_translations_cover_the_cutoff_along_periodic_axes() {
        let cell = Cell::orthorhombic(5.0, 5.0, 20.0);
        let images = cell.image_translations([true, true, false], 6.0).unwrap();
        assert_eq!(images.len(), 25);
        assert_eq!(images[0], Vector3::zeros());
        assert!(images.contains(&Vector3::new(10.0, -5.0, 0.0)));
    }

    #[test]
    fn image_translations_refuse_needle_thin_cells() {
        let cell = Cell::orthorhombic(0.000001, 0.000001, 10.0);
        let result = cell.image_translations([true, true, true], 6.0);
        assert!(matches!(
            result,
            Err(StructureError::TooManyImages { limit: MAX_IMAGE_TRANSLATIONS, .. })
        ));

        let thin = Cell::orthorhombic(0.5, 0.5, 0.5);
        assert!(thin.image_translations([true, true, true], 12.0).is_err());
        assert!(thin.image_translations([true, true, false], 12.0).is_ok());
    }
}
