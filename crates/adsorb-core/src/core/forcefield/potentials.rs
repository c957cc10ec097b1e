const MIN_DISTANCE: f64 = 1e-6;
const OVERLAP_ENERGY: f64 = 1e10;

#[inline]
pub fn morse(dist: f64, r0: f64, well_depth: f64, stiffness: f64) -> f64 {
    if dist < MIN_DISTANCE {
        return OVERLAP_ENERGY;
    }
    let decay = (-stiffness * (dist - r0)).exp();
    well_depth * (decay * decay - 2.0 * decay)
}

/// dV/dr of [`morse`].
#[inline]
pub fn morse_derivative(dist: f64, r0: f64, well_depth: f64, stiffness: f64) -> f64 {
    if dist < MIN_DISTANCE {
        return 0.0;
    }
    let decay = (-stiffness * (dist - r0)).exp();
    2.0 * stiffness * well_depth * (decay - decay * decay)
}

#[inline]
pub fn lennard_jones_12_6(dist: f64, r_min: f64, well_depth: f64) -> f64 {
    if dist < MIN_DISTANCE {
        return OVERLAP_ENERGY;
    }
    let rho = r_min / dist;
    let rho6 = rho.powi(6);
    let rho12 = rho6 * rho6;
    well_depth * (rho12 - 2.0 * rho6)
}

/// dV/dr of [`lennard_jones_12_6`].
#[inline]
pub fn lennard_jones_12_6_derivative(dist: f64, r_min: f64, well_depth: f64) -> f64 {
    if dist < MIN_DISTANCE {
        return 0.0;
    }
    let rho = r_min / dist;
    let rho6 = rho.powi(6);
    let rho12 = rho6 * rho6;
    12.0 * well_depth / dist * (rho6 - rho12)
}
