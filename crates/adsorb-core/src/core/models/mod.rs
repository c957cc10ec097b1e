//! # Core Models Module
//!
//! Data structures describing atomic systems: the adsorbent slabs produced by
//! structure generators, the adsorbate molecules built from chemical formulas, and
//! the combined systems the relaxation engine works on.
//!
//! ## Key Components
//!
//! - [`atom`] - A single atom with element, Cartesian position and anomaly tag
//! - [`cell`] - The simulation cell with its plane normals and periodic images
//! - [`structure`] - [`AtomicStructure`](structure::AtomicStructure): atoms, cell and
//!   periodic flags, with centering, tiling and validation
//! - [`neighbors`] - Covalent-cutoff connectivity under periodic boundary conditions
//! - [`formula`] - Chemical-formula parsing and gas-phase molecule construction
//!
//! ## Usage
//!
//! ```ignore
//! use adsorbent_search::core::models::formula::molecule_from_formula;
//!
//! let mut co2 = molecule_from_formula("CO2")?;
//! co2.center(Some(5.0), 2)?;
//! assert_eq!(co2.chemical_formula(), "CO2");
//! ```

pub mod atom;
pub mod cell;
pub mod formula;
pub mod neighbors;
pub mod structure;
