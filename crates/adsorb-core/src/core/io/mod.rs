//! Reading and writing atomic structures.
//!
//! Structures and relaxation trajectories are exchanged as extended XYZ, which keeps
//! the cell, the periodic flags, per-atom tags and per-frame energies alongside the
//! coordinates.

pub mod traits;
pub mod xyz;
