//! # Core Module
//!
//! The foundation layer of the adsorbent search library. Everything in here is free
//! of optimization state: data models, parsers, parameter files and the pieces that
//! turn user-supplied text into atomic structures.
//!
//! ## Architecture
//!
//! - **Chemistry tables** ([`elements`]) - Periodic table data used for covalent cutoffs
//! - **Structure Representation** ([`models`]) - Atoms, cells and atomic structures, plus
//!   the chemical-formula builder for adsorbate molecules
//! - **Structure Generators** ([`generator`]) - The declarative language that material
//!   definitions are written in, with its compiler and interpreter
//! - **Material Registry** ([`materials`]) - Validated, name-keyed material definitions
//! - **Energy Calculations** ([`forcefield`]) - Checkpoint parameters, pair potentials and
//!   the calculator interface consumed by the relaxation engine
//! - **File I/O** ([`io`]) - Reading and writing structures and trajectories

pub mod elements;
pub mod forcefield;
pub mod generator;
pub mod io;
pub mod materials;
pub mod models;
