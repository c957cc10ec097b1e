//! # Force Field Module
//!
//! Energies and forces for the relaxation engine.
//!
//! ## Overview
//!
//! The relaxation engine only sees the [`calculator::Calculator`] trait: give it a
//! structure, get back the potential energy and the force on every atom. Calculators
//! are created by a [`calculator::CalculatorFactory`] from a checkpoint file, which
//! keeps the engine independent of the model that actually produces the numbers.
//!
//! The bundled implementation is a pair potential:
//!
//! - **Morse** and **Lennard-Jones 12-6** radial terms, shifted to zero at the cutoff
//! - **Parameter files** in TOML with per-element defaults and explicit pair overrides
//! - **Periodic images** within the cutoff under the structure's boundary conditions
//!
//! ## Key Components
//!
//! - [`params`] - Checkpoint parameter files and pair-coefficient mixing
//! - [`builtin`] - Parameter sets shipped with the library
//! - [`calculator`] - The calculator interface and the pair-potential calculator

pub mod builtin;
pub mod calculator;
pub mod params;
pub(crate) mod potentials;
