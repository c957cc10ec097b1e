//! # Adsorbent Search Core Library
//!
//! Building blocks for an agent-driven search over candidate adsorbent materials:
//! materials are described in a small declarative structure-generator language,
//! registered under a name, and evaluated by relaxing a test molecule on their
//! surface with a force field.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`AtomicStructure`, `Cell`,
//!   elements), the chemical-formula builder, the structure-generator language, the
//!   material registry, force-field parameters and the pair-potential calculator,
//!   and extended-XYZ I/O.
//!
//! - **[`engine`]: The Relaxation Engine.** Checkpoint resolution, the BFGS optimizer,
//!   adsorbate placement, trajectory anomaly detection and the evaluator that ties
//!   them into the two-stage relaxation procedure.
//!
//! - **[`workflows`]: The Public API.** The search orchestrator that exposes the
//!   registry and the evaluator as tools to an external agent runtime, plus a
//!   one-shot evaluation entry point.

pub mod core;
pub mod engine;
pub mod workflows;
