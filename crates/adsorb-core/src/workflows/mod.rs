//! # Workflows Module
//!
//! High-level entry points built on the engine.
//!
//! ## Architecture
//!
//! - **Search** ([`search`]) - The tool-driven adsorbent search: session state, tool
//!   dispatch, the agent-runtime seam and the conversation loop.
//! - **Evaluation** ([`evaluate`]) - A single adsorbate/adsorbent evaluation straight
//!   from a material definition.

pub mod evaluate;
pub mod search;
