//! # Engine Module
//!
//! The relaxation engine that turns an adsorbate and an adsorbent into the metrics
//! reported back to the search agent.
//!
//! ## Overview
//!
//! An evaluation runs in two stages. The adsorbent is first relaxed on its own with
//! vacuum padding along z. The adsorbate is then placed above its highest atom and the
//! combined system is relaxed again while every frame is recorded. The first and last
//! frames are compared to classify what happened to the adsorbate and the surface.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Model selection, convergence criteria and placement settings
//! - **Checkpoints** ([`checkpoint`]) - The on-disk model cache and name resolution
//! - **Optimization** ([`optimizer`]) - BFGS minimization with trajectory recording
//! - **Placement** ([`placement`]) - Adsorbate positioning and surface tagging
//! - **Anomaly Detection** ([`anomaly`]) - Connectivity comparison between trajectory frames
//! - **Evaluation** ([`evaluator`]) - The two-stage procedure and its result types
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod anomaly;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod optimizer;
pub mod placement;
pub mod progress;
