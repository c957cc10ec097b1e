use super::read_definition;
use crate::cli::EvaluateArgs;
use crate::config::build_config;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use adsorbent_search::core::io::traits::StructureFile;
use adsorbent_search::core::io::xyz::{XyzFile, XyzMetadata};
use adsorbent_search::engine::evaluator::{EvaluationReport, RelaxationEvaluator};
use adsorbent_search::engine::optimizer::{RelaxationSummary, TrajectoryFrame};
use adsorbent_search::engine::progress::ProgressReporter;
use adsorbent_search::workflows;
use std::path::Path;
use tracing::{info, warn};

pub async fn run(args: EvaluateArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let config = build_config(&args.relaxation, None, None)?;

    info!("Loading material definition from {:?}", &args.definition);
    let definition = read_definition(&args.definition)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let evaluator = RelaxationEvaluator::default();

    println!("Evaluating {} on '{}'...", args.formula, definition.name);
    let report = tokio::task::block_in_place(|| {
        workflows::evaluate::run(
            &args.formula,
            &definition,
            &config.relaxation,
            &evaluator,
            &reporter,
        )
    })?;

    if !report.converged() {
        warn!("At least one relaxation stage stopped at the step limit.");
    }

    if args.json {
        let json = serde_json::to_string_pretty(&report.result)
            .map_err(|e| CliError::Other(e.into()))?;
        println!("{}", json);
    } else {
        print!("{}", format_report(&report));
    }

    if let Some(path) = &args.trajectory {
        write_trajectory(&report.trajectory, path)?;
        println!(
            "✓ Trajectory ({} frames) written to: {}",
            report.trajectory.len(),
            path.display()
        );
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn format_report(report: &EvaluationReport) -> String {
    let result = &report.result;
    let stage = |name: &str, summary: &RelaxationSummary| {
        format!(
            "{:<24}{} after {} steps (fmax {:.4} eV/Å)\n",
            name,
            if summary.converged { "converged" } else { "not converged" },
            summary.steps,
            summary.max_force
        )
    };
    let mut out = String::new();
    out.push_str(&format!("{:<24}{:.6} eV\n", "Relaxed energy:", result.relaxed_energy));
    out.push_str(&format!("{:<24}{}\n", "Dissociated:", yes_no(result.adsorbate_dissociated)));
    out.push_str(&format!("{:<24}{}\n", "Desorbed:", yes_no(result.adsorbate_desorbed)));
    out.push_str(&format!("{:<24}{}\n", "Surface changed:", yes_no(result.surface_changed)));
    out.push_str(&format!("{:<24}{}\n", "Intercalated:", yes_no(result.adsorbate_intercalated)));
    out.push_str(&stage("Adsorbent relaxation:", &report.adsorbent_relaxation));
    out.push_str(&stage("Adsorbate relaxation:", &report.adsorbate_relaxation));
    out
}

fn write_trajectory(frames: &[TrajectoryFrame], path: &Path) -> Result<()> {
    let metadata: Vec<XyzMetadata> = frames
        .iter()
        .map(|frame| XyzMetadata {
            energy: Some(frame.energy),
        })
        .collect();
    let structures = frames.iter().map(|frame| &frame.structure);
    XyzFile::write_frames_to_path(structures.zip(metadata.iter()), path).map_err(|e| {
        CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        }
    })
}
