use super::read_definition;
use crate::cli::CheckArgs;
use crate::error::{CliError, Result};
use adsorbent_search::core::generator;
use adsorbent_search::core::io::traits::StructureFile;
use adsorbent_search::core::io::xyz::{XyzFile, XyzMetadata};
use adsorbent_search::core::materials::registry::ENTRY_POINT;
use adsorbent_search::core::models::atom::AtomTag;
use adsorbent_search::core::models::structure::AtomicStructure;
use itertools::Itertools;
use tracing::info;

pub async fn run(args: CheckArgs) -> Result<()> {
    let definition = read_definition(&args.definition)?;
    let module = generator::compile(&definition.source_code).map_err(|e| CliError::FileParsing {
        path: args.definition.clone(),
        source: e.into(),
    })?;
    info!(
        generators = %module.generator_names().join(", "),
        "Compiled {:?}",
        &args.definition
    );

    let function = args.function.as_deref().unwrap_or(ENTRY_POINT);
    let structure = module
        .generator(function)
        .and_then(|g| g.invoke())
        .map_err(|e| CliError::Argument(e.to_string()))?;
    structure
        .validate()
        .map_err(|e| CliError::Argument(format!("Generated structure is invalid: {}", e)))?;

    print!("{}", summarize(function, &structure));

    if let Some(output) = &args.output {
        XyzFile::write_to_path(&structure, &XyzMetadata::default(), output).map_err(|e| {
            CliError::FileParsing {
                path: output.clone(),
                source: e.into(),
            }
        })?;
        println!("✓ Structure written to: {}", output.display());
    }
    Ok(())
}

fn summarize(function: &str, structure: &AtomicStructure) -> String {
    let tags = structure.tags();
    let count = |tag: AtomTag| tags.iter().filter(|&&t| t == tag).count();
    let pbc = structure
        .pbc()
        .iter()
        .map(|&p| if p { "T" } else { "F" })
        .join(" ");
    let lengths = structure.cell().lengths();
    format!(
        "Generator:  {}\nFormula:    {}\nAtoms:      {} (subsurface {}, surface {}, adsorbate {})\nCell:       {:.3} x {:.3} x {:.3} Å\nPeriodic:   {}\n",
        function,
        structure.chemical_formula(),
        structure.len(),
        count(AtomTag::Subsurface),
        count(AtomTag::Surface),
        count(AtomTag::Adsorbate),
        lengths[0],
        lengths[1],
        lengths[2],
        pbc
    )
}
