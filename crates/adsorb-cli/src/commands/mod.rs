pub mod check;
pub mod evaluate;
pub mod models;
pub mod search;

use crate::error::{CliError, Result};
use adsorbent_search::core::materials::MaterialDefinition;
use std::path::Path;

/// Loads a material definition file, naming the material after the file stem.
pub(crate) fn read_definition(path: &Path) -> Result<MaterialDefinition> {
    let source = std::fs::read_to_string(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("adsorbent")
        .to_string();
    Ok(MaterialDefinition::new(name, source, ""))
}
