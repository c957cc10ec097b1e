use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One `test_molecule_on_adsorbent` call as seen by the session.
///
/// Metric columns are empty when the call failed; `error` is empty when it succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub adsorbent: String,
    pub adsorbate: String,
    pub adsorbate_dissociated: Option<bool>,
    pub adsorbate_desorbed: Option<bool>,
    pub surface_changed: Option<bool>,
    pub adsorbate_intercalated: Option<bool>,
    pub relaxed_energy: Option<f64>,
    pub adsorbent_converged: Option<bool>,
    pub adsorbate_converged: Option<bool>,
    pub error: Option<String>,
}

impl EvaluationRecord {
    pub fn failed(adsorbent: &str, adsorbate: &str, error: impl Into<String>) -> Self {
        Self {
            adsorbent: adsorbent.to_string(),
            adsorbate: adsorbate.to_string(),
            adsorbate_dissociated: None,
            adsorbate_desorbed: None,
            surface_changed: None,
            adsorbate_intercalated: None,
            relaxed_energy: None,
            adsorbent_converged: None,
            adsorbate_converged: None,
            error: Some(error.into()),
        }
    }
}

pub fn write_history<W: Write>(records: &[EvaluationRecord], writer: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_history_csv(records: &[EvaluationRecord], path: &Path) -> Result<(), csv::Error> {
    let file = File::create(path)?;
    write_history(records, BufWriter::new(file))
}
