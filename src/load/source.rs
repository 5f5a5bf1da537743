//! CSV input.
//!
//! The export is read whole into memory. Only the six columns the loader needs
//! are deserialized; any extra columns are ignored. Empty fields become `None`,
//! and so do trailing fields missing from a short line.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;

use crate::error::{LoadError, LoadResult};

/// Header names that must be present in the export.
pub const REQUIRED_COLUMNS: [&str; 6] = ["Message_ID", "Date", "From", "Subject", "recipient", "Size"];

/// One raw row of the export, before any normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SourceRow {
    #[serde(rename = "Message_ID")]
    pub message_id: Option<String>,
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "Subject")]
    pub subject: Option<String>,
    #[serde(rename = "recipient")]
    pub recipient: Option<String>,
    #[serde(rename = "Size")]
    pub size: Option<String>,
}

pub fn read_csv_path(path: &Path) -> LoadResult<Vec<SourceRow>> {
    log::info!("reading CSV export {}", path.display());
    let file = File::open(path)?;
    read_csv(file)
}

/// Read every row from a CSV source.
///
/// Fails with `MissingColumns` before reading any data row when the header
/// lacks one of `REQUIRED_COLUMNS`.
pub fn read_csv<R: Read>(input: R) -> LoadResult<Vec<SourceRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|header| header == **column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    let rows = reader
        .deserialize::<SourceRow>()
        .collect::<Result<Vec<_>, _>>()?;

    log::info!("read {} rows", rows.len());
    Ok(rows)
}
