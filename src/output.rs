//! Output writers for the cleaned vintages, the integrated table and the run
//! metadata.

use crate::config::PipelineConfig;
use crate::error::{EtlError, Result};
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

pub const PROCESSING_STEPS: &[&str] = &[
    "Column standardization",
    "Missing value imputation",
    "Data type conversion",
    "Feature engineering",
    "Country-level aggregation",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunMetadata {
    pub created_date: String,
    pub data_sources: Vec<String>,
    pub processing_steps: Vec<String>,
}

impl RunMetadata {
    pub fn new(data_sources: Vec<String>) -> Self {
        Self {
            created_date: Local::now()
                .naive_local()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
            data_sources,
            processing_steps: PROCESSING_STEPS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub fn write_csv(df: &DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        EtlError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to create {}: {}", path.display(), e),
        ))
    })?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df.clone())
        .map_err(|e| EtlError::Polars(format!("Failed to write {}: {}", path.display(), e)))?;
    Ok(())
}

/// JSON with 4-space indentation
pub fn write_metadata(metadata: &RunMetadata, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut file, PrettyFormatter::with_indent(b"    "));
    metadata.serialize(&mut serializer)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Write every output of a run. Directories are created when absent and
/// existing files are overwritten.
pub fn write_outputs(
    config: &PipelineConfig,
    cleaned: &[(u16, DataFrame)],
    integrated: &DataFrame,
    metadata: &RunMetadata,
) -> Result<()> {
    std::fs::create_dir_all(&config.processed_dir)?;
    std::fs::create_dir_all(&config.outputs_dir)?;

    let integrated_path = config.integrated_path();
    write_csv(integrated, &integrated_path)?;
    info!(
        "Wrote {} rows to {}",
        integrated.height(),
        integrated_path.display()
    );

    for (year, df) in cleaned {
        let path = config.cleaned_path(*year);
        write_csv(df, &path)?;
        info!("Wrote survey {} ({} rows) to {}", year, df.height(), path.display());
    }

    write_metadata(metadata, &config.metadata_path())?;
    info!("Data and metadata saved to: {}", config.outputs_dir.display());
    Ok(())
}
