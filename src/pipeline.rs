//! End-to-end pipeline: load, clean, align, merge, finalise, report, write.

use crate::clean::clean;
use crate::config::PipelineConfig;
use crate::error::{EtlError, Result};
use crate::loader::load_source;
use crate::merge::union_merge;
use crate::output::{write_outputs, RunMetadata};
use crate::postprocess::finalize;
use crate::quality::QualityReport;
use crate::schema::{self, VintageSchema};
use crate::transform::transform_all;
use polars::prelude::*;
use tracing::info;

/// Result of a successful run
#[derive(Debug)]
pub struct PipelineOutput {
    pub integrated: DataFrame,
    /// Per-vintage tables after cleaning and alignment, in load order
    pub cleaned: Vec<(u16, DataFrame)>,
    pub report: QualityReport,
}

fn vintage(year: u16) -> Result<&'static VintageSchema> {
    schema::lookup(year)
        .ok_or_else(|| EtlError::Config(format!("No schema descriptor for survey {}", year)))
}

pub fn run(config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;
    info!("=== Starting ETL Pipeline ===");

    info!("Loading datasets...");
    let mut raw = Vec::with_capacity(config.sources.len());
    for source in &config.sources {
        let df = load_source(&source.location, &config.null_markers)?;
        info!(
            "Loaded survey {}: {} rows x {} columns from {}",
            source.year,
            df.height(),
            df.width(),
            source.location.describe()
        );
        raw.push((source.year, df));
    }

    let mut cleaned = Vec::with_capacity(raw.len());
    for (year, df) in &raw {
        cleaned.push((*year, clean(df, vintage(*year)?, config)?));
    }

    info!("Transforming survey data...");
    let aligned = transform_all(&cleaned)?;

    info!("Merging datasets...");
    let merge_order: Vec<(u16, &DataFrame)> = schema::registry()
        .iter()
        .filter_map(|v| aligned.iter().find(|(year, _)| *year == v.year))
        .map(|(year, df)| (*year, df))
        .collect();
    let merged = union_merge(&merge_order)?;

    let integrated = finalize(&merged)?;

    info!("Validating data quality...");
    let report = QualityReport::from_frame(&integrated, config.age_range)?;
    report.log();

    info!("Saving results...");
    let data_sources = config
        .sources
        .iter()
        .map(|s| vintage(s.year).map(|v| v.label.to_string()))
        .collect::<Result<Vec<_>>>()?;
    write_outputs(config, &aligned, &integrated, &RunMetadata::new(data_sources))?;

    info!("=== ETL Pipeline completed successfully ===");
    Ok(PipelineOutput {
        integrated,
        cleaned: aligned,
        report,
    })
}
