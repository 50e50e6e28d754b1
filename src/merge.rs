//! Union merge of the aligned vintages
//!
//! Rows are stacked, columns are unioned. Every row carries the `survey_year`
//! it came from, and a column absent from a vintage is null for its rows.

use crate::error::{EtlError, Result};
use itertools::Itertools;
use polars::prelude::*;
use tracing::{debug, info};

pub const SURVEY_YEAR_COLUMN: &str = "survey_year";

fn stamp_year(df: &DataFrame, year: u16) -> Result<DataFrame> {
    let mut stamped = df.clone();
    stamped.with_column(Series::new(
        SURVEY_YEAR_COLUMN,
        vec![year as i32; df.height()],
    ))?;
    Ok(stamped)
}

/// Shared dtype of a column across tables; String when they disagree
fn unified_dtype(tables: &[DataFrame], name: &str) -> DataType {
    let dtypes: Vec<&DataType> = tables
        .iter()
        .filter_map(|df| df.column(name).ok().map(|s| s.dtype()))
        .collect();

    if dtypes.iter().all_equal() {
        dtypes.first().map(|dt| (*dt).clone()).unwrap_or(DataType::String)
    } else {
        debug!("Column '{}' has mixed types {:?}, keeping it as text", name, dtypes);
        DataType::String
    }
}

/// Stack `tables` in the given order. Output columns are the union of the
/// input columns in first-seen order, so the same inputs always produce the
/// same layout.
pub fn union_merge(tables: &[(u16, &DataFrame)]) -> Result<DataFrame> {
    let stamped: Vec<DataFrame> = tables
        .iter()
        .map(|(year, df)| stamp_year(df, *year))
        .collect::<Result<_>>()?;

    let columns: Vec<String> = stamped
        .iter()
        .flat_map(|df| df.get_column_names().into_iter().map(|c| c.to_string()))
        .unique()
        .collect();

    let dtypes: Vec<DataType> = columns
        .iter()
        .map(|name| unified_dtype(&stamped, name))
        .collect();

    let mut merged: Option<DataFrame> = None;
    for df in &stamped {
        let mut series = Vec::with_capacity(columns.len());
        for (name, dtype) in columns.iter().zip(&dtypes) {
            let column = match df.column(name) {
                Ok(s) => s.cast(dtype).map_err(|e| {
                    EtlError::Polars(format!("Failed to cast {} to {}: {}", name, dtype, e))
                })?,
                Err(_) => Series::full_null(name, df.height(), dtype),
            };
            series.push(column);
        }

        let aligned = DataFrame::new(series)?;
        match merged.as_mut() {
            Some(out) => {
                out.vstack_mut(&aligned)?;
            }
            None => merged = Some(aligned),
        }
    }

    let mut merged = merged.unwrap_or_default();
    merged.align_chunks();

    info!(
        "Merged {} surveys into {} rows x {} columns",
        tables.len(),
        merged.height(),
        merged.width()
    );
    Ok(merged)
}
