//! Cross-vintage alignment
//!
//! Renames each vintage's columns onto the shared vocabulary, canonicalises
//! country and gender values and derives the numeric features.

use crate::error::{EtlError, Result};
use crate::frame::{has_column, rename_columns, text_values};
use crate::schema::{self, benefits_flag, canonical_country, canonical_gender, impact_score, VintageSchema};
use polars::prelude::*;
use tracing::{info, warn};

fn present(df: &DataFrame, schema: &VintageSchema, name: &str, step: &str) -> bool {
    if has_column(df, name) {
        return true;
    }
    warn!(
        "Survey {}: no '{}' column, skipping {}",
        schema.year, name, step
    );
    false
}

pub fn align(df: &DataFrame, schema: &VintageSchema) -> Result<DataFrame> {
    let mut result = rename_columns(df, &schema.canonical_renames())?;

    if present(&result, schema, "country", "country standardisation") {
        let countries: Vec<Option<String>> = text_values(&result, "country")?
            .into_iter()
            .map(|v| v.map(|c| canonical_country(&c).to_string()))
            .collect();
        result.with_column(Series::new("country", countries))?;
    }

    if present(&result, schema, "gender", "gender encoding") {
        let genders: Vec<&str> = text_values(&result, "gender")?
            .iter()
            .map(|v| canonical_gender(v.as_deref()))
            .collect();
        result.with_column(Series::new("gender", genders))?;
    }

    if schema.derive_impact_score && present(&result, schema, "work_interfere", "mh_impact_score") {
        let scores: Vec<Option<i32>> = text_values(&result, "work_interfere")?
            .iter()
            .map(|v| v.as_deref().and_then(impact_score))
            .collect();
        result.with_column(Series::new("mh_impact_score", scores))?;
    }

    if schema.derive_benefits_flag && present(&result, schema, "benefits", "has_benefits") {
        let flags: Vec<i32> = text_values(&result, "benefits")?
            .iter()
            .map(|v| benefits_flag(v.as_deref()))
            .collect();
        result.with_column(Series::new("has_benefits", flags))?;
    }

    Ok(result)
}

/// Align every cleaned vintage, keeping the input order
pub fn transform_all(frames: &[(u16, DataFrame)]) -> Result<Vec<(u16, DataFrame)>> {
    info!("Aligning {} surveys to the shared schema...", frames.len());
    frames
        .iter()
        .map(|(year, df)| {
            let vintage = schema::lookup(*year)
                .ok_or_else(|| EtlError::Config(format!("No schema descriptor for survey {}", year)))?;
            Ok((*year, align(df, vintage)?))
        })
        .collect()
}
