use crate::error::Result;
use crate::frame::{fill_missing, has_column, FillValue};
use polars::prelude::*;
use tracing::{debug, info};

/// Defaults for columns that stay missing after the merge
pub const COLUMN_DEFAULTS: &[(&str, FillValue)] = &[
    ("family_history", FillValue::Text("No")),
    ("treatment", FillValue::Int(0)),
    ("benefits", FillValue::Text("Don't know")),
    ("self_employed", FillValue::Text("Unknown")),
    ("remote_work", FillValue::Text("No")),
    ("tech_company", FillValue::Text("Unknown")),
    ("comments", FillValue::Text("No comments")),
];

/// Free-text and vintage-specific columns left out of the integrated output
pub const DROPPED_COLUMNS: &[&str] = &[
    "phys_health_interview_why",
    "mental_health_interview_why",
    "diagnosed_condition",
    "suspected_condition",
    "professional_diagnosis_details",
    "position",
    "work_state",
    "state",
];

pub fn fill_defaults(df: &DataFrame) -> Result<DataFrame> {
    let mut result = df.clone();
    for (name, value) in COLUMN_DEFAULTS {
        if !has_column(&result, name) {
            continue;
        }
        let missing = result.column(name)?.null_count();
        if missing > 0 {
            debug!("Filling {} missing '{}' values with {:?}", missing, name, value);
            result = fill_missing(&result, name, *value)?;
        }
    }
    Ok(result)
}

pub fn drop_columns(df: &DataFrame) -> Result<DataFrame> {
    let mut result = df.clone();
    for name in DROPPED_COLUMNS {
        if has_column(&result, name) {
            debug!("Dropping column '{}'", name);
            result = result.drop(name)?;
        }
    }
    Ok(result)
}

pub fn finalize(df: &DataFrame) -> Result<DataFrame> {
    info!("Applying merged-table defaults and dropping free-text columns...");
    let filled = fill_defaults(df)?;
    drop_columns(&filled)
}
