//! Data quality checks over the integrated table

use crate::config::AgeRange;
use crate::error::Result;
use crate::frame::has_column;
use crate::merge::SURVEY_YEAR_COLUMN;
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct QualityReport {
    pub total_rows: usize,
    /// Columns with at least one missing value
    pub missing_values: BTreeMap<String, usize>,
    /// Rows per survey year whose age is missing or out of range
    pub invalid_ages: BTreeMap<i32, usize>,
    /// Non-null `has_benefits` values other than 0 and 1
    pub invalid_benefit_flags: usize,
}

impl QualityReport {
    pub fn from_frame(df: &DataFrame, age_range: AgeRange) -> Result<Self> {
        let missing_values = df
            .get_columns()
            .iter()
            .filter(|s| s.null_count() > 0)
            .map(|s| (s.name().to_string(), s.null_count()))
            .collect();

        let mut invalid_ages = BTreeMap::new();
        if has_column(df, "age") && has_column(df, SURVEY_YEAR_COLUMN) {
            let ages = df.column("age")?.cast(&DataType::Float64)?;
            let years = df.column(SURVEY_YEAR_COLUMN)?.cast(&DataType::Int32)?;
            for (age, year) in ages.f64()?.into_iter().zip(years.i32()?.into_iter()) {
                let valid = age.map(|a| age_range.contains(a)).unwrap_or(false);
                if let (false, Some(year)) = (valid, year) {
                    *invalid_ages.entry(year).or_insert(0) += 1;
                }
            }
        }

        let invalid_benefit_flags = if has_column(df, "has_benefits") {
            df.column("has_benefits")?
                .cast(&DataType::Int64)?
                .i64()?
                .into_iter()
                .flatten()
                .filter(|v| !(0..=1).contains(v))
                .count()
        } else {
            0
        };

        Ok(Self {
            total_rows: df.height(),
            missing_values,
            invalid_ages,
            invalid_benefit_flags,
        })
    }

    pub fn log(&self) {
        info!(
            "Quality report: {} rows, {} columns with missing values",
            self.total_rows,
            self.missing_values.len()
        );
        for (column, count) in &self.missing_values {
            debug!("  {}: {} missing", column, count);
        }
        for (year, count) in &self.invalid_ages {
            warn!("Survey {}: {} rows with missing or out-of-range age", year, count);
        }
        if self.invalid_benefit_flags > 0 {
            warn!("{} has_benefits values outside 0/1", self.invalid_benefit_flags);
        }
    }
}
