use crate::error::{EtlError, Result};
use crate::schema::VintageSchema;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Literal used to fill missing cells
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillValue {
    Text(&'static str),
    Int(i64),
}

impl FillValue {
    pub fn as_text(&self) -> String {
        match self {
            FillValue::Text(s) => s.to_string(),
            FillValue::Int(v) => v.to_string(),
        }
    }
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Check a column the cleaner or aligner needs. Strict vintages fail, the
/// others log and tell the caller to skip the step.
pub fn require_column(df: &DataFrame, schema: &VintageSchema, name: &str) -> Result<bool> {
    if has_column(df, name) {
        return Ok(true);
    }
    if schema.strict {
        return Err(EtlError::MissingColumn {
            vintage: schema.year,
            column: name.to_string(),
        });
    }
    warn!(
        "Survey {}: column '{}' not found, skipping. Available columns: {:?}",
        schema.year,
        name,
        df.get_column_names()
    );
    Ok(false)
}

/// Column values as owned text, casting non-text columns first
pub fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(name)?
        .cast(&DataType::String)
        .map_err(|e| EtlError::Polars(format!("Failed to read column {} as text: {}", name, e)))?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();
    Ok(values)
}

pub fn missing_rate(series: &Series) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.null_count() as f64 / series.len() as f64
}

/// Fill null cells of one column, keeping the column's dtype
pub fn fill_missing(df: &DataFrame, name: &str, value: FillValue) -> Result<DataFrame> {
    let dtype = df.column(name)?.dtype().clone();

    let fill = match (&dtype, value) {
        (DataType::String, v) => lit(v.as_text()),
        (dt, FillValue::Int(v)) if dt.is_numeric() => lit(v),
        (dt, FillValue::Text(s)) => {
            return Err(EtlError::Schema(format!(
                "Cannot fill {} column '{}' with text '{}'",
                dt, name, s
            )))
        }
        (dt, FillValue::Int(_)) => {
            return Err(EtlError::Schema(format!(
                "Cannot fill {} column '{}' with an integer",
                dt, name
            )))
        }
    };

    df.clone()
        .lazy()
        .with_columns([col(name).fill_null(fill).cast(dtype).alias(name)])
        .collect()
        .map_err(|e| EtlError::Polars(format!("Failed to fill missing values in {}: {}", name, e)))
}

/// Rename columns that are present; absent sources are ignored
pub fn rename_columns(df: &DataFrame, renames: &[(String, &str)]) -> Result<DataFrame> {
    let mut result = df.clone();
    for (from, to) in renames {
        if from == to || !has_column(&result, from) {
            continue;
        }
        if has_column(&result, to) {
            return Err(EtlError::Schema(format!(
                "Cannot rename '{}' to '{}': column already exists",
                from, to
            )));
        }
        result.rename(from, to)?;
    }
    Ok(result)
}

/// Make column names unique by appending `{separator}1`, `{separator}2`, ...
/// to repeats. A generated name never reuses one already emitted.
pub fn unique_names<I>(names: I, separator: &str) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut emitted: HashSet<String> = HashSet::new();
    let mut counters: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();

    for base in names {
        let mut name = base.clone();
        if emitted.contains(&name) {
            let count = counters.entry(base.clone()).or_insert(0);
            loop {
                *count += 1;
                name = format!("{}{}{}", base, separator, count);
                if !emitted.contains(&name) {
                    break;
                }
            }
        }
        emitted.insert(name.clone());
        out.push(name);
    }

    out
}

/// Median of the given values; even counts average the two middle values
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SURVEY_2014, SURVEY_2025};

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[31.0]), Some(31.0));
        assert_eq!(median(&[40.0, 20.0, 30.0]), Some(30.0));
        assert_eq!(median(&[20.0, 30.0, 40.0, 50.0]), Some(35.0));
    }

    #[test]
    fn test_unique_names_skips_taken_suffixes() {
        let names = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert_eq!(
            unique_names(names(&["x", "x", "x_1"]), "_"),
            vec!["x", "x_1", "x_1_1"]
        );
        assert_eq!(
            unique_names(names(&["x_1", "x", "x"]), "_"),
            vec!["x_1", "x", "x_2"]
        );
        assert_eq!(
            unique_names(names(&["a", "a", "a"]), "."),
            vec!["a", "a.1", "a.2"]
        );
    }

    #[test]
    fn test_fill_missing_text_and_numeric() {
        let df = df![
            "treatment" => [Some("Yes"), None],
            "score" => [Some(2i32), None],
        ]
        .unwrap();

        let filled = fill_missing(&df, "treatment", FillValue::Int(0)).unwrap();
        let values = text_values(&filled, "treatment").unwrap();
        assert_eq!(values, vec![Some("Yes".to_string()), Some("0".to_string())]);

        let filled = fill_missing(&df, "score", FillValue::Int(1)).unwrap();
        let score = filled.column("score").unwrap();
        assert_eq!(score.dtype(), &DataType::Int32);
        assert_eq!(score.i32().unwrap().get(1), Some(1));

        assert!(fill_missing(&df, "score", FillValue::Text("n/a")).is_err());
    }

    #[test]
    fn test_rename_columns() {
        let df = df![
            "what_is_your_age" => ["30"],
            "gender" => ["male"],
        ]
        .unwrap();

        let renamed = rename_columns(
            &df,
            &[
                ("what_is_your_age".to_string(), "age"),
                ("not_there".to_string(), "ignored"),
            ],
        )
        .unwrap();
        assert_eq!(renamed.get_column_names(), &["age", "gender"]);
        // input untouched
        assert_eq!(df.get_column_names(), &["what_is_your_age", "gender"]);

        let clash = rename_columns(&df, &[("what_is_your_age".to_string(), "gender")]);
        assert!(clash.is_err());
    }

    #[test]
    fn test_require_column_strictness() {
        let df = df!["age" => ["30"]].unwrap();
        assert!(require_column(&df, &SURVEY_2014, "age").unwrap());
        assert!(matches!(
            require_column(&df, &SURVEY_2014, "gender"),
            Err(EtlError::MissingColumn { vintage: 2014, .. })
        ));
        assert!(!require_column(&df, &SURVEY_2025, "gender").unwrap());
    }
}
