//! Per-vintage cleaning
//!
//! One cleaner for every vintage, parameterised by its `VintageSchema`:
//! header normalisation, sentinel fills, age coercion and imputation, gender
//! bucketing and timestamp parsing. The input frame is never modified.

use crate::config::{AgeRange, GenderMatching, PipelineConfig};
use crate::error::{EtlError, Result};
use crate::frame::{
    fill_missing, missing_rate, median, require_column, text_values, unique_names, FillValue,
};
use crate::schema::{
    HeaderStyle, TimestampRule, VintageSchema, FEMALE_KEYWORDS, MALE_KEYWORDS, SPARSE_THRESHOLD,
};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::{debug, info, warn};

pub fn clean(df: &DataFrame, schema: &VintageSchema, config: &PipelineConfig) -> Result<DataFrame> {
    info!("Cleaning {} survey data ({} rows)...", schema.year, df.height());

    let mut result = normalize_headers(df, schema.header_style)?;
    result = apply_fills(&result, schema)?;
    if let Some(sentinel) = schema.sparse_fill {
        let mut owned = vec![schema.column(schema.age_column), schema.column(schema.gender_column)];
        if let Some(rule) = &schema.timestamp {
            owned.push(schema.column(rule.column));
        }
        result = fill_sparse_columns(&result, sentinel, &owned)?;
    }
    result = clean_age(&result, schema, config.age_range)?;
    result = clean_gender(&result, schema, config.gender_matching)?;
    if let Some(rule) = &schema.timestamp {
        result = parse_timestamps(&result, schema, rule)?;
    }

    Ok(result)
}

/// Normalise every header; names that collide afterwards get `_1`, `_2`, ...
pub fn normalize_headers(df: &DataFrame, style: HeaderStyle) -> Result<DataFrame> {
    let names = unique_names(
        df.get_columns().iter().map(|s| style.normalize(s.name())),
        "_",
    );
    let columns: Vec<Series> = df
        .get_columns()
        .iter()
        .zip(&names)
        .map(|(series, name)| series.clone().with_name(name))
        .collect();

    DataFrame::new(columns)
        .map_err(|e| EtlError::Polars(format!("Failed to normalise headers: {}", e)))
}

fn apply_fills(df: &DataFrame, schema: &VintageSchema) -> Result<DataFrame> {
    let mut result = df.clone();
    for (raw, sentinel) in schema.fills {
        let name = schema.column(raw);
        if require_column(&result, schema, &name)? {
            result = fill_missing(&result, &name, FillValue::Text(*sentinel))?;
        }
    }
    Ok(result)
}

/// Fill every text column whose missing rate exceeds the sparse threshold,
/// except those in `skip`. Which columns qualify depends on the data.
pub fn fill_sparse_columns(df: &DataFrame, sentinel: &'static str, skip: &[String]) -> Result<DataFrame> {
    let sparse: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|s| !skip.iter().any(|name| name == s.name()))
        .filter(|s| s.dtype() == &DataType::String && missing_rate(s) > SPARSE_THRESHOLD)
        .map(|s| s.name().to_string())
        .collect();

    debug!("Filling {} sparse columns with '{}'", sparse.len(), sentinel);

    let mut result = df.clone();
    for name in &sparse {
        result = fill_missing(&result, name, FillValue::Text(sentinel))?;
    }
    Ok(result)
}

/// Coerce ages to numbers, null out anything outside `range`, then impute the
/// median of the remaining valid ages of this survey.
pub fn clean_age(df: &DataFrame, schema: &VintageSchema, range: AgeRange) -> Result<DataFrame> {
    let name = schema.column(schema.age_column);
    if !require_column(df, schema, &name)? {
        return Ok(df.clone());
    }

    let parsed: Vec<Option<f64>> = text_values(df, &name)?
        .iter()
        .map(|v| {
            v.as_deref()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|age| range.contains(*age))
        })
        .collect();

    let valid: Vec<f64> = parsed.iter().flatten().copied().collect();
    let replaced = parsed.len() - valid.len();
    let fill = median(&valid);

    match fill {
        Some(m) => info!(
            "Survey {}: replacing {} missing or out-of-range ages with median {}",
            schema.year, replaced, m
        ),
        None => warn!(
            "Survey {}: no valid ages in '{}', leaving them missing",
            schema.year, name
        ),
    }

    let ages: Vec<Option<f64>> = parsed.into_iter().map(|v| v.or(fill)).collect();

    let mut result = df.clone();
    result.with_column(Series::new(&name, ages))?;
    Ok(result)
}

/// Bucket a free-text gender answer into `male`, `female` or `other`.
/// Male keywords are checked first.
pub fn classify_gender(raw: Option<&str>, matching: GenderMatching) -> &'static str {
    let Some(raw) = raw else {
        return "other";
    };
    let value = raw.trim().to_lowercase();

    let hit = |keyword: &&str| match matching {
        GenderMatching::Substring => value.contains(*keyword),
        GenderMatching::Exact => value == *keyword,
    };

    if MALE_KEYWORDS.iter().any(hit) {
        "male"
    } else if FEMALE_KEYWORDS.iter().any(hit) {
        "female"
    } else {
        "other"
    }
}

pub fn clean_gender(df: &DataFrame, schema: &VintageSchema, matching: GenderMatching) -> Result<DataFrame> {
    let name = schema.column(schema.gender_column);
    if !require_column(df, schema, &name)? {
        return Ok(df.clone());
    }

    let buckets: Vec<&str> = text_values(df, &name)?
        .iter()
        .map(|v| classify_gender(v.as_deref(), matching))
        .collect();

    let mut result = df.clone();
    result.with_column(Series::new(&name, buckets))?;
    Ok(result)
}

pub fn parse_timestamp(value: &str, formats: &[&str]) -> Option<NaiveDateTime> {
    let value = value.trim();
    formats.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(value, fmt)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(value, fmt)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    })
}

/// Unparseable timestamps become null rather than failing the run
pub fn parse_timestamps(df: &DataFrame, schema: &VintageSchema, rule: &TimestampRule) -> Result<DataFrame> {
    let name = schema.column(rule.column);
    if !require_column(df, schema, &name)? {
        return Ok(df.clone());
    }

    let millis: Vec<Option<i64>> = text_values(df, &name)?
        .iter()
        .map(|v| {
            v.as_deref()
                .and_then(|s| parse_timestamp(s, rule.formats))
                .map(|dt| dt.and_utc().timestamp_millis())
        })
        .collect();

    let unparsed = millis.iter().filter(|v| v.is_none()).count();
    if unparsed > 0 {
        warn!(
            "Survey {}: {} timestamps could not be parsed",
            schema.year, unparsed
        );
    }

    let timestamps = Series::new(&name, millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .map_err(|e| EtlError::Polars(format!("Failed to build timestamps for {}: {}", name, e)))?;

    let mut result = df.clone();
    result.with_column(timestamps)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SURVEY_2014, SURVEY_2016, SURVEY_2025};

    fn ages(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name).unwrap().f64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_classify_gender_substring() {
        let m = GenderMatching::Substring;
        assert_eq!(classify_gender(Some("Male"), m), "male");
        assert_eq!(classify_gender(Some(" M "), m), "male");
        assert_eq!(classify_gender(Some("Trans Male"), m), "male");
        assert_eq!(classify_gender(Some("F"), m), "female");
        assert_eq!(classify_gender(Some("Cis Woman"), m), "male");
        assert_eq!(classify_gender(Some("queer"), m), "other");
        assert_eq!(classify_gender(Some(""), m), "other");
        assert_eq!(classify_gender(None, m), "other");
    }

    #[test]
    fn test_substring_matching_classifies_female_as_male() {
        // "female" contains "male", and male keywords win.
        assert_eq!(
            classify_gender(Some("Female"), GenderMatching::Substring),
            "male"
        );
        assert_eq!(
            classify_gender(Some("Female"), GenderMatching::Exact),
            "female"
        );
    }

    #[test]
    fn test_classify_gender_exact() {
        let m = GenderMatching::Exact;
        assert_eq!(classify_gender(Some("Trans Male"), m), "male");
        assert_eq!(classify_gender(Some("cis woman"), m), "female");
        assert_eq!(classify_gender(Some("Female (trans)"), m), "female");
        assert_eq!(classify_gender(Some("Agender"), m), "other");
    }

    #[test]
    fn test_normalize_headers_dedups_collisions() {
        let df = df![
            "Why or why not?" => ["a"],
            "why or why not" => ["b"],
            "Age" => ["30"],
        ]
        .unwrap();
        let out = normalize_headers(&df, HeaderStyle::SnakeCase).unwrap();
        assert_eq!(
            out.get_column_names(),
            &["why_or_why_not", "why_or_why_not_1", "age"]
        );
    }

    #[test]
    fn test_normalize_headers_avoids_existing_suffix() {
        let df = df![
            "X" => ["a"],
            "x" => ["b"],
            "x_1" => ["c"],
        ]
        .unwrap();
        let out = normalize_headers(&df, HeaderStyle::Lowercase).unwrap();
        assert_eq!(out.get_column_names(), &["x", "x_1", "x_1_1"]);
        assert_eq!(
            text_values(&out, "x_1_1").unwrap(),
            vec![Some("c".to_string())]
        );
    }

    #[test]
    fn test_sparse_fill_threshold_is_strict() {
        // 3 of 10 missing is exactly 30%, which is not sparse
        let at_threshold: Vec<Option<&str>> = (0..10)
            .map(|i| if i < 3 { None } else { Some("yes") })
            .collect();
        let above_threshold: Vec<Option<&str>> = (0..10)
            .map(|i| if i < 4 { None } else { Some("yes") })
            .collect();
        let df = df![
            "at" => at_threshold,
            "above" => above_threshold,
        ]
        .unwrap();

        let out = fill_sparse_columns(&df, "Not specified", &[]).unwrap();
        assert_eq!(out.column("at").unwrap().null_count(), 3);
        assert_eq!(out.column("above").unwrap().null_count(), 0);

        let skipped = fill_sparse_columns(&df, "Not specified", &["above".to_string()]).unwrap();
        assert_eq!(skipped.column("above").unwrap().null_count(), 4);
    }

    #[test]
    fn test_clean_2016_sparse_gender_stays_other() {
        let df = df![
            "What is your age?" => [Some("30"), None, None],
            "What is your gender?" => [Some("Male"), None, None],
            "How many employees does your company or organization have?" => ["6-25", "6-25", "26-100"],
            "Is your employer primarily a tech company/organization?" => ["1", "1", "0"],
        ]
        .unwrap();

        let out = clean(&df, &SURVEY_2016, &PipelineConfig::default()).unwrap();

        assert_eq!(
            text_values(&out, "what_is_your_gender").unwrap(),
            vec![
                Some("male".to_string()),
                Some("other".to_string()),
                Some("other".to_string())
            ]
        );
        assert_eq!(
            ages(&out, "what_is_your_age"),
            vec![Some(30.0), Some(30.0), Some(30.0)]
        );
    }

    #[test]
    fn test_clean_age_imputes_median() {
        let df = df![
            "age" => [Some("17"), Some("30"), Some("abc"), Some("40"), None, Some("101"), Some("35")],
        ]
        .unwrap();
        let out = clean_age(&df, &SURVEY_2014, AgeRange::default()).unwrap();
        // valid: 30, 40, 35 -> median 35
        assert_eq!(
            ages(&out, "age"),
            vec![Some(35.0), Some(30.0), Some(35.0), Some(40.0), Some(35.0), Some(35.0), Some(35.0)]
        );
        // input frame untouched
        assert_eq!(df.column("age").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_clean_age_bounds_are_inclusive() {
        let df = df!["age" => ["18", "100", "18.5", "99999999999", "-1726"]].unwrap();
        let out = clean_age(&df, &SURVEY_2014, AgeRange::default()).unwrap();
        assert_eq!(
            ages(&out, "age"),
            vec![Some(18.0), Some(100.0), Some(18.5), Some(18.5), Some(18.5)]
        );
    }

    #[test]
    fn test_clean_age_without_valid_values_stays_missing() {
        let df = df!["age" => [Some("5"), None]].unwrap();
        let out = clean_age(&df, &SURVEY_2014, AgeRange::default()).unwrap();
        assert_eq!(ages(&out, "age"), vec![None, None]);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let iso = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d"];
        assert!(parse_timestamp("2014-08-27 11:29:31", iso).is_some());
        assert_eq!(
            parse_timestamp("2014-08-27", iso),
            NaiveDate::from_ymd_opt(2014, 8, 27).unwrap().and_hms_opt(0, 0, 0)
        );
        assert!(parse_timestamp("yesterday", iso).is_none());

        let dayfirst = &["%d/%m/%Y %H:%M:%S"];
        assert_eq!(
            parse_timestamp("03/04/2025 10:00:00", dayfirst),
            NaiveDate::from_ymd_opt(2025, 4, 3).unwrap().and_hms_opt(10, 0, 0)
        );
    }

    #[test]
    fn test_clean_2014_frame() {
        let df = df![
            "Timestamp" => ["2014-08-27 11:29:31", "not a date", "2014-08-27 11:30:00"],
            "Age" => ["37", "17", "29"],
            "Gender" => ["Trans Male", "f", "nonbinary"],
            "Country" => ["United States", "Canada", "UK"],
            "state" => [Some("IL"), None, None],
            "self_employed" => [None::<&str>, Some("No"), Some("Yes")],
            "work_interfere" => [Some("Often"), None, Some("Never")],
            "comments" => [None::<&str>, None, Some("ok")],
        ]
        .unwrap();

        let out = clean(&df, &SURVEY_2014, &PipelineConfig::default()).unwrap();

        assert_eq!(
            out.get_column_names(),
            &["timestamp", "age", "gender", "country", "state", "self_employed", "work_interfere", "comments"]
        );
        assert_eq!(ages(&out, "age"), vec![Some(37.0), Some(33.0), Some(29.0)]);

        let gender = text_values(&out, "gender").unwrap();
        assert_eq!(
            gender,
            vec![Some("male".to_string()), Some("female".to_string()), Some("other".to_string())]
        );

        let state = text_values(&out, "state").unwrap();
        assert_eq!(state[1].as_deref(), Some("Unknown"));
        let comments = text_values(&out, "comments").unwrap();
        assert_eq!(comments[0].as_deref(), Some("No comments"));

        let ts = out.column("timestamp").unwrap();
        assert!(matches!(ts.dtype(), DataType::Datetime(TimeUnit::Milliseconds, _)));
        assert_eq!(ts.null_count(), 1);
    }

    #[test]
    fn test_clean_2014_requires_enumerated_columns() {
        let df = df![
            "Timestamp" => ["2014-08-27 11:29:31"],
            "Age" => ["37"],
            "Gender" => ["Male"],
        ]
        .unwrap();
        let result = clean(&df, &SURVEY_2014, &PipelineConfig::default());
        assert!(matches!(result, Err(EtlError::MissingColumn { vintage: 2014, .. })));
    }

    #[test]
    fn test_clean_2016_sparse_fill() {
        let df = df![
            "What is your age?" => ["25", "x", "45", "35"],
            "What is your gender?" => ["Male", "female", "other", "F"],
            "How many employees does your company or organization have?" => [Some("6-25"), None, Some("26-100"), Some("1-5")],
            "Is your employer primarily a tech company/organization?" => [Some("1"), Some("0"), None, Some("1")],
            "Why or why not?" => [None::<&str>, None, Some("privacy"), None],
            "Do you work remotely?" => [Some("Sometimes"), Some("Never"), None, Some("Always")],
        ]
        .unwrap();

        let out = clean(&df, &SURVEY_2016, &PipelineConfig::default()).unwrap();

        let employees = text_values(&out, "how_many_employees_does_your_company_or_organization_have").unwrap();
        assert_eq!(employees[1].as_deref(), Some("Unknown"));

        // 3/4 missing -> filled
        let why = text_values(&out, "why_or_why_not").unwrap();
        assert_eq!(why[0].as_deref(), Some("Not specified"));

        // 1/4 missing -> untouched
        let remote = text_values(&out, "do_you_work_remotely").unwrap();
        assert_eq!(remote[2], None);

        assert_eq!(
            ages(&out, "what_is_your_age"),
            vec![Some(25.0), Some(35.0), Some(45.0), Some(35.0)]
        );
    }

    #[test]
    fn test_clean_2025_skips_missing_columns() {
        let df = df![
            "Horodateur" => ["27/03/2025 14:05:12"],
            "Age" => ["28"],
            "Country" => ["DE"],
        ]
        .unwrap();

        let out = clean(&df, &SURVEY_2025, &PipelineConfig::default()).unwrap();
        assert_eq!(out.get_column_names(), &["horodateur", "age", "country"]);
        assert_eq!(out.column("horodateur").unwrap().null_count(), 0);
    }
}
