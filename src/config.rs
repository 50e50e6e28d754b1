//! Pipeline configuration
//!
//! Source locations, output directories and cleaning parameters. A
//! `PipelineConfig` is built once at startup and passed into `pipeline::run`.

use crate::error::{EtlError, Result};
use crate::schema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Published CSV export of the 2025 Google Form responses
pub const SURVEY_2025_CSV_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vR3vkqIO5V9IO3ap6X7RSPVScbBp8J02ZnOKRu3vnrvQOha_9pKEJ7_bUilHiB3hgrJ1UWUZGZNR_CS/pub?gid=1966309919&single=true&output=csv";

/// Where a survey's raw CSV comes from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceLocation {
    Url { url: String },
    File { path: PathBuf },
}

impl SourceLocation {
    pub fn describe(&self) -> String {
        match self {
            SourceLocation::Url { url } => url.clone(),
            SourceLocation::File { path } => path.display().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    pub year: u16,
    pub location: SourceLocation,
}

/// Inclusive range of plausible respondent ages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AgeRange {
    pub min: f64,
    pub max: f64,
}

impl AgeRange {
    pub fn contains(&self, age: f64) -> bool {
        age >= self.min && age <= self.max
    }
}

impl Default for AgeRange {
    fn default() -> Self {
        Self { min: 18.0, max: 100.0 }
    }
}

/// How free-text gender answers are matched against the keyword lists.
///
/// `Substring` reproduces the historical categorisation, where a keyword found
/// anywhere in the answer counts as a match ("female" contains "male").
/// `Exact` requires the whole answer to equal a keyword.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenderMatching {
    #[default]
    Substring,
    Exact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw survey sources, in load order
    pub sources: Vec<SourceConfig>,

    /// Directory for the per-vintage cleaned CSVs
    pub processed_dir: PathBuf,

    /// Directory for the integrated CSV and metadata
    pub outputs_dir: PathBuf,

    /// Prefix prepended to every output file name
    pub output_prefix: String,

    pub age_range: AgeRange,

    /// Cell texts read as missing values
    pub null_markers: Vec<String>,

    pub gender_matching: GenderMatching,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let raw_dir = PathBuf::from("data").join("raw");
        Self {
            sources: vec![
                SourceConfig {
                    year: 2025,
                    location: SourceLocation::Url {
                        url: SURVEY_2025_CSV_URL.to_string(),
                    },
                },
                SourceConfig {
                    year: 2014,
                    location: SourceLocation::File {
                        path: raw_dir.join("survey_2014.csv"),
                    },
                },
                SourceConfig {
                    year: 2016,
                    location: SourceLocation::File {
                        path: raw_dir.join("survey_2016.csv"),
                    },
                },
            ],
            processed_dir: PathBuf::from("data").join("processed"),
            outputs_dir: PathBuf::from("data").join("outputs"),
            output_prefix: String::new(),
            age_range: AgeRange::default(),
            null_markers: ["", "NA", "N/A", "NaN", "nan", "null"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            gender_matching: GenderMatching::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let range = self.age_range;
        if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
            return Err(EtlError::Config(format!(
                "Invalid age range [{}, {}]",
                range.min, range.max
            )));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.year) {
                return Err(EtlError::Config(format!(
                    "Survey {} is configured more than once",
                    source.year
                )));
            }
            if schema::lookup(source.year).is_none() {
                return Err(EtlError::Config(format!(
                    "No schema descriptor for survey {}",
                    source.year
                )));
            }
        }

        for vintage in schema::registry() {
            if !seen.contains(&vintage.year) {
                return Err(EtlError::Config(format!(
                    "No source configured for survey {}",
                    vintage.year
                )));
            }
        }

        Ok(())
    }

    pub fn cleaned_path(&self, year: u16) -> PathBuf {
        self.processed_dir
            .join(format!("{}cleaned_survey_{}.csv", self.output_prefix, year))
    }

    pub fn integrated_path(&self) -> PathBuf {
        self.outputs_dir
            .join(format!("{}integrated.csv", self.output_prefix))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.outputs_dir
            .join(format!("{}metadata.json", self.output_prefix))
    }
}
