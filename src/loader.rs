//! Survey loaders
//!
//! Each source is read into a frame of nullable text columns carrying the
//! source's own headers. No normalisation happens here; a network or file
//! error aborts the run.

use crate::config::SourceLocation;
use crate::error::{EtlError, Result};
use crate::frame::unique_names;
use csv::ReaderBuilder;
use polars::prelude::*;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

pub fn load_source(location: &SourceLocation, null_markers: &[String]) -> Result<DataFrame> {
    match location {
        SourceLocation::Url { url } => fetch_remote_csv(url, null_markers),
        SourceLocation::File { path } => read_local_csv(path, null_markers),
    }
}

/// Single blocking GET, no retry
pub fn fetch_remote_csv(url: &str, null_markers: &[String]) -> Result<DataFrame> {
    info!("Loading survey responses from CSV URL {}", url);
    let body = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;
    debug!("Downloaded {} bytes", body.len());
    parse_csv(body.as_ref(), null_markers)
}

pub fn read_local_csv(path: &Path, null_markers: &[String]) -> Result<DataFrame> {
    info!("Loading survey responses from {}", path.display());
    let file = File::open(path).map_err(|e| {
        EtlError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open {}: {}", path.display(), e),
        ))
    })?;
    parse_csv(file, null_markers)
}

/// Parse CSV text into String columns. Cells equal to one of `null_markers`
/// become null; short rows are padded with nulls.
pub fn parse_csv<R: Read>(reader: R, null_markers: &[String]) -> Result<DataFrame> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = dedup_headers(rdr.headers()?.iter());
    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

    for result in rdr.records() {
        let record = result?;
        for (idx, values) in columns.iter_mut().enumerate() {
            let value = record
                .get(idx)
                .filter(|cell| !null_markers.iter().any(|m| m == cell))
                .map(|cell| cell.to_string());
            values.push(value);
        }
    }

    let series: Vec<Series> = headers
        .iter()
        .zip(columns)
        .map(|(name, values)| Series::new(name.as_str(), values))
        .collect();

    DataFrame::new(series)
        .map_err(|e| EtlError::Polars(format!("Failed to build survey frame: {}", e)))
}

/// Repeated headers become `name.1`, `name.2`, ...
fn dedup_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let headers = raw.enumerate().map(|(idx, header)| {
        if idx == 0 {
            header.trim_start_matches('\u{feff}').to_string()
        } else {
            header.to_string()
        }
    });
    unique_names(headers, ".")
}
