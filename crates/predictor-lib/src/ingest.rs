//! File ingestion
//!
//! Reads feature files and extractor output into [`RawInput`]. Failures
//! are request scoped and reported as [`PredictError::InvalidInput`].

use crate::error::PredictError;
use crate::predictor::RawInput;
use std::collections::BTreeMap;
use std::path::Path;

/// Read a `.txt` or `.csv` feature file; `row` picks the CSV data row, 0-based
pub fn read_feature_file(path: &Path, row: usize) -> Result<RawInput, PredictError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("txt") if row > 0 => Err(PredictError::invalid(
            path.display().to_string(),
            "a .txt file holds a single sample, row selection needs .csv",
        )),
        Some("txt") => Ok(parse_txt(&read(path)?)),
        Some("csv") => parse_csv(&read(path)?, row),
        _ => Err(PredictError::invalid(
            path.display().to_string(),
            "unsupported file type, expected .txt or .csv",
        )),
    }
}

/// Read a JSON object of named features from a signal extractor
pub fn read_named_features(path: &Path) -> Result<RawInput, PredictError> {
    let features: BTreeMap<String, f64> = serde_json::from_str(&read(path)?)
        .map_err(|e| PredictError::invalid(path.display().to_string(), e.to_string()))?;
    Ok(RawInput::Named(features))
}

/// Read a JSON array of positional features from an image extractor
pub fn read_positional_features(path: &Path) -> Result<RawInput, PredictError> {
    let values: Vec<f32> = serde_json::from_str(&read(path)?)
        .map_err(|e| PredictError::invalid(path.display().to_string(), e.to_string()))?;
    Ok(RawInput::Positional(values))
}

fn read(path: &Path) -> Result<String, PredictError> {
    std::fs::read_to_string(path)
        .map_err(|e| PredictError::invalid(path.display().to_string(), e.to_string()))
}

/// Whitespace-separated tokens, one per line or all on one line
pub fn parse_txt(text: &str) -> RawInput {
    RawInput::Values(text.split_whitespace().map(str::to_string).collect())
}

/// Header record plus the data record at `row`; blank lines are skipped
pub fn parse_csv(text: &str, row: usize) -> Result<RawInput, PredictError> {
    let mut records = csv_records(text).into_iter();

    let header = records
        .next()
        .ok_or_else(|| PredictError::invalid("csv", "file is empty"))?;
    let rows: Vec<Vec<String>> = records.collect();
    if rows.is_empty() {
        return Err(PredictError::invalid("csv", "no data row after the header"));
    }

    let available = rows.len();
    let cells = rows.into_iter().nth(row).ok_or_else(|| {
        PredictError::invalid(
            "csv",
            format!("row {} out of range, file has {} data rows", row, available),
        )
    })?;
    Ok(RawInput::Row { header, cells })
}

/// Split CSV text into records. Handles a leading BOM, CRLF endings,
/// double quotes with `""` escapes and line breaks inside quoted cells.
fn csv_records(text: &str) -> Vec<Vec<String>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => record.push(std::mem::take(&mut cell).trim().to_string()),
            '\r' if !quoted => {}
            '\n' if !quoted => end_record(&mut records, &mut record, &mut cell),
            _ => cell.push(c),
        }
    }
    end_record(&mut records, &mut record, &mut cell);
    records
}

fn end_record(records: &mut Vec<Vec<String>>, record: &mut Vec<String>, cell: &mut String) {
    record.push(std::mem::take(cell).trim().to_string());
    let finished = std::mem::take(record);
    if finished.iter().any(|c| !c.is_empty()) {
        records.push(finished);
    }
}
