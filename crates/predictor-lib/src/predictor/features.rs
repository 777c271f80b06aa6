//! Feature vector construction and validation
//!
//! Turns one of the raw input shapes (manual entry, file tokens, a tabular
//! row, or extractor output) into a [`FeatureVector`] with the domain's
//! canonical arity and ordering.

use crate::error::PredictError;
use crate::ingest;
use crate::models::FeatureVector;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Raw request input before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawInput {
    /// Field name to typed text, as entered by a user
    Manual(#[serde(deserialize_with = "scalar_map")] BTreeMap<String, String>),
    /// Flat token sequence, e.g. one value per line of a text file
    Values(#[serde(deserialize_with = "scalar_seq")] Vec<String>),
    /// One tabular row with its header
    Row {
        header: Vec<String>,
        cells: Vec<String>,
    },
    /// Name-keyed output of a signal feature extractor
    Named(BTreeMap<String, f64>),
    /// Fixed-length output of an image feature extractor
    Positional(Vec<f32>),
    /// CSV document with a header line; `row` picks the data row, 0-based
    Csv {
        text: String,
        #[serde(default)]
        row: usize,
    },
}

impl RawInput {
    pub fn source(&self) -> &'static str {
        match self {
            Self::Manual(_) => "manual",
            Self::Values(_) => "values",
            Self::Row { .. } => "row",
            Self::Named(_) => "named",
            Self::Positional(_) => "positional",
            Self::Csv { .. } => "csv",
        }
    }
}

/// A scalar typed either as text or as a JSON number
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(f64),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
        }
    }
}

/// Accepts both `"1.5"` and `1.5` for manual fields
fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Scalar>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(k, v)| (k, v.into_text())).collect())
}

/// Accepts both `"1.5"` and `1.5` for flat token sequences
fn scalar_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Scalar>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(Scalar::into_text).collect())
}

/// Canonical, ordered feature names of one domain
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    names: Vec<String>,
    target_columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            target_columns: Vec::new(),
        }
    }

    /// Schema for extractor output addressed by position only
    pub fn positional(arity: usize) -> Self {
        Self::new((0..arity).map(|i| format!("f{}", i)))
    }

    /// Columns dropped from tabular rows before the arity check
    pub fn with_target_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_columns = columns
            .into_iter()
            .map(|c| c.into().trim().to_ascii_lowercase())
            .collect();
        self
    }

    pub fn arity(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn build(&self, raw: &RawInput) -> Result<FeatureVector, PredictError> {
        let values = match raw {
            RawInput::Manual(fields) => self.from_manual(fields)?,
            RawInput::Values(tokens) => self.from_tokens(tokens)?,
            RawInput::Row { header, cells } => self.from_row(header, cells)?,
            RawInput::Named(features) => self.from_named(features)?,
            RawInput::Positional(values) => self.from_positional(values)?,
            RawInput::Csv { text, row } => return self.build(&ingest::parse_csv(text, *row)?),
        };
        Ok(FeatureVector::new(self.names.clone(), values))
    }

    fn from_manual(&self, fields: &BTreeMap<String, String>) -> Result<Vec<f32>, PredictError> {
        let values = self
            .names
            .iter()
            .map(|name| {
                let raw = fields
                    .get(name)
                    .ok_or_else(|| PredictError::MissingFeature(name.clone()))?;
                parse_scalar(name, raw)
            })
            .collect::<Result<Vec<_>, _>>()?;

        if fields.len() != self.arity() {
            return Err(PredictError::shape(self.arity(), fields.len()));
        }
        Ok(values)
    }

    fn from_tokens(&self, tokens: &[String]) -> Result<Vec<f32>, PredictError> {
        if tokens.len() != self.arity() {
            return Err(PredictError::shape(self.arity(), tokens.len()));
        }
        tokens
            .iter()
            .enumerate()
            .map(|(i, t)| parse_scalar(&format!("value {}", i + 1), t))
            .collect()
    }

    fn from_row(&self, header: &[String], cells: &[String]) -> Result<Vec<f32>, PredictError> {
        if header.len() != cells.len() {
            return Err(PredictError::shape(header.len(), cells.len()));
        }

        let kept: Vec<(&String, &String)> = header
            .iter()
            .zip(cells)
            .filter(|(column, _)| !self.is_target_column(column))
            .collect();

        if kept.len() != self.arity() {
            return Err(PredictError::shape(self.arity(), kept.len()));
        }
        kept.into_iter()
            .map(|(column, cell)| parse_scalar(column.trim(), cell))
            .collect()
    }

    fn from_named(&self, features: &BTreeMap<String, f64>) -> Result<Vec<f32>, PredictError> {
        self.names
            .iter()
            .map(|name| {
                let value = features
                    .get(name)
                    .ok_or_else(|| PredictError::MissingFeature(name.clone()))?;
                narrow(name, *value)
            })
            .collect()
    }

    fn from_positional(&self, values: &[f32]) -> Result<Vec<f32>, PredictError> {
        if values.len() != self.arity() {
            return Err(PredictError::shape(self.arity(), values.len()));
        }
        for (name, value) in self.names.iter().zip(values) {
            if !value.is_finite() {
                return Err(PredictError::invalid(name, format!("{} is not finite", value)));
            }
        }
        Ok(values.to_vec())
    }

    fn is_target_column(&self, column: &str) -> bool {
        let column = column.trim().to_ascii_lowercase();
        self.target_columns.iter().any(|t| *t == column)
    }
}

fn parse_scalar(field: &str, raw: &str) -> Result<f32, PredictError> {
    let trimmed = raw.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| PredictError::invalid(field, format!("'{}' is not a number", trimmed)))?;
    narrow(field, value)
}

fn narrow(field: &str, value: f64) -> Result<f32, PredictError> {
    if !value.is_finite() {
        return Err(PredictError::invalid(field, format!("{} is not finite", value)));
    }
    let narrowed = value as f32;
    if !narrowed.is_finite() {
        return Err(PredictError::invalid(
            field,
            format!("{} is out of range", value),
        ));
    }
    Ok(narrowed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(["age", "chol", "thalach"]).with_target_columns(["num"])
    }

    fn manual(pairs: &[(&str, &str)]) -> RawInput {
        RawInput::Manual(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_manual_entry_in_canonical_order() {
        let fv = schema()
            .build(&manual(&[("thalach", "150"), ("age", " 63 "), ("chol", "233.5")]))
            .unwrap();
        assert_eq!(fv.values(), &[63.0, 233.5, 150.0]);
        assert_eq!(fv.names()[0], "age");
        assert_eq!(fv.get("chol"), Some(233.5));
    }

    #[test]
    fn test_manual_entry_names_bad_field() {
        let err = schema()
            .build(&manual(&[("age", "63"), ("chol", "high"), ("thalach", "150")]))
            .unwrap_err();
        match err {
            PredictError::InvalidInput { field, .. } => assert_eq!(field, "chol"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_manual_entry_rejects_non_finite() {
        let err = schema()
            .build(&manual(&[("age", "NaN"), ("chol", "1"), ("thalach", "1")]))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_input");

        let err = schema()
            .build(&manual(&[("age", "1e300"), ("chol", "1"), ("thalach", "1")]))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_manual_entry_missing_and_surplus_fields() {
        let err = schema()
            .build(&manual(&[("age", "63"), ("chol", "233")]))
            .unwrap_err();
        assert!(matches!(err, PredictError::MissingFeature(ref n) if n == "thalach"));

        let err = schema()
            .build(&manual(&[
                ("age", "63"),
                ("chol", "233"),
                ("thalach", "150"),
                ("extra", "1"),
            ]))
            .unwrap_err();
        assert!(matches!(
            err,
            PredictError::ShapeMismatch {
                expected: 3,
                got: 4
            }
        ));
    }

    #[test]
    fn test_tokens_require_exact_arity() {
        let err = schema()
            .build(&RawInput::Values(strings(&["1", "2"])))
            .unwrap_err();
        assert!(matches!(
            err,
            PredictError::ShapeMismatch {
                expected: 3,
                got: 2
            }
        ));

        let err = schema()
            .build(&RawInput::Values(strings(&["1", "2", "3", "4"])))
            .unwrap_err();
        assert!(matches!(err, PredictError::ShapeMismatch { got: 4, .. }));

        let fv = schema()
            .build(&RawInput::Values(strings(&["1", "2", "3"])))
            .unwrap();
        assert_eq!(fv.len(), 3);
    }

    #[test]
    fn test_token_errors_name_position() {
        let err = schema()
            .build(&RawInput::Values(strings(&["1", "x", "3"])))
            .unwrap_err();
        assert!(matches!(err, PredictError::InvalidInput { ref field, .. } if field == "value 2"));
    }

    #[test]
    fn test_row_drops_target_column_before_arity_check() {
        let raw = RawInput::Row {
            header: strings(&["age", "chol", " NUM ", "thalach"]),
            cells: strings(&["63", "233", "1", "150"]),
        };
        let fv = schema().build(&raw).unwrap();
        assert_eq!(fv.values(), &[63.0, 233.0, 150.0]);
    }

    #[test]
    fn test_row_cell_error_names_column() {
        let raw = RawInput::Row {
            header: strings(&["age", "chol", "thalach"]),
            cells: strings(&["63", "", "150"]),
        };
        let err = schema().build(&raw).unwrap_err();
        assert!(matches!(err, PredictError::InvalidInput { ref field, .. } if field == "chol"));
    }

    #[test]
    fn test_named_extraction_reorders_and_ignores_extras() {
        let features: BTreeMap<String, f64> = [
            ("thalach", 150.0),
            ("chol", 233.0),
            ("age", 63.0),
            ("pitch", 120.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        let fv = schema().build(&RawInput::Named(features)).unwrap();
        assert_eq!(fv.values(), &[63.0, 233.0, 150.0]);
    }

    #[test]
    fn test_named_extraction_missing_feature() {
        let features: BTreeMap<String, f64> = [("age".to_string(), 63.0)].into_iter().collect();
        let err = schema().build(&RawInput::Named(features)).unwrap_err();
        assert!(matches!(err, PredictError::MissingFeature(ref n) if n == "chol"));
    }

    #[test]
    fn test_positional_features() {
        let schema = FeatureSchema::positional(4);
        assert_eq!(schema.names()[3], "f3");

        let fv = schema
            .build(&RawInput::Positional(vec![0.1, 0.2, 0.3, 0.4]))
            .unwrap();
        assert_eq!(fv.len(), 4);

        let err = schema
            .build(&RawInput::Positional(vec![0.1, f32::INFINITY, 0.3, 0.4]))
            .unwrap_err();
        assert!(matches!(err, PredictError::InvalidInput { ref field, .. } if field == "f1"));

        let err = schema
            .build(&RawInput::Positional(vec![0.1, 0.2, 0.3]))
            .unwrap_err();
        assert!(matches!(
            err,
            PredictError::ShapeMismatch {
                expected: 4,
                got: 3
            }
        ));
    }

    #[test]
    fn test_raw_input_json_accepts_numbers_for_manual_fields() {
        let raw: RawInput =
            serde_json::from_str(r#"{"manual": {"age": 63, "chol": "233", "thalach": 150.5}}"#)
                .unwrap();
        let fv = schema().build(&raw).unwrap();
        assert_eq!(fv.values(), &[63.0, 233.0, 150.5]);
        assert_eq!(raw.source(), "manual");
    }

    #[test]
    fn test_raw_input_json_accepts_numbers_for_values() {
        let raw: RawInput = serde_json::from_str(r#"{"values": [63, "233", 150.5]}"#).unwrap();
        assert_eq!(schema().build(&raw).unwrap().values(), &[63.0, 233.0, 150.5]);
    }

    #[test]
    fn test_csv_document_selects_row() {
        let raw: RawInput = serde_json::from_str(
            r#"{"csv": {"text": "age,chol,thalach,num\n63,233,150,0\n41,204,172,1\n", "row": 1}}"#,
        )
        .unwrap();
        assert_eq!(raw.source(), "csv");
        assert_eq!(schema().build(&raw).unwrap().values(), &[41.0, 204.0, 172.0]);

        let first = RawInput::Csv {
            text: "age,chol,thalach\n63,233,150\n".to_string(),
            row: 0,
        };
        assert_eq!(schema().build(&first).unwrap().values(), &[63.0, 233.0, 150.0]);

        let missing = RawInput::Csv {
            text: "age,chol,thalach\n63,233,150\n".to_string(),
            row: 3,
        };
        assert_eq!(schema().build(&missing).unwrap_err().kind(), "invalid_input");
    }
}
