//! Run one prediction locally

use anyhow::{bail, Context, Result};
use predictor_lib::predictor::RiskPolicy;
use predictor_lib::{ingest, ArtifactStore, DomainId, PredictError, Prediction, RawInput, StructuredLogger};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tabled::Tabled;

use crate::output::{color_category, format_score, OutputFormat};

/// Where the feature values come from
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// `name=value` pairs typed on the command line
    Manual(Vec<(String, String)>),
    /// `.txt` or `.csv` feature file; `row` picks the CSV data row, 0-based
    File { path: PathBuf, row: usize },
    /// JSON object written by a signal feature extractor
    Named(PathBuf),
    /// JSON array written by an image feature extractor
    Positional(PathBuf),
}

impl InputSource {
    fn read(&self) -> Result<RawInput> {
        let raw = match self {
            Self::Manual(pairs) => {
                let mut fields = BTreeMap::new();
                for (name, value) in pairs {
                    if fields.insert(name.clone(), value.clone()).is_some() {
                        bail!("Feature '{}' set more than once", name);
                    }
                }
                RawInput::Manual(fields)
            }
            Self::File { path, row } => ingest::read_feature_file(path, *row)?,
            Self::Named(path) => ingest::read_named_features(path)?,
            Self::Positional(path) => ingest::read_positional_features(path)?,
        };
        Ok(raw)
    }
}

/// Parse a `name=value` argument; the name may contain any character but `=`
pub fn parse_assignment(arg: &str) -> Result<(String, String), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", arg))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing feature name in '{}'", arg));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Row for the prediction summary table
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Serialize)]
struct PredictionOutput<'a> {
    #[serde(flatten)]
    prediction: &'a Prediction,
    title: &'a str,
}

pub fn run_prediction(
    store: &ArtifactStore,
    domain: DomainId,
    model: &str,
    source: &InputSource,
    format: OutputFormat,
) -> Result<()> {
    let raw = source.read()?;

    let dispatcher = store
        .load_domain(domain, &StructuredLogger::new("cli"))
        .with_context(|| format!("Failed to load {} artifacts from {}", domain, store.root().display()))?;

    let prediction = dispatcher.infer(&raw, model).map_err(|e| match e {
        PredictError::UnknownModel(name) => {
            let known: Vec<&str> = dispatcher.registry().names().collect();
            anyhow::anyhow!("unknown model '{}' (available: {})", name, known.join(", "))
        }
        other => anyhow::Error::new(other),
    })?;

    let spec = domain.spec();
    match format {
        OutputFormat::Json => {
            let output = PredictionOutput {
                prediction: &prediction,
                title: spec.title,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            let categories = dispatcher.classifier().categories();
            let rank = match dispatcher.classifier().policy() {
                RiskPolicy::Breakpoints { .. } => categories
                    .iter()
                    .position(|c| c == prediction.category.as_str()),
                RiskPolicy::Lookup => None,
            };

            let rows = vec![
                FieldRow {
                    field: "Domain".to_string(),
                    value: spec.title.to_string(),
                },
                FieldRow {
                    field: "Model".to_string(),
                    value: prediction.model.clone(),
                },
                FieldRow {
                    field: "Score".to_string(),
                    value: format_score(&prediction.score),
                },
                FieldRow {
                    field: "Result".to_string(),
                    value: color_category(prediction.category.as_str(), rank, categories.len()),
                },
            ];

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}
