//! Domain, feature and model listings

use anyhow::{Context, Result};
use predictor_lib::domains::{FeatureSource, PolicySpec};
use predictor_lib::{ArtifactStore, DomainId};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_info, print_table, OutputFormat};

/// Row for domains table
#[derive(Tabled, Serialize)]
struct DomainRow {
    #[tabled(rename = "Domain")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Features")]
    features: String,
    #[tabled(rename = "Models")]
    models: usize,
    #[tabled(rename = "Outcome")]
    outcome: String,
}

/// Row for features table
#[derive(Tabled, Serialize)]
struct FeatureRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Name")]
    name: String,
}

/// Row for models table
#[derive(Tabled, Serialize)]
struct ModelRow {
    #[tabled(rename = "Model")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Artifact")]
    file: String,
    #[tabled(rename = "Present")]
    present: bool,
}

fn outcome(policy: &PolicySpec) -> String {
    match policy {
        PolicySpec::Breakpoints { floor, steps } => std::iter::once(*floor)
            .chain(steps.iter().map(|(_, label)| *label))
            .collect::<Vec<_>>()
            .join(" / "),
        PolicySpec::Labels(_) => "class label".to_string(),
    }
}

/// List every built-in domain
pub fn list_domains(store: &ArtifactStore, format: OutputFormat) -> Result<()> {
    let rows: Vec<DomainRow> = DomainId::ALL
        .iter()
        .map(|id| {
            let spec = id.spec();
            let features = match spec.features {
                FeatureSource::Manifest(file) => store
                    .feature_schema(*id)
                    .map(|s| s.arity().to_string())
                    .unwrap_or_else(|_| format!("from {}", file)),
                FeatureSource::Fixed(names) => names.len().to_string(),
                FeatureSource::Positional(arity) => format!("{} (image)", arity),
            };
            DomainRow {
                id: id.to_string(),
                title: spec.title.to_string(),
                features,
                models: spec.models.len(),
                outcome: outcome(&spec.policy),
            }
        })
        .collect();

    print_table(&rows, format)
}

/// List the canonical feature order of one domain
pub fn show_features(store: &ArtifactStore, domain: DomainId, format: OutputFormat) -> Result<()> {
    let schema = store
        .feature_schema(domain)
        .with_context(|| format!("Failed to read feature list for {}", domain))?;

    if let (FeatureSource::Positional(arity), OutputFormat::Table) = (domain.spec().features, format) {
        print_info(&format!(
            "{} takes {} positional image features (f0..f{})",
            domain,
            arity,
            arity.saturating_sub(1)
        ));
        return Ok(());
    }

    let rows: Vec<FeatureRow> = schema
        .names()
        .iter()
        .enumerate()
        .map(|(i, name)| FeatureRow {
            position: i + 1,
            name: name.clone(),
        })
        .collect();
    print_table(&rows, format)
}

/// List the model table of one domain and whether each artifact exists
pub fn show_models(store: &ArtifactStore, domain: DomainId, format: OutputFormat) -> Result<()> {
    let dir = store.domain_dir(domain);
    let rows: Vec<ModelRow> = domain
        .spec()
        .models
        .iter()
        .map(|m| ModelRow {
            name: m.name.to_string(),
            kind: m.kind.as_str().to_string(),
            file: m.file.to_string(),
            present: dir.join(m.file).is_file(),
        })
        .collect();
    print_table(&rows, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_lists_buckets_in_order() {
        assert_eq!(
            outcome(&DomainId::Alzheimers.spec().policy),
            "Low Risk / Moderate Risk / High Risk"
        );
        assert_eq!(outcome(&DomainId::SkinLesion.spec().policy), "class label");
    }
}
