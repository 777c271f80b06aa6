//! Artifact verification

use anyhow::{bail, Result};
use colored::Colorize;
use predictor_lib::{ArtifactStore, DomainId, StructuredLogger};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_error, print_success, print_table, OutputFormat};

/// Row for verification table
#[derive(Tabled, Serialize)]
struct VerifyRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Models")]
    models: usize,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// Fully load each domain, reporting every failure rather than the first
pub fn verify_artifacts(store: &ArtifactStore, domains: &[DomainId], format: OutputFormat) -> Result<()> {
    let logger = StructuredLogger::new("cli");
    let mut failed = 0;

    let rows: Vec<VerifyRow> = domains
        .iter()
        .map(|id| match store.load_domain(*id, &logger) {
            Ok(dispatcher) => VerifyRow {
                domain: id.to_string(),
                status: status("ok", format),
                models: dispatcher.registry().len(),
                detail: format!("{} features", dispatcher.schema().arity()),
            },
            Err(e) => {
                failed += 1;
                VerifyRow {
                    domain: id.to_string(),
                    status: status("failed", format),
                    models: 0,
                    detail: e.to_string(),
                }
            }
        })
        .collect();

    print_table(&rows, format)?;

    if failed > 0 {
        if format == OutputFormat::Table {
            print_error(&format!("{} of {} domains failed to load", failed, domains.len()));
        }
        bail!("artifact verification failed under {}", store.root().display());
    }
    if format == OutputFormat::Table {
        print_success(&format!("All {} domains loaded", domains.len()));
    }
    Ok(())
}

fn status(text: &str, format: OutputFormat) -> String {
    match (format, text) {
        (OutputFormat::Json, _) => text.to_string(),
        (_, "ok") => text.green().to_string(),
        _ => text.red().to_string(),
    }
}
