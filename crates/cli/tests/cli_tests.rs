//! CLI integration tests

use std::path::Path;
use std::process::{Command, Output};

fn mrp(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "mrp-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn zeros(n: usize) -> String {
    vec!["0.0"; n].join(", ")
}

/// Severity domain whose regressor always answers 52.0
fn severity_artifacts(root: &Path) {
    let dir = root.join("parkinsons_severity");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("scaler.json"),
        format!(
            r#"{{"type": "standard_scaler", "mean": [{}], "scale": [{}]}}"#,
            zeros(18),
            vec!["1.0"; 18].join(", ")
        ),
    )
    .unwrap();
    std::fs::write(
        dir.join("best_model.json"),
        format!(
            r#"{{"type": "linear", "coef": [[{}]], "intercept": [52.0]}}"#,
            zeros(18)
        ),
    )
    .unwrap();
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = mrp(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Medical Risk Predictor"),
        "Should show app name"
    );
    assert!(stdout.contains("domains"), "Should show domains command");
    assert!(stdout.contains("features"), "Should show features command");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("verify"), "Should show verify command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = mrp(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("mrp"), "Should show binary name");
}

/// Test predict subcommand help
#[test]
fn test_predict_help() {
    let output = mrp(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict help should succeed");
    assert!(stdout.contains("--model"), "Should show model option");
    assert!(stdout.contains("--set"), "Should show set option");
    assert!(stdout.contains("--positional"), "Should show positional option");
    assert!(stdout.contains("--row"), "Should show row option");
}

/// Test that predict requires an input source
#[test]
fn test_predict_requires_input() {
    let output = mrp(&["predict", "heart", "--model", "SVM"]);
    assert!(!output.status.success(), "Predict without input should fail");
}

/// Test domain listing as JSON
#[test]
fn test_domains_json() {
    let root = tempfile::tempdir().unwrap();
    let artifacts = root.path().to_str().unwrap();
    let output = mrp(&["--artifacts", artifacts, "--format", "json", "domains"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Domains should succeed");
    assert!(stdout.contains("\"parkinsons-severity\""));
    assert!(stdout.contains("\"skin-lesion\""));
}

/// Test a local prediction from a text file
#[test]
fn test_predict_from_text_file() {
    let root = tempfile::tempdir().unwrap();
    severity_artifacts(root.path());
    let input = root.path().join("voice.txt");
    std::fs::write(&input, vec!["0.01"; 18].join("\n")).unwrap();

    let output = mrp(&[
        "--artifacts",
        root.path().to_str().unwrap(),
        "--format",
        "json",
        "predict",
        "parkinsons-severity",
        "--model",
        "Best Model",
        "--file",
        input.to_str().unwrap(),
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict should succeed: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("\"Moderate\""), "Should report the bucket");
}

/// Test picking a later patient row of a CSV file
#[test]
fn test_predict_from_csv_row() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("parkinsons_severity");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("scaler.json"),
        format!(
            r#"{{"type": "standard_scaler", "mean": [{}], "scale": [{}]}}"#,
            zeros(18),
            vec!["1.0"; 18].join(", ")
        ),
    )
    .unwrap();
    // score = 100 * first feature
    std::fs::write(
        dir.join("best_model.json"),
        format!(
            r#"{{"type": "linear", "coef": [[100.0, {}]], "intercept": [0.0]}}"#,
            zeros(17)
        ),
    )
    .unwrap();

    let header: Vec<String> = (0..18).map(|i| format!("f{}", i)).collect();
    let text = format!(
        "{},motor_UPDRS\n0.1{}\n0.65{}\n",
        header.join(","),
        ",0".repeat(18),
        ",0".repeat(18)
    );
    let input = root.path().join("voice.csv");
    std::fs::write(&input, text).unwrap();

    let run = |row: &str| {
        mrp(&[
            "--artifacts",
            root.path().to_str().unwrap(),
            "--format",
            "json",
            "predict",
            "parkinsons-severity",
            "--model",
            "Best Model",
            "--file",
            input.to_str().unwrap(),
            "--row",
            row,
        ])
    };

    let output = run("1");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Predict should succeed: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("\"Severe\""), "Should use the second row");

    let output = run("5");
    assert!(!output.status.success(), "Out-of-range row should fail");
}

/// Test verify reports missing artifacts with a failing status
#[test]
fn test_verify_fails_on_missing_artifacts() {
    let root = tempfile::tempdir().unwrap();
    severity_artifacts(root.path());

    let output = mrp(&[
        "--artifacts",
        root.path().to_str().unwrap(),
        "--format",
        "json",
        "verify",
        "--domains",
        "parkinsons-severity,alzheimers",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(!output.status.success(), "Verify should fail");
    assert!(stdout.contains("\"ok\""));
    assert!(stdout.contains("\"failed\""));
}
