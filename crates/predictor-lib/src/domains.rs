//! Built-in clinical domains
//!
//! Each domain fixes its feature schema, preprocessing chain, model table
//! and risk policy. Artifacts live under `<artifact_root>/<directory>/`.

use crate::models::BackendKind;
use crate::predictor::POSITIVE_CLASS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of a DenseNet169 globally pooled feature vector
pub const IMAGE_FEATURE_ARITY: usize = 1664;

/// Optional checksum manifest inside a domain directory
pub const CHECKSUM_FILE: &str = "checksums.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainId {
    Heart,
    Parkinsons,
    ParkinsonsSeverity,
    Alzheimers,
    BrainTumor,
    SkinLesion,
}

impl DomainId {
    pub const ALL: [DomainId; 6] = [
        DomainId::Heart,
        DomainId::Parkinsons,
        DomainId::ParkinsonsSeverity,
        DomainId::Alzheimers,
        DomainId::BrainTumor,
        DomainId::SkinLesion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heart => "heart",
            Self::Parkinsons => "parkinsons",
            Self::ParkinsonsSeverity => "parkinsons-severity",
            Self::Alzheimers => "alzheimers",
            Self::BrainTumor => "brain-tumor",
            Self::SkinLesion => "skin-lesion",
        }
    }

    pub fn spec(&self) -> &'static DomainSpec {
        match self {
            Self::Heart => &HEART,
            Self::Parkinsons => &PARKINSONS,
            Self::ParkinsonsSeverity => &PARKINSONS_SEVERITY,
            Self::Alzheimers => &ALZHEIMERS,
            Self::BrainTumor => &BRAIN_TUMOR,
            Self::SkinLesion => &SKIN_LESION,
        }
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        DomainId::ALL
            .into_iter()
            .find(|d| d.as_str() == wanted)
            .ok_or_else(|| format!("unknown domain '{}'", s))
    }
}

/// Where a domain's canonical feature names come from
#[derive(Debug, Clone, Copy)]
pub enum FeatureSource {
    /// Names compiled into the catalog
    Fixed(&'static [&'static str]),
    /// Persisted JSON array of names inside the domain directory
    Manifest(&'static str),
    /// Extractor output of fixed length; names are generated
    Positional(usize),
}

/// Which ONNX outputs carry scores and labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnnxOutputs {
    pub scores: usize,
    pub label: Option<usize>,
}

impl OnnxOutputs {
    /// Keras export: one dense output tensor
    pub const DENSE: OnnxOutputs = OnnxOutputs {
        scores: 0,
        label: None,
    };

    /// skl2onnx classifier export: `label` then `probabilities`
    pub const SKLEARN: OnnxOutputs = OnnxOutputs {
        scores: 1,
        label: Some(0),
    };
}

#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    /// Display key used for selection
    pub name: &'static str,
    /// File name inside the domain directory (`.json` or `.onnx`)
    pub file: &'static str,
    pub kind: BackendKind,
    /// Ignored for native JSON estimators
    pub outputs: OnnxOutputs,
    /// Probability column reported by probabilistic classifiers
    pub positive_class: usize,
}

const fn json(name: &'static str, file: &'static str, kind: BackendKind) -> ModelSpec {
    ModelSpec {
        name,
        file,
        kind,
        outputs: OnnxOutputs::DENSE,
        positive_class: POSITIVE_CLASS,
    }
}

const fn onnx(
    name: &'static str,
    file: &'static str,
    kind: BackendKind,
    outputs: OnnxOutputs,
) -> ModelSpec {
    ModelSpec {
        name,
        file,
        kind,
        outputs,
        positive_class: POSITIVE_CLASS,
    }
}

#[derive(Debug, Clone, Copy)]
pub enum LabelSource {
    Fixed(&'static [&'static str]),
    /// JSON array of class names, index-aligned with model outputs
    Artifact(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub enum PolicySpec {
    /// Ascending `(lower bound, label)` steps; values below the first step
    /// get `floor`
    Breakpoints {
        floor: &'static str,
        steps: &'static [(f32, &'static str)],
    },
    Labels(LabelSource),
}

#[derive(Debug, Clone, Copy)]
pub struct DomainSpec {
    pub id: DomainId,
    pub title: &'static str,
    pub directory: &'static str,
    pub features: FeatureSource,
    /// Tabular columns dropped before the arity check
    pub target_columns: &'static [&'static str],
    /// Transform artifacts applied in order; empty means raw features
    pub preprocessing: &'static [&'static str],
    pub models: &'static [ModelSpec],
    pub policy: PolicySpec,
}

use BackendKind::{ProbabilisticClassifier, RawScoreClassifier, RawScoreRegressor};

pub const HEART_FEATURES: &[&str] = &[
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

pub const UPDRS_FEATURES: &[&str] = &[
    "Jitter(%)",
    "Jitter(Abs)",
    "Jitter:RAP",
    "Jitter:PPQ5",
    "Jitter:DDP",
    "Shimmer",
    "Shimmer(dB)",
    "Shimmer:APQ3",
    "Shimmer:APQ5",
    "Shimmer:APQ11",
    "Shimmer:DDA",
    "NHR",
    "HNR",
    "RPDE",
    "DFA",
    "PPE",
    "Intensity",
    "Final PointProcess",
];

pub const ALZHEIMERS_FEATURES: &[&str] = &[
    "Age",
    "Gender",
    "Ethnicity",
    "EducationLevel",
    "BMI",
    "Smoking",
    "AlcoholConsumption",
    "PhysicalActivity",
    "DietQuality",
    "SleepQuality",
    "FamilyHistoryAlzheimers",
    "CardiovascularDisease",
    "Diabetes",
    "Depression",
    "HeadInjury",
    "Hypertension",
    "SystolicBP",
    "DiastolicBP",
    "CholesterolTotal",
    "CholesterolLDL",
    "CholesterolHDL",
    "CholesterolTriglycerides",
    "MMSE",
    "FunctionalAssessment",
    "MemoryComplaints",
    "BehavioralProblems",
    "ADL",
    "Confusion",
    "Disorientation",
    "PersonalityChanges",
    "DifficultyCompletingTasks",
    "Forgetfulness",
];

pub const SKIN_LESION_CLASSES: &[&str] = &[
    "Basal Cell Carcinoma",
    "Dermatofibroma",
    "Melanoma",
    "Nevus",
    "Pigmented Benign Keratosis",
    "Squamous Cell Carcinoma",
    "Vascular Lesion",
];

static HEART: DomainSpec = DomainSpec {
    id: DomainId::Heart,
    title: "Coronary Heart Disease",
    directory: "heart",
    features: FeatureSource::Fixed(HEART_FEATURES),
    target_columns: &["num"],
    preprocessing: &["scaler.json"],
    models: &[
        onnx(
            "Keras Neural Network",
            "keras_model.onnx",
            ProbabilisticClassifier,
            OnnxOutputs::DENSE,
        ),
        json(
            "Logistic Regression",
            "logistic_regression.json",
            ProbabilisticClassifier,
        ),
        json("Random Forest", "random_forest.json", ProbabilisticClassifier),
        onnx(
            "SVM",
            "svm_model.onnx",
            ProbabilisticClassifier,
            OnnxOutputs::SKLEARN,
        ),
        json(
            "Gradient Boosting",
            "gradient_boosting.json",
            ProbabilisticClassifier,
        ),
    ],
    policy: PolicySpec::Breakpoints {
        floor: "No CHD",
        steps: &[(0.5, "CHD Detected")],
    },
};

static PARKINSONS: DomainSpec = DomainSpec {
    id: DomainId::Parkinsons,
    title: "Parkinson's Detection",
    directory: "parkinsons",
    features: FeatureSource::Manifest("feature_list.json"),
    target_columns: &["status"],
    preprocessing: &["scaler.json"],
    models: &[
        json("Random Forest", "rf_classifier.json", ProbabilisticClassifier),
        json(
            "Logistic Regression",
            "logreg_classifier.json",
            ProbabilisticClassifier,
        ),
        onnx(
            "SVM",
            "svm_classifier.onnx",
            ProbabilisticClassifier,
            OnnxOutputs::SKLEARN,
        ),
        onnx(
            "KNN",
            "knn_classifier.onnx",
            ProbabilisticClassifier,
            OnnxOutputs::SKLEARN,
        ),
        onnx(
            "AdaBoost",
            "adaboost_classifier.onnx",
            ProbabilisticClassifier,
            OnnxOutputs::SKLEARN,
        ),
        onnx(
            "MLP (Keras)",
            "parkinsons_mlp_model.onnx",
            ProbabilisticClassifier,
            OnnxOutputs::DENSE,
        ),
    ],
    policy: PolicySpec::Breakpoints {
        floor: "Likely Healthy",
        steps: &[(0.5, "Likely Parkinson's")],
    },
};

static PARKINSONS_SEVERITY: DomainSpec = DomainSpec {
    id: DomainId::ParkinsonsSeverity,
    title: "Parkinson's Motor Severity (UPDRS)",
    directory: "parkinsons_severity",
    features: FeatureSource::Fixed(UPDRS_FEATURES),
    target_columns: &["motor_updrs", "total_updrs"],
    preprocessing: &["scaler.json"],
    models: &[json("Best Model", "best_model.json", RawScoreRegressor)],
    policy: PolicySpec::Breakpoints {
        floor: "Healthy",
        steps: &[(20.0, "Mild"), (40.0, "Moderate"), (60.0, "Severe")],
    },
};

static ALZHEIMERS: DomainSpec = DomainSpec {
    id: DomainId::Alzheimers,
    title: "Alzheimer's Risk",
    directory: "alzheimers",
    features: FeatureSource::Fixed(ALZHEIMERS_FEATURES),
    target_columns: &["diagnosis"],
    preprocessing: &["scaler.json"],
    models: &[json(
        "Stacked Regressor",
        "stacked_regressor.json",
        RawScoreRegressor,
    )],
    policy: PolicySpec::Breakpoints {
        floor: "Low Risk",
        steps: &[(0.4, "Moderate Risk"), (0.7, "High Risk")],
    },
};

static BRAIN_TUMOR: DomainSpec = DomainSpec {
    id: DomainId::BrainTumor,
    title: "Brain Tumor Classification",
    directory: "brain_tumor",
    features: FeatureSource::Positional(IMAGE_FEATURE_ARITY),
    target_columns: &[],
    preprocessing: &["scaler.json", "pca.json"],
    models: &[json("Voting Model", "voting_model.json", RawScoreClassifier)],
    policy: PolicySpec::Labels(LabelSource::Artifact("label_encoder.json")),
};

static SKIN_LESION: DomainSpec = DomainSpec {
    id: DomainId::SkinLesion,
    title: "Skin Lesion Classification (7-class)",
    directory: "skin_lesion",
    features: FeatureSource::Positional(IMAGE_FEATURE_ARITY),
    target_columns: &[],
    preprocessing: &[],
    models: &[
        json("Random Forest", "model_rf_7class.json", RawScoreClassifier),
        onnx(
            "SVM",
            "model_svm_7class.onnx",
            RawScoreClassifier,
            OnnxOutputs::SKLEARN,
        ),
        onnx(
            "KNN",
            "model_knn_7class.onnx",
            RawScoreClassifier,
            OnnxOutputs::SKLEARN,
        ),
        json("XGBoost", "model_xgb_7class.json", RawScoreClassifier),
        json(
            "Voting Classifier",
            "model_voting_7class.json",
            RawScoreClassifier,
        ),
    ],
    policy: PolicySpec::Labels(LabelSource::Fixed(SKIN_LESION_CLASSES)),
};
