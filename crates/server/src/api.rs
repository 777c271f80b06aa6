//! HTTP API for predictions, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use predictor_lib::{
    predictor::{InferenceDispatcher, RiskPolicy, TransformStep},
    DomainId, PredictError, Prediction, PredictionEngine, RawInput, StructuredLogger,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: &'static PredictionEngine,
    pub logger: StructuredLogger,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(engine: &'static PredictionEngine, logger: StructuredLogger, version: &'static str) -> Self {
        Self {
            engine,
            logger,
            version,
            started_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub instance: String,
    pub uptime_secs: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub domains: Vec<DomainId>,
    pub models: usize,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DomainSummary {
    pub id: DomainId,
    pub title: String,
    pub arity: usize,
    pub models: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    pub kind: String,
    pub input_arity: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DomainDetail {
    pub id: DomainId,
    pub title: String,
    pub features: Vec<String>,
    pub preprocessing: Vec<String>,
    pub models: Vec<ModelSummary>,
    /// Breakpoint labels, least severe first; empty for label lookups
    pub categories: Vec<String>,
    pub policy: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictRequest {
    pub model: String,
    pub input: RawInput,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Request failure mapped onto an HTTP status
#[derive(Debug)]
pub enum ApiError {
    UnknownDomain(String),
    Predict(PredictError),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::UnknownDomain(_) => StatusCode::NOT_FOUND,
            Self::Predict(e) => match e {
                PredictError::InvalidInput { .. }
                | PredictError::ShapeMismatch { .. }
                | PredictError::MissingFeature(_) => StatusCode::BAD_REQUEST,
                PredictError::UnknownModel(_) => StatusCode::NOT_FOUND,
                PredictError::ModelInvocation { .. } => StatusCode::BAD_GATEWAY,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            Self::UnknownDomain(domain) => ErrorBody {
                error: "unknown_domain".to_string(),
                message: format!("domain '{}' is not served", domain),
            },
            Self::Predict(e) => ErrorBody {
                error: e.kind().to_string(),
                message: e.to_string(),
            },
            Self::Internal(message) => ErrorBody {
                error: "internal".to_string(),
                message: message.clone(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        Self::Predict(e)
    }
}

fn resolve(
    state: &AppState,
    domain: &str,
) -> Result<(DomainId, &'static InferenceDispatcher), ApiError> {
    let id: DomainId = domain
        .parse()
        .map_err(|_| ApiError::UnknownDomain(domain.to_string()))?;
    let dispatcher = state
        .engine
        .dispatcher(id)
        .ok_or_else(|| ApiError::UnknownDomain(domain.to_string()))?;
    Ok((id, dispatcher))
}

/// Liveness: the process is up and serving
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.to_string(),
        instance: state.logger.instance().to_string(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// Readiness: 200 once at least one domain is loaded
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let domains: Vec<DomainId> = state.engine.domains().collect();
    let readiness = ReadinessResponse {
        ready: !domains.is_empty(),
        models: state.engine.model_count(),
        domains,
        loaded_at: state.started_at,
    };

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return ApiError::Internal(e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn list_domains(State(state): State<Arc<AppState>>) -> Json<Vec<DomainSummary>> {
    let domains = state
        .engine
        .domains()
        .filter_map(|id| state.engine.dispatcher(id).map(|d| (id, d)))
        .map(|(id, d)| DomainSummary {
            id,
            title: id.spec().title.to_string(),
            arity: d.schema().arity(),
            models: d.registry().names().map(str::to_string).collect(),
        })
        .collect();
    Json(domains)
}

async fn describe_domain(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
) -> Result<Json<DomainDetail>, ApiError> {
    let (id, d) = resolve(&state, &domain)?;

    let preprocessing = d
        .preprocessor()
        .map(|p| {
            p.steps()
                .iter()
                .map(|s| match s {
                    TransformStep::StandardScaler { .. } => "standard_scaler".to_string(),
                    TransformStep::Pca { .. } => "pca".to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let policy = match d.classifier().policy() {
        RiskPolicy::Breakpoints { .. } => "breakpoints",
        RiskPolicy::Lookup => "label_lookup",
    };

    Ok(Json(DomainDetail {
        id,
        title: id.spec().title.to_string(),
        features: d.schema().names().to_vec(),
        preprocessing,
        models: d
            .registry()
            .iter()
            .map(|m| ModelSummary {
                name: m.name().to_string(),
                kind: m.kind().as_str().to_string(),
                input_arity: m.input_arity(),
            })
            .collect(),
        categories: d.classifier().categories(),
        policy: policy.to_string(),
    }))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<Prediction>, ApiError> {
    let (_, dispatcher) = resolve(&state, &domain)?;
    let Json(request) =
        payload.map_err(|rejection| PredictError::invalid("request body", rejection.body_text()))?;

    // backend calls are CPU bound
    let prediction =
        tokio::task::spawn_blocking(move || dispatcher.infer(&request.input, &request.model))
            .await
            .map_err(|e| ApiError::Internal(format!("inference task failed: {}", e)))??;

    Ok(Json(prediction))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/v1/domains", get(list_domains))
        .route("/v1/domains/:domain", get(describe_domain))
        .route("/v1/domains/:domain/predict", post(predict))
        .with_state(state)
}

/// Start the API server, returning once `shutdown` resolves
pub async fn serve<F>(port: u16, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
