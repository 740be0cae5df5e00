//! API request handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

use crate::classifier::{Label, ModelStats, SpamClassifier};
use crate::dataset::{DatasetStats, DatasetUpdater, LabelSource, UpsertOutcome};
use crate::error::SpamError;
use crate::schedule::ScheduleGate;

/// Shared application state
pub struct AppState {
    pub classifier: Arc<SpamClassifier>,
    pub updater: Arc<DatasetUpdater>,
    pub gate: Arc<ScheduleGate>,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(msg: &str) -> Self {
        Self {
            error: msg.to_string(),
        }
    }
}

fn error_response(err: &SpamError) -> Response {
    let status = match err {
        SpamError::EmptyDataset { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SpamError::StoreWrite(_) | SpamError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
        SpamError::NotFound(_) => StatusCode::NOT_FOUND,
        SpamError::Parse(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiError::new(&err.to_string()))).into_response()
}

/// Text to classify
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub text: String,
}

/// Classification response
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub label: Label,
    pub spam_probability: f64,
    pub model_version: u64,
}

/// Label to store
#[derive(Debug, Deserialize)]
pub struct LabelRequest {
    pub text: String,
    pub is_spam: bool,
    #[serde(default = "default_source")]
    pub source: LabelSource,
}

/// Human correction of a spam status
#[derive(Debug, Deserialize)]
pub struct CorrectionRequest {
    pub text: String,
    pub previous: bool,
    pub corrected: bool,
    #[serde(default = "default_source")]
    pub source: LabelSource,
}

fn default_source() -> LabelSource {
    LabelSource::Moderator
}

/// Dataset write response
#[derive(Debug, Serialize)]
pub struct LabelResponse {
    /// `None` when the correction did not change the label
    pub outcome: Option<UpsertOutcome>,
}

/// Model and dataset statistics
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub model: ModelStats,
    pub dataset: DatasetStats,
}

/// GET /health - liveness and store connectivity
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store_healthy = state.updater.store().stats().await.is_ok();
    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": if store_healthy { "healthy" } else { "unhealthy" },
            "model_version": state.classifier.stats().version,
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// GET / - entry-page hook evaluating the schedule gate
pub async fn index(State(state): State<Arc<AppState>>) -> Response {
    match state.gate.check().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!("Schedule gate failed: {}", e);
            error_response(&e)
        }
    }
}

/// POST /spam/predict - classify a submission
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PredictRequest>,
) -> Response {
    let verdict = state.classifier.classify(&req.text);

    // Best effort, a failed write never blocks the submission
    if let Err(e) = state
        .updater
        .record_prediction(&req.text, verdict.label.is_spam())
        .await
    {
        warn!("Failed to record prediction: {}", e);
    }

    Json(PredictResponse {
        label: verdict.label,
        spam_probability: verdict.spam_probability,
        model_version: verdict.model_version,
    })
    .into_response()
}

/// POST /spam/labels - upsert a labelled example
pub async fn upsert_label(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LabelRequest>,
) -> Response {
    match state.updater.upsert(&req.text, req.is_spam, req.source).await {
        Ok(outcome) => Json(LabelResponse {
            outcome: Some(outcome),
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /spam/corrections - record a human-confirmed status change
pub async fn record_correction(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CorrectionRequest>,
) -> Response {
    match state
        .updater
        .record_correction(&req.text, req.previous, req.corrected, req.source)
        .await
    {
        Ok(outcome) => Json(LabelResponse { outcome }).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /spam/retrain - retrain from the full dataset
pub async fn retrain(State(state): State<Arc<AppState>>) -> Response {
    let store = state.updater.store();
    match state.classifier.retrain(store.as_ref()).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /spam/stats - model and dataset statistics
pub async fn stats(State(state): State<Arc<AppState>>) -> Response {
    match state.updater.store().stats().await {
        Ok(dataset) => Json(StatsResponse {
            model: state.classifier.stats(),
            dataset,
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /schedule - persisted schedule state
pub async fn schedule_state(State(state): State<Arc<AppState>>) -> Response {
    match state.gate.state().await {
        Ok(schedule) => Json(schedule).into_response(),
        Err(e) => error_response(&e),
    }
}
