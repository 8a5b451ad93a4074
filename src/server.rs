//! The inference service: artifact loading, router, and request handling.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ndarray::Array1;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::error;

use crate::features::{self, EncodeError};
use crate::model::PcosClassifier;
use crate::preprocess::{MeanImputer, StandardScaler};
use crate::{CLASSIFIER_FILE, IMPUTER_FILE, SCALER_FILE};

pub const POSITIVE_LABEL: &str = "PCOS likely";
pub const NEGATIVE_LABEL: &str = "PCOS unlikely";
pub const LIVENESS_MESSAGE: &str = "PCOS Prediction Model API is running!";

/// Everything a request needs, loaded once at startup and shared read-only
/// across requests. There is no mutation path, so no locking.
pub struct ServiceContext {
    imputer: MeanImputer,
    scaler: StandardScaler,
    classifier: PcosClassifier,
}

impl ServiceContext {
    /// Load the three artifacts from `model_dir`. Any missing or corrupt
    /// file is an error; the caller refuses to start serving.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let imputer = MeanImputer::load(&model_dir.join(IMPUTER_FILE))
            .context("failed to load imputer artifact")?;
        let scaler = StandardScaler::load(&model_dir.join(SCALER_FILE))
            .context("failed to load scaler artifact")?;
        let classifier = PcosClassifier::load(&model_dir.join(CLASSIFIER_FILE))
            .context("failed to load classifier artifact")?;
        Ok(Self {
            imputer,
            scaler,
            classifier,
        })
    }

    pub fn from_parts(
        imputer: MeanImputer,
        scaler: StandardScaler,
        classifier: PcosClassifier,
    ) -> Self {
        Self {
            imputer,
            scaler,
            classifier,
        }
    }

    /// Encode, preprocess, and classify one JSON record.
    pub fn score(&self, record: &Map<String, Value>) -> Result<&'static str, PredictError> {
        let mut vector = features::encode_record(record)?;
        self.imputer.transform_vec(&mut vector);
        self.scaler.transform_vec(&mut vector);
        if !vector.iter().all(|v| v.is_finite()) {
            return Err(PredictError::Internal(anyhow::anyhow!(
                "non-finite feature vector after preprocessing"
            )));
        }
        let scored = self.classifier.predict_one(&Array1::from(vector.to_vec()));
        Ok(if scored.positive {
            POSITIVE_LABEL
        } else {
            NEGATIVE_LABEL
        })
    }
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("No input data provided")]
    NoInput,
    #[error("Missing required feature: '{0}'")]
    MissingFeature(String),
    #[error("Invalid data format. Please check your inputs. Details: {0}")]
    InvalidFormat(String),
    #[error("An unexpected server error occurred: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<EncodeError> for PredictError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::MissingFeature(name) => PredictError::MissingFeature(name),
            EncodeError::InvalidNumber { detail, .. } => PredictError::InvalidFormat(detail),
        }
    }
}

impl PredictError {
    fn status(&self) -> StatusCode {
        match self {
            PredictError::NoInput
            | PredictError::MissingFeature(_)
            | PredictError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            PredictError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        if let PredictError::Internal(inner) = &self {
            // Full detail stays server-side; the client gets a generic line.
            error!(error = ?inner, "unexpected error while handling /predict");
        }
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: String,
}

pub fn router(ctx: Arc<ServiceContext>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/predict", post(predict))
        .with_state(ctx)
}

pub async fn home() -> &'static str {
    LIVENESS_MESSAGE
}

/// `POST /predict`: validate, encode, preprocess, classify.
pub async fn predict(
    State(ctx): State<Arc<ServiceContext>>,
    payload: Option<Json<Value>>,
) -> Result<Json<PredictResponse>, PredictError> {
    let Some(Json(value)) = payload else {
        return Err(PredictError::NoInput);
    };
    let record = match value {
        Value::Object(map) if !map.is_empty() => map,
        _ => return Err(PredictError::NoInput),
    };
    let label = ctx.score(&record)?;
    Ok(Json(PredictResponse {
        prediction: label.to_string(),
    }))
}
