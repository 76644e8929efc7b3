//! Client for the external prediction service.
//!
//! Every failure surfaces as a [`PredictionError`]. A failed request never
//! turns into a made-up result.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{forms::PredictionForm, model::DisasterKind, provider::truncate_body};

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("prediction service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("prediction service returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("prediction response was not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("prediction response carried no risk label")]
    MissingLabel,
}

/// A risk label with its confidence, as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub kind: DisasterKind,
    pub label: String,
    /// Percent, when the service reports one.
    pub confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawPrediction {
    #[serde(alias = "result")]
    prediction: Option<serde_json::Value>,
    #[serde(alias = "confidence")]
    accuracy: Option<f64>,
}

/// Decodes a prediction body. Accepts `prediction` or `result` for the label
/// and `accuracy` or `confidence` for the confidence; a label may be a string
/// or a number (class index). Confidences in `(0, 1]` are treated as
/// fractions and scaled to percent.
pub fn parse_prediction(kind: DisasterKind, body: &str) -> Result<Prediction, PredictionError> {
    let raw: RawPrediction = serde_json::from_str(body)?;

    let label = match raw.prediction {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        _ => return Err(PredictionError::MissingLabel),
    };

    let confidence = raw
        .accuracy
        .filter(|c| c.is_finite())
        .map(|c| if c > 0.0 && c <= 1.0 { c * 100.0 } else { c });

    Ok(Prediction { kind, label, confidence })
}

#[derive(Debug, Clone)]
pub struct PredictionClient {
    http: Client,
    base_url: String,
}

impl PredictionClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn endpoint(&self, kind: DisasterKind) -> String {
        format!("{}/api/predict/{}", self.base_url, kind.as_str())
    }

    pub async fn predict(&self, form: &PredictionForm) -> Result<Prediction, PredictionError> {
        let url = self.endpoint(form.kind);
        debug!(%url, fields = form.fields.len(), "submitting prediction request");

        let res = self.http.post(&url).json(form).send().await?;
        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            warn!(%status, kind = %form.kind, "prediction request rejected");
            return Err(PredictionError::Status { status, body: truncate_body(&body) });
        }

        parse_prediction(form.kind, &body)
    }
}
