// Request handlers for /api/rag
use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::{ErrorKind, RagError};
use crate::extraction::DocumentSource;
use crate::server::AppState;

/// Multipart field carrying the uploaded document
pub const UPLOAD_FIELD: &str = "pdf";

const DEFAULT_UPLOAD_NAME: &str = "upload.pdf";

/// Error response: `{"error": <kind>, "message": ...}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: ErrorKind,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: ErrorKind::Input,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        let status = if err.is_client_fault() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.kind.as_str(),
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub message: &'static str,
    pub file: String,
    pub passages_stored: usize,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// POST /api/rag/ingest - ingest one uploaded document from memory
pub async fn ingest_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to parse form: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_UPLOAD_NAME)
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;

        tracing::info!(file = %file_name, bytes = data.len(), "received upload");

        let report = state
            .pipeline
            .ingest(&DocumentSource::bytes(file_name.clone(), data))
            .await?;

        return Ok(Json(IngestResponse {
            message: "PDF ingested successfully",
            file: file_name,
            passages_stored: report.passages_stored,
        }));
    }

    Err(ApiError::bad_request("No file uploaded"))
}

/// GET /api/rag/health
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let status = state.pipeline.health()?;
    Ok(Json(HealthResponse { status }))
}

/// POST /api/rag/ask
pub async fn ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(request) = payload.map_err(|_| ApiError::bad_request("Invalid request body"))?;

    let answer = state.pipeline.answer(&request.question).await?;

    Ok(Json(AskResponse {
        kind: "concierge_response",
        answer,
    }))
}
