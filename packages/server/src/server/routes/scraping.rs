//! Website analysis endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::scraping::{AnalysisResult, JobStatus};
use crate::server::app::AppState;
use crate::templates;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub url: String,
    pub template_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub job_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Client-facing request error with a JSON body.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Start a website analysis; returns the job id immediately.
pub async fn analyze_website(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let parsed = Url::parse(&request.url)
        .map_err(|_| ApiError::bad_request("url is not a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ApiError::bad_request("url must be an http(s) URL with a host"));
    }
    if templates::get(&request.template_id).is_none() {
        return Err(ApiError::bad_request(format!(
            "unknown templateId: {}",
            request.template_id
        )));
    }

    let job_id = state
        .tracker
        .start(request.url, request.template_id)
        .await;
    Ok(Json(AnalyzeResponse { job_id }))
}

/// Current state of an analysis job.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    match state.tracker.status(&job_id).await {
        Some(job) => Ok(Json(JobStatusResponse {
            job_id: job.id,
            status: job.status,
            result: job.result,
            error: job.error,
        })),
        None => Err(ApiError::bad_request("job not found or expired")),
    }
}
