//! REST endpoints over the scraping and extraction services.
//!
//! Every response body is JSON. Successful results are 200, requests with a
//! missing or blank input are 400, and results that failed because the page
//! or the model failed are 502.

use std::sync::Arc;
use std::time::Instant;

use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Query, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::status::{ActivityKind, ActivityRecord, AppState, SERVER_NAME, SERVER_VERSION};
use crate::fetch::FetchMethod;
use crate::service::{ExtractionInfo, ScrapeOptions, ScrapeResult, ScrapingInfo};

/// Default number of history records returned
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

// ============================================================================
// Request / Response Types
// ============================================================================

/// `POST /api/scrape`
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeRequest {
    #[serde(default)]
    pub url: String,
    #[serde(flatten)]
    pub options: ScrapeOptions,
}

/// `POST /api/extract`
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub instructions: String,
}

/// `POST /api/scrape-extract`
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeExtractRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub method: FetchMethod,
}

/// `POST /api/batch`
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub method: FetchMethod,
    pub max_concurrent: Option<usize>,
}

/// Batch outcome; `success` means every URL succeeded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub processing_time: f64,
    pub results: Vec<ScrapeResult>,
}

/// `GET /api/history` query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// `GET /api/info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
    pub scraping: ScrapingInfo,
    pub extraction: ExtractionInfo,
    pub endpoints: Vec<String>,
}

/// Rejected request, answered before any service runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// JSON body whose rejections are answered as [`ApiError`]
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

fn outcome_status(success: bool) -> StatusCode {
    if success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Scrape one page
#[instrument(skip_all, fields(url = %request.url))]
pub async fn scrape_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ScrapeRequest>,
) -> Result<Response, ApiError> {
    if request.url.trim().is_empty() {
        return Err(ApiError::bad_request("URL is required"));
    }
    let started = Instant::now();

    let result = state
        .pipeline()
        .scraping()
        .scrape(&request.url, &request.options)
        .await;
    state.record_scrape(&result);
    state.record_request(started.elapsed(), result.success);
    state.push_activity(
        ActivityRecord::new(ActivityKind::Scrape, &result.url, result.success)
            .with_time(result.processing_time)
            .with_error(result.error.clone()),
    );

    // A URL that never reached a fetcher was rejected by validation.
    let code = if !result.success && result.method == FetchMethod::None {
        StatusCode::BAD_REQUEST
    } else {
        outcome_status(result.success)
    };
    Ok((code, Json(result)).into_response())
}

/// Extract from caller-supplied text
#[instrument(skip_all, fields(content_len = request.content.len()))]
pub async fn extract_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ExtractRequest>,
) -> Result<Response, ApiError> {
    if request.content.trim().is_empty() {
        return Err(ApiError::bad_request("Empty content provided"));
    }
    if request.instructions.trim().is_empty() {
        return Err(ApiError::bad_request("No extraction instructions provided"));
    }
    let started = Instant::now();

    let result = state
        .pipeline()
        .extraction()
        .extract(&request.content, &request.instructions)
        .await;
    state.record_extraction(&result);
    state.record_request(started.elapsed(), result.success);
    state.push_activity(
        ActivityRecord::new(
            ActivityKind::Extract,
            format!("{} chars of text", request.content.chars().count()),
            result.success,
        )
        .with_time(result.processing_time)
        .with_error(result.error.clone()),
    );

    Ok((outcome_status(result.success), Json(result)).into_response())
}

/// Scrape a page, then extract from it
#[instrument(skip_all, fields(url = %request.url))]
pub async fn scrape_extract_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ScrapeExtractRequest>,
) -> Result<Response, ApiError> {
    if request.url.trim().is_empty() {
        return Err(ApiError::bad_request("URL is required"));
    }
    if request.instructions.trim().is_empty() {
        return Err(ApiError::bad_request("No extraction instructions provided"));
    }
    let started = Instant::now();

    let options = ScrapeOptions::with_method(request.method);
    let result = state
        .pipeline()
        .run(&request.url, &request.instructions, &options)
        .await;
    state.record_scrape(&result.scrape);
    if let Some(extraction) = &result.extraction {
        state.record_extraction(extraction);
    }
    state.record_request(started.elapsed(), result.success);
    state.push_activity(
        ActivityRecord::new(ActivityKind::ScrapeExtract, &result.url, result.success)
            .with_time(result.processing_time)
            .with_error(result.error.clone()),
    );

    let code = if !result.success && result.scrape.method == FetchMethod::None {
        StatusCode::BAD_REQUEST
    } else {
        outcome_status(result.success)
    };
    Ok((code, Json(result)).into_response())
}

/// Scrape several pages concurrently
#[instrument(skip_all, fields(count = request.urls.len()))]
pub async fn batch_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<BatchRequest>,
) -> Result<Response, ApiError> {
    if request.urls.iter().all(|u| u.trim().is_empty()) {
        return Err(ApiError::bad_request("At least one URL is required"));
    }
    let started = Instant::now();

    let max_concurrent = request
        .max_concurrent
        .unwrap_or(state.max_concurrent())
        .clamp(1, state.max_concurrent());
    let options = ScrapeOptions::with_method(request.method);
    let results = state
        .pipeline()
        .scraping()
        .scrape_many(&request.urls, &options, max_concurrent)
        .await;

    for result in &results {
        state.record_scrape(result);
    }
    let successful = results.iter().filter(|r| r.success).count();
    let response = BatchResponse {
        success: successful == results.len(),
        total: results.len(),
        successful,
        failed: results.len() - successful,
        processing_time: started.elapsed().as_secs_f64(),
        results,
    };
    if response.failed > 0 {
        warn!("Batch had {} failed URLs", response.failed);
    }
    state.record_request(started.elapsed(), response.success);
    state.push_activity(
        ActivityRecord::new(
            ActivityKind::Batch,
            format!("{} URLs", response.total),
            response.success,
        )
        .with_time(response.processing_time),
    );

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Service descriptions
#[instrument(skip_all)]
pub async fn info_handler(State(state): State<Arc<AppState>>) -> Json<ApiInfo> {
    let pipeline = state.pipeline();
    Json(ApiInfo {
        name: SERVER_NAME.to_string(),
        version: SERVER_VERSION.to_string(),
        scraping: pipeline.scraping().info(),
        extraction: pipeline.extraction().info(),
        endpoints: ENDPOINTS.iter().map(|s| s.to_string()).collect(),
    })
}

/// Recent activity, newest first
#[instrument(skip_all)]
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    info!("History requested (limit {})", limit);
    Json(state.history(limit))
}

const ENDPOINTS: &[&str] = &[
    "GET /",
    "GET /health",
    "GET /ready",
    "GET /status",
    "GET /api/info",
    "GET /api/history",
    "POST /api/scrape",
    "POST /api/extract",
    "POST /api/scrape-extract",
    "POST /api/batch",
];

// ============================================================================
// Router Setup
// ============================================================================

/// The `/api/*` routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/info", get(info_handler))
        .route("/api/history", get(history_handler))
        .route("/api/scrape", post(scrape_handler))
        .route("/api/extract", post(extract_handler))
        .route("/api/scrape-extract", post(scrape_extract_handler))
        .route("/api/batch", post(batch_handler))
}
