use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{HeaderMap, Uri},
    response::Html,
    routing::get,
    Json, Router,
};
use log::debug;
use serde_json::Value;

use crate::errors::{ApiError, LogError};
use crate::openapi;
use crate::services::LogService;
use crate::types::{AppState, LogListing, LogMetadata, LogPage, PageQuery, PathQuery, RawLog};
use crate::utils::{path_dir, request_host};

const DOCS_HTML: &str = include_str!("../static/docs.html");

/// The JSON API, without any rendering layer
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/api", get(docs))
        .route("/api/openapi.json", get(openapi_document))
        .route("/api/logs", get(list_logs))
        .route("/api/log", get(log_metadata))
        .route("/api/log/page", get(log_page))
        .route("/api/log/raw", get(log_raw))
        .fallback(not_found)
        .with_state(state)
}

/// Run a blocking log store call on the blocking pool
async fn with_logs<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&LogService) -> Result<T, LogError> + Send + 'static,
{
    let logs = Arc::clone(&state.logs);
    tokio::task::spawn_blocking(move || op(&logs))
        .await
        .map_err(|e| ApiError::Internal(format!("log task failed: {e}")))?
        .map_err(ApiError::from)
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(inner)| inner)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// `GET /api/logs?path=<dir>`
pub async fn list_logs(
    State(state): State<AppState>,
    params: Result<Query<PathQuery>, QueryRejection>,
) -> Result<Json<LogListing>, ApiError> {
    let PathQuery { path } = query(params)?;
    debug!("List logs request: {:?}", path);
    with_logs(&state, move |logs| logs.list(path.as_deref())).await.map(Json)
}

/// `GET /api/log?path=<file>`
pub async fn log_metadata(
    State(state): State<AppState>,
    params: Result<Query<PathQuery>, QueryRejection>,
) -> Result<Json<LogMetadata>, ApiError> {
    let path = query(params)?.path.unwrap_or_default();
    with_logs(&state, move |logs| logs.metadata(&path)).await.map(Json)
}

/// `GET /api/log/page?path=<file>&page=<n>`
pub async fn log_page(
    State(state): State<AppState>,
    params: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<LogPage>, ApiError> {
    let PageQuery { path, page } = query(params)?;
    let path = path.unwrap_or_default();
    with_logs(&state, move |logs| logs.page(&path, page)).await.map(Json)
}

/// `GET /api/log/raw?path=<file>`
pub async fn log_raw(
    State(state): State<AppState>,
    params: Result<Query<PathQuery>, QueryRejection>,
) -> Result<Json<RawLog>, ApiError> {
    let path = query(params)?.path.unwrap_or_default();
    with_logs(&state, move |logs| logs.raw(&path)).await.map(Json)
}

/// `GET /api/openapi.json`, advertising the URL it was fetched from
pub async fn openapi_document(headers: HeaderMap, uri: Uri) -> Json<Value> {
    let host = request_host(&headers, &uri);
    let server_url = format!("http://{host}{}", path_dir(uri.path()));
    Json(openapi::document(&server_url))
}

/// `GET /api`
pub async fn docs() -> Html<&'static str> {
    Html(DOCS_HTML)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Not Found".to_string())
}
