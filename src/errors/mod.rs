use std::io;
use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use thiserror::Error;

use crate::engine::{ExecError, ParseError};
use crate::types::ErrorBody;

/// Failures of the log store
#[derive(Debug, Error)]
pub enum LogError {
    /// The request path was empty, malformed, or could not be opened.
    #[error("{0}")]
    InvalidPath(&'static str),
    #[error("The specified path does not exist")]
    NotFound,
    /// The request path escapes the working directory.
    #[error("path escapes the working directory")]
    UnsafePath,
}

/// Errors surfaced by the JSON API, rendered as `{"message": ...}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl From<LogError> for ApiError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::InvalidPath(message) => ApiError::BadRequest(message.to_string()),
            LogError::UnsafePath => ApiError::BadRequest("Invalid path".to_string()),
            LogError::NotFound => ApiError::NotFound(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(message) => {
                error!("API request failed: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}

/// Failures while discovering or reading templates
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("walking template directory {root}: {source}")]
    Walk {
        root: String,
        #[source]
        source: io::Error,
    },
    #[error("reading template {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("no templates found")]
    NotFound,
}

/// Failures of the rendering layer, answered with a plain-text body
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Not Found")]
    NotFound,
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("failed to get template: {0}")]
    Template(#[from] TemplateError),
    #[error("failed to parse template: {0}")]
    Parse(#[from] ParseError),
    #[error("failed to make API request: {0}")]
    Upstream(String),
    #[error("API request failed with status {0}")]
    UpstreamStatus(StatusCode),
    #[error("API response is not JSON (content type {0:?})")]
    NotJson(String),
    #[error("failed to decode API response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to render template: {0}")]
    Exec(#[from] ExecError),
}

impl RenderError {
    /// Status code and body sent to the client
    fn status_and_body(&self) -> (StatusCode, &'static str) {
        match self {
            RenderError::NotFound => (StatusCode::NOT_FOUND, "Not Found"),
            RenderError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"),
            RenderError::Template(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            RenderError::Parse(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to parse template"),
            RenderError::Upstream(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to make API request"),
            RenderError::UpstreamStatus(status) => (*status, "API request failed"),
            RenderError::NotJson(_) => (StatusCode::INTERNAL_SERVER_ERROR, "API response is not JSON"),
            RenderError::Decode(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to decode API response"),
            RenderError::Exec(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render template"),
        }
    }
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        if !matches!(self, RenderError::NotFound | RenderError::MethodNotAllowed) {
            error!("{}", self);
        }
        (status, body).into_response()
    }
}

/// Startup configuration failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("getting current directory: {0}")]
    CurrentDir(#[source] io::Error),
    #[error("working directory {path:?}: {source}")]
    WorkingDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("working directory {0:?} is not a directory")]
    NotADirectory(PathBuf),
}
