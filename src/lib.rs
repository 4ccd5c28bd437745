//! Log Viewer - browse log files over HTTP
//!
//! A JSON API pages through files beneath a working directory, and a
//! rendering layer turns the same API into HTML pages using templates.

pub mod config;
pub mod engine;
pub mod errors;
pub mod fs_utils;
pub mod handlers;
pub mod logger;
pub mod middleware;
pub mod openapi;
pub mod render;
pub mod services;
pub mod templates;
pub mod types;
pub mod utils;

use std::sync::Arc;

use axum::{middleware::from_fn, middleware::from_fn_with_state, Router};

// Re-export commonly used items
pub use config::{Args, Config};
pub use errors::{ApiError, LogError, RenderError, TemplateError};
pub use render::Renderer;
pub use services::LogService;
pub use templates::{TemplateCatalog, TemplateSource};
pub use types::AppState;

/// Wrap `api` with page rendering, slash redirects and request logging
pub fn with_rendering(api: Router, renderer: Renderer) -> Router {
    api.layer(from_fn_with_state(renderer, render::render_middleware))
        .layer(from_fn(middleware::redirect_slashes))
        .layer(from_fn(middleware::log_requests))
}

/// The complete application: the API plus pages rendered from `catalog`
pub fn build_router(state: AppState, catalog: Arc<TemplateCatalog>) -> Router {
    let api = handlers::api_router(state);
    let renderer = Renderer::new(catalog, api.clone());
    with_rendering(api, renderer)
}
