use std::time::Instant;

use axum::{
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::{info, warn};

use crate::utils::clean_path;

/// Log method, path, status and elapsed time of every request
pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed = started.elapsed();
    if status.is_server_error() {
        warn!("{} {} {} in {:?}", method, path, status.as_u16(), elapsed);
    } else {
        info!("{} {} {} in {:?}", method, path, status.as_u16(), elapsed);
    }
    response
}

/// Redirect `/path/` to `/path` with 301 Moved Permanently.
///
/// The target is cleaned, so `//host/` cannot become a protocol-relative
/// redirect to another site.
pub async fn redirect_slashes(req: Request, next: Next) -> Response {
    let path = req.uri().path();
    if path.len() <= 1 || !path.ends_with('/') {
        return next.run(req).await;
    }

    let mut location = clean_path(path);
    if let Some(query) = req.uri().query() {
        location.push('?');
        location.push_str(query);
    }

    match HeaderValue::from_str(&location) {
        Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, middleware::from_fn, routing::get, Router};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route("/logs", get(|| async { "logs" }))
            .layer(from_fn(redirect_slashes))
            .layer(from_fn(log_requests))
    }

    async fn send(uri: &str) -> Response {
        app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn trailing_slash_redirects() {
        let response = send("/logs/?path=worker").await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/logs?path=worker");
    }

    #[tokio::test]
    async fn double_slash_stays_on_host() {
        let response = send("//evil.example/").await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/evil.example");
    }

    #[tokio::test]
    async fn root_is_untouched() {
        assert_eq!(send("/logs").await.status(), StatusCode::OK);
        assert_eq!(send("/").await.status(), StatusCode::NOT_FOUND);
    }
}
