use std::fs;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use log_viewer::templates::{self, TemplateCatalog};
use log_viewer::{build_router, AppState};

fn app(dir: &TempDir) -> Router {
    let catalog =
        TemplateCatalog::build(Arc::new(templates::builtin()), templates::BUILTIN_ROOT).unwrap();
    build_router(AppState::new(dir.path().to_path_buf()), Arc::new(catalog))
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn decode(contents: &Value) -> String {
    String::from_utf8(STANDARD.decode(contents.as_str().unwrap()).unwrap()).unwrap()
}

fn numbered_lines(count: usize) -> String {
    (0..count).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n")
}

#[tokio::test]
async fn metadata_requires_a_path() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get_json(app(&dir), "/api/log?path=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Requires a non-empty log path");

    let (status, _) = get_json(app(&dir), "/api/log").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn metadata_of_existing_and_missing_files() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("worker")).unwrap();
    fs::write(dir.path().join("worker/slog.txt"), "hello\n").unwrap();

    let (status, body) = get_json(app(&dir), "/api/log?path=worker/slog.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "slog.txt");
    assert_eq!(body["path"], "worker/slog.txt");
    assert_eq!(body["fileSize"], 6);

    let (status, body) = get_json(app(&dir), "/api/log?path=worker/nope.txt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "The specified path does not exist");
}

#[tokio::test]
async fn pages_a_long_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), numbered_lines(120)).unwrap();

    let (status, first) = get_json(app(&dir), "/api/log/page?path=a.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["page"], 0);
    assert_eq!(first["nextPage"], 1);
    assert!(first.get("previousPage").is_none());
    assert_eq!(first["mediaType"], "text/plain");
    let text = decode(&first["contents"]);
    assert_eq!(text.lines().count(), 50);
    assert!(text.starts_with("line 0\n"));

    let (_, last) = get_json(app(&dir), "/api/log/page?path=a.txt&page=2").await;
    assert_eq!(last["page"], 2);
    assert_eq!(last["previousPage"], 1);
    assert!(last.get("nextPage").is_none());
    let text = decode(&last["contents"]);
    assert_eq!(text.lines().count(), 20);
    assert!(text.ends_with("line 119"));

    let (status, beyond) = get_json(app(&dir), "/api/log/page?path=a.txt&page=9").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decode(&beyond["contents"]), "");
}

#[tokio::test]
async fn page_errors() {
    let dir = TempDir::new().unwrap();

    let (status, body) = get_json(app(&dir), "/api/log/page?path=missing.txt").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Failed to open file");

    let (status, _) = get_json(app(&dir), "/api/log/page?path=a.txt&page=first").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn raw_returns_whole_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("slog.json"), "{\"msg\":\"hi\"}\n").unwrap();

    let (status, body) = get_json(app(&dir), "/api/log/raw?path=slog.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mediaType"], "application/json");
    assert_eq!(decode(&body["contents"]), "{\"msg\":\"hi\"}\n");

    let (status, _) = get_json(app(&dir), "/api/log/raw?path=").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lists_directories() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("worker")).unwrap();
    fs::create_dir_all(dir.path().join("empty")).unwrap();
    fs::write(dir.path().join("b.txt"), "b").unwrap();
    fs::write(dir.path().join("worker/slog.txt"), "w").unwrap();

    let (status, body) = get_json(app(&dir), "/api/logs").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["logfiles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["b.txt", "empty", "worker"]);
    assert_eq!(body["logfiles"][2]["dir"], true);

    assert_eq!(body["logfiles"][0]["path"], "/b.txt");

    let (status, body) = get_json(app(&dir), "/api/logs?path=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["logfiles"][0]["path"], "b.txt");
    assert_eq!(body["logfiles"][2]["path"], "worker");

    let (_, body) = get_json(app(&dir), "/api/logs?path=worker").await;
    assert_eq!(body["logfiles"][0]["path"], "worker/slog.txt");
    assert_eq!(body["logfiles"][0]["dir"], false);

    let (status, body) = get_json(app(&dir), "/api/logs?path=empty").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["logfiles"], serde_json::json!([]));

    let (status, _) = get_json(app(&dir), "/api/logs?path=nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn paths_cannot_escape_the_working_directory() {
    let outer = TempDir::new().unwrap();
    fs::write(outer.path().join("secret.txt"), "secret").unwrap();
    fs::create_dir(outer.path().join("root")).unwrap();
    let root = outer.path().join("root");
    let catalog =
        TemplateCatalog::build(Arc::new(templates::builtin()), templates::BUILTIN_ROOT).unwrap();
    let app = build_router(AppState::new(root), Arc::new(catalog));

    let (status, _) = get_json(app.clone(), "/api/log/raw?path=../secret.txt").await;
    assert_ne!(status, StatusCode::OK);
    let (status, _) = get_json(app, "/api/log?path=../../../../secret.txt").await;
    assert_ne!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_api_paths_are_json_404s() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get_json(app(&dir), "/api/nothing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found");
}

#[tokio::test]
async fn openapi_lists_serving_url() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(
            Request::builder()
                .uri("/api/openapi.json")
                .header(header::HOST, "viewer.test:8080")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let doc: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(doc["servers"][0]["url"], "http://viewer.test:8080/api");
}

#[tokio::test]
async fn docs_page_is_html() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(Request::builder().uri("/api").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
}
