//! Page rendering in front of the JSON API.
//!
//! Requests outside `/api` are answered from the [`TemplateCatalog`]: static
//! pages are sent verbatim, templated pages fetch `/api` + the page path from
//! the API router in-process and execute the template against the JSON reply.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Router,
};
use log::debug;
use serde_json::{Map, Value};
use tower::ServiceExt;

use crate::engine::{from_base64, FuncMap, Template};
use crate::errors::RenderError;
use crate::templates::{TemplateCatalog, TemplateDescriptor};
use crate::utils::{absolute_url, clean_path, path_ext};

/// Requests under this prefix are never rendered
pub const API_PREFIX: &str = "/api";

const JSON_MEDIA_TYPE: &str = "application/json";

/// True for `/api` itself and anything beneath it
pub fn is_api_path(clean: &str) -> bool {
    clean == API_PREFIX
        || clean
            .strip_prefix(API_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Functions available to page templates
pub fn template_funcs() -> FuncMap {
    let mut funcs = FuncMap::builtins();
    funcs.insert("from_base64", from_base64);
    funcs
}

/// Shared state of the rendering layer
#[derive(Clone)]
pub struct Renderer {
    catalog: Arc<TemplateCatalog>,
    api: Router,
    funcs: FuncMap,
}

impl Renderer {
    /// `api` must be the API router without this layer applied
    pub fn new(catalog: Arc<TemplateCatalog>, api: Router) -> Self {
        Self {
            catalog,
            api,
            funcs: template_funcs(),
        }
    }

    async fn render(&self, method: &Method, uri: &Uri, headers: &HeaderMap) -> Result<Response, RenderError> {
        let clean = clean_path(uri.path());

        if !path_ext(&clean).is_empty() {
            return Err(RenderError::NotFound);
        }
        if method != Method::GET {
            return Err(RenderError::MethodNotAllowed);
        }

        if let Some(descriptor) = self.catalog.static_variant(&clean) {
            let body = self.catalog.read(descriptor)?;
            return Ok(with_media_type(descriptor.media_type, body));
        }

        let descriptor = self
            .catalog
            .templated_variant(&clean)
            .ok_or(RenderError::NotFound)?;
        let template = self.parse(descriptor)?;

        let mut data = self.fetch(&clean, uri, headers).await?;
        data.insert("Request".to_string(), Value::String(absolute_url(headers, uri)));

        let output = template.render(&Value::Object(data))?;
        Ok(with_media_type(descriptor.media_type, output.into_bytes()))
    }

    fn parse(&self, descriptor: &TemplateDescriptor) -> Result<Template, RenderError> {
        let source = self.catalog.read(descriptor)?;
        let source = String::from_utf8_lossy(&source);
        Ok(Template::parse(&descriptor.storage_path, &source, self.funcs.clone())?)
    }

    /// GET the API resource backing page `clean`
    async fn fetch(&self, clean: &str, uri: &Uri, headers: &HeaderMap) -> Result<Map<String, Value>, RenderError> {
        let api_path = clean_path(&format!("{API_PREFIX}{clean}"));
        let target = match uri.query() {
            Some(query) => format!("{api_path}?{query}"),
            None => api_path,
        };
        debug!("Loopback request to {}", target);

        let mut request = Request::builder()
            .method(Method::GET)
            .uri(&target)
            .body(Body::empty())
            .map_err(|e| RenderError::Upstream(e.to_string()))?;
        for (name, value) in headers {
            if *name != header::CONTENT_LENGTH && *name != header::CONTENT_TYPE {
                request.headers_mut().append(name.clone(), value.clone());
            }
        }

        let response = match self.api.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RenderError::NotFound);
        }
        if !status.is_success() {
            return Err(RenderError::UpstreamStatus(status));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_json(&content_type) {
            return Err(RenderError::NotJson(content_type));
        }

        let body: Bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| RenderError::Upstream(e.to_string()))?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Media type essence is `application/json`, parameters ignored
fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(JSON_MEDIA_TYPE))
}

fn with_media_type(media_type: &str, body: Vec<u8>) -> Response {
    let mut response = body.into_response();
    response.headers_mut().remove(header::CONTENT_TYPE);
    if !media_type.is_empty() {
        if let Ok(value) = HeaderValue::from_str(media_type) {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
    }
    response
}

/// Axum middleware answering every non-API request from templates
pub async fn render_middleware(State(renderer): State<Renderer>, req: Request, next: Next) -> Response {
    let clean = clean_path(req.uri().path());
    if is_api_path(&clean) {
        return next.run(req).await;
    }

    let (parts, _body) = req.into_parts();
    match renderer.render(&parts.method, &parts.uri, &parts.headers).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}
