//! REST API tests
//!
//! The full router is driven in-process with `tower::ServiceExt::oneshot`,
//! backed by canned pages and a scripted model.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use scrapewise::config::Config;
use scrapewise::error::{FetchError, LlmError, Result};
use scrapewise::fetch::{FetchMethod, PageFetcher};
use scrapewise::handlers::{app_router, AppState};
use scrapewise::llm::{LanguageModel, ModelHealth};
use scrapewise::service::{ExtractionService, Pipeline, ScrapingService};

struct CannedPages {
    method: FetchMethod,
    pages: HashMap<&'static str, &'static str>,
}

#[async_trait]
impl PageFetcher for CannedPages {
    fn method(&self) -> FetchMethod {
        self.method
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .map(|page| page.to_string())
            .ok_or_else(|| {
                FetchError::Status {
                    status: 404,
                    url: url.to_string(),
                }
                .into()
            })
    }
}

/// Answers every prompt unless it mentions "FAIL"
struct ScriptedModel {
    online: bool,
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn temperature(&self) -> f32 {
        0.1
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        if !self.online || prompt.contains("FAIL") {
            return Err(LlmError::Unavailable("connection refused".to_string()).into());
        }
        Ok("Widget: $10".to_string())
    }

    async fn health(&self) -> ModelHealth {
        if self.online {
            ModelHealth::Available
        } else {
            ModelHealth::Unreachable {
                error: "connection refused".to_string(),
            }
        }
    }
}

fn state(online: bool) -> Arc<AppState> {
    let pages: HashMap<&'static str, &'static str> = [
        (
            "https://shop.test/",
            "<html><body><h1>Shop</h1><p>Widget - $10</p><a href=\"/w\">Widget page</a></body></html>",
        ),
        (
            "https://shop.test/broken",
            "<html><body><p>FAIL here</p></body></html>",
        ),
    ]
    .into_iter()
    .collect();

    let config = Config::default();
    let http = Arc::new(CannedPages {
        method: FetchMethod::Http,
        pages: pages.clone(),
    });
    let browser = Arc::new(CannedPages {
        method: FetchMethod::Browser,
        pages,
    });
    let scraping = ScrapingService::with_fetchers(http, browser, &config);
    let extraction = ExtractionService::from_config(Arc::new(ScriptedModel { online }), &config);
    Arc::new(AppState::new(Pipeline::new(scraping, extraction), 2))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_ui_page_served() {
    let app = app_router(state(true));
    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/html"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("/api/scrape-extract"));
}

#[tokio::test]
async fn test_health() {
    let app = app_router(state(true));
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ready_follows_model() {
    let (status, body) = send(&app_router(state(true)), Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");

    let (status, body) = send(&app_router(state(false)), Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["endpoint"]["status"], "unreachable");
}

#[tokio::test]
async fn test_scrape() {
    let app = app_router(state(true));
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/scrape",
        Some(json!({"url": "https://shop.test/", "extract_links": true})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["method"], "http");
    assert_eq!(body["content"], "Shop\nWidget - $10\nWidget page");
    assert_eq!(body["extracted_links"][0]["url"], "https://shop.test/w");
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_scrape_errors() {
    let app = app_router(state(true));

    let (status, body) = send(&app, Method::POST, "/api/scrape", Some(json!({"url": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/scrape",
        Some(json!({"url": "not a url"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid URL"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/scrape",
        Some(json!({"url": "https://shop.test/missing", "method": "browser"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert_eq!(body["method"], "browser");
    assert!(body["error"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn test_missing_fields_are_bad_requests() {
    let app = app_router(state(true));

    for (uri, body) in [
        ("/api/scrape", json!({})),
        ("/api/extract", json!({})),
        ("/api/scrape-extract", json!({"content": "x"})),
        ("/api/batch", json!({})),
    ] {
        let (status, body) = send(&app, Method::POST, uri, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["success"], false, "{}", uri);
        assert!(body["error"].is_string(), "{}", uri);
    }
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = app_router(state(true));

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/scrape")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"url\": "))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);

    let response = app
        .oneshot(
            Request::post("/api/batch")
                .body(Body::from(r#"{"urls":["https://shop.test/"]}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_extract() {
    let app = app_router(state(true));
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/extract",
        Some(json!({"content": "Widget - $10", "instructions": "prices"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Widget: $10");
    assert_eq!(body["confidence"], 1.0);
    assert_eq!(body["model_used"], "scripted");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/extract",
        Some(json!({"content": "Widget - $10", "instructions": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No extraction instructions provided");
}

#[tokio::test]
async fn test_extract_model_down() {
    let app = app_router(state(false));
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/extract",
        Some(json!({"content": "Widget - $10", "instructions": "prices"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_scrape_extract() {
    let app = app_router(state(true));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/scrape-extract",
        Some(json!({"url": "https://shop.test/", "instructions": "prices"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["content"], "Widget: $10");
    assert_eq!(body["scrape"]["success"], true);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/scrape-extract",
        Some(json!({"url": "https://shop.test/broken", "instructions": "prices"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["scrape"]["success"], true);
    assert_eq!(body["extraction"]["success"], false);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/scrape-extract",
        Some(json!({"url": "https://shop.test/missing", "instructions": "prices"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.get("extraction").is_none());
}

#[tokio::test]
async fn test_batch() {
    let app = app_router(state(true));
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/batch",
        Some(json!({
            "urls": ["https://shop.test/missing", "https://shop.test/"],
            "max_concurrent": 10
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["successful"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["success"], false);
    assert_eq!(body["results"][0]["success"], false);
    assert_eq!(body["results"][1]["url"], "https://shop.test/");

    let (status, _) = send(&app, Method::POST, "/api/batch", Some(json!({"urls": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_and_status() {
    let state = state(true);
    let app = app_router(state.clone());

    send(
        &app,
        Method::POST,
        "/api/scrape",
        Some(json!({"url": "https://shop.test/"})),
    )
    .await;
    send(
        &app,
        Method::POST,
        "/api/scrape",
        Some(json!({"url": "https://shop.test/missing"})),
    )
    .await;
    send(
        &app,
        Method::POST,
        "/api/extract",
        Some(json!({"content": "text", "instructions": "x"})),
    )
    .await;

    let (status, history) = send(&app, Method::GET, "/api/history?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["kind"], "extract");
    assert_eq!(history[1]["target"], "https://shop.test/missing");
    assert_eq!(history[1]["success"], false);

    let (status, body) = send(&app, Method::GET, "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "scripted");
    assert_eq!(body["scrapes"]["total"], 2);
    assert_eq!(body["scrapes"]["successful"], 1);
    assert_eq!(body["extractions"]["total"], 1);
    assert_eq!(body["total_requests"], 3);
    assert_eq!(body["errors"], 1);

    assert_eq!(state.scrape_stats().success_rate, 0.5);
}

#[tokio::test]
async fn test_info() {
    let app = app_router(state(true));
    let (status, body) = send(&app, Method::GET, "/api/info", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "scrapewise");
    assert_eq!(body["extraction"]["model"], "scripted");
    assert_eq!(body["scraping"]["methods"], json!(["http", "browser"]));
}

#[tokio::test]
async fn test_cors_allows_localhost_only() {
    let app = app_router(state(true));

    let preflight = |origin: &'static str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/scrape")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    };

    let response = app
        .clone()
        .oneshot(preflight("http://localhost:8501"))
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:8501"
    );

    let response = app.oneshot(preflight("https://evil.example")).await.unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
