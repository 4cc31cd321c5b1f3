//! HTTP boundary tests against the assembled router.

mod common;

use std::sync::Arc;
use std::time::Duration;

use ai_gateway::GatewayError;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{system_of, MockGateway, MockSite};
use server_core::scraping::prompts::{PAGE_SYNTHESIS_SYSTEM, STAGE_FILL_SYSTEM};
use server_core::scraping::{AnalysisPipeline, InMemoryJobStore, JobTracker};
use server_core::server::{build_app, AppState};
use tower::util::ServiceExt;

const HOME: &str = "https://example.com";

fn test_app() -> Router {
    let site = MockSite::default().with_page(HOME, "Inicio", "Barbería El Clásico.");
    let gateway = Arc::new(MockGateway::new(|request| match system_of(request) {
        s if s == PAGE_SYNTHESIS_SYSTEM => Ok("facts".to_string()),
        s if s == STAGE_FILL_SYSTEM => Ok(r#"{"blocks": [], "steps": []}"#.to_string()),
        _ => Err(GatewayError::Api("unexpected call".into())),
    }));
    let pipeline = Arc::new(AnalysisPipeline::new(gateway, Arc::new(site), "test-model"));
    let tracker = Arc::new(JobTracker::new(
        Arc::new(InMemoryJobStore::new()),
        pipeline,
    ));
    build_app(AppState { tracker }, None)
}

fn post_analyze(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/web-scraping/analyze-website")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_is_up() {
    let app = test_app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn analyze_returns_a_job_id_immediately() {
    let app = test_app();
    let response = app
        .oneshot(post_analyze(
            r#"{"url": "https://example.com", "templateId": "basic"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(!body["jobId"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn analyze_rejects_an_invalid_url() {
    let app = test_app();
    let response = app
        .oneshot(post_analyze(r#"{"url": "not a url", "templateId": "basic"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("URL"));
}

#[tokio::test]
async fn analyze_rejects_an_unknown_template() {
    let app = test_app();
    let response = app
        .oneshot(post_analyze(
            r#"{"url": "https://example.com", "templateId": "florist"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("templateId"));
}

#[tokio::test]
async fn unknown_job_id_is_a_client_error() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/web-scraping/job-status/no-such-job")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn a_started_job_can_be_polled_to_completion() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(post_analyze(
            r#"{"url": "https://example.com", "templateId": "basic"}"#,
        ))
        .await
        .unwrap();
    let job_id = json_body(response).await["jobId"]
        .as_str()
        .unwrap()
        .to_string();

    let mut last_status = String::new();
    for _ in 0..500 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/web-scraping/job-status/{job_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        last_status = body["status"].as_str().unwrap().to_string();
        if last_status != "processing" {
            assert_eq!(last_status, "completed");
            assert_eq!(body["jobId"], job_id.as_str());
            assert_eq!(body["result"]["template"]["id"], "basic");
            assert!(body["result"]["timings"]["totalMs"].is_number());
            assert!(body.get("error").is_none());
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job stuck in status {last_status}");
}
