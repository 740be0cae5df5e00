//! Integration tests for the HTTP API

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Weekday;
use serde_json::{json, Value};
use spamfilter_rs::app::Pipeline;
use spamfilter_rs::config::{Config, RetrainMode};
use std::collections::HashMap;
use tower::ServiceExt;

async fn setup_app() -> (Router, Pipeline) {
    let mut config = Config::default();
    config.storage.database_url = "sqlite::memory:".to_string();
    let pipeline = Pipeline::open(&config).await.unwrap();
    let app = spamfilter_rs::api::router(pipeline.app_state());
    (app, pipeline)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let (app, _pipeline) = setup_app().await;

    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_version"], 0);
}

#[tokio::test]
async fn test_predict_before_training_is_not_spam() {
    let (app, _pipeline) = setup_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/spam/predict",
        Some(json!({ "text": "buy now!!!" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["label"], "not-spam");
    assert_eq!(body["model_version"], 0);
}

#[tokio::test]
async fn test_label_retrain_predict() {
    let (app, _pipeline) = setup_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/spam/labels",
        Some(json!({ "text": "buy now!!!", "is_spam": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "inserted");

    send(
        &app,
        "POST",
        "/spam/labels",
        Some(json!({ "text": "thanks for the tip", "is_spam": false, "source": "author" })),
    )
    .await;

    let (status, body) = send(&app, "POST", "/spam/retrain", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "retrained");
    assert_eq!(body["version"], 1);

    let (_, body) = send(
        &app,
        "POST",
        "/spam/predict",
        Some(json!({ "text": "buy now!!!" })),
    )
    .await;
    assert_eq!(body["label"], "spam");
    assert_eq!(body["model_version"], 1);

    let (status, body) = send(&app, "GET", "/spam/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dataset"]["total"], 2);
    assert_eq!(body["model"]["spam_examples"], 1);
}

#[tokio::test]
async fn test_retrain_without_both_classes() {
    let (app, _pipeline) = setup_app().await;

    send(
        &app,
        "POST",
        "/spam/labels",
        Some(json!({ "text": "buy now!!!", "is_spam": true })),
    )
    .await;
    let (status, body) = send(&app, "POST", "/spam/retrain", None).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("spam"));
}

#[tokio::test]
async fn test_unchanged_correction() {
    let (app, pipeline) = setup_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/spam/corrections",
        Some(json!({ "text": "is this a bug?", "previous": false, "corrected": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["outcome"].is_null());

    let (_, body) = send(
        &app,
        "POST",
        "/spam/corrections",
        Some(json!({ "text": "is this a bug?", "previous": false, "corrected": true })),
    )
    .await;
    assert_eq!(body["outcome"], "inserted");
    assert_eq!(pipeline.dataset.stats().await.unwrap().spam, 1);
}

#[tokio::test]
async fn test_schedule_state_defaults() {
    let (app, _pipeline) = setup_app().await;

    let (status, body) = send(&app, "GET", "/schedule", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], true);
    assert!(body["last_run_date"].is_null());
}

#[tokio::test]
async fn test_index_runs_scheduled_job_once() {
    let mut config = Config::default();
    config.storage.database_url = "sqlite::memory:".to_string();
    // Every day is eligible so the outcome does not depend on the calendar
    config.schedule.weekdays = vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];
    config.schedule.retrain_mode = RetrainMode::Inline;
    let pipeline = Pipeline::open(&config).await.unwrap();
    let app = spamfilter_rs::api::router(pipeline.app_state());

    send(
        &app,
        "POST",
        "/spam/labels",
        Some(json!({ "text": "buy now!!!", "is_spam": true })),
    )
    .await;
    send(
        &app,
        "POST",
        "/spam/labels",
        Some(json!({ "text": "thanks for the tip", "is_spam": false })),
    )
    .await;

    let mut sent_per_date: HashMap<String, usize> = HashMap::new();
    let mut last_sent = None;
    for _ in 0..5 {
        let (status, body) = send(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);

        let date = body["date"].as_str().unwrap().to_string();
        match body["outcome"].as_str().unwrap() {
            "sent" => {
                assert_eq!(body["digest"]["status"], "completed");
                assert_eq!(body["retrain"]["status"], "completed");
                *sent_per_date.entry(date.clone()).or_default() += 1;
                last_sent = Some(date);
            }
            other => {
                assert_eq!(other, "already_sent");
                assert!(body["digest"].is_null());
            }
        }
    }

    assert!(sent_per_date.values().all(|&n| n == 1));
    let last_sent = last_sent.expect("the first request runs the job");

    let (_, schedule) = send(&app, "GET", "/schedule", None).await;
    assert_eq!(schedule["last_run_date"], last_sent.as_str());
    assert_eq!(schedule["is_sent"], true);
    assert_eq!(schedule["is_active"], true);

    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["model_version"], sent_per_date.len());
}
