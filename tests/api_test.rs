//! HTTP API handlers driven through the router

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use field_safety_monitor::api::create_router;
use field_safety_monitor::sources::{MemorySource, SiteConditions, WeatherSnapshot};
use field_safety_monitor::{Config, MonitorSources, SafetyMonitor};

fn windy_site() -> (SafetyMonitor, Router) {
    let source = Arc::new(MemorySource::new(SiteConditions {
        weather: Some(WeatherSnapshot {
            wind_speed_mph: 40.0,
            ..WeatherSnapshot::calm()
        }),
        ..Default::default()
    }));
    let monitor =
        SafetyMonitor::builder(Config::default(), MonitorSources::from_shared(source)).build();
    let router = create_router(monitor.clone());
    (monitor, router)
}

async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let (_, router) = windy_site();
    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_risk_before_any_cycle() {
    let (_, router) = windy_site();
    let (status, body) = send(&router, "GET", "/api/risk").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["level"], "low");
    assert_eq!(body["score"], 0.0);
    assert!(body["cycle"].is_null());
}

#[tokio::test]
async fn test_manual_cycle_then_risk() {
    let (_, router) = windy_site();

    let (status, cycle) = send(&router, "POST", "/api/cycle").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cycle["overall_level"], "critical");

    let (_, risk) = send(&router, "GET", "/api/risk").await;
    assert_eq!(risk["level"], "critical");
    assert_eq!(risk["cycle"]["id"], cycle["id"]);
    assert_eq!(risk["last_emergency"]["cycle_id"], cycle["id"]);

    let (_, cycles) = send(&router, "GET", "/api/cycles?count=5").await;
    assert_eq!(cycles.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cycle_after_stop_is_unavailable() {
    let (monitor, router) = windy_site();
    monitor.stop().await;
    let (status, _) = send(&router, "POST", "/api/cycle").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_alert_acknowledgment() {
    let (_, router) = windy_site();
    send(&router, "POST", "/api/cycle").await;

    let (_, alerts) = send(&router, "GET", "/api/alerts").await;
    let alerts = alerts.as_array().unwrap().clone();
    assert_eq!(alerts.len(), 1);
    let id = alerts[0]["id"].as_str().unwrap();

    let (_, ack) = send(&router, "POST", &format!("/api/alerts/{}/ack", id)).await;
    assert_eq!(ack["acknowledged"], true);

    let (_, alerts) = send(&router, "GET", "/api/alerts").await;
    assert!(alerts.as_array().unwrap().is_empty());

    let (status, ack) = send(&router, "POST", "/api/alerts/no-such-alert/ack").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["acknowledged"], false);
}

#[tokio::test]
async fn test_checklist_lifecycle() {
    let (_, router) = windy_site();
    send(&router, "POST", "/api/cycle").await;

    let (status, checklist) = send(&router, "POST", "/api/checklists").await;
    assert_eq!(status, StatusCode::OK);
    let id = checklist["id"].as_str().unwrap().to_string();
    let item = checklist["items"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(checklist["completed"], false);

    let (_, result) = send(
        &router,
        "POST",
        &format!("/api/checklists/{}/items/{}/complete", id, item),
    )
    .await;
    assert_eq!(result["completed"], true);
    let items = result["checklist"]["items"].as_array().unwrap();
    assert_eq!(items.iter().filter(|i| i["is_completed"] == true).count(), 1);

    let (status, fetched) = send(&router, "GET", &format!("/api/checklists/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["items"][0]["is_completed"], true);

    let (status, _) = send(&router, "GET", "/api/checklists/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_contacts_and_status() {
    let (_, router) = windy_site();
    let (_, contacts) = send(&router, "GET", "/api/contacts").await;
    assert_eq!(contacts[0]["phone"], "911");

    let (_, status) = send(&router, "GET", "/api/status").await;
    assert_eq!(status["running"], false);
    assert_eq!(status["cycles_completed"], 0);
    assert_eq!(status["emergency_state"]["state"], "idle");
}
