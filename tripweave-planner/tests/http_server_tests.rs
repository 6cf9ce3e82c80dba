//! HTTP server and routing tests
//!
//! The router is driven with `oneshot`; the generator and geocoder are
//! in-process stubs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use tripweave_common::Coordinates;
use tripweave_planner::config::PlannerConfig;
use tripweave_planner::pipeline::Geocoder;
use tripweave_planner::services::{TextGenerator, UpstreamError, UpstreamKind};
use tripweave_planner::{build_router, AppState};

enum Reply {
    Text(&'static str),
    Fail(UpstreamKind, &'static str),
    Hang,
}

struct StubGenerator(Reply);

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, UpstreamError> {
        match &self.0 {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Fail(kind, message) => Err(UpstreamError::new(*kind, "stub", *message)),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(String::new())
            }
        }
    }
}

struct NoGeocoder;

#[async_trait]
impl Geocoder for NoGeocoder {
    async fn resolve(&self, _address: &str) -> Option<Coordinates> {
        None
    }
}

const PLAN: &str = r#"{"title":"Rome Express","days":[{"day_number":1,"date":"2025-05-01","events":[
    {"name":"Colosseum","category":"activity","start_time":"09:00","coordinates":{"lat":41.8902,"lng":12.4922}},
    {"name":"Trattoria","category":"lunch","start_time":"13:00","coordinates":{"lat":41.8986,"lng":12.4769}}
]}]}"#;

fn test_app(reply: Reply) -> (AppState, axum::Router) {
    let config = PlannerConfig {
        gemini_api_key: Some("test-key".to_string()),
        request_timeout: Duration::from_millis(200),
        ..Default::default()
    };
    let state = AppState::new(config, Arc::new(StubGenerator(reply)), Arc::new(NoGeocoder));
    let app = build_router(state.clone());
    (state, app)
}

fn trip_request() -> Value {
    json!({
        "destination": "Rome",
        "startDate": "2025-05-01",
        "endDate": "2025-05-02",
        "budget": "moderate",
        "preferences": ["history", "food"],
        "mandatoryPlaces": [
            {"id": "colosseum", "name": "Colosseum"},
            {"id": "pantheon", "name": "Pantheon", "address": "Piazza della Rotonda"}
        ]
    })
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_reports_module_and_uptime() {
    let (_, app) = test_app(Reply::Text(PLAN));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "tripweave-planner");
    assert!(json["uptime_seconds"].is_u64());
    assert!(json.get("last_error").is_none());
}

#[tokio::test]
async fn test_create_itinerary_returns_repaired_plan() {
    let (_, app) = test_app(Reply::Text(PLAN));

    let response = app.oneshot(post("/api/itinerary", &trip_request())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let itinerary = &json["itinerary"];
    assert_eq!(itinerary["title"], "Rome Express");
    assert_eq!(itinerary["days"][0]["events"][0]["name"], "Pantheon");
    assert_eq!(itinerary["days"][0]["meals"]["lunch"]["name"], "Trattoria");
    assert_eq!(json["recoveryTier"], "direct");
    assert!(json["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .any(|d| d["stage"] == "coverage" && d["level"] == "warning"));
}

#[tokio::test]
async fn test_events_without_coordinates_degrade_through_handler() {
    let (_, app) = test_app(Reply::Text(
        r#"{"days":[{"day_number":1,"events":[
            {"name":"Colosseum","address":"Piazza del Colosseo","category":"activity","start_time":"09:00"},
            {"name":"Pantheon","address":"Piazza della Rotonda","category":"activity","start_time":"11:00"}
        ]}]}"#,
    ));

    let response = app.oneshot(post("/api/itinerary", &trip_request())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let events = json["itinerary"]["days"][0]["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    for event in events {
        assert_eq!(event["coordinates"]["lat"], 0.0);
        assert_eq!(event["coordinates"]["lng"], 0.0);
    }
    assert_eq!(events[0]["travelDistanceToNextKm"], 0.0);
    let enrichment_warnings = json["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|d| d["stage"] == "enrichment" && d["level"] == "warning")
        .count();
    assert_eq!(enrichment_warnings, 2);
}

#[tokio::test]
async fn test_invalid_request_is_400_with_every_problem() {
    let (_, app) = test_app(Reply::Text(PLAN));
    let mut request = trip_request();
    request["destination"] = json!("");
    request["preferences"] = json!([]);

    let response = app.oneshot(post("/api/itinerary", &request)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"]["problems"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_quota_error_is_429() {
    let (_, app) = test_app(Reply::Fail(UpstreamKind::Quota, "quota exceeded"));
    let response = app.oneshot(post("/api/itinerary", &trip_request())).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(response).await["error"]["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn test_configuration_error_is_500() {
    let (_, app) = test_app(Reply::Fail(UpstreamKind::Configuration, "API key not valid"));
    let response = app.oneshot(post("/api/itinerary", &trip_request())).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"]["code"], "CONFIGURATION_ERROR");
}

#[tokio::test]
async fn test_network_error_is_503_and_recorded_for_health() {
    let (state, app) = test_app(Reply::Fail(UpstreamKind::Network, "connection refused"));

    let response = app
        .clone()
        .oneshot(post("/api/itinerary", &trip_request()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let last_error = state.last_error.read().await.clone();
    assert!(last_error.unwrap().contains("connection refused"));

    let health = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(body_json(health).await["last_error"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
}

#[tokio::test]
async fn test_slow_generation_times_out_as_503() {
    let (_, app) = test_app(Reply::Hang);
    let response = app.oneshot(post("/api/itinerary", &trip_request())).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert!(json["error"]["message"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_unparseable_output_is_502() {
    let (_, app) = test_app(Reply::Text("Sorry, I cannot plan this trip."));
    let response = app.oneshot(post("/api/itinerary", &trip_request())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"]["code"], "UNPARSEABLE_OUTPUT");
}

#[tokio::test]
async fn test_repair_endpoint_skips_generation() {
    let (_, app) = test_app(Reply::Fail(UpstreamKind::Network, "must not be called"));
    let body = json!({
        "request": trip_request(),
        "rawText": "```json\n{\"days\":[{\"day_number\":1,\"events\":[{\"name\":\"Pantheon\",\"category\":\"dinner\"}],\"daily_budget_breakdown\":{\"food\":\"$4"
    });

    let response = app.oneshot(post("/api/itinerary/repair", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["recoveryTier"], "partial_day");
    let day = &json["itinerary"]["days"][0];
    assert_eq!(day["meals"]["dinner"]["name"], "Pantheon");
    assert_eq!(day["events"][0]["name"], "Colosseum");
    assert_eq!(day["dailyBudgetBreakdown"]["total"], "$0");
}
