//! HTTP API tests, driven through the router without a socket.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use lifeline_shared::{Location, NearbyPlace, NearbyPlaces, PlaceCategory, TriageEngine};
use lifelined::emergency_log::MemoryEmergencyLog;
use lifelined::facilities::{FacilityLookup, LookupError};
use lifelined::merger::GuidanceMerger;
use lifelined::registry::SessionRegistry;
use lifelined::server::{self, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct FakeLookup(Result<NearbyPlaces, LookupError>);

#[async_trait]
impl FacilityLookup for FakeLookup {
    async fn find_nearby(&self, _location: &Location) -> Result<NearbyPlaces, LookupError> {
        self.0.clone()
    }
}

fn pharmacy() -> NearbyPlaces {
    let mut places = NearbyPlaces::default();
    places.push(NearbyPlace {
        name: "Apollo Pharmacy".to_string(),
        address: "Address not available".to_string(),
        distance: "1.2 km".to_string(),
        distance_meters: 1200.0,
        latitude: 12.98,
        longitude: 77.6,
        category: PlaceCategory::Pharmacy,
        ownership: None,
        facility_type: None,
        phone: None,
        website: None,
        opening_hours: None,
    });
    places
}

fn app_with(lookup: Option<Result<NearbyPlaces, LookupError>>) -> Router {
    let merger = GuidanceMerger::new(
        TriageEngine::default(),
        None,
        Arc::new(MemoryEmergencyLog::new()),
    );
    let lookup = lookup.map(|r| Arc::new(FakeLookup(r)) as Arc<dyn FacilityLookup>);
    let registry = SessionRegistry::new(Arc::new(merger), lookup, 16);
    server::router(Arc::new(AppState::new(registry)))
}

fn app() -> Router {
    app_with(Some(Ok(pharmacy())))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn new_session(app: &Router) -> String {
    let (status, body) = send(app, Method::POST, "/v1/sessions", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["sessions"], 0);
    assert_eq!(body["enhancement"], false);
    assert!(body["version"].as_str().is_some());
}

#[tokio::test]
async fn test_session_assessment_flow() {
    let app = app();
    let id = new_session(&app).await;

    let (status, body) = send(&app, Method::POST, &format!("/v1/sessions/{}/start", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "asking_conscious");
    assert_eq!(body["question"], "conscious");

    for (question, value) in [("conscious", false), ("breathing", false), ("heavy_bleeding", false)] {
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/v1/sessions/{}/answer", id),
            Some(json!({"question": question, "value": value})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, Method::GET, &format!("/v1/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "complete");
    assert_eq!(body["assessment"]["isConscious"], false);
    assert_eq!(body["guidance"]["source"], "local");
    assert_eq!(body["guidance"]["isEnhancing"], false);
    assert_eq!(body["guidance"]["result"]["priority"], "critical");
    assert_eq!(body["guidance"]["result"]["showCPR"], true);

    let (_, body) = send(&app, Method::POST, &format!("/v1/sessions/{}/back", id), None).await;
    assert_eq!(body["step"], "asking_bleeding");
    assert_eq!(body["assessment"]["hasHeavyBleeding"], Value::Null);
    assert_eq!(body["guidance"], Value::Null);

    let (_, body) = send(&app, Method::POST, &format!("/v1/sessions/{}/restart", id), None).await;
    assert_eq!(body["step"], "idle");
    assert_eq!(body["assessment"]["isConscious"], Value::Null);
}

#[tokio::test]
async fn test_session_errors() {
    let app = app();
    let missing = "00000000-0000-4000-8000-000000000000";
    let (status, _) = send(&app, Method::GET, &format!("/v1/sessions/{}", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let id = new_session(&app).await;
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/v1/sessions/{}/answer", id),
        Some(json!({"question": "breathing", "value": true})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, Method::DELETE, &format!("/v1/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, &format!("/v1/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_location_and_share() {
    let app = app();
    let id = new_session(&app).await;

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/v1/sessions/{}/location", id),
        Some(json!({"location": {"latitude": 123.0, "longitude": 0.0}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/v1/sessions/{}/location", id),
        Some(json!({"location": {"latitude": 12.97, "longitude": 77.59, "accuracy": 8.0}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["facilities"]["status"], "searching");

    let (_, body) = send(&app, Method::GET, &format!("/v1/sessions/{}/share", id), None).await;
    assert_eq!(body["callAmbulance"], "tel:108");
    assert_eq!(body["callPolice"], "tel:112");
    assert_eq!(body["maps"], "https://www.google.com/maps?q=12.97,77.59");
}

#[tokio::test]
async fn test_first_aid() {
    let app = app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/first-aid",
        Some(json!({"isConscious": true, "isBreathing": true})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/first-aid",
        Some(json!({"isConscious": true, "isBreathing": true, "hasHeavyBleeding": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["priority"], "urgent");
    assert_eq!(body["showCPR"], false);
    assert_eq!(body["source"], "local");
    assert!(body["instructions"].as_array().unwrap().len() >= 4);

    let (status, body) = send(&app, Method::GET, "/v1/first-aid/offline", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["instructions"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_emergencies() {
    let app = app();

    let (status, record) = send(
        &app,
        Method::POST,
        "/v1/emergencies",
        Some(json!({
            "latitude": 12.97,
            "longitude": 77.59,
            "isConscious": false,
            "isBreathing": true,
            "hasHeavyBleeding": null
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["emergencyType"], "road_accident");
    assert!(record["id"].as_str().is_some());

    let (status, list) = send(&app, Method::GET, "/v1/emergencies?limit=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], record["id"]);

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/emergencies",
        Some(json!({"latitude": 95.0, "longitude": 0.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_nearby_places() {
    let app = app();

    let (status, _) = send(&app, Method::GET, "/v1/nearby-places", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/v1/nearby-places?lat=abc&lng=77.5", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::GET, "/v1/nearby-places?lat=12.97&lng=77.59", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pharmacies"][0]["name"], "Apollo Pharmacy");
    assert_eq!(body["pharmacies"][0]["type"], "pharmacy");
    assert_eq!(body["hospitals"].as_array().unwrap().len(), 0);
    assert_eq!(body["source"], "openstreetmap");
}

#[tokio::test]
async fn test_nearby_places_upstream_failure() {
    let app = app_with(Some(Err(LookupError::Status(504))));
    let (status, body) = send(&app, Method::GET, "/v1/nearby-places?lat=12.97&lng=77.59", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["hospitals"], json!([]));
    assert_eq!(body["pharmacies"], json!([]));
    assert!(body["message"].as_str().unwrap().contains("504"));

    let disabled = app_with(None);
    let (status, _) = send(&disabled, Method::GET, "/v1/nearby-places?lat=12.97&lng=77.59", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
