//! API routes for lifelined

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use lifeline_shared::{
    Assessment, EmergencyRecord, GuidanceResult, GuidanceSource, LifelineError, Location,
    NearbyPlaces, NewEmergency, Question, VERSION,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::registry::RegistryError;
use crate::server::AppState;
use crate::service::{GuidanceService, SessionSnapshot};
use crate::share::ShareLinks;

type AppStateArc = Arc<AppState>;
type ApiError = (StatusCode, String);

/// Records returned by GET /v1/emergencies when no limit is given
const DEFAULT_EMERGENCY_LIMIT: usize = 50;

fn lifeline_error(e: LifelineError) -> ApiError {
    let status = match e {
        LifelineError::IncompleteAssessment(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LifelineError::InvalidTransition { .. } => StatusCode::CONFLICT,
        LifelineError::InvalidCoordinates(_) | LifelineError::UnknownPriority(_) => {
            StatusCode::BAD_REQUEST
        }
    };
    (status, e.to_string())
}

async fn find_session(state: &AppState, id: Uuid) -> Result<GuidanceService, ApiError> {
    state
        .registry
        .get(&id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Session {} not found", id)))
}

fn validate_location(location: Option<Location>) -> Result<Option<Location>, ApiError> {
    if let Some(loc) = &location {
        loc.validate().map_err(lifeline_error)?;
    }
    Ok(location)
}

// ============================================================================
// Health Routes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub sessions: usize,
    pub online: bool,
    pub enhancement: bool,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    let merger = state.registry.merger();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        sessions: state.registry.len().await,
        online: merger.is_online(),
        enhancement: merger.will_enhance(),
    })
}

// ============================================================================
// Session Routes
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub id: Uuid,
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question: Question,
    pub value: bool,
}

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    #[serde(default)]
    pub location: Option<Location>,
}

pub fn session_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/sessions", post(create_session))
        .route("/v1/sessions/:id", get(get_session).delete(delete_session))
        .route("/v1/sessions/:id/start", post(start_session))
        .route("/v1/sessions/:id/answer", post(answer_question))
        .route("/v1/sessions/:id/back", post(go_back))
        .route("/v1/sessions/:id/restart", post(restart_session))
        .route("/v1/sessions/:id/location", put(set_location))
        .route("/v1/sessions/:id/facilities/refresh", post(refresh_facilities))
        .route("/v1/sessions/:id/share", get(share_links))
}

async fn create_session(
    State(state): State<AppStateArc>,
    req: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let req = req.map(|Json(r)| r).unwrap_or_default();
    let location = validate_location(req.location)?;

    let (id, service) = state.registry.create(location).await.map_err(|e| match e {
        RegistryError::Full(_) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            id,
            snapshot: service.current_state().await,
        }),
    ))
}

async fn get_session(
    State(state): State<AppStateArc>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let service = find_session(&state, id).await?;
    Ok(Json(service.current_state().await))
}

async fn delete_session(State(state): State<AppStateArc>, Path(id): Path<Uuid>) -> StatusCode {
    if state.registry.remove(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn start_session(
    State(state): State<AppStateArc>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let service = find_session(&state, id).await?;
    Ok(Json(service.start_assessment().await))
}

async fn answer_question(
    State(state): State<AppStateArc>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let service = find_session(&state, id).await?;
    let snapshot = service
        .answer(req.question, req.value)
        .await
        .map_err(lifeline_error)?;
    Ok(Json(snapshot))
}

async fn go_back(
    State(state): State<AppStateArc>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let service = find_session(&state, id).await?;
    Ok(Json(service.back().await))
}

async fn restart_session(
    State(state): State<AppStateArc>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let service = find_session(&state, id).await?;
    Ok(Json(service.restart().await))
}

async fn set_location(
    State(state): State<AppStateArc>,
    Path(id): Path<Uuid>,
    Json(req): Json<LocationRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let location = validate_location(req.location)?;
    let service = find_session(&state, id).await?;
    Ok(Json(service.set_location(location).await))
}

async fn refresh_facilities(
    State(state): State<AppStateArc>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let service = find_session(&state, id).await?;
    Ok(Json(service.refresh_facilities().await))
}

async fn share_links(
    State(state): State<AppStateArc>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShareLinks>, ApiError> {
    let service = find_session(&state, id).await?;
    Ok(Json(service.share_links().await))
}

// ============================================================================
// First Aid Routes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct FirstAidResponse {
    #[serde(flatten)]
    pub result: GuidanceResult,
    pub source: GuidanceSource,
}

pub fn first_aid_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/first-aid", post(first_aid))
        .route("/v1/first-aid/offline", get(offline_guide))
}

/// General guide for bystanders who cannot answer the questions
async fn offline_guide(State(state): State<AppStateArc>) -> Json<GuidanceResult> {
    Json(state.registry.merger().engine().offline_guide())
}

/// Guidance for a full assessment without a session
async fn first_aid(
    State(state): State<AppStateArc>,
    Json(assessment): Json<Assessment>,
) -> Result<Json<FirstAidResponse>, ApiError> {
    let complete = assessment.complete().map_err(lifeline_error)?;
    let guidance = state.registry.merger().guidance_once(&complete).await;
    info!(
        "First aid: {} from {:?}",
        guidance.result.priority, guidance.source
    );
    Ok(Json(FirstAidResponse {
        result: guidance.result,
        source: guidance.source,
    }))
}

// ============================================================================
// Emergency Routes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EmergencyListQuery {
    pub limit: Option<usize>,
}

pub fn emergency_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/emergencies", post(create_emergency).get(list_emergencies))
}

async fn create_emergency(
    State(state): State<AppStateArc>,
    Json(req): Json<NewEmergency>,
) -> Result<(StatusCode, Json<EmergencyRecord>), ApiError> {
    if let (Some(lat), Some(lng)) = (req.latitude, req.longitude) {
        Location::new(lat, lng, 0.0).map_err(lifeline_error)?;
    }

    let record = state.registry.merger().logger().log(req).await.map_err(|e| {
        error!("Failed to log emergency ({}): {}", e.code(), e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_emergencies(
    State(state): State<AppStateArc>,
    Query(query): Query<EmergencyListQuery>,
) -> Result<Json<Vec<EmergencyRecord>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_EMERGENCY_LIMIT);
    let records = state
        .registry
        .merger()
        .logger()
        .recent(limit)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(records))
}

// ============================================================================
// Nearby Places Routes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NearbyPlacesResponse {
    #[serde(flatten)]
    pub places: NearbyPlaces,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn places_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/nearby-places", get(nearby_places))
}

fn parse_coordinates(query: &NearbyQuery) -> Result<Location, ApiError> {
    let (Some(lat), Some(lng)) = (&query.lat, &query.lng) else {
        return Err((
            StatusCode::BAD_REQUEST,
            "Location required: provide lat and lng".to_string(),
        ));
    };
    let parse = |v: &str| v.trim().parse::<f64>().ok();
    match (parse(lat.as_str()), parse(lng.as_str())) {
        (Some(lat), Some(lng)) => Location::new(lat, lng, 0.0).map_err(lifeline_error),
        _ => Err((
            StatusCode::BAD_REQUEST,
            "Invalid coordinates: lat and lng must be numbers".to_string(),
        )),
    }
}

async fn nearby_places(
    State(state): State<AppStateArc>,
    Query(query): Query<NearbyQuery>,
) -> Response {
    let location = match parse_coordinates(&query) {
        Ok(loc) => loc,
        Err(e) => return e.into_response(),
    };
    let Some(lookup) = state.registry.facilities() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "Facility lookup is disabled".to_string(),
        )
            .into_response();
    };

    match lookup.find_nearby(&location).await {
        Ok(places) => Json(NearbyPlacesResponse {
            places,
            source: "openstreetmap".to_string(),
            message: None,
        })
        .into_response(),
        Err(e) => {
            warn!("Nearby places failed ({}): {}", e.code(), e);
            (
                StatusCode::BAD_GATEWAY,
                Json(NearbyPlacesResponse {
                    places: NearbyPlaces::default(),
                    source: "openstreetmap".to_string(),
                    message: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}
