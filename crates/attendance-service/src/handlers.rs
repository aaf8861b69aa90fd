//! API request handlers for the Attendance Service

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use checkin_common::{ticket, validate_id, CheckInResult, DenialReason, Error, Registration};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::orchestrator::CheckInService;

/// Shared application state
pub struct AppState {
    pub service: CheckInService,
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(registration_id: &str) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message: format!("Registration not found: {}", registration_id),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        error!("Storage failure: {}", err);

        let status = match err {
            Error::Redis(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

/// Scanned ticket submission
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub token: String,
}

/// Typed registration id submission
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualRequest {
    pub registration_id: String,
}

/// Request to create a pending registration
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRegistrationRequest {
    /// Generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub event_id: String,
    pub attendee_name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub event_title: String,
}

/// Registration snapshot response
#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub registration: Registration,
}

/// Ticket token for QR rendering
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub registration_id: String,
    pub token: String,
}

/// Attendance roll for one event
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttendanceResponse {
    pub event_id: String,
    pub total: usize,
    pub attended: usize,
    pub registrations: Vec<Registration>,
}

/// HTTP status for a check-in outcome
pub fn check_in_status(result: &CheckInResult) -> StatusCode {
    match result.reason() {
        None => StatusCode::OK,
        Some(DenialReason::AlreadyAttended) => StatusCode::CONFLICT,
        Some(DenialReason::UnknownRegistration) => StatusCode::NOT_FOUND,
    }
}

fn check_in_response(result: CheckInResult) -> Response {
    (check_in_status(&result), Json(result)).into_response()
}

/// Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.service.store().health_check().await {
        Ok(_) => Json(serde_json::json!({
            "status": "healthy",
            "service": "attendance-service"
        }))
        .into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string()
            })),
        )
            .into_response(),
    }
}

/// Check in by path: POST /attendance/{registration_id}
///
/// The path segment may be a bare id or a full ticket token.
pub async fn check_in_by_path_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    info!("Check-in request for: {}", token);

    let result = state.service.check_in(&token).await?;
    Ok(check_in_response(result))
}

/// Check in a scanned QR token
pub async fn scan_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ScanRequest>,
) -> Result<Response, ApiError> {
    info!("Scan check-in: {}", payload.token);

    let result = state.service.check_in(&payload.token).await?;
    Ok(check_in_response(result))
}

/// Check in a typed registration id
pub async fn manual_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ManualRequest>,
) -> Result<Response, ApiError> {
    info!("Manual check-in: {}", payload.registration_id);

    let result = state.service.check_in_manual(&payload.registration_id).await?;
    Ok(check_in_response(result))
}

/// Get registration by id
pub async fn get_registration_handler(
    State(state): State<Arc<AppState>>,
    Path(registration_id): Path<String>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    match state.service.lookup(&registration_id).await? {
        Some(registration) => Ok(Json(RegistrationResponse { registration })),
        None => Err(ApiError::not_found(&registration_id)),
    }
}

/// Get the ticket token for a registration
pub async fn get_ticket_handler(
    State(state): State<Arc<AppState>>,
    Path(registration_id): Path<String>,
) -> Result<Json<TicketResponse>, ApiError> {
    match state.service.lookup(&registration_id).await? {
        Some(registration) => Ok(Json(TicketResponse {
            token: ticket::encode(&registration.id),
            registration_id: registration.id,
        })),
        None => Err(ApiError::not_found(&registration_id)),
    }
}

/// Create a pending registration
pub async fn create_registration_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRegistrationRequest>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    let event_id = payload.event_id.trim();
    let attendee_name = payload.attendee_name.trim();
    if event_id.is_empty() {
        return Err(ApiError::bad_request("eventId must not be empty"));
    }
    if attendee_name.is_empty() {
        return Err(ApiError::bad_request("attendeeName must not be empty"));
    }

    let id = payload
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    if let Err(e) = validate_id(&id) {
        return Err(ApiError::bad_request(e.to_string()));
    }

    let registration = Registration::new(
        id,
        event_id.to_string(),
        attendee_name.to_string(),
        payload.department,
        payload.year,
        payload.event_title,
    );

    info!(
        "Creating registration {} for event {}",
        registration.id, registration.event_id
    );

    if state.service.store().insert(&registration).await? {
        Ok((StatusCode::CREATED, Json(RegistrationResponse { registration })))
    } else {
        Err(ApiError {
            status: StatusCode::CONFLICT,
            message: format!("Registration already exists: {}", registration.id),
        })
    }
}

/// List registrations and attendance counts for an event
pub async fn event_attendance_handler(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<Json<EventAttendanceResponse>, ApiError> {
    let registrations = state.service.store().list_by_event(&event_id).await?;
    let attended = registrations.iter().filter(|r| r.is_attended()).count();

    Ok(Json(EventAttendanceResponse {
        event_id,
        total: registrations.len(),
        attended,
        registrations,
    }))
}
