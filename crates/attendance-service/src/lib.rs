//! Attendance Check-In Service
//!
//! Marks event registrations as attended when a ticket QR code is scanned or
//! a registration id is typed at the door.
//!
//! ## Endpoints
//!
//! - `POST /attendance/{registration_id}` - Check in by id or ticket token
//! - `POST /mark-attendance/{registration_id}` - Same, legacy client route
//! - `POST /api/checkin/scan` - Check in a scanned token
//! - `POST /api/checkin/manual` - Check in a typed id
//! - `POST /api/registrations` - Create a pending registration
//! - `GET /api/registrations/{id}` - Registration snapshot
//! - `GET /api/registrations/{id}/ticket` - Ticket token for QR rendering
//! - `GET /api/events/{event_id}/attendance` - Attendance roll for an event
//! - `GET /health` - Health check

pub mod config;
pub mod handlers;
pub mod memory;
pub mod orchestrator;
pub mod storage;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::{Config, StorageBackend};
pub use handlers::AppState;
pub use memory::MemoryStore;
pub use orchestrator::{CheckInService, CheckInSource};
pub use storage::{RedisStore, RegistrationStore, Transition};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/attendance/{registration_id}",
            post(handlers::check_in_by_path_handler),
        )
        .route(
            "/mark-attendance/{registration_id}",
            post(handlers::check_in_by_path_handler),
        )
        .route("/api/checkin/scan", post(handlers::scan_handler))
        .route("/api/checkin/manual", post(handlers::manual_handler))
        .route(
            "/api/registrations",
            post(handlers::create_registration_handler),
        )
        .route(
            "/api/registrations/{registration_id}",
            get(handlers::get_registration_handler),
        )
        .route(
            "/api/registrations/{registration_id}/ticket",
            get(handlers::get_ticket_handler),
        )
        .route(
            "/api/events/{event_id}/attendance",
            get(handlers::event_attendance_handler),
        )
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
