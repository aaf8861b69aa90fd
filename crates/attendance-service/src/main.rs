//! Attendance Service
//!
//! REST API for scanning tickets and marking event attendance.

use anyhow::{Context, Result};
use attendance_service::{
    create_router, storage, AppState, CheckInService, Config, MemoryStore, RedisStore,
    RegistrationStore, StorageBackend,
};
use checkin_common::Registration;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,attendance_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Attendance Service");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Configuration loaded");
    info!("  API address: {}", config.api_address());
    info!("  Storage backend: {:?}", config.storage_backend);

    // Initialize storage
    let store: Arc<dyn RegistrationStore> = match config.storage_backend {
        StorageBackend::Redis => {
            info!("  Redis URL: {}", config.redis_url);
            Arc::new(
                RedisStore::new(&config.redis_url)
                    .await
                    .context("Failed to initialize storage")?,
            )
        }
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };

    if let Some(path) = &config.seed_file {
        let registrations = load_seed_file(path)?;
        let created = storage::seed(store.as_ref(), &registrations)
            .await
            .context("Failed to seed registrations")?;
        info!(
            "Seeded {} of {} registrations from {}",
            created,
            registrations.len(),
            path.display()
        );
    }

    // Create application state
    let state = AppState {
        service: CheckInService::new(store),
    };

    // Create router
    let app = create_router(state);

    // Bind and serve
    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Attendance Service running on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn load_seed_file(path: &Path) -> Result<Vec<Registration>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse seed file: {}", path.display()))
}
