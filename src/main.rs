// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Aligner-Tracker API Server
//!
//! Times aligner wear sessions and reports daily and weekly progress
//! against each user's wear target.

use aligner_tracker::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryStore, WearStore},
    services::SystemClock,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.store_backend,
        "Starting Aligner-Tracker API"
    );

    let store: Arc<dyn WearStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let state = Arc::new(AppState::new(config.clone(), store, Arc::new(SystemClock)));

    // Background sweep for sessions nobody comes back to stop
    let _sweeper = match config.sweep_interval() {
        Some(period) => {
            tracing::info!(period_secs = period.as_secs(), "Expiry sweeper enabled");
            Some(state.sweeper().spawn(period))
        }
        None => {
            tracing::info!("Expiry sweeper disabled");
            None
        }
    };

    // Build router
    let app = aligner_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aligner_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
