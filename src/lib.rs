//! Secure Decision Server
//!
//! Demonstration intrusion-detection backend: classifies synthetic
//! traffic flows, gates low-confidence threats, and keeps an append-only
//! log of every decision.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   SECURE DECISION SERVER                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────────────────────────────────┐    │
//! │  │  API      │──►│  DecisionEngine                      │    │
//! │  │  (Axum)   │   │  sampler → forest → gate → policy    │    │
//! │  └─────┬─────┘   └──────────────────────────────────────┘    │
//! │        │                                                     │
//! │        ├──────────────► DatasetStore (uploads/, index json)  │
//! │        ▼                                                     │
//! │  ┌─────────────┐                                             │
//! │  │   SQLite    │  reports (append-only)                      │
//! │  └─────────────┘                                             │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod logic;
pub mod models;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::{AppError, AppResult};

use logic::DecisionEngine;
use models::DatasetStore;

/// Multipart framing allowance on top of the file cap
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::SqlitePool,
    pub config: config::Config,
    pub engine: Arc<DecisionEngine>,
    pub datasets: Arc<DatasetStore>,
}

impl AppState {
    pub fn new(
        pool: sqlx::SqlitePool,
        config: config::Config,
        engine: DecisionEngine,
        datasets: DatasetStore,
    ) -> Self {
        Self {
            pool,
            config,
            engine: Arc::new(engine),
            datasets: Arc::new(datasets),
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let upload_limit = state
        .datasets
        .max_bytes()
        .max(state.config.max_upload_bytes())
        .saturating_add(MULTIPART_OVERHEAD);

    let api = Router::new()
        .route("/health", get(handlers::health::check))
        // Live feed (not persisted)
        .route("/traffic", get(handlers::analyze::live_traffic))
        .route(
            "/analyze",
            post(handlers::analyze::analyze).layer(DefaultBodyLimit::max(state.config.max_upload_bytes())),
        )

        // Reports
        .route("/reports", get(handlers::reports::list))
        .route("/reports/export", get(handlers::reports::export))

        // Datasets
        .route(
            "/datasets",
            get(handlers::datasets::list)
                .post(handlers::datasets::upload)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/datasets/:id", get(handlers::datasets::get))
        .route("/datasets/:id/analyze", post(handlers::datasets::analyze));

    Router::new()
        .nest("/api", api)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
