use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use secure_decision::{
    config::Config,
    create_router, db,
    logic::{DecisionEngine, SyntheticSampler, TrafficClassifier},
    models::DatasetStore,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "secure_decision=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!("Secure Decision Server starting...");
    tracing::info!("Database: {}", config.database_url);

    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Running database migrations...");
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    // Train once; the model is read-only from here on
    tracing::info!(
        "Training classifier on {} synthetic samples ({} trees, depth {})...",
        config.training.samples,
        config.training.forest.n_trees,
        config.training.forest.max_depth
    );
    let classifier = TrafficClassifier::train_synthetic(&config.training)
        .context("Failed to train classifier")?;
    tracing::info!("Classifier trained ({} trees)", classifier.n_trees());

    let engine = DecisionEngine::new(Arc::new(classifier), Arc::new(SyntheticSampler::new()));

    let datasets = DatasetStore::open(
        config.upload_dir(),
        config.dataset_index_path(),
        config.max_upload_bytes(),
    )
    .await
    .context("Failed to prepare dataset storage")?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid HOST/PORT")?;

    let state = AppState::new(pool, config, engine, datasets);
    let app = create_router(state);

    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
