use std::net::SocketAddr;

use anyhow::Context;
use axum::{Router, middleware, routing::get};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use verbo_api::{ApiConfig, ApiState};
use verbo_db::PgRecordStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment variables
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env()?;

    verbo_api::tracing::init_tracing(&config.env);

    let metrics_handle = verbo_api::metrics::init_metrics()?;
    tracing::info!("Prometheus metrics exporter initialized");

    let pool = verbo_db::create_pool(&config.database_url, config.db_max_connections).await?;
    verbo_db::ensure_db_and_migrate(&config.database_url, &pool).await?;
    let store = PgRecordStore::new(pool);

    let job_handles =
        verbo_api::jobs::start_background_jobs(store.clone(), config.attempt_log_retention_days);
    tracing::info!(
        retention_days = config.attempt_log_retention_days,
        "Background jobs started (attempt log pruning)"
    );

    let state = ApiState::new(store, &config);

    let cors = verbo_api::middleware::cors::create_cors_layer(&config.allowed_origins);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(
            DefaultMakeSpan::new()
                .level(Level::INFO)
                .include_headers(true),
        )
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Metrics endpoint has its own state
    let metrics_app = Router::new()
        .route("/metrics", get(verbo_api::metrics::metrics_handler))
        .with_state(metrics_handle);

    let app = verbo_api::router::router()
        .merge(metrics_app)
        .with_state(state);
    let app = verbo_api::middleware::rate_limit::apply_rate_limit(
        app,
        config.rate_limit_per_second,
        config.rate_limit_burst,
    )?
    .layer(cors)
    .layer(trace_layer)
    .layer(middleware::from_fn(verbo_api::metrics::track_metrics))
    .layer(middleware::from_fn(
        verbo_api::middleware::request_id::request_id_middleware,
    ));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(environment = ?config.env, %addr, "Server listening");

    // Rate limiting keys on the peer address when no proxy headers are present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    for handle in job_handles {
        handle.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
