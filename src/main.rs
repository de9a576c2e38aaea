use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cobranca_api::config::Config;
use cobranca_api::db::Database;
use cobranca_api::handlers::{self, AppState};
use cobranca_api::services::AuthService;

/// Main entry point for the application.
///
/// Initializes logging, configuration, the database pool and schema, the
/// per-entity caches, the Prometheus recorder and the HTTP routes with their
/// middleware stack, then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cobranca_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Initialize database connection pool and schema
    let db = Database::new(&config.database_url).await?;
    db.init_schema().await?;
    tracing::info!("Database connection pool established");

    // Seed the operator account used by /auth/token
    AuthService::new(db.pool.clone(), &config)
        .seed_admin()
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    // Customer/debt cache (30 min TTL)
    let cliente_cache = Cache::builder()
        .time_to_live(Duration::from_secs(config.cache_ttl_cliente))
        .max_capacity(50_000)
        .build();
    tracing::info!("Cliente cache initialized ({}s TTL)", config.cache_ttl_cliente);

    // Boleto cache (60 min TTL)
    let boleto_cache = Cache::builder()
        .time_to_live(Duration::from_secs(config.cache_ttl_boleto))
        .max_capacity(50_000)
        .build();
    tracing::info!("Boleto cache initialized ({}s TTL)", config.cache_ttl_boleto);

    // Prometheus recorder backing GET /metrics
    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {}", e))?;

    // Build application state
    let app_state = Arc::new(AppState {
        db: db.pool.clone(),
        config: config.clone(),
        cliente_cache,
        boleto_cache,
        metrics: metrics_handle,
    });

    // Rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // API routes behind the rate limiter and body limit
    let api_routes = Router::new()
        .route("/auth/token", post(handlers::login))
        .route("/auth/login", post(handlers::login_json))
        .route("/api/v1/cliente/:cpf", get(handlers::get_cliente))
        .route("/api/v1/cliente/:cpf/dividas", get(handlers::get_dividas))
        .route("/api/v1/cliente/:cpf/boletos", get(handlers::get_boletos))
        .route("/api/v1/boleto/gerar", post(handlers::gerar_boleto))
        .route(
            "/api/v1/boleto/:boleto_id/cancelar",
            post(handlers::cancelar_boleto),
        )
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health and metrics bypass rate limiting for the monitoring stack
    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .merge(api_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
