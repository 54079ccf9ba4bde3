//! # Server Configuration
//!
//! This module contains the server setup and configuration for the
//! DevTrack API.

use std::sync::Arc;

use axum::middleware::Next;
use axum::response::Response;
use axum::{
    Router,
    extract::Request,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::ai::AnthropicGenerator;
use crate::config::AppConfig;
use crate::github::GitHubClient;
use crate::handlers;
use crate::summary::SummaryService;
use crate::sync::SyncService;
use crate::telemetry::{self, TraceContext};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub github_username: String,
    pub sync: Arc<SyncService>,
    pub summaries: Arc<SummaryService>,
}

/// Attach a per-request trace context so error responses carry a
/// correlation ID.
async fn trace_context_middleware(request: Request, next: Next) -> Response {
    let trace_id = format!("req-{}", &Uuid::new_v4().to_string()[..8]);
    telemetry::with_trace_context(TraceContext { trace_id }, next.run(request)).await
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/sync", post(handlers::sync::sync))
        .route("/summary", get(handlers::summary::summary))
        .route("/stats", get(handlers::stats::stats))
        .route("/commits", get(handlers::commits::commits))
        .layer(axum::middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let github_username = config.require_github_username()?.to_string();
    let github_token = config.require_github_token()?.to_string();
    let anthropic_api_key = config.require_anthropic_api_key()?.to_string();

    let github = GitHubClient::new(github_token.clone(), config.github_api_base.clone());
    let generator = AnthropicGenerator::new(
        anthropic_api_key,
        config.anthropic_api_base.clone(),
        config.anthropic_model.clone(),
    );

    let state = AppState {
        db: db.clone(),
        github_username: github_username.clone(),
        sync: Arc::new(SyncService::new(
            db.clone(),
            github,
            github_username,
            &github_token,
        )),
        summaries: Arc::new(SummaryService::new(db, Arc::new(generator))),
    };

    let app = create_app(state);

    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile = %config.profile, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::sync::sync,
        crate::handlers::summary::summary,
        crate::handlers::stats::stats,
        crate::handlers::commits::commits,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::Timeframe,
            crate::error::ApiError,
            crate::handlers::HealthResponse,
            crate::handlers::sync::SyncResponse,
            crate::handlers::summary::SummaryResponse,
            crate::handlers::stats::StatsResponse,
            crate::handlers::commits::CommitInfo,
            crate::handlers::commits::CommitsResponse,
        )
    ),
    info(
        title = "DevTrack API",
        description = "AI-powered GitHub activity analytics and insights",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
