//! HTTP server implementation using Axum.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use docqa_core::config::{GatewayConfig, RetrievalConfig};
use docqa_core::traits::AnswerService;
use docqa_knowledge::KnowledgeBase;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for the gateway server. Everything in it is read-only.
#[derive(Clone)]
pub struct AppState {
    pub gateway_config: GatewayConfig,
    pub retrieval: RetrievalConfig,
    /// Loaded index + metadata + embedder.
    pub knowledge: Arc<KnowledgeBase>,
    /// `None` serves retrieval only.
    pub answerer: Option<Arc<dyn AnswerService>>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        gateway_config: GatewayConfig,
        retrieval: RetrievalConfig,
        knowledge: Arc<KnowledgeBase>,
        answerer: Option<Arc<dyn AnswerService>>,
    ) -> Self {
        Self {
            gateway_config,
            retrieval,
            knowledge,
            answerer,
            start_time: std::time::Instant::now(),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    build_router_from_arc(Arc::new(state))
}

pub fn build_router_from_arc(shared: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/",
            get(super::routes::index_page).post(super::routes::index_submit),
        )
        .route("/health", get(super::routes::health_check))
        .route("/api/info", get(super::routes::system_info))
        .route("/api/ask", post(super::routes::api_ask))
        .route("/api/search", post(super::routes::api_search))
        .layer({
            let cors = CorsLayer::new()
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(Any)
                .max_age(std::time::Duration::from_secs(3600));

            // Example: DOCQA_CORS_ORIGINS=https://docs.example.com,https://wiki.example.com
            if let Ok(origins_str) = std::env::var("DOCQA_CORS_ORIGINS") {
                let origins: Vec<_> = origins_str
                    .split(',')
                    .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
                    .collect();
                cors.allow_origin(origins)
            } else {
                cors.allow_origin(Any)
            }
        })
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Start the HTTP server and serve until the process is stopped.
pub async fn start(state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.gateway_config.host, state.gateway_config.port);
    let chunks = state.knowledge.len();
    let answering = state
        .answerer
        .as_ref()
        .map(|a| a.name().to_string())
        .unwrap_or_else(|| "disabled".into());

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 docqa gateway listening on http://{addr} ({chunks} chunks, answers: {answering})");
    axum::serve(listener, app).await?;
    Ok(())
}
