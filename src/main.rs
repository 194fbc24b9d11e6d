use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod chains;
mod config;
mod constants;
mod error;
mod models;
mod services;

use config::Config;
use constants::API_VERSION;
use services::{
    chain_data::RpcProviderFetcher, chat_service::ChatService, llm_client::OpenAiCompatClient,
    supervisor::AiSupervisor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chainchat_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting ChainChat Backend Server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);

    let client = Arc::new(OpenAiCompatClient::from_config(&config)?);
    let supervisor = AiSupervisor::new(
        client,
        Duration::from_secs(config.health_check_interval_secs),
    );
    let fetcher = Arc::new(RpcProviderFetcher::new(config.clone())?);
    let chat = Arc::new(ChatService::new(supervisor.clone(), fetcher.clone()));

    let app_state = api::AppState {
        supervisor: supervisor.clone(),
        fetcher,
        chat,
        config: config.clone(),
    };

    // Build router
    let app = build_router(app_state);

    // Connect to the language model in the background; the server comes up
    // either way and serves canned responses until the model is reachable.
    tokio::spawn(async move {
        supervisor.start().await;
    });

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid address");

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Chat
        .route("/api/v1/chat", post(api::chat::chat))
        // AI supervisor
        .route("/api/v1/ai/status", get(api::ai::get_status))
        .route("/api/v1/ai/restart", post(api::ai::restart))
        .route("/api/v1/ai/force-fallback", post(api::ai::force_fallback))
        // Chain data
        .route("/api/v1/chains", get(api::wallet::list_chains))
        .route("/api/v1/gas/{chain}", get(api::wallet::get_gas))
        .route("/api/v1/wallet/context", post(api::wallet::wallet_context))
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
