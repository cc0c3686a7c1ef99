//! Gateway entry point: env + logging bootstrap, state construction, serve.

use astra_core::AppConfig;
use astra_gateway::{api, state::AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env first so AppConfig::from_env sees everything. The provider
    // API key stays in the backend only; clients never receive it.
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[astra-gateway] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    if config.llm_api_key.is_none() {
        tracing::warn!(
            "ASTRA_LLM_API_KEY not set; chat and analysis will answer from canned fallbacks only"
        );
    }
    let port = config.port;

    let app_state = match AppState::new(config).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    };

    let app = api::build_router(app_state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", addr, e));
    tracing::info!("astra-gateway listening on {}", addr);

    axum::serve(listener, app).await.expect("server error");
}
