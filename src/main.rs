use chat_relay::api::{build_router, AppState};
use chat_relay::chat::ChatOrchestrator;
use chat_relay::config::RelayConfig;
use chat_relay::upstream::OpenAiClient;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::default().from_env();

    let backend = Arc::new(
        OpenAiClient::new(config.upstream.clone())
            .map_err(|e| anyhow::anyhow!("Failed to create upstream client: {}", e))?,
    );
    let orchestrator = Arc::new(ChatOrchestrator::new(backend, &config));

    let router = build_router(AppState { orchestrator }, config.server.max_body_bytes);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        model = %config.upstream.model,
        history_budget = config.budget.history_budget_tokens,
        "chat relay listening on {}",
        addr
    );

    axum::serve(listener, router).await?;

    Ok(())
}
