use game_query_orchestrator::{
    agent::Orchestrator, api::start_server, config::Settings, gemini::GeminiClient,
    tools::RawgClient,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;

    if settings.gemini_api_key.is_empty() {
        warn!("GEMINI_API_KEY not set; queries will fail at the planning step");
    }
    if settings.rawg_api_key.is_empty() {
        warn!("RAWG_API_KEY not set; game lookups will be rejected");
    }

    info!("Game Query Orchestrator - API Server");
    info!(port = settings.port, model = %settings.gemini_model, "Loaded settings");

    let model = Arc::new(GeminiClient::new(
        settings.gemini_api_key.clone(),
        &settings.gemini_model,
    ));
    let data_source = Arc::new(RawgClient::from_settings(&settings)?);

    let orchestrator = Arc::new(Orchestrator::with_model(model, data_source));

    info!("Orchestrator initialized");

    start_server(orchestrator, settings.port).await?;

    Ok(())
}
