use std::sync::Arc;
use tax_advisory_engine::{
    advisor::TaxAdvisor,
    api::start_server,
    config::AppConfig,
    extraction::FactExtractor,
    gemini::GeminiClient,
    retry::ResilientInvoker,
    store::build_store,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    if config.gemini_api_key.is_empty() {
        warn!("GEMINI_API_KEY not set; analysis requests will fail");
    }

    info!("🧠 Tax Advisory Engine - API Server");
    info!("📍 Port: {}", config.port);
    info!("🤖 Model: {}", config.gemini_model);

    // Create components
    let store = build_store(config.database_url.as_deref())?;
    let provider = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        &config.gemini_model,
    )?);
    let extractor = FactExtractor::new(provider, ResilientInvoker::new(config.retry_policy()));

    let advisor = Arc::new(TaxAdvisor::new(store, extractor));

    info!("✅ Advisor initialized");

    start_server(advisor, config.port).await?;

    Ok(())
}
