use std::sync::Arc;
use tax_advisory_engine::{
    advisor::TaxAdvisor,
    config::AppConfig,
    extraction::FactExtractor,
    gemini::GeminiClient,
    retry::ResilientInvoker,
    store::build_store,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(user_id) = std::env::args().nth(1) else {
        eprintln!("usage: advisor <user-id>");
        std::process::exit(2);
    };

    let config = AppConfig::from_env()?;

    let store = build_store(config.database_url.as_deref())?;
    let provider = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        &config.gemini_model,
    )?);
    let extractor = FactExtractor::new(provider, ResilientInvoker::new(config.retry_policy()));
    let advisor = TaxAdvisor::new(store, extractor);

    info!(user_id = %user_id, "Running tax analysis");

    match advisor.analyze(&user_id).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("Tax analysis failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
