use finance_query_router::{
    api::start_server,
    audit::AuditLog,
    config::RouterConfig,
    llm::GeminiClient,
    pipeline::QueryPipeline,
    telemetry::init_tracing,
    tools::create_default_registry,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    let config = RouterConfig::from_env()?;
    let _guard = init_tracing(&config)?;

    info!("🚀 Finance Query Router - API Server");
    info!("📍 Port: {}", config.port);
    info!("🤖 Model: {}", config.gemini_model);

    // Create components
    let model = Arc::new(GeminiClient::from_config(&config)?);
    let registry = create_default_registry(&config)?;
    let audit_log = AuditLog::new();

    let pipeline = Arc::new(QueryPipeline::new(model, registry, audit_log));

    info!("✅ Pipeline initialized");
    info!("📡 Starting API server...");

    start_server(pipeline, config.port).await?;

    Ok(())
}
