use clap::Parser;
use finance_query_router::{
    audit::AuditLog,
    config::RouterConfig,
    llm::GeminiClient,
    models::{QueryRequest, QueryStatus},
    pipeline::QueryPipeline,
    telemetry::init_tracing,
    tools::create_default_registry,
};
use std::sync::Arc;
use tracing::info;

/// Ask one finance question and print the routed answer
#[derive(Debug, Parser)]
#[command(name = "router", version, about)]
struct Cli {
    /// The question, e.g. "What is Tesla's EBITDA margin?"
    #[arg(required = true)]
    query: Vec<String>,

    /// Attribute the query to this user in the audit trail
    #[arg(long, env = "ROUTER_USER_ID")]
    user: Option<String>,

    /// Print the full response as JSON
    #[arg(long)]
    json: bool,

    /// Skip table and chart extraction
    #[arg(long)]
    no_visuals: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = RouterConfig::from_env()?;
    let _guard = init_tracing(&config)?;

    info!("Finance Query Router starting");

    let model = Arc::new(GeminiClient::from_config(&config)?);
    let registry = create_default_registry(&config)?;
    let mut pipeline = QueryPipeline::new(model, registry, AuditLog::new());
    if cli.no_visuals {
        pipeline = pipeline.without_visuals();
    }

    let mut request = QueryRequest::new(cli.query.join(" "));
    if let Some(user) = cli.user {
        request = request.with_user(user);
    }

    let response = pipeline.run(request).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if response.status == QueryStatus::Rejected {
        println!("{}", response.answer);
        return Ok(());
    }

    println!("\n=== QUERY ===");
    println!("{}", response.refined_query.as_deref().unwrap_or(&response.original_query));

    println!("\n=== METADATA ===");
    println!("{}", serde_json::to_string_pretty(&response.metadata)?);

    println!("\n=== ROUTE ===");
    if let Some(route) = response.route {
        println!("{} ({})", route, route.tool_name());
    }
    if let Some(tool_error) = &response.tool_error {
        println!("⚠️  Tool failed: {}", tool_error);
    }

    println!("\n=== ANSWER ===");
    println!("{}", response.answer);

    if !response.tables.is_empty() || !response.graphs.is_empty() {
        println!(
            "\n({} tables, {} graphs available with --json)",
            response.tables.len(),
            response.graphs.len()
        );
    }

    println!("\n=== REASONING TRACE ===");
    for step in &response.reasoning_trace {
        println!("  - {}", step);
    }

    Ok(())
}
