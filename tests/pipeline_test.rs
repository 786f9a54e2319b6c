use finance_query_router::audit::AuditLog;
use finance_query_router::llm::{Completion, ScriptedModel};
use finance_query_router::models::{QueryRequest, QueryStatus, ToolInput, ToolOutput, ToolRoute};
use finance_query_router::pipeline::{QueryPipeline, REFUSAL_MESSAGE};
use finance_query_router::prompts::{METADATA_PROMPT, SAFETY_PROMPT, SYNTHESIS_PROMPT};
use finance_query_router::tools::{Tool, ToolRegistry};
use finance_query_router::{Result, RouterError};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Records its inputs and returns a canned summary
struct FakeTool {
    name: &'static str,
    summary: &'static str,
    fail: bool,
    inputs: Mutex<Vec<ToolInput>>,
}

impl FakeTool {
    fn ok(name: &'static str, summary: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            summary,
            fail: false,
            inputs: Mutex::new(Vec::new()),
        })
    }

    fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            summary: "",
            fail: true,
            inputs: Mutex::new(Vec::new()),
        })
    }

    fn inputs(&self) -> Vec<ToolInput> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Tool for FakeTool {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "fake"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        self.inputs.lock().unwrap().push(input.clone());
        if self.fail {
            return Err(RouterError::DataApiError("upstream returned 503".into()));
        }
        Ok(ToolOutput::ok(json!({"tool": self.name}), self.summary))
    }
}

fn registry_with(tools: Vec<Arc<FakeTool>>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    registry
}

#[tokio::test]
async fn test_stock_question_end_to_end() {
    let model = Arc::new(ScriptedModel::new([
        "What is Tesla's current stock price?",
        r#"{"company_name": "Tesla", "industry": "Automotive", "financial_metric": null}"#,
        "Tesla (TSLA) is trading at $177.90, up 1.37% on the day.",
        r#"{"tables": [{"title": "TSLA quote", "columns": ["Field", "Value"], "rows": [["Price", 177.9]]}], "graphs": []}"#,
    ]));
    let stock = FakeTool::ok("stock_price", "Tesla (TSLA)\nCurrent Price: $177.90");
    let pipeline = QueryPipeline::new(
        model.clone(),
        registry_with(vec![stock.clone()]),
        AuditLog::new(),
    );

    let response = pipeline
        .run(QueryRequest::new("yo how much is tesla stock rn??").with_user("alice"))
        .await
        .unwrap();

    assert_eq!(response.status, QueryStatus::Answered);
    assert_eq!(response.user_id, "alice");
    assert_eq!(
        response.refined_query.as_deref(),
        Some("What is Tesla's current stock price?")
    );
    assert_eq!(response.metadata.company_name.as_deref(), Some("Tesla"));
    assert_eq!(response.route, Some(ToolRoute::StockPrice));
    assert_eq!(response.tool_name.as_deref(), Some("stock_price"));
    assert!(response.tool_error.is_none());
    assert!(!response.fallback);
    assert_eq!(response.tables.len(), 1);
    assert!(response.answer.starts_with("Tesla (TSLA) is trading at $177.90"));

    // single branch: exactly one tool call, with the resolved ticker
    let inputs = stock.inputs();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].parameters["symbol"], "TSLA");
    assert_eq!(inputs[0].parameters["company"], "Tesla");

    let calls = model.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0].system, SAFETY_PROMPT);
    assert_eq!(calls[1].system, METADATA_PROMPT);
    assert_eq!(calls[2].system, SYNTHESIS_PROMPT);
    assert!(calls[2].prompt.contains("Current Price: $177.90"));

    let stages: Vec<&str> = response
        .reasoning_trace
        .iter()
        .map(|line| line.split(':').next().unwrap_or_default())
        .collect();
    assert_eq!(
        stages,
        vec!["INPUT", "SAFETY", "METADATA", "ROUTE", "TOOL", "SYNTHESIS", "VISUALIZE"]
    );
}

#[tokio::test]
async fn test_rejected_query_stops_after_safety() {
    let model = Arc::new(ScriptedModel::new([""]));
    let news = FakeTool::ok("news_search", "unused");
    let pipeline = QueryPipeline::new(
        model.clone(),
        registry_with(vec![news.clone()]),
        AuditLog::new(),
    );

    let response = pipeline
        .run(QueryRequest::new("How do I pump and dump a penny stock?"))
        .await
        .unwrap();

    assert_eq!(response.status, QueryStatus::Rejected);
    assert_eq!(response.answer, REFUSAL_MESSAGE);
    assert!(response.route.is_none());
    assert!(response.user_id.starts_with("session_"));
    assert_eq!(model.calls().len(), 1);
    assert!(news.inputs().is_empty());

    // rejections are audited too
    let record = pipeline
        .audit_log()
        .get(response.request_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, QueryStatus::Rejected);
}

#[tokio::test]
async fn test_tool_failure_flows_into_synthesis() {
    let model = Arc::new(ScriptedModel::new([
        "How has inflation trended over the last 5 years?",
        r#"{"time_period": "last 5 years"}"#,
        "I couldn't retrieve the CPI series right now.",
    ]));
    let fred = FakeTool::failing("economic_indicators");
    let pipeline = QueryPipeline::new(
        model.clone(),
        registry_with(vec![fred.clone()]),
        AuditLog::new(),
    )
    .without_visuals();

    let response = pipeline
        .run(QueryRequest::new("inflation trend last 5 years"))
        .await
        .unwrap();

    assert_eq!(response.route, Some(ToolRoute::EconomicIndicators));
    assert!(response.tool_output.is_none());
    assert!(response.tool_error.as_deref().unwrap().contains("503"));
    assert_eq!(response.answer, "I couldn't retrieve the CPI series right now.");

    let input = &fred.inputs()[0];
    assert_eq!(input.parameters["time_period"], "5y");
    assert!(input.parameters["indicators"]
        .as_array()
        .unwrap()
        .contains(&json!("CPIAUCSL")));

    assert!(model.calls()[2].prompt.contains("The data lookup failed"));
    assert_eq!(model.remaining(), 0);
}

#[tokio::test]
async fn test_missing_tool_is_reported_not_fatal() {
    let model = Arc::new(ScriptedModel::new([
        "Latest news on Nvidia",
        r#"{"company_name": "Nvidia"}"#,
        "News is unavailable at the moment.",
    ]));
    let pipeline = QueryPipeline::new(model, ToolRegistry::new(), AuditLog::new()).without_visuals();

    let response = pipeline
        .run(QueryRequest::new("latest news on nvidia"))
        .await
        .unwrap();

    assert_eq!(response.route, Some(ToolRoute::NewsSearch));
    assert!(response
        .tool_error
        .as_deref()
        .unwrap()
        .contains("Tool not found"));
}

#[tokio::test]
async fn test_synthesis_failure_falls_back_to_tool_summary() {
    let model = Arc::new(ScriptedModel::from_results([
        Ok(Completion::new("What is Apple's P/E ratio?")),
        Ok(Completion::new(r#"{"company_name": "Apple", "financial_metric": "P/E ratio"}"#)),
        Err(RouterError::LlmError("quota exceeded".into())),
    ]));
    let financials = FakeTool::ok("company_financials", "Apple Inc (AAPL)\nP/E Ratio: 29.5");
    let pipeline = QueryPipeline::new(
        model,
        registry_with(vec![financials]),
        AuditLog::new(),
    )
    .without_visuals();

    let response = pipeline
        .run(QueryRequest::new("apple pe ratio"))
        .await
        .unwrap();

    assert_eq!(response.route, Some(ToolRoute::CompanyFinancials));
    assert!(response.fallback);
    assert_eq!(
        response.answer,
        "Here's what I found:\n\nApple Inc (AAPL)\nP/E Ratio: 29.5"
    );
    assert!(response
        .reasoning_trace
        .iter()
        .any(|line| line.starts_with("SYNTHESIS: model unavailable")));
}

#[tokio::test]
async fn test_empty_query_is_invalid_request() {
    let model = Arc::new(ScriptedModel::new(Vec::<String>::new()));
    let pipeline = QueryPipeline::new(model.clone(), ToolRegistry::new(), AuditLog::new());

    let err = pipeline.run(QueryRequest::new("   ")).await.unwrap_err();

    assert!(matches!(err, RouterError::InvalidRequest(_)));
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn test_audit_trail_per_user() {
    let model = Arc::new(ScriptedModel::new([
        "What is MSFT trading at?",
        "{}",
        "Microsoft trades at $410.",
        "What is AAPL trading at?",
        "{}",
        "Apple trades at $190.",
    ]));
    let stock = FakeTool::ok("stock_price", "quote");
    let pipeline = QueryPipeline::new(model, registry_with(vec![stock.clone()]), AuditLog::new())
        .without_visuals();

    let first = pipeline
        .run(QueryRequest::new("MSFT price").with_user("bob"))
        .await
        .unwrap();
    let second = pipeline
        .run(QueryRequest::new("AAPL price").with_user("bob"))
        .await
        .unwrap();

    let audit = pipeline.audit_log();
    assert_eq!(
        audit.list_for_user("bob").await.unwrap(),
        vec![first.request_id, second.request_id]
    );
    assert!(audit.verify_integrity(first.request_id).await.unwrap());

    let symbols: Vec<String> = stock
        .inputs()
        .iter()
        .map(|input| input.parameters["symbol"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(symbols, vec!["MSFT", "AAPL"]);
}
