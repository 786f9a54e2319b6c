//! Query pipeline - implements the single-pass flow
//!
//! INPUT → SAFETY → METADATA → ROUTE → TOOL → SYNTHESIZE → VISUALIZE → AUDIT

use crate::audit::AuditLog;
use crate::error::RouterError;
use crate::llm::LanguageModel;
use crate::metadata::MetadataExtractor;
use crate::models::{QueryMetadata, QueryRequest, QueryResponse, QueryStatus, ToolOutput};
use crate::router::ToolRouter;
use crate::safety::{SafetyChecker, SafetyVerdict};
use crate::synthesis::Synthesizer;
use crate::tools::ToolRegistry;
use crate::visualize::{VisualizationExtractor, Visualizations};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Answer returned for queries the safety check refuses
pub const REFUSAL_MESSAGE: &str = "I can't help with that request. I can answer questions about \
stock prices, company financials, economic indicators and financial news.";

/// Runs one query through every stage
pub struct QueryPipeline {
    model_name: String,
    safety: SafetyChecker,
    metadata: MetadataExtractor,
    synthesizer: Synthesizer,
    visualizer: Option<VisualizationExtractor>,
    registry: Arc<ToolRegistry>,
    audit_log: AuditLog,
}

impl QueryPipeline {
    pub fn new(model: Arc<dyn LanguageModel>, registry: ToolRegistry, audit_log: AuditLog) -> Self {
        Self {
            model_name: model.name().to_string(),
            safety: SafetyChecker::new(model.clone()),
            metadata: MetadataExtractor::new(model.clone()),
            synthesizer: Synthesizer::new(model.clone()),
            visualizer: Some(VisualizationExtractor::new(model)),
            registry: Arc::new(registry),
            audit_log,
        }
    }

    /// Skip the table/chart extraction call
    pub fn without_visuals(mut self) -> Self {
        self.visualizer = None;
        self
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit_log
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn run(&self, request: QueryRequest) -> Result<QueryResponse> {
        let start_time = Instant::now();
        let request_id = Uuid::new_v4();
        let user_id = resolve_user_id(request.user_id.as_deref());
        let mut reasoning_trace = Vec::new();

        let query = request.query.trim();
        if query.is_empty() {
            return Err(RouterError::InvalidRequest("query is empty".to_string()));
        }

        info!(
            request_id = %request_id,
            user_id = %user_id,
            model = %self.model_name,
            query = %query,
            "Pipeline: query received"
        );
        reasoning_trace.push(format!("INPUT: {} chars from {}", query.chars().count(), user_id));

        // === SAFETY ===
        let refined_query = match self.safety.check(query).await? {
            SafetyVerdict::Safe { refined_query } => refined_query,
            SafetyVerdict::Rejected => {
                reasoning_trace.push("SAFETY: rejected".to_string());
                let response = QueryResponse {
                    request_id,
                    user_id,
                    status: QueryStatus::Rejected,
                    original_query: query.to_string(),
                    refined_query: None,
                    metadata: QueryMetadata::default(),
                    route: None,
                    tool_name: None,
                    tool_output: None,
                    tool_error: None,
                    answer: REFUSAL_MESSAGE.to_string(),
                    confidence: 1.0,
                    fallback: false,
                    tables: Vec::new(),
                    graphs: Vec::new(),
                    reasoning_trace,
                    created_at: Utc::now(),
                    elapsed_ms: start_time.elapsed().as_millis() as u64,
                };
                self.audit_log.record_response(&request, &response).await?;
                warn!(request_id = %request_id, "Pipeline: query rejected by safety check");
                return Ok(response);
            }
        };
        reasoning_trace.push(format!("SAFETY: passed, refined query \"{}\"", refined_query));

        // === METADATA ===
        let metadata = self.metadata.extract(&refined_query).await;
        reasoning_trace.push(format!("METADATA: {}", describe_metadata(&metadata)));

        // === ROUTE ===
        let decision = ToolRouter::route(&refined_query, &metadata);
        let tool_name = decision.route.tool_name();
        reasoning_trace.push(format!("ROUTE: {} ({})", tool_name, decision.rationale));
        debug!(route = %decision.route, scores = ?decision.scores, "Route chosen");

        // === TOOL ===
        let tool_start = Instant::now();
        let tool_result: Result<ToolOutput> = match self.registry.get(tool_name) {
            Some(tool) => tool.execute(&decision.tool_input).await,
            None => Err(RouterError::ToolNotFound(tool_name.to_string())),
        };
        let tool_ms = tool_start.elapsed().as_millis();

        let (tool_output, tool_error) = match &tool_result {
            Ok(output) => {
                reasoning_trace.push(format!("TOOL: {} succeeded in {} ms", tool_name, tool_ms));
                (Some(serde_json::to_value(output)?), None)
            }
            Err(e) => {
                warn!(tool = tool_name, error = %e, "Tool failed, continuing to synthesis");
                reasoning_trace.push(format!("TOOL: {} failed in {} ms: {}", tool_name, tool_ms, e));
                (None, Some(e.to_string()))
            }
        };

        // === SYNTHESIZE ===
        let synthesis = self
            .synthesizer
            .synthesize(&refined_query, &metadata, &decision, &tool_result)
            .await?;
        reasoning_trace.push(if synthesis.fallback {
            "SYNTHESIS: model unavailable, returned tool summary".to_string()
        } else {
            format!("SYNTHESIS: answer generated (confidence {:.2})", synthesis.confidence)
        });

        // === VISUALIZE ===
        let visuals = match &self.visualizer {
            Some(visualizer) => {
                let visuals = visualizer.extract(&refined_query, &synthesis.answer).await;
                reasoning_trace.push(format!(
                    "VISUALIZE: {} tables, {} graphs",
                    visuals.tables.len(),
                    visuals.graphs.len()
                ));
                visuals
            }
            None => Visualizations::default(),
        };

        let response = QueryResponse {
            request_id,
            user_id,
            status: QueryStatus::Answered,
            original_query: query.to_string(),
            refined_query: Some(refined_query),
            metadata,
            route: Some(decision.route),
            tool_name: Some(tool_name.to_string()),
            tool_output,
            tool_error,
            answer: synthesis.answer,
            confidence: synthesis.confidence,
            fallback: synthesis.fallback,
            tables: visuals.tables,
            graphs: visuals.graphs,
            reasoning_trace,
            created_at: Utc::now(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        };

        // === AUDIT ===
        self.audit_log.record_response(&request, &response).await?;

        info!(
            request_id = %request_id,
            route = tool_name,
            fallback = response.fallback,
            elapsed_ms = response.elapsed_ms,
            "Pipeline: query answered"
        );

        Ok(response)
    }
}

/// Caller-supplied id, or `session_<8 hex chars>`
fn resolve_user_id(user_id: Option<&str>) -> String {
    match user_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => format!("session_{}", &Uuid::new_v4().simple().to_string()[..8]),
    }
}

fn describe_metadata(metadata: &QueryMetadata) -> String {
    let fields = [
        ("company", &metadata.company_name),
        ("industry", &metadata.industry),
        ("country", &metadata.country),
        ("metric", &metadata.financial_metric),
        ("analysis", &metadata.type_of_analysis),
        ("period", &metadata.time_period),
        ("date", &metadata.date),
    ];

    let present: Vec<String> = fields
        .iter()
        .filter_map(|(label, value)| value.as_ref().map(|v| format!("{}={}", label, v)))
        .collect();

    if present.is_empty() {
        "none extracted".to_string()
    } else {
        present.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_user_id() {
        assert_eq!(resolve_user_id(Some(" alice ")), "alice");

        let generated = resolve_user_id(None);
        assert!(generated.starts_with("session_"));
        assert_eq!(generated.len(), "session_".len() + 8);
        assert!(generated["session_".len()..].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(resolve_user_id(Some("  ")).starts_with("session_"));
    }

    #[test]
    fn test_describe_metadata() {
        assert_eq!(describe_metadata(&QueryMetadata::default()), "none extracted");

        let metadata = QueryMetadata {
            company_name: Some("Tesla".into()),
            financial_metric: Some("EBITDA".into()),
            ..QueryMetadata::default()
        };
        assert_eq!(describe_metadata(&metadata), "company=Tesla, metric=EBITDA");
    }
}
