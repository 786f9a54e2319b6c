//! Final answer synthesis
//!
//! One model call turns the tool summary into a readable answer. When the
//! model fails but the tool produced data, the raw summary is returned as a
//! fallback answer.

use crate::error::RouterError;
use crate::llm::LanguageModel;
use crate::models::{QueryMetadata, ToolOutput};
use crate::prompts::SYNTHESIS_PROMPT;
use crate::router::RouteDecision;
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Confidence reported for fallback answers
const FALLBACK_CONFIDENCE: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub answer: String,
    pub confidence: f32,
    pub fallback: bool,
}

pub struct Synthesizer {
    model: Arc<dyn LanguageModel>,
}

impl Synthesizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn synthesize(
        &self,
        query: &str,
        metadata: &QueryMetadata,
        decision: &RouteDecision,
        tool_result: &Result<ToolOutput>,
    ) -> Result<Synthesis> {
        let prompt = build_prompt(query, metadata, decision, tool_result)?;

        match self.model.complete(SYNTHESIS_PROMPT, &prompt).await {
            Ok(completion) if !completion.text.trim().is_empty() => {
                info!(chars = completion.text.len(), "Answer synthesized");
                Ok(Synthesis {
                    answer: completion.text.trim().to_string(),
                    confidence: completion.confidence,
                    fallback: false,
                })
            }
            outcome => {
                let reason = match outcome {
                    Err(e) => e.to_string(),
                    Ok(_) => "empty reply".to_string(),
                };

                match tool_result {
                    Ok(output) => {
                        warn!(reason = %reason, "Synthesis failed, falling back to tool summary");
                        Ok(Synthesis {
                            answer: format!("Here's what I found:\n\n{}", output.summary),
                            confidence: FALLBACK_CONFIDENCE,
                            fallback: true,
                        })
                    }
                    Err(_) => Err(RouterError::SynthesisError(reason)),
                }
            }
        }
    }
}

fn build_prompt(
    query: &str,
    metadata: &QueryMetadata,
    decision: &RouteDecision,
    tool_result: &Result<ToolOutput>,
) -> Result<String> {
    let metadata_json = serde_json::to_string_pretty(metadata)?;

    let data_section = match tool_result {
        Ok(output) => format!(
            "DATA SOURCE: {}\nDATA:\n{}",
            decision.route.tool_name(),
            output.summary
        ),
        Err(e) => format!(
            "DATA SOURCE: {}\nThe data lookup failed: {}\n\
             Tell the user which figures could not be retrieved and answer only what you can without them.",
            decision.route.tool_name(),
            e
        ),
    };

    Ok(format!(
        "USER QUERY: {}\n\nQUERY METADATA:\n{}\n\n{}",
        query, metadata_json, data_section
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Completion, ScriptedModel};
    use crate::router::ToolRouter;
    use serde_json::json;

    fn decision() -> RouteDecision {
        ToolRouter::route("What is TSLA trading at?", &QueryMetadata::default())
    }

    fn quote() -> ToolOutput {
        ToolOutput::ok(json!({"price": 177.9}), "TSLA\nCurrent Price: $177.90")
    }

    #[tokio::test]
    async fn test_prompt_carries_tool_summary() {
        let model = Arc::new(ScriptedModel::new(["Tesla trades at $177.90."]));
        let synthesizer = Synthesizer::new(model.clone());

        let synthesis = synthesizer
            .synthesize("What is TSLA trading at?", &QueryMetadata::default(), &decision(), &Ok(quote()))
            .await
            .unwrap();

        assert_eq!(synthesis.answer, "Tesla trades at $177.90.");
        assert!(!synthesis.fallback);

        let calls = model.calls();
        assert_eq!(calls[0].system, SYNTHESIS_PROMPT);
        assert!(calls[0].prompt.contains("DATA SOURCE: stock_price"));
        assert!(calls[0].prompt.contains("Current Price: $177.90"));
    }

    #[tokio::test]
    async fn test_tool_failure_is_described_to_model() {
        let model = Arc::new(ScriptedModel::new(["I could not retrieve the price."]));
        let synthesizer = Synthesizer::new(model.clone());

        let synthesis = synthesizer
            .synthesize(
                "What is TSLA trading at?",
                &QueryMetadata::default(),
                &decision(),
                &Err(RouterError::DataApiError("Alpha Vantage returned 503".into())),
            )
            .await
            .unwrap();

        assert!(!synthesis.fallback);
        let prompt = &model.calls()[0].prompt;
        assert!(prompt.contains("The data lookup failed"));
        assert!(prompt.contains("503"));
    }

    #[tokio::test]
    async fn test_fallback_to_tool_summary() {
        let model = Arc::new(ScriptedModel::from_results([Err(RouterError::LlmError(
            "timeout".into(),
        ))]));
        let synthesizer = Synthesizer::new(model);

        let synthesis = synthesizer
            .synthesize("What is TSLA trading at?", &QueryMetadata::default(), &decision(), &Ok(quote()))
            .await
            .unwrap();

        assert!(synthesis.fallback);
        assert_eq!(
            synthesis.answer,
            "Here's what I found:\n\nTSLA\nCurrent Price: $177.90"
        );
    }

    #[tokio::test]
    async fn test_no_data_and_no_model_is_error() {
        let model = Arc::new(ScriptedModel::from_results([Ok(Completion::new("   "))]));
        let synthesizer = Synthesizer::new(model);

        let result = synthesizer
            .synthesize(
                "What is TSLA trading at?",
                &QueryMetadata::default(),
                &decision(),
                &Err(RouterError::ToolError("ALPHA_VANTAGE_API_KEY is not configured".into())),
            )
            .await;

        assert!(matches!(result, Err(RouterError::SynthesisError(_))));
    }
}
