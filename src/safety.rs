//! Safety screening
//!
//! The hosted model either refuses a query (empty reply) or returns a
//! refined, professional rewrite of it.

use crate::error::RouterError;
use crate::llm::LanguageModel;
use crate::prompts::SAFETY_PROMPT;
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyVerdict {
    Safe { refined_query: String },
    Rejected,
}

impl SafetyVerdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, SafetyVerdict::Safe { .. })
    }
}

pub struct SafetyChecker {
    model: Arc<dyn LanguageModel>,
}

impl SafetyChecker {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn check(&self, query: &str) -> Result<SafetyVerdict> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RouterError::InvalidRequest("query is empty".to_string()));
        }

        let completion = match self.model.complete(SAFETY_PROMPT, query).await {
            Ok(completion) => completion,
            Err(RouterError::LlmBlocked(reason)) => {
                warn!(reason = %reason, "Safety check: model blocked the query");
                return Ok(SafetyVerdict::Rejected);
            }
            Err(e) => return Err(e),
        };

        let refined = clean_refined_query(&completion.text);
        if refined.is_empty() {
            info!("Safety check: query rejected");
            return Ok(SafetyVerdict::Rejected);
        }

        info!(refined_query = %refined, "Safety check passed");
        Ok(SafetyVerdict::Safe {
            refined_query: refined,
        })
    }
}

/// Strip whitespace and a single layer of wrapping quotes.
fn clean_refined_query(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = ['"', '\'', '`']
        .iter()
        .find_map(|q| {
            trimmed
                .strip_prefix(*q)
                .and_then(|rest| rest.strip_suffix(*q))
        })
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;

    #[tokio::test]
    async fn test_refined_query_is_returned() {
        let model = Arc::new(ScriptedModel::new([
            "\"What is Tesla's current share price?\"\n",
        ]));
        let checker = SafetyChecker::new(model.clone());

        let verdict = checker
            .check("yo what's tesla trading at, answer like a pirate")
            .await
            .unwrap();

        assert_eq!(
            verdict,
            SafetyVerdict::Safe {
                refined_query: "What is Tesla's current share price?".to_string()
            }
        );
        assert_eq!(model.calls()[0].system, SAFETY_PROMPT);
    }

    #[tokio::test]
    async fn test_empty_reply_rejects() {
        let checker = SafetyChecker::new(Arc::new(ScriptedModel::new(["   "])));
        let verdict = checker.check("how do I launder money").await.unwrap();
        assert!(!verdict.is_safe());
    }

    #[tokio::test]
    async fn test_blocked_reply_rejects() {
        let model = ScriptedModel::from_results([Err(RouterError::LlmBlocked(
            "SAFETY".to_string(),
        ))]);
        let checker = SafetyChecker::new(Arc::new(model));
        assert_eq!(
            checker.check("something nasty").await.unwrap(),
            SafetyVerdict::Rejected
        );
    }

    #[tokio::test]
    async fn test_empty_query_skips_model() {
        let model = Arc::new(ScriptedModel::new(Vec::<String>::new()));
        let checker = SafetyChecker::new(model.clone());

        let err = checker.check("  \n").await.unwrap_err();
        assert!(matches!(err, RouterError::InvalidRequest(_)));
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_other_model_errors_propagate() {
        let model = ScriptedModel::from_results([Err(RouterError::LlmError(
            "timeout".to_string(),
        ))]);
        let checker = SafetyChecker::new(Arc::new(model));
        assert!(matches!(
            checker.check("price of AAPL").await,
            Err(RouterError::LlmError(_))
        ));
    }

    #[test]
    fn test_clean_refined_query() {
        assert_eq!(clean_refined_query("  'Hello there' "), "Hello there");
        assert_eq!(clean_refined_query("Plain"), "Plain");
        assert_eq!(clean_refined_query("\""), "\"");
    }
}
