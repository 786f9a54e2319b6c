//! Metadata extraction
//!
//! Asks the hosted model for a JSON object describing the query. Extraction
//! is best-effort: any failure yields empty metadata and the pipeline goes on.

use crate::llm::{extract_json_object, LanguageModel};
use crate::models::QueryMetadata;
use crate::prompts::METADATA_PROMPT;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct MetadataExtractor {
    model: Arc<dyn LanguageModel>,
}

impl MetadataExtractor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn extract(&self, query: &str) -> QueryMetadata {
        let completion = match self.model.complete(METADATA_PROMPT, query).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!("Metadata extraction failed, continuing without metadata: {}", e);
                return QueryMetadata::default();
            }
        };

        match parse_metadata(&completion.text) {
            Some(metadata) => {
                debug!(?metadata, "Metadata extracted");
                metadata
            }
            None => {
                warn!(
                    raw = %completion.text,
                    "Metadata reply was not a JSON object, continuing without metadata"
                );
                QueryMetadata::default()
            }
        }
    }
}

/// Parse a model reply into metadata. Returns `None` when no JSON object is present.
pub fn parse_metadata(reply: &str) -> Option<QueryMetadata> {
    let json = extract_json_object(reply)?;

    Some(QueryMetadata {
        company_name: field(&json, "company_name"),
        industry: field(&json, "industry"),
        country: field(&json, "country"),
        financial_metric: field(&json, "financial_metric"),
        type_of_analysis: field(&json, "type_of_analysis"),
        time_period: field(&json, "time_period"),
        date: field(&json, "date"),
    })
}

fn field(json: &Value, key: &str) -> Option<String> {
    let text = match json.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };

    let lowered = text.to_lowercase();
    if text.is_empty() || matches!(lowered.as_str(), "null" | "none" | "n/a" | "unknown") {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouterError;
    use crate::llm::ScriptedModel;

    #[test]
    fn test_parse_full_metadata() {
        let reply = r#"```json
        {
            "company_name": "Tesla",
            "industry": "Electric Vehicles",
            "country": "United States",
            "financial_metric": "EBITDA margin",
            "type_of_analysis": "Equity Research",
            "time_period": "2023",
            "date": null
        }
        ```"#;

        let meta = parse_metadata(reply).unwrap();
        assert_eq!(meta.company_name.as_deref(), Some("Tesla"));
        assert_eq!(meta.financial_metric.as_deref(), Some("EBITDA margin"));
        assert_eq!(meta.time_period.as_deref(), Some("2023"));
        assert!(meta.date.is_none());
    }

    #[test]
    fn test_placeholder_strings_become_none() {
        let meta = parse_metadata(
            r#"{"company_name": "null", "industry": "", "country": "N/A", "financial_metric": "Unknown", "time_period": 2024}"#,
        )
        .unwrap();
        assert!(meta.company_name.is_none());
        assert!(meta.industry.is_none());
        assert!(meta.country.is_none());
        assert!(meta.financial_metric.is_none());
        assert_eq!(meta.time_period.as_deref(), Some("2024"));
    }

    #[test]
    fn test_list_values_are_joined() {
        let meta = parse_metadata(r#"{"company_name": ["Tesla", "Ford"]}"#).unwrap();
        assert_eq!(meta.company_name.as_deref(), Some("Tesla, Ford"));
    }

    #[tokio::test]
    async fn test_unparsable_reply_gives_default() {
        let extractor =
            MetadataExtractor::new(Arc::new(ScriptedModel::new(["I cannot help with that."])));
        assert!(extractor.extract("hello").await.is_empty());
    }

    #[tokio::test]
    async fn test_model_failure_gives_default() {
        let model =
            ScriptedModel::from_results([Err(RouterError::LlmError("quota".to_string()))]);
        let extractor = MetadataExtractor::new(Arc::new(model));
        assert!(extractor.extract("GDP trend").await.is_empty());
    }
}
