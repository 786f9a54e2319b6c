//! Table and chart extraction from a synthesized answer

use crate::llm::{extract_json_object, LanguageModel};
use crate::models::{Graph, Table};
use crate::prompts::VISUALIZATION_PROMPT;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub const MAX_TABLES: usize = 5;
pub const MAX_GRAPHS: usize = 3;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Visualizations {
    pub tables: Vec<Table>,
    pub graphs: Vec<Graph>,
}

impl Visualizations {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.graphs.is_empty()
    }
}

pub struct VisualizationExtractor {
    model: Arc<dyn LanguageModel>,
}

impl VisualizationExtractor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Best-effort; any failure yields empty collections.
    pub async fn extract(&self, query: &str, answer: &str) -> Visualizations {
        let prompt = format!("QUESTION: {}\n\nANSWER:\n{}", query, answer);

        let completion = match self.model.complete(VISUALIZATION_PROMPT, &prompt).await {
            Ok(c) => c,
            Err(e) => {
                warn!("Visualization extraction failed: {}", e);
                return Visualizations::default();
            }
        };

        let visuals = parse_visualizations(&completion.text);
        debug!(
            tables = visuals.tables.len(),
            graphs = visuals.graphs.len(),
            "Visualizations extracted"
        );
        visuals
    }
}

/// Parse `{tables, graphs}`, dropping malformed entries and applying caps.
pub fn parse_visualizations(reply: &str) -> Visualizations {
    let Some(json) = extract_json_object(reply) else {
        return Visualizations::default();
    };

    Visualizations {
        tables: parse_list::<Table>(&json, "tables")
            .into_iter()
            .filter(|t| !t.columns.is_empty() && !t.rows.is_empty())
            .take(MAX_TABLES)
            .collect(),
        graphs: parse_list::<Graph>(&json, "graphs")
            .into_iter()
            .filter(|g| !g.datasets.is_empty())
            .take(MAX_GRAPHS)
            .collect(),
    }
}

fn parse_list<T: serde::de::DeserializeOwned>(json: &Value, key: &str) -> Vec<T> {
    json.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}
