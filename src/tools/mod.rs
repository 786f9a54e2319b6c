//! Tool trait and registry
//!
//! Each tool is a thin wrapper over one third-party data API. Tools are
//! looked up by the name the router assigns to a route.

use crate::config::RouterConfig;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub mod alpha_vantage;
pub mod financials;
pub mod fred;
pub mod http;
pub mod news;
pub mod stock;

pub use alpha_vantage::AlphaVantageClient;
pub use financials::CompanyFinancialsTool;
pub use fred::EconomicIndicatorsTool;
pub use http::DataApiClient;
pub use news::NewsSearchTool;
pub use stock::StockPriceTool;

/// Trait for a single data tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput>;
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with the four HTTP-backed data tools.
///
/// Tools whose API key is missing are still registered; they report a
/// configuration error when invoked.
pub fn create_default_registry(config: &RouterConfig) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    let alpha_vantage = match config.alpha_vantage_api_key.clone() {
        Some(key) => Some(AlphaVantageClient::new(
            DataApiClient::new("Alpha Vantage", &config.alpha_vantage_base_url, config.http_timeout)?,
            key,
        )),
        None => {
            warn!("ALPHA_VANTAGE_API_KEY not set; stock and financials tools are disabled");
            None
        }
    };

    let news_api = match config.news_api_key.clone() {
        Some(key) => Some((
            DataApiClient::new("NewsAPI", &config.news_api_base_url, config.http_timeout)?,
            key,
        )),
        None => {
            warn!("NEWS_API_KEY not set; news tool is disabled");
            None
        }
    };

    let fred = match config.fred_api_key.clone() {
        Some(key) => Some((
            DataApiClient::new("FRED", &config.fred_base_url, config.http_timeout)?,
            key,
        )),
        None => {
            warn!("FRED_API_KEY not set; economic indicators tool is disabled");
            None
        }
    };

    registry.register(Arc::new(StockPriceTool::new(alpha_vantage.clone())));
    registry.register(Arc::new(CompanyFinancialsTool::new(alpha_vantage)));
    registry.register(Arc::new(NewsSearchTool::new(news_api)));
    registry.register(Arc::new(EconomicIndicatorsTool::new(fred)));

    Ok(registry)
}

/// Read an optional non-empty string parameter
pub(crate) fn string_param<'a>(input: &'a ToolInput, key: &str) -> Option<&'a str> {
    input
        .parameters
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub(crate) fn ensure_object_parameters(input: &ToolInput) -> Result<()> {
    if input.parameters.is_object() {
        Ok(())
    } else {
        Err(crate::error::RouterError::InvalidToolInput(
            "tool_input must be a JSON object".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouterError;
    use serde_json::json;

    #[test]
    fn test_default_registry_has_all_routes() {
        let registry = create_default_registry(&RouterConfig::default()).unwrap();
        assert_eq!(
            registry.list(),
            vec![
                "company_financials",
                "economic_indicators",
                "news_search",
                "stock_price"
            ]
        );
    }

    #[tokio::test]
    async fn test_unconfigured_tools_name_the_missing_key() {
        let registry = create_default_registry(&RouterConfig::default()).unwrap();
        let input = ToolInput {
            tool_name: "news_search".to_string(),
            parameters: json!({"query": "Tesla"}),
        };

        let err = registry
            .get("news_search")
            .unwrap()
            .execute(&input)
            .await
            .unwrap_err();

        match err {
            RouterError::ToolError(msg) => assert!(msg.contains("NEWS_API_KEY")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_string_param_and_object_check() {
        let input = ToolInput {
            tool_name: "x".to_string(),
            parameters: json!({"symbol": "  ", "company": " Tesla "}),
        };
        assert_eq!(string_param(&input, "symbol"), None);
        assert_eq!(string_param(&input, "company"), Some("Tesla"));
        assert!(ensure_object_parameters(&input).is_ok());

        let bad = ToolInput {
            tool_name: "x".to_string(),
            parameters: json!("AAPL"),
        };
        assert!(ensure_object_parameters(&bad).is_err());
    }
}
