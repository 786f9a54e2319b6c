//! Alpha Vantage client shared by the stock price and financials tools

use crate::error::RouterError;
use crate::models::ToolInput;
use crate::tools::http::DataApiClient;
use crate::tools::string_param;
use crate::Result;
use serde_json::Value;
use tracing::info;

#[derive(Clone)]
pub struct AlphaVantageClient {
    http: DataApiClient,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn new(http: DataApiClient, api_key: String) -> Self {
        Self { http, api_key }
    }

    /// Call `/query?function=...` and surface vendor error payloads.
    pub async fn query(&self, function: &str, params: &[(&str, String)]) -> Result<Value> {
        let mut query: Vec<(&str, String)> = Vec::with_capacity(params.len() + 2);
        query.push(("function", function.to_string()));
        query.extend(params.iter().cloned());
        query.push(("apikey", self.api_key.clone()));

        let body = self.http.get_json("/query", &query, None).await?;

        // Alpha Vantage reports errors and throttling with HTTP 200
        for key in ["Error Message", "Information", "Note"] {
            if let Some(message) = body.get(key).and_then(Value::as_str) {
                return Err(RouterError::DataApiError(format!(
                    "Alpha Vantage {}: {}",
                    function, message
                )));
            }
        }

        Ok(body)
    }

    /// Best matching ticker for a company name, if any
    pub async fn search_symbol(&self, keywords: &str) -> Result<Option<String>> {
        let body = self
            .query("SYMBOL_SEARCH", &[("keywords", keywords.to_string())])
            .await?;

        let symbol = body
            .get("bestMatches")
            .and_then(Value::as_array)
            .and_then(|matches| matches.first())
            .and_then(|m| m.get("1. symbol"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(symbol)
    }

    /// Use `symbol` when given, otherwise search by `company`.
    pub async fn resolve_symbol(&self, input: &ToolInput) -> Result<String> {
        if let Some(symbol) = string_param(input, "symbol") {
            return Ok(clean_symbol(symbol));
        }

        let company = string_param(input, "company").ok_or_else(|| {
            RouterError::InvalidToolInput(
                "Expected 'symbol' or 'company' in tool_input".to_string(),
            )
        })?;

        let symbol = self.search_symbol(company).await?.ok_or_else(|| {
            RouterError::DataApiError(format!("No ticker symbol found for '{}'", company))
        })?;

        info!(company, symbol = %symbol, "Resolved company to ticker");
        Ok(symbol)
    }
}

/// Strip stray quotes, whitespace and cashtag markers
pub fn clean_symbol(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '\'' || c == '"' || c == '$')
        .trim()
        .to_uppercase()
}

/// Alpha Vantage encodes numbers as strings, with "None" and "-" for missing.
pub fn parse_number(value: Option<&Value>) -> Option<f64> {
    let raw = value?.as_str()?.trim().trim_end_matches('%');
    if raw.is_empty() || raw == "None" || raw == "-" {
        return None;
    }
    raw.parse::<f64>().ok()
}
