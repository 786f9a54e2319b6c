//! News search (NewsAPI /v2/everything)

use crate::error::RouterError;
use crate::models::{ToolInput, ToolOutput};
use crate::telemetry::log_tool_call;
use crate::tools::http::DataApiClient;
use crate::tools::{ensure_object_parameters, string_param, Tool};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub title: String,
    pub source: Option<String>,
    pub published_at: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

pub struct NewsSearchTool {
    api: Option<(DataApiClient, String)>,
}

impl NewsSearchTool {
    pub fn new(api: Option<(DataApiClient, String)>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl Tool for NewsSearchTool {
    fn name(&self) -> &'static str {
        "news_search"
    }

    fn description(&self) -> &'static str {
        "Most recent English-language news articles for a topic or company"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let (http, api_key) = self
            .api
            .as_ref()
            .ok_or_else(|| RouterError::ToolError("NEWS_API_KEY is not configured".to_string()))?;

        ensure_object_parameters(input)?;
        let query = string_param(input, "query").ok_or_else(|| {
            RouterError::InvalidToolInput("Expected 'query' in tool_input".to_string())
        })?;

        let params = [
            ("q", query.to_string()),
            ("language", "en".to_string()),
            ("sortBy", "publishedAt".to_string()),
            ("pageSize", PAGE_SIZE.to_string()),
        ];

        let result = async {
            let body = http.get_json("/v2/everything", &params, Some(api_key)).await?;
            news_output(query, &body)
        }
        .await;

        log_tool_call(self.name(), query, &result);
        result
    }
}

fn news_output(query: &str, body: &Value) -> Result<ToolOutput> {
    if body.get("status").and_then(Value::as_str) == Some("error") {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(RouterError::DataApiError(format!("NewsAPI: {}", message)));
    }

    let articles = parse_articles(body);

    let summary = if articles.is_empty() {
        "No articles found.".to_string()
    } else {
        let mut text = format!("Latest news for \"{}\":\n", query);
        for (i, article) in articles.iter().enumerate() {
            text.push_str(&format!("\n{}. {}", i + 1, article.title));
            match (&article.source, &article.published_at) {
                (Some(source), Some(date)) => text.push_str(&format!(" ({}, {})", source, date)),
                (Some(source), None) => text.push_str(&format!(" ({})", source)),
                (None, Some(date)) => text.push_str(&format!(" ({})", date)),
                (None, None) => {}
            }
            if let Some(description) = &article.description {
                text.push_str(&format!("\n   {}", description));
            }
            if let Some(url) = &article.url {
                text.push_str(&format!("\n   {}", url));
            }
        }
        text
    };

    let total = body.get("totalResults").and_then(Value::as_u64).unwrap_or(0);
    let data = json!({
        "query": query,
        "total_results": total,
        "articles": articles,
    });

    Ok(ToolOutput::ok(data, summary))
}

fn parse_articles(body: &Value) -> Vec<Article> {
    let text = |article: &Value, key: &str| -> Option<String> {
        article
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    body.get("articles")
        .and_then(Value::as_array)
        .map(|articles| {
            articles
                .iter()
                .filter_map(|a| {
                    Some(Article {
                        title: text(a, "title")?,
                        source: a.get("source").and_then(|s| text(s, "name")),
                        published_at: text(a, "publishedAt"),
                        description: text(a, "description"),
                        url: text(a, "url"),
                    })
                })
                // NewsAPI masks takedowns as "[Removed]"
                .filter(|a| a.title != "[Removed]")
                .take(PAGE_SIZE)
                .collect()
        })
        .unwrap_or_default()
}
