//! Core data models for the query router

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

/// The four external-data branches a query can be dispatched to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToolRoute {
    StockPrice,
    CompanyFinancials,
    EconomicIndicators,
    NewsSearch,
}

impl ToolRoute {
    /// Tie-break order, highest priority first.
    pub const ALL: [ToolRoute; 4] = [
        ToolRoute::StockPrice,
        ToolRoute::CompanyFinancials,
        ToolRoute::EconomicIndicators,
        ToolRoute::NewsSearch,
    ];

    /// Registry name of the tool serving this route
    pub fn tool_name(self) -> &'static str {
        match self {
            ToolRoute::StockPrice => "stock_price",
            ToolRoute::CompanyFinancials => "company_financials",
            ToolRoute::EconomicIndicators => "economic_indicators",
            ToolRoute::NewsSearch => "news_search",
        }
    }
}

impl fmt::Display for ToolRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolRoute::StockPrice => "Stock Price",
            ToolRoute::CompanyFinancials => "Company Financials",
            ToolRoute::EconomicIndicators => "Economic Indicators",
            ToolRoute::NewsSearch => "News Search",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Answered,
    Rejected,
}

//
// ================= Request =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

//
// ================= Metadata =================
//

/// Structured facts pulled out of the question by the hosted model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryMetadata {
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub financial_metric: Option<String>,
    pub type_of_analysis: Option<String>,
    pub time_period: Option<String>,
    pub date: Option<String>,
}

impl QueryMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

//
// ================= Tool I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub tool_name: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub data: serde_json::Value,
    /// Plain-text rendering handed to the synthesis prompt
    pub summary: String,
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn ok(data: serde_json::Value, summary: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            summary: summary.into(),
            error: None,
        }
    }
}

//
// ================= Visualizations =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Table {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Graph {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "xAxis", default)]
    pub x_axis: Option<String>,
    #[serde(rename = "yAxis", default)]
    pub y_axis: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

//
// ================= Final Result =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub request_id: Uuid,
    pub user_id: String,
    pub status: QueryStatus,
    pub original_query: String,
    pub refined_query: Option<String>,
    pub metadata: QueryMetadata,
    pub route: Option<ToolRoute>,
    pub tool_name: Option<String>,
    pub tool_output: Option<serde_json::Value>,
    pub tool_error: Option<String>,
    pub answer: String,
    pub confidence: f32,
    /// True when the answer is the raw tool summary because synthesis failed
    pub fallback: bool,
    pub tables: Vec<Table>,
    pub graphs: Vec<Graph>,
    pub reasoning_trace: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

//
// ================= Audit Record =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    pub request_id: Uuid,
    pub user_id: String,
    pub request_hash: String,
    pub request: QueryRequest,
    pub status: QueryStatus,
    pub route: Option<ToolRoute>,
    pub answer_preview: String,
    pub reasoning_trace: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}
