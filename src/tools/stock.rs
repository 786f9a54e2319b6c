//! Stock price lookup (Alpha Vantage GLOBAL_QUOTE)

use crate::error::RouterError;
use crate::models::{ToolInput, ToolOutput};
use crate::telemetry::log_tool_call;
use crate::tools::alpha_vantage::{parse_number, AlphaVantageClient};
use crate::tools::{ensure_object_parameters, string_param, Tool};
use crate::Result;
use serde_json::{json, Value};

pub struct StockPriceTool {
    api: Option<AlphaVantageClient>,
}

impl StockPriceTool {
    pub fn new(api: Option<AlphaVantageClient>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl Tool for StockPriceTool {
    fn name(&self) -> &'static str {
        "stock_price"
    }

    fn description(&self) -> &'static str {
        "Current share price, daily change and volume for a ticker"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let api = self.api.as_ref().ok_or_else(|| {
            RouterError::ToolError("ALPHA_VANTAGE_API_KEY is not configured".to_string())
        })?;

        ensure_object_parameters(input)?;

        let result = async {
            let symbol = api.resolve_symbol(input).await?;
            let body = api
                .query("GLOBAL_QUOTE", &[("symbol", symbol.clone())])
                .await?;
            quote_output(&symbol, string_param(input, "company"), &body)
        }
        .await;

        log_tool_call(self.name(), &input.parameters.to_string(), &result);
        result
    }
}

fn quote_output(symbol: &str, company: Option<&str>, body: &Value) -> Result<ToolOutput> {
    let quote = body
        .get("Global Quote")
        .and_then(Value::as_object)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| RouterError::DataApiError(format!("No quote found for symbol {}", symbol)))?;

    let field = |key: &str| parse_number(quote.get(key));

    let price = field("05. price").ok_or_else(|| {
        RouterError::DataApiError(format!("Quote for {} has no price", symbol))
    })?;
    let change = field("09. change");
    let change_percent = field("10. change percent");
    let previous_close = field("08. previous close");
    let volume = field("06. volume");
    let latest_trading_day = quote
        .get("07. latest trading day")
        .and_then(Value::as_str)
        .map(str::to_string);

    let data = json!({
        "symbol": symbol,
        "company": company,
        "price": price,
        "open": field("02. open"),
        "high": field("03. high"),
        "low": field("04. low"),
        "previous_close": previous_close,
        "change": change,
        "change_percent": change_percent,
        "volume": volume,
        "latest_trading_day": latest_trading_day,
    });

    let mut summary = match company {
        Some(name) => format!("{} ({})\n", name, symbol),
        None => format!("{}\n", symbol),
    };
    summary.push_str(&format!("Current Price: ${:.2}\n", price));
    if let (Some(change), Some(pct)) = (change, change_percent) {
        summary.push_str(&format!("Change: {:+.2} ({:+.2}%)\n", change, pct));
    }
    if let Some(prev) = previous_close {
        summary.push_str(&format!("Previous Close: ${:.2}\n", prev));
    }
    if let Some(volume) = volume {
        summary.push_str(&format!("Volume: {:.0}\n", volume));
    }
    if let Some(day) = &latest_trading_day {
        summary.push_str(&format!("Latest Trading Day: {}\n", day));
    }
    summary.push_str("Source: Alpha Vantage");

    Ok(ToolOutput::ok(data, summary))
}
