//! Company fundamentals (Alpha Vantage OVERVIEW)

use crate::error::RouterError;
use crate::models::{ToolInput, ToolOutput};
use crate::telemetry::log_tool_call;
use crate::tools::alpha_vantage::{parse_number, AlphaVantageClient};
use crate::tools::{ensure_object_parameters, Tool};
use crate::Result;
use serde_json::{json, Map, Value};

const MAX_DESCRIPTION_CHARS: usize = 600;

#[derive(Debug, Clone, Copy)]
enum Format {
    Money,
    Percent,
    Plain,
}

/// OVERVIEW keys rendered in the summary, in display order
const FIELDS: &[(&str, &str, Format)] = &[
    ("Sector", "Sector", Format::Plain),
    ("Industry", "Industry", Format::Plain),
    ("MarketCapitalization", "Market Cap", Format::Money),
    ("RevenueTTM", "Revenue (TTM)", Format::Money),
    ("GrossProfitTTM", "Gross Profit (TTM)", Format::Money),
    ("EBITDA", "EBITDA", Format::Money),
    ("ProfitMargin", "Profit Margin", Format::Percent),
    ("OperatingMarginTTM", "Operating Margin (TTM)", Format::Percent),
    ("ReturnOnEquityTTM", "Return on Equity (TTM)", Format::Percent),
    ("ReturnOnAssetsTTM", "Return on Assets (TTM)", Format::Percent),
    ("QuarterlyRevenueGrowthYOY", "Quarterly Revenue Growth (YoY)", Format::Percent),
    ("QuarterlyEarningsGrowthYOY", "Quarterly Earnings Growth (YoY)", Format::Percent),
    ("EPS", "EPS", Format::Plain),
    ("PERatio", "P/E Ratio", Format::Plain),
    ("ForwardPE", "Forward P/E", Format::Plain),
    ("PEGRatio", "PEG Ratio", Format::Plain),
    ("PriceToBookRatio", "Price to Book", Format::Plain),
    ("BookValue", "Book Value per Share", Format::Plain),
    ("DividendYield", "Dividend Yield", Format::Percent),
    ("Beta", "Beta", Format::Plain),
    ("52WeekHigh", "52 Week High", Format::Plain),
    ("52WeekLow", "52 Week Low", Format::Plain),
];

pub struct CompanyFinancialsTool {
    api: Option<AlphaVantageClient>,
}

impl CompanyFinancialsTool {
    pub fn new(api: Option<AlphaVantageClient>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl Tool for CompanyFinancialsTool {
    fn name(&self) -> &'static str {
        "company_financials"
    }

    fn description(&self) -> &'static str {
        "Company profile, valuation ratios and profitability metrics"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let api = self.api.as_ref().ok_or_else(|| {
            RouterError::ToolError("ALPHA_VANTAGE_API_KEY is not configured".to_string())
        })?;

        ensure_object_parameters(input)?;

        let result = async {
            let symbol = api.resolve_symbol(input).await?;
            let body = api.query("OVERVIEW", &[("symbol", symbol.clone())]).await?;
            overview_output(&symbol, &body)
        }
        .await;

        log_tool_call(self.name(), &input.parameters.to_string(), &result);
        result
    }
}

fn overview_output(symbol: &str, body: &Value) -> Result<ToolOutput> {
    let overview = body
        .as_object()
        .filter(|o| !o.is_empty())
        .ok_or_else(|| {
            RouterError::DataApiError(format!("No company overview found for {}", symbol))
        })?;

    let name = text_field(overview, "Name").unwrap_or(symbol);

    let mut summary = format!("{} ({})\n", name, symbol);
    let mut metrics = Map::new();

    for (key, label, format) in FIELDS {
        let Some(rendered) = render_field(overview, key, *format) else {
            continue;
        };
        summary.push_str(&format!("{}: {}\n", label, rendered));
        metrics.insert(key.to_string(), Value::String(rendered));
    }

    let description = text_field(overview, "Description").map(truncate_description);
    if let Some(description) = &description {
        summary.push_str(&format!("\nAbout: {}\n", description));
    }
    summary.push_str("Source: Alpha Vantage");

    let data = json!({
        "symbol": symbol,
        "name": name,
        "exchange": text_field(overview, "Exchange"),
        "currency": text_field(overview, "Currency"),
        "description": description,
        "metrics": metrics,
    });

    Ok(ToolOutput::ok(data, summary))
}

fn text_field<'a>(overview: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    overview
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "None" && *s != "-")
}

fn render_field(overview: &Map<String, Value>, key: &str, format: Format) -> Option<String> {
    match format {
        Format::Plain => text_field(overview, key).map(str::to_string),
        Format::Money => parse_number(overview.get(key)).map(format_money),
        Format::Percent => parse_number(overview.get(key)).map(|v| format!("{:.2}%", v * 100.0)),
    }
}

/// $2.87T, $1.23B, $456.70M, $12,345
pub fn format_money(value: f64) -> String {
    let abs = value.abs();
    let sign = if value < 0.0 { "-" } else { "" };
    if abs >= 1e12 {
        format!("{}${:.2}T", sign, abs / 1e12)
    } else if abs >= 1e9 {
        format!("{}${:.2}B", sign, abs / 1e9)
    } else if abs >= 1e6 {
        format!("{}${:.2}M", sign, abs / 1e6)
    } else {
        format!("{}${}", sign, group_thousands(abs.round() as u64))
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn truncate_description(text: &str) -> String {
    if text.chars().count() <= MAX_DESCRIPTION_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_DESCRIPTION_CHARS).collect();
    format!("{}...", cut.trim_end())
}
