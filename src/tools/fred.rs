//! Macro indicators from FRED (series + series/observations)

use crate::error::RouterError;
use crate::models::{ToolInput, ToolOutput};
use crate::telemetry::log_tool_call;
use crate::tools::http::DataApiClient;
use crate::tools::{ensure_object_parameters, string_param, Tool};
use crate::Result;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

const MAX_INDICATORS: usize = 8;
const TREND_WINDOW: usize = 5;

/// Used when the query names no specific indicator
pub const HEADLINE_INDICATORS: &[&str] = &["GDPC1", "CPIAUCSL", "UNRATE", "FEDFUNDS", "DGS10", "SP500"];

/// Keyword → FRED series ids, matched on word boundaries
const INDICATOR_KEYWORDS: &[(&str, &[&str])] = &[
    ("gdp", &["GDP", "GDPC1"]),
    ("economic growth", &["GDPC1"]),
    ("inflation", &["CPIAUCSL", "T10YIE"]),
    ("cpi", &["CPIAUCSL"]),
    ("consumer price", &["CPIAUCSL"]),
    ("unemployment", &["UNRATE"]),
    ("jobless", &["UNRATE"]),
    ("labor market", &["UNRATE", "PAYEMS"]),
    ("payrolls", &["PAYEMS"]),
    ("nonfarm", &["PAYEMS"]),
    ("jobs", &["PAYEMS"]),
    ("interest rate", &["FEDFUNDS"]),
    ("interest rates", &["FEDFUNDS"]),
    ("fed", &["FEDFUNDS"]),
    ("federal reserve", &["FEDFUNDS"]),
    ("fed funds", &["FEDFUNDS"]),
    ("treasury", &["DGS10", "DGS2"]),
    ("treasuries", &["DGS10", "DGS2"]),
    ("yield", &["DGS10", "DGS2"]),
    ("yields", &["DGS10", "DGS2"]),
    ("bond", &["DGS10"]),
    ("bonds", &["DGS10"]),
    ("mortgage", &["MORTGAGE30US"]),
    ("mortgages", &["MORTGAGE30US"]),
    ("housing", &["HOUST", "CSUSHPINSA"]),
    ("housing starts", &["HOUST"]),
    ("home prices", &["CSUSHPINSA"]),
    ("house prices", &["CSUSHPINSA"]),
    ("money supply", &["M2SL"]),
    ("m2", &["M2SL"]),
    ("sentiment", &["UMCSENT"]),
    ("consumer confidence", &["UMCSENT"]),
    ("retail sales", &["RSAFS"]),
    ("consumer spending", &["RSAFS"]),
    ("exchange rate", &["DEXUSEU"]),
    ("dollar", &["DEXUSEU"]),
    ("euro", &["DEXUSEU"]),
    ("trade balance", &["BOPGSTB"]),
    ("trade deficit", &["BOPGSTB"]),
    ("s&p", &["SP500"]),
    ("s&p 500", &["SP500"]),
    ("stock market", &["SP500"]),
    ("manufacturing", &["MANEMP"]),
    ("loans", &["TOTLL", "DRALACBN"]),
    ("credit", &["TOTLL", "DRALACBN"]),
    ("delinquency", &["DRALACBN"]),
    ("prime rate", &["MPRIME"]),
];

/// Report sections, in display order
const CATEGORIES: &[(&str, &[&str])] = &[
    ("Macroeconomic Indicators", &["GDP", "GDPC1", "CPIAUCSL", "UNRATE", "PAYEMS", "CIVPART"]),
    ("Interest Rates & Monetary Policy", &["FEDFUNDS", "DGS10", "DGS2", "T10YIE", "M2SL"]),
    ("Housing & Real Estate", &["HOUST", "CSUSHPINSA", "MORTGAGE30US"]),
    ("Banking & Credit", &["TOTLL", "DRALACBN", "MPRIME"]),
    ("International & Trade", &["DEXUSEU", "BOPGSTB"]),
    ("Consumer & Business Sentiment", &["UMCSENT", "MANEMP", "RSAFS"]),
    ("Financial Markets", &["SP500"]),
];

/// Words that turn "10 year" into an instrument name rather than a window
const INSTRUMENT_WORDS: &[&str] = &[
    "treasury", "treasuries", "yield", "yields", "bond", "bonds", "note", "notes",
    "mortgage", "mortgages", "fixed", "breakeven",
];

/// Observation window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimePeriod {
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
}

impl Default for TimePeriod {
    fn default() -> Self {
        TimePeriod::OneYear
    }
}

impl TimePeriod {
    pub fn code(self) -> &'static str {
        match self {
            TimePeriod::OneMonth => "1m",
            TimePeriod::ThreeMonths => "3m",
            TimePeriod::SixMonths => "6m",
            TimePeriod::OneYear => "1y",
            TimePeriod::FiveYears => "5y",
            TimePeriod::TenYears => "10y",
        }
    }

    pub fn days(self) -> i64 {
        match self {
            TimePeriod::OneMonth => 30,
            TimePeriod::ThreeMonths => 90,
            TimePeriod::SixMonths => 180,
            TimePeriod::OneYear => 365,
            TimePeriod::FiveYears => 365 * 5,
            TimePeriod::TenYears => 365 * 10,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "1m" => Some(TimePeriod::OneMonth),
            "3m" => Some(TimePeriod::ThreeMonths),
            "6m" => Some(TimePeriod::SixMonths),
            "1y" => Some(TimePeriod::OneYear),
            "5y" => Some(TimePeriod::FiveYears),
            "10y" => Some(TimePeriod::TenYears),
            _ => None,
        }
    }

    fn from_months(months: u32) -> Self {
        match months {
            0..=1 => TimePeriod::OneMonth,
            2..=3 => TimePeriod::ThreeMonths,
            4..=6 => TimePeriod::SixMonths,
            _ => TimePeriod::OneYear,
        }
    }

    fn from_years(years: u32) -> Self {
        match years {
            0..=1 => TimePeriod::OneYear,
            2..=5 => TimePeriod::FiveYears,
            _ => TimePeriod::TenYears,
        }
    }

    /// Read a window out of free text ("last 6 months", "past decade", "5y").
    /// Falls back to one year.
    pub fn from_text(text: &str) -> Self {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i];

            if let Some(period) = TimePeriod::from_code(token) {
                return period;
            }

            if let (Some(count), Some(unit)) = (parse_count(token), tokens.get(i + 1)) {
                let followed_by_instrument = tokens
                    .get(i + 2)
                    .map_or(false, |next| INSTRUMENT_WORDS.contains(next));

                if is_month_unit(unit) || is_year_unit(unit) {
                    if followed_by_instrument {
                        i += 2;
                        continue;
                    }
                    return if is_month_unit(unit) {
                        TimePeriod::from_months(count)
                    } else {
                        TimePeriod::from_years(count)
                    };
                }
            }

            match token {
                "decade" | "decades" => return TimePeriod::TenYears,
                "quarter" | "quarterly" => return TimePeriod::ThreeMonths,
                "month" => return TimePeriod::OneMonth,
                _ => {}
            }

            i += 1;
        }

        TimePeriod::default()
    }

    /// `[start, end]` ending today
    pub fn window(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        (today - Duration::days(self.days()), today)
    }
}

fn parse_count(token: &str) -> Option<u32> {
    if let Ok(n) = token.parse::<u32>() {
        return Some(n);
    }
    let n = match token {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        _ => return None,
    };
    Some(n)
}

fn is_month_unit(token: &str) -> bool {
    matches!(token, "month" | "months" | "mo" | "mos")
}

fn is_year_unit(token: &str) -> bool {
    matches!(token, "year" | "years" | "yr" | "yrs")
}

/// Pick FRED series for a normalized (lowercase, space-padded) query.
/// Deduplicated, capped, and never empty.
pub fn select_indicators(normalized: &str) -> Vec<String> {
    let padded = format!(" {} ", normalized.trim());
    let mut selected: Vec<String> = Vec::new();

    for (keyword, series) in INDICATOR_KEYWORDS {
        if !padded.contains(&format!(" {} ", keyword)) {
            continue;
        }
        for id in series.iter() {
            if !selected.iter().any(|s| s == id) {
                selected.push(id.to_string());
            }
        }
    }

    if selected.is_empty() {
        return HEADLINE_INDICATORS.iter().map(|s| s.to_string()).collect();
    }

    selected.truncate(MAX_INDICATORS);
    selected
}

/// One usable data point; FRED marks gaps with "."
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SeriesInfo {
    pub title: Option<String>,
    pub units: Option<String>,
    pub frequency: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Trend {
    Upward,
    Downward,
    Sideways,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesSummary {
    pub series_id: String,
    pub title: String,
    pub units: Option<String>,
    pub frequency: Option<String>,
    pub latest_date: String,
    pub latest_value: f64,
    pub absolute_change: Option<f64>,
    pub percent_change: Option<f64>,
    pub trend: Option<Trend>,
    pub commentary: Option<String>,
}

pub fn parse_observations(body: &Value) -> Vec<Observation> {
    let mut observations: Vec<Observation> = body
        .get("observations")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let date = item.get("date")?.as_str()?.to_string();
                    let value = item.get("value")?.as_str()?.trim().parse::<f64>().ok()?;
                    Some(Observation { date, value })
                })
                .collect()
        })
        .unwrap_or_default();

    // newest first; ISO dates sort lexically
    observations.sort_by(|a, b| b.date.cmp(&a.date));
    observations
}

pub fn parse_series_info(body: &Value) -> SeriesInfo {
    let Some(series) = body
        .get("seriess")
        .and_then(Value::as_array)
        .and_then(|s| s.first())
    else {
        return SeriesInfo::default();
    };

    let text = |key: &str| {
        series
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    SeriesInfo {
        title: text("title"),
        units: text("units"),
        frequency: text("frequency"),
    }
}

/// Latest value, change over the window, recent trend and commentary.
/// `observations` must be newest first; `None` when there are none.
pub fn summarize_series(
    series_id: &str,
    info: &SeriesInfo,
    observations: &[Observation],
) -> Option<SeriesSummary> {
    let latest = observations.first()?;
    let oldest = observations.last()?;

    let (absolute_change, percent_change) = if observations.len() > 1 && oldest.value != 0.0 {
        let change = latest.value - oldest.value;
        (Some(change), Some(change / oldest.value * 100.0))
    } else {
        (None, None)
    };

    let trend = (observations.len() >= TREND_WINDOW).then(|| {
        let recent = &observations[..TREND_WINDOW];
        let up = recent.windows(2).filter(|w| w[0].value > w[1].value).count();
        let down = recent.windows(2).filter(|w| w[0].value < w[1].value).count();
        match up.cmp(&down) {
            std::cmp::Ordering::Greater => Trend::Upward,
            std::cmp::Ordering::Less => Trend::Downward,
            std::cmp::Ordering::Equal => Trend::Sideways,
        }
    });

    Some(SeriesSummary {
        series_id: series_id.to_string(),
        title: info.title.clone().unwrap_or_else(|| series_id.to_string()),
        units: info.units.clone(),
        frequency: info.frequency.clone(),
        latest_date: latest.date.clone(),
        latest_value: latest.value,
        absolute_change,
        percent_change,
        trend,
        commentary: commentary(series_id, latest.value, percent_change),
    })
}

fn commentary(series_id: &str, latest: f64, percent_change: Option<f64>) -> Option<String> {
    if series_id == "UNRATE" {
        let text = if latest < 4.0 {
            "Very low unemployment, a tight labor market."
        } else if latest < 5.0 {
            "Unemployment consistent with full employment."
        } else if latest < 6.0 {
            "Unemployment slightly elevated."
        } else {
            "High unemployment, labor market weakness."
        };
        return Some(text.to_string());
    }

    let pct = percent_change?;
    let text = match series_id {
        "GDP" | "GDPC1" => {
            if pct > 2.0 {
                "Strong growth."
            } else if pct > 0.0 {
                "Positive but moderate growth."
            } else {
                "Economic contraction over the period."
            }
        }
        "CPIAUCSL" => {
            if pct > 4.0 {
                "Inflation well above the Fed's 2% target."
            } else if pct > 2.0 {
                "Inflation moderately above the Fed's 2% target."
            } else if pct >= 1.5 {
                "Inflation near the Fed's 2% target."
            } else {
                "Inflation below the Fed's 2% target."
            }
        }
        "FEDFUNDS" | "DGS10" | "DGS2" => {
            if pct > 1.0 {
                "Significant tightening of monetary conditions."
            } else if pct > 0.0 {
                "Modest tightening of monetary conditions."
            } else if pct > -1.0 {
                "Modest easing of monetary conditions."
            } else {
                "Significant easing of monetary conditions."
            }
        }
        "HOUST" | "CSUSHPINSA" => {
            if pct > 5.0 {
                "Strong growth in the housing sector."
            } else if pct > 0.0 {
                "Modest growth in the housing sector."
            } else if pct > -5.0 {
                "Slight contraction in the housing sector."
            } else {
                "Significant housing market weakness."
            }
        }
        "SP500" => {
            if pct > 15.0 {
                "Strong bull market conditions."
            } else if pct > 5.0 {
                "Positive market momentum."
            } else if pct > -5.0 {
                "Sideways market."
            } else {
                "Bear market conditions."
            }
        }
        _ => return Some(format!("Changed by {:.2}% over the period.", pct)),
    };

    Some(text.to_string())
}

fn render_summary(summary: &SeriesSummary, detailed: bool) -> String {
    let mut out = format!("{} ({})\n", summary.title, summary.series_id);
    if detailed {
        if let Some(units) = &summary.units {
            out.push_str(&format!("Units: {}\n", units));
        }
        if let Some(frequency) = &summary.frequency {
            out.push_str(&format!("Frequency: {}\n", frequency));
        }
    }
    out.push_str(&format!(
        "Latest value ({}): {}\n",
        summary.latest_date, summary.latest_value
    ));
    if !detailed {
        return out;
    }
    if let (Some(abs), Some(pct)) = (summary.absolute_change, summary.percent_change) {
        let arrow = if pct > 0.0 { "↑" } else { "↓" };
        out.push_str(&format!(
            "Change: {} {:.2} ({:.2}%)\n",
            arrow,
            abs.abs(),
            pct.abs()
        ));
    }
    if let Some(trend) = summary.trend {
        let label = match trend {
            Trend::Upward => "Upward",
            Trend::Downward => "Downward",
            Trend::Sideways => "Sideways/Neutral",
        };
        out.push_str(&format!("Recent trend: {}\n", label));
    }
    if let Some(commentary) = &summary.commentary {
        out.push_str(&format!("Summary: {}\n", commentary));
    }
    out
}

fn render_one(id: &str, result: &IndicatorResult, detailed: bool) -> String {
    match result {
        Ok(summary) => render_summary(summary, detailed),
        Err(message) => format!("{}: {}\n", id, message),
    }
}

/// Per-indicator fetch result
pub type IndicatorResult = std::result::Result<SeriesSummary, String>;

/// Plain-text report grouped by category; uncategorized ids go last.
pub fn render_report(
    period: TimePeriod,
    start: NaiveDate,
    end: NaiveDate,
    results: &[(String, IndicatorResult)],
) -> String {
    let mut report = format!(
        "Economic indicators ({} window, {} to {})\n",
        period.code(),
        start,
        end
    );

    let mut categorized: Vec<&str> = Vec::new();
    for (category, members) in CATEGORIES {
        let in_category: Vec<&(String, IndicatorResult)> = members
            .iter()
            .filter_map(|m| results.iter().find(|(id, _)| id == m))
            .collect();
        if in_category.is_empty() {
            continue;
        }

        report.push_str(&format!("\n{}\n{}\n", category, "-".repeat(category.len())));
        for (id, result) in in_category {
            report.push_str(&render_one(id, result, true));
            report.push('\n');
            categorized.push(id);
        }
    }

    let remaining: Vec<&(String, IndicatorResult)> = results
        .iter()
        .filter(|(id, _)| !categorized.contains(&id.as_str()))
        .collect();
    if !remaining.is_empty() {
        report.push_str("\nAdditional Indicators\n---------------------\n");
        for (id, result) in remaining {
            report.push_str(&render_one(id, result, false));
            report.push('\n');
        }
    }

    report.push_str("Source: FRED, Federal Reserve Bank of St. Louis");
    report
}

pub struct EconomicIndicatorsTool {
    api: Option<(DataApiClient, String)>,
}

impl EconomicIndicatorsTool {
    pub fn new(api: Option<(DataApiClient, String)>) -> Self {
        Self { api }
    }

    async fn fetch_indicator(
        http: &DataApiClient,
        api_key: &str,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> IndicatorResult {
        let base = [
            ("series_id", series_id.to_string()),
            ("api_key", api_key.to_string()),
            ("file_type", "json".to_string()),
        ];

        let mut params = base.to_vec();
        params.push(("observation_start", start.to_string()));
        params.push(("observation_end", end.to_string()));

        let observations = http
            .get_json("/fred/series/observations", &params, None)
            .await
            .map(|body| parse_observations(&body))
            .map_err(|e| format!("Error retrieving data - {}", e))?;

        if observations.is_empty() {
            return Err("No data available".to_string());
        }

        // metadata is cosmetic; fall back to the bare id
        let info = match http.get_json("/fred/series", &base, None).await {
            Ok(body) => parse_series_info(&body),
            Err(e) => {
                warn!(series_id, error = %e, "FRED series metadata unavailable");
                SeriesInfo::default()
            }
        };

        summarize_series(series_id, &info, &observations).ok_or_else(|| "No data available".to_string())
    }
}

#[async_trait::async_trait]
impl Tool for EconomicIndicatorsTool {
    fn name(&self) -> &'static str {
        "economic_indicators"
    }

    fn description(&self) -> &'static str {
        "US macroeconomic series (GDP, CPI, unemployment, rates, housing) from FRED"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let (http, api_key) = self
            .api
            .as_ref()
            .ok_or_else(|| RouterError::ToolError("FRED_API_KEY is not configured".to_string()))?;

        ensure_object_parameters(input)?;

        let mut indicators: Vec<String> = Vec::new();
        let requested = input.parameters.get("indicators").and_then(Value::as_array);
        for id in requested.into_iter().flatten().filter_map(Value::as_str) {
            let id = id.trim().to_uppercase();
            if !id.is_empty() && !indicators.contains(&id) {
                indicators.push(id);
            }
        }
        if indicators.is_empty() {
            indicators = HEADLINE_INDICATORS.iter().map(|s| s.to_string()).collect();
        }
        indicators.truncate(MAX_INDICATORS);

        let period = string_param(input, "time_period")
            .map(|p| TimePeriod::from_code(p).unwrap_or_else(|| TimePeriod::from_text(p)))
            .unwrap_or_default();
        let (start, end) = period.window(Utc::now().date_naive());

        info!(period = period.code(), indicators = ?indicators, "Fetching FRED indicators");

        let mut results: Vec<(String, IndicatorResult)> = Vec::with_capacity(indicators.len());
        for id in &indicators {
            let result = Self::fetch_indicator(http, api_key, id, start, end).await;
            if let Err(message) = &result {
                warn!(series_id = %id, %message, "FRED indicator failed");
            }
            results.push((id.clone(), result));
        }

        let result = if results.iter().all(|(_, r)| r.is_err()) {
            let reasons: Vec<String> = results
                .iter()
                .filter_map(|(id, r)| r.as_ref().err().map(|e| format!("{}: {}", id, e)))
                .collect();
            Err(RouterError::DataApiError(format!(
                "FRED returned no usable data ({})",
                reasons.join("; ")
            )))
        } else {
            let report = render_report(period, start, end, &results);
            let data = json!({
                "time_period": period.code(),
                "observation_start": start.to_string(),
                "observation_end": end.to_string(),
                "indicators": results
                    .iter()
                    .filter_map(|(_, r)| r.as_ref().ok())
                    .collect::<Vec<_>>(),
                "errors": results
                    .iter()
                    .filter_map(|(id, r)| r.as_ref().err().map(|e| json!({"series_id": id, "error": e})))
                    .collect::<Vec<_>>(),
            });
            Ok(ToolOutput::ok(data, report))
        };

        log_tool_call(self.name(), &input.parameters.to_string(), &result);
        result
    }
}
