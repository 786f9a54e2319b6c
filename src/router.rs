//! Tool router
//!
//! Maps a refined query plus its metadata to exactly one data tool:
//! - Stock price: "what is AAPL trading at?"
//! - Company financials: "Tesla EBITDA margin", "Apple P/E ratio"
//! - Economic indicators: "how is inflation trending?"
//! - News search: "latest news on Nvidia"

use crate::models::{QueryMetadata, ToolInput, ToolRoute};
use crate::tools::fred::{select_indicators, TimePeriod};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

/// NewsAPI rejects `q` longer than this
const MAX_NEWS_QUERY_CHARS: usize = 500;

/// Static keyword lists, matched on word boundaries
const STOCK_KEYWORDS: &[&str] = &[
    "stock", "stocks", "stock price", "share price", "shares", "price", "prices",
    "trading at", "trading", "quote", "ticker", "market cap", "market capitalization",
    "worth", "premarket", "52 week",
];

const FINANCIALS_KEYWORDS: &[&str] = &[
    // Income statement
    "revenue", "revenues", "sales", "earnings", "profit", "profits", "net income",
    "income", "margin", "margins", "ebitda", "eps",
    // Valuation
    "p/e", "pe ratio", "valuation", "dividend", "dividends", "book value", "beta",
    // Statements & health
    "balance sheet", "cash flow", "debt", "fundamentals", "fundamental", "financials",
    "financial statements", "return on equity", "roe", "overview", "profile",
];

const MACRO_KEYWORDS: &[&str] = &[
    "gdp", "inflation", "cpi", "consumer price", "unemployment", "jobless", "payrolls",
    "nonfarm", "labor market", "interest rate", "interest rates", "fed", "federal reserve",
    "fed funds", "federal funds", "treasury", "treasuries", "yield", "yields", "bond",
    "bonds", "mortgage", "mortgage rates", "housing", "housing starts", "home prices",
    "economy", "economic", "macro", "macroeconomic", "recession", "money supply", "m2",
    "consumer sentiment", "retail sales", "exchange rate", "trade balance", "s&p", "s&p 500",
];

const NEWS_KEYWORDS: &[&str] = &[
    "news", "headline", "headlines", "latest", "recent", "recently", "announcement",
    "announced", "announce", "happening", "happened", "update", "updates", "sentiment",
    "rumor", "rumors", "lawsuit", "merger", "acquisition", "today", "this week",
];

/// Uppercase tokens that look like tickers but are not
const TICKER_STOP_WORDS: &[&str] = &[
    "A", "E", "I", "P", "Q", "M", "AI", "AM", "PM", "OK", "IT", "US", "USA", "UK", "EU",
    "USD", "EUR", "INR", "GBP", "JPY", "FX", "GDP", "CPI", "PPI", "PCE", "EPS", "PE", "PEG",
    "ROA", "ROE", "ROI", "ROIC", "FCF", "DCF", "NAV", "AUM", "APR", "APY", "CAGR", "EBIT",
    "ESG", "ATH", "ATL", "YTD", "QTD", "MTD", "YOY", "QOQ", "MOM", "TTM", "FY", "CEO", "CFO",
    "IPO", "ETF", "ETFS", "EV", "EVS", "REIT", "SPAC", "OTC", "NYSE", "SEC", "IRS", "FED",
    "FOMC", "FRED", "VC", "IB",
];

lazy_static! {
    /// Common company names to ticker symbols
    static ref COMPANY_TICKERS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("apple", "AAPL");
        m.insert("microsoft", "MSFT");
        m.insert("google", "GOOGL");
        m.insert("alphabet", "GOOGL");
        m.insert("amazon", "AMZN");
        m.insert("tesla", "TSLA");
        m.insert("meta", "META");
        m.insert("facebook", "META");
        m.insert("netflix", "NFLX");
        m.insert("nvidia", "NVDA");
        m.insert("walmart", "WMT");
        m.insert("jpmorgan", "JPM");
        m.insert("jp morgan", "JPM");
        m.insert("bank of america", "BAC");
        m.insert("disney", "DIS");
        m.insert("coca cola", "KO");
        m.insert("intel", "INTC");
        m.insert("amd", "AMD");
        m.insert("advanced micro devices", "AMD");
        m.insert("ford", "F");
        m.insert("general motors", "GM");
        m.insert("berkshire hathaway", "BRK-B");
        m
    };
}

/// Outcome of routing one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDecision {
    pub route: ToolRoute,
    pub scores: HashMap<ToolRoute, usize>,
    pub tool_input: ToolInput,
    pub rationale: String,
}

/// Keyword router
pub struct ToolRouter;

impl ToolRouter {
    /// Choose a route and build the tool input for it
    pub fn route(query: &str, metadata: &QueryMetadata) -> RouteDecision {
        let normalized = normalize(query);
        let scores = score(&normalized, metadata);

        let best = ToolRoute::ALL
            .iter()
            .copied()
            .map(|route| (route, scores.get(&route).copied().unwrap_or(0)))
            // max_by_key keeps the last maximum, so walk the priority list in reverse
            .rev()
            .max_by_key(|(_, score)| *score);

        let (route, rationale) = match best {
            Some((route, score)) if score > 0 => (
                route,
                format!("{} keyword score {}", route.tool_name(), score),
            ),
            _ if metadata.company_name.is_some() => (
                ToolRoute::CompanyFinancials,
                "no keywords matched; company known, defaulting to company_financials".to_string(),
            ),
            _ => (
                ToolRoute::NewsSearch,
                "no keywords matched; defaulting to news_search".to_string(),
            ),
        };

        let tool_input = build_tool_input(route, query, &normalized, metadata);

        RouteDecision {
            route,
            scores,
            tool_input,
            rationale,
        }
    }
}

/// Lowercase, turn punctuation (except `&` and `/`) into spaces, and pad
/// with spaces so phrases can be matched on word boundaries.
fn normalize(text: &str) -> String {
    let mapped: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '&' || c == '/' {
                c
            } else {
                ' '
            }
        })
        .collect();

    format!(" {} ", mapped.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn count_matches(normalized: &str, keywords: &[&str]) -> usize {
    keywords
        .iter()
        .filter(|kw| normalized.contains(&format!(" {} ", kw)))
        .count()
}

fn score(normalized: &str, metadata: &QueryMetadata) -> HashMap<ToolRoute, usize> {
    let mut scores = HashMap::with_capacity(4);
    scores.insert(ToolRoute::StockPrice, count_matches(normalized, STOCK_KEYWORDS));
    scores.insert(
        ToolRoute::CompanyFinancials,
        count_matches(normalized, FINANCIALS_KEYWORDS),
    );
    scores.insert(
        ToolRoute::EconomicIndicators,
        count_matches(normalized, MACRO_KEYWORDS),
    );
    scores.insert(ToolRoute::NewsSearch, count_matches(normalized, NEWS_KEYWORDS));

    if metadata.financial_metric.is_some() {
        *scores.entry(ToolRoute::CompanyFinancials).or_insert(0) += 1;
    }

    if metadata.company_name.is_some() {
        for route in [ToolRoute::StockPrice, ToolRoute::CompanyFinancials] {
            if let Some(score) = scores.get_mut(&route) {
                if *score > 0 {
                    *score += 1;
                }
            }
        }
    }

    scores
}

fn build_tool_input(
    route: ToolRoute,
    query: &str,
    normalized: &str,
    metadata: &QueryMetadata,
) -> ToolInput {
    let parameters = match route {
        ToolRoute::StockPrice | ToolRoute::CompanyFinancials => json!({
            "symbol": resolve_symbol(query, metadata),
            "company": metadata.company_name,
        }),
        ToolRoute::NewsSearch => {
            let search = metadata
                .company_name
                .clone()
                .unwrap_or_else(|| query.trim().chars().take(MAX_NEWS_QUERY_CHARS).collect());
            json!({ "query": search })
        }
        ToolRoute::EconomicIndicators => {
            let period_source = metadata.time_period.as_deref().unwrap_or(query);
            json!({
                "indicators": select_indicators(normalized),
                "time_period": TimePeriod::from_text(period_source).code(),
            })
        }
    };

    ToolInput {
        tool_name: route.tool_name().to_string(),
        parameters,
    }
}

/// Resolve a ticker from a cashtag, the metadata company name, an uppercase
/// ticker-like word, or a company name found in the query, in that order.
pub fn resolve_symbol(query: &str, metadata: &QueryMetadata) -> Option<String> {
    let words: Vec<&str> = query
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !is_word_char(c)))
        .filter(|w| !w.is_empty())
        .collect();

    let cashtag = words.iter().find_map(|w| {
        let symbol = w.strip_prefix('$')?;
        is_ticker_shape(symbol).then(|| symbol.to_uppercase())
    });
    if cashtag.is_some() {
        return cashtag;
    }

    if let Some(name) = metadata.company_name.as_deref() {
        if let Some(symbol) = lookup_company(&normalize(name)) {
            return Some(symbol.to_string());
        }
    }

    // Whole words only: "P/E" and "S&P" never yield a ticker
    let uppercase = words.iter().map(|w| strip_possessive(*w)).find(|w| {
        is_ticker_shape(w)
            && w.chars().all(|c| c.is_ascii_uppercase())
            && !TICKER_STOP_WORDS.contains(w)
    });
    if let Some(symbol) = uppercase {
        return Some(symbol.to_string());
    }

    lookup_company(&normalize(query)).map(str::to_string)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '$' | '/' | '&' | '-')
}

fn strip_possessive(word: &str) -> &str {
    ["'s", "'S", "\u{2019}s", "\u{2019}S"]
        .iter()
        .find_map(|suffix| word.strip_suffix(suffix))
        .unwrap_or(word)
}

fn is_ticker_shape(token: &str) -> bool {
    (1..=5).contains(&token.len()) && token.chars().all(|c| c.is_ascii_alphabetic())
}

fn lookup_company(normalized: &str) -> Option<&'static str> {
    // Longest name first so "bank of america" beats shorter overlaps
    let mut names: Vec<(&&str, &&str)> = COMPANY_TICKERS.iter().collect();
    names.sort_by_key(|(name, _)| std::cmp::Reverse(name.len()));

    names
        .into_iter()
        .find(|(name, _)| normalized.contains(&format!(" {} ", name)))
        .map(|(_, symbol)| *symbol)
}
