//! Finance Query Router
//!
//! A financial research assistant that answers one question per request:
//! - Screens the query with a hosted model and rewrites it professionally
//! - Extracts company / metric / period metadata
//! - Routes to exactly one data tool (stock price, company financials,
//!   economic indicators, news)
//! - Synthesizes a cited answer, with optional tables and charts
//! - Keeps a tamper-evident audit trail
//!
//! PIPELINE:
//! INPUT → SAFETY → METADATA → ROUTE → TOOL → SYNTHESIZE → VISUALIZE → AUDIT

pub mod api;
pub mod audit;
pub mod config;
pub mod error;
pub mod llm;
pub mod metadata;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod router;
pub mod safety;
pub mod synthesis;
pub mod telemetry;
pub mod tools;
pub mod visualize;

pub use error::{Result, RouterError};

// Re-export common types
pub use config::RouterConfig;
pub use models::*;
pub use pipeline::QueryPipeline;
pub use router::{RouteDecision, ToolRouter};
