//! Tracing setup and log helpers

use crate::config::RouterConfig;
use crate::models::ToolOutput;
use crate::Result;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const PREVIEW_CHARS: usize = 1000;

/// Install the global subscriber: stdout always, plus a daily-rolling
/// `router.log` under `log_dir` when configured. `RUST_LOG` overrides the
/// default `info` filter.
///
/// Keep the returned guard alive for the life of the process or buffered
/// file output is lost.
pub fn init_tracing(config: &RouterConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "router.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    // a subscriber may already be installed (tests, embedding); keep it
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init();

    Ok(guard)
}

/// Char-safe truncation for log lines
pub fn preview(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let head: String = text.chars().take(limit).collect();
    format!("{}... [truncated]", head)
}

/// One log line per tool invocation
pub fn log_tool_call(tool: &str, input: &str, result: &Result<ToolOutput>) {
    match result {
        Ok(output) => info!(
            tool,
            input = %preview(input, PREVIEW_CHARS),
            output = %preview(&output.summary, PREVIEW_CHARS),
            "Tool call succeeded"
        ),
        Err(e) => error!(
            tool,
            input = %preview(input, PREVIEW_CHARS),
            error = %e,
            "Tool call failed"
        ),
    }
}
