//! Hosted language model seam
//!
//! Every classification, extraction and generation step goes through
//! [`LanguageModel`]. `GeminiClient` is the production implementation;
//! [`ScriptedModel`] keeps the pipeline testable without network access.

use crate::error::RouterError;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

pub mod gemini;
pub use gemini::GeminiClient;

/// One model reply
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub confidence: f32,
    pub finish_reason: Option<String>,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: 0.85,
            finish_reason: Some("STOP".to_string()),
        }
    }
}

/// Trait for hosted model calls
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    /// Run one system-prompted completion over a single user turn
    async fn complete(&self, system: &str, prompt: &str) -> Result<Completion>;
}

/// A prompt pair observed by [`ScriptedModel`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub prompt: String,
}

/// Scripted model for development & testing.
/// Replies are handed out in order; running out is an `LlmError`.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<Completion>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(replies.into_iter().map(|r| Ok(Completion::new(r))))
    }

    pub fn from_results<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<Completion>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<Completion> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                system: system.to_string(),
                prompt: prompt.to_string(),
            });
        }

        let next = self
            .replies
            .lock()
            .map_err(|_| RouterError::LlmError("scripted model lock poisoned".to_string()))?
            .pop_front();

        next.unwrap_or_else(|| {
            Err(RouterError::LlmError(
                "scripted model has no replies left".to_string(),
            ))
        })
    }
}

/// Pull a JSON object out of a model reply.
///
/// Accepts a bare object, a ```json fenced block, or the outermost
/// `{ ... }` span of surrounding prose.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
        if parsed.is_object() {
            return Some(parsed);
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            if let Ok(parsed) = serde_json::from_str::<Value>(after[..end].trim()) {
                if parsed.is_object() {
                    return Some(parsed);
                }
            }
        }
    }

    let brace_start = trimmed.find('{')?;
    let brace_end = trimmed.rfind('}')?;
    if brace_end <= brace_start {
        return None;
    }

    serde_json::from_str::<Value>(&trimmed[brace_start..=brace_end])
        .ok()
        .filter(Value::is_object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bare_object() {
        let value = extract_json_object(r#" {"company_name": "Tesla"} "#).unwrap();
        assert_eq!(value["company_name"], "Tesla");
    }

    #[test]
    fn test_extract_fenced_object() {
        let reply = "Here you go:\n```json\n{\"industry\": \"EV\"}\n```\nAnything else?";
        let value = extract_json_object(reply).unwrap();
        assert_eq!(value["industry"], "EV");
    }

    #[test]
    fn test_extract_embedded_object() {
        let reply = "The metadata is {\"country\": \"US\", \"date\": null} as requested.";
        let value = extract_json_object(reply).unwrap();
        assert_eq!(value["country"], "US");
    }

    #[test]
    fn test_extract_rejects_non_objects() {
        assert!(extract_json_object("[1, 2, 3]").is_none());
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("} backwards {").is_none());
    }

    #[tokio::test]
    async fn test_scripted_model_replays_in_order() {
        let model = ScriptedModel::new(["first", "second"]);

        let a = model.complete("sys", "one").await.unwrap();
        let b = model.complete("sys", "two").await.unwrap();
        assert_eq!(a.text, "first");
        assert_eq!(b.text, "second");
        assert!(model.complete("sys", "three").await.is_err());

        let calls = model.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].prompt, "two");
    }
}
