//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for chat-completion backends with native
//! tool calling. The turn loop works exclusively through this interface;
//! swapping the backend never touches agent logic.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::error::Result;
use crate::message::Message;
use crate::tool::{ToolCall, ToolSchema};

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "claude-sonnet-4-20250514")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Stop sequences
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            stop_sequences: Vec::new(),
        }
    }
}

impl GenerationOptions {
    /// Options for a deterministic single-shot helper call (planners,
    /// translators) with a tight output budget.
    pub fn deterministic(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            temperature: 0.0,
            max_tokens,
            stop_sequences: Vec::new(),
        }
    }
}

/// Token usage statistics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Reason the model stopped generating
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
}

/// Response from an LLM completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text, normalized from the response content blocks
    pub text: String,

    /// Tool calls requested by the model (empty for plain answers)
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,

    /// Model that generated this response
    pub model: String,

    /// Why generation stopped
    pub stop_reason: Option<StopReason>,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,
}

/// What an assistant response asks the loop to do next
#[derive(Clone, Debug, PartialEq)]
pub enum AssistantTurn {
    /// Final answer text; the turn is complete
    Text(String),

    /// Tool executions requested before the model can answer
    ToolRequests(Vec<ToolCall>),
}

impl Completion {
    /// Classify this completion. Any requested tool call takes
    /// precedence over accompanying text.
    pub fn turn(&self) -> AssistantTurn {
        if self.tool_calls.is_empty() {
            AssistantTurn::Text(self.text.clone())
        } else {
            AssistantTurn::ToolRequests(self.tool_calls.clone())
        }
    }
}

/// An event from a streaming completion
#[derive(Clone, Debug)]
pub enum StreamEvent {
    /// Incremental text delta
    Token(String),

    /// Terminal event carrying the fully assembled completion
    Completed(Completion),
}

/// Stream type for completion streaming
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// Passing an empty tool slice requests a plain completion.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion from messages
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion>;

    /// Generate a streaming completion
    async fn complete_stream(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<CompletionStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert_eq!(opts.temperature, 0.7);
        assert_eq!(opts.max_tokens, 2048);
    }

    #[test]
    fn test_deterministic_options() {
        let opts = GenerationOptions::deterministic("claude-haiku-4-5-20251001", 300);
        assert_eq!(opts.temperature, 0.0);
        assert_eq!(opts.max_tokens, 300);
    }

    #[test]
    fn test_turn_classification() {
        let mut completion = Completion {
            text: "The CPI rose.".into(),
            tool_calls: Vec::new(),
            model: "test".into(),
            stop_reason: Some(StopReason::EndTurn),
            usage: None,
        };
        assert_eq!(
            completion.turn(),
            AssistantTurn::Text("The CPI rose.".into())
        );

        completion.tool_calls.push(ToolCall {
            id: "c1".into(),
            name: "get_economic_data".into(),
            arguments: json!({"series_id": "CPIAUCSL"}),
        });
        assert!(matches!(completion.turn(), AssistantTurn::ToolRequests(calls) if calls.len() == 1));
    }
}
