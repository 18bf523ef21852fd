//! Anthropic LLM Provider
//!
//! Implementation of `LlmProvider` against the Anthropic Messages API,
//! with native tool use in both the blocking and SSE streaming paths.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use fedterm_agent::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{
        Completion, CompletionStream, GenerationOptions, LlmProvider, StopReason, StreamEvent,
        TokenUsage,
    },
    tool::{ToolCall, ToolSchema},
};
use futures::StreamExt;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic provider configuration
#[derive(Clone, Debug)]
pub struct AnthropicConfig {
    /// API key (`x-api-key` header)
    pub api_key: String,

    /// API origin
    pub base_url: String,

    /// Total request timeout for blocking completions, seconds.
    /// Streaming requests only honor the connect timeout.
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.anthropic.com".into(),
            timeout_secs: 60,
        }
    }
}

impl AnthropicConfig {
    pub fn from_env() -> Self {
        let api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
        let base_url = std::env::var("ANTHROPIC_BASE_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com".into());

        Self {
            api_key,
            base_url,
            ..Default::default()
        }
    }
}

/// Anthropic Messages API provider
pub struct AnthropicProvider {
    client: reqwest::Client,
    config: AnthropicConfig,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: Value,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self { client, config }
    }

    pub fn from_env() -> Self {
        Self::new(AnthropicConfig::from_env())
    }

    /// Split agent messages into the top-level system string and the
    /// alternating message array the API expects. Consecutive tool
    /// results collapse into a single user message of `tool_result`
    /// blocks.
    fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<ApiMessage>) {
        let system = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone());

        let mut api_messages: Vec<ApiMessage> = Vec::new();

        for message in messages.iter().filter(|m| m.role != Role::System) {
            match message.role {
                Role::User => {
                    api_messages.push(ApiMessage {
                        role: "user",
                        content: vec![ContentBlock::Text {
                            text: message.content.clone(),
                        }],
                    });
                }
                Role::Assistant => {
                    let mut content = Vec::new();
                    if !message.content.is_empty() {
                        content.push(ContentBlock::Text {
                            text: message.content.clone(),
                        });
                    }
                    for call in &message.tool_calls {
                        content.push(ContentBlock::ToolUse {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            input: call.arguments.clone(),
                        });
                    }
                    if content.is_empty() {
                        content.push(ContentBlock::Text {
                            text: message.content.clone(),
                        });
                    }
                    api_messages.push(ApiMessage {
                        role: "assistant",
                        content,
                    });
                }
                Role::Tool => {
                    let block = ContentBlock::ToolResult {
                        tool_use_id: message.tool_call_id.clone().unwrap_or_default(),
                        content: message.content.clone(),
                    };
                    match api_messages.last_mut() {
                        Some(last)
                            if last.role == "user"
                                && matches!(
                                    last.content.first(),
                                    Some(ContentBlock::ToolResult { .. })
                                ) =>
                        {
                            last.content.push(block);
                        }
                        _ => api_messages.push(ApiMessage {
                            role: "user",
                            content: vec![block],
                        }),
                    }
                }
                Role::System => unreachable!("filtered above"),
            }
        }

        (system, api_messages)
    }

    /// JSON-schema object for a tool definition
    fn convert_tool(schema: &ToolSchema) -> ApiTool {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for param in &schema.parameters {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.param_type,
                    "description": param.description,
                }),
            );
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }

        ApiTool {
            name: schema.name.clone(),
            description: schema.description.clone(),
            input_schema: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }

    fn build_body(
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
        stream: bool,
    ) -> Value {
        let (system, api_messages) = Self::convert_messages(messages);
        let api_tools: Vec<ApiTool> = tools.iter().map(Self::convert_tool).collect();

        let mut body = json!({
            "model": options.model,
            "max_tokens": options.max_tokens,
            "temperature": options.temperature,
            "messages": api_messages,
            "stream": stream,
        });
        if let Some(system) = system {
            body["system"] = Value::String(system);
        }
        if !api_tools.is_empty() {
            body["tools"] = serde_json::to_value(api_tools).unwrap_or_default();
        }
        if !options.stop_sequences.is_empty() {
            body["stop_sequences"] = json!(options.stop_sequences);
        }
        body
    }

    async fn send(&self, body: &Value, timeout: Option<Duration>) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect();
            return Err(match status.as_u16() {
                401 | 403 => AgentError::Auth(detail),
                429 => AgentError::RateLimited(detail),
                _ => AgentError::Provider(format!("{}: {}", status, detail)),
            });
        }

        Ok(response)
    }
}

/// Extract normalized text and tool calls from response content blocks,
/// skipping block types this client does not consume.
fn parse_content_blocks(blocks: &[Value]) -> (String, Vec<ToolCall>) {
    let mut text = String::new();
    let mut calls = Vec::new();

    for block in blocks {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(t) = block.get("text").and_then(Value::as_str) {
                    text.push_str(t);
                }
            }
            Some("tool_use") => {
                calls.push(ToolCall {
                    id: block
                        .get("id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    name: block
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    arguments: block.get("input").cloned().unwrap_or_else(|| json!({})),
                });
            }
            _ => {}
        }
    }

    (text, calls)
}

fn map_stop_reason(raw: Option<&str>) -> Option<StopReason> {
    match raw {
        Some("end_turn") => Some(StopReason::EndTurn),
        Some("max_tokens") => Some(StopReason::MaxTokens),
        Some("stop_sequence") => Some(StopReason::StopSequence),
        Some("tool_use") => Some(StopReason::ToolUse),
        _ => None,
    }
}

fn parse_usage(value: Option<&Value>) -> Option<TokenUsage> {
    value.map(|u| TokenUsage {
        input_tokens: u
            .get("input_tokens")
            .and_then(Value::as_u64)
            .unwrap_or_default() as u32,
        output_tokens: u
            .get("output_tokens")
            .and_then(Value::as_u64)
            .unwrap_or_default() as u32,
    })
}

/// Content block under assembly during streaming
enum BlockBuilder {
    Text,
    ToolUse {
        id: String,
        name: String,
        input_json: String,
    },
}

/// Incremental assembly state for one streamed message
#[derive(Default)]
struct StreamAssembler {
    model: String,
    text: String,
    blocks: BTreeMap<u64, BlockBuilder>,
    tool_calls: Vec<ToolCall>,
    stop_reason: Option<StopReason>,
    input_tokens: u32,
    output_tokens: u32,
}

impl StreamAssembler {
    fn new() -> Self {
        Self::default()
    }

    /// Process one SSE data payload; returns events to forward.
    fn handle_data(&mut self, data: &str) -> Vec<Result<StreamEvent>> {
        let event: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(_) => return Vec::new(),
        };

        match event.get("type").and_then(Value::as_str) {
            Some("message_start") => {
                if let Some(message) = event.get("message") {
                    if let Some(model) = message.get("model").and_then(Value::as_str) {
                        self.model = model.to_string();
                    }
                    if let Some(usage) = parse_usage(message.get("usage")) {
                        self.input_tokens = usage.input_tokens;
                        self.output_tokens = usage.output_tokens;
                    }
                }
                Vec::new()
            }
            Some("content_block_start") => {
                let index = event.get("index").and_then(Value::as_u64).unwrap_or(0);
                let block = event.get("content_block");
                match block.and_then(|b| b.get("type")).and_then(Value::as_str) {
                    Some("tool_use") => {
                        self.blocks.insert(
                            index,
                            BlockBuilder::ToolUse {
                                id: block
                                    .and_then(|b| b.get("id"))
                                    .and_then(Value::as_str)
                                    .unwrap_or_default()
                                    .to_string(),
                                name: block
                                    .and_then(|b| b.get("name"))
                                    .and_then(Value::as_str)
                                    .unwrap_or_default()
                                    .to_string(),
                                input_json: String::new(),
                            },
                        );
                    }
                    _ => {
                        self.blocks.insert(index, BlockBuilder::Text);
                    }
                }
                Vec::new()
            }
            Some("content_block_delta") => {
                let index = event.get("index").and_then(Value::as_u64).unwrap_or(0);
                let delta = event.get("delta");
                match delta.and_then(|d| d.get("type")).and_then(Value::as_str) {
                    Some("text_delta") => {
                        let token = delta
                            .and_then(|d| d.get("text"))
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        if token.is_empty() {
                            return Vec::new();
                        }
                        self.text.push_str(&token);
                        vec![Ok(StreamEvent::Token(token))]
                    }
                    Some("input_json_delta") => {
                        if let Some(BlockBuilder::ToolUse { input_json, .. }) =
                            self.blocks.get_mut(&index)
                        {
                            input_json.push_str(
                                delta
                                    .and_then(|d| d.get("partial_json"))
                                    .and_then(Value::as_str)
                                    .unwrap_or_default(),
                            );
                        }
                        Vec::new()
                    }
                    _ => Vec::new(),
                }
            }
            Some("content_block_stop") => {
                let index = event.get("index").and_then(Value::as_u64).unwrap_or(0);
                if let Some(BlockBuilder::ToolUse {
                    id,
                    name,
                    input_json,
                }) = self.blocks.remove(&index)
                {
                    let arguments = if input_json.trim().is_empty() {
                        json!({})
                    } else {
                        serde_json::from_str(&input_json).unwrap_or_else(|_| json!({}))
                    };
                    self.tool_calls.push(ToolCall {
                        id,
                        name,
                        arguments,
                    });
                }
                Vec::new()
            }
            Some("message_delta") => {
                self.stop_reason = map_stop_reason(
                    event
                        .get("delta")
                        .and_then(|d| d.get("stop_reason"))
                        .and_then(Value::as_str),
                );
                if let Some(tokens) = event
                    .get("usage")
                    .and_then(|u| u.get("output_tokens"))
                    .and_then(Value::as_u64)
                {
                    self.output_tokens = tokens as u32;
                }
                Vec::new()
            }
            Some("message_stop") => {
                let completion = Completion {
                    text: std::mem::take(&mut self.text),
                    tool_calls: std::mem::take(&mut self.tool_calls),
                    model: self.model.clone(),
                    stop_reason: self.stop_reason.clone(),
                    usage: Some(TokenUsage {
                        input_tokens: self.input_tokens,
                        output_tokens: self.output_tokens,
                    }),
                };
                vec![Ok(StreamEvent::Completed(completion))]
            }
            Some("error") => {
                let message = event
                    .get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or("stream error")
                    .to_string();
                vec![Err(AgentError::Provider(message))]
            }
            _ => Vec::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let body = Self::build_body(messages, tools, options, false);
        let response = self
            .send(&body, Some(Duration::from_secs(self.config.timeout_secs)))
            .await?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        let blocks = payload
            .get("content")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let (text, tool_calls) = parse_content_blocks(&blocks);

        Ok(Completion {
            text,
            tool_calls,
            model: payload
                .get("model")
                .and_then(Value::as_str)
                .unwrap_or(&options.model)
                .to_string(),
            stop_reason: map_stop_reason(
                payload.get("stop_reason").and_then(Value::as_str),
            ),
            usage: parse_usage(payload.get("usage")),
        })
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        let body = Self::build_body(messages, tools, options, true);
        let response = self.send(&body, None).await?;

        let (tx, rx) = mpsc::channel::<Result<StreamEvent>>(64);

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();
            let mut assembler = StreamAssembler::new();

            'pump: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.send(Err(AgentError::Provider(e.to_string()))).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Consume complete lines, keep the partial tail.
                while let Some(pos) = buffer.find('\n') {
                    let line: String = buffer.drain(..=pos).collect();
                    let line = line.trim_end();
                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    for event in assembler.handle_data(data) {
                        let done = matches!(event, Ok(StreamEvent::Completed(_)) | Err(_));
                        if tx.send(event).await.is_err() || done {
                            break 'pump;
                        }
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedterm_agent::tool::ParameterSchema;

    #[test]
    fn test_config_defaults() {
        let config = AnthropicConfig::default();
        assert_eq!(config.base_url, "https://api.anthropic.com");
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_convert_messages_extracts_system() {
        let messages = vec![Message::system("analyst"), Message::user("CPI?")];
        let (system, api) = AnthropicProvider::convert_messages(&messages);
        assert_eq!(system.as_deref(), Some("analyst"));
        assert_eq!(api.len(), 1);
        assert_eq!(api[0].role, "user");
    }

    #[test]
    fn test_consecutive_tool_results_merge() {
        let call_a = ToolCall {
            id: "a".into(),
            name: "get_economic_data".into(),
            arguments: json!({"series_id": "CPIAUCSL"}),
        };
        let call_b = ToolCall {
            id: "b".into(),
            name: "get_economic_data".into(),
            arguments: json!({"series_id": "UNRATE"}),
        };
        let messages = vec![
            Message::system("analyst"),
            Message::user("inflation vs jobs"),
            Message::assistant_with_tools("", vec![call_a, call_b]),
            Message::tool("cpi summary", Some("a".into())),
            Message::tool("unrate summary", Some("b".into())),
        ];

        let (_, api) = AnthropicProvider::convert_messages(&messages);
        // user, assistant, merged tool-result user
        assert_eq!(api.len(), 3);
        assert_eq!(api[2].role, "user");
        assert_eq!(api[2].content.len(), 2);
        assert!(matches!(
            api[2].content[0],
            ContentBlock::ToolResult { ref tool_use_id, .. } if tool_use_id == "a"
        ));
    }

    #[test]
    fn test_tool_schema_conversion() {
        let schema = ToolSchema {
            name: "get_economic_data".into(),
            description: "fetch a series".into(),
            parameters: vec![ParameterSchema {
                name: "series_id".into(),
                param_type: "string".into(),
                description: "FRED series ID".into(),
                required: true,
            }],
        };

        let tool = AnthropicProvider::convert_tool(&schema);
        assert_eq!(tool.input_schema["type"], "object");
        assert_eq!(
            tool.input_schema["properties"]["series_id"]["type"],
            "string"
        );
        assert_eq!(tool.input_schema["required"][0], "series_id");
    }

    #[test]
    fn test_parse_content_blocks_skips_unknown() {
        let blocks = vec![
            json!({"type": "text", "text": "I'll look that up. "}),
            json!({"type": "thinking", "thinking": "..."}),
            json!({"type": "tool_use", "id": "t1", "name": "get_economic_data",
                   "input": {"series_id": "DGS10"}}),
        ];

        let (text, calls) = parse_content_blocks(&blocks);
        assert_eq!(text, "I'll look that up. ");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].arguments["series_id"], "DGS10");
    }

    #[test]
    fn test_stream_assembler_text_only() {
        let mut assembler = StreamAssembler::new();

        assert!(assembler
            .handle_data(r#"{"type":"message_start","message":{"model":"claude-sonnet-4-20250514","usage":{"input_tokens":12,"output_tokens":1}}}"#)
            .is_empty());
        assert!(assembler
            .handle_data(r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#)
            .is_empty());

        let events = assembler
            .handle_data(r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"기준금리는"}}"#);
        assert!(matches!(&events[0], Ok(StreamEvent::Token(t)) if t == "기준금리는"));

        assembler.handle_data(r#"{"type":"content_block_stop","index":0}"#);
        assembler.handle_data(
            r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":9}}"#,
        );

        let events = assembler.handle_data(r#"{"type":"message_stop"}"#);
        let Ok(StreamEvent::Completed(completion)) = &events[0] else {
            panic!("expected completion");
        };
        assert_eq!(completion.text, "기준금리는");
        assert_eq!(completion.stop_reason, Some(StopReason::EndTurn));
        assert_eq!(completion.usage.as_ref().unwrap().output_tokens, 9);
    }

    #[test]
    fn test_stream_assembler_tool_use_accumulates_input() {
        let mut assembler = StreamAssembler::new();

        assembler.handle_data(r#"{"type":"message_start","message":{"model":"m","usage":{"input_tokens":1,"output_tokens":1}}}"#);
        assembler.handle_data(r#"{"type":"content_block_start","index":0,"content_block":{"type":"tool_use","id":"t9","name":"get_economic_data","input":{}}}"#);
        assembler.handle_data(r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\"series"}}"#);
        assembler.handle_data(r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"_id\":\"FEDFUNDS\"}"}}"#);
        assembler.handle_data(r#"{"type":"content_block_stop","index":0}"#);
        assembler.handle_data(r#"{"type":"message_delta","delta":{"stop_reason":"tool_use"},"usage":{"output_tokens":5}}"#);

        let events = assembler.handle_data(r#"{"type":"message_stop"}"#);
        let Ok(StreamEvent::Completed(completion)) = &events[0] else {
            panic!("expected completion");
        };
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].id, "t9");
        assert_eq!(
            completion.tool_calls[0].arguments,
            json!({"series_id": "FEDFUNDS"})
        );
        assert_eq!(completion.stop_reason, Some(StopReason::ToolUse));
    }

    #[test]
    fn test_stream_assembler_error_event() {
        let mut assembler = StreamAssembler::new();
        let events = assembler
            .handle_data(r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#);
        assert!(matches!(&events[0], Err(AgentError::Provider(m)) if m == "Overloaded"));
    }
}
