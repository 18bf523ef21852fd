//! Turn Loop
//!
//! Drives one user turn: call the model, execute any requested tools,
//! feed the results back, repeat until the model answers in text. The
//! loop is bounded; hitting the bound produces a normal assistant
//! message rather than an error, so a runaway exchange still ends in a
//! committed, well-formed turn.

use std::sync::Arc;

use futures::StreamExt;
use futures::future::join_all;
use tokio::sync::mpsc;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{AssistantTurn, GenerationOptions, LlmProvider, StreamEvent};
use crate::tool::ToolRegistry;

/// Reply used when the model keeps requesting tools past the bound
const MAX_TURNS_REPLY: &str =
    "요청을 처리하는 데 단계가 너무 많아 분석을 마무리하지 못했습니다. 질문을 조금 더 구체적으로 나누어 다시 시도해주세요.";

/// Reply used when the model returns an empty final answer
const EMPTY_REPLY: &str = "응답을 생성할 수 없습니다.";

/// Orchestrator configuration
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Maximum model calls within one user turn
    pub max_turns: usize,

    /// Generation options for the conversation model
    pub generation: GenerationOptions,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_turns: 8,
            generation: GenerationOptions::default(),
        }
    }
}

/// Progress events emitted while a turn runs
#[derive(Clone, Debug)]
pub enum AgentEvent {
    /// Incremental assistant text
    Token(String),

    /// A tool call is about to execute
    ToolStarted {
        name: String,
        arguments: serde_json::Value,
    },

    /// A tool call finished (success or failure)
    ToolFinished {
        name: String,
        output: String,
        data: Option<serde_json::Value>,
    },
}

/// Result of a completed turn
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    /// The assistant's final answer
    pub final_text: String,

    /// Assistant and tool messages produced this turn, in order,
    /// ready to commit to session history
    pub messages: Vec<Message>,

    /// Number of model calls made
    pub rounds: usize,
}

/// The turn loop driver
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Run one user turn over the given model-facing messages.
    ///
    /// Progress is reported through `events`; send failures are ignored
    /// so a disconnected consumer never aborts the turn. Returns the
    /// turn's message delta for the caller to commit. Provider failures
    /// return `Err` and leave nothing committed.
    pub async fn run_turn(
        &self,
        mut messages: Vec<Message>,
        events: mpsc::Sender<AgentEvent>,
    ) -> Result<TurnOutcome> {
        let schemas = self.tools.schemas();
        let mut delta: Vec<Message> = Vec::new();
        let mut rounds = 0;

        loop {
            if rounds == self.config.max_turns {
                tracing::warn!(rounds, "turn bound reached, closing with fixed reply");
                let _ = events.send(AgentEvent::Token(MAX_TURNS_REPLY.into())).await;
                delta.push(Message::assistant(MAX_TURNS_REPLY));
                return Ok(TurnOutcome {
                    final_text: MAX_TURNS_REPLY.into(),
                    messages: delta,
                    rounds,
                });
            }
            rounds += 1;

            let mut stream = self
                .provider
                .complete_stream(&messages, &schemas, &self.config.generation)
                .await?;

            let mut completion = None;
            while let Some(event) = stream.next().await {
                match event? {
                    StreamEvent::Token(token) => {
                        let _ = events.send(AgentEvent::Token(token)).await;
                    }
                    StreamEvent::Completed(c) => completion = Some(c),
                }
            }
            let completion = completion
                .ok_or_else(|| AgentError::Provider("stream ended without a completion".into()))?;

            match completion.turn() {
                AssistantTurn::Text(text) => {
                    let final_text = if text.trim().is_empty() {
                        EMPTY_REPLY.to_string()
                    } else {
                        text
                    };
                    delta.push(Message::assistant(&final_text));
                    return Ok(TurnOutcome {
                        final_text,
                        messages: delta,
                        rounds,
                    });
                }
                AssistantTurn::ToolRequests(calls) => {
                    let assistant =
                        Message::assistant_with_tools(completion.text.clone(), calls.clone());
                    messages.push(assistant.clone());
                    delta.push(assistant);

                    for call in &calls {
                        tracing::debug!(tool = %call.name, "executing tool");
                        let _ = events
                            .send(AgentEvent::ToolStarted {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            })
                            .await;
                    }

                    // Tool calls within a round are independent of each
                    // other; run them concurrently, append in request order.
                    let results = join_all(calls.iter().map(|c| self.tools.dispatch(c))).await;

                    for result in results {
                        let _ = events
                            .send(AgentEvent::ToolFinished {
                                name: result.name.clone(),
                                output: result.output.clone(),
                                data: result.data.clone(),
                            })
                            .await;
                        let tool_message = Message::tool(result.output, result.id);
                        messages.push(tool_message.clone());
                        delta.push(tool_message);
                    }
                }
            }
        }
    }

    /// Generation options in effect
    pub fn generation(&self) -> &GenerationOptions {
        &self.config.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Completion, CompletionStream, StopReason};
    use crate::tool::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider stub that replays a script of completions
    struct ScriptedProvider {
        script: Mutex<VecDeque<Completion>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Completion>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next_completion(&self) -> Completion {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            match script.pop_front() {
                Some(c) => c,
                // Empty script keeps requesting tools forever.
                None => tool_completion("loop"),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolSchema],
            _options: &GenerationOptions,
        ) -> Result<Completion> {
            Ok(self.next_completion())
        }

        async fn complete_stream(
            &self,
            _messages: &[Message],
            _tools: &[ToolSchema],
            _options: &GenerationOptions,
        ) -> Result<CompletionStream> {
            let completion = self.next_completion();
            let mut events = Vec::new();
            if !completion.text.is_empty() {
                events.push(Ok(StreamEvent::Token(completion.text.clone())));
            }
            events.push(Ok(StreamEvent::Completed(completion)));
            Ok(futures::stream::iter(events).boxed())
        }
    }

    struct FixedTool;

    #[async_trait]
    impl Tool for FixedTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "probe".into(),
                description: "Fixed test tool".into(),
                parameters: vec![ParameterSchema {
                    name: "series_id".into(),
                    param_type: "string".into(),
                    description: "id".into(),
                    required: false,
                }],
            }
        }

        async fn execute(&self, _call: &ToolCall) -> Result<ToolResult> {
            Ok(ToolResult::success("probe", "probe output").with_data(json!({"points": 51})))
        }
    }

    fn text_completion(text: &str) -> Completion {
        Completion {
            text: text.into(),
            tool_calls: Vec::new(),
            model: "test".into(),
            stop_reason: Some(StopReason::EndTurn),
            usage: None,
        }
    }

    fn tool_completion(id: &str) -> Completion {
        Completion {
            text: String::new(),
            tool_calls: vec![ToolCall {
                id: id.into(),
                name: "probe".into(),
                arguments: json!({"series_id": "FEDFUNDS"}),
            }],
            model: "test".into(),
            stop_reason: Some(StopReason::ToolUse),
            usage: None,
        }
    }

    fn orchestrator(script: Vec<Completion>, max_turns: usize) -> (Orchestrator, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider::new(script));
        let mut registry = ToolRegistry::new();
        registry.register(FixedTool);
        let orchestrator = Orchestrator::new(
            provider.clone(),
            Arc::new(registry),
            OrchestratorConfig {
                max_turns,
                generation: GenerationOptions::default(),
            },
        );
        (orchestrator, provider)
    }

    fn seed() -> Vec<Message> {
        vec![Message::system("sys"), Message::user("question")]
    }

    #[tokio::test]
    async fn test_plain_answer_single_round() {
        let (orch, provider) = orchestrator(vec![text_completion("CPI is 3.2%.")], 8);
        let (tx, mut rx) = mpsc::channel(64);

        let outcome = orch.run_turn(seed(), tx).await.unwrap();
        assert_eq!(outcome.final_text, "CPI is 3.2%.");
        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.messages.len(), 1);
        assert_eq!(provider.call_count(), 1);

        let mut tokens = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, AgentEvent::Token(_)) {
                tokens += 1;
            }
        }
        assert_eq!(tokens, 1);
    }

    #[tokio::test]
    async fn test_tool_round_then_answer() {
        let (orch, _) = orchestrator(
            vec![tool_completion("c1"), text_completion("Done.")],
            8,
        );
        let (tx, mut rx) = mpsc::channel(64);

        let outcome = orch.run_turn(seed(), tx).await.unwrap();
        assert_eq!(outcome.final_text, "Done.");
        assert_eq!(outcome.rounds, 2);

        // assistant(tool call) + tool result + final assistant
        assert_eq!(outcome.messages.len(), 3);
        assert!(outcome.messages[0].has_tool_calls());
        assert_eq!(outcome.messages[1].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(outcome.messages[1].content, "probe output");

        let mut started = 0;
        let mut finished = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                AgentEvent::ToolStarted { name, .. } => {
                    assert_eq!(name, "probe");
                    started += 1;
                }
                AgentEvent::ToolFinished { data, .. } => {
                    assert_eq!(data, Some(json!({"points": 51})));
                    finished += 1;
                }
                AgentEvent::Token(_) => {}
            }
        }
        assert_eq!(started, 1);
        assert_eq!(finished, 1);
    }

    #[tokio::test]
    async fn test_bound_reached_closes_with_fixed_reply() {
        // Empty script: the provider requests a tool on every call.
        let (orch, provider) = orchestrator(Vec::new(), 3);
        let (tx, _rx) = mpsc::channel(64);

        let outcome = orch.run_turn(seed(), tx).await.unwrap();
        assert_eq!(outcome.final_text, MAX_TURNS_REPLY);
        assert_eq!(outcome.rounds, 3);
        assert_eq!(provider.call_count(), 3);

        // Every tool request got its result; the delta still ends in text.
        let last = outcome.messages.last().unwrap();
        assert!(!last.has_tool_calls());
        assert_eq!(last.content, MAX_TURNS_REPLY);
        assert_eq!(outcome.messages.len(), 3 * 2 + 1);
    }

    #[tokio::test]
    async fn test_empty_answer_replaced_with_fallback() {
        let (orch, _) = orchestrator(vec![text_completion("")], 8);
        let (tx, _rx) = mpsc::channel(64);

        let outcome = orch.run_turn(seed(), tx).await.unwrap();
        assert_eq!(outcome.final_text, EMPTY_REPLY);
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_abort_turn() {
        let (orch, _) = orchestrator(
            vec![tool_completion("c1"), text_completion("Still done.")],
            8,
        );
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let outcome = orch.run_turn(seed(), tx).await.unwrap();
        assert_eq!(outcome.final_text, "Still done.");
    }
}
