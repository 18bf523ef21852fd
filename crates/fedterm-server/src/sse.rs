//! SSE Transport
//!
//! Streams a chat turn as Server-Sent Events. Frames mirror the
//! terminal protocol: `token`, `tool_call`, `tool_result`,
//! `fred_search_results`, `done`, `error`. Every stream ends in exactly
//! one terminal frame; assistant tokens pass through the fence filter
//! so pre-tool planning blocks never reach the client.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderName, header};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};

use fedterm_agent::{AgentError, AgentEvent, FenceFilter};

use crate::chat::{self, SEARCH_TOOL};
use crate::models::ChatRequest;
use crate::state::AppState;

/// One SSE data frame
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Token {
        content: String,
    },
    ToolCall {
        tool: String,
        input: Value,
    },
    ToolResult {
        tool: String,
        result: String,
    },
    FredSearchResults {
        indicators: Vec<Value>,
        keywords: Value,
        count: u64,
    },
    Done {
        #[serde(rename = "sessionId")]
        session_id: String,
        logs: Vec<String>,
    },
    Error {
        message: String,
    },
}

/// POST /api/chat/stream
pub async fn chat_stream_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    let (frames, rx) = mpsc::channel(64);
    tokio::spawn(stream_turn(state, request, frames));

    let stream = ReceiverStream::new(rx).map(|frame| Event::default().json_data(&frame));
    let sse = Sse::new(stream).keep_alive(KeepAlive::default());

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        sse,
    )
}

/// Drive one turn, translating orchestrator events into frames. The
/// frame receiver going away mid-turn is fine; the turn still runs to
/// completion and commits.
async fn stream_turn(state: AppState, request: ChatRequest, frames: mpsc::Sender<Frame>) {
    let prepared = match chat::prepare_turn(&state, &request) {
        Ok(prepared) => prepared,
        Err(e) => {
            let _ = frames
                .send(Frame::Error {
                    message: e.user_message(),
                })
                .await;
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel(64);
    let orchestrator = state.orchestrator.clone();
    let context = prepared.context;
    let handle = tokio::spawn(async move { orchestrator.run_turn(context, tx).await });

    let mut filter = FenceFilter::new();
    let mut logs: Vec<String> = Vec::new();

    while let Some(event) = rx.recv().await {
        match event {
            AgentEvent::Token(token) => {
                let cleaned = filter.push(&token);
                if !cleaned.is_empty() {
                    let _ = frames.send(Frame::Token { content: cleaned }).await;
                }
            }
            AgentEvent::ToolStarted { name, arguments } => {
                // Pre-tool narration and post-tool text are separate
                // fence scopes.
                filter.reset();
                logs.push(format!("TOOL_CALL: {name}({arguments})"));
                let _ = frames
                    .send(Frame::ToolCall {
                        tool: name,
                        input: arguments,
                    })
                    .await;
            }
            AgentEvent::ToolFinished { name, output, data } => {
                if name == SEARCH_TOOL {
                    if let Some(frame) = search_results_frame(data.as_ref()) {
                        let _ = frames.send(frame).await;
                    }
                }
                logs.push(format!(
                    "TOOL_RESULT: {name} -> {}",
                    truncate_chars(&output, 200)
                ));
                let _ = frames
                    .send(Frame::ToolResult {
                        tool: name,
                        result: truncate_chars(&output, 500),
                    })
                    .await;
            }
        }
    }

    let outcome = match handle.await {
        Ok(outcome) => outcome,
        Err(join) => Err(AgentError::Other(format!("turn task failed: {join}"))),
    };

    match outcome {
        Ok(outcome) => {
            if let Err(e) = state
                .sessions
                .commit_turn(&prepared.session_id, outcome.messages)
            {
                tracing::warn!("turn commit failed: {e}");
            }
            let _ = frames
                .send(Frame::Done {
                    session_id: prepared.session_id.to_string(),
                    logs,
                })
                .await;
        }
        Err(e) => {
            tracing::error!("streaming turn failed: {e}");
            let _ = state.sessions.rollback_user(&prepared.session_id);
            let _ = frames
                .send(Frame::Error {
                    message: e.user_message(),
                })
                .await;
        }
    }
}

/// Panel frame from the search tool's structured payload
fn search_results_frame(data: Option<&Value>) -> Option<Frame> {
    let data = data?;
    let results = data.get("results")?.as_array()?;
    let indicators: Vec<Value> = results.iter().take(5).cloned().collect();
    let keywords = data
        .get("keywords")
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));
    let count = data
        .get("count")
        .and_then(Value::as_u64)
        .unwrap_or(indicators.len() as u64);
    Some(Frame::FredSearchResults {
        indicators,
        keywords,
        count,
    })
}

/// Char-safe prefix; multibyte text never splits mid-character
fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
