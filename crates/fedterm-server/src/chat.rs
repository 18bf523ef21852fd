//! Chat Turn Service
//!
//! The transport-independent half of a chat turn: session resolution,
//! context assembly, portfolio injection, and the batch path that folds
//! orchestrator events into the structured three-panel response.

use serde_json::Value;
use tokio::sync::mpsc;

use fedterm_agent::{AgentError, AgentEvent, Message, Result, Role, SessionId};
use fedterm_data::prompts::{inject_portfolio, system_prompt};
use fedterm_data::{SeriesData, SeriesInfo};

use crate::models::{ChatMessage, ChatRequest, ChatResponse};
use crate::state::AppState;

/// Tool names the log and panel treatment is keyed on
pub(crate) const SEARCH_TOOL: &str = "search_fred_indicators";
pub(crate) const SERIES_TOOL: &str = "get_economic_data";

/// Model-facing history bound: the last three exchanges
const MAX_HISTORY: usize = 6;

/// A turn ready to run: resolved session plus model-facing context
pub struct PreparedTurn {
    pub session_id: SessionId,
    pub context: Vec<Message>,
}

/// Resolve the session, record the user message, and assemble the
/// model-facing context. The portfolio block is injected into the
/// context copy only; stored history keeps the user's original text.
pub fn prepare_turn(state: &AppState, request: &ChatRequest) -> Result<PreparedTurn> {
    let prompt = system_prompt(request.locale);
    let session_id = state
        .sessions
        .resolve(request.session_id.as_deref(), request.locale, &prompt);

    state.sessions.push_user(&session_id, &request.message)?;
    let mut context = state.sessions.context(&session_id, MAX_HISTORY)?;

    if !request.portfolio.is_empty() {
        if let Some(last) = context.last_mut() {
            if last.role == Role::User {
                last.content = inject_portfolio(&last.content, &request.portfolio);
            }
        }
    }

    Ok(PreparedTurn {
        session_id,
        context,
    })
}

/// Run a full batch turn: drive the orchestrator, fold progress events
/// into the Korean execution log, and capture the last fetched series
/// for the chart panel. A failed turn rolls the user message back.
pub async fn run_chat(state: &AppState, request: ChatRequest) -> Result<ChatResponse> {
    let prepared = prepare_turn(state, &request)?;

    let mut logs = vec![
        format!("📥 사용자 입력 수신: \"{}\"", request.message),
        "🧠 의도 분석 중...".to_string(),
    ];

    let (tx, mut rx) = mpsc::channel(64);
    let orchestrator = state.orchestrator.clone();
    let context = prepared.context;
    let handle = tokio::spawn(async move { orchestrator.run_turn(context, tx).await });

    let mut chart: Option<SeriesData> = None;
    while let Some(event) = rx.recv().await {
        match event {
            AgentEvent::Token(_) => {}
            AgentEvent::ToolStarted { name, arguments } => {
                logs.push(format!("🔧 도구 호출: {name}({arguments})"));
                logs.push(execution_log(&name, &arguments));
            }
            AgentEvent::ToolFinished { name, data, .. } => {
                if name == SERIES_TOOL {
                    let series = data.and_then(|d| serde_json::from_value::<SeriesData>(d).ok());
                    if let Some(series) = series {
                        logs.push(format!(
                            "✅ {} 데이터 수신 완료 ({}개 포인트)",
                            series.id,
                            series.data.len()
                        ));
                        chart = Some(series);
                    }
                }
            }
        }
    }

    let outcome = match handle.await {
        Ok(turn) => turn,
        Err(join) => Err(AgentError::Other(format!("turn task failed: {join}"))),
    };
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            let _ = state.sessions.rollback_user(&prepared.session_id);
            return Err(e);
        }
    };

    state
        .sessions
        .commit_turn(&prepared.session_id, outcome.messages)?;
    logs.push("💬 응답 생성 완료".to_string());

    let data_objects = chart
        .iter()
        .map(|series| SeriesInfo {
            id: series.id.clone(),
            title: series.title.clone(),
            description: format!("{} | {}", series.units, series.frequency),
            category: None,
        })
        .collect();

    Ok(ChatResponse {
        message: ChatMessage::assistant(outcome.final_text, chart.clone()),
        session_id: prepared.session_id.to_string(),
        logs,
        data_objects,
        chart_data: chart,
    })
}

/// Per-tool execution log line
fn execution_log(name: &str, arguments: &Value) -> String {
    match name {
        SEARCH_TOOL => format!(
            "🔍 FRED 지표 검색 중: {}...",
            arguments.get("query").and_then(Value::as_str).unwrap_or("")
        ),
        SERIES_TOOL => format!(
            "📡 FRED 데이터 조회 중: {}...",
            arguments
                .get("series_id")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
        ),
        _ => format!("⚡ 도구 실행 중: {name}..."),
    }
}
