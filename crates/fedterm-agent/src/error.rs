//! Error Types
//!
//! Failures that can escape the turn loop. Tool-level problems normally
//! stay inside the loop as failure results; these variants cover the
//! cases that abort a turn and reach a transport.

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Model call failed (bad status, malformed response, mid-stream error)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Model endpoint unreachable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool arguments failed schema validation
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Unknown session id or history in an unexpected state
    #[error("Session error: {0}")]
    Session(String),

    /// Rate limited by the model endpoint
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Model endpoint rejected the credential
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Message safe to surface in an error frame. The terminal speaks
    /// Korean to its users regardless of session locale.
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Provider(_) | AgentError::ProviderUnavailable(_) => {
                "AI 서비스에 연결할 수 없습니다. 잠시 후 다시 시도해주세요.".into()
            }
            AgentError::ToolNotFound(name) => format!("사용할 수 없는 도구입니다: {name}"),
            AgentError::ToolValidation(_) | AgentError::ToolExecution(_) => {
                "도구 실행 중 오류가 발생했습니다.".into()
            }
            AgentError::Session(_) => "세션을 찾을 수 없습니다. 새로 시작해주세요.".into(),
            AgentError::RateLimited(_) => {
                "요청이 너무 많습니다. 잠시 후 다시 시도해주세요.".into()
            }
            AgentError::Auth(_) => "API 인증에 실패했습니다. 키 설정을 확인해주세요.".into(),
            AgentError::Json(_) | AgentError::Other(_) => {
                "요청을 처리하지 못했습니다. 다시 시도해주세요.".into()
            }
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}
