//! # fedterm-agent
//!
//! Core agent logic for the economic-data terminal: conversation state,
//! native tool calling, and the bounded turn loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Orchestrator                            │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐   │
//! │  │  Turn Loop  │  │    Tools    │  │   LlmProvider       │   │
//! │  │  (bounded)  │──│   Registry  │──│   (Strategy)        │   │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait carries native tool calling, so backends can
//! be swapped without touching agent logic. Progress flows out of the
//! loop as [`orchestrator::AgentEvent`]s over a channel; transports map
//! those to whatever wire format they speak.

pub mod error;
pub mod message;
pub mod orchestrator;
pub mod provider;
pub mod session;
pub mod stream;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use orchestrator::{AgentEvent, Orchestrator, OrchestratorConfig, TurnOutcome};
pub use provider::{
    AssistantTurn, Completion, CompletionStream, GenerationOptions, LlmProvider, StopReason,
    StreamEvent,
};
pub use session::{Locale, Session, SessionId, SessionStore, SessionSummary};
pub use stream::FenceFilter;
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
