//! # fedterm-runtime
//!
//! LLM providers for the fedterm system.
//!
//! ## Providers
//!
//! - **Anthropic**: Messages API with native tool use, blocking and
//!   SSE streaming
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fedterm_runtime::AnthropicProvider;
//!
//! let provider = Arc::new(AnthropicProvider::from_env());
//! let orchestrator = Orchestrator::new(provider, tools, config);
//! ```

pub mod anthropic;

pub use anthropic::{AnthropicConfig, AnthropicProvider};

// Re-export core types for convenience
pub use fedterm_agent::{
    AgentError, LlmProvider, Message, Orchestrator, Result, Role, Tool, ToolRegistry,
};
