//! Conversation Messages
//!
//! Standard message format used across the agent system. Assistant messages
//! may carry tool calls; tool messages carry the result for exactly one call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::ToolCall;

/// Role of a message sender
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result (injected as context)
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content
    pub content: String,

    /// Tool calls requested by the assistant (assistant messages only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// ID of the call this message answers (tool messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create an assistant message that requests tool calls
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::new(Role::Assistant, content);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Create a tool result message
    pub fn tool(content: impl Into<String>, tool_call_id: Option<String>) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.tool_call_id = tool_call_id;
        msg
    }

    /// Whether this assistant message requests tool execution
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Conversation history with utility methods
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut conv = Self::new();
        conv.push(Message::system(prompt));
        conv
    }

    /// Add a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Remove and return the last message
    pub fn pop(&mut self) -> Option<Message> {
        self.messages.pop()
    }

    /// Model-facing window: the system prompt plus at most the last
    /// `max_recent` non-system messages. If the cut would land inside a
    /// tool exchange the window is extended backward until it opens on a
    /// user message, so assistant tool calls always travel with their
    /// results.
    pub fn context_window(&self, max_recent: usize) -> Vec<Message> {
        let non_system: Vec<usize> = self
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.role != Role::System)
            .map(|(i, _)| i)
            .collect();

        let mut window = Vec::new();
        if let Some(system) = self.messages.iter().find(|m| m.role == Role::System) {
            window.push(system.clone());
        }

        let mut start = non_system.len().saturating_sub(max_recent);
        while start > 0 && self.messages[non_system[start]].role != Role::User {
            start -= 1;
        }

        for &i in &non_system[start..] {
            window.push(self.messages[i].clone());
        }
        window
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: "get_economic_data".to_string(),
            arguments: json!({"series_id": "CPIAUCSL"}),
        }
    }

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn test_conversation() {
        let mut conv = Conversation::with_system_prompt("You are helpful.");
        conv.push(Message::user("Hi"));
        conv.push(Message::assistant("Hello!"));

        assert_eq!(conv.len(), 3);
        assert!(conv.last().unwrap().role == Role::Assistant);
    }

    #[test]
    fn test_window_returns_everything_when_short() {
        let mut conv = Conversation::with_system_prompt("sys");
        conv.push(Message::user("q1"));
        conv.push(Message::assistant("a1"));

        let window = conv.context_window(6);
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].role, Role::System);
    }

    #[test]
    fn test_window_trims_to_recent_messages() {
        let mut conv = Conversation::with_system_prompt("sys");
        for i in 0..5 {
            conv.push(Message::user(format!("q{}", i)));
            conv.push(Message::assistant(format!("a{}", i)));
        }

        let window = conv.context_window(6);
        // system + last 3 exchanges, opening on a user message
        assert_eq!(window.len(), 7);
        assert_eq!(window[1].role, Role::User);
        assert_eq!(window[1].content, "q2");
    }

    #[test]
    fn test_window_keeps_tool_exchange_intact() {
        let mut conv = Conversation::with_system_prompt("sys");
        conv.push(Message::user("q1"));
        conv.push(Message::assistant("a1"));
        conv.push(Message::user("q2"));
        conv.push(Message::assistant_with_tools("", vec![call("c1")]));
        conv.push(Message::tool("result", Some("c1".to_string())));
        conv.push(Message::assistant("a2"));
        conv.push(Message::user("q3"));
        conv.push(Message::assistant("a3"));

        // A cut of 5 would open on the tool-calling assistant message;
        // the window must extend back to the user message before it.
        let window = conv.context_window(5);
        assert_eq!(window[1].role, Role::User);
        assert_eq!(window[1].content, "q2");
        assert!(window.iter().any(|m| m.role == Role::Tool));
        assert_eq!(window.len(), 7);
    }
}
