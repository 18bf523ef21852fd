//! Session Management
//!
//! Process-scoped conversation sessions. The store is an explicit object
//! constructed at startup and shared via `Arc`; history mutation goes
//! through the store API so a failed turn can be rolled back cleanly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message, Role};

/// Response language for a session, fixed at creation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ko,
    En,
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locale::Ko => write!(f, "ko"),
            Locale::En => write!(f, "en"),
        }
    }
}

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh ID of the form `SES-XXXXXXXX`
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("SES-{}", hex[..8].to_uppercase()))
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::generate()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A complete agent session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Session title (user-set; derived from history when absent)
    pub title: Option<String>,

    /// Response language
    pub locale: Locale,

    /// Conversation history
    pub conversation: Conversation,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session seeded with the locale's system prompt
    pub fn new(locale: Locale, system_prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::generate(),
            title: None,
            locale,
            conversation: Conversation::with_system_prompt(system_prompt),
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Get or derive the title
    pub fn title(&self) -> String {
        self.title.clone().unwrap_or_else(|| {
            self.conversation
                .messages()
                .iter()
                .find(|m| m.role == Role::User)
                .map(|m| {
                    let preview: String = m.content.chars().take(50).collect();
                    if m.content.chars().count() > 50 {
                        format!("{}...", preview)
                    } else {
                        preview
                    }
                })
                .unwrap_or_else(|| "New Session".into())
        })
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }
}

/// Summary view for session listings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub locale: Locale,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.to_string(),
            title: session.title(),
            locale: session.locale,
            created_at: session.created_at,
            updated_at: session.updated_at,
            message_count: session.message_count(),
        }
    }
}

/// In-memory session store
///
/// Sessions live for the process lifetime; eviction is an external
/// policy. The map is only ever held across synchronous sections, so a
/// std lock is sufficient.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Reuse an existing session or create one seeded with the locale's
    /// system prompt. An unknown inbound ID gets a fresh session rather
    /// than an error, matching stateless clients that cache IDs across
    /// server restarts.
    pub fn resolve(&self, id: Option<&str>, locale: Locale, system_prompt: &str) -> SessionId {
        let mut sessions = self.sessions.write().unwrap();

        if let Some(raw) = id {
            let key = SessionId::from_string(raw);
            if sessions.contains_key(&key) {
                return key;
            }
        }

        let session = Session::new(locale, system_prompt);
        let key = session.id.clone();
        sessions.insert(key.clone(), session);
        key
    }

    /// Create a session explicitly (session management API)
    pub fn create(
        &self,
        title: Option<String>,
        locale: Locale,
        system_prompt: &str,
    ) -> SessionSummary {
        let mut session = Session::new(locale, system_prompt);
        session.title = title;
        let summary = SessionSummary::from(&session);
        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(session.id.clone(), session);
        summary
    }

    /// Fetch a full session clone
    pub fn get(&self, id: &SessionId) -> Option<Session> {
        let sessions = self.sessions.read().unwrap();
        sessions.get(id).cloned()
    }

    /// Remove a session; false if it did not exist
    pub fn delete(&self, id: &SessionId) -> bool {
        let mut sessions = self.sessions.write().unwrap();
        sessions.remove(id).is_some()
    }

    /// All sessions, most recently active first
    pub fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().unwrap();
        let mut result: Vec<SessionSummary> = sessions.values().map(SessionSummary::from).collect();
        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result
    }

    /// Append the inbound user message
    pub fn push_user(&self, id: &SessionId, text: impl Into<String>) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| AgentError::Session(format!("unknown session: {}", id)))?;
        session.conversation.push(Message::user(text));
        session.touch();
        Ok(())
    }

    /// Append the assistant/tool messages produced by a completed turn
    pub fn commit_turn(&self, id: &SessionId, messages: Vec<Message>) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| AgentError::Session(format!("unknown session: {}", id)))?;
        for message in messages {
            session.conversation.push(message);
        }
        session.touch();
        Ok(())
    }

    /// Undo the inbound user message after a failed turn. Only pops when
    /// the last message is a user message, so history never ends on an
    /// unanswered question and a double rollback is harmless.
    pub fn rollback_user(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| AgentError::Session(format!("unknown session: {}", id)))?;
        if session.conversation.last().map(|m| m.role == Role::User) == Some(true) {
            session.conversation.pop();
        }
        Ok(())
    }

    /// Model-facing context window for a session
    pub fn context(&self, id: &SessionId, max_recent: usize) -> Result<Vec<Message>> {
        let sessions = self.sessions.read().unwrap();
        let session = sessions
            .get(id)
            .ok_or_else(|| AgentError::Session(format!("unknown session: {}", id)))?;
        Ok(session.conversation.context_window(max_recent))
    }

    /// Total stored messages for a session
    pub fn history_len(&self, id: &SessionId) -> Result<usize> {
        let sessions = self.sessions.read().unwrap();
        let session = sessions
            .get(id)
            .ok_or_else(|| AgentError::Session(format!("unknown session: {}", id)))?;
        Ok(session.conversation.len())
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().unwrap().is_empty()
    }
}
