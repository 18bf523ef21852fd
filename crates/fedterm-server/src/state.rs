//! Application State

use std::sync::Arc;

use fedterm_agent::{Orchestrator, SessionStore};
use fedterm_data::{FredClient, StockClient};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Turn loop driver with the registered tools
    pub orchestrator: Arc<Orchestrator>,

    /// Conversation sessions
    pub sessions: Arc<SessionStore>,

    /// FRED series adapter (mock-backed without a key)
    pub fred: Arc<FredClient>,

    /// Stock quote adapter
    pub stocks: Arc<StockClient>,
}
