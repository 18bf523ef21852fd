//! Server Configuration

/// Runtime settings, read once at startup
#[derive(Clone, Debug)]
pub struct Settings {
    /// Anthropic API key; empty means chat turns will fail upstream
    pub anthropic_api_key: String,

    /// FRED API key; absent means the data layer serves synthetic series
    pub fred_api_key: Option<String>,

    /// Listen address
    pub bind_addr: String,

    /// Allowed CORS origins; empty list means permissive
    pub cors_origins: Vec<String>,

    /// Conversation model
    pub llm_model: String,

    /// Cheap model for search planning and title translation
    pub planner_model: String,

    /// Conversation sampling temperature
    pub llm_temperature: f32,

    /// Model-call bound per user turn
    pub max_turns: usize,
}

impl Settings {
    /// Load settings from the environment, `.env` included
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            fred_api_key: std::env::var("FRED_API_KEY").ok().filter(|k| !k.is_empty()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            cors_origins: parse_origins(&std::env::var("CORS_ORIGINS").unwrap_or_default()),
            llm_model: std::env::var("LLM_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".into()),
            planner_model: std::env::var("PLANNER_MODEL")
                .unwrap_or_else(|_| "claude-haiku-4-5-20251001".into()),
            llm_temperature: parse_or(std::env::var("LLM_TEMPERATURE").ok(), 0.3),
            max_turns: parse_or(std::env::var("MAX_TURNS").ok(), 8),
        }
    }
}

/// Split a comma-separated origin list, dropping blanks
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

/// Parse an optional env value, falling back on absence or garbage
fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}
