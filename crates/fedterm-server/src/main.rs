//! FRED-OS Terminal Server
//!
//! Axum server for the conversational economic terminal: REST data
//! endpoints plus batch and SSE chat transports over the agent loop.

mod chat;
mod config;
mod handlers;
mod models;
mod sse;
mod state;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fedterm_agent::{
    GenerationOptions, LlmProvider, Orchestrator, OrchestratorConfig, SessionStore, ToolRegistry,
};
use fedterm_data::{
    EconomicDataTool, FredClient, IndicatorSearchTool, SearchPipeline, StockClient, StockDataTool,
    Translator,
};
use fedterm_runtime::AnthropicProvider;

use crate::config::Settings;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Loads .env before reading anything else
    let settings = Settings::from_env();

    // One model provider shared by the conversation loop, the search
    // planner, and the title translator
    let provider: Arc<dyn LlmProvider> = Arc::new(AnthropicProvider::from_env());

    let translator = Arc::new(Translator::new(
        provider.clone(),
        settings.planner_model.clone(),
    ));
    let fred = Arc::new(FredClient::new(
        settings.fred_api_key.clone(),
        translator.clone(),
    ));
    let stocks = Arc::new(StockClient::new());
    let search = Arc::new(SearchPipeline::new(
        provider.clone(),
        settings.planner_model.clone(),
        fred.clone(),
        translator,
    ));

    // Register tools
    let mut tools = ToolRegistry::new();
    tools.register(EconomicDataTool::new(fred.clone()));
    tools.register(StockDataTool::new(stocks.clone()));
    tools.register(IndicatorSearchTool::new(search));

    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    let sessions = Arc::new(SessionStore::new());
    let orchestrator = Arc::new(Orchestrator::new(
        provider,
        Arc::new(tools),
        OrchestratorConfig {
            max_turns: settings.max_turns,
            generation: GenerationOptions {
                model: settings.llm_model.clone(),
                temperature: settings.llm_temperature,
                ..GenerationOptions::default()
            },
        },
    ));

    if settings.anthropic_api_key.is_empty() {
        tracing::warn!("⚠ ANTHROPIC_API_KEY not set - chat turns will fail");
    } else {
        tracing::info!("✓ ANTHROPIC_API_KEY configured");
    }
    if fred.is_live() {
        tracing::info!("✓ FRED_API_KEY configured");
    } else {
        tracing::warn!("⚠ FRED_API_KEY not set - serving mock data");
    }
    tracing::info!("✓ LLM model: {}", settings.llm_model);

    // Build application state
    let state = AppState {
        orchestrator,
        sessions,
        fred,
        stocks,
    };

    let cors = cors_layer(&settings.cors_origins);

    // Build router
    let app = Router::new()
        // Health & info
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        // Chat
        .route("/api/chat", post(handlers::chat_handler))
        .route("/api/chat/stream", post(sse::chat_stream_handler))
        // FRED data
        .route("/api/fred/indicators", get(handlers::get_indicators))
        .route("/api/fred/series/{series_id}", get(handlers::get_series))
        .route(
            "/api/fred/series/{series_id}/info",
            get(handlers::get_series_info),
        )
        .route("/api/fred/search", get(handlers::search_series))
        // Stocks
        .route("/api/stocks/search", get(handlers::search_stocks))
        .route("/api/stocks/{ticker}", get(handlers::get_stock))
        // Sessions
        .route(
            "/api/sessions",
            get(handlers::list_sessions).post(handlers::create_session),
        )
        .route(
            "/api/sessions/{session_id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 FRED-OS terminal server on http://{}", settings.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                 - Health check");
    tracing::info!("  POST /api/chat               - Chat (batch)");
    tracing::info!("  POST /api/chat/stream        - Chat (SSE stream)");
    tracing::info!("  GET  /api/fred/indicators    - Indicator catalog");
    tracing::info!("  GET  /api/fred/series/{{id}}   - Series observations");
    tracing::info!("  GET  /api/fred/search?q=     - Series search");
    tracing::info!("  GET  /api/stocks/{{ticker}}    - Stock quote");
    tracing::info!("  GET  /api/sessions           - Session list");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Permissive CORS when no origins are configured, else the exact list
/// with credentials allowed
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
