//! REST Handlers
//!
//! Data, session, and health endpoints. The chat transports live in
//! `chat` (batch) and `sse` (streaming).

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use fedterm_agent::{SessionId, SessionSummary};
use fedterm_data::catalog::{INDICATOR_CATEGORIES, major_indicators};
use fedterm_data::prompts::system_prompt;
use fedterm_data::{DataError, Quote, SeriesData, SeriesInfo, TickerMatch};

use crate::chat;
use crate::models::{ChatRequest, ChatResponse, ErrorResponse, SessionCreate};
use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ServiceInfo {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// One curated category with its member series ids
#[derive(Serialize)]
pub struct CategoryGroup {
    pub name: &'static str,
    pub series: &'static [&'static str],
}

#[derive(Serialize)]
pub struct IndicatorsResponse {
    pub categories: Vec<CategoryGroup>,
    pub all: Vec<SeriesInfo>,
}

/// Series metadata, or the keyless marker the frontend checks for
#[derive(Serialize)]
#[serde(untagged)]
pub enum SeriesInfoResponse {
    Info(SeriesInfo),
    Missing { error: &'static str },
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
}

#[derive(Serialize)]
pub struct SessionList {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Serialize)]
pub struct Deleted {
    pub success: bool,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn not_found(what: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("{what} not found"),
            code: "NOT_FOUND".into(),
        }),
    )
}

// ============================================================================
// Health & Info
// ============================================================================

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        status: "ok",
        service: "FRED Terminal API",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

// ============================================================================
// Chat (batch)
// ============================================================================

pub async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    chat::run_chat(&state, request).await.map(Json).map_err(|e| {
        tracing::error!("chat turn failed: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.user_message(),
                code: "AGENT_ERROR".into(),
            }),
        )
    })
}

// ============================================================================
// FRED Data
// ============================================================================

pub async fn get_indicators() -> Json<IndicatorsResponse> {
    let categories = INDICATOR_CATEGORIES
        .iter()
        .copied()
        .map(|(name, series)| CategoryGroup { name, series })
        .collect();
    Json(IndicatorsResponse {
        categories,
        all: major_indicators(),
    })
}

/// Never fails: the adapter degrades to synthetic data without a key
/// or on upstream trouble.
pub async fn get_series(
    State(state): State<AppState>,
    Path(series_id): Path<String>,
) -> Json<SeriesData> {
    Json(state.fred.series_data(&series_id).await)
}

pub async fn get_series_info(
    State(state): State<AppState>,
    Path(series_id): Path<String>,
) -> Json<SeriesInfoResponse> {
    match state.fred.series_info(&series_id).await {
        Some(info) => Json(SeriesInfoResponse::Info(info)),
        None => Json(SeriesInfoResponse::Missing {
            error: "No info available (API key not configured)",
        }),
    }
}

pub async fn search_series(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<SeriesInfo>> {
    Json(state.fred.search(&params.q).await)
}

// ============================================================================
// Stocks
// ============================================================================

pub async fn search_stocks(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<TickerMatch>> {
    Json(state.stocks.search_tickers(&params.q).await)
}

pub async fn get_stock(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<Quote>, ApiError> {
    match state.stocks.quote(&ticker).await {
        Ok(quote) => Ok(Json(quote)),
        Err(DataError::TickerNotFound(t)) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Ticker not found: {t}"),
                code: "TICKER_NOT_FOUND".into(),
            }),
        )),
        Err(e) => {
            tracing::error!("stock fetch failed: {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to fetch stock data: {e}"),
                    code: "STOCK_ERROR".into(),
                }),
            ))
        }
    }
}

// ============================================================================
// Sessions
// ============================================================================

pub async fn list_sessions(State(state): State<AppState>) -> Json<SessionList> {
    Json(SessionList {
        sessions: state.sessions.list(),
    })
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<SessionCreate>,
) -> (StatusCode, Json<SessionSummary>) {
    let prompt = system_prompt(body.locale);
    let summary = state.sessions.create(Some(body.title), body.locale, &prompt);
    (StatusCode::CREATED, Json(summary))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    let id = SessionId::from_string(session_id);
    state
        .sessions
        .get(&id)
        .map(|session| Json(SessionSummary::from(&session)))
        .ok_or_else(|| not_found("Session"))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    let id = SessionId::from_string(session_id);
    if state.sessions.delete(&id) {
        Ok(Json(Deleted { success: true }))
    } else {
        Err(not_found("Session"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_indicator_catalog_groups_cover_all() {
        let Json(response) = get_indicators().await;

        assert_eq!(response.all.len(), 20);
        let grouped: usize = response.categories.iter().map(|c| c.series.len()).sum();
        assert_eq!(grouped, response.all.len());
    }

    #[test]
    fn test_series_info_missing_shape() {
        let value = serde_json::to_value(SeriesInfoResponse::Missing {
            error: "No info available (API key not configured)",
        })
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({"error": "No info available (API key not configured)"})
        );
    }

    #[test]
    fn test_series_info_present_serializes_flat() {
        let value = serde_json::to_value(SeriesInfoResponse::Info(SeriesInfo {
            id: "GDP".into(),
            title: "국내총생산 (GDP)".into(),
            description: "분기별 실질 GDP".into(),
            category: Some("성장".into()),
        }))
        .unwrap();
        assert_eq!(value["id"], "GDP");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_not_found_envelope() {
        let (status, Json(body)) = not_found("Session");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Session not found");
        assert_eq!(body.code, "NOT_FOUND");
    }
}
