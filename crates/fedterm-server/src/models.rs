//! Wire Models
//!
//! Request and response shapes for the terminal frontend. Field casing
//! is part of the wire contract: `sessionId`, `avgPrice`, and
//! `lastUpdated` travel camelCase while the panel fields stay snake.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fedterm_agent::Locale;
use fedterm_data::{PortfolioHolding, SeriesData, SeriesInfo};

/// Inbound chat request
#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
    /// User message text
    pub message: String,

    /// Session to continue; absent or unknown starts a new one
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,

    /// Response language
    #[serde(default)]
    pub locale: Locale,

    /// Holdings the assistant should weave into the analysis
    #[serde(default)]
    pub portfolio: Vec<PortfolioHolding>,
}

/// How the frontend renders a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Chart,
}

/// One rendered chat message
#[derive(Clone, Debug, Serialize)]
pub struct ChatMessage {
    /// Short message id
    pub id: String,

    /// Author role
    pub role: &'static str,

    /// Render hint
    #[serde(rename = "type")]
    pub content_type: ContentType,

    /// Message text
    pub content: String,

    /// Series payload backing a chart message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SeriesData>,

    /// Creation time, RFC 3339
    pub timestamp: String,
}

impl ChatMessage {
    /// Build an assistant message; chart type when a series is attached
    pub fn assistant(content: impl Into<String>, data: Option<SeriesData>) -> Self {
        let content_type = if data.is_some() {
            ContentType::Chart
        } else {
            ContentType::Text
        };
        Self {
            id: Uuid::new_v4().simple().to_string()[..8].to_string(),
            role: "assistant",
            content_type,
            content: content.into(),
            data,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Structured chat response for the three-panel terminal
#[derive(Clone, Debug, Serialize)]
pub struct ChatResponse {
    /// Assistant message for the conversation panel
    pub message: ChatMessage,

    /// Session the turn committed to
    #[serde(rename = "sessionId")]
    pub session_id: String,

    /// Execution trace for the log panel
    pub logs: Vec<String>,

    /// Series metadata for the data panel
    pub data_objects: Vec<SeriesInfo>,

    /// Time-series payload for chart rendering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<SeriesData>,
}

/// Error envelope for REST failures
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Session creation request
#[derive(Debug, Deserialize)]
pub struct SessionCreate {
    #[serde(default = "default_session_title")]
    pub title: String,

    #[serde(default)]
    pub locale: Locale,
}

fn default_session_title() -> String {
    "New Session".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fedterm_data::SeriesPoint;

    fn series() -> SeriesData {
        SeriesData {
            id: "GDP".into(),
            title: "국내총생산 (GDP)".into(),
            units: "Billions of Dollars".into(),
            frequency: "Quarterly".into(),
            data: vec![SeriesPoint {
                date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                value: 27000.0,
            }],
            last_updated: "2026-08-23".into(),
        }
    }

    #[test]
    fn test_chat_request_wire_fields() {
        let request: ChatRequest = serde_json::from_str(
            r#"{
                "message": "금리 분석해줘",
                "sessionId": "SES-AAAA1111",
                "locale": "en",
                "portfolio": [{"ticker": "AAPL", "quantity": 2.5, "avgPrice": 190.0}]
            }"#,
        )
        .unwrap();

        assert_eq!(request.session_id.as_deref(), Some("SES-AAAA1111"));
        assert_eq!(request.locale, Locale::En);
        assert_eq!(request.portfolio.len(), 1);
        assert_eq!(request.portfolio[0].avg_price, Some(190.0));
    }

    #[test]
    fn test_chat_request_defaults() {
        let request: ChatRequest = serde_json::from_str(r#"{"message": "안녕"}"#).unwrap();
        assert!(request.session_id.is_none());
        assert_eq!(request.locale, Locale::Ko);
        assert!(request.portfolio.is_empty());
    }

    #[test]
    fn test_assistant_message_type_follows_payload() {
        let text = ChatMessage::assistant("안내문", None);
        assert_eq!(text.content_type, ContentType::Text);
        assert_eq!(text.id.len(), 8);

        let chart = ChatMessage::assistant("차트입니다", Some(series()));
        assert_eq!(chart.content_type, ContentType::Chart);

        let value = serde_json::to_value(&chart).unwrap();
        assert_eq!(value["type"], "chart");
        assert_eq!(value["role"], "assistant");
        assert!(value["data"]["lastUpdated"].is_string());
    }

    #[test]
    fn test_chat_response_wire_casing() {
        let response = ChatResponse {
            message: ChatMessage::assistant("완료", None),
            session_id: "SES-BBBB2222".into(),
            logs: Vec::new(),
            data_objects: Vec::new(),
            chart_data: None,
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["sessionId"], "SES-BBBB2222");
        assert!(value.get("data_objects").is_some());
        // Absent chart is omitted, not null.
        assert!(value.get("chart_data").is_none());
        assert!(value["message"].get("data").is_none());
    }

    #[test]
    fn test_session_create_defaults() {
        let body: SessionCreate = serde_json::from_str("{}").unwrap();
        assert_eq!(body.title, "New Session");
        assert_eq!(body.locale, Locale::Ko);
    }
}
