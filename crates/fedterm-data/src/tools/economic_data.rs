//! Economic Data Tool
//!
//! Fetches a FRED series and summarizes it for the model in Korean.
//! The full series rides along as structured data so the transport can
//! chart it without a second fetch.

use std::sync::Arc;

use async_trait::async_trait;

use fedterm_agent::{
    Result as AgentResult, Tool, ToolCall, ToolResult, ToolSchema, tool::ParameterSchema,
};

use crate::fred::FredClient;

/// Tool for fetching FRED time series
pub struct EconomicDataTool {
    fred: Arc<FredClient>,
}

impl EconomicDataTool {
    pub fn new(fred: Arc<FredClient>) -> Self {
        Self { fred }
    }
}

#[async_trait]
impl Tool for EconomicDataTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_economic_data".into(),
            description: "Fetch historical economic data from FRED for a given series ID. \
                          Use this tool when the user asks about economic indicators, trends, \
                          or specific data like GDP, CPI, unemployment rate, etc."
                .into(),
            parameters: vec![ParameterSchema {
                name: "series_id".into(),
                param_type: "string".into(),
                description: "The FRED series ID (e.g., GDP, UNRATE, CPIAUCSL, FEDFUNDS, SP500)"
                    .into(),
                required: true,
            }],
        }
    }

    async fn execute(&self, call: &ToolCall) -> AgentResult<ToolResult> {
        let series_id = call.str_arg("series_id").unwrap_or("GDP");

        let series = self.fred.series_data(series_id).await;
        if series.data.is_empty() {
            return Ok(ToolResult::failure(
                "get_economic_data",
                format!("시리즈 {series_id}에 대한 데이터를 찾을 수 없습니다."),
            ));
        }

        let latest = series.data[series.data.len() - 1];
        let earliest = series.data[0];

        let trend = if series.data.len() >= 2 {
            let prev = series.data[series.data.len() - 2];
            let change = latest.value - prev.value;
            let pct = if prev.value == 0.0 {
                0.0
            } else {
                change / prev.value * 100.0
            };
            let direction = if change > 0.0 { "상승" } else { "하락" };
            format!("전월 대비 {direction} ({pct:+.2}%)")
        } else {
            "데이터 부족".to_owned()
        };

        let summary = format!(
            "📊 **{}** ({series_id})\n\
             - 최신값: **{} {}** ({})\n\
             - 기간: {} ~ {}\n\
             - 추세: {trend}\n\
             - 빈도: {}\n\
             - 마지막 업데이트: {}\n\
             - 데이터 포인트 수: {}",
            series.title,
            latest.value,
            series.units,
            latest.date,
            earliest.date,
            latest.date,
            series.frequency,
            series.last_updated,
            series.data.len()
        );

        let payload = serde_json::to_value(&series)?;
        Ok(ToolResult::success("get_economic_data", summary).with_data(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::Translator;
    use fedterm_agent::{Completion, CompletionStream, GenerationOptions, Message};
    use serde_json::json;

    struct OfflineProvider;

    #[async_trait]
    impl fedterm_agent::LlmProvider for OfflineProvider {
        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolSchema],
            _options: &GenerationOptions,
        ) -> AgentResult<Completion> {
            panic!("mock data path must not call the model")
        }

        async fn complete_stream(
            &self,
            _messages: &[Message],
            _tools: &[ToolSchema],
            _options: &GenerationOptions,
        ) -> AgentResult<CompletionStream> {
            panic!("mock data path must not call the model")
        }
    }

    fn keyless_tool() -> EconomicDataTool {
        let translator = Arc::new(Translator::new(Arc::new(OfflineProvider), "test-model"));
        EconomicDataTool::new(Arc::new(FredClient::new(None, translator)))
    }

    #[tokio::test]
    async fn test_execute_summarizes_mock_series() {
        let tool = keyless_tool();
        let call = ToolCall {
            id: "t1".into(),
            name: "get_economic_data".into(),
            arguments: json!({"series_id": "FEDFUNDS"}),
        };

        let result = tool.execute(&call).await.unwrap();
        assert!(result.success);
        assert!(result.output.contains("📊 **연방기금금리** (FEDFUNDS)"));
        assert!(result.output.contains("- 추세: 전월 대비"));
        assert!(result.output.contains("- 데이터 포인트 수: 51"));

        let data = result.data.expect("series payload attached");
        assert_eq!(data["id"], "FEDFUNDS");
        assert_eq!(data["data"].as_array().map(Vec::len), Some(51));
        assert!(data["lastUpdated"].is_string());
    }

    #[test]
    fn test_schema_requires_series_id() {
        let tool = keyless_tool();
        let schema = tool.schema();
        assert_eq!(schema.name, "get_economic_data");
        assert_eq!(schema.parameters.len(), 1);
        assert!(schema.parameters[0].required);
    }
}
