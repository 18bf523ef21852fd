//! Indicator Search Tool
//!
//! Exposes the search pipeline to the model. The JSON outcome is both
//! the tool output the model reads and the structured payload the
//! transport forwards to the watch panel.

use std::sync::Arc;

use async_trait::async_trait;

use fedterm_agent::{
    Result as AgentResult, Tool, ToolCall, ToolResult, ToolSchema, tool::ParameterSchema,
};

use crate::search::SearchPipeline;

/// Tool for discovering FRED indicators by topic
pub struct IndicatorSearchTool {
    pipeline: Arc<SearchPipeline>,
}

impl IndicatorSearchTool {
    pub fn new(pipeline: Arc<SearchPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Tool for IndicatorSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search_fred_indicators".into(),
            description: "MUST be called when the user asks to find, list, discover, or \
                          search for FRED indicators on a topic.\n\n\
                          CALL THIS TOOL whenever the user:\n\
                          - Asks \"X 관련 지표 알려줘/찾아줘/뭐 있어?\"\n\
                          - Wants to discover indicators for a topic (housing, mortgage, employment, etc.)\n\
                          - Uses words like: 찾아줘, 알려줘, 검색, 관련 지표, 어떤 지표, 추천\n\n\
                          DO NOT answer from memory. Always call this tool to search the real \
                          FRED database (800,000+ series). Results are automatically shown in \
                          the Watch panel as 5 slots: 1 sector + 3 macro + 1 risk."
                .into(),
            parameters: vec![ParameterSchema {
                name: "query".into(),
                param_type: "string".into(),
                description: "검색 쿼리 (한국어 또는 영어, 예: \"부동산 대출 금리\", \"housing mortgage rate\")"
                    .into(),
                required: true,
            }],
        }
    }

    async fn execute(&self, call: &ToolCall) -> AgentResult<ToolResult> {
        let query = call.str_arg("query").unwrap_or_default();

        let outcome = self.pipeline.run(query).await;
        let output = serde_json::to_string(&outcome)?;
        let payload = serde_json::to_value(&outcome)?;
        Ok(ToolResult::success("search_fred_indicators", output).with_data(payload))
    }
}
